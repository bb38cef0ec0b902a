//! Environment-based configuration.

use std::collections::HashMap;
use std::path::PathBuf;

/// Environment configuration prefix.
pub const DEFAULT_PREFIX: &str = "CMDPLAY";

/// Environment variable reader.
///
/// Values set with [`with_var`](Self::with_var) shadow the process
/// environment, so configuration can be resolved without mutating global
/// state.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    /// Prefix for environment variables.
    prefix: String,
    /// Values that shadow the process environment.
    overrides: HashMap<String, String>,
    /// Whether to consult the process environment at all.
    inherit: bool,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

impl EnvConfig {
    /// Create a new environment config reader.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            overrides: HashMap::new(),
            inherit: true,
        }
    }

    /// A reader with the default prefix that ignores the process
    /// environment and sees only [`with_var`](Self::with_var) values.
    #[must_use]
    pub fn isolated() -> Self {
        Self {
            inherit: false,
            ..Self::default()
        }
    }

    /// Shadow the variable `name` (full name, prefix included) with `value`.
    #[must_use]
    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.overrides.insert(name.into(), value.into());
        self
    }

    /// Build the full environment variable name.
    fn var_name(&self, name: &str) -> String {
        if self.prefix.is_empty() {
            name.to_uppercase()
        } else {
            format!("{}_{}", self.prefix, name.to_uppercase())
        }
    }

    /// Get a prefixed value: `get("shell")` reads `CMDPLAY_SHELL`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<String> {
        self.raw(&self.var_name(name))
    }

    /// Get an unprefixed variable by its exact name.
    #[must_use]
    pub fn raw(&self, name: &str) -> Option<String> {
        if let Some(value) = self.overrides.get(name) {
            return Some(value.clone());
        }
        if self.inherit {
            std::env::var(name).ok()
        } else {
            None
        }
    }

    /// Get a path-valued unprefixed variable, ignoring empty values.
    #[must_use]
    pub fn path(&self, name: &str) -> Option<PathBuf> {
        self.raw(name).filter(|v| !v.is_empty()).map(PathBuf::from)
    }
}
