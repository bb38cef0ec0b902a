//! File-based configuration loading.
//!
//! ```toml
//! shell = "/bin/zsh"
//! term = "xterm-256color"
//! log = "cmdplay=debug"
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::env::EnvConfig;
use crate::error::{CmdplayError, Result};

/// Directory under the config home holding cmdplay's files.
pub const CONFIG_DIR_NAME: &str = "cmdplay";

/// Name of the config file.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Settings read from a TOML file. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Shell to spawn.
    pub shell: Option<String>,
    /// `TERM` value for the shell.
    pub term: Option<String>,
    /// Tracing filter directive.
    pub log: Option<String>,
}

impl FileConfig {
    /// Parse TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`CmdplayError::Config`] on invalid TOML or unknown keys.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| CmdplayError::config(e.to_string()))
    }

    /// Read and parse the file at `path`.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or does not parse.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            CmdplayError::io_context(format!("reading config {}", path.display()), e)
        })?;
        let config = Self::from_toml_str(&text).map_err(|e| match e {
            CmdplayError::Config { message } => {
                CmdplayError::config(format!("{}: {message}", path.display()))
            }
            other => other,
        })?;
        tracing::debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    /// Load `explicit` if given, otherwise the default file if it exists.
    ///
    /// A missing default file yields an empty configuration; a missing
    /// explicit file is an error.
    ///
    /// # Errors
    ///
    /// Fails if a file that should be read cannot be read or parsed.
    pub fn discover(explicit: Option<&Path>, env: &EnvConfig) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match default_path(env) {
            Some(path) if path.is_file() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }
}

/// `$XDG_CONFIG_HOME/cmdplay/config.toml`, falling back to
/// `~/.config/cmdplay/config.toml`.
#[must_use]
pub fn default_path(env: &EnvConfig) -> Option<PathBuf> {
    let base = env
        .path("XDG_CONFIG_HOME")
        .or_else(|| env.path("HOME").map(|home| home.join(".config")))?;
    Some(base.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_keys() {
        let config = FileConfig::from_toml_str(
            "shell = \"/bin/zsh\"\nterm = \"vt100\"\nlog = \"debug\"\n",
        )
        .unwrap();
        assert_eq!(config.shell.as_deref(), Some("/bin/zsh"));
        assert_eq!(config.term.as_deref(), Some("vt100"));
        assert_eq!(config.log.as_deref(), Some("debug"));
    }

    #[test]
    fn empty_file_is_default() {
        assert_eq!(FileConfig::from_toml_str("").unwrap(), FileConfig::default());
    }

    #[test]
    fn unknown_key_is_rejected() {
        let err = FileConfig::from_toml_str("shel = \"/bin/sh\"").unwrap_err();
        assert!(matches!(err, CmdplayError::Config { .. }));
    }

    #[test]
    fn default_path_prefers_xdg() {
        let env = EnvConfig::isolated()
            .with_var("XDG_CONFIG_HOME", "/xdg")
            .with_var("HOME", "/home/u");
        assert_eq!(
            default_path(&env),
            Some(PathBuf::from("/xdg/cmdplay/config.toml"))
        );

        let env = EnvConfig::isolated().with_var("HOME", "/home/u");
        assert_eq!(
            default_path(&env),
            Some(PathBuf::from("/home/u/.config/cmdplay/config.toml"))
        );

        assert_eq!(default_path(&EnvConfig::isolated()), None);
    }

    #[test]
    fn missing_default_file_is_ignored() {
        let env = EnvConfig::isolated().with_var("XDG_CONFIG_HOME", "/nonexistent/cmdplay-test");
        assert_eq!(FileConfig::discover(None, &env).unwrap(), FileConfig::default());
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let err = FileConfig::discover(
            Some(Path::new("/nonexistent/cmdplay.toml")),
            &EnvConfig::isolated(),
        )
        .unwrap_err();
        assert!(matches!(err, CmdplayError::IoWithContext { .. }));
    }
}
