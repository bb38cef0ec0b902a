//! Configuration for cmdplay.
//!
//! Settings come from three layers, highest priority first: command-line
//! flags, `CMDPLAY_*` environment variables ([`env`]), and an optional TOML
//! file ([`file`]). [`SessionConfig::resolve`] merges them.

pub mod env;
pub mod file;

use std::time::Duration;

use crate::error::{CmdplayError, Result};
use crate::session::SessionOptions;

pub use env::EnvConfig;
pub use file::FileConfig;

/// Read buffer size for the local input relay.
pub const INPUT_BUFFER_SIZE: usize = 1024;

/// Read buffer size for the pty output relay.
pub const OUTPUT_BUFFER_SIZE: usize = 4096;

/// How long `wait` lets the output relay drain after the shell exits.
pub const EXIT_DRAIN_GRACE: Duration = Duration::from_millis(100);

/// Environment variable holding the tracing filter.
pub const LOG_ENV_VAR: &str = "CMDPLAY_LOG";

/// Log filter used when nothing else is configured.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Log filter used with `--verbose`.
pub const VERBOSE_LOG_FILTER: &str = "debug";

/// The login shell variable consulted last when resolving the shell.
pub const SHELL_ENV_VAR: &str = "SHELL";

/// Message shown when no shell can be resolved.
pub const SHELL_NOT_FOUND: &str = "$SHELL not found, use -s flag to specify shell to use";

/// Resolved settings for one record or play run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionConfig {
    /// Shell to spawn.
    pub shell: Option<String>,

    /// `TERM` value for the shell; inherited when unset.
    pub term: Option<String>,

    /// Tracing filter directive.
    pub log: Option<String>,
}

impl SessionConfig {
    /// Merge the configuration layers.
    ///
    /// The shell is taken from `cli_shell`, then `CMDPLAY_SHELL`, then the
    /// file, then `$SHELL`. Empty values count as unset.
    #[must_use]
    pub fn resolve(cli_shell: Option<String>, env: &EnvConfig, file: &FileConfig) -> Self {
        let shell = non_empty(cli_shell)
            .or_else(|| non_empty(env.get("shell")))
            .or_else(|| non_empty(file.shell.clone()))
            .or_else(|| non_empty(env.raw(SHELL_ENV_VAR)));

        Self {
            shell,
            term: non_empty(env.get("term")).or_else(|| non_empty(file.term.clone())),
            log: non_empty(env.raw(LOG_ENV_VAR)).or_else(|| non_empty(file.log.clone())),
        }
    }

    /// The shell to spawn.
    ///
    /// # Errors
    ///
    /// Returns [`CmdplayError::Config`] if no shell was resolved.
    pub fn shell(&self) -> Result<&str> {
        self.shell
            .as_deref()
            .ok_or_else(|| CmdplayError::config(SHELL_NOT_FOUND))
    }

    /// The tracing filter to install, given the `--verbose` flag.
    #[must_use]
    pub fn log_filter(&self, verbose: bool) -> &str {
        match (&self.log, verbose) {
            (Some(filter), _) => filter.as_str(),
            (None, true) => VERBOSE_LOG_FILTER,
            (None, false) => DEFAULT_LOG_FILTER,
        }
    }

    /// Session options carrying this configuration.
    #[must_use]
    pub fn session_options(&self) -> SessionOptions {
        let options = SessionOptions::new();
        match &self.term {
            Some(term) => options.env("TERM", term),
            None => options,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> EnvConfig {
        EnvConfig::isolated()
    }

    #[test]
    fn cli_shell_wins() {
        let env = env()
            .with_var("CMDPLAY_SHELL", "/bin/env-shell")
            .with_var("SHELL", "/bin/login-shell");
        let file = FileConfig {
            shell: Some("/bin/file-shell".into()),
            ..FileConfig::default()
        };

        let config = SessionConfig::resolve(Some("/bin/cli".into()), &env, &file);
        assert_eq!(config.shell().unwrap(), "/bin/cli");
    }

    #[test]
    fn env_beats_file_beats_login_shell() {
        let file = FileConfig {
            shell: Some("/bin/file-shell".into()),
            ..FileConfig::default()
        };
        let login = env().with_var("SHELL", "/bin/login-shell");

        let config = SessionConfig::resolve(None, &login, &file);
        assert_eq!(config.shell().unwrap(), "/bin/file-shell");

        let prefixed = login.with_var("CMDPLAY_SHELL", "/bin/env-shell");
        let config = SessionConfig::resolve(None, &prefixed, &file);
        assert_eq!(config.shell().unwrap(), "/bin/env-shell");

        let login = env().with_var("SHELL", "/bin/zsh");
        let config = SessionConfig::resolve(None, &login, &FileConfig::default());
        assert_eq!(config.shell().unwrap(), "/bin/zsh");
    }

    #[test]
    fn missing_shell_is_a_config_error() {
        let blank = env().with_var("SHELL", "");
        let config = SessionConfig::resolve(None, &blank, &FileConfig::default());
        let err = config.shell().unwrap_err();
        assert!(matches!(err, CmdplayError::Config { .. }));
        assert!(err.to_string().contains(SHELL_NOT_FOUND));
    }

    #[test]
    fn log_filter_precedence() {
        let config = SessionConfig::default();
        assert_eq!(config.log_filter(false), DEFAULT_LOG_FILTER);
        assert_eq!(config.log_filter(true), VERBOSE_LOG_FILTER);

        let config = SessionConfig {
            log: Some("cmdplay=trace".into()),
            ..SessionConfig::default()
        };
        assert_eq!(config.log_filter(true), "cmdplay=trace");
    }

    #[test]
    fn term_comes_from_env_or_file() {
        let file = FileConfig {
            term: Some("screen".into()),
            ..FileConfig::default()
        };
        assert_eq!(
            SessionConfig::resolve(None, &env(), &file).term.as_deref(),
            Some("screen")
        );

        let env = env().with_var("CMDPLAY_TERM", "vt100");
        assert_eq!(
            SessionConfig::resolve(None, &env, &file).term.as_deref(),
            Some("vt100")
        );
    }
}
