//! Error types for cmdplay.
//!
//! Every fatal condition of a record or play run surfaces as a
//! [`CmdplayError`]. Geometry failures and non-zero shell exits are not
//! errors and never appear here.

use cmdplay_pty::PtyError;
use thiserror::Error;

/// The main error type for cmdplay operations.
#[derive(Debug, Error)]
pub enum CmdplayError {
    /// The pty could not be allocated or the shell could not be started.
    #[error("failed to spawn {shell}: {source}")]
    Spawn {
        /// The shell that was being started.
        shell: String,
        /// The underlying pty error.
        #[source]
        source: PtyError,
    },

    /// A session file record could not be parsed.
    #[error("error decoding line {line}: {reason}")]
    Decode {
        /// 1-based line number of the malformed record.
        line: usize,
        /// What was wrong with it.
        reason: DecodeReason,
    },

    /// Writing replayed or saved events failed.
    #[error("write failed: {0}")]
    Write(#[source] std::io::Error),

    /// The local terminal could not be switched to raw mode.
    #[error("terminal error: {message}")]
    Terminal {
        /// Description of the failure.
        message: String,
    },

    /// `start` was called twice, or an observer was registered after start.
    #[error("session already started")]
    AlreadyStarted,

    /// An operation that needs a running session was called before `start`.
    #[error("session not started")]
    NotStarted,

    /// Waiting on or signalling the child failed.
    #[error("child process error: {0}")]
    Pty(#[from] PtyError),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An I/O error occurred with additional context.
    #[error("{context}: {source}")]
    IoWithContext {
        /// What operation was being performed.
        context: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },
}

/// Why a session file record was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeReason {
    /// The record did not have exactly two fields.
    #[error("expected 2 fields, found {found}")]
    FieldCount {
        /// Number of whitespace-separated fields on the line.
        found: usize,
    },

    /// The key field is not a decimal integer in 0..=255.
    #[error("invalid key {0:?}")]
    InvalidKey(String),

    /// The delay field is not a non-negative decimal integer.
    #[error("invalid delay {0:?}")]
    InvalidDelay(String),
}

/// Result type alias for cmdplay operations.
pub type Result<T> = std::result::Result<T, CmdplayError>;

impl CmdplayError {
    /// Create a decode error for `line`.
    #[must_use]
    pub const fn decode(line: usize, reason: DecodeReason) -> Self {
        Self::Decode { line, reason }
    }

    /// Create a terminal error.
    pub fn terminal(message: impl Into<String>) -> Self {
        Self::Terminal {
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an I/O error with context.
    pub fn io_context(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::IoWithContext {
            context: context.into(),
            source,
        }
    }

    /// Wrap a spawn failure for `shell`.
    pub fn spawn(shell: impl Into<String>, source: PtyError) -> Self {
        Self::Spawn {
            shell: shell.into(),
            source,
        }
    }

    /// Check if this is a decode error.
    #[must_use]
    pub const fn is_decode(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }
}
