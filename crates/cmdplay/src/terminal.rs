//! Raw mode for the local terminal.

use std::io::IsTerminal;

use crossterm::terminal;

use crate::error::{CmdplayError, Result};

/// Keeps the local terminal in raw mode while alive.
///
/// Dropping the guard restores the previous mode, on every exit path.
#[derive(Debug)]
pub struct RawModeGuard {
    _private: (),
}

impl RawModeGuard {
    /// Switch the terminal to raw mode.
    ///
    /// # Errors
    ///
    /// Returns [`CmdplayError::Terminal`] if raw mode cannot be enabled.
    pub fn acquire() -> Result<Self> {
        terminal::enable_raw_mode()
            .map_err(|e| CmdplayError::terminal(format!("failed to enable raw mode: {e}")))?;
        tracing::debug!("raw mode enabled");
        Ok(Self { _private: () })
    }

    /// Like [`acquire`](Self::acquire), but returns `None` without touching
    /// anything when stdin is not a terminal.
    ///
    /// # Errors
    ///
    /// Returns [`CmdplayError::Terminal`] if stdin is a terminal and raw mode
    /// cannot be enabled.
    pub fn acquire_if_terminal() -> Result<Option<Self>> {
        if std::io::stdin().is_terminal() {
            Self::acquire().map(Some)
        } else {
            tracing::debug!("stdin is not a terminal, leaving its mode alone");
            Ok(None)
        }
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(e) = terminal::disable_raw_mode() {
            tracing::warn!(error = %e, "failed to restore terminal mode");
        } else {
            tracing::debug!("raw mode disabled");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_terminal_stdin_is_left_alone() {
        if std::io::stdin().is_terminal() {
            return;
        }
        assert!(RawModeGuard::acquire_if_terminal().unwrap().is_none());
    }
}
