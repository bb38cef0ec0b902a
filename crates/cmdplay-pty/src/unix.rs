//! Unix pty implementation.
//!
//! - pty pair allocation via openpt/grantpt/unlockpt
//! - async controller I/O through tokio's `AsyncFd`
//! - child spawning with a new session and the pty as controlling terminal
//! - window-size queries and a SIGWINCH stream for geometry propagation
//!
//! # Example
//!
//! ```ignore
//! use cmdplay_pty::unix::UnixPtySystem;
//! use cmdplay_pty::{PtyConfig, PtyMaster, PtySystem};
//!
//! let config = PtyConfig::default();
//! let (master, child) = UnixPtySystem::spawn("/bin/bash", ["-i"], &config).await?;
//! master.inherit_window_size(std::io::stdin()).ok();
//! ```

mod child;
mod pty;
mod signals;

use std::ffi::OsStr;

pub use child::{UnixPtyChild, spawn_child};
pub use pty::{UnixPtyMaster, open_slave, terminal_window_size};
pub use signals::ResizeSignals;

use crate::config::PtyConfig;
use crate::error::Result;
use crate::traits::PtySystem;

/// Unix pty system.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnixPtySystem;

impl PtySystem for UnixPtySystem {
    type Master = UnixPtyMaster;
    type Child = UnixPtyChild;

    async fn spawn<S, I>(
        program: S,
        args: I,
        config: &PtyConfig,
    ) -> Result<(Self::Master, Self::Child)>
    where
        S: AsRef<OsStr> + Send,
        I: IntoIterator + Send,
        I::Item: AsRef<OsStr>,
    {
        let (master, slave_path) = UnixPtyMaster::open()?;
        master.set_window_size(config.window_size)?;

        let slave_fd = open_slave(&slave_path)?;
        tracing::debug!(
            program = %program.as_ref().to_string_lossy(),
            slave = %slave_path,
            "spawning child on pty"
        );
        let child = spawn_child(slave_fd, program, args, config).await?;

        Ok((master, child))
    }
}

/// The pty system for the current platform.
pub type NativePtySystem = UnixPtySystem;
