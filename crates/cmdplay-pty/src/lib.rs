//! cmdplay-pty: POSIX pseudo-terminal plumbing
//!
//! This crate allocates a pty pair, spawns a program on the follower side
//! as its controlling terminal, and gives async access to the controller
//! side. It also carries the two terminal-geometry helpers a relaying
//! session needs: querying the host terminal's window size and copying it
//! onto the pty, plus a SIGWINCH notification stream.
//!
//! # Quick Start
//!
//! ```ignore
//! use cmdplay_pty::{NativePtySystem, PtyConfig, PtySystem};
//! use tokio::io::{AsyncReadExt, AsyncWriteExt};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PtyConfig::default();
//!     let (mut master, mut child) = NativePtySystem::spawn("/bin/sh", ["-i"], &config).await?;
//!
//!     master.write_all(b"echo hello\n").await?;
//!
//!     let mut buf = [0u8; 1024];
//!     let n = master.read(&mut buf).await?;
//!     println!("{}", String::from_utf8_lossy(&buf[..n]));
//!
//!     child.kill()?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod traits;

#[cfg(unix)]
pub mod unix;

pub use config::{PtyConfig, PtyConfigBuilder, WindowSize};
pub use error::{PtyError, Result};
pub use traits::{ExitStatus, PtyChild, PtyMaster, PtySystem};

#[cfg(unix)]
pub use unix::{
    NativePtySystem, ResizeSignals, UnixPtyChild, UnixPtyMaster, UnixPtySystem,
    terminal_window_size,
};
