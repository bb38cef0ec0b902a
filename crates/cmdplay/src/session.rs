//! Shell sessions on a pseudo-terminal.
//!
//! [`PtySession`] spawns a shell under a pty and relays bytes between it and
//! the local terminal. Every byte typed locally passes through the
//! registered [`InputObserver`]s before it reaches the shell, which is how
//! recording taps the input stream. Bytes written to the session itself go
//! straight to the shell and are never observed, which is how playback
//! types into it.
//!
//! # Example
//!
//! ```ignore
//! use cmdplay::session::{PtySession, SessionOptions};
//!
//! let mut session = PtySession::spawn("/bin/bash", SessionOptions::new()).await?;
//! session.on_input(|key| eprintln!("typed {key}"))?;
//! session.start()?;
//! let status = session.wait().await?;
//! ```

mod driver;
mod observer;

pub use driver::{InputRelay, PtySession, SessionDriver, SessionOptions};
pub use observer::{InputObserver, ObservedReader, ObserverChain};
