//! cmdplay: record terminal keystrokes and replay them into a shell
//!
//! This crate captures the bytes typed into an interactive shell together
//! with the time between them, saves them to a plain text file, and later
//! types them back into a fresh shell with the same cadence. It is meant
//! for demos, tutorials and reproducing bugs.
//!
//! # Features
//!
//! - **Keystroke log** with nanosecond inter-key delays ([`keylog`])
//! - **Pty session driver** with an input tap and window-size sync
//!   ([`session`], backed by `cmdplay-pty`)
//! - **Raw-mode guard** that restores the terminal on every exit path
//!   ([`terminal`])
//! - **Layered configuration** from flags, `CMDPLAY_*` variables and a
//!   TOML file ([`config`])
//!
//! # Example
//!
//! ```ignore
//! use cmdplay::app::{self, Mode};
//! use cmdplay::session::SessionOptions;
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> cmdplay::Result<()> {
//!     let path = Path::new("demo.rec");
//!     let mut stdout = std::io::stdout();
//!     app::run(Mode::Record, "/bin/bash", path, SessionOptions::new(), &mut stdout).await?;
//!     app::run(Mode::Play, "/bin/bash", path, SessionOptions::new(), &mut stdout).await
//! }
//! ```

pub mod app;
pub mod config;
pub mod error;
pub mod keylog;
pub mod session;
pub mod terminal;

pub use app::Mode;
pub use cmdplay_pty::ExitStatus;
pub use config::{EnvConfig, FileConfig, SessionConfig};
pub use error::{CmdplayError, DecodeReason, Result};
pub use keylog::{EventLog, EventRecorder, InputEvent, Recorder};
pub use session::{InputObserver, InputRelay, PtySession, SessionDriver, SessionOptions};
pub use terminal::RawModeGuard;
