//! Keystroke capture, persistence and timed replay.
//!
//! An [`EventRecorder`] is fed one byte at a time while a session runs. It
//! stamps every byte with the time since the previous one. The resulting
//! [`EventLog`] can be saved in a plain line format, loaded back, and
//! replayed into any `AsyncWrite` with the original cadence:
//!
//! ```ignore
//! use cmdplay::keylog::{EventRecorder, Recorder};
//!
//! let mut recorder = EventRecorder::new();
//! recorder.input(b'l');
//! recorder.input(b's');
//! recorder.save(std::fs::File::create("demo.rec")?)?;
//!
//! let mut replay = EventRecorder::new();
//! replay.load(std::io::BufReader::new(std::fs::File::open("demo.rec")?))?;
//! replay.play(&mut session).await?;
//! ```

pub mod event;
pub mod format;
pub mod player;
pub mod recorder;

pub use event::{EventLog, InputEvent};
pub use format::{read_events, write_events};
pub use player::play_events;
pub use recorder::{EventRecorder, Recorder};
