//! Keystroke capture.

use std::future::Future;
use std::io::{BufRead, Write};
use std::time::{Duration, Instant};

use tokio::io::AsyncWrite;

use crate::error::Result;

use super::event::{EventLog, InputEvent};
use super::format::{read_events, write_events};
use super::player::play_events;

/// Capture, persist and replay a timed sequence of input bytes.
pub trait Recorder {
    /// Record one byte. Its delay is the time since the previous call, or
    /// zero for the first call.
    fn input(&mut self, key: u8);

    /// Replay the recorded bytes into `destination` with their original
    /// timing.
    fn play<W>(&self, destination: &mut W) -> impl Future<Output = Result<()>> + Send
    where
        W: AsyncWrite + Unpin + Send;

    /// Write the session in the line format of [`super::format`].
    fn save<W: Write>(&self, destination: W) -> Result<()>;

    /// Replace the session with one read from `source`.
    ///
    /// On error the current session is left untouched.
    fn load<R: BufRead>(&mut self, source: R) -> Result<()>;
}

/// The in-memory [`Recorder`].
#[derive(Debug, Clone, Default)]
pub struct EventRecorder {
    log: EventLog,
    last: Option<Instant>,
}

impl EventRecorder {
    /// Create an empty recorder.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            log: EventLog::new(),
            last: None,
        }
    }

    /// Record `key` as observed at `at`.
    ///
    /// A timestamp earlier than the previous one yields a zero delay.
    pub fn input_at(&mut self, key: u8, at: Instant) {
        let delay = self
            .last
            .map_or(Duration::ZERO, |last| at.saturating_duration_since(last));
        self.last = Some(at);
        self.log.push(InputEvent::new(key, delay));
    }

    /// The recorded events.
    #[must_use]
    pub const fn log(&self) -> &EventLog {
        &self.log
    }

    /// Consume the recorder, returning its events.
    #[must_use]
    pub fn into_log(self) -> EventLog {
        self.log
    }
}

impl From<EventLog> for EventRecorder {
    fn from(log: EventLog) -> Self {
        Self { log, last: None }
    }
}

impl Recorder for EventRecorder {
    fn input(&mut self, key: u8) {
        self.input_at(key, Instant::now());
    }

    async fn play<W>(&self, destination: &mut W) -> Result<()>
    where
        W: AsyncWrite + Unpin + Send,
    {
        play_events(&self.log, destination).await
    }

    fn save<W: Write>(&self, destination: W) -> Result<()> {
        write_events(&self.log, destination)?;
        tracing::info!(events = self.log.len(), "session saved");
        Ok(())
    }

    fn load<R: BufRead>(&mut self, source: R) -> Result<()> {
        let log = read_events(source)?;
        tracing::info!(
            events = log.len(),
            duration = ?log.total_delay(),
            "session loaded"
        );
        self.log = log;
        self.last = None;
        Ok(())
    }
}
