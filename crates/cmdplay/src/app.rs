//! The record and play flows.
//!
//! Both flows own the raw-mode guard for exactly the time the shell runs,
//! so the terminal is restored before any confirmation or error reaches
//! the user.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use cmdplay_pty::ExitStatus;

use crate::error::{CmdplayError, Result};
use crate::keylog::{EventLog, EventRecorder, Recorder};
use crate::session::{InputRelay, PtySession, SessionDriver, SessionOptions};
use crate::terminal::RawModeGuard;

/// Printed before a recording starts.
pub const RECORD_STARTED: &str = "Recording started. Exit shell session to stop.";

/// Printed after a replay and the shell it drove have finished.
pub const PLAY_COMPLETE: &str = "Play complete";

/// Which flow to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Capture keystrokes into the session file.
    Record,
    /// Replay the session file into a new shell.
    Play,
}

/// Run `mode` against the session file at `path`.
///
/// # Errors
///
/// See [`record`] and [`play`].
pub async fn run<O: Write>(
    mode: Mode,
    shell: &str,
    path: &Path,
    options: SessionOptions,
    messages: &mut O,
) -> Result<()> {
    match mode {
        Mode::Record => record(shell, path, options, messages).await.map(drop),
        Mode::Play => play(shell, path, options, messages).await,
    }
}

/// Record a shell session into `path`.
///
/// The file is created or truncated before the shell starts. Returns the
/// captured events once they are saved.
///
/// # Errors
///
/// Fails if the file cannot be created, the shell cannot be spawned, raw
/// mode cannot be entered, or the events cannot be written.
pub async fn record<O: Write>(
    shell: &str,
    path: &Path,
    options: SessionOptions,
    messages: &mut O,
) -> Result<EventLog> {
    let file = File::create(path)
        .map_err(|e| CmdplayError::io_context(format!("creating {}", path.display()), e))?;
    writeln!(messages, "{RECORD_STARTED}")?;

    let recorder = Arc::new(Mutex::new(EventRecorder::new()));
    let mut session = PtySession::spawn(shell, options).await?;
    attach_recorder(&mut session, &recorder)?;

    {
        let _raw = enter_raw_mode(&mut session)?;
        let status = drive(&mut session).await?;
        tracing::debug!(%status, "recording finished");

        let recorder = lock(&recorder);
        recorder.save(BufWriter::new(file))?;
    }
    writeln!(messages, "Session saved to {}", path.display())?;

    Ok(std::mem::take(&mut *lock(&recorder)).into_log())
}

/// Replay the session at `path` into a new shell.
///
/// The file is fully loaded before the shell is spawned. Local input is
/// held back until the replay ends, then relayed until the shell exits.
///
/// # Errors
///
/// Fails if the file cannot be read or parsed, the shell cannot be
/// spawned, raw mode cannot be entered, or a replayed byte cannot be
/// written. A failed replay kills the shell.
pub async fn play<O: Write>(
    shell: &str,
    path: &Path,
    options: SessionOptions,
    messages: &mut O,
) -> Result<()> {
    let file = File::open(path)
        .map_err(|e| CmdplayError::io_context(format!("opening {}", path.display()), e))?;
    let mut recorder = EventRecorder::new();
    recorder.load(BufReader::new(file))?;

    writeln!(messages, "Attempting to play {}", path.display())?;

    let options = options.input_relay(InputRelay::Deferred);
    let mut session = PtySession::spawn(shell, options).await?;

    {
        let _raw = enter_raw_mode(&mut session)?;
        session.start()?;

        if let Err(e) = recorder.play(&mut session).await {
            stop_quietly(&mut session);
            return Err(e);
        }

        session.resume_input()?;
        let status = session.wait().await?;
        tracing::debug!(%status, "playback finished");
    }
    writeln!(messages, "{PLAY_COMPLETE}")?;

    Ok(())
}

/// Feed every observed input byte of `session` into `recorder`.
///
/// # Errors
///
/// Returns [`CmdplayError::AlreadyStarted`] if the session is running.
pub fn attach_recorder<D: SessionDriver>(
    session: &mut D,
    recorder: &Arc<Mutex<EventRecorder>>,
) -> Result<()> {
    let recorder = Arc::clone(recorder);
    session.register_input_observer(Box::new(move |key: u8| lock(&recorder).input(key)))
}

/// Start `session` and wait for its shell to exit.
///
/// # Errors
///
/// Fails if the session cannot be started or the shell cannot be reaped.
pub async fn drive<D: SessionDriver>(session: &mut D) -> Result<ExitStatus> {
    session.start()?;
    session.wait().await
}

fn enter_raw_mode<D: SessionDriver>(session: &mut D) -> Result<Option<RawModeGuard>> {
    RawModeGuard::acquire_if_terminal().inspect_err(|_| stop_quietly(session))
}

fn stop_quietly<D: SessionDriver>(session: &mut D) {
    if let Err(e) = session.stop() {
        tracing::warn!(error = %e, "failed to stop shell");
    }
}

fn lock(recorder: &Mutex<EventRecorder>) -> MutexGuard<'_, EventRecorder> {
    recorder.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn play_rejects_a_malformed_file_before_spawning() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.rec");
        std::fs::write(&path, "97 0\n97 x\n").unwrap();

        let mut messages = Vec::new();
        let err = play("/nonexistent/shell", &path, SessionOptions::new(), &mut messages)
            .await
            .unwrap_err();

        assert!(err.is_decode());
        assert!(messages.is_empty());
    }

    #[tokio::test]
    async fn play_missing_file() {
        let mut messages = Vec::new();
        let err = play(
            "/bin/sh",
            Path::new("/nonexistent/session.rec"),
            SessionOptions::new(),
            &mut messages,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, CmdplayError::IoWithContext { .. }));
    }

    #[tokio::test]
    async fn record_truncates_before_spawn_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.rec");
        std::fs::write(&path, "97 0\n").unwrap();

        let mut messages = Vec::new();
        let err = record("/nonexistent/shell", &path, SessionOptions::new(), &mut messages)
            .await
            .unwrap_err();

        assert!(matches!(err, CmdplayError::Spawn { .. }));
        assert_eq!(std::fs::read(&path).unwrap(), b"");
        assert_eq!(String::from_utf8(messages).unwrap(), format!("{RECORD_STARTED}\n"));
    }
}
