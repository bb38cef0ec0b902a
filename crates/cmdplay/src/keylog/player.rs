//! Timed replay of a captured session.

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::{CmdplayError, Result};

use super::event::EventLog;

/// Replay `events` into `destination`, one byte per event.
///
/// Before each byte the player sleeps for that event's recorded delay, so
/// event *i* is written no earlier than the sum of delays 1..=i after the
/// call starts. Each byte is flushed on its own. The first failed write or
/// flush ends the replay with [`CmdplayError::Write`].
pub async fn play_events<W>(events: &EventLog, destination: &mut W) -> Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    tracing::debug!(
        events = events.len(),
        duration = ?events.total_delay(),
        "replay starting"
    );

    for (index, event) in events.iter().enumerate() {
        if !event.delay.is_zero() {
            tokio::time::sleep(event.delay).await;
        }

        destination
            .write_all(&[event.key])
            .await
            .map_err(CmdplayError::Write)?;
        destination.flush().await.map_err(CmdplayError::Write)?;

        tracing::trace!(index, key = event.key, "replayed key");
    }

    tracing::debug!("replay finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keylog::event::InputEvent;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn writes_every_key_in_order() {
        let log: EventLog = b"ls\r"
            .iter()
            .map(|&key| InputEvent::new(key, Duration::from_millis(10)))
            .collect();

        let mut out: Vec<u8> = Vec::new();
        play_events(&log, &mut out).await.unwrap();

        assert_eq!(out, b"ls\r");
    }

    #[tokio::test(start_paused = true)]
    async fn sleeps_for_the_total_delay() {
        let log: EventLog = vec![
            InputEvent::new(b'a', Duration::ZERO),
            InputEvent::new(b'b', Duration::from_secs(2)),
            InputEvent::new(b'c', Duration::from_millis(500)),
        ]
        .into();

        let start = tokio::time::Instant::now();
        let mut out: Vec<u8> = Vec::new();
        play_events(&log, &mut out).await.unwrap();

        assert!(start.elapsed() >= Duration::from_millis(2500));
    }

    #[tokio::test]
    async fn empty_log_writes_nothing() {
        let mut out: Vec<u8> = Vec::new();
        play_events(&EventLog::new(), &mut out).await.unwrap();
        assert!(out.is_empty());
    }
}
