//! SIGWINCH notifications for keeping a pty in step with its host terminal.

use std::io;

use futures::StreamExt;
use signal_hook::consts::signal::SIGWINCH;
use signal_hook_tokio::{Handle, Signals};

/// An async stream of host window-size changes.
///
/// Signals that arrive while nobody is polling are merged by the kernel and
/// by signal-hook, so a burst of resizes may yield a single notification.
/// Consumers should re-query the current size on every notification rather
/// than count them.
pub struct ResizeSignals {
    signals: Signals,
    handle: Handle,
}

impl std::fmt::Debug for ResizeSignals {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResizeSignals").finish_non_exhaustive()
    }
}

impl ResizeSignals {
    /// Register for SIGWINCH. Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the signal handler cannot be installed.
    pub fn new() -> io::Result<Self> {
        let signals = Signals::new([SIGWINCH])?;
        let handle = signals.handle();
        Ok(Self { signals, handle })
    }

    /// Wait for the next window-size change.
    ///
    /// Returns `None` once the stream has been closed.
    pub async fn recv(&mut self) -> Option<()> {
        self.signals.next().await.map(|_| ())
    }
}

impl Drop for ResizeSignals {
    fn drop(&mut self) {
        self.handle.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn receives_raised_sigwinch() {
        let mut signals = ResizeSignals::new().unwrap();

        signal_hook::low_level::raise(SIGWINCH).unwrap();

        let got = tokio::time::timeout(std::time::Duration::from_secs(5), signals.recv()).await;
        assert_eq!(got.ok().flatten(), Some(()));
    }
}
