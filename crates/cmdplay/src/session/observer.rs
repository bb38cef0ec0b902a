//! Input observers and the read path that notifies them.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use tokio::io::{AsyncRead, ReadBuf};

/// Receives every byte read from the local input before it reaches the
/// shell.
///
/// Any `FnMut(u8) + Send` closure is an observer.
pub trait InputObserver: Send {
    /// Called once per input byte.
    fn observe(&mut self, key: u8);
}

impl<F> InputObserver for F
where
    F: FnMut(u8) + Send,
{
    fn observe(&mut self, key: u8) {
        self(key);
    }
}

/// Observers in registration order.
#[derive(Default)]
pub struct ObserverChain {
    observers: Vec<Box<dyn InputObserver>>,
}

impl ObserverChain {
    /// Create an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an observer. It runs after every observer already present.
    pub fn push(&mut self, observer: Box<dyn InputObserver>) {
        self.observers.push(observer);
    }

    /// Number of observers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Whether the chain is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Hand each byte of `data` to every observer, byte by byte.
    pub fn notify(&mut self, data: &[u8]) {
        for &key in data {
            for observer in &mut self.observers {
                observer.observe(key);
            }
        }
    }
}

impl std::fmt::Debug for ObserverChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverChain")
            .field("observers", &self.observers.len())
            .finish()
    }
}

/// An `AsyncRead` adapter that shows every byte it yields to an
/// [`ObserverChain`].
///
/// Observers run inside `poll_read`, so by the time a caller can forward
/// the bytes they have all been observed.
#[derive(Debug)]
pub struct ObservedReader<R> {
    inner: R,
    observers: ObserverChain,
}

impl<R> ObservedReader<R> {
    /// Wrap `inner`.
    pub const fn new(inner: R, observers: ObserverChain) -> Self {
        Self { inner, observers }
    }

    /// Unwrap the reader, dropping the observers.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for ObservedReader<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let before = buf.filled().len();

        ready!(Pin::new(&mut this.inner).poll_read(cx, buf))?;

        this.observers.notify(&buf.filled()[before..]);
        Poll::Ready(Ok(()))
    }
}
