//! Errors raised by pty allocation, spawning and control.

use std::io;

/// Everything that can go wrong below the session layer.
#[derive(Debug, thiserror::Error)]
pub enum PtyError {
    /// Opening, granting or unlocking the pty pair failed.
    #[error("cannot allocate pty: {0}")]
    Create(#[source] io::Error),

    /// The program could not be started on the pty.
    #[error("cannot start program: {0}")]
    Spawn(#[source] io::Error),

    /// A window size could not be read, usually because the fd is not a tty.
    #[error("cannot read window size: {0}")]
    Geometry(#[source] io::Error),

    /// Applying a window size to the pty failed.
    #[error("cannot resize pty: {0}")]
    Resize(#[source] io::Error),

    /// Delivering a signal to the program failed.
    #[error("cannot signal program: {0}")]
    Signal(#[source] io::Error),

    /// Reaping the program failed.
    #[error("cannot reap program: {0}")]
    Wait(#[source] io::Error),
}

/// Result alias for this crate.
pub type Result<T> = std::result::Result<T, PtyError>;

/// Errno as a `std::io::Error` with the same OS code.
#[cfg(unix)]
pub(crate) fn errno_to_io(errno: rustix::io::Errno) -> io::Error {
    io::Error::from_raw_os_error(errno.raw_os_error())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_the_cause() {
        let err = PtyError::Resize(io::Error::from(io::ErrorKind::InvalidInput));
        assert!(err.to_string().starts_with("cannot resize pty: "));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[cfg(unix)]
    #[test]
    fn errno_keeps_os_code() {
        let err = errno_to_io(rustix::io::Errno::NOTTY);
        assert_eq!(err.raw_os_error(), Some(libc::ENOTTY));
    }
}
