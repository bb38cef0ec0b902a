//! The seams between the pty backend and its users.
//!
//! A [`PtySystem`] spawns a program and hands back both ends: a
//! [`PtyMaster`] to talk to its terminal and a [`PtyChild`] to reap or
//! signal it.

use std::future::Future;
#[cfg(unix)]
use std::os::unix::io::AsFd;
use std::pin::Pin;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::config::{PtyConfig, WindowSize};
#[cfg(unix)]
use crate::error::PtyError;
use crate::error::Result;

/// Controller end of a pty.
///
/// Reads return the program's terminal output. Writes arrive as typed input.
pub trait PtyMaster: AsyncRead + AsyncWrite + Send + Sync + Unpin {
    /// Apply `size`. The foreground process group gets SIGWINCH.
    fn resize(&self, size: WindowSize) -> Result<()>;

    /// Copy the geometry of the terminal behind `from` onto this pty and
    /// return it.
    ///
    /// Fails with [`PtyError::Geometry`], leaving the pty untouched, when
    /// `from` is not a terminal or reports zero rows or columns.
    #[cfg(unix)]
    fn inherit_window_size(&self, from: impl AsFd) -> Result<WindowSize>
    where
        Self: Sized,
    {
        let size = crate::unix::terminal_window_size(from)?;
        if size.is_empty() {
            return Err(PtyError::Geometry(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "terminal reports an empty window",
            )));
        }
        self.resize(size)?;
        Ok(size)
    }
}

/// The program running on the follower end.
pub trait PtyChild: Send + Sync {
    /// OS process id.
    fn pid(&self) -> u32;

    /// Reap the program. Repeated calls return the cached status.
    fn wait(&mut self) -> Pin<Box<dyn Future<Output = Result<ExitStatus>> + Send + '_>>;

    /// SIGKILL the program. A no-op once it is gone.
    fn kill(&mut self) -> Result<()>;
}

/// How the program ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// Called `exit` with this code.
    Exited(i32),

    /// Killed by this signal number.
    Signaled(i32),
}

impl ExitStatus {
    /// Exit code zero.
    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self, Self::Exited(0))
    }

    /// The exit code, unless a signal ended the program.
    #[must_use]
    pub const fn code(&self) -> Option<i32> {
        match self {
            Self::Exited(code) => Some(*code),
            Self::Signaled(_) => None,
        }
    }

}

impl std::fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exited(code) => write!(f, "exited with code {code}"),
            Self::Signaled(sig) => write!(f, "terminated by signal {sig}"),
        }
    }
}

/// Platform backend that allocates a pty and starts a program on it.
pub trait PtySystem: Send + Sync {
    /// Controller handle.
    type Master: PtyMaster;
    /// Program handle.
    type Child: PtyChild;

    /// Spawn `program` with `args` on the follower side of a new pty.
    fn spawn<S, I>(
        program: S,
        args: I,
        config: &PtyConfig,
    ) -> impl Future<Output = Result<(Self::Master, Self::Child)>> + Send
    where
        S: AsRef<std::ffi::OsStr> + Send,
        I: IntoIterator + Send,
        I::Item: AsRef<std::ffi::OsStr>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_exit_is_success() {
        assert!(ExitStatus::Exited(0).success());
        assert!(!ExitStatus::Exited(2).success());
        assert_eq!(ExitStatus::Exited(2).code(), Some(2));
        assert_eq!(ExitStatus::Exited(2).to_string(), "exited with code 2");
    }

    #[cfg(unix)]
    #[test]
    fn signal_death_has_no_code() {
        let status = ExitStatus::Signaled(libc::SIGKILL);
        assert!(!status.success());
        assert_eq!(status.code(), None);
        assert_eq!(status.to_string(), format!("terminated by signal {}", libc::SIGKILL));
    }
}
