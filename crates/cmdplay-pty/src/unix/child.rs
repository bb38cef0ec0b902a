//! Child process spawning and lifecycle on the follower side of a pty.

use std::ffi::OsStr;
use std::future::Future;
use std::io;
use std::os::unix::io::{AsRawFd, OwnedFd};
use std::pin::Pin;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rustix::process::{Pid, Signal, kill_process};
use tokio::process::{Child as TokioChild, Command};
use tokio::sync::Mutex;

use crate::config::PtyConfig;
use crate::error::{PtyError, Result, errno_to_io};
use crate::traits::{ExitStatus, PtyChild};

/// Unix child process handle.
///
/// Clones refer to the same process: one clone can sit in [`wait`] while
/// another delivers signals.
///
/// [`wait`]: UnixPtyChild::wait
#[derive(Clone)]
pub struct UnixPtyChild {
    child: Arc<Mutex<TokioChild>>,
    pid: u32,
    running: Arc<AtomicBool>,
    exit_status: Arc<Mutex<Option<ExitStatus>>>,
}

impl std::fmt::Debug for UnixPtyChild {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnixPtyChild")
            .field("pid", &self.pid)
            .field("running", &self.running.load(Ordering::SeqCst))
            .finish()
    }
}

impl UnixPtyChild {
    /// Wrap a freshly spawned tokio child.
    ///
    /// # Errors
    ///
    /// Fails if the child has already been reaped and has no pid.
    pub fn new(child: TokioChild) -> Result<Self> {
        let pid = child.id().ok_or_else(|| {
            PtyError::Spawn(io::Error::new(
                io::ErrorKind::NotFound,
                "child exited before its pid was read",
            ))
        })?;
        Ok(Self {
            child: Arc::new(Mutex::new(child)),
            pid,
            running: Arc::new(AtomicBool::new(true)),
            exit_status: Arc::new(Mutex::new(None)),
        })
    }

    /// Get the process ID.
    #[must_use]
    pub const fn pid(&self) -> u32 {
        self.pid
    }

    /// Check if the process is still running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Wait for the child process to exit.
    pub async fn wait(&mut self) -> Result<ExitStatus> {
        if let Some(status) = *self.exit_status.lock().await {
            return Ok(status);
        }

        let status = self
            .child
            .lock()
            .await
            .wait()
            .await
            .map_err(PtyError::Wait)?;
        let exit_status = convert_exit_status(status);

        self.running.store(false, Ordering::SeqCst);
        *self.exit_status.lock().await = Some(exit_status);
        tracing::debug!(pid = self.pid, status = %exit_status, "child exited");

        Ok(exit_status)
    }

    /// SIGKILL the child. Killing an exited child is a no-op.
    pub fn kill(&mut self) -> Result<()> {
        if !self.is_running() {
            return Ok(());
        }
        let pid = i32::try_from(self.pid).ok().and_then(Pid::from_raw).ok_or_else(|| {
            PtyError::Signal(io::Error::new(io::ErrorKind::InvalidInput, "invalid pid"))
        })?;
        match kill_process(pid, Signal::KILL) {
            Ok(()) => Ok(()),
            // Exited but not yet reaped by `wait`.
            Err(rustix::io::Errno::SRCH) => Ok(()),
            Err(e) => Err(PtyError::Signal(errno_to_io(e))),
        }
    }
}

impl PtyChild for UnixPtyChild {
    fn pid(&self) -> u32 {
        Self::pid(self)
    }

    fn wait(&mut self) -> Pin<Box<dyn Future<Output = Result<ExitStatus>> + Send + '_>> {
        Box::pin(Self::wait(self))
    }

    fn kill(&mut self) -> Result<()> {
        Self::kill(self)
    }
}

fn convert_exit_status(status: std::process::ExitStatus) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;

    if let Some(code) = status.code() {
        ExitStatus::Exited(code)
    } else if let Some(signal) = status.signal() {
        ExitStatus::Signaled(signal)
    } else {
        ExitStatus::Exited(-1)
    }
}

/// Spawn `program` with stdin, stdout and stderr on the follower `slave_fd`.
///
/// The child starts a new session and adopts the pty as its controlling
/// terminal, so job control and Ctrl-C reach it.
pub async fn spawn_child<S, I>(
    slave_fd: OwnedFd,
    program: S,
    args: I,
    config: &PtyConfig,
) -> Result<UnixPtyChild>
where
    S: AsRef<OsStr>,
    I: IntoIterator,
    I::Item: AsRef<OsStr>,
{
    let slave_raw = slave_fd.as_raw_fd();

    let mut cmd = Command::new(program.as_ref());
    cmd.args(args);
    cmd.env_clear();
    cmd.envs(config.effective_env());

    cmd.stdin(Stdio::from(slave_fd.try_clone().map_err(PtyError::Spawn)?));
    cmd.stdout(Stdio::from(slave_fd.try_clone().map_err(PtyError::Spawn)?));
    cmd.stderr(Stdio::from(slave_fd.try_clone().map_err(PtyError::Spawn)?));

    // SAFETY: setsid and ioctl are async-signal-safe, and `slave_raw`
    // stays open in the child because `slave_fd` outlives `spawn`.
    #[allow(unsafe_code)]
    unsafe {
        cmd.pre_exec(move || {
            if libc::setsid() == -1 {
                return Err(io::Error::last_os_error());
            }
            if libc::ioctl(slave_raw, libc::TIOCSCTTY, 0) == -1 {
                return Err(io::Error::last_os_error());
            }
            Ok(())
        });
    }

    let child = cmd.spawn().map_err(PtyError::Spawn)?;
    // The parent's copies of the follower must close so that reads on the
    // controller see the hangup once the child exits.
    drop(cmd);
    drop(slave_fd);

    UnixPtyChild::new(child)
}
