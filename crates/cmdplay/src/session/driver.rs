//! The pty session driver.
//!
//! A [`PtySession`] runs a shell on a fresh pty and, once started, keeps
//! four tasks going until the shell exits:
//!
//! - the resize watcher copies the host window size onto the pty on every
//!   SIGWINCH. The host is stdin unless
//!   [`SessionOptions::geometry_source`] names another terminal.
//! - the output relay copies pty output to the local output
//! - the input relay copies local input to the pty, through the registered
//!   [`InputObserver`]s
//! - the exit watcher waits for the shell and signals completion

use std::future::Future;
use std::io;
use std::os::unix::io::AsFd;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use cmdplay_pty::{
    ExitStatus, NativePtySystem, PtyChild, PtyConfig, PtyError, PtyMaster, PtySystem,
    ResizeSignals, UnixPtyChild, UnixPtyMaster, terminal_window_size,
};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::observer::{InputObserver, ObservedReader, ObserverChain};
use crate::config::{EXIT_DRAIN_GRACE, INPUT_BUFFER_SIZE, OUTPUT_BUFFER_SIZE};
use crate::error::{CmdplayError, Result};

type LocalInput = Box<dyn AsyncRead + Send + Unpin>;
type LocalOutput = Box<dyn AsyncWrite + Send + Unpin>;
type GeometrySource = Arc<dyn AsFd + Send + Sync>;

/// When the local input relay begins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InputRelay {
    /// Relay local input as soon as the session starts.
    #[default]
    Immediate,
    /// Hold local input back until [`PtySession::resume_input`].
    Deferred,
}

/// Options for spawning a [`PtySession`].
pub struct SessionOptions {
    args: Vec<String>,
    env: Vec<(String, String)>,
    input_relay: InputRelay,
    sync_window_size: bool,
    geometry: GeometrySource,
    local_input: Option<LocalInput>,
    local_output: Option<LocalOutput>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            args: Vec::new(),
            env: Vec::new(),
            input_relay: InputRelay::Immediate,
            sync_window_size: true,
            geometry: Arc::new(io::stdin()),
            local_input: None,
            local_output: None,
        }
    }
}

impl std::fmt::Debug for SessionOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionOptions")
            .field("args", &self.args)
            .field("env", &self.env)
            .field("input_relay", &self.input_relay)
            .field("sync_window_size", &self.sync_window_size)
            .field("geometry_fd", &self.geometry.as_fd())
            .field("local_input", &self.local_input.is_some())
            .field("local_output", &self.local_output.is_some())
            .finish()
    }
}

impl SessionOptions {
    /// Default options: no arguments, inherited environment, immediate
    /// input relay, stdin and stdout as the local terminal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a shell argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add shell arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set an environment variable for the shell.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Choose when local input starts flowing.
    #[must_use]
    pub const fn input_relay(mut self, relay: InputRelay) -> Self {
        self.input_relay = relay;
        self
    }

    /// Whether to copy the host window size onto the pty.
    #[must_use]
    pub const fn sync_window_size(mut self, enabled: bool) -> Self {
        self.sync_window_size = enabled;
        self
    }

    /// Take the host window size from `terminal` instead of stdin.
    #[must_use]
    pub fn geometry_source(mut self, terminal: impl AsFd + Send + Sync + 'static) -> Self {
        self.geometry = Arc::new(terminal);
        self
    }

    /// Read local input from `input` instead of stdin.
    #[must_use]
    pub fn local_input(mut self, input: impl AsyncRead + Send + Unpin + 'static) -> Self {
        self.local_input = Some(Box::new(input));
        self
    }

    /// Write shell output to `output` instead of stdout.
    #[must_use]
    pub fn local_output(mut self, output: impl AsyncWrite + Send + Unpin + 'static) -> Self {
        self.local_output = Some(Box::new(output));
        self
    }

    /// Shell arguments.
    #[must_use]
    pub fn shell_args(&self) -> &[String] {
        &self.args
    }

    fn pty_config(&self) -> PtyConfig {
        let mut builder = PtyConfig::builder();
        for (key, value) in &self.env {
            builder = builder.env(key, value);
        }
        if self.sync_window_size {
            match terminal_window_size(self.geometry.as_fd()) {
                Ok(size) if !size.is_empty() => {
                    builder = builder.window_size(size.cols, size.rows);
                }
                _ => tracing::trace!("no host window size, spawning with the default"),
            }
        }
        builder.build()
    }
}

/// The operations the record and play flows need from a session.
pub trait SessionDriver: AsyncWrite + Unpin + Send {
    /// Add an observer for local input. Only allowed before [`start`].
    ///
    /// [`start`]: SessionDriver::start
    fn register_input_observer(&mut self, observer: Box<dyn InputObserver>) -> Result<()>;

    /// Start relaying. Allowed once.
    fn start(&mut self) -> Result<()>;

    /// Wait for the shell to exit.
    fn wait(&mut self) -> impl Future<Output = Result<ExitStatus>> + Send;

    /// Kill the shell.
    fn stop(&mut self) -> Result<()>;
}

/// Handles of the running tasks. Dropping it aborts them.
#[derive(Default)]
struct Tasks {
    exit: Option<JoinHandle<std::result::Result<ExitStatus, PtyError>>>,
    output: Option<JoinHandle<()>>,
    input: Option<JoinHandle<()>>,
    resize: Option<JoinHandle<()>>,
}

impl Tasks {
    fn abort_relays(&mut self) {
        for handle in [self.input.take(), self.resize.take(), self.output.take()]
            .into_iter()
            .flatten()
        {
            handle.abort();
        }
    }
}

impl Drop for Tasks {
    fn drop(&mut self) {
        self.abort_relays();
        if let Some(exit) = self.exit.take() {
            exit.abort();
        }
    }
}

/// A shell running on a pty, wired to the local terminal.
///
/// Writing to the session (it implements [`AsyncWrite`]) sends bytes
/// straight to the shell; observers never see them.
pub struct PtySession<M = UnixPtyMaster, C = UnixPtyChild> {
    shell: String,
    master: M,
    child: C,
    observers: ObserverChain,
    local_input: Option<LocalInput>,
    local_output: Option<LocalOutput>,
    input_relay: InputRelay,
    geometry: Option<GeometrySource>,
    started: bool,
    pending_input: Option<ObservedReader<LocalInput>>,
    tasks: Tasks,
    status: Option<ExitStatus>,
}

impl<M, C: PtyChild> std::fmt::Debug for PtySession<M, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PtySession")
            .field("shell", &self.shell)
            .field("pid", &self.child.pid())
            .field("observers", &self.observers.len())
            .field("input_relay", &self.input_relay)
            .field("started", &self.started)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

impl PtySession {
    /// Spawn `shell` on a new pty.
    ///
    /// # Errors
    ///
    /// Returns [`CmdplayError::Spawn`] if the pty cannot be allocated or
    /// the shell cannot be executed.
    pub async fn spawn(shell: &str, options: SessionOptions) -> Result<Self> {
        let config = options.pty_config();
        let (master, child) = NativePtySystem::spawn(shell, options.args.iter(), &config)
            .await
            .map_err(|e| CmdplayError::spawn(shell, e))?;

        tracing::debug!(shell, pid = child.pid(), "spawned shell");
        Ok(Self::from_parts(shell, master, child, options))
    }
}

impl<M, C> PtySession<M, C>
where
    M: PtyMaster + Clone + 'static,
    C: PtyChild + Clone + 'static,
{
    /// Build a session around an already spawned pty and child.
    pub fn from_parts(
        shell: impl Into<String>,
        master: M,
        child: C,
        options: SessionOptions,
    ) -> Self {
        let SessionOptions {
            input_relay,
            sync_window_size,
            geometry,
            local_input,
            local_output,
            ..
        } = options;

        Self {
            shell: shell.into(),
            master,
            child,
            observers: ObserverChain::new(),
            local_input: Some(local_input.unwrap_or_else(|| Box::new(tokio::io::stdin()))),
            local_output: Some(local_output.unwrap_or_else(|| Box::new(tokio::io::stdout()))),
            input_relay,
            geometry: sync_window_size.then_some(geometry),
            started: false,
            pending_input: None,
            tasks: Tasks::default(),
            status: None,
        }
    }

    /// The shell this session runs.
    #[must_use]
    pub fn shell(&self) -> &str {
        &self.shell
    }

    /// Process ID of the shell.
    #[must_use]
    pub fn pid(&self) -> u32 {
        self.child.pid()
    }

    /// The pty controller.
    #[must_use]
    pub const fn master(&self) -> &M {
        &self.master
    }

    /// Whether [`start`](Self::start) has been called.
    #[must_use]
    pub const fn is_started(&self) -> bool {
        self.started
    }

    /// Add an observer for local input.
    ///
    /// Observers run in registration order, once per byte, before the byte
    /// is written to the shell.
    ///
    /// # Errors
    ///
    /// Returns [`CmdplayError::AlreadyStarted`] after [`start`](Self::start).
    pub fn register_input_observer(&mut self, observer: Box<dyn InputObserver>) -> Result<()> {
        if self.started {
            return Err(CmdplayError::AlreadyStarted);
        }
        self.observers.push(observer);
        Ok(())
    }

    /// Shorthand for registering a closure observer.
    ///
    /// # Errors
    ///
    /// Returns [`CmdplayError::AlreadyStarted`] after [`start`](Self::start).
    pub fn on_input<F>(&mut self, observer: F) -> Result<()>
    where
        F: FnMut(u8) + Send + 'static,
    {
        self.register_input_observer(Box::new(observer))
    }

    /// Launch the relay and watcher tasks. Must run inside a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`CmdplayError::AlreadyStarted`] on a second call.
    pub fn start(&mut self) -> Result<()> {
        if self.started {
            return Err(CmdplayError::AlreadyStarted);
        }
        self.started = true;

        let (done_tx, done_rx) = watch::channel(false);

        if let Some(geometry) = &self.geometry {
            sync_window_size(&self.master, geometry);
            self.tasks.resize =
                spawn_resize_watcher(self.master.clone(), Arc::clone(geometry), done_rx);
        }

        if let Some(output) = self.local_output.take() {
            self.tasks.output = Some(tokio::spawn(relay_output(self.master.clone(), output)));
        }

        if let Some(input) = self.local_input.take() {
            let reader = ObservedReader::new(input, std::mem::take(&mut self.observers));
            match self.input_relay {
                InputRelay::Immediate => {
                    self.tasks.input = Some(tokio::spawn(relay_input(reader, self.master.clone())));
                }
                InputRelay::Deferred => self.pending_input = Some(reader),
            }
        }

        let mut child = self.child.clone();
        self.tasks.exit = Some(tokio::spawn(async move {
            let status = child.wait().await;
            done_tx.send_replace(true);
            status
        }));

        tracing::debug!(
            shell = %self.shell,
            pid = self.child.pid(),
            relay = ?self.input_relay,
            "session started"
        );
        Ok(())
    }

    /// Start a deferred input relay. A no-op if input is already flowing.
    ///
    /// # Errors
    ///
    /// Returns [`CmdplayError::NotStarted`] before [`start`](Self::start).
    pub fn resume_input(&mut self) -> Result<()> {
        if !self.started {
            return Err(CmdplayError::NotStarted);
        }
        if let Some(reader) = self.pending_input.take() {
            tracing::debug!("input relay resumed");
            self.tasks.input = Some(tokio::spawn(relay_input(reader, self.master.clone())));
        }
        Ok(())
    }

    /// Wait for the shell to exit and the output to drain.
    ///
    /// Any exit code, or death by signal, is a normal completion. Later
    /// calls return the same status.
    ///
    /// # Errors
    ///
    /// Returns [`CmdplayError::NotStarted`] before [`start`](Self::start),
    /// or the error from reaping the child.
    pub async fn wait(&mut self) -> Result<ExitStatus> {
        if let Some(status) = self.status {
            return Ok(status);
        }

        let exit = self.tasks.exit.as_mut().ok_or(CmdplayError::NotStarted)?;
        let joined = exit.await;
        self.tasks.exit = None;

        let status = match joined {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "waiting for the shell failed");
                return Err(e.into());
            }
            Err(e) => return Err(CmdplayError::Io(io::Error::other(e))),
        };

        self.drain().await;
        self.status = Some(status);
        tracing::debug!(shell = %self.shell, %status, "session finished");
        Ok(status)
    }

    /// Kill the shell. Killing a shell that already exited is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`CmdplayError::Pty`] if the signal cannot be delivered.
    pub fn stop(&mut self) -> Result<()> {
        tracing::debug!(pid = self.child.pid(), "stopping shell");
        self.child.kill()?;
        Ok(())
    }

    async fn drain(&mut self) {
        if let Some(mut output) = self.tasks.output.take() {
            if tokio::time::timeout(EXIT_DRAIN_GRACE, &mut output)
                .await
                .is_err()
            {
                tracing::trace!("output still pending after exit, dropping it");
                output.abort();
            }
        }
        self.pending_input = None;
        self.tasks.abort_relays();
    }
}

impl<M, C> SessionDriver for PtySession<M, C>
where
    M: PtyMaster + Clone + 'static,
    C: PtyChild + Clone + Unpin + 'static,
{
    fn register_input_observer(&mut self, observer: Box<dyn InputObserver>) -> Result<()> {
        Self::register_input_observer(self, observer)
    }

    fn start(&mut self) -> Result<()> {
        Self::start(self)
    }

    fn wait(&mut self) -> impl Future<Output = Result<ExitStatus>> + Send {
        Self::wait(self)
    }

    fn stop(&mut self) -> Result<()> {
        Self::stop(self)
    }
}

impl<M, C> AsyncWrite for PtySession<M, C>
where
    M: PtyMaster,
    C: Unpin,
{
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().master).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().master).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().master).poll_shutdown(cx)
    }
}

/// Copy the host geometry onto `master`. The pty keeps its size when the
/// host has none.
fn sync_window_size<M: PtyMaster>(master: &M, geometry: &GeometrySource) {
    match master.inherit_window_size(geometry.as_fd()) {
        Ok(size) => tracing::debug!(cols = size.cols, rows = size.rows, "pty resized"),
        Err(e) => tracing::trace!(error = %e, "keeping the pty size"),
    }
}

fn spawn_resize_watcher<M>(
    master: M,
    geometry: GeometrySource,
    mut done: watch::Receiver<bool>,
) -> Option<JoinHandle<()>>
where
    M: PtyMaster + 'static,
{
    let mut signals = match ResizeSignals::new() {
        Ok(signals) => signals,
        Err(e) => {
            tracing::trace!(error = %e, "cannot watch SIGWINCH, window size stays fixed");
            return None;
        }
    };

    Some(tokio::spawn(async move {
        loop {
            tokio::select! {
                changed = done.changed() => {
                    if changed.is_err() || *done.borrow() {
                        break;
                    }
                }
                signal = signals.recv() => {
                    if signal.is_none() {
                        break;
                    }
                    sync_window_size(&master, &geometry);
                }
            }
        }
        tracing::trace!("resize watcher stopped");
    }))
}

async fn write_chunk<W>(destination: &mut W, data: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    destination.write_all(data).await?;
    destination.flush().await
}

async fn relay_output<M: PtyMaster>(mut master: M, mut output: LocalOutput) {
    let mut buf = vec![0u8; OUTPUT_BUFFER_SIZE];
    loop {
        match master.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                tracing::trace!(bytes = n, "relaying shell output");
                if let Err(e) = write_chunk(&mut output, &buf[..n]).await {
                    tracing::trace!(error = %e, "local output closed");
                    break;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => {
                tracing::trace!(error = %e, "pty read failed");
                break;
            }
        }
    }
    tracing::trace!("output relay stopped");
}

async fn relay_input<R, M>(mut input: R, mut master: M)
where
    R: AsyncRead + Unpin,
    M: PtyMaster,
{
    let mut buf = [0u8; INPUT_BUFFER_SIZE];
    loop {
        match input.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                tracing::trace!(bytes = n, "relaying local input");
                if let Err(e) = write_chunk(&mut master, &buf[..n]).await {
                    tracing::trace!(error = %e, "pty closed for input");
                    break;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => {
                tracing::trace!(error = %e, "local input failed");
                break;
            }
        }
    }
    tracing::trace!("input relay stopped");
}
