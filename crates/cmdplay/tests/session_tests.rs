//! Integration tests for the pty session driver against a real `/bin/sh`.
//!
//! A test returns early when the shell cannot be spawned (sandboxed CI
//! without pty support).

#![cfg(unix)]

use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use cmdplay::session::{InputRelay, PtySession, SessionOptions};
use cmdplay_pty::{UnixPtyMaster, WindowSize};
use signal_hook::consts::SIGWINCH;
use tokio::io::{AsyncWrite, AsyncWriteExt};

const TIMEOUT: Duration = Duration::from_secs(20);

/// Collects everything written to it.
#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl AsyncWrite for SharedBuffer {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

fn options() -> SessionOptions {
    SessionOptions::new()
        .sync_window_size(false)
        .local_output(tokio::io::sink())
}

#[tokio::test]
async fn observers_see_typed_bytes_in_registration_order() {
    let typed = b"true\nexit\n";
    let options = options().local_input(&typed[..]);
    let Ok(mut session) = PtySession::spawn("/bin/sh", options).await else {
        return;
    };

    let calls = Arc::new(Mutex::new(Vec::new()));
    for name in ['A', 'B'] {
        let calls = Arc::clone(&calls);
        session
            .on_input(move |key| calls.lock().unwrap().push((name, key)))
            .unwrap();
    }

    session.start().unwrap();
    let status = tokio::time::timeout(TIMEOUT, session.wait())
        .await
        .expect("shell should exit after `exit`")
        .unwrap();
    assert!(status.success());

    let expected: Vec<(char, u8)> = typed
        .iter()
        .flat_map(|&key| [('A', key), ('B', key)])
        .collect();
    assert_eq!(*calls.lock().unwrap(), expected);
}

#[tokio::test]
async fn writes_to_the_session_are_not_observed() {
    let options = options()
        .local_input(tokio::io::empty())
        .input_relay(InputRelay::Deferred);
    let Ok(mut session) = PtySession::spawn("/bin/sh", options).await else {
        return;
    };

    let observed = Arc::new(Mutex::new(Vec::new()));
    let tap = Arc::clone(&observed);
    session.on_input(move |key| tap.lock().unwrap().push(key)).unwrap();

    session.start().unwrap();
    session.write_all(b"exit 4\n").await.unwrap();
    session.flush().await.unwrap();

    let status = tokio::time::timeout(TIMEOUT, session.wait())
        .await
        .expect("shell should exit")
        .unwrap();

    assert_eq!(status.code(), Some(4));
    assert!(observed.lock().unwrap().is_empty());
}

#[tokio::test]
async fn shell_output_reaches_local_output() {
    let output = SharedBuffer::default();
    let options = SessionOptions::new()
        .sync_window_size(false)
        .args(["-c", "printf cmdplay-out"])
        .local_input(tokio::io::empty())
        .local_output(output.clone());
    let Ok(mut session) = PtySession::spawn("/bin/sh", options).await else {
        return;
    };

    session.start().unwrap();
    tokio::time::timeout(TIMEOUT, session.wait())
        .await
        .expect("shell should exit")
        .unwrap();

    assert!(output.contents().contains("cmdplay-out"));
}

#[tokio::test]
async fn stop_kills_a_running_shell() {
    let options = options()
        .args(["-c", "sleep 30"])
        .local_input(tokio::io::empty());
    let Ok(mut session) = PtySession::spawn("/bin/sh", options).await else {
        return;
    };

    session.start().unwrap();
    session.stop().unwrap();

    let status = tokio::time::timeout(TIMEOUT, session.wait())
        .await
        .expect("killed shell should be reaped")
        .unwrap();
    assert!(!status.success());
    assert_eq!(status.code(), None);

    // Stopping again is a no-op.
    session.stop().unwrap();
}

#[tokio::test]
async fn deferred_input_flows_after_resume() {
    let options = options()
        .local_input(&b"exit 7\n"[..])
        .input_relay(InputRelay::Deferred);
    let Ok(mut session) = PtySession::spawn("/bin/sh", options).await else {
        return;
    };

    let observed = Arc::new(Mutex::new(Vec::new()));
    let tap = Arc::clone(&observed);
    session.on_input(move |key| tap.lock().unwrap().push(key)).unwrap();

    session.start().unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(observed.lock().unwrap().is_empty());

    session.resume_input().unwrap();
    let status = tokio::time::timeout(TIMEOUT, session.wait())
        .await
        .expect("shell should exit")
        .unwrap();

    assert_eq!(status.code(), Some(7));
    assert_eq!(*observed.lock().unwrap(), b"exit 7\n");
}

/// Poll the pty size until it equals `want` or the timeout passes.
async fn reaches_size(master: &UnixPtyMaster, want: WindowSize) -> bool {
    tokio::time::timeout(TIMEOUT, async {
        while master.get_window_size().ok() != Some(want) {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .is_ok()
}

async fn stop_and_reap(session: &mut PtySession) {
    session.stop().unwrap();
    tokio::time::timeout(TIMEOUT, session.wait())
        .await
        .expect("killed shell should be reaped")
        .unwrap();
}

#[tokio::test]
async fn window_size_follows_the_host_terminal() {
    // A second pty stands in for the user's terminal.
    let Ok((host, _)) = UnixPtyMaster::open() else {
        return;
    };
    host.set_window_size(WindowSize::new(132, 43)).unwrap();

    let options = SessionOptions::new()
        .geometry_source(host.clone())
        .args(["-c", "sleep 30"])
        .local_input(tokio::io::empty())
        .local_output(tokio::io::sink());
    let Ok(mut session) = PtySession::spawn("/bin/sh", options).await else {
        return;
    };

    session.start().unwrap();
    assert_eq!(
        session.master().get_window_size().unwrap(),
        WindowSize::new(132, 43)
    );

    host.set_window_size(WindowSize::new(100, 30)).unwrap();
    signal_hook::low_level::raise(SIGWINCH).unwrap();
    assert!(
        reaches_size(session.master(), WindowSize::new(100, 30)).await,
        "resize after SIGWINCH never reached the session pty"
    );

    // An empty host window is ignored.
    host.set_window_size(WindowSize::new(0, 0)).unwrap();
    signal_hook::low_level::raise(SIGWINCH).unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(
        session.master().get_window_size().unwrap(),
        WindowSize::new(100, 30)
    );

    // The watcher is still alive afterwards.
    host.set_window_size(WindowSize::new(90, 20)).unwrap();
    signal_hook::low_level::raise(SIGWINCH).unwrap();
    assert!(reaches_size(session.master(), WindowSize::new(90, 20)).await);

    stop_and_reap(&mut session).await;
}

#[tokio::test]
async fn non_terminal_host_keeps_the_default_size() {
    let Ok(null) = std::fs::File::open("/dev/null") else {
        return;
    };
    let options = SessionOptions::new()
        .geometry_source(null)
        .args(["-c", "sleep 30"])
        .local_input(tokio::io::empty())
        .local_output(tokio::io::sink());
    let Ok(mut session) = PtySession::spawn("/bin/sh", options).await else {
        return;
    };

    session.start().unwrap();
    assert_eq!(session.master().get_window_size().unwrap(), WindowSize::default());

    signal_hook::low_level::raise(SIGWINCH).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(session.master().get_window_size().unwrap(), WindowSize::default());

    stop_and_reap(&mut session).await;
}
