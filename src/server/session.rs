//! A shared command running in a PTY.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use portable_pty::{ChildKiller, MasterPty};
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, info, warn};

use crate::error::TtyShareError;
use crate::pty::{native, AsyncPtyReader, AsyncPtyWriter, NativePty, PtySize};
use crate::Result;

/// How long the redraw nudge keeps the PTY one row short.
const REFRESH_DELAY: Duration = Duration::from_millis(50);

/// Output chunks buffered per attached receiver before it starts lagging.
const OUTPUT_BUFFER: usize = 256;

/// One PTY session that any number of receivers can attach to.
pub struct PtySession {
    id: String,
    pid: u32,
    input: mpsc::Sender<Vec<u8>>,
    output: broadcast::Sender<Vec<u8>>,
    master: Mutex<Box<dyn MasterPty + Send>>,
    killer: Mutex<Box<dyn ChildKiller + Send + Sync>>,
    exited: watch::Receiver<bool>,
    receivers: AtomicUsize,
    created_at: Instant,
}

impl PtySession {
    /// Spawn `command` in a new PTY and start pumping its I/O.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(id: impl Into<String>, command: &str, args: &[String]) -> Result<Arc<Self>> {
        let id = id.into();
        let handle = NativePty::new().spawn(command, args, PtySize::default())?;
        let pid = handle.pid;
        let mut child = handle.child;
        let killer = child.clone_killer();

        let (input_tx, input_rx) = mpsc::channel(64);
        tokio::spawn(AsyncPtyWriter::new(handle.writer, input_rx).run());

        let (chunk_tx, mut chunk_rx) = mpsc::channel(64);
        tokio::spawn(AsyncPtyReader::new(handle.reader, chunk_tx).run());

        let (output_tx, _) = broadcast::channel(OUTPUT_BUFFER);
        let (exited_tx, exited_rx) = watch::channel(false);

        let wait = tokio::task::spawn_blocking(move || child.wait());
        let output = output_tx.clone();
        let session_id = id.clone();
        tokio::spawn(async move {
            while let Some(chunk) = chunk_rx.recv().await {
                // No attached receivers is not an error
                let _ = output.send(chunk);
            }
            match wait.await {
                Ok(Ok(status)) => {
                    info!(session = %session_id, exit_code = status.exit_code(), "command exited")
                }
                Ok(Err(e)) => warn!(session = %session_id, "failed to wait for command: {}", e),
                Err(e) => warn!(session = %session_id, "wait task failed: {}", e),
            }
            let _ = exited_tx.send(true);
        });

        info!(session = %id, pid, command, "session started");
        Ok(Arc::new(Self {
            id,
            pid,
            input: input_tx,
            output: output_tx,
            master: Mutex::new(handle.master),
            killer: Mutex::new(killer),
            exited: exited_rx,
            receivers: AtomicUsize::new(0),
            created_at: Instant::now(),
        }))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Process ID of the command.
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Time since the session started.
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Receive every output chunk produced from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Vec<u8>> {
        self.output.subscribe()
    }

    /// Send bytes to the command's terminal.
    pub async fn write(&self, data: Vec<u8>) -> Result<()> {
        self.input
            .send(data)
            .await
            .map_err(|_| TtyShareError::ConnectionClosed)
    }

    /// Change the terminal size of the command.
    pub fn resize(&self, size: PtySize) -> Result<()> {
        let master = self.master.lock().map_err(|_| TtyShareError::LockPoisoned)?;
        native::resize(&**master, size)
    }

    /// Current terminal size of the command.
    pub fn size(&self) -> Result<PtySize> {
        let master = self.master.lock().map_err(|_| TtyShareError::LockPoisoned)?;
        native::current_size(&**master)
    }

    /// Make full-screen programs redraw.
    ///
    /// There is no portable "repaint" request, so the PTY is made one row
    /// shorter and restored shortly after; the two `SIGWINCH`es trigger a
    /// redraw in most applications.
    pub fn refresh(self: &Arc<Self>) {
        let size = match self.size() {
            Ok(size) => size,
            Err(e) => {
                debug!(session = %self.id, "skipping refresh: {}", e);
                return;
            }
        };
        if size.rows < 2 {
            return;
        }

        let shrunk = PtySize::new(size.rows - 1, size.cols);
        let _ = self.resize(shrunk);
        let session = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(REFRESH_DELAY).await;
            // A receiver may have sent its own size in the meantime
            if session.size().ok() == Some(shrunk) {
                let _ = session.resize(size);
            }
        });
    }

    /// Whether the command has exited and all its output was published.
    pub fn has_exited(&self) -> bool {
        *self.exited.borrow()
    }

    /// Wait until the command has exited and all its output was published.
    pub async fn wait(&self) {
        let mut exited = self.exited.clone();
        let _ = exited.wait_for(|done| *done).await;
    }

    /// Kill the command.
    pub fn stop(&self) {
        if self.has_exited() {
            return;
        }
        match self.killer.lock() {
            Ok(mut killer) => {
                if let Err(e) = killer.kill() {
                    debug!(session = %self.id, "kill failed: {}", e);
                }
            }
            Err(_) => warn!(session = %self.id, "killer lock poisoned"),
        }
    }

    /// Register an attached receiver. Returns the new count.
    pub fn attach(&self) -> usize {
        self.receivers.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Unregister an attached receiver. Returns the remaining count.
    pub fn detach(&self) -> usize {
        self.receivers.fetch_sub(1, Ordering::SeqCst).saturating_sub(1)
    }

    pub fn receiver_count(&self) -> usize {
        self.receivers.load(Ordering::SeqCst)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    async fn collect_until(rx: &mut broadcast::Receiver<Vec<u8>>, needle: &str) -> String {
        let mut seen = Vec::new();
        let _ = tokio::time::timeout(Duration::from_secs(5), async {
            while let Ok(chunk) = rx.recv().await {
                seen.extend(chunk);
                if String::from_utf8_lossy(&seen).contains(needle) {
                    break;
                }
            }
        })
        .await;
        String::from_utf8_lossy(&seen).into_owned()
    }

    #[tokio::test]
    async fn test_echo_through_pty() {
        let session = PtySession::start("t-echo", "/bin/cat", &[]).unwrap();
        let mut rx = session.subscribe();

        session.write(b"hello\r".to_vec()).await.unwrap();
        let out = collect_until(&mut rx, "hello").await;
        assert!(out.contains("hello"), "output: {:?}", out);

        {
            let mut wait = tokio_test::task::spawn(session.wait());
            tokio_test::assert_pending!(wait.poll());
        }
        assert!(!session.has_exited());

        session.stop();
        tokio::time::timeout(Duration::from_secs(5), session.wait())
            .await
            .unwrap();
        assert!(session.has_exited());
    }

    #[tokio::test]
    async fn test_exit_is_observed() {
        let session = PtySession::start("t-exit", "/bin/sh", &sh("exit 0")).unwrap();
        tokio::time::timeout(Duration::from_secs(5), session.wait())
            .await
            .unwrap();
        assert!(session.has_exited());
    }

    #[tokio::test]
    async fn test_resize_and_refresh() {
        let session = PtySession::start("t-size", "/bin/cat", &[]).unwrap();
        session.resize(PtySize::new(30, 100)).unwrap();
        assert_eq!(session.size().unwrap(), PtySize::new(30, 100));

        session.refresh();
        assert_eq!(session.size().unwrap(), PtySize::new(29, 100));
        tokio::time::sleep(REFRESH_DELAY * 4).await;
        assert_eq!(session.size().unwrap(), PtySize::new(30, 100));

        session.stop();
    }

    #[tokio::test]
    async fn test_refresh_keeps_newer_size() {
        let session = PtySession::start("t-size2", "/bin/cat", &[]).unwrap();
        session.resize(PtySize::new(30, 100)).unwrap();

        session.refresh();
        session.resize(PtySize::new(40, 120)).unwrap();
        tokio::time::sleep(REFRESH_DELAY * 4).await;
        assert_eq!(session.size().unwrap(), PtySize::new(40, 120));

        session.stop();
    }

    #[tokio::test]
    async fn test_receiver_count() {
        let session = PtySession::start("t-count", "/bin/cat", &[]).unwrap();
        assert_eq!(session.attach(), 1);
        assert_eq!(session.attach(), 2);
        assert_eq!(session.detach(), 1);
        assert_eq!(session.receiver_count(), 1);
        session.stop();
    }
}
