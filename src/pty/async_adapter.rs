//! Async adapters for PTY I/O.
//!
//! PTY reads and writes block, so each side runs on a blocking thread and
//! talks to async code through a channel.

use std::io::{Read, Write};
use tokio::sync::mpsc;
use tracing::{debug, error, trace};

/// Async reader for PTY output.
///
/// Runs in a blocking thread and sends output chunks through a channel.
pub struct AsyncPtyReader<R: Read + Send + 'static> {
    reader: R,
    tx: mpsc::Sender<Vec<u8>>,
    buffer_size: usize,
}

impl<R: Read + Send + 'static> AsyncPtyReader<R> {
    /// Create a new AsyncPtyReader.
    pub fn new(reader: R, tx: mpsc::Sender<Vec<u8>>) -> Self {
        Self {
            reader,
            tx,
            buffer_size: 4096,
        }
    }

    /// Create with custom buffer size.
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Read until EOF, a read error, or the receiver going away.
    ///
    /// On Unix a closed slave side shows up as `EIO` rather than EOF.
    pub async fn run(self) {
        let buffer_size = self.buffer_size;
        let mut reader = self.reader;
        let tx = self.tx;

        let result = tokio::task::spawn_blocking(move || {
            let mut buf = vec![0u8; buffer_size];

            loop {
                match reader.read(&mut buf) {
                    Ok(0) => {
                        debug!("PTY reader: EOF");
                        break;
                    }
                    Ok(n) => {
                        trace!("PTY reader: read {} bytes", n);
                        if tx.blocking_send(buf[..n].to_vec()).is_err() {
                            debug!("PTY reader: channel closed");
                            break;
                        }
                    }
                    Err(e) => {
                        #[cfg(unix)]
                        if e.raw_os_error() == Some(libc::EIO) {
                            debug!("PTY reader: PTY closed (EIO)");
                            break;
                        }

                        if e.kind() == std::io::ErrorKind::Interrupted {
                            continue;
                        }

                        error!("PTY reader error: {}", e);
                        break;
                    }
                }
            }
        })
        .await;

        if let Err(e) = result {
            error!("PTY reader task panicked: {}", e);
        }
    }
}

/// Async writer for PTY input.
///
/// Receives data through a channel and writes to the PTY in a blocking thread.
pub struct AsyncPtyWriter<W: Write + Send + 'static> {
    writer: W,
    rx: mpsc::Receiver<Vec<u8>>,
}

impl<W: Write + Send + 'static> AsyncPtyWriter<W> {
    /// Create a new AsyncPtyWriter.
    pub fn new(writer: W, rx: mpsc::Receiver<Vec<u8>>) -> Self {
        Self { writer, rx }
    }

    /// Write everything received until the channel closes or a write fails.
    ///
    /// Returns the writer so callers can inspect it.
    pub async fn run(self) -> Option<W> {
        let mut writer = self.writer;
        let mut rx = self.rx;

        let result = tokio::task::spawn_blocking(move || {
            while let Some(data) = rx.blocking_recv() {
                trace!("PTY writer: writing {} bytes", data.len());
                if let Err(e) = writer.write_all(&data).and_then(|_| writer.flush()) {
                    if e.kind() == std::io::ErrorKind::BrokenPipe {
                        debug!("PTY writer: broken pipe");
                    } else {
                        error!("PTY writer error: {}", e);
                    }
                    break;
                }
            }
            debug!("PTY writer: channel closed");
            writer
        })
        .await;

        match result {
            Ok(writer) => Some(writer),
            Err(e) => {
                error!("PTY writer task panicked: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::time::Duration;

    #[tokio::test]
    async fn test_async_reader_basic() {
        let data = b"Hello, World!\nTest line 2\n";
        let cursor = Cursor::new(data.to_vec());

        let (tx, mut rx) = mpsc::channel(32);
        let reader = AsyncPtyReader::new(cursor, tx).with_buffer_size(8);
        let handle = tokio::spawn(reader.run());

        let mut received = Vec::new();
        while let Some(chunk) = rx.recv().await {
            assert!(chunk.len() <= 8);
            received.extend(chunk);
        }
        let _ = tokio::time::timeout(Duration::from_millis(100), handle).await;

        assert_eq!(received, data);
    }

    #[tokio::test]
    async fn test_async_reader_empty() {
        let cursor = Cursor::new(Vec::new());
        let (tx, mut rx) = mpsc::channel(32);
        let handle = tokio::spawn(AsyncPtyReader::new(cursor, tx).run());

        let result = tokio::time::timeout(Duration::from_millis(500), rx.recv()).await;
        assert!(result.unwrap().is_none());

        let _ = handle.await;
    }

    #[tokio::test]
    async fn test_async_writer_collects() {
        let (tx, rx) = mpsc::channel(32);
        let writer = AsyncPtyWriter::new(Vec::new(), rx);

        tx.send(b"Hello".to_vec()).await.unwrap();
        tx.send(b", World!".to_vec()).await.unwrap();
        drop(tx);

        let written = tokio::time::timeout(Duration::from_secs(1), writer.run())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(written, b"Hello, World!");
    }

    #[tokio::test]
    async fn test_reader_channel_closed() {
        let data = b"Some data that won't be fully read";
        let cursor = Cursor::new(data.to_vec());

        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let handle = tokio::spawn(AsyncPtyReader::new(cursor, tx).run());
        let result = tokio::time::timeout(Duration::from_millis(500), handle).await;
        assert!(result.is_ok());
    }
}
