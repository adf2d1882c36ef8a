//! Line transport over an async byte stream.
//!
//! [`Transport::split`] frames any `AsyncRead + AsyncWrite` stream with a
//! [`LineCodec`] and hands back three pieces:
//!
//! - [`LineReader`]: owned by the session's reader loop, the only reader.
//! - [`LineWriter`]: shared by the reader loop (for `PONG`) and callers.
//!   It is not internally synchronized; the session keeps it behind an
//!   async mutex.
//! - [`CloseHandle`]: marks the transport closed. A pending
//!   [`LineReader::read_line`] then fails with [`TransportReadError::Closed`],
//!   and pending or later writes fail with [`WriteError::Closed`].
//!
//! The underlying stream is released once both the reader and the writer
//! have been dropped.
//!
//! [`dial`] establishes the plaintext or TLS stream to feed into it.

mod dial;
mod error;

use std::sync::Arc;

use futures_util::{FutureExt, SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::watch;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::debug;

use crate::error::ProtocolError;
use crate::line::LineCodec;

pub use dial::{dial, join_host_port};
pub use error::{TransportReadError, WriteError};

/// Byte stream a transport can be built on.
pub trait AsyncStream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> AsyncStream for T {}

/// Type-erased stream, so plaintext, TLS and in-memory test streams share one session type.
pub type BoxedStream = Box<dyn AsyncStream>;

/// Constructor namespace for the line transport.
pub struct Transport;

impl Transport {
    /// Frame `stream` into lines using the encoding named by `label`.
    ///
    /// # Errors
    ///
    /// Returns an error if the codec cannot be created for `label`.
    pub fn split<S>(
        stream: S,
        label: &str,
    ) -> Result<(LineReader, LineWriter, CloseHandle), ProtocolError>
    where
        S: AsyncStream + 'static,
    {
        let boxed: BoxedStream = Box::new(stream);
        let (read_half, write_half) = tokio::io::split(boxed);
        let (closed_tx, closed_rx) = watch::channel(false);

        let reader = LineReader {
            frames: FramedRead::new(read_half, LineCodec::new(label)?),
            closed: closed_rx.clone(),
        };
        let writer = LineWriter {
            frames: FramedWrite::new(write_half, LineCodec::new(label)?),
            closed: closed_rx,
        };
        let closer = CloseHandle {
            tx: Arc::new(closed_tx),
        };
        Ok((reader, writer, closer))
    }
}

/// Reading half of a line transport.
pub struct LineReader {
    frames: FramedRead<ReadHalf<BoxedStream>, LineCodec>,
    closed: watch::Receiver<bool>,
}

impl LineReader {
    /// Wait for the next complete line, without its terminator.
    ///
    /// Errors are returned as-is and are not retried. End of stream is
    /// [`TransportReadError::Eof`].
    pub async fn read_line(&mut self) -> Result<String, TransportReadError> {
        let Self { frames, closed } = self;

        tokio::select! {
            biased;
            () = wait_closed(closed) => Err(TransportReadError::Closed),
            next = frames.next() => match next {
                Some(Ok(line)) => Ok(line),
                Some(Err(e)) => Err(TransportReadError::from(e)),
                None => Err(TransportReadError::Eof),
            },
        }
    }
}

async fn wait_closed(rx: &mut watch::Receiver<bool>) {
    while !*rx.borrow_and_update() {
        if rx.changed().await.is_err() {
            // Every CloseHandle is gone, so nobody can close us any more.
            std::future::pending::<()>().await;
        }
    }
}

/// Writing half of a line transport.
pub struct LineWriter {
    frames: FramedWrite<WriteHalf<BoxedStream>, LineCodec>,
    closed: watch::Receiver<bool>,
}

impl LineWriter {
    /// Write `line` followed by CR/LF and flush.
    ///
    /// Anything after an embedded CR or LF is dropped; see
    /// [`LineCodec::sanitize`]. A write still waiting on the peer when the
    /// transport is closed gives up with [`WriteError::Closed`].
    pub async fn write_line(&mut self, line: impl Into<String>) -> Result<(), WriteError> {
        let Self { frames, closed } = self;
        if *closed.borrow() {
            return Err(WriteError::Closed);
        }

        tokio::select! {
            biased;
            () = wait_closed(closed) => Err(WriteError::Closed),
            sent = frames.send(line.into()) => sent.map_err(WriteError::from),
        }
    }

    /// Shut down the write half and drop it.
    ///
    /// Does not wait: if the stream cannot shut down immediately (a TLS
    /// `close_notify` stuck behind a full socket buffer, say) it is dropped
    /// as is.
    pub fn shutdown(mut self) -> Result<(), WriteError> {
        match self.frames.get_mut().shutdown().now_or_never() {
            Some(result) => result.map_err(WriteError::from),
            None => {
                debug!("write half not ready to shut down, dropping it");
                Ok(())
            }
        }
    }
}

/// Marks a transport as closed.
#[derive(Debug, Clone)]
pub struct CloseHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CloseHandle {
    /// Close the transport. Returns `true` for the call that actually closed it.
    pub fn close(&self) -> bool {
        !self.tx.send_replace(true)
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        *self.tx.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    #[tokio::test]
    async fn test_read_lines_then_eof() {
        let (client, mut server) = tokio::io::duplex(256);
        let (mut reader, _writer, _closer) = Transport::split(client, "utf-8").unwrap();

        server
            .write_all(b":srv NOTICE * :hi\r\nPING :abc\n")
            .await
            .unwrap();
        drop(server);

        assert_eq!(reader.read_line().await.unwrap(), ":srv NOTICE * :hi");
        assert_eq!(reader.read_line().await.unwrap(), "PING :abc");
        assert!(matches!(
            reader.read_line().await,
            Err(TransportReadError::Eof)
        ));
    }

    #[tokio::test]
    async fn test_write_line_terminates_and_flushes() {
        let (client, server) = tokio::io::duplex(256);
        let (_reader, mut writer, _closer) = Transport::split(client, "utf-8").unwrap();

        writer.write_line("NICK :bond").await.unwrap();

        let mut server = BufReader::new(server);
        let mut line = String::new();
        server.read_line(&mut line).await.unwrap();
        assert_eq!(line, "NICK :bond\r\n");
    }

    #[tokio::test]
    async fn test_close_unblocks_pending_read() {
        let (client, _server) = tokio::io::duplex(256);
        let (mut reader, mut writer, closer) = Transport::split(client, "utf-8").unwrap();

        let pending = tokio::spawn(async move { reader.read_line().await });
        tokio::task::yield_now().await;

        assert!(closer.close());
        assert!(!closer.close());
        assert!(closer.is_closed());

        let result = pending.await.unwrap();
        assert!(matches!(result, Err(TransportReadError::Closed)));
        assert!(matches!(
            writer.write_line("PING :x").await,
            Err(WriteError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_close_unblocks_pending_write() {
        // The peer never reads, so a write larger than the pipe stalls.
        let (client, _server) = tokio::io::duplex(64);
        let (_reader, mut writer, closer) = Transport::split(client, "utf-8").unwrap();

        let pending = tokio::spawn(async move {
            let result = writer.write_line("x".repeat(4096)).await;
            (writer, result)
        });
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(!pending.is_finished());

        closer.close();
        let (writer, result) = tokio::time::timeout(std::time::Duration::from_secs(2), pending)
            .await
            .expect("write still blocked after close")
            .unwrap();
        assert!(matches!(result, Err(WriteError::Closed)));
        assert!(writer.shutdown().is_ok());
    }

    #[tokio::test]
    async fn test_dropping_both_halves_releases_stream() {
        let (client, mut server) = tokio::io::duplex(64);
        let (reader, writer, closer) = Transport::split(client, "utf-8").unwrap();

        closer.close();
        writer.shutdown().unwrap();
        assert!(server.write_all(b"PING :x\r\n").await.is_ok());

        drop(reader);
        assert!(server.write_all(b"PING :y\r\n").await.is_err());
    }

    #[tokio::test]
    async fn test_write_to_dropped_peer_fails() {
        let (client, server) = tokio::io::duplex(64);
        let (_reader, mut writer, _closer) = Transport::split(client, "utf-8").unwrap();
        drop(server);

        assert!(matches!(
            writer.write_line("PRIVMSG #a :hello").await,
            Err(WriteError::Io(_))
        ));
    }
}
