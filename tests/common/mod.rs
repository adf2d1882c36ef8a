//! Integration test common infrastructure.
//!
//! Provides an in-process fake IRC server and stream helpers for driving a
//! [`Session`](slirc_session::Session) from the server side.

#![allow(dead_code)]

use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, ReadBuf};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

/// How long any single server-side read may take before the test fails.
pub const STEP_TIMEOUT: Duration = Duration::from_secs(5);

/// A listening fake server on an ephemeral localhost port.
pub struct FakeServer {
    listener: TcpListener,
}

impl FakeServer {
    pub async fn bind() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake server");
        Self { listener }
    }

    pub fn port(&self) -> u16 {
        self.listener.local_addr().expect("local addr").port()
    }

    pub async fn accept(&self) -> Peer {
        let (stream, _) = timeout(STEP_TIMEOUT, self.listener.accept())
            .await
            .expect("accept timed out")
            .expect("accept failed");
        Peer::new(stream)
    }

    /// Connect a raw client stream and accept it, returning both ends.
    pub async fn pair(&self) -> (TcpStream, Peer) {
        let (client, peer) = tokio::join!(TcpStream::connect(("127.0.0.1", self.port())), self.accept());
        (client.expect("connect fake server"), peer)
    }
}

/// The server's view of one client connection.
pub struct Peer {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Peer {
    fn new(stream: TcpStream) -> Self {
        let (read_half, write_half) = stream.into_split();
        Self {
            reader: BufReader::new(read_half),
            writer: write_half,
        }
    }

    /// Send one line, appending CR/LF.
    pub async fn send(&mut self, line: &str) {
        self.writer
            .write_all(format!("{}\r\n", line).as_bytes())
            .await
            .expect("server write");
        self.writer.flush().await.expect("server flush");
    }

    /// Receive one line with its terminator stripped; `None` at EOF.
    pub async fn recv(&mut self) -> Option<String> {
        let mut line = String::new();
        let n = timeout(STEP_TIMEOUT, self.reader.read_line(&mut line))
            .await
            .expect("server read timed out")
            .expect("server read");
        if n == 0 {
            return None;
        }
        Some(line.trim_end_matches(['\r', '\n']).to_string())
    }

    /// Receive one line, failing the test at EOF.
    pub async fn expect_line(&mut self) -> String {
        self.recv().await.expect("unexpected EOF from client")
    }

    /// Consume the three identify lines.
    pub async fn expect_identify(&mut self) -> String {
        let nick = self.expect_line().await;
        assert!(nick.starts_with("NICK :"), "expected NICK, got {:?}", nick);
        let user = self.expect_line().await;
        assert!(user.starts_with("USER "), "expected USER, got {:?}", user);
        assert_eq!(self.expect_line().await, "NICK");
        nick
    }
}

/// A stream whose writes start failing once [`WriteSwitch::trip`] is called.
pub struct FlakyStream<S> {
    inner: S,
    broken: Arc<AtomicBool>,
}

/// Remote control for a [`FlakyStream`].
#[derive(Clone)]
pub struct WriteSwitch(Arc<AtomicBool>);

impl WriteSwitch {
    pub fn trip(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

impl<S> FlakyStream<S> {
    pub fn new(inner: S) -> (Self, WriteSwitch) {
        let broken = Arc::new(AtomicBool::new(false));
        (
            Self {
                inner,
                broken: Arc::clone(&broken),
            },
            WriteSwitch(broken),
        )
    }
}

impl<S: AsyncRead + Unpin> AsyncRead for FlakyStream<S> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for FlakyStream<S> {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        if self.broken.load(Ordering::SeqCst) {
            return Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "tripped")));
        }
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

/// Captures everything a session logs through its sink.
#[derive(Clone, Default)]
pub struct SinkCapture(Arc<Mutex<Vec<(String, String)>>>);

impl SinkCapture {
    pub fn sink(&self) -> impl Fn(&str, &str) + Send + Sync + 'static {
        let log = Arc::clone(&self.0);
        move |prefix, line| {
            log.lock()
                .expect("sink log poisoned")
                .push((prefix.to_string(), line.to_string()));
        }
    }

    pub fn entries(&self) -> Vec<(String, String)> {
        self.0.lock().expect("sink log poisoned").clone()
    }
}

/// Next delivered line, failing the test if none arrives in time.
pub async fn next_line(lines: &mut slirc_session::Lines) -> Option<String> {
    timeout(STEP_TIMEOUT, lines.next_line())
        .await
        .expect("timed out waiting for a delivered line")
}
