//! A single IRC server connection.
//!
//! A [`Session`] is built from a [`Config`], connected once with
//! [`Session::connect`], and from then on runs one background reader task
//! that delivers server lines through [`Lines`]. Send operations take
//! `&self` and may be called from any task while the reader runs.
//!
//! Configuration is read at the moment each operation runs. Changing it
//! through [`Session::update_config`] while an operation is in flight has
//! no defined ordering with respect to that operation.

mod handshake;
mod lines;
mod reader;

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{ConnectError, StreamError};
use crate::transport::{self, AsyncStream, CloseHandle, LineWriter, Transport, WriteError};

pub use lines::Lines;
pub use reader::{observe_nick, pong_argument};

/// Receives `(prefix, line)` for every logged line.
pub type LogSink = Arc<dyn Fn(&str, &str) + Send + Sync>;

/// Tracing target used by the default [`LogSink`].
pub const WIRE_TARGET: &str = "slirc_session::wire";

/// The default sink: one `info` event per line on [`WIRE_TARGET`].
pub fn tracing_sink() -> LogSink {
    Arc::new(|prefix, line| info!(target: WIRE_TARGET, "{} {}", prefix, line))
}

/// State shared between the session handle and its reader task.
pub(crate) struct Shared {
    config: RwLock<Config>,
    sink: RwLock<LogSink>,
    rng: Mutex<Box<dyn RngCore + Send>>,
    writer: tokio::sync::Mutex<Option<LineWriter>>,
    closer: Mutex<Option<CloseHandle>>,
    observed_nick: Mutex<String>,
}

impl Shared {
    /// Write one line and, on success, log it with the transmit prefix.
    ///
    /// Errors are returned unwrapped; callers add their own context.
    pub(crate) async fn send_line(&self, line: &str) -> Result<(), WriteError> {
        let line = first_line(line);
        {
            let mut writer = self.writer.lock().await;
            // `close` takes the writer, so a missing one after close means closed.
            let writer = writer.as_mut().ok_or_else(|| {
                if self.is_closed() {
                    WriteError::Closed
                } else {
                    WriteError::NotConnected
                }
            })?;
            writer.write_line(line).await?;
        }

        let prefix = self.config.read().tx_prefix.clone();
        if !prefix.is_empty() {
            let sink = self.sink.read().clone();
            sink(&prefix, line);
        }
        Ok(())
    }

    pub(crate) fn log_received(&self, line: &str) {
        let prefix = self.config.read().rx_prefix.clone();
        if !prefix.is_empty() {
            let sink = self.sink.read().clone();
            sink(&prefix, line);
        }
    }

    fn is_closed(&self) -> bool {
        self.closer
            .lock()
            .as_ref()
            .is_some_and(CloseHandle::is_closed)
    }

    fn random_suffix(&self) -> u64 {
        self.rng.lock().next_u64() & i64::MAX as u64
    }
}

/// The part of `line` the codec will actually put on the wire.
fn first_line(line: &str) -> &str {
    match line.find(['\r', '\n']) {
        Some(pos) => &line[..pos],
        None => line,
    }
}

/// Sending halves of the delivery channels, held until the reader starts.
pub(crate) struct LoopChannels {
    lines: mpsc::Sender<String>,
    error: oneshot::Sender<StreamError>,
}

/// One connection to an IRC server.
pub struct Session {
    shared: Arc<Shared>,
    pending: Option<LoopChannels>,
    lines: Option<Lines>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("config", &*self.shared.config.read())
            .field("connected", &self.pending.is_none())
            .field("observed_nick", &*self.shared.observed_nick.lock())
            .finish()
    }
}

impl Session {
    /// Create an unconnected session.
    pub fn new(config: Config) -> Self {
        // Capacity 1 keeps the reader in lock step with the consumer.
        let (lines_tx, lines_rx) = mpsc::channel(1);
        let (error_tx, error_rx) = oneshot::channel();

        let shared = Shared {
            config: RwLock::new(config),
            sink: RwLock::new(tracing_sink()),
            rng: Mutex::new(Box::new(StdRng::from_entropy())),
            writer: tokio::sync::Mutex::new(None),
            closer: Mutex::new(None),
            observed_nick: Mutex::new(String::new()),
        };

        Self {
            shared: Arc::new(shared),
            pending: Some(LoopChannels {
                lines: lines_tx,
                error: error_tx,
            }),
            lines: Some(Lines::new(lines_rx, error_rx)),
        }
    }

    /// Replace the sink that logs transmitted and received lines.
    pub fn set_sink(&self, sink: impl Fn(&str, &str) + Send + Sync + 'static) {
        *self.shared.sink.write() = Arc::new(sink);
    }

    /// Replace the random source used for nick suffixes.
    pub fn set_rng(&self, rng: impl RngCore + Send + 'static) {
        *self.shared.rng.lock() = Box::new(rng);
    }

    /// A snapshot of the current configuration.
    pub fn config(&self) -> Config {
        self.shared.config.read().clone()
    }

    /// Change the configuration in place.
    pub fn update_config(&self, f: impl FnOnce(&mut Config)) {
        f(&mut self.shared.config.write());
    }

    /// Take the receiving side of the line stream.
    ///
    /// Returns `None` after the first call.
    pub fn take_lines(&mut self) -> Option<Lines> {
        self.lines.take()
    }

    /// Dial the configured server, run the handshake and start the reader loop.
    ///
    /// On a handshake failure the transport stays open and no reader is
    /// started; use [`close`](Self::close) to drop the connection.
    pub async fn connect(&mut self) -> Result<(), ConnectError> {
        if self.pending.is_none() {
            return Err(ConnectError::AlreadyConnected);
        }

        let (host, port, verify_name) = {
            let config = self.shared.config.read();
            (
                config.host.clone(),
                config.port,
                config.verify_name().map(str::to_owned),
            )
        };

        let stream = transport::dial(&host, port, verify_name.as_deref()).await?;
        self.connect_with_stream(stream).await
    }

    /// Like [`connect`](Self::connect), over an already established stream.
    pub async fn connect_with_stream<S>(&mut self, stream: S) -> Result<(), ConnectError>
    where
        S: AsyncStream + 'static,
    {
        let channels = self.pending.take().ok_or(ConnectError::AlreadyConnected)?;

        let label = self.shared.config.read().encoding.clone();
        let (reader, writer, closer) = match Transport::split(stream, &label) {
            Ok(parts) => parts,
            Err(e) => {
                self.pending = Some(channels);
                return Err(e.into());
            }
        };
        *self.shared.writer.lock().await = Some(writer);
        *self.shared.closer.lock() = Some(closer);

        if let Err(e) = self.handshake().await {
            self.pending = Some(channels);
            return Err(e.into());
        }

        debug!("handshake complete, starting reader");
        tokio::spawn(reader::run(Arc::clone(&self.shared), reader, channels));
        Ok(())
    }

    /// Send a raw protocol line, such as `WHOIS bond` or `CAP LS`.
    ///
    /// The line is not wrapped in anything. Successfully sent lines are
    /// logged when a transmit prefix is configured.
    pub async fn send_line(&self, line: &str) -> Result<(), WriteError> {
        self.shared.send_line(line).await
    }

    /// Format and send a raw protocol line.
    ///
    /// ```ignore
    /// session.send_fmt(format_args!("MODE {} +i", nick)).await?;
    /// ```
    pub fn send_fmt(
        &self,
        args: fmt::Arguments<'_>,
    ) -> impl Future<Output = Result<(), WriteError>> + Send + '_ {
        let line = args.to_string();
        async move { self.shared.send_line(&line).await }
    }

    /// Send `message` to `target`.
    ///
    /// An empty target falls back to the default target and then to the
    /// default channel. With none of them set nothing is sent.
    pub async fn privmsg(&self, message: &str, target: &str) -> Result<(), WriteError> {
        let line = {
            let config = self.shared.config.read();
            match config.resolve_target(target) {
                Some(target) => format!("PRIVMSG {} :{}", target, message),
                None => return Ok(()),
            }
        };
        self.shared.send_line(&line).await
    }

    /// Payload bytes left for a PRIVMSG to `target` under the maximum line length.
    ///
    /// Uses the same target fallback as [`privmsg`](Self::privmsg) and
    /// returns -1 if no target resolves.
    pub fn privmsg_size(&self, target: &str) -> isize {
        let config = self.shared.config.read();
        match config.resolve_target(target) {
            Some(target) => {
                let overhead = "PRIVMSG ".len() + target.len() + " :".len();
                config.max_line_len as isize - overhead as isize
            }
            None => -1,
        }
    }

    /// The nick the server appears to have given us.
    ///
    /// Inferred from numeric replies seen by the reader loop, so it is only
    /// as fresh as the lines that have been consumed. Empty until one is seen.
    pub fn observed_nick(&self) -> String {
        self.shared.observed_nick.lock().clone()
    }

    /// Send `QUIT` and close the transport.
    ///
    /// An empty `message` falls back to the configured quit message; with
    /// neither, a bare `QUIT` is sent. The line stream ends shortly after
    /// with [`TransportReadError::Closed`](crate::TransportReadError::Closed).
    pub async fn quit(&self, message: &str) -> Result<(), WriteError> {
        let line = {
            let config = self.shared.config.read();
            let message = if message.is_empty() {
                config.quit_message.as_str()
            } else {
                message
            };
            if message.is_empty() {
                "QUIT".to_string()
            } else {
                format!("QUIT :{}", message)
            }
        };

        self.shared.send_line(&line).await?;
        self.close().await
    }

    /// Close the transport without sending anything.
    ///
    /// Sends still waiting on the peer fail with [`WriteError::Closed`]. The
    /// reader loop notices and ends the line stream, and the connection is
    /// released when it exits. Closing twice is a no-op.
    pub async fn close(&self) -> Result<(), WriteError> {
        let closer = self.shared.closer.lock().clone();
        let closer = closer.ok_or(WriteError::NotConnected)?;
        if !closer.close() {
            return Ok(());
        }

        debug!("closing transport");
        // In-flight writes bail out on the close flag, so this lock is released promptly.
        let writer = self.shared.writer.lock().await.take();
        match writer {
            Some(writer) => writer.shutdown(),
            None => Ok(()),
        }
    }

    /// Whether the transport has been closed locally.
    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }
}
