//! Error types for the IRC session library.
//!
//! Synchronous operations ([`connect`](crate::Session::connect), the
//! handshake steps and the send operations) return their error directly.
//! The reader loop has no synchronous caller, so its single terminal error
//! is delivered as a [`StreamError`] through [`Lines`](crate::Lines).

use std::fmt;

use thiserror::Error;

pub use crate::transport::{TransportReadError, WriteError};

/// Convenience type alias for Results using [`ProtocolError`].
pub type Result<T, E = ProtocolError> = std::result::Result<T, E>;

/// Errors raised by the line codec.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// I/O error during reading or writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The requested character encoding label is not known.
    #[error("unknown encoding: {0}")]
    UnknownEncoding(String),
}

/// One of the three registration steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandshakeStep {
    /// `NICK` / `USER` registration.
    Identify,
    /// NickServ identification.
    Authenticate,
    /// Joining the default channel.
    Join,
}

impl fmt::Display for HandshakeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HandshakeStep::Identify => "identify",
            HandshakeStep::Authenticate => "authenticate",
            HandshakeStep::Join => "join",
        })
    }
}

/// Failure of a single, independently callable handshake step.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StepError {
    /// One of the `NICK`/`USER` lines could not be written.
    #[error("error sending identify line {line:?}: {source}")]
    Identify {
        /// The line that failed.
        line: String,
        /// The underlying write failure.
        #[source]
        source: WriteError,
    },

    /// The NickServ `identify` line could not be written.
    #[error("error authenticating to services: {source}")]
    Authenticate {
        /// The underlying write failure.
        #[source]
        source: WriteError,
    },

    /// The `JOIN` line could not be written.
    #[error("error joining {channel}: {source}")]
    Join {
        /// The channel being joined.
        channel: String,
        /// The underlying write failure.
        #[source]
        source: WriteError,
    },
}

impl StepError {
    /// The handshake step this error belongs to.
    pub fn step(&self) -> HandshakeStep {
        match self {
            StepError::Identify { .. } => HandshakeStep::Identify,
            StepError::Authenticate { .. } => HandshakeStep::Authenticate,
            StepError::Join { .. } => HandshakeStep::Join,
        }
    }

    /// The write failure behind this step error.
    pub fn write_error(&self) -> &WriteError {
        match self {
            StepError::Identify { source, .. }
            | StepError::Authenticate { source }
            | StepError::Join { source, .. } => source,
        }
    }
}

/// The first failing step of a full handshake.
#[derive(Debug, Error)]
#[error("handshake error ({step}): {source}")]
pub struct HandshakeError {
    /// Which step failed.
    pub step: HandshakeStep,
    /// The step's own error.
    #[source]
    pub source: StepError,
}

impl From<StepError> for HandshakeError {
    fn from(source: StepError) -> Self {
        Self {
            step: source.step(),
            source,
        }
    }
}

/// Errors returned by [`Session::connect`](crate::Session::connect).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConnectError {
    /// The TCP connection could not be established.
    #[error("unable to make plaintext connection to {addr}: {source}")]
    Dial {
        /// `host:port` that was dialed.
        addr: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The TLS handshake failed, including certificate verification.
    #[error("unable to make tls connection to {addr}: {source}")]
    Tls {
        /// `host:port` that was dialed.
        addr: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The name to verify on the server certificate is not a valid DNS name or IP.
    #[error("invalid tls server name: {0:?}")]
    InvalidServerName(String),

    /// The line codec could not be set up.
    #[error("unable to set up line codec: {0}")]
    Protocol(#[from] ProtocolError),

    /// The session was already connected once.
    #[error("session already connected")]
    AlreadyConnected,

    /// Connected, but registration could not be sent.
    ///
    /// The transport is left open; call [`Session::close`](crate::Session::close)
    /// to release it.
    #[error("unable to handshake: {0}")]
    Handshake(#[from] HandshakeError),
}

/// The terminal error of a session's reader loop.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StreamError {
    /// Reading the next line failed, including end of stream.
    #[error("read error: {0}")]
    Read(#[from] TransportReadError),

    /// An automatic `PONG` could not be written.
    #[error("error sending pong: {0}")]
    Pong(#[source] WriteError),
}

impl StreamError {
    /// True if the stream ended because this side closed the transport
    /// (via [`Session::quit`](crate::Session::quit) or
    /// [`Session::close`](crate::Session::close)).
    pub fn is_local_close(&self) -> bool {
        matches!(self, StreamError::Read(TransportReadError::Closed))
    }

    /// True if the server closed the connection cleanly.
    pub fn is_eof(&self) -> bool {
        matches!(self, StreamError::Read(TransportReadError::Eof))
    }
}
