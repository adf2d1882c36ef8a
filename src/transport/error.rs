//! Transport error types.

use thiserror::Error;

use crate::error::ProtocolError;

/// Errors that can occur when reading a line from a transport.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportReadError {
    /// The peer closed the stream.
    #[error("end of stream")]
    Eof,
    /// The transport was closed on this side.
    #[error("transport closed locally")]
    Closed,
    /// An I/O error occurred.
    #[error("io error: {0}")]
    Io(std::io::Error),
    /// A protocol error occurred.
    #[error("protocol error: {0}")]
    Protocol(ProtocolError),
}

impl From<std::io::Error> for TransportReadError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<ProtocolError> for TransportReadError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::Io(err) => Self::Io(err),
            other => Self::Protocol(other),
        }
    }
}

/// Errors that can occur when writing a line to a transport.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WriteError {
    /// An I/O error occurred while writing or flushing.
    #[error("io error: {0}")]
    Io(std::io::Error),
    /// A protocol error occurred.
    #[error("protocol error: {0}")]
    Protocol(ProtocolError),
    /// The session has not been connected yet.
    #[error("not connected")]
    NotConnected,
    /// The transport was already closed.
    #[error("transport closed")]
    Closed,
}

impl From<std::io::Error> for WriteError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<ProtocolError> for WriteError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::Io(err) => Self::Io(err),
            other => Self::Protocol(other),
        }
    }
}
