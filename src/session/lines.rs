//! The caller's end of the reader loop.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::Stream;
use tokio::sync::{mpsc, oneshot};

use crate::error::StreamError;

/// Lines received from the server, in order, followed by one terminal error.
///
/// The stream ends when the reader loop stops. By then its error, if any,
/// is already in place, so [`try_error`](Self::try_error) right after
/// [`next_line`](Self::next_line) returns `None` will not miss it.
///
/// Not reading stalls the reader loop, including automatic `PONG`s.
#[derive(Debug)]
pub struct Lines {
    rx: mpsc::Receiver<String>,
    error: Option<oneshot::Receiver<StreamError>>,
}

impl Lines {
    pub(crate) fn new(rx: mpsc::Receiver<String>, error: oneshot::Receiver<StreamError>) -> Self {
        Self {
            rx,
            error: Some(error),
        }
    }

    /// Wait for the next line. `None` once the stream has ended.
    pub async fn next_line(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    /// Take the terminal error without waiting.
    ///
    /// Returns `None` while the reader is still running, after the error was
    /// taken, or if the reader never produced one.
    pub fn try_error(&mut self) -> Option<StreamError> {
        let rx = self.error.as_mut()?;
        match rx.try_recv() {
            Ok(err) => {
                self.error = None;
                Some(err)
            }
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => {
                self.error = None;
                None
            }
        }
    }

    /// Wait for the reader loop to stop and return its error.
    ///
    /// Remaining lines are read and discarded until the stream ends. `None`
    /// if the session was dropped without ever running a reader, or the
    /// error was already taken.
    pub async fn error(mut self) -> Option<StreamError> {
        while self.rx.recv().await.is_some() {}
        let rx = self.error.take()?;
        rx.await.ok()
    }
}

impl Stream for Lines {
    type Item = String;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<String>> {
        self.rx.poll_recv(cx)
    }
}
