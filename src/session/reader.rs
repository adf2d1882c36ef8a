//! The background reader loop.
//!
//! The loop owns both sending halves of the delivery channels. It sends
//! the terminal error (consuming the oneshot sender) before dropping the
//! line sender, so the line stream can only end once, and always after its
//! error is available.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::StreamError;
use crate::transport::LineReader;

use super::{LoopChannels, Shared};

/// If `line` is a server `PING`, the argument to echo back in the `PONG`.
///
/// The match is case-insensitive on `ping `; everything after that first
/// space is returned untouched.
pub fn pong_argument(line: &str) -> Option<&str> {
    let head = line.get(..5)?;
    if head.eq_ignore_ascii_case("ping ") {
        Some(&line[5..])
    } else {
        None
    }
}

/// The nick a numeric reply addresses, e.g. `bond-42` in
/// `:server 001 bond-42 :Welcome`.
///
/// The line is split on single spaces into at most four pieces. It only
/// counts if there are exactly four and the second is a three-digit code.
pub fn observe_nick(line: &str) -> Option<&str> {
    let mut parts = line.splitn(4, ' ');
    let (_source, code, nick, _rest) = (parts.next()?, parts.next()?, parts.next()?, parts.next()?);

    if code.len() == 3 && code.bytes().all(|b| b.is_ascii_digit()) {
        Some(nick)
    } else {
        None
    }
}

pub(super) async fn run(shared: Arc<Shared>, mut reader: LineReader, channels: LoopChannels) {
    let LoopChannels { lines, error } = channels;

    let err = loop {
        let line = match reader.read_line().await {
            Ok(line) => line,
            Err(e) => break StreamError::Read(e),
        };

        shared.log_received(&line);

        let auto_pong = shared.config.read().auto_pong;
        if auto_pong {
            if let Some(arg) = pong_argument(&line) {
                let pong = format!("PONG {}", arg);
                if let Err(e) = shared.send_line(&pong).await {
                    break StreamError::Pong(e);
                }
            }
        }

        if let Some(nick) = observe_nick(&line) {
            *shared.observed_nick.lock() = nick.to_string();
        }

        if lines.send(line).await.is_err() {
            debug!("line receiver dropped, stopping reader");
            return;
        }
    };

    if err.is_local_close() {
        debug!("reader stopped: {}", err);
    } else {
        warn!("reader stopped: {}", err);
    }

    // Release our half of the stream before anyone can observe the end.
    drop(reader);

    // The receiver may already be gone; nobody is left to tell then.
    let _ = error.send(err);
    drop(lines);
}
