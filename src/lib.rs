//! # slirc-session
//!
//! A minimal IRC client session on top of tokio.
//!
//! ## Features
//!
//! - Plaintext or TLS connections (rustls, Mozilla root store)
//! - Registration handshake: `NICK`/`USER`, NickServ identify, channel join
//! - A single background reader delivering server lines in order, with
//!   bounded backpressure
//! - Automatic `PING`/`PONG` handling
//! - Best-effort tracking of the nick the server assigned
//! - One terminal error per connection, delivered after the last line
//!
//! Messages are opaque lines here; there is no command parser.

#![deny(clippy::all)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! ## Quick Start
//!
//! ```no_run
//! use slirc_session::{Config, Session};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::new("irc.libera.chat", 6697, true, "", "bond", "james", "James Bond")
//!     .with_channel("#mi6", "")
//!     .with_auto_pong(true)
//!     .with_random_suffix(true);
//!
//! let mut session = Session::new(config);
//! let mut lines = session.take_lines().expect("fresh session");
//! session.connect().await?;
//!
//! while let Some(line) = lines.next_line().await {
//!     if line.contains("PRIVMSG") && line.ends_with(":!quit") {
//!         session.quit("bye").await?;
//!     }
//! }
//!
//! if let Some(err) = lines.try_error() {
//!     println!("stream ended: {}", err);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod line;
pub mod session;
pub mod transport;

pub use self::config::{Config, DEFAULT_MAX_LINE_LEN};
pub use self::error::{
    ConnectError, HandshakeError, HandshakeStep, ProtocolError, StepError, StreamError,
};
pub use self::line::LineCodec;
pub use self::session::{observe_nick, pong_argument, tracing_sink, Lines, LogSink, Session};
pub use self::transport::{TransportReadError, WriteError};
