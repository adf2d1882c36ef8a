//! Session configuration.
//!
//! Every optional setting uses the empty string for "unset", which keeps
//! the fallback chains (explicit argument, then configured default) a
//! plain `is_empty` check.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default maximum protocol line length, in bytes.
///
/// 510 is the RFC limit; 467 leaves room for the prefix servers prepend
/// when relaying a message.
pub const DEFAULT_MAX_LINE_LEN: usize = 467;

/// Identity and behaviour of a [`Session`](crate::Session).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Config {
    /// Host to connect to.
    pub host: String,
    /// Port to connect to.
    pub port: u16,
    /// Use TLS.
    pub tls: bool,
    /// Name to verify on the server certificate. Falls back to `host`.
    pub tls_server_name: String,

    /// Nick sent with `NICK`.
    pub nick: String,
    /// Username sent with `USER`.
    pub username: String,
    /// Real name sent with `USER`.
    pub realname: String,
    /// Append `-<random number>` to the nick when identifying.
    pub random_suffix: bool,

    /// Account name for NickServ `identify`.
    pub nickserv_nick: String,
    /// Password for NickServ `identify`.
    pub nickserv_password: String,

    /// Channel joined during the handshake, and the last-resort PRIVMSG target.
    pub channel: String,
    /// Key for `channel`.
    pub channel_password: String,
    /// Default PRIVMSG target.
    pub default_target: String,
    /// Default QUIT message.
    pub quit_message: String,

    /// Prefix for logging transmitted lines. Empty disables logging.
    pub tx_prefix: String,
    /// Prefix for logging received lines. Empty disables logging.
    pub rx_prefix: String,

    /// Answer server `PING`s automatically.
    pub auto_pong: bool,
    /// Maximum protocol line length, used by
    /// [`Session::privmsg_size`](crate::Session::privmsg_size). Not enforced.
    pub max_line_len: usize,
    /// Character encoding label for the wire.
    ///
    /// Only honoured with the `encoding` feature; UTF-8 otherwise.
    pub encoding: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 6667,
            tls: false,
            tls_server_name: String::new(),
            nick: String::new(),
            username: String::new(),
            realname: String::new(),
            random_suffix: false,
            nickserv_nick: String::new(),
            nickserv_password: String::new(),
            channel: String::new(),
            channel_password: String::new(),
            default_target: String::new(),
            quit_message: String::new(),
            tx_prefix: String::new(),
            rx_prefix: String::new(),
            auto_pong: false,
            max_line_len: DEFAULT_MAX_LINE_LEN,
            encoding: "utf-8".to_string(),
        }
    }
}

impl Config {
    /// Create a configuration with the connection identity set.
    ///
    /// `tls_server_name` is ignored without TLS. With TLS and an empty name
    /// the host name is verified instead.
    pub fn new(
        host: impl Into<String>,
        port: u16,
        tls: bool,
        tls_server_name: impl Into<String>,
        nick: impl Into<String>,
        username: impl Into<String>,
        realname: impl Into<String>,
    ) -> Self {
        let host = host.into();
        let mut tls_server_name = tls_server_name.into();
        if tls && tls_server_name.is_empty() {
            tls_server_name = host.clone();
        }

        Self {
            host,
            port,
            tls,
            tls_server_name,
            nick: nick.into(),
            username: username.into(),
            realname: realname.into(),
            ..Self::default()
        }
    }

    /// Set the NickServ credentials.
    pub fn with_nickserv(mut self, nick: impl Into<String>, password: impl Into<String>) -> Self {
        self.nickserv_nick = nick.into();
        self.nickserv_password = password.into();
        self
    }

    /// Set the default channel and its key.
    pub fn with_channel(mut self, channel: impl Into<String>, password: impl Into<String>) -> Self {
        self.channel = channel.into();
        self.channel_password = password.into();
        self
    }

    /// Set the default PRIVMSG target.
    pub fn with_default_target(mut self, target: impl Into<String>) -> Self {
        self.default_target = target.into();
        self
    }

    /// Set the default QUIT message.
    pub fn with_quit_message(mut self, message: impl Into<String>) -> Self {
        self.quit_message = message.into();
        self
    }

    /// Set the transmit and receive logging prefixes.
    pub fn with_log_prefixes(mut self, tx: impl Into<String>, rx: impl Into<String>) -> Self {
        self.tx_prefix = tx.into();
        self.rx_prefix = rx.into();
        self
    }

    /// Enable or disable automatic `PONG` replies.
    pub fn with_auto_pong(mut self, enabled: bool) -> Self {
        self.auto_pong = enabled;
        self
    }

    /// Enable or disable the random nick suffix.
    pub fn with_random_suffix(mut self, enabled: bool) -> Self {
        self.random_suffix = enabled;
        self
    }

    /// Set the maximum protocol line length.
    pub fn with_max_line_len(mut self, len: usize) -> Self {
        self.max_line_len = len;
        self
    }

    /// The name to verify on the server certificate, or `None` for plaintext.
    pub fn verify_name(&self) -> Option<&str> {
        if !self.tls {
            None
        } else if self.tls_server_name.is_empty() {
            Some(&self.host)
        } else {
            Some(&self.tls_server_name)
        }
    }

    /// Resolve a PRIVMSG target: `target`, then the default target, then the channel.
    pub fn resolve_target<'a>(&'a self, target: &'a str) -> Option<&'a str> {
        [target, self.default_target.as_str(), self.channel.as_str()]
            .into_iter()
            .find(|t| !t.is_empty())
    }
}
