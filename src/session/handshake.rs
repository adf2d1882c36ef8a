//! Registration: identify, authenticate, join.
//!
//! Each step is a no-op unless the configuration it needs is present, and
//! each can be called again on its own after connecting.

use tracing::debug;

use crate::error::{HandshakeError, StepError};

use super::Session;

impl Session {
    /// Run [`identify`](Self::identify), [`authenticate`](Self::authenticate)
    /// and [`join`](Self::join) with the configured channel, in that order.
    pub async fn handshake(&self) -> Result<(), HandshakeError> {
        self.identify().await?;
        self.authenticate().await?;
        self.join("", "").await?;
        Ok(())
    }

    /// Send `NICK` and `USER`, then a bare `NICK`.
    ///
    /// The bare `NICK` makes the server answer with the nick it actually
    /// assigned, which the reader loop picks up for
    /// [`observed_nick`](Self::observed_nick). Does nothing unless nick,
    /// username and realname are all set.
    pub async fn identify(&self) -> Result<(), StepError> {
        let (nick, username, realname, random_suffix) = {
            let config = self.shared.config.read();
            (
                config.nick.clone(),
                config.username.clone(),
                config.realname.clone(),
                config.random_suffix,
            )
        };
        if nick.is_empty() || username.is_empty() || realname.is_empty() {
            return Ok(());
        }

        let nick = if random_suffix {
            format!("{}-{}", nick, self.shared.random_suffix())
        } else {
            nick
        };
        debug!("identifying as {}", nick);

        let lines = [
            format!("NICK :{}", nick),
            format!("USER {} x x :{}", username, realname),
            "NICK".to_string(),
        ];
        for line in lines {
            if let Err(source) = self.shared.send_line(&line).await {
                return Err(StepError::Identify { line, source });
            }
        }
        Ok(())
    }

    /// Identify to NickServ. Does nothing unless both credentials are set.
    pub async fn authenticate(&self) -> Result<(), StepError> {
        let line = {
            let config = self.shared.config.read();
            if config.nickserv_nick.is_empty() || config.nickserv_password.is_empty() {
                return Ok(());
            }
            format!(
                "PRIVMSG NickServ :identify {} {}",
                config.nickserv_nick, config.nickserv_password
            )
        };

        self.shared
            .send_line(&line)
            .await
            .map_err(|source| StepError::Authenticate { source })
    }

    /// Join `channel` with an optional key.
    ///
    /// An empty `channel` means the configured channel and key. If that is
    /// empty too, nothing is sent. The line is always `JOIN <channel> <key>`,
    /// so an empty key leaves a trailing space.
    pub async fn join(&self, channel: &str, password: &str) -> Result<(), StepError> {
        let (channel, password) = if channel.is_empty() {
            let config = self.shared.config.read();
            (config.channel.clone(), config.channel_password.clone())
        } else {
            (channel.to_string(), password.to_string())
        };
        if channel.is_empty() {
            return Ok(());
        }

        let line = format!("JOIN {} {}", channel, password);
        self.shared
            .send_line(&line)
            .await
            .map_err(|source| StepError::Join { channel, source })
    }
}
