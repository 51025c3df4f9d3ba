//! High-level clients: a configuration builder plus blocking and async
//! clients that own one session each.

use std::net::SocketAddr;
use std::time::Duration;

use crate::auth::SecretBytes;
use crate::error::{Error, Result};
use crate::handshake::{CURRENT_CHANNEL, SessionParams};
use crate::negotiate::Negotiator;
use crate::types::{AuthType, PrivilegeLevel};

#[cfg(feature = "blocking")]
pub(crate) mod blocking;

#[cfg(feature = "async")]
pub(crate) mod tokio;

/// Builder for [`Client`](crate::Client) and [`AsyncClient`](crate::AsyncClient).
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    target: SocketAddr,
    username: Option<Vec<u8>>,
    password: Option<SecretBytes>,
    privilege_level: PrivilegeLevel,
    channel: u8,
    timeout: Duration,
    retries: u32,
    negotiator: Negotiator,
    initial_inbound_sequence: Option<u32>,
}

impl ClientBuilder {
    /// Create a new builder.
    pub fn new(target: SocketAddr) -> Self {
        Self {
            target,
            username: None,
            password: None,
            privilege_level: PrivilegeLevel::Administrator,
            channel: CURRENT_CHANNEL,
            timeout: Duration::from_secs(1),
            retries: 3,
            negotiator: Negotiator::default(),
            initial_inbound_sequence: None,
        }
    }

    /// Set the username (bytes).
    ///
    /// IPMI usernames are ASCII in most deployments, but the protocol treats them as raw bytes.
    /// Names longer than 16 bytes are truncated on the wire.
    pub fn username_bytes(mut self, username: impl Into<Vec<u8>>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Set the username (UTF-8 string). This is a convenience wrapper around [`Self::username_bytes`].
    pub fn username(self, username: impl AsRef<str>) -> Self {
        self.username_bytes(username.as_ref().as_bytes())
    }

    /// Set the password (bytes).
    pub fn password_bytes(mut self, password: impl Into<Vec<u8>>) -> Self {
        self.password = Some(SecretBytes::new(password.into()));
        self
    }

    /// Set the password (UTF-8 string). This is a convenience wrapper around [`Self::password_bytes`].
    pub fn password(self, password: impl AsRef<str>) -> Self {
        self.password_bytes(password.as_ref().as_bytes())
    }

    /// Set requested session privilege level (default Administrator).
    pub fn privilege_level(mut self, level: PrivilegeLevel) -> Self {
        self.privilege_level = level;
        self
    }

    /// Channel to authenticate on (default `0x0E`, the receiving channel).
    pub fn channel(mut self, channel: u8) -> Self {
        self.channel = channel;
        self
    }

    /// Set UDP read timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set number of send attempts per request (including the first attempt).
    pub fn retries(mut self, attempts: u32) -> Self {
        self.retries = attempts;
        self
    }

    /// Only negotiate one of `auth_types`.
    pub fn auth_types(mut self, auth_types: impl IntoIterator<Item = AuthType>) -> Self {
        self.negotiator = Negotiator::accepting(auth_types);
        self
    }

    /// Fix the initial inbound session sequence number (default: random, non-zero).
    pub fn initial_inbound_sequence(mut self, sequence: u32) -> Self {
        self.initial_inbound_sequence = Some(sequence);
        self
    }

    fn session_params(&self) -> Result<SessionParams> {
        let username = self
            .username
            .clone()
            .ok_or(Error::InvalidArgument("username is required"))?;
        let password = self
            .password
            .clone()
            .ok_or(Error::InvalidArgument("password is required"))?;

        let mut params = SessionParams::with_secret(username, password)
            .channel(self.channel)
            .privilege_level(self.privilege_level)
            .negotiator(self.negotiator);
        if let Some(sequence) = self.initial_inbound_sequence {
            params = params.initial_inbound_sequence(sequence);
        }
        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> SocketAddr {
        "127.0.0.1:623".parse().expect("addr")
    }

    #[test]
    fn credentials_are_required() {
        let err = ClientBuilder::new(target())
            .password("secret")
            .session_params()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument("username is required")));

        let err = ClientBuilder::new(target())
            .username("admin")
            .session_params()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument("password is required")));
    }

    #[test]
    fn builder_debug_hides_password() {
        let builder = ClientBuilder::new(target())
            .username("admin")
            .password("hunter2");
        let rendered = format!("{builder:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<secret>"));
    }
}
