//! Client configuration.

use std::time::Duration;

use secrecy::SecretString;

use crate::auth::AuthMethod;
use crate::retry::RetryPolicy;
use crate::tls::TlsConfig;

/// Default plaintext API port.
pub const DEFAULT_PORT: u16 = 8728;

/// Default TLS API port.
pub const DEFAULT_TLS_PORT: u16 = 8729;

/// Connection and login settings for one appliance.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Host name or address.
    pub host: String,
    /// Port override. `None` picks 8728, or 8729 when TLS is enabled.
    pub port: Option<u16>,
    /// Login name.
    pub username: String,
    /// Login password.
    pub password: SecretString,
    /// TLS settings. `None` means plaintext.
    pub tls: Option<TlsConfig>,
    /// Login exchange to use.
    pub auth_method: AuthMethod,
    /// Timeout for the TCP connect, and for reads and writes until the login
    /// completes.
    pub connect_timeout: Duration,
    /// Read timeout after login. `None` blocks indefinitely.
    pub read_timeout: Option<Duration>,
    /// Write timeout after login. `None` blocks indefinitely.
    pub write_timeout: Option<Duration>,
    /// TCP keepalive tuning.
    pub keepalive: KeepaliveConfig,
    /// Retry budget for establishing a session.
    pub retry: RetryPolicy,
    /// Largest inbound word accepted.
    pub max_word_size: u32,
}

/// TCP keepalive tuning used to notice silently dead peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeepaliveConfig {
    /// Idle time before the first probe.
    pub idle: Duration,
    /// Time between probes.
    pub interval: Duration,
    /// Unanswered probes before the connection is dropped.
    pub retries: u32,
}

impl Default for KeepaliveConfig {
    fn default() -> Self {
        Self {
            idle: Duration::from_secs(10),
            interval: Duration::from_secs(3),
            retries: 5,
        }
    }
}

impl ClientConfig {
    /// Creates a configuration for `host` with the given credentials.
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            username: username.into(),
            password: SecretString::from(password.into()),
            ..Self::default()
        }
    }

    /// Returns the port to connect to.
    pub fn port(&self) -> u16 {
        self.port.unwrap_or(if self.tls.is_some() {
            DEFAULT_TLS_PORT
        } else {
            DEFAULT_PORT
        })
    }

    /// Sets an explicit port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Enables TLS.
    #[must_use]
    pub fn with_tls(mut self, tls: TlsConfig) -> Self {
        self.tls = Some(tls);
        self
    }

    /// Selects the login exchange.
    #[must_use]
    pub fn with_auth_method(mut self, method: AuthMethod) -> Self {
        self.auth_method = method;
        self
    }

    /// Sets the connect and login timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the read timeout used after login.
    #[must_use]
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// Sets the write timeout used after login.
    #[must_use]
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = Some(timeout);
        self
    }

    /// Sets the keepalive tuning.
    #[must_use]
    pub fn with_keepalive(mut self, keepalive: KeepaliveConfig) -> Self {
        self.keepalive = keepalive;
        self
    }

    /// Sets the retry budget.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the largest inbound word accepted.
    #[must_use]
    pub fn with_max_word_size(mut self, size: u32) -> Self {
        self.max_word_size = size;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "192.168.88.1".to_string(),
            port: None,
            username: "admin".to_string(),
            password: SecretString::from(String::new()),
            tls: None,
            auth_method: AuthMethod::default(),
            connect_timeout: Duration::from_secs(15),
            read_timeout: None,
            write_timeout: None,
            keepalive: KeepaliveConfig::default(),
            retry: RetryPolicy::default(),
            max_word_size: ros_wire::DEFAULT_MAX_WORD_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn test_default_ports() {
        let config = ClientConfig::new("10.0.0.1", "admin", "secret");
        assert_eq!(config.port(), DEFAULT_PORT);

        let config = config.with_tls(TlsConfig::accept_any());
        assert_eq!(config.port(), DEFAULT_TLS_PORT);

        let config = config.with_port(18729);
        assert_eq!(config.port(), 18729);
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.connect_timeout, Duration::from_secs(15));
        assert_eq!(config.keepalive.idle, Duration::from_secs(10));
        assert!(config.read_timeout.is_none());
        assert_eq!(config.auth_method, AuthMethod::Challenge);
    }

    #[test]
    fn test_password_not_in_debug_output() {
        let config = ClientConfig::new("10.0.0.1", "admin", "hunter2");
        assert_eq!(config.password.expose_secret(), "hunter2");
        assert!(!format!("{config:?}").contains("hunter2"));
    }
}
