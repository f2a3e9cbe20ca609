//! # ros-client: Blocking client for the `RouterOS` API
//!
//! This crate manages the session layer on top of `ros-wire`: opening the
//! TCP socket (optionally TLS), tuning keepalive, logging in, and running
//! one request at a time against the appliance.
//!
//! ## Usage
//!
//! ```ignore
//! use ros_client::{Attributes, ClientConfig, Connection, TlsConfig};
//!
//! let config = ClientConfig::new("192.168.88.1", "admin", "secret")
//!     .with_tls(TlsConfig::accept_any());
//! let mut conn = Connection::open(config)?;
//!
//! // List addresses on one interface
//! let query = Attributes::new().with("interface", "ether1");
//! let addresses = conn.print("/ip/address", &query)?;
//!
//! // Add one and read back its id
//! let added = conn.add(
//!     "/ip/address",
//!     &Attributes::new()
//!         .with("address", "192.168.15.2/24")
//!         .with("interface", "ether7"),
//! )?;
//! let id = added.ret().unwrap_or_default().to_string();
//!
//! // Remove it again
//! conn.remove("/ip/address", &id)?;
//!
//! // Anything that is not print/add/set/remove
//! conn.command(
//!     "/system/backup/save",
//!     &Attributes::new().with("name", "nightly"),
//! )?;
//! ```
//!
//! ## Errors
//!
//! A `!trap` reply becomes [`ClientError::Trap`] and the connection stays
//! usable. A `!fatal` reply, a socket error or a framing error closes the
//! session; call [`Connection::reconnect`] to continue. Only connection-level
//! failures while establishing a session are retried automatically.
//!
//! ## Configuration
//!
//! ```ignore
//! use ros_client::{ClientConfig, RetryPolicy};
//! use std::time::Duration;
//!
//! let config = ClientConfig::new("router.lan", "api", "secret")
//!     .with_connect_timeout(Duration::from_secs(5))
//!     .with_read_timeout(Duration::from_secs(60))
//!     .with_retry(
//!         RetryPolicy::new(5)
//!             .with_delay(Duration::from_millis(200))
//!             .with_backoff(2.0)
//!             .with_timeout(Duration::from_secs(20)),
//!     );
//! ```

pub mod auth;
mod config;
mod connection;
mod error;
mod resource;
pub mod retry;
mod session;
pub mod tls;
pub mod transport;

pub use auth::{AuthMethod, challenge_response, login};
pub use config::{ClientConfig, DEFAULT_PORT, DEFAULT_TLS_PORT, KeepaliveConfig};
pub use connection::Connection;
pub use error::{ClientError, ClientResult};
pub use resource::Resource;
pub use retry::{RetryOutcome, RetryPolicy};
pub use session::{Response, Session, SessionState};
pub use tls::{CertificateVerification, TlsConfig};
pub use transport::{Connector, TcpConnector, Transport};

// Re-export useful types from dependencies
pub use ros_wire::{Attributes, Outcome, Reply, ReplyTag, WireError};
