//! Client error types.

use std::time::Duration;

use ros_wire::{Attributes, WireError};
use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur during client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Socket error: refused, reset, timed out.
    #[error("connection error: {0}")]
    Connection(#[from] std::io::Error),

    /// The byte stream could not be framed; the session has been closed.
    #[error("wire protocol error: {0}")]
    Wire(#[from] WireError),

    /// The session has no live socket.
    #[error("not connected to appliance")]
    NotConnected,

    /// Login was rejected.
    #[error("authentication failed: {message}")]
    Authentication { message: String },

    /// The request was rejected with `!trap`. The session is still usable.
    #[error("request rejected: {message}")]
    Trap {
        message: String,
        attributes: Attributes,
    },

    /// The appliance sent `!fatal`. The session has been closed.
    #[error("fatal error from appliance: {message}")]
    Fatal {
        message: String,
        attributes: Attributes,
    },

    /// TLS setup failed.
    #[error("TLS error: {0}")]
    Tls(String),

    /// The reply did not have the expected shape.
    #[error("unexpected reply: {0}")]
    UnexpectedReply(String),

    /// `set` was called without an object identifier.
    #[error("missing object id for {path}/set")]
    MissingId { path: String },

    /// Every connection attempt failed.
    #[error("gave up after {attempts} attempt(s) in {elapsed:?}: {source}")]
    RetriesExhausted {
        attempts: u32,
        elapsed: Duration,
        #[source]
        source: Box<ClientError>,
    },
}

impl ClientError {
    /// Creates a trap error from the trap's attributes.
    pub fn trap(attributes: Attributes) -> Self {
        Self::Trap {
            message: describe(&attributes),
            attributes,
        }
    }

    /// Creates a fatal error from the fatal reply's attributes.
    pub fn fatal(attributes: Attributes) -> Self {
        Self::Fatal {
            message: describe(&attributes),
            attributes,
        }
    }

    /// Returns true for failures of the socket or the byte stream, including
    /// a connect budget that ran out.
    ///
    /// These always end the session.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            ClientError::Connection(_)
                | ClientError::Wire(_)
                | ClientError::NotConnected
                | ClientError::RetriesExhausted { .. }
        )
    }

    /// Returns true if a fresh connection attempt might succeed.
    ///
    /// Traps, fatals, rejected logins and TLS configuration errors are never
    /// retried: waiting will not change the answer. Neither is an exhausted
    /// budget, which already stands for a whole series of attempts.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ClientError::Connection(_) | ClientError::Wire(_) | ClientError::NotConnected
        )
    }

    /// Returns the attributes of a `!trap` or `!fatal`, if this is one.
    pub fn reply_attributes(&self) -> Option<&Attributes> {
        match self {
            ClientError::Trap { attributes, .. } | ClientError::Fatal { attributes, .. } => {
                Some(attributes)
            }
            _ => None,
        }
    }
}

/// The `message` attribute, or every word of the reply when there is none.
///
/// `!fatal` often carries its reason as a bare word, which parses as a key
/// with an empty value.
fn describe(attributes: &Attributes) -> String {
    if let Some(message) = attributes.message() {
        return message.to_owned();
    }
    attributes
        .iter()
        .map(|(key, value)| {
            if value.is_empty() {
                key.to_owned()
            } else {
                format!("{key}={value}")
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trap_uses_message_attribute() {
        let err = ClientError::trap(Attributes::new().with("message", "no such command"));
        assert_eq!(err.to_string(), "request rejected: no such command");
        assert!(!err.is_retryable());
        assert_eq!(
            err.reply_attributes().and_then(Attributes::message),
            Some("no such command")
        );
    }

    #[test]
    fn test_fatal_without_message_shows_attributes() {
        let err = ClientError::fatal(Attributes::new().with("category", "5"));
        assert_eq!(err.to_string(), "fatal error from appliance: category=5");
        assert!(!err.is_connection_error());

        let err = ClientError::fatal(Attributes::from_words(&[b"session terminated on request"]));
        assert_eq!(
            err.to_string(),
            "fatal error from appliance: session terminated on request"
        );
    }

    #[test]
    fn test_connection_errors_are_retryable() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        assert!(ClientError::from(io).is_retryable());
        assert!(ClientError::from(WireError::ConnectionClosed).is_retryable());
        assert!(ClientError::NotConnected.is_connection_error());
        assert!(
            !ClientError::Authentication {
                message: "invalid user name or password".into()
            }
            .is_retryable()
        );
        assert!(!ClientError::Tls("bad certificate".into()).is_retryable());
    }

    #[test]
    fn test_exhausted_budget_is_connection_error_but_not_retryable() {
        let err = ClientError::RetriesExhausted {
            attempts: 3,
            elapsed: Duration::from_millis(30),
            source: Box::new(ClientError::NotConnected),
        };
        assert!(err.is_connection_error());
        assert!(!err.is_retryable());
    }
}
