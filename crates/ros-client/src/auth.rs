//! Login exchange.
//!
//! The challenge login takes two round trips:
//!
//! ```text
//!   client                               appliance
//!     │  /login                              │
//!     │ ───────────────────────────────────▶ │
//!     │  !done =ret=<hex challenge>          │
//!     │ ◀─────────────────────────────────── │
//!     │  /login =name=<user>                 │
//!     │         =response=00<hex md5>        │
//!     │ ───────────────────────────────────▶ │
//!     │  !done                               │
//!     │ ◀─────────────────────────────────── │
//! ```
//!
//! where the digest is `md5(0x00 || password || challenge)` over the raw
//! challenge bytes. Newer firmware also accepts a single `/login` carrying the
//! name and plaintext password.

use std::io::{Read, Write};

use md5::{Digest, Md5};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info};

use crate::error::{ClientError, ClientResult};
use crate::session::Session;

/// Which login exchange to perform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthMethod {
    /// Two-step MD5 challenge/response.
    #[default]
    Challenge,
    /// Single step with the plaintext password (use with TLS).
    Plain,
}

/// Computes the `=response=` value for a challenge.
///
/// Returns `"00"` followed by the hex MD5 of a zero byte, the password bytes
/// and the raw challenge bytes.
pub fn challenge_response(password: &[u8], challenge: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update([0u8]);
    hasher.update(password);
    hasher.update(challenge);
    format!("00{}", hex::encode(hasher.finalize()))
}

/// Logs in on a freshly connected session.
///
/// A `!trap` at either step becomes [`ClientError::Authentication`]; socket
/// failures keep their connection-error kind so the caller can retry them.
pub fn login<S: Read + Write>(
    session: &mut Session<S>,
    username: &str,
    password: &SecretString,
    method: AuthMethod,
) -> ClientResult<()> {
    let result = match method {
        AuthMethod::Challenge => login_challenge(session, username, password),
        AuthMethod::Plain => login_plain(session, username, password),
    };
    result.map_err(into_auth_error)?;

    session.mark_authenticated();
    info!(username, ?method, "logged in");
    Ok(())
}

fn login_challenge<S: Read + Write>(
    session: &mut Session<S>,
    username: &str,
    password: &SecretString,
) -> ClientResult<()> {
    let challenge = session.request(&["/login"])?;
    let token = challenge
        .ret()
        .ok_or_else(|| ClientError::UnexpectedReply("login reply carries no challenge".into()))?;
    let token = hex::decode(token).map_err(|e| {
        ClientError::UnexpectedReply(format!("login challenge is not hex: {e}"))
    })?;
    debug!(challenge_len = token.len(), "received login challenge");

    let response = challenge_response(password.expose_secret().as_bytes(), &token);
    session.request(&[
        "/login".to_string(),
        format!("=name={username}"),
        format!("=response={response}"),
    ])?;
    Ok(())
}

fn login_plain<S: Read + Write>(
    session: &mut Session<S>,
    username: &str,
    password: &SecretString,
) -> ClientResult<()> {
    session.request(&[
        "/login".to_string(),
        format!("=name={username}"),
        format!("=password={}", password.expose_secret()),
    ])?;
    Ok(())
}

fn into_auth_error(error: ClientError) -> ClientError {
    match error {
        ClientError::Trap { message, .. } => ClientError::Authentication { message },
        other => other,
    }
}
