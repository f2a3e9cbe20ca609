//! Connection manager and request verbs.

use std::fmt;

use ros_wire::{Attributes, Marker, Reply};
use tracing::{debug, info};

use crate::auth::login;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::resource::Resource;
use crate::session::{Response, Session};
use crate::transport::{Connector, TcpConnector};

/// An authenticated session to one appliance, re-established on demand.
///
/// The connection owns its session exclusively. It is not meant to be shared
/// between threads without a lock held across each request; use one
/// connection per worker instead.
///
/// # Example
///
/// ```ignore
/// use ros_client::{Attributes, ClientConfig, Connection};
///
/// let config = ClientConfig::new("192.168.88.1", "admin", "secret");
/// let mut conn = Connection::open(config)?;
///
/// let ports = conn.print("/interface", &Attributes::new().with("type", "ether"))?;
/// for port in &ports {
///     println!("{} {}", port.id().unwrap_or("?"), port.get("name").unwrap_or("?"));
/// }
///
/// conn.set("/interface", &Attributes::new().with_id("*1").with("mtu", "1500"))?;
/// ```
pub struct Connection<C: Connector = TcpConnector> {
    config: ClientConfig,
    connector: C,
    session: Option<Session<C::Stream>>,
}

impl Connection<TcpConnector> {
    /// Connects and logs in over TCP, retrying per `config.retry`.
    pub fn open(config: ClientConfig) -> ClientResult<Self> {
        Self::open_with(config, TcpConnector)
    }
}

impl<C: Connector> Connection<C> {
    /// Creates a connection that has not connected yet.
    pub fn new(config: ClientConfig, connector: C) -> Self {
        Self {
            config,
            connector,
            session: None,
        }
    }

    /// Connects and logs in through `connector`, retrying per `config.retry`.
    pub fn open_with(config: ClientConfig, connector: C) -> ClientResult<Self> {
        let mut connection = Self::new(config, connector);
        connection.reconnect()?;
        Ok(connection)
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns true while the session's socket is open.
    pub fn is_connected(&self) -> bool {
        self.session.as_ref().is_some_and(Session::is_connected)
    }

    /// Closes any current session, then connects and logs in again.
    ///
    /// Connection-level failures are retried within the configured budget;
    /// exhausting it yields [`ClientError::RetriesExhausted`]. A rejected
    /// login or any other protocol error is returned at once.
    pub fn reconnect(&mut self) -> ClientResult<()> {
        self.close();

        let policy = self.config.retry;
        let outcome = policy.run(|attempt| {
            debug!(host = %self.config.host, attempt, "connecting");
            self.establish()
        })?;

        self.session = Some(outcome.into_result()?);
        info!(host = %self.config.host, port = self.config.port(), "session established");
        Ok(())
    }

    /// Makes one attempt to connect and log in.
    pub fn establish(&self) -> ClientResult<Session<C::Stream>> {
        let stream = self.connector.connect(&self.config)?;
        let mut session = Session::new(stream).with_max_word_size(self.config.max_word_size);

        let logged_in = login(
            &mut session,
            &self.config.username,
            &self.config.password,
            self.config.auth_method,
        );
        if let Err(e) = logged_in {
            if let Some(stream) = session.close() {
                self.connector.disconnect(stream);
            }
            return Err(e);
        }

        if let Some(stream) = session.stream_mut() {
            self.connector.authenticated(stream, &self.config)?;
        }
        Ok(session)
    }

    /// Closes the session, if any.
    pub fn close(&mut self) {
        if let Some(mut session) = self.session.take() {
            if let Some(stream) = session.close() {
                self.connector.disconnect(stream);
                debug!(host = %self.config.host, "session closed");
            }
        }
    }

    /// Returns the live session.
    pub fn session_mut(&mut self) -> ClientResult<&mut Session<C::Stream>> {
        self.session.as_mut().ok_or(ClientError::NotConnected)
    }

    /// Runs `op` on the live session and releases the socket through the
    /// connector if the session ended during it.
    fn with_session<T>(
        &mut self,
        op: impl FnOnce(&mut Session<C::Stream>) -> ClientResult<T>,
    ) -> ClientResult<T> {
        let result = op(self.session_mut()?);
        if result.is_err() && !self.is_connected() {
            self.close();
        }
        result
    }

    /// Sends raw request words and returns every reply.
    pub fn transact<T: AsRef<[u8]>>(&mut self, words: &[T]) -> ClientResult<Vec<Reply>> {
        self.with_session(|session| session.transact(words))
    }

    /// Sends `<path>/<command>` with `?query` filters and `=args` values.
    ///
    /// An empty `command` sends `path` as the command word.
    pub fn call(
        &mut self,
        path: &str,
        command: &str,
        args: &Attributes,
        query: &Attributes,
    ) -> ClientResult<Response> {
        let mut words = vec![command_word(path, command).into_bytes()];
        words.extend(query.to_words(Marker::Query));
        words.extend(args.to_words(Marker::Value));
        self.with_session(|session| session.request(&words))
    }

    /// Lists the items under `path` that match `query`.
    pub fn print(&mut self, path: &str, query: &Attributes) -> ClientResult<Vec<Attributes>> {
        Ok(self.call(path, "print", &Attributes::new(), query)?.rows)
    }

    /// Like [`Connection::print`] with `=detail=`, which includes default
    /// values in each row.
    pub fn print_detail(&mut self, path: &str, query: &Attributes) -> ClientResult<Vec<Attributes>> {
        let args = Attributes::new().with("detail", "");
        Ok(self.call(path, "print", &args, query)?.rows)
    }

    /// Creates an item. The new item's id is in [`Response::ret`].
    pub fn add(&mut self, path: &str, attrs: &Attributes) -> ClientResult<Response> {
        self.call(path, "add", attrs, &Attributes::new())
    }

    /// Changes an item. `attrs` must carry `.id` (or `numbers`).
    pub fn set(&mut self, path: &str, attrs: &Attributes) -> ClientResult<Response> {
        if attrs.id().is_none() && !attrs.contains_key("numbers") {
            return Err(ClientError::MissingId {
                path: path.to_string(),
            });
        }
        self.call(path, "set", attrs, &Attributes::new())
    }

    /// Deletes the item with the given id.
    pub fn remove(&mut self, path: &str, id: &str) -> ClientResult<Response> {
        let args = Attributes::new().with_id(id);
        self.call(path, "remove", &args, &Attributes::new())
    }

    /// Runs an arbitrary command, e.g. `/system/backup/save`.
    pub fn command(&mut self, path: &str, attrs: &Attributes) -> ClientResult<Response> {
        self.call(path, "", attrs, &Attributes::new())
    }

    /// Returns a handle bound to one menu path.
    pub fn resource(&mut self, path: impl Into<String>) -> Resource<'_, C> {
        Resource::new(self, path.into())
    }
}

impl<C: Connector> Drop for Connection<C> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<C: Connector> fmt::Debug for Connection<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("host", &self.config.host)
            .field("port", &self.config.port())
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

/// Joins a menu path and a command into one command word.
fn command_word(path: &str, command: &str) -> String {
    let path = path.trim_end_matches('/');
    if command.is_empty() {
        path.to_string()
    } else {
        format!("{path}/{command}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_word() {
        assert_eq!(command_word("/interface", "print"), "/interface/print");
        assert_eq!(command_word("/ip/address/", "add"), "/ip/address/add");
        assert_eq!(command_word("/system/reboot", ""), "/system/reboot");
    }
}
