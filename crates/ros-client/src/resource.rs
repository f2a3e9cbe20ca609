//! Path-bound view of a connection.

use ros_wire::Attributes;

use crate::connection::Connection;
use crate::error::ClientResult;
use crate::session::Response;
use crate::transport::{Connector, TcpConnector};

/// A menu path (`/ip/address`, `/interface/bridge/port`, ...) on a
/// connection. Every verb is sent under that path.
#[derive(Debug)]
pub struct Resource<'a, C: Connector = TcpConnector> {
    connection: &'a mut Connection<C>,
    path: String,
}

impl<'a, C: Connector> Resource<'a, C> {
    pub(crate) fn new(connection: &'a mut Connection<C>, path: String) -> Self {
        Self { connection, path }
    }

    /// Returns the menu path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Lists items matching `query`.
    pub fn print(&mut self, query: &Attributes) -> ClientResult<Vec<Attributes>> {
        self.connection.print(&self.path, query)
    }

    /// Lists items matching `query`, including default values.
    pub fn print_detail(&mut self, query: &Attributes) -> ClientResult<Vec<Attributes>> {
        self.connection.print_detail(&self.path, query)
    }

    /// Returns the first item whose `key` equals `value`.
    pub fn find(&mut self, key: &str, value: &str) -> ClientResult<Option<Attributes>> {
        let query = Attributes::new().with(key, value);
        Ok(self.print(&query)?.into_iter().next())
    }

    /// Creates an item.
    pub fn add(&mut self, attrs: &Attributes) -> ClientResult<Response> {
        self.connection.add(&self.path, attrs)
    }

    /// Changes an item; `attrs` must carry `.id`.
    pub fn set(&mut self, attrs: &Attributes) -> ClientResult<Response> {
        self.connection.set(&self.path, attrs)
    }

    /// Deletes an item.
    pub fn remove(&mut self, id: &str) -> ClientResult<Response> {
        self.connection.remove(&self.path, id)
    }

    /// Runs `<path>/<command>`, e.g. `enable` or `reset-counters`.
    pub fn command(&mut self, command: &str, args: &Attributes) -> ClientResult<Response> {
        self.connection
            .call(&self.path, command, args, &Attributes::new())
    }
}
