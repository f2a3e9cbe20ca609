//! One live conversation with the appliance.
//!
//! The protocol is strictly half-duplex: a request sentence is written, and
//! every reply up to `!done` (or `!fatal`) is read before the next request.
//! [`Session::transact`] takes `&mut self` for the whole exchange, so two
//! requests can never interleave on one session. Callers that share a
//! session across threads must hold a lock for the full call.

use std::io::{Read, Write};

use ros_wire::{
    Attributes, DEFAULT_MAX_WORD_SIZE, Outcome, Reply, classify, read_sentence_limited,
    write_sentence,
};
use tracing::{debug, warn};

use crate::error::{ClientError, ClientResult};

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No socket. Every request fails with [`ClientError::NotConnected`].
    Disconnected,
    /// Socket open, login not yet completed.
    Connected,
    /// Logged in.
    Authenticated,
}

/// Rows and terminal attributes of a successful request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    /// Attributes of each `!re` sentence, in arrival order.
    pub rows: Vec<Attributes>,
    /// Attributes of the closing `!done`.
    pub done: Attributes,
}

impl Response {
    /// Returns the `ret` value of `!done`, such as the id assigned by `add`.
    pub fn ret(&self) -> Option<&str> {
        self.done.ret()
    }
}

/// A socket plus its authentication state.
#[derive(Debug)]
pub struct Session<S> {
    stream: Option<S>,
    /// Stream detached after a fatal reply or a broken exchange, held until
    /// [`Session::close`] hands it to the owner for teardown.
    retired: Option<S>,
    authenticated: bool,
    max_word_size: u32,
}

impl<S: Read + Write> Session<S> {
    /// Wraps a freshly opened stream.
    pub fn new(stream: S) -> Self {
        Self {
            stream: Some(stream),
            retired: None,
            authenticated: false,
            max_word_size: DEFAULT_MAX_WORD_SIZE,
        }
    }

    /// Sets the largest inbound word accepted.
    #[must_use]
    pub fn with_max_word_size(mut self, size: u32) -> Self {
        self.max_word_size = size;
        self
    }

    /// Returns the lifecycle state.
    pub fn state(&self) -> SessionState {
        match (&self.stream, self.authenticated) {
            (None, _) => SessionState::Disconnected,
            (Some(_), false) => SessionState::Connected,
            (Some(_), true) => SessionState::Authenticated,
        }
    }

    /// Returns true while the socket is open.
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Returns true once login has succeeded on this socket.
    pub fn is_authenticated(&self) -> bool {
        self.stream.is_some() && self.authenticated
    }

    pub(crate) fn mark_authenticated(&mut self) {
        self.authenticated = true;
    }

    /// Returns the stream, if still open.
    pub fn stream_mut(&mut self) -> Option<&mut S> {
        self.stream.as_mut()
    }

    /// Detaches the stream, leaving the session disconnected.
    ///
    /// After a fatal reply or a broken exchange this returns the stream the
    /// session stopped using, so the caller can still shut it down.
    pub fn close(&mut self) -> Option<S> {
        self.authenticated = false;
        self.stream.take().or_else(|| self.retired.take())
    }

    fn retire(&mut self) {
        self.authenticated = false;
        if let Some(stream) = self.stream.take() {
            self.retired = Some(stream);
        }
    }

    /// Sends one request sentence and reads every reply to it.
    ///
    /// Returns all replies, `!done` included, when none of them is a
    /// `!trap` or `!fatal`. A trap becomes [`ClientError::Trap`] and leaves
    /// the session usable. A fatal becomes [`ClientError::Fatal`] after the
    /// session has stopped using its socket. Any socket or framing error also
    /// ends the session. An empty request sends nothing and returns no
    /// replies.
    pub fn transact<T: AsRef<[u8]>>(&mut self, words: &[T]) -> ClientResult<Vec<Reply>> {
        let replies = self.round_trip(words)?;
        self.settle(classify(&replies))?;
        Ok(replies)
    }

    /// Like [`Session::transact`], but returns the rows and `!done`
    /// attributes instead of the raw replies.
    pub fn request<T: AsRef<[u8]>>(&mut self, words: &[T]) -> ClientResult<Response> {
        let replies = self.round_trip(words)?;
        let (rows, done) = self.settle(classify(&replies))?;
        Ok(Response { rows, done })
    }

    fn round_trip<T: AsRef<[u8]>>(&mut self, words: &[T]) -> ClientResult<Vec<Reply>> {
        if words.is_empty() {
            return Ok(Vec::new());
        }

        let max_word_size = self.max_word_size;
        let stream = self.stream.as_mut().ok_or(ClientError::NotConnected)?;

        match exchange(stream, words, max_word_size) {
            Ok(replies) => Ok(replies),
            Err(e) => {
                warn!(error = %e, "connection lost during request");
                self.retire();
                Err(e)
            }
        }
    }

    /// Turns a classified reply into rows and `!done` attributes, or an error.
    fn settle(&mut self, outcome: Outcome) -> ClientResult<(Vec<Attributes>, Attributes)> {
        match outcome {
            Outcome::Success { rows, done } => Ok((rows, done)),
            Outcome::RecoverableFailure(attributes) => {
                debug!(%attributes, "request trapped");
                Err(ClientError::trap(attributes))
            }
            Outcome::FatalFailure(attributes) => {
                warn!(%attributes, "fatal reply, closing session");
                self.retire();
                Err(ClientError::fatal(attributes))
            }
        }
    }
}

/// Writes the request and reads replies until a terminal tag.
fn exchange<S, T>(stream: &mut S, words: &[T], max_word_size: u32) -> ClientResult<Vec<Reply>>
where
    S: Read + Write,
    T: AsRef<[u8]>,
{
    write_sentence(stream, words)?;

    let mut replies = Vec::new();
    loop {
        let sentence = read_sentence_limited(stream, max_word_size)?;
        if sentence.is_empty() {
            continue;
        }

        let reply = Reply::from_sentence(&sentence)?;
        let terminal = reply.tag.is_terminal();
        replies.push(reply);
        if terminal {
            return Ok(replies);
        }
    }
}
