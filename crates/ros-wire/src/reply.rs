//! Reply sentences and their classification.
//!
//! Every sentence the appliance sends starts with a tag word. A request is
//! answered by zero or more `!re` rows and then `!done`; a rejected request
//! gets a `!trap` (still followed by `!done`), and an aborted connection gets
//! a single `!fatal`.

use std::fmt;

use crate::attributes::Attributes;
use crate::error::{WireError, WireResult};

/// First word of a reply sentence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReplyTag {
    /// `!done`: the request is complete.
    Done,
    /// `!re`: one result row.
    Re,
    /// `!trap`: the request was rejected; the connection stays usable.
    Trap,
    /// `!fatal`: the appliance is closing the connection.
    Fatal,
    /// `!empty`: the request matched nothing (newer firmware only).
    Empty,
}

impl ReplyTag {
    /// Parses a tag word.
    pub fn parse(word: &[u8]) -> WireResult<Self> {
        match word {
            b"!done" => Ok(ReplyTag::Done),
            b"!re" => Ok(ReplyTag::Re),
            b"!trap" => Ok(ReplyTag::Trap),
            b"!fatal" => Ok(ReplyTag::Fatal),
            b"!empty" => Ok(ReplyTag::Empty),
            other => Err(WireError::UnknownReplyTag(
                String::from_utf8_lossy(other).into_owned(),
            )),
        }
    }

    /// Returns the tag as it appears on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            ReplyTag::Done => "!done",
            ReplyTag::Re => "!re",
            ReplyTag::Trap => "!trap",
            ReplyTag::Fatal => "!fatal",
            ReplyTag::Empty => "!empty",
        }
    }

    /// Returns true if no further sentences follow for this request.
    pub fn is_terminal(self) -> bool {
        matches!(self, ReplyTag::Done | ReplyTag::Fatal)
    }
}

impl fmt::Display for ReplyTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One parsed reply sentence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// The reply tag.
    pub tag: ReplyTag,
    /// Attributes following the tag.
    pub attributes: Attributes,
}

impl Reply {
    /// Creates a reply.
    pub fn new(tag: ReplyTag, attributes: Attributes) -> Self {
        Self { tag, attributes }
    }

    /// Parses a sentence read off the wire.
    pub fn from_sentence<T: AsRef<[u8]>>(sentence: &[T]) -> WireResult<Self> {
        let (tag, rest) = sentence.split_first().ok_or(WireError::MissingReplyTag)?;
        Ok(Self {
            tag: ReplyTag::parse(tag.as_ref())?,
            attributes: Attributes::from_words(rest),
        })
    }
}

/// Result of classifying the replies to one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// No trap or fatal: the `!re` rows and the attributes of `!done`.
    Success {
        /// Result rows, in arrival order.
        rows: Vec<Attributes>,
        /// Attributes of the terminal `!done` (e.g. `ret`).
        done: Attributes,
    },
    /// A `!trap` was present; carries its attributes.
    RecoverableFailure(Attributes),
    /// A `!fatal` was present; carries its attributes.
    FatalFailure(Attributes),
}

impl Outcome {
    /// Returns true for [`Outcome::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }
}

/// Classifies the full reply stream of one request.
///
/// A `!fatal` anywhere wins, then a `!trap` anywhere; rows that arrived before
/// either are discarded with the rest of the request.
pub fn classify(replies: &[Reply]) -> Outcome {
    if let Some(fatal) = replies.iter().find(|r| r.tag == ReplyTag::Fatal) {
        return Outcome::FatalFailure(fatal.attributes.clone());
    }
    if let Some(trap) = replies.iter().find(|r| r.tag == ReplyTag::Trap) {
        return Outcome::RecoverableFailure(trap.attributes.clone());
    }

    let rows = replies
        .iter()
        .filter(|r| r.tag == ReplyTag::Re)
        .map(|r| r.attributes.clone())
        .collect();
    let done = replies
        .iter()
        .rev()
        .find(|r| r.tag == ReplyTag::Done)
        .map(|r| r.attributes.clone())
        .unwrap_or_default();

    Outcome::Success { rows, done }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(tag: ReplyTag, pairs: &[(&str, &str)]) -> Reply {
        Reply::new(tag, pairs.iter().copied().collect())
    }

    #[test]
    fn test_parse_tags() {
        assert_eq!(ReplyTag::parse(b"!done").unwrap(), ReplyTag::Done);
        assert_eq!(ReplyTag::parse(b"!re").unwrap(), ReplyTag::Re);
        assert_eq!(ReplyTag::parse(b"!trap").unwrap(), ReplyTag::Trap);
        assert_eq!(ReplyTag::parse(b"!fatal").unwrap(), ReplyTag::Fatal);
        assert_eq!(ReplyTag::parse(b"!empty").unwrap(), ReplyTag::Empty);
        assert!(matches!(
            ReplyTag::parse(b"=name=x"),
            Err(WireError::UnknownReplyTag(t)) if t == "=name=x"
        ));
    }

    #[test]
    fn test_from_sentence() {
        let reply = Reply::from_sentence(&[b"!re".as_slice(), b"=name=ether1".as_slice()]).unwrap();
        assert_eq!(reply.tag, ReplyTag::Re);
        assert_eq!(reply.attributes.get("name"), Some("ether1"));

        let empty: [&[u8]; 0] = [];
        assert!(matches!(
            Reply::from_sentence(&empty),
            Err(WireError::MissingReplyTag)
        ));
    }

    #[test]
    fn test_success_collects_rows() {
        let replies = vec![
            reply(ReplyTag::Re, &[("name", "ether1")]),
            reply(ReplyTag::Re, &[("name", "ether2")]),
            reply(ReplyTag::Done, &[("ret", "*3")]),
        ];
        match classify(&replies) {
            Outcome::Success { rows, done } => {
                assert_eq!(rows.len(), 2);
                assert_eq!(rows[1].get("name"), Some("ether2"));
                assert_eq!(done.ret(), Some("*3"));
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[test]
    fn test_done_only_is_success_without_rows() {
        let outcome = classify(&[reply(ReplyTag::Done, &[])]);
        assert_eq!(
            outcome,
            Outcome::Success {
                rows: vec![],
                done: Attributes::new()
            }
        );
    }

    #[test]
    fn test_empty_tag_adds_no_row() {
        let outcome = classify(&[reply(ReplyTag::Empty, &[]), reply(ReplyTag::Done, &[])]);
        assert!(matches!(outcome, Outcome::Success { rows, .. } if rows.is_empty()));
    }

    #[test]
    fn test_trap_after_rows_is_failure() {
        let replies = vec![
            reply(ReplyTag::Re, &[("name", "ether1")]),
            reply(ReplyTag::Trap, &[("message", "no such item")]),
            reply(ReplyTag::Done, &[]),
        ];
        match classify(&replies) {
            Outcome::RecoverableFailure(attrs) => {
                assert_eq!(attrs.message(), Some("no such item"));
            }
            other => panic!("expected trap, got {other:?}"),
        }
    }

    #[test]
    fn test_fatal_wins_over_trap() {
        let replies = vec![
            reply(ReplyTag::Trap, &[("message", "first")]),
            reply(ReplyTag::Fatal, &[("message", "session terminated")]),
        ];
        assert!(matches!(
            classify(&replies),
            Outcome::FatalFailure(attrs) if attrs.message() == Some("session terminated")
        ));
    }

    #[test]
    fn test_terminal_tags() {
        assert!(ReplyTag::Done.is_terminal());
        assert!(ReplyTag::Fatal.is_terminal());
        assert!(!ReplyTag::Trap.is_terminal());
        assert!(!ReplyTag::Re.is_terminal());
    }
}
