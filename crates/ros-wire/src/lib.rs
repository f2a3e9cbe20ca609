//! # ros-wire: Binary framing for the `RouterOS` API protocol
//!
//! This crate defines the byte-level protocol spoken to a `RouterOS`
//! appliance over TCP (port 8728, or 8729 with TLS). It performs no socket
//! management: everything is generic over [`std::io::Read`] and
//! [`std::io::Write`].
//!
//! ## Word Format
//!
//! ```text
//! ┌────────────────────┬──────────────────────────────┐
//! │ Length (1–5 B)     │          Bytes               │
//! │ variable prefix    │          (length)            │
//! └────────────────────┴──────────────────────────────┘
//! ```
//!
//! - **Length**: self-describing prefix, see [`length`]
//! - **Bytes**: opaque, usually UTF-8 text
//!
//! ## Sentences
//!
//! A sentence is a sequence of words closed by a zero-length word. Requests
//! start with a command word (`/interface/print`); replies start with a tag
//! (`!re`, `!done`, `!trap`, `!fatal`). The remaining words are attributes
//! (`=key=value`, `?key=value`).
//!
//! ```text
//!   client                         appliance
//!     │  /interface/print ?type=ether  │
//!     │ ─────────────────────────────▶ │
//!     │       !re =name=ether1         │
//!     │ ◀───────────────────────────── │
//!     │       !re =name=ether2         │
//!     │ ◀───────────────────────────── │
//!     │            !done               │
//!     │ ◀───────────────────────────── │
//! ```

pub mod attributes;
mod error;
pub mod length;
pub mod reply;
pub mod sentence;
pub mod word;

pub use attributes::{Attributes, ID_KEY, Marker, PROPLIST_KEY, parse_attribute, wire_key};
pub use error::{WireError, WireResult};
pub use length::{decode_length, encode_length, encoded_len, length_to_bytes};
pub use reply::{Outcome, Reply, ReplyTag, classify};
pub use sentence::{read_sentence, read_sentence_limited, write_sentence};
pub use word::{DEFAULT_MAX_WORD_SIZE, read_word, read_word_limited, write_word};
