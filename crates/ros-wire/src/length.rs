//! Variable-length integer prefix written before every word.
//!
//! The high bits of the first byte select one of five size classes:
//!
//! ```text
//! ┌───────────────────────────┬────────────┬──────────────────────────────┐
//! │ Value range               │ First byte │ Encoded form                 │
//! ├───────────────────────────┼────────────┼──────────────────────────────┤
//! │ 0x00 – 0x7F               │ 0xxxxxxx   │ 1 byte                       │
//! │ 0x80 – 0x3FFF             │ 10xxxxxx   │ 2 bytes, value | 0x8000      │
//! │ 0x4000 – 0x1FFFFF         │ 110xxxxx   │ 3 bytes, value | 0xC00000    │
//! │ 0x200000 – 0xFFFFFFF      │ 1110xxxx   │ 4 bytes, value | 0xE0000000  │
//! │ 0x10000000 – 0xFFFFFFFF   │ 11110000   │ 0xF0 + 4 big-endian bytes    │
//! └───────────────────────────┴────────────┴──────────────────────────────┘
//! ```
//!
//! First bytes `0xF1..=0xFF` belong to no class. Seeing one means the reader
//! has lost its place in the stream.

use std::io::Read;

use bytes::BufMut;

use crate::error::{WireError, WireResult};
use crate::word::read_full;

/// Largest value that fits the 1-byte form.
pub const MAX_ONE_BYTE: u32 = 0x7F;

/// Largest value that fits the 2-byte form.
pub const MAX_TWO_BYTES: u32 = 0x3FFF;

/// Largest value that fits the 3-byte form.
pub const MAX_THREE_BYTES: u32 = 0x1F_FFFF;

/// Largest value that fits the 4-byte form.
pub const MAX_FOUR_BYTES: u32 = 0x0FFF_FFFF;

/// Marker byte introducing the 5-byte form.
pub const FIVE_BYTE_MARKER: u8 = 0xF0;

/// Returns the number of bytes [`encode_length`] writes for `length`.
pub fn encoded_len(length: u32) -> usize {
    match length {
        0..=MAX_ONE_BYTE => 1,
        0x80..=MAX_TWO_BYTES => 2,
        0x4000..=MAX_THREE_BYTES => 3,
        0x20_0000..=MAX_FOUR_BYTES => 4,
        _ => 5,
    }
}

/// Appends the encoded form of `length` to `buf`.
#[allow(clippy::cast_possible_truncation)]
pub fn encode_length(length: u32, buf: &mut impl BufMut) {
    match length {
        0..=MAX_ONE_BYTE => buf.put_u8(length as u8),
        0x80..=MAX_TWO_BYTES => buf.put_u16((length | 0x8000) as u16),
        0x4000..=MAX_THREE_BYTES => {
            let tagged = length | 0x00C0_0000;
            buf.put_slice(&tagged.to_be_bytes()[1..]);
        }
        0x20_0000..=MAX_FOUR_BYTES => buf.put_u32(length | 0xE000_0000),
        _ => {
            buf.put_u8(FIVE_BYTE_MARKER);
            buf.put_u32(length);
        }
    }
}

/// Encodes `length` into a fresh vector.
pub fn length_to_bytes(length: u32) -> Vec<u8> {
    let mut buf = Vec::with_capacity(encoded_len(length));
    encode_length(length, &mut buf);
    buf
}

/// Reads one length prefix from `reader`.
///
/// Returns [`WireError::InvalidLengthPrefix`] when the first byte matches no
/// size class.
pub fn decode_length<R: Read + ?Sized>(reader: &mut R) -> WireResult<u32> {
    let mut first = [0u8; 1];
    read_full(reader, &mut first)?;
    let first = first[0];

    let (extra, mask) = match first {
        b if b & 0x80 == 0x00 => return Ok(u32::from(b)),
        b if b & 0xC0 == 0x80 => (1, 0x3F),
        b if b & 0xE0 == 0xC0 => (2, 0x1F),
        b if b & 0xF0 == 0xE0 => (3, 0x0F),
        FIVE_BYTE_MARKER => (4, 0x00),
        b => return Err(WireError::InvalidLengthPrefix(b)),
    };

    let mut rest = [0u8; 4];
    read_full(reader, &mut rest[..extra])?;

    let value = rest[..extra]
        .iter()
        .fold(u32::from(first & mask), |acc, byte| {
            (acc << 8) | u32::from(*byte)
        });
    Ok(value)
}
