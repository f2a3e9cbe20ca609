//! Word framing: one length prefix followed by that many raw bytes.
//!
//! A zero-length word is a real value on the wire (it terminates a sentence)
//! and is distinct from a failed read. A zero-byte read or write, on the other
//! hand, means the peer has gone away.

use std::io::{ErrorKind, Read, Write};

use bytes::BufMut;
use tracing::trace;

use crate::error::{WireError, WireResult};
use crate::length::{decode_length, encode_length, encoded_len};

/// Default upper bound on the size of a single inbound word (64 MiB).
pub const DEFAULT_MAX_WORD_SIZE: u32 = 64 * 1024 * 1024;

/// Appends the framed form of `word` (prefix + bytes) to `buf`.
///
/// Nothing is appended if `word` is too long for a length prefix.
pub fn encode_word(word: &[u8], buf: &mut impl BufMut) -> WireResult<()> {
    encode_length(word_length(word.len())?, buf);
    buf.put_slice(word);
    Ok(())
}

/// Converts a word size to the value carried in its length prefix.
fn word_length(len: usize) -> WireResult<u32> {
    u32::try_from(len).map_err(|_| WireError::WordLengthOverflow(len))
}

/// Returns the number of bytes [`encode_word`] writes for `word`.
pub fn framed_len(word: &[u8]) -> usize {
    encoded_len(u32::try_from(word.len()).unwrap_or(u32::MAX)) + word.len()
}

/// Writes one framed word to `writer`.
pub fn write_word<W: Write + ?Sized>(writer: &mut W, word: &[u8]) -> WireResult<()> {
    let mut buf = Vec::with_capacity(framed_len(word));
    encode_word(word, &mut buf)?;
    trace!(word = %String::from_utf8_lossy(word), ">>>");
    write_full(writer, &buf)
}

/// Reads one framed word from `reader`, refusing words above
/// [`DEFAULT_MAX_WORD_SIZE`].
pub fn read_word<R: Read + ?Sized>(reader: &mut R) -> WireResult<Vec<u8>> {
    read_word_limited(reader, DEFAULT_MAX_WORD_SIZE)
}

/// Reads one framed word from `reader`, refusing words above `max_size`.
pub fn read_word_limited<R: Read + ?Sized>(reader: &mut R, max_size: u32) -> WireResult<Vec<u8>> {
    let length = decode_length(reader)?;
    if length > max_size {
        return Err(WireError::WordTooLarge {
            size: length,
            max: max_size,
        });
    }

    let mut word = vec![0u8; length as usize];
    read_full(reader, &mut word)?;
    trace!(word = %String::from_utf8_lossy(&word), "<<<");
    Ok(word)
}

/// Fills `buf` completely, looping over short reads.
pub(crate) fn read_full<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> WireResult<()> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => return Err(WireError::ConnectionClosed),
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(WireError::Io(e)),
        }
    }
    Ok(())
}

/// Writes all of `buf`, looping over short writes.
pub(crate) fn write_full<W: Write + ?Sized>(writer: &mut W, buf: &[u8]) -> WireResult<()> {
    let mut sent = 0;
    while sent < buf.len() {
        match writer.write(&buf[sent..]) {
            Ok(0) => return Err(WireError::ConnectionClosed),
            Ok(n) => sent += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(WireError::Io(e)),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    /// Reader that hands out at most one byte per call.
    struct Trickle<'a>(&'a [u8]);

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.0.is_empty() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.0[0];
            self.0 = &self.0[1..];
            Ok(1)
        }
    }

    /// Writer that accepts at most two bytes per call.
    struct Narrow(Vec<u8>);

    impl Write for Narrow {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let n = buf.len().min(2);
            self.0.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Writer whose peer has closed.
    struct Closed;

    impl Write for Closed {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_word_prefixes_length() {
        let mut out = Vec::new();
        write_word(&mut out, b"/login").unwrap();
        assert_eq!(out, b"\x06/login");
    }

    #[test]
    fn test_empty_word_is_single_zero_byte() {
        let mut out = Vec::new();
        write_word(&mut out, b"").unwrap();
        assert_eq!(out, vec![0x00]);

        let mut reader = &out[..];
        assert_eq!(read_word(&mut reader).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_read_word_over_short_reads() {
        let mut framed = Vec::new();
        encode_word(&[b'a'; 200], &mut framed).unwrap();
        let word = read_word(&mut Trickle(&framed)).unwrap();
        assert_eq!(word, vec![b'a'; 200]);
    }

    #[test]
    fn test_write_word_over_short_writes() {
        let mut writer = Narrow(Vec::new());
        write_word(&mut writer, b"=name=ether1").unwrap();

        let mut expected = Vec::new();
        encode_word(b"=name=ether1", &mut expected).unwrap();
        assert_eq!(writer.0, expected);
    }

    #[test]
    fn test_truncated_word_is_connection_closed() {
        let framed = [0x05, b'a', b'b'];
        let result = read_word(&mut &framed[..]);
        assert!(matches!(result, Err(WireError::ConnectionClosed)));
    }

    #[test]
    fn test_zero_byte_write_is_connection_closed() {
        let result = write_word(&mut Closed, b"/quit");
        assert!(matches!(result, Err(WireError::ConnectionClosed)));
    }

    #[test]
    fn test_word_size_limit() {
        let mut framed = Vec::new();
        encode_word(&[0u8; 32], &mut framed).unwrap();
        let result = read_word_limited(&mut &framed[..], 16);
        assert!(matches!(
            result,
            Err(WireError::WordTooLarge { size: 32, max: 16 })
        ));
    }

    #[test]
    fn test_word_length_limit() {
        assert_eq!(word_length(0).unwrap(), 0);
        assert_eq!(word_length(u32::MAX as usize).unwrap(), u32::MAX);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_word_length_overflow_is_error() {
        let len = u32::MAX as usize + 1;
        assert!(matches!(
            word_length(len),
            Err(WireError::WordLengthOverflow(n)) if n == len
        ));
    }

    #[test]
    fn test_framed_len() {
        assert_eq!(framed_len(b""), 1);
        assert_eq!(framed_len(&[0u8; 0x80]), 0x80 + 2);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn word_roundtrip(word in prop::collection::vec(any::<u8>(), 0..600)) {
                let mut out = Vec::new();
                write_word(&mut out, &word).unwrap();
                prop_assert_eq!(out.len(), framed_len(&word));

                let mut reader = &out[..];
                prop_assert_eq!(read_word(&mut reader).unwrap(), word);
                prop_assert!(reader.is_empty());
            }
        }
    }
}
