//! Sentences: a run of words closed by one zero-length word.

use std::io::{Read, Write};

use bytes::BytesMut;
use tracing::trace;

use crate::error::WireResult;
use crate::word::{DEFAULT_MAX_WORD_SIZE, encode_word, framed_len, read_word_limited, write_full};

/// Writes `words` followed by the zero-length terminator, then flushes.
///
/// The whole sentence is buffered and handed to the writer at once. Returns
/// the number of words written, not counting the terminator.
pub fn write_sentence<W, T>(writer: &mut W, words: &[T]) -> WireResult<usize>
where
    W: Write + ?Sized,
    T: AsRef<[u8]>,
{
    let capacity = words.iter().map(|w| framed_len(w.as_ref())).sum::<usize>() + 1;
    let mut buf = BytesMut::with_capacity(capacity);

    for word in words {
        let word = word.as_ref();
        trace!(word = %String::from_utf8_lossy(word), ">>>");
        encode_word(word, &mut buf)?;
    }
    encode_word(b"", &mut buf)?;

    write_full(writer, &buf)?;
    writer.flush()?;
    Ok(words.len())
}

/// Reads words until the zero-length terminator and returns them.
///
/// An empty vector means the peer sent a bare terminator; callers treat that
/// as a keepalive and read again.
pub fn read_sentence<R: Read + ?Sized>(reader: &mut R) -> WireResult<Vec<Vec<u8>>> {
    read_sentence_limited(reader, DEFAULT_MAX_WORD_SIZE)
}

/// Like [`read_sentence`] with an explicit per-word size limit.
pub fn read_sentence_limited<R: Read + ?Sized>(
    reader: &mut R,
    max_word_size: u32,
) -> WireResult<Vec<Vec<u8>>> {
    let mut sentence = Vec::new();
    loop {
        let word = read_word_limited(reader, max_word_size)?;
        if word.is_empty() {
            return Ok(sentence);
        }
        sentence.push(word);
    }
}
