//! Byte cursor over a single fuzz input.
//!
//! The cursor is the only source of entropy for generation. Every primitive
//! read either consumes bytes from the front of the buffer or fails with
//! [`Exhausted`]; nothing is ever synthesized once the input runs dry. This
//! keeps generation a pure function of the input bytes, so a crashing input
//! replays exactly.
//!
//! Reads are backed by [`arbitrary::Unstructured`], which already tracks the
//! read position and reports `NotEnoughData` instead of reading past the end.
//!
//! # Example
//!
//! ```
//! use schema_roundtrip::cursor::Cursor;
//!
//! let mut cursor = Cursor::new(&[1, 2, 0, 0, 0, 0]);
//! assert!(cursor.get_bool().unwrap());
//! assert_eq!(cursor.get_int().unwrap(), 2);
//! assert_eq!(cursor.get_u32().unwrap(), 0);
//! assert!(cursor.get_bool().is_err());
//! ```

use arbitrary::Unstructured;
use std::fmt;

/// Returned when a read needs more bytes than the cursor has left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Exhausted {
    /// Number of bytes the failed read asked for.
    pub requested: usize,
    /// Number of bytes that were still available.
    pub remaining: usize,
}

impl fmt::Display for Exhausted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "fuzz input exhausted: needed {} bytes, {} remaining",
            self.requested, self.remaining
        )
    }
}

impl std::error::Error for Exhausted {}

/// Result type for cursor reads.
pub type CursorResult<T> = Result<T, Exhausted>;

/// Ordered read position over a borrowed fuzz input.
pub struct Cursor<'a> {
    data: Unstructured<'a>,
}

impl fmt::Debug for Cursor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("remaining", &self.remaining())
            .finish()
    }
}

impl<'a> Cursor<'a> {
    /// Creates a cursor positioned at the start of `data`.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data: Unstructured::new(data),
        }
    }

    /// Number of unread bytes.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len()
    }

    /// Returns true once every byte has been consumed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Takes exactly `len` bytes.
    pub fn take(&mut self, len: usize) -> CursorResult<&'a [u8]> {
        let remaining = self.remaining();
        self.data.bytes(len).map_err(|_| Exhausted {
            requested: len,
            remaining,
        })
    }

    fn take_array<const N: usize>(&mut self) -> CursorResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    /// Reads one byte and returns its low bit.
    pub fn get_bool(&mut self) -> CursorResult<bool> {
        Ok(self.take(1)?[0] & 1 == 1)
    }

    /// Reads one byte as a small non-negative integer.
    ///
    /// This is the workhorse for lengths, indices and character picks: it
    /// costs a single byte and is always reduced modulo something small by
    /// the caller.
    pub fn get_int(&mut self) -> CursorResult<usize> {
        Ok(usize::from(self.take(1)?[0]))
    }

    /// Reads a little-endian `u32`.
    pub fn get_u32(&mut self) -> CursorResult<u32> {
        self.take_array().map(u32::from_le_bytes)
    }

    /// Reads a little-endian `u64`.
    pub fn get_u64(&mut self) -> CursorResult<u64> {
        self.take_array().map(u64::from_le_bytes)
    }

    /// Reads a little-endian `i32`.
    pub fn get_i32(&mut self) -> CursorResult<i32> {
        self.take_array().map(i32::from_le_bytes)
    }

    /// Reads a little-endian `i64`.
    pub fn get_i64(&mut self) -> CursorResult<i64> {
        self.take_array().map(i64::from_le_bytes)
    }

    /// Reads a length in `0..=max_len`.
    pub fn get_len(&mut self, max_len: usize) -> CursorResult<usize> {
        if max_len == 0 {
            return Ok(0);
        }
        let raw = if max_len < usize::from(u8::MAX) {
            self.get_int()?
        } else {
            self.get_u32()? as usize
        };
        Ok(raw % (max_len + 1))
    }

    /// Reads up to `max_len` raw bytes.
    pub fn get_bytes(&mut self, max_len: usize) -> CursorResult<Vec<u8>> {
        let len = self.get_len(max_len)?;
        Ok(self.take(len)?.to_vec())
    }

    /// Reads a string of at most `max_len` bytes.
    ///
    /// Invalid UTF-8 is replaced deterministically, so the result may be
    /// slightly longer than `max_len` in bytes but never depends on anything
    /// other than the input.
    pub fn get_string(&mut self, max_len: usize) -> CursorResult<String> {
        let len = self.get_len(max_len)?;
        let raw = self.take(len)?;
        Ok(String::from_utf8_lossy(raw).into_owned())
    }

    /// Reads a string of at most `max_len` characters drawn from `alphabet`.
    ///
    /// Each character costs one byte. An empty alphabet always yields the
    /// empty string.
    pub fn get_string_from(&mut self, alphabet: &[u8], max_len: usize) -> CursorResult<String> {
        if alphabet.is_empty() {
            return Ok(String::new());
        }
        let len = self.get_len(max_len)?;
        let picks = self.take(len)?;
        Ok(picks
            .iter()
            .map(|b| char::from(alphabet[usize::from(*b) % alphabet.len()]))
            .collect())
    }
}

#[cfg(test)]
#[allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_consume_in_order() {
        let data = [0x01, 0x07, 0x2A, 0x00, 0x00, 0x00];
        let mut cursor = Cursor::new(&data);
        assert!(cursor.get_bool().unwrap());
        assert_eq!(cursor.get_int().unwrap(), 7);
        assert_eq!(cursor.get_u32().unwrap(), 42);
        assert!(cursor.is_empty());
    }

    #[test]
    fn test_exhaustion_reports_sizes() {
        let mut cursor = Cursor::new(&[1, 2, 3]);
        let err = cursor.get_u64().unwrap_err();
        assert_eq!(
            err,
            Exhausted {
                requested: 8,
                remaining: 3
            }
        );
        assert!(err.to_string().contains("exhausted"));
    }

    #[test]
    fn test_empty_input_is_exhausted_immediately() {
        let mut cursor = Cursor::new(&[]);
        assert!(cursor.get_bool().is_err());
        assert!(cursor.get_int().is_err());
        assert!(cursor.get_string(10).is_err());
    }

    #[test]
    fn test_get_len_is_bounded() {
        let data: Vec<u8> = (0..=255).collect();
        let mut cursor = Cursor::new(&data);
        while !cursor.is_empty() {
            assert!(cursor.get_len(9).unwrap() <= 9);
        }
    }

    #[test]
    fn test_get_len_zero_max_consumes_nothing() {
        let mut cursor = Cursor::new(&[5]);
        assert_eq!(cursor.get_len(0).unwrap(), 0);
        assert_eq!(cursor.remaining(), 1);
    }

    #[test]
    fn test_string_from_alphabet() {
        // length byte 3, then three picks
        let mut cursor = Cursor::new(&[3, 0, 1, 28]);
        let s = cursor.get_string_from(b"abc", 10).unwrap();
        assert_eq!(s, "abb");
    }

    #[test]
    fn test_string_from_alphabet_needs_all_bytes() {
        let mut cursor = Cursor::new(&[3, 0]);
        assert!(cursor.get_string_from(b"abc", 10).is_err());
    }

    #[test]
    fn test_get_string_is_deterministic() {
        let data = [4, 0xF0, 0x9F, 0x98, 0x80, 9];
        let a = Cursor::new(&data).get_string(16).unwrap();
        let b = Cursor::new(&data).get_string(16).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, "\u{1F600}");
    }

    #[test]
    fn test_signed_reads() {
        let wide = (-5i64).to_le_bytes();
        let mut cursor = Cursor::new(&wide);
        assert_eq!(cursor.get_i64().unwrap(), -5);
        let narrow = (-7i32).to_le_bytes();
        let mut cursor = Cursor::new(&narrow);
        assert_eq!(cursor.get_i32().unwrap(), -7);
    }
}
