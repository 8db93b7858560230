//! Bounds-checked cursor over a bytecode buffer

use crate::error::{DecodeError, Result};

/// Longest encoding of a 32-bit varint.
const MAX_VARINT_BYTES: usize = 5;

/// Sequential little-endian reader.
///
/// Every read checks the remaining length first and fails with
/// [`DecodeError::TruncatedInput`] instead of reading past the end.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    /// Create a reader positioned at the start of `bytes`
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Current byte offset
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left to read
    #[inline]
    pub fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.pos)
    }

    /// Everything from the cursor to the end, consuming it
    pub fn rest(&mut self) -> &'a [u8] {
        let rest = &self.bytes[self.pos.min(self.bytes.len())..];
        self.pos = self.bytes.len();
        rest
    }

    fn truncated(&self, needed: usize) -> DecodeError {
        DecodeError::TruncatedInput {
            offset: self.pos,
            needed,
            remaining: self.remaining(),
        }
    }

    /// Read exactly `n` bytes
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(self.truncated(n));
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Skip `n` bytes
    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.read_bytes(n).map(|_| ())
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    /// Read one byte
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    /// Read a little-endian `u32`
    pub fn read_u32(&mut self) -> Result<u32> {
        self.read_array().map(u32::from_le_bytes)
    }

    /// Read a little-endian `i32`
    pub fn read_i32(&mut self) -> Result<i32> {
        self.read_array().map(i32::from_le_bytes)
    }

    /// Read a little-endian `f32`
    pub fn read_f32(&mut self) -> Result<f32> {
        self.read_array().map(f32::from_le_bytes)
    }

    /// Read a little-endian `f64`
    pub fn read_f64(&mut self) -> Result<f64> {
        self.read_array().map(f64::from_le_bytes)
    }

    /// Read a LEB128-style unsigned varint (7 bits per byte, high bit continues).
    ///
    /// Bits past 32 in the fifth byte are dropped, matching the producer's
    /// `unsigned int` accumulator. A sixth byte is rejected.
    pub fn read_varint(&mut self) -> Result<u32> {
        let start = self.pos;
        let mut result: u32 = 0;

        for i in 0..MAX_VARINT_BYTES {
            let byte = self.read_u8()?;
            result |= u32::from(byte & 0x7F).wrapping_shl(7 * i as u32);
            if byte & 0x80 == 0 {
                return Ok(result);
            }
        }

        Err(DecodeError::VarIntTooLong { offset: start })
    }

    /// Varint as `usize`
    pub fn read_varint_usize(&mut self) -> Result<usize> {
        // u32 always fits on the targets we build for
        Ok(self.read_varint()? as usize)
    }

    /// Read an element count and check that `count` items of at least
    /// `min_item_bytes` each could still fit in the buffer.
    ///
    /// Callers may then `Vec::with_capacity(count)` without trusting the input.
    pub fn read_count(&mut self, min_item_bytes: usize) -> Result<usize> {
        let offset = self.pos;
        let count = self.read_varint_usize()?;
        let needed = count.saturating_mul(min_item_bytes);
        if needed > self.remaining() {
            return Err(DecodeError::TruncatedInput {
                offset,
                needed,
                remaining: self.remaining(),
            });
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_width_little_endian() {
        let bytes = [0x2A, 0x78, 0x56, 0x34, 0x12, 0xFF, 0xFF, 0xFF, 0xFF];
        let mut reader = ByteReader::new(&bytes);

        assert_eq!(reader.read_u8().unwrap(), 0x2A);
        assert_eq!(reader.read_u32().unwrap(), 0x1234_5678);
        assert_eq!(reader.read_i32().unwrap(), -1);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_floats() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1.5f32.to_le_bytes());
        bytes.extend_from_slice(&(-0.25f64).to_le_bytes());
        let mut reader = ByteReader::new(&bytes);

        assert_eq!(reader.read_f32().unwrap(), 1.5);
        assert_eq!(reader.read_f64().unwrap(), -0.25);
    }

    #[test]
    fn test_varint() {
        let mut reader = ByteReader::new(&[0x00, 0x7F, 0x80, 0x01, 0xE5, 0x8E, 0x26]);
        assert_eq!(reader.read_varint().unwrap(), 0);
        assert_eq!(reader.read_varint().unwrap(), 127);
        assert_eq!(reader.read_varint().unwrap(), 128);
        assert_eq!(reader.read_varint().unwrap(), 624_485);
    }

    #[test]
    fn test_varint_max_u32() {
        let mut reader = ByteReader::new(&[0xFF, 0xFF, 0xFF, 0xFF, 0x0F]);
        assert_eq!(reader.read_varint().unwrap(), u32::MAX);
    }

    #[test]
    fn test_varint_too_long() {
        let mut reader = ByteReader::new(&[0x01, 0x80, 0x80, 0x80, 0x80, 0x80, 0x01]);
        assert_eq!(reader.read_varint().unwrap(), 1);
        assert_eq!(
            reader.read_varint(),
            Err(DecodeError::VarIntTooLong { offset: 1 })
        );
    }

    #[test]
    fn test_varint_truncated() {
        let mut reader = ByteReader::new(&[0x80, 0x80]);
        assert!(matches!(
            reader.read_varint(),
            Err(DecodeError::TruncatedInput { offset: 2, .. })
        ));
    }

    #[test]
    fn test_read_past_end() {
        let mut reader = ByteReader::new(&[1, 2, 3]);
        assert_eq!(
            reader.read_u32(),
            Err(DecodeError::TruncatedInput {
                offset: 0,
                needed: 4,
                remaining: 3,
            })
        );
        // failed reads do not move the cursor
        assert_eq!(reader.position(), 0);
        assert_eq!(reader.read_bytes(3).unwrap(), &[1, 2, 3]);
    }

    #[test]
    fn test_read_count_rejects_impossible_counts() {
        // declares 0x0FFFFFFF items of 4 bytes with 2 bytes left
        let mut reader = ByteReader::new(&[0xFF, 0xFF, 0xFF, 0x7F, 0, 0]);
        assert!(matches!(
            reader.read_count(4),
            Err(DecodeError::TruncatedInput { offset: 0, .. })
        ));

        let mut reader = ByteReader::new(&[0x02, 0xAA, 0xBB]);
        assert_eq!(reader.read_count(1).unwrap(), 2);
    }

    #[test]
    fn test_rest() {
        let mut reader = ByteReader::new(b"\x00hello");
        reader.read_u8().unwrap();
        assert_eq!(reader.rest(), b"hello");
        assert_eq!(reader.remaining(), 0);
        assert_eq!(reader.rest(), b"");
    }
}
