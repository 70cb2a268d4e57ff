//! # Wire Codec
//!
//! Little-endian binary reader and writer shared by every VERDANT wire
//! format: entity buffers, grid views, query responses, and perception
//! responses.
//!
//! ## Design
//!
//! - The writer grows a byte vector; entity payloads are variable-size by
//!   nature, so there is no fixed ceiling.
//! - The reader is position-tracked over a borrowed slice and fails fast:
//!   every read checks the remaining length and returns [`CodecError`] on
//!   truncation, never a partial value.
//! - Fixed-layout values move as Pod byte images.

use bytemuck::{bytes_of, Pod};

use crate::error::CodecError;

/// The most elements any wire collection may announce. Guards decoding
/// against garbage counts in corrupt buffers.
pub const MAX_COLLECTION_LEN: u32 = 1 << 20;

/// Growable little-endian wire writer.
#[derive(Debug, Default)]
pub struct WireWriter {
    buffer: Vec<u8>,
}

impl WireWriter {
    /// Creates an empty writer.
    #[must_use]
    pub const fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Creates a writer with pre-reserved capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// Bytes written so far.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// True if nothing has been written.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// View of the written bytes.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// Consumes the writer and returns the buffer.
    #[inline]
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// Writes a single byte.
    #[inline]
    pub fn write_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    /// Writes a u32 in little-endian format.
    #[inline]
    pub fn write_u32(&mut self, value: u32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    /// Writes a u64 in little-endian format.
    #[inline]
    pub fn write_u64(&mut self, value: u64) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    /// Writes an i32 in little-endian format.
    #[inline]
    pub fn write_i32(&mut self, value: i32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    /// Writes an f32 in little-endian format.
    #[inline]
    pub fn write_f32(&mut self, value: f32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    /// Writes an f64 in little-endian format.
    #[inline]
    pub fn write_f64(&mut self, value: f64) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    /// Writes a Pod value as its byte image.
    #[inline]
    pub fn write_pod<T: Pod>(&mut self, value: &T) {
        self.buffer.extend_from_slice(bytes_of(value));
    }

    /// Writes a length-prefixed UTF-8 string.
    pub fn write_str(&mut self, value: &str) {
        self.write_u32(u32::try_from(value.len()).unwrap_or(u32::MAX));
        self.buffer.extend_from_slice(value.as_bytes());
    }

    /// Writes raw bytes with a u32 length prefix.
    pub fn write_bytes(&mut self, value: &[u8]) {
        self.write_u32(u32::try_from(value.len()).unwrap_or(u32::MAX));
        self.buffer.extend_from_slice(value);
    }
}

/// Position-tracked little-endian wire reader over a borrowed buffer.
#[derive(Debug)]
pub struct WireReader<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> WireReader<'a> {
    /// Creates a reader over a buffer.
    #[must_use]
    pub const fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            position: 0,
        }
    }

    /// Bytes not yet consumed.
    #[inline]
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.position)
    }

    /// True when the whole buffer has been consumed.
    #[inline]
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    fn take(&mut self, count: usize) -> Result<&'a [u8], CodecError> {
        if self.remaining() < count {
            return Err(CodecError::UnexpectedEof {
                needed: count,
                remaining: self.remaining(),
            });
        }
        let slice = &self.buffer[self.position..self.position + count];
        self.position += count;
        Ok(slice)
    }

    /// Reads a single byte.
    #[inline]
    pub fn read_u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take(1)?[0])
    }

    /// Reads a u32 in little-endian format.
    #[inline]
    pub fn read_u32(&mut self) -> Result<u32, CodecError> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Reads a u64 in little-endian format.
    #[inline]
    pub fn read_u64(&mut self) -> Result<u64, CodecError> {
        let bytes = self.take(8)?;
        Ok(u64::from_le_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]))
    }

    /// Reads an i32 in little-endian format.
    #[inline]
    pub fn read_i32(&mut self) -> Result<i32, CodecError> {
        let bytes = self.take(4)?;
        Ok(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Reads an f32 in little-endian format.
    #[inline]
    pub fn read_f32(&mut self) -> Result<f32, CodecError> {
        Ok(f32::from_bits(self.read_u32()?))
    }

    /// Reads an f64 in little-endian format.
    #[inline]
    pub fn read_f64(&mut self) -> Result<f64, CodecError> {
        Ok(f64::from_bits(self.read_u64()?))
    }

    /// Reads a Pod value from its byte image.
    pub fn read_pod<T: Pod + Copy>(&mut self) -> Result<T, CodecError> {
        let size = std::mem::size_of::<T>();
        let slice = self.take(size)?;
        bytemuck::try_pod_read_unaligned(slice).map_err(|_| CodecError::UnexpectedEof {
            needed: size,
            remaining: 0,
        })
    }

    /// Reads a length-prefixed UTF-8 string.
    pub fn read_str(&mut self) -> Result<String, CodecError> {
        let len = self.read_collection_len()?;
        let bytes = self.take(len as usize)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| CodecError::InvalidUtf8)
    }

    /// Reads a u32 collection length, enforcing [`MAX_COLLECTION_LEN`].
    pub fn read_collection_len(&mut self) -> Result<u32, CodecError> {
        let count = self.read_u32()?;
        if count > MAX_COLLECTION_LEN {
            return Err(CodecError::OversizedCollection {
                count,
                max: MAX_COLLECTION_LEN,
            });
        }
        Ok(count)
    }

    /// Reads raw bytes with a u32 length prefix.
    pub fn read_bytes(&mut self) -> Result<&'a [u8], CodecError> {
        let len = self.read_collection_len()?;
        self.take(len as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_roundtrip() {
        let mut w = WireWriter::new();
        w.write_u8(7);
        w.write_u32(0xDEAD_BEEF);
        w.write_u64(u64::MAX - 1);
        w.write_i32(-42);
        w.write_f32(3.5);
        w.write_f64(-0.125);
        w.write_str("voxel");

        let bytes = w.into_bytes();
        let mut r = WireReader::new(&bytes);
        assert_eq!(r.read_u8().unwrap(), 7);
        assert_eq!(r.read_u32().unwrap(), 0xDEAD_BEEF);
        assert_eq!(r.read_u64().unwrap(), u64::MAX - 1);
        assert_eq!(r.read_i32().unwrap(), -42);
        assert!((r.read_f32().unwrap() - 3.5).abs() < f32::EPSILON);
        assert!((r.read_f64().unwrap() - -0.125).abs() < f64::EPSILON);
        assert_eq!(r.read_str().unwrap(), "voxel");
        assert!(r.is_exhausted());
    }

    #[test]
    fn truncated_read_fails_fast() {
        let mut w = WireWriter::new();
        w.write_u32(99);
        let bytes = w.into_bytes();

        let mut r = WireReader::new(&bytes[..2]);
        let err = r.read_u32().unwrap_err();
        assert_eq!(
            err,
            CodecError::UnexpectedEof {
                needed: 4,
                remaining: 2
            }
        );
    }

    #[test]
    fn oversized_collection_rejected() {
        let mut w = WireWriter::new();
        w.write_u32(MAX_COLLECTION_LEN + 1);
        let bytes = w.into_bytes();
        let mut r = WireReader::new(&bytes);
        assert!(matches!(
            r.read_collection_len(),
            Err(CodecError::OversizedCollection { .. })
        ));
    }

    #[test]
    fn invalid_utf8_rejected() {
        let mut w = WireWriter::new();
        w.write_u32(2);
        w.write_u8(0xFF);
        w.write_u8(0xFE);
        let bytes = w.into_bytes();
        let mut r = WireReader::new(&bytes);
        assert_eq!(r.read_str().unwrap_err(), CodecError::InvalidUtf8);
    }

    #[test]
    fn pod_roundtrip() {
        use crate::component::Position;
        let pos = Position::at(5, -6, 7);
        let mut w = WireWriter::new();
        w.write_pod(&pos);
        let bytes = w.into_bytes();
        assert_eq!(bytes.len(), std::mem::size_of::<Position>());
        let mut r = WireReader::new(&bytes);
        assert_eq!(r.read_pod::<Position>().unwrap(), pos);
    }
}
