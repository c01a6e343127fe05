//! Little-endian byte codec used by the persistence format
//!
//! `ByteWriter` appends to a growable buffer; `ByteReader` walks a borrowed
//! slice and reports truncation as a decode error instead of panicking.

use crate::error::{ProcEngineError, Result};

/// Append-only binary writer
#[derive(Debug, Default, Clone)]
pub struct ByteWriter {
    buffer: Vec<u8>,
}

impl ByteWriter {
    /// Creates an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of bytes written.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns true if no bytes have been written.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Returns a slice of the written data.
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// Consumes the writer and returns the buffer.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    pub fn write_bool(&mut self, value: bool) {
        self.buffer.push(u8::from(value));
    }

    pub fn write_u16(&mut self, value: u16) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_i32(&mut self, value: i32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_i64(&mut self, value: i64) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_f64(&mut self, value: f64) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    /// Writes a `usize` as `u32`.
    ///
    /// Counts and indices in the format are 32-bit; larger values saturate.
    pub fn write_len(&mut self, value: usize) {
        self.write_u32(u32::try_from(value).unwrap_or(u32::MAX));
    }

    /// Writes a length-prefixed UTF-8 string.
    pub fn write_str(&mut self, value: &str) {
        self.write_len(value.len());
        self.buffer.extend_from_slice(value.as_bytes());
    }

    /// Writes a length-prefixed byte blob.
    pub fn write_bytes(&mut self, value: &[u8]) {
        self.write_len(value.len());
        self.buffer.extend_from_slice(value);
    }

    /// Writes raw bytes with no prefix.
    pub fn write_raw(&mut self, value: &[u8]) {
        self.buffer.extend_from_slice(value);
    }
}

/// Cursor over a borrowed binary record
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> ByteReader<'a> {
    /// Creates a reader at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    /// Returns true once every byte has been consumed.
    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    /// Current offset from the start of the record.
    pub fn position(&self) -> usize {
        self.position
    }

    fn take(&mut self, count: usize) -> Result<&'a [u8]> {
        if self.remaining() < count {
            return Err(ProcEngineError::decode(format!(
                "unexpected end of data at offset {} (needed {} bytes, {} left)",
                self.position,
                count,
                self.remaining()
            )));
        }
        let slice = &self.data[self.position..self.position + count];
        self.position += count;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(ProcEngineError::decode(format!("invalid boolean byte {}", other))),
        }
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.take_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.take_array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.take_array()?))
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(i64::from_le_bytes(self.take_array()?))
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(f64::from_le_bytes(self.take_array()?))
    }

    pub fn read_len(&mut self) -> Result<usize> {
        Ok(self.read_u32()? as usize)
    }

    /// Reads a count that must be satisfiable by the remaining data.
    ///
    /// `min_item_size` is the smallest encoding of one element; a count
    /// claiming more elements than could possibly fit is rejected before
    /// anything is allocated for it.
    pub fn read_count(&mut self, min_item_size: usize) -> Result<usize> {
        let count = self.read_len()?;
        if count.saturating_mul(min_item_size.max(1)) > self.remaining() {
            return Err(ProcEngineError::decode(format!(
                "count {} exceeds remaining {} bytes",
                count,
                self.remaining()
            )));
        }
        Ok(count)
    }

    pub fn read_str(&mut self) -> Result<String> {
        let len = self.read_len()?;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| ProcEngineError::decode(format!("invalid UTF-8 string: {}", e)))
    }

    pub fn read_bytes(&mut self) -> Result<Vec<u8>> {
        let len = self.read_len()?;
        Ok(self.take(len)?.to_vec())
    }

    /// Reads a length-prefixed blob and returns a reader scoped to it.
    pub fn read_frame(&mut self) -> Result<ByteReader<'a>> {
        let len = self.read_len()?;
        Ok(ByteReader::new(self.take(len)?))
    }

    /// Reads a record version tag, rejecting anything newer than `supported`.
    pub fn read_version(&mut self, record: &'static str, supported: u16) -> Result<u16> {
        let found = self.read_u16()?;
        if found == 0 || found > supported {
            return Err(ProcEngineError::UnsupportedVersion {
                record,
                found,
                supported,
            });
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixed_values() {
        let mut w = ByteWriter::new();
        w.write_u16(3);
        w.write_i64(-42);
        w.write_i32(-1);
        w.write_str("scatter");
        w.write_f64(1.5);
        w.write_bool(true);

        let bytes = w.into_bytes();
        let mut r = ByteReader::new(&bytes);
        assert_eq!(r.read_u16().unwrap(), 3);
        assert_eq!(r.read_i64().unwrap(), -42);
        assert_eq!(r.read_i32().unwrap(), -1);
        assert_eq!(r.read_str().unwrap(), "scatter");
        assert_eq!(r.read_f64().unwrap(), 1.5);
        assert!(r.read_bool().unwrap());
        assert!(r.is_exhausted());
    }

    #[test]
    fn test_truncated_data_is_decode_error() {
        let bytes = [1u8, 2];
        let mut r = ByteReader::new(&bytes);
        let err = r.read_u32().unwrap_err();
        assert!(matches!(err, ProcEngineError::Decode(_)));
    }

    #[test]
    fn test_future_version_rejected() {
        let mut w = ByteWriter::new();
        w.write_u16(9);
        let bytes = w.into_bytes();
        let err = ByteReader::new(&bytes).read_version("procedure", 3).unwrap_err();
        assert!(matches!(
            err,
            ProcEngineError::UnsupportedVersion { found: 9, supported: 3, .. }
        ));
    }

    #[test]
    fn test_frame_scopes_reader() {
        let mut inner = ByteWriter::new();
        inner.write_u32(7);
        let mut w = ByteWriter::new();
        w.write_bytes(inner.as_slice());
        w.write_u8(0xFF);

        let bytes = w.into_bytes();
        let mut r = ByteReader::new(&bytes);
        let mut frame = r.read_frame().unwrap();
        assert_eq!(frame.read_u32().unwrap(), 7);
        assert!(frame.is_exhausted());
        assert_eq!(r.read_u8().unwrap(), 0xFF);
    }

    #[test]
    fn test_oversized_count_rejected() {
        let mut w = ByteWriter::new();
        w.write_u32(1_000_000);
        let bytes = w.into_bytes();
        assert!(ByteReader::new(&bytes).read_count(8).is_err());
    }
}
