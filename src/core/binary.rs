//! # Binary Primitive Codec
//!
//! Cursor-based, big-endian reading and writing of the primitives packet
//! converters are built from: 8/16/32/64-bit integers, 32/64-bit floats,
//! booleans (one byte, `0` or `1`), identifiers (two 64-bit halves) and UTF-8
//! strings prefixed with their 16-bit byte length.
//!
//! [`PacketWriter`] accumulates into a growable buffer. [`PacketReader`]
//! consumes strictly in the order the writer produced. Every short read or
//! malformed value fails with `ProtocolError::PacketRead` and leaves the
//! caller with no partial value.
//!
//! ```
//! use mmo_transport::core::binary::{PacketReader, PacketWriter};
//!
//! let mut writer = PacketWriter::new();
//! writer.write_i32(200);
//! writer.write_string("HELLO").unwrap();
//! let bytes = writer.into_bytes();
//!
//! let mut reader = PacketReader::new(&bytes);
//! assert_eq!(reader.read_i32().unwrap(), 200);
//! assert_eq!(reader.read_string().unwrap(), "HELLO");
//! assert!(reader.finish().is_ok());
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};
use uuid::Uuid;

use crate::error::{constants, ProtocolError, Result};

/// Growable big-endian writer
#[derive(Debug, Default)]
pub struct PacketWriter {
    buffer: BytesMut,
}

impl PacketWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
        }
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buffer.put_u8(value);
    }

    pub fn write_i8(&mut self, value: i8) {
        self.buffer.put_i8(value);
    }

    pub fn write_i16(&mut self, value: i16) {
        self.buffer.put_i16(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.buffer.put_u16(value);
    }

    pub fn write_i32(&mut self, value: i32) {
        self.buffer.put_i32(value);
    }

    pub fn write_i64(&mut self, value: i64) {
        self.buffer.put_i64(value);
    }

    pub fn write_f32(&mut self, value: f32) {
        self.buffer.put_f32(value);
    }

    pub fn write_f64(&mut self, value: f64) {
        self.buffer.put_f64(value);
    }

    pub fn write_bool(&mut self, value: bool) {
        self.buffer.put_u8(u8::from(value));
    }

    /// Identifiers travel as their high then low 64-bit halves.
    pub fn write_uuid(&mut self, value: &Uuid) {
        let (high, low) = value.as_u64_pair();
        self.buffer.put_u64(high);
        self.buffer.put_u64(low);
    }

    /// Write a UTF-8 string behind a 16-bit length prefix.
    ///
    /// # Errors
    /// `PacketWrite` if the encoded string is longer than `u16::MAX` bytes;
    /// nothing is written in that case.
    pub fn write_string(&mut self, value: &str) -> Result<()> {
        let len = u16::try_from(value.len())
            .map_err(|_| ProtocolError::PacketWrite(constants::ERR_STRING_TOO_LONG.into()))?;
        self.buffer.put_u16(len);
        self.buffer.put_slice(value.as_bytes());
        Ok(())
    }

    pub fn write_bytes(&mut self, value: &[u8]) {
        self.buffer.put_slice(value);
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Freeze the accumulated bytes.
    pub fn into_bytes(self) -> Bytes {
        self.buffer.freeze()
    }
}

/// Sequential big-endian reader over a borrowed payload
#[derive(Debug)]
pub struct PacketReader<'a> {
    buffer: &'a [u8],
}

impl<'a> PacketReader<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer }
    }

    /// Bytes not yet consumed
    pub fn remaining(&self) -> usize {
        self.buffer.remaining()
    }

    #[inline]
    fn ensure(&self, needed: usize, what: &str) -> Result<()> {
        if self.buffer.remaining() < needed {
            return Err(ProtocolError::PacketRead(format!(
                "{} reading {what}: need {needed}, have {}",
                constants::ERR_SHORT_READ,
                self.buffer.remaining()
            )));
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.ensure(1, "u8")?;
        Ok(self.buffer.get_u8())
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        self.ensure(1, "i8")?;
        Ok(self.buffer.get_i8())
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        self.ensure(2, "i16")?;
        Ok(self.buffer.get_i16())
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        self.ensure(2, "u16")?;
        Ok(self.buffer.get_u16())
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        self.ensure(4, "i32")?;
        Ok(self.buffer.get_i32())
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        self.ensure(8, "i64")?;
        Ok(self.buffer.get_i64())
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        self.ensure(4, "f32")?;
        Ok(self.buffer.get_f32())
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        self.ensure(8, "f64")?;
        Ok(self.buffer.get_f64())
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        self.ensure(1, "bool")?;
        match self.buffer[0] {
            0 => {
                self.buffer.advance(1);
                Ok(false)
            }
            1 => {
                self.buffer.advance(1);
                Ok(true)
            }
            other => Err(ProtocolError::PacketRead(format!(
                "{}: got {other}",
                constants::ERR_INVALID_BOOL
            ))),
        }
    }

    pub fn read_uuid(&mut self) -> Result<Uuid> {
        self.ensure(16, "identifier")?;
        let high = self.buffer.get_u64();
        let low = self.buffer.get_u64();
        Ok(Uuid::from_u64_pair(high, low))
    }

    /// Read a 16-bit length prefixed UTF-8 string.
    ///
    /// The cursor only moves when the whole string is present and valid.
    pub fn read_string(&mut self) -> Result<String> {
        self.ensure(2, "string length")?;
        let len = u16::from_be_bytes([self.buffer[0], self.buffer[1]]) as usize;
        self.ensure(2 + len, "string body")?;

        let text = std::str::from_utf8(&self.buffer[2..2 + len])
            .map_err(|e| ProtocolError::PacketRead(format!("{}: {e}", constants::ERR_INVALID_UTF8)))?
            .to_owned();

        self.buffer.advance(2 + len);
        Ok(text)
    }

    /// Read exactly `len` raw bytes.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        self.ensure(len, "raw bytes")?;
        let (head, tail) = self.buffer.split_at(len);
        self.buffer = tail;
        Ok(head)
    }

    /// Assert that the payload was consumed completely.
    pub fn finish(self) -> Result<()> {
        if self.buffer.is_empty() {
            Ok(())
        } else {
            Err(ProtocolError::PacketRead(format!(
                "{}: {} left",
                constants::ERR_TRAILING_BYTES,
                self.buffer.len()
            )))
        }
    }
}
