//! Wire frame.
//!
//! An [`Envelope`] is what a session actually writes to and reads from the
//! socket. It knows nothing about packet semantics:
//!
//! ```text
//! [TokenLen(2)] [Token(TokenLen)] [AliasHigh(8)] [AliasLow(8)] [Length(4)] [Payload(Length)]
//! ```
//!
//! All integers are big-endian and signed except the token length prefix.

use bytes::Bytes;

use crate::core::binary::{PacketReader, PacketWriter};
use crate::error::{constants, ProtocolError, Result};
use crate::protocol::alias::Alias;

/// Bytes between the token and the payload: alias halves plus length
pub const FIXED_HEADER_SIZE: usize = 8 + 8 + 4;

/// One frame on the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Encrypted token, opaque at this layer
    pub token: String,
    pub alias: Alias,
    pub payload: Bytes,
}

impl Envelope {
    pub fn new(token: String, alias: Alias, payload: Bytes) -> Self {
        Self {
            token,
            alias,
            payload,
        }
    }

    /// Size of the encoded frame
    pub fn encoded_len(&self) -> usize {
        2 + self.token.len() + FIXED_HEADER_SIZE + self.payload.len()
    }

    pub fn to_bytes(&self) -> Result<Bytes> {
        let length = i32::try_from(self.payload.len())
            .map_err(|_| ProtocolError::OversizedPacket(self.payload.len()))?;

        let mut writer = PacketWriter::with_capacity(self.encoded_len());
        writer.write_string(&self.token)?;
        writer.write_i64(self.alias.high());
        writer.write_i64(self.alias.low());
        writer.write_i32(length);
        writer.write_bytes(&self.payload);
        Ok(writer.into_bytes())
    }

    /// Parse exactly one complete frame.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut reader = PacketReader::new(data);
        let token = reader.read_string()?;
        let alias = Alias::from_halves(reader.read_i64()?, reader.read_i64()?);
        let length = reader.read_i32()?;
        if length < 0 {
            return Err(ProtocolError::PacketRead(constants::ERR_NEGATIVE_LENGTH.into()));
        }
        let payload = Bytes::copy_from_slice(reader.read_bytes(length as usize)?);
        reader.finish()?;

        Ok(Self {
            token,
            alias,
            payload,
        })
    }
}
