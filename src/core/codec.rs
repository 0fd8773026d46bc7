use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::core::envelope::{Envelope, FIXED_HEADER_SIZE};
use crate::error::{constants, ProtocolError, Result};
use crate::protocol::alias::Alias;

/// Default ceiling on a single frame payload (16 MiB)
pub const MAX_PAYLOAD_SIZE: usize = 16 * 1024 * 1024;

/// Tokio codec framing [`Envelope`]s over a byte stream.
///
/// Decoding never consumes a partial frame: until the whole envelope is
/// buffered the source buffer is left untouched.
#[derive(Debug, Clone, Copy)]
pub struct EnvelopeCodec {
    max_payload_size: usize,
}

impl Default for EnvelopeCodec {
    fn default() -> Self {
        Self {
            max_payload_size: MAX_PAYLOAD_SIZE,
        }
    }
}

impl EnvelopeCodec {
    pub fn new(max_payload_size: usize) -> Self {
        Self { max_payload_size }
    }

    pub fn max_payload_size(&self) -> usize {
        self.max_payload_size
    }
}

impl Decoder for EnvelopeCodec {
    type Item = Envelope;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        if src.len() < 2 {
            return Ok(None);
        }

        let token_len = u16::from_be_bytes([src[0], src[1]]) as usize;
        let header_len = 2 + token_len + FIXED_HEADER_SIZE;
        if src.len() < header_len {
            src.reserve(header_len - src.len());
            return Ok(None);
        }

        let mut length_bytes = [0u8; 4];
        length_bytes.copy_from_slice(&src[header_len - 4..header_len]);
        let length = i32::from_be_bytes(length_bytes);
        if length < 0 {
            return Err(ProtocolError::PacketRead(constants::ERR_NEGATIVE_LENGTH.into()));
        }
        let length = length as usize;
        if length > self.max_payload_size {
            return Err(ProtocolError::OversizedPacket(length));
        }

        let frame_len = header_len + length;
        if src.len() < frame_len {
            src.reserve(frame_len - src.len());
            return Ok(None);
        }

        // Whole frame is buffered; split it off without copying the payload.
        let mut frame = src.split_to(frame_len);
        frame.advance(2);
        let token_bytes = frame.split_to(token_len);
        let token = String::from_utf8(token_bytes.to_vec()).map_err(|e| {
            ProtocolError::PacketRead(format!("{}: {e}", constants::ERR_INVALID_UTF8))
        })?;
        let high = frame.get_i64();
        let low = frame.get_i64();
        frame.advance(4);

        Ok(Some(Envelope {
            token,
            alias: Alias::from_halves(high, low),
            payload: frame.freeze(),
        }))
    }
}

impl Encoder<Envelope> for EnvelopeCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: Envelope, dst: &mut BytesMut) -> Result<()> {
        let payload_len = item.payload.len();
        if payload_len > self.max_payload_size || payload_len > i32::MAX as usize {
            return Err(ProtocolError::OversizedPacket(payload_len));
        }
        let token_len = u16::try_from(item.token.len())
            .map_err(|_| ProtocolError::PacketWrite(constants::ERR_STRING_TOO_LONG.into()))?;

        dst.reserve(item.encoded_len());
        dst.put_u16(token_len);
        dst.put_slice(item.token.as_bytes());
        dst.put_i64(item.alias.high());
        dst.put_i64(item.alias.low());
        dst.put_i32(payload_len as i32);
        dst.put_slice(&item.payload);
        Ok(())
    }
}
