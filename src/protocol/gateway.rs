use crate::core::binary::{PacketReader, PacketWriter};
use crate::error::{constants, ProtocolError, Result};
use crate::protocol::alias::Alias;
use crate::protocol::packet::{Packet, PacketBody};
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, trace};
use uuid::Uuid;

/// Encode/decode pair for one packet alias.
///
/// Converters only ever see the payload. `source` and `creation` come from the
/// validated frame token and are attached by [`Gateway::decode`].
pub trait PacketConverter: Send + Sync + 'static {
    fn write(&self, body: &PacketBody, writer: &mut PacketWriter) -> Result<()>;

    fn read(&self, reader: &mut PacketReader<'_>) -> Result<PacketBody>;
}

/// Registry of packet converters keyed by [`Alias`].
///
/// Binding is an upsert: the last converter bound for an alias wins. Aliases
/// may be given in any form that converts into [`Alias`], so a converter bound
/// by name is found again by identifier or by packet, and vice versa.
pub struct Gateway {
    converters: RwLock<HashMap<Alias, Arc<dyn PacketConverter>>>,
}

impl Default for Gateway {
    fn default() -> Self {
        Self::new()
    }
}

impl Gateway {
    /// Empty gateway; every encode/decode fails until converters are bound.
    pub fn new() -> Self {
        Self {
            converters: RwLock::new(HashMap::new()),
        }
    }

    pub fn bind<A, C>(&self, alias: A, converter: C) -> Result<&Self>
    where
        A: Into<Alias>,
        C: PacketConverter,
    {
        self.bind_shared(alias, Arc::new(converter))
    }

    pub fn bind_shared<A: Into<Alias>>(
        &self,
        alias: A,
        converter: Arc<dyn PacketConverter>,
    ) -> Result<&Self> {
        let alias = alias.into();
        let mut converters = self
            .converters
            .write()
            .map_err(|_| ProtocolError::Custom(constants::ERR_GATEWAY_WRITE_LOCK.to_string()))?;

        if converters.insert(alias, converter).is_some() {
            debug!(%alias, "Replaced packet converter");
        } else {
            debug!(%alias, "Bound packet converter");
        }
        Ok(self)
    }

    pub fn is_bound<A: Into<Alias>>(&self, alias: A) -> bool {
        let alias = alias.into();
        self.converters
            .read()
            .map(|converters| converters.contains_key(&alias))
            .unwrap_or(false)
    }

    fn converter(&self, alias: Alias) -> Result<Arc<dyn PacketConverter>> {
        let converters = self
            .converters
            .read()
            .map_err(|_| ProtocolError::Custom(constants::ERR_GATEWAY_READ_LOCK.to_string()))?;

        converters
            .get(&alias)
            .cloned()
            .ok_or(ProtocolError::ConverterNotBound(alias))
    }

    /// Encode the payload of `packet` with the converter bound to its alias.
    pub fn encode(&self, packet: &Packet) -> Result<Bytes> {
        let alias = packet.alias();
        let converter = self.converter(alias)?;

        let mut writer = PacketWriter::new();
        converter.write(packet.body(), &mut writer)?;

        trace!(%alias, bytes = writer.len(), "Encoded packet payload");
        Ok(writer.into_bytes())
    }

    /// Decode a payload into a packet speaking for `source`, created at
    /// `creation` (epoch milliseconds). The payload must be consumed entirely.
    pub fn decode<A: Into<Alias>>(
        &self,
        alias: A,
        source: Uuid,
        creation: u64,
        bytes: &[u8],
    ) -> Result<Packet> {
        let alias = alias.into();
        let converter = self.converter(alias)?;

        let mut reader = PacketReader::new(bytes);
        let body = converter.read(&mut reader)?;
        reader.finish()?;

        trace!(%alias, %source, "Decoded packet payload");
        Ok(Packet::received(source, creation, body))
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bound = self.converters.read().map(|c| c.len()).unwrap_or(0);
        f.debug_struct("Gateway").field("bound", &bound).finish()
    }
}
