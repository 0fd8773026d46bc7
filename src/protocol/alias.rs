//! Packet type aliases.
//!
//! Every packet kind has a human-readable name (`"HELLO"`, `"MOVE"`, ...) and a
//! fixed 128-bit identifier derived from that name with a name-based UUID
//! (version 5, crate namespace). The identifier is what travels on the wire,
//! split into two signed 64-bit halves.
//!
//! Anything that can name a kind converts into the same [`Alias`] key: a name
//! string, the identifier itself, its two halves, a [`PacketKind`] or a
//! representative [`Packet`].

use std::fmt;

use uuid::Uuid;

use crate::protocol::packet::{Packet, PacketKind};

/// Namespace for alias identifiers
const ALIAS_NAMESPACE: Uuid = Uuid::from_u128(0x6d6d_6f2d_7472_616e_7370_6f72_742d_616c);

/// Canonical registry key for a packet kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Alias(Uuid);

impl Alias {
    /// Derive the identifier for a human-readable alias name.
    pub fn from_name(name: &str) -> Self {
        Alias(Uuid::new_v5(&ALIAS_NAMESPACE, name.as_bytes()))
    }

    /// Rebuild an alias from the two halves read off the wire.
    pub fn from_halves(high: i64, low: i64) -> Self {
        Alias(Uuid::from_u64_pair(high as u64, low as u64))
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Alias(id)
    }

    /// Upper 64 bits, as written on the wire
    pub fn high(&self) -> i64 {
        self.0.as_u64_pair().0 as i64
    }

    /// Lower 64 bits, as written on the wire
    pub fn low(&self) -> i64 {
        self.0.as_u64_pair().1 as i64
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for Alias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match PacketKind::from_alias(*self) {
            Some(kind) => write!(f, "{}({})", kind.name(), self.0),
            None => write!(f, "{}", self.0),
        }
    }
}

impl From<&str> for Alias {
    fn from(name: &str) -> Self {
        Alias::from_name(name)
    }
}

impl From<&String> for Alias {
    fn from(name: &String) -> Self {
        Alias::from_name(name)
    }
}

impl From<Uuid> for Alias {
    fn from(id: Uuid) -> Self {
        Alias(id)
    }
}

impl From<(i64, i64)> for Alias {
    fn from((high, low): (i64, i64)) -> Self {
        Alias::from_halves(high, low)
    }
}

impl From<PacketKind> for Alias {
    fn from(kind: PacketKind) -> Self {
        kind.alias()
    }
}

impl From<&Packet> for Alias {
    fn from(packet: &Packet) -> Self {
        packet.alias()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_derivation_is_deterministic() {
        assert_eq!(Alias::from_name("HELLO"), Alias::from_name("HELLO"));
        assert_ne!(Alias::from_name("HELLO"), Alias::from_name("MOVE"));
    }

    #[test]
    fn test_halves_roundtrip() {
        let alias = Alias::from_name("ENTITY_UPDATE");
        assert_eq!(Alias::from_halves(alias.high(), alias.low()), alias);
    }

    #[test]
    fn test_every_form_resolves_to_the_same_key() {
        let packet = Packet::move_to(Uuid::new_v4(), 200, 100);
        let by_name = Alias::from("MOVE");
        let by_id = Alias::from(by_name.as_uuid());
        let by_halves = Alias::from((by_name.high(), by_name.low()));
        let by_kind = Alias::from(PacketKind::Move);
        let by_packet = Alias::from(&packet);

        assert_eq!(by_name, by_id);
        assert_eq!(by_name, by_halves);
        assert_eq!(by_name, by_kind);
        assert_eq!(by_name, by_packet);
    }

    #[test]
    fn test_display_names_known_kinds() {
        assert!(Alias::from_name("ATTACK").to_string().starts_with("ATTACK("));
        let unknown = Alias::from_name("NOT_A_PACKET").to_string();
        assert!(!unknown.contains('('));
    }
}
