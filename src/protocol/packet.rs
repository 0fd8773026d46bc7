//! Protocol-level packets.
//!
//! A [`Packet`] is an immutable value: the identifier of the session or entity
//! it speaks for (`source`), an optional `creation` time and a typed
//! [`PacketBody`]. `creation` is never sent in the payload. The receiving side
//! fills it in from the validated frame token, which is why equality ignores it.

use std::fmt;

use uuid::Uuid;

use crate::protocol::alias::Alias;

/// Position on the map plane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Position {
    pub x: i32,
    pub z: i32,
}

impl Position {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }
}

/// Snapshot of an animate entity pushed to clients
#[derive(Debug, Clone, PartialEq)]
pub struct EntityState {
    pub name: String,
    pub position: Position,
    pub hp: i32,
    pub max_hp: i32,
    pub move_speed: f32,
    pub alive: bool,
    pub moving: bool,
    pub attacking: bool,
    pub target: Option<Uuid>,
}

/// Discriminant of [`PacketBody`], used as the handler dispatch key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PacketKind {
    Hello,
    GoodBye,
    Move,
    Attack,
    AnimateDie,
    EntityUpdate,
    Disconnect,
}

impl PacketKind {
    pub const ALL: [PacketKind; 7] = [
        PacketKind::Hello,
        PacketKind::GoodBye,
        PacketKind::Move,
        PacketKind::Attack,
        PacketKind::AnimateDie,
        PacketKind::EntityUpdate,
        PacketKind::Disconnect,
    ];

    /// Human-readable alias name
    pub const fn name(self) -> &'static str {
        match self {
            PacketKind::Hello => "HELLO",
            PacketKind::GoodBye => "GOODBYE",
            PacketKind::Move => "MOVE",
            PacketKind::Attack => "ATTACK",
            PacketKind::AnimateDie => "ANIMATE_DIE",
            PacketKind::EntityUpdate => "ENTITY_UPDATE",
            PacketKind::Disconnect => "DISCONNECT",
        }
    }

    pub fn alias(self) -> Alias {
        Alias::from_name(self.name())
    }

    /// Reverse lookup of a built-in kind from its wire alias
    pub fn from_alias(alias: Alias) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.alias() == alias)
    }
}

impl fmt::Display for PacketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Typed packet payloads
#[derive(Debug, Clone, PartialEq)]
pub enum PacketBody {
    Hello {
        user_name: String,
        user_password: String,
    },
    GoodBye,
    Move {
        target: Position,
    },
    Attack {
        target: Uuid,
    },
    AnimateDie {
        killed_by: Uuid,
    },
    EntityUpdate(EntityState),
    /// Stops a session's send loop. Never written to the wire.
    Disconnect,
}

impl PacketBody {
    pub fn kind(&self) -> PacketKind {
        match self {
            PacketBody::Hello { .. } => PacketKind::Hello,
            PacketBody::GoodBye => PacketKind::GoodBye,
            PacketBody::Move { .. } => PacketKind::Move,
            PacketBody::Attack { .. } => PacketKind::Attack,
            PacketBody::AnimateDie { .. } => PacketKind::AnimateDie,
            PacketBody::EntityUpdate(_) => PacketKind::EntityUpdate,
            PacketBody::Disconnect => PacketKind::Disconnect,
        }
    }
}

/// A protocol message
#[derive(Debug, Clone)]
pub struct Packet {
    source: Uuid,
    creation: Option<u64>,
    body: PacketBody,
}

impl Packet {
    pub fn new(source: Uuid, body: PacketBody) -> Self {
        Self {
            source,
            creation: None,
            body,
        }
    }

    /// Packet as rebuilt by the receiving side, stamped with the token's
    /// creation time.
    pub(crate) fn received(source: Uuid, creation: u64, body: PacketBody) -> Self {
        Self {
            source,
            creation: Some(creation),
            body,
        }
    }

    pub fn hello(source: Uuid, user_name: impl Into<String>, user_password: impl Into<String>) -> Self {
        Self::new(
            source,
            PacketBody::Hello {
                user_name: user_name.into(),
                user_password: user_password.into(),
            },
        )
    }

    pub fn goodbye(source: Uuid) -> Self {
        Self::new(source, PacketBody::GoodBye)
    }

    pub fn move_to(source: Uuid, x: i32, z: i32) -> Self {
        Self::new(
            source,
            PacketBody::Move {
                target: Position::new(x, z),
            },
        )
    }

    pub fn attack(source: Uuid, target: Uuid) -> Self {
        Self::new(source, PacketBody::Attack { target })
    }

    pub fn animate_die(source: Uuid, killed_by: Uuid) -> Self {
        Self::new(source, PacketBody::AnimateDie { killed_by })
    }

    pub fn entity_update(source: Uuid, state: EntityState) -> Self {
        Self::new(source, PacketBody::EntityUpdate(state))
    }

    pub fn disconnect(source: Uuid) -> Self {
        Self::new(source, PacketBody::Disconnect)
    }

    pub fn source(&self) -> Uuid {
        self.source
    }

    /// Creation time in epoch milliseconds, present on received packets only
    pub fn creation(&self) -> Option<u64> {
        self.creation
    }

    pub fn body(&self) -> &PacketBody {
        &self.body
    }

    pub fn into_body(self) -> PacketBody {
        self.body
    }

    pub fn kind(&self) -> PacketKind {
        self.body.kind()
    }

    pub fn alias(&self) -> Alias {
        self.kind().alias()
    }

    pub fn is_disconnect(&self) -> bool {
        matches!(self.body, PacketBody::Disconnect)
    }
}

impl PartialEq for Packet {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source && self.body == other.body
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} from {}", self.kind(), self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_names() {
        let source = Uuid::new_v4();
        assert_eq!(Packet::hello(source, "user", "pass").kind().name(), "HELLO");
        assert_eq!(Packet::move_to(source, 10, 15).kind().name(), "MOVE");
        assert_eq!(Packet::disconnect(source).alias(), Alias::from_name("DISCONNECT"));
    }

    #[test]
    fn test_kind_from_alias() {
        for kind in PacketKind::ALL {
            assert_eq!(PacketKind::from_alias(kind.alias()), Some(kind));
        }
        assert_eq!(PacketKind::from_alias(Alias::from_name("NOPE")), None);
    }

    #[test]
    fn test_equality_ignores_creation() {
        let source = Uuid::new_v4();
        let sent = Packet::move_to(source, 200, 100);
        let received = Packet::received(source, 1_700_000_000_000, sent.body().clone());
        assert_eq!(sent, received);
        assert_eq!(received.creation(), Some(1_700_000_000_000));
        assert_ne!(sent, Packet::move_to(Uuid::new_v4(), 200, 100));
    }

    #[test]
    fn test_display_does_not_leak_payload() {
        let packet = Packet::hello(Uuid::nil(), "ayla", "hunter2");
        let shown = packet.to_string();
        assert!(shown.starts_with("HELLO from"));
        assert!(!shown.contains("hunter2"));
    }
}
