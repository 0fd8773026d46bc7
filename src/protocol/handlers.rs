//! Game-side handlers for inbound packets.
//!
//! The transport does not own game state. Handlers reach entities through the
//! [`World`] collaborator and apply the packet's effect to them.

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::error::{ProtocolError, Result};
use crate::protocol::dispatcher::{HandlerDispatch, PacketHandler};
use crate::protocol::packet::{Packet, PacketBody, PacketKind, Position};

/// An entity that can move and fight.
pub trait Animate: Send + Sync {
    fn move_to(&self, target: Position);

    fn attack(&self, target: Uuid);
}

/// Entity lookup supplied by the map layer.
pub trait World: Send + Sync + 'static {
    fn animate(&self, id: &Uuid) -> Option<Arc<dyn Animate>>;
}

fn resolve(world: &dyn World, id: &Uuid) -> Result<Arc<dyn Animate>> {
    world
        .animate(id)
        .ok_or(ProtocolError::UnknownEntity(*id))
}

fn unexpected(expected: PacketKind, packet: &Packet) -> ProtocolError {
    ProtocolError::UnexpectedPacket {
        expected,
        actual: packet.kind(),
    }
}

/// Moves the packet's source entity to the requested position.
pub struct MoveHandler<W> {
    world: Arc<W>,
}

impl<W: World> MoveHandler<W> {
    pub fn new(world: Arc<W>) -> Self {
        Self { world }
    }
}

impl<W: World> PacketHandler for MoveHandler<W> {
    fn handle(&self, packet: &Packet) -> Result<()> {
        let PacketBody::Move { target } = packet.body() else {
            return Err(unexpected(PacketKind::Move, packet));
        };

        let source = resolve(self.world.as_ref(), &packet.source())?;
        debug!(source = %packet.source(), x = target.x, z = target.z, "Moving entity");
        source.move_to(*target);
        Ok(())
    }
}

/// Makes the packet's source entity attack the targeted entity.
pub struct AttackHandler<W> {
    world: Arc<W>,
}

impl<W: World> AttackHandler<W> {
    pub fn new(world: Arc<W>) -> Self {
        Self { world }
    }
}

impl<W: World> PacketHandler for AttackHandler<W> {
    fn handle(&self, packet: &Packet) -> Result<()> {
        let PacketBody::Attack { target } = packet.body() else {
            return Err(unexpected(PacketKind::Attack, packet));
        };

        let source = resolve(self.world.as_ref(), &packet.source())?;
        resolve(self.world.as_ref(), target)?;
        debug!(source = %packet.source(), %target, "Entity attacking");
        source.attack(*target);
        Ok(())
    }
}

impl HandlerDispatch {
    /// Bind the built-in game handlers against `world`.
    pub fn with_world<W: World>(world: Arc<W>) -> Result<Self> {
        let dispatch = HandlerDispatch::new();
        dispatch
            .bind(PacketKind::Move, MoveHandler::new(world.clone()))?
            .bind(PacketKind::Attack, AttackHandler::new(world))?;
        Ok(dispatch)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Dummy {
        moves: Mutex<Vec<Position>>,
        attacks: Mutex<Vec<Uuid>>,
    }

    impl Animate for Dummy {
        fn move_to(&self, target: Position) {
            self.moves.lock().unwrap().push(target);
        }

        fn attack(&self, target: Uuid) {
            self.attacks.lock().unwrap().push(target);
        }
    }

    #[derive(Default)]
    struct TestWorld {
        entities: HashMap<Uuid, Arc<Dummy>>,
    }

    impl World for TestWorld {
        fn animate(&self, id: &Uuid) -> Option<Arc<dyn Animate>> {
            self.entities
                .get(id)
                .map(|entity| entity.clone() as Arc<dyn Animate>)
        }
    }

    fn world_with(ids: &[Uuid]) -> (Arc<TestWorld>, Vec<Arc<Dummy>>) {
        let mut world = TestWorld::default();
        let mut dummies = Vec::new();
        for id in ids {
            let dummy = Arc::new(Dummy::default());
            world.entities.insert(*id, dummy.clone());
            dummies.push(dummy);
        }
        (Arc::new(world), dummies)
    }

    #[test]
    fn test_move_handler_moves_source() {
        let id = Uuid::new_v4();
        let (world, dummies) = world_with(&[id]);
        let dispatch = HandlerDispatch::with_world(world).unwrap();

        dispatch.delegate(&Packet::move_to(id, 10, 15)).unwrap();
        assert_eq!(*dummies[0].moves.lock().unwrap(), vec![Position::new(10, 15)]);
    }

    #[test]
    fn test_attack_handler_requires_both_entities() {
        let attacker = Uuid::new_v4();
        let victim = Uuid::new_v4();
        let (world, dummies) = world_with(&[attacker, victim]);
        let dispatch = HandlerDispatch::with_world(world).unwrap();

        dispatch.delegate(&Packet::attack(attacker, victim)).unwrap();
        assert_eq!(*dummies[0].attacks.lock().unwrap(), vec![victim]);

        let ghost = Uuid::new_v4();
        let err = dispatch.delegate(&Packet::attack(attacker, ghost)).unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownEntity(id) if id == ghost));
        assert_eq!(dummies[0].attacks.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_unknown_source_is_an_error() {
        let (world, _) = world_with(&[]);
        let handler = MoveHandler::new(world);
        let stranger = Uuid::new_v4();
        assert!(matches!(
            handler.handle(&Packet::move_to(stranger, 0, 0)),
            Err(ProtocolError::UnknownEntity(id)) if id == stranger
        ));
    }

    #[test]
    fn test_wrong_packet_kind_rejected() {
        let (world, _) = world_with(&[]);
        let handler = MoveHandler::new(world.clone());
        let err = handler.handle(&Packet::goodbye(Uuid::nil())).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::UnexpectedPacket {
                expected: PacketKind::Move,
                actual: PacketKind::GoodBye,
            }
        ));
        assert!(err.is_binding_error());

        let err = AttackHandler::new(world)
            .handle(&Packet::move_to(Uuid::nil(), 1, 1))
            .unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::UnexpectedPacket {
                expected: PacketKind::Attack,
                actual: PacketKind::Move,
            }
        ));
    }
}
