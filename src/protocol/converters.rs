//! Built-in packet converters.
//!
//! Payload layouts (big-endian, see [`crate::core::binary`]):
//!
//! | alias           | payload                                                         |
//! |-----------------|-----------------------------------------------------------------|
//! | `HELLO`         | user name (string), user password (string)                      |
//! | `GOODBYE`       | empty                                                           |
//! | `MOVE`          | x (i32), z (i32)                                                |
//! | `ATTACK`        | target (id)                                                     |
//! | `ANIMATE_DIE`   | killed by (id)                                                  |
//! | `ENTITY_UPDATE` | name (string), x, z, hp, max hp (i32), move speed (f32), alive, |
//! |                 | moving, attacking (bool), has target (bool), [target (id)]      |
//!
//! `DISCONNECT` has no converter: the sentinel never reaches the wire.

use uuid::Uuid;

use crate::core::binary::{PacketReader, PacketWriter};
use crate::error::{ProtocolError, Result};
use crate::protocol::gateway::{Gateway, PacketConverter};
use crate::protocol::packet::{EntityState, PacketBody, PacketKind, Position};

fn mismatch(expected: PacketKind, body: &PacketBody) -> ProtocolError {
    ProtocolError::ConverterMismatch {
        alias: expected.alias(),
        kind: body.kind(),
    }
}

fn write_position(writer: &mut PacketWriter, position: &Position) {
    writer.write_i32(position.x);
    writer.write_i32(position.z);
}

fn read_position(reader: &mut PacketReader<'_>) -> Result<Position> {
    let x = reader.read_i32()?;
    let z = reader.read_i32()?;
    Ok(Position::new(x, z))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HelloConverter;

impl PacketConverter for HelloConverter {
    fn write(&self, body: &PacketBody, writer: &mut PacketWriter) -> Result<()> {
        match body {
            PacketBody::Hello {
                user_name,
                user_password,
            } => {
                writer.write_string(user_name)?;
                writer.write_string(user_password)
            }
            other => Err(mismatch(PacketKind::Hello, other)),
        }
    }

    fn read(&self, reader: &mut PacketReader<'_>) -> Result<PacketBody> {
        let user_name = reader.read_string()?;
        let user_password = reader.read_string()?;
        Ok(PacketBody::Hello {
            user_name,
            user_password,
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GoodByeConverter;

impl PacketConverter for GoodByeConverter {
    fn write(&self, body: &PacketBody, _writer: &mut PacketWriter) -> Result<()> {
        match body {
            PacketBody::GoodBye => Ok(()),
            other => Err(mismatch(PacketKind::GoodBye, other)),
        }
    }

    fn read(&self, _reader: &mut PacketReader<'_>) -> Result<PacketBody> {
        Ok(PacketBody::GoodBye)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MoveConverter;

impl PacketConverter for MoveConverter {
    fn write(&self, body: &PacketBody, writer: &mut PacketWriter) -> Result<()> {
        match body {
            PacketBody::Move { target } => {
                write_position(writer, target);
                Ok(())
            }
            other => Err(mismatch(PacketKind::Move, other)),
        }
    }

    fn read(&self, reader: &mut PacketReader<'_>) -> Result<PacketBody> {
        Ok(PacketBody::Move {
            target: read_position(reader)?,
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AttackConverter;

impl PacketConverter for AttackConverter {
    fn write(&self, body: &PacketBody, writer: &mut PacketWriter) -> Result<()> {
        match body {
            PacketBody::Attack { target } => {
                writer.write_uuid(target);
                Ok(())
            }
            other => Err(mismatch(PacketKind::Attack, other)),
        }
    }

    fn read(&self, reader: &mut PacketReader<'_>) -> Result<PacketBody> {
        Ok(PacketBody::Attack {
            target: reader.read_uuid()?,
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AnimateDieConverter;

impl PacketConverter for AnimateDieConverter {
    fn write(&self, body: &PacketBody, writer: &mut PacketWriter) -> Result<()> {
        match body {
            PacketBody::AnimateDie { killed_by } => {
                writer.write_uuid(killed_by);
                Ok(())
            }
            other => Err(mismatch(PacketKind::AnimateDie, other)),
        }
    }

    fn read(&self, reader: &mut PacketReader<'_>) -> Result<PacketBody> {
        Ok(PacketBody::AnimateDie {
            killed_by: reader.read_uuid()?,
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EntityUpdateConverter;

impl PacketConverter for EntityUpdateConverter {
    fn write(&self, body: &PacketBody, writer: &mut PacketWriter) -> Result<()> {
        let state = match body {
            PacketBody::EntityUpdate(state) => state,
            other => return Err(mismatch(PacketKind::EntityUpdate, other)),
        };

        writer.write_string(&state.name)?;
        write_position(writer, &state.position);
        writer.write_i32(state.hp);
        writer.write_i32(state.max_hp);
        writer.write_f32(state.move_speed);
        writer.write_bool(state.alive);
        writer.write_bool(state.moving);
        writer.write_bool(state.attacking);
        match &state.target {
            Some(target) => {
                writer.write_bool(true);
                writer.write_uuid(target);
            }
            None => writer.write_bool(false),
        }
        Ok(())
    }

    fn read(&self, reader: &mut PacketReader<'_>) -> Result<PacketBody> {
        let name = reader.read_string()?;
        let position = read_position(reader)?;
        let hp = reader.read_i32()?;
        let max_hp = reader.read_i32()?;
        let move_speed = reader.read_f32()?;
        let alive = reader.read_bool()?;
        let moving = reader.read_bool()?;
        let attacking = reader.read_bool()?;
        let target: Option<Uuid> = if reader.read_bool()? {
            Some(reader.read_uuid()?)
        } else {
            None
        };

        Ok(PacketBody::EntityUpdate(EntityState {
            name,
            position,
            hp,
            max_hp,
            move_speed,
            alive,
            moving,
            attacking,
            target,
        }))
    }
}

impl Gateway {
    /// Gateway with every built-in converter bound.
    pub fn with_defaults() -> Result<Self> {
        let gateway = Gateway::new();
        gateway
            .bind(PacketKind::Hello, HelloConverter)?
            .bind(PacketKind::GoodBye, GoodByeConverter)?
            .bind(PacketKind::Move, MoveConverter)?
            .bind(PacketKind::Attack, AttackConverter)?
            .bind(PacketKind::AnimateDie, AnimateDieConverter)?
            .bind(PacketKind::EntityUpdate, EntityUpdateConverter)?;
        Ok(gateway)
    }
}
