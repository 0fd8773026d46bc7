//! # Packet Protocol
//!
//! Everything between a typed [`packet::Packet`] and the bytes of an envelope
//! payload, plus the routing of decoded packets into game logic.
//!
//! ## Components
//! - **Alias**: Packet kind identifiers (name, 128-bit id, wire halves)
//! - **Packet**: Typed packet values and the built-in packet catalogue
//! - **Gateway**: Alias-keyed converter registry with the built-in converters
//! - **Token**: Per-frame source/creation tokens and their freshness check
//! - **Dispatcher**: Handler registry keyed by packet kind
//! - **Handlers**: Move/attack handlers acting through the `World` collaborator
//!
//! ## Security
//! - Decoded packets take `source` and `creation` from the validated token,
//!   never from the payload
//! - Unbound aliases and kinds fail closed

pub mod alias;
pub mod converters;
pub mod dispatcher;
pub mod gateway;
pub mod handlers;
pub mod packet;
pub mod token;
