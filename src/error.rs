//! # Error Types
//!
//! Error handling for the transport core.
//!
//! Every fallible operation in the crate returns [`Result`], whose error side is
//! [`ProtocolError`]. The variants fall into a handful of families:
//!
//! ## Error Categories
//! - **Binding Errors**: no converter or handler registered for an alias / packet kind
//! - **Read/Write Errors**: malformed frames, short reads, primitive decode failures, I/O
//! - **Security Errors**: expired or unparsable tokens, cipher failures
//! - **Connection Errors**: dial failures and timeouts outside the session loops
//! - **Collaborator Errors**: unknown entities, configuration problems
//!
//! Errors raised inside a session loop never escape it: the loop logs them and
//! tears the session down. Errors raised while building or dialing a session
//! propagate to the caller.
//!
//! ## Example Usage
//! ```rust
//! use mmo_transport::error::{ProtocolError, Result};
//! use mmo_transport::protocol::gateway::Gateway;
//! use mmo_transport::protocol::packet::Packet;
//! use uuid::Uuid;
//!
//! fn encode_hello(gateway: &Gateway) -> Result<Vec<u8>> {
//!     let packet = Packet::hello(Uuid::new_v4(), "ayla", "secret");
//!     Ok(gateway.encode(&packet)?.to_vec())
//! }
//!
//! let empty = Gateway::new();
//! assert!(matches!(encode_hello(&empty), Err(ProtocolError::ConverterNotBound(_))));
//! ```

use std::io;
use thiserror::Error;
use uuid::Uuid;

use crate::protocol::alias::Alias;
use crate::protocol::packet::PacketKind;

/// Error message constants to reduce allocations in error paths.
pub mod constants {
    /// Registry lock errors
    pub const ERR_GATEWAY_WRITE_LOCK: &str = "Failed to acquire write lock on gateway";
    pub const ERR_GATEWAY_READ_LOCK: &str = "Failed to acquire read lock on gateway";
    pub const ERR_DISPATCHER_WRITE_LOCK: &str = "Failed to acquire write lock on dispatcher";
    pub const ERR_DISPATCHER_READ_LOCK: &str = "Failed to acquire read lock on dispatcher";
    pub const ERR_DIRECTORY_LOCK: &str = "Failed to acquire lock on session directory";

    /// Primitive codec errors
    pub const ERR_SHORT_READ: &str = "Not enough bytes remaining";
    pub const ERR_INVALID_UTF8: &str = "String is not valid UTF-8";
    pub const ERR_INVALID_BOOL: &str = "Boolean byte must be 0 or 1";
    pub const ERR_STRING_TOO_LONG: &str = "String exceeds 65535 encoded bytes";
    pub const ERR_TRAILING_BYTES: &str = "Payload has unread trailing bytes";

    /// Frame errors
    pub const ERR_NEGATIVE_LENGTH: &str = "Frame declares a negative payload length";

    /// Token errors
    pub const ERR_TOKEN_FORMAT: &str = "Token must be <source>:<creation>";
    pub const ERR_TOKEN_SOURCE: &str = "Token source is not a valid identifier";
    pub const ERR_TOKEN_CREATION: &str = "Token creation is not a valid timestamp";

    /// Time errors
    pub const ERR_SYSTEM_TIME: &str = "System time error: time went backwards";

    /// Key errors
    pub const ERR_KEY_ENCODING: &str = "Key is not valid base64";
    pub const ERR_KEY_LENGTH: &str = "Key must decode to exactly 32 bytes";
    pub const ERR_KEY_MISSING: &str =
        "No security key configured; set security.key or enable security.ephemeral_key";
}

/// ProtocolError is the primary error type for all transport operations
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("No converter bound for alias {0}")]
    ConverterNotBound(Alias),

    #[error("Converter for alias {alias} cannot handle {kind} packets")]
    ConverterMismatch { alias: Alias, kind: PacketKind },

    #[error("No handler bound for {0} packets")]
    HandlerNotBound(PacketKind),

    #[error("{expected} handler received a {actual} packet")]
    UnexpectedPacket {
        expected: PacketKind,
        actual: PacketKind,
    },

    #[error("Packet read error: {0}")]
    PacketRead(String),

    #[error("Packet write error: {0}")]
    PacketWrite(String),

    #[error("Packet too large: {0} bytes")]
    OversizedPacket(usize),

    #[error("Token from {issuer} expired ({age_ms} ms old)")]
    TokenExpired { issuer: Uuid, age_ms: i64 },

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Encryption failed")]
    EncryptionFailure,

    #[error("Decryption failed")]
    DecryptionFailure,

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Timeout occurred")]
    Timeout,

    #[error("Unknown entity: {0}")]
    UnknownEntity(Uuid),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Custom error: {0}")]
    Custom(String),
}

impl ProtocolError {
    /// True for errors that must be treated as a failed read of the frame
    /// carrying them (token and cipher problems included).
    pub fn is_read_error(&self) -> bool {
        matches!(
            self,
            ProtocolError::PacketRead(_)
                | ProtocolError::OversizedPacket(_)
                | ProtocolError::Io(_)
                | ProtocolError::TokenExpired { .. }
                | ProtocolError::InvalidToken(_)
                | ProtocolError::DecryptionFailure
        )
    }

    /// True for missing converter / handler registrations.
    pub fn is_binding_error(&self) -> bool {
        matches!(
            self,
            ProtocolError::ConverterNotBound(_)
                | ProtocolError::ConverterMismatch { .. }
                | ProtocolError::HandlerNotBound(_)
                | ProtocolError::UnexpectedPacket { .. }
        )
    }
}

/// Type alias for Results using ProtocolError
pub type Result<T> = std::result::Result<T, ProtocolError>;
