//! # Session Service
//!
//! Per-connection session management: socket ownership, the outbound queue,
//! the send/receive loops and the connect/disconnect lifecycle.

pub mod session;

pub use session::{Session, SessionBuilder, SessionState};
