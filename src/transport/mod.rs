//! # Transport Layer
//!
//! TCP server accepting sessions, the directory of live sessions and the
//! dispatch sink the game layer uses to reach them.

pub mod server;

pub use server::{DispatchSink, Server, SessionDirectory};
