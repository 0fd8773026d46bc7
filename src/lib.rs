//! # mmo-transport
//!
//! Network transport core of a real-time multiplayer game server.
//!
//! A [`Session`] owns one TCP socket and runs an outbound and an inbound loop
//! on their own tokio tasks. Outbound packets are encoded by the [`Gateway`],
//! stamped with a fresh encrypted token and framed as an envelope; inbound
//! envelopes are authenticated by their token, decoded, handed to the receive
//! observer and, on a [`Server`], routed through [`HandlerDispatch`].
//!
//! ## Modules
//! - [`core`]: binary primitives, the envelope frame and its tokio codec
//! - [`protocol`]: aliases, packets, converters, tokens and handler dispatch
//! - [`service`]: sessions and their lifecycle
//! - [`transport`]: the TCP server and session directory
//! - [`utils`]: cipher, logging, metrics and timing helpers
//!
//! ## Quick start
//! ```no_run
//! use std::sync::Arc;
//! use mmo_transport::{Crypto, Gateway, Packet, SessionBuilder};
//! use uuid::Uuid;
//!
//! # async fn run() -> mmo_transport::Result<()> {
//! let crypto = Arc::new(Crypto::from_base64_key(&Crypto::generate_key()?)?);
//! let gateway = Arc::new(Gateway::with_defaults()?);
//!
//! let session = SessionBuilder::new(gateway, crypto.clone(), crypto)
//!     .on_receive(|_, packet| println!("received {packet}"))
//!     .connect("127.0.0.1:7777")
//!     .await?;
//!
//! session.send(Packet::hello(Uuid::new_v4(), "ayla", "secret"));
//! session.disconnect_after_flush();
//! session.closed().await;
//! # Ok(())
//! # }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod service;
pub mod transport;
pub mod utils;

pub use config::NetworkConfig;
pub use error::{ProtocolError, Result};
pub use protocol::alias::Alias;
pub use protocol::dispatcher::{HandlerDispatch, PacketHandler};
pub use protocol::gateway::{Gateway, PacketConverter};
pub use protocol::packet::{EntityState, Packet, PacketBody, PacketKind, Position};
pub use protocol::token::{TokenCodec, TokenData};
pub use service::session::{Session, SessionBuilder, SessionState};
pub use transport::server::{DispatchSink, Server, SessionDirectory};
pub use utils::crypto::{Crypto, Decryptor, Encryptor};
pub use utils::metrics::{Metrics, MetricsSnapshot};
