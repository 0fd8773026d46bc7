//! # Utility Modules
//!
//! Supporting utilities for cryptography, logging, metrics and timing.
//!
//! ## Components
//! - **Crypto**: `Encryptor`/`Decryptor` seams and the XChaCha20-Poly1305 token cipher
//! - **Logging**: Structured logging configuration
//! - **Metrics**: Thread-safe session counters
//! - **Time**: Millisecond timestamps for token stamping and expiry checks
//! - **Timeout**: Default timeouts and async timeout wrappers
//!
//! ## Security
//! - Cryptographically secure RNG (getrandom) for nonces and keys
//! - Key material zeroed after use (zeroize crate)

pub mod crypto;
pub mod logging;
pub mod metrics;
pub mod time;
pub mod timeout;

pub use crypto::{Crypto, Decryptor, Encryptor};
pub use metrics::{Metrics, MetricsSnapshot};
