//! # Core Wire Components
//!
//! Low-level framing and binary encoding, independent of packet semantics.
//!
//! ## Components
//! - **Binary**: Big-endian primitive reader/writer used by packet converters
//! - **Envelope**: The wire frame (token, alias, length, payload)
//! - **Codec**: Tokio codec for framing envelopes over byte streams
//!
//! ## Wire Format
//! ```text
//! [TokenLen(2)] [Token(N)] [AliasHigh(8)] [AliasLow(8)] [Length(4)] [Payload(Length)]
//! ```
//!
//! ## Security
//! - Maximum payload size: 16MB by default (prevents memory exhaustion)
//! - Declared length validated before the payload is buffered

pub mod binary;
pub mod codec;
pub mod envelope;
