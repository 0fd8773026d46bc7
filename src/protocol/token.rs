//! # Frame Tokens
//!
//! Every frame carries a token binding it to a source identifier and a send
//! time. A token is created fresh for each outbound frame, rendered as
//! `"<source>:<creation_ms>"`, and sealed with the session's [`Encryptor`].
//! Inbound, the token is opened with the [`Decryptor`], parsed and checked for
//! freshness before the payload is looked at.
//!
//! A token is fresh while its age is within the configured window (30 seconds
//! by default) and its creation time is no more than two seconds in the
//! future.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;
use uuid::Uuid;

use crate::error::{constants, ProtocolError, Result};
use crate::utils::crypto::{Decryptor, Encryptor};
use crate::utils::time::{age_millis, current_timestamp};
use crate::utils::timeout::TOKEN_TTL;

/// Maximum clock skew accepted for tokens stamped in the future
const FUTURE_TOLERANCE_MS: i64 = 2_000;

/// Plaintext content of a frame token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenData {
    pub source: Uuid,
    /// Epoch milliseconds
    pub creation: u64,
}

impl TokenData {
    /// Token for `source`, stamped with the current time.
    pub fn create(source: Uuid) -> Result<Self> {
        Ok(Self {
            source,
            creation: current_timestamp()?,
        })
    }

    /// Plaintext form, before encryption
    pub fn token(&self) -> String {
        format!("{}:{}", self.source, self.creation)
    }

    /// Parse the plaintext form produced by [`TokenData::token`].
    pub fn parse(token: &str) -> Result<Self> {
        let (source, creation) = token
            .split_once(':')
            .ok_or_else(|| ProtocolError::InvalidToken(constants::ERR_TOKEN_FORMAT.into()))?;

        let source = Uuid::parse_str(source)
            .map_err(|_| ProtocolError::InvalidToken(constants::ERR_TOKEN_SOURCE.into()))?;
        let creation = creation
            .parse::<u64>()
            .map_err(|_| ProtocolError::InvalidToken(constants::ERR_TOKEN_CREATION.into()))?;

        Ok(Self { source, creation })
    }

    /// Expiry against the default freshness window.
    pub fn is_expired(&self) -> bool {
        self.is_expired_within(TOKEN_TTL)
    }

    /// A token whose age cannot be computed is treated as expired.
    pub fn is_expired_within(&self, ttl: Duration) -> bool {
        match age_millis(self.creation) {
            Ok(age) => {
                let ttl = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
                age > ttl || age < -FUTURE_TOLERANCE_MS
            }
            Err(_) => true,
        }
    }
}

impl fmt::Display for TokenData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token())
    }
}

/// Seals and opens frame tokens with a session's cipher pair.
#[derive(Clone)]
pub struct TokenCodec {
    encryptor: Arc<dyn Encryptor>,
    decryptor: Arc<dyn Decryptor>,
    ttl: Duration,
}

impl TokenCodec {
    pub fn new(encryptor: Arc<dyn Encryptor>, decryptor: Arc<dyn Decryptor>) -> Self {
        Self {
            encryptor,
            decryptor,
            ttl: TOKEN_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Create and encrypt a fresh token for `source`.
    pub fn seal(&self, source: Uuid) -> Result<String> {
        let data = TokenData::create(source)?;
        self.encryptor.encrypt(&data.token())
    }

    /// Decrypt, parse and validate a token read off the wire.
    ///
    /// # Errors
    /// `DecryptionFailure` or `InvalidToken` when the token cannot be opened,
    /// `TokenExpired` when it falls outside the freshness window.
    pub fn open(&self, sealed: &str) -> Result<TokenData> {
        let plaintext = self.decryptor.decrypt(sealed)?;
        let data = TokenData::parse(&plaintext)?;

        if data.is_expired_within(self.ttl) {
            let age_ms = age_millis(data.creation).unwrap_or(i64::MAX);
            debug!(source = %data.source, age_ms, "Rejected stale token");
            return Err(ProtocolError::TokenExpired {
                issuer: data.source,
                age_ms,
            });
        }

        Ok(data)
    }
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec").field("ttl", &self.ttl).finish()
    }
}
