//! Symmetric cipher used to seal frame tokens.
//!
//! Sessions only see the [`Encryptor`] / [`Decryptor`] pair, so the cipher is
//! keyed and chosen outside the transport. The shipped implementation,
//! [`Crypto`], is XChaCha20-Poly1305: every call draws a fresh 24-byte nonce and
//! the token string is `base64(nonce || ciphertext)`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use zeroize::Zeroize;

use crate::error::{constants, ProtocolError, Result};

const NONCE_LEN: usize = 24;

/// Turns a plaintext token into the string written on the wire.
pub trait Encryptor: Send + Sync {
    fn encrypt(&self, plaintext: &str) -> Result<String>;
}

/// Inverse of [`Encryptor`].
pub trait Decryptor: Send + Sync {
    fn decrypt(&self, ciphertext: &str) -> Result<String>;
}

/// XChaCha20-Poly1305 AEAD cipher
#[derive(Clone)]
pub struct Crypto {
    cipher: XChaCha20Poly1305,
}

impl Crypto {
    /// Create a cipher from a 32-byte key
    pub fn new(key: &[u8; 32]) -> Self {
        Self {
            cipher: XChaCha20Poly1305::new(Key::from_slice(key)),
        }
    }

    /// Create a cipher from a base64 encoded 32-byte key
    pub fn from_base64_key(encoded: &str) -> Result<Self> {
        let mut raw = STANDARD
            .decode(encoded.trim())
            .map_err(|_| ProtocolError::ConfigError(constants::ERR_KEY_ENCODING.into()))?;

        if raw.len() != 32 {
            raw.zeroize();
            return Err(ProtocolError::ConfigError(constants::ERR_KEY_LENGTH.into()));
        }

        let mut key = [0u8; 32];
        key.copy_from_slice(&raw);
        let crypto = Self::new(&key);

        raw.zeroize();
        key.zeroize();

        Ok(crypto)
    }

    /// Generate a fresh random key, base64 encoded (handy for config files)
    pub fn generate_key() -> Result<String> {
        let mut key = [0u8; 32];
        getrandom::fill(&mut key).map_err(|_| ProtocolError::EncryptionFailure)?;
        let encoded = STANDARD.encode(key);
        key.zeroize();
        Ok(encoded)
    }

    /// Generate a cryptographically secure random nonce
    pub fn generate_nonce() -> Result<[u8; NONCE_LEN]> {
        let mut nonce = [0u8; NONCE_LEN];
        getrandom::fill(&mut nonce).map_err(|_| ProtocolError::EncryptionFailure)?;
        Ok(nonce)
    }

    pub fn encrypt_bytes(&self, data: &[u8], nonce: &[u8; NONCE_LEN]) -> Result<Vec<u8>> {
        self.cipher
            .encrypt(XNonce::from_slice(nonce), data)
            .map_err(|_| ProtocolError::EncryptionFailure)
    }

    pub fn decrypt_bytes(&self, data: &[u8], nonce: &[u8; NONCE_LEN]) -> Result<Vec<u8>> {
        self.cipher
            .decrypt(XNonce::from_slice(nonce), data)
            .map_err(|_| ProtocolError::DecryptionFailure)
    }
}

impl Encryptor for Crypto {
    fn encrypt(&self, plaintext: &str) -> Result<String> {
        let mut nonce = Self::generate_nonce()?;
        let ciphertext = self.encrypt_bytes(plaintext.as_bytes(), &nonce)?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend(ciphertext);
        nonce.zeroize();

        Ok(STANDARD.encode(sealed))
    }
}

impl Decryptor for Crypto {
    fn decrypt(&self, ciphertext: &str) -> Result<String> {
        let sealed = STANDARD
            .decode(ciphertext)
            .map_err(|_| ProtocolError::DecryptionFailure)?;

        if sealed.len() < NONCE_LEN {
            return Err(ProtocolError::DecryptionFailure);
        }

        let (nonce_bytes, body) = sealed.split_at(NONCE_LEN);
        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(nonce_bytes);

        let plaintext = self.decrypt_bytes(body, &nonce)?;
        nonce.zeroize();

        String::from_utf8(plaintext).map_err(|e| {
            e.into_bytes().zeroize();
            ProtocolError::DecryptionFailure
        })
    }
}

impl std::fmt::Debug for Crypto {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Crypto(XChaCha20Poly1305)")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_token_string_roundtrip() {
        let crypto = Crypto::new(&[0x42; 32]);
        let sealed = crypto.encrypt("hello:1234").unwrap();
        assert_ne!(sealed, "hello:1234");
        assert_eq!(crypto.decrypt(&sealed).unwrap(), "hello:1234");
    }

    #[test]
    fn test_fresh_nonce_per_call() {
        let crypto = Crypto::new(&[0x11; 32]);
        let a = crypto.encrypt("same").unwrap();
        let b = crypto.encrypt("same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_wrong_key_fails() {
        let sealed = Crypto::new(&[1; 32]).encrypt("secret").unwrap();
        let result = Crypto::new(&[2; 32]).decrypt(&sealed);
        assert!(matches!(result, Err(ProtocolError::DecryptionFailure)));
    }

    #[test]
    fn test_garbage_input_fails() {
        let crypto = Crypto::new(&[3; 32]);
        assert!(crypto.decrypt("not base64 !!").is_err());
        assert!(crypto.decrypt("AAAA").is_err());
    }

    #[test]
    fn test_base64_key() {
        let key = Crypto::generate_key().unwrap();
        let crypto = Crypto::from_base64_key(&key).unwrap();
        let sealed = crypto.encrypt("x").unwrap();
        assert_eq!(crypto.decrypt(&sealed).unwrap(), "x");

        assert!(matches!(
            Crypto::from_base64_key("c2hvcnQ="),
            Err(ProtocolError::ConfigError(_))
        ));
        assert!(Crypto::from_base64_key("%%%").is_err());
    }
}
