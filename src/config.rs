//! # Configuration Management
//!
//! Centralized configuration for the transport core.
//!
//! This module provides structured configuration for servers and clients,
//! including listen/dial addresses, timeouts, token security and frame limits.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - Direct instantiation with defaults
//! - Environment overrides via `from_env()` (`MMO_TRANSPORT_*` variables)
//!
//! ## Security Considerations
//! - Token freshness window defaults to 30s; shorter windows narrow replay
//! - The symmetric key is never serialized back out by `example_config()`
//! - A missing key fails cipher construction unless `ephemeral_key` is set
//! - Payload ceiling (16 MB) bounds memory per frame

use crate::core::codec::MAX_PAYLOAD_SIZE;
use crate::error::{constants, ProtocolError, Result};
use crate::utils::crypto::Crypto;
use crate::utils::timeout;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use tracing::{warn, Level};

/// Main network configuration structure that contains all configurable settings
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct NetworkConfig {
    /// Server-specific configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Client-specific configuration
    #[serde(default)]
    pub client: ClientConfig,

    /// Token and cipher configuration
    #[serde(default)]
    pub security: SecurityConfig,

    /// Transport configuration
    #[serde(default)]
    pub transport: TransportConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl NetworkConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("MMO_TRANSPORT_SERVER_ADDRESS") {
            config.server.address = addr;
        }

        if let Ok(addr) = std::env::var("MMO_TRANSPORT_CLIENT_ADDRESS") {
            config.client.address = addr;
        }

        if let Ok(max) = std::env::var("MMO_TRANSPORT_MAX_CONNECTIONS") {
            if let Ok(val) = max.parse::<usize>() {
                config.server.max_connections = val;
            }
        }

        if let Ok(timeout) = std::env::var("MMO_TRANSPORT_CONNECTION_TIMEOUT_MS") {
            if let Ok(val) = timeout.parse::<u64>() {
                config.client.connection_timeout = Duration::from_millis(val);
            }
        }

        if let Ok(ttl) = std::env::var("MMO_TRANSPORT_TOKEN_TTL_MS") {
            if let Ok(val) = ttl.parse::<u64>() {
                config.security.token_ttl = Duration::from_millis(val);
            }
        }

        if let Ok(key) = std::env::var("MMO_TRANSPORT_KEY") {
            config.security.key = Some(key);
        }

        Ok(config)
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Generate example configuration file content
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate example config"))
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to write config file: {e}")))?;

        Ok(())
    }

    /// Validate the configuration for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        errors.extend(self.server.validate());
        errors.extend(self.client.validate());
        errors.extend(self.security.validate());
        errors.extend(self.transport.validate());
        errors.extend(self.logging.validate());

        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ProtocolError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

/// Server-specific configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Server listen address (e.g., "127.0.0.1:7777")
    pub address: String,

    /// Maximum number of concurrent sessions
    pub max_connections: usize,

    /// How long shutdown waits for sessions to drain
    #[serde(with = "duration_serde")]
    pub shutdown_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: String::from("127.0.0.1:7777"),
            max_connections: 1000,
            shutdown_timeout: timeout::SHUTDOWN_TIMEOUT,
        }
    }
}

impl ServerConfig {
    /// Validate server configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.address.is_empty() {
            errors.push("Server address cannot be empty".to_string());
        } else if self.address.parse::<std::net::SocketAddr>().is_err() {
            errors.push(format!(
                "Invalid server address format: '{}' (expected format: '0.0.0.0:7777')",
                self.address
            ));
        }

        if self.shutdown_timeout.as_secs() < 1 {
            errors.push("Shutdown timeout too short (minimum: 1s)".to_string());
        } else if self.shutdown_timeout.as_secs() > 60 {
            errors.push("Shutdown timeout too long (maximum: 60s)".to_string());
        }

        if self.max_connections == 0 {
            errors.push("Max connections must be greater than 0".to_string());
        } else if self.max_connections > 100_000 {
            errors.push(format!(
                "Max connections very high: {} (ensure system resources can support this)",
                self.max_connections
            ));
        }

        errors
    }
}

/// Client-specific configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    /// Target server address
    pub address: String,

    /// Timeout for connection attempts
    #[serde(with = "duration_serde")]
    pub connection_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            address: String::from("127.0.0.1:7777"),
            connection_timeout: timeout::DEFAULT_TIMEOUT,
        }
    }
}

impl ClientConfig {
    /// Validate client configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.address.is_empty() {
            errors.push("Client address cannot be empty".to_string());
        } else if self.address.parse::<std::net::SocketAddr>().is_err() {
            errors.push(format!(
                "Invalid client address format: '{}' (expected format: '127.0.0.1:7777')",
                self.address
            ));
        }

        if self.connection_timeout.as_millis() < 100 {
            errors.push("Connection timeout too short (minimum: 100ms)".to_string());
        } else if self.connection_timeout.as_secs() > 300 {
            errors.push("Connection timeout too long (maximum: 300s)".to_string());
        }

        errors
    }
}

/// Token and cipher configuration
#[derive(Clone, Deserialize, Serialize)]
pub struct SecurityConfig {
    /// Freshness window for inbound frame tokens
    #[serde(with = "duration_serde")]
    pub token_ttl: Duration,

    /// Base64 encoded 32-byte symmetric key shared by both ends
    #[serde(default, skip_serializing)]
    pub key: Option<String>,

    /// Generate a throwaway key when none is configured. Only useful when
    /// both ends live in this process.
    #[serde(default)]
    pub ephemeral_key: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            token_ttl: timeout::TOKEN_TTL,
            key: None,
            ephemeral_key: false,
        }
    }
}

impl std::fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("token_ttl", &self.token_ttl)
            .field("key", &self.key.as_ref().map(|_| "<redacted>"))
            .field("ephemeral_key", &self.ephemeral_key)
            .finish()
    }
}

impl SecurityConfig {
    /// Build the token cipher.
    ///
    /// # Errors
    /// `ConfigError` when the key is malformed, or missing without
    /// `ephemeral_key` set.
    pub fn crypto(&self) -> Result<Crypto> {
        match &self.key {
            Some(key) => Crypto::from_base64_key(key),
            None if self.ephemeral_key => {
                warn!("No security key configured, generating an ephemeral key");
                Crypto::from_base64_key(&Crypto::generate_key()?)
            }
            None => Err(ProtocolError::ConfigError(constants::ERR_KEY_MISSING.into())),
        }
    }

    /// Validate security configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.token_ttl.as_millis() < 100 {
            errors.push("Token TTL too short (minimum: 100ms)".to_string());
        } else if self.token_ttl.as_secs() > 3600 {
            errors.push("Token TTL too long (maximum: 1 hour)".to_string());
        }

        if let Some(key) = &self.key {
            if let Err(e) = Crypto::from_base64_key(key) {
                errors.push(format!("Invalid security key: {e}"));
            }
        }

        errors
    }
}

/// Transport configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransportConfig {
    /// Maximum allowed payload size in bytes
    pub max_payload_size: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_payload_size: MAX_PAYLOAD_SIZE,
        }
    }
}

impl TransportConfig {
    /// Validate transport configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.max_payload_size == 0 {
            errors.push("Max payload size cannot be 0".to_string());
        } else if self.max_payload_size < 1024 {
            errors.push("Max payload size too small (minimum: 1 KB)".to_string());
        } else if self.max_payload_size > i32::MAX as usize {
            errors.push(format!(
                "Max payload size too large: {} bytes (frame length is a signed 32-bit field)",
                self.max_payload_size
            ));
        }

        errors
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Application name for logs
    pub app_name: String,

    /// Log level
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Path to log file; logs go to stdout when unset
    #[serde(default)]
    pub log_file_path: Option<String>,

    /// Whether to use JSON formatting for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: String::from("mmo-transport"),
            log_level: Level::INFO,
            log_file_path: None,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Validate logging configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.app_name.is_empty() {
            errors.push("Application name cannot be empty".to_string());
        } else if self.app_name.len() > 64 {
            errors.push(format!(
                "Application name too long: {} characters (maximum: 64)",
                self.app_name.len()
            ));
        }

        if let Some(ref path) = self.log_file_path {
            if let Some(parent) = std::path::Path::new(path).parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    errors.push(format!(
                        "Log file directory does not exist: {}",
                        parent.display()
                    ));
                }
            }
        }

        errors
    }
}

/// Helper module for Duration serialization/deserialization
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = duration.as_millis() as u64;
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Helper module for tracing::Level serialization/deserialization
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let level_str = match *level {
            Level::TRACE => "trace",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };
        level_str.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level_str = String::deserialize(deserializer)?;
        Level::from_str(&level_str)
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {level_str}")))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(NetworkConfig::default().validate().is_empty());
    }

    #[test]
    fn test_durations_are_milliseconds() {
        let config = NetworkConfig::from_toml(
            r#"
            [security]
            token_ttl = 1500

            [logging]
            app_name = "zone-1"
            log_level = "debug"
            json_format = true
            "#,
        )
        .unwrap();

        assert_eq!(config.security.token_ttl, Duration::from_millis(1500));
        assert_eq!(config.logging.log_level, Level::DEBUG);
        assert_eq!(config.server.max_connections, 1000);
    }

    #[test]
    fn test_key_is_not_written_back() {
        let config = NetworkConfig::default_with_overrides(|c| {
            c.security.key = Some(Crypto::generate_key().unwrap());
        });
        let rendered = toml::to_string_pretty(&config).unwrap();
        assert!(!rendered.contains("key ="));
        assert!(!format!("{config:?}").contains(config.security.key.as_deref().unwrap()));
    }

    #[test]
    fn test_bad_key_is_reported() {
        let config = NetworkConfig::default_with_overrides(|c| {
            c.security.key = Some("too-short".into());
        });
        assert!(config.validate_strict().is_err());
        assert!(config.security.crypto().is_err());
    }

    #[test]
    fn test_missing_key_fails_unless_ephemeral() {
        let config = SecurityConfig::default();
        assert!(matches!(config.crypto(), Err(ProtocolError::ConfigError(_))));

        let config = SecurityConfig {
            ephemeral_key: true,
            ..SecurityConfig::default()
        };
        assert!(config.crypto().is_ok());
    }
}
