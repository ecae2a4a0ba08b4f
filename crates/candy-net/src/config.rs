//! # Candy Shop Configuration
//!
//! Configuration for both binaries.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     CANDY_PORT=9443                                                    │
//! │     CANDY_SERVER_ADDR=shop.local:9443                                  │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     --config <path>, otherwise                                         │
//! │     ~/.config/candy-shop/candy.toml (Linux)                            │
//! │     ~/Library/Application Support/com.candy.shop/candy.toml (macOS)    │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     0.0.0.0:8443, certs/*.pem, built-in price table                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [server]
//! bind_addr = "0.0.0.0"
//! port = 8443
//! handshake_timeout_secs = 10
//!
//! [server.credentials]
//! ca_cert = "certs/ca-cert.pem"
//! cert = "certs/server-cert.pem"
//! key = "certs/server-key.pem"
//!
//! [server.prices]
//! CE = 10
//! AA = 15
//!
//! [client]
//! server_addr = "localhost:8443"
//! connect_timeout_secs = 10
//!
//! [client.credentials]
//! ca_cert = "certs/ca-cert.pem"
//! cert = "certs/client-cert.pem"
//! key = "certs/client-key.pem"
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use candy_core::PriceTable;

use crate::error::{ConfigError, ConfigResult};

/// Default TLS port of the vending server.
pub const DEFAULT_PORT: u16 = 8443;

// =============================================================================
// Credential Paths
// =============================================================================

/// Where one side's three PEM files live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPaths {
    /// Shared authority certificate.
    pub ca_cert: PathBuf,

    /// Own certificate (chain).
    pub cert: PathBuf,

    /// Own private key.
    pub key: PathBuf,
}

impl CredentialPaths {
    pub fn server_defaults() -> Self {
        CredentialPaths {
            ca_cert: "certs/ca-cert.pem".into(),
            cert: "certs/server-cert.pem".into(),
            key: "certs/server-key.pem".into(),
        }
    }

    pub fn client_defaults() -> Self {
        CredentialPaths {
            ca_cert: "certs/ca-cert.pem".into(),
            cert: "certs/client-cert.pem".into(),
            key: "certs/client-key.pem".into(),
        }
    }
}

// =============================================================================
// Server Settings
// =============================================================================

/// Vending server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Interface to listen on.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// TLS port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Seconds a peer gets to finish the TLS handshake.
    #[serde(default = "default_timeout_secs")]
    pub handshake_timeout_secs: u64,

    #[serde(default = "CredentialPaths::server_defaults")]
    pub credentials: CredentialPaths,

    /// Unit prices; replaces the built-in table entirely when given.
    #[serde(default)]
    pub prices: PriceTable,
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            bind_addr: default_bind_addr(),
            port: default_port(),
            handshake_timeout_secs: default_timeout_secs(),
            credentials: CredentialPaths::server_defaults(),
            prices: PriceTable::default(),
        }
    }
}

impl ServerSettings {
    /// Returns the full bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.bind_addr.trim().is_empty() {
            return Err(invalid("server.bind_addr", "must not be empty"));
        }

        if self.handshake_timeout_secs == 0 {
            return Err(invalid("server.handshake_timeout_secs", "must be greater than 0"));
        }

        if self.prices.is_empty() {
            return Err(invalid("server.prices", "must list at least one candy"));
        }

        Ok(())
    }
}

// =============================================================================
// Client Settings
// =============================================================================

/// Purchase client settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSettings {
    /// `host:port` of the vending server.
    #[serde(default = "default_server_addr")]
    pub server_addr: String,

    /// Seconds allowed for TCP connect plus TLS handshake.
    #[serde(default = "default_timeout_secs")]
    pub connect_timeout_secs: u64,

    #[serde(default = "CredentialPaths::client_defaults")]
    pub credentials: CredentialPaths,
}

fn default_server_addr() -> String {
    format!("localhost:{}", DEFAULT_PORT)
}

impl Default for ClientSettings {
    fn default() -> Self {
        ClientSettings {
            server_addr: default_server_addr(),
            connect_timeout_secs: default_timeout_secs(),
            credentials: CredentialPaths::client_defaults(),
        }
    }
}

impl ClientSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.connect_timeout_secs == 0 {
            return Err(invalid("client.connect_timeout_secs", "must be greater than 0"));
        }

        crate::identity::ServerAddress::parse(&self.server_addr)
            .map_err(|e| invalid("client.server_addr", &e.to_string()))?;

        Ok(())
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete configuration; each binary reads its own half.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandyConfig {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub client: ClientSettings,
}

impl CandyConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (explicit path, or `candy.toml` in the config dir)
    /// 3. Environment variables
    ///
    /// An explicit path that does not exist is an error; a missing default
    /// file is not.
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let config = Self::read(config_path)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads only the server half and validates it.
    pub fn load_server(config_path: Option<PathBuf>) -> ConfigResult<ServerSettings> {
        let settings = Self::read(config_path)?.server;
        settings.validate()?;
        Ok(settings)
    }

    /// Layers defaults, file and environment without validating.
    ///
    /// Callers that override fields afterwards validate the half they use.
    pub fn read(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = match config_path {
            Some(path) => Self::from_file(&path)?,
            None => match Self::default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                Some(path) => {
                    debug!(?path, "Config file not found, using defaults");
                    Self::default()
                }
                None => Self::default(),
            },
        };

        config.apply_env_overrides()?;
        Ok(config)
    }

    fn from_file(path: &PathBuf) -> ConfigResult<Self> {
        info!(?path, "Loading config from file");
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        Self::from_toml(&contents)
    }

    /// Parses a TOML document; absent sections keep their defaults.
    pub fn from_toml(contents: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Validates both halves.
    pub fn validate(&self) -> ConfigResult<()> {
        self.server.validate()?;
        self.client.validate()
    }

    /// Applies `CANDY_*` environment overrides.
    pub fn apply_env_overrides(&mut self) -> ConfigResult<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Applies `CANDY_*` overrides read through `lookup`. Unparseable
    /// numeric overrides are errors.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("CANDY_BIND_ADDR") {
            self.server.bind_addr = addr;
        }

        if let Some(port) = lookup("CANDY_PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| invalid("CANDY_PORT", &format!("'{}' is not a port", port)))?;
            debug!(port = self.server.port, "Overriding port from environment");
        }

        if let Some(secs) = lookup("CANDY_HANDSHAKE_TIMEOUT_SECS") {
            self.server.handshake_timeout_secs = secs.parse().map_err(|_| {
                invalid("CANDY_HANDSHAKE_TIMEOUT_SECS", &format!("'{}' is not a number", secs))
            })?;
        }

        if let Some(addr) = lookup("CANDY_SERVER_ADDR") {
            debug!(addr = %addr, "Overriding server address from environment");
            self.client.server_addr = addr;
        }

        if let Some(path) = lookup("CANDY_CA_CERT") {
            self.server.credentials.ca_cert = path.clone().into();
            self.client.credentials.ca_cert = path.into();
        }

        let paths = [
            ("CANDY_SERVER_CERT", &mut self.server.credentials.cert),
            ("CANDY_SERVER_KEY", &mut self.server.credentials.key),
            ("CANDY_CLIENT_CERT", &mut self.client.credentials.cert),
            ("CANDY_CLIENT_KEY", &mut self.client.credentials.key),
        ];
        for (key, slot) in paths {
            if let Some(path) = lookup(key) {
                *slot = path.into();
            }
        }

        Ok(())
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "candy", "shop")
            .map(|dirs| dirs.config_dir().join("candy.toml"))
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = CandyConfig::default();
        assert_eq!(config.server.bind_address(), "0.0.0.0:8443");
        assert_eq!(config.client.server_addr, "localhost:8443");
        assert_eq!(config.server.prices, PriceTable::default());
        assert_eq!(
            config.client.credentials.cert,
            PathBuf::from("certs/client-cert.pem")
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = CandyConfig::from_toml(
            r#"
            [server]
            port = 9443

            [server.prices]
            GUM = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9443);
        assert_eq!(config.server.bind_addr, "0.0.0.0");
        assert_eq!(config.server.prices.unit_price("GUM"), Some(3));
        assert_eq!(config.server.prices.unit_price("CE"), None);
        assert_eq!(config.client, ClientSettings::default());
    }

    #[test]
    fn test_toml_rejects_bad_price() {
        let err = CandyConfig::from_toml("[server.prices]\nCE = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("CANDY_PORT", "9000"),
            ("CANDY_SERVER_ADDR", "127.0.0.1:9000"),
            ("CANDY_CA_CERT", "/etc/candy/ca.pem"),
            ("CANDY_CLIENT_KEY", "/etc/candy/client.key"),
        ]
        .into_iter()
        .collect();

        let mut config = CandyConfig::default();
        config
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.client.server_addr, "127.0.0.1:9000");
        assert_eq!(config.server.credentials.ca_cert, PathBuf::from("/etc/candy/ca.pem"));
        assert_eq!(config.client.credentials.ca_cert, PathBuf::from("/etc/candy/ca.pem"));
        assert_eq!(config.client.credentials.key, PathBuf::from("/etc/candy/client.key"));
        assert_eq!(
            config.server.credentials.key,
            PathBuf::from("certs/server-key.pem")
        );
    }

    #[test]
    fn test_bad_port_override_fails() {
        let mut config = CandyConfig::default();
        let err = config
            .apply_overrides(|key| (key == "CANDY_PORT").then(|| "eighty".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_validation() {
        let mut config = CandyConfig::default();
        config.server.handshake_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = CandyConfig::default();
        config.client.server_addr = "no-port-here".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_each_role_validates_only_its_half() {
        let mut config = CandyConfig::default();
        config.server.handshake_timeout_secs = 0;
        config.server.bind_addr = String::new();
        assert!(config.client.validate().is_ok());
        assert!(config.server.validate().is_err());

        let mut config = CandyConfig::default();
        config.client.server_addr = "no-port-here".to_string();
        assert!(config.server.validate().is_ok());
        assert!(config.client.validate().is_err());
    }

    #[test]
    fn test_read_skips_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("candy.toml");
        std::fs::write(&path, "[server]
handshake_timeout_secs = 0
").unwrap();

        let config = CandyConfig::read(Some(path.clone())).unwrap();
        assert!(config.client.validate().is_ok());
        assert!(matches!(
            CandyConfig::load_server(Some(path)).unwrap_err(),
            ConfigError::InvalidValue { .. }
        ));
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let err = CandyConfig::load(Some("/nonexistent/candy.toml".into())).unwrap_err();
        assert!(matches!(err, ConfigError::Unreadable { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("candy.toml");
        std::fs::write(&path, "[client]\nconnect_timeout_secs = 3\n").unwrap();

        let config = CandyConfig::load(Some(path)).unwrap();
        assert_eq!(config.client.connect_timeout(), Duration::from_secs(3));
    }
}
