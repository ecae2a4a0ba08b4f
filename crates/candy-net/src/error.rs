//! # Network Error Types
//!
//! Error types for credential loading, channel establishment and transport.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Network Error Categories                          │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Startup-fatal  │  │ Per connection  │  │     Per request         │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │ CredentialError │  │  TrustError     │  │  TransportError         │ │
//! │  │ ConfigError     │  │  UntrustedPeer  │  │  DecodeError (core)     │ │
//! │  │                 │  │  Unreachable    │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ClientError = Credential | Trust | Transport | Decode                 │
//! │                                                                         │
//! │  Server side: per-connection errors are logged and the connection is   │
//! │  dropped. Nothing here ever takes the server process down.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use thiserror::Error;

use candy_core::DecodeError;

// =============================================================================
// Credential Errors
// =============================================================================

/// Certificate or key material could not be loaded. Fatal at startup.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// File could not be read.
    #[error("Cannot read {path}: {reason}")]
    Unreadable { path: PathBuf, reason: String },

    /// PEM input holds no certificate.
    #[error("No certificate found in {source_name}")]
    NoCertificates { source_name: String },

    /// PEM input holds no private key.
    #[error("No private key found in {source_name}")]
    NoPrivateKey { source_name: String },

    /// PEM input is syntactically broken.
    #[error("Malformed PEM in {source_name}: {reason}")]
    Malformed { source_name: String, reason: String },

    /// The TLS library refused the material (bad key, unusable authority).
    #[error("Credentials rejected: {0}")]
    Rejected(String),
}

pub type CredentialResult<T> = Result<T, CredentialError>;

// =============================================================================
// Trust Errors
// =============================================================================

/// A mutually trusted channel could not be established.
#[derive(Debug, Error)]
pub enum TrustError {
    /// Peer certificate does not chain to the trusted authority, or the peer
    /// refused ours.
    #[error("untrusted peer: {0}")]
    UntrustedPeer(String),

    /// TCP connection could not be made.
    #[error("unreachable: {0}")]
    Unreachable(String),

    /// Server address has no usable host name.
    #[error("invalid server address: {0}")]
    InvalidServerName(String),
}

impl TrustError {
    /// Short category used in user-facing output.
    pub fn reason(&self) -> &'static str {
        match self {
            TrustError::UntrustedPeer(_) => "untrusted peer",
            TrustError::Unreachable(_) => "unreachable",
            TrustError::InvalidServerName(_) => "invalid server address",
        }
    }
}

// =============================================================================
// Transport Errors
// =============================================================================

/// Failure moving bytes once the channel exists.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Listener could not bind.
    #[error("Failed to bind to {addr}: {reason}")]
    Bind { addr: String, reason: String },

    /// HTTP framing failed (connection closed mid-request, bad response).
    #[error("HTTP error: {0}")]
    Http(String),

    /// Server answered with a status and a body that is not an outcome.
    #[error("Server responded {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    /// Operation did not finish in time.
    #[error("Timed out after {0} seconds")]
    Timeout(u64),
}

pub type TransportResult<T> = Result<T, TransportError>;

// =============================================================================
// Config Errors
// =============================================================================

/// Configuration could not be loaded or is invalid. Fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {reason}")]
    Unreadable { path: PathBuf, reason: String },

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Client Errors
// =============================================================================

/// Everything that can stop a purchase from producing an outcome.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    Trust(#[from] TrustError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Invalid response: {0}")]
    Decode(#[from] DecodeError),
}

pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trust_reason() {
        assert_eq!(
            TrustError::UntrustedPeer("UnknownIssuer".into()).reason(),
            "untrusted peer"
        );
        assert_eq!(
            TrustError::Unreachable("connection refused".into()).reason(),
            "unreachable"
        );
    }

    #[test]
    fn test_error_display() {
        let err = TransportError::UnexpectedStatus {
            status: 405,
            body: "Method Not Allowed".into(),
        };
        assert_eq!(err.to_string(), "Server responded 405: Method Not Allowed");

        let err: ClientError = TrustError::UntrustedPeer("bad certificate".into()).into();
        assert_eq!(err.to_string(), "untrusted peer: bad certificate");
    }
}
