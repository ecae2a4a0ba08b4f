//! # candy-net: Mutual TLS Transport for the Candy Shop
//!
//! Everything that touches a socket or a certificate. The purchase decision
//! itself lives in `candy-core`; this crate gets orders to it and outcomes
//! back, over channels where both sides have proven who they are.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        candy-net Architecture                           │
//! │                                                                         │
//! │  ┌────────────────┐                                                    │
//! │  │  CredentialSet │  PEM files → rustls client + server configs        │
//! │  └───────┬────────┘                                                    │
//! │          │ Arc, read-only                                               │
//! │          ├──────────────────────────────┐                              │
//! │          ▼                              ▼                               │
//! │  ┌────────────────┐            ┌────────────────┐                      │
//! │  │  Transaction   │            │ VendingServer  │                      │
//! │  │  Client        │            │                │                      │
//! │  │                │  mutual    │                │                      │
//! │  │ establish_     │ ═══TLS═══► │ accept_        │                      │
//! │  │ client_channel │            │ connections    │                      │
//! │  │ POST /buy_candy│            │ axum Router    │                      │
//! │  └────────────────┘            └───────┬────────┘                      │
//! │                                        ▼                                │
//! │                          candy_core::TransactionProcessor               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`config`] - Layered configuration (defaults, TOML, `CANDY_*` env)
//! - [`credentials`] - PEM loading and TLS configuration
//! - [`identity`] - Mutually trusted channel establishment
//! - [`server`] - HTTP router and serve loop
//! - [`client`] - One-shot order submission
//! - [`error`] - Network error taxonomy
//!
//! ## Usage
//!
//! ```no_run
//! use candy_core::{Order, TransactionOutcome};
//! use candy_net::{CandyConfig, TransactionClient};
//!
//! async fn buy() -> Result<TransactionOutcome, Box<dyn std::error::Error>> {
//!     let config = CandyConfig::load(None)?;
//!     let client = TransactionClient::from_settings(&config.client)?;
//!
//!     Ok(client.submit(&Order::new(50, "CE", 3)).await?)
//! }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod identity;
pub mod server;

// =============================================================================
// Re-exports
// =============================================================================

pub use client::{submit, TransactionClient};
pub use config::{CandyConfig, ClientSettings, CredentialPaths, ServerSettings};
pub use credentials::CredentialSet;
pub use error::{
    ClientError, ClientResult, ConfigError, ConfigResult, CredentialError, CredentialResult,
    TransportError, TransportResult, TrustError,
};
pub use identity::{
    accept_connections, establish_client_channel, ClientChannel, Incoming, ServerAddress,
    ServerChannel,
};
pub use server::{ServerHandle, VendingServer};
