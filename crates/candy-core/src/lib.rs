//! # candy-core: Pure Business Logic for the Candy Shop
//!
//! This crate decides every purchase. It knows nothing about sockets or
//! certificates; the network layer hands it an [`Order`] and gets back a
//! [`TransactionOutcome`].
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Candy Shop Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            candy-client  ──── mutual TLS ────  candy-server     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ JSON bytes                             │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ candy-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   codec   │  │  pricing  │  │ processor │  │pleasantry │  │   │
//! │  │   │ WireOrder │  │PriceTable │  │ validate  │  │  CowSay   │  │   │
//! │  │   │WireOutcome│  │           │  │ price     │  │  Plain    │  │   │
//! │  │   └───────────┘  └───────────┘  │ decide    │  └───────────┘  │   │
//! │  │                                 └───────────┘                  │   │
//! │  │   NO I/O • NO NETWORK • DETERMINISTIC                          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Order, TransactionOutcome, processing stages
//! - [`pricing`] - Immutable price table
//! - [`validation`] - Order field rules
//! - [`processor`] - The validate → price → decide state machine
//! - [`pleasantry`] - Pluggable "thank you" message producer
//! - [`codec`] - JSON wire format for orders and outcomes
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use candy_core::{Order, PriceTable, TransactionOutcome, TransactionProcessor};
//! use candy_core::pleasantry::Plain;
//!
//! let processor = TransactionProcessor::new(PriceTable::default(), Arc::new(Plain));
//! let outcome = processor.process(&Order::new(50, "CE", 3));
//!
//! assert_eq!(
//!     outcome,
//!     TransactionOutcome::Accepted { pleasantry: "Thank you!".into(), change: 20 }
//! );
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod codec;
pub mod error;
pub mod pleasantry;
pub mod pricing;
pub mod processor;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{DecodeError, PriceTableError, ValidationError};
pub use pleasantry::Pleasantry;
pub use pricing::PriceTable;
pub use processor::TransactionProcessor;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Rejection reason for a missing kind or a non-positive count or amount.
pub const INVALID_ORDER_REASON: &str = "Invalid type or count of candy";

/// Rejection reason for a kind that is not on the price table.
pub const UNKNOWN_KIND_REASON: &str = "Invalid candy type";

/// Text handed to the pleasantry producer on every accepted purchase.
pub const THANK_YOU_TEXT: &str = "Thank you!";
