//! # Domain Types
//!
//! Core domain types used throughout the candy shop.
//!
//! ## Type Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐        ┌───────────────────────────────────────┐  │
//! │  │     Order       │        │        TransactionOutcome             │  │
//! │  │  ─────────────  │        │  ───────────────────────────────────  │  │
//! │  │  funds   (i64)  │ ─────► │  Accepted { pleasantry, change }      │  │
//! │  │  kind    (code) │        │  InsufficientFunds { shortfall }      │  │
//! │  │  quantity (i64) │        │  Rejected { reason }                  │  │
//! │  └─────────────────┘        └───────────────────────────────────────┘  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Signed Fields
//! An `Order` is whatever arrived on the wire. Counts and amounts are signed:
//! `-3` decodes fine and is rejected by the processor with a business
//! reason, not by the codec.

use std::fmt;

// =============================================================================
// Order
// =============================================================================

/// A client's purchase request: buy `quantity` pieces of `kind` with `funds`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Order {
    /// Whole currency units offered by the client.
    pub funds: i64,

    /// Short item code, e.g. `"CE"`.
    pub kind: String,

    /// Number of pieces requested.
    pub quantity: i64,
}

impl Order {
    pub fn new(funds: i64, kind: impl Into<String>, quantity: i64) -> Self {
        Order {
            funds,
            kind: kind.into(),
            quantity,
        }
    }
}

// =============================================================================
// Transaction Outcome
// =============================================================================

/// The server's final decision for one order.
///
/// Produced exactly once per order and never mutated afterwards. All three
/// variants are successful protocol exchanges; only the first one sells
/// candy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionOutcome {
    /// Purchase completed.
    Accepted { pleasantry: String, change: i64 },

    /// Funds do not cover the total; `shortfall` is always positive.
    InsufficientFunds { shortfall: i64 },

    /// Order failed validation or named an unknown kind.
    Rejected { reason: String },
}

impl TransactionOutcome {
    pub fn rejected(reason: impl Into<String>) -> Self {
        TransactionOutcome::Rejected {
            reason: reason.into(),
        }
    }

    /// Returns true if candy changed hands.
    pub fn is_accepted(&self) -> bool {
        matches!(self, TransactionOutcome::Accepted { .. })
    }

    /// Human-readable failure line, `None` for an accepted purchase.
    pub fn failure_reason(&self) -> Option<String> {
        match self {
            TransactionOutcome::Accepted { .. } => None,
            TransactionOutcome::InsufficientFunds { shortfall } => {
                Some(insufficient_funds_reason(*shortfall))
            }
            TransactionOutcome::Rejected { reason } => Some(reason.clone()),
        }
    }

    /// Short variant name (for logging).
    pub fn kind_name(&self) -> &'static str {
        match self {
            TransactionOutcome::Accepted { .. } => "accepted",
            TransactionOutcome::InsufficientFunds { .. } => "insufficient_funds",
            TransactionOutcome::Rejected { .. } => "rejected",
        }
    }
}

/// Renders the shortfall message shown to a client who paid too little.
pub fn insufficient_funds_reason(shortfall: i64) -> String {
    format!("You need {} more money!", shortfall)
}

/// Inverse of [`insufficient_funds_reason`]; `None` for any other text.
pub fn parse_insufficient_funds_reason(reason: &str) -> Option<i64> {
    reason
        .strip_prefix("You need ")?
        .strip_suffix(" more money!")?
        .parse()
        .ok()
}

// =============================================================================
// Processing Stages
// =============================================================================

/// Stages an order passes through inside the processor.
///
/// ```text
/// Received ──► Validated ──► Priced ──► Decided
///    │             │
///    └─ Rejected ──┴─ Rejected
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStage {
    Received,
    Validated,
    Priced,
    Decided,
}

impl fmt::Display for TransactionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionStage::Received => write!(f, "received"),
            TransactionStage::Validated => write!(f, "validated"),
            TransactionStage::Priced => write!(f, "priced"),
            TransactionStage::Decided => write!(f, "decided"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_reason() {
        let outcome = TransactionOutcome::InsufficientFunds { shortfall: 10 };
        assert_eq!(
            outcome.failure_reason().as_deref(),
            Some("You need 10 more money!")
        );

        let outcome = TransactionOutcome::rejected("Invalid candy type");
        assert_eq!(outcome.failure_reason().as_deref(), Some("Invalid candy type"));

        let outcome = TransactionOutcome::Accepted {
            pleasantry: "Thanks".into(),
            change: 0,
        };
        assert!(outcome.failure_reason().is_none());
        assert!(outcome.is_accepted());
    }

    #[test]
    fn test_parse_insufficient_funds_reason() {
        assert_eq!(parse_insufficient_funds_reason("You need 42 more money!"), Some(42));
        assert_eq!(parse_insufficient_funds_reason("You need lots more money!"), None);
        assert_eq!(parse_insufficient_funds_reason("Invalid candy type"), None);
    }
}
