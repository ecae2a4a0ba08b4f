//! # Validation Module
//!
//! Field rules an order must satisfy before it is priced.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: candy-client CLI                                             │
//! │  ├── -k / -c / -m present and positive                                 │
//! │  └── Usage line before any connection is opened                        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: codec (decode)                                               │
//! │  └── Structure only: fields present, right JSON types                  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: THIS MODULE                                                  │
//! │  └── kind non-empty, quantity > 0, funds > 0                           │
//! │                                                                         │
//! │  The server never trusts layer 1: a hand-written request skips it.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::types::Order;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validates an item code.
///
/// ## Rules
/// - Must not be empty or whitespace
///
/// ## Example
/// ```rust
/// use candy_core::validation::validate_kind;
///
/// assert!(validate_kind("CE").is_ok());
/// assert!(validate_kind("  ").is_err());
/// ```
pub fn validate_kind(kind: &str) -> ValidationResult<()> {
    if kind.trim().is_empty() {
        return Err(ValidationError::Required { field: "candyType" });
    }

    Ok(())
}

/// Validates a piece count. Must be strictly positive.
pub fn validate_quantity(quantity: i64) -> ValidationResult<()> {
    if quantity <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "candyCount",
            value: quantity,
        });
    }

    Ok(())
}

/// Validates offered funds. Must be strictly positive.
pub fn validate_funds(funds: i64) -> ValidationResult<()> {
    if funds <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "money",
            value: funds,
        });
    }

    Ok(())
}

/// Runs every field rule, stopping at the first failure.
///
/// Counts are checked before the kind so that a non-positive count is
/// reported even when the kind is also bad.
pub fn validate_order(order: &Order) -> ValidationResult<()> {
    validate_quantity(order.quantity)?;
    validate_funds(order.funds)?;
    validate_kind(&order.kind)?;
    Ok(())
}
