//! # Error Types
//!
//! Domain-specific error types for candy-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  candy-core errors (this file)                                         │
//! │  ├── ValidationError  - Order field failed a business rule             │
//! │  ├── DecodeError      - Wire payload is structurally malformed         │
//! │  └── PriceTableError  - Configured price table is unusable             │
//! │                                                                         │
//! │  candy-net errors (separate crate)                                     │
//! │  └── CredentialError, TrustError, TransportError, ConfigError          │
//! │                                                                         │
//! │  Business rejections are NOT errors: they are TransactionOutcome       │
//! │  variants and travel to the client as ordinary responses.              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Validation Error
// =============================================================================

/// Order field validation failures.
///
/// The processor turns every one of these into the same rejection reason;
/// the variants exist so logs can say which rule tripped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: &'static str },

    /// Value must be strictly positive.
    #[error("{field} must be positive, got {value}")]
    MustBePositive { field: &'static str, value: i64 },
}

// =============================================================================
// Decode Error
// =============================================================================

/// Wire payload could not be turned into a typed value.
///
/// ## When This Occurs
/// - Body is not JSON at all
/// - A required field is absent
/// - A field has the wrong JSON type (e.g. `"candyCount": "three"`)
/// - A response carries both `thanks` and `error`, or neither
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Payload is not a JSON object.
    #[error("Malformed payload: {0}")]
    Malformed(String),

    /// A required field is absent.
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// A field is present with the wrong JSON type.
    #[error("Field {field} must be {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },

    /// Response envelope is neither a success nor a failure.
    #[error("Response must carry exactly one of `thanks` or `error`")]
    AmbiguousEnvelope,
}

// =============================================================================
// Price Table Error
// =============================================================================

/// A configured price table violates the table's invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PriceTableError {
    /// Item code is empty.
    #[error("Price table contains an empty item code")]
    EmptyKind,

    /// Unit price is zero or negative.
    #[error("Unit price for {kind} must be positive, got {price}")]
    NonPositivePrice { kind: String, price: i64 },
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Convenience type alias for decode results.
pub type DecodeResult<T> = Result<T, DecodeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ValidationError::MustBePositive {
            field: "candyCount",
            value: 0,
        };
        assert_eq!(err.to_string(), "candyCount must be positive, got 0");

        let err = DecodeError::WrongType {
            field: "money",
            expected: "a number",
        };
        assert_eq!(err.to_string(), "Field money must be a number");
    }

    #[test]
    fn test_price_table_error_message() {
        let err = PriceTableError::NonPositivePrice {
            kind: "CE".to_string(),
            price: -1,
        };
        assert_eq!(err.to_string(), "Unit price for CE must be positive, got -1");
    }
}
