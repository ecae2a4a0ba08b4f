//! # Wire Codec
//!
//! JSON encoding of orders and outcomes.
//!
//! ## Wire Format
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Wire Envelopes                                  │
//! │                                                                         │
//! │  REQUEST (client → server)                                             │
//! │  ─────────────────────────                                             │
//! │  { "money": 50, "candyType": "CE", "candyCount": 3 }                   │
//! │                                                                         │
//! │  RESPONSE (server → client), exactly one of                            │
//! │  ──────────────────────────────────────────                            │
//! │  { "thanks": "...", "change": 20 }          Accepted                   │
//! │  { "error": "You need 10 more money!" }     InsufficientFunds          │
//! │  { "error": "Invalid candy type" }          Rejected                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Numeric Truncation Rule
//! `money` and `candyCount` may arrive as JSON floats. They are truncated
//! toward zero (`50.9 → 50`, `-0.5 → 0`) and saturate at the `i64` range.
//! The decoder only checks structure; a count of `0` decodes fine and is
//! rejected later by the processor.

use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::error::{DecodeError, DecodeResult};
use crate::types::{
    insufficient_funds_reason, parse_insufficient_funds_reason, Order, TransactionOutcome,
};

const FIELD_MONEY: &str = "money";
const FIELD_CANDY_TYPE: &str = "candyType";
const FIELD_CANDY_COUNT: &str = "candyCount";

// =============================================================================
// Orders
// =============================================================================

/// Encodes an order as a flat JSON object.
pub fn encode_order(order: &Order) -> Vec<u8> {
    json!({
        FIELD_MONEY: order.funds,
        FIELD_CANDY_TYPE: order.kind,
        FIELD_CANDY_COUNT: order.quantity,
    })
    .to_string()
    .into_bytes()
}

/// Decodes an order, enforcing presence and JSON types of all three fields.
///
/// ## Example
/// ```rust
/// use candy_core::codec::decode_order;
/// use candy_core::Order;
///
/// let order = decode_order(br#"{"money": 50.7, "candyType": "CE", "candyCount": 3}"#).unwrap();
/// assert_eq!(order, Order::new(50, "CE", 3));
///
/// assert!(decode_order(br#"{"money": 50, "candyType": "CE"}"#).is_err());
/// ```
pub fn decode_order(bytes: &[u8]) -> DecodeResult<Order> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| DecodeError::Malformed(e.to_string()))?;
    let object = value
        .as_object()
        .ok_or_else(|| DecodeError::Malformed("expected a JSON object".to_string()))?;

    let funds = whole_units(object, FIELD_MONEY)?;
    let kind = object
        .get(FIELD_CANDY_TYPE)
        .ok_or(DecodeError::MissingField(FIELD_CANDY_TYPE))?
        .as_str()
        .ok_or(DecodeError::WrongType {
            field: FIELD_CANDY_TYPE,
            expected: "a string",
        })?;
    let quantity = whole_units(object, FIELD_CANDY_COUNT)?;

    Ok(Order::new(funds, kind, quantity))
}

/// Reads a numeric field, truncating floats toward zero.
fn whole_units(object: &Map<String, Value>, field: &'static str) -> DecodeResult<i64> {
    let number = object
        .get(field)
        .ok_or(DecodeError::MissingField(field))?
        .as_number()
        .ok_or(DecodeError::WrongType {
            field,
            expected: "a number",
        })?;

    if let Some(n) = number.as_i64() {
        return Ok(n);
    }
    if number.as_u64().is_some() {
        return Ok(i64::MAX);
    }
    // `as` truncates toward zero and saturates at the integer bounds
    number
        .as_f64()
        .map(|f| f.trunc() as i64)
        .ok_or(DecodeError::WrongType {
            field,
            expected: "a number",
        })
}

// =============================================================================
// Outcomes
// =============================================================================

/// Response envelope as it appears on the wire.
#[derive(Debug, Default, Deserialize)]
struct WireOutcome {
    #[serde(default)]
    thanks: Option<String>,
    #[serde(default)]
    change: Option<i64>,
    #[serde(default)]
    error: Option<String>,
}

/// Encodes an outcome as a flat JSON object.
pub fn encode_outcome(outcome: &TransactionOutcome) -> Vec<u8> {
    let value = match outcome {
        TransactionOutcome::Accepted { pleasantry, change } => {
            json!({ "thanks": pleasantry, "change": change })
        }
        TransactionOutcome::InsufficientFunds { shortfall } => {
            json!({ "error": insufficient_funds_reason(*shortfall) })
        }
        TransactionOutcome::Rejected { reason } => json!({ "error": reason }),
    };
    value.to_string().into_bytes()
}

/// Decodes a response envelope.
///
/// An `error` of the form `"You need N more money!"` with positive `N`
/// becomes [`TransactionOutcome::InsufficientFunds`]; any other `error`
/// becomes [`TransactionOutcome::Rejected`]. A missing `change` on a success
/// means zero.
pub fn decode_outcome(bytes: &[u8]) -> DecodeResult<TransactionOutcome> {
    let wire: WireOutcome =
        serde_json::from_slice(bytes).map_err(|e| DecodeError::Malformed(e.to_string()))?;

    match (wire.thanks, wire.error) {
        (Some(pleasantry), None) => {
            let change = wire.change.unwrap_or(0);
            if change < 0 {
                return Err(DecodeError::WrongType {
                    field: "change",
                    expected: "a non-negative integer",
                });
            }
            Ok(TransactionOutcome::Accepted { pleasantry, change })
        }
        (None, Some(reason)) => Ok(match parse_insufficient_funds_reason(&reason) {
            Some(shortfall) if shortfall > 0 => TransactionOutcome::InsufficientFunds { shortfall },
            _ => TransactionOutcome::Rejected { reason },
        }),
        _ => Err(DecodeError::AmbiguousEnvelope),
    }
}
