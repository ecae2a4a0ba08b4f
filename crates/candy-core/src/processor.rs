//! # Transaction Processor
//!
//! Decides one order. Single step, synchronous, deterministic given the
//! price table, the order and the pleasantry producer.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Order Processing                                     │
//! │                                                                         │
//! │  Received                                                               │
//! │     │  kind non-empty, quantity > 0, funds > 0 ?                        │
//! │     ├── no ──► Rejected("Invalid type or count of candy")               │
//! │     ▼                                                                   │
//! │  Validated                                                              │
//! │     │  kind on the price table ?                                        │
//! │     ├── no ──► Rejected("Invalid candy type")                           │
//! │     ▼                                                                   │
//! │  Priced        total = unit_price × quantity                            │
//! │     │  funds >= total ?                                                 │
//! │     ├── no ──► InsufficientFunds { shortfall = total - funds }          │
//! │     ▼                                                                   │
//! │  Decided ──► Accepted { pleasantry, change = funds - total }            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Counts are validated before the price lookup, so an order for zero
//! pieces of an unknown kind is rejected for its count, not its kind.

use std::sync::Arc;

use tracing::debug;

use crate::pleasantry::Pleasantry;
use crate::pricing::PriceTable;
use crate::types::{Order, TransactionOutcome, TransactionStage};
use crate::validation::validate_order;
use crate::{INVALID_ORDER_REASON, THANK_YOU_TEXT, UNKNOWN_KIND_REASON};

/// Evaluates orders against an injected price table.
///
/// Cheap to clone; clones share the table and the pleasantry producer.
#[derive(Clone)]
pub struct TransactionProcessor {
    prices: Arc<PriceTable>,
    pleasantry: Arc<dyn Pleasantry>,
}

impl std::fmt::Debug for TransactionProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionProcessor")
            .field("prices", &self.prices)
            .finish_non_exhaustive()
    }
}

impl TransactionProcessor {
    pub fn new(prices: PriceTable, pleasantry: Arc<dyn Pleasantry>) -> Self {
        TransactionProcessor {
            prices: Arc::new(prices),
            pleasantry,
        }
    }

    pub fn prices(&self) -> &PriceTable {
        &self.prices
    }

    /// Runs an order through every stage and returns the final outcome.
    ///
    /// ## Example
    /// ```rust
    /// use std::sync::Arc;
    /// use candy_core::{Order, PriceTable, TransactionOutcome, TransactionProcessor};
    /// use candy_core::pleasantry::Plain;
    ///
    /// let processor = TransactionProcessor::new(PriceTable::default(), Arc::new(Plain));
    ///
    /// let outcome = processor.process(&Order::new(20, "AA", 2));
    /// assert_eq!(outcome, TransactionOutcome::InsufficientFunds { shortfall: 10 });
    /// ```
    pub fn process(&self, order: &Order) -> TransactionOutcome {
        if let Err(e) = validate_order(order) {
            debug!(stage = %TransactionStage::Received, reason = %e, "Order failed validation");
            return TransactionOutcome::rejected(INVALID_ORDER_REASON);
        }

        let Some(unit_price) = self.prices.unit_price(&order.kind) else {
            debug!(stage = %TransactionStage::Validated, kind = %order.kind, "Unknown candy kind");
            return TransactionOutcome::rejected(UNKNOWN_KIND_REASON);
        };

        let Some(total) = unit_price.checked_mul(order.quantity) else {
            debug!(
                stage = %TransactionStage::Validated,
                unit_price,
                quantity = order.quantity,
                "Order total overflows"
            );
            return TransactionOutcome::rejected(INVALID_ORDER_REASON);
        };

        debug!(stage = %TransactionStage::Priced, unit_price, total, "Order priced");

        let outcome = if order.funds < total {
            TransactionOutcome::InsufficientFunds {
                shortfall: total - order.funds,
            }
        } else {
            TransactionOutcome::Accepted {
                pleasantry: self.pleasantry.produce(THANK_YOU_TEXT),
                change: order.funds - total,
            }
        };

        debug!(stage = %TransactionStage::Decided, outcome = outcome.kind_name(), "Order decided");
        outcome
    }
}
