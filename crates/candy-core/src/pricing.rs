//! # Price Table
//!
//! Fixed mapping from item code to unit price.
//!
//! The table is built once at server startup and handed to the
//! [`TransactionProcessor`](crate::TransactionProcessor). Nothing mutates it
//! afterwards, so concurrent transactions read it without locking.
//!
//! ## Default Table
//! ```text
//! ┌──────┬────────────┐
//! │ Code │ Unit price │
//! ├──────┼────────────┤
//! │  CE  │     10     │
//! │  AA  │     15     │
//! │  NT  │     17     │
//! │  DE  │     21     │
//! │  YR  │     23     │
//! └──────┴────────────┘
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::PriceTableError;

/// Built-in prices used when configuration does not provide a table.
pub const DEFAULT_PRICES: [(&str, i64); 5] = [
    ("CE", 10),
    ("AA", 15),
    ("NT", 17),
    ("DE", 21),
    ("YR", 23),
];

/// Immutable item code → unit price mapping.
///
/// Serializes as a flat TOML/JSON table (`CE = 10`). Lookups are exact and
/// case-sensitive: `"ce"` is not `"CE"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, i64>", into = "BTreeMap<String, i64>")]
pub struct PriceTable {
    prices: BTreeMap<String, i64>,
}

impl PriceTable {
    /// Builds a table, rejecting empty codes and non-positive prices.
    ///
    /// ## Example
    /// ```rust
    /// use candy_core::PriceTable;
    ///
    /// let table = PriceTable::new([("GUM", 3)]).unwrap();
    /// assert_eq!(table.unit_price("GUM"), Some(3));
    ///
    /// assert!(PriceTable::new([("GUM", 0)]).is_err());
    /// ```
    pub fn new<I, K>(entries: I) -> Result<Self, PriceTableError>
    where
        I: IntoIterator<Item = (K, i64)>,
        K: Into<String>,
    {
        let mut prices = BTreeMap::new();
        for (kind, price) in entries {
            let kind = kind.into();
            if kind.trim().is_empty() {
                return Err(PriceTableError::EmptyKind);
            }
            if price <= 0 {
                return Err(PriceTableError::NonPositivePrice { kind, price });
            }
            prices.insert(kind, price);
        }
        Ok(PriceTable { prices })
    }

    /// Unit price for `kind`, or `None` if the shop does not sell it.
    pub fn unit_price(&self, kind: &str) -> Option<i64> {
        self.prices.get(kind).copied()
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// Iterates entries in code order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.prices.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl Default for PriceTable {
    fn default() -> Self {
        PriceTable {
            prices: DEFAULT_PRICES
                .iter()
                .map(|(kind, price)| (kind.to_string(), *price))
                .collect(),
        }
    }
}

impl TryFrom<BTreeMap<String, i64>> for PriceTable {
    type Error = PriceTableError;

    fn try_from(map: BTreeMap<String, i64>) -> Result<Self, Self::Error> {
        PriceTable::new(map)
    }
}

impl From<PriceTable> for BTreeMap<String, i64> {
    fn from(table: PriceTable) -> Self {
        table.prices
    }
}
