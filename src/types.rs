// 1.0: primitives shared by every stage of the tick pipeline.
// prices, timestamps, ids, trade direction. newtypes so the compiler catches mixups.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

// contract symbol, e.g. "ESZ5". state and the single-order rule are scoped per contract.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContractId(pub String);

impl ContractId {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self(symbol.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrderId(pub u64);

impl OrderId {
    // candidates carry this until the ledger admits them
    pub const UNASSIGNED: OrderId = OrderId(0);

    pub fn is_assigned(&self) -> bool {
        self.0 != 0
    }
}

// Long = profit when price goes up. Short = profit when price goes down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderType {
    Long,
    Short,
}

impl OrderType {
    pub fn sign(&self) -> Decimal {
        match self {
            OrderType::Long => Decimal::ONE,
            OrderType::Short => Decimal::NEGATIVE_ONE,
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            OrderType::Long => OrderType::Short,
            OrderType::Short => OrderType::Long,
        }
    }
}

// 1.1: price in quote currency. must be positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Price(Decimal);

impl Price {
    #[must_use]
    pub fn new(value: Decimal) -> Option<Self> {
        if value > Decimal::ZERO {
            Some(Self(value))
        } else {
            None
        }
    }

    pub fn new_unchecked(value: Decimal) -> Self {
        debug_assert!(value > Decimal::ZERO);
        Self(value)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    // absolute distance, always >= 0
    pub fn distance(&self, other: Price) -> Decimal {
        (self.0 - other.0).abs()
    }

    // shifts by a signed offset. None if the result would not be a valid price.
    pub fn offset(&self, delta: Decimal) -> Option<Price> {
        Price::new(self.0 + delta)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// 1.2: millisecond timestamp. candle timestamps are strictly increasing per contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now().timestamp_millis())
    }

    pub fn from_millis(ms: i64) -> Self {
        Self(ms)
    }

    pub fn as_millis(&self) -> i64 {
        self.0
    }

    pub fn plus_millis(&self, ms: i64) -> Self {
        Self(self.0 + ms)
    }

    // milliseconds from `earlier` to self. negative if `earlier` is in the future.
    pub fn millis_since(&self, earlier: Timestamp) -> i64 {
        self.0 - earlier.0
    }

    /// UTC calendar date. orders are grouped per trading day for profit checks.
    pub fn trading_day(&self) -> NaiveDate {
        DateTime::<Utc>::from_timestamp_millis(self.0)
            .map(|dt| dt.date_naive())
            .unwrap_or(NaiveDate::MIN)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}
