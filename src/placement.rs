//! Placement predicates.
//!
//! A planned order waits until the predicate registered for its entry kind says
//! the candle is right. Kinds with no registration are always ready. A predicate
//! that fails (as opposed to answering `false`) aborts the tick.

use crate::candle::Candle;
use crate::order::{EntryKind, Order};
use crate::state::SystemState;
use crate::types::OrderType;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlacementError {
    #[error("Placement data unavailable: {0}")]
    Unavailable(String),

    #[error("Predicate for {kind:?} cannot judge order: {reason}")]
    Unsupported { kind: EntryKind, reason: String },
}

pub trait PlacementPredicate: Send + Sync {
    fn is_ready(&self, order: &Order, state: &SystemState, candle: &Candle) -> Result<bool, PlacementError>;
}

impl<F> PlacementPredicate for F
where
    F: Fn(&Order, &SystemState, &Candle) -> Result<bool, PlacementError> + Send + Sync,
{
    fn is_ready(&self, order: &Order, state: &SystemState, candle: &Candle) -> Result<bool, PlacementError> {
        self(order, state, candle)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacementParams {
    /// Contract tick size. Proximity entries fire within one tick of the entry price.
    pub tick_size: Decimal,
    /// After a same-kind loss, proximity entries wait this long.
    pub loss_cooldown_ms: i64,
}

impl Default for PlacementParams {
    fn default() -> Self {
        Self {
            tick_size: Decimal::new(25, 2), // 0.25
            loss_cooldown_ms: 300_000,      // 5 minutes
        }
    }
}

/// Close within one tick of the entry, unless a same-kind order lost recently.
#[derive(Debug, Clone)]
pub struct ProximityPredicate {
    pub tick_size: Decimal,
    pub loss_cooldown_ms: i64,
}

impl ProximityPredicate {
    pub fn new(params: &PlacementParams) -> Self {
        Self {
            tick_size: params.tick_size,
            loss_cooldown_ms: params.loss_cooldown_ms,
        }
    }

    fn in_cooldown(&self, order: &Order, state: &SystemState, candle: &Candle) -> bool {
        state
            .orders()
            .last_loss_close(order.entry_kind())
            .is_some_and(|closed| candle.timestamp.millis_since(closed) < self.loss_cooldown_ms)
    }
}

impl PlacementPredicate for ProximityPredicate {
    fn is_ready(&self, order: &Order, state: &SystemState, candle: &Candle) -> Result<bool, PlacementError> {
        if self.in_cooldown(order, state, candle) {
            return Ok(false);
        }
        Ok(candle.close.distance(order.entry_price()) <= self.tick_size)
    }
}

/// Close strictly beyond the entry in the order's direction.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrossingPredicate;

impl PlacementPredicate for CrossingPredicate {
    fn is_ready(&self, order: &Order, _state: &SystemState, candle: &Candle) -> Result<bool, PlacementError> {
        let entry = order.entry_price();
        Ok(match order.order_type {
            OrderType::Long => candle.close > entry,
            OrderType::Short => candle.close < entry,
        })
    }
}

/// Entry kind -> predicate lookup.
#[derive(Default)]
pub struct PlacementPredicates {
    table: HashMap<EntryKind, Box<dyn PlacementPredicate>>,
}

impl PlacementPredicates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Proximity for zone retests, crossing for breakouts. Market and reversal
    /// entries stay unregistered.
    pub fn with_defaults(params: &PlacementParams) -> Self {
        let mut predicates = Self::new();
        predicates.register(EntryKind::ZoneRetest, ProximityPredicate::new(params));
        predicates.register(EntryKind::Breakout, CrossingPredicate);
        predicates
    }

    /// Registers `predicate` for `kind`, replacing any earlier one.
    pub fn register(&mut self, kind: EntryKind, predicate: impl PlacementPredicate + 'static) {
        self.table.insert(kind, Box::new(predicate));
    }

    pub fn unregister(&mut self, kind: EntryKind) -> bool {
        self.table.remove(&kind).is_some()
    }

    pub fn is_registered(&self, kind: EntryKind) -> bool {
        self.table.contains_key(&kind)
    }

    pub fn evaluate(&self, order: &Order, state: &SystemState, candle: &Candle) -> Result<bool, PlacementError> {
        match self.table.get(&order.entry_kind()) {
            Some(predicate) => predicate.is_ready(order, state, candle),
            None => Ok(true),
        }
    }
}

impl fmt::Debug for PlacementPredicates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.table.keys().collect();
        kinds.sort();
        f.debug_struct("PlacementPredicates").field("registered", &kinds).finish()
    }
}
