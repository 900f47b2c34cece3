//! Orders and the order ledger.
//!
//! An order moves through `Candidate -> Planned -> Placed -> Filled -> Profit | Loss`,
//! with `PlaceNow` as the fast path for entries that go straight to market and
//! `Cancelled` reachable from any non-filled state. The ledger holds the
//! history plus a single active slot, so a second active order cannot exist.

use crate::types::{ContractId, OrderId, OrderType, Price, Timestamp};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Proposed by a strategy, not yet admitted.
    Candidate,
    /// Admitted, waiting for its placement predicate.
    Planned,
    /// Admitted, to be placed on the next placement check without a predicate.
    PlaceNow,
    /// Working at the broker.
    Placed,
    /// Entry filled, position open.
    Filled,
    Profit,
    Loss,
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Profit | OrderStatus::Loss | OrderStatus::Cancelled)
    }

    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Admitted but not yet sent to the broker.
    pub fn is_pending(&self) -> bool {
        matches!(self, OrderStatus::Planned | OrderStatus::PlaceNow)
    }

    /// Working or filled at the broker.
    pub fn is_live(&self) -> bool {
        matches!(self, OrderStatus::Placed | OrderStatus::Filled)
    }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Candidate, Planned)
                | (Candidate, PlaceNow)
                | (Candidate, Cancelled)
                | (Planned, Placed)
                | (Planned, Cancelled)
                | (PlaceNow, Placed)
                | (PlaceNow, Filled)
                | (PlaceNow, Cancelled)
                | (Placed, Filled)
                | (Placed, Cancelled)
                | (Filled, Profit)
                | (Filled, Loss)
        )
    }

    /// Moves the account collaborator may make on its own. Placement stays
    /// with the coordinator.
    pub fn can_advance_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Planned, Cancelled)
                | (PlaceNow, Cancelled)
                | (Placed, Filled)
                | (Placed, Cancelled)
                | (Filled, Profit)
                | (Filled, Loss)
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Which strategy produced an order, with that strategy's parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryType {
    /// Limit entry at the edge of a plan zone.
    ZoneRetest { zone_start: Timestamp },
    /// Entry once price closes through the level of a broken swing.
    Breakout { swing_time: Timestamp },
    /// Immediate market entry.
    Market,
    /// Counter-trend entry scored by the proposing strategy.
    Reversal { strength: u32 },
}

impl EntryType {
    pub fn kind(&self) -> EntryKind {
        match self {
            EntryType::ZoneRetest { .. } => EntryKind::ZoneRetest,
            EntryType::Breakout { .. } => EntryKind::Breakout,
            EntryType::Market => EntryKind::Market,
            EntryType::Reversal { .. } => EntryKind::Reversal,
        }
    }
}

/// Parameter-free tag of an [`EntryType`], used as the placement predicate key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntryKind {
    ZoneRetest,
    Breakout,
    Market,
    Reversal,
}

impl EntryKind {
    pub const ALL: [EntryKind; 4] = [
        EntryKind::ZoneRetest,
        EntryKind::Breakout,
        EntryKind::Market,
        EntryKind::Reversal,
    ];

    /// Status an admitted candidate of this kind starts in.
    pub fn admitted_status(&self) -> OrderStatus {
        match self {
            EntryKind::Market => OrderStatus::PlaceNow,
            _ => OrderStatus::Planned,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CancelReason {
    /// Pending order never triggered before the session ended.
    Expired,
    /// Stop side traded before the entry filled.
    Invalidated,
    /// Rejected by the broker.
    Rejected,
    /// Pulled by the account manually.
    Manual,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub contract: ContractId,
    pub order_type: OrderType,
    pub entry_type: EntryType,
    pub status: OrderStatus,
    /// Lower bound of the risk zone.
    pub low: Price,
    /// Upper bound of the risk zone.
    pub high: Price,
    /// Creation time.
    pub timestamp: Timestamp,
    pub placed_timestamp: Option<Timestamp>,
    pub filled_timestamp: Option<Timestamp>,
    pub close_timestamp: Option<Timestamp>,
    pub profit_multiplier: Option<Decimal>,
    pub risk_multiplier: Option<Decimal>,
    /// Largest reward in points, regardless of the multiplier.
    pub profit_cap: Option<Decimal>,
    pub cancel_reason: Option<CancelReason>,
    pub account_id: Option<String>,
    /// Free-form context from the proposing strategy.
    pub entry_reason: Option<String>,
}

impl Order {
    pub fn candidate(
        contract: ContractId,
        order_type: OrderType,
        entry_type: EntryType,
        low: Price,
        high: Price,
        timestamp: Timestamp,
    ) -> Self {
        debug_assert!(low <= high);
        Self {
            id: OrderId::UNASSIGNED,
            contract,
            order_type,
            entry_type,
            status: OrderStatus::Candidate,
            low,
            high,
            timestamp,
            placed_timestamp: None,
            filled_timestamp: None,
            close_timestamp: None,
            profit_multiplier: None,
            risk_multiplier: None,
            profit_cap: None,
            cancel_reason: None,
            account_id: None,
            entry_reason: None,
        }
    }

    /// Asks for the `PlaceNow` fast path on admission whatever the entry kind.
    pub fn place_now(mut self) -> Self {
        self.status = OrderStatus::PlaceNow;
        self
    }

    /// Asks for `Planned` on admission, so the entry kind's predicate decides placement.
    pub fn planned(mut self) -> Self {
        self.status = OrderStatus::Planned;
        self
    }

    pub fn with_profit_multiplier(mut self, multiplier: Decimal) -> Self {
        self.profit_multiplier = Some(multiplier);
        self
    }

    pub fn with_risk_multiplier(mut self, multiplier: Decimal) -> Self {
        self.risk_multiplier = Some(multiplier);
        self
    }

    pub fn with_profit_cap(mut self, cap: Decimal) -> Self {
        self.profit_cap = Some(cap);
        self
    }

    pub fn with_account(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = Some(account_id.into());
        self
    }

    pub fn with_entry_reason(mut self, reason: impl Into<String>) -> Self {
        self.entry_reason = Some(reason.into());
        self
    }

    pub fn entry_kind(&self) -> EntryKind {
        self.entry_type.kind()
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    pub fn trading_day(&self) -> NaiveDate {
        self.timestamp.trading_day()
    }

    /// Longs enter at the top of the risk zone, shorts at the bottom.
    pub fn entry_price(&self) -> Price {
        match self.order_type {
            OrderType::Long => self.high,
            OrderType::Short => self.low,
        }
    }

    pub fn stop_price(&self) -> Price {
        match self.order_type {
            OrderType::Long => self.low,
            OrderType::Short => self.high,
        }
    }

    /// Points between entry and stop.
    pub fn risk(&self) -> Decimal {
        self.high.value() - self.low.value()
    }

    /// Entry plus risk times the profit multiplier (1 when unset), capped by `profit_cap`.
    pub fn take_profit_price(&self) -> Option<Price> {
        let mut reward = self.risk() * self.profit_multiplier.unwrap_or(Decimal::ONE);
        if let Some(cap) = self.profit_cap {
            reward = reward.min(cap);
        }
        self.entry_price().offset(self.order_type.sign() * reward)
    }

    /// Copy moved to `next`, stamping the matching timestamp field.
    pub fn transitioned(&self, next: OrderStatus, at: Timestamp) -> Result<Order, TransitionError> {
        if !self.status.can_transition_to(next) {
            return Err(TransitionError {
                order_id: self.id,
                from: self.status,
                to: next,
            });
        }

        let mut order = self.clone();
        order.status = next;
        match next {
            OrderStatus::Placed => order.placed_timestamp = Some(at),
            OrderStatus::Filled => {
                order.placed_timestamp.get_or_insert(at);
                order.filled_timestamp = Some(at);
            }
            s if s.is_terminal() => order.close_timestamp = Some(at),
            _ => {}
        }
        Ok(order)
    }

    pub fn cancelled(&self, reason: CancelReason, at: Timestamp) -> Result<Order, TransitionError> {
        let mut order = self.transitioned(OrderStatus::Cancelled, at)?;
        order.cancel_reason = Some(reason);
        Ok(order)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Order {order_id:?} cannot move from {from} to {to}")]
pub struct TransitionError {
    pub order_id: OrderId,
    pub from: OrderStatus,
    pub to: OrderStatus,
}

/// Order history for one contract: closed orders plus at most one active order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLedger {
    closed: Vec<Order>,
    active: Option<Order>,
    next_id: u64,
}

impl OrderLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<&Order> {
        self.active.as_ref()
    }

    pub fn has_active(&self) -> bool {
        self.active.is_some()
    }

    /// Orders that reached a terminal status, oldest first.
    pub fn closed(&self) -> &[Order] {
        &self.closed
    }

    /// All orders in creation order. The active one, if any, is the newest.
    pub fn iter(&self) -> impl Iterator<Item = &Order> {
        self.closed.iter().chain(self.active.iter())
    }

    pub fn len(&self) -> usize {
        self.closed.len() + usize::from(self.active.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Admits `candidate` into the empty active slot, assigning its id and
    /// starting status. A requested `Planned` or `PlaceNow` is kept, anything
    /// else falls back to the entry kind's default. Hands the candidate back
    /// when the slot is taken.
    pub fn admit(&mut self, mut candidate: Order) -> Result<OrderId, Order> {
        if self.active.is_some() {
            return Err(candidate);
        }

        self.next_id += 1;
        let id = OrderId(self.next_id);
        candidate.id = id;
        if !candidate.status.is_pending() {
            candidate.status = candidate.entry_kind().admitted_status();
        }
        self.active = Some(candidate);
        Ok(id)
    }

    /// Stores a new version of the active order. Terminal orders leave the slot.
    pub(crate) fn update_active(&mut self, order: Order) {
        debug_assert_eq!(self.active.as_ref().map(|o| o.id), Some(order.id));
        if order.status.is_terminal() {
            self.active = None;
            self.closed.push(order);
        } else {
            self.active = Some(order);
        }
    }

    /// Most recent close time of a same-kind order that ended in a loss.
    pub fn last_loss_close(&self, kind: EntryKind) -> Option<Timestamp> {
        self.closed
            .iter()
            .rev()
            .filter(|o| o.status == OrderStatus::Loss && o.entry_kind() == kind)
            .find_map(|o| o.close_timestamp)
    }
}
