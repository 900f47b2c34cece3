//! Shared builders for the integration tests.

#![allow(dead_code)]

use rust_decimal::Decimal;
use structure_core::*;

pub fn p(v: Decimal) -> Price {
    Price::new_unchecked(v)
}

/// Bar at `t` seconds that opens at its close.
pub fn bar(t: i64, high: Decimal, low: Decimal, close: Decimal) -> Candle {
    Candle {
        open: p(close),
        high: p(high),
        low: p(low),
        close: p(close),
        volume: Decimal::from(100),
        timestamp: Timestamp(t * 1_000),
        duration: CandleDuration::OneSecond,
    }
}

/// Bar one point either side of `close`.
pub fn flat(t: i64, close: Decimal) -> Candle {
    bar(t, close + Decimal::ONE, close - Decimal::ONE, close)
}

pub fn zone(zone_type: ZoneType, low: Decimal, high: Decimal, start: i64) -> PlanZone {
    PlanZone::new(zone_type, p(low), p(high), Timestamp(start))
}

pub fn market_long(state: &SystemState) -> Option<Order> {
    let last = state.last_candle()?;
    Some(Order::candidate(
        state.contract().clone(),
        OrderType::Long,
        EntryType::Market,
        last.close.offset(Decimal::from(-2))?,
        last.close,
        last.timestamp,
    ))
}

/// Moves the order to a fixed status at fixed candle times. Profitable once
/// any order closed in profit.
pub struct ScriptedAccount {
    pub steps: Vec<(Timestamp, OrderStatus)>,
}

impl ScriptedAccount {
    pub fn new(steps: &[(i64, OrderStatus)]) -> Self {
        Self {
            steps: steps.iter().map(|(t, s)| (Timestamp(t * 1_000), *s)).collect(),
        }
    }
}

impl Account for ScriptedAccount {
    fn advance(&self, order: &Order, candle: &Candle) -> Result<Order, AccountError> {
        match self.steps.iter().find(|(t, _)| *t == candle.timestamp) {
            Some((_, status)) if order.status.can_transition_to(*status) => order
                .transitioned(*status, candle.timestamp)
                .map_err(|e| AccountError::Rejected {
                    order_id: order.id,
                    reason: e.to_string(),
                }),
            _ => Ok(order.clone()),
        }
    }

    fn is_profitable(&self, orders: &[&Order]) -> bool {
        orders.iter().any(|o| o.status == OrderStatus::Profit)
    }
}

/// Walks every live order forward one step per candle.
pub struct CyclingAccount;

impl Account for CyclingAccount {
    fn advance(&self, order: &Order, candle: &Candle) -> Result<Order, AccountError> {
        let at = candle.timestamp;
        let next = match order.status {
            OrderStatus::Placed => Some(OrderStatus::Filled),
            OrderStatus::Filled if at.as_millis() % 2_000 == 0 => Some(OrderStatus::Profit),
            OrderStatus::Filled => Some(OrderStatus::Loss),
            OrderStatus::Planned if at.as_millis() % 5_000 == 0 => Some(OrderStatus::Cancelled),
            _ => None,
        };
        match next {
            Some(status) => order.transitioned(status, at).map_err(|e| AccountError::Rejected {
                order_id: order.id,
                reason: e.to_string(),
            }),
            None => Ok(order.clone()),
        }
    }

    fn is_profitable(&self, _orders: &[&Order]) -> bool {
        false
    }
}

pub fn config_k(min_confirmations: usize) -> StructureConfig {
    let mut config = StructureConfig::default();
    config.swing.min_confirmations = min_confirmations;
    config
}
