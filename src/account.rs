//! Account collaborator.
//!
//! Fills, exits and cancellations are decided outside the core, by whatever
//! knows the broker or replays history. The engine hands it the active order
//! once per candle and stores whatever comes back, provided the status change
//! is a legal transition.

use crate::candle::Candle;
use crate::order::Order;
use crate::types::OrderId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccountError {
    #[error("Broker unavailable: {0}")]
    Unavailable(String),

    #[error("Order {order_id:?} rejected: {reason}")]
    Rejected { order_id: OrderId, reason: String },

    #[error("Order {0:?} unknown to the account")]
    UnknownOrder(OrderId),
}

pub trait Account: Send + Sync {
    /// Next version of `order` after `candle`. Returning it unchanged is fine.
    fn advance(&self, order: &Order, candle: &Candle) -> Result<Order, AccountError>;

    /// Whether the given closed orders add up to a profit.
    fn is_profitable(&self, orders: &[&Order]) -> bool;
}

/// Leaves every order as it is and never reports a profit. For zone-only runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassiveAccount;

impl Account for PassiveAccount {
    fn advance(&self, order: &Order, _candle: &Candle) -> Result<Order, AccountError> {
        Ok(order.clone())
    }

    fn is_profitable(&self, _orders: &[&Order]) -> bool {
        false
    }
}
