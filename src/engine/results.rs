// 8.0.2: result types and errors for engine operations.

use crate::account::AccountError;
use crate::candle::CandleError;
use crate::config::ConfigError;
use crate::events::{DiscardReason, Event};
use crate::order::{Order, OrderStatus, TransitionError};
use crate::placement::PlacementError;
use crate::state::SystemState;
use crate::strategy::StrategyError;
use crate::types::{ContractId, OrderId, Timestamp};

/// New state plus everything that happened while producing it.
#[derive(Debug, Clone)]
pub struct TickOutcome {
    pub state: SystemState,
    pub events: Vec<Event>,
    pub accepted: Option<OrderId>,
    pub placed: Option<OrderId>,
}

/// What happened to a candidate offered to the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Accepted(OrderId),
    Discarded { candidate: Order, reason: DiscardReason },
}

impl Admission {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Admission::Accepted(_))
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    #[error("Candle at {received} arrived after {last} for {contract}")]
    OutOfOrderCandle {
        contract: ContractId,
        last: Timestamp,
        received: Timestamp,
    },

    #[error("Invalid candle: {0}")]
    InvalidCandle(#[from] CandleError),

    #[error("Order {order:?} cannot move from {from} to {to}")]
    IllegalTransition {
        order: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    },

    #[error("Contract {0} not found")]
    UnknownContract(ContractId),

    #[error("Account error: {0}")]
    Account(#[from] AccountError),

    #[error("Strategy error: {0}")]
    Strategy(#[from] StrategyError),

    #[error("Placement error: {0}")]
    Placement(#[from] PlacementError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl From<TransitionError> for EngineError {
    fn from(err: TransitionError) -> Self {
        EngineError::IllegalTransition {
            order: err.order_id,
            from: err.from,
            to: err.to,
        }
    }
}
