// 8.2 engine/coordinator.rs: single-active-order admission and placement selection.
// the ledger's one active slot is what keeps a second order out. this type decides
// who gets the slot and when the holder goes to the broker.

use super::results::{Admission, EngineError};
use crate::candle::Candle;
use crate::events::DiscardReason;
use crate::order::{EntryKind, Order, OrderStatus};
use crate::placement::{PlacementError, PlacementParams, PlacementPredicate, PlacementPredicates};
use crate::state::SystemState;
use tracing::{debug, info};

#[derive(Debug, Default)]
pub struct OrderCoordinator {
    predicates: PlacementPredicates,
}

impl OrderCoordinator {
    pub fn new(predicates: PlacementPredicates) -> Self {
        Self { predicates }
    }

    pub fn with_default_predicates(params: &PlacementParams) -> Self {
        Self::new(PlacementPredicates::with_defaults(params))
    }

    pub fn predicates(&self) -> &PlacementPredicates {
        &self.predicates
    }

    pub fn register_predicate(&mut self, kind: EntryKind, predicate: impl PlacementPredicate + 'static) {
        self.predicates.register(kind, predicate);
    }

    pub fn unregister_predicate(&mut self, kind: EntryKind) -> bool {
        self.predicates.unregister(kind)
    }

    /// Puts `candidate` in the active slot if the slot is free and the candidate
    /// belongs to this state's contract. Otherwise hands it back untouched.
    pub fn accept_candidate(&self, state: &mut SystemState, candidate: Order) -> Admission {
        if candidate.contract != *state.contract() {
            debug!(
                "Discarding {:?} candidate for {} offered to {}",
                candidate.entry_kind(),
                candidate.contract,
                state.contract()
            );
            return Admission::Discarded {
                candidate,
                reason: DiscardReason::WrongContract,
            };
        }

        match state.orders_mut().admit(candidate) {
            Ok(id) => {
                info!("Accepted order {:?} for {}", id, state.contract());
                Admission::Accepted(id)
            }
            Err(candidate) => {
                debug!(
                    "Discarding {:?} candidate, {} already has an active order",
                    candidate.entry_kind(),
                    state.contract()
                );
                Admission::Discarded {
                    candidate,
                    reason: DiscardReason::ActiveOrderExists,
                }
            }
        }
    }

    /// The order to send to the broker on this candle, if any. `PlaceNow` goes
    /// unconditionally, `Planned` only once its entry kind's predicate agrees.
    /// Anything already at the broker or beyond is never selected again.
    pub fn find_order_to_place(&self, state: &SystemState, candle: &Candle) -> Result<Option<Order>, PlacementError> {
        let Some(order) = state.active_order() else {
            return Ok(None);
        };

        match order.status {
            OrderStatus::PlaceNow => Ok(Some(order.clone())),
            OrderStatus::Planned => {
                if self.predicates.evaluate(order, state, candle)? {
                    Ok(Some(order.clone()))
                } else {
                    Ok(None)
                }
            }
            _ => Ok(None),
        }
    }

    /// Moves the selected order to `Placed`. Returns the order as it was before.
    pub fn place(&self, state: &mut SystemState, candle: &Candle) -> Result<Option<Order>, EngineError> {
        let Some(order) = self.find_order_to_place(state, candle)? else {
            return Ok(None);
        };

        let placed = order.transitioned(OrderStatus::Placed, candle.timestamp)?;
        info!(
            "Placing order {:?} {:?} @ {} for {}",
            placed.id,
            placed.order_type,
            placed.entry_price(),
            state.contract()
        );
        state.orders_mut().update_active(placed);
        Ok(Some(order))
    }
}
