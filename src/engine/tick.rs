// 8.3 engine/tick.rs: the per-candle pipeline.
// candle -> swings -> zone candidate -> reconcile -> zone events, then
// account advance -> strategies -> placement. works on a copy of the caller's
// state so a failing collaborator leaves the original untouched.

use super::core::Engine;
use super::results::{Admission, EngineError, TickOutcome};
use crate::account::AccountError;
use crate::candle::Candle;
use crate::events::{
    diff_zones, CandidateAcceptedEvent, CandidateDiscardedEvent, Event, EventEmitter, EventPayload,
    OrderPlacedEvent, OrderTransitionedEvent, ZoneChange,
};
use crate::order::{Order, OrderStatus};
use crate::state::SystemState;
use crate::types::OrderId;
use tracing::{debug, info, warn};

// working copy of the state plus the events produced so far
struct Tick {
    state: SystemState,
    candle: Candle,
    events: Vec<Event>,
    accepted: Option<OrderId>,
    placed: Option<OrderId>,
}

impl Tick {
    fn emit(&mut self, payload: EventPayload) {
        let id = self.state.next_event_id();
        let event = Event::new(id, self.state.contract().clone(), self.candle.timestamp, payload);
        self.events.push(event);
    }

    fn finish(self) -> TickOutcome {
        TickOutcome {
            state: self.state,
            events: self.events,
            accepted: self.accepted,
            placed: self.placed,
        }
    }
}

impl Engine {
    /// Runs one candle through the pipeline and returns the next state.
    /// `state` is only read; on error the caller keeps it as it was.
    pub fn process_tick(&self, state: &SystemState, candle: Candle) -> Result<TickOutcome, EngineError> {
        candle.validate()?;
        if let Some(last) = state.last_candle() {
            if candle.timestamp <= last.timestamp {
                return Err(EngineError::OutOfOrderCandle {
                    contract: state.contract().clone(),
                    last: last.timestamp,
                    received: candle.timestamp,
                });
            }
        }

        let mut tick = Tick {
            state: state.clone(),
            candle,
            events: Vec::new(),
            accepted: None,
            placed: None,
        };
        tick.state.push_candle(candle, self.config.engine.max_candles);

        self.update_structure(&mut tick);
        self.advance_active_order(&mut tick)?;
        self.poll_strategies(&mut tick)?;
        self.place_order(&mut tick)?;

        Ok(tick.finish())
    }

    /// [`Engine::process_tick`] in place, forwarding events to `sink`.
    /// Returns the number of events emitted.
    pub fn run_tick(
        &self,
        state: &mut SystemState,
        candle: Candle,
        sink: &mut impl EventEmitter,
    ) -> Result<usize, EngineError> {
        let TickOutcome { state: next, events, .. } = self.process_tick(state, candle)?;
        *state = next;
        let emitted = events.len();
        for event in events {
            sink.emit(event);
        }
        Ok(emitted)
    }

    /// Feeds `candles` in order, stopping at the first error. Candles before
    /// the failing one stay applied.
    pub fn run_all(
        &self,
        state: &mut SystemState,
        candles: impl IntoIterator<Item = Candle>,
        sink: &mut impl EventEmitter,
    ) -> Result<usize, EngineError> {
        let mut emitted = 0;
        for candle in candles {
            emitted += self.run_tick(state, candle, sink)?;
        }
        Ok(emitted)
    }

    // swings over the retained window, one zone proposal, reconcile, diff
    fn update_structure(&self, tick: &mut Tick) {
        let scan = self.detector.detect(tick.state.candles());
        debug!(
            "{} swings over {} candles, latest {:?}",
            scan.points.len(),
            tick.state.candles().len(),
            scan.latest_direction
        );

        let candidate = self.builder.propose(&scan.points, tick.candle.close);
        tick.state.set_swings(scan.points, scan.latest_direction);

        let prior = tick.state.zones().to_vec();
        let reconciled = self
            .reconciler
            .reconcile(&prior, candidate.as_slice(), Some(&tick.candle));
        if reconciled.invalidated > 0 || reconciled.merged > 0 {
            debug!(
                "Reconciled zones: {} invalidated, {} merged, {} duplicates dropped",
                reconciled.invalidated, reconciled.merged, reconciled.duplicates_dropped
            );
        }

        let changes = diff_zones(&reconciled.zones, &prior, tick.candle.timestamp);
        tick.state.set_zones(reconciled.zones);

        for change in changes {
            match &change {
                ZoneChange::Opened(zone) => info!("Zone opened: {}", zone),
                ZoneChange::Changed { after, .. } if after.is_closed() => info!("Zone closed: {}", after),
                ZoneChange::Changed { before, after } => debug!("Zone changed: {} -> {}", before, after),
                ZoneChange::Closed { zone, closed_at } => info!("Zone dropped: {} at {}", zone, closed_at),
            }
            tick.emit(change.into_payload());
        }
    }

    // hand the active order to the account and keep what comes back if legal
    fn advance_active_order(&self, tick: &mut Tick) -> Result<(), EngineError> {
        let Some(active) = tick.state.active_order().cloned() else {
            return Ok(());
        };

        let mut next = self.account.advance(&active, &tick.candle).map_err(|e| {
            warn!("Account failed to advance order {:?}: {}", active.id, e);
            e
        })?;

        if next.id != active.id {
            return Err(AccountError::UnknownOrder(next.id).into());
        }

        if next.status != active.status {
            // placement belongs to the coordinator, the account only fills, closes or cancels
            if !active.status.can_advance_to(next.status) {
                warn!(
                    "Account moved order {:?} from {} to {}, rejecting",
                    active.id, active.status, next.status
                );
                return Err(EngineError::IllegalTransition {
                    order: active.id,
                    from: active.status,
                    to: next.status,
                });
            }
            stamp_missing(&mut next, &tick.candle);
            info!("Order {:?}: {} -> {}", next.id, active.status, next.status);
            tick.emit(EventPayload::OrderTransitioned(OrderTransitionedEvent {
                order_id: next.id,
                from: active.status,
                to: next.status,
            }));
        }

        tick.state.orders_mut().update_active(next);
        Ok(())
    }

    // first candidate into a free slot wins, the rest are reported as discarded.
    // once a candidate is in, a later strategy failing cannot undo the tick.
    fn poll_strategies(&self, tick: &mut Tick) -> Result<(), EngineError> {
        if self.config.engine.halt_when_profitable {
            let today = tick.candle.timestamp.trading_day();
            let closed_today: Vec<&Order> = tick
                .state
                .orders()
                .closed()
                .iter()
                .filter(|o| o.close_timestamp.map(|t| t.trading_day()) == Some(today))
                .collect();
            if self.account.is_profitable(&closed_today) {
                debug!("Profitable on {}, not polling strategies", today);
                return Ok(());
            }
        }

        for strategy in self.strategies.iter() {
            let proposal = match strategy.propose(&tick.state) {
                Ok(proposal) => proposal,
                Err(e) if tick.accepted.is_some() => {
                    warn!("Strategy {} failed after admission, skipping: {}", strategy.name(), e);
                    continue;
                }
                Err(e) => {
                    warn!("Strategy {} failed: {}", strategy.name(), e);
                    return Err(e.into());
                }
            };
            let Some(candidate) = proposal else {
                continue;
            };

            let entry_kind = candidate.entry_kind();
            match self.coordinator.accept_candidate(&mut tick.state, candidate) {
                Admission::Accepted(id) => {
                    tick.accepted = Some(id);
                    if let Some(order) = tick.state.active_order() {
                        let payload = EventPayload::CandidateAccepted(CandidateAcceptedEvent {
                            order_id: id,
                            entry_kind,
                            order_type: order.order_type,
                            status: order.status,
                            low: order.low,
                            high: order.high,
                        });
                        tick.emit(payload);
                    }
                }
                Admission::Discarded { reason, .. } => {
                    tick.emit(EventPayload::CandidateDiscarded(CandidateDiscardedEvent {
                        strategy: strategy.name().to_string(),
                        entry_kind,
                        reason,
                    }));
                }
            }
        }
        Ok(())
    }

    fn place_order(&self, tick: &mut Tick) -> Result<(), EngineError> {
        let candle = tick.candle;
        let placed = self.coordinator.place(&mut tick.state, &candle).map_err(|e| {
            warn!("Placement check failed: {}", e);
            e
        })?;

        if let Some(before) = placed {
            tick.placed = Some(before.id);
            tick.emit(EventPayload::OrderPlaced(OrderPlacedEvent {
                order_id: before.id,
                entry_kind: before.entry_kind(),
                order_type: before.order_type,
                entry_price: before.entry_price(),
                from: before.status,
            }));
        }
        Ok(())
    }
}

// accounts may return a new status without the matching timestamp
fn stamp_missing(order: &mut Order, candle: &Candle) {
    match order.status {
        OrderStatus::Placed => {
            order.placed_timestamp.get_or_insert(candle.timestamp);
        }
        OrderStatus::Filled => {
            order.placed_timestamp.get_or_insert(candle.timestamp);
            order.filled_timestamp.get_or_insert(candle.timestamp);
        }
        s if s.is_terminal() => {
            order.close_timestamp.get_or_insert(candle.timestamp);
        }
        _ => {}
    }
}
