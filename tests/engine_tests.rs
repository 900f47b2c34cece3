//! Engine runs over many ticks: collaborator failures, profit halt, history
//! bounds and per-contract isolation.

mod common;

use common::*;
use rust_decimal_macros::dec;
use structure_core::*;

struct FailingAccount;

impl Account for FailingAccount {
    fn advance(&self, _order: &Order, _candle: &Candle) -> Result<Order, AccountError> {
        Err(AccountError::Unavailable("broker offline".to_string()))
    }

    fn is_profitable(&self, _orders: &[&Order]) -> bool {
        false
    }
}

/// Jumps a placed order straight to profit, skipping the fill.
struct SkippingAccount;

impl Account for SkippingAccount {
    fn advance(&self, order: &Order, _candle: &Candle) -> Result<Order, AccountError> {
        let mut next = order.clone();
        if order.status == OrderStatus::Placed {
            next.status = OrderStatus::Profit;
        }
        Ok(next)
    }

    fn is_profitable(&self, _orders: &[&Order]) -> bool {
        false
    }
}

/// Returns some other order.
struct ConfusedAccount;

impl Account for ConfusedAccount {
    fn advance(&self, order: &Order, _candle: &Candle) -> Result<Order, AccountError> {
        let mut other = order.clone();
        other.id = OrderId(order.id.0 + 100);
        Ok(other)
    }

    fn is_profitable(&self, _orders: &[&Order]) -> bool {
        false
    }
}

/// Sends any pending order to the broker on its own.
struct EagerAccount;

impl Account for EagerAccount {
    fn advance(&self, order: &Order, candle: &Candle) -> Result<Order, AccountError> {
        if order.status.is_pending() {
            return order
                .transitioned(OrderStatus::Placed, candle.timestamp)
                .map_err(|e| AccountError::Rejected {
                    order_id: order.id,
                    reason: e.to_string(),
                });
        }
        Ok(order.clone())
    }

    fn is_profitable(&self, _orders: &[&Order]) -> bool {
        false
    }
}

fn state() -> SystemState {
    SystemState::new(ContractId::new("ESZ5"))
}

fn first_tick_market(state: &SystemState) -> Result<Option<Order>, StrategyError> {
    Ok(market_long(state).filter(|_| state.ticks() == 1))
}

#[test]
fn out_of_order_candle_rejected() {
    let engine = Engine::structure_only(StructureConfig::default()).unwrap();
    let mut state = state();
    let mut sink = EventCollector::new();

    engine.run_tick(&mut state, flat(2, dec!(100)), &mut sink).unwrap();
    let before = state.clone();

    let same = engine.run_tick(&mut state, flat(2, dec!(101)), &mut sink);
    assert!(matches!(same, Err(EngineError::OutOfOrderCandle { .. })));
    let older = engine.run_tick(&mut state, flat(1, dec!(101)), &mut sink);
    assert!(matches!(older, Err(EngineError::OutOfOrderCandle { .. })));
    assert_eq!(state, before);
}

#[test]
fn malformed_candle_rejected() {
    let engine = Engine::structure_only(StructureConfig::default()).unwrap();
    let broken = bar(1, dec!(100), dec!(101), dec!(100));
    let result = engine.process_tick(&state(), broken);
    assert!(matches!(result, Err(EngineError::InvalidCandle(CandleError::InvertedRange { .. }))));
}

#[test]
fn account_failure_leaves_state_untouched() {
    let engine = Engine::new(StructureConfig::default(), FailingAccount)
        .unwrap()
        .with_strategy_fn("market", first_tick_market);
    let mut state = state();
    let mut sink = EventCollector::new();

    // no active order yet, so the account is not consulted
    engine.run_tick(&mut state, flat(1, dec!(100)), &mut sink).unwrap();
    assert_eq!(state.active_order().unwrap().status, OrderStatus::Placed);

    let before = state.clone();
    let emitted = sink.events().len();
    let result = engine.run_tick(&mut state, flat(2, dec!(100)), &mut sink);

    assert!(matches!(result, Err(EngineError::Account(AccountError::Unavailable(_)))));
    assert_eq!(state, before);
    assert_eq!(sink.events().len(), emitted);
}

#[test]
fn strategy_failure_leaves_state_untouched() {
    let engine = Engine::structure_only(StructureConfig::default())
        .unwrap()
        .with_strategy_fn("flaky", |state| {
            if state.last_candle().is_some_and(|c| c.timestamp == Timestamp(2_000)) {
                return Err(StrategyError::Failed {
                    strategy: "flaky".to_string(),
                    reason: "indicator not warm".to_string(),
                });
            }
            Ok(None)
        });
    let mut state = state();
    let mut sink = EventCollector::new();

    engine.run_tick(&mut state, flat(1, dec!(100)), &mut sink).unwrap();
    let before = state.clone();
    let result = engine.run_tick(&mut state, flat(2, dec!(100)), &mut sink);

    assert!(matches!(result, Err(EngineError::Strategy(_))));
    assert_eq!(state, before);
    assert_eq!(state.candles().len(), 1);

    // the next candle goes through once the strategy recovers
    engine.run_tick(&mut state, flat(3, dec!(100)), &mut sink).unwrap();
    assert_eq!(state.candles().len(), 2);
}

#[test]
fn predicate_failure_leaves_state_untouched() {
    let engine = Engine::structure_only(StructureConfig::default())
        .unwrap()
        .with_strategy_fn("reversal", |state| {
            Ok(market_long(state).filter(|_| state.ticks() == 1).map(|mut o| {
                o.entry_type = EntryType::Reversal { strength: 2 };
                o
            }))
        })
        .with_predicate(
            EntryKind::Reversal,
            |_: &Order, state: &SystemState, _: &Candle| -> Result<bool, PlacementError> {
                if state.ticks() >= 2 {
                    Err(PlacementError::Unavailable("rsi feed".to_string()))
                } else {
                    Ok(false)
                }
            },
        );
    let mut state = state();
    let mut sink = EventCollector::new();

    engine.run_tick(&mut state, flat(1, dec!(100)), &mut sink).unwrap();
    assert_eq!(state.active_order().unwrap().status, OrderStatus::Planned);

    let before = state.clone();
    let result = engine.run_tick(&mut state, flat(2, dec!(100)), &mut sink);
    assert!(matches!(result, Err(EngineError::Placement(_))));
    assert_eq!(state, before);
}

#[test]
fn illegal_account_transition_rejected() {
    let engine = Engine::new(StructureConfig::default(), SkippingAccount)
        .unwrap()
        .with_strategy_fn("market", first_tick_market);
    let mut state = state();
    let mut sink = EventCollector::new();

    engine.run_tick(&mut state, flat(1, dec!(100)), &mut sink).unwrap();
    let result = engine.run_tick(&mut state, flat(2, dec!(100)), &mut sink);

    match result {
        Err(EngineError::IllegalTransition { order, from, to }) => {
            assert_eq!(order, OrderId(1));
            assert_eq!(from, OrderStatus::Placed);
            assert_eq!(to, OrderStatus::Profit);
        }
        other => panic!("expected illegal transition, got {:?}", other.map(|_| ())),
    }
    assert_eq!(state.active_order().unwrap().status, OrderStatus::Placed);
}

#[test]
fn account_cannot_place_a_pending_order() {
    let engine = Engine::new(StructureConfig::default(), EagerAccount)
        .unwrap()
        .with_strategy_fn("retest", |state| {
            Ok(market_long(state).filter(|_| state.ticks() == 1).map(|mut o| {
                o.entry_type = EntryType::ZoneRetest { zone_start: Timestamp(0) };
                o
            }))
        })
        .with_predicate(
            EntryKind::ZoneRetest,
            |_: &Order, _: &SystemState, _: &Candle| -> Result<bool, PlacementError> { Ok(false) },
        );
    let mut state = state();
    let mut sink = EventCollector::new();

    engine.run_tick(&mut state, flat(1, dec!(100)), &mut sink).unwrap();
    assert_eq!(state.active_order().unwrap().status, OrderStatus::Planned);

    let before = state.clone();
    let result = engine.run_tick(&mut state, flat(2, dec!(100)), &mut sink);
    assert!(matches!(
        result,
        Err(EngineError::IllegalTransition {
            from: OrderStatus::Planned,
            to: OrderStatus::Placed,
            ..
        })
    ));
    assert_eq!(state, before);
    assert!(!sink
        .events()
        .iter()
        .any(|e| matches!(e.payload, EventPayload::OrderPlaced(_))));
}

#[test]
fn later_strategy_failure_keeps_admitted_order() {
    let broken = |_: &SystemState| -> Result<Option<Order>, StrategyError> {
        Err(StrategyError::MissingInput("rsi".to_string()))
    };

    let engine = Engine::structure_only(StructureConfig::default())
        .unwrap()
        .with_strategy_fn("first", |state| Ok(market_long(state)))
        .with_strategy_fn("broken", broken);
    let outcome = engine.process_tick(&state(), flat(1, dec!(100))).unwrap();
    assert_eq!(outcome.accepted, Some(OrderId(1)));
    assert_eq!(outcome.state.active_order().unwrap().status, OrderStatus::Placed);

    // before anything is admitted a failure still aborts the tick
    let engine = Engine::structure_only(StructureConfig::default())
        .unwrap()
        .with_strategy_fn("broken", broken)
        .with_strategy_fn("first", |state| Ok(market_long(state)));
    let result = engine.process_tick(&state(), flat(1, dec!(100)));
    assert!(matches!(result, Err(EngineError::Strategy(StrategyError::MissingInput(_)))));
}

#[test]
fn requested_fast_path_skips_predicate() {
    let engine = Engine::structure_only(StructureConfig::default())
        .unwrap()
        .with_strategy_fn("breakout", |state| {
            Ok(market_long(state).map(|mut o| {
                o.entry_type = EntryType::Breakout { swing_time: Timestamp(0) };
                o.place_now()
            }))
        })
        .with_predicate(
            EntryKind::Breakout,
            |_: &Order, _: &SystemState, _: &Candle| -> Result<bool, PlacementError> { Ok(false) },
        );
    let outcome = engine.process_tick(&state(), flat(1, dec!(100))).unwrap();

    assert_eq!(outcome.placed, Some(OrderId(1)));
    assert_eq!(outcome.state.active_order().unwrap().status, OrderStatus::Placed);
}

#[test]
fn account_returning_another_order_rejected() {
    let engine = Engine::new(StructureConfig::default(), ConfusedAccount)
        .unwrap()
        .with_strategy_fn("market", first_tick_market);
    let mut state = state();
    let mut sink = EventCollector::new();

    engine.run_tick(&mut state, flat(1, dec!(100)), &mut sink).unwrap();
    let result = engine.run_tick(&mut state, flat(2, dec!(100)), &mut sink);
    assert!(matches!(result, Err(EngineError::Account(AccountError::UnknownOrder(OrderId(101))))));
}

#[test]
fn profitable_day_halts_strategies() {
    let script = [(2, OrderStatus::Filled), (3, OrderStatus::Profit)];
    let run = |halt: bool| {
        let mut config = StructureConfig::default();
        config.engine.halt_when_profitable = halt;
        let engine = Engine::new(config, ScriptedAccount::new(&script))
            .unwrap()
            .with_strategy_fn("market", |state| Ok(market_long(state)));
        let mut state = state();
        let mut sink = EventCollector::new();
        for t in 1..=5 {
            engine.run_tick(&mut state, flat(t, dec!(100)), &mut sink).unwrap();
        }
        state
    };

    let halted = run(true);
    assert_eq!(halted.orders().len(), 1);
    assert!(halted.active_order().is_none());

    let running = run(false);
    assert_eq!(running.orders().len(), 2);
    assert!(running.active_order().is_some());
}

#[test]
fn profit_halt_counts_orders_closed_today() {
    // opened before midnight UTC, closed in profit after it
    const DAY: i64 = 86_400;
    let script = [(DAY - 1, OrderStatus::Filled), (DAY + 1, OrderStatus::Profit)];
    let mut config = StructureConfig::default();
    config.engine.halt_when_profitable = true;
    let engine = Engine::new(config, ScriptedAccount::new(&script))
        .unwrap()
        .with_strategy_fn("market", |state| Ok(market_long(state)));
    let mut state = state();
    let mut sink = EventCollector::new();

    for t in [DAY - 2, DAY - 1, DAY + 1, DAY + 2] {
        engine.run_tick(&mut state, flat(t, dec!(100)), &mut sink).unwrap();
    }

    assert_eq!(state.orders().len(), 1);
    assert_eq!(state.orders().closed()[0].timestamp.trading_day(), Timestamp(0).trading_day());
    assert!(state.active_order().is_none());
}

#[test]
fn candle_history_is_trimmed() {
    let mut config = config_k(1);
    config.engine.max_candles = 5;
    let engine = Engine::structure_only(config).unwrap();
    let mut state = state();
    let mut sink = EventCollector::new();

    let closes = [100, 102, 104, 103, 101, 99, 100, 103, 106, 104];
    let series = closes
        .iter()
        .enumerate()
        .map(|(i, c)| flat(i as i64, rust_decimal::Decimal::from(*c)));
    engine.run_all(&mut state, series, &mut sink).unwrap();

    assert_eq!(state.candles().len(), 5);
    assert_eq!(state.ticks(), 10);
    assert_eq!(state.candles()[0].timestamp, Timestamp(5_000));
    let first_kept = state.candles()[0].timestamp;
    assert!(state.swings().iter().all(|s| s.timestamp >= first_kept));
}

#[test]
fn event_ids_increase_across_ticks() {
    let account = ScriptedAccount::new(&[(2, OrderStatus::Filled), (3, OrderStatus::Loss)]);
    let engine = Engine::new(config_k(1), account)
        .unwrap()
        .with_strategy_fn("market", |state| Ok(market_long(state)))
        .with_strategy_fn("shadow", |state| Ok(market_long(state)));
    let mut state = state();
    let mut sink = EventCollector::new();

    for (t, close) in [(1, 100), (2, 103), (3, 98), (4, 101), (5, 104)] {
        engine
            .run_tick(&mut state, flat(t, rust_decimal::Decimal::from(close)), &mut sink)
            .unwrap();
    }

    let ids: Vec<u64> = sink.events().iter().map(|e| e.id.0).collect();
    assert_eq!(ids, (1..=ids.len() as u64).collect::<Vec<_>>());
    assert!(sink.events().iter().all(|e| e.contract == ContractId::new("ESZ5")));

    let transitions: Vec<(OrderStatus, OrderStatus)> = sink
        .events()
        .iter()
        .filter_map(|e| match &e.payload {
            EventPayload::OrderTransitioned(t) => Some((t.from, t.to)),
            _ => None,
        })
        .collect();
    assert_eq!(
        transitions,
        vec![(OrderStatus::Placed, OrderStatus::Filled), (OrderStatus::Filled, OrderStatus::Loss)]
    );
}

#[test]
fn candidate_for_other_contract_discarded() {
    let engine = Engine::structure_only(StructureConfig::default())
        .unwrap()
        .with_strategy_fn("wrong", |state| {
            Ok(market_long(state).map(|mut o| {
                o.contract = ContractId::new("NQZ5");
                o
            }))
        });
    let outcome = engine.process_tick(&state(), flat(1, dec!(100))).unwrap();

    assert!(outcome.state.active_order().is_none());
    assert!(outcome.accepted.is_none());
    assert!(matches!(
        &outcome.events[0].payload,
        EventPayload::CandidateDiscarded(d) if d.reason == DiscardReason::WrongContract
    ));
}

#[test]
fn process_tick_reports_admission_and_placement() {
    let engine = Engine::structure_only(StructureConfig::default())
        .unwrap()
        .with_strategy_fn("market", first_tick_market);
    let prior = state();
    let outcome = engine.process_tick(&prior, flat(1, dec!(100))).unwrap();

    assert_eq!(outcome.accepted, Some(OrderId(1)));
    assert_eq!(outcome.placed, Some(OrderId(1)));
    assert!(prior.candles().is_empty());
    assert_eq!(outcome.state.candles().len(), 1);
}

#[test]
fn desk_keeps_contracts_isolated() {
    let engine = Engine::new(config_k(1), FailingAccount)
        .unwrap()
        .with_strategy_fn("market", first_tick_market);
    let es = ContractId::new("ESZ5");
    let nq = ContractId::new("NQZ5");
    let mut desk = Desk::new(engine);
    desk.open_contract(es.clone());
    desk.open_contract(nq.clone());
    let mut sink = EventCollector::new();

    // each contract gets its own active order
    desk.apply(&es, flat(1, dec!(5000)), &mut sink).unwrap();
    desk.apply(&nq, flat(1, dec!(18000)), &mut sink).unwrap();
    assert!(desk.state(&es).unwrap().active_order().is_some());
    assert!(desk.state(&nq).unwrap().active_order().is_some());
    assert_eq!(desk.state(&nq).unwrap().active_order().unwrap().contract, nq);

    // ES fails on its account; NQ is unaffected and its own state is unchanged
    let nq_before = desk.state(&nq).unwrap().clone();
    assert!(desk.apply(&es, flat(2, dec!(5001)), &mut sink).is_err());
    assert_eq!(desk.state(&nq).unwrap(), &nq_before);
    assert_eq!(desk.state(&es).unwrap().candles().len(), 1);

    let closed = desk.close_contract(&es).unwrap();
    assert_eq!(closed.contract(), &es);
    assert!(matches!(
        desk.apply(&es, flat(3, dec!(5000)), &mut sink),
        Err(EngineError::UnknownContract(_))
    ));
    assert_eq!(desk.len(), 1);
}
