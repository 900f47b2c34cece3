//! Market Structure Engine Simulation.
//!
//! Walks scripted candle series through swing detection, zone reconciliation
//! and the single-order lifecycle, printing every event along the way.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use structure_core::*;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_target(false)
        .init();

    println!("Market Structure Engine Simulation");
    println!("Swings, Supply/Demand Zones, Single Active Order\n");

    let scenarios: [(&str, fn() -> Result<(), EngineError>); 4] = [
        ("swing detection", scenario_1_swing_detection),
        ("zone lifecycle", scenario_2_zone_lifecycle),
        ("order lifecycle", scenario_3_order_lifecycle),
        ("multi-contract desk", scenario_4_desk),
    ];

    for (name, scenario) in scenarios {
        if let Err(e) = scenario() {
            eprintln!("Scenario '{}' failed: {}", name, e);
            std::process::exit(1);
        }
    }

    println!("\nAll simulations completed successfully.");
}

/// Fills at the entry, exits at the stop or the target. Stop wins when a bar
/// spans both.
struct BracketAccount;

impl BracketAccount {
    fn pnl(order: &Order) -> Decimal {
        match order.status {
            OrderStatus::Profit => order
                .take_profit_price()
                .map(|tp| tp.distance(order.entry_price()))
                .unwrap_or(Decimal::ZERO),
            OrderStatus::Loss => -order.risk(),
            _ => Decimal::ZERO,
        }
    }
}

impl Account for BracketAccount {
    fn advance(&self, order: &Order, candle: &Candle) -> Result<Order, AccountError> {
        let at = candle.timestamp;
        let rejected = |e: TransitionError| AccountError::Rejected {
            order_id: order.id,
            reason: e.to_string(),
        };

        match order.status {
            OrderStatus::Placed => {
                let entry = order.entry_price();
                let touched = match order.order_type {
                    OrderType::Long => candle.low <= entry,
                    OrderType::Short => candle.high >= entry,
                };
                if touched {
                    return order.transitioned(OrderStatus::Filled, at).map_err(rejected);
                }
            }
            OrderStatus::Filled => {
                let stop = order.stop_price();
                let target = order.take_profit_price();
                let (stopped, won) = match order.order_type {
                    OrderType::Long => (candle.low <= stop, target.is_some_and(|tp| candle.high >= tp)),
                    OrderType::Short => (candle.high >= stop, target.is_some_and(|tp| candle.low <= tp)),
                };
                if stopped {
                    return order.transitioned(OrderStatus::Loss, at).map_err(rejected);
                }
                if won {
                    return order.transitioned(OrderStatus::Profit, at).map_err(rejected);
                }
            }
            _ => {}
        }
        Ok(order.clone())
    }

    fn is_profitable(&self, orders: &[&Order]) -> bool {
        orders.iter().map(|o| Self::pnl(o)).sum::<Decimal>() > Decimal::ZERO
    }
}

fn px(v: Decimal) -> Price {
    Price::new_unchecked(v)
}

/// One-second bar that opens at its close.
fn bar(t: i64, high: Decimal, low: Decimal, close: Decimal) -> Result<Candle, CandleError> {
    Candle::new(px(close), px(high), px(low), px(close), dec!(100), Timestamp(t * 1_000), CandleDuration::OneSecond)
}

fn describe(event: &Event) -> String {
    match &event.payload {
        EventPayload::ZoneOpened(zone) => format!("zone opened   {}", zone),
        EventPayload::ZoneChanged(change) => format!("zone changed  {} -> {}", change.before, change.after),
        EventPayload::ZoneClosed(closed) => format!("zone closed   {} at {}", closed.zone, closed.closed_at),
        EventPayload::CandidateAccepted(e) => {
            format!("accepted      order {} {:?} {:?} as {}", e.order_id.0, e.entry_kind, e.order_type, e.status)
        }
        EventPayload::CandidateDiscarded(e) => {
            format!("discarded     {} ({:?}): {:?}", e.strategy, e.entry_kind, e.reason)
        }
        EventPayload::OrderPlaced(e) => {
            format!("placed        order {} from {} @ {}", e.order_id.0, e.from, e.entry_price)
        }
        EventPayload::OrderTransitioned(e) => format!("transitioned  order {} {} -> {}", e.order_id.0, e.from, e.to),
    }
}

fn print_events(events: &[Event]) {
    for event in events {
        println!("  [{:>2}] {} {}: {}", event.id.0, event.contract, event.timestamp, describe(event));
    }
}

fn fast_config() -> StructureConfig {
    let mut config = StructureConfig::default();
    config.swing.min_confirmations = 1;
    config
}

/// Swing points on a single peak.
fn scenario_1_swing_detection() -> Result<(), EngineError> {
    println!("Scenario 1: Swing Detection\n");

    let highs = [dec!(10), dec!(12), dec!(15), dec!(11), dec!(9)];
    let mut candles = Vec::new();
    for (i, high) in highs.iter().enumerate() {
        candles.push(bar(i as i64, *high, *high - dec!(1), *high - dec!(0.5))?);
    }

    let detector = SwingDetector::new(SwingParams {
        min_confirmations: 1,
        min_swing_size: Decimal::ZERO,
    });
    let scan = detector.detect(&candles);

    println!("  Highs: {:?}", highs);
    for point in &scan.points {
        println!("  {:?} swing at {} level {}", point.direction, point.timestamp, point.level);
    }
    println!("  Latest direction: {:?}\n", scan.latest_direction);
    Ok(())
}

/// A supply zone forms, breaks, and a demand zone takes its place.
fn scenario_2_zone_lifecycle() -> Result<(), EngineError> {
    println!("Scenario 2: Zone Lifecycle\n");

    let engine = Engine::structure_only(fast_config())?;
    let mut state = SystemState::new(ContractId::new("ESZ5"));
    let mut sink = EventCollector::new();

    let series = [
        bar(0, dec!(103), dec!(101), dec!(102))?,
        bar(1, dec!(101), dec!(99), dec!(100))?, // swing low 99
        bar(2, dec!(104), dec!(100), dec!(103))?,
        bar(3, dec!(110), dec!(103), dec!(108))?, // swing high 110
        bar(4, dec!(108), dec!(100), dec!(101))?,
        bar(5, dec!(99), dec!(95), dec!(96))?, // closes below the swing low: supply [99, 110]
        bar(6, dec!(112), dec!(104), dec!(111))?, // closes above 110: supply breaks, demand [95, 110]
        bar(7, dec!(113), dec!(109), dec!(112))?,
    ];

    engine.run_all(&mut state, series, &mut sink)?;
    print_events(sink.events());

    let active: Vec<String> = state.active_zones().map(|z| z.to_string()).collect();
    println!("  Zone history: {}, active: {:?}\n", state.zones().len(), active);
    Ok(())
}

/// A market order runs to profit; a competing breakout waits its turn.
fn scenario_3_order_lifecycle() -> Result<(), EngineError> {
    println!("Scenario 3: Order Lifecycle\n");

    let engine = Engine::new(fast_config(), BracketAccount)?
        .with_strategy_fn("market_open", |state| {
            // one market long on the third bar
            if state.ticks() != 3 {
                return Ok(None);
            }
            let Some(last) = state.last_candle() else {
                return Ok(None);
            };
            let low = last.close.offset(dec!(-4)).ok_or_else(|| StrategyError::MissingInput("price".into()))?;
            let order = Order::candidate(
                state.contract().clone(),
                OrderType::Long,
                EntryType::Market,
                low,
                last.close,
                last.timestamp,
            )
            .with_profit_multiplier(dec!(1.5))
            .with_entry_reason("session open");
            Ok(Some(order))
        })
        .with_strategy_fn("breakout", |state| {
            if state.ticks() < 3 {
                return Ok(None);
            }
            let Some(last) = state.last_candle() else {
                return Ok(None);
            };
            let (Some(low), Some(high)) = (last.close.offset(dec!(-3)), last.close.offset(dec!(1))) else {
                return Ok(None);
            };
            let order = Order::candidate(
                state.contract().clone(),
                OrderType::Long,
                EntryType::Breakout { swing_time: last.timestamp },
                low,
                high,
                last.timestamp,
            );
            Ok(Some(order))
        });

    let mut state = SystemState::new(ContractId::new("NQZ5"));
    let mut sink = EventCollector::new();

    let series = [
        bar(0, dec!(101), dec!(99), dec!(100))?,
        bar(1, dec!(102), dec!(100), dec!(101))?,
        bar(2, dec!(103), dec!(101), dec!(102))?, // market long [98, 102] accepted and placed
        bar(3, dec!(103), dec!(101), dec!(102))?, // fills at 102
        bar(4, dec!(109), dec!(102), dec!(108))?, // target 108 hit, breakout [105, 109] planned
        bar(5, dec!(109), dec!(107), dec!(108))?, // no close above 109 yet
        bar(6, dec!(111), dec!(108), dec!(110))?, // closes above 109: placed
    ];

    engine.run_all(&mut state, series, &mut sink)?;
    print_events(sink.events());

    for order in state.orders().iter() {
        println!(
            "  order {} {:?} {:?} [{}, {}] status {} day {}",
            order.id.0,
            order.entry_kind(),
            order.order_type,
            order.low,
            order.high,
            order.status,
            order.trading_day()
        );
    }
    println!();
    Ok(())
}

/// Two contracts, one engine. Each holds its own active order.
fn scenario_4_desk() -> Result<(), EngineError> {
    println!("Scenario 4: Multi-Contract Desk\n");

    let engine = Engine::new(fast_config(), BracketAccount)?.with_strategy_fn("always_market", |state| {
        let Some(last) = state.last_candle() else {
            return Ok(None);
        };
        let Some(low) = last.close.offset(dec!(-2)) else {
            return Ok(None);
        };
        Ok(Some(Order::candidate(
            state.contract().clone(),
            OrderType::Long,
            EntryType::Market,
            low,
            last.close,
            last.timestamp,
        )))
    });

    let es = ContractId::new("ESZ5");
    let nq = ContractId::new("NQZ5");
    let mut desk = Desk::new(engine);
    desk.open_contract(es.clone());
    desk.open_contract(nq.clone());

    let mut sink = EventCollector::bounded(1_000);
    for t in 0..3 {
        let close = dec!(5000) + Decimal::from(t);
        desk.apply(&es, bar(t, close + dec!(1), close - dec!(1), close)?, &mut sink)?;
        let close = dec!(18000) + Decimal::from(t);
        desk.apply(&nq, bar(t, close + dec!(1), close - dec!(1), close)?, &mut sink)?;
    }

    for contract in [&es, &nq] {
        if let Some(state) = desk.state(contract) {
            let active = state.active_order().map(|o| o.status.to_string()).unwrap_or_default();
            println!("  {}: {} orders, active {}", contract, state.orders().len(), active);
        }
    }
    let discarded = sink
        .events()
        .iter()
        .filter(|e| matches!(e.payload, EventPayload::CandidateDiscarded(_)))
        .count();
    println!("  Discarded candidates across the desk: {}\n", discarded);
    Ok(())
}
