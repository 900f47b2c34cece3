// 6.0: per-contract state threaded from tick to tick.
// candles, swings, zones and orders for exactly one contract. the engine reads a
// state and hands back a new one, nothing is shared between contracts or ticks.

use crate::candle::Candle;
use crate::events::EventId;
use crate::order::{Order, OrderLedger};
use crate::swing::{SwingDirection, SwingPoint};
use crate::types::ContractId;
use crate::zone::{PlanZone, ZoneType};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemState {
    contract: ContractId,
    candles: Vec<Candle>,
    swings: Vec<SwingPoint>,
    latest_direction: Option<SwingDirection>,
    zones: Vec<PlanZone>,
    orders: OrderLedger,
    next_event_id: u64,
    ticks: u64,
}

impl SystemState {
    pub fn new(contract: ContractId) -> Self {
        Self {
            contract,
            candles: Vec::new(),
            swings: Vec::new(),
            latest_direction: None,
            zones: Vec::new(),
            orders: OrderLedger::new(),
            next_event_id: 1,
            ticks: 0,
        }
    }

    pub fn contract(&self) -> &ContractId {
        &self.contract
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn last_candle(&self) -> Option<&Candle> {
        self.candles.last()
    }

    pub fn swings(&self) -> &[SwingPoint] {
        &self.swings
    }

    pub fn latest_direction(&self) -> Option<SwingDirection> {
        self.latest_direction
    }

    /// Full zone history, closed zones included, sorted by start time.
    pub fn zones(&self) -> &[PlanZone] {
        &self.zones
    }

    pub fn active_zones(&self) -> impl Iterator<Item = &PlanZone> {
        self.zones.iter().filter(|z| z.is_active())
    }

    /// Most recent active zone of the given type.
    pub fn latest_active_zone(&self, zone_type: ZoneType) -> Option<&PlanZone> {
        self.active_zones().filter(|z| z.zone_type == zone_type).last()
    }

    pub fn orders(&self) -> &OrderLedger {
        &self.orders
    }

    pub fn active_order(&self) -> Option<&Order> {
        self.orders.active()
    }

    /// Number of candles processed, including any trimmed from history.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub(crate) fn orders_mut(&mut self) -> &mut OrderLedger {
        &mut self.orders
    }

    // appends and drops the oldest candles beyond `max_candles`
    pub(crate) fn push_candle(&mut self, candle: Candle, max_candles: usize) {
        self.candles.push(candle);
        self.ticks += 1;
        if self.candles.len() > max_candles {
            let drain_count = self.candles.len() - max_candles;
            self.candles.drain(0..drain_count);
        }
    }

    pub(crate) fn set_swings(&mut self, swings: Vec<SwingPoint>, latest: Option<SwingDirection>) {
        self.swings = swings;
        self.latest_direction = latest;
    }

    pub(crate) fn set_zones(&mut self, zones: Vec<PlanZone>) {
        self.zones = zones;
    }

    pub(crate) fn next_event_id(&mut self) -> EventId {
        let id = EventId(self.next_event_id);
        self.next_event_id += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candle::CandleDuration;
    use crate::types::{Price, Timestamp};
    use rust_decimal_macros::dec;

    fn candle(t: i64) -> Candle {
        let px = Price::new_unchecked(dec!(100));
        Candle {
            open: px,
            high: px,
            low: px,
            close: px,
            volume: dec!(1),
            timestamp: Timestamp(t),
            duration: CandleDuration::OneSecond,
        }
    }

    #[test]
    fn candle_history_is_bounded() {
        let mut state = SystemState::new(ContractId::new("ESZ5"));
        for t in 0..5 {
            state.push_candle(candle(t), 3);
        }
        assert_eq!(state.candles().len(), 3);
        assert_eq!(state.candles()[0].timestamp, Timestamp(2));
        assert_eq!(state.last_candle().unwrap().timestamp, Timestamp(4));
        assert_eq!(state.ticks(), 5);
    }

    #[test]
    fn latest_active_zone_skips_closed() {
        let mut state = SystemState::new(ContractId::new("ESZ5"));
        let lo = Price::new_unchecked(dec!(100));
        let hi = Price::new_unchecked(dec!(110));
        state.set_zones(vec![
            PlanZone::new(ZoneType::Supply, lo, hi, Timestamp(1)),
            PlanZone::new(ZoneType::Supply, lo, hi, Timestamp(2)).closed_at(Timestamp(3)),
        ]);
        assert_eq!(state.latest_active_zone(ZoneType::Supply).unwrap().start_time, Timestamp(1));
        assert!(state.latest_active_zone(ZoneType::Demand).is_none());
    }

    #[test]
    fn event_ids_increase() {
        let mut state = SystemState::new(ContractId::new("ESZ5"));
        assert_eq!(state.next_event_id(), EventId(1));
        assert_eq!(state.next_event_id(), EventId(2));
    }
}
