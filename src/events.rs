// 4.2: every state change the tick pipeline makes is reported as an event.
// zone events come from diffing the zone history before and after reconciliation,
// order events from the coordinator. sinks (persistence, UI) are fire and forget.

use crate::order::{EntryKind, OrderStatus};
use crate::types::{ContractId, OrderId, OrderType, Price, Timestamp};
use crate::zone::PlanZone;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub contract: ContractId,
    pub timestamp: Timestamp,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(id: EventId, contract: ContractId, timestamp: Timestamp, payload: EventPayload) -> Self {
        Self {
            id,
            contract,
            timestamp,
            payload,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventPayload {
    // Zone events
    ZoneOpened(PlanZone),
    ZoneChanged(ZoneChangedEvent),
    ZoneClosed(ZoneClosedEvent),

    // Order events
    CandidateAccepted(CandidateAcceptedEvent),
    CandidateDiscarded(CandidateDiscardedEvent),
    OrderPlaced(OrderPlacedEvent),
    OrderTransitioned(OrderTransitionedEvent),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneChangedEvent {
    pub before: PlanZone,
    pub after: PlanZone,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneClosedEvent {
    pub zone: PlanZone,
    pub closed_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateAcceptedEvent {
    pub order_id: OrderId,
    pub entry_kind: EntryKind,
    pub order_type: OrderType,
    pub status: OrderStatus,
    pub low: Price,
    pub high: Price,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateDiscardedEvent {
    pub strategy: String,
    pub entry_kind: EntryKind,
    pub reason: DiscardReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiscardReason {
    /// Another order already holds the active slot.
    ActiveOrderExists,
    /// Candidate for a different contract than the state it was offered to.
    WrongContract,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPlacedEvent {
    pub order_id: OrderId,
    pub entry_kind: EntryKind,
    pub order_type: OrderType,
    pub entry_price: Price,
    pub from: OrderStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTransitionedEvent {
    pub order_id: OrderId,
    pub from: OrderStatus,
    pub to: OrderStatus,
}

/// Zone-level difference between two zone histories, matched by start time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZoneChange {
    /// Present now, absent before.
    Opened(PlanZone),
    /// Present in both with different bounds or end time.
    Changed { before: PlanZone, after: PlanZone },
    /// Present before, gone now. Treated as closed at the latest candle.
    Closed { zone: PlanZone, closed_at: Timestamp },
}

impl ZoneChange {
    pub fn into_payload(self) -> EventPayload {
        match self {
            ZoneChange::Opened(zone) => EventPayload::ZoneOpened(zone),
            ZoneChange::Changed { before, after } => {
                EventPayload::ZoneChanged(ZoneChangedEvent { before, after })
            }
            ZoneChange::Closed { zone, closed_at } => {
                EventPayload::ZoneClosed(ZoneClosedEvent { zone, closed_at })
            }
        }
    }
}

/// Minimal list of zone changes from `prior` to `current`. Output follows the
/// start-time order of `current`, with vanished zones appended in `prior` order.
pub fn diff_zones(current: &[PlanZone], prior: &[PlanZone], latest: Timestamp) -> Vec<ZoneChange> {
    let before: HashMap<Timestamp, &PlanZone> = prior.iter().map(|z| (z.start_time, z)).collect();
    let after: HashMap<Timestamp, &PlanZone> = current.iter().map(|z| (z.start_time, z)).collect();

    let mut changes = Vec::new();

    for zone in current {
        match before.get(&zone.start_time) {
            None => changes.push(ZoneChange::Opened(*zone)),
            Some(old) if *old != zone => changes.push(ZoneChange::Changed {
                before: **old,
                after: *zone,
            }),
            Some(_) => {}
        }
    }

    for zone in prior {
        if !after.contains_key(&zone.start_time) {
            changes.push(ZoneChange::Closed {
                zone: *zone,
                closed_at: latest,
            });
        }
    }

    changes
}

pub trait EventEmitter {
    fn emit(&mut self, event: Event);
}

#[derive(Debug, Default)]
pub struct EventCollector {
    events: Vec<Event>,
    max_events: Option<usize>,
}

impl EventCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps only the most recent `max_events`.
    pub fn bounded(max_events: usize) -> Self {
        Self {
            events: Vec::new(),
            max_events: Some(max_events),
        }
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn recent(&self, count: usize) -> &[Event] {
        let start = self.events.len().saturating_sub(count);
        &self.events[start..]
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl EventEmitter for EventCollector {
    fn emit(&mut self, event: Event) {
        self.events.push(event);

        if let Some(max) = self.max_events {
            if self.events.len() > max {
                let drain_count = self.events.len() - max;
                self.events.drain(0..drain_count);
            }
        }
    }
}
