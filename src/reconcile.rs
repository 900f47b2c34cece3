//! Zone reconciliation.
//!
//! Every tick the freshly proposed zones are folded into the zone history in
//! three fixed passes: dedup by start time, close zones the latest candle broke,
//! then merge same-type active zones that overlap. The input slice is never
//! touched; a new collection sorted by start time is returned.

use crate::candle::Candle;
use crate::types::Timestamp;
use crate::zone::{OverlapPolicy, PlanZone, ZoneParams};
use std::collections::HashSet;

/// Outcome of one reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Full zone history, sorted by start time.
    pub zones: Vec<PlanZone>,
    pub duplicates_dropped: usize,
    pub invalidated: usize,
    pub merged: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ZoneReconciler {
    params: ZoneParams,
}

// one merge step between two active same-type zones (indices into the working set)
enum MergeStep {
    CloseOlder { older: usize },
    CloseNewer { newer: usize },
    Widen { newer: usize, older: usize },
}

impl ZoneReconciler {
    pub fn new(params: ZoneParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &ZoneParams {
        &self.params
    }

    /// Applies dedup, close and merge. With no candle there is nothing to judge
    /// the zones against and the history is returned unchanged.
    pub fn reconcile(
        &self,
        existing: &[PlanZone],
        candidates: &[PlanZone],
        candle: Option<&Candle>,
    ) -> Reconciliation {
        let Some(candle) = candle else {
            return Reconciliation {
                zones: existing.to_vec(),
                ..Reconciliation::default()
            };
        };

        let (mut zones, duplicates_dropped) = dedup(existing, candidates);
        let invalidated = self.close_pass(&mut zones, candle);
        let merged = merge_pass(&mut zones, self.params.overlap, candle.timestamp);

        Reconciliation {
            zones,
            duplicates_dropped,
            invalidated,
            merged,
        }
    }

    fn close_pass(&self, zones: &mut [PlanZone], candle: &Candle) -> usize {
        let mut closed = 0;
        for zone in zones.iter_mut().filter(|z| z.is_active()) {
            if zone.is_invalidated_by(candle, self.params.invalidation, self.params.tick_size) {
                *zone = zone.closed_at(candle.timestamp);
                closed += 1;
            }
        }
        closed
    }
}

// history wins over candidates for a start time it already holds. among same-tick
// candidates the choice must not depend on arrival order, so they are put in a
// canonical order before the first one per start time is kept.
fn dedup(existing: &[PlanZone], candidates: &[PlanZone]) -> (Vec<PlanZone>, usize) {
    let mut seen: HashSet<Timestamp> = HashSet::with_capacity(existing.len() + candidates.len());
    let mut zones = Vec::with_capacity(existing.len() + candidates.len());
    let mut dropped = 0;

    let mut fresh = candidates.to_vec();
    fresh.sort_by(|a, b| {
        (a.start_time, a.zone_type, a.low, a.high).cmp(&(b.start_time, b.zone_type, b.low, b.high))
    });

    for zone in existing.iter().copied().chain(fresh) {
        if seen.insert(zone.start_time) {
            zones.push(zone);
        } else {
            dropped += 1;
        }
    }

    zones.sort_by_key(|z| z.start_time);
    (zones, dropped)
}

// newest first: look for an older active zone of the same type that overlaps it,
// resolve that one pair, and rescan. each step closes exactly one zone.
fn merge_pass(zones: &mut [PlanZone], policy: OverlapPolicy, now: Timestamp) -> usize {
    let mut merged = 0;

    while let Some(step) = next_merge(zones, policy) {
        match step {
            MergeStep::CloseOlder { older } => {
                zones[older] = zones[older].closed_at(now);
            }
            MergeStep::CloseNewer { newer } => {
                zones[newer] = zones[newer].closed_at(now);
            }
            MergeStep::Widen { newer, older } => {
                let absorbed = zones[older];
                let zone = &mut zones[newer];
                zone.low = zone.low.min(absorbed.low);
                zone.high = zone.high.max(absorbed.high);
                zones[older] = absorbed.closed_at(now);
            }
        }
        merged += 1;
    }

    merged
}

fn next_merge(zones: &[PlanZone], policy: OverlapPolicy) -> Option<MergeStep> {
    let active: Vec<usize> = (0..zones.len()).filter(|&i| zones[i].is_active()).collect();

    for (pos, &newer) in active.iter().enumerate().rev() {
        for &older in active[..pos].iter().rev() {
            let (n, o) = (&zones[newer], &zones[older]);
            if n.zone_type != o.zone_type || !n.overlaps(o) {
                continue;
            }

            if n.engulfs(o) {
                return Some(MergeStep::CloseOlder { older });
            }
            if o.engulfs(n) {
                return Some(MergeStep::CloseNewer { newer });
            }
            if policy == OverlapPolicy::Union {
                return Some(MergeStep::Widen { newer, older });
            }
        }
    }

    None
}

/// Same-type active zones that overlap. Empty after a `Union` reconciliation.
pub fn overlapping_active_pairs(zones: &[PlanZone]) -> Vec<(PlanZone, PlanZone)> {
    let active: Vec<&PlanZone> = zones.iter().filter(|z| z.is_active()).collect();
    let mut pairs = Vec::new();
    for (i, a) in active.iter().enumerate() {
        for b in &active[i + 1..] {
            if a.zone_type == b.zone_type && a.overlaps(b) {
                pairs.push((**a, **b));
            }
        }
    }
    pairs
}
