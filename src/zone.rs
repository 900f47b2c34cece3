//! Supply and demand plan zones.
//!
//! A zone is a price interval spanned by the latest swing low and swing high.
//! Supply sits above price (resistance), demand below (support). Zones stay
//! active until price trades through their far edge or a newer zone absorbs them.

use crate::candle::Candle;
use crate::swing::{latest_of, SwingDirection, SwingPoint};
use crate::types::{Price, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ZoneType {
    Supply,
    Demand,
}

impl fmt::Display for ZoneType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZoneType::Supply => write!(f, "supply"),
            ZoneType::Demand => write!(f, "demand"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanZone {
    pub zone_type: ZoneType,
    pub high: Price,
    pub low: Price,
    /// Identity of the zone. At most one zone exists per start time.
    pub start_time: Timestamp,
    /// Set once the zone is closed. Closed zones are never modified again.
    pub end_time: Option<Timestamp>,
}

impl PlanZone {
    pub fn new(zone_type: ZoneType, low: Price, high: Price, start_time: Timestamp) -> Self {
        debug_assert!(low <= high);
        Self {
            zone_type,
            high,
            low,
            start_time,
            end_time: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.end_time.is_none()
    }

    pub fn is_closed(&self) -> bool {
        self.end_time.is_some()
    }

    pub fn height(&self) -> Decimal {
        self.high.value() - self.low.value()
    }

    /// Closed copy. A zone that is already closed keeps its original end time.
    pub fn closed_at(&self, timestamp: Timestamp) -> Self {
        Self {
            end_time: self.end_time.or(Some(timestamp)),
            ..*self
        }
    }

    /// True when `other` lies entirely inside this zone (edges inclusive).
    pub fn engulfs(&self, other: &PlanZone) -> bool {
        self.low <= other.low && other.high <= self.high
    }

    /// Interiors intersect. Zones that only share an edge do not overlap.
    pub fn overlaps(&self, other: &PlanZone) -> bool {
        self.low < other.high && other.low < self.high
    }

    /// Whether `candle` trades decisively through the zone's far edge.
    pub fn is_invalidated_by(&self, candle: &Candle, rule: ZoneInvalidation, tick_size: Decimal) -> bool {
        match self.zone_type {
            // supply breaks upward through its high
            ZoneType::Supply => {
                let edge = self.high.value();
                match rule {
                    ZoneInvalidation::Touch => candle.high.value() > edge,
                    ZoneInvalidation::Close => candle.close.value() > edge,
                    ZoneInvalidation::Buffer { ticks } => {
                        candle.close.value() > edge + Decimal::from(ticks) * tick_size
                    }
                }
            }
            // demand breaks downward through its low
            ZoneType::Demand => {
                let edge = self.low.value();
                match rule {
                    ZoneInvalidation::Touch => candle.low.value() < edge,
                    ZoneInvalidation::Close => candle.close.value() < edge,
                    ZoneInvalidation::Buffer { ticks } => {
                        candle.close.value() < edge - Decimal::from(ticks) * tick_size
                    }
                }
            }
        }
    }
}

impl fmt::Display for PlanZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}, {}] @ {}", self.zone_type, self.low, self.high, self.start_time)
    }
}

/// When a zone counts as broken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneInvalidation {
    /// Any wick beyond the far edge.
    Touch,
    /// A close beyond the far edge.
    Close,
    /// A close more than `ticks` ticks beyond the far edge.
    Buffer { ticks: u32 },
}

/// What to do with same-type active zones that overlap without one engulfing the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// The newer zone widens to the union of both ranges and the older one closes.
    Union,
    /// Both stay active as separate records.
    Distinct,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneParams {
    pub invalidation: ZoneInvalidation,
    pub overlap: OverlapPolicy,
    /// Contract tick size, used by `ZoneInvalidation::Buffer`.
    pub tick_size: Decimal,
}

impl Default for ZoneParams {
    fn default() -> Self {
        Self {
            invalidation: ZoneInvalidation::Close,
            overlap: OverlapPolicy::Union,
            tick_size: Decimal::new(25, 2), // 0.25
        }
    }
}

/// Proposes at most one zone per tick from the latest swing pair.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZoneBuilder;

impl ZoneBuilder {
    pub fn new() -> Self {
        Self
    }

    pub fn propose(&self, swings: &[SwingPoint], last_close: Price) -> Option<PlanZone> {
        propose_zone(swings, last_close)
    }
}

/// Zone from the most recent swing low and swing high, if they form one.
///
/// Supply: the swing low came first, sits below the swing high, and price has
/// since closed below the swing low. Demand: the swing high came first and price
/// has since closed above it. The zone spans `[swing low, swing high]` and is
/// keyed by the later swing's timestamp.
pub fn propose_zone(swings: &[SwingPoint], last_close: Price) -> Option<PlanZone> {
    let down = latest_of(swings, SwingDirection::Down)?;
    let up = latest_of(swings, SwingDirection::Up)?;

    if up.level >= down.level {
        return None;
    }

    if up.timestamp < down.timestamp && up.level > last_close {
        return Some(PlanZone::new(ZoneType::Supply, up.level, down.level, down.timestamp));
    }

    if up.timestamp > down.timestamp && down.level < last_close {
        return Some(PlanZone::new(ZoneType::Demand, up.level, down.level, up.timestamp));
    }

    None
}
