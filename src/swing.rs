//! Swing point detection.
//!
//! A swing point is a local extreme confirmed by `min_confirmations` candles on
//! each side. Raw extremes are then filtered so that directions alternate:
//! a swing low is always followed by a swing high and vice versa.

use crate::candle::Candle;
use crate::types::{Price, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Which way price is expected to move away from the extreme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SwingDirection {
    /// Swing low. Price turned up from here.
    Up,
    /// Swing high. Price turned down from here.
    Down,
}

impl SwingDirection {
    pub fn opposite(&self) -> Self {
        match self {
            SwingDirection::Up => SwingDirection::Down,
            SwingDirection::Down => SwingDirection::Up,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwingPoint {
    pub level: Price,
    pub direction: SwingDirection,
    pub timestamp: Timestamp,
}

impl SwingPoint {
    pub fn new(level: Price, direction: SwingDirection, timestamp: Timestamp) -> Self {
        Self {
            level,
            direction,
            timestamp,
        }
    }

    // lower low for a swing low, higher high for a swing high
    fn is_more_extreme_than(&self, other: &SwingPoint) -> bool {
        match self.direction {
            SwingDirection::Up => self.level < other.level,
            SwingDirection::Down => self.level > other.level,
        }
    }
}

/// Detection parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwingParams {
    /// Candles required on each side of an extreme.
    pub min_confirmations: usize,
    /// Minimum price distance between consecutive swing points. <= 0 disables the filter.
    pub min_swing_size: Decimal,
}

impl Default for SwingParams {
    fn default() -> Self {
        Self {
            min_confirmations: 3,
            min_swing_size: Decimal::ZERO,
        }
    }
}

impl SwingParams {
    /// Smallest window that can produce a swing point.
    pub fn min_window(&self) -> usize {
        window_len(self.min_confirmations)
    }
}

/// Output of one detection pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwingScan {
    pub points: Vec<SwingPoint>,
    /// Direction of the last accepted point.
    pub latest_direction: Option<SwingDirection>,
}

#[derive(Debug, Clone, Default)]
pub struct SwingDetector {
    params: SwingParams,
}

impl SwingDetector {
    pub fn new(params: SwingParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &SwingParams {
        &self.params
    }

    pub fn detect(&self, candles: &[Candle]) -> SwingScan {
        let (points, latest_direction) = detect_swings(
            candles,
            self.params.min_confirmations,
            self.params.min_swing_size,
        );
        SwingScan {
            points,
            latest_direction,
        }
    }
}

/// Scans `candles` for confirmed extremes and returns the alternation-filtered
/// points plus the direction of the last one. Returns nothing when fewer than
/// `2 * min_confirmations + 1` candles are available.
pub fn detect_swings(
    candles: &[Candle],
    min_confirmations: usize,
    min_swing_size: Decimal,
) -> (Vec<SwingPoint>, Option<SwingDirection>) {
    let k = min_confirmations;
    if candles.len() < window_len(k) {
        return (Vec::new(), None);
    }

    let raw = raw_extremes(candles, k);
    let points = enforce_alternation(raw, min_swing_size);
    let latest = points.last().map(|p| p.direction);
    (points, latest)
}

// 2k + 1, saturating for absurd k read from config
fn window_len(k: usize) -> usize {
    k.saturating_mul(2).saturating_add(1)
}

// every candle whose high (low) is >= (<=) all of its k neighbours on both sides.
// ties count, so a flat top yields several candidates and alternation keeps one.
fn raw_extremes(candles: &[Candle], k: usize) -> Vec<SwingPoint> {
    let mut raw = Vec::new();

    for i in k..candles.len() - k {
        let candle = &candles[i];
        let neighbours = candles[i - k..i].iter().chain(&candles[i + 1..=i + k]);

        let (mut window_high, mut window_low) = (None::<Price>, None::<Price>);
        for n in neighbours {
            window_high = Some(window_high.map_or(n.high, |h| h.max(n.high)));
            window_low = Some(window_low.map_or(n.low, |l| l.min(n.low)));
        }

        let is_high = window_high.map_or(true, |h| candle.high >= h);
        let is_low = window_low.map_or(true, |l| candle.low <= l);

        let high = SwingPoint::new(candle.high, SwingDirection::Down, candle.timestamp);
        let low = SwingPoint::new(candle.low, SwingDirection::Up, candle.timestamp);

        // outside bar: a bullish bar printed its low first
        match (is_low, is_high) {
            (true, true) if candle.is_bullish() => raw.extend([low, high]),
            (true, true) => raw.extend([high, low]),
            (true, false) => raw.push(low),
            (false, true) => raw.push(high),
            (false, false) => {}
        }
    }

    raw
}

fn enforce_alternation(raw: Vec<SwingPoint>, min_swing_size: Decimal) -> Vec<SwingPoint> {
    let size_filter = min_swing_size > Decimal::ZERO;
    let far_enough =
        |a: &SwingPoint, b: &SwingPoint| !size_filter || a.level.distance(b.level) >= min_swing_size;

    let mut accepted: Vec<SwingPoint> = Vec::with_capacity(raw.len());

    for candidate in raw {
        let Some(last) = accepted.last().copied() else {
            accepted.push(candidate);
            continue;
        };

        if candidate.direction == last.direction {
            // same run: keep the more extreme one, still measured against the point before it
            let before = accepted.len().checked_sub(2).map(|i| accepted[i]);
            let size_ok = before.map_or(true, |prev| far_enough(&candidate, &prev));
            if candidate.is_more_extreme_than(&last) && size_ok {
                if let Some(slot) = accepted.last_mut() {
                    *slot = candidate;
                }
            }
        } else if far_enough(&candidate, &last) {
            accepted.push(candidate);
        }
    }

    accepted
}

/// True when no two consecutive points share a direction.
pub fn is_alternating(points: &[SwingPoint]) -> bool {
    points.windows(2).all(|w| w[0].direction != w[1].direction)
}

/// Most recent point of the given direction, searching from the end.
pub fn latest_of(points: &[SwingPoint], direction: SwingDirection) -> Option<&SwingPoint> {
    points.iter().rev().find(|p| p.direction == direction)
}
