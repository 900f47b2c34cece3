//! Price candles.
//!
//! Candles are immutable once produced. The history sequence that owns them
//! lives in [`crate::state::SystemState`] and only ever grows at the end.

use crate::types::{Price, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Bar duration. The engine runs on either one-second or one-minute bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandleDuration {
    OneSecond,
    OneMinute,
}

impl CandleDuration {
    pub fn as_millis(&self) -> i64 {
        match self {
            CandleDuration::OneSecond => 1_000,
            CandleDuration::OneMinute => 60_000,
        }
    }
}

/// One OHLCV bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    pub open: Price,
    pub high: Price,
    pub low: Price,
    pub close: Price,
    pub volume: Decimal,
    /// Open time in milliseconds.
    pub timestamp: Timestamp,
    pub duration: CandleDuration,
}

impl Candle {
    /// Builds a candle, rejecting bars whose high/low do not bracket open and close.
    pub fn new(
        open: Price,
        high: Price,
        low: Price,
        close: Price,
        volume: Decimal,
        timestamp: Timestamp,
        duration: CandleDuration,
    ) -> Result<Self, CandleError> {
        let candle = Self {
            open,
            high,
            low,
            close,
            volume,
            timestamp,
            duration,
        };
        candle.validate()?;
        Ok(candle)
    }

    pub fn validate(&self) -> Result<(), CandleError> {
        if self.low > self.high {
            return Err(CandleError::InvertedRange {
                timestamp: self.timestamp,
            });
        }
        if self.open > self.high || self.open < self.low {
            return Err(CandleError::OpenOutsideRange {
                timestamp: self.timestamp,
            });
        }
        if self.close > self.high || self.close < self.low {
            return Err(CandleError::CloseOutsideRange {
                timestamp: self.timestamp,
            });
        }
        if self.volume < Decimal::ZERO {
            return Err(CandleError::NegativeVolume {
                timestamp: self.timestamp,
            });
        }
        Ok(())
    }

    pub fn is_bullish(&self) -> bool {
        self.close >= self.open
    }

    pub fn range(&self) -> Decimal {
        self.high.value() - self.low.value()
    }

    /// Close time (exclusive).
    pub fn end_timestamp(&self) -> Timestamp {
        self.timestamp.plus_millis(self.duration.as_millis())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CandleError {
    #[error("Candle at {timestamp} has low above high")]
    InvertedRange { timestamp: Timestamp },

    #[error("Candle at {timestamp} opens outside its high/low range")]
    OpenOutsideRange { timestamp: Timestamp },

    #[error("Candle at {timestamp} closes outside its high/low range")]
    CloseOutsideRange { timestamp: Timestamp },

    #[error("Candle at {timestamp} has negative volume")]
    NegativeVolume { timestamp: Timestamp },
}
