// 7.0 config.rs: all settings in one place. swing detection, zones, placement, engine.
// 7.1 presets per candle duration. loading from files or CLI is the host's job.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::candle::CandleDuration;
use crate::engine::EngineConfig;
use crate::placement::PlacementParams;
use crate::swing::SwingParams;
use crate::zone::ZoneParams;

// Complete configuration for one engine
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StructureConfig {
    pub swing: SwingParams,
    pub zones: ZoneParams,
    pub placement: PlacementParams,
    pub engine: EngineConfig,
}

impl StructureConfig {
    /** 7.2: preset tuned for the bar duration. one-second bars use the defaults */
    pub fn for_duration(duration: CandleDuration) -> Self {
        let mut config = Self::default();
        if duration == CandleDuration::OneMinute {
            // minute bars carry more range, so fewer confirmations and a size floor
            config.swing.min_confirmations = 2;
            config.swing.min_swing_size = Decimal::new(20, 1); // 2.0
        }
        config
    }

    // Same tick size for zone buffers and proximity entries
    pub fn with_tick_size(mut self, tick_size: Decimal) -> Self {
        self.zones.tick_size = tick_size;
        self.placement.tick_size = tick_size;
        self
    }

    // Validate the configuration for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        // swing checks
        if self.swing.min_confirmations == 0 {
            return Err(ConfigError::InvalidSwing {
                reason: "Need at least 1 confirmation candle".to_string(),
            });
        }

        // zone checks
        if self.zones.tick_size <= Decimal::ZERO {
            return Err(ConfigError::InvalidZones {
                reason: "Zone tick size must be positive".to_string(),
            });
        }

        // placement checks
        if self.placement.tick_size <= Decimal::ZERO {
            return Err(ConfigError::InvalidPlacement {
                reason: "Placement tick size must be positive".to_string(),
            });
        }

        if self.placement.loss_cooldown_ms < 0 {
            return Err(ConfigError::InvalidPlacement {
                reason: "Loss cooldown cannot be negative".to_string(),
            });
        }

        // engine checks
        // history shorter than the swing window would never yield a swing
        if self.engine.max_candles < self.swing.min_window() {
            return Err(ConfigError::InvalidEngine {
                reason: format!(
                    "max_candles {} is below the swing window {}",
                    self.engine.max_candles,
                    self.swing.min_window()
                ),
            });
        }

        Ok(())
    }
}

// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid swing params: {reason}")]
    InvalidSwing { reason: String },

    #[error("Invalid zone params: {reason}")]
    InvalidZones { reason: String },

    #[error("Invalid placement params: {reason}")]
    InvalidPlacement { reason: String },

    #[error("Invalid engine params: {reason}")]
    InvalidEngine { reason: String },
}
