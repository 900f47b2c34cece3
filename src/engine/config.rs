//! Engine configuration options.

use serde::{Deserialize, Serialize};

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum number of candles to retain per contract. Swings are
    /// recomputed over whatever is retained.
    pub max_candles: usize,
    /// Stop polling strategies once the account reports a profitable day.
    pub halt_when_profitable: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_candles: 10_000,
            halt_when_profitable: false,
        }
    }
}
