// structure-core: market structure engine for futures candles.
// swing points feed supply/demand zones, zones and strategies feed a single order.
// all computation is deterministic with no external I/O.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: ContractId, OrderId, OrderType, Price, Timestamp
//   2.x  candle.rs: OHLCV bars, one-second and one-minute
//   3.x  swing.rs: swing point detection with alternation filter
//   4.x  zone.rs: plan zones, invalidation rules, zone proposal from swings
//   4.1  reconcile.rs: dedup, close, merge of the zone history
//   4.2  events.rs: zone diff and order events for audit
//   5.x  order.rs: order record, status table, single-slot ledger
//   5.1  placement.rs: per entry kind placement predicates
//   5.2  strategy.rs: strategy registry (candidate orders)
//   5.3  account.rs: broker/account collaborator (fills, exits)
//   6.x  state.rs: per-contract state threaded tick to tick
//   7.x  config.rs: swing, zone, placement and engine params, presets
//   8.x  engine/: tick pipeline, order coordinator, multi-contract desk

// structure modules
pub mod candle;
pub mod events;
pub mod reconcile;
pub mod swing;
pub mod types;
pub mod zone;

// order lifecycle modules
pub mod account;
pub mod order;
pub mod placement;
pub mod strategy;

// engine modules
pub mod config;
pub mod engine;
pub mod state;

// re exports for convenience
pub use account::*;
pub use candle::*;
pub use config::*;
pub use engine::*;
pub use events::*;
pub use order::*;
pub use placement::*;
pub use reconcile::*;
pub use state::*;
pub use strategy::*;
pub use swing::*;
pub use types::*;
pub use zone::*;
