// 8.0: structure engine. runs each candle through swing detection, zone
// reconciliation and the order lifecycle, in that order.
// deterministic and event-driven with no external I/O.

mod config;
mod coordinator;
mod core;
mod desk;
mod results;
mod tick;

pub use config::EngineConfig;
pub use coordinator::OrderCoordinator;
pub use core::Engine;
pub use desk::Desk;
pub use results::{Admission, EngineError, TickOutcome};
