// 7.0: simulation core. one left-to-right fold over a price source: constraint
// pipeline, position/balance update, record emission, then inversion for
// inverse-quoted markets. deterministic, single-threaded, no external I/O.

mod config;
mod core;
mod inversion;
mod orders;
mod positions;
mod records;
mod results;

pub use config::EngineConfig;
pub use core::Backtester;
pub use inversion::invert_trades;
pub use orders::{clamp_to_bounds, enforce_min_size};
pub use results::{BacktestError, BacktestOutcome, FailureReport, TradeRecord, TradeSequence};
