// backtest-core: price-driven position/balance simulation.
// a strategy proposes, the risk pipeline disposes, every tick leaves a verified record.
// all computation is deterministic with no external I/O.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: Timestamp, PriceObservation, sign helpers
//   2.x  market.rs: market info, asset-step rounding, minimum tradable size
//   3.x  config.rs: trader risk limits, presets, validation
//   4.x  strategy/: strategy capability trait, Rebalance, ScriptedStrategy
//   5.x  price_feed.rs: price source contract, replayable recordings
//   6.x  events.rs: per-tick risk events and counters
//   7.x  engine/: the fold: constraints, settlement, records, inversion
//   8.x  summary.rs: run summary for reports

pub mod config;
pub mod engine;
pub mod events;
pub mod market;
pub mod price_feed;
pub mod strategy;
pub mod summary;
pub mod types;

// re exports for convenience
pub use config::{ConfigError, TraderConfig};
pub use engine::*;
pub use events::*;
pub use market::*;
pub use price_feed::{PriceSource, ReplaySource};
pub use strategy::{
    AlertMode, OrderContext, OrderProposal, Rebalance, ScriptedStrategy, Strategy, StrategyError, Ticker,
    TradeCall, TradeFeedback,
};
pub use summary::RunSummary;
pub use types::*;
