// 7.0.2: trade records, run outcomes and errors.

use crate::config::ConfigError;
use crate::events::RiskEvent;
use crate::strategy::StrategyError;
use crate::types::{PriceObservation, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Immutable snapshot of the account after one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    /// Execution price and tick time
    pub price: PriceObservation,
    pub event: RiskEvent,
    pub order_size: f64,
    pub position: f64,
    /// Working balance plus everything spent aside
    pub balance: f64,
    pub unspent_balance: f64,
    pub realized_pl: f64,
    pub neutral_price: f64,
    pub open_price: f64,
    pub norm_profit: f64,
    pub norm_accum: f64,
    pub norm_profit_total: f64,
    pub strategy_snapshot: Value,
}

impl TradeRecord {
    /// Record 0: starting position and balance, nothing traded yet.
    pub fn initial(
        price: PriceObservation,
        position: f64,
        balance: f64,
        neutral_price: f64,
        strategy_snapshot: Value,
    ) -> Self {
        Self {
            price,
            event: RiskEvent::NoEvent,
            order_size: 0.0,
            position,
            balance,
            unspent_balance: balance,
            realized_pl: 0.0,
            neutral_price,
            open_price: price.price,
            norm_profit: 0.0,
            norm_accum: 0.0,
            norm_profit_total: 0.0,
            strategy_snapshot,
        }
    }

    /// Trailing marker for an interrupted run: the last state one hour later,
    /// with the failure in place of the strategy snapshot. Not a trade.
    pub fn sentinel(last: &TradeRecord, message: &str) -> Self {
        Self {
            price: PriceObservation::new(last.price.price, last.price.time.add_millis(Timestamp::HOUR_MS)),
            event: RiskEvent::NoEvent,
            order_size: 0.0,
            strategy_snapshot: json!({ "error": message }),
            ..last.clone()
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.strategy_snapshot.get("error").is_some()
    }
}

/// Ordered records; index 0 is the initial state.
pub type TradeSequence = Vec<TradeRecord>;

/// Where and why an interrupted run stopped.
#[derive(Debug, Clone, PartialEq)]
pub struct FailureReport {
    pub error: BacktestError,
    /// Index the failing tick's record would have taken
    pub record_index: usize,
    /// Time of the failing observation
    pub time: Timestamp,
}

/// Result of a run that produced at least the initial record.
#[derive(Debug, Clone, PartialEq)]
pub enum BacktestOutcome {
    /// Source exhausted normally
    Completed(TradeSequence),
    /// Stopped by a failure; `trades` ends with a sentinel record
    Interrupted {
        trades: TradeSequence,
        failure: FailureReport,
    },
}

impl BacktestOutcome {
    pub fn trades(&self) -> &[TradeRecord] {
        match self {
            BacktestOutcome::Completed(trades) => trades,
            BacktestOutcome::Interrupted { trades, .. } => trades,
        }
    }

    pub fn into_trades(self) -> TradeSequence {
        match self {
            BacktestOutcome::Completed(trades) => trades,
            BacktestOutcome::Interrupted { trades, .. } => trades,
        }
    }

    pub fn failure(&self) -> Option<&FailureReport> {
        match self {
            BacktestOutcome::Completed(_) => None,
            BacktestOutcome::Interrupted { failure, .. } => Some(failure),
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, BacktestOutcome::Completed(_))
    }

    /// Records that are real ticks, i.e. without the trailing sentinel.
    pub fn real_trades(&self) -> &[TradeRecord] {
        match self {
            BacktestOutcome::Completed(trades) => trades,
            BacktestOutcome::Interrupted { trades, .. } => &trades[..trades.len().saturating_sub(1)],
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BacktestError {
    #[error("Strategy failure: {0}")]
    Strategy(#[from] StrategyError),

    #[error("Invalid price {price} at {time}")]
    InvalidPrice { price: f64, time: Timestamp },

    #[error("Non-finite {field} at {time}")]
    NonFinite { field: &'static str, time: Timestamp },

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}
