//! Strategy capability interface.
//!
//! The simulation core never looks inside a strategy. It drives it through
//! the calls below, in a fixed order per tick: center price, idle hook,
//! order proposal, then (unless suppressed) trade notification. `reset` is a
//! regular state transition used by the accept-loss policy.
//!
//! Implementations are owned by one run at a time. `&mut S` and
//! `Box<dyn Strategy>` forward to the inner strategy so a caller can keep
//! hold of a concrete strategy and inspect it after the run.

mod rebalance;
mod scripted;

pub use rebalance::Rebalance;
pub use scripted::{ScriptedStrategy, TradeCall};

use crate::market::MarketInfo;
use crate::types::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Ticker handed to the idle hook. The simulation has a single price, so
/// bid, ask and last coincide.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ticker {
    pub bid: f64,
    pub ask: f64,
    pub last: f64,
    pub time: Timestamp,
}

impl Ticker {
    pub fn at_price(price: f64, time: Timestamp) -> Self {
        Self {
            bid: price,
            ask: price,
            last: price,
            time,
        }
    }
}

/// Whether a proposal may trigger the strategy's alert handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AlertMode {
    #[default]
    Enabled,
    Disabled,
}

/// Everything the strategy sees when asked for an order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderContext {
    /// 90/10 blend of the last trade price and the current price
    pub ref_price: f64,
    pub price: f64,
    /// -1 when the price rose above the center price, +1 otherwise
    pub direction: f64,
    pub position: f64,
    /// Balance floored at zero
    pub balance: f64,
    pub dry_run: bool,
}

/// Order proposed by the strategy, before any constraint is applied.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OrderProposal {
    /// Signed size; positive buys, negative sells
    pub size: f64,
    /// Execution price override; the tick price is used when absent
    pub price: Option<f64>,
    pub alert: AlertMode,
}

impl OrderProposal {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn market(size: f64) -> Self {
        Self {
            size,
            ..Self::default()
        }
    }

    pub fn limit(size: f64, price: f64) -> Self {
        Self {
            size,
            price: Some(price),
            alert: AlertMode::Enabled,
        }
    }

    /// Execution price if one was given and it is usable
    pub fn execution_price(&self) -> Option<f64> {
        self.price.filter(|p| p.is_finite() && *p > 0.0)
    }
}

/// Strategy bookkeeping reported back after a trade.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradeFeedback {
    pub neutral_price: f64,
    pub norm_accum: f64,
    pub norm_profit: f64,
    pub open_price: f64,
}

impl TradeFeedback {
    /// Feedback with no normalized profit or accumulation
    pub fn neutral(neutral_price: f64, open_price: f64) -> Self {
        Self {
            neutral_price,
            norm_accum: 0.0,
            norm_profit: 0.0,
            open_price,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StrategyError {
    #[error("{call} failed: {reason}")]
    Failed { call: &'static str, reason: String },

    #[error("Invalid strategy state: {0}")]
    InvalidState(String),
}

impl StrategyError {
    pub fn failed(call: &'static str, reason: impl Into<String>) -> Self {
        Self::Failed {
            call,
            reason: reason.into(),
        }
    }
}

/// Capability interface consumed by the simulation core.
pub trait Strategy {
    /// Position to hold before the first tick.
    fn calc_initial_position(
        &mut self,
        market: &MarketInfo,
        price: f64,
        elapsed_hours: f64,
        balance: f64,
    ) -> Result<f64, StrategyError>;

    /// Price around which the strategy considers itself balanced.
    fn get_center_price(&self, last_price: f64, _position: f64) -> f64 {
        last_price
    }

    fn on_idle(
        &mut self,
        market: &MarketInfo,
        ticker: &Ticker,
        position: f64,
        balance: f64,
    ) -> Result<(), StrategyError>;

    fn get_new_order(
        &mut self,
        market: &MarketInfo,
        ctx: &OrderContext,
    ) -> Result<OrderProposal, StrategyError>;

    fn on_trade(
        &mut self,
        market: &MarketInfo,
        price: f64,
        size: f64,
        position: f64,
        balance: f64,
    ) -> Result<TradeFeedback, StrategyError>;

    /// Currency the strategy wants allocated. Negative means none available.
    fn calc_currency_allocation(&self, value: f64) -> f64;

    fn reset(&mut self);

    /// Human-readable state for the trade record.
    fn dump_state_pretty(&self, market: &MarketInfo) -> Value;
}

impl<S: Strategy + ?Sized> Strategy for &mut S {
    fn calc_initial_position(
        &mut self,
        market: &MarketInfo,
        price: f64,
        elapsed_hours: f64,
        balance: f64,
    ) -> Result<f64, StrategyError> {
        (**self).calc_initial_position(market, price, elapsed_hours, balance)
    }

    fn get_center_price(&self, last_price: f64, position: f64) -> f64 {
        (**self).get_center_price(last_price, position)
    }

    fn on_idle(
        &mut self,
        market: &MarketInfo,
        ticker: &Ticker,
        position: f64,
        balance: f64,
    ) -> Result<(), StrategyError> {
        (**self).on_idle(market, ticker, position, balance)
    }

    fn get_new_order(
        &mut self,
        market: &MarketInfo,
        ctx: &OrderContext,
    ) -> Result<OrderProposal, StrategyError> {
        (**self).get_new_order(market, ctx)
    }

    fn on_trade(
        &mut self,
        market: &MarketInfo,
        price: f64,
        size: f64,
        position: f64,
        balance: f64,
    ) -> Result<TradeFeedback, StrategyError> {
        (**self).on_trade(market, price, size, position, balance)
    }

    fn calc_currency_allocation(&self, value: f64) -> f64 {
        (**self).calc_currency_allocation(value)
    }

    fn reset(&mut self) {
        (**self).reset()
    }

    fn dump_state_pretty(&self, market: &MarketInfo) -> Value {
        (**self).dump_state_pretty(market)
    }
}

impl<S: Strategy + ?Sized> Strategy for Box<S> {
    fn calc_initial_position(
        &mut self,
        market: &MarketInfo,
        price: f64,
        elapsed_hours: f64,
        balance: f64,
    ) -> Result<f64, StrategyError> {
        (**self).calc_initial_position(market, price, elapsed_hours, balance)
    }

    fn get_center_price(&self, last_price: f64, position: f64) -> f64 {
        (**self).get_center_price(last_price, position)
    }

    fn on_idle(
        &mut self,
        market: &MarketInfo,
        ticker: &Ticker,
        position: f64,
        balance: f64,
    ) -> Result<(), StrategyError> {
        (**self).on_idle(market, ticker, position, balance)
    }

    fn get_new_order(
        &mut self,
        market: &MarketInfo,
        ctx: &OrderContext,
    ) -> Result<OrderProposal, StrategyError> {
        (**self).get_new_order(market, ctx)
    }

    fn on_trade(
        &mut self,
        market: &MarketInfo,
        price: f64,
        size: f64,
        position: f64,
        balance: f64,
    ) -> Result<TradeFeedback, StrategyError> {
        (**self).on_trade(market, price, size, position, balance)
    }

    fn calc_currency_allocation(&self, value: f64) -> f64 {
        (**self).calc_currency_allocation(value)
    }

    fn reset(&mut self) {
        (**self).reset()
    }

    fn dump_state_pretty(&self, market: &MarketInfo) -> Value {
        (**self).dump_state_pretty(market)
    }
}
