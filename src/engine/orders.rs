//! Order constraint pipeline.
//!
//! Runs in a fixed order: step rounding, position bounds, leverage cap,
//! minimum size, maximum size, budget. Each stage sees the output of the
//! previous one. A stage that drops an order may tag the tick's risk event.

use super::core::{Backtester, PendingOrder};
use super::results::BacktestError;
use crate::events::RiskEvent;
use crate::strategy::{Strategy, Ticker};
use crate::types::sgn;

impl Backtester {
    /// Apply every sizing constraint to `order` for a trader holding `position`.
    pub(super) fn apply_constraints<S: Strategy>(
        &self,
        strategy: &mut S,
        order: &mut PendingOrder,
        position: f64,
        ticker: &Ticker,
        last_price: f64,
        floor_balance: f64,
    ) -> Result<(), BacktestError> {
        order.size = self.market.adjust_size(order.size);
        order.size = clamp_to_bounds(order.size, position, self.config.min_balance, self.config.max_balance);

        if self.market.is_leveraged() {
            self.check_leverage_cap(strategy, order, position, ticker, last_price, floor_balance)?;
        }

        let min_size = self.market.min_tradable_size(self.config.min_size, last_price);
        let (size, notify) = enforce_min_size(order.size, min_size);
        order.size = size;
        order.notify &= notify;

        if let Some(max_size) = self.config.max_size {
            if order.size.abs() > max_size {
                order.size = max_size * sgn(order.size);
            }
        }

        if self.config.trade_within_budget
            && order.size * position > 0.0
            && strategy.calc_currency_allocation(order.size) < 0.0
        {
            order.size = 0.0;
            order.event = RiskEvent::NoBalance;
        }

        Ok(())
    }

    fn check_leverage_cap<S: Strategy>(
        &self,
        strategy: &mut S,
        order: &mut PendingOrder,
        position: f64,
        ticker: &Ticker,
        last_price: f64,
        floor_balance: f64,
    ) -> Result<(), BacktestError> {
        let max_leverage = self.config.effective_max_leverage(&self.market);
        let max_abs_position = floor_balance * max_leverage / last_price;
        let new_exposure = (position + order.size).abs();

        if new_exposure > position.abs() && new_exposure > max_abs_position {
            if self.config.accept_loss {
                strategy.reset();
                strategy.on_idle(&self.market, ticker, position, floor_balance)?;
                order.event = RiskEvent::AcceptLoss;
            } else {
                order.event = RiskEvent::MarginCall;
            }
            order.size = 0.0;
        }
        Ok(())
    }
}

/// Keep `position + size` inside `[min, max]`. An order that would cross a
/// bound lands exactly on it; a position already outside a bound cannot
/// trade at all.
pub fn clamp_to_bounds(size: f64, position: f64, min: Option<f64>, max: Option<f64>) -> f64 {
    let mut size = size;
    if let Some(max) = max {
        if position > max {
            size = 0.0;
        } else if position + size > max {
            size = max - position;
        }
    }
    if let Some(min) = min {
        if position < min {
            size = 0.0;
        } else if position + size < min {
            size = min - position;
        }
    }
    size
}

/// Round a too-small order up to `min_size`, or drop it when it is below
/// half of that. The flag is false when the order was dropped and the
/// strategy should not be notified.
pub fn enforce_min_size(size: f64, min_size: f64) -> (f64, bool) {
    if size == 0.0 || size.abs() >= min_size {
        return (size, true);
    }
    if size.abs() < min_size * 0.5 {
        (0.0, false)
    } else {
        (sgn(size) * min_size, true)
    }
}
