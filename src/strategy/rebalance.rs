//! Constant-ratio rebalancer.
//!
//! Keeps `ratio` of equity in the asset. On spot markets equity is cash plus
//! position value; on leveraged markets it is the margin balance, so a ratio
//! above 1 means running leveraged. An optional budget caps the currency the
//! strategy claims, which lets the spend-aside mode sweep the rest.

use super::{OrderContext, OrderProposal, Strategy, StrategyError, Ticker, TradeFeedback};
use crate::market::MarketInfo;
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct Rebalance {
    ratio: f64,
    budget: Option<f64>,
    open_price: Option<f64>,
    last_balance: f64,
    last_price: f64,
    trades: u64,
}

impl Rebalance {
    pub fn new(ratio: f64) -> Self {
        Self {
            ratio,
            budget: None,
            open_price: None,
            last_balance: 0.0,
            last_price: 0.0,
            trades: 0,
        }
    }

    pub fn with_budget(mut self, budget: f64) -> Self {
        self.budget = Some(budget);
        self
    }

    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    pub fn trades(&self) -> u64 {
        self.trades
    }

    fn equity(&self, market: &MarketInfo, price: f64, position: f64, balance: f64) -> f64 {
        if market.is_leveraged() {
            balance
        } else {
            balance + position * price
        }
    }

    fn target_position(&self, market: &MarketInfo, price: f64, position: f64, balance: f64) -> f64 {
        let equity = self.equity(market, price, position, balance);
        let equity = match self.budget {
            Some(budget) => equity.min(budget),
            None => equity,
        };
        equity * self.ratio / price
    }
}

impl Strategy for Rebalance {
    fn calc_initial_position(
        &mut self,
        market: &MarketInfo,
        price: f64,
        _elapsed_hours: f64,
        balance: f64,
    ) -> Result<f64, StrategyError> {
        if price.is_nan() || price <= 0.0 {
            return Err(StrategyError::InvalidState(format!("initial price {} is not positive", price)));
        }
        self.last_price = price;
        self.last_balance = balance;
        Ok(self.target_position(market, price, 0.0, balance))
    }

    fn on_idle(
        &mut self,
        _market: &MarketInfo,
        ticker: &Ticker,
        _position: f64,
        balance: f64,
    ) -> Result<(), StrategyError> {
        self.last_price = ticker.last;
        self.last_balance = balance;
        Ok(())
    }

    fn get_new_order(
        &mut self,
        market: &MarketInfo,
        ctx: &OrderContext,
    ) -> Result<OrderProposal, StrategyError> {
        if ctx.price.is_nan() || ctx.price <= 0.0 {
            return Err(StrategyError::InvalidState(format!("order price {} is not positive", ctx.price)));
        }
        let target = self.target_position(market, ctx.price, ctx.position, ctx.balance);
        Ok(OrderProposal::market(target - ctx.position))
    }

    fn on_trade(
        &mut self,
        _market: &MarketInfo,
        price: f64,
        size: f64,
        position: f64,
        balance: f64,
    ) -> Result<TradeFeedback, StrategyError> {
        let prev_position = position - size;
        let open_price = match self.open_price {
            // adding in the same direction: volume-weighted entry
            Some(open) if prev_position * size > 0.0 => {
                (open * prev_position + price * size) / position
            }
            Some(open) if prev_position * position > 0.0 => open,
            _ => price,
        };
        self.open_price = (position != 0.0).then_some(open_price);
        if size != 0.0 {
            self.trades += 1;
        }
        self.last_price = price;
        self.last_balance = balance;
        Ok(TradeFeedback::neutral(price, open_price))
    }

    fn calc_currency_allocation(&self, _value: f64) -> f64 {
        match self.budget {
            Some(budget) => budget.min(self.last_balance.max(0.0)),
            None => self.last_balance,
        }
    }

    fn reset(&mut self) {
        self.open_price = None;
        self.trades = 0;
    }

    fn dump_state_pretty(&self, _market: &MarketInfo) -> Value {
        json!({
            "Ratio": self.ratio,
            "Budget": self.budget,
            "Open price": self.open_price,
            "Last price": self.last_price,
            "Trades": self.trades,
        })
    }
}
