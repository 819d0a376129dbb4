//! Replays a recorded list of decisions.
//!
//! Used to re-run a live session's decisions through the simulation and to
//! drive exact scenarios. Proposals are consumed one per order request; once
//! the script runs dry the strategy proposes nothing. Every call is counted
//! so callers can check how the core drove it.

use super::{OrderContext, OrderProposal, Strategy, StrategyError, Ticker, TradeFeedback};
use crate::market::MarketInfo;
use serde_json::{json, Value};
use std::collections::VecDeque;

/// One `on_trade` notification as seen by the strategy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TradeCall {
    pub price: f64,
    pub size: f64,
    pub position: f64,
    pub balance: f64,
}

#[derive(Debug, Clone, Default)]
pub struct ScriptedStrategy {
    initial_position: f64,
    orders: VecDeque<OrderProposal>,
    feedback: VecDeque<TradeFeedback>,
    allocation: f64,
    center_offset: f64,
    fail_initial: Option<String>,
    fail_at_order: Option<(usize, String)>,
    order_requests: usize,
    idle_calls: usize,
    resets: usize,
    contexts: Vec<OrderContext>,
    trade_calls: Vec<TradeCall>,
}

impl ScriptedStrategy {
    pub fn new(initial_position: f64) -> Self {
        Self {
            initial_position,
            ..Self::default()
        }
    }

    pub fn with_orders(mut self, sizes: impl IntoIterator<Item = f64>) -> Self {
        self.orders.extend(sizes.into_iter().map(OrderProposal::market));
        self
    }

    pub fn with_proposals(mut self, proposals: impl IntoIterator<Item = OrderProposal>) -> Self {
        self.orders.extend(proposals);
        self
    }

    /// Feedback returned by successive `on_trade` calls; neutral feedback at
    /// the trade price once exhausted.
    pub fn with_feedback(mut self, feedback: impl IntoIterator<Item = TradeFeedback>) -> Self {
        self.feedback.extend(feedback);
        self
    }

    /// Value returned by every currency-allocation query.
    pub fn with_allocation(mut self, allocation: f64) -> Self {
        self.allocation = allocation;
        self
    }

    /// Shift the center price away from the last price.
    pub fn with_center_offset(mut self, offset: f64) -> Self {
        self.center_offset = offset;
        self
    }

    pub fn failing_initial(mut self, reason: impl Into<String>) -> Self {
        self.fail_initial = Some(reason.into());
        self
    }

    /// Fail the `n`-th order request (0-based).
    pub fn failing_at_order(mut self, n: usize, reason: impl Into<String>) -> Self {
        self.fail_at_order = Some((n, reason.into()));
        self
    }

    pub fn order_requests(&self) -> usize {
        self.order_requests
    }

    pub fn idle_calls(&self) -> usize {
        self.idle_calls
    }

    pub fn resets(&self) -> usize {
        self.resets
    }

    pub fn contexts(&self) -> &[OrderContext] {
        &self.contexts
    }

    pub fn trade_calls(&self) -> &[TradeCall] {
        &self.trade_calls
    }
}

impl Strategy for ScriptedStrategy {
    fn calc_initial_position(
        &mut self,
        _market: &MarketInfo,
        _price: f64,
        _elapsed_hours: f64,
        _balance: f64,
    ) -> Result<f64, StrategyError> {
        match &self.fail_initial {
            Some(reason) => Err(StrategyError::failed("calc_initial_position", reason.clone())),
            None => Ok(self.initial_position),
        }
    }

    fn get_center_price(&self, last_price: f64, _position: f64) -> f64 {
        last_price + self.center_offset
    }

    fn on_idle(
        &mut self,
        _market: &MarketInfo,
        _ticker: &Ticker,
        _position: f64,
        _balance: f64,
    ) -> Result<(), StrategyError> {
        self.idle_calls += 1;
        Ok(())
    }

    fn get_new_order(
        &mut self,
        _market: &MarketInfo,
        ctx: &OrderContext,
    ) -> Result<OrderProposal, StrategyError> {
        let n = self.order_requests;
        self.order_requests += 1;
        if let Some((at, reason)) = &self.fail_at_order {
            if *at == n {
                return Err(StrategyError::failed("get_new_order", reason.clone()));
            }
        }
        self.contexts.push(*ctx);
        Ok(self.orders.pop_front().unwrap_or_default())
    }

    fn on_trade(
        &mut self,
        _market: &MarketInfo,
        price: f64,
        size: f64,
        position: f64,
        balance: f64,
    ) -> Result<TradeFeedback, StrategyError> {
        self.trade_calls.push(TradeCall {
            price,
            size,
            position,
            balance,
        });
        Ok(self
            .feedback
            .pop_front()
            .unwrap_or_else(|| TradeFeedback::neutral(price, price)))
    }

    fn calc_currency_allocation(&self, _value: f64) -> f64 {
        self.allocation
    }

    fn reset(&mut self) {
        self.resets += 1;
    }

    fn dump_state_pretty(&self, _market: &MarketInfo) -> Value {
        json!({
            "Order requests": self.order_requests,
            "Remaining": self.orders.len(),
            "Resets": self.resets,
        })
    }
}
