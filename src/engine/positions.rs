//! Position and balance settlement for spot and leveraged markets.

use super::core::{Backtester, FoldState, PendingOrder};
use super::results::BacktestError;
use crate::events::RiskEvent;
use crate::strategy::{AlertMode, Strategy, Ticker};
use crate::types::sgn;

/// Relative slack, in units of the trade's notional, before a spot buy counts
/// as an overdraft.
const OVERDRAFT_TOLERANCE: f64 = 1e-10;

impl Backtester {
    /// Spot: the balance pays the full notional and the position cannot go short.
    pub(super) fn settle_spot<S: Strategy>(
        &self,
        strategy: &mut S,
        order: &mut PendingOrder,
        state: &mut FoldState,
        ticker: &Ticker,
        floor_balance: f64,
    ) -> Result<(), BacktestError> {
        let position = state.position;
        if order.size + position < 0.0 {
            order.size = -position;
        }

        let mut change = order.size * order.price;
        let overdrawn = state.balance - change < -change.abs() * OVERDRAFT_TOLERANCE;

        if overdrawn {
            if self.engine.allow_negative_balance {
                order.event = RiskEvent::NoBalance;
            } else {
                if self.config.accept_loss {
                    strategy.reset();
                    strategy.on_idle(&self.market, ticker, position, floor_balance)?;
                    order.event = RiskEvent::AcceptLoss;
                }
                order.size = 0.0;
                change = 0.0;
            }
        }

        state.balance -= change;
        // spending the whole balance leaves rounding noise, not debt
        if !overdrawn && state.balance < 0.0 {
            state.balance = 0.0;
        }
        state.position += order.size;
        Ok(())
    }

    /// Leveraged: the balance is margin, already marked to market for this tick.
    /// A forced reduction executes at `tick_price`, not at a strategy-quoted price.
    pub(super) fn settle_leveraged(
        &self,
        order: &mut PendingOrder,
        state: &mut FoldState,
        dprice: f64,
        prev_balance: f64,
        floor_balance: f64,
        tick_price: f64,
    ) {
        let position = state.position;

        if state.balance <= 0.0 && prev_balance > 0.0 {
            order.event = RiskEvent::Liquidation;
            order.size = -position;
        } else if state.balance <= 0.0 {
            order.event = RiskEvent::NoBalance;
        } else if state.balance + dprice * (position + order.size) < 0.0 {
            order.event = RiskEvent::MarginCall;
        }

        if order.size == 0.0 && self.config.max_leverage.is_some() && self.config.reduce_on_leverage {
            let max_leverage = self.config.effective_max_leverage(&self.market);
            let max_position = floor_balance * max_leverage / tick_price;
            if max_position < position.abs() {
                order.size = max_position * sgn(position) - position;
                order.price = tick_price;
                order.alert = AlertMode::Disabled;
            }
        }

        state.position += order.size;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TraderConfig;
    use crate::engine::EngineConfig;
    use crate::market::MarketInfo;
    use crate::strategy::ScriptedStrategy;
    use crate::types::Timestamp;

    fn order(size: f64, price: f64) -> PendingOrder {
        PendingOrder {
            size,
            price,
            alert: AlertMode::Enabled,
            notify: true,
            event: RiskEvent::NoEvent,
        }
    }

    fn state(position: f64, balance: f64) -> FoldState {
        FoldState {
            position,
            balance,
            realized_pl: 0.0,
            total_spent: 0.0,
        }
    }

    fn ticker() -> Ticker {
        Ticker::at_price(10.0, Timestamp::from_millis(0))
    }

    #[test]
    fn spot_cannot_sell_more_than_held() {
        let bt = Backtester::new(MarketInfo::spot(), TraderConfig::default(), EngineConfig::default());
        let mut s = ScriptedStrategy::new(0.0);
        let mut o = order(-8.0, 10.0);
        let mut st = state(5.0, 0.0);
        bt.settle_spot(&mut s, &mut o, &mut st, &ticker(), 0.0).unwrap();
        assert_eq!(o.size, -5.0);
        assert_eq!(st.position, 0.0);
        assert_eq!(st.balance, 50.0);
    }

    #[test]
    fn spot_overdraft_is_dropped() {
        let bt = Backtester::new(MarketInfo::spot(), TraderConfig::default(), EngineConfig::default());
        let mut s = ScriptedStrategy::new(0.0);
        let mut o = order(3.0, 10.0);
        let mut st = state(0.0, 20.0);
        bt.settle_spot(&mut s, &mut o, &mut st, &ticker(), 20.0).unwrap();
        assert_eq!(o.size, 0.0);
        assert_eq!(o.event, RiskEvent::NoEvent);
        assert_eq!(st.balance, 20.0);
        assert_eq!(s.resets(), 0);
    }

    #[test]
    fn spot_buy_of_whole_balance_survives_rounding() {
        let bt = Backtester::new(MarketInfo::spot(), TraderConfig::default(), EngineConfig::default());
        let mut s = ScriptedStrategy::new(0.0);
        // 3 * 0.1 rounds to 0.30000000000000004
        let mut o = order(3.0, 0.1);
        let mut st = state(0.0, 0.3);
        bt.settle_spot(&mut s, &mut o, &mut st, &ticker(), 0.3).unwrap();
        assert_eq!(o.size, 3.0);
        assert_eq!(o.event, RiskEvent::NoEvent);
        assert_eq!(st.position, 3.0);
        assert_eq!(st.balance, 0.0);
    }

    #[test]
    fn spot_overdraft_with_accept_loss_resets() {
        let bt = Backtester::new(MarketInfo::spot(), TraderConfig::conservative(), EngineConfig::default());
        let mut s = ScriptedStrategy::new(0.0);
        let mut o = order(3.0, 10.0);
        let mut st = state(0.0, 20.0);
        bt.settle_spot(&mut s, &mut o, &mut st, &ticker(), 20.0).unwrap();
        assert_eq!(o.event, RiskEvent::AcceptLoss);
        assert_eq!(o.size, 0.0);
        assert_eq!(s.resets(), 1);
        assert_eq!(s.idle_calls(), 1);
    }

    #[test]
    fn spot_overdraft_allowed_when_permitted() {
        let engine = EngineConfig {
            allow_negative_balance: true,
            ..EngineConfig::default()
        };
        let bt = Backtester::new(MarketInfo::spot(), TraderConfig::default(), engine);
        let mut s = ScriptedStrategy::new(0.0);
        let mut o = order(3.0, 10.0);
        let mut st = state(0.0, 20.0);
        bt.settle_spot(&mut s, &mut o, &mut st, &ticker(), 20.0).unwrap();
        assert_eq!(o.event, RiskEvent::NoBalance);
        assert_eq!(st.balance, -10.0);
        assert_eq!(st.position, 3.0);
    }

    #[test]
    fn leveraged_liquidation_flattens() {
        let bt = Backtester::new(MarketInfo::perpetual(10.0), TraderConfig::default(), EngineConfig::default());
        let mut o = order(0.0, 87.0);
        // balance was +10 before marking, -3 after
        let mut st = state(1.0, -3.0);
        bt.settle_leveraged(&mut o, &mut st, -13.0, 10.0, 10.0, 87.0);
        assert_eq!(o.event, RiskEvent::Liquidation);
        assert_eq!(o.size, -1.0);
        assert_eq!(st.position, 0.0);
    }

    #[test]
    fn liquidation_ignores_the_proposed_order() {
        let bt = Backtester::new(MarketInfo::perpetual(10.0), TraderConfig::default(), EngineConfig::default());
        let mut o = order(-0.5, 87.0);
        let mut st = state(1.0, -3.0);
        bt.settle_leveraged(&mut o, &mut st, -13.0, 10.0, 10.0, 87.0);
        assert_eq!(o.event, RiskEvent::Liquidation);
        assert_eq!(o.size, -1.0);
        assert_eq!(st.position, 0.0);
    }

    #[test]
    fn forced_reduction_uses_tick_price() {
        let bt = Backtester::new(MarketInfo::perpetual(10.0), TraderConfig::leveraged(2.0), EngineConfig::default());
        // strategy quoted 45 but its order was zeroed; the tick printed 50
        let mut o = order(0.0, 45.0);
        let mut st = state(10.0, 100.0);
        bt.settle_leveraged(&mut o, &mut st, -5.0, 150.0, 100.0, 50.0);
        assert_eq!(o.price, 50.0);
        assert_eq!(o.size, -6.0);
        assert_eq!(st.position, 4.0);
    }

    #[test]
    fn leveraged_exhausted_balance_is_no_balance() {
        let bt = Backtester::new(MarketInfo::perpetual(10.0), TraderConfig::default(), EngineConfig::default());
        let mut o = order(0.0, 80.0);
        let mut st = state(0.0, -3.0);
        bt.settle_leveraged(&mut o, &mut st, -7.0, -3.0, 0.0, 80.0);
        assert_eq!(o.event, RiskEvent::NoBalance);
        assert_eq!(o.size, 0.0);
    }

    #[test]
    fn leveraged_projected_margin_call_keeps_order() {
        let bt = Backtester::new(MarketInfo::perpetual(10.0), TraderConfig::default(), EngineConfig::default());
        let mut o = order(5.0, 90.0);
        let mut st = state(5.0, 20.0);
        // 20 + (-10 * 10) < 0
        bt.settle_leveraged(&mut o, &mut st, -10.0, 70.0, 70.0, 90.0);
        assert_eq!(o.event, RiskEvent::MarginCall);
        assert_eq!(o.size, 5.0);
        assert_eq!(st.position, 10.0);
    }

    #[test]
    fn reduce_on_leverage_trims_position() {
        let bt = Backtester::new(MarketInfo::perpetual(10.0), TraderConfig::leveraged(2.0), EngineConfig::default());
        let mut o = order(0.0, 50.0);
        let mut st = state(-10.0, 100.0);
        // 100 * 2 / 50 = 4 supportable, short 10 is too much
        bt.settle_leveraged(&mut o, &mut st, 1.0, 110.0, 100.0, 50.0);
        assert_eq!(o.size, 6.0);
        assert_eq!(o.alert, AlertMode::Disabled);
        assert_eq!(st.position, -4.0);
    }
}
