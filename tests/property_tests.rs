//! Property-based tests for the simulation fold.
//!
//! These tests verify record invariants hold under random price paths and
//! random order streams.

use backtest_core::{
    invert_trades, Backtester, EngineConfig, MarketInfo, ReplaySource, RiskEvent, ScriptedStrategy, Timestamp,
    TradeFeedback, TradeRecord, TraderConfig,
};
use proptest::prelude::*;

// Strategies for generating test data
fn price_strategy() -> impl Strategy<Value = f64> {
    (1u32..20_000u32).prop_map(|x| x as f64 / 100.0) // 0.01 to 200
}

fn coarse_price_strategy() -> impl Strategy<Value = f64> {
    (1u32..=5u32).prop_map(|x| x as f64 * 10.0) // few levels, repeats are likely
}

fn order_strategy() -> impl Strategy<Value = f64> {
    (-500i32..=500i32).prop_map(|x| x as f64 / 100.0) // -5 to 5
}

fn feedback_strategy() -> impl Strategy<Value = TradeFeedback> {
    (-100i32..100, -100i32..100).prop_map(|(accum, profit)| TradeFeedback {
        neutral_price: 1.0,
        norm_accum: accum as f64 / 1000.0,
        norm_profit: profit as f64 / 10.0,
        open_price: 1.0,
    })
}

fn source(prices: &[f64]) -> ReplaySource {
    ReplaySource::from_prices(Timestamp::from_millis(0), 60_000, prices)
}

fn run(bt: &Backtester, strategy: ScriptedStrategy, prices: &[f64]) -> Vec<TradeRecord> {
    bt.run(strategy, source(prices).replay())
        .expect("run produced at least one record")
        .into_trades()
}

proptest! {
    /// Spot balance never goes negative without permission
    #[test]
    fn spot_balance_non_negative(
        prices in prop::collection::vec(price_strategy(), 1..60),
        orders in prop::collection::vec(order_strategy(), 0..60),
        initial in (0u32..2_000u32).prop_map(|x| x as f64 / 100.0), // may cost more than the balance
        accept_loss in any::<bool>(),
    ) {
        let config = TraderConfig { accept_loss, ..TraderConfig::default() };
        let bt = Backtester::new(MarketInfo::spot(), config, EngineConfig::with_balance(500.0));
        let trades = run(&bt, ScriptedStrategy::new(initial).with_orders(orders), &prices);

        for r in &trades {
            prop_assert!(r.balance >= 0.0, "negative balance {}", r.balance);
            prop_assert!(r.position >= -1e-9, "spot position went short: {}", r.position);
        }
    }

    /// Each record's position is the previous position plus its order
    #[test]
    fn position_continuity(
        prices in prop::collection::vec(price_strategy(), 1..60),
        orders in prop::collection::vec(order_strategy(), 0..60),
        leverage in prop::sample::select(vec![0.0, 5.0, 20.0]),
    ) {
        let bt = Backtester::new(MarketInfo::perpetual(leverage), TraderConfig::default(), EngineConfig::with_balance(1000.0));
        let trades = run(&bt, ScriptedStrategy::new(1.0).with_orders(orders), &prices);

        for pair in trades.windows(2) {
            let expected = pair[0].position + pair[1].order_size;
            prop_assert!((pair[1].position - expected).abs() < 1e-9);
        }
    }

    /// Total normalized profit is profit plus accumulation at the record price
    #[test]
    fn norm_profit_total_identity(
        prices in prop::collection::vec(price_strategy(), 1..40),
        orders in prop::collection::vec(order_strategy(), 0..40),
        feedback in prop::collection::vec(feedback_strategy(), 0..40),
    ) {
        let bt = Backtester::new(MarketInfo::perpetual(10.0), TraderConfig::default(), EngineConfig::with_balance(1000.0));
        let strategy = ScriptedStrategy::new(0.0).with_orders(orders).with_feedback(feedback);
        let trades = run(&bt, strategy, &prices);

        for r in &trades {
            let expected = r.norm_profit + r.norm_accum * r.price.price;
            prop_assert!((r.norm_profit_total - expected).abs() < 1e-9 * (1.0 + expected.abs()));
        }
    }

    /// Zero-delta ticks are skipped and never add records
    #[test]
    fn repeated_prices_are_skipped(
        prices in prop::collection::vec(coarse_price_strategy(), 1..80),
    ) {
        let bt = Backtester::new(MarketInfo::spot(), TraderConfig::default(), EngineConfig::with_balance(100.0));
        let trades = run(&bt, ScriptedStrategy::new(0.0), &prices);

        prop_assert!(trades.len() <= prices.len() + 1);
        let mut distinct = prices.clone();
        distinct.dedup();
        prop_assert_eq!(trades.len(), distinct.len());
        for pair in trades.windows(2) {
            prop_assert!(pair[0].price.price != pair[1].price.price);
        }
    }

    /// An inverted run matches the plain run with flipped signs and reciprocal prices
    #[test]
    fn inversion_preserves_magnitudes(
        prices in prop::collection::vec(price_strategy(), 1..40),
        orders in prop::collection::vec(order_strategy(), 0..40),
    ) {
        let engine = EngineConfig::with_balance(1000.0);
        let plain = Backtester::new(MarketInfo::perpetual(10.0), TraderConfig::default(), engine.clone());
        let inverse = Backtester::new(MarketInfo::inverse_perpetual(10.0), TraderConfig::default(), engine);

        let strategy = ScriptedStrategy::new(2.0).with_orders(orders);
        let a = run(&plain, strategy.clone(), &prices);
        let mut b = run(&inverse, strategy, &prices);

        prop_assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(&b) {
            prop_assert_eq!(x.position.abs(), y.position.abs());
            prop_assert_eq!(x.position, -y.position);
            prop_assert!((x.price.price * y.price.price - 1.0).abs() < 1e-12);
            prop_assert_eq!(x.balance, y.balance);
        }

        // undoing the inversion restores the plain run's figures
        invert_trades(&mut b);
        for (x, y) in a.iter().zip(&b) {
            prop_assert_eq!(x.position, y.position);
            prop_assert!((x.price.price - y.price.price).abs() < 1e-9 * x.price.price);
        }
    }

    /// A liquidation only happens on the tick the balance crosses zero
    #[test]
    fn liquidation_on_crossing_only(
        prices in prop::collection::vec(price_strategy(), 1..60),
        orders in prop::collection::vec(order_strategy(), 0..60),
    ) {
        let bt = Backtester::new(MarketInfo::perpetual(20.0), TraderConfig::default(), EngineConfig::with_balance(50.0));
        let trades = run(&bt, ScriptedStrategy::new(0.0).with_orders(orders), &prices);

        for pair in trades.windows(2) {
            if pair[1].event == RiskEvent::Liquidation {
                prop_assert!(pair[0].unspent_balance > 0.0);
                prop_assert!(pair[1].unspent_balance <= 0.0);
            }
        }
    }
}
