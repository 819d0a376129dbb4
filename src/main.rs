//! Backtest simulation demo.
//!
//! Runs a handful of scenarios through the simulation core: spot and
//! leveraged rebalancing, an inverse-quoted contract, spending spare cash
//! aside, and a run interrupted by a failing strategy.
//!
//! Set RUST_LOG=backtest_core=debug to see every tick.

use backtest_core::*;
use tracing_subscriber::EnvFilter;

type DemoResult = Result<(), BacktestError>;

fn main() -> DemoResult {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("Backtest Simulation Core");
    println!("Single Strategy, Single Market, Deterministic Replay\n");

    scenario_1_spot_rebalance()?;
    scenario_2_leveraged_crash()?;
    scenario_3_inverse_contract()?;
    scenario_4_spend_aside()?;
    scenario_5_interrupted_run()?;

    println!("\nAll simulations completed.");
    Ok(())
}

const HOUR: i64 = Timestamp::HOUR_MS;

/// Hourly prices swinging around `base`.
fn wave(base: f64, amplitude: f64, hours: usize) -> ReplaySource {
    let prices: Vec<f64> = (0..hours)
        .map(|i| base + amplitude * (i as f64 * 0.35).sin())
        .collect();
    ReplaySource::from_prices(Timestamp::from_millis(0), HOUR, &prices)
}

fn print_summary(outcome: &BacktestOutcome) {
    let Some(s) = RunSummary::from_trades(outcome.real_trades()) else {
        println!("  (no records)\n");
        return;
    };
    println!("  Records: {}, trades: {}, over {:.0}h", s.records, s.trades, s.duration_hours());
    println!("  Final position: {:.4}, balance: {:.2}", s.final_position, s.final_balance);
    println!("  Realized P/L: {:.2}, peak balance {:.2}, max drawdown {:.2}", s.realized_pl, s.peak_balance, s.max_drawdown);
    if s.events.total() > 0 {
        println!(
            "  Events: {} margin calls, {} liquidations, {} no balance, {} accepted losses",
            s.events.margin_calls, s.events.liquidations, s.events.no_balance, s.events.accept_loss
        );
    }
    println!();
}

/// Half the equity in the asset on a plain spot market.
fn scenario_1_spot_rebalance() -> DemoResult {
    println!("Scenario 1: Spot Rebalance 50/50\n");

    let bt = Backtester::new(
        MarketInfo::spot().with_sizes(0.001, 0.001, 5.0),
        TraderConfig::conservative(),
        EngineConfig::with_balance(10_000.0),
    );
    let outcome = bt.run(Rebalance::new(0.5), wave(100.0, 15.0, 72).replay())?;

    let trades = outcome.trades();
    println!("  Start: {:.3} units @ {:.2}, cash {:.2}", trades[0].position, trades[0].price.price, trades[0].balance);
    print_summary(&outcome);
    Ok(())
}

/// Three times the margin in the asset, then a crash through the margin.
fn scenario_2_leveraged_crash() -> DemoResult {
    println!("Scenario 2: Leveraged Position Into a Crash\n");

    let mut prices: Vec<f64> = (0..24).map(|i| 100.0 + i as f64 * 0.5).collect();
    prices.extend((1..=12).map(|i| 112.0 - i as f64 * 8.0));
    let source = ReplaySource::from_prices(Timestamp::from_millis(0), HOUR, &prices);

    let bt = Backtester::new(
        MarketInfo::perpetual(5.0),
        TraderConfig::default(),
        EngineConfig::with_balance(1_000.0),
    );
    let outcome = bt.run(Rebalance::new(3.0), source.replay())?;

    for r in outcome.trades().iter().filter(|r| r.event.is_event()) {
        println!("  {} {} @ {:.2}: position {:.3}, balance {:.2}", r.price.time, r.event, r.price.price, r.position, r.balance);
    }
    print_summary(&outcome);
    Ok(())
}

/// Contract quoted in inverse terms; records come back in the caller's quote.
fn scenario_3_inverse_contract() -> DemoResult {
    println!("Scenario 3: Inverse-Quoted Contract\n");

    let bt = Backtester::new(
        MarketInfo::inverse_perpetual(10.0),
        TraderConfig::leveraged(2.0),
        EngineConfig::with_balance(1.0),
    );
    // native prices are 1/quote
    let native: ReplaySource = wave(20_000.0, 2_000.0, 48)
        .replay()
        .map(|o| PriceObservation::new(1.0 / o.price, o.time))
        .collect();
    let outcome = bt.run(Rebalance::new(1.0), native.replay())?;

    if let (Some(first), Some(last)) = (outcome.trades().first(), outcome.trades().last()) {
        println!("  First quote {:.2}, position {:.6}", first.price.price, first.position);
        println!("  Last quote {:.2}, position {:.6}", last.price.price, last.position);
    }
    print_summary(&outcome);
    Ok(())
}

/// Strategy budget below the account; the excess is swept aside.
fn scenario_4_spend_aside() -> DemoResult {
    println!("Scenario 4: Spending Excess Currency\n");

    let engine = EngineConfig {
        spend_excess_to_allocation: true,
        ..EngineConfig::with_balance(10_000.0)
    };
    let bt = Backtester::new(MarketInfo::spot(), TraderConfig::default(), engine);
    let outcome = bt.run(Rebalance::new(0.5).with_budget(4_000.0), wave(50.0, 5.0, 24).replay())?;

    if let Some(last) = outcome.trades().last() {
        println!(
            "  Working balance {:.2}, set aside {:.2}",
            last.unspent_balance,
            last.balance - last.unspent_balance
        );
    }
    print_summary(&outcome);
    Ok(())
}

/// A strategy that fails mid-run: partial records plus a marker.
fn scenario_5_interrupted_run() -> DemoResult {
    println!("Scenario 5: Interrupted Run\n");

    let bt = Backtester::new(MarketInfo::spot(), TraderConfig::default(), EngineConfig::with_balance(1_000.0));
    let strategy = ScriptedStrategy::new(2.0)
        .with_orders([1.0, -0.5, 0.25])
        .failing_at_order(3, "price history exhausted");
    let outcome = bt.run(strategy, wave(100.0, 4.0, 12).replay())?;

    if let Some(failure) = outcome.failure() {
        println!("  Stopped at record {} ({}): {}", failure.record_index, failure.time, failure.error);
    }
    if let Some(marker) = outcome.trades().last().filter(|r| r.is_sentinel()) {
        println!("  Marker at {}: {}", marker.price.time, marker.strategy_snapshot);
    }
    print_summary(&outcome);
    Ok(())
}
