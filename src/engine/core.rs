// 7.1 engine/core.rs: the fold. reads the first price, settles the starting position,
// then runs every distinct tick through constraints → settlement → record.

use super::config::EngineConfig;
use super::inversion::invert_trades;
use super::results::{BacktestError, BacktestOutcome, FailureReport, TradeRecord, TradeSequence};
use crate::config::{ConfigError, TraderConfig};
use crate::events::RiskEvent;
use crate::market::MarketInfo;
use crate::price_feed::PriceSource;
use crate::strategy::{AlertMode, OrderContext, Strategy, Ticker};
use crate::types::{PriceObservation, Timestamp};
use tracing::{debug, info, trace, warn};

/// Account state threaded through the fold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct FoldState {
    pub position: f64,
    pub balance: f64,
    pub realized_pl: f64,
    pub total_spent: f64,
}

/// Order as it moves through the constraint pipeline and settlement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct PendingOrder {
    pub size: f64,
    /// Effective trade price for the tick
    pub price: f64,
    pub alert: AlertMode,
    /// Whether the strategy gets an on_trade notification
    pub notify: bool,
    pub event: RiskEvent,
}

/** 7.1.1: simulation core. holds the read-only inputs of a run */
#[derive(Debug, Clone)]
pub struct Backtester {
    pub(super) market: MarketInfo,
    pub(super) config: TraderConfig,
    pub(super) engine: EngineConfig,
}

impl Backtester {
    pub fn new(market: MarketInfo, config: TraderConfig, engine: EngineConfig) -> Self {
        Self {
            market,
            config,
            engine,
        }
    }

    pub fn market(&self) -> &MarketInfo {
        &self.market
    }

    pub fn config(&self) -> &TraderConfig {
        &self.config
    }

    pub fn engine_config(&self) -> &EngineConfig {
        &self.engine
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.market.validate()?;
        self.config.validate()?;
        if !self.engine.balance.is_finite() {
            return Err(ConfigError::InvalidBalance(self.engine.balance));
        }
        Ok(())
    }

    /// Run `strategy` over every observation of `source`.
    ///
    /// An empty source yields an empty sequence before anything is checked.
    /// Otherwise the configuration is validated, and failures before the
    /// initial record exists are returned as `Err`. Later failures stop the
    /// fold and return the records so far, followed by a sentinel, as
    /// [`BacktestOutcome::Interrupted`]. Inverse-quoted markets are inverted
    /// once at the end in both cases.
    pub fn run<S, P>(&self, mut strategy: S, mut source: P) -> Result<BacktestOutcome, BacktestError>
    where
        S: Strategy,
        P: PriceSource,
    {
        let Some(first) = source.next_price() else {
            debug!("price source empty, nothing to simulate");
            return Ok(BacktestOutcome::Completed(TradeSequence::new()));
        };
        self.validate()?;

        info!(
            leverage = self.market.leverage,
            inverted = self.market.invert_price,
            balance = self.engine.balance,
            "backtest started"
        );

        let mut trades = TradeSequence::new();
        let folded = self.fold(&mut strategy, first, &mut source, &mut trades);

        let mut outcome = match folded {
            Ok(()) => BacktestOutcome::Completed(trades),
            Err(failure) => {
                let Some(last) = trades.last() else {
                    warn!(error = %failure.error, "backtest failed before the first record");
                    return Err(failure.error);
                };
                warn!(
                    error = %failure.error,
                    records = trades.len(),
                    time = %failure.time,
                    "backtest interrupted, returning partial trades"
                );
                let sentinel = TradeRecord::sentinel(last, &failure.error.to_string());
                trades.push(sentinel);
                BacktestOutcome::Interrupted { trades, failure }
            }
        };

        if self.market.invert_price {
            match &mut outcome {
                BacktestOutcome::Completed(trades) => invert_trades(trades),
                BacktestOutcome::Interrupted { trades, .. } => invert_trades(trades),
            }
        }

        info!(
            records = outcome.trades().len(),
            complete = outcome.is_complete(),
            "backtest finished"
        );
        Ok(outcome)
    }

    fn fold<S, P>(
        &self,
        strategy: &mut S,
        first: PriceObservation,
        source: &mut P,
        trades: &mut TradeSequence,
    ) -> Result<(), FailureReport>
    where
        S: Strategy,
        P: PriceSource,
    {
        let fail = |error: BacktestError, index: usize, time: Timestamp| FailureReport {
            error,
            record_index: index,
            time,
        };

        let (initial, mut state) = self
            .initialize(strategy, first)
            .map_err(|e| fail(e, 0, first.time))?;
        trades.push(initial);

        while let Some(observation) = source.next_price() {
            let Some(last) = trades.last() else { break };
            let index = trades.len();

            if !observation.is_valid() {
                return Err(fail(
                    BacktestError::InvalidPrice {
                        price: observation.price,
                        time: observation.time,
                    },
                    index,
                    observation.time,
                ));
            }
            // exact repeat of the last retained price is not a tick
            if observation.price == last.price.price {
                continue;
            }

            let record = self
                .step(strategy, &mut state, last, observation)
                .map_err(|e| fail(e, index, observation.time))?;
            trades.push(record);
        }

        Ok(())
    }

    fn initialize<S: Strategy>(
        &self,
        strategy: &mut S,
        first: PriceObservation,
    ) -> Result<(TradeRecord, FoldState), BacktestError> {
        if !first.is_valid() {
            return Err(BacktestError::InvalidPrice {
                price: first.price,
                time: first.time,
            });
        }

        let mut balance = self.engine.balance;
        let position = match self.engine.initial_position {
            Some(pos) if self.market.invert_price => -pos,
            Some(pos) => pos,
            None => {
                let pos = strategy.calc_initial_position(&self.market, first.price, 0.0, balance)?;
                if !pos.is_finite() {
                    return Err(BacktestError::NonFinite {
                        field: "position",
                        time: first.time,
                    });
                }
                if self.market.is_leveraged() {
                    pos
                } else {
                    self.buy_initial_position(pos, first.price, &mut balance)
                }
            }
        };

        if !position.is_finite() {
            return Err(BacktestError::NonFinite {
                field: "position",
                time: first.time,
            });
        }

        let neutral_price = strategy.get_center_price(first.price, position);
        let snapshot = strategy.dump_state_pretty(&self.market);
        let record = TradeRecord::initial(first, position, balance, neutral_price, snapshot);
        let state = FoldState {
            position,
            balance,
            realized_pl: 0.0,
            total_spent: 0.0,
        };
        Ok((record, state))
    }

    /// Spot: pay for the starting position. Without permission to go negative
    /// the position is cut to what the balance buys.
    fn buy_initial_position(&self, position: f64, price: f64, balance: &mut f64) -> f64 {
        let cost = position * price;
        if cost <= *balance || self.engine.allow_negative_balance {
            *balance -= cost;
            return position;
        }
        let affordable = balance.max(0.0) / price;
        warn!(
            requested = position,
            affordable,
            balance = *balance,
            "initial position costs more than the starting balance, reduced"
        );
        *balance = 0.0;
        affordable
    }

    /// One tick: ask the strategy, constrain, settle, emit.
    fn step<S: Strategy>(
        &self,
        strategy: &mut S,
        state: &mut FoldState,
        last: &TradeRecord,
        observation: PriceObservation,
    ) -> Result<TradeRecord, BacktestError> {
        let last_price = last.price.price;
        let tick_price = observation.price;
        let ticker = Ticker::at_price(tick_price, observation.time);
        let prev_balance = state.balance;

        let center = strategy.get_center_price(last_price, state.position);
        let direction = if tick_price > center { -1.0 } else { 1.0 };

        strategy.on_idle(&self.market, &ticker, state.position, state.balance)?;

        let floor_balance = state.balance.max(0.0);
        let ctx = OrderContext {
            ref_price: last_price * 0.9 + tick_price * 0.1,
            price: tick_price,
            direction,
            position: state.position,
            balance: floor_balance,
            dry_run: false,
        };
        let proposal = strategy.get_new_order(&self.market, &ctx)?;

        let mut order = PendingOrder {
            size: proposal.size,
            price: proposal.execution_price().unwrap_or(tick_price),
            alert: proposal.alert,
            notify: true,
            event: RiskEvent::NoEvent,
        };

        // mark to market against the previous trade price
        let dprice = order.price - last_price;
        let pnl_change = state.position * dprice;
        state.realized_pl += pnl_change;
        if self.market.is_leveraged() {
            state.balance += pnl_change;
        }

        self.apply_constraints(strategy, &mut order, state.position, &ticker, last_price, floor_balance)?;

        if self.market.is_leveraged() {
            self.settle_leveraged(&mut order, state, dprice, prev_balance, floor_balance, tick_price);
        } else {
            self.settle_spot(strategy, &mut order, state, &ticker, floor_balance)?;
        }

        if order.event.is_event() {
            warn!(
                event = %order.event,
                price = order.price,
                position = state.position,
                balance = state.balance,
                time = %observation.time,
                "risk event"
            );
        }
        if self.engine.verbose {
            debug!(price = order.price, size = order.size, position = state.position, balance = state.balance, "tick");
        } else {
            trace!(price = order.price, size = order.size, position = state.position, balance = state.balance, "tick");
        }

        self.emit_record(strategy, order, state, last, observation)
    }
}
