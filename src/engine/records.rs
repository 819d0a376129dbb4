//! Trade record emission.

use super::core::{Backtester, FoldState, PendingOrder};
use super::results::{BacktestError, TradeRecord};
use crate::strategy::Strategy;
use crate::types::{finite_or_zero, PriceObservation};

impl Backtester {
    /// Notify the strategy, sweep spare cash and build the tick's record.
    /// Strategy-reported prices carry over from `last` when the notification
    /// is suppressed.
    pub(super) fn emit_record<S: Strategy>(
        &self,
        strategy: &mut S,
        mut order: PendingOrder,
        state: &mut FoldState,
        last: &TradeRecord,
        observation: PriceObservation,
    ) -> Result<TradeRecord, BacktestError> {
        let mut neutral_price = last.neutral_price;
        let mut open_price = last.open_price;
        let mut norm_accum = last.norm_accum;
        let mut norm_profit = last.norm_profit;

        if order.notify {
            let feedback = strategy.on_trade(
                &self.market,
                order.price,
                order.size,
                state.position,
                state.balance,
            )?;
            let accum = finite_or_zero(feedback.norm_accum);
            neutral_price = feedback.neutral_price;
            open_price = feedback.open_price;
            norm_accum += accum;
            norm_profit += finite_or_zero(feedback.norm_profit);
            // cosmetic: report the size net of what the strategy accumulated
            if order.size * (order.size - accum) > 1.0 {
                order.size -= accum;
            }
        }

        if self.engine.spend_excess_to_allocation {
            let allocation = strategy.calc_currency_allocation(order.price);
            if allocation > 0.0 && allocation < state.balance {
                state.total_spent += state.balance - allocation;
                state.balance = allocation;
            }
        }

        let time = observation.time;
        for (field, value) in [("position", state.position), ("balance", state.balance), ("order size", order.size)] {
            if !value.is_finite() {
                return Err(BacktestError::NonFinite { field, time });
            }
        }

        Ok(TradeRecord {
            price: PriceObservation::new(order.price, time),
            event: order.event,
            order_size: order.size,
            position: state.position,
            balance: state.balance + state.total_spent,
            unspent_balance: state.balance,
            realized_pl: state.realized_pl,
            neutral_price,
            open_price,
            norm_profit,
            norm_accum,
            norm_profit_total: norm_profit + norm_accum * order.price,
            strategy_snapshot: strategy.dump_state_pretty(&self.market),
        })
    }
}
