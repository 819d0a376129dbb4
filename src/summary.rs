//! Run summary.
//!
//! Condenses a trade sequence into the numbers a report leads with: how much
//! was traded, how often each risk constraint fired, where the account ended
//! and its worst peak-to-trough balance drop.

use crate::engine::TradeRecord;
use crate::events::RiskEventCounts;
use crate::types::Timestamp;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub records: usize,
    /// Records with a non-zero order size
    pub trades: usize,
    pub events: RiskEventCounts,
    pub first_time: Timestamp,
    pub last_time: Timestamp,
    pub final_position: f64,
    pub final_balance: f64,
    pub realized_pl: f64,
    pub norm_profit_total: f64,
    pub peak_balance: f64,
    /// Largest drop from a balance peak, in currency
    pub max_drawdown: f64,
}

impl RunSummary {
    /// None for an empty sequence.
    pub fn from_trades(trades: &[TradeRecord]) -> Option<Self> {
        let first = trades.first()?;
        let last = trades.last()?;

        let mut peak = first.balance;
        let mut max_drawdown = 0.0_f64;
        for record in trades {
            peak = peak.max(record.balance);
            max_drawdown = max_drawdown.max(peak - record.balance);
        }

        Some(Self {
            records: trades.len(),
            trades: trades.iter().filter(|r| r.order_size != 0.0).count(),
            events: trades.iter().map(|r| r.event).collect(),
            first_time: first.price.time,
            last_time: last.price.time,
            final_position: last.position,
            final_balance: last.balance,
            realized_pl: last.realized_pl,
            norm_profit_total: last.norm_profit_total,
            peak_balance: peak,
            max_drawdown,
        })
    }

    pub fn duration_hours(&self) -> f64 {
        self.first_time.elapsed_hours(&self.last_time)
    }
}
