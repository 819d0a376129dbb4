//! Per-run options.

use serde::{Deserialize, Serialize};

/// Run configuration: starting account and balance policies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Starting position; asked from the strategy when absent.
    pub initial_position: Option<f64>,
    /// Starting balance (currency on spot, margin on leveraged markets).
    pub balance: f64,
    /// Let spot trades overdraw the balance instead of dropping them.
    pub allow_negative_balance: bool,
    /// Move currency the strategy does not claim into a spent-aside total.
    pub spend_excess_to_allocation: bool,
    /// Log every tick at debug instead of trace.
    pub verbose: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_position: None,
            balance: 0.0,
            allow_negative_balance: false,
            spend_excess_to_allocation: false,
            verbose: false,
        }
    }
}

impl EngineConfig {
    pub fn with_balance(balance: f64) -> Self {
        Self {
            balance,
            ..Self::default()
        }
    }

    pub fn initial_position(mut self, position: f64) -> Self {
        self.initial_position = Some(position);
        self
    }
}
