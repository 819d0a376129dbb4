// 3.0 config.rs: trader risk limits in one place. sizes, position bounds, leverage cap,
// loss and budget policies. strategy parameters live in the strategy itself.
// 3.1 presets follow the usual pattern: start from default, override a few knobs.

use serde::{Deserialize, Serialize};

use crate::market::MarketInfo;

// Risk limits applied by the order constraint pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraderConfig {
    // Largest absolute order size; None = unlimited
    pub max_size: Option<f64>,
    // Smallest order size, combined with the market minimum
    pub min_size: f64,
    // Upper bound for the position (asset units, not currency)
    pub max_balance: Option<f64>,
    // Lower bound for the position (asset units, not currency)
    pub min_balance: Option<f64>,
    // Leverage cap below the market's own; None = market leverage
    pub max_leverage: Option<f64>,
    // Reset the strategy and drop the order instead of taking a margin call
    pub accept_loss: bool,
    // Reject exposure increases the strategy has no currency for
    pub trade_within_budget: bool,
    // Shrink over-leveraged positions even when the strategy asks for nothing
    pub reduce_on_leverage: bool,
}

impl Default for TraderConfig {
    fn default() -> Self {
        Self {
            max_size: None,
            min_size: 0.0,
            max_balance: None,
            min_balance: None,
            max_leverage: None,
            accept_loss: false,
            trade_within_budget: false,
            reduce_on_leverage: false,
        }
    }
}

impl TraderConfig {
    // Spot trading that never goes into debt and stays within budget
    pub fn conservative() -> Self {
        Self {
            accept_loss: true,
            trade_within_budget: true,
            ..Self::default()
        }
    }

    // Leveraged trading under a cap, trimming the position when margin shrinks
    pub fn leveraged(max_leverage: f64) -> Self {
        Self {
            max_leverage: Some(max_leverage),
            reduce_on_leverage: true,
            ..Self::default()
        }
    }

    // Leverage actually usable on `market`: the configured cap clipped to the market's
    pub fn effective_max_leverage(&self, market: &MarketInfo) -> f64 {
        match self.max_leverage {
            Some(cap) if cap > 0.0 => cap.min(market.leverage),
            _ => market.leverage,
        }
    }

    // Validate the configuration for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.min_size.is_finite() || self.min_size < 0.0 {
            return Err(ConfigError::InvalidSize {
                reason: format!("min_size must be >= 0, got {}", self.min_size),
            });
        }

        if let Some(max_size) = self.max_size {
            if !max_size.is_finite() || max_size <= 0.0 {
                return Err(ConfigError::InvalidSize {
                    reason: format!("max_size must be positive, got {}", max_size),
                });
            }
            if max_size < self.min_size {
                return Err(ConfigError::InvalidSize {
                    reason: "max_size below min_size".to_string(),
                });
            }
        }

        if let (Some(lo), Some(hi)) = (self.min_balance, self.max_balance) {
            if lo > hi {
                return Err(ConfigError::InvalidBounds { min: lo, max: hi });
            }
        }

        if let Some(lev) = self.max_leverage {
            if !lev.is_finite() || lev <= 0.0 {
                return Err(ConfigError::InvalidLeverage(lev));
            }
        }

        Ok(())
    }
}

// Configuration validation errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid order size limits: {reason}")]
    InvalidSize { reason: String },

    #[error("Position bounds inverted: min {min} > max {max}")]
    InvalidBounds { min: f64, max: f64 },

    #[error("Invalid leverage cap {0}")]
    InvalidLeverage(f64),

    #[error("Invalid market: {0}")]
    Market(#[from] crate::market::MarketError),

    #[error("Invalid starting balance {0}")]
    InvalidBalance(f64),
}
