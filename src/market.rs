//! Market description for a single simulated instrument.
//!
//! A market is read-only for the whole run. It decides whether balance is
//! margin (leveraged) or full notional (spot), how order sizes are stepped,
//! and whether quotes are inverted.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Static market information (immutable for the run)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketInfo {
    /// Quotes are inverted (price is 1/price, position flips sign)
    pub invert_price: bool,
    /// Leverage multiple; 0 means spot
    pub leverage: f64,
    /// Minimum order size accepted by the venue
    pub min_size: f64,
    /// Size increment; 0 disables stepping
    pub asset_step: f64,
    /// Minimum order notional in currency; 0 disables the check
    pub min_volume: f64,
}

impl Default for MarketInfo {
    fn default() -> Self {
        Self::spot()
    }
}

impl MarketInfo {
    /// Plain spot market with no size restrictions
    pub fn spot() -> Self {
        Self {
            invert_price: false,
            leverage: 0.0,
            min_size: 0.0,
            asset_step: 0.0,
            min_volume: 0.0,
        }
    }

    /// Leveraged perpetual with the given multiple
    pub fn perpetual(leverage: f64) -> Self {
        Self {
            leverage,
            ..Self::spot()
        }
    }

    /// Inverse-quoted leveraged contract (e.g. BTC/USD settled in BTC)
    pub fn inverse_perpetual(leverage: f64) -> Self {
        Self {
            invert_price: true,
            ..Self::perpetual(leverage)
        }
    }

    pub fn with_sizes(mut self, min_size: f64, asset_step: f64, min_volume: f64) -> Self {
        self.min_size = min_size;
        self.asset_step = asset_step;
        self.min_volume = min_volume;
        self
    }

    pub fn is_leveraged(&self) -> bool {
        self.leverage != 0.0
    }

    /// Round a size to the asset step, half away from zero
    pub fn adjust_size(&self, size: f64) -> f64 {
        adj_value(size, self.asset_step)
    }

    /// Smallest size worth sending at `ref_price`: the larger of the venue
    /// minimum, the configured minimum and the size implied by min_volume.
    pub fn min_tradable_size(&self, config_min_size: f64, ref_price: f64) -> f64 {
        let mut min_size = self.min_size.max(config_min_size);
        if self.min_volume != 0.0 && ref_price > 0.0 {
            min_size = min_size.max(self.min_volume / ref_price);
        }
        min_size
    }

    pub fn validate(&self) -> Result<(), MarketError> {
        if !self.leverage.is_finite() || self.leverage < 0.0 {
            return Err(MarketError::InvalidLeverage(self.leverage));
        }
        for (name, value) in [
            ("min_size", self.min_size),
            ("asset_step", self.asset_step),
            ("min_volume", self.min_volume),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(MarketError::InvalidLimit { name, value });
            }
        }
        Ok(())
    }
}

/// Quantize `value` to a multiple of `step`. Done in decimal so that steps
/// like 0.1 land on exact multiples; falls back to f64 when the value does
/// not fit a Decimal.
pub fn adj_value(value: f64, step: f64) -> f64 {
    if step <= 0.0 || !step.is_finite() || value == 0.0 {
        return value;
    }
    let quantized = Decimal::from_f64(value)
        .zip(Decimal::from_f64(step))
        .and_then(|(v, s)| {
            let steps = v
                .checked_div(s)?
                .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
            steps.checked_mul(s)
        })
        .and_then(|d| d.to_f64());

    quantized.unwrap_or_else(|| (value / step).round() * step)
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MarketError {
    #[error("Invalid leverage {0}: must be finite and >= 0")]
    InvalidLeverage(f64),

    #[error("Invalid market limit {name} = {value}")]
    InvalidLimit { name: &'static str, value: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spot_is_not_leveraged() {
        assert!(!MarketInfo::spot().is_leveraged());
        assert!(MarketInfo::perpetual(10.0).is_leveraged());
        assert!(MarketInfo::inverse_perpetual(5.0).invert_price);
    }

    #[test]
    fn step_rounding_is_exact() {
        assert_eq!(adj_value(0.30000000000000004, 0.1), 0.3);
        assert_eq!(adj_value(1.26, 0.1), 1.3);
        assert_eq!(adj_value(-1.25, 0.1), -1.3); // half away from zero
        assert_eq!(adj_value(7.0, 5.0), 5.0);
        assert_eq!(adj_value(7.5, 5.0), 10.0);
    }

    #[test]
    fn coarse_steps_land_on_decimal_multiples() {
        use rust_decimal_macros::dec;
        // 12 / 2.5 = 4.8 steps, rounds to 5
        assert_eq!(Decimal::from_f64(adj_value(12.0, 2.5)), Some(dec!(12.5)));
        assert_eq!(Decimal::from_f64(adj_value(-0.75, 0.5)), Some(dec!(-1.0)));
    }

    #[test]
    fn zero_step_passes_through() {
        assert_eq!(adj_value(1.234567, 0.0), 1.234567);
        assert_eq!(adj_value(0.0, 0.5), 0.0);
    }

    #[test]
    fn min_size_includes_min_volume() {
        let market = MarketInfo::spot().with_sizes(0.01, 0.0, 10.0);
        // 10 currency at price 100 needs 0.1 units
        assert_eq!(market.min_tradable_size(0.05, 100.0), 0.1);
        // config minimum wins when larger
        assert_eq!(market.min_tradable_size(0.5, 100.0), 0.5);
    }

    #[test]
    fn validate_rejects_negative_limits() {
        assert!(MarketInfo::spot().validate().is_ok());
        let bad = MarketInfo::spot().with_sizes(-1.0, 0.0, 0.0);
        assert!(matches!(bad.validate(), Err(MarketError::InvalidLimit { name: "min_size", .. })));
        let bad_lev = MarketInfo::perpetual(f64::NAN);
        assert!(matches!(bad_lev.validate(), Err(MarketError::InvalidLeverage(_))));
    }
}
