// 1.0: primitives shared by every stage of the fold. timestamps, price observations,
// sign helpers. prices and sizes stay f64; the newtypes are only where mixups hurt.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// 1.1: millisecond timestamp attached to a price observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub const HOUR_MS: i64 = 3_600_000;

    pub fn from_millis(ms: i64) -> Self {
        Self(ms)
    }

    pub fn as_millis(&self) -> i64 {
        self.0
    }

    pub fn add_millis(&self, millis: i64) -> Self {
        Self(self.0.saturating_add(millis))
    }

    pub fn elapsed_hours(&self, other: &Timestamp) -> f64 {
        self.0.abs_diff(other.0) as f64 / Self::HOUR_MS as f64
    }

    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            None => write!(f, "{}ms", self.0),
        }
    }
}

// 1.2: one price observation. price must be positive and finite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceObservation {
    pub price: f64,
    pub time: Timestamp,
}

impl PriceObservation {
    pub fn new(price: f64, time: Timestamp) -> Self {
        Self { price, time }
    }

    pub fn at_millis(price: f64, ms: i64) -> Self {
        Self::new(price, Timestamp::from_millis(ms))
    }

    pub fn is_valid(&self) -> bool {
        self.price.is_finite() && self.price > 0.0
    }
}

/// Sign of `value` as -1, 0 or +1. Zero maps to zero, unlike `f64::signum`.
pub fn sgn(value: f64) -> f64 {
    if value > 0.0 {
        1.0
    } else if value < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Replaces NaN and infinities with zero.
pub fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
