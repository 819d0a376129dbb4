// Price Feed
//
// The core only needs a finite, lazy sequence of timestamped prices. Anything that
// can hand out observations one at a time is a source: an iterator over a recorded
// chart, a broker adapter, a generated series. Exhaustion is signalled by None and
// ends the run normally.

use crate::types::{PriceObservation, Timestamp};
use serde::{Deserialize, Serialize};

/// Producer of price observations for a single run
pub trait PriceSource {
    fn next_price(&mut self) -> Option<PriceObservation>;
}

impl<I> PriceSource for I
where
    I: Iterator<Item = PriceObservation>,
{
    fn next_price(&mut self) -> Option<PriceObservation> {
        self.next()
    }
}

/// A recorded price series. Each call to `replay` starts from the beginning,
/// so one recording can feed any number of independent runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplaySource {
    observations: Vec<PriceObservation>,
}

impl ReplaySource {
    pub fn new(observations: Vec<PriceObservation>) -> Self {
        Self { observations }
    }

    /// Evenly spaced prices starting at `start`
    pub fn from_prices(start: Timestamp, step_ms: i64, prices: &[f64]) -> Self {
        let observations = prices
            .iter()
            .enumerate()
            .map(|(i, &price)| PriceObservation::new(price, start.add_millis(step_ms * i as i64)))
            .collect();
        Self { observations }
    }

    pub fn push(&mut self, observation: PriceObservation) {
        self.observations.push(observation);
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn observations(&self) -> &[PriceObservation] {
        &self.observations
    }

    /// Fresh pass over the recording
    pub fn replay(&self) -> impl Iterator<Item = PriceObservation> + '_ {
        self.observations.iter().copied()
    }
}

impl FromIterator<PriceObservation> for ReplaySource {
    fn from_iter<T: IntoIterator<Item = PriceObservation>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
