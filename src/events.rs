// 6.0: risk events. every trade record carries exactly one; NoEvent is the default.
// the counters give a run-level view of how often each constraint fired.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskEvent {
    #[default]
    NoEvent,
    // projected margin would go negative, or exposure exceeded the leverage cap
    MarginCall,
    // balance crossed from positive to non-positive; position flattened
    Liquidation,
    // balance exhausted, or strategy has no currency for the order
    NoBalance,
    // strategy was reset and the risky order dropped
    AcceptLoss,
}

impl RiskEvent {
    pub fn is_event(&self) -> bool {
        *self != RiskEvent::NoEvent
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskEvent::NoEvent => "no_event",
            RiskEvent::MarginCall => "margin_call",
            RiskEvent::Liquidation => "liquidation",
            RiskEvent::NoBalance => "no_balance",
            RiskEvent::AcceptLoss => "accept_loss",
        }
    }
}

impl fmt::Display for RiskEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-event tallies over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskEventCounts {
    pub margin_calls: u64,
    pub liquidations: u64,
    pub no_balance: u64,
    pub accept_loss: u64,
}

impl RiskEventCounts {
    pub fn record(&mut self, event: RiskEvent) {
        match event {
            RiskEvent::NoEvent => {}
            RiskEvent::MarginCall => self.margin_calls += 1,
            RiskEvent::Liquidation => self.liquidations += 1,
            RiskEvent::NoBalance => self.no_balance += 1,
            RiskEvent::AcceptLoss => self.accept_loss += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.margin_calls + self.liquidations + self.no_balance + self.accept_loss
    }
}

impl FromIterator<RiskEvent> for RiskEventCounts {
    fn from_iter<I: IntoIterator<Item = RiskEvent>>(iter: I) -> Self {
        let mut counts = Self::default();
        for event in iter {
            counts.record(event);
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_no_event() {
        assert_eq!(RiskEvent::default(), RiskEvent::NoEvent);
        assert!(!RiskEvent::NoEvent.is_event());
        assert!(RiskEvent::Liquidation.is_event());
    }

    #[test]
    fn event_counts() {
        let counts: RiskEventCounts = [
            RiskEvent::NoEvent,
            RiskEvent::MarginCall,
            RiskEvent::MarginCall,
            RiskEvent::Liquidation,
            RiskEvent::AcceptLoss,
        ]
        .into_iter()
        .collect();

        assert_eq!(counts.margin_calls, 2);
        assert_eq!(counts.liquidations, 1);
        assert_eq!(counts.no_balance, 0);
        assert_eq!(counts.total(), 4);
    }

    #[test]
    fn serializes_snake_case() {
        let json = serde_json::to_string(&RiskEvent::MarginCall).unwrap();
        assert_eq!(json, "\"margin_call\"");
        assert_eq!(RiskEvent::AcceptLoss.to_string(), "accept_loss");
    }
}
