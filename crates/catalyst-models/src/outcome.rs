use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The fixed set of horizons the MOA tracks after a rejection.
pub const HORIZONS: [&str; 6] = ["15m", "30m", "1h", "4h", "1d", "7d"];

/// Minimum return percentage at any horizon for a rejection to count as a
/// missed opportunity.
pub const MISSED_OPPORTUNITY_THRESHOLD_PCT: Decimal = Decimal::from_parts(10, 0, 0, false, 0);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HorizonOutcome {
    pub price: Decimal,
    pub return_pct: Decimal,
    pub checked_at: DateTime<Utc>,
}

/// MOA persistence, keyed by `(ticker, rejection_ts)`. `is_missed_opportunity`
/// and `max_return_pct` are derived fields recomputed on every mutation, never
/// stored independently of the horizon map.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutcomeRecord {
    pub ticker: String,
    pub rejection_ts: DateTime<Utc>,
    pub rejection_price: Decimal,
    pub rejection_reason: String,
    pub outcomes: HashMap<String, Option<HorizonOutcome>>,
    pub is_missed_opportunity: bool,
    pub max_return_pct: Decimal,
}

impl OutcomeRecord {
    pub fn new(
        ticker: impl Into<String>,
        rejection_ts: DateTime<Utc>,
        rejection_price: Decimal,
        rejection_reason: impl Into<String>,
    ) -> Self {
        let outcomes = HORIZONS
            .iter()
            .map(|h| (h.to_string(), None))
            .collect::<HashMap<_, _>>();
        Self {
            ticker: ticker.into(),
            rejection_ts,
            rejection_price,
            rejection_reason: rejection_reason.into(),
            outcomes,
            is_missed_opportunity: false,
            max_return_pct: Decimal::ZERO,
        }
    }

    /// Set the outcome for a horizon and recompute the derived fields. The
    /// horizon key must be one of `HORIZONS`.
    pub fn set_horizon(&mut self, horizon: &str, outcome: HorizonOutcome) {
        self.outcomes.insert(horizon.to_string(), Some(outcome));
        self.recompute_derived();
    }

    pub fn recompute_derived(&mut self) {
        let mut max_return = Decimal::ZERO;
        let mut any_set = false;
        let mut missed = false;
        for outcome in self.outcomes.values().flatten() {
            any_set = true;
            if outcome.return_pct > max_return {
                max_return = outcome.return_pct;
            }
            if outcome.return_pct >= MISSED_OPPORTUNITY_THRESHOLD_PCT {
                missed = true;
            }
        }
        self.max_return_pct = if any_set { max_return } else { Decimal::ZERO };
        self.is_missed_opportunity = missed;
    }
}
