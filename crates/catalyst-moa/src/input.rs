use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One row of `data/rejected_items.jsonl`: a news item the classifier scored
/// below threshold (or explicitly avoided), kept for retroactive review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectedItem {
    pub ts: DateTime<Utc>,
    pub ticker: String,
    pub price: Decimal,
    pub rejection_reason: String,
    pub title: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// One row of `data/accepted_items.jsonl`, used only as the negative pool for
/// lift-ratio phrase mining.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceptedItem {
    pub ts: DateTime<Utc>,
    pub ticker: String,
    pub title: String,
}

/// Keep rows whose `ts` falls within `since_days` of `now`. Exposed as a free
/// function rather than baked into the loader so the window can be unit
/// tested without touching the filesystem.
pub fn within_window(ts: DateTime<Utc>, now: DateTime<Utc>, since_days: i64) -> bool {
    (now - ts).num_days() <= since_days
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn within_window_accepts_recent_and_rejects_old() {
        let now = Utc::now();
        assert!(within_window(now - Duration::days(10), now, 30));
        assert!(!within_window(now - Duration::days(31), now, 30));
    }
}
