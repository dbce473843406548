use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const NEWS_ITEM_SCHEMA_VERSION: u32 = 1;

/// A single ingested news item. Produced externally (the ingest collaborator);
/// the core treats instances as immutable values and never mutates them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewsItem {
    pub schema_version: u32,
    /// Stable hash identifying this item, assigned by the ingest layer.
    pub id: String,
    pub ts_utc: DateTime<Utc>,
    pub title: String,
    pub summary: Option<String>,
    pub ticker: Option<String>,
    pub source_host: String,
    pub canonical_url: Option<String>,
    /// Arbitrary provider payload; used as a secondary channel for
    /// precomputed fields such as `sentiment_analysis` or `sector`.
    #[serde(default)]
    pub raw: serde_json::Value,
}

impl NewsItem {
    /// `lower(title) + " " + lower(summary)`, the canonical text blob keyword
    /// matching and offering-stage detection run over.
    pub fn searchable_text(&self) -> String {
        let mut text = self.title.to_lowercase();
        if let Some(summary) = &self.summary {
            text.push(' ');
            text.push_str(&summary.to_lowercase());
        }
        text
    }
}
