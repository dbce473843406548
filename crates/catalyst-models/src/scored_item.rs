use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const SCORED_ITEM_SCHEMA_VERSION: u32 = 1;

/// Market regime classification, see §4.9.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MarketRegime {
    BullMarket,
    Neutral,
    HighVolatility,
    BearMarket,
    Crash,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SpyTrend {
    Uptrend,
    Sideways,
    Downtrend,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VwapClassification {
    StrongBullish,
    Bullish,
    Neutral,
    Bearish,
    StrongBearish,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DivergenceClassification {
    WeakRally,
    StrongSelloffReversal,
    ConfirmedRally,
    ConfirmedSelloff,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OfferingStage {
    Announcement,
    Pricing,
    Upsize,
    Closing,
    Debt,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EarningsLabel {
    Beat,
    Miss,
    InLine,
}

/// A single optional enrichment attached to a `ScoredItem`. Modeled as a
/// discriminated variant (rather than the loose key/value attachments of the
/// source system) so each attachment carries its own well-typed payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Attachment {
    Regime {
        regime: MarketRegime,
        trend: SpyTrend,
        multiplier: Decimal,
        confidence: Decimal,
    },
    Rvol {
        rvol: Decimal,
        multiplier: Decimal,
    },
    Float {
        float_shares: u64,
        multiplier: Decimal,
    },
    Vwap {
        vwap: Decimal,
        classification: VwapClassification,
        multiplier: Decimal,
        broke_vwap: bool,
    },
    Divergence {
        classification: DivergenceClassification,
        adjustment: Decimal,
    },
    Earnings {
        label: EarningsLabel,
        actual_eps: Option<Decimal>,
        estimate_eps: Option<Decimal>,
        actual_revenue: Option<Decimal>,
        estimate_revenue: Option<Decimal>,
        sentiment_score: Decimal,
    },
    Offering {
        stage: OfferingStage,
        confidence: Decimal,
        override_sentiment: Decimal,
    },
    MultiDimSentiment {
        numeric: Decimal,
        categorical: Decimal,
        confidence: Decimal,
        blended: Decimal,
    },
    Fundamental {
        float_shares: Option<u64>,
        short_interest_pct: Option<Decimal>,
        score: Decimal,
        reasons: Vec<String>,
    },
    Credibility {
        domain: String,
        tier: u8,
        static_weight: Decimal,
        effective_weight: Decimal,
    },
    SemanticKeywords {
        phrases: Vec<String>,
    },
}

/// Output of the classifier. Invariant: after the fast path, `enriched = false`;
/// after slow-path enrichment, `enriched = true` and `enrichment_timestamp` is set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredItem {
    pub schema_version: u32,
    pub news_item_id: String,
    pub ticker: Option<String>,
    pub relevance: Decimal,
    /// Aggregated sentiment in [-1, 1].
    pub sentiment: Decimal,
    /// Running total score accumulated through the fast/slow path. Named
    /// distinctly from source credibility weight per §9's design note (b).
    pub total_score: Decimal,
    pub keyword_hits: Vec<String>,
    pub tags: Vec<String>,
    pub negative_keywords: Vec<String>,
    pub enriched: bool,
    pub enrichment_timestamp: Option<DateTime<Utc>>,
    pub attachments: Vec<Attachment>,
}

impl ScoredItem {
    pub fn new(news_item_id: impl Into<String>, ticker: Option<String>) -> Self {
        Self {
            schema_version: SCORED_ITEM_SCHEMA_VERSION,
            news_item_id: news_item_id.into(),
            ticker,
            relevance: Decimal::ZERO,
            sentiment: Decimal::ZERO,
            total_score: Decimal::ZERO,
            keyword_hits: Vec::new(),
            tags: Vec::new(),
            negative_keywords: Vec::new(),
            enriched: false,
            enrichment_timestamp: None,
            attachments: Vec::new(),
        }
    }

    pub fn attachment_of<'a>(
        &'a self,
        pred: impl Fn(&Attachment) -> bool,
    ) -> Option<&'a Attachment> {
        self.attachments.iter().find(|a| pred(a))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn new_scored_item_is_unenriched() {
        let item = ScoredItem::new("abc", Some("AAPL".to_string()));
        assert!(!item.enriched);
        assert!(item.enrichment_timestamp.is_none());
    }

    #[test]
    fn roundtrip_scored_item_with_attachments() {
        let mut item = ScoredItem::new("abc", Some("POET".to_string()));
        item.enriched = true;
        item.enrichment_timestamp = Some(Utc::now());
        item.attachments.push(Attachment::Offering {
            stage: OfferingStage::Closing,
            confidence: dec!(0.90),
            override_sentiment: dec!(0.2),
        });
        item.attachments.push(Attachment::Rvol {
            rvol: dec!(3.2),
            multiplier: dec!(1.3),
        });

        let json = serde_json::to_string(&item).unwrap();
        let parsed: ScoredItem = serde_json::from_str(&json).unwrap();
        assert_eq!(item, parsed);
    }

    #[test]
    fn attachment_tag_is_snake_case() {
        let offering = Attachment::Offering {
            stage: OfferingStage::Debt,
            confidence: dec!(1.0),
            override_sentiment: dec!(0.3),
        };
        let json = serde_json::to_value(&offering).unwrap();
        assert_eq!(json["kind"], "offering");
        assert_eq!(json["stage"], "debt");
    }
}
