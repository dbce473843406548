use std::collections::HashMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use catalyst_cache::FundamentalsCache;
use catalyst_models::{Attachment, Context, EarningsLabel, NewsItem, OfferingStage, ScoredItem};

use crate::credibility::{get_source_tier, get_source_weight};
use crate::dynamic_scorer::DynamicSourceScorer;
use crate::fundamental_scorer;
use crate::keywords::{self, is_negative_category};
use crate::market_regime::RegimeReading;
use crate::offering::{apply_offering_sentiment_correction, OfferingStageKind};
use crate::sentiment::aggregator::{aggregate, SentimentAggregate};
use crate::sentiment::sources::{earnings_score_adjustment, SentimentSource};
use crate::ticker_profiler::TickerProfiler;

const OFFERING_MIN_CONFIDENCE: Decimal = dec!(0.7);

fn offering_stage_model(kind: OfferingStageKind) -> OfferingStage {
    match kind {
        OfferingStageKind::Closing => OfferingStage::Closing,
        OfferingStageKind::Announcement => OfferingStage::Announcement,
        OfferingStageKind::Pricing => OfferingStage::Pricing,
        OfferingStageKind::Upsize => OfferingStage::Upsize,
        OfferingStageKind::Debt => OfferingStage::Debt,
    }
}

/// Everything the fast-path classifier needs besides the `NewsItem` itself.
/// Async sentiment sources are pre-scored by the caller (each may abstain)
/// so this function stays a plain, deterministic fusion step — the async
/// fan-out across ~12 heterogeneous providers belongs to the caller that
/// assembles `sentiment_contributions`.
pub struct ClassifierInputs<'a> {
    pub ctx: &'a Context,
    /// (source_name, score, weight, confidence) for every source that did
    /// NOT abstain this round.
    pub sentiment_contributions: Vec<(String, Decimal, Decimal, Decimal)>,
    pub all_known_weights: HashMap<String, Decimal>,
    pub vix: Option<Decimal>,
    pub earnings_result: Option<crate::sentiment::sources::EarningsResult>,
    pub dynamic_scorer: Option<&'a DynamicSourceScorer>,
    pub ticker_profiler: Option<&'a TickerProfiler>,
    pub sector: Option<&'a str>,
    pub fundamentals: Option<&'a FundamentalsCache>,
    pub regime: Option<RegimeReading>,
    pub dynamic_keyword_weights: HashMap<String, Decimal>,
    /// Per-host legacy static multiplier (spec.md calls this `legacy_source_weight`),
    /// distinct from the tier-based credibility weight; defaults to 1.0.
    pub source_weight_overrides: HashMap<String, Decimal>,
}

/// Runs the 11-step fast-path pipeline of spec.md §4.5 and returns a
/// `ScoredItem` with `enriched = false`. Never fails: missing optional
/// inputs simply skip their step rather than aborting classification.
pub fn classify(item: &NewsItem, inputs: ClassifierInputs<'_>) -> ScoredItem {
    let ticker = item.ticker.clone();
    let mut scored = ScoredItem::new(item.id.clone(), ticker.clone());

    // Step 1+2: earnings scoring feeds the aggregator, then fuse sources.
    let mut contributions = inputs.sentiment_contributions;
    let mut earnings_bucket: Option<(Decimal, Decimal)> = None;
    if let Some(earnings) = &inputs.earnings_result {
        contributions.push((
            "earnings".to_string(),
            earnings.sentiment_score,
            inputs
                .all_known_weights
                .get("earnings")
                .copied()
                .unwrap_or(dec!(0.35)),
            crate::sentiment::sources::default_confidence("earnings"),
        ));
        earnings_bucket = Some(earnings_score_adjustment(earnings.sentiment_score));
        scored.attachments.push(Attachment::Earnings {
            label: if earnings.sentiment_score > dec!(0.05) {
                EarningsLabel::Beat
            } else if earnings.sentiment_score < dec!(-0.05) {
                EarningsLabel::Miss
            } else {
                EarningsLabel::InLine
            },
            actual_eps: earnings.actual_eps,
            estimate_eps: earnings.estimate_eps,
            actual_revenue: earnings.actual_revenue,
            estimate_revenue: earnings.estimate_revenue,
            sentiment_score: earnings.sentiment_score,
        });
    }

    let SentimentAggregate {
        mut sentiment,
        mut confidence,
        contributions: recorded,
    } = aggregate(&contributions, &inputs.all_known_weights, inputs.vix);

    if let Some((_, bump)) = earnings_bucket {
        confidence = (confidence + bump).min(Decimal::ONE);
    }

    // Step 3: optional multi-dimensional sentiment from raw.sentiment_analysis.
    if let Some(analysis) = item.raw.get("sentiment_analysis") {
        let numeric = analysis.get("numeric").and_then(|v| v.as_f64());
        let categorical = analysis.get("categorical").and_then(|v| v.as_str());
        let raw_confidence = analysis.get("confidence").and_then(|v| v.as_f64()).unwrap_or(0.0);
        if raw_confidence >= 0.5 {
            if let (Some(numeric), Some(categorical)) = (numeric, categorical) {
                let numeric = Decimal::try_from(numeric).unwrap_or(Decimal::ZERO);
                let categorical_score = match categorical {
                    "bullish" => dec!(0.7),
                    "bearish" => dec!(-0.7),
                    _ => Decimal::ZERO,
                };
                let blended = numeric * dec!(0.7) + categorical_score * dec!(0.3);
                let raw_confidence_dec = Decimal::try_from(raw_confidence).unwrap_or(Decimal::ZERO);
                scored.attachments.push(Attachment::MultiDimSentiment {
                    numeric,
                    categorical: categorical_score,
                    confidence: raw_confidence_dec,
                    blended,
                });
                sentiment = blended;
                confidence = confidence.max(raw_confidence_dec);
            }
        }
    }
    scored.sentiment = sentiment.clamp(dec!(-1), dec!(1));

    // Step 4: keyword matching.
    let text = item.searchable_text();
    let keyword_match = keywords::match_keywords(&text, &inputs.dynamic_keyword_weights);
    scored.keyword_hits = keyword_match.hits.clone();
    scored.tags = {
        let mut tags = keyword_match.hits.clone();
        tags.sort();
        tags.dedup();
        tags
    };
    let mut total_keyword_score = keyword_match.total_score;

    // Step 5: negative-keyword handling + offering-stage correction.
    let mut negative_keywords: Vec<String> =
        keyword_match.hits.iter().filter(|c| is_negative_category(c)).cloned().collect();

    let (corrected_sentiment, offering_stage, offering_corrected) =
        apply_offering_sentiment_correction(&item.title, item.summary.as_deref().unwrap_or(""), scored.sentiment, OFFERING_MIN_CONFIDENCE);
    if offering_corrected {
        scored.sentiment = corrected_sentiment;
        if let Some(stage) = offering_stage {
            scored.attachments.push(Attachment::Offering {
                stage: offering_stage_model(stage),
                confidence: OFFERING_MIN_CONFIDENCE,
                override_sentiment: corrected_sentiment,
            });
            if matches!(stage, OfferingStageKind::Closing | OfferingStageKind::Debt) {
                negative_keywords.retain(|kw| kw != "offering_negative");
            }
        }
    }
    scored.negative_keywords = negative_keywords.clone();

    if !negative_keywords.is_empty() && inputs.ctx.config.features.negative_alerts {
        total_keyword_score *= dec!(-2.0);
    }

    // Step 6: source credibility. `legacy_source_weight` is a per-host RSS
    // feed multiplier, independent of the tier table; `effective_weight` is
    // the tier weight, blended 50/50 with the dynamic scorer's overlay when
    // one is configured (spec.md §4.1/§4.5 step 6).
    let static_weight = get_source_weight(&item.source_host);
    let tier = get_source_tier(&item.source_host);
    let effective_weight = match inputs.dynamic_scorer {
        Some(scorer) => {
            let dynamic_weight = scorer.get_source_weight(&item.source_host);
            (static_weight + dynamic_weight) / dec!(2)
        }
        None => static_weight,
    };
    scored.attachments.push(Attachment::Credibility {
        domain: item.source_host.clone(),
        tier,
        static_weight,
        effective_weight,
    });
    let legacy_source_weight = inputs
        .source_weight_overrides
        .get(&item.source_host)
        .copied()
        .unwrap_or(Decimal::ONE);
    let combined_source_weight = legacy_source_weight * effective_weight;

    // Step 7: semantic keyphrases (title-derived, capped at 5 words).
    let phrases: Vec<String> = item
        .title
        .split_whitespace()
        .filter(|w| w.len() > 4)
        .take(5)
        .map(|w| w.to_lowercase())
        .collect();
    if !phrases.is_empty() {
        scored.attachments.push(Attachment::SemanticKeywords { phrases });
    }

    // Step 8: relevance, ticker multiplier, running total_score.
    let relevance = total_keyword_score * combined_source_weight;
    let ticker_multiplier = match (&ticker, inputs.ticker_profiler) {
        (Some(ticker), Some(profiler)) => profiler.multiplier(ticker, inputs.sector, &scored.keyword_hits),
        _ => Decimal::ONE,
    };
    scored.relevance = relevance * ticker_multiplier;
    scored.total_score = scored.relevance + scored.sentiment;

    // Step 9: earnings boost/penalty bands.
    if let Some((adjustment, _)) = earnings_bucket {
        scored.total_score += adjustment;
    }

    // Step 10: fundamental score.
    if let (Some(ticker), Some(cache)) = (&ticker, inputs.fundamentals) {
        if let Ok(fundamental) = fundamental_scorer::score(cache, ticker) {
            scored.total_score += fundamental.score;
            if !fundamental.reasons.is_empty() {
                scored.attachments.push(Attachment::Fundamental {
                    float_shares: None,
                    short_interest_pct: None,
                    score: fundamental.score,
                    reasons: fundamental.reasons,
                });
            }
        }
    }

    // Step 11: market-regime multiplier.
    if let Some(regime) = inputs.regime {
        scored.total_score *= regime.multiplier;
        scored.attachments.push(Attachment::Regime {
            regime: regime.regime,
            trend: regime.trend,
            multiplier: regime.multiplier,
            confidence: regime.confidence,
        });
    }

    let _ = recorded; // retained on SentimentAggregate for callers that want the full breakdown
    scored.enriched = false;
    scored
}

/// Runs a single `SentimentSource` and turns an abstention into `None`
/// rather than surfacing the error, so a caller can assemble
/// `sentiment_contributions` with a simple filter-map over several sources.
pub async fn try_score(
    source: &dyn SentimentSource,
    ticker: &str,
    item: &NewsItem,
    ctx: &Context,
    weight: Decimal,
) -> Option<(String, Decimal, Decimal, Decimal)> {
    match source.score(ticker, item, ctx).await {
        Ok(score) => Some((
            source.name().to_string(),
            score,
            weight,
            crate::sentiment::sources::default_confidence(source.name()),
        )),
        Err(e) if e.is_abstain() => None,
        Err(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalyst_models::{CatalystConfig, FrozenClock};
    use chrono::{DateTime, Utc};
    use std::sync::Arc;

    fn ctx() -> Context {
        let ts: DateTime<Utc> = "2024-01-10T16:00:00Z".parse().unwrap();
        Context::new(CatalystConfig::default(), Arc::new(FrozenClock(ts)))
    }

    fn item(title: &str, ticker: Option<&str>) -> NewsItem {
        NewsItem {
            schema_version: 1,
            id: "1".to_string(),
            ts_utc: Utc::now(),
            title: title.to_string(),
            summary: None,
            ticker: ticker.map(|t| t.to_string()),
            source_host: "businesswire.com".to_string(),
            canonical_url: None,
            raw: serde_json::Value::Null,
        }
    }

    fn base_inputs(ctx: &Context) -> ClassifierInputs<'_> {
        ClassifierInputs {
            ctx,
            sentiment_contributions: Vec::new(),
            all_known_weights: HashMap::new(),
            vix: None,
            earnings_result: None,
            dynamic_scorer: None,
            ticker_profiler: None,
            sector: None,
            fundamentals: None,
            regime: None,
            dynamic_keyword_weights: HashMap::new(),
            source_weight_overrides: HashMap::new(),
        }
    }

    #[test]
    fn fast_path_output_is_never_enriched() {
        let ctx = ctx();
        let news = item("Company announces FDA approval", Some("ABCD"));
        let scored = classify(&news, base_inputs(&ctx));
        assert!(!scored.enriched);
        assert!(scored.enrichment_timestamp.is_none());
    }

    #[test]
    fn offering_closing_removes_negative_keyword_and_corrects_sentiment() {
        let ctx = ctx();
        let news = item(
            "POET Technologies Announces Closing of US$150 Million Oversubscribed Registered Direct Offering",
            Some("POET"),
        );
        let mut inputs = base_inputs(&ctx);
        inputs.sentiment_contributions = vec![("vader".to_string(), dec!(-0.6), dec!(0.25), dec!(0.60))];
        inputs.all_known_weights.insert("vader".to_string(), dec!(0.25));
        let scored = classify(&news, inputs);
        assert_eq!(scored.sentiment, dec!(0.2));
        assert!(!scored.negative_keywords.contains(&"offering_negative".to_string()));
    }

    #[test]
    fn debt_offering_is_not_flagged_negative() {
        let ctx = ctx();
        let news = item(
            "Prospect Capital Corporation Announces Pricing of $167 Million 5.5% Oversubscribed Institutional Unsecured Notes Offering",
            Some("PSEC"),
        );
        let scored = classify(&news, base_inputs(&ctx));
        assert_eq!(scored.sentiment, dec!(0.3));
        assert!(!scored.negative_keywords.contains(&"offering_negative".to_string()));
    }

    #[test]
    fn negative_alerts_flip_keyword_score_when_flag_enabled() {
        let mut config = CatalystConfig::default();
        config.features.negative_alerts = true;
        let ts: DateTime<Utc> = "2024-01-10T16:00:00Z".parse().unwrap();
        let ctx = Context::new(config, Arc::new(FrozenClock(ts)));
        let news = item("Company announces dilutive warrant exercise", Some("ABCD"));
        let scored = classify(&news, base_inputs(&ctx));
        assert!(scored.relevance <= Decimal::ZERO);
    }
}
