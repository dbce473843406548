use std::collections::HashMap;
use std::sync::OnceLock;

use catalyst_models::{CatalystConfig, ScoredItem, SignalAction, TradingSignal, SIGNAL_SCHEMA_VERSION};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

/// One BUY keyword's trading parameters, spec.md §4.10 addendum.
#[derive(Debug, Clone, Copy)]
pub struct BuyKeywordConfig {
    pub base_confidence: Decimal,
    pub size_multiplier: Decimal,
    pub stop_loss_pct: Decimal,
    pub take_profit_pct: Decimal,
    pub rationale: &'static str,
}

fn core_buy_keywords() -> &'static HashMap<&'static str, BuyKeywordConfig> {
    static TABLE: OnceLock<HashMap<&'static str, BuyKeywordConfig>> = OnceLock::new();
    TABLE.get_or_init(|| {
        HashMap::from([
            ("fda", cfg(dec!(0.92), dec!(1.6), dec!(5.0), dec!(12.0), "fda_catalyst")),
            ("merger", cfg(dec!(0.95), dec!(2.0), dec!(4.0), dec!(15.0), "merger_catalyst")),
            ("acquisition", cfg(dec!(0.90), dec!(1.7), dec!(4.5), dec!(14.0), "acquisition_catalyst")),
            ("partnership", cfg(dec!(0.85), dec!(1.4), dec!(5.0), dec!(10.0), "partnership_catalyst")),
            ("trial", cfg(dec!(0.88), dec!(1.5), dec!(6.0), dec!(12.0), "trial_catalyst")),
            ("clinical", cfg(dec!(0.88), dec!(1.5), dec!(6.0), dec!(12.0), "clinical_catalyst")),
            ("uplisting", cfg(dec!(0.87), dec!(1.3), dec!(5.5), dec!(11.0), "uplisting_catalyst")),
        ])
    })
}

fn extended_buy_keywords() -> &'static HashMap<&'static str, BuyKeywordConfig> {
    static TABLE: OnceLock<HashMap<&'static str, BuyKeywordConfig>> = OnceLock::new();
    TABLE.get_or_init(|| {
        HashMap::from([
            ("earnings", cfg(dec!(0.82), dec!(1.3), dec!(5.0), dec!(10.0), "earnings_catalyst")),
            ("guidance", cfg(dec!(0.80), dec!(1.2), dec!(5.5), dec!(9.0), "guidance_catalyst")),
            ("energy_discovery", cfg(dec!(0.85), dec!(1.5), dec!(6.0), dec!(15.0), "energy_discovery_catalyst")),
            ("advanced_therapies", cfg(dec!(0.86), dec!(1.4), dec!(6.0), dec!(12.0), "advanced_therapies_catalyst")),
            ("tech_contracts", cfg(dec!(0.83), dec!(1.3), dec!(5.0), dec!(10.0), "tech_contracts_catalyst")),
            ("ai_quantum", cfg(dec!(0.84), dec!(1.4), dec!(5.5), dec!(12.0), "ai_quantum_catalyst")),
            ("crypto_blockchain", cfg(dec!(0.78), dec!(1.2), dec!(7.0), dec!(15.0), "crypto_blockchain_catalyst")),
            ("mining_resources", cfg(dec!(0.82), dec!(1.3), dec!(6.0), dec!(12.0), "mining_resources_catalyst")),
            ("compliance", cfg(dec!(0.80), dec!(1.2), dec!(5.0), dec!(8.0), "compliance_catalyst")),
            ("activist_institutional", cfg(dec!(0.81), dec!(1.3), dec!(5.0), dec!(10.0), "activist_institutional_catalyst")),
        ])
    })
}

const fn cfg(
    base_confidence: Decimal,
    size_multiplier: Decimal,
    stop_loss_pct: Decimal,
    take_profit_pct: Decimal,
    rationale: &'static str,
) -> BuyKeywordConfig {
    BuyKeywordConfig {
        base_confidence,
        size_multiplier,
        stop_loss_pct,
        take_profit_pct,
        rationale,
    }
}

const AVOID_KEYWORDS: &[&str] = &[
    "offering",
    "dilution",
    "warrant",
    "rs",
    "reverse_split",
    "offering_negative",
    "warrant_negative",
    "dilution_negative",
];

const CLOSE_KEYWORDS: &[&str] = &["bankruptcy", "delisting", "going_concern", "fraud", "distress_negative"];

const MIN_POSITION_SIZE_PCT: Decimal = dec!(0.5);
const MIN_RISK_REWARD: Decimal = dec!(2.0);

fn lookup_keyword_config(
    tags: &[String],
    extended_keywords_enabled: bool,
) -> Option<(&'static str, BuyKeywordConfig)> {
    let mut best: Option<(&'static str, BuyKeywordConfig, Decimal)> = None;

    let mut consider = |name: &'static str, config: BuyKeywordConfig, weight: Decimal| {
        let rank = weight * config.base_confidence;
        if best.as_ref().map(|(_, _, r)| rank > *r).unwrap_or(true) {
            best = Some((name, config, rank));
        }
    };

    for (name, config) in core_buy_keywords() {
        if tags.iter().any(|t| t == name) {
            consider(name, *config, Decimal::ONE);
        }
    }
    if extended_keywords_enabled {
        for (name, config) in extended_buy_keywords() {
            if tags.iter().any(|t| t == name) {
                consider(name, *config, Decimal::ONE);
            }
        }
    }
    best.map(|(name, config, _)| (name, config))
}

/// Generates a `TradingSignal` from a fully-scored item per spec.md §4.10.
/// `feedback_multiplier` is the per-keyword historical-performance multiplier
/// (default 1.0 when absent, mirroring the dynamic source scorer's pattern).
pub fn generate(
    item: &ScoredItem,
    entry_price: Decimal,
    config: &CatalystConfig,
    feedback_multiplier: &HashMap<String, Decimal>,
    now: DateTime<Utc>,
) -> Option<TradingSignal> {
    let ticker = item.ticker.clone()?;

    // Step 1: CLOSE keywords bypass score/confidence gates entirely.
    if item.tags.iter().any(|t| CLOSE_KEYWORDS.contains(&t.as_str())) {
        return Some(TradingSignal {
            schema_version: SIGNAL_SCHEMA_VERSION,
            signal_id: Uuid::new_v4(),
            ticker,
            timestamp: now,
            action: SignalAction::Close,
            confidence: Decimal::ONE,
            entry_price,
            current_price: entry_price,
            position_size_pct: Decimal::ZERO,
            signal_type: "distress".to_string(),
            timeframe: "intraday".to_string(),
            strategy: "distress_close".to_string(),
            stop_loss_price: None,
            take_profit_price: None,
            extended_hours: false,
            metadata: serde_json::json!({ "reason": "distress_signal_detected" }),
        });
    }

    // Step 2: any AVOID keyword vetoes a signal outright.
    if item.tags.iter().any(|t| AVOID_KEYWORDS.contains(&t.as_str())) {
        return None;
    }

    // Step 3: strongest BUY keyword selects a config.
    let (keyword, keyword_config) = lookup_keyword_config(&item.tags, config.features.extended_keywords)?;

    let sentiment_alignment_bonus = if item.sentiment > dec!(0.3) {
        dec!(1.2)
    } else {
        Decimal::ONE
    };
    let feedback = feedback_multiplier.get(keyword).copied().unwrap_or(Decimal::ONE);
    let confidence = (keyword_config.base_confidence * sentiment_alignment_bonus * feedback)
        .clamp(Decimal::ZERO, Decimal::ONE);

    let min_score = Decimal::try_from(config.signal.min_score).unwrap_or(Decimal::ONE);
    let min_confidence = Decimal::try_from(config.signal.min_confidence).unwrap_or(dec!(0.70));
    if item.total_score < min_score || confidence < min_confidence {
        return None;
    }

    let base_position_pct = Decimal::try_from(config.signal.position_size_base_pct).unwrap_or(Decimal::ONE);
    let max_position_pct = Decimal::try_from(config.signal.position_size_max_pct).unwrap_or(dec!(5.0));
    let position_size_pct = (base_position_pct * confidence * keyword_config.size_multiplier)
        .clamp(MIN_POSITION_SIZE_PCT, max_position_pct);

    let stop_loss_price = entry_price * (Decimal::ONE - keyword_config.stop_loss_pct / dec!(100));
    let take_profit_price = entry_price * (Decimal::ONE + keyword_config.take_profit_pct / dec!(100));

    let reward = (take_profit_price - entry_price).abs();
    let risk = (entry_price - stop_loss_price).abs();
    if risk == Decimal::ZERO || reward / risk < MIN_RISK_REWARD {
        return None;
    }

    Some(TradingSignal {
        schema_version: SIGNAL_SCHEMA_VERSION,
        signal_id: Uuid::new_v4(),
        ticker,
        timestamp: now,
        action: SignalAction::Buy,
        confidence,
        entry_price,
        current_price: entry_price,
        position_size_pct,
        signal_type: "catalyst".to_string(),
        timeframe: "intraday".to_string(),
        strategy: keyword_config.rationale.to_string(),
        stop_loss_price: Some(stop_loss_price),
        take_profit_price: Some(take_profit_price),
        extended_hours: false,
        metadata: serde_json::json!({ "keyword": keyword }),
    })
}
