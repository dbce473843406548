use std::collections::HashMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::keyword_stats::KeywordStat;
use crate::ngram::PhraseStat;

const HIGH_SUCCESS_BAND: f64 = 0.70;
const MEDIUM_SUCCESS_BAND: f64 = 0.55;
const LOW_SUCCESS_BAND: f64 = 0.40;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeightRecommendation {
    pub keyword: String,
    pub is_new_phrase: bool,
    pub current_weight: Option<Decimal>,
    pub proposed_weight: Decimal,
    pub delta: Decimal,
    pub confidence: Confidence,
    pub sample_size: u32,
    pub success_rate: f64,
    pub avg_return_pct: f64,
}

/// Δ by success-rate band for a keyword already in the weight table
/// (spec.md §4.13 step 5). Bands mirror the reward/penalty split used by
/// the dynamic source scorer. `None` means "don't recommend anything".
fn delta_for_success_rate(success_rate: f64) -> Option<Decimal> {
    if success_rate >= HIGH_SUCCESS_BAND {
        Some(dec!(0.3))
    } else if success_rate >= MEDIUM_SUCCESS_BAND {
        Some(dec!(0.2))
    } else if success_rate >= LOW_SUCCESS_BAND {
        Some(dec!(0.1))
    } else {
        None
    }
}

fn confidence_label(sample_size: u32, success_rate: f64) -> Confidence {
    if sample_size >= 50 && success_rate >= HIGH_SUCCESS_BAND {
        Confidence::High
    } else if sample_size >= 15 {
        Confidence::Medium
    } else {
        Confidence::Low
    }
}

/// Existing-keyword recommendations. `current_weights` is the dynamic-weights
/// map the classifier already loads (spec.md §4.5 step 4); a keyword absent
/// from it falls back to a weight of `1.0`.
pub fn existing_keyword_recommendations(
    stats: &[KeywordStat],
    current_weights: &HashMap<String, Decimal>,
) -> Vec<WeightRecommendation> {
    stats
        .iter()
        .filter_map(|stat| {
            let delta = delta_for_success_rate(stat.success_rate)?;
            let current = current_weights.get(&stat.keyword).copied().unwrap_or(Decimal::ONE);
            Some(WeightRecommendation {
                keyword: stat.keyword.clone(),
                is_new_phrase: false,
                current_weight: Some(current),
                proposed_weight: current + delta,
                delta,
                confidence: confidence_label(stat.occurrences, stat.success_rate),
                sample_size: stat.occurrences,
                success_rate: stat.success_rate,
                avg_return_pct: stat.avg_return_pct,
            })
        })
        .collect()
}

/// New-phrase recommendations, spec.md §4.13 step 5's clamp formula:
/// `clamp(0.3 + min(0.5, (lift - 2) * 0.1) + min(0.2, pos_count / 20), 0, 0.8)`.
pub fn new_phrase_recommendations(phrases: &[PhraseStat]) -> Vec<WeightRecommendation> {
    phrases
        .iter()
        .map(|phrase| {
            let lift_term = (0.5f64).min((phrase.lift - 2.0) * 0.1);
            let volume_term = (0.2f64).min(phrase.pos_count as f64 / 20.0);
            let raw = 0.3 + lift_term + volume_term;
            let proposed = raw.clamp(0.0, 0.8);
            let proposed_weight = Decimal::try_from(proposed).unwrap_or(dec!(0.3));
            // A new phrase has no existing success rate; approximate one from
            // the pos/neg split so the confidence label still reflects sample size.
            let implied_success_rate = phrase.pos_count as f64 / (phrase.pos_count + phrase.neg_count).max(1) as f64;
            WeightRecommendation {
                keyword: phrase.phrase.clone(),
                is_new_phrase: true,
                current_weight: None,
                proposed_weight,
                delta: proposed_weight,
                confidence: confidence_label(phrase.pos_count, implied_success_rate),
                sample_size: phrase.pos_count,
                success_rate: implied_success_rate,
                avg_return_pct: 0.0,
            }
        })
        .collect()
}
