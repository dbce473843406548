use std::collections::HashMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

const MIN_TICKER_OBSERVATIONS: u32 = 5;
const MIN_KEYWORD_OCCURRENCES: u32 = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordStat {
    pub success_rate: Decimal,
    pub avg_return_pct: Decimal,
    pub occurrences: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TickerProfile {
    pub observation_count: u32,
    pub keywords: HashMap<String, KeywordStat>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TickerProfiler {
    pub tickers: HashMap<String, TickerProfile>,
    pub sectors: HashMap<String, TickerProfile>,
}

fn affinity(stat: &KeywordStat) -> Decimal {
    (stat.success_rate * (Decimal::ONE + stat.avg_return_pct / dec!(50))).clamp(dec!(0.5), dec!(2.5))
}

fn profile_multiplier(profile: &TickerProfile, min_observations: u32, matched_keywords: &[String]) -> Option<Decimal> {
    if profile.observation_count < min_observations {
        return None;
    }

    let qualifying: Vec<&KeywordStat> = profile
        .keywords
        .values()
        .filter(|stat| stat.occurrences >= MIN_KEYWORD_OCCURRENCES)
        .collect();

    let matched: Vec<Decimal> = matched_keywords
        .iter()
        .filter_map(|kw| profile.keywords.get(kw))
        .filter(|stat| stat.occurrences >= MIN_KEYWORD_OCCURRENCES)
        .map(affinity)
        .collect();

    if !matched.is_empty() {
        let sum: Decimal = matched.iter().sum();
        return Some(sum / Decimal::from(matched.len()));
    }

    if qualifying.is_empty() {
        return Some(Decimal::ONE);
    }
    let sum: Decimal = qualifying.iter().map(|stat| affinity(stat)).sum();
    Some(sum / Decimal::from(qualifying.len()))
}

impl TickerProfiler {
    /// Ticker profile multiplier if enough observations exist; else falls
    /// back to the sector profile (double the observation threshold); else
    /// 1.0 (spec.md §4.6).
    pub fn multiplier(&self, ticker: &str, sector: Option<&str>, matched_keywords: &[String]) -> Decimal {
        if let Some(profile) = self.tickers.get(ticker) {
            if let Some(m) = profile_multiplier(profile, MIN_TICKER_OBSERVATIONS, matched_keywords) {
                return m;
            }
        }
        if let Some(sector) = sector {
            if let Some(profile) = self.sectors.get(sector) {
                if let Some(m) = profile_multiplier(profile, MIN_TICKER_OBSERVATIONS * 2, matched_keywords) {
                    return m;
                }
            }
        }
        Decimal::ONE
    }
}
