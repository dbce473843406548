use catalyst_cache::FundamentalsCache;
use chrono::Duration;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::ClassifyError;

const FLOAT_TTL_DAYS: i64 = 30;
const SHORT_INTEREST_TTL_DAYS: i64 = 14;

pub struct FundamentalScore {
    pub score: Decimal,
    pub reasons: Vec<String>,
}

fn float_band(float_shares: Decimal) -> (Decimal, &'static str) {
    if float_shares < dec!(10_000_000) {
        (dec!(0.5), "fundamental_float_under_10m")
    } else if float_shares < dec!(50_000_000) {
        (dec!(0.3), "fundamental_float_under_50m")
    } else if float_shares < dec!(100_000_000) {
        (dec!(0.1), "fundamental_float_under_100m")
    } else {
        (dec!(-0.1), "fundamental_float_over_100m")
    }
}

fn short_interest_band(short_interest_pct: Decimal) -> Option<(Decimal, &'static str)> {
    if short_interest_pct >= dec!(20) {
        Some((dec!(0.5), "fundamental_short_interest_ge_20"))
    } else if short_interest_pct >= dec!(15) {
        Some((dec!(0.3), "fundamental_short_interest_ge_15"))
    } else if short_interest_pct >= dec!(10) {
        Some((dec!(0.15), "fundamental_short_interest_ge_10"))
    } else {
        None
    }
}

/// Looks up float shares / short-interest percent in the cache (with
/// separate TTLs per spec.md §4.7) and sums the additive bands. Missing
/// fields simply contribute nothing rather than erroring.
pub fn score(cache: &FundamentalsCache, ticker: &str) -> Result<FundamentalScore, ClassifyError> {
    let mut score = Decimal::ZERO;
    let mut reasons = Vec::new();

    if let Some(raw) = cache.get(ticker, "float_shares", Duration::days(FLOAT_TTL_DAYS))? {
        if let Ok(float_shares) = raw.parse::<Decimal>() {
            let (band_score, reason) = float_band(float_shares);
            score += band_score;
            reasons.push(reason.to_string());
        }
    }

    if let Some(raw) = cache.get(ticker, "short_interest_pct", Duration::days(SHORT_INTEREST_TTL_DAYS))? {
        if let Ok(short_interest_pct) = raw.parse::<Decimal>() {
            if let Some((band_score, reason)) = short_interest_band(short_interest_pct) {
                score += band_score;
                reasons.push(reason.to_string());
            }
        }
    }

    Ok(FundamentalScore { score, reasons })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_float_and_high_short_interest_stack_additively() {
        let cache = FundamentalsCache::open_in_memory().unwrap();
        cache.put("ABCD", "float_shares", "8000000").unwrap();
        cache.put("ABCD", "short_interest_pct", "22").unwrap();

        let result = score(&cache, "ABCD").unwrap();
        assert_eq!(result.score, dec!(1.0));
        assert_eq!(result.reasons.len(), 2);
    }

    #[test]
    fn missing_fundamentals_score_zero_with_no_reasons() {
        let cache = FundamentalsCache::open_in_memory().unwrap();
        let result = score(&cache, "UNKNOWN").unwrap();
        assert_eq!(result.score, Decimal::ZERO);
        assert!(result.reasons.is_empty());
    }

    #[test]
    fn large_float_is_a_penalty() {
        let cache = FundamentalsCache::open_in_memory().unwrap();
        cache.put("ABCD", "float_shares", "500000000").unwrap();
        let result = score(&cache, "ABCD").unwrap();
        assert_eq!(result.score, dec!(-0.1));
    }
}
