use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;

use super::sources::VIX_PENALTY_FLOOR;

/// A source's contribution after weight x confidence fusion, recorded for
/// the `MultiDimSentiment` attachment and for debugging.
#[derive(Debug, Clone)]
pub struct SentimentContribution {
    pub source: String,
    pub score: Decimal,
    pub weight_effective: Decimal,
}

#[derive(Debug, Clone)]
pub struct SentimentAggregate {
    pub sentiment: Decimal,
    pub confidence: Decimal,
    pub contributions: Vec<SentimentContribution>,
}

/// Weighted-confidence-scaled fusion (spec.md §4.3). `contributions` holds
/// only sources that actually scored (abstaining sources must never reach
/// here as a zero). `all_known_weights` is every configured source's base
/// weight, used to compute the confidence denominator even for sources that
/// abstained this round.
pub fn aggregate(
    contributions: &[(String, Decimal, Decimal, Decimal)], // (name, score, weight, confidence)
    all_known_weights: &HashMap<String, Decimal>,
    vix: Option<Decimal>,
) -> SentimentAggregate {
    let mut numerator = Decimal::ZERO;
    let mut denominator = Decimal::ZERO;
    let mut recorded = Vec::with_capacity(contributions.len());

    for (name, score, weight, confidence) in contributions {
        let w_eff = *weight * *confidence;
        numerator += *score * w_eff;
        denominator += w_eff;
        recorded.push(SentimentContribution {
            source: name.clone(),
            score: *score,
            weight_effective: w_eff,
        });
    }

    let sentiment = if denominator > Decimal::ZERO {
        numerator / denominator
    } else {
        Decimal::ZERO
    };

    let total_known_weight: Decimal = all_known_weights.values().sum();
    let mut confidence = if total_known_weight > Decimal::ZERO {
        (denominator / total_known_weight).min(Decimal::ONE)
    } else {
        Decimal::ZERO
    };

    if let Some(vix) = vix {
        if vix > dec!(20) {
            let penalty = (Decimal::ONE - dec!(0.02) * (vix - dec!(20))).max(VIX_PENALTY_FLOOR);
            confidence *= penalty;
        }
    }

    SentimentAggregate {
        sentiment,
        confidence,
        contributions: recorded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weights() -> HashMap<String, Decimal> {
        [
            ("earnings".to_string(), dec!(0.35)),
            ("vader".to_string(), dec!(0.25)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn abstaining_sources_do_not_skew_the_average() {
        // Only vader contributed; earnings abstained. Sentiment should equal
        // vader's own score, not be diluted by a phantom zero for earnings.
        let contributions = vec![("vader".to_string(), dec!(0.8), dec!(0.25), dec!(0.60))];
        let aggregate = aggregate(&contributions, &weights(), None);
        assert_eq!(aggregate.sentiment, dec!(0.8));
    }

    #[test]
    fn confidence_reflects_fraction_of_known_weight_covered() {
        let contributions = vec![("vader".to_string(), dec!(0.8), dec!(0.25), dec!(0.60))];
        let aggregate = aggregate(&contributions, &weights(), None);
        // denominator = 0.25*0.60=0.15; total_known_weight=0.35+0.25=0.6
        assert_eq!(aggregate.confidence, dec!(0.15) / dec!(0.6));
    }

    #[test]
    fn no_contributions_returns_zero_sentiment_and_confidence() {
        let aggregate = aggregate(&[], &weights(), None);
        assert_eq!(aggregate.sentiment, Decimal::ZERO);
        assert_eq!(aggregate.confidence, Decimal::ZERO);
    }

    #[test]
    fn high_vix_applies_penalty_floored_at_half() {
        let contributions = vec![("vader".to_string(), dec!(0.8), dec!(0.25), dec!(0.60))];
        let without_vix = aggregate(&contributions, &weights(), None);
        let with_vix = aggregate(&contributions, &weights(), Some(dec!(35)));
        // penalty = max(0.5, 1 - 0.02*(35-20)) = max(0.5, 0.7) = 0.7
        assert_eq!(with_vix.confidence, without_vix.confidence * dec!(0.7));

        let extreme_vix = aggregate(&contributions, &weights(), Some(dec!(80)));
        // penalty = max(0.5, 1 - 0.02*60) = max(0.5, -0.2) = 0.5 (floor)
        assert_eq!(extreme_vix.confidence, without_vix.confidence * dec!(0.5));
    }
}
