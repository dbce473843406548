use std::collections::HashMap;

use catalyst_models::OutcomeRecord;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::input::RejectedItem;

const MIN_OCCURRENCES: u32 = 15;

/// Per-keyword performance across every rejected item that carries it and has
/// a resolved `OutcomeRecord`, spec.md §4.13 step 3.
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordStat {
    pub keyword: String,
    pub occurrences: u32,
    pub success_rate: f64,
    pub avg_return_pct: f64,
}

/// Aggregates keyword hit/return statistics across `rows`, keeping only
/// keywords with at least `MIN_OCCURRENCES` occurrences.
pub fn aggregate(rows: &[(RejectedItem, OutcomeRecord)]) -> Vec<KeywordStat> {
    struct Acc {
        occurrences: u32,
        missed: u32,
        return_sum: Decimal,
    }

    let mut acc: HashMap<String, Acc> = HashMap::new();
    for (item, outcome) in rows {
        for keyword in &item.keywords {
            let entry = acc.entry(keyword.clone()).or_insert(Acc {
                occurrences: 0,
                missed: 0,
                return_sum: Decimal::ZERO,
            });
            entry.occurrences += 1;
            if outcome.is_missed_opportunity {
                entry.missed += 1;
            }
            entry.return_sum += outcome.max_return_pct;
        }
    }

    let mut out: Vec<KeywordStat> = acc
        .into_iter()
        .filter(|(_, a)| a.occurrences >= MIN_OCCURRENCES)
        .map(|(keyword, a)| {
            let success_rate = a.missed as f64 / a.occurrences as f64;
            let avg_return_pct = (a.return_sum / Decimal::from(a.occurrences))
                .to_f64()
                .unwrap_or(0.0);
            KeywordStat {
                keyword,
                occurrences: a.occurrences,
                success_rate,
                avg_return_pct,
            }
        })
        .collect();
    out.sort_by(|a, b| a.keyword.cmp(&b.keyword));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn row(keyword: &str, missed: bool, max_return: Decimal) -> (RejectedItem, OutcomeRecord) {
        let item = RejectedItem {
            ts: Utc::now(),
            ticker: "ABCD".to_string(),
            price: dec!(2.00),
            rejection_reason: "below_threshold".to_string(),
            title: format!("{keyword} announced"),
            keywords: vec![keyword.to_string()],
        };
        let mut outcome = OutcomeRecord::new("ABCD", item.ts, item.price, item.rejection_reason.clone());
        outcome.is_missed_opportunity = missed;
        outcome.max_return_pct = max_return;
        (item, outcome)
    }

    #[test]
    fn below_min_occurrences_is_excluded() {
        let rows: Vec<_> = (0..14).map(|_| row("partnership", true, dec!(12.0))).collect();
        assert!(aggregate(&rows).is_empty());
    }

    #[test]
    fn at_min_occurrences_computes_rates() {
        let mut rows: Vec<_> = (0..10).map(|_| row("partnership", true, dec!(12.0))).collect();
        rows.extend((0..5).map(|_| row("partnership", false, dec!(3.0))));
        let stats = aggregate(&rows);
        assert_eq!(stats.len(), 1);
        let stat = &stats[0];
        assert_eq!(stat.occurrences, 15);
        assert!((stat.success_rate - (10.0 / 15.0)).abs() < 1e-9);
    }
}
