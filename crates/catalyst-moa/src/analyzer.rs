use std::collections::HashMap;

use catalyst_cache::{AppendLog, OutcomesStore};
use catalyst_models::{HorizonOutcome, OutcomeRecord, HORIZONS};
use catalyst_trading::MarketDataProvider;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::MoaError;
use crate::input::{within_window, AcceptedItem, RejectedItem};
use crate::keyword_stats::aggregate;
use crate::ngram::mine_phrases;
use crate::prices::{fetch_horizon, is_tradeable, PriceCache};
use crate::recommendations::{existing_keyword_recommendations, new_phrase_recommendations, WeightRecommendation};

#[derive(Debug, Clone)]
pub struct MoaRunOutcome {
    pub rows_considered: usize,
    pub missed_opportunities: usize,
    pub recommendations: Vec<WeightRecommendation>,
}

/// Runs the full MOA pipeline once (spec.md §4.13 steps 1-5); persistence of
/// `recommendations.json`/`analysis_state.json` is the caller's job via
/// [`crate::persistence`].
#[allow(clippy::too_many_arguments)]
pub async fn run_analysis(
    rejected_log: &AppendLog,
    accepted_log: &AppendLog,
    outcomes_store: &OutcomesStore,
    provider: &dyn MarketDataProvider,
    current_weights: &HashMap<String, Decimal>,
    since_days: i64,
    require_tradeable: bool,
    now: DateTime<Utc>,
) -> Result<MoaRunOutcome, MoaError> {
    let rejected: Vec<RejectedItem> = rejected_log.read_all()?;
    let accepted: Vec<AcceptedItem> = accepted_log.read_all()?;
    let cache = PriceCache::new();

    let mut rows = Vec::new();
    for item in rejected.into_iter().filter(|r| within_window(r.ts, now, since_days)) {
        let mut outcome = match outcomes_store.get(&item.ticker, item.ts)? {
            Some(existing) => existing,
            None => OutcomeRecord::new(item.ticker.clone(), item.ts, item.price, item.rejection_reason.clone()),
        };

        for horizon in HORIZONS {
            if outcome.outcomes.get(horizon).map(|o| o.is_some()).unwrap_or(false) {
                continue;
            }
            let Some(resolved) = fetch_horizon(&cache, provider, &item.ticker, item.ts, horizon).await? else {
                continue;
            };
            if require_tradeable && !is_tradeable(&resolved) {
                continue;
            }
            let return_pct = (resolved.price - item.price) / item.price * dec!(100);
            outcome.set_horizon(
                horizon,
                HorizonOutcome {
                    price: resolved.price,
                    return_pct,
                    checked_at: now,
                },
            );
        }

        outcomes_store.upsert(outcome.clone())?;
        rows.push((item, outcome));
    }

    let missed_opportunities = rows.iter().filter(|(_, o)| o.is_missed_opportunity).count();

    let stats = aggregate(&rows);
    let mut recommendations = existing_keyword_recommendations(&stats, current_weights);

    let pos_titles: Vec<String> = rows
        .iter()
        .filter(|(_, o)| o.is_missed_opportunity)
        .map(|(item, _)| item.title.clone())
        .collect();
    let neg_titles: Vec<String> = accepted.into_iter().map(|a| a.title).collect();
    let phrases = mine_phrases(&pos_titles, &neg_titles);
    recommendations.extend(new_phrase_recommendations(&phrases));

    Ok(MoaRunOutcome {
        rows_considered: rows.len(),
        missed_opportunities,
        recommendations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalyst_models::PriceBar;
    use catalyst_trading::PriceSnapshot;
    use chrono::{Duration, NaiveDate};
    use rust_decimal_macros::dec;
    use std::collections::HashMap as StdHashMap;

    struct StubProvider {
        intraday: StdHashMap<String, Vec<PriceBar>>,
    }

    #[async_trait::async_trait]
    impl MarketDataProvider for StubProvider {
        async fn get_last_price_snapshot(
            &self,
            _ticker: &str,
        ) -> Result<Option<PriceSnapshot>, catalyst_trading::TradingError> {
            Ok(None)
        }

        async fn get_intraday_bars(
            &self,
            ticker: &str,
            _interval_minutes: u32,
            _since: DateTime<Utc>,
        ) -> Result<Vec<PriceBar>, catalyst_trading::TradingError> {
            Ok(self.intraday.get(ticker).cloned().unwrap_or_default())
        }

        async fn get_daily_bars(
            &self,
            _ticker: &str,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<Vec<PriceBar>, catalyst_trading::TradingError> {
            Ok(Vec::new())
        }
    }

    fn bar(ts: DateTime<Utc>, close: Decimal, volume: Decimal) -> PriceBar {
        PriceBar {
            timestamp: ts,
            open: close,
            high: close,
            low: close,
            close,
            volume,
        }
    }

    #[tokio::test]
    async fn abcd_scenario_matches_spec_example() {
        // spec.md §8 scenario 6.
        let dir = tempfile::tempdir().unwrap();
        let rejection_ts: DateTime<Utc> = "2024-01-10T14:00:00Z".parse().unwrap();

        let rejected_log = AppendLog::open(dir.path().join("rejected_items.jsonl")).unwrap();
        rejected_log
            .append(&RejectedItem {
                ts: rejection_ts,
                ticker: "ABCD".to_string(),
                price: dec!(2.00),
                rejection_reason: "below_threshold".to_string(),
                title: "ABCD announces partnership".to_string(),
                keywords: vec!["partnership".to_string()],
            })
            .unwrap();
        let accepted_log = AppendLog::open(dir.path().join("accepted_items.jsonl")).unwrap();
        let outcomes_store = OutcomesStore::open(dir.path().join("outcomes.jsonl")).unwrap();

        let provider = StubProvider {
            intraday: StdHashMap::from([(
                "ABCD".to_string(),
                vec![
                    bar(rejection_ts + Duration::minutes(15), dec!(2.01), dec!(200_000)),
                    bar(rejection_ts + Duration::minutes(30), dec!(2.02), dec!(200_000)),
                    bar(rejection_ts + Duration::hours(1), dec!(2.05), dec!(200_000)),
                    bar(rejection_ts + Duration::hours(4), dec!(2.30), dec!(200_000)),
                ],
            )]),
        };

        let outcome = run_analysis(
            &rejected_log,
            &accepted_log,
            &outcomes_store,
            &provider,
            &HashMap::new(),
            30,
            true,
            rejection_ts + Duration::hours(5),
        )
        .await
        .unwrap();

        assert_eq!(outcome.rows_considered, 1);
        assert_eq!(outcome.missed_opportunities, 1);

        let record = outcomes_store.get("ABCD", rejection_ts).unwrap().unwrap();
        assert!(record.is_missed_opportunity);
        assert_eq!(record.max_return_pct, dec!(15.0));
        let one_hour = record.outcomes.get("1h").unwrap().as_ref().unwrap();
        assert_eq!(one_hour.return_pct, dec!(2.5));
    }
}
