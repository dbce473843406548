use std::collections::HashMap;
use std::sync::Mutex;

use catalyst_trading::MarketDataProvider;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

use crate::error::MoaError;

const MAX_ADVANCE_DAYS: i64 = 7;
const INTRADAY_INTERVAL_MINUTES: u32 = 1;
const INTRADAY_TOLERANCE_MINUTES: i64 = 30;

/// One resolved price point: the close used for `return_pct` plus the volume
/// of the bar it came from, for the optional tradeability filter.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedPrice {
    pub price: Decimal,
    pub volume: Decimal,
}

fn horizon_duration(horizon: &str) -> Duration {
    match horizon {
        "15m" => Duration::minutes(15),
        "30m" => Duration::minutes(30),
        "1h" => Duration::hours(1),
        "4h" => Duration::hours(4),
        "1d" => Duration::days(1),
        "7d" => Duration::days(7),
        other => panic!("unknown MOA horizon: {other}"),
    }
}

fn is_fine_horizon(horizon: &str) -> bool {
    matches!(horizon, "15m" | "30m" | "1h" | "4h")
}

fn is_weekend(ts: DateTime<Utc>) -> bool {
    use chrono::Datelike;
    matches!(ts.weekday(), chrono::Weekday::Sat | chrono::Weekday::Sun)
}

/// Shared price cache keyed by `(ticker, horizon target timestamp)`, so two
/// horizons that land on the same weekend-adjusted bar are only fetched once
/// (spec.md §4.13 step 2).
pub struct PriceCache {
    entries: Mutex<HashMap<(String, DateTime<Utc>), Option<ResolvedPrice>>>,
}

impl PriceCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub async fn resolve(
        &self,
        provider: &dyn MarketDataProvider,
        ticker: &str,
        target: DateTime<Utc>,
        fine: bool,
    ) -> Result<Option<ResolvedPrice>, MoaError> {
        if let Some(cached) = self.entries.lock().unwrap().get(&(ticker.to_string(), target)) {
            return Ok(*cached);
        }
        let resolved = resolve_with_weekend_skip(provider, ticker, target, fine).await?;
        self.entries
            .lock()
            .unwrap()
            .insert((ticker.to_string(), target), resolved);
        Ok(resolved)
    }
}

impl Default for PriceCache {
    fn default() -> Self {
        Self::new()
    }
}

async fn resolve_with_weekend_skip(
    provider: &dyn MarketDataProvider,
    ticker: &str,
    target: DateTime<Utc>,
    fine: bool,
) -> Result<Option<ResolvedPrice>, MoaError> {
    let mut cursor = target;
    for _ in 0..=MAX_ADVANCE_DAYS {
        if is_weekend(cursor) {
            cursor += Duration::days(1);
            continue;
        }
        if let Some(resolved) = query_provider(provider, ticker, cursor, fine).await? {
            return Ok(Some(resolved));
        }
        cursor += Duration::days(1);
    }
    Ok(None)
}

async fn query_provider(
    provider: &dyn MarketDataProvider,
    ticker: &str,
    target: DateTime<Utc>,
    fine: bool,
) -> Result<Option<ResolvedPrice>, MoaError> {
    if fine {
        let since = target - Duration::hours(2);
        let bars = provider
            .get_intraday_bars(ticker, INTRADAY_INTERVAL_MINUTES, since)
            .await?;
        let best = bars
            .iter()
            .filter(|b| (b.timestamp - target).num_minutes().abs() <= INTRADAY_TOLERANCE_MINUTES)
            .min_by_key(|b| (b.timestamp - target).num_minutes().abs());
        Ok(best.map(|b| ResolvedPrice {
            price: b.close,
            volume: b.volume,
        }))
    } else {
        let date = target.date_naive();
        let bars = provider.get_daily_bars(ticker, date, date).await?;
        Ok(bars.first().map(|b| ResolvedPrice {
            price: b.close,
            volume: b.volume,
        }))
    }
}

/// Fetch and cache the price at `rejection_ts + horizon`, returning the
/// resolved price and whether it is a fine-grained (intraday) horizon.
pub async fn fetch_horizon(
    cache: &PriceCache,
    provider: &dyn MarketDataProvider,
    ticker: &str,
    rejection_ts: DateTime<Utc>,
    horizon: &str,
) -> Result<Option<ResolvedPrice>, MoaError> {
    let target = rejection_ts + horizon_duration(horizon);
    let fine = is_fine_horizon(horizon);
    cache.resolve(provider, ticker, target, fine).await
}

/// Optional tradeability gate: volume >= 100k. `PriceBar` carries no bid/ask
/// spread, so the spread half of spec.md's filter is not enforceable here and
/// is intentionally omitted (see DESIGN.md).
pub fn is_tradeable(resolved: &ResolvedPrice) -> bool {
    resolved.volume >= Decimal::from(100_000)
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalyst_models::PriceBar;
    use catalyst_trading::PriceSnapshot;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use std::collections::HashMap as StdHashMap;

    struct StubProvider {
        intraday: StdHashMap<String, Vec<PriceBar>>,
        daily: StdHashMap<String, Vec<PriceBar>>,
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
            ticker: &str,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<Vec<PriceBar>, catalyst_trading::TradingError> {
            Ok(self.daily.get(ticker).cloned().unwrap_or_default())
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
    async fn fine_horizon_picks_nearest_bar_within_tolerance() {
        let rejection_ts: DateTime<Utc> = "2024-01-10T14:00:00Z".parse().unwrap();
        let bar_ts = rejection_ts + Duration::hours(1);
        let provider = StubProvider {
            intraday: StdHashMap::from([("ABCD".to_string(), vec![bar(bar_ts, dec!(2.05), dec!(50_000))])]),
            daily: StdHashMap::new(),
        };
        let cache = PriceCache::new();
        let resolved = fetch_horizon(&cache, &provider, "ABCD", rejection_ts, "1h").await.unwrap().unwrap();
        assert_eq!(resolved.price, dec!(2.05));
    }

    #[tokio::test]
    async fn coarse_horizon_uses_daily_bar() {
        let rejection_ts: DateTime<Utc> = "2024-01-10T14:00:00Z".parse().unwrap();
        let target_date = (rejection_ts + Duration::days(1)).date_naive();
        let provider = StubProvider {
            intraday: StdHashMap::new(),
            daily: StdHashMap::from([(
                "ABCD".to_string(),
                vec![bar(target_date.and_hms_opt(20, 0, 0).unwrap().and_utc(), dec!(2.30), dec!(200_000))],
            )]),
        };
        let cache = PriceCache::new();
        let resolved = fetch_horizon(&cache, &provider, "ABCD", rejection_ts, "1d").await.unwrap().unwrap();
        assert_eq!(resolved.price, dec!(2.30));
    }

    #[tokio::test]
    async fn missing_data_resolves_to_none() {
        let rejection_ts: DateTime<Utc> = "2024-01-10T14:00:00Z".parse().unwrap();
        let provider = StubProvider {
            intraday: StdHashMap::new(),
            daily: StdHashMap::new(),
        };
        let cache = PriceCache::new();
        let resolved = fetch_horizon(&cache, &provider, "ABCD", rejection_ts, "1h").await.unwrap();
        assert!(resolved.is_none());
    }

    #[test]
    fn tradeability_gate_rejects_thin_volume() {
        let thin = ResolvedPrice { price: dec!(2.05), volume: dec!(500) };
        assert!(!is_tradeable(&thin));
    }
}
