use async_trait::async_trait;
use catalyst_models::PriceBar;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::error::TradingError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceSnapshot {
    pub last: Decimal,
    pub prev_close: Decimal,
}

/// Pluggable market-data source, spec.md §6. Implementations are chained
/// primary->fallback by the caller, matching the pattern already used for
/// `MarketConditionsProvider` in the classifier.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    async fn get_last_price_snapshot(&self, ticker: &str) -> Result<Option<PriceSnapshot>, TradingError>;
    async fn get_intraday_bars(
        &self,
        ticker: &str,
        interval_minutes: u32,
        since: DateTime<Utc>,
    ) -> Result<Vec<PriceBar>, TradingError>;
    async fn get_daily_bars(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceBar>, TradingError>;
}

#[cfg(any(test, feature = "test-support"))]
pub mod mock {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    pub struct StubMarketData {
        pub snapshots: HashMap<String, PriceSnapshot>,
        pub daily_bars: HashMap<String, Vec<PriceBar>>,
        pub intraday_bars: HashMap<String, Vec<PriceBar>>,
    }

    #[async_trait]
    impl MarketDataProvider for StubMarketData {
        async fn get_last_price_snapshot(&self, ticker: &str) -> Result<Option<PriceSnapshot>, TradingError> {
            Ok(self.snapshots.get(ticker).copied())
        }

        async fn get_intraday_bars(
            &self,
            ticker: &str,
            _interval_minutes: u32,
            _since: DateTime<Utc>,
        ) -> Result<Vec<PriceBar>, TradingError> {
            Ok(self.intraday_bars.get(ticker).cloned().unwrap_or_default())
        }

        async fn get_daily_bars(
            &self,
            ticker: &str,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<Vec<PriceBar>, TradingError> {
            Ok(self.daily_bars.get(ticker).cloned().unwrap_or_default())
        }
    }
}
