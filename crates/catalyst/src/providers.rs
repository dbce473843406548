use std::time::Duration as StdDuration;

use async_trait::async_trait;
use catalyst_classify::{ClassifyError, MarketConditionsProvider};
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use catalyst_classify::enrichment::float_mult::{FloatData, FloatMultiplierProvider};
use catalyst_classify::enrichment::rvol::RvolProvider;
use catalyst_classify::enrichment::vwap::{DailyBar, IntradayBar, IntradayBarsProvider, PriceBarsProvider};
use catalyst_classify::sentiment::llm::Llm;
use catalyst_classify::sentiment::sources::{InsiderProvider, PriceActionProvider, ShortInterestProvider, TrendsProvider};
use catalyst_trading::MarketDataProvider;

/// Bridges the trading crate's `MarketDataProvider` into the classifier's
/// narrower enrichment-step traits, so RVOL/VWAP/divergence run off the same
/// bar feed the trading pipeline already has rather than a second one.
pub struct MarketBarsAdapter<'a> {
    pub provider: &'a dyn MarketDataProvider,
}

#[async_trait]
impl<'a> IntradayBarsProvider for MarketBarsAdapter<'a> {
    async fn intraday_bars(&self, ticker: &str, as_of: chrono::DateTime<Utc>) -> Result<Vec<IntradayBar>, ClassifyError> {
        let bars = self
            .provider
            .get_intraday_bars(ticker, 1, as_of - Duration::hours(12))
            .await
            .map_err(|e| ClassifyError::Cache(catalyst_cache::CacheError::Unavailable(e.to_string())))?;
        Ok(bars
            .into_iter()
            .map(|b| IntradayBar {
                high: b.high,
                low: b.low,
                close: b.close,
                volume: b.volume,
            })
            .collect())
    }
}

#[async_trait]
impl<'a> PriceBarsProvider for MarketBarsAdapter<'a> {
    async fn daily_bars(&self, ticker: &str, days: u32) -> Result<Vec<DailyBar>, ClassifyError> {
        let end = Utc::now().date_naive();
        let start = end - Duration::days(days as i64 + 1);
        let bars = self
            .provider
            .get_daily_bars(ticker, start, end)
            .await
            .map_err(|e| ClassifyError::Cache(catalyst_cache::CacheError::Unavailable(e.to_string())))?;
        Ok(bars.into_iter().map(|b| DailyBar { close: b.close, volume: b.volume }).collect())
    }
}

#[async_trait]
impl<'a> RvolProvider for MarketBarsAdapter<'a> {
    async fn extrapolated_volume(&self, ticker: &str) -> Result<Decimal, ClassifyError> {
        let bars = self
            .provider
            .get_intraday_bars(ticker, 1, Utc::now() - Duration::hours(12))
            .await
            .map_err(|e| ClassifyError::Cache(catalyst_cache::CacheError::Unavailable(e.to_string())))?;
        Ok(bars.iter().map(|b| b.volume).sum())
    }

    async fn average_volume_20d(&self, ticker: &str) -> Result<Decimal, ClassifyError> {
        let end = Utc::now().date_naive();
        let start = end - Duration::days(21);
        let bars = self
            .provider
            .get_daily_bars(ticker, start, end)
            .await
            .map_err(|e| ClassifyError::Cache(catalyst_cache::CacheError::Unavailable(e.to_string())))?;
        if bars.is_empty() {
            return Ok(Decimal::ZERO);
        }
        let total: Decimal = bars.iter().map(|b| b.volume).sum();
        Ok(total / Decimal::from(bars.len() as u64))
    }
}

/// No local-model HTTP client is wired up; every query abstains so
/// `LlmBatchDriver` degrades to "llm source contributes nothing" rather than
/// fabricating a sentiment. Swap for a real `Llm` impl once a model endpoint
/// is configured.
pub struct NoopLlm;

#[async_trait]
impl Llm for NoopLlm {
    async fn query(
        &self,
        _prompt: &str,
        _system: Option<&str>,
        _timeout: StdDuration,
        _max_retries: u32,
    ) -> Result<Option<String>, ClassifyError> {
        Ok(None)
    }
}

/// Providers for sentiment sources with no in-corpus data feed (Google
/// Trends, Form-4 insider filings, pre/after-market tick data). Each abstains
/// unconditionally rather than fabricating a value; the seam stays in place
/// for a real feed to be wired in later the same way `MarketDataProvider` is.
pub struct NoopTrendsProvider;

#[async_trait]
impl TrendsProvider for NoopTrendsProvider {
    async fn spike_ratio(&self, _ticker: &str) -> Result<Option<f64>, ClassifyError> {
        Ok(None)
    }
}

pub struct NoopInsiderProvider;

#[async_trait]
impl InsiderProvider for NoopInsiderProvider {
    async fn net_value(&self, _ticker: &str) -> Result<Option<Decimal>, ClassifyError> {
        Ok(None)
    }
}

pub struct NoopPriceActionProvider;

#[async_trait]
impl PriceActionProvider for NoopPriceActionProvider {
    async fn session_change_pct(&self, _ticker: &str) -> Result<Option<Decimal>, ClassifyError> {
        Ok(None)
    }
}

pub struct NoopShortInterestProvider;

#[async_trait]
impl ShortInterestProvider for NoopShortInterestProvider {
    async fn short_interest_pct(&self, _ticker: &str) -> Result<Option<Decimal>, ClassifyError> {
        Ok(None)
    }
}

pub struct NoopFloatMultiplierProvider;

#[async_trait]
impl FloatMultiplierProvider for NoopFloatMultiplierProvider {
    async fn float_data(&self, _ticker: &str) -> Result<FloatData, ClassifyError> {
        Err(ClassifyError::Abstain("float_mult: no provider configured".to_string()))
    }
}

pub struct NoopMarketConditionsProvider;

#[async_trait]
impl MarketConditionsProvider for NoopMarketConditionsProvider {
    async fn vix(&self) -> Result<Decimal, ClassifyError> {
        Err(ClassifyError::Abstain("market_regime: no VIX feed configured".to_string()))
    }

    async fn spy_20d_return_pct(&self) -> Result<Decimal, ClassifyError> {
        Err(ClassifyError::Abstain("market_regime: no SPY feed configured".to_string()))
    }
}

/// Sensible defaults for configured source weights when the caller hasn't
/// loaded anything from `CatalystConfig::sentiment.weights`.
pub fn default_weight(source: &str) -> Decimal {
    match source {
        "earnings" => dec!(0.35),
        "ml" => dec!(0.25),
        "vader" => dec!(0.25),
        "llm" => dec!(0.15),
        "news_velocity" => dec!(0.05),
        "google_trends" => dec!(0.08),
        "short_interest" => dec!(0.08),
        "insider" => dec!(0.12),
        "premarket_action" => dec!(0.15),
        "aftermarket_action" => dec!(0.15),
        "divergence" => dec!(0.08),
        _ => dec!(0.1),
    }
}
