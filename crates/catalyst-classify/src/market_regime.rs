use async_trait::async_trait;
use catalyst_cache::MemoryCache;
use catalyst_models::{MarketRegime, SpyTrend};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::time::Duration;

use crate::error::ClassifyError;

pub const REGIME_CACHE_TTL: Duration = Duration::from_secs(300);

#[async_trait]
pub trait MarketConditionsProvider: Send + Sync {
    async fn vix(&self) -> Result<Decimal, ClassifyError>;
    async fn spy_20d_return_pct(&self) -> Result<Decimal, ClassifyError>;
}

#[derive(Debug, Clone, Copy)]
pub struct RegimeReading {
    pub regime: MarketRegime,
    pub trend: SpyTrend,
    pub multiplier: Decimal,
    pub confidence: Decimal,
}

fn classify_regime(vix: Decimal) -> MarketRegime {
    if vix < dec!(15) {
        MarketRegime::BullMarket
    } else if vix < dec!(20) {
        MarketRegime::Neutral
    } else if vix < dec!(30) {
        MarketRegime::HighVolatility
    } else if vix < dec!(40) {
        MarketRegime::BearMarket
    } else {
        MarketRegime::Crash
    }
}

fn classify_trend(spy_return_pct: Decimal) -> SpyTrend {
    if spy_return_pct > dec!(2) {
        SpyTrend::Uptrend
    } else if spy_return_pct < dec!(-2) {
        SpyTrend::Downtrend
    } else {
        SpyTrend::Sideways
    }
}

pub fn regime_multiplier(regime: MarketRegime) -> Decimal {
    match regime {
        MarketRegime::BullMarket => dec!(1.2),
        MarketRegime::Neutral => dec!(1.0),
        MarketRegime::HighVolatility => dec!(0.8),
        MarketRegime::BearMarket => dec!(0.7),
        MarketRegime::Crash => dec!(0.5),
    }
}

fn regime_aligns_with_trend(regime: MarketRegime, trend: SpyTrend) -> bool {
    matches!(
        (regime, trend),
        (MarketRegime::BullMarket, SpyTrend::Uptrend)
            | (MarketRegime::BearMarket, SpyTrend::Downtrend)
            | (MarketRegime::Crash, SpyTrend::Downtrend)
            | (MarketRegime::Neutral, SpyTrend::Sideways)
    )
}

/// Classifies market conditions from VIX/SPY data, with a primary->secondary
/// provider fallback chain and a 5-minute cache (spec.md §4.9). On total
/// failure returns NEUTRAL/1.0/confidence 0.0 rather than propagating an
/// error, since the rest of the pipeline treats this as a multiplicative
/// input it must always have a value for.
pub struct MarketRegimeClassifier<'a> {
    cache: &'a MemoryCache,
}

impl<'a> MarketRegimeClassifier<'a> {
    pub fn new(cache: &'a MemoryCache) -> Self {
        Self { cache }
    }

    pub async fn classify(
        &self,
        primary: &dyn MarketConditionsProvider,
        secondary: Option<&dyn MarketConditionsProvider>,
    ) -> RegimeReading {
        if let Some(cached) = self.cache.get("market_regime").await {
            if let Ok(reading) = serde_json::from_str::<CachedReading>(&cached) {
                return reading.into();
            }
        }

        let reading = match self.fetch(primary).await {
            Ok(reading) => reading,
            Err(_) => match secondary {
                Some(secondary) => self.fetch(secondary).await.unwrap_or(fallback_reading()),
                None => fallback_reading(),
            },
        };

        if let Ok(json) = serde_json::to_string(&CachedReading::from(reading)) {
            self.cache.insert("market_regime".to_string(), json).await;
        }
        reading
    }

    async fn fetch(&self, provider: &dyn MarketConditionsProvider) -> Result<RegimeReading, ClassifyError> {
        let vix = provider.vix().await?;
        let spy_return = provider.spy_20d_return_pct().await?;
        let regime = classify_regime(vix);
        let trend = classify_trend(spy_return);
        let mut confidence = dec!(0.8);
        confidence += if regime_aligns_with_trend(regime, trend) {
            dec!(0.2)
        } else {
            dec!(-0.2)
        };
        Ok(RegimeReading {
            regime,
            trend,
            multiplier: regime_multiplier(regime),
            confidence: confidence.clamp(Decimal::ZERO, Decimal::ONE),
        })
    }
}

fn fallback_reading() -> RegimeReading {
    RegimeReading {
        regime: MarketRegime::Neutral,
        trend: SpyTrend::Sideways,
        multiplier: dec!(1.0),
        confidence: Decimal::ZERO,
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
struct CachedReading {
    regime: MarketRegime,
    trend: SpyTrend,
    multiplier: Decimal,
    confidence: Decimal,
}

impl From<RegimeReading> for CachedReading {
    fn from(r: RegimeReading) -> Self {
        Self {
            regime: r.regime,
            trend: r.trend,
            multiplier: r.multiplier,
            confidence: r.confidence,
        }
    }
}

impl From<CachedReading> for RegimeReading {
    fn from(c: CachedReading) -> Self {
        Self {
            regime: c.regime,
            trend: c.trend,
            multiplier: c.multiplier,
            confidence: c.confidence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubProvider {
        vix: Decimal,
        spy_return: Decimal,
    }

    #[async_trait]
    impl MarketConditionsProvider for StubProvider {
        async fn vix(&self) -> Result<Decimal, ClassifyError> {
            Ok(self.vix)
        }
        async fn spy_20d_return_pct(&self) -> Result<Decimal, ClassifyError> {
            Ok(self.spy_return)
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl MarketConditionsProvider for FailingProvider {
        async fn vix(&self) -> Result<Decimal, ClassifyError> {
            Err(ClassifyError::Abstain("no data".to_string()))
        }
        async fn spy_20d_return_pct(&self) -> Result<Decimal, ClassifyError> {
            Err(ClassifyError::Abstain("no data".to_string()))
        }
    }

    #[tokio::test]
    async fn bull_market_aligned_with_uptrend_boosts_confidence() {
        let cache = MemoryCache::new(10, REGIME_CACHE_TTL);
        let classifier = MarketRegimeClassifier::new(&cache);
        let provider = StubProvider {
            vix: dec!(12),
            spy_return: dec!(3),
        };
        let reading = classifier.classify(&provider, None).await;
        assert_eq!(reading.regime, MarketRegime::BullMarket);
        assert_eq!(reading.trend, SpyTrend::Uptrend);
        assert_eq!(reading.multiplier, dec!(1.2));
        assert_eq!(reading.confidence, Decimal::ONE);
    }

    #[tokio::test]
    async fn total_failure_falls_back_to_neutral_zero_confidence() {
        let cache = MemoryCache::new(10, REGIME_CACHE_TTL);
        let classifier = MarketRegimeClassifier::new(&cache);
        let reading = classifier.classify(&FailingProvider, None).await;
        assert_eq!(reading.regime, MarketRegime::Neutral);
        assert_eq!(reading.multiplier, dec!(1.0));
        assert_eq!(reading.confidence, Decimal::ZERO);
    }

    #[tokio::test]
    async fn secondary_provider_used_when_primary_fails() {
        let cache = MemoryCache::new(10, REGIME_CACHE_TTL);
        let classifier = MarketRegimeClassifier::new(&cache);
        let secondary = StubProvider {
            vix: dec!(45),
            spy_return: dec!(-5),
        };
        let reading = classifier.classify(&FailingProvider, Some(&secondary)).await;
        assert_eq!(reading.regime, MarketRegime::Crash);
        assert_eq!(reading.trend, SpyTrend::Downtrend);
    }
}
