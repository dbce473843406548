use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use catalyst_models::VwapClassification;

use crate::error::ClassifyError;

/// A single intraday bar used for VWAP accumulation.
#[derive(Debug, Clone, Copy)]
pub struct IntradayBar {
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

/// Today's 1-minute bars, used only by the VWAP enrichment step.
#[async_trait]
pub trait IntradayBarsProvider: Send + Sync {
    async fn intraday_bars(&self, ticker: &str, as_of: DateTime<Utc>) -> Result<Vec<IntradayBar>, ClassifyError>;
}

/// A single daily bar, used by the volume-price divergence step.
#[derive(Debug, Clone, Copy)]
pub struct DailyBar {
    pub close: Decimal,
    pub volume: Decimal,
}

/// Recent daily bars (most recent last), used only by the divergence step.
#[async_trait]
pub trait PriceBarsProvider: Send + Sync {
    async fn daily_bars(&self, ticker: &str, days: u32) -> Result<Vec<DailyBar>, ClassifyError>;
}

#[derive(Debug, Clone, Copy)]
pub struct VwapReading {
    pub vwap: Decimal,
    pub classification: VwapClassification,
    pub multiplier: Decimal,
    pub broke_vwap: bool,
}

fn classify_and_multiplier(distance_from_vwap_pct: Decimal) -> (VwapClassification, Decimal) {
    if distance_from_vwap_pct > dec!(2) {
        (VwapClassification::StrongBullish, dec!(1.2))
    } else if distance_from_vwap_pct > dec!(0.5) {
        (VwapClassification::Bullish, dec!(1.1))
    } else if distance_from_vwap_pct < dec!(-2) {
        (VwapClassification::StrongBearish, dec!(0.7))
    } else if distance_from_vwap_pct < dec!(-0.5) {
        (VwapClassification::Bearish, dec!(0.9))
    } else {
        (VwapClassification::Neutral, dec!(1.0))
    }
}

/// VWAP = Σ(typical price × volume) / Σ(volume), typical price = (H+L+C)/3
/// (spec.md §4.8). A break is flagged when price trades below VWAP by more
/// than 1%.
pub async fn compute(
    provider: &dyn IntradayBarsProvider,
    ticker: &str,
    now: DateTime<Utc>,
) -> Result<VwapReading, ClassifyError> {
    let bars = provider.intraday_bars(ticker, now).await?;
    let last = bars
        .last()
        .ok_or_else(|| ClassifyError::Abstain("vwap: no intraday bars".to_string()))?;
    let current_price = last.close;

    let mut cumulative_pv = Decimal::ZERO;
    let mut cumulative_volume = Decimal::ZERO;
    for bar in &bars {
        let typical_price = (bar.high + bar.low + bar.close) / dec!(3);
        cumulative_pv += typical_price * bar.volume;
        cumulative_volume += bar.volume;
    }

    if cumulative_volume <= Decimal::ZERO {
        return Err(ClassifyError::Abstain("vwap: zero cumulative volume".to_string()));
    }

    let vwap = cumulative_pv / cumulative_volume;
    if vwap <= Decimal::ZERO {
        return Err(ClassifyError::Abstain("vwap: non-positive vwap".to_string()));
    }

    let distance_from_vwap_pct = (current_price - vwap) / vwap * dec!(100);
    let (classification, multiplier) = classify_and_multiplier(distance_from_vwap_pct);
    let broke_vwap = distance_from_vwap_pct < dec!(-1);

    Ok(VwapReading {
        vwap,
        classification,
        multiplier,
        broke_vwap,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubProvider(Vec<IntradayBar>);

    #[async_trait]
    impl IntradayBarsProvider for StubProvider {
        async fn intraday_bars(&self, _ticker: &str, _as_of: DateTime<Utc>) -> Result<Vec<IntradayBar>, ClassifyError> {
            Ok(self.0.clone())
        }
    }

    fn bar(price: Decimal, volume: Decimal) -> IntradayBar {
        IntradayBar {
            high: price,
            low: price,
            close: price,
            volume,
        }
    }

    #[tokio::test]
    async fn price_well_above_vwap_is_strong_bullish() {
        let bars = vec![bar(dec!(10), dec!(1000)), bar(dec!(10.5), dec!(1000))];
        let provider = StubProvider(bars);
        let reading = compute(&provider, "ABCD", Utc::now()).await.unwrap();
        assert_eq!(reading.classification, VwapClassification::StrongBullish);
        assert_eq!(reading.multiplier, dec!(1.2));
        assert!(!reading.broke_vwap);
    }

    #[tokio::test]
    async fn price_well_below_vwap_breaks() {
        let bars = vec![bar(dec!(10), dec!(1000)), bar(dec!(9.5), dec!(1000))];
        let provider = StubProvider(bars);
        let reading = compute(&provider, "ABCD", Utc::now()).await.unwrap();
        assert_eq!(reading.classification, VwapClassification::StrongBearish);
        assert!(reading.broke_vwap);
    }

    #[tokio::test]
    async fn price_near_vwap_is_neutral() {
        let bars = vec![bar(dec!(10), dec!(1000)), bar(dec!(10), dec!(1000))];
        let provider = StubProvider(bars);
        let reading = compute(&provider, "ABCD", Utc::now()).await.unwrap();
        assert_eq!(reading.classification, VwapClassification::Neutral);
        assert_eq!(reading.multiplier, dec!(1.0));
    }

    #[tokio::test]
    async fn no_bars_abstains() {
        let provider = StubProvider(Vec::new());
        let err = compute(&provider, "ABCD", Utc::now()).await.unwrap_err();
        assert!(err.is_abstain());
    }
}
