use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use catalyst_models::DivergenceClassification;

use crate::error::ClassifyError;

use super::vwap::PriceBarsProvider;

const MIN_PRICE_MOVE_PCT: Decimal = dec!(2);
const MIN_VOLUME_MOVE_PCT: Decimal = dec!(30);

#[derive(Debug, Clone, Copy)]
pub struct DivergenceReading {
    pub classification: DivergenceClassification,
    pub adjustment: Decimal,
}

/// Volume-price divergence classification (spec.md §4.8). `rvol` is the
/// already-computed relative-volume reading; `rvol - 1` stands in for the
/// volume-change-vs-20d-average percentage the original system derives
/// separately.
fn classify(price_change_pct: Decimal, volume_change_pct: Decimal) -> Option<DivergenceReading> {
    let price_significant = price_change_pct.abs() >= MIN_PRICE_MOVE_PCT;
    let volume_significant = volume_change_pct.abs() >= MIN_VOLUME_MOVE_PCT;
    if !(price_significant && volume_significant) {
        return None;
    }

    let price_magnitude = price_change_pct.abs();
    let volume_magnitude = volume_change_pct.abs();

    if price_change_pct > MIN_PRICE_MOVE_PCT && volume_change_pct < -MIN_VOLUME_MOVE_PCT {
        let adjustment = if price_magnitude > dec!(5) && volume_magnitude > dec!(50) {
            dec!(-0.15)
        } else if price_magnitude > dec!(3) && volume_magnitude > dec!(40) {
            dec!(-0.12)
        } else {
            dec!(-0.10)
        };
        return Some(DivergenceReading {
            classification: DivergenceClassification::WeakRally,
            adjustment,
        });
    }

    if price_change_pct < -MIN_PRICE_MOVE_PCT && volume_change_pct < -MIN_VOLUME_MOVE_PCT {
        let adjustment = if price_magnitude > dec!(5) && volume_magnitude > dec!(50) {
            dec!(0.12)
        } else if price_magnitude > dec!(3) && volume_magnitude > dec!(40) {
            dec!(0.10)
        } else {
            dec!(0.08)
        };
        return Some(DivergenceReading {
            classification: DivergenceClassification::StrongSelloffReversal,
            adjustment,
        });
    }

    if price_change_pct > MIN_PRICE_MOVE_PCT && volume_change_pct > MIN_VOLUME_MOVE_PCT {
        let adjustment = if price_magnitude > dec!(5) && volume_magnitude > dec!(100) {
            dec!(0.15)
        } else if price_magnitude > dec!(3) && volume_magnitude > dec!(50) {
            dec!(0.12)
        } else {
            dec!(0.10)
        };
        return Some(DivergenceReading {
            classification: DivergenceClassification::ConfirmedRally,
            adjustment,
        });
    }

    if price_change_pct < -MIN_PRICE_MOVE_PCT && volume_change_pct > MIN_VOLUME_MOVE_PCT {
        let adjustment = if price_magnitude > dec!(5) && volume_magnitude > dec!(100) {
            dec!(-0.15)
        } else if price_magnitude > dec!(3) && volume_magnitude > dec!(50) {
            dec!(-0.12)
        } else {
            dec!(-0.10)
        };
        return Some(DivergenceReading {
            classification: DivergenceClassification::ConfirmedSelloff,
            adjustment,
        });
    }

    None
}

pub async fn compute(
    provider: &dyn PriceBarsProvider,
    ticker: &str,
    rvol: Decimal,
) -> Result<DivergenceReading, ClassifyError> {
    let bars = provider.daily_bars(ticker, 2).await?;
    if bars.len() < 2 {
        return Err(ClassifyError::Abstain("divergence: insufficient daily bars".to_string()));
    }
    let prior = bars[bars.len() - 2].close;
    let latest = bars[bars.len() - 1].close;
    if prior <= Decimal::ZERO {
        return Err(ClassifyError::Abstain("divergence: non-positive prior close".to_string()));
    }

    let price_change_pct = (latest - prior) / prior * dec!(100);
    let volume_change_pct = (rvol - Decimal::ONE) * dec!(100);

    classify(price_change_pct, volume_change_pct)
        .ok_or_else(|| ClassifyError::Abstain("divergence: no significant pattern".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use super::super::vwap::DailyBar;

    struct StubProvider(Vec<DailyBar>);

    #[async_trait]
    impl PriceBarsProvider for StubProvider {
        async fn daily_bars(&self, _ticker: &str, _days: u32) -> Result<Vec<DailyBar>, ClassifyError> {
            Ok(self.0.clone())
        }
    }

    fn bars(prior: Decimal, latest: Decimal) -> StubProvider {
        StubProvider(vec![
            DailyBar { close: prior, volume: dec!(0) },
            DailyBar { close: latest, volume: dec!(0) },
        ])
    }

    #[tokio::test]
    async fn weak_rally_is_bearish_adjustment() {
        // +6% price, rvol 0.4 -> volume_change = -60%
        let provider = bars(dec!(10), dec!(10.6));
        let reading = compute(&provider, "ABCD", dec!(0.4)).await.unwrap();
        assert_eq!(reading.classification, DivergenceClassification::WeakRally);
        assert_eq!(reading.adjustment, dec!(-0.15));
    }

    #[tokio::test]
    async fn confirmed_rally_is_bullish_adjustment() {
        // +6% price, rvol 2.2 -> volume_change = +120%
        let provider = bars(dec!(10), dec!(10.6));
        let reading = compute(&provider, "ABCD", dec!(2.2)).await.unwrap();
        assert_eq!(reading.classification, DivergenceClassification::ConfirmedRally);
        assert_eq!(reading.adjustment, dec!(0.15));
    }

    #[tokio::test]
    async fn insignificant_move_abstains() {
        let provider = bars(dec!(10), dec!(10.05));
        let err = compute(&provider, "ABCD", dec!(1.0)).await.unwrap_err();
        assert!(err.is_abstain());
    }
}
