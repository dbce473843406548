use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::ClassifyError;

/// Source of live/extrapolated intraday volume vs. the 20-day average
/// (spec.md §4.8). Implementations own whatever market-data feed backs this.
#[async_trait]
pub trait RvolProvider: Send + Sync {
    /// Volume so far today, extrapolated to a full session.
    async fn extrapolated_volume(&self, ticker: &str) -> Result<Decimal, ClassifyError>;
    async fn average_volume_20d(&self, ticker: &str) -> Result<Decimal, ClassifyError>;
}

#[derive(Debug, Clone, Copy)]
pub struct RvolReading {
    pub rvol: Decimal,
    pub multiplier: Decimal,
}

fn rvol_multiplier(rvol: Decimal) -> Decimal {
    if rvol > dec!(5) {
        dec!(1.4)
    } else if rvol >= dec!(3) {
        dec!(1.3)
    } else if rvol >= dec!(2) {
        dec!(1.2)
    } else if rvol >= dec!(1) {
        dec!(1.0)
    } else {
        dec!(0.8)
    }
}

pub async fn compute(provider: &dyn RvolProvider, ticker: &str) -> Result<RvolReading, ClassifyError> {
    let extrapolated = provider.extrapolated_volume(ticker).await?;
    let average = provider.average_volume_20d(ticker).await?;
    if average <= Decimal::ZERO {
        return Err(ClassifyError::Abstain("rvol: zero average volume".to_string()));
    }
    let rvol = extrapolated / average;
    Ok(RvolReading {
        rvol,
        multiplier: rvol_multiplier(rvol),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubProvider {
        extrapolated: Decimal,
        average: Decimal,
    }

    #[async_trait]
    impl RvolProvider for StubProvider {
        async fn extrapolated_volume(&self, _ticker: &str) -> Result<Decimal, ClassifyError> {
            Ok(self.extrapolated)
        }
        async fn average_volume_20d(&self, _ticker: &str) -> Result<Decimal, ClassifyError> {
            Ok(self.average)
        }
    }

    #[tokio::test]
    async fn extreme_rvol_gets_top_multiplier() {
        let provider = StubProvider {
            extrapolated: dec!(6_000_000),
            average: dec!(1_000_000),
        };
        let reading = compute(&provider, "ABCD").await.unwrap();
        assert_eq!(reading.rvol, dec!(6));
        assert_eq!(reading.multiplier, dec!(1.4));
    }

    #[tokio::test]
    async fn below_average_volume_gets_penalty() {
        let provider = StubProvider {
            extrapolated: dec!(400_000),
            average: dec!(1_000_000),
        };
        let reading = compute(&provider, "ABCD").await.unwrap();
        assert_eq!(reading.multiplier, dec!(0.8));
    }

    #[tokio::test]
    async fn zero_average_volume_abstains() {
        let provider = StubProvider {
            extrapolated: dec!(100),
            average: Decimal::ZERO,
        };
        let err = compute(&provider, "ABCD").await.unwrap_err();
        assert!(err.is_abstain());
    }
}
