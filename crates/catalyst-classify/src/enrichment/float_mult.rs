use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::error::ClassifyError;

/// Raw float data as returned by an upstream float-data provider: a share
/// count plus the volatility-expectation multiplier the provider derives
/// from it (spec.md §4.8 — distinct from §4.7's additive fundamental score,
/// which this crate computes itself from cached band thresholds).
#[derive(Debug, Clone, Copy)]
pub struct FloatData {
    pub float_shares: u64,
    pub multiplier: Decimal,
}

#[async_trait]
pub trait FloatMultiplierProvider: Send + Sync {
    async fn float_data(&self, ticker: &str) -> Result<FloatData, ClassifyError>;
}

#[derive(Debug, Clone, Copy)]
pub struct FloatMultiplierReading {
    pub float_shares: u64,
    pub multiplier: Decimal,
}

pub async fn compute(
    provider: &dyn FloatMultiplierProvider,
    ticker: &str,
) -> Result<FloatMultiplierReading, ClassifyError> {
    let data = provider.float_data(ticker).await?;
    Ok(FloatMultiplierReading {
        float_shares: data.float_shares,
        multiplier: data.multiplier,
    })
}
