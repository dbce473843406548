pub mod divergence;
pub mod float_mult;
pub mod rvol;
pub mod vwap;

use catalyst_models::ScoredItem;
use tracing::debug;

use crate::error::ClassifyError;
use rvol::RvolProvider;
use float_mult::FloatMultiplierProvider;
use vwap::{IntradayBarsProvider, PriceBarsProvider};

/// Runs the fixed RVOL -> Float -> Divergence -> VWAP order against a
/// `ScoredItem`, mutating `total_score` and attaching per-step metadata.
/// Per spec.md §4.8, any step that errors or returns nothing is logged at
/// debug level and skipped rather than propagated.
pub async fn enrich(
    item: &mut ScoredItem,
    rvol_provider: &dyn RvolProvider,
    float_provider: &dyn FloatMultiplierProvider,
    bars_provider: &dyn PriceBarsProvider,
    intraday_provider: &dyn IntradayBarsProvider,
    now: chrono::DateTime<chrono::Utc>,
) {
    let Some(ticker) = item.ticker.clone() else {
        item.enriched = true;
        item.enrichment_timestamp = Some(now);
        return;
    };

    let mut rvol_value = None;

    match rvol::compute(rvol_provider, &ticker).await {
        Ok(reading) => {
            item.total_score *= reading.multiplier;
            rvol_value = Some(reading.rvol);
            item.attachments.push(catalyst_models::Attachment::Rvol {
                rvol: reading.rvol,
                multiplier: reading.multiplier,
            });
        }
        Err(e) => debug!(ticker = %ticker, error = %e, "rvol enrichment skipped"),
    }

    match float_mult::compute(float_provider, &ticker).await {
        Ok(reading) => {
            item.total_score *= reading.multiplier;
            item.attachments.push(catalyst_models::Attachment::Float {
                float_shares: reading.float_shares,
                multiplier: reading.multiplier,
            });
        }
        Err(e) => debug!(ticker = %ticker, error = %e, "float enrichment skipped"),
    }

    if let Some(rvol) = rvol_value {
        match divergence::compute(bars_provider, &ticker, rvol).await {
            Ok(reading) => {
                item.total_score += reading.adjustment;
                item.attachments.push(catalyst_models::Attachment::Divergence {
                    classification: reading.classification,
                    adjustment: reading.adjustment,
                });
            }
            Err(e) => debug!(ticker = %ticker, error = %e, "divergence enrichment skipped"),
        }
    }

    match vwap::compute(intraday_provider, &ticker, now).await {
        Ok(reading) => {
            item.total_score *= reading.multiplier;
            item.attachments.push(catalyst_models::Attachment::Vwap {
                vwap: reading.vwap,
                classification: reading.classification,
                multiplier: reading.multiplier,
                broke_vwap: reading.broke_vwap,
            });
        }
        Err(e) => debug!(ticker = %ticker, error = %e, "vwap enrichment skipped"),
    }

    item.enriched = true;
    item.enrichment_timestamp = Some(now);
}

pub(crate) fn enrichment_abstain(msg: impl Into<String>) -> ClassifyError {
    ClassifyError::Abstain(msg.into())
}
