pub mod daemon;
pub mod error;
pub mod ingest;
pub mod pipeline;
pub mod providers;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use catalyst_cache::{AppendLog, FundamentalsCache, MemoryCache, OutcomesStore, PositionsStore};
use catalyst_classify::{DynamicSourceScorer, TickerProfiler};
use catalyst_models::{Account, CatalystConfig, Context, SystemClock};
use catalyst_trading::broker::mock::MockBroker;
use catalyst_trading::market_data::mock::StubMarketData;
use catalyst_trading::{Broker, MarketDataProvider, PositionManager};
use rust_decimal_macros::dec;

pub use error::CatalystError;
pub use pipeline::Pipeline;

/// `TickerProfiler` has no built-in persistence (unlike `DynamicSourceScorer`);
/// this mirrors `catalyst_moa::persistence`'s read/write-json helper pair.
pub fn load_ticker_profiler(path: &Path) -> Result<TickerProfiler, CatalystError> {
    if !path.exists() {
        return Ok(TickerProfiler::default());
    }
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

pub fn save_ticker_profiler(path: &Path, profiler: &TickerProfiler) -> Result<(), CatalystError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(profiler)?)?;
    Ok(())
}

/// Assembles a [`Pipeline`] from a loaded [`CatalystConfig`], wiring up every
/// on-disk store under `config.data_dir` and falling back to the in-process
/// paper-trading broker/market-data doubles when no live feed is configured.
pub fn build_pipeline(config: CatalystConfig) -> Result<Pipeline, CatalystError> {
    let data_dir = Path::new(&config.data_dir);
    std::fs::create_dir_all(data_dir)?;

    let dynamic_scorer_path = data_dir.join("dynamic_source_scorer.json");
    let dynamic_scorer = if config.features.dynamic_source_scorer {
        Some(DynamicSourceScorer::load(&dynamic_scorer_path)?)
    } else {
        None
    };

    let ticker_profiler_path = data_dir.join("ticker_profiler.json");
    let ticker_profiler = if config.features.ticker_profiler {
        Some(load_ticker_profiler(&ticker_profiler_path)?)
    } else {
        None
    };

    let fundamentals = if config.features.fundamental_scoring {
        let path = data_dir.join("fundamentals.sqlite3");
        Some(FundamentalsCache::open(path.to_str().ok_or_else(|| {
            CatalystError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "data_dir is not valid UTF-8",
            ))
        })?)?)
    } else {
        None
    };

    let regime_cache = MemoryCache::new(16, std::time::Duration::from_secs(300));

    let positions_path = data_dir.join("positions.sqlite3");
    let positions_store = PositionsStore::open(positions_path.to_str().ok_or_else(|| {
        CatalystError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "data_dir is not valid UTF-8",
        ))
    })?)?;

    let clock = Arc::new(SystemClock);
    let position_manager = PositionManager::new(positions_store, clock.clone());

    let broker: Arc<dyn Broker> = Arc::new(MockBroker::new(
        Account {
            equity: dec!(100_000),
            cash: dec!(100_000),
            buying_power: dec!(200_000),
        },
        true,
    ));
    let market_data: Arc<dyn MarketDataProvider> = Arc::new(StubMarketData::default());

    let rejected_log = AppendLog::open(data_dir.join("rejected_items.jsonl"))?;
    let accepted_log = AppendLog::open(data_dir.join("accepted_items.jsonl"))?;
    let executed_orders_log = AppendLog::open(data_dir.join("executed_orders.jsonl"))?;
    let outcomes_store = OutcomesStore::open(data_dir.join("outcomes.jsonl"))?;

    let ctx = Context::new(config, clock.clone());

    Ok(Pipeline::new(
        ctx,
        dynamic_scorer,
        ticker_profiler,
        fundamentals,
        regime_cache,
        market_data,
        broker,
        position_manager,
        rejected_log,
        accepted_log,
        executed_orders_log,
        outcomes_store,
        HashMap::new(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalyst_classify::ticker_profiler::{KeywordStat, TickerProfile};
    use rust_decimal_macros::dec;

    #[test]
    fn missing_ticker_profiler_file_yields_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ticker_profiler.json");
        let profiler = load_ticker_profiler(&path).unwrap();
        assert!(profiler.tickers.is_empty());
        assert!(profiler.sectors.is_empty());
    }

    #[test]
    fn ticker_profiler_round_trips_through_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("ticker_profiler.json");

        let mut profiler = TickerProfiler::default();
        profiler.tickers.insert(
            "POET".to_string(),
            TickerProfile {
                observation_count: 3,
                keywords: [(
                    "fda_approval".to_string(),
                    KeywordStat {
                        success_rate: dec!(0.8),
                        avg_return_pct: dec!(12.5),
                        occurrences: 5,
                    },
                )]
                .into_iter()
                .collect(),
            },
        );

        save_ticker_profiler(&path, &profiler).unwrap();
        let reloaded = load_ticker_profiler(&path).unwrap();
        assert_eq!(reloaded.tickers["POET"].observation_count, 3);
        assert_eq!(reloaded.tickers["POET"].keywords["fda_approval"].success_rate, dec!(0.8));
    }

    #[test]
    fn build_pipeline_wires_every_store_under_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = CatalystConfig::default();
        config.data_dir = dir.path().to_str().unwrap().to_string();

        let pipeline = build_pipeline(config).expect("pipeline should assemble from a fresh data_dir");
        assert!(pipeline.ctx().config.features.ticker_profiler);
        assert!(dir.path().join("positions.sqlite3").exists());
    }
}
