use thiserror::Error;

#[derive(Error, Debug)]
pub enum MoaError {
    #[error("cache error: {0}")]
    Cache(#[from] catalyst_cache::CacheError),
    #[error("market data error: {0}")]
    MarketData(#[from] catalyst_trading::TradingError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
