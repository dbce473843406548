use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalystError {
    #[error("classify error: {0}")]
    Classify(#[from] catalyst_classify::ClassifyError),

    #[error("trading error: {0}")]
    Trading(#[from] catalyst_trading::TradingError),

    #[error("moa error: {0}")]
    Moa(#[from] catalyst_moa::MoaError),

    #[error("cache error: {0}")]
    Cache(#[from] catalyst_cache::CacheError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
