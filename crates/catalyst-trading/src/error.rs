use thiserror::Error;

#[derive(Error, Debug)]
pub enum TradingError {
    #[error("transient broker/provider error: {0}")]
    Transient(String),

    #[error("authentication rejected: {0}")]
    Auth(String),

    #[error("data unavailable: {0}")]
    DataUnavailable(String),

    #[error("broker rejected order: {0}")]
    BrokerOrderRejected(String),

    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),

    #[error("order not found: {0}")]
    OrderNotFound(String),

    #[error("position not found: {0}")]
    PositionNotFound(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("cache error: {0}")]
    Cache(#[from] catalyst_cache::CacheError),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

impl From<catalyst_models::ProviderError> for TradingError {
    fn from(e: catalyst_models::ProviderError) -> Self {
        use catalyst_models::ProviderError as P;
        match e {
            P::Transient(m) => TradingError::Transient(m),
            P::Auth(m) => TradingError::Auth(m),
            P::DataUnavailable(m) => TradingError::DataUnavailable(m),
            P::BrokerOrderRejected(m) => TradingError::BrokerOrderRejected(m),
            P::InsufficientFunds(m) => TradingError::InsufficientFunds(m),
            P::OrderNotFound(m) => TradingError::OrderNotFound(m),
            P::PositionNotFound(m) => TradingError::PositionNotFound(m),
            P::Validation(m) => TradingError::Validation(m),
            P::StateCorruption(m) => TradingError::Validation(m),
        }
    }
}

impl TradingError {
    /// Transient and DataUnavailable are retried/abstained silently; every
    /// other kind is caller-visible per spec.md §7.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TradingError::Transient(_))
    }
}
