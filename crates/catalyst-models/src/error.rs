use thiserror::Error;

/// Shared error taxonomy consumed across crate boundaries (classify, trading, moa).
/// Individual crates wrap this in their own local error enum via `#[from]` rather
/// than returning it directly, so each boundary keeps its own causal context.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("transient provider error: {0}")]
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

    #[error("state corruption detected: {0}")]
    StateCorruption(String),
}

impl ProviderError {
    /// DataUnavailable and Transient are the only kinds a source should use to
    /// abstain silently; everything else is caller-visible per the error design.
    pub fn is_abstain(&self) -> bool {
        matches!(self, Self::DataUnavailable(_) | Self::Transient(_))
    }
}
