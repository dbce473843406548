use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClassifyError {
    #[error("sentiment source abstained: {0}")]
    Abstain(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("timed out after {0}s")]
    Timeout(u64),

    #[error("response parse error: {0}")]
    Parse(String),

    #[error("cache error: {0}")]
    Cache(#[from] catalyst_cache::CacheError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("provider error: {0}")]
    Provider(#[from] catalyst_models::ProviderError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClassifyError {
    pub fn is_abstain(&self) -> bool {
        matches!(
            self,
            ClassifyError::Abstain(_) | ClassifyError::Timeout(_) | ClassifyError::Http(_)
        )
    }
}
