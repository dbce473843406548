pub mod aggregator;
pub mod llm;
pub mod sources;

pub use aggregator::{aggregate, SentimentAggregate, SentimentContribution};
pub use llm::{Llm, LlmBatchDriver};
pub use sources::{SentimentSource, VIX_PENALTY_FLOOR};
