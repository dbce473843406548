pub mod classifier;
pub mod credibility;
pub mod dynamic_scorer;
pub mod enrichment;
pub mod error;
pub mod fundamental_scorer;
pub mod keywords;
pub mod market_regime;
pub mod offering;
pub mod sentiment;
pub mod ticker_profiler;

pub use classifier::{classify, try_score, ClassifierInputs};
pub use credibility::{get_source_tier, get_source_weight, TierInfo};
pub use dynamic_scorer::{DynamicSourceScorer, Recommendations, SourcePerformance, TierRecommendation};
pub use enrichment::enrich;
pub use error::ClassifyError;
pub use fundamental_scorer::FundamentalScore;
pub use market_regime::{MarketConditionsProvider, MarketRegimeClassifier, RegimeReading};
pub use offering::{apply_offering_sentiment_correction, detect_offering_stage, OfferingStageKind};
pub use ticker_profiler::{TickerProfile, TickerProfiler};
