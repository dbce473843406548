pub mod analyzer;
pub mod error;
pub mod input;
pub mod keyword_stats;
pub mod ngram;
pub mod persistence;
pub mod prices;
pub mod recommendations;

pub use analyzer::{run_analysis, MoaRunOutcome};
pub use error::MoaError;
pub use input::{within_window, AcceptedItem, RejectedItem};
pub use keyword_stats::KeywordStat;
pub use ngram::PhraseStat;
pub use persistence::{
    default_analysis_state_path, default_recommendations_path, load_analysis_state,
    load_recommendations, save_analysis_state, save_recommendations, AnalysisState,
    RecommendationsDoc,
};
pub use prices::PriceCache;
pub use recommendations::{Confidence, WeightRecommendation};
