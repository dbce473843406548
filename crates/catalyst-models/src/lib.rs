pub mod broker_types;
pub mod clock;
pub mod config;
pub mod error;
pub mod news_item;
pub mod outcome;
pub mod position;
pub mod scored_item;
pub mod trading_signal;

pub use broker_types::*;
pub use clock::{Clock, FrozenClock, SystemClock};
pub use config::{CatalystConfig, MoaConfig};
pub use error::ProviderError;
pub use news_item::NewsItem;
pub use outcome::{HorizonOutcome, OutcomeRecord, HORIZONS};
pub use position::{ClosedPosition, ExitReason, ManagedPosition};
pub use scored_item::{
    Attachment, DivergenceClassification, EarningsLabel, MarketRegime, OfferingStage, ScoredItem,
    SpyTrend, VwapClassification,
};
pub use trading_signal::{SignalAction, TradingSignal, SIGNAL_SCHEMA_VERSION};

use std::sync::Arc;

/// Explicit context bundling the active configuration and clock, replacing the
/// module-level globals of the source system (spec.md §9's second design note).
#[derive(Clone)]
pub struct Context {
    pub config: Arc<CatalystConfig>,
    pub clock: Arc<dyn Clock>,
}

impl Context {
    pub fn new(config: CatalystConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config: Arc::new(config),
            clock,
        }
    }

    pub fn with_system_clock(config: CatalystConfig) -> Self {
        Self::new(config, Arc::new(SystemClock))
    }
}
