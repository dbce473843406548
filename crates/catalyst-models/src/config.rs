use serde::{Deserialize, Serialize};
use std::collections::HashMap;

fn default_true() -> bool {
    true
}

fn default_false() -> bool {
    false
}

/// Feature flags gating optional classification/pipeline steps. All default to
/// `true` except the ones explicitly behind an opt-in flag in spec.md §6
/// (extended keywords, negative alerts, dynamic source scorer, LLM classifier).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureFlags {
    #[serde(default = "default_true")]
    pub earnings_scorer: bool,
    #[serde(default = "default_true")]
    pub ml_sentiment: bool,
    #[serde(default = "default_true")]
    pub semantic_keywords: bool,
    #[serde(default = "default_true")]
    pub insider_sentiment: bool,
    #[serde(default = "default_true")]
    pub google_trends: bool,
    #[serde(default = "default_true")]
    pub short_interest_boost: bool,
    #[serde(default = "default_true")]
    pub premarket_sentiment: bool,
    #[serde(default = "default_true")]
    pub aftermarket_sentiment: bool,
    #[serde(default = "default_true")]
    pub news_velocity: bool,
    #[serde(default = "default_true")]
    pub volume_price_divergence: bool,
    #[serde(default = "default_true")]
    pub market_regime: bool,
    #[serde(default = "default_true")]
    pub rvol: bool,
    #[serde(default = "default_true")]
    pub fundamental_scoring: bool,
    #[serde(default = "default_true")]
    pub ticker_profiler: bool,
    #[serde(default = "default_false")]
    pub dynamic_source_scorer: bool,
    #[serde(default = "default_false")]
    pub negative_alerts: bool,
    #[serde(default = "default_false")]
    pub extended_keywords: bool,
    #[serde(default = "default_false")]
    pub llm_classifier: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            earnings_scorer: true,
            ml_sentiment: true,
            semantic_keywords: true,
            insider_sentiment: true,
            google_trends: true,
            short_interest_boost: true,
            premarket_sentiment: true,
            aftermarket_sentiment: true,
            news_velocity: true,
            volume_price_divergence: true,
            market_regime: true,
            rvol: true,
            fundamental_scoring: true,
            ticker_profiler: true,
            dynamic_source_scorer: false,
            negative_alerts: false,
            extended_keywords: false,
            llm_classifier: false,
        }
    }
}

fn default_sentiment_weights() -> HashMap<String, f64> {
    [
        ("earnings", 0.35),
        ("ml", 0.25),
        ("vader", 0.25),
        ("llm", 0.15),
        ("google_trends", 0.08),
        ("short_interest", 0.08),
        ("premarket_action", 0.15),
        ("aftermarket_action", 0.15),
        ("news_velocity", 0.05),
        ("insider", 0.12),
        ("divergence", 0.08),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

fn default_sentiment_batch_size() -> u32 {
    5
}

fn default_mistral_batch_delay_secs() -> u64 {
    2
}

fn default_min_prescale_score() -> f64 {
    0.20
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SentimentConfig {
    #[serde(default = "default_sentiment_weights")]
    pub weights: HashMap<String, f64>,
    #[serde(default = "default_sentiment_batch_size")]
    pub batch_size: u32,
    #[serde(default = "default_mistral_batch_delay_secs")]
    pub llm_batch_delay_secs: u64,
    #[serde(default = "default_min_prescale_score")]
    pub llm_min_prescale_score: f64,
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            weights: default_sentiment_weights(),
            batch_size: default_sentiment_batch_size(),
            llm_batch_delay_secs: default_mistral_batch_delay_secs(),
            llm_min_prescale_score: default_min_prescale_score(),
        }
    }
}

fn default_min_confidence() -> f64 {
    0.70
}
fn default_min_score() -> f64 {
    1.0
}
fn default_position_size_base_pct() -> f64 {
    1.0
}
fn default_position_size_max_pct() -> f64 {
    5.0
}
fn default_stop_loss_pct() -> f64 {
    5.0
}
fn default_take_profit_pct() -> f64 {
    10.0
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SignalConfig {
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,
    #[serde(default = "default_min_score")]
    pub min_score: f64,
    #[serde(default = "default_position_size_base_pct")]
    pub position_size_base_pct: f64,
    #[serde(default = "default_position_size_max_pct")]
    pub position_size_max_pct: f64,
    #[serde(default = "default_stop_loss_pct")]
    pub default_stop_loss_pct: f64,
    #[serde(default = "default_take_profit_pct")]
    pub default_take_profit_pct: f64,
    #[serde(default = "default_false")]
    pub extended_hours: bool,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            min_confidence: default_min_confidence(),
            min_score: default_min_score(),
            position_size_base_pct: default_position_size_base_pct(),
            position_size_max_pct: default_position_size_max_pct(),
            default_stop_loss_pct: default_stop_loss_pct(),
            default_take_profit_pct: default_take_profit_pct(),
            extended_hours: false,
        }
    }
}

fn default_market_open_cycle_secs() -> u64 {
    30
}
fn default_extended_hours_cycle_secs() -> u64 {
    60
}
fn default_market_closed_cycle_secs() -> u64 {
    300
}
fn default_preopen_warmup_hours() -> u64 {
    1
}
fn default_max_hold_hours() -> u64 {
    72
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SchedulerConfig {
    #[serde(default = "default_market_open_cycle_secs")]
    pub market_open_cycle_secs: u64,
    #[serde(default = "default_extended_hours_cycle_secs")]
    pub extended_hours_cycle_secs: u64,
    #[serde(default = "default_market_closed_cycle_secs")]
    pub market_closed_cycle_secs: u64,
    #[serde(default = "default_preopen_warmup_hours")]
    pub preopen_warmup_hours: u64,
    #[serde(default = "default_max_hold_hours")]
    pub max_hold_hours: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            market_open_cycle_secs: default_market_open_cycle_secs(),
            extended_hours_cycle_secs: default_extended_hours_cycle_secs(),
            market_closed_cycle_secs: default_market_closed_cycle_secs(),
            preopen_warmup_hours: default_preopen_warmup_hours(),
            max_hold_hours: default_max_hold_hours(),
        }
    }
}

fn default_broker_paper() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct BrokerConfig {
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    #[serde(default = "default_broker_paper")]
    pub paper: bool,
}

fn default_llm_endpoint() -> String {
    "http://localhost:11434/api/generate".to_string()
}
fn default_llm_model() -> String {
    "mistral".to_string()
}
fn default_llm_timeout_secs() -> u64 {
    15
}
fn default_llm_max_concurrent() -> usize {
    5
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LlmConfig {
    #[serde(default = "default_llm_endpoint")]
    pub endpoint_url: String,
    #[serde(default = "default_llm_model")]
    pub model_name: String,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_llm_max_concurrent")]
    pub max_concurrent: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint_url: default_llm_endpoint(),
            model_name: default_llm_model(),
            timeout_secs: default_llm_timeout_secs(),
            max_concurrent: default_llm_max_concurrent(),
        }
    }
}

fn default_since_days() -> i64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MoaConfig {
    #[serde(default = "default_since_days")]
    pub since_days: i64,
}

impl Default for MoaConfig {
    fn default() -> Self {
        Self {
            since_days: default_since_days(),
        }
    }
}

fn default_data_dir() -> String {
    "./data".to_string()
}

/// Root configuration surface, loaded from TOML with every field defaulted so a
/// missing or partial file never fails to load (spec.md §6: "missing values
/// never crash the core").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalystConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default)]
    pub features: FeatureFlags,
    #[serde(default)]
    pub sentiment: SentimentConfig,
    #[serde(default)]
    pub signal: SignalConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub moa: MoaConfig,
}

impl Default for CatalystConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            features: FeatureFlags::default(),
            sentiment: SentimentConfig::default(),
            signal: SignalConfig::default(),
            scheduler: SchedulerConfig::default(),
            broker: BrokerConfig::default(),
            llm: LlmConfig::default(),
            moa: MoaConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_safe_values() {
        let config = CatalystConfig::default();
        assert!(config.features.earnings_scorer);
        assert!(!config.features.extended_keywords);
        assert_eq!(config.signal.min_confidence, 0.70);
        assert_eq!(config.sentiment.weights.get("earnings"), Some(&0.35));
    }

    #[test]
    fn config_from_partial_toml_fills_defaults() {
        let toml_str = r#"
            data_dir = "/tmp/catalyst"

            [features]
            extended_keywords = true
        "#;
        let config: CatalystConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.data_dir, "/tmp/catalyst");
        assert!(config.features.extended_keywords);
        // untouched fields still default
        assert!(config.features.earnings_scorer);
        assert_eq!(config.signal.position_size_max_pct, 5.0);
    }

    #[test]
    fn config_roundtrip() {
        let config = CatalystConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: CatalystConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config, parsed);
    }
}
