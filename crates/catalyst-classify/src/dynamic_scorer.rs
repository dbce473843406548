use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::credibility::{get_source_tier, get_source_weight, normalize_host};
use crate::error::ClassifyError;

const MIN_SOURCE_OBSERVATIONS: u32 = 10;
const PENALTY_THRESHOLD: f64 = 0.3;
const REWARD_THRESHOLD: f64 = 0.7;
const MIN_DYNAMIC_WEIGHT: Decimal = dec!(0.1);
const MAX_DYNAMIC_WEIGHT: Decimal = dec!(2.0);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentOutcome {
    pub is_success: bool,
    pub return_pct: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcePerformance {
    pub domain: String,
    pub observation_count: u32,
    pub wins: u32,
    pub losses: u32,
    pub accuracy: f64,
    pub avg_return_pct: f64,
    pub total_return: f64,
    pub last_updated: DateTime<Utc>,
    pub recent_outcomes: Vec<RecentOutcome>,
}

impl SourcePerformance {
    fn new(domain: String, timestamp: DateTime<Utc>) -> Self {
        Self {
            domain,
            observation_count: 0,
            wins: 0,
            losses: 0,
            accuracy: 0.0,
            avg_return_pct: 0.0,
            total_return: 0.0,
            last_updated: timestamp,
            recent_outcomes: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TierRecommendation {
    pub domain: String,
    pub current_tier: u8,
    pub accuracy: f64,
    pub observation_count: u32,
}

#[derive(Debug, Default, Serialize)]
pub struct Recommendations {
    pub upgrade_to_tier1: Vec<TierRecommendation>,
    pub upgrade_to_tier2: Vec<TierRecommendation>,
    pub downgrade_to_tier3: Vec<TierRecommendation>,
}

/// Dynamic, outcome-weighted overlay on the static tier table in
/// [`crate::credibility`]. Persisted to `data/source_performance/
/// source_performance.json` (spec.md §6). Owned by whichever component holds
/// it rather than a module-level singleton (spec.md §9's explicit-context
/// design note).
#[derive(Default)]
pub struct DynamicSourceScorer {
    performance: HashMap<String, SourcePerformance>,
}

impl DynamicSourceScorer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ClassifyError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        let doc: PersistedDoc = serde_json::from_str(&raw)?;
        Ok(Self {
            performance: doc.sources,
        })
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ClassifyError> {
        let path: PathBuf = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let doc = PersistedDoc {
            timestamp: Utc::now(),
            sources_count: self.performance.len(),
            sources: self.performance.clone(),
        };
        std::fs::write(path, serde_json::to_string_pretty(&doc)?)?;
        Ok(())
    }

    /// Static tier weight adjusted by historical accuracy, clamped to
    /// `[0.1, 2.0]`. Falls back to the static weight until the source has
    /// accumulated `MIN_SOURCE_OBSERVATIONS`.
    pub fn get_source_weight(&self, host: &str) -> Decimal {
        let domain = normalize_host(host);
        let static_weight = get_source_weight(domain);

        let Some(perf) = self.performance.get(domain) else {
            return static_weight;
        };
        if perf.observation_count < MIN_SOURCE_OBSERVATIONS {
            return static_weight;
        }

        let multiplier = dynamic_multiplier(perf.accuracy);
        (static_weight * multiplier).clamp(MIN_DYNAMIC_WEIGHT, MAX_DYNAMIC_WEIGHT)
    }

    pub fn record_outcome(
        &mut self,
        host: &str,
        is_success: bool,
        return_pct: Option<f64>,
        timestamp: DateTime<Utc>,
    ) {
        let domain = normalize_host(host).to_string();
        let perf = self
            .performance
            .entry(domain.clone())
            .or_insert_with(|| SourcePerformance::new(domain, timestamp));

        perf.observation_count += 1;
        if is_success {
            perf.wins += 1;
        } else {
            perf.losses += 1;
        }
        if let Some(pct) = return_pct {
            perf.total_return += pct;
        }

        let total = perf.wins + perf.losses;
        perf.accuracy = if total > 0 {
            perf.wins as f64 / total as f64
        } else {
            0.0
        };
        perf.avg_return_pct = if perf.observation_count > 0 {
            perf.total_return / perf.observation_count as f64
        } else {
            0.0
        };
        perf.last_updated = timestamp;
        perf.recent_outcomes.push(RecentOutcome {
            is_success,
            return_pct,
            timestamp,
        });
        if perf.recent_outcomes.len() > 10 {
            perf.recent_outcomes.remove(0);
        }
    }

    pub fn get_performance(&self, host: &str) -> Option<&SourcePerformance> {
        self.performance.get(normalize_host(host))
    }

    /// Tier upgrade/downgrade suggestions for domains with enough data.
    /// Thresholds mirror the ones used for the reward/penalty multipliers.
    pub fn generate_recommendations(&self, min_observations: u32) -> Recommendations {
        let mut out = Recommendations::default();
        for (domain, perf) in &self.performance {
            if perf.observation_count < min_observations {
                continue;
            }
            let current_tier = get_source_tier(domain);
            let rec = TierRecommendation {
                domain: domain.clone(),
                current_tier,
                accuracy: perf.accuracy,
                observation_count: perf.observation_count,
            };
            if perf.accuracy >= 0.8 && current_tier > 1 {
                out.upgrade_to_tier1.push(rec);
            } else if perf.accuracy >= 0.65 && current_tier == 3 {
                out.upgrade_to_tier2.push(rec);
            } else if perf.accuracy < 0.35 && current_tier < 3 {
                out.downgrade_to_tier3.push(rec);
            }
        }
        out
    }
}

fn dynamic_multiplier(accuracy: f64) -> Decimal {
    if accuracy < PENALTY_THRESHOLD {
        dec!(0.4)
    } else if accuracy < 0.4 {
        dec!(0.7)
    } else if accuracy >= 0.8 {
        dec!(1.6)
    } else if accuracy >= REWARD_THRESHOLD {
        dec!(1.3)
    } else {
        dec!(1.0)
    }
}

#[derive(Serialize, Deserialize)]
struct PersistedDoc {
    timestamp: DateTime<Utc>,
    sources_count: usize,
    sources: HashMap<String, SourcePerformance>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_performance_data_falls_back_to_static_weight() {
        let scorer = DynamicSourceScorer::new();
        assert_eq!(scorer.get_source_weight("sec.gov"), dec!(1.5));
    }

    #[test]
    fn below_min_observations_falls_back_to_static() {
        let mut scorer = DynamicSourceScorer::new();
        for _ in 0..5 {
            scorer.record_outcome("badpr.com", false, None, Utc::now());
        }
        assert_eq!(scorer.get_source_weight("badpr.com"), dec!(0.5));
    }

    #[test]
    fn chronic_underperformer_gets_severe_penalty() {
        let mut scorer = DynamicSourceScorer::new();
        for _ in 0..12 {
            scorer.record_outcome("badpr.com", false, None, Utc::now());
        }
        // Tier 3 static 0.5 * 0.4 penalty = 0.2
        assert_eq!(scorer.get_source_weight("badpr.com"), dec!(0.20));
    }

    #[test]
    fn excellent_source_gets_high_reward() {
        let mut scorer = DynamicSourceScorer::new();
        for _ in 0..10 {
            scorer.record_outcome("globenewswire.com", true, None, Utc::now());
        }
        // Tier 2 static 1.0 * 1.6 reward = 1.6
        assert_eq!(scorer.get_source_weight("globenewswire.com"), dec!(1.6));
    }

    #[test]
    fn recommendations_flag_excellent_tier3_source_for_tier1_upgrade() {
        let mut scorer = DynamicSourceScorer::new();
        for _ in 0..10 {
            scorer.record_outcome("risingstar.com", true, None, Utc::now());
        }
        let recs = scorer.generate_recommendations(10);
        assert_eq!(recs.upgrade_to_tier1.len(), 1);
        assert_eq!(recs.upgrade_to_tier1[0].domain, "risingstar.com");
    }

    #[test]
    fn recommendations_flag_poor_source_for_downgrade() {
        let mut scorer = DynamicSourceScorer::new();
        for i in 0..10 {
            scorer.record_outcome("businesswire.com", i < 3, None, Utc::now());
        }
        let recs = scorer.generate_recommendations(10);
        assert_eq!(recs.downgrade_to_tier3.len(), 1);
    }

    #[test]
    fn save_and_load_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("source_performance.json");
        let mut scorer = DynamicSourceScorer::new();
        scorer.record_outcome("globenewswire.com", true, Some(12.5), Utc::now());
        scorer.save(&path).unwrap();

        let reloaded = DynamicSourceScorer::load(&path).unwrap();
        let perf = reloaded.get_performance("globenewswire.com").unwrap();
        assert_eq!(perf.wins, 1);
    }
}
