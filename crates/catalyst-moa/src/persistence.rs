use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::MoaError;
use crate::recommendations::WeightRecommendation;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationsDoc {
    pub generated_at: DateTime<Utc>,
    pub recommendations: Vec<WeightRecommendation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisState {
    pub last_run_at: DateTime<Utc>,
    pub since_days: i64,
    pub rows_considered: usize,
    pub missed_opportunities: usize,
    pub recommendations_emitted: usize,
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), MoaError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Option<T>, MoaError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = std::fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&raw)?))
}

/// `data/moa/recommendations.json` — the classifier reads these weights on
/// its next cycle; applying them is a separate, human-approved step
/// (spec.md §4.13 step 6).
pub fn save_recommendations(path: impl AsRef<Path>, doc: &RecommendationsDoc) -> Result<(), MoaError> {
    write_json(path.as_ref(), doc)
}

pub fn load_recommendations(path: impl AsRef<Path>) -> Result<Option<RecommendationsDoc>, MoaError> {
    read_json(path.as_ref())
}

/// `data/moa/analysis_state.json` — last-run metadata, so a subsequent run
/// can report drift without re-scanning the whole window.
pub fn save_analysis_state(path: impl AsRef<Path>, state: &AnalysisState) -> Result<(), MoaError> {
    write_json(path.as_ref(), state)
}

pub fn load_analysis_state(path: impl AsRef<Path>) -> Result<Option<AnalysisState>, MoaError> {
    read_json(path.as_ref())
}

pub fn default_recommendations_path(data_dir: &str) -> PathBuf {
    Path::new(data_dir).join("moa").join("recommendations.json")
}

pub fn default_analysis_state_path(data_dir: &str) -> PathBuf {
    Path::new(data_dir).join("moa").join("analysis_state.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recommendations::Confidence;
    use rust_decimal_macros::dec;

    #[test]
    fn recommendations_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recommendations.json");
        let doc = RecommendationsDoc {
            generated_at: Utc::now(),
            recommendations: vec![WeightRecommendation {
                keyword: "partnership".to_string(),
                is_new_phrase: false,
                current_weight: Some(dec!(1.0)),
                proposed_weight: dec!(1.3),
                delta: dec!(0.3),
                confidence: Confidence::High,
                sample_size: 20,
                success_rate: 0.75,
                avg_return_pct: 14.0,
            }],
        };
        save_recommendations(&path, &doc).unwrap();
        let loaded = load_recommendations(&path).unwrap().unwrap();
        assert_eq!(loaded.recommendations.len(), 1);
        assert_eq!(loaded.recommendations[0].keyword, "partnership");
    }

    #[test]
    fn missing_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recommendations.json");
        assert!(load_recommendations(&path).unwrap().is_none());
    }
}
