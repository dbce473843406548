use std::collections::{HashMap, HashSet};

const MIN_N: usize = 1;
const MAX_N: usize = 4;
const MIN_POS_COUNT: u32 = 5;
const MIN_LIFT: f64 = 2.0;

/// A phrase that appears disproportionately often in missed-opportunity
/// titles versus the accepted-items negative pool.
#[derive(Debug, Clone, PartialEq)]
pub struct PhraseStat {
    pub phrase: String,
    pub pos_count: u32,
    pub neg_count: u32,
    pub lift: f64,
}

fn tokenize(title: &str) -> Vec<String> {
    title
        .to_lowercase()
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
        .filter(|w| !w.is_empty())
        .collect()
}

/// Distinct 1..4-grams present in a title, as a set (document frequency, not
/// term frequency — a phrase repeated twice in one title still counts once).
fn ngrams(title: &str) -> HashSet<String> {
    let tokens = tokenize(title);
    let mut phrases = HashSet::new();
    for n in MIN_N..=MAX_N {
        if tokens.len() < n {
            continue;
        }
        for window in tokens.windows(n) {
            phrases.insert(window.join(" "));
        }
    }
    phrases
}

/// Text-mine discriminative n-grams, spec.md §4.13 step 4. `neg_titles` with
/// zero occurrences of a phrase are Laplace-smoothed (`0.5` pseudo-count)
/// rather than treated as an infinite lift.
pub fn mine_phrases(pos_titles: &[String], neg_titles: &[String]) -> Vec<PhraseStat> {
    let pos_total = pos_titles.len().max(1) as f64;
    let neg_total = neg_titles.len().max(1) as f64;

    let mut pos_counts: HashMap<String, u32> = HashMap::new();
    for title in pos_titles {
        for phrase in ngrams(title) {
            *pos_counts.entry(phrase).or_insert(0) += 1;
        }
    }
    let mut neg_counts: HashMap<String, u32> = HashMap::new();
    for title in neg_titles {
        for phrase in ngrams(title) {
            *neg_counts.entry(phrase).or_insert(0) += 1;
        }
    }

    let mut out = Vec::new();
    for (phrase, pos_count) in pos_counts {
        if pos_count < MIN_POS_COUNT {
            continue;
        }
        let neg_count = neg_counts.get(&phrase).copied().unwrap_or(0);
        let pos_rate = pos_count as f64 / pos_total;
        let neg_rate = if neg_count == 0 {
            0.5 / neg_total
        } else {
            neg_count as f64 / neg_total
        };
        let lift = pos_rate / neg_rate;
        if lift >= MIN_LIFT {
            out.push(PhraseStat {
                phrase,
                pos_count,
                neg_count,
                lift,
            });
        }
    }
    out.sort_by(|a, b| b.lift.partial_cmp(&a.lift).unwrap());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phrase_unique_to_missed_opportunities_has_high_lift() {
        let pos = vec![
            "uplisting to nasdaq approved".to_string(),
            "company announces uplisting to nasdaq".to_string(),
            "uplisting to nasdaq confirmed".to_string(),
            "stock uplisting to nasdaq today".to_string(),
            "uplisting to nasdaq official".to_string(),
        ];
        let neg = vec!["quarterly results announced".to_string(); 20];
        let phrases = mine_phrases(&pos, &neg);
        assert!(phrases.iter().any(|p| p.phrase == "uplisting to nasdaq"));
    }

    #[test]
    fn phrase_below_min_pos_count_is_dropped() {
        let pos = vec!["rare phrase here".to_string(); 3];
        let neg = Vec::new();
        let phrases = mine_phrases(&pos, &neg);
        assert!(phrases.is_empty());
    }

    #[test]
    fn phrase_common_to_both_pools_has_low_lift() {
        let pos = vec!["quarterly earnings call".to_string(); 10];
        let neg = vec!["quarterly earnings call".to_string(); 10];
        let phrases = mine_phrases(&pos, &neg);
        assert!(phrases.iter().all(|p| p.phrase != "quarterly earnings call"));
    }
}
