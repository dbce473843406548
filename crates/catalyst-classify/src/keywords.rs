use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Category name -> its keyword list. Each category matches at most once per
/// item, regardless of how many of its keywords appear (spec.md §4.5 step 4).
fn keyword_categories() -> &'static HashMap<&'static str, &'static [&'static str]> {
    static CATEGORIES: OnceLock<HashMap<&'static str, &'static [&'static str]>> = OnceLock::new();
    CATEGORIES.get_or_init(|| {
        HashMap::from([
            ("fda", &["fda approval", "fda clearance", "fda grants", "breakthrough therapy"][..]),
            ("merger", &["merger", "merging with", "merger agreement"][..]),
            ("acquisition", &["acquisition", "to acquire", "definitive agreement", "acquires"][..]),
            ("partnership", &["partnership", "collaborat", "strategic alliance"][..]),
            ("trial", &["clinical trial", "phase 1", "phase 2", "phase 3", "trial results"][..]),
            ("clinical", &["clinical data", "clinical study", "topline results"][..]),
            ("uplisting", &["uplisting", "uplist to nasdaq", "uplist to nyse"][..]),
            ("contract_win", &["awarded contract", "purchase order", "supply agreement"][..]),
            ("earnings_beat", &["beats estimates", "record revenue"][..]),
            ("earnings", &["earnings report", "quarterly results", "reports earnings"][..]),
            ("guidance", &["raises guidance", "guidance update", "full-year outlook"][..]),
            ("energy_discovery", &["oil discovery", "gas discovery", "new well", "drilling results"][..]),
            ("advanced_therapies", &["gene therapy", "cell therapy", "crispr"][..]),
            ("tech_contracts", &["software contract", "saas agreement", "licensing deal"][..]),
            ("ai_quantum", &["artificial intelligence", "quantum computing", "machine learning"][..]),
            ("crypto_blockchain", &["blockchain", "cryptocurrency", "bitcoin", "digital asset"][..]),
            ("mining_resources", &["mineral discovery", "ore grade", "mining permit"][..]),
            ("compliance", &["regulatory approval", "compliance milestone"][..]),
            ("activist_institutional", &["activist investor", "institutional stake", "13d filing"][..]),
            ("buyback", &["share repurchase", "buyback program"][..]),
            ("upgrade", &["analyst upgrade", "price target raised", "initiates coverage"][..]),
            (
                "offering_negative",
                &["public offering", "secondary offering", "registered direct", "shelf offering"][..],
            ),
            ("warrant_negative", &["warrant", "warrants exercisable"][..]),
            ("dilution_negative", &["dilutive", "dilution"][..]),
            (
                "distress_negative",
                &["going concern", "bankruptcy", "chapter 11", "delisting notice", "fraud"][..],
            ),
        ])
    })
}

fn negative_categories() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| {
        HashSet::from(["offering_negative", "warrant_negative", "dilution_negative", "distress_negative"])
    })
}

pub fn is_negative_category(category: &str) -> bool {
    negative_categories().contains(category)
}

pub const DEFAULT_CATEGORY_WEIGHT: Decimal = dec!(1.0);

#[derive(Debug, Clone, Default)]
pub struct KeywordMatch {
    pub total_score: Decimal,
    pub hits: Vec<String>,
}

/// Matches `searchable_text` against every configured category, summing a
/// per-category weight (dynamic override if present, else the default) for
/// each category that matched at least one of its keywords.
pub fn match_keywords(searchable_text: &str, dynamic_weights: &HashMap<String, Decimal>) -> KeywordMatch {
    let mut result = KeywordMatch::default();
    for (category, keywords) in keyword_categories() {
        if keywords.iter().any(|kw| searchable_text.contains(kw)) {
            let weight = dynamic_weights.get(*category).copied().unwrap_or(DEFAULT_CATEGORY_WEIGHT);
            result.total_score += weight;
            result.hits.push((*category).to_string());
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fda_keyword_is_matched_once() {
        let result = match_keywords("company receives fda approval and fda clearance", &HashMap::new());
        assert_eq!(result.hits, vec!["fda".to_string()]);
        assert_eq!(result.total_score, dec!(1.0));
    }

    #[test]
    fn dynamic_weight_overrides_default() {
        let mut weights = HashMap::new();
        weights.insert("fda".to_string(), dec!(2.5));
        let result = match_keywords("fda approval granted", &weights);
        assert_eq!(result.total_score, dec!(2.5));
    }

    #[test]
    fn negative_categories_are_flagged() {
        assert!(is_negative_category("offering_negative"));
        assert!(!is_negative_category("fda"));
    }

    #[test]
    fn multiple_categories_accumulate() {
        let result = match_keywords("merger and fda approval announced", &HashMap::new());
        assert_eq!(result.hits.len(), 2);
        assert_eq!(result.total_score, dec!(2.0));
    }
}
