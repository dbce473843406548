use std::sync::OnceLock;

use regex::RegexSet;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferingStageKind {
    Closing,
    Announcement,
    Pricing,
    Upsize,
    Debt,
}

impl OfferingStageKind {
    fn sentiment(self) -> Decimal {
        match self {
            OfferingStageKind::Closing => dec!(0.2),
            OfferingStageKind::Announcement => dec!(-0.6),
            OfferingStageKind::Pricing => dec!(-0.5),
            OfferingStageKind::Upsize => dec!(-0.7),
            OfferingStageKind::Debt => dec!(0.3),
        }
    }

    fn confidence(self) -> Decimal {
        match self {
            OfferingStageKind::Closing => dec!(0.9),
            OfferingStageKind::Announcement => dec!(0.85),
            OfferingStageKind::Pricing => dec!(0.9),
            OfferingStageKind::Upsize => dec!(0.95),
            OfferingStageKind::Debt => Decimal::ONE,
        }
    }
}

const OFFERING_KEYWORDS: &[&str] = &[
    "offering",
    "offer",
    "priced",
    "upsized",
    "shares",
    "public offering",
    "secondary offering",
    "registered direct",
    "shelf offering",
    "underwritten",
    "notes",
    "debt",
];

const DEBT_OFFERING_KEYWORDS: &[&str] = &[
    "notes offering",
    "note offering",
    "unsecured notes",
    "secured notes",
    "convertible notes",
    "debt offering",
    "bond offering",
    "senior notes",
    "subordinated notes",
    "institutional notes",
];

/// Pattern groups in detection-priority order: upsize takes precedence over
/// closing, which takes precedence over pricing, which takes precedence over
/// a bare announcement, per the original system's stated priority (a
/// material upsize or the completion of an offering matters more than the
/// fact an offering exists at all).
const PATTERN_GROUPS: &[(OfferingStageKind, &[&str])] = &[
    (
        OfferingStageKind::Upsize,
        &[
            r"(?i)upsizes?.*?offering",
            r"(?i)upsized.*?offering",
            r"(?i)increases?.*?offering.*?size",
            r"(?i)increased.*?offering.*?size",
            r"(?i)expands?.*?offering",
            r"(?i)expanded.*?offering",
            r"(?i)enlarges?.*?offering",
        ],
    ),
    (
        OfferingStageKind::Closing,
        &[
            r"(?i)closing\s+of.*?offering",
            r"(?i)closes.*?offering",
            r"(?i)closed.*?offering",
            r"(?i)completed.*?offering",
            r"(?i)announces?\s+the\s+closing",
            r"(?i)announced?\s+the\s+closing",
            r"(?i)completion\s+of.*?offering",
            r"(?i)consummation\s+of.*?offering",
            r"(?i)finalized.*?offering",
        ],
    ),
    (
        OfferingStageKind::Pricing,
        &[
            r"(?i)prices?.*?offering\s+at",
            r"(?i)priced.*?offering",
            r"(?i)pricing\s+of.*?offering",
            r"(?i)offering\s+priced\s+at",
            r"(?i)sets?\s+price\s+at",
            r"(?i)per\s+share\s+in.*?offering",
        ],
    ),
    (
        OfferingStageKind::Announcement,
        &[
            r"(?i)announces?.*?offering",
            r"(?i)announced?.*?offering",
            r"(?i)files?.*?offering",
            r"(?i)filed.*?offering",
            r"(?i)intends?\s+to\s+offer",
            r"(?i)plans?\s+to\s+offer",
            r"(?i)proposes?.*?offering",
            r"(?i)proposed.*?offering",
            r"(?i)registr(?:ation|ing).*?offering",
            r"(?i)shelf.*?offering",
            r"(?i)preliminary.*?prospectus",
        ],
    ),
];

fn pattern_sets() -> &'static Vec<(OfferingStageKind, RegexSet)> {
    static SETS: OnceLock<Vec<(OfferingStageKind, RegexSet)>> = OnceLock::new();
    SETS.get_or_init(|| {
        PATTERN_GROUPS
            .iter()
            .map(|(stage, patterns)| (*stage, RegexSet::new(patterns).expect("static offering regex set")))
            .collect()
    })
}

fn combined_text(title: &str, text: &str) -> String {
    format!("{title} {text}").to_lowercase()
}

pub fn is_offering_news(title: &str, text: &str) -> bool {
    let combined = combined_text(title, text);
    OFFERING_KEYWORDS.iter().any(|kw| combined.contains(kw))
}

pub fn is_debt_offering(title: &str, text: &str) -> bool {
    let combined = combined_text(title, text);
    DEBT_OFFERING_KEYWORDS.iter().any(|kw| combined.contains(kw))
}

/// (stage, confidence), checked in upsize -> closing -> pricing ->
/// announcement priority order. `None` if this isn't offering news at all.
pub fn detect_offering_stage(title: &str, text: &str) -> Option<(OfferingStageKind, Decimal)> {
    if !is_offering_news(title, text) {
        return None;
    }
    let combined = combined_text(title, text);
    for (stage, set) in pattern_sets() {
        if set.is_match(&combined) {
            return Some((*stage, stage.confidence()));
        }
    }
    None
}

/// Detects the offering stage/sentiment and decides whether it should
/// override a classifier's existing sentiment score.
///
/// Returns `(sentiment, stage, was_corrected)`. Debt/notes offerings are
/// checked first since they're non-dilutive and should never be treated as
/// a bearish equity offering regardless of what pattern they also match.
pub fn apply_offering_sentiment_correction(
    title: &str,
    text: &str,
    current_sentiment: Decimal,
    min_confidence: Decimal,
) -> (Decimal, Option<OfferingStageKind>, bool) {
    if is_debt_offering(title, text) {
        return (OfferingStageKind::Debt.sentiment(), Some(OfferingStageKind::Debt), true);
    }

    let Some((stage, confidence)) = detect_offering_stage(title, text) else {
        return (current_sentiment, None, false);
    };

    if confidence < min_confidence {
        return (current_sentiment, Some(stage), false);
    }

    (stage.sentiment(), Some(stage), true)
}
