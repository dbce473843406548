use std::collections::HashMap;

use async_trait::async_trait;
use catalyst_models::{Context, NewsItem};
use chrono::Timelike;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::ClassifyError;
use crate::keywords::{is_negative_category, match_keywords};

pub const VIX_PENALTY_FLOOR: Decimal = dec!(0.5);

/// Fixed confidence multiplier per source (spec.md §4.3 table). Weights are
/// configurable (`SentimentConfig::weights`); confidences are not.
pub fn default_confidence(source_name: &str) -> Decimal {
    match source_name {
        "earnings" => dec!(0.95),
        "ml" => dec!(0.85),
        "vader" => dec!(0.60),
        "llm" => dec!(0.70),
        "google_trends" => dec!(0.65),
        "short_interest" => dec!(0.80),
        "premarket_action" => dec!(0.80),
        "aftermarket_action" => dec!(0.80),
        "news_velocity" => dec!(0.70),
        "insider" => dec!(0.85),
        "divergence" => dec!(0.75),
        _ => dec!(0.5),
    }
}

/// One contributor to the sentiment aggregator. `score()` returns
/// `Err(ClassifyError::Abstain(..))` when the source has nothing to say for
/// this item (missing data, out-of-window) — abstention must never be
/// silently treated as a zero score (spec.md §4.3).
#[async_trait]
pub trait SentimentSource: Send + Sync {
    fn name(&self) -> &'static str;
    async fn score(&self, ticker: &str, item: &NewsItem, ctx: &Context) -> Result<Decimal, ClassifyError>;
}

/// Finance-domain lexicon scorer (VADER-style signed word counting). A
/// minimal positive/negative term list stands in for a full lexicon; the
/// aggregation math is what the spec actually exercises.
pub struct VaderSource;

const POSITIVE_TERMS: &[&str] = &[
    "surge", "soar", "jump", "rally", "beat", "upgrade", "breakthrough", "approval", "record", "growth",
];
const NEGATIVE_TERMS: &[&str] = &[
    "plunge", "crash", "miss", "downgrade", "lawsuit", "investigation", "recall", "bankruptcy", "delist", "fraud",
];

#[async_trait]
impl SentimentSource for VaderSource {
    fn name(&self) -> &'static str {
        "vader"
    }

    async fn score(&self, _ticker: &str, item: &NewsItem, _ctx: &Context) -> Result<Decimal, ClassifyError> {
        let text = item.searchable_text();
        let pos = POSITIVE_TERMS.iter().filter(|t| text.contains(*t)).count() as i64;
        let neg = NEGATIVE_TERMS.iter().filter(|t| text.contains(*t)).count() as i64;
        if pos == 0 && neg == 0 {
            return Err(ClassifyError::Abstain("vader: no lexicon hits".to_string()));
        }
        let total = pos + neg;
        let raw = Decimal::from(pos - neg) / Decimal::from(total);
        Ok(raw.clamp(dec!(-1), dec!(1)))
    }
}

/// Finance-domain category classifier (spec.md's "ml" source). Reuses the
/// same keyword taxonomy the fast-path classifier tags items with, but turns
/// category hits into a signed lexical sentiment rather than a score bonus —
/// distinct from `VaderSource`'s generic positive/negative term list.
pub struct MlSource;

#[async_trait]
impl SentimentSource for MlSource {
    fn name(&self) -> &'static str {
        "ml"
    }

    async fn score(&self, _ticker: &str, item: &NewsItem, _ctx: &Context) -> Result<Decimal, ClassifyError> {
        let text = item.searchable_text();
        let matched = match_keywords(&text, &HashMap::new());
        if matched.hits.is_empty() {
            return Err(ClassifyError::Abstain("ml: no finance-category hits".to_string()));
        }
        let (pos, neg) = matched.hits.iter().fold((0i64, 0i64), |(pos, neg), category| {
            if is_negative_category(category) {
                (pos, neg + 1)
            } else {
                (pos + 1, neg)
            }
        });
        let total = pos + neg;
        let raw = Decimal::from(pos - neg) / Decimal::from(total);
        Ok(raw.clamp(dec!(-1), dec!(1)))
    }
}

/// Earnings beat/miss scoring from hard EPS numbers, used both as a
/// sentiment-aggregator contributor and, separately, to additively adjust
/// `total_score` via the step-1 bands in the fast-path classifier.
pub struct EarningsResult {
    pub sentiment_score: Decimal,
    pub actual_eps: Option<Decimal>,
    pub estimate_eps: Option<Decimal>,
    pub actual_revenue: Option<Decimal>,
    pub estimate_revenue: Option<Decimal>,
}

/// `+2.0 / +1.0 / −0.5 / −1.5` additive bands from a beat/miss magnitude,
/// plus a confidence bump of `+0.05..+0.15`.
pub fn earnings_score_adjustment(sentiment_score: Decimal) -> (Decimal, Decimal) {
    if sentiment_score >= dec!(0.5) {
        (dec!(2.0), dec!(0.15))
    } else if sentiment_score > dec!(0.0) {
        (dec!(1.0), dec!(0.10))
    } else if sentiment_score > dec!(-0.5) {
        (dec!(-0.5), dec!(0.05))
    } else {
        (dec!(-1.5), dec!(0.05))
    }
}

pub fn score_earnings(actual_eps: Decimal, estimate_eps: Decimal) -> EarningsResult {
    let sentiment_score = if estimate_eps != Decimal::ZERO {
        ((actual_eps - estimate_eps) / estimate_eps.abs()).clamp(dec!(-1), dec!(1))
    } else if actual_eps > Decimal::ZERO {
        dec!(1)
    } else {
        dec!(-1)
    };
    EarningsResult {
        sentiment_score,
        actual_eps: Some(actual_eps),
        estimate_eps: Some(estimate_eps),
        actual_revenue: None,
        estimate_revenue: None,
    }
}

/// Detects an earnings-result item from `raw.eps_actual`/`raw.eps_estimate`
/// (the same secondary-channel precomputed-field pattern `raw.sentiment_analysis`
/// uses), gated on the title/summary mentioning earnings and not matching a
/// forward-looking preview headline. No EPS figures in `raw` means no upstream
/// earnings feed populated this item, so it abstains rather than guessing.
pub fn detect_earnings_result(item: &NewsItem) -> Option<EarningsResult> {
    let text = item.searchable_text();
    if !text.contains("earnings") && !text.contains("eps") {
        return None;
    }
    if is_earnings_preview(&text) {
        return None;
    }

    let actual_eps = item.raw.get("eps_actual").and_then(|v| v.as_f64()).and_then(|f| Decimal::try_from(f).ok())?;
    let estimate_eps = item.raw.get("eps_estimate").and_then(|v| v.as_f64()).and_then(|f| Decimal::try_from(f).ok())?;

    let mut result = score_earnings(actual_eps, estimate_eps);
    result.actual_revenue = item.raw.get("revenue_actual").and_then(|v| v.as_f64()).and_then(|f| Decimal::try_from(f).ok());
    result.estimate_revenue = item.raw.get("revenue_estimate").and_then(|v| v.as_f64()).and_then(|f| Decimal::try_from(f).ok());
    Some(result)
}

/// Excludes "Earnings Preview: XYZ" / "what to expect from XYZ earnings" /
/// "ahead of earnings" coverage, which reports on an earnings event that
/// hasn't happened yet rather than an actual beat/miss.
fn is_earnings_preview(text: &str) -> bool {
    (text.contains("earnings preview") && !text.contains("results")) || text.contains("what to expect from")
        || text.contains("ahead of earnings")
        || text.contains("before earnings")
}

/// Search-interest spike ratio (current search volume / trailing baseline).
#[async_trait]
pub trait TrendsProvider: Send + Sync {
    async fn spike_ratio(&self, ticker: &str) -> Result<Option<f64>, ClassifyError>;
}

pub struct GoogleTrendsSource<P: TrendsProvider> {
    pub provider: P,
}

#[async_trait]
impl<P: TrendsProvider + Send + Sync> SentimentSource for GoogleTrendsSource<P> {
    fn name(&self) -> &'static str {
        "google_trends"
    }

    async fn score(&self, ticker: &str, _item: &NewsItem, _ctx: &Context) -> Result<Decimal, ClassifyError> {
        match self.provider.spike_ratio(ticker).await? {
            Some(ratio) if ratio > 1.0 => {
                let capped = ratio.min(5.0);
                Ok((Decimal::try_from((capped - 1.0) / 4.0).unwrap_or(Decimal::ZERO)).clamp(dec!(0), dec!(1)))
            }
            Some(_) => Ok(Decimal::ZERO),
            None => Err(ClassifyError::Abstain("google_trends: no data".to_string())),
        }
    }
}

/// Percentage of float currently sold short, feeding the squeeze amplifier.
/// Unlike the other sources here this has no standalone `SentimentSource`
/// impl: its contribution is a *delta* against the aggregate's own
/// preliminary sentiment (spec.md §4.4), so the caller computes that
/// preliminary value and calls `short_interest_amplified_delta` directly
/// rather than going through the one-item-at-a-time `score()` seam.
#[async_trait]
pub trait ShortInterestProvider: Send + Sync {
    async fn short_interest_pct(&self, ticker: &str) -> Result<Option<Decimal>, ClassifyError>;
}

/// Short-interest squeeze amplifier (spec.md §4.4). The aggregator receives
/// the *delta* between amplified and base sentiment, not the multiplied
/// value, so fusion stays additive.
pub fn short_interest_amplified_delta(short_interest_pct: Decimal, base_sentiment: Decimal) -> Decimal {
    if base_sentiment <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let multiplier = if short_interest_pct >= dec!(40) && base_sentiment >= dec!(0.7) {
        dec!(1.7)
    } else if short_interest_pct >= dec!(30) && base_sentiment >= dec!(0.6) {
        dec!(1.5)
    } else if short_interest_pct >= dec!(20) && base_sentiment >= dec!(0.5) {
        dec!(1.3)
    } else {
        return Decimal::ZERO;
    };
    base_sentiment * multiplier - base_sentiment
}

/// Pre/after-market price action, valid only within the temporal windows in
/// spec.md §4.3. Outside those windows the source abstains rather than
/// returning a stale/zero reading.
pub struct PremarketActionSource<P: PriceActionProvider> {
    pub provider: P,
}
pub struct AftermarketActionSource<P: PriceActionProvider> {
    pub provider: P,
}

#[async_trait]
pub trait PriceActionProvider: Send + Sync {
    async fn session_change_pct(&self, ticker: &str) -> Result<Option<Decimal>, ClassifyError>;
}

fn is_premarket_window(ctx: &Context) -> bool {
    let et = ctx.clock.now_et();
    let minutes = et.hour() * 60 + et.minute();
    (4 * 60..9 * 60 + 30).contains(&minutes) || (9 * 60 + 31..10 * 60).contains(&minutes)
}

fn is_aftermarket_window(ctx: &Context) -> bool {
    let et = ctx.clock.now_et();
    let minutes = et.hour() * 60 + et.minute();
    (16 * 60..20 * 60).contains(&minutes) || (24 * 60..24 * 60 + 30).contains(&minutes)
}

fn action_to_sentiment(change_pct: Decimal) -> Decimal {
    (change_pct / dec!(10)).clamp(dec!(-1), dec!(1))
}

#[async_trait]
impl<P: PriceActionProvider + Send + Sync> SentimentSource for PremarketActionSource<P> {
    fn name(&self) -> &'static str {
        "premarket_action"
    }

    async fn score(&self, ticker: &str, _item: &NewsItem, ctx: &Context) -> Result<Decimal, ClassifyError> {
        if !is_premarket_window(ctx) {
            return Err(ClassifyError::Abstain("premarket_action: outside window".to_string()));
        }
        match self.provider.session_change_pct(ticker).await? {
            Some(pct) => Ok(action_to_sentiment(pct)),
            None => Err(ClassifyError::Abstain("premarket_action: no data".to_string())),
        }
    }
}

#[async_trait]
impl<P: PriceActionProvider + Send + Sync> SentimentSource for AftermarketActionSource<P> {
    fn name(&self) -> &'static str {
        "aftermarket_action"
    }

    async fn score(&self, ticker: &str, _item: &NewsItem, ctx: &Context) -> Result<Decimal, ClassifyError> {
        if !is_aftermarket_window(ctx) {
            return Err(ClassifyError::Abstain("aftermarket_action: outside window".to_string()));
        }
        match self.provider.session_change_pct(ticker).await? {
            Some(pct) => Ok(action_to_sentiment(pct)),
            None => Err(ClassifyError::Abstain("aftermarket_action: no data".to_string())),
        }
    }
}

/// Articles/hour vs a rolling baseline for the ticker; a burst of coverage
/// is treated as a mildly positive attention signal.
pub struct NewsVelocitySource;

#[async_trait]
impl SentimentSource for NewsVelocitySource {
    fn name(&self) -> &'static str {
        "news_velocity"
    }

    async fn score(&self, _ticker: &str, _item: &NewsItem, _ctx: &Context) -> Result<Decimal, ClassifyError> {
        Err(ClassifyError::Abstain("news_velocity: baseline not available".to_string()))
    }
}

/// Form-4 insider-transaction net value.
#[async_trait]
pub trait InsiderProvider: Send + Sync {
    async fn net_value(&self, ticker: &str) -> Result<Option<Decimal>, ClassifyError>;
}

pub struct InsiderSource<P: InsiderProvider> {
    pub provider: P,
}

#[async_trait]
impl<P: InsiderProvider + Send + Sync> SentimentSource for InsiderSource<P> {
    fn name(&self) -> &'static str {
        "insider"
    }

    async fn score(&self, ticker: &str, _item: &NewsItem, _ctx: &Context) -> Result<Decimal, ClassifyError> {
        match self.provider.net_value(ticker).await? {
            Some(net) if net != Decimal::ZERO => {
                let signed = if net > Decimal::ZERO { dec!(1) } else { dec!(-1) };
                Ok(signed * (net.abs() / (net.abs() + dec!(1_000_000))).clamp(dec!(0), dec!(1)))
            }
            _ => Err(ClassifyError::Abstain("insider: no recent filings".to_string())),
        }
    }
}
