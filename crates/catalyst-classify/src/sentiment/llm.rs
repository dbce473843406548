use async_trait::async_trait;
use catalyst_models::NewsItem;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::time::Duration;

use crate::error::ClassifyError;

/// `query(prompt, system?, timeout, max_retries) -> string | null` from
/// spec.md §6. Implementations must surface timeouts as a typed error so the
/// sentiment source abstains rather than returning a fabricated zero.
#[async_trait]
pub trait Llm: Send + Sync {
    async fn query(
        &self,
        prompt: &str,
        system: Option<&str>,
        timeout: Duration,
        max_retries: u32,
    ) -> Result<Option<String>, ClassifyError>;
}

pub fn sentiment_system_prompt() -> &'static str {
    "You are a financial news sentiment analyst. Given a headline and summary, \
     respond with a single JSON object: {\"sentiment\": <float -1.0 to 1.0>, \
     \"confidence\": <float 0.0 to 1.0>}. Sentiment is the likely near-term price \
     impact of the news on the mentioned ticker: positive for catalysts (approvals, \
     contracts, beats), negative for dilutive or distress events (offerings, \
     bankruptcy, recalls), near zero for routine or ambiguous items."
}

pub fn build_sentiment_prompt(item: &NewsItem) -> String {
    match &item.summary {
        Some(summary) => format!("Headline: {}\nSummary: {}", item.title, summary),
        None => format!("Headline: {}", item.title),
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
struct LlmSentimentResponse {
    sentiment: f64,
    confidence: f64,
}

/// Pre-filters items by a fast keyword+lexicon score before spending LLM
/// budget, batches requests, and warms the model with a one-shot probe
/// before the first batch (spec.md §6).
pub struct LlmBatchDriver<'a, L: Llm> {
    pub llm: &'a L,
    pub min_prescale_score: Decimal,
    pub batch_size: usize,
    pub batch_delay: Duration,
    pub timeout: Duration,
    pub max_retries: u32,
    warmed_up: std::sync::atomic::AtomicBool,
}

impl<'a, L: Llm> LlmBatchDriver<'a, L> {
    pub fn new(llm: &'a L, min_prescale_score: Decimal, batch_size: usize, batch_delay: Duration, timeout: Duration, max_retries: u32) -> Self {
        Self {
            llm,
            min_prescale_score,
            batch_size,
            batch_delay,
            timeout,
            max_retries,
            warmed_up: std::sync::atomic::AtomicBool::new(false),
        }
    }

    async fn warm_up(&self) -> Result<(), ClassifyError> {
        if self.warmed_up.swap(true, std::sync::atomic::Ordering::SeqCst) {
            return Ok(());
        }
        self.llm.query("OK", None, self.timeout, 0).await?;
        Ok(())
    }

    /// Items paired with their fast prescale score. Returns one sentiment
    /// result per item that cleared the prescale gate, in batches of
    /// `batch_size` separated by `batch_delay`.
    pub async fn score_batch(&self, items: &[(NewsItem, Decimal)]) -> Vec<(String, Result<Decimal, ClassifyError>)> {
        let eligible: Vec<&(NewsItem, Decimal)> = items
            .iter()
            .filter(|(_, prescale)| *prescale >= self.min_prescale_score)
            .collect();

        if eligible.is_empty() {
            return Vec::new();
        }

        if self.warm_up().await.is_err() {
            return eligible
                .iter()
                .map(|(item, _)| (item.id.clone(), Err(ClassifyError::Abstain("llm: warmup failed".to_string()))))
                .collect();
        }

        let mut results = Vec::with_capacity(eligible.len());
        for (batch_idx, chunk) in eligible.chunks(self.batch_size).enumerate() {
            if batch_idx > 0 {
                tokio::time::sleep(self.batch_delay).await;
            }
            for (item, _) in chunk {
                let prompt = build_sentiment_prompt(item);
                let outcome = match tokio::time::timeout(
                    self.timeout,
                    self.llm.query(&prompt, Some(sentiment_system_prompt()), self.timeout, self.max_retries),
                )
                .await
                {
                    Ok(Ok(Some(raw))) => parse_sentiment_response(&raw),
                    Ok(Ok(None)) => Err(ClassifyError::Abstain("llm: empty response".to_string())),
                    Ok(Err(e)) => Err(e),
                    Err(_) => Err(ClassifyError::Timeout(self.timeout.as_secs())),
                };
                results.push((item.id.clone(), outcome));
            }
        }
        results
    }
}

fn parse_sentiment_response(raw: &str) -> Result<Decimal, ClassifyError> {
    let parsed: LlmSentimentResponse =
        serde_json::from_str(raw).map_err(|e| ClassifyError::Parse(format!("llm response: {e}")))?;
    Decimal::try_from(parsed.sentiment)
        .map(|d| d.clamp(dec!(-1), dec!(1)))
        .map_err(|e| ClassifyError::Parse(format!("llm sentiment not finite: {e}")))
}
