use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use catalyst_cache::{AppendLog, FundamentalsCache, MemoryCache, OutcomesStore};
use catalyst_classify::enrichment::{divergence, rvol};
use catalyst_classify::sentiment::llm::LlmBatchDriver;
use catalyst_classify::sentiment::sources::{
    default_confidence, detect_earnings_result, short_interest_amplified_delta, AftermarketActionSource,
    GoogleTrendsSource, InsiderSource, MlSource, NewsVelocitySource, PremarketActionSource, SentimentSource,
    ShortInterestProvider, VaderSource,
};
use catalyst_classify::sentiment::aggregate;
use catalyst_classify::{
    classify, enrich, try_score, ClassifierInputs, DynamicSourceScorer, MarketConditionsProvider,
    MarketRegimeClassifier, RegimeReading, TickerProfiler,
};
use catalyst_models::{Context, NewsItem, ScoredItem};
use catalyst_moa::{AcceptedItem, RejectedItem};
use catalyst_trading::{Broker, MarketDataProvider, MarketSession, OrderExecutor, PositionManager};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::{Mutex, Semaphore};

use crate::error::CatalystError;
use crate::providers::{
    default_weight, MarketBarsAdapter, NoopFloatMultiplierProvider, NoopLlm, NoopMarketConditionsProvider,
    NoopShortInterestProvider,
};

const MAX_CONCURRENT_ENRICHMENTS: usize = 3;
const LLM_MAX_RETRIES: u32 = 2;

/// Owns every stateful dependency the classify -> enrich -> signal -> execute
/// chain needs and runs a single [`NewsItem`] through it end to end.
pub struct Pipeline {
    ctx: Context,
    sentiment_sources: Vec<Box<dyn SentimentSource>>,
    dynamic_scorer: Option<DynamicSourceScorer>,
    ticker_profiler: Option<TickerProfiler>,
    fundamentals: Option<FundamentalsCache>,
    regime_cache: MemoryCache,
    market_data: Arc<dyn MarketDataProvider>,
    broker: Arc<dyn Broker>,
    position_manager: PositionManager,
    rejected_log: AppendLog,
    accepted_log: AppendLog,
    executed_orders_log: AppendLog,
    outcomes_store: OutcomesStore,
    feedback_multiplier: Mutex<HashMap<String, Decimal>>,
    open_tickers: Mutex<HashSet<String>>,
    enrichment_gate: Semaphore,
}

impl Pipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ctx: Context,
        dynamic_scorer: Option<DynamicSourceScorer>,
        ticker_profiler: Option<TickerProfiler>,
        fundamentals: Option<FundamentalsCache>,
        regime_cache: MemoryCache,
        market_data: Arc<dyn MarketDataProvider>,
        broker: Arc<dyn Broker>,
        position_manager: PositionManager,
        rejected_log: AppendLog,
        accepted_log: AppendLog,
        executed_orders_log: AppendLog,
        outcomes_store: OutcomesStore,
        feedback_multiplier: HashMap<String, Decimal>,
    ) -> Self {
        let sentiment_sources: Vec<Box<dyn SentimentSource>> = vec![
            Box::new(VaderSource),
            Box::new(MlSource),
            Box::new(NewsVelocitySource),
            Box::new(GoogleTrendsSource {
                provider: crate::providers::NoopTrendsProvider,
            }),
            Box::new(InsiderSource {
                provider: crate::providers::NoopInsiderProvider,
            }),
            Box::new(PremarketActionSource {
                provider: crate::providers::NoopPriceActionProvider,
            }),
            Box::new(AftermarketActionSource {
                provider: crate::providers::NoopPriceActionProvider,
            }),
        ];

        Self {
            ctx,
            sentiment_sources,
            dynamic_scorer,
            ticker_profiler,
            fundamentals,
            regime_cache,
            market_data,
            broker,
            position_manager,
            rejected_log,
            accepted_log,
            executed_orders_log,
            outcomes_store,
            feedback_multiplier: Mutex::new(feedback_multiplier),
            open_tickers: Mutex::new(HashSet::new()),
            enrichment_gate: Semaphore::new(MAX_CONCURRENT_ENRICHMENTS),
        }
    }

    pub fn ctx(&self) -> &Context {
        &self.ctx
    }

    pub fn market_data(&self) -> &Arc<dyn MarketDataProvider> {
        &self.market_data
    }

    pub fn broker(&self) -> &Arc<dyn Broker> {
        &self.broker
    }

    pub fn rejected_log(&self) -> &AppendLog {
        &self.rejected_log
    }

    pub fn accepted_log(&self) -> &AppendLog {
        &self.accepted_log
    }

    pub fn outcomes_store(&self) -> &OutcomesStore {
        &self.outcomes_store
    }

    pub async fn replace_feedback_multiplier(&self, weights: HashMap<String, Decimal>) {
        *self.feedback_multiplier.lock().await = weights;
    }

    fn all_known_weights(&self) -> HashMap<String, Decimal> {
        let mut weights: HashMap<String, Decimal> = self
            .ctx
            .config
            .sentiment
            .weights
            .iter()
            .filter_map(|(name, w)| Decimal::try_from(*w).ok().map(|d| (name.clone(), d)))
            .collect();
        for name in [
            "vader",
            "news_velocity",
            "google_trends",
            "insider",
            "premarket_action",
            "aftermarket_action",
            "ml",
            "llm",
            "short_interest",
            "divergence",
            "earnings",
        ] {
            weights.entry(name.to_string()).or_insert_with(|| default_weight(name));
        }
        weights
    }

    /// Runs one `NewsItem` through the full fast-path/slow-path classification,
    /// then either accepts (logs + places an order) or rejects it.
    pub async fn process(&self, item: NewsItem) -> Result<(), CatalystError> {
        let all_known_weights = self.all_known_weights();

        let mut contributions = Vec::new();
        if let Some(ticker) = item.ticker.as_deref() {
            for source in &self.sentiment_sources {
                let weight = *all_known_weights
                    .get(source.name())
                    .unwrap_or(&default_weight(source.name()));
                if let Some(contribution) = try_score(source.as_ref(), ticker, &item, &self.ctx, weight).await {
                    contributions.push(contribution);
                }
            }

            // `short_interest`, `divergence`, and `llm` all need a read on the
            // sentiment gathered so far (as a base to amplify, to rescale
            // against, or to prescale-gate on) rather than fitting the plain
            // `SentimentSource::score(ticker, item, ctx)` seam, so they're
            // computed here instead of living in `sentiment_sources`.
            let base_sentiment = if contributions.is_empty() {
                Decimal::ZERO
            } else {
                aggregate(&contributions, &all_known_weights, None).sentiment
            };

            let adapter = MarketBarsAdapter {
                provider: self.market_data.as_ref(),
            };

            if self.ctx.config.features.short_interest_boost {
                let weight = *all_known_weights
                    .get("short_interest")
                    .unwrap_or(&default_weight("short_interest"));
                if let Ok(Some(pct)) = NoopShortInterestProvider.short_interest_pct(ticker).await {
                    let delta = short_interest_amplified_delta(pct, base_sentiment);
                    if delta != Decimal::ZERO {
                        contributions.push((
                            "short_interest".to_string(),
                            (base_sentiment + delta).clamp(dec!(-1), dec!(1)),
                            weight,
                            default_confidence("short_interest"),
                        ));
                    }
                }
            }

            if self.ctx.config.features.volume_price_divergence {
                let weight = *all_known_weights
                    .get("divergence")
                    .unwrap_or(&default_weight("divergence"));
                if let Ok(reading) = rvol::compute(&adapter, ticker).await {
                    if let Ok(div_reading) = divergence::compute(&adapter, ticker, reading.rvol).await {
                        let score = (div_reading.adjustment / dec!(0.15)).clamp(dec!(-1), dec!(1));
                        contributions.push(("divergence".to_string(), score, weight, default_confidence("divergence")));
                    }
                }
            }

            if self.ctx.config.features.llm_classifier {
                let weight = *all_known_weights.get("llm").unwrap_or(&default_weight("llm"));
                let min_prescale_score = Decimal::try_from(self.ctx.config.sentiment.llm_min_prescale_score).unwrap_or(dec!(0.2));
                let driver = LlmBatchDriver::new(
                    &NoopLlm,
                    min_prescale_score,
                    self.ctx.config.sentiment.batch_size as usize,
                    std::time::Duration::from_secs(self.ctx.config.sentiment.llm_batch_delay_secs),
                    std::time::Duration::from_secs(self.ctx.config.llm.timeout_secs),
                    LLM_MAX_RETRIES,
                );
                for (_, result) in driver.score_batch(&[(item.clone(), base_sentiment)]).await {
                    if let Ok(score) = result {
                        contributions.push(("llm".to_string(), score, weight, default_confidence("llm")));
                    }
                }
            }
        }

        let sector = item
            .raw
            .get("sector")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());

        let regime: Option<RegimeReading> = if self.ctx.config.features.market_regime {
            let classifier = MarketRegimeClassifier::new(&self.regime_cache);
            Some(classifier.classify(&NoopMarketConditionsProvider as &dyn MarketConditionsProvider, None).await)
        } else {
            None
        };

        let vix = NoopMarketConditionsProvider.vix().await.ok();
        let earnings_result = detect_earnings_result(&item);

        let inputs = ClassifierInputs {
            ctx: &self.ctx,
            sentiment_contributions: contributions,
            all_known_weights,
            vix,
            earnings_result,
            dynamic_scorer: self.dynamic_scorer.as_ref(),
            ticker_profiler: self.ticker_profiler.as_ref(),
            sector: sector.as_deref(),
            fundamentals: self.fundamentals.as_ref(),
            regime,
            dynamic_keyword_weights: HashMap::new(),
            source_weight_overrides: HashMap::new(),
        };

        let mut scored = classify(&item, inputs);

        if item.ticker.is_some() {
            let _permit = self
                .enrichment_gate
                .acquire()
                .await
                .expect("enrichment semaphore never closes");
            let adapter = MarketBarsAdapter {
                provider: self.market_data.as_ref(),
            };
            enrich(
                &mut scored,
                &adapter,
                &NoopFloatMultiplierProvider,
                &adapter,
                &adapter,
                self.ctx.clock.now_utc(),
            )
            .await;
        }

        let Some(ticker) = scored.ticker.clone() else {
            return Ok(());
        };

        let entry_price = match self.market_data.get_last_price_snapshot(&ticker).await? {
            Some(snapshot) => snapshot.last,
            None => {
                self.log_rejection(&scored, &item, Decimal::ZERO, "no_price_snapshot")?;
                return Ok(());
            }
        };

        let feedback_multiplier = self.feedback_multiplier.lock().await.clone();
        let signal = catalyst_trading::generate_signal(
            &scored,
            entry_price,
            &self.ctx.config,
            &feedback_multiplier,
            self.ctx.clock.now_utc(),
        );

        match signal {
            Some(signal) => {
                self.accepted_log.append(&AcceptedItem {
                    ts: item.ts_utc,
                    ticker: ticker.clone(),
                    title: item.title.clone(),
                })?;

                let account = self.broker.get_account().await?;
                let market_open = self.broker.is_market_open().await.unwrap_or(true);
                let session = if !market_open && self.ctx.config.signal.extended_hours {
                    MarketSession::Extended
                } else {
                    MarketSession::Regular
                };

                let executor = OrderExecutor::new(self.broker.as_ref(), &self.position_manager, &self.executed_orders_log);
                executor.execute(&signal, account.equity, session).await?;
                self.open_tickers.lock().await.insert(ticker);
            }
            None => {
                let reason = rejection_reason(&scored, &self.ctx.config);
                self.log_rejection(&scored, &item, entry_price, reason)?;
            }
        }

        Ok(())
    }

    fn log_rejection(
        &self,
        scored: &ScoredItem,
        item: &NewsItem,
        price: Decimal,
        reason: &str,
    ) -> Result<(), CatalystError> {
        self.rejected_log.append(&RejectedItem {
            ts: item.ts_utc,
            ticker: item.ticker.clone().unwrap_or_default(),
            price,
            rejection_reason: reason.to_string(),
            title: item.title.clone(),
            keywords: scored.tags.clone(),
        })?;
        Ok(())
    }

    /// Refreshes open-position prices and closes out any that crossed a stop,
    /// target, or max-hold boundary. Called on the daemon's scheduler tick.
    pub async fn monitor_positions(&self) -> Result<usize, CatalystError> {
        let tickers: Vec<String> = self.open_tickers.lock().await.iter().cloned().collect();
        let mut prices = HashMap::new();
        for ticker in &tickers {
            if let Some(snapshot) = self.market_data.get_last_price_snapshot(ticker).await? {
                prices.insert(ticker.clone(), snapshot.last);
            }
        }
        self.position_manager.update_position_prices(&prices).await?;

        let closed = self
            .position_manager
            .check_and_execute_exits(self.broker.as_ref(), self.ctx.config.scheduler.max_hold_hours)
            .await?;

        if !closed.is_empty() {
            let mut open_tickers = self.open_tickers.lock().await;
            for position in &closed {
                open_tickers.remove(&position.ticker);
            }
        }
        Ok(closed.len())
    }
}

fn rejection_reason(scored: &ScoredItem, config: &catalyst_models::CatalystConfig) -> &'static str {
    if !scored.negative_keywords.is_empty() {
        return "negative_keyword_veto";
    }
    if scored.tags.is_empty() {
        return "no_catalyst_keyword";
    }
    let min_score = Decimal::try_from(config.signal.min_score).unwrap_or(Decimal::ONE);
    if scored.total_score < min_score {
        return "below_score_threshold";
    }
    "below_confidence_or_risk_reward_threshold"
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalyst_models::CatalystConfig;
    use rust_decimal_macros::dec;

    fn scored() -> ScoredItem {
        ScoredItem::new("item-1", Some("POET".to_string()))
    }

    #[test]
    fn negative_keyword_veto_takes_priority() {
        let mut item = scored();
        item.negative_keywords.push("dilution".to_string());
        item.tags.push("offering".to_string());
        item.total_score = dec!(10);
        assert_eq!(rejection_reason(&item, &CatalystConfig::default()), "negative_keyword_veto");
    }

    #[test]
    fn no_tags_means_no_catalyst_keyword() {
        let item = scored();
        assert_eq!(rejection_reason(&item, &CatalystConfig::default()), "no_catalyst_keyword");
    }

    #[test]
    fn below_configured_min_score_is_reported() {
        let mut item = scored();
        item.tags.push("fda_approval".to_string());
        item.total_score = Decimal::ZERO;
        let config = CatalystConfig::default();
        assert_eq!(rejection_reason(&item, &config), "below_score_threshold");
    }

    #[test]
    fn otherwise_falls_back_to_confidence_or_risk_reward() {
        let mut item = scored();
        item.tags.push("fda_approval".to_string());
        item.total_score = dec!(1000);
        assert_eq!(
            rejection_reason(&item, &CatalystConfig::default()),
            "below_confidence_or_risk_reward_threshold"
        );
    }
}
