use std::sync::Arc;
use std::time::Duration;

use catalyst_models::NewsItem;
use catalyst_moa::{
    default_analysis_state_path, default_recommendations_path, save_analysis_state,
    save_recommendations, AnalysisState, MoaRunOutcome, RecommendationsDoc,
};
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tokio::sync::{mpsc, Mutex as TokioMutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::error::CatalystError;
use crate::pipeline::Pipeline;

/// How often the background Missed-Opportunities Analyzer sweep runs. A run
/// scans `config.moa.since_days` of history every time, so there is little
/// value running it more often than this.
const MOA_SWEEP_INTERVAL: Duration = Duration::from_secs(6 * 60 * 60);

/// Orchestrates the classifier worker pool, the position-exit monitor, and
/// the periodic MOA sweep, mirroring the loader daemon's `JoinSet` +
/// `CancellationToken` shutdown pattern.
pub struct Daemon {
    pipeline: Arc<Pipeline>,
    cancel: CancellationToken,
}

impl Daemon {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self {
            pipeline,
            cancel: CancellationToken::new(),
        }
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Runs until cancelled. `item_rx` feeds `worker_count` classifier
    /// workers that share the single receiver (`mpsc::Receiver` isn't
    /// cloneable) behind an async mutex.
    pub async fn run(&self, item_rx: mpsc::Receiver<NewsItem>, worker_count: usize) -> Result<(), CatalystError> {
        tracing::info!(worker_count, "catalyst daemon starting");

        let mut join_set = JoinSet::new();
        let shared_rx = Arc::new(TokioMutex::new(item_rx));

        for worker_id in 0..worker_count {
            let pipeline = self.pipeline.clone();
            let rx = shared_rx.clone();
            let cancel = self.cancel.clone();
            join_set.spawn(async move {
                classify_worker_loop(pipeline, rx, cancel, worker_id).await;
            });
        }

        {
            let pipeline = self.pipeline.clone();
            let cancel = self.cancel.clone();
            join_set.spawn(async move {
                position_monitor_loop(pipeline, cancel).await;
            });
        }

        {
            let pipeline = self.pipeline.clone();
            let cancel = self.cancel.clone();
            join_set.spawn(async move {
                moa_loop(pipeline, cancel).await;
            });
        }

        tracing::info!("all catalyst daemon tasks started");
        while join_set.join_next().await.is_some() {}
        tracing::info!("catalyst daemon stopped");
        Ok(())
    }
}

async fn classify_worker_loop(
    pipeline: Arc<Pipeline>,
    rx: Arc<TokioMutex<mpsc::Receiver<NewsItem>>>,
    cancel: CancellationToken,
    worker_id: usize,
) {
    loop {
        let item = {
            let mut rx = rx.lock().await;
            tokio::select! {
                _ = cancel.cancelled() => None,
                item = rx.recv() => item,
            }
        };
        let Some(item) = item else {
            break;
        };
        if let Err(e) = pipeline.process(item).await {
            tracing::error!(worker_id, error = %e, "item processing failed");
        }
    }
    tracing::info!(worker_id, "classifier worker shutting down");
}

async fn monitor_interval(pipeline: &Pipeline) -> Duration {
    let scheduler = &pipeline.ctx().config.scheduler;
    let open = pipeline.broker().is_market_open().await.unwrap_or(false);
    let secs = if open {
        scheduler.market_open_cycle_secs
    } else if pipeline.ctx().config.signal.extended_hours {
        scheduler.extended_hours_cycle_secs
    } else {
        scheduler.market_closed_cycle_secs
    };
    Duration::from_secs(secs)
}

async fn position_monitor_loop(pipeline: Arc<Pipeline>, cancel: CancellationToken) {
    loop {
        let interval = monitor_interval(&pipeline).await;
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("position monitor loop shutting down");
                break;
            }
            _ = tokio::time::sleep(interval) => {
                match pipeline.monitor_positions().await {
                    Ok(0) => {}
                    Ok(closed) => tracing::info!(closed, "positions closed on exit check"),
                    Err(e) => tracing::error!(error = %e, "position monitor tick failed"),
                }
            }
        }
    }
}

async fn moa_loop(pipeline: Arc<Pipeline>, cancel: CancellationToken) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("MOA sweep loop shutting down");
                break;
            }
            _ = tokio::time::sleep(MOA_SWEEP_INTERVAL) => {
                match run_moa_once(&pipeline).await {
                    Ok(outcome) => tracing::info!(
                        rows_considered = outcome.rows_considered,
                        missed_opportunities = outcome.missed_opportunities,
                        recommendations = outcome.recommendations.len(),
                        "MOA sweep complete"
                    ),
                    Err(e) => tracing::error!(error = %e, "MOA sweep failed"),
                }
            }
        }
    }
}

/// Runs one MOA sweep and persists its recommendations/state files under
/// `config.data_dir/moa/`, independent of the periodic loop above so a CLI
/// one-shot invocation can call it directly.
pub async fn run_moa_once(pipeline: &Pipeline) -> Result<MoaRunOutcome, CatalystError> {
    let config = &pipeline.ctx().config;
    let current_weights: HashMap<String, Decimal> = config
        .sentiment
        .weights
        .iter()
        .filter_map(|(name, w)| Decimal::try_from(*w).ok().map(|d| (name.clone(), d)))
        .collect();

    let outcome = catalyst_moa::run_analysis(
        pipeline.rejected_log(),
        pipeline.accepted_log(),
        pipeline.outcomes_store(),
        pipeline.market_data().as_ref(),
        &current_weights,
        config.moa.since_days,
        true,
        Utc::now(),
    )
    .await?;

    let doc = RecommendationsDoc {
        generated_at: Utc::now(),
        recommendations: outcome.recommendations.clone(),
    };
    save_recommendations(default_recommendations_path(&config.data_dir), &doc)?;

    let state = AnalysisState {
        last_run_at: Utc::now(),
        since_days: config.moa.since_days,
        rows_considered: outcome.rows_considered,
        missed_opportunities: outcome.missed_opportunities,
        recommendations_emitted: outcome.recommendations.len(),
    };
    save_analysis_state(default_analysis_state_path(&config.data_dir), &state)?;

    Ok(outcome)
}
