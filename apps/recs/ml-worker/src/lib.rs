//! Recommendation ML Worker
//!
//! Consumes task descriptors from the durable task queue, ranks candidate
//! items for the requesting user and posts the ranking to the result endpoint.
//!
//! ## Architecture
//!
//! ```text
//! JetStream work queue (ml_task_queue)
//!   ↓ (durable consumer: ml_task_queue_workers)
//! TaskQueueConsumer
//!   ↓ (candidates + user vector)
//! ScoringEngine (popularity fallback | pairwise | projected index search)
//!   ↓
//! HttpResultCallback → external task store
//! ```
//!
//! Run several instances against the same queue to scale out; the broker
//! hands each message to one of them.

pub mod admin;
pub mod config;

use config::MlWorkerConfig;
use core_config::{Environment, FromEnv};
use domain_recommendations::{
    CatalogSnapshot, HttpResultCallback, InMemoryCatalog, LinearProjection, PairwiseScorer,
    RankingStrategy, RecommendationProcessor, ScoringEngine, StrategyKind, task_queue_consumer,
};
use eyre::{Result, WrapErr};
use messaging::WorkerConfig;
use nats_broker::NatsConnector;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};

/// Load model weights for the configured personalized strategy.
pub async fn build_engine(config: &MlWorkerConfig) -> Result<ScoringEngine> {
    let strategy = match config.strategy {
        StrategyKind::Pairwise => {
            let scorer = match &config.scorer_model_path {
                Some(path) => PairwiseScorer::load(path)
                    .await
                    .wrap_err_with(|| format!("Failed to load scorer weights from {path}"))?,
                None => PairwiseScorer::default(),
            };
            info!(scale = scorer.scale(), "Pairwise scorer ready");
            RankingStrategy::PairwiseScorer(scorer)
        }
        StrategyKind::Index => {
            let path = config
                .projection_model_path
                .as_deref()
                .ok_or_else(|| eyre::eyre!("PROJECTION_MODEL_PATH is required for index search"))?;
            let projection = LinearProjection::load(path)
                .await
                .wrap_err_with(|| format!("Failed to load projection weights from {path}"))?;
            info!(
                in_dim = projection.in_dim(),
                out_dim = projection.out_dim(),
                "Projection ready"
            );
            RankingStrategy::ProjectedIndexSearch(projection)
        }
    };

    Ok(ScoringEngine::new(strategy))
}

/// Run the worker until SIGINT or SIGTERM.
///
/// # Errors
///
/// Returns an error if configuration, the catalog snapshot or the model
/// weights cannot be loaded. Broker outages are not errors; the consumer
/// keeps reconnecting.
pub async fn run() -> Result<()> {
    let environment = Environment::from_env();
    core_config::tracing::init_tracing(&environment);

    let config = MlWorkerConfig::from_env().wrap_err("Failed to load worker configuration")?;
    info!(
        queue = %config.broker.task_queue,
        strategy = %config.strategy,
        result_endpoint = %config.result_endpoint,
        "Starting recommendation worker"
    );

    if let Some(port) = config.metrics_port {
        let handle = admin::install_recorder()?;
        tokio::spawn(async move {
            if let Err(e) = admin::serve(handle, port).await {
                error!(error = %e, "Admin server failed");
            }
        });
    }

    let snapshot = CatalogSnapshot::load(&config.catalog_path)
        .await
        .wrap_err("Failed to load catalog snapshot")?;
    let catalog = Arc::new(InMemoryCatalog::from_snapshot(snapshot));
    let engine = Arc::new(build_engine(&config).await?);

    let processor = RecommendationProcessor::new(
        catalog.clone(),
        catalog,
        engine,
        Arc::new(HttpResultCallback::new(&config.result_endpoint)),
    );
    let consumer = task_queue_consumer(
        Arc::new(NatsConnector::new(config.broker.clone())),
        processor,
        WorkerConfig::new(&config.broker.task_queue)
            .with_reconnect_delay(config.broker.reconnect_delay),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    consumer.run(shutdown_rx).await;

    info!("Recommendation worker stopped");
    Ok(())
}

/// Wait for a shutdown signal (SIGINT or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        },
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        },
    }
}
