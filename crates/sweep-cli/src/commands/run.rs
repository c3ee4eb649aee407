use anyhow::Context;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use sweep_db::Database;
use sweep_lookup::HttpLookupClient;
use sweep_pipeline::{token_queue, Coordinator, PipelineError, RunOutcome, TokenSource};
use tokio_util::sync::CancellationToken;

use crate::signals;

/// Run the sweep until the range is exhausted, tokens run out, or an
/// interrupt arrives.
pub async fn execute(config_path: Option<&Path>) -> anyhow::Result<ExitCode> {
    let config = super::load_config(config_path)?;
    let source = TokenSource::open(&config.tokens).await?;

    let db_path = config.database_path()?;
    let db = Database::open(&db_path)
        .await
        .with_context(|| format!("failed to open database at {}", db_path.display()))?;
    db.initialize().await.context("failed to initialize database")?;

    let client = Arc::new(
        HttpLookupClient::new(&config.lookup, &config.output)
            .context("failed to build lookup client")?,
    );
    let mut coordinator = Coordinator::from_config(db, &config, client.clone(), client).await?;

    let cancel = CancellationToken::new();
    signals::spawn_shutdown_listener(cancel.clone());

    let (tx, mut rx) = token_queue(config.tokens.queue_capacity);
    let producer = tokio::spawn(source.run(tx, cancel.clone()));

    tracing::info!(
        range_end = config.range.end,
        source = ?config.tokens.source,
        "Sweep started"
    );
    let result = coordinator.run(&mut rx, &cancel).await;

    // Stop the transport, then release the store with all writes complete.
    cancel.cancel();
    drop(rx);
    tracing::info!("{}", coordinator.stats().snapshot());
    coordinator.close().await;

    match producer.await {
        Ok(Ok(count)) => tracing::debug!(count, "Token source stopped"),
        Ok(Err(e)) => tracing::warn!("Token source failed: {e}"),
        Err(e) => tracing::warn!("Token source task panicked: {e}"),
    }

    match result {
        Ok(outcome) => {
            match outcome {
                RunOutcome::Completed => tracing::info!("Sweep complete"),
                RunOutcome::Interrupted => tracing::info!("Sweep interrupted, progress saved"),
                RunOutcome::TokenSourceClosed => {
                    tracing::info!("Token source closed, progress saved");
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(PipelineError::Validation(reason)) => {
            tracing::error!("Validation failed, aborting: {reason}");
            Ok(ExitCode::FAILURE)
        }
        Err(e) => Err(e.into()),
    }
}
