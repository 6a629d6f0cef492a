mod config;
mod sweep;

use std::sync::Arc;

use tracing::info;

use pictalk_core::{FsBlobStore, PictoManager};
use pictalk_db::Database;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pictalk=debug,pictalk_core=debug,pictalk_db=info".into()),
        )
        .init();

    let config = Config::from_env()?;

    // Init stores
    let db = Arc::new(Database::open(&config.db_path)?);
    let blobs = Arc::new(FsBlobStore::new(config.blob_dir.clone(), &config.bucket).await?);
    let manager = Arc::new(PictoManager::new(db.clone(), blobs, config.bucket.clone()));

    info!(
        "Pictalk store ready (db {}, bucket {}/{})",
        config.db_path.display(),
        config.blob_dir.display(),
        config.bucket
    );
    info!("Orphan sweep every {:?}", config.sweep_interval);

    let sweeper = tokio::spawn(sweep::run_sweep_loop(
        db,
        manager.clone(),
        config.sweep_interval,
    ));

    shutdown_signal().await;
    sweeper.abort();

    // Removals already dispatched still get to finish
    manager.flush_blob_removals().await;
    info!("Blob removals flushed, exiting");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
