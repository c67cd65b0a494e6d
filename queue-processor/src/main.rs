use anyhow::Result;
use calsync_processor::{Cli, GoogleCalendar, JobLog, Processor, RedisStore, Store, Sweeper};
use clap::Parser;
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install crypto provider"))?;

    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "calsync=info,calsync_processor=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = cli.processor_config()?;

    let store: Arc<dyn Store> = Arc::new(RedisStore::connect(&cli.redis_url()).await?);
    tracing::info!("Connected to Redis at {}", cli.redis_addr);

    let calendar = Arc::new(GoogleCalendar::from_key_file(&cli.key_file).await?);

    let (log, log_handle) = JobLog::spawn();
    let processor = Processor::new(Arc::clone(&store), calendar, log, config.clone());
    let sweeper = Sweeper::new(store, processor.status_keys().clone(), &config);

    let processor_handle = tokio::spawn(async move { processor.run().await });
    let sweeper_handle = tokio::spawn(async move { sweeper.run().await });

    tracing::info!("calsync is monitoring... Press Ctrl+C to stop.");
    signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received, stopping...");

    processor_handle.abort();
    sweeper_handle.abort();
    log_handle.abort();

    tracing::info!("calsync stopped");
    Ok(())
}
