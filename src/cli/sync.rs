use super::ui;
use crate::core::config::{AppConfig, ProviderConfig};
use crate::core::price::PriceSource;
use crate::core::repository::Store;
use crate::providers::CoinGeckoProvider;
use crate::sync::{Scheduler, SyncConfig};
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

pub fn build_source(config: &ProviderConfig) -> Result<Arc<dyn PriceSource>> {
    if config.api_key.is_none() {
        warn!("No provider API key configured; requests may be rate limited");
    }
    let provider = CoinGeckoProvider::new(&config.base_url, config.api_key.clone(), config.timeout())
        .context("Failed to create price provider")?;
    Ok(Arc::new(provider))
}

fn build_scheduler(
    config: &AppConfig,
    store: Arc<dyn Store>,
    shutdown: CancellationToken,
) -> Result<Scheduler> {
    let source = build_source(&config.provider)?;
    Ok(Scheduler::new(
        source,
        store,
        SyncConfig::from(&config.sync),
        shutdown,
    ))
}

/// Runs the scheduler until `shutdown` is cancelled.
pub async fn run(config: &AppConfig, store: Arc<dyn Store>, shutdown: CancellationToken) -> Result<()> {
    build_scheduler(config, store, shutdown)?.run().await;
    Ok(())
}

/// Runs a single cycle and prints its report.
pub async fn run_once(
    config: &AppConfig,
    store: Arc<dyn Store>,
    shutdown: CancellationToken,
) -> Result<()> {
    let scheduler = build_scheduler(config, store, shutdown)?;
    match scheduler.run_cycle().await {
        Ok(report) => {
            println!(
                "{} ({} skipped, {} missing, {} failed)",
                ui::style_text(&report.to_string(), ui::StyleType::Success),
                report.skipped,
                report.missing,
                report.failed
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", ui::style_text(&e.to_string(), ui::StyleType::Error));
            Err(e).context("Sync cycle failed")
        }
    }
}
