pub mod cli;
pub mod core;
pub mod providers;
pub mod store;
pub mod sync;

use crate::core::config::AppConfig;
use crate::store::DiskStore;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub enum AppCommand {
    /// Keep prices in sync until shutdown
    Run,
    /// Run a single sync cycle
    SyncOnce,
    AddAsset {
        symbol: String,
        min_price: f64,
        max_price: f64,
        owner: u64,
    },
    ListAssets {
        all: bool,
    },
    RemoveAsset {
        id: u64,
    },
    RestoreAsset {
        id: u64,
    },
    History {
        id: u64,
        limit: Option<usize>,
        offset: usize,
    },
}

pub async fn run_command(
    command: AppCommand,
    config_path: Option<&str>,
    shutdown: CancellationToken,
) -> Result<()> {
    info!("tickwatch starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    let data_path = config.data_path()?;
    debug!(
        provider = %config.provider.base_url,
        data_path = %data_path.display(),
        "Loaded config"
    );

    let store = DiskStore::new(&data_path)
        .with_context(|| format!("Failed to open price store at {}", data_path.display()))?;

    match command {
        AppCommand::Run => cli::sync::run(&config, Arc::new(store), shutdown).await,
        AppCommand::SyncOnce => cli::sync::run_once(&config, Arc::new(store), shutdown).await,
        AppCommand::AddAsset {
            symbol,
            min_price,
            max_price,
            owner,
        } => cli::assets::add(&store, owner, &symbol, min_price, max_price).map(|_| ()),
        AppCommand::ListAssets { all } => cli::assets::list(&store, all),
        AppCommand::RemoveAsset { id } => cli::assets::set_active(&store, id, false).map(|_| ()),
        AppCommand::RestoreAsset { id } => cli::assets::set_active(&store, id, true).map(|_| ()),
        AppCommand::History { id, limit, offset } => cli::history::show(&store, id, limit, offset),
    }
}
