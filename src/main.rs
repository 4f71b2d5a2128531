use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use tickwatch::core::log::init_logging;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Keep asset prices in sync until interrupted
    Run,
    /// Refresh all active assets once and exit
    Sync,
    /// Manage tracked assets
    #[command(subcommand)]
    Asset(AssetCommands),
    /// Show recorded prices for an asset, newest first
    History {
        id: u64,
        /// Number of entries to show (at most 1000)
        #[arg(short, long)]
        limit: Option<usize>,
        /// Number of newest entries to skip
        #[arg(short, long, default_value_t = 0)]
        offset: usize,
    },
}

#[derive(Subcommand)]
enum AssetCommands {
    /// Start tracking a symbol
    Add {
        symbol: String,
        /// Lower alert threshold
        #[arg(long)]
        min: f64,
        /// Upper alert threshold
        #[arg(long)]
        max: f64,
        /// Owning user id
        #[arg(long, default_value_t = 1)]
        owner: u64,
    },
    /// List tracked assets
    List {
        /// Include assets that are no longer tracked
        #[arg(short, long)]
        all: bool,
    },
    /// Stop tracking an asset, keeping its history
    Remove { id: u64 },
    /// Resume tracking a removed asset
    Restore { id: u64 },
}

impl From<Commands> for tickwatch::AppCommand {
    fn from(cmd: Commands) -> tickwatch::AppCommand {
        match cmd {
            Commands::Run => tickwatch::AppCommand::Run,
            Commands::Sync => tickwatch::AppCommand::SyncOnce,
            Commands::Asset(AssetCommands::Add {
                symbol,
                min,
                max,
                owner,
            }) => tickwatch::AppCommand::AddAsset {
                symbol,
                min_price: min,
                max_price: max,
                owner,
            },
            Commands::Asset(AssetCommands::List { all }) => tickwatch::AppCommand::ListAssets { all },
            Commands::Asset(AssetCommands::Remove { id }) => tickwatch::AppCommand::RemoveAsset { id },
            Commands::Asset(AssetCommands::Restore { id }) => {
                tickwatch::AppCommand::RestoreAsset { id }
            }
            Commands::History { id, limit, offset } => {
                tickwatch::AppCommand::History { id, limit, offset }
            }
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown requested");
            signal_token.cancel();
        }
    });

    let result = match cli.command {
        Some(Commands::Setup) => tickwatch::cli::setup::setup(),
        Some(cmd) => {
            tickwatch::run_command(cmd.into(), cli.config_path.as_deref(), shutdown).await
        }
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use tickwatch::AppCommand;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("tickwatch").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_sync_runs_one_cycle_and_run_loops() {
        let sync: AppCommand = parse(&["sync"]).command.unwrap().into();
        assert!(matches!(sync, AppCommand::SyncOnce));

        let run: AppCommand = parse(&["run"]).command.unwrap().into();
        assert!(matches!(run, AppCommand::Run));

        assert!(parse(&[]).command.is_none());
    }

    #[test]
    fn test_asset_and_history_arguments() {
        let cli = parse(&["-v", "asset", "add", "btc", "--min", "1.5", "--max", "9"]);
        assert!(cli.verbose);
        let add: AppCommand = cli.command.unwrap().into();
        assert!(matches!(
            add,
            AppCommand::AddAsset { ref symbol, min_price, max_price, owner: 1 }
                if symbol == "btc" && min_price == 1.5 && max_price == 9.0
        ));

        let history: AppCommand = parse(&["history", "3", "--limit", "20"])
            .command
            .unwrap()
            .into();
        assert!(matches!(
            history,
            AppCommand::History { id: 3, limit: Some(20), offset: 0 }
        ));
    }
}
