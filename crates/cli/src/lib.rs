pub mod commands;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use chanprice_core::config::{AppConfig, LoadOptions, LogFormat};
use clap::{Parser, Subcommand};
use tracing::Level;

use crate::commands::apply_tier::ApplyTierArgs;
use crate::commands::revert::RevertArgs;
use crate::commands::DataPaths;

#[derive(Debug, Parser)]
#[command(
    name = "chanprice",
    about = "Channel pricing and discount cascade operator CLI",
    long_about = "Recompute channel prices, apply discount tiers, revert to snapshots, and inspect \
                  channel and configuration state. Every command prints a JSON result.",
    after_help = "Examples:\n  chanprice price\n  chanprice apply-tier --slot coupon1 --tier \
                  tier.json --ids sku-1,sku-2\n  chanprice channels"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, clap::Args)]
struct PathArgs {
    #[arg(long, help = "Session document (defaults to data.session_path)")]
    session: Option<PathBuf>,
    #[arg(long, help = "Channel directory (defaults to data.channels_path)")]
    channels: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Recompute every derived field of the session and print the results")]
    Price {
        #[command(flatten)]
        paths: PathArgs,
    },
    #[command(about = "Snapshot the selected products, then apply a discount tier to them")]
    ApplyTier {
        #[arg(long, help = "Tier slot: immediate|coupon1|coupon2|coupon3")]
        slot: String,
        #[arg(long, help = "Discount tier configuration (JSON)")]
        tier: PathBuf,
        #[arg(long, help = "Comma-separated product ids")]
        ids: String,
        #[arg(long, help = "Directory snapshots are written to (defaults to data.snapshot_dir)")]
        snapshot_dir: Option<PathBuf>,
        #[command(flatten)]
        paths: PathArgs,
    },
    #[command(about = "Restore the selected products from a snapshot")]
    Revert {
        #[arg(long, help = "Snapshot file written by apply-tier")]
        snapshot: PathBuf,
        #[arg(long, help = "Comma-separated product ids")]
        ids: String,
        #[command(flatten)]
        paths: PathArgs,
    },
    #[command(about = "Validate every channel in the channel directory")]
    Channels {
        #[arg(long, help = "Channel directory (defaults to data.channels_path)")]
        channels: Option<PathBuf>,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
}

impl PathArgs {
    fn into_data_paths(self) -> DataPaths {
        DataPaths { session: self.session, channels: self.channels, snapshot_dir: None }
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    // Logging falls back to defaults here; the command reports a broken config itself.
    let config = AppConfig::load(LoadOptions::default()).unwrap_or_default();
    if let Err(error) = init_logging(&config) {
        eprintln!("{error:#}");
    }

    let result = match cli.command {
        Command::Price { paths } => commands::price::run(paths.into_data_paths()),
        Command::ApplyTier { slot, tier, ids, snapshot_dir, paths } => {
            let paths = DataPaths { snapshot_dir, ..paths.into_data_paths() };
            commands::apply_tier::run(ApplyTierArgs { slot, tier, ids, paths })
        }
        Command::Revert { snapshot, ids, paths } => {
            commands::revert::run(RevertArgs { snapshot, ids, paths: paths.into_data_paths() })
        }
        Command::Channels { channels } => {
            commands::channels::run(DataPaths { channels, ..DataPaths::default() })
        }
        Command::Config => commands::config::run(),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Logs go to stderr; stdout carries the JSON result only.
fn init_logging(config: &AppConfig) -> anyhow::Result<()> {
    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(io::stderr);

    let installed = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|error| anyhow::anyhow!("could not install log subscriber: {error}"))
}
