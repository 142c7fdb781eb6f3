use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use slippi_board::board::BoardRepository;
use slippi_board::commands::{CommandHandlers, RefreshOutcome};
use slippi_board::config::AppConfig;
use slippi_board::gateway::{DiscordGateway, MessagingGateway};
use slippi_board::parse_duration;
use slippi_board::provider::{SlippiProvider, StatsProvider};
use slippi_board::publish::Publisher;
use slippi_board::render::SvgRenderer;
use slippi_board::storage::SnapshotStore;
use slippi_board::sync::{RefreshScheduler, SyncEngine};

#[derive(Parser)]
#[command(name = "slippi-board")]
#[command(about = "Discord leaderboard bot for Slippi ranked Melee")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "./config.toml")]
    config: String,

    /// Snapshot file path (overrides config)
    #[arg(long)]
    data_file: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bot: auto-update the leaderboard until interrupted
    Run {
        /// Refresh interval (e.g., "60m", "6h"; bare numbers are minutes)
        #[arg(long)]
        interval: Option<String>,
    },

    /// Run a single refresh-and-publish pass and exit
    Refresh,

    /// Post the leaderboard once
    Show {
        /// Re-fetch stats from the Slippi API first
        #[arg(long)]
        refresh: bool,
    },

    /// Add a player by Slippi connect code (e.g., FRED#282)
    Add { code: String },

    /// Remove a player by connect code
    Remove { code: String },

    /// Set the channel leaderboard updates are posted in
    SetChannel { name: String },

    /// Clear the leaderboard (requires --confirm confirm)
    Reset {
        #[arg(long)]
        confirm: String,
    },

    /// Print roster size, target channel, and last refresh info
    Status,
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let path = PathBuf::from(&cli.config);
    let mut config = if path.exists() {
        AppConfig::from_file(&path)
            .with_context(|| format!("Failed to load config from {path:?}"))?
    } else {
        AppConfig::default()
    };

    if let Some(data_file) = &cli.data_file {
        config.data_file = data_file.clone();
    }

    Ok(config)
}

fn build_core(config: &AppConfig) -> Result<Arc<CommandHandlers>> {
    let store = SnapshotStore::new(config.data_file.clone());
    let repo = BoardRepository::load(store).context("Failed to load leaderboard data")?;

    let provider: Arc<dyn StatsProvider> =
        Arc::new(SlippiProvider::new(&config.slippi).context("Failed to create Slippi client")?);
    let gateway: Arc<dyn MessagingGateway> =
        Arc::new(DiscordGateway::new(&config.discord).context("Failed to create Discord client")?);

    let engine = SyncEngine::new(provider);
    let publisher = Publisher::new(gateway.clone(), Box::new(SvgRenderer::new()));

    Ok(Arc::new(CommandHandlers::new(
        repo, engine, publisher, gateway,
    )))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting slippi-board v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&cli)?;
    let core = build_core(&config)?;

    match cli.command {
        Commands::Run { interval } => {
            let tick = match interval {
                Some(s) => parse_duration(&s)
                    .with_context(|| format!("Invalid interval: {s:?}"))?,
                None => Duration::from_secs(config.refresh_interval_minutes * 60),
            };

            let scheduler = RefreshScheduler::new(tick);
            scheduler.start(core.clone());

            tokio::signal::ctrl_c()
                .await
                .context("Failed to listen for shutdown signal")?;
            tracing::info!("Shutting down");
            scheduler.stop().await;
        }

        Commands::Refresh => match core.refresh_and_publish().await? {
            RefreshOutcome::NoRoster => println!("Nothing to refresh: the leaderboard is empty."),
            RefreshOutcome::NoData => {
                println!("No player data resolved; previous leaderboard kept.")
            }
            RefreshOutcome::Published(outcome) => println!("Refresh complete: {outcome:?}"),
        },

        Commands::Show { refresh } => println!("{}", core.show_leaderboard(refresh).await),
        Commands::Add { code } => println!("{}", core.add_player(&code).await),
        Commands::Remove { code } => println!("{}", core.remove_player(&code).await),
        Commands::SetChannel { name } => println!("{}", core.set_channel(&name).await),
        Commands::Reset { confirm } => println!("{}", core.reset_leaderboard(&confirm).await),
        Commands::Status => println!("{}", core.status().await),
    }

    Ok(())
}
