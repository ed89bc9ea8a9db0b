use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use liftsync_core::{AutomergeStore, MemoryIdentity, SyncCoordinator};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod local_plans;

use commands::{
    AuthCommand, CatalogCommand, ConfigCommand, ExerciseCommand, PlanCommand, SetCommand,
};
use config::Config;
use local_plans::FileLocalStore;

#[derive(Parser)]
#[command(name = "liftsync")]
#[command(version)]
#[command(about = "Plan workouts and log sets from the command line", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage training plans
    Plan(PlanCommand),

    /// Manage the exercises of a plan
    Exercise(ExerciseCommand),

    /// Log and edit sets of an exercise
    Set(SetCommand),

    /// Browse the exercise catalog and custom exercises
    Catalog(CatalogCommand),

    /// Register, sign in or sign out
    Auth(AuthCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "liftsync=info,liftsync_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Save config path for config init
    let cli_config_path = cli.config.clone();

    let config = Config::load(cli.config)?;
    debug!("Loaded configuration from {:?}", config.config_file);

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(execute_command(&cli.command, &config, cli_config_path))
}

async fn execute_command(
    command: &Option<Commands>,
    config: &Config,
    cli_config_path: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Some(Commands::Config(cmd)) => cmd.run(config, cli_config_path),
        Some(Commands::Plan(cmd)) => cmd.run(&open_coordinator(config)?).await,
        Some(Commands::Exercise(cmd)) => cmd.run(&open_coordinator(config)?, config).await,
        Some(Commands::Set(cmd)) => cmd.run(&open_coordinator(config)?).await,
        Some(Commands::Catalog(cmd)) => cmd.run(&open_coordinator(config)?).await,
        Some(Commands::Auth(cmd)) => {
            let store = AutomergeStore::open(&config.data_dir.value)?;
            let config_path = cli_config_path
                .or_else(|| config.config_file.clone())
                .unwrap_or_else(Config::default_config_path);
            cmd.run(Arc::new(store), config, config_path).await
        }
        None => {
            println!("Use --help to see available commands");
            Ok(())
        }
    }
}

/// Opens the local document store and wires the coordinator to it.
fn open_coordinator(config: &Config) -> Result<SyncCoordinator, Box<dyn std::error::Error>> {
    let data_dir = &config.data_dir.value;
    let store = AutomergeStore::open(data_dir)?;

    let identity = match &config.user_id.value {
        Some(user_id) => MemoryIdentity::signed_in(user_id.as_str()),
        None => {
            info!("No user_id configured; plans are kept on this device only");
            MemoryIdentity::new()
        }
    };

    Ok(
        SyncCoordinator::new(Arc::new(store), Arc::new(identity))
            .with_settings(config.sync_settings())
            .with_local_store(Arc::new(FileLocalStore::new(data_dir))),
    )
}
