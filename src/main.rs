//! chatledger - Streaming chat CLI with usage and cost bookkeeping
//!
#![doc = "chatledger - Streaming chat CLI with usage and cost bookkeeping"]
#![doc = "Main entry point for the chatledger application."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use chatledger::cli::{Cli, Commands};
use chatledger::commands;
use chatledger::config::Config;
use chatledger::storage::SqliteStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    init_tracing();

    // Expose counters and histograms when built with the prometheus feature
    #[cfg(feature = "prometheus")]
    init_metrics()?;

    // Parse command line arguments
    let cli = Cli::parse_args();

    // Mirror a CLI database override into CHATLEDGER_DB so the store
    // initializer honors it without threading the path everywhere.
    if let Some(db_path) = &cli.db_path {
        std::env::set_var("CHATLEDGER_DB", db_path);
        tracing::info!("Using database override from CLI: {}", db_path);
    }

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    let store = SqliteStore::new()?;

    // Execute command
    match cli.command {
        Commands::Chat { model, resume } => {
            if let Some(m) = &model {
                tracing::debug!("Using model override: {}", m);
            }
            if let Some(r) = &resume {
                tracing::debug!("Resuming conversation: {}", r);
            }
            commands::chat::run_chat(config, store, model, resume).await?;
            Ok(())
        }
        Commands::Usage { command } => {
            commands::usage::handle_usage(command, &config, store)?;
            Ok(())
        }
        Commands::History { command } => {
            commands::history::handle_history(command, store)?;
            Ok(())
        }
        Commands::Models { command } => {
            commands::models::handle_models(command, &config, store)?;
            Ok(())
        }
    }
}

/// Install a Prometheus scrape endpoint on 127.0.0.1:9000
#[cfg(feature = "prometheus")]
fn init_metrics() -> Result<()> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    PrometheusBuilder::new()
        .with_http_listener(([127, 0, 0, 1], 9000))
        .install()?;
    Ok(())
}

/// Initialize tracing subscriber with environment filter
fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chatledger=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
