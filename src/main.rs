//! Hanzo Commerce CLI
//!
#![doc = "Hanzo Commerce CLI"]
#![doc = "Main entry point for the hanzo-commerce command-line client."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use hanzo_commerce::cli::{Cli, Commands};
use hanzo_commerce::commands;
use hanzo_commerce::config::Config;
use hanzo_commerce::types::{Pagination, TransactionQuery};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.verbose, cli.json_logs);

    // Load configuration
    let config_path = cli
        .config
        .clone()
        .map(std::path::PathBuf::from)
        .or_else(Config::default_path)
        .unwrap_or_else(|| std::path::PathBuf::from("config.yaml"));
    let config = Config::load(&config_path, &cli.overrides())?;

    // Validate configuration
    config.validate()?;

    // Execute command
    match cli.command {
        Commands::Login {
            no_browser,
            listen,
            listen_timeout,
        } => {
            tracing::info!("Starting login");
            commands::auth::login(&config, no_browser, listen, listen_timeout).await?;
        }
        Commands::Callback { url } => {
            tracing::info!("Completing login from redirect");
            commands::auth::callback(&config, &url).await?;
        }
        Commands::Whoami => commands::auth::whoami(&config)?,
        Commands::Status => commands::auth::status(&config)?,
        Commands::Logout => commands::auth::logout(&config)?,
        Commands::Refresh => {
            tracing::info!("Refreshing access token");
            commands::auth::refresh(&config).await?;
        }
        Commands::Balance {
            user,
            currency,
            json,
        } => {
            commands::billing::balance(&config, user, &currency, json).await?;
        }
        Commands::Plans { json } => commands::billing::plans(&config, json).await?,
        Commands::Subscriptions { user, json } => {
            commands::billing::subscriptions(&config, user, json).await?;
        }
        Commands::Transactions {
            user,
            limit,
            offset,
            currency,
            json,
        } => {
            let query = TransactionQuery {
                limit,
                offset,
                currency,
            };
            commands::billing::transactions(&config, user, query, json).await?;
        }
        Commands::Usage { user, json } => commands::billing::usage(&config, user, json).await?,
        Commands::Invoices {
            user,
            limit,
            offset,
            json,
        } => {
            commands::billing::invoices(&config, user, Pagination { limit, offset }, json).await?;
        }
    }

    Ok(())
}

/// Initialize tracing subscriber with environment filter
///
/// Logs go to stderr so table and JSON output on stdout stays clean.
fn init_tracing(verbose: bool, json_logs: bool) {
    let default_directive = if verbose {
        "hanzo_commerce=debug"
    } else {
        "hanzo_commerce=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
