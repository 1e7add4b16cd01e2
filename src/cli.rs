//! Command-line interface definition for Hanzo Commerce
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for signing in against Hanzo IAM and reading
//! billing data from the Commerce API.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::ConfigOverrides;

/// Hanzo Commerce - IAM login and billing CLI
///
/// Sign in with the OAuth2 authorization-code flow (PKCE) and query
/// balances, plans, subscriptions, and invoices.
#[derive(Parser, Debug, Clone)]
#[command(name = "hanzo-commerce")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    /// Session storage backend (memory, file, keyring)
    #[arg(long)]
    pub storage: Option<String>,

    /// Session file for the `file` storage backend
    #[arg(long)]
    pub storage_path: Option<PathBuf>,

    /// Override the Commerce API base URL
    #[arg(long)]
    pub api_url: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for Hanzo Commerce
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the sign-in flow and print the authorization URL
    Login {
        /// Do not try to open the URL in a browser
        #[arg(long)]
        no_browser: bool,

        /// Wait for the redirect on the loopback redirect URI and finish the login
        #[arg(long)]
        listen: bool,

        /// Seconds to wait for the redirect when listening
        #[arg(long, default_value_t = 300)]
        listen_timeout: u64,
    },

    /// Complete the sign-in flow with the URL the browser was redirected to
    Callback {
        /// Full redirect URL, including query string and fragment
        url: String,
    },

    /// Show the signed-in user
    Whoami,

    /// Show session status
    Status,

    /// Clear the stored session
    Logout,

    /// Exchange the stored refresh token for a new access token
    Refresh,

    /// Show a user's balance
    Balance {
        /// User id; defaults to the signed-in user
        #[arg(short, long)]
        user: Option<String>,

        /// Currency code
        #[arg(long, default_value = "usd")]
        currency: String,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// List available plans
    Plans {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// List a user's subscriptions
    Subscriptions {
        /// User id; defaults to the signed-in user
        #[arg(short, long)]
        user: Option<String>,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// List a user's transactions
    Transactions {
        /// User id; defaults to the signed-in user
        #[arg(short, long)]
        user: Option<String>,

        /// Maximum number of transactions
        #[arg(short, long)]
        limit: Option<u32>,

        /// Number of transactions to skip
        #[arg(long)]
        offset: Option<u32>,

        /// Only transactions in this currency
        #[arg(long)]
        currency: Option<String>,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show a user's usage for the current period
    Usage {
        /// User id; defaults to the signed-in user
        #[arg(short, long)]
        user: Option<String>,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// List a user's invoices
    Invoices {
        /// User id; defaults to the signed-in user
        #[arg(short, long)]
        user: Option<String>,

        /// Maximum number of invoices
        #[arg(short, long)]
        limit: Option<u32>,

        /// Number of invoices to skip
        #[arg(long)]
        offset: Option<u32>,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Configuration values supplied on the command line.
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            storage: self.storage.clone(),
            storage_path: self.storage_path.clone(),
            api_url: self.api_url.clone(),
        }
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: None,
            verbose: false,
            json_logs: false,
            storage: None,
            storage_path: None,
            api_url: None,
            command: Commands::Status,
        }
    }
}
