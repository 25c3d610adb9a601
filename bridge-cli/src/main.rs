//! # stepbridge
//!
//! CLI tool for driving a stepbridge session against a scripted remote.
//!
//! ## Commands
//!
//! - `account`: Log in, fetch state, and show account usage
//! - `mkdir`: Run the session, then create a folder under the root
//! - `logout`: Run the session, then log out
//!
//! ## Example
//!
//! ```bash
//! # Show usage against the default scenario
//! stepbridge --email me@example.com account
//!
//! # Replay a scenario file, JSON output
//! stepbridge --config scenario.toml --email me@example.com --json account
//!
//! # Create a folder with debug logging
//! stepbridge -vv --email me@example.com mkdir sandbox
//! ```

use anyhow::{Context, Result};
use bridge_client::Credentials;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use zeroize::Zeroizing;

mod commands;
mod config;

use commands::{account, logout, mkdir, Output};
use config::ScenarioConfig;

/// CLI tool for driving a stepbridge session against a scripted remote.
#[derive(Parser, Debug)]
#[command(name = "stepbridge")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Scenario file scripting the remote (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Account email (default: [credentials] in the scenario)
    #[arg(long, global = true)]
    email: Option<String>,

    /// Account password (scenario [credentials], else prompted)
    #[arg(long, global = true)]
    password: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// More log output on stderr (-v: debug, -vv: trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show account storage usage and plan
    Account,

    /// Create a folder under the root location
    Mkdir {
        /// Folder name
        name: String,
    },

    /// Run the session, then log out
    Logout,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let scenario = match &cli.config {
        Some(path) => ScenarioConfig::from_file(path)?,
        None => ScenarioConfig::default(),
    };

    // Flags win over the scenario's stored login; the password prompt is last.
    let email = cli
        .email
        .or_else(|| scenario.credentials.email.clone())
        .context("Missing --email for login (or [credentials] email in the scenario)")?;
    let stored_password = scenario.credentials.password.clone();
    let password = Zeroizing::new(match cli.password.or(stored_password) {
        Some(password) => password,
        None => rpassword::prompt_password("Password: ").context("Failed to read password")?,
    });
    let credentials = Credentials::new(&email, &password);

    let output = if cli.json { Output::Json } else { Output::Text };

    match cli.command {
        Commands::Account => account::run(credentials, &scenario, output)?,
        Commands::Mkdir { name } => mkdir::run(credentials, &scenario, &name, output)?,
        Commands::Logout => logout::run(credentials, &scenario, output)?,
    }

    Ok(())
}

/// Log to stderr. `RUST_LOG` wins over `-v`.
fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
