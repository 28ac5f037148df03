//! replyflow - keyword-driven auto-reply sessions for chat accounts.
//!
//! # Configuration
//!
//! The configuration file is read from `--config`, or from
//! `~/.config/replyflow/config.toml` by default. `replyflow init-config`
//! writes an example to start from.
//!
//! # Logging
//!
//! `--debug` > `RUST_LOG` > `logging.level` from the configuration.

mod commands;
mod logging;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use replyflow_core::config::{AppConfig, LoggingConfig};
use replyflow_infrastructure::{ReplyflowPaths, load_config};
use std::path::{Path, PathBuf};

/// replyflow - keyword-driven auto-reply sessions
#[derive(Parser, Debug)]
#[command(name = "replyflow")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Configuration file (default: ~/.config/replyflow/config.toml)
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start sessions for every account, or only one
    Run {
        #[arg(short, long)]
        account: Option<String>,
    },
    /// Load and validate the configuration
    ValidateConfig,
    /// Write an example configuration
    InitConfig {
        /// Where to write (default: the configuration path)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Show what an account's rules would do with a message
    Check {
        #[arg(short, long)]
        account: Option<String>,
        message: String,
    },
    /// Inspect or edit shared contact remarks
    Contacts {
        #[command(subcommand)]
        action: commands::contacts::ContactsAction,
    },
}

fn load(path: &Path, debug: bool) -> Result<AppConfig> {
    let config = load_config(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    logging::init(debug, &config.logging)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = match cli.config {
        Some(path) => path,
        None => ReplyflowPaths::config_file()?,
    };

    match cli.command {
        Commands::InitConfig { output, force } => {
            logging::init(cli.debug, &LoggingConfig::default())?;
            commands::init::execute(&output.unwrap_or(config_path), force)
        }
        Commands::ValidateConfig => {
            let config = load(&config_path, cli.debug)?;
            commands::validate::execute(&config, &config_path)
        }
        Commands::Run { account } => {
            let config = load(&config_path, cli.debug)?;
            commands::run::execute(config, account.as_deref()).await
        }
        Commands::Check { account, message } => {
            let config = load(&config_path, cli.debug)?;
            commands::check::execute(&config, account.as_deref(), &message)
        }
        Commands::Contacts { action } => {
            let config = load(&config_path, cli.debug)?;
            commands::contacts::execute(&config, action).await
        }
    }
}
