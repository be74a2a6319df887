//! Gluon Wallet CLI
//!
//! Inspect the Gluon reserve and build fission, fusion and transmutation
//! transactions for an external signer.

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gluon_wallet::{
    commands::{self, build::InputSource, OperationKind},
    config::default_config_path,
};

#[derive(Parser)]
#[command(name = "gluon-wallet")]
#[command(about = "Gluon reserve protocol wallet")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Custom config file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a config file skeleton
    Init {
        /// Node URL, e.g. http://127.0.0.1:9053
        #[arg(long)]
        node: String,

        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },

    /// Show prices, reserve ratios and transmutation volume
    Status,

    /// Preview an operation without building it
    Quote {
        #[arg(value_enum)]
        operation: OperationKind,

        /// Amount in whole units (ERG for fission and fusion, the token given
        /// up for transmutations)
        amount: String,
    },

    /// Build an unsigned EIP-12 transaction
    Build {
        #[arg(value_enum)]
        operation: OperationKind,

        /// Amount in whole units
        amount: String,

        /// Box ids to spend, in order; change returns to the first
        #[arg(long = "box", conflicts_with = "address")]
        boxes: Vec<String>,

        /// Spend unspent boxes of this address
        #[arg(long)]
        address: Option<String>,

        /// Write the transaction here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Submit a signed transaction
    Submit {
        /// Signed transaction JSON file
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so built transactions can be piped
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config_path = match cli.config {
        Some(path) => path,
        None => default_config_path().ok_or_else(|| anyhow!("Could not find home directory"))?,
    };

    match cli.command {
        Commands::Init { node, force } => commands::init::run(&config_path, &node, force),
        Commands::Status => commands::status::run(&config_path).await,
        Commands::Quote { operation, amount } => {
            commands::quote::run(&config_path, operation, &amount).await
        }
        Commands::Build {
            operation,
            amount,
            boxes,
            address,
            output,
        } => {
            let source = match address {
                Some(address) => InputSource::Address(address),
                None if !boxes.is_empty() => InputSource::Boxes(boxes),
                None => return Err(anyhow!("Pass --box <id> or --address <address>")),
            };
            commands::build::run(&config_path, operation, &amount, source, output.as_deref())
                .await
        }
        Commands::Submit { file } => commands::submit::run(&config_path, &file).await,
    }
}
