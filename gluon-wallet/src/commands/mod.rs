//! CLI Commands
//!
//! Implementation of all wallet CLI commands.

pub mod build;
pub mod init;
pub mod quote;
pub mod status;
pub mod submit;

use anyhow::{Context, Result};
use clap::ValueEnum;
use gluon_reactor::Operation;
use std::path::Path;

use crate::{config::WalletConfig, format::parse_amount, reactor::Gluon};

/// The four reactor operations as named on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OperationKind {
    /// ERG in, stable and volatile out
    Fission,
    /// Stable and volatile in, ERG out
    Fusion,
    /// Volatile in, stable out
    ToStable,
    /// Stable in, volatile out
    ToVolatile,
}

impl OperationKind {
    /// Attach an amount typed by the user. Fission and fusion take ERG;
    /// transmutations take the token given up.
    pub fn with_amount(self, amount: &str) -> Result<Operation> {
        let amount = parse_amount(amount)?;
        Ok(match self {
            OperationKind::Fission => Operation::Fission { erg_amount: amount },
            OperationKind::Fusion => Operation::Fusion { erg_amount: amount },
            OperationKind::ToStable => Operation::TransmuteToStable {
                volatile_amount: amount,
            },
            OperationKind::ToVolatile => Operation::TransmuteToVolatile {
                stable_amount: amount,
            },
        })
    }
}

/// Load the config file and connect.
pub fn connect(config_path: &Path) -> Result<Gluon> {
    let config = WalletConfig::load(config_path)?;
    Gluon::new(&config).context("Invalid configuration")
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("\x1b[31mError:\x1b[0m {}", message);
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("\x1b[32m{}\x1b[0m", message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    eprintln!("\x1b[33mWarning:\x1b[0m {}", message);
}
