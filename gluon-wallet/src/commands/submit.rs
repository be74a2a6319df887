//! Submit command

use anyhow::{Context, Result};
use std::{fs, path::Path};

use crate::error::WalletError;

use super::{connect, print_error, print_success};

/// Run the submit command
pub async fn run(config_path: &Path, signed_path: &Path) -> Result<()> {
    let contents = fs::read_to_string(signed_path)
        .with_context(|| format!("Failed to read {}", signed_path.display()))?;
    let signed: serde_json::Value = serde_json::from_str(&contents)
        .with_context(|| format!("{} is not valid JSON", signed_path.display()))?;

    let gluon = connect(config_path)?;
    match gluon.submit(&signed).await {
        Ok(tx_id) => {
            print_success(&format!("Submitted transaction {tx_id}"));
            Ok(())
        }
        Err(e @ WalletError::StaleState(_)) => {
            print_error("An input was spent after the transaction was built.");
            println!("Run 'gluon-wallet build' again and sign the new transaction.");
            Err(e.into())
        }
        Err(e) => Err(e.into()),
    }
}
