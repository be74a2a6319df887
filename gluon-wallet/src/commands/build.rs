//! Build command
//!
//! Produces an unsigned EIP-12 transaction for any wallet that speaks the
//! dApp connector format.

use anyhow::{bail, Context, Result};
use std::{fs, path::Path};

use crate::format::format_erg;

use super::{connect, print_success, OperationKind};

/// Where the user's inputs come from.
pub enum InputSource {
    /// Explicit box ids, spent in order
    Boxes(Vec<String>),
    /// Every box on the first page of an address
    Address(String),
}

/// Run the build command
pub async fn run(
    config_path: &Path,
    kind: OperationKind,
    amount: &str,
    source: InputSource,
    output: Option<&Path>,
) -> Result<()> {
    let operation = kind.with_amount(amount)?;
    let gluon = connect(config_path)?;

    let user_boxes = match &source {
        InputSource::Boxes(ids) => gluon.boxes_by_id(ids).await?,
        InputSource::Address(address) => gluon.boxes_by_address(address).await?,
    };
    if user_boxes.is_empty() {
        bail!("No unspent boxes to spend");
    }

    let plan = gluon.plan(operation, user_boxes).await?;
    let unsigned = plan.to_eip12()?;
    let json = serde_json::to_string_pretty(&unsigned)?;

    match output {
        Some(path) => {
            fs::write(path, &json)
                .with_context(|| format!("Failed to write transaction to {}", path.display()))?;
            print_success(&format!(
                "Wrote unsigned {} transaction to {}",
                operation.name(),
                path.display()
            ));
            println!("  Inputs:    {}", plan.inputs.len());
            println!("  Outputs:   {}", unsigned.outputs.len());
            println!("  Miner fee: {}", format_erg(plan.miner_fee));
        }
        None => println!("{json}"),
    }

    Ok(())
}
