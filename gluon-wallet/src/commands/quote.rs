//! Quote command

use anyhow::Result;
use std::path::Path;

use crate::format::{format_amount, format_erg, format_ratio};

use super::{connect, print_success, OperationKind};

/// Run the quote command
pub async fn run(config_path: &Path, kind: OperationKind, amount: &str) -> Result<()> {
    let operation = kind.with_amount(amount)?;
    let gluon = connect(config_path)?;
    let quote = gluon.quote(operation).await?;

    println!();
    print_success(&format!("Quote: {}", operation.name()));
    if quote.spend.stable > 0 || quote.spend.volatile > 0 {
        println!(
            "  You give:   {} stable, {} volatile",
            format_amount(quote.spend.stable),
            format_amount(quote.spend.volatile)
        );
    }
    if quote.receive.stable > 0 || quote.receive.volatile > 0 {
        println!(
            "  You get:    {} stable, {} volatile",
            format_amount(quote.receive.stable),
            format_amount(quote.receive.volatile)
        );
    }
    println!("  ERG value:  {}", format_erg(quote.erg_value));
    if let Some(factor) = quote.fee_factor {
        println!("  Fee factor: {}", format_ratio(factor));
    }

    println!();
    println!("Fees:");
    let fees = &quote.fees;
    let shares = &quote.shares;
    for (name, value, share) in [
        ("protocol", fees.protocol_fee, shares.protocol_fee),
        ("ui", fees.ui_fee, shares.ui_fee),
        ("oracle", fees.oracle_fee, shares.oracle_fee),
        ("miner", fees.miner_fee, shares.miner_fee),
        ("total", fees.total_fee, shares.total_fee),
    ] {
        println!("  {:<9} {} ({})", name, format_erg(value), format_ratio(share));
    }

    Ok(())
}
