//! Protocol status command

use anyhow::Result;
use std::path::Path;

use crate::format::{format_amount, format_erg, format_percent, format_ratio};

use super::{connect, print_success};

/// Run the status command
pub async fn run(config_path: &Path) -> Result<()> {
    let gluon = connect(config_path)?;

    println!("Fetching reserve and oracle boxes...");
    let stats = gluon.stats().await?;
    let prices = &stats.prices;

    println!();
    print_success("Gluon reserve");
    println!("  Gold price:         {} per gram", format_erg(stats.gold_price));
    println!("  Stable price:       {}", format_erg(prices.stable_price));
    println!("  Volatile price:     {}", format_erg(prices.volatile_price));
    println!("  Fusion ratio:       {}", format_ratio(prices.fusion_ratio));
    println!();
    println!("  Reserve:            {}", format_erg(prices.reserved_fissioned));
    println!("  Stable supply:      {}", format_amount(prices.circulating.stable));
    println!("  Volatile supply:    {}", format_amount(prices.circulating.volatile));
    println!("  TVL:                {}", format_erg(stats.tvl));
    println!();
    println!("  Reserve ratio:      {}", format_percent(stats.reserve_ratio));
    println!(
        "  Normalized ratio:   {}",
        format_percent(stats.normalized_reserve_ratio)
    );
    println!(
        "  Price crash cushion: {}",
        format_percent(stats.price_crash_cushion)
    );

    if !stats.volumes.is_empty() {
        println!();
        println!("Transmutation volume:");
        for volume in &stats.volumes {
            println!(
                "  {:>2} epoch(s): to stable {}, to volatile {}",
                volume.epochs,
                format_erg(volume.to_stable),
                format_erg(volume.to_volatile)
            );
        }
    }

    Ok(())
}
