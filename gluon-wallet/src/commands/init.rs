//! Init command

use anyhow::{bail, Result};
use std::path::Path;

use crate::config::WalletConfig;

use super::{print_success, print_warning};

/// Write a config skeleton pointing at `node_url`.
pub fn run(config_path: &Path, node_url: &str, force: bool) -> Result<()> {
    if config_path.exists() && !force {
        bail!(
            "{} already exists; pass --force to overwrite",
            config_path.display()
        );
    }

    let mut config = WalletConfig::default();
    config.node.url = node_url.to_string();
    config.save(config_path)?;

    print_success(&format!("Wrote {}", config_path.display()));
    if let Err(e) = config.validate() {
        print_warning(&format!("{e}. Fill in the [protocol] section before use."));
    }
    Ok(())
}
