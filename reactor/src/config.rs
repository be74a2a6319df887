//! Protocol Configuration
//!
//! Every constant and identifier the reactor needs. Amounts are nanoERG and
//! fee rates are parts per [`FEE_DENOMINATOR`](crate::math::FEE_DENOMINATOR).

use crate::{error::ReactorError, math::FEE_DENOMINATOR, registers::ErgoTree};
use serde::{Deserialize, Serialize};

/// Ledger network. Only affects address rendering.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Mainnet,
    Testnet,
}

impl Network {
    /// Address prefix byte of the network.
    pub fn prefix(&self) -> u8 {
        match self {
            Network::Mainnet => 0x00,
            Network::Testnet => 0x10,
        }
    }
}

/// Token identifiers of the protocol boxes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct TokenIds {
    /// Singleton token identifying the reserve box
    #[serde(default)]
    pub reserve_nft: String,
    /// Stable token (neutron)
    #[serde(default)]
    pub stable: String,
    /// Volatile token (proton)
    #[serde(default)]
    pub volatile: String,
    /// Singleton token of the gold oracle pool box
    #[serde(default)]
    pub oracle_pool_nft: String,
    /// Singleton token of the oracle buyback box
    #[serde(default)]
    pub oracle_buyback_nft: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProtocolConfig {
    #[serde(default)]
    pub network: Network,

    /// Fee paid to miners by every transaction
    #[serde(default = "default_miner_fee")]
    pub miner_fee: u64,

    /// Dust kept in the reserve box and the floor for new boxes
    #[serde(default = "default_min_box_value")]
    pub min_box_value: u64,

    /// Added on top of every fee box value
    #[serde(default = "default_min_fee")]
    pub min_fee: u64,

    #[serde(default = "default_dev_fee_rate")]
    pub dev_fee_rate: u64,

    #[serde(default)]
    pub ui_fee_rate: u64,

    #[serde(default = "default_oracle_fee_rate")]
    pub oracle_fee_rate: u64,

    /// Destination of the protocol fee. Falls back to the script stored in
    /// the reserve box (R5) when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dev_tree: Option<ErgoTree>,

    /// Destination of the UI fee, required when `ui_fee_rate > 0`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui_tree: Option<ErgoTree>,

    /// Destination of the oracle fee and the buyback output
    #[serde(default)]
    pub oracle_fee_tree: ErgoTree,

    #[serde(default)]
    pub tokens: TokenIds,

    /// Blocks per volume epoch
    #[serde(default = "default_epoch_len")]
    pub epoch_len: u64,

    /// Number of epoch buckets in the volume window
    #[serde(default = "default_bucket_len")]
    pub bucket_len: usize,
}

fn default_miner_fee() -> u64 {
    1_100_000
}

fn default_min_box_value() -> u64 {
    1_000_000
}

fn default_min_fee() -> u64 {
    1_000_000
}

fn default_dev_fee_rate() -> u64 {
    50
}

fn default_oracle_fee_rate() -> u64 {
    50
}

fn default_epoch_len() -> u64 {
    720
}

fn default_bucket_len() -> usize {
    14
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            network: Network::default(),
            miner_fee: default_miner_fee(),
            min_box_value: default_min_box_value(),
            min_fee: default_min_fee(),
            dev_fee_rate: default_dev_fee_rate(),
            ui_fee_rate: 0,
            oracle_fee_rate: default_oracle_fee_rate(),
            dev_tree: None,
            ui_tree: None,
            oracle_fee_tree: ErgoTree::default(),
            tokens: TokenIds::default(),
            epoch_len: default_epoch_len(),
            bucket_len: default_bucket_len(),
        }
    }
}

impl ProtocolConfig {
    /// Check that every identifier and script an operation may need is set.
    pub fn validate(&self) -> Result<(), ReactorError> {
        let ids = [
            ("reserve_nft", &self.tokens.reserve_nft),
            ("stable token id", &self.tokens.stable),
            ("volatile token id", &self.tokens.volatile),
            ("oracle_pool_nft", &self.tokens.oracle_pool_nft),
            ("oracle_buyback_nft", &self.tokens.oracle_buyback_nft),
        ];
        for (name, id) in ids {
            if id.is_empty() {
                return Err(ReactorError::Configuration(format!("{name} is not set")));
            }
            if id.len() != 64 || hex::decode(id).is_err() {
                return Err(ReactorError::Configuration(format!(
                    "{name} is not a 32-byte hex id: {id}"
                )));
            }
        }

        for (name, rate) in [
            ("dev_fee_rate", self.dev_fee_rate),
            ("ui_fee_rate", self.ui_fee_rate),
            ("oracle_fee_rate", self.oracle_fee_rate),
        ] {
            if rate > FEE_DENOMINATOR {
                return Err(ReactorError::Configuration(format!(
                    "{name} {rate} exceeds {FEE_DENOMINATOR}"
                )));
            }
        }

        if self.ui_fee_rate > 0 && self.ui_tree.as_ref().map_or(true, ErgoTree::is_empty) {
            return Err(ReactorError::Configuration(
                "ui_tree is required when ui_fee_rate is set".to_string(),
            ));
        }
        if self.oracle_fee_tree.is_empty() {
            return Err(ReactorError::Configuration(
                "oracle_fee_tree is not set".to_string(),
            ));
        }
        if self.epoch_len == 0 || self.bucket_len == 0 {
            return Err(ReactorError::Configuration(
                "epoch_len and bucket_len must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
