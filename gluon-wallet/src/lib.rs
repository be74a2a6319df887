//! Gluon Wallet
//!
//! Node-facing half of the Gluon SDK: configuration, the node REST client
//! and the [`Gluon`] facade that feeds fresh box snapshots into
//! [`gluon_reactor`]. Signing is left to a [`TransactionSigner`].

pub mod commands;
pub mod config;
pub mod error;
pub mod format;
pub mod node;
pub mod reactor;

pub use config::{NodeConfig, WalletConfig};
pub use error::WalletError;
pub use node::NodeClient;
pub use reactor::{Gluon, Snapshot, TransactionSigner};
