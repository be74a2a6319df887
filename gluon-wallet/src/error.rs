//! Wallet Errors

use gluon_reactor::{AddressError, ReactorError};
use thiserror::Error;

/// Node error fragments meaning one of the inputs is already gone.
const STALE_MARKERS: [&str; 4] = [
    "every input of the transaction should be in utxo",
    "missing inputs",
    "input not in utxo",
    "double spending",
];

/// An error from the wallet's I/O edge or the reactor core beneath it.
#[derive(Debug, Error)]
pub enum WalletError {
    /// Pricing or plan assembly failed.
    #[error(transparent)]
    Reactor(#[from] ReactorError),

    /// A snapshot the plan was built from is no longer current. Re-fetch
    /// and rebuild from scratch.
    #[error("stale state: {0}")]
    StaleState(String),

    /// A required setting is missing or malformed.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The node answered with an error status.
    #[error("node returned {status}: {message}")]
    Node { status: u16, message: String },

    /// The node could not be reached or returned malformed JSON.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The signer refused or failed.
    #[error("signing failed: {0}")]
    Signing(String),

    #[error("invalid address: {0}")]
    Address(#[from] AddressError),

    /// No unspent box holds the requested token.
    #[error("no unspent box holds token {0}")]
    BoxNotFound(String),
}

impl WalletError {
    /// Classify a non-success node response.
    pub fn from_node_response(status: u16, body: &str) -> Self {
        if is_stale_message(body) {
            WalletError::StaleState(body.trim().to_string())
        } else {
            WalletError::Node {
                status,
                message: body.trim().to_string(),
            }
        }
    }

    /// Whether the same call may succeed if simply repeated, possibly after
    /// re-fetching state.
    pub fn is_retryable(&self) -> bool {
        match self {
            WalletError::StaleState(_) => true,
            WalletError::Http(e) => e.is_timeout() || e.is_connect(),
            WalletError::Node { status, .. } => *status >= 500,
            _ => false,
        }
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, WalletError::StaleState(_))
    }
}

/// True when a node or signer message reports a spent or unknown input.
pub fn is_stale_message(message: &str) -> bool {
    let message = message.to_lowercase();
    STALE_MARKERS.iter().any(|marker| message.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_stale_classification() {
        let body = r#"{"error":400,"reason":"bad.request","detail":"Malformed transaction: Every input of the transaction should be in UTXO. Input 1a2b not found"}"#;
        assert_matches!(
            WalletError::from_node_response(400, body),
            WalletError::StaleState(_)
        );
        assert_matches!(
            WalletError::from_node_response(400, "Scripts of all transaction inputs should pass verification"),
            WalletError::Node { status: 400, .. }
        );
    }

    #[test]
    fn test_retryable() {
        assert!(WalletError::StaleState("x".into()).is_retryable());
        assert!(WalletError::Node {
            status: 503,
            message: String::new()
        }
        .is_retryable());
        assert!(!WalletError::Node {
            status: 400,
            message: String::new()
        }
        .is_retryable());
        assert!(!WalletError::Configuration("node url".into()).is_retryable());
        assert!(!WalletError::from(ReactorError::NoUserInputs).is_retryable());
    }
}
