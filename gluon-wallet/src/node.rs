//! Ergo Node Client
//!
//! Thin wrapper over the node's REST API. Every call is a single request;
//! retry policy belongs to the caller.

use crate::{config::NodeConfig, error::WalletError};
use gluon_reactor::RawBox;
use reqwest::{header::CONTENT_TYPE, Response};
use serde::{de::DeserializeOwned, Deserialize};
use tracing::debug;

/// Page size for address box queries.
pub const ADDRESS_PAGE_LIMIT: u32 = 100;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NodeInfo {
    full_height: u64,
}

/// Ergo node REST client
#[derive(Debug, Clone)]
pub struct NodeClient {
    client: reqwest::Client,
    base_url: String,
}

impl NodeClient {
    pub fn new(config: &NodeConfig) -> Result<Self, WalletError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn read<T: DeserializeOwned>(response: Response) -> Result<T, WalletError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WalletError::from_node_response(status.as_u16(), &body));
        }
        Ok(response.json().await?)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, WalletError> {
        debug!(path, "GET");
        let response = self.client.get(self.url(path)).send().await?;
        Self::read(response).await
    }

    /// Unspent boxes holding `token_id`, as indexed by the node.
    pub async fn unspent_by_token_id(&self, token_id: &str) -> Result<Vec<RawBox>, WalletError> {
        self.get(&format!("/blockchain/box/unspent/byTokenId/{token_id}"))
            .await
    }

    /// The unspent box holding a singleton token.
    pub async fn singleton_box(&self, token_id: &str) -> Result<RawBox, WalletError> {
        self.unspent_by_token_id(token_id)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| WalletError::BoxNotFound(token_id.to_string()))
    }

    pub async fn box_by_id(&self, box_id: &str) -> Result<RawBox, WalletError> {
        self.get(&format!("/blockchain/box/byId/{box_id}")).await
    }

    /// One page of unspent boxes guarded by `address`, newest first.
    pub async fn unspent_by_address(
        &self,
        address: &str,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<RawBox>, WalletError> {
        debug!(address, offset, limit, "POST byAddress");
        let response = self
            .client
            .post(self.url("/blockchain/box/unspent/byAddress"))
            .query(&[
                ("offset", offset.to_string()),
                ("limit", limit.to_string()),
                ("sortDirection", "desc".to_string()),
            ])
            .header(CONTENT_TYPE, "text/plain")
            .body(address.to_string())
            .send()
            .await?;
        Self::read(response).await
    }

    /// Current full-block height.
    pub async fn height(&self) -> Result<u64, WalletError> {
        let info: NodeInfo = self.get("/info").await?;
        Ok(info.full_height)
    }

    /// Post a signed transaction. Returns its id.
    pub async fn submit(&self, signed: &serde_json::Value) -> Result<String, WalletError> {
        debug!("POST /transactions");
        let response = self
            .client
            .post(self.url("/transactions"))
            .json(signed)
            .send()
            .await?;
        Self::read(response).await
    }
}
