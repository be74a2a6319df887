//! Gluon Facade
//!
//! Fetches fresh reserve, oracle and buyback snapshots from the node and hands
//! them to the core. Nothing is cached: every quote and plan is computed from
//! boxes read for that call alone, so a plan that fails as stale is rebuilt by
//! simply calling again.

use crate::{config::WalletConfig, error::WalletError, node::NodeClient};
use async_trait::async_trait;
use gluon_reactor::{
    address_of, builder::Quote, plan::Eip12UnsignedTransaction, stats::ProtocolStats, OracleBox,
    Operation, OperationRequest, ProtocolConfig, RawBox, ReserveBox, TransactionBuilder,
    TransactionPlan,
};
use tracing::{debug, info};

/// Signs EIP-12 transactions on behalf of the user.
///
/// Implemented by the embedding application: a browser dApp connector, a
/// hardware wallet bridge or a local key store.
#[async_trait]
pub trait TransactionSigner: Send + Sync {
    /// Return the signed transaction as the node's JSON.
    async fn sign(&self, unsigned: &Eip12UnsignedTransaction)
        -> Result<serde_json::Value, WalletError>;
}

/// Protocol boxes read at one height.
#[derive(Clone, Debug)]
pub struct Snapshot {
    pub reserve: ReserveBox,
    pub oracle: OracleBox,
    /// Only fetched for transmutations
    pub buyback: Option<RawBox>,
    pub height: u64,
}

#[derive(Debug)]
pub struct Gluon {
    protocol: ProtocolConfig,
    node: NodeClient,
}

impl Gluon {
    /// Validate `config` and connect to its node.
    pub fn new(config: &WalletConfig) -> Result<Self, WalletError> {
        config.validate()?;
        Ok(Self {
            protocol: config.protocol.clone(),
            node: NodeClient::new(&config.node)?,
        })
    }

    pub fn protocol(&self) -> &ProtocolConfig {
        &self.protocol
    }

    pub fn node(&self) -> &NodeClient {
        &self.node
    }

    pub async fn reserve_box(&self) -> Result<ReserveBox, WalletError> {
        let raw = self.node.singleton_box(&self.protocol.tokens.reserve_nft).await?;
        Ok(ReserveBox::from_raw(raw, &self.protocol)?)
    }

    pub async fn oracle_box(&self) -> Result<OracleBox, WalletError> {
        let raw = self
            .node
            .singleton_box(&self.protocol.tokens.oracle_pool_nft)
            .await?;
        Ok(OracleBox::from_raw(raw)?)
    }

    pub async fn buyback_box(&self) -> Result<RawBox, WalletError> {
        self.node
            .singleton_box(&self.protocol.tokens.oracle_buyback_nft)
            .await
    }

    /// Read the reserve, the oracle and the height together.
    pub async fn snapshot(&self, with_buyback: bool) -> Result<Snapshot, WalletError> {
        let (reserve, oracle, height) =
            tokio::try_join!(self.reserve_box(), self.oracle_box(), self.node.height())?;
        let buyback = if with_buyback {
            Some(self.buyback_box().await?)
        } else {
            None
        };
        debug!(
            reserve = reserve.box_id(),
            height,
            buyback = buyback.as_ref().map(|b| b.box_id.as_str()),
            "fetched snapshot"
        );
        Ok(Snapshot {
            reserve,
            oracle,
            buyback,
            height,
        })
    }

    pub async fn stats(&self) -> Result<ProtocolStats, WalletError> {
        let snapshot = self.snapshot(false).await?;
        Ok(gluon_reactor::stats::protocol_stats(
            &snapshot.reserve,
            &snapshot.oracle,
        )?)
    }

    pub async fn quote(&self, operation: Operation) -> Result<Quote, WalletError> {
        let snapshot = self.snapshot(false).await?;
        Ok(TransactionBuilder::new(&self.protocol).quote(
            &snapshot.reserve,
            &snapshot.oracle,
            operation,
            snapshot.height,
        )?)
    }

    /// Fetch boxes by id, in the given order.
    pub async fn boxes_by_id(&self, box_ids: &[String]) -> Result<Vec<RawBox>, WalletError> {
        let mut boxes = Vec::with_capacity(box_ids.len());
        for id in box_ids {
            boxes.push(self.node.box_by_id(id).await?);
        }
        Ok(boxes)
    }

    /// First page of unspent boxes guarded by `address`.
    pub async fn boxes_by_address(&self, address: &str) -> Result<Vec<RawBox>, WalletError> {
        gluon_reactor::tree_of(address)?;
        self.node
            .unspent_by_address(address, 0, crate::node::ADDRESS_PAGE_LIMIT)
            .await
    }

    /// Build a plan for `operation` spending `user_boxes`, against snapshots
    /// fetched now.
    pub async fn plan(
        &self,
        operation: Operation,
        user_boxes: Vec<RawBox>,
    ) -> Result<TransactionPlan, WalletError> {
        let snapshot = self.snapshot(operation.is_transmutation()).await?;
        let request = OperationRequest {
            operation,
            height: snapshot.height,
            user_boxes,
        };
        let plan = TransactionBuilder::new(&self.protocol).build(
            &snapshot.reserve,
            &snapshot.oracle,
            snapshot.buyback.as_ref(),
            &request,
        )?;
        if let Some(change) = plan.outputs.get(1) {
            info!(
                operation = operation.name(),
                change = %address_of(&change.ergo_tree, self.protocol.network),
                "built plan"
            );
        }
        Ok(plan)
    }

    /// Post a signed transaction.
    pub async fn submit(&self, signed: &serde_json::Value) -> Result<String, WalletError> {
        let tx_id = self.node.submit(signed).await?;
        info!(tx_id = %tx_id, "submitted transaction");
        Ok(tx_id)
    }

    /// Build, sign and submit in one pass.
    ///
    /// A [`WalletError::StaleState`] from either the signer or the node means
    /// an input was spent after the snapshot; call again to rebuild.
    pub async fn execute(
        &self,
        operation: Operation,
        user_boxes: Vec<RawBox>,
        signer: &dyn TransactionSigner,
    ) -> Result<String, WalletError> {
        let plan = self.plan(operation, user_boxes).await?;
        let unsigned = plan.to_eip12()?;
        let signed = signer.sign(&unsigned).await.map_err(|e| match e {
            WalletError::Signing(msg) if crate::error::is_stale_message(&msg) => {
                WalletError::StaleState(msg)
            }
            other => other,
        })?;
        self.submit(&signed).await
    }
}
