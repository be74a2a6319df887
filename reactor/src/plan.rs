//! Transaction Plans
//!
//! A [`TransactionPlan`] is the complete, balanced description of one reactor
//! transaction: the boxes it spends (each with its context extension), the
//! oracle box it reads, and the outputs it creates. The miner fee is held
//! apart from the outputs and only materialized as a box when the plan is
//! rendered for a wallet with [`TransactionPlan::to_eip12`].

use crate::{
    boxes::{Asset, RawBox},
    error::ReactorError,
    math::{checked_sum, MathError},
    registers::{ErgoTree, RegisterId},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Standard Ergo miner-fee proposition.
pub const MINER_FEE_TREE: &str = "1005040004000e36100204a00b08cd0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798ea02d192a39a8cc7a701730073011001020402d19683030193a38cc7b2a57300000193c2b2a57301007473027303830108cdeeac93b1a57304";

/// Extension variable set on the buyback input of a transmutation. Selects
/// the buyback spending path of the oracle buyback contract.
pub const TRANSMUTE_EXTENSION: (u8, &str) = (0, "0402");

/// A box created by the transaction.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OutputBox {
    pub value: u64,
    pub ergo_tree: ErgoTree,
    pub creation_height: u64,
    pub assets: Vec<Asset>,
    pub registers: BTreeMap<RegisterId, String>,
}

impl OutputBox {
    pub fn new(value: u64, ergo_tree: ErgoTree, creation_height: u64) -> Self {
        Self {
            value,
            ergo_tree,
            creation_height,
            assets: Vec::new(),
            registers: BTreeMap::new(),
        }
    }

    pub fn token_amount(&self, token_id: &str) -> u64 {
        self.assets
            .iter()
            .filter(|a| a.token_id == token_id)
            .fold(0u64, |acc, a| acc.saturating_add(a.amount))
    }
}

/// A spent box and the context extension it is spent with.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PlanInput {
    pub raw: RawBox,
    pub extension: BTreeMap<u8, String>,
}

impl PlanInput {
    pub fn new(raw: RawBox) -> Self {
        Self {
            raw,
            extension: BTreeMap::new(),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TransactionPlan {
    pub inputs: Vec<PlanInput>,
    pub data_inputs: Vec<RawBox>,
    /// Outputs excluding the miner fee box
    pub outputs: Vec<OutputBox>,
    pub miner_fee: u64,
}

/// Sum of token amounts per token id.
pub(crate) fn token_totals<'a, I>(assets: I) -> Result<BTreeMap<String, u64>, MathError>
where
    I: IntoIterator<Item = &'a Asset>,
{
    let mut totals = BTreeMap::new();
    for asset in assets {
        let entry = totals.entry(asset.token_id.clone()).or_insert(0u64);
        *entry = entry.checked_add(asset.amount).ok_or(MathError::Overflow)?;
    }
    Ok(totals)
}

impl TransactionPlan {
    pub fn input_value(&self) -> Result<u64, MathError> {
        checked_sum(self.inputs.iter().map(|i| i.raw.value))
    }

    pub fn output_value(&self) -> Result<u64, MathError> {
        checked_sum(self.outputs.iter().map(|o| o.value))
    }

    /// Creation height shared by all outputs.
    pub fn creation_height(&self) -> u64 {
        self.outputs
            .first()
            .map_or(0, |o| o.creation_height)
    }

    /// Check nanoERG and per-token conservation.
    pub fn check_balanced(&self) -> Result<(), ReactorError> {
        let input_value = self.input_value()?;
        let spent = checked_sum([self.output_value()?, self.miner_fee])?;
        if input_value != spent {
            return Err(ReactorError::Unbalanced(format!(
                "inputs hold {input_value} nanoERG, outputs and fee take {spent}"
            )));
        }

        let tokens_in = token_totals(self.inputs.iter().flat_map(|i| &i.raw.assets))?;
        let tokens_out = token_totals(self.outputs.iter().flat_map(|o| &o.assets))?;
        if tokens_in != tokens_out {
            let mismatch = tokens_in
                .keys()
                .chain(tokens_out.keys())
                .find(|id| tokens_in.get(*id) != tokens_out.get(*id))
                .cloned()
                .unwrap_or_default();
            return Err(ReactorError::Unbalanced(format!(
                "token {mismatch}: in {:?}, out {:?}",
                tokens_in.get(&mismatch),
                tokens_out.get(&mismatch)
            )));
        }
        Ok(())
    }

    /// Miner fee output as it appears on chain.
    pub fn miner_fee_box(&self) -> Result<OutputBox, ReactorError> {
        let tree = ErgoTree::from_hex(MINER_FEE_TREE)?;
        Ok(OutputBox::new(self.miner_fee, tree, self.creation_height()))
    }

    /// Render as an EIP-12 unsigned transaction for a dApp-connector wallet.
    pub fn to_eip12(&self) -> Result<Eip12UnsignedTransaction, ReactorError> {
        let inputs = self
            .inputs
            .iter()
            .map(|input| {
                let extension = input
                    .extension
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.clone()))
                    .collect();
                Eip12Input::from_raw(&input.raw, extension)
            })
            .collect();
        let data_inputs = self
            .data_inputs
            .iter()
            .map(|raw| Eip12Input::from_raw(raw, BTreeMap::new()))
            .collect();
        let fee_box = self.miner_fee_box()?;
        let outputs = self
            .outputs
            .iter()
            .chain(std::iter::once(&fee_box))
            .map(Eip12Output::from)
            .collect();
        Ok(Eip12UnsignedTransaction {
            inputs,
            data_inputs,
            outputs,
        })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Eip12Asset {
    pub token_id: String,
    pub amount: String,
}

impl From<&Asset> for Eip12Asset {
    fn from(asset: &Asset) -> Self {
        Self {
            token_id: asset.token_id.clone(),
            amount: asset.amount.to_string(),
        }
    }
}

/// Full box being spent or read, with its context extension.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Eip12Input {
    pub box_id: String,
    pub transaction_id: String,
    pub index: u32,
    pub ergo_tree: ErgoTree,
    pub creation_height: u64,
    pub value: String,
    pub assets: Vec<Eip12Asset>,
    pub additional_registers: BTreeMap<RegisterId, String>,
    pub extension: BTreeMap<String, String>,
}

impl Eip12Input {
    fn from_raw(raw: &RawBox, extension: BTreeMap<String, String>) -> Self {
        Self {
            box_id: raw.box_id.clone(),
            transaction_id: raw.transaction_id.clone(),
            index: raw.index,
            ergo_tree: raw.ergo_tree.clone(),
            creation_height: raw.creation_height,
            value: raw.value.to_string(),
            assets: raw.assets.iter().map(Eip12Asset::from).collect(),
            additional_registers: raw
                .additional_registers
                .iter()
                .map(|(id, reg)| (*id, reg.wire().to_string()))
                .collect(),
            extension,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Eip12Output {
    pub value: String,
    pub ergo_tree: ErgoTree,
    pub creation_height: u64,
    pub assets: Vec<Eip12Asset>,
    pub additional_registers: BTreeMap<RegisterId, String>,
    pub extension: BTreeMap<String, String>,
}

impl From<&OutputBox> for Eip12Output {
    fn from(out: &OutputBox) -> Self {
        Self {
            value: out.value.to_string(),
            ergo_tree: out.ergo_tree.clone(),
            creation_height: out.creation_height,
            assets: out.assets.iter().map(Eip12Asset::from).collect(),
            additional_registers: out.registers.clone(),
            extension: BTreeMap::new(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Eip12UnsignedTransaction {
    pub inputs: Vec<Eip12Input>,
    pub data_inputs: Vec<Eip12Input>,
    pub outputs: Vec<Eip12Output>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn raw(id: &str, value: u64, assets: Vec<Asset>) -> RawBox {
        RawBox {
            box_id: id.to_string(),
            transaction_id: "tx".to_string(),
            index: 0,
            value,
            ergo_tree: ErgoTree::from_bytes(vec![0x00]),
            creation_height: 10,
            assets,
            additional_registers: BTreeMap::new(),
        }
    }

    fn plan() -> TransactionPlan {
        let mut out = OutputBox::new(7_000, ErgoTree::from_bytes(vec![0x01]), 10);
        out.assets.push(Asset::new("t", 5));
        out.registers.insert(RegisterId::R4, "0502".to_string());
        let mut input = PlanInput::new(raw("b", 2_000, vec![]));
        input
            .extension
            .insert(TRANSMUTE_EXTENSION.0, TRANSMUTE_EXTENSION.1.to_string());
        TransactionPlan {
            inputs: vec![PlanInput::new(raw("a", 6_000, vec![Asset::new("t", 5)])), input],
            data_inputs: vec![raw("o", 1, vec![])],
            outputs: vec![out],
            miner_fee: 1_000,
        }
    }

    #[test]
    fn test_balanced_plan() {
        plan().check_balanced().unwrap();
    }

    #[test]
    fn test_unbalanced_value() {
        let mut p = plan();
        p.miner_fee += 1;
        assert_matches!(p.check_balanced(), Err(ReactorError::Unbalanced(_)));
    }

    #[test]
    fn test_unbalanced_tokens() {
        let mut p = plan();
        p.outputs[0].assets[0].amount = 4;
        assert_matches!(
            p.check_balanced(),
            Err(ReactorError::Unbalanced(msg)) if msg.contains("token t")
        );
    }

    #[test]
    fn test_eip12_shape() {
        let tx = plan().to_eip12().unwrap();
        assert_eq!(tx.inputs.len(), 2);
        assert!(tx.inputs[0].extension.is_empty());
        assert_eq!(tx.inputs[1].extension.get("0").map(String::as_str), Some("0402"));
        assert_eq!(tx.data_inputs.len(), 1);
        assert_eq!(tx.outputs.len(), 2);
        let fee = &tx.outputs[1];
        assert_eq!(fee.value, "1000");
        assert_eq!(fee.ergo_tree.to_hex(), MINER_FEE_TREE);

        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["outputs"][0]["value"], "7000");
        assert_eq!(json["outputs"][0]["additionalRegisters"]["R4"], "0502");
        assert_eq!(json["outputs"][0]["assets"][0]["amount"], "5");
        assert_eq!(json["dataInputs"][0]["boxId"], "o");
        assert!(json["outputs"][0]["extension"].as_object().unwrap().is_empty());
    }
}
