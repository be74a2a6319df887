//! Ledger Boxes
//!
//! [`RawBox`] mirrors a box exactly as the node returns it. [`ReserveBox`] and
//! [`OracleBox`] are the validated protocol views built from it; once parsed,
//! nothing else in the crate reads registers or asset lists directly.

use crate::{
    config::ProtocolConfig,
    error::{DomainError, ReactorError},
    math::MathError,
    registers::{
        decode_long_array, decode_long_pair, decode_number, decode_tree, encode_long_pair,
        encode_number, DecodeError, ErgoTree, RegisterId,
    },
    volume::{epoch_floor, epochs_elapsed, Direction, VolumeBuckets},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Amounts arrive as JSON numbers from the node and as strings in EIP-12
/// documents.
pub(crate) mod amount {
    use serde::{de, Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(u64),
        String(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        match NumberOrString::deserialize(deserializer)? {
            NumberOrString::Number(n) => Ok(n),
            NumberOrString::String(s) => s.parse().map_err(de::Error::custom),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub token_id: String,
    #[serde(deserialize_with = "amount::deserialize")]
    pub amount: u64,
}

impl Asset {
    pub fn new(token_id: impl Into<String>, amount: u64) -> Self {
        Self {
            token_id: token_id.into(),
            amount,
        }
    }
}

/// A register as delivered by either node API.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum RegisterValue {
    /// `/utxo` endpoints: the bare base16 constant
    Serialized(String),
    /// `/blockchain` endpoints: the constant with its rendering
    Rendered {
        #[serde(rename = "serializedValue")]
        serialized_value: String,
        #[serde(rename = "sigmaType", default, skip_serializing_if = "Option::is_none")]
        sigma_type: Option<String>,
        #[serde(rename = "renderedValue", default, skip_serializing_if = "Option::is_none")]
        rendered_value: Option<String>,
    },
}

impl RegisterValue {
    /// The base16 wire value.
    pub fn wire(&self) -> &str {
        match self {
            RegisterValue::Serialized(s) => s,
            RegisterValue::Rendered {
                serialized_value, ..
            } => serialized_value,
        }
    }
}

impl From<String> for RegisterValue {
    fn from(s: String) -> Self {
        RegisterValue::Serialized(s)
    }
}

/// A ledger box as returned by the node.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RawBox {
    pub box_id: String,
    #[serde(default)]
    pub transaction_id: String,
    #[serde(default)]
    pub index: u32,
    #[serde(deserialize_with = "amount::deserialize")]
    pub value: u64,
    pub ergo_tree: ErgoTree,
    #[serde(deserialize_with = "amount::deserialize")]
    pub creation_height: u64,
    #[serde(default)]
    pub assets: Vec<Asset>,
    #[serde(default)]
    pub additional_registers: BTreeMap<RegisterId, RegisterValue>,
}

impl RawBox {
    /// Base16 wire value of a register, if present.
    pub fn register(&self, id: RegisterId) -> Option<&str> {
        self.additional_registers.get(&id).map(RegisterValue::wire)
    }

    pub fn required_register(&self, id: RegisterId) -> Result<&str, DecodeError> {
        self.register(id).ok_or(DecodeError::MissingRegister(id))
    }

    /// Total amount of `token_id` across the asset list.
    pub fn token_amount(&self, token_id: &str) -> u64 {
        self.assets
            .iter()
            .filter(|a| a.token_id == token_id)
            .fold(0u64, |acc, a| acc.saturating_add(a.amount))
    }

    pub fn holds_token(&self, token_id: &str) -> bool {
        self.assets.iter().any(|a| a.token_id == token_id)
    }
}

/// The two derivative tokens.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Token {
    /// Neutron, pegged to one gram of gold
    Stable,
    /// Proton, carries the residual reserve value
    Volatile,
}

impl Token {
    pub fn name(&self) -> &'static str {
        match self {
            Token::Stable => "stable",
            Token::Volatile => "volatile",
        }
    }

    pub fn other(&self) -> Self {
        match self {
            Token::Stable => Token::Volatile,
            Token::Volatile => Token::Stable,
        }
    }
}

/// Decaying protocol-fee bookkeeping stored in R6.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FeeAccumulator {
    pub collected: u64,
    pub max: u64,
}

/// Validated view of the protocol reserve box.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReserveBox {
    raw: RawBox,
    stable_id: String,
    volatile_id: String,
    stable_total: u64,
    volatile_total: u64,
    dev_tree: ErgoTree,
    fees: FeeAccumulator,
    volume_to_stable: VolumeBuckets,
    volume_to_volatile: VolumeBuckets,
    last_epoch_height: u64,
    dust: u64,
    epoch_len: u64,
    bucket_len: usize,
}

impl ReserveBox {
    /// Parse and validate a reserve box snapshot.
    pub fn from_raw(raw: RawBox, config: &ProtocolConfig) -> Result<Self, ReactorError> {
        let (stable_total, volatile_total) =
            decode_long_pair(raw.required_register(RegisterId::R4)?)?;
        let dev_tree = decode_tree(raw.required_register(RegisterId::R5)?)?;
        let (collected, max) = decode_long_pair(raw.required_register(RegisterId::R6)?)?;
        let volume_to_stable =
            VolumeBuckets::new(decode_long_array(raw.required_register(RegisterId::R7)?)?);
        let volume_to_volatile =
            VolumeBuckets::new(decode_long_array(raw.required_register(RegisterId::R8)?)?);
        let last_epoch_height = decode_number(raw.required_register(RegisterId::R9)?)?;

        let reserve = Self {
            stable_id: config.tokens.stable.clone(),
            volatile_id: config.tokens.volatile.clone(),
            stable_total,
            volatile_total,
            dev_tree,
            fees: FeeAccumulator { collected, max },
            volume_to_stable,
            volume_to_volatile,
            last_epoch_height,
            dust: config.min_box_value,
            epoch_len: config.epoch_len,
            bucket_len: config.bucket_len,
            raw,
        };

        for token in [Token::Stable, Token::Volatile] {
            if !reserve.raw.holds_token(reserve.token_id(token)) {
                return Err(DomainError::MissingToken(token.name()).into());
            }
            let total = reserve.total_supply(token);
            let balance = reserve.balance(token);
            if balance > total {
                return Err(DomainError::NegativeCirculation {
                    token: token.name(),
                    total,
                    balance,
                }
                .into());
            }
        }
        Ok(reserve)
    }

    pub fn raw(&self) -> &RawBox {
        &self.raw
    }

    pub fn box_id(&self) -> &str {
        &self.raw.box_id
    }

    /// Locked nanoERG, dust included.
    pub fn value(&self) -> u64 {
        self.raw.value
    }

    pub fn token_id(&self, token: Token) -> &str {
        match token {
            Token::Stable => &self.stable_id,
            Token::Volatile => &self.volatile_id,
        }
    }

    /// Tokens still held by the box, i.e. not in circulation.
    pub fn balance(&self, token: Token) -> u64 {
        self.raw.token_amount(self.token_id(token))
    }

    pub fn total_supply(&self, token: Token) -> u64 {
        match token {
            Token::Stable => self.stable_total,
            Token::Volatile => self.volatile_total,
        }
    }

    pub fn circulating_supply(&self, token: Token) -> u64 {
        // balance <= total is checked in from_raw
        self.total_supply(token) - self.balance(token)
    }

    /// Reserve backing the circulating tokens: box value minus the dust.
    pub fn reserved_fissioned(&self) -> Result<u64, DomainError> {
        match self.raw.value.checked_sub(self.dust) {
            Some(r) if r > 0 => Ok(r),
            _ => Err(DomainError::ReserveDepleted(self.raw.value)),
        }
    }

    pub fn fee_accumulator(&self) -> FeeAccumulator {
        self.fees
    }

    pub fn dev_tree(&self) -> &ErgoTree {
        &self.dev_tree
    }

    pub fn volume(&self, direction: Direction) -> &VolumeBuckets {
        match direction {
            Direction::ToStable => &self.volume_to_stable,
            Direction::ToVolatile => &self.volume_to_volatile,
        }
    }

    pub fn last_epoch_height(&self) -> u64 {
        self.last_epoch_height
    }

    pub fn epoch_len(&self) -> u64 {
        self.epoch_len
    }

    pub fn bucket_len(&self) -> usize {
        self.bucket_len
    }

    /// Epochs elapsed between the box's last update and `height`.
    pub fn epochs_elapsed(&self, height: u64) -> usize {
        epochs_elapsed(self.last_epoch_height, height, self.epoch_len, self.bucket_len)
    }

    /// Window of `direction` aged to `height`, with `amount` added to the
    /// current epoch.
    pub fn projected_volume(
        &self,
        direction: Direction,
        height: u64,
        amount: u64,
    ) -> Result<VolumeBuckets, MathError> {
        self.volume(direction)
            .shifted(self.epochs_elapsed(height), self.bucket_len)
            .with_added(amount)
    }

    /// Projected volume-to-stable window (R7).
    pub fn add_volume(&self, height: u64, amount: u64) -> Result<VolumeBuckets, MathError> {
        self.projected_volume(Direction::ToStable, height, amount)
    }

    /// Projected volume-to-volatile window (R8).
    pub fn sub_volume(&self, height: u64, amount: u64) -> Result<VolumeBuckets, MathError> {
        self.projected_volume(Direction::ToVolatile, height, amount)
    }

    /// Volume of the `days` most recent epochs as stored in the box.
    pub fn accumulate_volume(&self, direction: Direction, days: usize) -> Result<u64, ReactorError> {
        self.volume(direction).accumulate(days, self.bucket_len)
    }

    /// Value for R9 after an operation at `height`.
    pub fn new_epoch_height(&self, height: u64) -> u64 {
        epoch_floor(height, self.epoch_len)
    }

    pub fn new_epoch_register(&self, height: u64) -> Result<String, ReactorError> {
        Ok(encode_number(self.new_epoch_height(height))?)
    }

    /// Value for R6 once `fee` has been collected.
    pub fn new_fee_register(&self, fee: u64) -> Result<String, ReactorError> {
        let collected = self
            .fees
            .collected
            .checked_add(fee)
            .ok_or(MathError::Overflow)?;
        Ok(encode_long_pair(collected, self.fees.max)?)
    }
}

/// Validated view of the gold oracle pool box.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OracleBox {
    raw: RawBox,
    price_per_kg: u64,
}

impl OracleBox {
    pub fn from_raw(raw: RawBox) -> Result<Self, ReactorError> {
        let price_per_kg = decode_number(raw.required_register(RegisterId::R4)?)?;
        Ok(Self { raw, price_per_kg })
    }

    pub fn raw(&self) -> &RawBox {
        &self.raw
    }

    /// nanoERG per kilogram of gold.
    pub fn price_per_kg(&self) -> u64 {
        self.price_per_kg
    }

    /// nanoERG per gram of gold, the value of one stable token.
    pub fn price_per_unit(&self) -> u64 {
        self.price_per_kg / 1000
    }
}
