//! Fee Calculator
//!
//! Every operation pays up to three fee boxes plus the miner fee:
//!
//! | Box    | Value                                           | Paid on        |
//! |--------|-------------------------------------------------|----------------|
//! | dev    | decayed protocol fee + `min_fee`                | all operations |
//! | ui     | `ui_rate * erg / 100_000 + min_fee`             | rate > 0       |
//! | oracle | `oracle_rate * erg / 100_000 + min_fee`         | transmutations |
//!
//! The protocol fee decays linearly as the reserve's fee accumulator fills:
//!
//! ```text
//! fee = floor(floor(dev_rate * erg / 100_000) * (max - collected) / max)
//! ```
//!
//! Once `collected >= max` the protocol fee is zero, but the dev box still
//! carries `min_fee`.

use crate::{
    boxes::{OracleBox, ReserveBox, Token},
    config::ProtocolConfig,
    error::{DomainError, ReactorError},
    math::{checked_sum, mul_div, FEE_DENOMINATOR, NANO},
    pricing,
    registers::ErgoTree,
};
use tracing::debug;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FeeKind {
    Dev,
    Ui,
    Oracle,
}

/// A fee output.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FeeBox {
    pub kind: FeeKind,
    pub value: u64,
    pub tree: ErgoTree,
}

/// The fee outputs of one operation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FeeBoxes {
    pub dev: FeeBox,
    pub ui: Option<FeeBox>,
    pub oracle: Option<FeeBox>,
    /// Decayed protocol fee, credited to the reserve's fee accumulator
    pub protocol_fee: u64,
}

impl FeeBoxes {
    /// Fee boxes in output order: dev, ui, oracle.
    pub fn iter(&self) -> impl Iterator<Item = &FeeBox> {
        std::iter::once(&self.dev)
            .chain(self.ui.as_ref())
            .chain(self.oracle.as_ref())
    }

    pub fn value_of(&self, kind: FeeKind) -> u64 {
        self.iter()
            .find(|b| b.kind == kind)
            .map_or(0, |b| b.value)
    }
}

/// Absolute fee amounts in nanoERG.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct FeeBreakdown {
    pub protocol_fee: u64,
    pub ui_fee: u64,
    pub oracle_fee: u64,
    pub miner_fee: u64,
    pub total_fee: u64,
}

/// Fees as fractions of the operation's nanoERG amount, scaled by 1e9.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct FeeShares {
    pub protocol_fee: u64,
    pub ui_fee: u64,
    pub oracle_fee: u64,
    pub miner_fee: u64,
    pub total_fee: u64,
}

impl FeeBreakdown {
    /// Each component relative to `erg_amount`.
    pub fn shares(&self, erg_amount: u64) -> Result<FeeShares, ReactorError> {
        if erg_amount == 0 {
            return Err(DomainError::ZeroAmount.into());
        }
        let share = |v: u64| mul_div(v, NANO, erg_amount);
        Ok(FeeShares {
            protocol_fee: share(self.protocol_fee)?,
            ui_fee: share(self.ui_fee)?,
            oracle_fee: share(self.oracle_fee)?,
            miner_fee: share(self.miner_fee)?,
            total_fee: share(self.total_fee)?,
        })
    }
}

pub struct FeeCalculator<'a> {
    config: &'a ProtocolConfig,
}

impl<'a> FeeCalculator<'a> {
    pub fn new(config: &'a ProtocolConfig) -> Self {
        Self { config }
    }

    /// Decayed protocol fee on `erg_amount`.
    pub fn protocol_fee(&self, reserve: &ReserveBox, erg_amount: u64) -> Result<u64, ReactorError> {
        let acc = reserve.fee_accumulator();
        if acc.max == 0 {
            return Err(DomainError::ZeroFeeCap.into());
        }
        if acc.collected >= acc.max {
            return Ok(0);
        }
        let undecayed = mul_div(self.config.dev_fee_rate, erg_amount, FEE_DENOMINATOR)?;
        Ok(mul_div(undecayed, acc.max - acc.collected, acc.max)?)
    }

    fn rate_fee(&self, rate: u64, erg_amount: u64) -> Result<u64, ReactorError> {
        let fee = mul_div(rate, erg_amount, FEE_DENOMINATOR)?;
        Ok(checked_sum([fee, self.config.min_fee])?)
    }

    /// Fee outputs for an operation moving `erg_amount` nanoERG.
    pub fn fee_boxes(
        &self,
        reserve: &ReserveBox,
        erg_amount: u64,
        include_oracle: bool,
    ) -> Result<FeeBoxes, ReactorError> {
        let protocol_fee = self.protocol_fee(reserve, erg_amount)?;
        let dev = FeeBox {
            kind: FeeKind::Dev,
            value: checked_sum([protocol_fee, self.config.min_fee])?,
            tree: self
                .config
                .dev_tree
                .clone()
                .unwrap_or_else(|| reserve.dev_tree().clone()),
        };

        let ui = match (&self.config.ui_tree, self.config.ui_fee_rate) {
            (_, 0) => None,
            (Some(tree), rate) => Some(FeeBox {
                kind: FeeKind::Ui,
                value: self.rate_fee(rate, erg_amount)?,
                tree: tree.clone(),
            }),
            (None, _) => {
                return Err(ReactorError::Configuration(
                    "ui_tree is required when ui_fee_rate is set".to_string(),
                ))
            }
        };

        let oracle = if include_oracle && self.config.oracle_fee_rate > 0 {
            Some(FeeBox {
                kind: FeeKind::Oracle,
                value: self.rate_fee(self.config.oracle_fee_rate, erg_amount)?,
                tree: self.config.oracle_fee_tree.clone(),
            })
        } else {
            None
        };

        debug!(
            erg_amount,
            protocol_fee,
            dev = dev.value,
            ui = ui.as_ref().map(|b| b.value),
            oracle = oracle.as_ref().map(|b| b.value),
            "computed fee boxes"
        );

        Ok(FeeBoxes {
            dev,
            ui,
            oracle,
            protocol_fee,
        })
    }

    /// Breakdown of a given set of fee boxes plus the miner fee.
    pub fn breakdown(&self, boxes: &FeeBoxes) -> Result<FeeBreakdown, ReactorError> {
        let protocol_fee = boxes.value_of(FeeKind::Dev);
        let ui_fee = boxes.value_of(FeeKind::Ui);
        let oracle_fee = boxes.value_of(FeeKind::Oracle);
        let miner_fee = self.config.miner_fee;
        Ok(FeeBreakdown {
            protocol_fee,
            ui_fee,
            oracle_fee,
            miner_fee,
            total_fee: checked_sum([protocol_fee, ui_fee, oracle_fee, miner_fee])?,
        })
    }

    pub fn breakdown_fission(
        &self,
        reserve: &ReserveBox,
        erg_amount: u64,
    ) -> Result<FeeBreakdown, ReactorError> {
        self.breakdown(&self.fee_boxes(reserve, erg_amount, false)?)
    }

    pub fn breakdown_fusion(
        &self,
        reserve: &ReserveBox,
        erg_amount: u64,
    ) -> Result<FeeBreakdown, ReactorError> {
        self.breakdown(&self.fee_boxes(reserve, erg_amount, false)?)
    }

    /// Fees for transmuting `volatile_in` volatile tokens.
    pub fn breakdown_transmute_to_stable(
        &self,
        reserve: &ReserveBox,
        oracle: &OracleBox,
        volatile_in: u64,
    ) -> Result<FeeBreakdown, ReactorError> {
        let erg_value = token_value(reserve, oracle, Token::Volatile, volatile_in)?;
        self.breakdown(&self.fee_boxes(reserve, erg_value, true)?)
    }

    /// Fees for transmuting `stable_in` stable tokens.
    pub fn breakdown_transmute_to_volatile(
        &self,
        reserve: &ReserveBox,
        oracle: &OracleBox,
        stable_in: u64,
    ) -> Result<FeeBreakdown, ReactorError> {
        let erg_value = token_value(reserve, oracle, Token::Stable, stable_in)?;
        self.breakdown(&self.fee_boxes(reserve, erg_value, true)?)
    }

    pub fn shares_fission(
        &self,
        reserve: &ReserveBox,
        erg_amount: u64,
    ) -> Result<FeeShares, ReactorError> {
        self.breakdown_fission(reserve, erg_amount)?
            .shares(erg_amount)
    }

    pub fn shares_fusion(
        &self,
        reserve: &ReserveBox,
        erg_amount: u64,
    ) -> Result<FeeShares, ReactorError> {
        self.breakdown_fusion(reserve, erg_amount)?
            .shares(erg_amount)
    }

    pub fn shares_transmute_to_stable(
        &self,
        reserve: &ReserveBox,
        oracle: &OracleBox,
        volatile_in: u64,
    ) -> Result<FeeShares, ReactorError> {
        let erg_value = token_value(reserve, oracle, Token::Volatile, volatile_in)?;
        self.breakdown_transmute_to_stable(reserve, oracle, volatile_in)?
            .shares(erg_value)
    }

    pub fn shares_transmute_to_volatile(
        &self,
        reserve: &ReserveBox,
        oracle: &OracleBox,
        stable_in: u64,
    ) -> Result<FeeShares, ReactorError> {
        let erg_value = token_value(reserve, oracle, Token::Stable, stable_in)?;
        self.breakdown_transmute_to_volatile(reserve, oracle, stable_in)?
            .shares(erg_value)
    }
}

/// nanoERG value of `amount` tokens at the current price.
pub fn token_value(
    reserve: &ReserveBox,
    oracle: &OracleBox,
    token: Token,
    amount: u64,
) -> Result<u64, ReactorError> {
    Ok(mul_div(pricing::price(reserve, oracle, token)?, amount, NANO)?)
}
