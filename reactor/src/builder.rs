//! Reactor Transaction Builder
//!
//! Each operation is a single-shot transform from fresh snapshots to a
//! balanced [`TransactionPlan`]:
//!
//! ```text
//! {reserve, oracle, user boxes, amount, height} -> {new reserve, fee boxes, change}
//! ```
//!
//! Output layout:
//!
//! | Operation      | Inputs                       | Outputs                                  |
//! |----------------|------------------------------|------------------------------------------|
//! | fission/fusion | reserve, user..              | reserve, change, dev, ui?                |
//! | transmutation  | reserve, user.., buyback     | reserve, change, buyback, dev, ui?       |
//!
//! The oracle box is always the single data input. Every output is created at
//! the highest creation height among the inputs. The buyback input of a
//! transmutation carries the context extension [`TRANSMUTE_EXTENSION`].

use crate::{
    boxes::{Asset, OracleBox, RawBox, ReserveBox, Token},
    config::ProtocolConfig,
    error::{DomainError, ReactorError},
    fees::{FeeBoxes, FeeBreakdown, FeeCalculator, FeeKind, FeeShares},
    math::checked_sum,
    plan::{token_totals, OutputBox, PlanInput, TransactionPlan, TRANSMUTE_EXTENSION},
    pricing::{self, TokenPair, TransmuteQuote},
    registers::{ErgoTree, RegisterId},
    volume::Direction,
};
use tracing::{debug, warn};

/// A user request against the reactor.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Operation {
    /// Lock `erg_amount` nanoERG, mint both tokens
    Fission { erg_amount: u64 },
    /// Burn both tokens, redeem `erg_amount` nanoERG
    Fusion { erg_amount: u64 },
    /// Convert volatile tokens into stable tokens
    TransmuteToStable { volatile_amount: u64 },
    /// Convert stable tokens into volatile tokens
    TransmuteToVolatile { stable_amount: u64 },
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Fission { .. } => "fission",
            Operation::Fusion { .. } => "fusion",
            Operation::TransmuteToStable { .. } => "transmute-to-stable",
            Operation::TransmuteToVolatile { .. } => "transmute-to-volatile",
        }
    }

    pub fn amount(&self) -> u64 {
        match *self {
            Operation::Fission { erg_amount } | Operation::Fusion { erg_amount } => erg_amount,
            Operation::TransmuteToStable { volatile_amount } => volatile_amount,
            Operation::TransmuteToVolatile { stable_amount } => stable_amount,
        }
    }

    pub fn is_transmutation(&self) -> bool {
        matches!(
            self,
            Operation::TransmuteToStable { .. } | Operation::TransmuteToVolatile { .. }
        )
    }
}

/// An operation with the context it runs in.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OperationRequest {
    pub operation: Operation,
    /// Current ledger height
    pub height: u64,
    /// Boxes the user spends; change returns to the script of the first one
    pub user_boxes: Vec<RawBox>,
}

/// What an operation gives and takes, for preview.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Quote {
    pub operation: Operation,
    /// nanoERG the fees are computed on
    pub erg_value: u64,
    /// Tokens the user receives
    pub receive: TokenPair,
    /// Tokens the user gives up
    pub spend: TokenPair,
    pub fees: FeeBreakdown,
    pub shares: FeeShares,
    /// Dynamic fee factor, transmutations only
    pub fee_factor: Option<u64>,
}

pub struct TransactionBuilder<'a> {
    config: &'a ProtocolConfig,
}

impl<'a> TransactionBuilder<'a> {
    pub fn new(config: &'a ProtocolConfig) -> Self {
        Self { config }
    }

    fn fees(&self) -> FeeCalculator<'a> {
        FeeCalculator::new(self.config)
    }

    /// Build the plan for `request`. Transmutations need the buyback box.
    pub fn build(
        &self,
        reserve: &ReserveBox,
        oracle: &OracleBox,
        buyback: Option<&RawBox>,
        request: &OperationRequest,
    ) -> Result<TransactionPlan, ReactorError> {
        let require_buyback = || {
            buyback.ok_or_else(|| {
                ReactorError::Configuration("transmutation requires the buyback box".to_string())
            })
        };
        match request.operation {
            Operation::Fission { erg_amount } => {
                self.fission(reserve, oracle, &request.user_boxes, erg_amount)
            }
            Operation::Fusion { erg_amount } => {
                self.fusion(reserve, oracle, &request.user_boxes, erg_amount)
            }
            Operation::TransmuteToStable { volatile_amount } => self.transmute_to_stable(
                reserve,
                oracle,
                &request.user_boxes,
                require_buyback()?,
                volatile_amount,
                request.height,
            ),
            Operation::TransmuteToVolatile { stable_amount } => self.transmute_to_volatile(
                reserve,
                oracle,
                &request.user_boxes,
                require_buyback()?,
                stable_amount,
                request.height,
            ),
        }
    }

    /// Amounts and fees of `operation` without building a transaction.
    pub fn quote(
        &self,
        reserve: &ReserveBox,
        oracle: &OracleBox,
        operation: Operation,
        height: u64,
    ) -> Result<Quote, ReactorError> {
        let fees = self.fees();
        let (erg_value, receive, spend, breakdown, fee_factor) = match operation {
            Operation::Fission { erg_amount } => (
                erg_amount,
                pricing::fission_output(reserve, erg_amount)?,
                TokenPair::default(),
                fees.breakdown_fission(reserve, erg_amount)?,
                None,
            ),
            Operation::Fusion { erg_amount } => (
                erg_amount,
                TokenPair::default(),
                pricing::fusion_input(reserve, erg_amount)?,
                fees.breakdown_fusion(reserve, erg_amount)?,
                None,
            ),
            Operation::TransmuteToStable { volatile_amount } => {
                let q = pricing::transmute_to_stable_output(reserve, oracle, volatile_amount, height)?;
                (
                    q.erg_value,
                    TokenPair { stable: q.amount_out, volatile: 0 },
                    TokenPair { stable: 0, volatile: volatile_amount },
                    fees.breakdown(&fees.fee_boxes(reserve, q.erg_value, true)?)?,
                    Some(q.fee_factor),
                )
            }
            Operation::TransmuteToVolatile { stable_amount } => {
                let q = pricing::transmute_to_volatile_output(reserve, oracle, stable_amount, height)?;
                (
                    q.erg_value,
                    TokenPair { stable: 0, volatile: q.amount_out },
                    TokenPair { stable: stable_amount, volatile: 0 },
                    fees.breakdown(&fees.fee_boxes(reserve, q.erg_value, true)?)?,
                    Some(q.fee_factor),
                )
            }
        };
        Ok(Quote {
            operation,
            erg_value,
            receive,
            spend,
            fees: breakdown,
            shares: breakdown.shares(erg_value)?,
            fee_factor,
        })
    }

    /// Lock `erg_amount` nanoERG and mint both tokens to the user.
    pub fn fission(
        &self,
        reserve: &ReserveBox,
        oracle: &OracleBox,
        user_boxes: &[RawBox],
        erg_amount: u64,
    ) -> Result<TransactionPlan, ReactorError> {
        check_request(user_boxes, erg_amount)?;
        let minted = pricing::fission_output(reserve, erg_amount)?;
        let fees = self.fees().fee_boxes(reserve, erg_amount, false)?;
        let height = creation_height(reserve.raw(), user_boxes, None);

        let mut reserve_out = reserve_output(
            reserve,
            checked_sum([reserve.value(), erg_amount])?,
            take(reserve, Token::Stable, minted.stable)?,
            take(reserve, Token::Volatile, minted.volatile)?,
            height,
        );
        reserve_out
            .registers
            .insert(RegisterId::R6, reserve.new_fee_register(fees.protocol_fee)?);

        debug!(erg_amount, ?minted, "building fission");
        self.assemble(reserve, oracle, user_boxes, None, reserve_out, None, &fees, height)
    }

    /// Burn both tokens from the user to redeem `erg_amount` nanoERG.
    pub fn fusion(
        &self,
        reserve: &ReserveBox,
        oracle: &OracleBox,
        user_boxes: &[RawBox],
        erg_amount: u64,
    ) -> Result<TransactionPlan, ReactorError> {
        check_request(user_boxes, erg_amount)?;
        let available = reserve.reserved_fissioned()?;
        if erg_amount > available {
            return Err(DomainError::ExceedsReserve {
                requested: erg_amount,
                available,
            }
            .into());
        }
        let burned = pricing::fusion_input(reserve, erg_amount)?;
        let fees = self.fees().fee_boxes(reserve, erg_amount, false)?;
        let height = creation_height(reserve.raw(), user_boxes, None);

        let mut reserve_out = reserve_output(
            reserve,
            reserve.value() - erg_amount,
            checked_sum([reserve.balance(Token::Stable), burned.stable])?,
            checked_sum([reserve.balance(Token::Volatile), burned.volatile])?,
            height,
        );
        reserve_out
            .registers
            .insert(RegisterId::R6, reserve.new_fee_register(fees.protocol_fee)?);

        debug!(erg_amount, ?burned, "building fusion");
        self.assemble(reserve, oracle, user_boxes, None, reserve_out, None, &fees, height)
    }

    /// Convert `volatile_amount` volatile tokens into stable tokens.
    pub fn transmute_to_stable(
        &self,
        reserve: &ReserveBox,
        oracle: &OracleBox,
        user_boxes: &[RawBox],
        buyback: &RawBox,
        volatile_amount: u64,
        height: u64,
    ) -> Result<TransactionPlan, ReactorError> {
        check_request(user_boxes, volatile_amount)?;
        let quote = pricing::transmute_to_stable_output(reserve, oracle, volatile_amount, height)?;
        self.transmute(reserve, oracle, user_boxes, buyback, quote, height)
    }

    /// Convert `stable_amount` stable tokens into volatile tokens.
    pub fn transmute_to_volatile(
        &self,
        reserve: &ReserveBox,
        oracle: &OracleBox,
        user_boxes: &[RawBox],
        buyback: &RawBox,
        stable_amount: u64,
        height: u64,
    ) -> Result<TransactionPlan, ReactorError> {
        check_request(user_boxes, stable_amount)?;
        let quote = pricing::transmute_to_volatile_output(reserve, oracle, stable_amount, height)?;
        self.transmute(reserve, oracle, user_boxes, buyback, quote, height)
    }

    fn transmute(
        &self,
        reserve: &ReserveBox,
        oracle: &OracleBox,
        user_boxes: &[RawBox],
        buyback: &RawBox,
        quote: TransmuteQuote,
        height: u64,
    ) -> Result<TransactionPlan, ReactorError> {
        let buyback_nft = &self.config.tokens.oracle_buyback_nft;
        if !buyback_nft.is_empty() && !buyback.holds_token(buyback_nft) {
            return Err(ReactorError::Configuration(format!(
                "box {} does not hold the oracle buyback token",
                buyback.box_id
            )));
        }

        let fees = self.fees().fee_boxes(reserve, quote.erg_value, true)?;
        let out_height = creation_height(reserve.raw(), user_boxes, Some(buyback));

        let token_in = quote.token_in();
        let token_out = quote.token_out();
        let balance_in = checked_sum([reserve.balance(token_in), quote.amount_in])?;
        let balance_out = take(reserve, token_out, quote.amount_out)?;
        let (stable_balance, volatile_balance) = match quote.direction {
            Direction::ToStable => (balance_out, balance_in),
            Direction::ToVolatile => (balance_in, balance_out),
        };

        let mut reserve_out =
            reserve_output(reserve, reserve.value(), stable_balance, volatile_balance, out_height);
        let registers = &mut reserve_out.registers;
        registers.insert(RegisterId::R6, reserve.new_fee_register(fees.protocol_fee)?);
        registers.insert(RegisterId::R7, quote.volume_to_stable.encode()?);
        registers.insert(RegisterId::R8, quote.volume_to_volatile.encode()?);
        registers.insert(RegisterId::R9, reserve.new_epoch_register(height)?);

        // The oracle fee is paid into the buyback box, which is recreated
        // under the oracle fee script with its tokens intact.
        let oracle_fee = fees.oracle.as_ref().map_or(0, |b| b.value);
        let mut buyback_out = OutputBox::new(
            checked_sum([oracle_fee, buyback.value])?,
            fees.oracle
                .as_ref()
                .map_or_else(|| self.config.oracle_fee_tree.clone(), |b| b.tree.clone()),
            out_height,
        );
        buyback_out.assets = buyback.assets.clone();

        debug!(
            direction = ?quote.direction,
            amount_in = quote.amount_in,
            amount_out = quote.amount_out,
            erg_value = quote.erg_value,
            fee_factor = quote.fee_factor,
            "building transmutation"
        );
        self.assemble(
            reserve,
            oracle,
            user_boxes,
            Some(buyback),
            reserve_out,
            Some(buyback_out),
            &fees,
            out_height,
        )
    }

    /// Lay out inputs and outputs, compute change and verify the balance.
    #[allow(clippy::too_many_arguments)]
    fn assemble(
        &self,
        reserve: &ReserveBox,
        oracle: &OracleBox,
        user_boxes: &[RawBox],
        buyback: Option<&RawBox>,
        reserve_out: OutputBox,
        buyback_out: Option<OutputBox>,
        fees: &FeeBoxes,
        height: u64,
    ) -> Result<TransactionPlan, ReactorError> {
        let mut inputs = Vec::with_capacity(user_boxes.len() + 2);
        inputs.push(PlanInput::new(reserve.raw().clone()));
        inputs.extend(user_boxes.iter().cloned().map(PlanInput::new));
        if let Some(buyback) = buyback {
            let mut input = PlanInput::new(buyback.clone());
            input
                .extension
                .insert(TRANSMUTE_EXTENSION.0, TRANSMUTE_EXTENSION.1.to_string());
            inputs.push(input);
        }

        let no_buyback = buyback_out.is_none();
        let fee_outputs = fees
            .iter()
            .filter(|b| no_buyback || b.kind != FeeKind::Oracle)
            .map(|b| OutputBox::new(b.value, b.tree.clone(), height));

        let mut payouts = vec![reserve_out];
        payouts.extend(buyback_out);
        payouts.extend(fee_outputs);

        let spent: Vec<&RawBox> = inputs.iter().map(|i| &i.raw).collect();
        let change = compute_change(
            &spent,
            &payouts,
            self.config.miner_fee,
            user_boxes[0].ergo_tree.clone(),
            height,
        )?;
        if change.value < self.config.min_box_value {
            warn!(
                value = change.value,
                min = self.config.min_box_value,
                "change box is below the minimum box value"
            );
        }

        let mut outputs = Vec::with_capacity(payouts.len() + 1);
        let mut payouts = payouts.into_iter();
        outputs.extend(payouts.next());
        outputs.push(change);
        outputs.extend(payouts);

        let plan = TransactionPlan {
            inputs,
            data_inputs: vec![oracle.raw().clone()],
            outputs,
            miner_fee: self.config.miner_fee,
        };
        plan.check_balanced()?;
        debug!(
            inputs = plan.inputs.len(),
            outputs = plan.outputs.len(),
            miner_fee = plan.miner_fee,
            "plan assembled"
        );
        Ok(plan)
    }
}

fn check_request(user_boxes: &[RawBox], amount: u64) -> Result<(), ReactorError> {
    if user_boxes.is_empty() {
        return Err(ReactorError::NoUserInputs);
    }
    if amount == 0 {
        return Err(DomainError::ZeroAmount.into());
    }
    Ok(())
}

/// Box balance of `token` after `amount` leaves the reserve.
fn take(reserve: &ReserveBox, token: Token, amount: u64) -> Result<u64, ReactorError> {
    let available = reserve.balance(token);
    available.checked_sub(amount).ok_or_else(|| {
        DomainError::ExceedsReserve {
            requested: amount,
            available,
        }
        .into()
    })
}

/// Highest creation height among the spent boxes.
fn creation_height(reserve: &RawBox, user_boxes: &[RawBox], buyback: Option<&RawBox>) -> u64 {
    std::iter::once(reserve)
        .chain(user_boxes)
        .chain(buyback)
        .map(|b| b.creation_height)
        .max()
        .unwrap_or_default()
}

/// Copy of the reserve box with new value and token balances.
fn reserve_output(
    reserve: &ReserveBox,
    value: u64,
    stable_balance: u64,
    volatile_balance: u64,
    height: u64,
) -> OutputBox {
    let raw = reserve.raw();
    let stable_id = reserve.token_id(Token::Stable);
    let volatile_id = reserve.token_id(Token::Volatile);
    let mut out = OutputBox::new(value, raw.ergo_tree.clone(), height);
    out.assets = raw
        .assets
        .iter()
        .map(|a| match a.token_id.as_str() {
            id if id == stable_id => Asset::new(id, stable_balance),
            id if id == volatile_id => Asset::new(id, volatile_balance),
            _ => a.clone(),
        })
        .collect();
    out.registers = raw
        .additional_registers
        .iter()
        .map(|(id, reg)| (*id, reg.wire().to_string()))
        .collect();
    out
}

/// Change output returning whatever the inputs hold beyond `outputs` and the
/// miner fee.
///
/// Fails with [`ReactorError::InsufficientFunds`] when the inputs cannot
/// cover the outputs in nanoERG or in any token.
pub fn compute_change(
    inputs: &[&RawBox],
    outputs: &[OutputBox],
    miner_fee: u64,
    change_tree: ErgoTree,
    creation_height: u64,
) -> Result<OutputBox, ReactorError> {
    let value_in = checked_sum(inputs.iter().map(|b| b.value))?;
    let value_out = checked_sum(outputs.iter().map(|o| o.value).chain([miner_fee]))?;
    let value = value_in
        .checked_sub(value_out)
        .ok_or_else(|| ReactorError::InsufficientFunds {
            asset: "ERG".to_string(),
            short: value_out - value_in,
        })?;

    let tokens_in = token_totals(inputs.iter().flat_map(|b| &b.assets))?;
    let tokens_out = token_totals(outputs.iter().flat_map(|o| &o.assets))?;
    for (token_id, out_amount) in &tokens_out {
        let in_amount = tokens_in.get(token_id).copied().unwrap_or(0);
        if in_amount < *out_amount {
            return Err(ReactorError::InsufficientFunds {
                asset: token_id.clone(),
                short: out_amount - in_amount,
            });
        }
    }

    let mut change = OutputBox::new(value, change_tree, creation_height);
    change.assets = tokens_in
        .into_iter()
        .filter_map(|(token_id, in_amount)| {
            let remainder = in_amount - tokens_out.get(&token_id).copied().unwrap_or(0);
            (remainder > 0).then(|| Asset::new(token_id, remainder))
        })
        .collect();
    Ok(change)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::collections::BTreeMap;

    fn user_box(value: u64, assets: Vec<Asset>) -> RawBox {
        RawBox {
            box_id: "05".repeat(32),
            transaction_id: "06".repeat(32),
            index: 0,
            value,
            ergo_tree: ErgoTree::from_bytes(vec![0x00, 0x08, 0xcd]),
            creation_height: 10,
            assets,
            additional_registers: BTreeMap::new(),
        }
    }

    #[test]
    fn test_change_keeps_positive_remainders() {
        let a = user_box(5_000, vec![Asset::new("x", 10), Asset::new("y", 3)]);
        let b = user_box(1_000, vec![Asset::new("x", 5)]);
        let mut out = OutputBox::new(2_000, ErgoTree::default(), 10);
        out.assets = vec![Asset::new("x", 15), Asset::new("y", 1)];

        let change = compute_change(&[&a, &b], &[out], 1_000, a.ergo_tree.clone(), 10).unwrap();
        assert_eq!(change.value, 3_000);
        assert_eq!(change.assets, vec![Asset::new("y", 2)]);
        assert_eq!(change.ergo_tree, a.ergo_tree);
    }

    #[test]
    fn test_change_insufficient_value() {
        let a = user_box(1_000, vec![]);
        let out = OutputBox::new(900, ErgoTree::default(), 10);
        assert_matches!(
            compute_change(&[&a], &[out], 200, ErgoTree::default(), 10),
            Err(ReactorError::InsufficientFunds { asset, short: 100 }) if asset == "ERG"
        );
    }

    #[test]
    fn test_change_insufficient_token() {
        let a = user_box(10_000, vec![Asset::new("x", 1)]);
        let mut out = OutputBox::new(1, ErgoTree::default(), 10);
        out.assets = vec![Asset::new("x", 3)];
        assert_matches!(
            compute_change(&[&a], &[out], 1, ErgoTree::default(), 10),
            Err(ReactorError::InsufficientFunds { asset, short: 2 }) if asset == "x"
        );
    }

    #[test]
    fn test_exact_spend_yields_empty_change() {
        let a = user_box(1_000, vec![Asset::new("x", 1)]);
        let mut out = OutputBox::new(900, ErgoTree::default(), 10);
        out.assets = vec![Asset::new("x", 1)];
        let change = compute_change(&[&a], &[out], 100, ErgoTree::default(), 10).unwrap();
        assert_eq!(change.value, 0);
        assert!(change.assets.is_empty());
    }

    #[test]
    fn test_operation_accessors() {
        let op = Operation::TransmuteToVolatile { stable_amount: 9 };
        assert_eq!(op.name(), "transmute-to-volatile");
        assert_eq!(op.amount(), 9);
        assert!(op.is_transmutation());
        assert!(!Operation::Fission { erg_amount: 1 }.is_transmutation());
    }
}
