//! Pricing Engine
//!
//! Pure functions of a reserve snapshot and an oracle snapshot. Ratios are
//! scaled by [`NANO`]; prices are nanoERG per whole token.
//!
//! ## Fusion ratio
//!
//! The share of the reserve backing the stable token:
//!
//! ```text
//! q = min(circ_stable * gold_price_per_gram / reserve, q*)     q* = 0.66
//! ```
//!
//! ## Dynamic fee factor
//!
//! Transmutations pay a fee that grows with the net one-directional volume
//! in the rolling window:
//!
//! ```text
//! phi = phi_0 + phi_1 * max(0, sum(inc) - sum(dec)) / reserve
//! ```
//!
//! | Term    | Value         | Meaning        |
//! |---------|---------------|----------------|
//! | `phi_0` | 5_000_000     | 0.5% base fee  |
//! | `phi_1` | 500_000_000   | 50% slope      |

use crate::{
    boxes::{OracleBox, ReserveBox, Token},
    error::{DomainError, ReactorError},
    math::{mul_div, mul_div_wide, MathError, NANO},
    volume::{Direction, VolumeBuckets},
};
use tracing::debug;

/// Ceiling of the fusion ratio (0.66).
pub const FUSION_RATIO_CEILING: u64 = 660_000_000;

/// Base of the dynamic fee factor (0.5%).
pub const FEE_FACTOR_BASE: u64 = 5_000_000;

/// Slope of the dynamic fee factor (0.5).
pub const FEE_FACTOR_SLOPE: u64 = 500_000_000;

/// Fee withheld from fission output (0.1%).
pub const FISSION_FEE: u64 = 1_000_000;

/// Fee added to fusion input (0.5%).
pub const FUSION_FEE: u64 = 5_000_000;

/// Amounts of both derivative tokens.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct TokenPair {
    pub stable: u64,
    pub volatile: u64,
}

impl TokenPair {
    pub fn get(&self, token: Token) -> u64 {
        match token {
            Token::Stable => self.stable,
            Token::Volatile => self.volatile,
        }
    }
}

/// Result of pricing a transmutation.
///
/// Carries the volume windows the output was priced with, so the transaction
/// writes exactly those windows back.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TransmuteQuote {
    pub direction: Direction,
    pub amount_in: u64,
    pub amount_out: u64,
    /// nanoERG value of `amount_in` at the current price
    pub erg_value: u64,
    /// Dynamic fee factor after the projected volume
    pub fee_factor: u64,
    pub volume_to_stable: VolumeBuckets,
    pub volume_to_volatile: VolumeBuckets,
}

impl TransmuteQuote {
    pub fn token_in(&self) -> Token {
        match self.direction {
            Direction::ToStable => Token::Volatile,
            Direction::ToVolatile => Token::Stable,
        }
    }

    pub fn token_out(&self) -> Token {
        self.token_in().other()
    }
}

/// Prices of the protocol at one snapshot.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PriceSnapshot {
    pub fusion_ratio: u64,
    pub stable_price: u64,
    pub volatile_price: u64,
    pub reserved_fissioned: u64,
    pub circulating: TokenPair,
}

fn circulating(reserve: &ReserveBox, token: Token) -> Result<u64, DomainError> {
    match reserve.circulating_supply(token) {
        0 => Err(DomainError::ZeroCirculatingSupply(token.name())),
        circ => Ok(circ),
    }
}

/// Fraction of the reserve backing the stable token, capped at
/// [`FUSION_RATIO_CEILING`].
pub fn fusion_ratio(reserve: &ReserveBox, oracle: &OracleBox) -> Result<u64, ReactorError> {
    let price = oracle.price_per_unit();
    if price == 0 {
        return Err(DomainError::ZeroOraclePrice.into());
    }
    let reserved = reserve.reserved_fissioned()?;
    let raw = mul_div(reserve.circulating_supply(Token::Stable), price, reserved)?;
    Ok(raw.min(FUSION_RATIO_CEILING))
}

/// nanoERG value of one stable token.
pub fn stable_price(reserve: &ReserveBox, oracle: &OracleBox) -> Result<u64, ReactorError> {
    let circ = circulating(reserve, Token::Stable)?;
    let fr = fusion_ratio(reserve, oracle)?;
    Ok(mul_div(fr, reserve.reserved_fissioned()?, circ)?)
}

/// nanoERG value of one volatile token.
pub fn volatile_price(reserve: &ReserveBox, oracle: &OracleBox) -> Result<u64, ReactorError> {
    let circ = circulating(reserve, Token::Volatile)?;
    let fr = fusion_ratio(reserve, oracle)?;
    Ok(mul_div(NANO - fr, reserve.reserved_fissioned()?, circ)?)
}

pub fn price(reserve: &ReserveBox, oracle: &OracleBox, token: Token) -> Result<u64, ReactorError> {
    match token {
        Token::Stable => stable_price(reserve, oracle),
        Token::Volatile => volatile_price(reserve, oracle),
    }
}

pub fn snapshot(reserve: &ReserveBox, oracle: &OracleBox) -> Result<PriceSnapshot, ReactorError> {
    Ok(PriceSnapshot {
        fusion_ratio: fusion_ratio(reserve, oracle)?,
        stable_price: stable_price(reserve, oracle)?,
        volatile_price: volatile_price(reserve, oracle)?,
        reserved_fissioned: reserve.reserved_fissioned()?,
        circulating: TokenPair {
            stable: reserve.circulating_supply(Token::Stable),
            volatile: reserve.circulating_supply(Token::Volatile),
        },
    })
}

/// Fee factor ("phi-beta") for a trade that increases `increasing` against
/// `decreasing`.
pub fn dynamic_fee_factor(
    reserved_fissioned: u64,
    increasing: &VolumeBuckets,
    decreasing: &VolumeBuckets,
) -> Result<u64, ReactorError> {
    if reserved_fissioned == 0 {
        return Err(DomainError::ReserveDepleted(reserved_fissioned).into());
    }
    let net = increasing.total()?.saturating_sub(decreasing.total()?);
    let slope = mul_div(FEE_FACTOR_SLOPE, net, reserved_fissioned)?;
    Ok(FEE_FACTOR_BASE
        .checked_add(slope)
        .ok_or(MathError::Overflow)?)
}

/// Stable tokens received for `volatile_in` volatile tokens at `height`.
pub fn transmute_to_stable_output(
    reserve: &ReserveBox,
    oracle: &OracleBox,
    volatile_in: u64,
    height: u64,
) -> Result<TransmuteQuote, ReactorError> {
    transmute(reserve, oracle, Direction::ToStable, volatile_in, height)
}

/// Volatile tokens received for `stable_in` stable tokens at `height`.
pub fn transmute_to_volatile_output(
    reserve: &ReserveBox,
    oracle: &OracleBox,
    stable_in: u64,
    height: u64,
) -> Result<TransmuteQuote, ReactorError> {
    transmute(reserve, oracle, Direction::ToVolatile, stable_in, height)
}

fn transmute(
    reserve: &ReserveBox,
    oracle: &OracleBox,
    direction: Direction,
    amount_in: u64,
    height: u64,
) -> Result<TransmuteQuote, ReactorError> {
    let circ_stable = circulating(reserve, Token::Stable)?;
    let circ_volatile = circulating(reserve, Token::Volatile)?;
    let reserved = reserve.reserved_fissioned()?;
    let fr = fusion_ratio(reserve, oracle)?;
    if fr == 0 || fr >= NANO {
        return Err(DomainError::DegenerateFusionRatio(fr).into());
    }

    let (token_in, bump_stable, bump_volatile) = match direction {
        Direction::ToStable => (Token::Volatile, true, false),
        Direction::ToVolatile => (Token::Stable, false, true),
    };
    let erg_value = mul_div(price(reserve, oracle, token_in)?, amount_in, NANO)?;

    let volume_to_stable = reserve.add_volume(height, if bump_stable { erg_value } else { 0 })?;
    let volume_to_volatile =
        reserve.sub_volume(height, if bump_volatile { erg_value } else { 0 })?;

    let fee_factor = match direction {
        Direction::ToStable => dynamic_fee_factor(reserved, &volume_to_stable, &volume_to_volatile)?,
        Direction::ToVolatile => {
            dynamic_fee_factor(reserved, &volume_to_volatile, &volume_to_stable)?
        }
    };
    if fee_factor >= NANO {
        return Err(DomainError::FeeFactorSaturated(fee_factor).into());
    }
    let phi_min = NANO - fee_factor;

    let amount_out = match direction {
        Direction::ToStable => {
            let ratio1 = mul_div(amount_in, phi_min, circ_volatile)?;
            let ratio2 = mul_div(NANO - fr, circ_stable, NANO)?;
            mul_div(ratio1, ratio2, fr)?
        }
        Direction::ToVolatile => {
            let ratio1 = mul_div(amount_in, phi_min, circ_stable)?;
            let ratio2 = mul_div(fr, circ_volatile, NANO)?;
            mul_div(ratio1, ratio2, NANO - fr)?
        }
    };

    debug!(
        ?direction,
        amount_in, amount_out, erg_value, fee_factor, fusion_ratio = fr, "priced transmutation"
    );

    Ok(TransmuteQuote {
        direction,
        amount_in,
        amount_out,
        erg_value,
        fee_factor,
        volume_to_stable,
        volume_to_volatile,
    })
}

/// Tokens minted by locking `erg_amount` nanoERG.
pub fn fission_output(reserve: &ReserveBox, erg_amount: u64) -> Result<TokenPair, ReactorError> {
    let reserved = reserve.reserved_fissioned()?;
    let out = |token| -> Result<u64, ReactorError> {
        let circ = circulating(reserve, token)?;
        Ok(mul_div_wide(
            &[erg_amount, circ, NANO - FISSION_FEE],
            &[reserved, NANO],
        )?)
    };
    Ok(TokenPair {
        stable: out(Token::Stable)?,
        volatile: out(Token::Volatile)?,
    })
}

/// Tokens burned to redeem `erg_amount` nanoERG.
pub fn fusion_input(reserve: &ReserveBox, erg_amount: u64) -> Result<TokenPair, ReactorError> {
    let reserved = reserve.reserved_fissioned()?;
    let input = |token| -> Result<u64, ReactorError> {
        let circ = circulating(reserve, token)?;
        Ok(mul_div_wide(
            &[erg_amount, circ, NANO],
            &[reserved, NANO - FUSION_FEE],
        )?)
    };
    Ok(TokenPair {
        stable: input(Token::Stable)?,
        volatile: input(Token::Volatile)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        boxes::tests::{oracle_raw, reserve_raw},
        config::tests::test_config,
    };
    use assert_matches::assert_matches;

    const RESERVED: u64 = 100_000_000_000;
    const DUST: u64 = 1_000_000;

    /// Reserve with 100 ERG fissioned and the given circulating supplies.
    fn reserve(circ_stable: u64, circ_volatile: u64) -> ReserveBox {
        let config = test_config();
        let total = 1_000_000_000_000_000;
        let raw = reserve_raw(
            &config,
            RESERVED + DUST,
            (total, total),
            (total - circ_stable, total - circ_volatile),
            (0, 1_000_000_000),
        );
        ReserveBox::from_raw(raw, &config).unwrap()
    }

    fn oracle(price_per_gram: u64) -> OracleBox {
        OracleBox::from_raw(oracle_raw(price_per_gram * 1000)).unwrap()
    }

    #[test]
    fn test_fusion_ratio_below_ceiling() {
        // 50 stable * 1 ERG/gram / 100 ERG = 0.5
        let r = reserve(50_000_000_000, 20_000_000_000);
        assert_eq!(fusion_ratio(&r, &oracle(1_000_000_000)).unwrap(), 500_000_000);
    }

    #[test]
    fn test_fusion_ratio_clamped() {
        let r = reserve(50_000_000_000, 20_000_000_000);
        assert_eq!(
            fusion_ratio(&r, &oracle(2_000_000_000)).unwrap(),
            FUSION_RATIO_CEILING
        );
    }

    #[test]
    fn test_prices() {
        let r = reserve(50_000_000_000, 20_000_000_000);
        let o = oracle(1_000_000_000);
        // 0.5 * 100 ERG / 50 tokens = 1 ERG
        assert_eq!(stable_price(&r, &o).unwrap(), 1_000_000_000);
        // 0.5 * 100 ERG / 20 tokens = 2.5 ERG
        assert_eq!(volatile_price(&r, &o).unwrap(), 2_500_000_000);
    }

    #[test]
    fn test_zero_oracle_price() {
        let r = reserve(50_000_000_000, 20_000_000_000);
        assert_matches!(
            fusion_ratio(&r, &oracle(0)),
            Err(ReactorError::Domain(DomainError::ZeroOraclePrice))
        );
    }

    #[test]
    fn test_zero_circulating_supply() {
        let r = reserve(0, 20_000_000_000);
        assert_matches!(
            stable_price(&r, &oracle(1_000_000_000)),
            Err(ReactorError::Domain(DomainError::ZeroCirculatingSupply("stable")))
        );
        assert_matches!(
            fission_output(&r, 1_000_000_000),
            Err(ReactorError::Domain(DomainError::ZeroCirculatingSupply("stable")))
        );
    }

    #[test]
    fn test_dynamic_fee_factor() {
        let empty = VolumeBuckets::new(vec![0; 14]);
        assert_eq!(dynamic_fee_factor(RESERVED, &empty, &empty).unwrap(), FEE_FACTOR_BASE);

        // 10% of the reserve in net volume adds 5%
        let inc = VolumeBuckets::new(vec![10_000_000_000, 0]);
        assert_eq!(
            dynamic_fee_factor(RESERVED, &inc, &empty).unwrap(),
            FEE_FACTOR_BASE + 50_000_000
        );
        // Opposing volume cancels, never goes negative
        assert_eq!(dynamic_fee_factor(RESERVED, &empty, &inc).unwrap(), FEE_FACTOR_BASE);

        assert_matches!(
            dynamic_fee_factor(0, &empty, &empty),
            Err(ReactorError::Domain(DomainError::ReserveDepleted(0)))
        );
    }

    #[test]
    fn test_fee_factor_saturated() {
        let r = reserve(50_000_000_000, 20_000_000_000);
        // 250 ERG of one-directional volume against a 100 ERG reserve
        let err = transmute_to_stable_output(&r, &oracle(1_000_000_000), 100_000_000_000, 1_500);
        assert_matches!(err, Err(ReactorError::Domain(DomainError::FeeFactorSaturated(_))));
    }

    #[test]
    fn test_transmute_to_stable() {
        let r = reserve(50_000_000_000, 20_000_000_000);
        let o = oracle(1_000_000_000);
        let quote = transmute_to_stable_output(&r, &o, 1_000_000_000, 1_500).unwrap();
        // 1 volatile = 2.5 ERG
        assert_eq!(quote.erg_value, 2_500_000_000);
        assert_eq!(quote.volume_to_stable.as_slice()[0], 2_500_000_000);
        assert_eq!(quote.volume_to_volatile.as_slice()[0], 0);
        // 0.5% + 0.5 * 2.5 / 100
        assert_eq!(quote.fee_factor, 17_500_000);
        // (1e9 * 0.9825e9 / 20e9) * (0.5e9 * 50e9 / 1e9) / 0.5e9
        assert_eq!(quote.amount_out, 2_456_250_000);
        assert_eq!(quote.token_in(), Token::Volatile);
        assert_eq!(quote.token_out(), Token::Stable);
    }

    #[test]
    fn test_transmute_round_trip_loses_value() {
        let r = reserve(50_000_000_000, 20_000_000_000);
        let o = oracle(1_000_000_000);
        let to_stable = transmute_to_stable_output(&r, &o, 1_000_000_000, 1_500).unwrap();
        let back = transmute_to_volatile_output(&r, &o, to_stable.amount_out, 1_500).unwrap();
        assert!(back.amount_out < 1_000_000_000);
    }

    #[test]
    fn test_fission_output_equal_supplies() {
        let r = reserve(RESERVED, RESERVED);
        let out = fission_output(&r, 1_000_000_000).unwrap();
        assert_eq!(out.stable, out.volatile);
        assert_eq!(out.stable, 999_000_000);
    }

    #[test]
    fn test_fusion_input() {
        let r = reserve(RESERVED, RESERVED);
        let input = fusion_input(&r, 1_000_000_000).unwrap();
        // 1e9 * 1e9 / 0.995e9
        assert_eq!(input.stable, 1_005_025_125);
        assert_eq!(input.stable, input.volatile);
    }

    #[test]
    fn test_pricing_is_deterministic() {
        let r = reserve(50_000_000_000, 20_000_000_000);
        let o = oracle(1_000_000_000);
        assert_eq!(snapshot(&r, &o).unwrap(), snapshot(&r, &o).unwrap());
    }
}
