//! Fixed-Point Arithmetic
//!
//! Every amount and ratio in the protocol is an unsigned integer. Ratios are
//! scaled by [`NANO`] (1e9 = 1.0). All divisions truncate toward zero so the
//! SDK can never compute more tokens or ERG than the contract would allow.
//!
//! Intermediate products are carried in 256 bits, enough for the product of
//! any four 64-bit factors.

use displaydoc::Display;
use primitive_types::U256;

/// One whole unit in nano-units (1e9).
pub const NANO: u64 = 1_000_000_000;

/// Denominator of fee rates, which are expressed in parts per 100_000.
pub const FEE_DENOMINATOR: u64 = 100_000;

/// Arithmetic failure.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum MathError {
    /// Division by zero
    DivisionByZero,
    /// Result does not fit in 64 bits
    Overflow,
}

impl std::error::Error for MathError {}

/// `a * b / d`, truncating.
pub fn mul_div(a: u64, b: u64, d: u64) -> Result<u64, MathError> {
    mul_div_wide(&[a, b], &[d])
}

/// Product of `numerators` divided by product of `denominators`, truncating.
///
/// Dividing once by the product of the denominators gives the same result as
/// dividing by each in turn, since nested floor division of non-negative
/// integers composes.
pub fn mul_div_wide(numerators: &[u64], denominators: &[u64]) -> Result<u64, MathError> {
    let num = product(numerators)?;
    let den = product(denominators)?;
    if den.is_zero() {
        return Err(MathError::DivisionByZero);
    }
    narrow(num / den)
}

/// `a - b`, clamped at zero.
pub fn saturating_diff(a: u64, b: u64) -> u64 {
    a.saturating_sub(b)
}

/// Checked sum of a sequence of amounts.
pub fn checked_sum<I: IntoIterator<Item = u64>>(values: I) -> Result<u64, MathError> {
    values
        .into_iter()
        .try_fold(0u64, |acc, v| acc.checked_add(v))
        .ok_or(MathError::Overflow)
}

fn product(factors: &[u64]) -> Result<U256, MathError> {
    factors.iter().try_fold(U256::one(), |acc, f| {
        acc.checked_mul(U256::from(*f)).ok_or(MathError::Overflow)
    })
}

fn narrow(value: U256) -> Result<u64, MathError> {
    if value > U256::from(u64::MAX) {
        Err(MathError::Overflow)
    } else {
        Ok(value.low_u64())
    }
}
