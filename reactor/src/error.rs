//! Reactor Errors

use crate::{
    math::MathError,
    registers::{DecodeError, EncodeError},
};
use displaydoc::Display;

/// Protocol state that makes an operation undefined.
#[derive(Clone, Debug, Display, Eq, PartialEq)]
pub enum DomainError {
    /// Circulating supply of the {0} token is zero
    ZeroCirculatingSupply(&'static str),
    /// Oracle price is zero
    ZeroOraclePrice,
    /// Reserve value {0} does not exceed the minimum box value
    ReserveDepleted(u64),
    /// Fusion ratio is {0}, cannot divide by it
    DegenerateFusionRatio(u64),
    /// Dynamic fee factor {0} leaves nothing to transmute
    FeeFactorSaturated(u64),
    /// Fee accumulator cap is zero
    ZeroFeeCap,
    /// Total supply {total} of the {token} token is below the box balance {balance}
    NegativeCirculation {
        /// Token name
        token: &'static str,
        /// Total supply from R4
        total: u64,
        /// Amount held by the reserve box
        balance: u64,
    },
    /// Reserve box does not hold the {0} token
    MissingToken(&'static str),
    /// Requested amount is zero
    ZeroAmount,
    /// Requested {requested} exceeds the {available} available in the reserve
    ExceedsReserve {
        /// Amount the operation would take out
        requested: u64,
        /// Amount the reserve holds
        available: u64,
    },
}

impl std::error::Error for DomainError {}

/// An error that can occur when pricing or assembling a reactor transaction
#[derive(Clone, Debug, Display, Eq, PartialEq)]
pub enum ReactorError {
    /// Domain: {0}
    Domain(DomainError),

    /// Not enough funds: short {short} of {asset}
    InsufficientFunds {
        /// `"ERG"` or the token id that runs negative
        asset: String,
        /// Missing amount
        short: u64,
    },

    /// Decode: {0}
    Decode(DecodeError),

    /// Encode: {0}
    Encode(EncodeError),

    /// Requested {requested} buckets, window holds {max}
    Range {
        /// Requested window length
        requested: usize,
        /// Configured bucket count
        max: usize,
    },

    /// Configuration: {0}
    Configuration(String),

    /// No user inputs supplied
    NoUserInputs,

    /// Arithmetic: {0}
    Math(MathError),

    /// Plan does not balance: {0}
    Unbalanced(String),
}

impl std::error::Error for ReactorError {}

impl From<DomainError> for ReactorError {
    fn from(src: DomainError) -> Self {
        ReactorError::Domain(src)
    }
}

impl From<DecodeError> for ReactorError {
    fn from(src: DecodeError) -> Self {
        ReactorError::Decode(src)
    }
}

impl From<EncodeError> for ReactorError {
    fn from(src: EncodeError) -> Self {
        ReactorError::Encode(src)
    }
}

impl From<MathError> for ReactorError {
    fn from(src: MathError) -> Self {
        ReactorError::Math(src)
    }
}

impl ReactorError {
    /// True when supplying more user boxes could make the operation succeed.
    pub fn is_insufficient_funds(&self) -> bool {
        matches!(self, ReactorError::InsufficientFunds { .. })
    }
}
