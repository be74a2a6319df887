//! Gluon reserve protocol core.
//!
//! Gluon locks a reserve asset (ERG) in a single reserve box and issues two
//! derivative tokens against it: a **stable** token pegged to one gram of
//! gold, and a **volatile** token that absorbs the reserve's price swings.
//!
//! This crate is the side-effect-free part of the protocol SDK. Given
//! snapshots of the reserve box and the gold oracle box it prices the four
//! operations, computes the fees they owe and assembles complete, balanced
//! transaction plans ready for a wallet to sign.
//!
//! ## Operations
//!
//! | Operation   | User gives        | User gets                  |
//! |-------------|-------------------|----------------------------|
//! | Fission     | ERG               | stable + volatile          |
//! | Fusion      | stable + volatile | ERG                        |
//! | Transmute ↑ | volatile          | stable (dynamic fee)       |
//! | Transmute ↓ | stable            | volatile (dynamic fee)     |
//!
//! ## Units
//!
//! Every amount is an integer number of nano-units (1e9 per whole ERG or
//! token). Ratios are scaled by [`math::NANO`]. Nothing in this crate uses
//! floating point.

pub mod address;
pub mod boxes;
pub mod builder;
pub mod config;
pub mod error;
pub mod fees;
pub mod math;
pub mod plan;
pub mod pricing;
pub mod registers;
pub mod stats;
pub mod volume;

pub use address::{address_of, tree_of, AddressError};
pub use boxes::{Asset, OracleBox, RawBox, RegisterValue, ReserveBox, Token};
pub use builder::{compute_change, Operation, OperationRequest, Quote, TransactionBuilder};
pub use config::{Network, ProtocolConfig, TokenIds};
pub use error::{DomainError, ReactorError};
pub use fees::{FeeBreakdown, FeeCalculator, FeeShares};
pub use plan::{Eip12UnsignedTransaction, OutputBox, PlanInput, TransactionPlan};
pub use pricing::{PriceSnapshot, TokenPair, TransmuteQuote};
pub use registers::{ErgoTree, RegisterId};
pub use stats::{ProtocolStats, VolumeSummary};
pub use volume::{Direction, VolumeBuckets};
