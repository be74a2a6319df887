//! Property-based tests for the register codec, pricing and plan assembly.

use gluon_reactor::{
    boxes::RegisterValue,
    pricing,
    registers::{
        decode_long_array, decode_long_pair, decode_number, encode_long_array, encode_long_pair,
        encode_number, encode_tree, Constant,
    },
    Asset, ErgoTree, OracleBox, ProtocolConfig, RawBox, RegisterId, ReserveBox, TokenIds,
    TransactionBuilder,
};
use proptest::prelude::*;
use std::collections::BTreeMap;

const TOTAL: u64 = 1_000_000_000_000_000;
const MAX_LONG: u64 = i64::MAX as u64;

fn config() -> ProtocolConfig {
    ProtocolConfig {
        oracle_fee_tree: ErgoTree::from_hex("100104").unwrap(),
        tokens: TokenIds {
            reserve_nft: "aa".repeat(32),
            stable: "bb".repeat(32),
            volatile: "cc".repeat(32),
            oracle_pool_nft: "dd".repeat(32),
            oracle_buyback_nft: "ee".repeat(32),
        },
        ..Default::default()
    }
}

fn reserve(config: &ProtocolConfig, circ_stable: u64, circ_volatile: u64) -> ReserveBox {
    let registers: BTreeMap<_, _> = [
        (RegisterId::R4, encode_long_pair(TOTAL, TOTAL).unwrap()),
        (RegisterId::R5, encode_tree(&ErgoTree::from_hex("0008cd").unwrap()).unwrap()),
        (RegisterId::R6, encode_long_pair(0, 1_000_000_000_000).unwrap()),
        (RegisterId::R7, encode_long_array(&[0; 14]).unwrap()),
        (RegisterId::R8, encode_long_array(&[0; 14]).unwrap()),
        (RegisterId::R9, encode_number(1_440).unwrap()),
    ]
    .into_iter()
    .map(|(id, wire)| (id, RegisterValue::Serialized(wire)))
    .collect();
    let raw = RawBox {
        box_id: "01".repeat(32),
        transaction_id: "02".repeat(32),
        index: 0,
        value: 100_001_000_000,
        ergo_tree: ErgoTree::from_hex("19a205").unwrap(),
        creation_height: 1_500,
        assets: vec![
            Asset::new(config.tokens.reserve_nft.clone(), 1),
            Asset::new(config.tokens.stable.clone(), TOTAL - circ_stable),
            Asset::new(config.tokens.volatile.clone(), TOTAL - circ_volatile),
        ],
        additional_registers: registers,
    };
    ReserveBox::from_raw(raw, config).unwrap()
}

fn oracle(price_per_gram: u64) -> OracleBox {
    let mut registers = BTreeMap::new();
    registers.insert(
        RegisterId::R4,
        RegisterValue::Serialized(encode_number(price_per_gram * 1000).unwrap()),
    );
    OracleBox::from_raw(RawBox {
        box_id: "03".repeat(32),
        transaction_id: String::new(),
        index: 0,
        value: 1_000_000,
        ergo_tree: ErgoTree::from_hex("1002").unwrap(),
        creation_height: 1_400,
        assets: vec![],
        additional_registers: registers,
    })
    .unwrap()
}

fn user_box(value: u64, assets: Vec<Asset>) -> RawBox {
    RawBox {
        box_id: "05".repeat(32),
        transaction_id: "06".repeat(32),
        index: 0,
        value,
        ergo_tree: ErgoTree::from_hex("0008cd02").unwrap(),
        creation_height: 1_510,
        assets,
        additional_registers: BTreeMap::new(),
    }
}

// ============================================================================
// Register Codec
// ============================================================================

proptest! {
    /// Any long array within the signed range survives encode then decode.
    #[test]
    fn prop_long_array_roundtrip(values in prop::collection::vec(0..=MAX_LONG, 0..32)) {
        let wire = encode_long_array(&values).unwrap();
        prop_assert_eq!(decode_long_array(&wire).unwrap(), values);
    }

    #[test]
    fn prop_long_pair_roundtrip(a in 0..=MAX_LONG, b in 0..=MAX_LONG) {
        let wire = encode_long_pair(a, b).unwrap();
        prop_assert_eq!(decode_long_pair(&wire).unwrap(), (a, b));
    }

    #[test]
    fn prop_number_roundtrip(n in 0..=MAX_LONG) {
        let wire = encode_number(n).unwrap();
        prop_assert_eq!(decode_number(&wire).unwrap(), n);
        prop_assert_eq!(Constant::decode(&wire).unwrap(), Constant::Long(n as i64));
    }

    /// Values beyond the signed 64-bit range are refused rather than wrapped.
    #[test]
    fn prop_out_of_range_rejected(n in (MAX_LONG + 1)..=u64::MAX) {
        prop_assert!(encode_number(n).is_err());
        prop_assert!(encode_long_array(&[0, n]).is_err());
    }
}

// ============================================================================
// Pricing
// ============================================================================

proptest! {
    /// The fusion ratio never leaves [0, 0.66].
    #[test]
    fn prop_fusion_ratio_bounded(
        circ_stable in 1..=TOTAL,
        price_per_gram in 1..=1_000_000_000_000u64,
    ) {
        let config = config();
        let reserve = reserve(&config, circ_stable, 20_000_000_000);
        let fr = pricing::fusion_ratio(&reserve, &oracle(price_per_gram)).unwrap();
        prop_assert!(fr <= pricing::FUSION_RATIO_CEILING);
    }

    /// Pricing has no hidden state.
    #[test]
    fn prop_snapshot_deterministic(
        circ_stable in 1_000_000..=100_000_000_000u64,
        circ_volatile in 1_000_000..=100_000_000_000u64,
        price_per_gram in 1_000..=10_000_000_000u64,
    ) {
        let config = config();
        let reserve = reserve(&config, circ_stable, circ_volatile);
        let oracle = oracle(price_per_gram);
        prop_assert_eq!(
            pricing::snapshot(&reserve, &oracle).unwrap(),
            pricing::snapshot(&reserve, &oracle).unwrap()
        );
    }
}

// ============================================================================
// Conservation
// ============================================================================

proptest! {
    #[test]
    fn prop_fission_conserves_value(erg_amount in 1_000..=50_000_000_000u64) {
        let config = config();
        let reserve = reserve(&config, 50_000_000_000, 20_000_000_000);
        let plan = TransactionBuilder::new(&config)
            .fission(&reserve, &oracle(1_000_000_000), &[user_box(100_000_000_000, vec![])], erg_amount)
            .unwrap();
        prop_assert_eq!(
            plan.input_value().unwrap(),
            plan.output_value().unwrap() + plan.miner_fee
        );
        prop_assert!(plan.check_balanced().is_ok());
    }

    #[test]
    fn prop_fusion_conserves_value(erg_amount in 1_000..=50_000_000_000u64) {
        let config = config();
        let reserve = reserve(&config, 50_000_000_000, 20_000_000_000);
        let user = user_box(
            10_000_000_000,
            vec![
                Asset::new(config.tokens.stable.clone(), 1_000_000_000_000),
                Asset::new(config.tokens.volatile.clone(), 1_000_000_000_000),
            ],
        );
        let plan = TransactionBuilder::new(&config)
            .fusion(&reserve, &oracle(1_000_000_000), &[user], erg_amount)
            .unwrap();
        prop_assert_eq!(
            plan.input_value().unwrap(),
            plan.output_value().unwrap() + plan.miner_fee
        );
        prop_assert!(plan.check_balanced().is_ok());
    }
}
