//! Register Codec
//!
//! Box registers travel as base16 strings holding a serialized Ergo constant:
//! a one-byte type descriptor followed by the value. Integers are ZigZag
//! encoded and then written as VLQ varints (7 bits per byte, least
//! significant group first). This module is the only place that touches raw
//! register bytes; everything above it works with native integers.
//!
//! | Type           | Code   | Value                               |
//! |----------------|--------|-------------------------------------|
//! | `Int`          | `0x04` | ZigZag + VLQ                        |
//! | `Long`         | `0x05` | ZigZag + VLQ                        |
//! | `Coll[Byte]`   | `0x0e` | VLQ length, raw bytes               |
//! | `Coll[Long]`   | `0x11` | VLQ length, ZigZag + VLQ per item   |
//! | `(Long, Long)` | `0x59` | two ZigZag + VLQ longs              |

use core::fmt;
use core::str::FromStr;
use displaydoc::Display;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

const TYPE_INT: u8 = 0x04;
const TYPE_LONG: u8 = 0x05;
const TYPE_COLL_BYTE: u8 = 0x0e;
const TYPE_COLL_LONG: u8 = 0x11;
const TYPE_PAIR_LONG: u8 = 0x59;

/// Collections carry their length as an unsigned short.
const MAX_COLL_LEN: usize = u16::MAX as usize;

/// Failure to decode a register value.
#[derive(Clone, Debug, Display, Eq, PartialEq)]
pub enum DecodeError {
    /// Register is not valid base16: {0}
    InvalidHex(String),
    /// Register value is empty
    Empty,
    /// Unsupported type code 0x{0:02x}
    UnsupportedType(u8),
    /// Register value ends unexpectedly
    UnexpectedEnd,
    /// {0} trailing bytes after register value
    TrailingBytes(usize),
    /// VLQ integer overflows 64 bits
    VlqOverflow,
    /// Int value out of 32-bit range
    IntOutOfRange,
    /// Expected {expected}, found {found}
    TypeMismatch {
        /// Type the caller asked for
        expected: &'static str,
        /// Type found on the wire
        found: &'static str,
    },
    /// Expected a pair, found a collection of {0} elements
    NotAPair(usize),
    /// Negative value {0} where an amount was expected
    NegativeAmount(i64),
    /// Register {0} is missing
    MissingRegister(RegisterId),
    /// Invalid register slot name: {0}
    InvalidRegisterId(String),
}

impl std::error::Error for DecodeError {}

/// Failure to encode a register value.
#[derive(Clone, Debug, Display, Eq, PartialEq)]
pub enum EncodeError {
    /// Value {0} exceeds the signed 64-bit register range
    OutOfRange(u64),
    /// Collection of {0} elements exceeds the maximum register collection length
    CollectionTooLong(usize),
}

impl std::error::Error for EncodeError {}

/// Non-mandatory register slots of a box.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum RegisterId {
    R4,
    R5,
    R6,
    R7,
    R8,
    R9,
}

impl RegisterId {
    pub const ALL: [RegisterId; 6] = [
        RegisterId::R4,
        RegisterId::R5,
        RegisterId::R6,
        RegisterId::R7,
        RegisterId::R8,
        RegisterId::R9,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RegisterId::R4 => "R4",
            RegisterId::R5 => "R5",
            RegisterId::R6 => "R6",
            RegisterId::R7 => "R7",
            RegisterId::R8 => "R8",
            RegisterId::R9 => "R9",
        }
    }
}

impl fmt::Display for RegisterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegisterId {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RegisterId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| DecodeError::InvalidRegisterId(s.to_string()))
    }
}

impl Serialize for RegisterId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RegisterId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Serialized script guarding a box.
///
/// The SDK never interprets the script; it only copies it between boxes and
/// renders it as an address.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct ErgoTree(Vec<u8>);

impl ErgoTree {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn from_hex(hex_str: &str) -> Result<Self, DecodeError> {
        hex::decode(hex_str)
            .map(Self)
            .map_err(|e| DecodeError::InvalidHex(e.to_string()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ErgoTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for ErgoTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ErgoTree {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ErgoTree::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// A decoded register constant.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Constant {
    Int(i32),
    Long(i64),
    ByteColl(Vec<u8>),
    LongColl(Vec<i64>),
    LongPair(i64, i64),
}

impl Constant {
    /// Decode a base16 register value.
    pub fn decode(wire: &str) -> Result<Self, DecodeError> {
        let bytes = hex::decode(wire.trim()).map_err(|e| DecodeError::InvalidHex(e.to_string()))?;
        let mut reader = Reader::new(&bytes);
        let type_code = reader.read_u8().map_err(|_| DecodeError::Empty)?;
        let constant = match type_code {
            TYPE_INT => Constant::Int(reader.read_int()?),
            TYPE_LONG => Constant::Long(reader.read_long()?),
            TYPE_COLL_BYTE => {
                let len = reader.read_len()?;
                Constant::ByteColl(reader.read_bytes(len)?.to_vec())
            }
            TYPE_COLL_LONG => {
                let len = reader.read_len()?;
                let items = (0..len)
                    .map(|_| reader.read_long())
                    .collect::<Result<Vec<_>, _>>()?;
                Constant::LongColl(items)
            }
            TYPE_PAIR_LONG => {
                let a = reader.read_long()?;
                let b = reader.read_long()?;
                Constant::LongPair(a, b)
            }
            other => return Err(DecodeError::UnsupportedType(other)),
        };
        reader.finish()?;
        Ok(constant)
    }

    /// Encode as a base16 register value.
    pub fn encode(&self) -> Result<String, EncodeError> {
        let mut out = Vec::new();
        match self {
            Constant::Int(v) => {
                out.push(TYPE_INT);
                write_vlq(&mut out, zigzag_i32(*v));
            }
            Constant::Long(v) => {
                out.push(TYPE_LONG);
                write_vlq(&mut out, zigzag_i64(*v));
            }
            Constant::ByteColl(bytes) => {
                out.push(TYPE_COLL_BYTE);
                write_len(&mut out, bytes.len())?;
                out.extend_from_slice(bytes);
            }
            Constant::LongColl(items) => {
                out.push(TYPE_COLL_LONG);
                write_len(&mut out, items.len())?;
                for v in items {
                    write_vlq(&mut out, zigzag_i64(*v));
                }
            }
            Constant::LongPair(a, b) => {
                out.push(TYPE_PAIR_LONG);
                write_vlq(&mut out, zigzag_i64(*a));
                write_vlq(&mut out, zigzag_i64(*b));
            }
        }
        Ok(hex::encode(out))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Constant::Int(_) => "Int",
            Constant::Long(_) => "Long",
            Constant::ByteColl(_) => "Coll[Byte]",
            Constant::LongColl(_) => "Coll[Long]",
            Constant::LongPair(..) => "(Long, Long)",
        }
    }
}

/// Decode a `Coll[Long]` register into amounts.
pub fn decode_long_array(wire: &str) -> Result<Vec<u64>, DecodeError> {
    match Constant::decode(wire)? {
        Constant::LongColl(items) => items.into_iter().map(to_amount).collect(),
        other => Err(mismatch("Coll[Long]", &other)),
    }
}

/// Encode amounts as a `Coll[Long]` register.
pub fn encode_long_array(values: &[u64]) -> Result<String, EncodeError> {
    let items = values
        .iter()
        .map(|v| to_long(*v))
        .collect::<Result<Vec<_>, _>>()?;
    Constant::LongColl(items).encode()
}

/// Decode a pair of amounts.
///
/// Both the tuple encoding and a two-element `Coll[Long]` are accepted, since
/// deployed boxes carry either shape.
pub fn decode_long_pair(wire: &str) -> Result<(u64, u64), DecodeError> {
    match Constant::decode(wire)? {
        Constant::LongPair(a, b) => Ok((to_amount(a)?, to_amount(b)?)),
        Constant::LongColl(items) if items.len() == 2 => {
            Ok((to_amount(items[0])?, to_amount(items[1])?))
        }
        Constant::LongColl(items) => Err(DecodeError::NotAPair(items.len())),
        other => Err(mismatch("(Long, Long)", &other)),
    }
}

/// Encode a pair of amounts as an `(Long, Long)` register.
pub fn encode_long_pair(a: u64, b: u64) -> Result<String, EncodeError> {
    Constant::LongPair(to_long(a)?, to_long(b)?).encode()
}

/// Decode a single non-negative number stored as `Long` or `Int`.
pub fn decode_number(wire: &str) -> Result<u64, DecodeError> {
    match Constant::decode(wire)? {
        Constant::Long(v) => to_amount(v),
        Constant::Int(v) => to_amount(i64::from(v)),
        other => Err(mismatch("Long", &other)),
    }
}

/// Encode a number as a `Long` register.
pub fn encode_number(n: u64) -> Result<String, EncodeError> {
    Constant::Long(to_long(n)?).encode()
}

/// Encode an `Int` constant, as used by context extensions.
pub fn encode_int(n: i32) -> String {
    let mut out = vec![TYPE_INT];
    write_vlq(&mut out, zigzag_i32(n));
    hex::encode(out)
}

/// Decode a script stored as `Coll[Byte]`.
pub fn decode_tree(wire: &str) -> Result<ErgoTree, DecodeError> {
    match Constant::decode(wire)? {
        Constant::ByteColl(bytes) => Ok(ErgoTree::from_bytes(bytes)),
        other => Err(mismatch("Coll[Byte]", &other)),
    }
}

/// Encode a script as a `Coll[Byte]` register.
pub fn encode_tree(tree: &ErgoTree) -> Result<String, EncodeError> {
    Constant::ByteColl(tree.as_bytes().to_vec()).encode()
}

fn mismatch(expected: &'static str, found: &Constant) -> DecodeError {
    DecodeError::TypeMismatch {
        expected,
        found: found.type_name(),
    }
}

fn to_amount(v: i64) -> Result<u64, DecodeError> {
    u64::try_from(v).map_err(|_| DecodeError::NegativeAmount(v))
}

fn to_long(v: u64) -> Result<i64, EncodeError> {
    i64::try_from(v).map_err(|_| EncodeError::OutOfRange(v))
}

fn zigzag_i64(v: i64) -> u64 {
    ((v << 1) ^ (v >> 63)) as u64
}

fn unzigzag_i64(v: u64) -> i64 {
    ((v >> 1) as i64) ^ -((v & 1) as i64)
}

fn zigzag_i32(v: i32) -> u64 {
    u64::from(((v << 1) ^ (v >> 31)) as u32)
}

fn write_vlq(out: &mut Vec<u8>, mut v: u64) {
    while v >= 0x80 {
        out.push((v as u8 & 0x7f) | 0x80);
        v >>= 7;
    }
    out.push(v as u8);
}

fn write_len(out: &mut Vec<u8>, len: usize) -> Result<(), EncodeError> {
    if len > MAX_COLL_LEN {
        return Err(EncodeError::CollectionTooLong(len));
    }
    write_vlq(out, len as u64);
    Ok(())
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn read_u8(&mut self) -> Result<u8, DecodeError> {
        let b = *self.bytes.get(self.pos).ok_or(DecodeError::UnexpectedEnd)?;
        self.pos += 1;
        Ok(b)
    }

    fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        let end = self.pos.checked_add(len).ok_or(DecodeError::UnexpectedEnd)?;
        let slice = self
            .bytes
            .get(self.pos..end)
            .ok_or(DecodeError::UnexpectedEnd)?;
        self.pos = end;
        Ok(slice)
    }

    fn read_vlq(&mut self) -> Result<u64, DecodeError> {
        let mut result = 0u64;
        let mut shift = 0u32;
        loop {
            let b = self.read_u8()?;
            if shift >= 64 || (shift == 63 && (b & 0x7f) > 1) {
                return Err(DecodeError::VlqOverflow);
            }
            result |= u64::from(b & 0x7f) << shift;
            if b & 0x80 == 0 {
                return Ok(result);
            }
            shift += 7;
        }
    }

    fn read_long(&mut self) -> Result<i64, DecodeError> {
        Ok(unzigzag_i64(self.read_vlq()?))
    }

    fn read_int(&mut self) -> Result<i32, DecodeError> {
        let raw = self.read_vlq()?;
        let raw = u32::try_from(raw).map_err(|_| DecodeError::IntOutOfRange)?;
        Ok(((raw >> 1) as i32) ^ -((raw & 1) as i32))
    }

    fn read_len(&mut self) -> Result<usize, DecodeError> {
        let len = self.read_vlq()?;
        if len > MAX_COLL_LEN as u64 {
            return Err(DecodeError::UnexpectedEnd);
        }
        Ok(len as usize)
    }

    fn finish(&self) -> Result<(), DecodeError> {
        match self.bytes.len() - self.pos {
            0 => Ok(()),
            n => Err(DecodeError::TrailingBytes(n)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_known_encodings() {
        // Context extension tag used by transmutation inputs
        assert_eq!(encode_int(1), "0402");
        assert_eq!(encode_number(0).unwrap(), "0500");
        assert_eq!(encode_number(1).unwrap(), "0502");
        // 720 -> zigzag 1440 -> VLQ a0 0b
        assert_eq!(encode_number(720).unwrap(), "05a00b");
        assert_eq!(encode_long_array(&[]).unwrap(), "1100");
        assert_eq!(encode_long_array(&[1, 2]).unwrap(), "11020204");
        assert_eq!(encode_long_pair(1, 2).unwrap(), "590204");
    }

    #[test]
    fn test_decode_number_accepts_int_and_long() {
        assert_eq!(decode_number("05a00b").unwrap(), 720);
        assert_eq!(decode_number("0402").unwrap(), 1);
    }

    #[test]
    fn test_pair_from_two_element_collection() {
        assert_eq!(decode_long_pair("11020204").unwrap(), (1, 2));
        assert_matches!(decode_long_pair("1103020406"), Err(DecodeError::NotAPair(3)));
    }

    #[test]
    fn test_extreme_values() {
        let max = i64::MAX as u64;
        let wire = encode_number(max).unwrap();
        assert_eq!(decode_number(&wire).unwrap(), max);
        assert_eq!(encode_number(max + 1), Err(EncodeError::OutOfRange(max + 1)));
        assert_eq!(
            Constant::decode(&Constant::Long(i64::MIN).encode().unwrap()).unwrap(),
            Constant::Long(i64::MIN)
        );
        assert_eq!(
            Constant::decode(&Constant::Int(i32::MIN).encode().unwrap()).unwrap(),
            Constant::Int(i32::MIN)
        );
    }

    #[test]
    fn test_malformed_input() {
        assert_matches!(Constant::decode("zz"), Err(DecodeError::InvalidHex(_)));
        assert_matches!(Constant::decode(""), Err(DecodeError::Empty));
        assert_matches!(Constant::decode("07"), Err(DecodeError::UnsupportedType(0x07)));
        assert_matches!(Constant::decode("05"), Err(DecodeError::UnexpectedEnd));
        assert_matches!(Constant::decode("1103"), Err(DecodeError::UnexpectedEnd));
        assert_matches!(Constant::decode("050200"), Err(DecodeError::TrailingBytes(1)));
        assert_matches!(
            Constant::decode("05ffffffffffffffffffff01"),
            Err(DecodeError::VlqOverflow)
        );
    }

    #[test]
    fn test_type_mismatch() {
        assert_matches!(
            decode_long_array("05a00b"),
            Err(DecodeError::TypeMismatch { expected: "Coll[Long]", found: "Long" })
        );
        assert_matches!(decode_tree("0502"), Err(DecodeError::TypeMismatch { .. }));
    }

    #[test]
    fn test_negative_amount_rejected() {
        // Long(-1) -> zigzag 1
        assert_matches!(decode_number("0501"), Err(DecodeError::NegativeAmount(-1)));
        assert_matches!(decode_long_array("110101"), Err(DecodeError::NegativeAmount(-1)));
    }

    #[test]
    fn test_tree_roundtrip() {
        let tree = ErgoTree::from_hex("0008cd03aa").unwrap();
        let wire = encode_tree(&tree).unwrap();
        assert_eq!(wire, "0e050008cd03aa");
        assert_eq!(decode_tree(&wire).unwrap(), tree);
    }

    #[test]
    fn test_register_id_parse() {
        assert_eq!("R7".parse::<RegisterId>().unwrap(), RegisterId::R7);
        assert_matches!("R3".parse::<RegisterId>(), Err(DecodeError::InvalidRegisterId(_)));
        assert!(RegisterId::R4 < RegisterId::R9);
    }
}
