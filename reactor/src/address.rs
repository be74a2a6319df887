//! Address Rendering
//!
//! Ergo addresses are base58 strings over
//! `prefix | content | checksum`, where `prefix = network + address type`
//! and `checksum` is the first four bytes of the BLAKE2b-256 hash of
//! `prefix | content`.
//!
//! | Type | Code | Content                     |
//! |------|------|-----------------------------|
//! | P2PK | 1    | 33-byte compressed pub key  |
//! | P2S  | 3    | serialized script           |

use crate::{config::Network, registers::ErgoTree};
use blake2::{digest::consts::U32, Blake2b, Digest};
use displaydoc::Display;

type Blake2b256 = Blake2b<U32>;

const P2PK_TYPE: u8 = 1;
const P2S_TYPE: u8 = 3;
const P2PK_TREE_HEADER: [u8; 3] = [0x00, 0x08, 0xcd];
const PUBLIC_KEY_LEN: usize = 33;
const CHECKSUM_LEN: usize = 4;

/// Failure to parse an address.
#[derive(Clone, Debug, Display, Eq, PartialEq)]
pub enum AddressError {
    /// Address is not valid base58
    InvalidBase58,
    /// Address is too short
    TooShort,
    /// Address checksum does not match
    BadChecksum,
    /// Unknown network prefix 0x{0:02x}
    UnknownNetwork(u8),
    /// Unsupported address type {0}
    UnsupportedType(u8),
    /// P2PK address carries {0} bytes instead of a public key
    BadPublicKey(usize),
}

impl std::error::Error for AddressError {}

fn checksum(bytes: &[u8]) -> [u8; CHECKSUM_LEN] {
    let digest = Blake2b256::digest(bytes);
    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&digest[..CHECKSUM_LEN]);
    out
}

/// Render the address that pays to `tree` on `network`.
pub fn address_of(tree: &ErgoTree, network: Network) -> String {
    let bytes = tree.as_bytes();
    let (kind, content) = match bytes.strip_prefix(&P2PK_TREE_HEADER[..]) {
        Some(key) if key.len() == PUBLIC_KEY_LEN => (P2PK_TYPE, key),
        _ => (P2S_TYPE, bytes),
    };
    let mut raw = Vec::with_capacity(1 + content.len() + CHECKSUM_LEN);
    raw.push(network.prefix() + kind);
    raw.extend_from_slice(content);
    let check = checksum(&raw);
    raw.extend_from_slice(&check);
    bs58::encode(raw).into_string()
}

/// Parse a P2PK or P2S address back into its network and script.
pub fn tree_of(address: &str) -> Result<(Network, ErgoTree), AddressError> {
    let raw = bs58::decode(address)
        .into_vec()
        .map_err(|_| AddressError::InvalidBase58)?;
    if raw.len() < 1 + CHECKSUM_LEN {
        return Err(AddressError::TooShort);
    }
    let (body, check) = raw.split_at(raw.len() - CHECKSUM_LEN);
    if checksum(body) != check {
        return Err(AddressError::BadChecksum);
    }

    let head = body[0];
    let network = match head & 0xf0 {
        0x00 => Network::Mainnet,
        0x10 => Network::Testnet,
        other => return Err(AddressError::UnknownNetwork(other)),
    };
    let content = &body[1..];
    let tree = match head & 0x0f {
        P2PK_TYPE => {
            if content.len() != PUBLIC_KEY_LEN {
                return Err(AddressError::BadPublicKey(content.len()));
            }
            let mut bytes = P2PK_TREE_HEADER.to_vec();
            bytes.extend_from_slice(content);
            ErgoTree::from_bytes(bytes)
        }
        P2S_TYPE => ErgoTree::from_bytes(content.to_vec()),
        other => return Err(AddressError::UnsupportedType(other)),
    };
    Ok((network, tree))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn p2pk_tree() -> ErgoTree {
        let mut bytes = P2PK_TREE_HEADER.to_vec();
        bytes.push(0x02);
        bytes.extend_from_slice(&[0x11; 32]);
        ErgoTree::from_bytes(bytes)
    }

    #[test]
    fn test_mainnet_p2pk_starts_with_9() {
        let address = address_of(&p2pk_tree(), Network::Mainnet);
        assert!(address.starts_with('9'), "{address}");
        assert_eq!(tree_of(&address).unwrap(), (Network::Mainnet, p2pk_tree()));
    }

    #[test]
    fn test_testnet_p2pk_starts_with_3() {
        let address = address_of(&p2pk_tree(), Network::Testnet);
        assert!(address.starts_with('3'), "{address}");
        assert_eq!(tree_of(&address).unwrap().0, Network::Testnet);
    }

    #[test]
    fn test_p2s_roundtrip() {
        let tree = ErgoTree::from_hex("101004020e36").unwrap();
        let address = address_of(&tree, Network::Mainnet);
        assert_eq!(tree_of(&address).unwrap(), (Network::Mainnet, tree));
    }

    #[test]
    fn test_bad_checksum() {
        let address = address_of(&p2pk_tree(), Network::Mainnet);
        let mut raw = bs58::decode(&address).into_vec().unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0xff;
        let tampered = bs58::encode(raw).into_string();
        assert_matches!(tree_of(&tampered), Err(AddressError::BadChecksum));
        assert_matches!(tree_of("0OIl"), Err(AddressError::InvalidBase58));
    }
}
