//! Hash primitives shared by every accumulator in the protocol.
//!
//! All hashing is keccak256. Leaf and branch nodes are domain separated with
//! a one-byte prefix so a branch can never be replayed as a leaf.
//!
//! # Node layout
//! - leaf:   `keccak256(0x00 || data)`
//! - branch: `keccak256(0x01 || left || right)`
//! - empty:  `keccak256("")`

use tiny_keccak::{Hasher, Keccak};

pub const LEAF_PREFIX: u8 = 0x00;
pub const BRANCH_PREFIX: u8 = 0x01;

/// Root of an accumulator with no leaves, `keccak256("")`.
pub const EMPTY_HASH: [u8; 32] = [
    0xc5, 0xd2, 0x46, 0x01, 0x86, 0xf7, 0x23, 0x3c, 0x92, 0x7e, 0x7d, 0xb2, 0xdc, 0xc7, 0x03, 0xc0,
    0xe5, 0x00, 0xb6, 0x53, 0xca, 0x82, 0x27, 0x3b, 0x7b, 0xfa, 0xd8, 0x04, 0x5d, 0x85, 0xa4, 0x70,
];

/// Compute keccak256 hash of arbitrary data
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    hasher.update(data);
    let mut output = [0u8; 32];
    hasher.finalize(&mut output);
    output
}

/// Hash of a leaf holding `data`.
pub fn leaf_hash(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    hasher.update(&[LEAF_PREFIX]);
    hasher.update(data);
    let mut output = [0u8; 32];
    hasher.finalize(&mut output);
    output
}

/// Hash of an inner node with the given children.
pub fn branch_hash(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    hasher.update(&[BRANCH_PREFIX]);
    hasher.update(left);
    hasher.update(right);
    let mut output = [0u8; 32];
    hasher.finalize(&mut output);
    output
}

/// Convert a 32-byte hash to a 0x-prefixed hex string
pub fn bytes32_to_hex(bytes: &[u8; 32]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Copy a slice into a 32-byte array, `None` if the length is wrong.
pub fn bytes32_from_slice(bytes: &[u8]) -> Option<[u8; 32]> {
    bytes.try_into().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_hash_is_keccak_of_empty_input() {
        assert_eq!(keccak256(&[]), EMPTY_HASH);
        assert_eq!(
            bytes32_to_hex(&EMPTY_HASH),
            "0xc5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_leaf_and_branch_are_domain_separated() {
        let data = [7u8; 64];
        let left: [u8; 32] = data[..32].try_into().unwrap();
        let right: [u8; 32] = data[32..].try_into().unwrap();

        assert_ne!(leaf_hash(&data), branch_hash(&left, &right));

        let mut prefixed = vec![LEAF_PREFIX];
        prefixed.extend_from_slice(&data);
        assert_eq!(leaf_hash(&data), keccak256(&prefixed));
    }

    #[test]
    fn test_bytes32_from_slice() {
        assert_eq!(bytes32_from_slice(&[1u8; 32]), Some([1u8; 32]));
        assert_eq!(bytes32_from_slice(&[1u8; 31]), None);
        assert_eq!(bytes32_from_slice(&[1u8; 33]), None);
    }
}
