//! Sparse Merkle tree inclusion proofs against a certified state root.
//!
//! The tree has 256 levels addressed by the bits of a 32-byte key, most
//! significant bit first from the root. Empty subtrees hash to zero and a
//! branch over two empty children stays zero, so a proof only carries the
//! non-empty siblings; the `bitmap` marks which levels have one.
//!
//! Bit `i` of the bitmap (byte `i / 8`, bit `i % 8`, least significant first)
//! refers to level `i` counted from the leaf, and `sibling_hashes` are
//! listed in the same bottom-up order.

use std::collections::BTreeMap;

use cosmwasm_schema::cw_serde;
use cosmwasm_std::Binary;
use thiserror::Error;

use crate::hash::{branch_hash, keccak256, LEAF_PREFIX};

pub const SMT_DEPTH: usize = 256;

const EMPTY_SUBTREE: [u8; 32] = [0u8; 32];

#[cw_serde]
#[derive(Default)]
pub struct SparseMerkleProof {
    /// 32 bytes, or empty when every sibling is empty
    pub bitmap: Binary,
    pub sibling_hashes: Vec<Binary>,
}

#[derive(Error, Debug, PartialEq)]
pub enum SmtError {
    #[error("Bitmap must be 0 or 32 bytes, got {got}")]
    InvalidBitmapLength { got: usize },

    #[error("Sibling hash must be 32 bytes, got {got}")]
    InvalidSiblingLength { got: usize },

    #[error("Bitmap references more siblings than provided")]
    MissingSiblings,

    #[error("{remaining} sibling hashes left unused")]
    UnusedSiblings { remaining: usize },
}

/// Key under which a chain stores `store_key` in a module substore.
pub fn state_key(module: &str, substore_prefix: &[u8], store_key: &[u8]) -> [u8; 32] {
    let mut data = Vec::with_capacity(module.len() + substore_prefix.len() + store_key.len());
    data.extend_from_slice(module.as_bytes());
    data.extend_from_slice(substore_prefix);
    data.extend_from_slice(store_key);
    keccak256(&data)
}

pub fn smt_leaf_hash(key: &[u8; 32], value: &[u8]) -> [u8; 32] {
    let mut data = Vec::with_capacity(1 + 32 + 32);
    data.push(LEAF_PREFIX);
    data.extend_from_slice(key);
    data.extend_from_slice(&keccak256(value));
    keccak256(&data)
}

fn smt_branch_hash(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    if *left == EMPTY_SUBTREE && *right == EMPTY_SUBTREE {
        EMPTY_SUBTREE
    } else {
        branch_hash(left, right)
    }
}

fn key_bit(key: &[u8; 32], depth: usize) -> u8 {
    (key[depth / 8] >> (7 - depth % 8)) & 1
}

fn bitmap_bit(bitmap: &[u8; 32], level: usize) -> bool {
    (bitmap[level / 8] >> (level % 8)) & 1 == 1
}

/// Root implied by `value` stored under `key` and the given proof.
pub fn calculate_root(
    key: &[u8; 32],
    value: &[u8],
    proof: &SparseMerkleProof,
) -> Result<[u8; 32], SmtError> {
    let bitmap: [u8; 32] = match proof.bitmap.len() {
        0 => [0u8; 32],
        32 => {
            let mut bitmap = [0u8; 32];
            bitmap.copy_from_slice(proof.bitmap.as_slice());
            bitmap
        }
        got => return Err(SmtError::InvalidBitmapLength { got }),
    };

    let mut siblings = proof.sibling_hashes.iter();
    let mut node = smt_leaf_hash(key, value);
    for level in 0..SMT_DEPTH {
        let sibling: [u8; 32] = if bitmap_bit(&bitmap, level) {
            let raw = siblings.next().ok_or(SmtError::MissingSiblings)?;
            raw.as_slice()
                .try_into()
                .map_err(|_| SmtError::InvalidSiblingLength { got: raw.len() })?
        } else {
            EMPTY_SUBTREE
        };
        node = if key_bit(key, SMT_DEPTH - 1 - level) == 0 {
            smt_branch_hash(&node, &sibling)
        } else {
            smt_branch_hash(&sibling, &node)
        };
    }

    if siblings.len() > 0 {
        return Err(SmtError::UnusedSiblings {
            remaining: siblings.len(),
        });
    }
    Ok(node)
}

/// `true` when the proof shows `value` under `key` in the tree with `root`.
pub fn verify_inclusion(
    root: &[u8; 32],
    key: &[u8; 32],
    value: &[u8],
    proof: &SparseMerkleProof,
) -> bool {
    matches!(calculate_root(key, value, proof), Ok(computed) if computed == *root)
}

// ============================================================================
// Builder
// ============================================================================

/// In-memory tree for building state roots and proofs off-chain.
#[derive(Clone, Debug, Default)]
pub struct SparseMerkleTree {
    leaves: BTreeMap<[u8; 32], [u8; 32]>,
}

fn subtree_root(entries: &[([u8; 32], [u8; 32])], depth: usize) -> [u8; 32] {
    match entries {
        [] => EMPTY_SUBTREE,
        [(_, leaf), ..] if depth == SMT_DEPTH => *leaf,
        _ => {
            let split = entries.partition_point(|(key, _)| key_bit(key, depth) == 0);
            smt_branch_hash(
                &subtree_root(&entries[..split], depth + 1),
                &subtree_root(&entries[split..], depth + 1),
            )
        }
    }
}

impl SparseMerkleTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: [u8; 32], value: &[u8]) {
        self.leaves.insert(key, smt_leaf_hash(&key, value));
    }

    fn entries(&self) -> Vec<([u8; 32], [u8; 32])> {
        self.leaves.iter().map(|(key, leaf)| (*key, *leaf)).collect()
    }

    pub fn root(&self) -> [u8; 32] {
        subtree_root(&self.entries(), 0)
    }

    /// Inclusion proof for `key`, `None` if the key is absent.
    pub fn prove(&self, key: &[u8; 32]) -> Option<SparseMerkleProof> {
        if !self.leaves.contains_key(key) {
            return None;
        }

        let entries = self.entries();
        let mut slice = &entries[..];
        let mut top_down = Vec::with_capacity(SMT_DEPTH);
        for depth in 0..SMT_DEPTH {
            let split = slice.partition_point(|(k, _)| key_bit(k, depth) == 0);
            let (own, other) = if key_bit(key, depth) == 0 {
                (&slice[..split], &slice[split..])
            } else {
                (&slice[split..], &slice[..split])
            };
            top_down.push(subtree_root(other, depth + 1));
            slice = own;
        }

        let mut bitmap = [0u8; 32];
        let mut sibling_hashes = vec![];
        for level in 0..SMT_DEPTH {
            let sibling = top_down[SMT_DEPTH - 1 - level];
            if sibling != EMPTY_SUBTREE {
                bitmap[level / 8] |= 1 << (level % 8);
                sibling_hashes.push(Binary::from(sibling.to_vec()));
            }
        }
        Some(SparseMerkleProof {
            bitmap: Binary::from(bitmap.to_vec()),
            sibling_hashes,
        })
    }
}
