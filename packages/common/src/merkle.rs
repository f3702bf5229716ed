//! Append-only Merkle accumulator used for channel inboxes and outboxes.
//!
//! The tree is left-balanced: leaves are paired layer by layer and an
//! unpaired last node is carried up unchanged. The on-chain state of a tree
//! is a [`MerkleAccumulator`] holding only the root, the size and the append
//! path (roots of the perfect subtrees, lowest first), which is enough to
//! append further leaves.
//!
//! Two proof shapes are supported:
//! - right witness: extends a known prefix (the hub inbox) to the root of a
//!   longer tree (the partner's outbox)
//! - multi-leaf inclusion: proves a sorted set of leaf positions against a
//!   root; siblings are listed bottom-up, left to right within a layer
//!
//! [`MerkleTree`] builds both proofs off-chain.

use thiserror::Error;

use crate::hash::{branch_hash, leaf_hash, EMPTY_HASH};
use crate::types::MerkleAccumulator;

#[derive(Error, Debug, PartialEq)]
pub enum MerkleError {
    #[error("Proof must cover at least one leaf")]
    EmptyProof,

    #[error("Got {idxs} indexes for {leaves} leaves")]
    IndexCountMismatch { idxs: usize, leaves: usize },

    #[error("Indexes must be strictly ascending")]
    IndexesNotAscending,

    #[error("Index {index} out of range for tree of size {size}")]
    IndexOutOfRange { index: u64, size: u64 },

    #[error("Not enough sibling hashes")]
    MissingSiblings,

    #[error("{remaining} sibling hashes left unused")]
    UnusedSiblings { remaining: usize },

    #[error("Append path has {got} entries, size requires {expected}")]
    AppendPathMismatch { expected: usize, got: usize },
}

impl Default for MerkleAccumulator {
    fn default() -> Self {
        Self {
            root: EMPTY_HASH,
            size: 0,
            append_path: vec![],
        }
    }
}

impl MerkleAccumulator {
    /// Append one leaf and return the new root.
    pub fn append(&mut self, data: &[u8]) -> [u8; 32] {
        let mut node = leaf_hash(data);
        let mut size = self.size;
        let mut merged = 0;
        while size & 1 == 1 {
            node = branch_hash(&self.append_path[merged], &node);
            merged += 1;
            size >>= 1;
        }

        let mut append_path = Vec::with_capacity(self.append_path.len() + 1 - merged);
        append_path.push(node);
        append_path.extend_from_slice(&self.append_path[merged..]);

        self.append_path = append_path;
        self.size += 1;
        self.root = root_from_append_path(&self.append_path);
        self.root
    }
}

/// Root of the tree summarised by `append_path`.
pub fn root_from_append_path(append_path: &[[u8; 32]]) -> [u8; 32] {
    let Some((first, rest)) = append_path.split_first() else {
        return EMPTY_HASH;
    };
    rest.iter().fold(*first, |root, left| branch_hash(left, &root))
}

/// Root of a tree whose first `size` leaves are summarised by `append_path`
/// and whose remaining leaves are covered by `right_witness`.
///
/// Walking up from the boundary node, an odd position takes its left
/// sibling from the append path and an even position takes its right
/// sibling from the witness, or is carried up once the witness runs out.
pub fn calculate_root_from_right_witness(
    size: u64,
    append_path: &[[u8; 32]],
    right_witness: &[[u8; 32]],
) -> Result<[u8; 32], MerkleError> {
    let expected = size.count_ones() as usize;
    if append_path.len() != expected {
        return Err(MerkleError::AppendPathMismatch {
            expected,
            got: append_path.len(),
        });
    }

    let mut witness = right_witness.iter();
    let Some(first) = witness.next() else {
        return Ok(root_from_append_path(append_path));
    };

    let mut node = *first;
    let mut path = append_path.iter();
    let mut position = if size == 0 { 0 } else { size >> size.trailing_zeros() };
    while path.len() > 0 || witness.len() > 0 {
        if position & 1 == 1 {
            let left = path.next().ok_or(MerkleError::AppendPathMismatch {
                expected,
                got: append_path.len(),
            })?;
            node = branch_hash(left, &node);
        } else if let Some(right) = witness.next() {
            node = branch_hash(&node, right);
        }
        position >>= 1;
    }
    Ok(node)
}

fn check_indexes(size: u64, idxs: &[u64], leaves: usize) -> Result<(), MerkleError> {
    if idxs.is_empty() {
        return Err(MerkleError::EmptyProof);
    }
    if idxs.len() != leaves {
        return Err(MerkleError::IndexCountMismatch {
            idxs: idxs.len(),
            leaves,
        });
    }
    if idxs.windows(2).any(|pair| pair[0] >= pair[1]) {
        return Err(MerkleError::IndexesNotAscending);
    }
    let last = idxs[idxs.len() - 1];
    if last >= size {
        return Err(MerkleError::IndexOutOfRange { index: last, size });
    }
    Ok(())
}

/// Root implied by a multi-leaf inclusion proof. `leaf_hashes` are already
/// leaf-hashed and aligned with `idxs`.
pub fn calculate_root_from_proof(
    size: u64,
    idxs: &[u64],
    leaf_hashes: &[[u8; 32]],
    sibling_hashes: &[[u8; 32]],
) -> Result<[u8; 32], MerkleError> {
    check_indexes(size, idxs, leaf_hashes.len())?;

    let mut siblings = sibling_hashes.iter();
    let mut layer: Vec<(u64, [u8; 32])> = idxs
        .iter()
        .copied()
        .zip(leaf_hashes.iter().copied())
        .collect();
    let mut layer_len = size;

    while layer_len > 1 {
        let mut next = Vec::with_capacity(layer.len());
        let mut i = 0;
        while i < layer.len() {
            let (index, hash) = layer[i];
            if index & 1 == 1 {
                let left = siblings.next().ok_or(MerkleError::MissingSiblings)?;
                next.push((index >> 1, branch_hash(left, &hash)));
            } else if index + 1 < layer_len {
                let right = match layer.get(i + 1) {
                    Some((right_index, right_hash)) if *right_index == index + 1 => {
                        i += 1;
                        *right_hash
                    }
                    _ => *siblings.next().ok_or(MerkleError::MissingSiblings)?,
                };
                next.push((index >> 1, branch_hash(&hash, &right)));
            } else {
                next.push((index >> 1, hash));
            }
            i += 1;
        }
        layer = next;
        layer_len = (layer_len + 1) / 2;
    }

    if siblings.len() > 0 {
        return Err(MerkleError::UnusedSiblings {
            remaining: siblings.len(),
        });
    }
    Ok(layer[0].1)
}

// ============================================================================
// Builder
// ============================================================================

/// Fully materialised tree, for relayers building proofs.
#[derive(Clone, Debug)]
pub struct MerkleTree {
    layers: Vec<Vec<[u8; 32]>>,
}

impl MerkleTree {
    pub fn new<T: AsRef<[u8]>>(leaves: &[T]) -> Self {
        let mut layers = vec![leaves
            .iter()
            .map(|leaf| leaf_hash(leaf.as_ref()))
            .collect::<Vec<_>>()];
        while layers[layers.len() - 1].len() > 1 {
            let below = &layers[layers.len() - 1];
            let layer: Vec<[u8; 32]> = below
                .chunks(2)
                .map(|pair| match pair {
                    [left, right] => branch_hash(left, right),
                    _ => pair[0],
                })
                .collect();
            layers.push(layer);
        }
        Self { layers }
    }

    pub fn size(&self) -> u64 {
        self.layers[0].len() as u64
    }

    pub fn root(&self) -> [u8; 32] {
        self.layers[self.layers.len() - 1]
            .first()
            .copied()
            .unwrap_or(EMPTY_HASH)
    }

    /// Witness extending the first `size` leaves to this tree's root.
    pub fn right_witness(&self, size: u64) -> Vec<[u8; 32]> {
        if size >= self.size() {
            return vec![];
        }
        if size == 0 {
            return vec![self.root()];
        }

        let mut height = size.trailing_zeros() as usize;
        let mut position = (size >> height) as usize;
        let mut witness = vec![self.layers[height][position]];
        while self.layers[height].len() > 1 {
            if position & 1 == 0 {
                if let Some(right) = self.layers[height].get(position + 1) {
                    witness.push(*right);
                }
            }
            position >>= 1;
            height += 1;
        }
        witness
    }

    /// Sibling hashes proving the leaves at `idxs`.
    pub fn prove(&self, idxs: &[u64]) -> Result<Vec<[u8; 32]>, MerkleError> {
        check_indexes(self.size(), idxs, idxs.len())?;

        let mut siblings = vec![];
        let mut known: Vec<usize> = idxs.iter().map(|i| *i as usize).collect();
        for layer in &self.layers[..self.layers.len() - 1] {
            let mut next = Vec::with_capacity(known.len());
            let mut i = 0;
            while i < known.len() {
                let index = known[i];
                if index & 1 == 1 {
                    siblings.push(layer[index - 1]);
                } else if index + 1 < layer.len() {
                    if known.get(i + 1) == Some(&(index + 1)) {
                        i += 1;
                    } else {
                        siblings.push(layer[index + 1]);
                    }
                }
                next.push(index >> 1);
                i += 1;
            }
            known = next;
        }
        Ok(siblings)
    }
}
