//! Shared protocol types for the hub interoperability contract.
//!
//! Everything a relayer needs to build a valid submission lives here:
//! - [`types`] - chain ids, cross-chain messages, certificates, channel data
//! - [`codec`] - borsh wire encoding with strict decoding
//! - [`merkle`] - the append-only outbox/inbox accumulator and its proofs
//! - [`smt`] - sparse Merkle state proofs against a certified state root
//! - [`crypto`] - BLS12-381 aggregate signature verification

pub mod codec;
pub mod crypto;
pub mod hash;
pub mod merkle;
pub mod smt;
pub mod types;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use codec::{CodecError, Decode, Encode};
pub use hash::{bytes32_to_hex, keccak256, EMPTY_HASH};
pub use types::{
    ActiveValidator, CcmStatus, Certificate, ChainId, ChannelData, CrossChainMessage,
    MerkleAccumulator,
};
