//! Parsing and validation of raw message fields.

use common::hash::bytes32_from_slice;
use common::types::{
    chain_id_from_slice, ChainId, TokenId, CHAIN_ID_LENGTH, HASH_LENGTH, TOKEN_ID_LENGTH,
};

use crate::error::ContractError;
use crate::state::MAX_CHAIN_NAME_LENGTH;

pub fn parse_chain_id(bytes: &[u8]) -> Result<ChainId, ContractError> {
    chain_id_from_slice(bytes).ok_or_else(|| ContractError::InvalidChainId {
        reason: format!(
            "expected {} bytes, got {}",
            CHAIN_ID_LENGTH,
            bytes.len()
        ),
    })
}

pub fn parse_hash(bytes: &[u8]) -> Result<[u8; 32], ContractError> {
    debug_assert_eq!(HASH_LENGTH, 32);
    bytes32_from_slice(bytes).ok_or(ContractError::InvalidHashLength { got: bytes.len() })
}

pub fn parse_hashes<T: AsRef<[u8]>>(hashes: &[T]) -> Result<Vec<[u8; 32]>, ContractError> {
    hashes.iter().map(|hash| parse_hash(hash.as_ref())).collect()
}

pub fn parse_token_id(bytes: &[u8]) -> Result<TokenId, ContractError> {
    bytes
        .try_into()
        .map_err(|_| ContractError::InvalidTokenId { got: bytes.len() })
}

/// Chain names are 1 to 40 characters from `a-z0-9!@$&_.`.
pub fn is_valid_chain_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_CHAIN_NAME_LENGTH
        && name.bytes().all(|b| {
            b.is_ascii_lowercase() || b.is_ascii_digit() || matches!(b, b'!' | b'@' | b'$' | b'&' | b'_' | b'.')
        })
}

/// Ensure the token id has the expected length; used by instantiate.
pub fn ensure_token_id_length(bytes: &[u8]) -> Result<(), ContractError> {
    if bytes.len() != TOKEN_ID_LENGTH {
        return Err(ContractError::InvalidTokenId { got: bytes.len() });
    }
    Ok(())
}
