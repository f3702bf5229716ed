//! State definitions for the interoperability contract
//!
//! This module holds the chain registry: the hub's own account, one account,
//! channel and validator set per registered sidechain, and the records kept
//! for terminated chains so their pending messages can be recovered.

use cosmwasm_schema::cw_serde;
use cosmwasm_std::{Addr, Coin, Uint128};
use cw_storage_plus::{Item, Map};

use common::types::{ActiveValidator, ChainId, ChannelData, TokenId};

pub const CONTRACT_NAME: &str = "crates.io:interop";
pub const CONTRACT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// A sidechain with no certificate for this long stops being live (30 days).
pub const LIVENESS_LIMIT: u64 = 30 * 24 * 60 * 60;

pub const MAX_NUM_VALIDATORS: usize = 199;
pub const MAX_CHAIN_NAME_LENGTH: usize = 40;

// ============================================================================
// Configuration
// ============================================================================

#[cw_serde]
pub struct Config {
    /// Receives registration fees
    pub fee_collector: Addr,
    /// Fee a sidechain registration must attach
    pub registration_fee: Coin,
    /// Token used to pay cross-chain message fees on new channels
    pub message_fee_token_id: TokenId,
    pub min_return_fee_per_byte: u64,
}

/// The hub's own identity.
#[cw_serde]
pub struct OwnChainAccount {
    pub chain_id: ChainId,
    pub name: String,
    /// Nonce of the next message this chain sends
    pub nonce: u64,
}

// ============================================================================
// Chain Registry
// ============================================================================

#[cw_serde]
#[derive(Copy, Eq)]
pub enum ChainStatus {
    Registered,
    Active,
    Terminated,
}

impl ChainStatus {
    pub fn code(self) -> u32 {
        match self {
            ChainStatus::Registered => 0,
            ChainStatus::Active => 1,
            ChainStatus::Terminated => 2,
        }
    }
}

/// Summary of the most recent certificate accepted from a chain.
#[cw_serde]
pub struct LastCertificate {
    pub height: u64,
    pub timestamp: u64,
    pub state_root: [u8; 32],
    pub validators_hash: [u8; 32],
}

#[cw_serde]
pub struct ChainAccount {
    pub name: String,
    pub status: ChainStatus,
    pub last_certificate: LastCertificate,
}

#[cw_serde]
pub struct ChainValidators {
    /// Ordered by `bls_key`, no duplicates
    pub active_validators: Vec<ActiveValidator>,
    pub certificate_threshold: u64,
}

/// Frozen state of a terminated chain.
#[cw_serde]
pub struct TerminatedStateAccount {
    /// Last certified state root of the chain
    pub state_root: [u8; 32],
    /// Hub state root when the account was created from a partner proof;
    /// zero for accounts created by the hub itself
    pub mainchain_state_root: [u8; 32],
    pub initialized: bool,
}

/// Hub outbox toward a terminated chain, as needed for message recovery.
#[cw_serde]
pub struct TerminatedOutboxAccount {
    pub outbox_root: [u8; 32],
    pub outbox_size: u64,
    /// Messages the terminated chain had already received
    pub partner_chain_inbox_size: u64,
}

pub const CONFIG: Item<Config> = Item::new("config");

pub const OWN_CHAIN_ACCOUNT: Item<OwnChainAccount> = Item::new("own_chain_account");

/// Chain accounts
/// Key: chain_id (4 bytes)
pub const CHAIN_ACCOUNTS: Map<&[u8], ChainAccount> = Map::new("chain_accounts");

/// Channel with each registered chain
/// Key: chain_id (4 bytes)
pub const CHANNELS: Map<&[u8], ChannelData> = Map::new("channels");

/// Active validator set of each registered chain
/// Key: chain_id (4 bytes)
pub const CHAIN_VALIDATORS: Map<&[u8], ChainValidators> = Map::new("chain_validators");

/// Registered chain names, for uniqueness
/// Key: chain name, Value: chain_id
pub const REGISTERED_NAMES: Map<&str, ChainId> = Map::new("registered_names");

/// Token escrow per chain
/// Key: (chain_id, token_id), Value: escrowed amount
pub const ESCROWS: Map<(&[u8], &[u8]), Uint128> = Map::new("escrows");

/// Key: chain_id (4 bytes)
pub const TERMINATED_STATE_ACCOUNTS: Map<&[u8], TerminatedStateAccount> =
    Map::new("terminated_state_accounts");

/// Key: chain_id (4 bytes)
pub const TERMINATED_OUTBOX_ACCOUNTS: Map<&[u8], TerminatedOutboxAccount> =
    Map::new("terminated_outbox_accounts");
