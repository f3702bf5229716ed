//! Liveness of registered chains.
//!
//! A chain is live while it keeps submitting certificates: an active chain
//! whose last certificate is older than [`LIVENESS_LIMIT`] can no longer
//! receive messages and may be terminated by anyone.

use cosmwasm_std::{StdResult, Storage};

use common::types::{is_mainchain_id, ChainId};

use crate::state::{ChainAccount, ChainStatus, CHAIN_ACCOUNTS, LIVENESS_LIMIT};

/// Liveness of a known chain account at `timestamp`.
pub fn is_account_live(account: &ChainAccount, timestamp: u64) -> bool {
    match account.status {
        ChainStatus::Terminated => false,
        ChainStatus::Active => {
            timestamp.saturating_sub(account.last_certificate.timestamp) <= LIVENESS_LIMIT
        }
        ChainStatus::Registered => true,
    }
}

/// Whether `chain_id` can still exchange messages at `timestamp`.
///
/// The own chain is always live. Only a hub tracks the liveness of other
/// chains, so any other chain is reported as not live elsewhere.
pub fn is_live(
    storage: &dyn Storage,
    own_chain_id: &ChainId,
    chain_id: &ChainId,
    timestamp: u64,
) -> StdResult<bool> {
    if chain_id == own_chain_id {
        return Ok(true);
    }
    if !is_mainchain_id(own_chain_id) {
        return Ok(false);
    }
    Ok(CHAIN_ACCOUNTS
        .may_load(storage, chain_id)?
        .map(|account| is_account_live(&account, timestamp))
        .unwrap_or(false))
}

/// A chain that never activated is stale once its registration is older
/// than the liveness limit.
pub fn is_stale_for_termination(account: &ChainAccount, timestamp: u64) -> bool {
    match account.status {
        ChainStatus::Terminated => false,
        ChainStatus::Active => !is_account_live(account, timestamp),
        ChainStatus::Registered => {
            timestamp.saturating_sub(account.last_certificate.timestamp) > LIVENESS_LIMIT
        }
    }
}
