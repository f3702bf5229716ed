//! Query handlers for the interoperability contract.

use cosmwasm_std::{Binary, Deps, Env, Order, StdError, StdResult};
use cw_storage_plus::Bound;

use common::types::{chain_id_to_hex, is_mainchain_id, ChainId, MerkleAccumulator};

use crate::liveness::is_live;
use crate::msg::{
    AccumulatorResponse, AvailabilityResponse, ChainAccountResponse, ChainAccountsResponse,
    ChainValidatorsResponse, ChannelResponse, ConfigResponse, IsLiveResponse,
    LastCertificateResponse, OwnChainAccountResponse, TerminatedOutboxAccountResponse,
    TerminatedStateAccountResponse,
};
use crate::state::{
    ChainAccount, CHAIN_ACCOUNTS, CHAIN_VALIDATORS, CHANNELS, CONFIG, OWN_CHAIN_ACCOUNT,
    REGISTERED_NAMES, TERMINATED_OUTBOX_ACCOUNTS, TERMINATED_STATE_ACCOUNTS,
};
use crate::validation::{is_valid_chain_name, parse_chain_id};

fn chain_id_arg(chain_id: &Binary) -> StdResult<ChainId> {
    parse_chain_id(chain_id).map_err(|err| StdError::generic_err(err.to_string()))
}

fn not_found(what: &str, chain_id: &ChainId) -> StdError {
    StdError::not_found(format!("{} for chain {}", what, chain_id_to_hex(chain_id)))
}

fn hash_binary(hash: &[u8; 32]) -> Binary {
    Binary::from(hash.to_vec())
}

// ============================================================================
// Core Queries
// ============================================================================

pub fn query_config(deps: Deps) -> StdResult<ConfigResponse> {
    let config = CONFIG.load(deps.storage)?;
    Ok(ConfigResponse {
        fee_collector: config.fee_collector,
        registration_fee: config.registration_fee,
        message_fee_token_id: Binary::from(config.message_fee_token_id.to_vec()),
        min_return_fee_per_byte: config.min_return_fee_per_byte,
    })
}

pub fn query_own_chain_account(deps: Deps) -> StdResult<OwnChainAccountResponse> {
    let own_chain = OWN_CHAIN_ACCOUNT.load(deps.storage)?;
    Ok(OwnChainAccountResponse {
        chain_id: Binary::from(own_chain.chain_id.to_vec()),
        name: own_chain.name,
        nonce: own_chain.nonce,
    })
}

// ============================================================================
// Chain Registry Queries
// ============================================================================

fn chain_account_response(chain_id: &[u8], account: ChainAccount) -> ChainAccountResponse {
    let last = account.last_certificate;
    ChainAccountResponse {
        chain_id: Binary::from(chain_id.to_vec()),
        name: account.name,
        status: account.status,
        last_certificate: LastCertificateResponse {
            height: last.height,
            timestamp: last.timestamp,
            state_root: hash_binary(&last.state_root),
            validators_hash: hash_binary(&last.validators_hash),
        },
    }
}

pub fn query_chain_account(deps: Deps, chain_id: Binary) -> StdResult<ChainAccountResponse> {
    let chain_id = chain_id_arg(&chain_id)?;
    let account = CHAIN_ACCOUNTS
        .may_load(deps.storage, &chain_id)?
        .ok_or_else(|| not_found("chain account", &chain_id))?;
    Ok(chain_account_response(&chain_id, account))
}

/// Query chain accounts with pagination.
pub fn query_chain_accounts(
    deps: Deps,
    start_after: Option<Binary>,
    limit: Option<u32>,
) -> StdResult<ChainAccountsResponse> {
    let limit = limit.unwrap_or(10).min(50) as usize;
    let start: Option<Bound<&[u8]>> = start_after
        .as_ref()
        .map(|id| Bound::exclusive(id.as_slice()));

    let chains = CHAIN_ACCOUNTS
        .range(deps.storage, start, None, Order::Ascending)
        .take(limit)
        .map(|item| {
            let (chain_id, account) = item?;
            Ok(chain_account_response(&chain_id, account))
        })
        .collect::<StdResult<Vec<_>>>()?;

    Ok(ChainAccountsResponse { chains })
}

fn accumulator_response(accumulator: MerkleAccumulator) -> AccumulatorResponse {
    AccumulatorResponse {
        root: hash_binary(&accumulator.root),
        size: accumulator.size,
        append_path: accumulator.append_path.iter().map(hash_binary).collect(),
    }
}

pub fn query_channel(deps: Deps, chain_id: Binary) -> StdResult<ChannelResponse> {
    let chain_id = chain_id_arg(&chain_id)?;
    let channel = CHANNELS
        .may_load(deps.storage, &chain_id)?
        .ok_or_else(|| not_found("channel", &chain_id))?;
    Ok(ChannelResponse {
        inbox: accumulator_response(channel.inbox),
        outbox: accumulator_response(channel.outbox),
        partner_chain_outbox_root: hash_binary(&channel.partner_chain_outbox_root),
        message_fee_token_id: Binary::from(channel.message_fee_token_id.to_vec()),
        min_return_fee_per_byte: channel.min_return_fee_per_byte,
    })
}

pub fn query_chain_validators(deps: Deps, chain_id: Binary) -> StdResult<ChainValidatorsResponse> {
    let chain_id = chain_id_arg(&chain_id)?;
    let validators = CHAIN_VALIDATORS
        .may_load(deps.storage, &chain_id)?
        .ok_or_else(|| not_found("validators", &chain_id))?;
    Ok(ChainValidatorsResponse {
        active_validators: validators.active_validators,
        certificate_threshold: validators.certificate_threshold,
    })
}

// ============================================================================
// Termination Queries
// ============================================================================

pub fn query_terminated_state_account(
    deps: Deps,
    chain_id: Binary,
) -> StdResult<TerminatedStateAccountResponse> {
    let chain_id = chain_id_arg(&chain_id)?;
    let state = TERMINATED_STATE_ACCOUNTS
        .may_load(deps.storage, &chain_id)?
        .ok_or_else(|| not_found("terminated state account", &chain_id))?;
    Ok(TerminatedStateAccountResponse {
        state_root: hash_binary(&state.state_root),
        mainchain_state_root: hash_binary(&state.mainchain_state_root),
        initialized: state.initialized,
    })
}

pub fn query_terminated_outbox_account(
    deps: Deps,
    chain_id: Binary,
) -> StdResult<TerminatedOutboxAccountResponse> {
    let chain_id = chain_id_arg(&chain_id)?;
    let outbox = TERMINATED_OUTBOX_ACCOUNTS
        .may_load(deps.storage, &chain_id)?
        .ok_or_else(|| not_found("terminated outbox account", &chain_id))?;
    Ok(TerminatedOutboxAccountResponse {
        outbox_root: hash_binary(&outbox.outbox_root),
        outbox_size: outbox.outbox_size,
        partner_chain_inbox_size: outbox.partner_chain_inbox_size,
    })
}

// ============================================================================
// Availability & Liveness
// ============================================================================

/// A chain ID is available when it is well formed, on the hub's network, not
/// a mainchain ID and not yet registered.
pub fn query_is_chain_id_available(deps: Deps, chain_id: Binary) -> StdResult<AvailabilityResponse> {
    let Ok(chain_id) = parse_chain_id(&chain_id) else {
        return Ok(AvailabilityResponse { available: false });
    };
    let own_chain = OWN_CHAIN_ACCOUNT.load(deps.storage)?;
    let available = chain_id[0] == own_chain.chain_id[0]
        && !is_mainchain_id(&chain_id)
        && !CHAIN_ACCOUNTS.has(deps.storage, &chain_id);
    Ok(AvailabilityResponse { available })
}

pub fn query_is_chain_name_available(deps: Deps, name: String) -> StdResult<AvailabilityResponse> {
    let available = is_valid_chain_name(&name) && !REGISTERED_NAMES.has(deps.storage, &name);
    Ok(AvailabilityResponse { available })
}

pub fn query_is_live(
    deps: Deps,
    env: Env,
    chain_id: Binary,
    timestamp: Option<u64>,
) -> StdResult<IsLiveResponse> {
    let chain_id = chain_id_arg(&chain_id)?;
    let own_chain = OWN_CHAIN_ACCOUNT.load(deps.storage)?;
    let timestamp = timestamp.unwrap_or_else(|| env.block.time.seconds());
    Ok(IsLiveResponse {
        live: is_live(deps.storage, &own_chain.chain_id, &chain_id, timestamp)?,
    })
}
