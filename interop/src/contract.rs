//! Interoperability Contract - Entry Points
//!
//! The implementation is modularized into:
//! - `execute/` - Execute message handlers
//! - `query` - Query message handlers
//! - `delivery` - Applying, forwarding and bouncing cross-chain messages
//! - `cross_chain/` - Modules and commands cross-chain messages can target

use cosmwasm_std::{
    entry_point, to_json_binary, Binary, Deps, DepsMut, Env, MessageInfo, Response, StdResult,
};
use cw2::set_contract_version;

use common::types::{chain_id_to_hex, is_mainchain_id};

use crate::cross_chain::CommandRegistry;
use crate::error::ContractError;
use crate::execute::{
    execute_initialize_message_recovery, execute_recover_message, execute_register_sidechain,
    execute_submit_cross_chain_update, execute_terminate_sidechain_for_liveness, CrossChainUpdate,
};
use crate::msg::{ExecuteMsg, InstantiateMsg, MigrateMsg, QueryMsg};
use crate::query::{
    query_chain_account, query_chain_accounts, query_chain_validators, query_channel,
    query_config, query_is_chain_id_available, query_is_chain_name_available, query_is_live,
    query_own_chain_account, query_terminated_outbox_account, query_terminated_state_account,
};
use crate::state::{
    Config, OwnChainAccount, CONFIG, CONTRACT_NAME, CONTRACT_VERSION, OWN_CHAIN_ACCOUNT,
    REGISTERED_NAMES,
};
use crate::validation::{is_valid_chain_name, parse_chain_id, parse_token_id};

// ============================================================================
// Instantiate
// ============================================================================

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn instantiate(
    deps: DepsMut,
    _env: Env,
    _info: MessageInfo,
    msg: InstantiateMsg,
) -> Result<Response, ContractError> {
    set_contract_version(deps.storage, CONTRACT_NAME, CONTRACT_VERSION)?;

    let own_chain_id = parse_chain_id(&msg.own_chain_id)?;
    if !is_mainchain_id(&own_chain_id) {
        return Err(ContractError::InvalidChainId {
            reason: "the hub must use a mainchain ID".to_string(),
        });
    }
    if !is_valid_chain_name(&msg.own_name) {
        return Err(ContractError::InvalidChainName {
            name: msg.own_name,
        });
    }

    let config = Config {
        fee_collector: deps.api.addr_validate(&msg.fee_collector)?,
        registration_fee: msg.registration_fee,
        message_fee_token_id: parse_token_id(&msg.message_fee_token_id)?,
        min_return_fee_per_byte: msg.min_return_fee_per_byte,
    };
    CONFIG.save(deps.storage, &config)?;

    OWN_CHAIN_ACCOUNT.save(
        deps.storage,
        &OwnChainAccount {
            chain_id: own_chain_id,
            name: msg.own_name.clone(),
            nonce: 0,
        },
    )?;
    // Sidechains may not take the hub's name
    REGISTERED_NAMES.save(deps.storage, &msg.own_name, &own_chain_id)?;

    Ok(Response::new()
        .add_attribute("method", "instantiate")
        .add_attribute("own_chain_id", chain_id_to_hex(&own_chain_id))
        .add_attribute("own_name", msg.own_name)
        .add_attribute("fee_collector", config.fee_collector)
        .add_attribute("registration_fee", config.registration_fee.to_string()))
}

// ============================================================================
// Execute
// ============================================================================

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn execute(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    msg: ExecuteMsg,
) -> Result<Response, ContractError> {
    let registry = CommandRegistry::default();

    match msg {
        // Chain registry
        ExecuteMsg::RegisterSidechain {
            chain_id,
            name,
            sidechain_validators,
            sidechain_certificate_threshold,
        } => execute_register_sidechain(
            deps,
            env,
            info,
            chain_id,
            name,
            sidechain_validators,
            sidechain_certificate_threshold,
        ),

        // Certificates and messages
        ExecuteMsg::SubmitCrossChainUpdate {
            sending_chain_id,
            certificate,
            active_validators_update,
            certificate_threshold,
            inbox_update,
        } => execute_submit_cross_chain_update(
            deps,
            env,
            &registry,
            CrossChainUpdate {
                sending_chain_id: sending_chain_id.to_vec(),
                certificate: certificate.to_vec(),
                active_validators_update,
                certificate_threshold,
                inbox_update,
            },
        ),

        // Termination and recovery
        ExecuteMsg::TerminateSidechainForLiveness { chain_id } => {
            execute_terminate_sidechain_for_liveness(deps, env, chain_id)
        }
        ExecuteMsg::InitializeMessageRecovery {
            chain_id,
            channel,
            proof,
        } => execute_initialize_message_recovery(deps, chain_id, channel, proof),
        ExecuteMsg::RecoverMessage {
            chain_id,
            cross_chain_messages,
            idxs,
            sibling_hashes,
        } => execute_recover_message(
            deps,
            env,
            &registry,
            chain_id,
            cross_chain_messages,
            idxs,
            sibling_hashes,
        ),
    }
}

// ============================================================================
// Query
// ============================================================================

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn query(deps: Deps, env: Env, msg: QueryMsg) -> StdResult<Binary> {
    match msg {
        QueryMsg::Config {} => to_json_binary(&query_config(deps)?),
        QueryMsg::OwnChainAccount {} => to_json_binary(&query_own_chain_account(deps)?),
        QueryMsg::ChainAccount { chain_id } => to_json_binary(&query_chain_account(deps, chain_id)?),
        QueryMsg::ChainAccounts { start_after, limit } => {
            to_json_binary(&query_chain_accounts(deps, start_after, limit)?)
        }
        QueryMsg::Channel { chain_id } => to_json_binary(&query_channel(deps, chain_id)?),
        QueryMsg::ChainValidators { chain_id } => {
            to_json_binary(&query_chain_validators(deps, chain_id)?)
        }
        QueryMsg::TerminatedStateAccount { chain_id } => {
            to_json_binary(&query_terminated_state_account(deps, chain_id)?)
        }
        QueryMsg::TerminatedOutboxAccount { chain_id } => {
            to_json_binary(&query_terminated_outbox_account(deps, chain_id)?)
        }
        QueryMsg::IsChainIdAvailable { chain_id } => {
            to_json_binary(&query_is_chain_id_available(deps, chain_id)?)
        }
        QueryMsg::IsChainNameAvailable { name } => {
            to_json_binary(&query_is_chain_name_available(deps, name)?)
        }
        QueryMsg::IsLive {
            chain_id,
            timestamp,
        } => to_json_binary(&query_is_live(deps, env, chain_id, timestamp)?),
    }
}

// ============================================================================
// Migrate
// ============================================================================

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn migrate(deps: DepsMut, _env: Env, _msg: MigrateMsg) -> Result<Response, ContractError> {
    set_contract_version(deps.storage, CONTRACT_NAME, CONTRACT_VERSION)?;

    Ok(Response::new()
        .add_attribute("action", "migrate")
        .add_attribute("version", CONTRACT_VERSION))
}
