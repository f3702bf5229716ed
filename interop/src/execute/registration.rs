//! Sidechain registration.
//!
//! Registration creates the chain account in `Registered` state, opens an
//! empty channel and queues the `registration` handshake message in the new
//! chain's outbox. The chain activates with its first accepted certificate.

use cosmwasm_std::{BankMsg, Binary, Coin, DepsMut, Env, MessageInfo, Response, Storage, Uint128};

use common::codec::Encode;
use common::hash::EMPTY_HASH;
use common::types::{
    chain_id_to_hex, compute_validators_hash, is_mainchain_id, ActiveValidator, CcmStatus, ChainId,
    ChannelData, RegistrationParams, CROSS_CHAIN_COMMAND_REGISTRATION,
    MODULE_NAME_INTEROPERABILITY,
};

use crate::certificate::validate_active_validators;
use crate::channel::{send_internal, OutgoingMessage};
use crate::context::StoreContext;
use crate::error::ContractError;
use crate::events::chain_account_updated;
use crate::state::{
    ChainAccount, ChainStatus, ChainValidators, Config, LastCertificate, CHAIN_ACCOUNTS,
    CHAIN_VALIDATORS, CHANNELS, CONFIG, ESCROWS, OWN_CHAIN_ACCOUNT, REGISTERED_NAMES,
};
use crate::validation::{is_valid_chain_name, parse_chain_id};

/// Check a registration request; returns the parsed chain id.
pub fn verify_sidechain_registration(
    storage: &dyn Storage,
    config: &Config,
    funds: &[Coin],
    chain_id: &[u8],
    name: &str,
    validators: &[ActiveValidator],
    certificate_threshold: u64,
) -> Result<ChainId, ContractError> {
    let chain_id = parse_chain_id(chain_id)?;
    let own_chain = OWN_CHAIN_ACCOUNT.load(storage)?;

    if chain_id[0] != own_chain.chain_id[0] {
        return Err(ContractError::InvalidChainId {
            reason: "network byte must match the hub".to_string(),
        });
    }
    if is_mainchain_id(&chain_id) {
        return Err(ContractError::InvalidChainId {
            reason: "mainchain IDs cannot be registered as sidechains".to_string(),
        });
    }
    if CHAIN_ACCOUNTS.has(storage, &chain_id) {
        return Err(ContractError::ChainIdNotAvailable {
            chain_id: chain_id_to_hex(&chain_id),
        });
    }

    if !is_valid_chain_name(name) {
        return Err(ContractError::InvalidChainName {
            name: name.to_string(),
        });
    }
    if REGISTERED_NAMES.has(storage, name) {
        return Err(ContractError::ChainNameNotAvailable {
            name: name.to_string(),
        });
    }

    validate_active_validators(validators, certificate_threshold)?;

    let fee = &config.registration_fee;
    if let Some(coin) = funds.iter().find(|coin| coin.denom != fee.denom) {
        return Err(ContractError::UnexpectedFunds {
            denom: coin.denom.clone(),
            expected: fee.denom.clone(),
        });
    }
    let paid = registration_payment(funds, &fee.denom);
    if paid < fee.amount {
        return Err(ContractError::InsufficientFee {
            expected: fee.amount,
            got: paid,
        });
    }
    Ok(chain_id)
}

fn registration_payment(funds: &[Coin], denom: &str) -> Uint128 {
    funds
        .iter()
        .filter(|coin| coin.denom == denom)
        .map(|coin| coin.amount)
        .sum()
}

/// Execute handler for `RegisterSidechain`.
pub fn execute_register_sidechain(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    chain_id: Binary,
    name: String,
    sidechain_validators: Vec<ActiveValidator>,
    sidechain_certificate_threshold: u64,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    let chain_id = verify_sidechain_registration(
        deps.storage,
        &config,
        &info.funds,
        &chain_id,
        &name,
        &sidechain_validators,
        sidechain_certificate_threshold,
    )?;

    let account = ChainAccount {
        name: name.clone(),
        status: ChainStatus::Registered,
        last_certificate: LastCertificate {
            height: 0,
            timestamp: env.block.time.seconds(),
            state_root: EMPTY_HASH,
            validators_hash: compute_validators_hash(
                &sidechain_validators,
                sidechain_certificate_threshold,
            ),
        },
    };
    CHAIN_ACCOUNTS.save(deps.storage, &chain_id, &account)?;
    CHANNELS.save(
        deps.storage,
        &chain_id,
        &ChannelData::new(config.message_fee_token_id, config.min_return_fee_per_byte),
    )?;
    CHAIN_VALIDATORS.save(
        deps.storage,
        &chain_id,
        &ChainValidators {
            active_validators: sidechain_validators,
            certificate_threshold: sidechain_certificate_threshold,
        },
    )?;
    REGISTERED_NAMES.save(deps.storage, &name, &chain_id)?;
    ESCROWS.save(
        deps.storage,
        (chain_id.as_slice(), config.message_fee_token_id.as_slice()),
        &Uint128::zero(),
    )?;

    let mut ctx = StoreContext::new(deps.storage, &env)?;
    ctx.emit(chain_account_updated(&chain_id, ChainStatus::Registered));
    let registration = send_internal(
        &mut ctx,
        OutgoingMessage {
            receiving_chain_id: chain_id,
            module: MODULE_NAME_INTEROPERABILITY,
            cross_chain_command: CROSS_CHAIN_COMMAND_REGISTRATION,
            fee: 0,
            status: CcmStatus::Ok,
            params: RegistrationParams {
                name: name.clone(),
                chain_id,
                message_fee_token_id: config.message_fee_token_id,
                min_return_fee_per_byte: config.min_return_fee_per_byte,
            }
            .encode(),
        },
    )?;

    let mut response = Response::new()
        .add_events(ctx.into_events())
        .add_attribute("method", "register_sidechain")
        .add_attribute("chain_id", chain_id_to_hex(&chain_id))
        .add_attribute("name", name)
        .add_attribute("registration_nonce", registration.nonce.to_string());

    let paid = registration_payment(&info.funds, &config.registration_fee.denom);
    if !paid.is_zero() {
        response = response.add_message(BankMsg::Send {
            to_address: config.fee_collector.to_string(),
            amount: vec![Coin {
                denom: config.registration_fee.denom.clone(),
                amount: paid,
            }],
        });
    }
    Ok(response)
}
