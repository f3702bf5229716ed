//! Channel inboxes and outboxes, and messages the hub itself sends.

use cosmwasm_std::Storage;

use common::codec::Encode;
use common::types::{
    chain_id_to_hex, CcmStatus, ChainId, CrossChainMessage, CROSS_CHAIN_COMMAND_REGISTRATION,
};

use crate::context::StoreContext;
use crate::error::ContractError;
use crate::events::ccm_send_success;
use crate::state::{ChainStatus, CHAIN_ACCOUNTS, CHANNELS, OWN_CHAIN_ACCOUNT};

/// Append an encoded message to the outbox toward `chain_id`; returns the
/// new outbox root.
pub fn append_to_outbox(
    storage: &mut dyn Storage,
    chain_id: &ChainId,
    ccm: &[u8],
) -> Result<[u8; 32], ContractError> {
    let mut channel = CHANNELS.load(storage, chain_id)?;
    let root = channel.outbox.append(ccm);
    CHANNELS.save(storage, chain_id, &channel)?;
    Ok(root)
}

/// Append an encoded message to the inbox from `chain_id`; returns the new
/// inbox root.
pub fn append_to_inbox(
    storage: &mut dyn Storage,
    chain_id: &ChainId,
    ccm: &[u8],
) -> Result<[u8; 32], ContractError> {
    let mut channel = CHANNELS.load(storage, chain_id)?;
    let root = channel.inbox.append(ccm);
    CHANNELS.save(storage, chain_id, &channel)?;
    Ok(root)
}

/// A message originating on the hub.
pub struct OutgoingMessage<'a> {
    pub receiving_chain_id: ChainId,
    pub module: &'a str,
    pub cross_chain_command: &'a str,
    pub fee: u64,
    pub status: CcmStatus,
    pub params: Vec<u8>,
}

fn build_message(
    ctx: &mut StoreContext,
    message: OutgoingMessage,
) -> Result<CrossChainMessage, ContractError> {
    let mut own_chain = OWN_CHAIN_ACCOUNT.load(ctx.storage())?;
    let ccm = CrossChainMessage {
        module: message.module.to_string(),
        cross_chain_command: message.cross_chain_command.to_string(),
        nonce: own_chain.nonce,
        fee: message.fee,
        sending_chain_id: own_chain.chain_id,
        receiving_chain_id: message.receiving_chain_id,
        params: message.params,
        status: message.status,
    };
    ccm.validate_format()?;

    own_chain.nonce += 1;
    OWN_CHAIN_ACCOUNT.save(ctx.storage_mut(), &own_chain)?;
    Ok(ccm)
}

fn append_and_emit(ctx: &mut StoreContext, ccm: &CrossChainMessage) -> Result<(), ContractError> {
    append_to_outbox(ctx.storage_mut(), &ccm.receiving_chain_id, &ccm.encode())?;
    ctx.emit(ccm_send_success(ccm));
    Ok(())
}

/// Send a hub message to a registered chain.
///
/// The receiving chain must exist and not be terminated; a chain that has
/// not activated yet only accepts the registration handshake. The outbox
/// append is the last step, after the nonce and format are settled.
pub fn send_internal(
    ctx: &mut StoreContext,
    message: OutgoingMessage,
) -> Result<CrossChainMessage, ContractError> {
    let receiving_chain_id = message.receiving_chain_id;
    let account = CHAIN_ACCOUNTS
        .may_load(ctx.storage(), &receiving_chain_id)?
        .ok_or_else(|| ContractError::ChainNotFound {
            chain_id: chain_id_to_hex(&receiving_chain_id),
        })?;
    match account.status {
        ChainStatus::Terminated => {
            return Err(ContractError::ChainTerminated {
                chain_id: chain_id_to_hex(&receiving_chain_id),
            })
        }
        ChainStatus::Registered
            if message.cross_chain_command != CROSS_CHAIN_COMMAND_REGISTRATION =>
        {
            return Err(ContractError::ChainNotActive {
                chain_id: chain_id_to_hex(&receiving_chain_id),
            })
        }
        _ => {}
    }

    let ccm = build_message(ctx, message)?;
    append_and_emit(ctx, &ccm)?;
    Ok(ccm)
}

/// Send a hub message without checking the receiving chain's status, for
/// notices that must reach the outbox of a chain being terminated.
pub fn send_notice(
    ctx: &mut StoreContext,
    message: OutgoingMessage,
) -> Result<CrossChainMessage, ContractError> {
    let ccm = build_message(ctx, message)?;
    append_and_emit(ctx, &ccm)?;
    Ok(ccm)
}
