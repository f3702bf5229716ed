//! Recovery of messages stuck in the outbox of a terminated chain.
//!
//! Recovery is a two-step process. `InitializeMessageRecovery` proves, against
//! the terminated chain's last certified state root, how many messages that
//! chain had received from the hub, and freezes the hub's outbox toward it.
//! `RecoverMessage` then proves pending messages against the frozen outbox
//! root and sends each one back to where it came from with status
//! `Recovered`. Recovered leaves are replaced in the frozen root, so the same
//! message cannot be recovered twice.

use cosmwasm_std::{Binary, DepsMut, Env, Response, Storage};

use common::codec::{Decode, Encode};
use common::hash::leaf_hash;
use common::merkle::calculate_root_from_proof;
use common::smt::{state_key, verify_inclusion, SparseMerkleProof};
use common::types::{
    chain_id_to_hex, CcmStatus, ChainId, ChannelData, CrossChainMessage,
    MODULE_NAME_INTEROPERABILITY, SUBSTORE_PREFIX_CHANNEL,
};

use crate::context::StoreContext;
use crate::cross_chain::CommandRegistry;
use crate::delivery::{apply_ccm, forward_ccm};
use crate::error::ContractError;
use crate::events::{
    ccm_processed, terminated_outbox_created, terminated_outbox_updated, CcmProcessedCode,
    CcmProcessedResult,
};
use crate::liveness::is_live;
use crate::state::{
    TerminatedOutboxAccount, CHANNELS, OWN_CHAIN_ACCOUNT, TERMINATED_OUTBOX_ACCOUNTS,
    TERMINATED_STATE_ACCOUNTS,
};
use crate::validation::{parse_chain_id, parse_hashes};

// ============================================================================
// InitializeMessageRecovery
// ============================================================================

/// Check the proof of the terminated chain's channel; returns the chain id
/// and the proven channel.
pub fn verify_message_recovery_initialization(
    storage: &dyn Storage,
    chain_id: &[u8],
    channel: &[u8],
    proof: &SparseMerkleProof,
) -> Result<(ChainId, ChannelData), ContractError> {
    let chain_id = parse_chain_id(chain_id)?;
    let own_chain = OWN_CHAIN_ACCOUNT.load(storage)?;

    let state = TERMINATED_STATE_ACCOUNTS
        .may_load(storage, &chain_id)?
        .filter(|state| state.initialized)
        .ok_or_else(|| ContractError::TerminatedStateAccountNotFound {
            chain_id: chain_id_to_hex(&chain_id),
        })?;
    if TERMINATED_OUTBOX_ACCOUNTS.has(storage, &chain_id) {
        return Err(ContractError::TerminatedOutboxAccountExists {
            chain_id: chain_id_to_hex(&chain_id),
        });
    }

    let partner_channel = ChannelData::decode(channel)?;
    let key = state_key(
        MODULE_NAME_INTEROPERABILITY,
        &SUBSTORE_PREFIX_CHANNEL,
        &own_chain.chain_id,
    );
    if !verify_inclusion(&state.state_root, &key, channel, proof) {
        return Err(ContractError::InvalidChannelProof);
    }
    Ok((chain_id, partner_channel))
}

pub fn execute_initialize_message_recovery(
    deps: DepsMut,
    chain_id: Binary,
    channel: Binary,
    proof: SparseMerkleProof,
) -> Result<Response, ContractError> {
    let (chain_id, partner_channel) =
        verify_message_recovery_initialization(deps.storage, &chain_id, &channel, &proof)?;

    let own_channel = CHANNELS.load(deps.storage, &chain_id)?;
    let account = TerminatedOutboxAccount {
        outbox_root: own_channel.outbox.root,
        outbox_size: own_channel.outbox.size,
        partner_chain_inbox_size: partner_channel.inbox.size,
    };
    TERMINATED_OUTBOX_ACCOUNTS.save(deps.storage, &chain_id, &account)?;

    Ok(Response::new()
        .add_event(terminated_outbox_created(
            &chain_id,
            &account.outbox_root,
            account.outbox_size,
            account.partner_chain_inbox_size,
        ))
        .add_attribute("method", "initialize_message_recovery")
        .add_attribute("chain_id", chain_id_to_hex(&chain_id)))
}

// ============================================================================
// RecoverMessage
// ============================================================================

/// A verified recovery request.
#[derive(Debug)]
pub struct VerifiedRecovery {
    pub chain_id: ChainId,
    account: TerminatedOutboxAccount,
    messages: Vec<CrossChainMessage>,
    idxs: Vec<u64>,
    sibling_hashes: Vec<[u8; 32]>,
}

pub fn verify_message_recovery(
    storage: &dyn Storage,
    own_chain_id: &ChainId,
    timestamp: u64,
    chain_id: &[u8],
    cross_chain_messages: &[Binary],
    idxs: &[u64],
    sibling_hashes: &[Binary],
) -> Result<VerifiedRecovery, ContractError> {
    let chain_id = parse_chain_id(chain_id)?;
    let account = TERMINATED_OUTBOX_ACCOUNTS
        .may_load(storage, &chain_id)?
        .ok_or_else(|| ContractError::TerminatedOutboxAccountNotFound {
            chain_id: chain_id_to_hex(&chain_id),
        })?;

    if idxs.is_empty() || idxs.len() != cross_chain_messages.len() {
        return Err(ContractError::InvalidRecoveryIndexes {
            reason: format!(
                "{} indexes for {} messages",
                idxs.len(),
                cross_chain_messages.len()
            ),
        });
    }
    if idxs.windows(2).any(|pair| pair[0] >= pair[1]) {
        return Err(ContractError::InvalidRecoveryIndexes {
            reason: "indexes must be strictly ascending".to_string(),
        });
    }
    if let Some(index) = idxs
        .iter()
        .find(|index| **index < account.partner_chain_inbox_size || **index >= account.outbox_size)
    {
        return Err(ContractError::InvalidRecoveryIndexes {
            reason: format!(
                "index {} outside the pending range {}..{}",
                index, account.partner_chain_inbox_size, account.outbox_size
            ),
        });
    }

    let mut messages = Vec::with_capacity(cross_chain_messages.len());
    for (index, bytes) in cross_chain_messages.iter().enumerate() {
        let ccm = CrossChainMessage::decode(bytes).map_err(|err| {
            ContractError::InvalidRecoveryMessage {
                index,
                reason: err.to_string(),
            }
        })?;
        if ccm.status != CcmStatus::Ok {
            return Err(ContractError::InvalidRecoveryMessage {
                index,
                reason: "only messages with status OK can be recovered".to_string(),
            });
        }
        if ccm.receiving_chain_id != chain_id {
            return Err(ContractError::InvalidRecoveryMessage {
                index,
                reason: "message is not addressed to the terminated chain".to_string(),
            });
        }
        if !is_live(storage, own_chain_id, &ccm.sending_chain_id, timestamp)? {
            return Err(ContractError::InvalidRecoveryMessage {
                index,
                reason: "sending chain is not live".to_string(),
            });
        }
        messages.push(ccm);
    }

    let sibling_hashes = parse_hashes(sibling_hashes)?;
    let leaves: Vec<[u8; 32]> = cross_chain_messages
        .iter()
        .map(|bytes| leaf_hash(bytes))
        .collect();
    let root = calculate_root_from_proof(account.outbox_size, idxs, &leaves, &sibling_hashes)
        .map_err(|_| ContractError::InvalidRecoveryProof)?;
    if root != account.outbox_root {
        return Err(ContractError::InvalidRecoveryProof);
    }

    Ok(VerifiedRecovery {
        chain_id,
        account,
        messages,
        idxs: idxs.to_vec(),
        sibling_hashes,
    })
}

/// The message as sent back to its origin.
fn recovered_message(ccm: &CrossChainMessage) -> CrossChainMessage {
    CrossChainMessage {
        sending_chain_id: ccm.receiving_chain_id,
        receiving_chain_id: ccm.sending_chain_id,
        status: CcmStatus::Recovered,
        ..ccm.clone()
    }
}

fn deliver_recovered(
    ctx: &mut StoreContext,
    registry: &CommandRegistry,
    recovered: &CrossChainMessage,
) -> Result<CcmProcessedResult, ContractError> {
    for module in registry.modules() {
        module.before_recover_ccm(ctx, recovered)?;
    }
    if recovered.receiving_chain_id == ctx.own_chain_id {
        apply_ccm(ctx, registry, recovered)
    } else {
        forward_ccm(ctx, registry, recovered)
    }
}

/// Deliver every verified message and update the frozen outbox root.
/// Returns how many messages were delivered rather than discarded.
pub fn execute_message_recovery(
    ctx: &mut StoreContext,
    registry: &CommandRegistry,
    verified: VerifiedRecovery,
) -> Result<usize, ContractError> {
    let mut delivered = 0;
    let mut recovered_leaves = Vec::with_capacity(verified.messages.len());
    for ccm in &verified.messages {
        let recovered = recovered_message(ccm);
        recovered_leaves.push(leaf_hash(&recovered.encode()));

        let snapshot = ctx.create_snapshot();
        match deliver_recovered(ctx, registry, &recovered) {
            Ok(CcmProcessedResult::Discarded) => {}
            Ok(_) => delivered += 1,
            Err(_) => {
                ctx.restore_snapshot(snapshot);
                ctx.emit(ccm_processed(
                    &recovered,
                    CcmProcessedResult::Discarded,
                    CcmProcessedCode::FailedCcm,
                ));
            }
        }
    }

    let mut account = verified.account;
    account.outbox_root = calculate_root_from_proof(
        account.outbox_size,
        &verified.idxs,
        &recovered_leaves,
        &verified.sibling_hashes,
    )?;
    TERMINATED_OUTBOX_ACCOUNTS.save(ctx.storage_mut(), &verified.chain_id, &account)?;
    ctx.emit(terminated_outbox_updated(&verified.chain_id, &account.outbox_root));
    Ok(delivered)
}

pub fn execute_recover_message(
    deps: DepsMut,
    env: Env,
    registry: &CommandRegistry,
    chain_id: Binary,
    cross_chain_messages: Vec<Binary>,
    idxs: Vec<u64>,
    sibling_hashes: Vec<Binary>,
) -> Result<Response, ContractError> {
    let own_chain_id = OWN_CHAIN_ACCOUNT.load(deps.storage)?.chain_id;
    let verified = verify_message_recovery(
        deps.storage,
        &own_chain_id,
        env.block.time.seconds(),
        &chain_id,
        &cross_chain_messages,
        &idxs,
        &sibling_hashes,
    )?;
    let chain_id = verified.chain_id;
    let count = verified.messages.len();

    let mut ctx = StoreContext::new(deps.storage, &env)?;
    let delivered = execute_message_recovery(&mut ctx, registry, verified)?;

    Ok(Response::new()
        .add_events(ctx.into_events())
        .add_attribute("method", "recover_message")
        .add_attribute("chain_id", chain_id_to_hex(&chain_id))
        .add_attribute("recovered", count.to_string())
        .add_attribute("delivered", delivered.to_string()))
}


#[cfg(test)]
mod tests {
    use super::*;
    use common::merkle::MerkleTree;
    use common::types::TokenId;
    use cosmwasm_std::testing::{mock_dependencies, mock_env};

    use crate::context::tests::{save_own_chain, HUB};
    use crate::cross_chain::tests::{recover_marker, registry_with_token, EVENT_TOKEN_RECOVER, TOKEN_MODULE};
    use crate::events::{EVENT_CCM_PROCESSED, EVENT_CCM_SEND_SUCCESS};
    use crate::state::{ChainAccount, ChainStatus, LastCertificate, CHAIN_ACCOUNTS};

    const TERMINATED: ChainId = [4, 0, 0, 1];
    const ORIGIN: ChainId = [4, 0, 0, 2];
    const FEE_TOKEN: TokenId = [4, 0, 0, 0, 0, 0, 0, 0];

    fn save_chain(storage: &mut dyn Storage, chain_id: &ChainId, status: ChainStatus, timestamp: u64) {
        CHAIN_ACCOUNTS
            .save(
                storage,
                chain_id,
                &ChainAccount {
                    name: format!("chain{}", chain_id[3]),
                    status,
                    last_certificate: LastCertificate {
                        height: 1,
                        timestamp,
                        state_root: [chain_id[3]; 32],
                        validators_hash: [0u8; 32],
                    },
                },
            )
            .unwrap();
        CHANNELS
            .save(storage, chain_id, &ChannelData::new(FEE_TOKEN, 0))
            .unwrap();
    }

    fn transfer(nonce: u64, params: Vec<u8>) -> CrossChainMessage {
        CrossChainMessage {
            module: TOKEN_MODULE.to_string(),
            cross_chain_command: "transfer".to_string(),
            nonce,
            fee: 100,
            sending_chain_id: ORIGIN,
            receiving_chain_id: TERMINATED,
            params,
            status: CcmStatus::Ok,
        }
    }

    fn attribute(event: &cosmwasm_std::Event, key: &str) -> String {
        event
            .attributes
            .iter()
            .find(|a| a.key == key)
            .map(|a| a.value.clone())
            .unwrap()
    }

    #[test]
    fn test_failed_recovery_rolls_back_only_that_message() {
        let mut deps = mock_dependencies();
        let env = mock_env();
        let now = env.block.time.seconds();
        save_own_chain(deps.as_mut().storage);
        save_chain(deps.as_mut().storage, &TERMINATED, ChainStatus::Terminated, now);
        save_chain(deps.as_mut().storage, &ORIGIN, ChainStatus::Active, now);

        // Nonce 2 is rejected by the token module's recovery hook
        let messages = vec![transfer(1, vec![1]).encode(), transfer(2, vec![0xff]).encode()];
        let tree = MerkleTree::new(&messages);
        TERMINATED_OUTBOX_ACCOUNTS
            .save(
                deps.as_mut().storage,
                &TERMINATED,
                &TerminatedOutboxAccount {
                    outbox_root: tree.root(),
                    outbox_size: 2,
                    partner_chain_inbox_size: 0,
                },
            )
            .unwrap();

        let siblings: Vec<Binary> = tree
            .prove(&[0, 1])
            .unwrap()
            .iter()
            .map(|hash| Binary::from(hash.to_vec()))
            .collect();
        let encoded: Vec<Binary> = messages.iter().cloned().map(Binary::from).collect();
        let verified = verify_message_recovery(
            &deps.storage,
            &HUB,
            now,
            &TERMINATED,
            &encoded,
            &[0, 1],
            &siblings,
        )
        .unwrap();

        let registry = registry_with_token(None);
        let mut ctx = StoreContext::new(&mut deps.storage, &env).unwrap();
        let delivered = execute_message_recovery(&mut ctx, &registry, verified).unwrap();
        assert_eq!(delivered, 1);

        let good = recovered_message(&transfer(1, vec![1]));
        let failed = recovered_message(&transfer(2, vec![0xff]));

        // The first message reached its origin, the second left no writes
        let mut expected_outbox = ChannelData::new(FEE_TOKEN, 0).outbox;
        expected_outbox.append(&good.encode());
        assert_eq!(CHANNELS.load(ctx.storage(), &ORIGIN).unwrap().outbox, expected_outbox);
        assert!(ctx.storage().get(&recover_marker(1)).is_some());
        assert!(ctx.storage().get(&recover_marker(2)).is_none());

        let events = ctx.events();
        let hook_events: Vec<_> = events.iter().filter(|e| e.ty == EVENT_TOKEN_RECOVER).collect();
        assert_eq!(hook_events.len(), 1);
        assert_eq!(attribute(hook_events[0], "nonce"), "1");
        assert_eq!(
            events.iter().filter(|e| e.ty == EVENT_CCM_SEND_SUCCESS).count(),
            1
        );

        let processed: Vec<(String, String, String)> = events
            .iter()
            .filter(|e| e.ty == EVENT_CCM_PROCESSED)
            .map(|e| {
                (
                    attribute(e, "ccm_id"),
                    attribute(e, "result"),
                    attribute(e, "code"),
                )
            })
            .collect();
        assert_eq!(
            processed,
            vec![
                (
                    common::hash::bytes32_to_hex(&good.id()),
                    "forwarded".to_string(),
                    "0".to_string()
                ),
                (
                    common::hash::bytes32_to_hex(&failed.id()),
                    "discarded".to_string(),
                    "4".to_string()
                ),
            ]
        );

        // Both leaves are replaced, whatever happened to their delivery
        let account = TERMINATED_OUTBOX_ACCOUNTS.load(ctx.storage(), &TERMINATED).unwrap();
        let expected_root = MerkleTree::new(&[good.encode(), failed.encode()]).root();
        assert_eq!(account.outbox_root, expected_root);
        assert_eq!(account.outbox_size, 2);
    }
}
