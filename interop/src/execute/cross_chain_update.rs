//! Cross-chain update (CCU) handling.
//!
//! A CCU carries an optional certificate of the sending chain and an optional
//! inbox update. Verification is read-only and rejects the whole transaction
//! on any failure. Execution then persists the certificate and processes the
//! messages one by one; a bad message never reverts the update, it is
//! discarded, bounced or leads to the termination of its sender.

use cosmwasm_std::{DepsMut, Env, Response, Storage};

use common::codec::Decode;
use common::hash::keccak256;
use common::merkle::calculate_root_from_right_witness;
use common::smt::{state_key, verify_inclusion};
use common::types::{
    chain_id_to_hex, compute_validators_hash, ActiveValidator, Certificate, ChainId,
    CrossChainMessage, MODULE_NAME_INTEROPERABILITY, SUBSTORE_PREFIX_OUTBOX_ROOT,
};

use crate::certificate::{validate_active_validators, verify_certificate};
use crate::channel::append_to_inbox;
use crate::context::StoreContext;
use crate::cross_chain::CommandRegistry;
use crate::delivery::{apply_ccm, forward_ccm};
use crate::error::ContractError;
use crate::events::{
    ccm_processed, ccm_undecodable, chain_account_updated, CcmProcessedCode, CcmProcessedResult,
};
use crate::liveness::is_live;
use crate::msg::InboxUpdate;
use crate::state::{
    ChainAccount, ChainStatus, ChainValidators, LastCertificate, CHAIN_ACCOUNTS, CHAIN_VALIDATORS,
    CHANNELS, LIVENESS_LIMIT, OWN_CHAIN_ACCOUNT,
};
use crate::termination::terminate_chain;
use crate::validation::{parse_chain_id, parse_hashes};

/// Parameters of a `SubmitCrossChainUpdate` message.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CrossChainUpdate {
    pub sending_chain_id: Vec<u8>,
    /// Encoded certificate, empty when absent
    pub certificate: Vec<u8>,
    pub active_validators_update: Vec<ActiveValidator>,
    pub certificate_threshold: u64,
    pub inbox_update: InboxUpdate,
}

/// Result of verification, consumed by execution.
#[derive(Debug)]
pub struct VerifiedUpdate {
    pub sending_chain_id: ChainId,
    account: ChainAccount,
    certificate: Option<Certificate>,
    validators_update: Option<ChainValidators>,
    partner_outbox_root: Option<[u8; 32]>,
}

/// Counts reported in the response.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub applied: u32,
    pub forwarded: u32,
    pub bounced: u32,
    pub discarded: u32,
    pub sender_terminated: bool,
}

impl UpdateOutcome {
    fn record(&mut self, result: CcmProcessedResult) {
        match result {
            CcmProcessedResult::Applied => self.applied += 1,
            CcmProcessedResult::Forwarded => self.forwarded += 1,
            CcmProcessedResult::Bounced => self.bounced += 1,
            CcmProcessedResult::Discarded => self.discarded += 1,
        }
    }

    pub fn processed(&self) -> u32 {
        self.applied + self.forwarded + self.bounced + self.discarded
    }

    pub fn is_accepted(&self) -> bool {
        self.discarded == 0 && !self.sender_terminated
    }
}

// ============================================================================
// Verify
// ============================================================================

pub fn verify_cross_chain_update(
    storage: &dyn Storage,
    own_chain_id: &ChainId,
    timestamp: u64,
    update: &CrossChainUpdate,
) -> Result<VerifiedUpdate, ContractError> {
    let chain_id = parse_chain_id(&update.sending_chain_id)?;
    if update.certificate.is_empty() && update.inbox_update.is_empty() {
        return Err(ContractError::EmptyCrossChainUpdate);
    }

    let account = CHAIN_ACCOUNTS
        .may_load(storage, &chain_id)?
        .ok_or_else(|| ContractError::ChainNotFound {
            chain_id: chain_id_to_hex(&chain_id),
        })?;
    if !is_live(storage, own_chain_id, &chain_id, timestamp)? {
        return Err(ContractError::ChainNotLive {
            chain_id: chain_id_to_hex(&chain_id),
        });
    }
    if account.status == ChainStatus::Registered && update.certificate.is_empty() {
        return Err(ContractError::CertificateRequired);
    }

    let validators = CHAIN_VALIDATORS.load(storage, &chain_id)?;
    let update_requested = !update.active_validators_update.is_empty()
        || update.certificate_threshold != validators.certificate_threshold;
    let validators_update = if update_requested {
        if update.certificate.is_empty() {
            return Err(ContractError::ValidatorsUpdateWithoutCertificate);
        }
        let active_validators = if update.active_validators_update.is_empty() {
            validators.active_validators.clone()
        } else {
            update.active_validators_update.clone()
        };
        validate_active_validators(&active_validators, update.certificate_threshold)?;
        Some(ChainValidators {
            active_validators,
            certificate_threshold: update.certificate_threshold,
        })
    } else {
        None
    };

    let certificate = if update.certificate.is_empty() {
        None
    } else {
        let certificate = Certificate::decode(&update.certificate)?;
        let expected_validators_hash = match &validators_update {
            Some(new) => compute_validators_hash(&new.active_validators, new.certificate_threshold),
            None => account.last_certificate.validators_hash,
        };
        verify_certificate(
            &chain_id,
            &account,
            &validators,
            &certificate,
            timestamp,
            &expected_validators_hash,
        )?;

        if !update.inbox_update.is_empty() {
            // A registered chain has half the limit to deliver its first messages
            let limit = if account.status == ChainStatus::Registered {
                LIVENESS_LIMIT / 2
            } else {
                LIVENESS_LIMIT
            };
            let age = timestamp.saturating_sub(certificate.timestamp);
            if age > limit {
                return Err(ContractError::CertificateLivenessExpired { age, limit });
            }
        }
        Some(certificate)
    };

    let partner_outbox_root = if update.inbox_update.is_empty() {
        None
    } else {
        Some(verify_inbox_update(
            storage,
            own_chain_id,
            &chain_id,
            certificate.as_ref(),
            &update.inbox_update,
        )?)
    };

    Ok(VerifiedUpdate {
        sending_chain_id: chain_id,
        account,
        certificate,
        validators_update,
        partner_outbox_root,
    })
}

/// Check that appending the update's messages to the inbox reproduces the
/// partner's outbox root; returns that root.
fn verify_inbox_update(
    storage: &dyn Storage,
    own_chain_id: &ChainId,
    chain_id: &ChainId,
    certificate: Option<&Certificate>,
    inbox_update: &InboxUpdate,
) -> Result<[u8; 32], ContractError> {
    let channel = CHANNELS.load(storage, chain_id)?;
    let mut inbox = channel.inbox;
    for ccm in &inbox_update.cross_chain_messages {
        inbox.append(ccm);
    }

    let witness = parse_hashes(&inbox_update.message_witness_hashes)?;
    let outbox_root = calculate_root_from_right_witness(inbox.size, &inbox.append_path, &witness)?;

    match certificate {
        Some(certificate) => {
            let key = state_key(
                MODULE_NAME_INTEROPERABILITY,
                &SUBSTORE_PREFIX_OUTBOX_ROOT,
                own_chain_id,
            );
            if !verify_inclusion(
                &certificate.state_root,
                &key,
                &outbox_root,
                &inbox_update.outbox_root_witness,
            ) {
                return Err(ContractError::InvalidOutboxRootWitness);
            }
        }
        None => {
            if outbox_root != channel.partner_chain_outbox_root {
                return Err(ContractError::PartnerOutboxRootMismatch);
            }
        }
    }
    Ok(outbox_root)
}

// ============================================================================
// Execute
// ============================================================================

pub fn execute_cross_chain_update(
    ctx: &mut StoreContext,
    registry: &CommandRegistry,
    update: &CrossChainUpdate,
    verified: VerifiedUpdate,
) -> Result<UpdateOutcome, ContractError> {
    let chain_id = verified.sending_chain_id;
    let mut account = verified.account;

    if let Some(certificate) = &verified.certificate {
        account.last_certificate = LastCertificate {
            height: certificate.height,
            timestamp: certificate.timestamp,
            state_root: certificate.state_root,
            validators_hash: certificate.validators_hash,
        };
        if account.status == ChainStatus::Registered {
            account.status = ChainStatus::Active;
            ctx.emit(chain_account_updated(&chain_id, ChainStatus::Active));
        }
        CHAIN_ACCOUNTS.save(ctx.storage_mut(), &chain_id, &account)?;
    }
    if let Some(validators) = &verified.validators_update {
        CHAIN_VALIDATORS.save(ctx.storage_mut(), &chain_id, validators)?;
    }

    let mut outcome = UpdateOutcome::default();
    for bytes in &update.inbox_update.cross_chain_messages {
        let bytes = bytes.as_slice();
        let ccm = match CrossChainMessage::decode(bytes) {
            Ok(ccm) => ccm,
            Err(_) => {
                terminate_chain(ctx, &chain_id)?;
                ctx.emit(ccm_undecodable(
                    &keccak256(bytes),
                    &chain_id,
                    CcmProcessedCode::InvalidCcmDecodingException,
                ));
                outcome.discarded += 1;
                outcome.sender_terminated = true;
                break;
            }
        };

        let violation = if ccm.sending_chain_id != chain_id {
            Some(CcmProcessedCode::InvalidCcmRoutingException)
        } else if ccm.validate_format().is_err() {
            Some(CcmProcessedCode::InvalidCcmValidateException)
        } else {
            None
        };
        if let Some(code) = violation {
            terminate_chain(ctx, &chain_id)?;
            ctx.emit(ccm_processed(&ccm, CcmProcessedResult::Discarded, code));
            outcome.discarded += 1;
            outcome.sender_terminated = true;
            break;
        }

        append_to_inbox(ctx.storage_mut(), &chain_id, bytes)?;
        let result = if ccm.receiving_chain_id == ctx.own_chain_id {
            apply_ccm(ctx, registry, &ccm)?
        } else {
            forward_ccm(ctx, registry, &ccm)?
        };
        outcome.record(result);

        if CHAIN_ACCOUNTS.load(ctx.storage(), &chain_id)?.status == ChainStatus::Terminated {
            outcome.sender_terminated = true;
            break;
        }
    }

    if let Some(root) = verified.partner_outbox_root {
        if !outcome.sender_terminated {
            let mut channel = CHANNELS.load(ctx.storage(), &chain_id)?;
            channel.partner_chain_outbox_root = root;
            CHANNELS.save(ctx.storage_mut(), &chain_id, &channel)?;
        }
    }
    Ok(outcome)
}

/// Execute handler for `SubmitCrossChainUpdate`.
pub fn execute_submit_cross_chain_update(
    deps: DepsMut,
    env: Env,
    registry: &CommandRegistry,
    update: CrossChainUpdate,
) -> Result<Response, ContractError> {
    let own_chain_id = OWN_CHAIN_ACCOUNT.load(deps.storage)?.chain_id;
    let verified =
        verify_cross_chain_update(deps.storage, &own_chain_id, env.block.time.seconds(), &update)?;
    let chain_id = verified.sending_chain_id;

    let mut ctx = StoreContext::new(deps.storage, &env)?;
    let outcome = execute_cross_chain_update(&mut ctx, registry, &update, verified)?;

    Ok(Response::new()
        .add_events(ctx.into_events())
        .add_attribute("method", "submit_cross_chain_update")
        .add_attribute("sending_chain_id", chain_id_to_hex(&chain_id))
        .add_attribute(
            "outcome",
            if outcome.is_accepted() { "accepted" } else { "partial" },
        )
        .add_attribute("processed", outcome.processed().to_string())
        .add_attribute("discarded", outcome.discarded.to_string())
        .add_attribute("sender_terminated", outcome.sender_terminated.to_string()))
}
