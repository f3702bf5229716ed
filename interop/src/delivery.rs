//! Delivery of inbound cross-chain messages.
//!
//! A message addressed to the hub is applied through the command registry.
//! Any other message is forwarded to the outbox of its receiving chain, or
//! bounced back to its sender when that chain cannot take it. None of these
//! paths fail the surrounding transaction for a message-level problem: the
//! outcome is reported as a `ccm_processed` event.

use common::codec::Encode;
use common::types::{
    CcmStatus, CrossChainMessage, SidechainTerminatedParams, CROSS_CHAIN_COMMAND_SIDECHAIN_TERMINATED,
    MODULE_NAME_INTEROPERABILITY,
};

use crate::channel::{append_to_outbox, send_internal, OutgoingMessage};
use crate::context::StoreContext;
use crate::cross_chain::CommandRegistry;
use crate::error::ContractError;
use crate::events::{ccm_processed, ccm_send_success, CcmProcessedCode, CcmProcessedResult};
use crate::liveness::{is_account_live, is_stale_for_termination};
use crate::state::{ChainStatus, CHAIN_ACCOUNTS};
use crate::termination::terminate_chain;

fn discard(
    ctx: &mut StoreContext,
    ccm: &CrossChainMessage,
    code: CcmProcessedCode,
) -> CcmProcessedResult {
    ctx.emit(ccm_processed(ccm, CcmProcessedResult::Discarded, code));
    CcmProcessedResult::Discarded
}

/// Discard `ccm` and terminate its sending chain.
fn reject_sender(
    ctx: &mut StoreContext,
    ccm: &CrossChainMessage,
    code: CcmProcessedCode,
) -> Result<CcmProcessedResult, ContractError> {
    terminate_chain(ctx, &ccm.sending_chain_id)?;
    Ok(discard(ctx, ccm, code))
}

/// Apply a message addressed to this chain.
pub fn apply_ccm(
    ctx: &mut StoreContext,
    registry: &CommandRegistry,
    ccm: &CrossChainMessage,
) -> Result<CcmProcessedResult, ContractError> {
    if !registry.has_module(&ccm.module) {
        return Ok(discard(ctx, ccm, CcmProcessedCode::ModuleNotSupported));
    }
    let Some(command) = registry.command(&ccm.module, &ccm.cross_chain_command) else {
        return Ok(discard(ctx, ccm, CcmProcessedCode::CrossChainCommandNotSupported));
    };

    for module in registry.modules() {
        if module.verify_cross_chain_message(ctx, ccm).is_err() {
            return reject_sender(ctx, ccm, CcmProcessedCode::InvalidCcmVerifyCcmException);
        }
    }
    if command.verify(ctx, ccm).is_err() {
        return Ok(discard(ctx, ccm, CcmProcessedCode::FailedCcm));
    }

    let snapshot = ctx.create_snapshot();
    for module in registry.modules() {
        if module.before_cross_chain_command_execute(ctx, ccm).is_err() {
            ctx.restore_snapshot(snapshot);
            return reject_sender(
                ctx,
                ccm,
                CcmProcessedCode::InvalidCcmBeforeCccExecutionException,
            );
        }
    }

    let execute_snapshot = ctx.create_snapshot();
    let executed = command.execute(ctx, ccm).is_ok();
    if !executed {
        ctx.restore_snapshot(execute_snapshot);
    }

    for module in registry.modules() {
        if module.after_cross_chain_command_execute(ctx, ccm).is_err() {
            ctx.restore_snapshot(snapshot);
            return reject_sender(
                ctx,
                ccm,
                CcmProcessedCode::InvalidCcmAfterCccExecutionException,
            );
        }
    }

    if !executed {
        return Ok(discard(ctx, ccm, CcmProcessedCode::FailedCcm));
    }
    ctx.emit(ccm_processed(
        ccm,
        CcmProcessedResult::Applied,
        CcmProcessedCode::Success,
    ));
    Ok(CcmProcessedResult::Applied)
}

/// Forward a message to the outbox of its receiving chain.
pub fn forward_ccm(
    ctx: &mut StoreContext,
    registry: &CommandRegistry,
    ccm: &CrossChainMessage,
) -> Result<CcmProcessedResult, ContractError> {
    let receiving_chain_id = ccm.receiving_chain_id;
    let Some(receiver) = CHAIN_ACCOUNTS.may_load(ctx.storage(), &receiving_chain_id)? else {
        return bounce_ccm(
            ctx,
            ccm,
            CcmStatus::ChannelUnavailable,
            CcmProcessedCode::ChannelUnavailable,
        );
    };

    if !is_account_live(&receiver, ctx.timestamp()) {
        if is_stale_for_termination(&receiver, ctx.timestamp()) {
            terminate_chain(ctx, &receiving_chain_id)?;
            send_internal(
                ctx,
                OutgoingMessage {
                    receiving_chain_id: ccm.sending_chain_id,
                    module: MODULE_NAME_INTEROPERABILITY,
                    cross_chain_command: CROSS_CHAIN_COMMAND_SIDECHAIN_TERMINATED,
                    fee: 0,
                    status: CcmStatus::Ok,
                    params: SidechainTerminatedParams {
                        chain_id: receiving_chain_id,
                        state_root: receiver.last_certificate.state_root,
                    }
                    .encode(),
                },
            )?;
        }
        return bounce_ccm(
            ctx,
            ccm,
            CcmStatus::ChannelUnavailable,
            CcmProcessedCode::ChannelUnavailable,
        );
    }
    if receiver.status == ChainStatus::Registered {
        return bounce_ccm(
            ctx,
            ccm,
            CcmStatus::ChannelUnavailable,
            CcmProcessedCode::ChannelUnavailable,
        );
    }

    let snapshot = ctx.create_snapshot();
    for module in registry.modules() {
        if module.before_cross_chain_message_forwarding(ctx, ccm).is_err() {
            ctx.restore_snapshot(snapshot);
            return bounce_ccm(ctx, ccm, CcmStatus::FailedCcm, CcmProcessedCode::FailedCcm);
        }
    }

    append_to_outbox(ctx.storage_mut(), &receiving_chain_id, &ccm.encode())?;
    ctx.emit(ccm_send_success(ccm));
    ctx.emit(ccm_processed(
        ccm,
        CcmProcessedResult::Forwarded,
        CcmProcessedCode::Success,
    ));
    Ok(CcmProcessedResult::Forwarded)
}

/// Send `ccm` back to its sender with `status`. Messages that already carry
/// an error status are discarded rather than bounced again.
pub fn bounce_ccm(
    ctx: &mut StoreContext,
    ccm: &CrossChainMessage,
    status: CcmStatus,
    code: CcmProcessedCode,
) -> Result<CcmProcessedResult, ContractError> {
    if ccm.status != CcmStatus::Ok {
        return Ok(discard(ctx, ccm, code));
    }

    let bounced = CrossChainMessage {
        sending_chain_id: ccm.receiving_chain_id,
        receiving_chain_id: ccm.sending_chain_id,
        fee: 0,
        status,
        ..ccm.clone()
    };
    append_to_outbox(ctx.storage_mut(), &bounced.receiving_chain_id, &bounced.encode())?;
    ctx.emit(ccm_send_success(&bounced));
    ctx.emit(ccm_processed(ccm, CcmProcessedResult::Bounced, code));
    Ok(CcmProcessedResult::Bounced)
}
