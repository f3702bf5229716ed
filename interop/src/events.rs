//! Protocol events.
//!
//! Event types and attribute keys are part of the observable interface:
//! relayers follow `ccm_send_success` to learn the encoded messages the hub
//! appended to an outbox, and `ccm_processed` to learn what happened to each
//! inbound message.

use cosmwasm_std::Event;

use common::codec::Encode;
use common::hash::{bytes32_to_hex, keccak256};
use common::types::{chain_id_to_hex, ChainId, CrossChainMessage};

use crate::state::ChainStatus;

pub const EVENT_CCM_PROCESSED: &str = "ccm_processed";
pub const EVENT_CCM_SEND_SUCCESS: &str = "ccm_send_success";
pub const EVENT_CHAIN_ACCOUNT_UPDATED: &str = "chain_account_updated";
pub const EVENT_TERMINATED_STATE_CREATED: &str = "terminated_state_created";
pub const EVENT_TERMINATED_OUTBOX_CREATED: &str = "terminated_outbox_created";
pub const EVENT_TERMINATED_OUTBOX_UPDATED: &str = "terminated_outbox_updated";

/// What happened to an inbound message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CcmProcessedResult {
    Applied,
    Forwarded,
    Bounced,
    Discarded,
}

impl CcmProcessedResult {
    pub fn as_str(self) -> &'static str {
        match self {
            CcmProcessedResult::Applied => "applied",
            CcmProcessedResult::Forwarded => "forwarded",
            CcmProcessedResult::Bounced => "bounced",
            CcmProcessedResult::Discarded => "discarded",
        }
    }
}

/// Why a message ended up with its result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CcmProcessedCode {
    Success,
    ChannelUnavailable,
    ModuleNotSupported,
    CrossChainCommandNotSupported,
    FailedCcm,
    InvalidCcmValidateException,
    InvalidCcmVerifyCcmException,
    InvalidCcmBeforeCccExecutionException,
    InvalidCcmAfterCccExecutionException,
    InvalidCcmDecodingException,
    InvalidCcmRoutingException,
}

impl CcmProcessedCode {
    pub fn code(self) -> u32 {
        match self {
            CcmProcessedCode::Success => 0,
            CcmProcessedCode::ChannelUnavailable => 1,
            CcmProcessedCode::ModuleNotSupported => 2,
            CcmProcessedCode::CrossChainCommandNotSupported => 3,
            CcmProcessedCode::FailedCcm => 4,
            CcmProcessedCode::InvalidCcmValidateException => 5,
            CcmProcessedCode::InvalidCcmVerifyCcmException => 6,
            CcmProcessedCode::InvalidCcmBeforeCccExecutionException => 7,
            CcmProcessedCode::InvalidCcmAfterCccExecutionException => 8,
            CcmProcessedCode::InvalidCcmDecodingException => 9,
            CcmProcessedCode::InvalidCcmRoutingException => 10,
        }
    }
}

/// `ccm_processed` for a decoded message.
pub fn ccm_processed(
    ccm: &CrossChainMessage,
    result: CcmProcessedResult,
    code: CcmProcessedCode,
) -> Event {
    Event::new(EVENT_CCM_PROCESSED)
        .add_attribute("ccm_id", bytes32_to_hex(&ccm.id()))
        .add_attribute("sending_chain_id", chain_id_to_hex(&ccm.sending_chain_id))
        .add_attribute("receiving_chain_id", chain_id_to_hex(&ccm.receiving_chain_id))
        .add_attribute("module", &ccm.module)
        .add_attribute("cross_chain_command", &ccm.cross_chain_command)
        .add_attribute("result", result.as_str())
        .add_attribute("code", code.code().to_string())
}

/// `ccm_processed` for bytes that never decoded into a message.
pub fn ccm_undecodable(
    ccm_id: &[u8; 32],
    sending_chain_id: &ChainId,
    code: CcmProcessedCode,
) -> Event {
    Event::new(EVENT_CCM_PROCESSED)
        .add_attribute("ccm_id", bytes32_to_hex(ccm_id))
        .add_attribute("sending_chain_id", chain_id_to_hex(sending_chain_id))
        .add_attribute("result", CcmProcessedResult::Discarded.as_str())
        .add_attribute("code", code.code().to_string())
}

pub fn ccm_send_success(ccm: &CrossChainMessage) -> Event {
    let encoded = ccm.encode();
    Event::new(EVENT_CCM_SEND_SUCCESS)
        .add_attribute("ccm_id", bytes32_to_hex(&keccak256(&encoded)))
        .add_attribute("sending_chain_id", chain_id_to_hex(&ccm.sending_chain_id))
        .add_attribute("receiving_chain_id", chain_id_to_hex(&ccm.receiving_chain_id))
        .add_attribute("module", &ccm.module)
        .add_attribute("cross_chain_command", &ccm.cross_chain_command)
        .add_attribute("nonce", ccm.nonce.to_string())
        .add_attribute("ccm", hex::encode(encoded))
}

pub fn chain_account_updated(chain_id: &ChainId, status: ChainStatus) -> Event {
    Event::new(EVENT_CHAIN_ACCOUNT_UPDATED)
        .add_attribute("chain_id", chain_id_to_hex(chain_id))
        .add_attribute("status", status.code().to_string())
}

pub fn terminated_state_created(chain_id: &ChainId, state_root: &[u8; 32]) -> Event {
    Event::new(EVENT_TERMINATED_STATE_CREATED)
        .add_attribute("chain_id", chain_id_to_hex(chain_id))
        .add_attribute("state_root", bytes32_to_hex(state_root))
}

pub fn terminated_outbox_created(
    chain_id: &ChainId,
    outbox_root: &[u8; 32],
    outbox_size: u64,
    partner_chain_inbox_size: u64,
) -> Event {
    Event::new(EVENT_TERMINATED_OUTBOX_CREATED)
        .add_attribute("chain_id", chain_id_to_hex(chain_id))
        .add_attribute("outbox_root", bytes32_to_hex(outbox_root))
        .add_attribute("outbox_size", outbox_size.to_string())
        .add_attribute("partner_chain_inbox_size", partner_chain_inbox_size.to_string())
}

pub fn terminated_outbox_updated(chain_id: &ChainId, outbox_root: &[u8; 32]) -> Event {
    Event::new(EVENT_TERMINATED_OUTBOX_UPDATED)
        .add_attribute("chain_id", chain_id_to_hex(chain_id))
        .add_attribute("outbox_root", bytes32_to_hex(outbox_root))
}
