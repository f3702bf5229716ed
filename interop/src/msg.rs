//! Message types for the interoperability contract
//!
//! Chain ids, hashes and encoded protocol objects travel as `Binary`. The
//! contract parses and length-checks them on entry.

use common::smt::SparseMerkleProof;
use common::types::ActiveValidator;
use cosmwasm_schema::{cw_serde, QueryResponses};
use cosmwasm_std::{Addr, Binary, Coin};

use crate::state::ChainStatus;

// ============================================================================
// Instantiate & Migrate
// ============================================================================

#[cw_serde]
pub struct MigrateMsg {}

#[cw_serde]
pub struct InstantiateMsg {
    /// Hub chain ID, 4 bytes of the form `[network, 0, 0, 0]`
    pub own_chain_id: Binary,
    /// Hub chain name, same rules as sidechain names
    pub own_name: String,
    /// Receives registration fees
    pub fee_collector: String,
    /// Fee attached to every sidechain registration
    pub registration_fee: Coin,
    /// 8-byte token ID used for message fees on new channels
    pub message_fee_token_id: Binary,
    pub min_return_fee_per_byte: u64,
}

// ============================================================================
// Execute Messages
// ============================================================================

/// Messages delivered to the hub inbox by a cross-chain update.
#[cw_serde]
#[derive(Default)]
pub struct InboxUpdate {
    /// Encoded cross-chain messages, in the sender's outbox order
    pub cross_chain_messages: Vec<Binary>,
    /// Right witness from the inbox after these messages to the sender's
    /// outbox root
    pub message_witness_hashes: Vec<Binary>,
    /// Proof of the sender's outbox root in the certified state root
    pub outbox_root_witness: SparseMerkleProof,
}

impl InboxUpdate {
    pub fn is_empty(&self) -> bool {
        self.cross_chain_messages.is_empty()
            && self.message_witness_hashes.is_empty()
            && self.outbox_root_witness.bitmap.is_empty()
            && self.outbox_root_witness.sibling_hashes.is_empty()
    }
}

#[cw_serde]
pub enum ExecuteMsg {
    /// Register a new sidechain. The registration fee must be attached.
    RegisterSidechain {
        /// 4-byte chain ID on the hub's network
        chain_id: Binary,
        name: String,
        /// Initial validator set, ordered by BLS key
        sidechain_validators: Vec<ActiveValidator>,
        sidechain_certificate_threshold: u64,
    },

    /// Submit a certificate and/or messages from a sidechain. Permissionless;
    /// relayers submit these.
    SubmitCrossChainUpdate {
        sending_chain_id: Binary,
        /// Encoded certificate, empty when the update carries none
        certificate: Binary,
        /// New validator set, empty to keep the current one
        active_validators_update: Vec<ActiveValidator>,
        /// Must equal the current threshold unless the certificate changes it
        certificate_threshold: u64,
        inbox_update: InboxUpdate,
    },

    /// Terminate a sidechain that has not certified within the liveness
    /// limit. Permissionless.
    TerminateSidechainForLiveness { chain_id: Binary },

    /// Prove how many hub messages a terminated chain had received, from its
    /// last certified state root.
    InitializeMessageRecovery {
        chain_id: Binary,
        /// Encoded channel data of the terminated chain toward the hub
        channel: Binary,
        proof: SparseMerkleProof,
    },

    /// Send pending messages of a terminated chain's outbox back to their
    /// origin.
    RecoverMessage {
        chain_id: Binary,
        /// Encoded messages, aligned with `idxs`
        cross_chain_messages: Vec<Binary>,
        idxs: Vec<u64>,
        sibling_hashes: Vec<Binary>,
    },
}

// ============================================================================
// Query Messages
// ============================================================================

#[cw_serde]
#[derive(QueryResponses)]
pub enum QueryMsg {
    #[returns(ConfigResponse)]
    Config {},

    #[returns(OwnChainAccountResponse)]
    OwnChainAccount {},

    #[returns(ChainAccountResponse)]
    ChainAccount { chain_id: Binary },

    /// Paginated by chain ID
    #[returns(ChainAccountsResponse)]
    ChainAccounts {
        start_after: Option<Binary>,
        limit: Option<u32>,
    },

    #[returns(ChannelResponse)]
    Channel { chain_id: Binary },

    #[returns(ChainValidatorsResponse)]
    ChainValidators { chain_id: Binary },

    #[returns(TerminatedStateAccountResponse)]
    TerminatedStateAccount { chain_id: Binary },

    #[returns(TerminatedOutboxAccountResponse)]
    TerminatedOutboxAccount { chain_id: Binary },

    #[returns(AvailabilityResponse)]
    IsChainIdAvailable { chain_id: Binary },

    #[returns(AvailabilityResponse)]
    IsChainNameAvailable { name: String },

    /// Liveness at `timestamp`, the current block time if omitted
    #[returns(IsLiveResponse)]
    IsLive {
        chain_id: Binary,
        timestamp: Option<u64>,
    },
}

// ============================================================================
// Query Responses
// ============================================================================

#[cw_serde]
pub struct ConfigResponse {
    pub fee_collector: Addr,
    pub registration_fee: Coin,
    pub message_fee_token_id: Binary,
    pub min_return_fee_per_byte: u64,
}

#[cw_serde]
pub struct OwnChainAccountResponse {
    pub chain_id: Binary,
    pub name: String,
    pub nonce: u64,
}

#[cw_serde]
pub struct LastCertificateResponse {
    pub height: u64,
    pub timestamp: u64,
    pub state_root: Binary,
    pub validators_hash: Binary,
}

#[cw_serde]
pub struct ChainAccountResponse {
    pub chain_id: Binary,
    pub name: String,
    pub status: ChainStatus,
    pub last_certificate: LastCertificateResponse,
}

#[cw_serde]
pub struct ChainAccountsResponse {
    pub chains: Vec<ChainAccountResponse>,
}

#[cw_serde]
pub struct AccumulatorResponse {
    pub root: Binary,
    pub size: u64,
    pub append_path: Vec<Binary>,
}

#[cw_serde]
pub struct ChannelResponse {
    pub inbox: AccumulatorResponse,
    pub outbox: AccumulatorResponse,
    pub partner_chain_outbox_root: Binary,
    pub message_fee_token_id: Binary,
    pub min_return_fee_per_byte: u64,
}

#[cw_serde]
pub struct ChainValidatorsResponse {
    pub active_validators: Vec<ActiveValidator>,
    pub certificate_threshold: u64,
}

#[cw_serde]
pub struct TerminatedStateAccountResponse {
    pub state_root: Binary,
    pub mainchain_state_root: Binary,
    pub initialized: bool,
}

#[cw_serde]
pub struct TerminatedOutboxAccountResponse {
    pub outbox_root: Binary,
    pub outbox_size: u64,
    pub partner_chain_inbox_size: u64,
}

#[cw_serde]
pub struct AvailabilityResponse {
    pub available: bool,
}

#[cw_serde]
pub struct IsLiveResponse {
    pub live: bool,
}
