//! Error types for the interoperability contract
//!
//! Every error here rejects the whole transaction. Per-message failures inside
//! a cross-chain update never surface as errors; they become
//! `ccm_processed` events instead.

use common::codec::CodecError;
use common::merkle::MerkleError;
use common::smt::SmtError;
use common::types::FormatError;
use cosmwasm_std::{StdError, Uint128};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ContractError {
    #[error("{0}")]
    Std(#[from] StdError),

    #[error("{0}")]
    Certificate(#[from] CertificateError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Merkle proof error: {0}")]
    Merkle(#[from] MerkleError),

    #[error("State proof error: {0}")]
    Smt(#[from] SmtError),

    #[error("Invalid cross-chain message: {0}")]
    InvalidCcmFormat(#[from] FormatError),

    // ========================================================================
    // Input Validation Errors
    // ========================================================================

    #[error("Invalid chain ID: {reason}")]
    InvalidChainId { reason: String },

    #[error("Invalid chain name: {name:?}")]
    InvalidChainName { name: String },

    #[error("Invalid validator set: {reason}")]
    InvalidValidators { reason: String },

    #[error("Invalid certificate threshold {threshold}: must be between {min} and {max}")]
    InvalidCertificateThreshold { threshold: u64, min: u64, max: u64 },

    #[error("Invalid hash: expected 32 bytes, got {got}")]
    InvalidHashLength { got: usize },

    #[error("Invalid token ID: expected 8 bytes, got {got}")]
    InvalidTokenId { got: usize },

    // ========================================================================
    // Registration Errors
    // ========================================================================

    #[error("Chain ID {chain_id} is not available")]
    ChainIdNotAvailable { chain_id: String },

    #[error("Chain name {name} is not available")]
    ChainNameNotAvailable { name: String },

    #[error("Insufficient registration fee: expected {expected}, got {got}")]
    InsufficientFee { expected: Uint128, got: Uint128 },

    #[error("Unexpected funds in {denom}: only {expected} is accepted")]
    UnexpectedFunds { denom: String, expected: String },

    // ========================================================================
    // Registry Errors
    // ========================================================================

    #[error("Chain {chain_id} not found")]
    ChainNotFound { chain_id: String },

    #[error("Chain {chain_id} is not live")]
    ChainNotLive { chain_id: String },

    #[error("Chain {chain_id} is still live")]
    ChainStillLive { chain_id: String },

    #[error("Chain {chain_id} is terminated")]
    ChainTerminated { chain_id: String },

    #[error("Chain {chain_id} is not active")]
    ChainNotActive { chain_id: String },

    // ========================================================================
    // Cross-chain Update Errors
    // ========================================================================

    #[error("Cross-chain update must contain a certificate or an inbox update")]
    EmptyCrossChainUpdate,

    #[error("Cross-chain update from a registered chain must contain a non-empty certificate")]
    CertificateRequired,

    #[error("Validator set update requires a non-empty certificate")]
    ValidatorsUpdateWithoutCertificate,

    #[error("Certificate is {age} seconds old, limit is {limit}")]
    CertificateLivenessExpired { age: u64, limit: u64 },

    #[error("Outbox root witness does not prove the partner outbox root")]
    InvalidOutboxRootWitness,

    #[error("Inbox update does not extend to the stored partner outbox root")]
    PartnerOutboxRootMismatch,

    // ========================================================================
    // Recovery Errors
    // ========================================================================

    #[error("Terminated state account for chain {chain_id} not found")]
    TerminatedStateAccountNotFound { chain_id: String },

    #[error("Terminated outbox account for chain {chain_id} not found")]
    TerminatedOutboxAccountNotFound { chain_id: String },

    #[error("Terminated outbox account for chain {chain_id} already exists")]
    TerminatedOutboxAccountExists { chain_id: String },

    #[error("Channel data is not included in the terminated state root")]
    InvalidChannelProof,

    #[error("Invalid recovery indexes: {reason}")]
    InvalidRecoveryIndexes { reason: String },

    #[error("Message {index} cannot be recovered: {reason}")]
    InvalidRecoveryMessage { index: usize, reason: String },

    #[error("Recovery proof does not match the terminated outbox root")]
    InvalidRecoveryProof,

    // ========================================================================
    // Module Registry Errors
    // ========================================================================

    #[error("Module {module} is already registered")]
    ModuleAlreadyRegistered { module: String },

    #[error("Cross-chain command {module}:{command} failed: {reason}")]
    CrossChainCommandFailed {
        module: String,
        command: String,
        reason: String,
    },
}

/// Reasons a certificate is not accepted from a sidechain.
#[derive(Error, Debug, PartialEq)]
pub enum CertificateError {
    #[error("Invalid certificate timestamp {timestamp}: last certified {last}, current block {current}")]
    InvalidTimestamp { timestamp: u64, last: u64, current: u64 },

    #[error("InvalidHeight: certificate height {height} must exceed last certified height {last}")]
    InvalidHeight { height: u64, last: u64 },

    #[error("Certificate validators hash does not match the expected validator set")]
    ValidatorsHashMismatch,

    #[error("Invalid aggregation bits: {reason}")]
    InvalidAggregationBits { reason: String },

    #[error("Invalid certificate signature: {reason}")]
    InvalidSignature { reason: String },
}
