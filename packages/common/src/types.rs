//! Protocol types exchanged between the hub and its sidechains.

use borsh::{BorshDeserialize, BorshSerialize};
use cosmwasm_schema::cw_serde;
use cosmwasm_std::Binary;
use thiserror::Error;

use crate::codec::Encode;
use crate::hash::{keccak256, EMPTY_HASH};

// ============================================================================
// Identifiers
// ============================================================================

/// 4-byte chain identifier. Byte 0 is the network byte.
pub type ChainId = [u8; 4];

/// 8-byte token identifier, the chain id of the issuing chain followed by a
/// 4-byte local id.
pub type TokenId = [u8; 8];

pub const CHAIN_ID_LENGTH: usize = 4;
pub const TOKEN_ID_LENGTH: usize = 8;
pub const HASH_LENGTH: usize = 32;
pub const BLS_PUBLIC_KEY_LENGTH: usize = 48;
pub const BLS_SIGNATURE_LENGTH: usize = 96;

/// The hub of a network owns the id `[network, 0, 0, 0]`.
pub fn mainchain_id(network_byte: u8) -> ChainId {
    [network_byte, 0, 0, 0]
}

pub fn is_mainchain_id(chain_id: &ChainId) -> bool {
    chain_id[1..] == [0, 0, 0]
}

pub fn chain_id_from_slice(bytes: &[u8]) -> Option<ChainId> {
    bytes.try_into().ok()
}

pub fn chain_id_to_hex(chain_id: &ChainId) -> String {
    format!("0x{}", hex::encode(chain_id))
}

// ============================================================================
// Protocol names and limits
// ============================================================================

pub const MODULE_NAME_INTEROPERABILITY: &str = "interoperability";

pub const CROSS_CHAIN_COMMAND_REGISTRATION: &str = "registration";
pub const CROSS_CHAIN_COMMAND_CHANNEL_TERMINATED: &str = "channelTerminated";
pub const CROSS_CHAIN_COMMAND_SIDECHAIN_TERMINATED: &str = "sidechainTerminated";

/// Substore holding the outbox root a chain keeps for each partner.
pub const SUBSTORE_PREFIX_OUTBOX_ROOT: [u8; 2] = [0x80, 0x00];
/// Substore holding the channel a chain keeps for each partner.
pub const SUBSTORE_PREFIX_CHANNEL: [u8; 2] = [0xa0, 0x00];

pub const MAX_CCM_SIZE: usize = 10_240;
pub const MAX_MODULE_NAME_LENGTH: usize = 32;
pub const MAX_CROSS_CHAIN_COMMAND_NAME_LENGTH: usize = 32;

/// Domain tag prepended to the certificate signing bytes.
pub const CERTIFICATE_SIGNING_TAG: &[u8] = b"CCU_CERTIFICATE_";

// ============================================================================
// Cross-chain messages
// ============================================================================

/// Delivery status carried by a cross-chain message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CcmStatus {
    Ok,
    ModuleNotSupported,
    CrossChainCommandNotSupported,
    ChannelUnavailable,
    Recovered,
    FailedCcm,
}

impl CcmStatus {
    pub fn code(self) -> u32 {
        match self {
            CcmStatus::Ok => 0,
            CcmStatus::ModuleNotSupported => 1,
            CcmStatus::CrossChainCommandNotSupported => 2,
            CcmStatus::ChannelUnavailable => 3,
            CcmStatus::Recovered => 4,
            CcmStatus::FailedCcm => 5,
        }
    }

}

impl TryFrom<u32> for CcmStatus {
    type Error = u32;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(CcmStatus::Ok),
            1 => Ok(CcmStatus::ModuleNotSupported),
            2 => Ok(CcmStatus::CrossChainCommandNotSupported),
            3 => Ok(CcmStatus::ChannelUnavailable),
            4 => Ok(CcmStatus::Recovered),
            5 => Ok(CcmStatus::FailedCcm),
            other => Err(other),
        }
    }
}

// On the wire the status is its u32 code.
impl BorshSerialize for CcmStatus {
    fn serialize<W: borsh::io::Write>(&self, writer: &mut W) -> borsh::io::Result<()> {
        self.code().serialize(writer)
    }
}

impl BorshDeserialize for CcmStatus {
    fn deserialize_reader<R: borsh::io::Read>(reader: &mut R) -> borsh::io::Result<Self> {
        let code = u32::deserialize_reader(reader)?;
        CcmStatus::try_from(code).map_err(|code| {
            borsh::io::Error::new(
                borsh::io::ErrorKind::InvalidData,
                format!("unknown cross-chain message status: {code}"),
            )
        })
    }
}

/// A cross-chain message. Only its encoding is ever stored, inside the
/// inbox and outbox accumulators.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct CrossChainMessage {
    pub module: String,
    pub cross_chain_command: String,
    pub nonce: u64,
    pub fee: u64,
    pub sending_chain_id: ChainId,
    pub receiving_chain_id: ChainId,
    pub params: Vec<u8>,
    pub status: CcmStatus,
}

#[derive(Error, Debug, PartialEq)]
pub enum FormatError {
    #[error("Invalid module name: {name:?}")]
    InvalidModuleName { name: String },

    #[error("Invalid cross-chain command name: {name:?}")]
    InvalidCommandName { name: String },

    #[error("Cross-chain message is {size} bytes, limit is {max}")]
    MessageTooLarge { size: usize, max: usize },

    #[error("Sending and receiving chain are the same")]
    SameSendingAndReceivingChain,
}

fn is_valid_name(name: &str, max_len: usize) -> bool {
    !name.is_empty() && name.len() <= max_len && name.bytes().all(|b| b.is_ascii_alphanumeric())
}

impl CrossChainMessage {
    /// keccak256 of the encoded message.
    pub fn id(&self) -> [u8; 32] {
        keccak256(&self.encode())
    }

    /// Name charsets, size limit and routing sanity.
    pub fn validate_format(&self) -> Result<(), FormatError> {
        if !is_valid_name(&self.module, MAX_MODULE_NAME_LENGTH) {
            return Err(FormatError::InvalidModuleName {
                name: self.module.clone(),
            });
        }
        if !is_valid_name(&self.cross_chain_command, MAX_CROSS_CHAIN_COMMAND_NAME_LENGTH) {
            return Err(FormatError::InvalidCommandName {
                name: self.cross_chain_command.clone(),
            });
        }
        let size = self.encode().len();
        if size > MAX_CCM_SIZE {
            return Err(FormatError::MessageTooLarge {
                size,
                max: MAX_CCM_SIZE,
            });
        }
        if self.sending_chain_id == self.receiving_chain_id {
            return Err(FormatError::SameSendingAndReceivingChain);
        }
        Ok(())
    }
}

/// Params of the `registration` handshake message.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct RegistrationParams {
    pub name: String,
    pub chain_id: ChainId,
    pub message_fee_token_id: TokenId,
    pub min_return_fee_per_byte: u64,
}

/// Params of the `sidechainTerminated` notification.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct SidechainTerminatedParams {
    pub chain_id: ChainId,
    pub state_root: [u8; 32],
}

// ============================================================================
// Certificates and validators
// ============================================================================

/// Block commitment signed by a sidechain's validator set.
#[derive(Clone, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Certificate {
    pub block_id: [u8; 32],
    pub height: u64,
    pub timestamp: u64,
    pub state_root: [u8; 32],
    pub validators_hash: [u8; 32],
    pub aggregation_bits: Vec<u8>,
    pub signature: Vec<u8>,
}

impl Certificate {
    /// Bytes the validators sign: tag, chain id, then the certificate
    /// without its aggregation bits and signature.
    pub fn signing_bytes(&self, chain_id: &ChainId) -> Vec<u8> {
        let unsigned = (
            self.block_id,
            self.height,
            self.timestamp,
            self.state_root,
            self.validators_hash,
        );
        let mut bytes = CERTIFICATE_SIGNING_TAG.to_vec();
        bytes.extend_from_slice(chain_id);
        bytes.extend(unsigned.encode());
        bytes
    }
}

#[cw_serde]
#[derive(BorshSerialize, BorshDeserialize)]
pub struct ActiveValidator {
    /// 48-byte compressed BLS12-381 G1 public key
    #[borsh(serialize_with = "binary_borsh::serialize", deserialize_with = "binary_borsh::deserialize")]
    pub bls_key: Binary,
    pub bft_weight: u64,
}

/// `Binary` fields encoded as plain length-prefixed bytes.
mod binary_borsh {
    use borsh::{BorshDeserialize, BorshSerialize};
    use cosmwasm_std::Binary;

    pub fn serialize<W: borsh::io::Write>(value: &Binary, writer: &mut W) -> borsh::io::Result<()> {
        value.as_slice().serialize(writer)
    }

    pub fn deserialize<R: borsh::io::Read>(reader: &mut R) -> borsh::io::Result<Binary> {
        Ok(Binary::from(Vec::<u8>::deserialize_reader(reader)?))
    }
}

/// Commitment to a validator set and its threshold, as carried in
/// `Certificate::validators_hash`.
pub fn compute_validators_hash(validators: &[ActiveValidator], certificate_threshold: u64) -> [u8; 32] {
    keccak256(&(validators.to_vec(), certificate_threshold).encode())
}

// ============================================================================
// Channels
// ============================================================================

/// Append-only Merkle accumulator state. See [`crate::merkle`].
#[cw_serde]
#[derive(BorshSerialize, BorshDeserialize)]
pub struct MerkleAccumulator {
    pub root: [u8; 32],
    pub size: u64,
    /// Roots of the perfect subtrees covering the leaves, lowest first
    pub append_path: Vec<[u8; 32]>,
}

/// A chain's view of its channel with one partner chain.
#[cw_serde]
#[derive(BorshSerialize, BorshDeserialize)]
pub struct ChannelData {
    /// Messages received from the partner
    pub inbox: MerkleAccumulator,
    /// Messages sent to the partner
    pub outbox: MerkleAccumulator,
    /// Partner's outbox root as of the last accepted inbox update
    pub partner_chain_outbox_root: [u8; 32],
    pub message_fee_token_id: TokenId,
    pub min_return_fee_per_byte: u64,
}

impl ChannelData {
    /// A channel with nothing sent or received yet.
    pub fn new(message_fee_token_id: TokenId, min_return_fee_per_byte: u64) -> Self {
        Self {
            inbox: MerkleAccumulator::default(),
            outbox: MerkleAccumulator::default(),
            partner_chain_outbox_root: EMPTY_HASH,
            message_fee_token_id,
            min_return_fee_per_byte,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ccm() -> CrossChainMessage {
        CrossChainMessage {
            module: "token".to_string(),
            cross_chain_command: "transfer".to_string(),
            nonce: 1,
            fee: 0,
            sending_chain_id: [4, 0, 0, 1],
            receiving_chain_id: [4, 0, 0, 0],
            params: vec![1, 2, 3],
            status: CcmStatus::Ok,
        }
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(CcmStatus::Ok.code(), 0);
        assert_eq!(CcmStatus::ChannelUnavailable.code(), 3);
        assert_eq!(CcmStatus::Recovered.code(), 4);
        for code in 0..6 {
            assert_eq!(CcmStatus::try_from(code).unwrap().code(), code);
        }
        assert_eq!(CcmStatus::try_from(6), Err(6));
    }

    #[test]
    fn test_mainchain_id() {
        assert!(is_mainchain_id(&mainchain_id(4)));
        assert!(!is_mainchain_id(&[4, 0, 0, 1]));
        assert_eq!(chain_id_to_hex(&[4, 0, 0, 1]), "0x04000001");
    }

    #[test]
    fn test_validate_format_accepts_well_formed_message() {
        assert_eq!(ccm().validate_format(), Ok(()));
    }

    #[test]
    fn test_validate_format_rejects_bad_names() {
        let mut msg = ccm();
        msg.module = "to-ken".to_string();
        assert!(matches!(
            msg.validate_format(),
            Err(FormatError::InvalidModuleName { .. })
        ));

        let mut msg = ccm();
        msg.cross_chain_command = String::new();
        assert!(matches!(
            msg.validate_format(),
            Err(FormatError::InvalidCommandName { .. })
        ));

        let mut msg = ccm();
        msg.module = "a".repeat(MAX_MODULE_NAME_LENGTH + 1);
        assert!(msg.validate_format().is_err());
    }

    #[test]
    fn test_validate_format_rejects_oversized_and_self_addressed() {
        let mut msg = ccm();
        msg.params = vec![0u8; MAX_CCM_SIZE];
        assert!(matches!(
            msg.validate_format(),
            Err(FormatError::MessageTooLarge { .. })
        ));

        let mut msg = ccm();
        msg.receiving_chain_id = msg.sending_chain_id;
        assert_eq!(
            msg.validate_format(),
            Err(FormatError::SameSendingAndReceivingChain)
        );
    }

    #[test]
    fn test_validators_hash_commits_to_threshold() {
        let validators = vec![ActiveValidator {
            bls_key: Binary::from(vec![1u8; BLS_PUBLIC_KEY_LENGTH]),
            bft_weight: 10,
        }];
        assert_ne!(
            compute_validators_hash(&validators, 10),
            compute_validators_hash(&validators, 9)
        );
    }
}
