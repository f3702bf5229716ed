//! Deterministic BLS validators for tests and local tooling.
//!
//! Secret keys are derived from small seeds, so never use these outside of
//! tests.

use bls_signatures::{PrivateKey, Serialize as BlsSerialize, Signature};
use cosmwasm_std::Binary;

use crate::crypto::decode_signature;
use crate::types::{ActiveValidator, Certificate, ChainId};

#[derive(Clone, Debug)]
pub struct TestValidator {
    secret: PrivateKey,
    pub public_key: [u8; 48],
}

impl TestValidator {
    pub fn from_seed(seed: u64) -> Self {
        let mut ikm = [0x5a; 32];
        ikm[..8].copy_from_slice(&seed.to_be_bytes());
        let secret = PrivateKey::new(ikm);

        let mut public_key = [0u8; 48];
        public_key.copy_from_slice(&secret.public_key().as_bytes());
        Self { secret, public_key }
    }

    pub fn sign(&self, message: &[u8]) -> [u8; 96] {
        to_signature_bytes(&self.secret.sign(message))
    }

    pub fn active_validator(&self, bft_weight: u64) -> ActiveValidator {
        ActiveValidator {
            bls_key: Binary::from(self.public_key.to_vec()),
            bft_weight,
        }
    }
}

fn to_signature_bytes(signature: &Signature) -> [u8; 96] {
    let mut bytes = [0u8; 96];
    bytes.copy_from_slice(&signature.as_bytes());
    bytes
}

/// Validators for the given seeds, ordered by public key as a validator set
/// must be.
pub fn sorted_validators(seeds: impl IntoIterator<Item = u64>) -> Vec<TestValidator> {
    let mut validators: Vec<TestValidator> = seeds.into_iter().map(TestValidator::from_seed).collect();
    validators.sort_by(|a, b| a.public_key.cmp(&b.public_key));
    validators
}

pub fn aggregate_signatures(signatures: &[[u8; 96]]) -> [u8; 96] {
    let signatures: Vec<Signature> = signatures
        .iter()
        .map(|bytes| decode_signature(bytes).expect("test signature decodes"))
        .collect();
    let aggregate = bls_signatures::aggregate(&signatures).expect("at least one signature");
    to_signature_bytes(&aggregate)
}

/// Fill in `aggregation_bits` and `signature` as if the validators at
/// positions `signers` of the ordered set signed the certificate.
pub fn sign_certificate(
    certificate: &mut Certificate,
    chain_id: &ChainId,
    validators: &[TestValidator],
    signers: &[usize],
) {
    let mut bits = vec![0u8; (validators.len() + 7) / 8];
    for signer in signers {
        bits[signer / 8] |= 1 << (signer % 8);
    }
    certificate.aggregation_bits = bits;

    let message = certificate.signing_bytes(chain_id);
    let signatures: Vec<[u8; 96]> = signers.iter().map(|i| validators[*i].sign(&message)).collect();
    certificate.signature = aggregate_signatures(&signatures).to_vec();
}
