//! BLS12-381 signature verification for certificates.
//!
//! Public keys live in G1 (48 bytes compressed) and signatures in G2
//! (96 bytes compressed). Validators all sign the same certificate bytes, so
//! verification is the fast-aggregate form: the selected keys are combined
//! into one key and checked against the aggregate signature. Validator keys
//! are only accepted through registration or a certified validator update,
//! which is what makes key aggregation sound here.

use bls12_381::G1Projective;
use bls_signatures::{PublicKey, Serialize as BlsSerialize, Signature};

use crate::types::{BLS_PUBLIC_KEY_LENGTH, BLS_SIGNATURE_LENGTH};

/// Decode a compressed public key. Rejects the identity point.
pub fn decode_public_key(bytes: &[u8]) -> Option<PublicKey> {
    if bytes.len() != BLS_PUBLIC_KEY_LENGTH {
        return None;
    }
    let key = PublicKey::from_bytes(bytes).ok()?;
    if bool::from(G1Projective::from(key).is_identity()) {
        return None;
    }
    Some(key)
}

pub fn decode_signature(bytes: &[u8]) -> Option<Signature> {
    if bytes.len() != BLS_SIGNATURE_LENGTH {
        return None;
    }
    Signature::from_bytes(bytes).ok()
}

/// Fast aggregate verification: every key in `public_keys` signed `message`
/// and `signature` is the aggregate of their signatures.
pub fn verify_aggregate_signature(public_keys: &[&[u8]], message: &[u8], signature: &[u8]) -> bool {
    if public_keys.is_empty() {
        return false;
    }
    let Some(signature) = decode_signature(signature) else {
        return false;
    };

    let mut aggregate = G1Projective::identity();
    for key in public_keys {
        match decode_public_key(key) {
            Some(key) => aggregate += G1Projective::from(key),
            None => return false,
        }
    }

    PublicKey::from(aggregate).verify(signature, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{aggregate_signatures, TestValidator};

    #[test]
    fn test_aggregate_of_all_signers_verifies() {
        let validators: Vec<TestValidator> = (1..=3).map(TestValidator::from_seed).collect();
        let message = b"certificate";
        let signatures: Vec<_> = validators.iter().map(|v| v.sign(message)).collect();
        let keys: Vec<&[u8]> = validators.iter().map(|v| v.public_key.as_slice()).collect();

        assert!(verify_aggregate_signature(
            &keys,
            message,
            &aggregate_signatures(&signatures)
        ));
    }

    #[test]
    fn test_wrong_message_or_signer_set_fails() {
        let validators: Vec<TestValidator> = (1..=3).map(TestValidator::from_seed).collect();
        let message = b"certificate";
        let signatures: Vec<_> = validators[..2].iter().map(|v| v.sign(message)).collect();
        let aggregate = aggregate_signatures(&signatures);

        let two: Vec<&[u8]> = validators[..2].iter().map(|v| v.public_key.as_slice()).collect();
        let three: Vec<&[u8]> = validators.iter().map(|v| v.public_key.as_slice()).collect();

        assert!(verify_aggregate_signature(&two, message, &aggregate));
        assert!(!verify_aggregate_signature(&three, message, &aggregate));
        assert!(!verify_aggregate_signature(&two, b"other", &aggregate));
    }

    #[test]
    fn test_malformed_inputs_fail() {
        let validator = TestValidator::from_seed(7);
        let signature = validator.sign(b"m");

        assert!(!verify_aggregate_signature(&[], b"m", &signature));
        assert!(!verify_aggregate_signature(&[&[0u8; 48][..]], b"m", &signature));
        assert!(!verify_aggregate_signature(
            &[validator.public_key.as_slice()],
            b"m",
            &signature[..95]
        ));
        let identity = PublicKey::from(G1Projective::identity()).as_bytes();
        assert!(decode_public_key(&identity).is_none());
    }
}
