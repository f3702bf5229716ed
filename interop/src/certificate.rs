//! Certificate verification.
//!
//! A certificate is accepted from a sidechain when it is strictly newer than
//! the last one, commits to the expected validator set, and carries an
//! aggregate BLS signature from validators of the current set whose
//! combined weight reaches the certificate threshold.

use common::crypto::verify_aggregate_signature;
use common::types::{ActiveValidator, Certificate, ChainId, BLS_PUBLIC_KEY_LENGTH};

use crate::error::{CertificateError, ContractError};
use crate::state::{ChainAccount, ChainValidators, MAX_NUM_VALIDATORS};

/// Check the validator set invariants: 1 to 199 entries, 48-byte keys in
/// strictly ascending order, positive weights, and
/// `total / 3 + 1 <= threshold <= total`.
pub fn validate_active_validators(
    validators: &[ActiveValidator],
    certificate_threshold: u64,
) -> Result<(), ContractError> {
    if validators.is_empty() || validators.len() > MAX_NUM_VALIDATORS {
        return Err(ContractError::InvalidValidators {
            reason: format!(
                "expected 1 to {} validators, got {}",
                MAX_NUM_VALIDATORS,
                validators.len()
            ),
        });
    }

    let mut total_weight: u64 = 0;
    for (i, validator) in validators.iter().enumerate() {
        if validator.bls_key.len() != BLS_PUBLIC_KEY_LENGTH {
            return Err(ContractError::InvalidValidators {
                reason: format!(
                    "validator {} key is {} bytes, expected {}",
                    i,
                    validator.bls_key.len(),
                    BLS_PUBLIC_KEY_LENGTH
                ),
            });
        }
        if validator.bft_weight == 0 {
            return Err(ContractError::InvalidValidators {
                reason: format!("validator {} has zero weight", i),
            });
        }
        if i > 0 && validators[i - 1].bls_key.as_slice() >= validator.bls_key.as_slice() {
            return Err(ContractError::InvalidValidators {
                reason: "keys must be unique and in ascending order".to_string(),
            });
        }
        total_weight = total_weight
            .checked_add(validator.bft_weight)
            .ok_or_else(|| ContractError::InvalidValidators {
                reason: "total weight overflows".to_string(),
            })?;
    }

    let min = total_weight / 3 + 1;
    if certificate_threshold < min || certificate_threshold > total_weight {
        return Err(ContractError::InvalidCertificateThreshold {
            threshold: certificate_threshold,
            min,
            max: total_weight,
        });
    }
    Ok(())
}

/// Verify `certificate` from `chain_id` against its account and current
/// validator set. Pure; nothing is persisted.
pub fn verify_certificate(
    chain_id: &ChainId,
    account: &ChainAccount,
    validators: &ChainValidators,
    certificate: &Certificate,
    current_timestamp: u64,
    expected_validators_hash: &[u8; 32],
) -> Result<(), CertificateError> {
    let last = &account.last_certificate;
    if certificate.height <= last.height {
        return Err(CertificateError::InvalidHeight {
            height: certificate.height,
            last: last.height,
        });
    }
    if certificate.timestamp <= last.timestamp || certificate.timestamp > current_timestamp {
        return Err(CertificateError::InvalidTimestamp {
            timestamp: certificate.timestamp,
            last: last.timestamp,
            current: current_timestamp,
        });
    }
    if certificate.validators_hash != *expected_validators_hash {
        return Err(CertificateError::ValidatorsHashMismatch);
    }
    verify_certificate_signature(chain_id, validators, certificate)
}

/// Weighted aggregate signature check. Bit `i` of `aggregation_bits`
/// (least significant first within each byte) selects validator `i`.
pub fn verify_certificate_signature(
    chain_id: &ChainId,
    validators: &ChainValidators,
    certificate: &Certificate,
) -> Result<(), CertificateError> {
    let count = validators.active_validators.len();
    let bits = &certificate.aggregation_bits;
    let expected_len = (count + 7) / 8;
    if bits.len() != expected_len {
        return Err(CertificateError::InvalidAggregationBits {
            reason: format!("expected {} bytes, got {}", expected_len, bits.len()),
        });
    }
    let is_set = |i: usize| (bits[i / 8] >> (i % 8)) & 1 == 1;
    if (count..expected_len * 8).any(is_set) {
        return Err(CertificateError::InvalidAggregationBits {
            reason: "bit set beyond the validator set".to_string(),
        });
    }

    let mut signed_weight: u64 = 0;
    let mut keys: Vec<&[u8]> = Vec::with_capacity(count);
    for (i, validator) in validators.active_validators.iter().enumerate() {
        if is_set(i) {
            signed_weight = signed_weight.saturating_add(validator.bft_weight);
            keys.push(validator.bls_key.as_slice());
        }
    }
    if signed_weight < validators.certificate_threshold {
        return Err(CertificateError::InvalidSignature {
            reason: format!(
                "signed weight {} below threshold {}",
                signed_weight, validators.certificate_threshold
            ),
        });
    }

    let message = certificate.signing_bytes(chain_id);
    if !verify_aggregate_signature(&keys, &message, &certificate.signature) {
        return Err(CertificateError::InvalidSignature {
            reason: "aggregate signature does not verify".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::testing::{sign_certificate, sorted_validators, TestValidator};
    use common::types::compute_validators_hash;
    use cosmwasm_std::Binary;

    use crate::state::{ChainStatus, LastCertificate};

    const CHAIN: ChainId = [4, 0, 0, 1];
    const NOW: u64 = 1_700_000_000;

    fn setup() -> (Vec<TestValidator>, ChainValidators, ChainAccount) {
        let signers = sorted_validators(1..=4);
        let validators = ChainValidators {
            active_validators: signers.iter().map(|v| v.active_validator(10)).collect(),
            certificate_threshold: 30,
        };
        let account = ChainAccount {
            name: "sidechain".to_string(),
            status: ChainStatus::Active,
            last_certificate: LastCertificate {
                height: 100,
                timestamp: NOW - 1_000,
                state_root: [0u8; 32],
                validators_hash: compute_validators_hash(&validators.active_validators, 30),
            },
        };
        (signers, validators, account)
    }

    fn certificate(account: &ChainAccount, height: u64, timestamp: u64) -> Certificate {
        Certificate {
            block_id: [9u8; 32],
            height,
            timestamp,
            state_root: [7u8; 32],
            validators_hash: account.last_certificate.validators_hash,
            aggregation_bits: vec![],
            signature: vec![],
        }
    }

    #[test]
    fn test_valid_certificate() {
        let (signers, validators, account) = setup();
        let mut cert = certificate(&account, 101, NOW - 10);
        sign_certificate(&mut cert, &CHAIN, &signers, &[0, 1, 3]);

        let expected = account.last_certificate.validators_hash;
        assert_eq!(
            verify_certificate(&CHAIN, &account, &validators, &cert, NOW, &expected),
            Ok(())
        );
    }

    #[test]
    fn test_height_and_timestamp_must_advance() {
        let (signers, validators, account) = setup();
        let expected = account.last_certificate.validators_hash;

        let mut cert = certificate(&account, 100, NOW - 10);
        sign_certificate(&mut cert, &CHAIN, &signers, &[0, 1, 2, 3]);
        assert_eq!(
            verify_certificate(&CHAIN, &account, &validators, &cert, NOW, &expected),
            Err(CertificateError::InvalidHeight {
                height: 100,
                last: 100
            })
        );

        let stale = certificate(&account, 101, NOW - 1_000);
        assert!(matches!(
            verify_certificate(&CHAIN, &account, &validators, &stale, NOW, &expected),
            Err(CertificateError::InvalidTimestamp { .. })
        ));

        let future = certificate(&account, 101, NOW + 1);
        assert!(matches!(
            verify_certificate(&CHAIN, &account, &validators, &future, NOW, &expected),
            Err(CertificateError::InvalidTimestamp { .. })
        ));
    }

    #[test]
    fn test_validators_hash_mismatch() {
        let (_, validators, account) = setup();
        let cert = certificate(&account, 101, NOW - 10);
        assert_eq!(
            verify_certificate(&CHAIN, &account, &validators, &cert, NOW, &[1u8; 32]),
            Err(CertificateError::ValidatorsHashMismatch)
        );
    }

    #[test]
    fn test_signed_weight_below_threshold() {
        let (signers, validators, account) = setup();
        let mut cert = certificate(&account, 101, NOW - 10);
        sign_certificate(&mut cert, &CHAIN, &signers, &[0, 2]);
        assert!(matches!(
            verify_certificate_signature(&CHAIN, &validators, &cert),
            Err(CertificateError::InvalidSignature { .. })
        ));
    }

    #[test]
    fn test_signature_from_other_chain_fails() {
        let (signers, validators, account) = setup();
        let mut cert = certificate(&account, 101, NOW - 10);
        sign_certificate(&mut cert, &[4, 0, 0, 2], &signers, &[0, 1, 2]);
        assert!(matches!(
            verify_certificate_signature(&CHAIN, &validators, &cert),
            Err(CertificateError::InvalidSignature { .. })
        ));
    }

    #[test]
    fn test_aggregation_bits_shape() {
        let (signers, validators, account) = setup();
        let mut cert = certificate(&account, 101, NOW - 10);
        sign_certificate(&mut cert, &CHAIN, &signers, &[0, 1, 2]);

        let mut too_long = cert.clone();
        too_long.aggregation_bits.push(0);
        assert!(matches!(
            verify_certificate_signature(&CHAIN, &validators, &too_long),
            Err(CertificateError::InvalidAggregationBits { .. })
        ));

        let mut beyond = cert;
        beyond.aggregation_bits[0] |= 1 << 5;
        assert!(matches!(
            verify_certificate_signature(&CHAIN, &validators, &beyond),
            Err(CertificateError::InvalidAggregationBits { .. })
        ));
    }

    #[test]
    fn test_validator_set_rules() {
        let signers = sorted_validators(1..=3);
        let set: Vec<ActiveValidator> = signers.iter().map(|v| v.active_validator(10)).collect();

        assert_eq!(validate_active_validators(&set, 11), Ok(()));
        assert_eq!(validate_active_validators(&set, 30), Ok(()));
        assert_eq!(
            validate_active_validators(&set, 10),
            Err(ContractError::InvalidCertificateThreshold {
                threshold: 10,
                min: 11,
                max: 30
            })
        );
        assert!(validate_active_validators(&set, 31).is_err());
        assert!(validate_active_validators(&[], 1).is_err());

        let mut unsorted = set.clone();
        unsorted.swap(0, 1);
        assert!(validate_active_validators(&unsorted, 20).is_err());

        let mut duplicate = set.clone();
        duplicate[1] = duplicate[0].clone();
        assert!(validate_active_validators(&duplicate, 20).is_err());

        let mut zero_weight = set.clone();
        zero_weight[2].bft_weight = 0;
        assert!(validate_active_validators(&zero_weight, 20).is_err());

        let mut short_key = set;
        short_key[0].bls_key = Binary::from(vec![0u8; 47]);
        assert!(validate_active_validators(&short_key, 20).is_err());
    }
}
