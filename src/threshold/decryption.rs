//! Threshold decryption: per-teller decryption shares with eqlog proofs,
//! and Lagrange combination of any `t` verified shares.

use std::collections::BTreeSet;

use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use serde::{Deserialize, Serialize};

use super::{dkg::PrivateKeyShare, ThresholdConfig, ThresholdError};
use crate::elgamal::{Ciphertext, MultiCiphertext};
use crate::group::CyclicGroup;
use crate::proofs::eqlog::EqlogInstance;
use crate::proofs::{EqlogProof, VerifiableDecryption};
use crate::verify::VerificationResult;

const LOG_TARGET: &str = "verivote::threshold::decryption";

/// A teller's decryption share for one ciphertext:
/// `D_l = α^{y_l}` plus the eqlog proof for `(g, α) → (Y_l, D_l)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptionShare<E> {
    pub nr: usize,
    #[serde(rename = "decShare")]
    pub dec_share: E,
    pub zkp: EqlogProof,
}

/// A teller's decryption share for a multi-ciphertext: one factor per
/// inner ciphertext.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiDecryptionShare<E> {
    pub nr: usize,
    pub factors: Vec<VerifiableDecryption<E>>,
}

pub fn create_decryption_share<G: CyclicGroup>(
    group: &G,
    key_share: &PrivateKeyShare<G::Element>,
    ciphertext: &Ciphertext<G::Element>,
) -> DecryptionShare<G::Element> {
    let dec_share = group.pow_u(&ciphertext.x, &key_share.key_share);
    let instance = EqlogInstance {
        base_x: group.generator(),
        base_y: ciphertext.x.clone(),
        statement_x: key_share.commitment.clone(),
        statement_y: dec_share.clone(),
    };
    let zkp = EqlogProof::prove(group, &instance, &key_share.key_share);
    DecryptionShare {
        nr: key_share.nr,
        dec_share,
        zkp,
    }
}

/// Verify a share against the teller's public commitment `Y_l`.
pub fn verify_decryption_share<G: CyclicGroup>(
    group: &G,
    commitment: &G::Element,
    ciphertext: &Ciphertext<G::Element>,
    share: &DecryptionShare<G::Element>,
) -> VerificationResult {
    let instance = EqlogInstance {
        base_x: group.generator(),
        base_y: ciphertext.x.clone(),
        statement_x: commitment.clone(),
        statement_y: share.dec_share.clone(),
    };
    share.zkp.verify(group, &instance).on_failure(|reason| {
        tracing::warn!(
            target: LOG_TARGET,
            teller = share.nr,
            reason,
            "decryption share rejected"
        );
    })
}

pub fn create_multi_decryption_share<G: CyclicGroup>(
    group: &G,
    key_share: &PrivateKeyShare<G::Element>,
    multi: &MultiCiphertext<G::Element>,
) -> MultiDecryptionShare<G::Element> {
    let factors = multi
        .ciphertexts
        .iter()
        .map(|ciphertext| {
            let factor = group.pow_u(&ciphertext.x, &key_share.key_share);
            let instance = EqlogInstance {
                base_x: group.generator(),
                base_y: ciphertext.x.clone(),
                statement_x: key_share.commitment.clone(),
                statement_y: factor.clone(),
            };
            let zkp = EqlogProof::prove(group, &instance, &key_share.key_share);
            VerifiableDecryption { factor, zkp }
        })
        .collect();
    MultiDecryptionShare {
        nr: key_share.nr,
        factors,
    }
}

/// Verify every factor of a multi-ciphertext share, short-circuiting on
/// the first failure.
pub fn verify_multi_decryption_share<G: CyclicGroup>(
    group: &G,
    commitment: &G::Element,
    multi: &MultiCiphertext<G::Element>,
    share: &MultiDecryptionShare<G::Element>,
) -> VerificationResult {
    if multi.width() != share.factors.len() {
        return VerificationResult::Failed(format!(
            "share carries {} factors for width {}",
            share.factors.len(),
            multi.width()
        ));
    }
    for (position, (ciphertext, factor)) in multi
        .ciphertexts
        .iter()
        .zip(share.factors.iter())
        .enumerate()
    {
        let instance = EqlogInstance {
            base_x: group.generator(),
            base_y: ciphertext.x.clone(),
            statement_x: commitment.clone(),
            statement_y: factor.factor.clone(),
        };
        let result = factor.zkp.verify(group, &instance);
        if !result.is_correct() {
            return VerificationResult::Failed(format!(
                "factor {position} of teller {}: {result}",
                share.nr
            ));
        }
    }
    VerificationResult::Correct
}

/// Lagrange coefficient at zero:
/// `ℓ_k = Π_{m ∈ S \ {k}} m · (m − k)^{-1} mod q`.
pub fn lagrange_coefficient(indices: &[usize], k: usize, order: &BigUint) -> BigUint {
    let order_int = BigInt::from(order.clone());
    let mut numerator = BigInt::from(1);
    let mut denominator = BigInt::from(1);
    for &m in indices {
        if m == k {
            continue;
        }
        numerator = numerator * BigInt::from(m) % &order_int;
        denominator = denominator * (BigInt::from(m) - BigInt::from(k)) % &order_int;
    }
    let numerator = numerator
        .mod_floor(&order_int)
        .to_biguint()
        .expect("floor-mod is non-negative");
    let denominator = denominator
        .mod_floor(&order_int)
        .to_biguint()
        .expect("floor-mod is non-negative");
    // q is prime, so the inverse is d^(q-2)
    let inverse = denominator.modpow(&(order - 2u8), order);
    numerator * inverse % order
}

fn check_share_indices(
    config: &ThresholdConfig,
    indices: &[usize],
) -> Result<(), ThresholdError> {
    if indices.len() < config.threshold() {
        return Err(ThresholdError::NotEnoughShares {
            required: config.threshold(),
            got: indices.len(),
        });
    }
    let mut seen = BTreeSet::new();
    for &index in indices {
        config.check_index(index)?;
        if !seen.insert(index) {
            return Err(ThresholdError::DuplicateShareIndex(index));
        }
    }
    Ok(())
}

fn combine_factors<G: CyclicGroup>(
    group: &G,
    ciphertext: &Ciphertext<G::Element>,
    factors: &[(usize, G::Element)],
    indices: &[usize],
) -> BigUint {
    let mut combined = group.identity();
    for (nr, factor) in factors.iter().map(|entry| (entry.0, &entry.1)) {
        let coefficient = lagrange_coefficient(indices, nr, group.order());
        combined = group.mul(&combined, &group.pow_u(factor, &coefficient));
    }
    group.decode(&group.mul(&ciphertext.y, &group.inverse(&combined)))
}

/// Combine at least `t` verified shares with distinct indices into the
/// plaintext `decode(β · (Π_k D_k^{ℓ_k})^{-1})`.
pub fn combine_decryption_shares<G: CyclicGroup>(
    group: &G,
    config: &ThresholdConfig,
    ciphertext: &Ciphertext<G::Element>,
    shares: &[DecryptionShare<G::Element>],
) -> Result<BigUint, ThresholdError> {
    let indices: Vec<usize> = shares.iter().map(|s| s.nr).collect();
    check_share_indices(config, &indices)?;
    let factors: Vec<(usize, G::Element)> = shares
        .iter()
        .map(|s| (s.nr, s.dec_share.clone()))
        .collect();
    tracing::debug!(target: LOG_TARGET, shares = shares.len(), "combining decryption shares");
    Ok(combine_factors(group, ciphertext, &factors, &indices))
}

/// Position-wise combination over a multi-ciphertext.
pub fn combine_multi_decryption_shares<G: CyclicGroup>(
    group: &G,
    config: &ThresholdConfig,
    multi: &MultiCiphertext<G::Element>,
    shares: &[MultiDecryptionShare<G::Element>],
) -> Result<Vec<BigUint>, ThresholdError> {
    let indices: Vec<usize> = shares.iter().map(|s| s.nr).collect();
    check_share_indices(config, &indices)?;
    for share in shares {
        if share.factors.len() != multi.width() {
            return Err(ThresholdError::WidthMismatch {
                width: multi.width(),
                shares: share.factors.len(),
            });
        }
    }
    Ok(multi
        .ciphertexts
        .iter()
        .enumerate()
        .map(|(position, ciphertext)| {
            let factors: Vec<(usize, G::Element)> = shares
                .iter()
                .map(|share| (share.nr, share.factors[position].factor.clone()))
                .collect();
            combine_factors(group, ciphertext, &factors, &indices)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elgamal::encrypt;
    use crate::group::schnorr::test_group;
    use crate::group::SchnorrGroup;
    use crate::threshold::dkg::{combined_public_key, DkgTeller};

    struct Fixture {
        group: SchnorrGroup,
        config: ThresholdConfig,
        public_key: crate::group::SchnorrElement,
        shares: Vec<PrivateKeyShare<crate::group::SchnorrElement>>,
    }

    fn setup(t: usize, n: usize) -> Fixture {
        let group = test_group();
        let config = ThresholdConfig::new(t, n).unwrap();
        let tellers: Vec<_> = (1..=n)
            .map(|k| DkgTeller::new(group.clone(), config, k).unwrap())
            .collect();
        let shares: Vec<_> = tellers
            .iter()
            .map(|teller| {
                let records: Vec<_> = tellers
                    .iter()
                    .filter(|other| other.index() != teller.index())
                    .map(|other| other.record_for(teller.index()).unwrap())
                    .collect();
                teller.finalize(&records).unwrap()
            })
            .collect();
        let coefficient_sets: Vec<Vec<_>> = tellers
            .iter()
            .map(|t| t.blinded_coefficients().to_vec())
            .collect();
        let public_key = combined_public_key(&group, &coefficient_sets, &config).unwrap();
        Fixture {
            group,
            config,
            public_key,
            shares,
        }
    }

    #[test]
    fn any_t_shares_recover_the_plaintext() {
        let f = setup(3, 5);
        let message = BigUint::from(1234u32);
        let ciphertext = encrypt(&f.group, &f.public_key, &message).unwrap();

        for subset in [[1usize, 2, 3], [1, 3, 5], [2, 4, 5], [3, 4, 5]] {
            let shares: Vec<_> = subset
                .iter()
                .map(|&nr| {
                    let key_share = &f.shares[nr - 1];
                    let share = create_decryption_share(&f.group, key_share, &ciphertext);
                    assert!(verify_decryption_share(
                        &f.group,
                        &key_share.commitment,
                        &ciphertext,
                        &share
                    )
                    .is_correct());
                    share
                })
                .collect();
            assert_eq!(
                combine_decryption_shares(&f.group, &f.config, &ciphertext, &shares).unwrap(),
                message
            );
        }
    }

    #[test]
    fn fewer_than_t_shares_are_rejected() {
        let f = setup(3, 5);
        let ciphertext = encrypt(&f.group, &f.public_key, &BigUint::from(8u8)).unwrap();
        let shares: Vec<_> = f.shares[..2]
            .iter()
            .map(|ks| create_decryption_share(&f.group, ks, &ciphertext))
            .collect();
        assert!(matches!(
            combine_decryption_shares(&f.group, &f.config, &ciphertext, &shares),
            Err(ThresholdError::NotEnoughShares { required: 3, got: 2 })
        ));
    }

    #[test]
    fn duplicate_and_out_of_range_indices_are_rejected() {
        let f = setup(2, 3);
        let ciphertext = encrypt(&f.group, &f.public_key, &BigUint::from(8u8)).unwrap();
        let s1 = create_decryption_share(&f.group, &f.shares[0], &ciphertext);
        let s2 = create_decryption_share(&f.group, &f.shares[1], &ciphertext);

        assert!(matches!(
            combine_decryption_shares(&f.group, &f.config, &ciphertext, &[s1.clone(), s1.clone()]),
            Err(ThresholdError::DuplicateShareIndex(1))
        ));

        let mut out_of_range = s2.clone();
        out_of_range.nr = 9;
        assert!(matches!(
            combine_decryption_shares(&f.group, &f.config, &ciphertext, &[s1, out_of_range]),
            Err(ThresholdError::ShareIndexOutOfRange { index: 9, tellers: 3 })
        ));
    }

    #[test]
    fn tampered_share_fails_verification() {
        let f = setup(2, 3);
        let ciphertext = encrypt(&f.group, &f.public_key, &BigUint::from(5u8)).unwrap();
        let mut share = create_decryption_share(&f.group, &f.shares[0], &ciphertext);
        share.dec_share = f.group.mul(&share.dec_share, &f.group.generator());
        assert!(!verify_decryption_share(
            &f.group,
            &f.shares[0].commitment,
            &ciphertext,
            &share
        )
        .is_correct());
    }

    fn sample_multi(
        f: &Fixture,
        blocks: &[u32],
    ) -> MultiCiphertext<crate::group::SchnorrElement> {
        MultiCiphertext::new(
            blocks
                .iter()
                .map(|b| encrypt(&f.group, &f.public_key, &BigUint::from(*b)).unwrap())
                .collect(),
        )
    }

    #[test]
    fn multi_ciphertext_shares_verify_and_combine() {
        let f = setup(2, 3);
        let blocks = [17u32, 4242, 999];
        let multi = sample_multi(&f, &blocks);

        let shares: Vec<_> = f.shares[..2]
            .iter()
            .map(|ks| {
                let share = create_multi_decryption_share(&f.group, ks, &multi);
                assert!(verify_multi_decryption_share(
                    &f.group,
                    &ks.commitment,
                    &multi,
                    &share
                )
                .is_correct());
                share
            })
            .collect();

        let recovered =
            combine_multi_decryption_shares(&f.group, &f.config, &multi, &shares).unwrap();
        let expected: Vec<BigUint> = blocks.iter().map(|b| BigUint::from(*b)).collect();
        assert_eq!(recovered, expected);
    }

    #[test]
    fn multi_share_verification_short_circuits_on_first_bad_factor() {
        let f = setup(2, 3);
        let multi = sample_multi(&f, &[1, 2, 3]);
        let mut share = create_multi_decryption_share(&f.group, &f.shares[0], &multi);
        share.factors[0].factor =
            f.group.mul(&share.factors[0].factor, &f.group.generator());
        let result = verify_multi_decryption_share(
            &f.group,
            &f.shares[0].commitment,
            &multi,
            &share,
        );
        match result {
            VerificationResult::Failed(reason) => assert!(reason.contains("factor 0")),
            VerificationResult::Correct => panic!("tampered factor must not verify"),
        }
    }

    #[test]
    fn lagrange_interpolates_at_zero() {
        let order = BigUint::from(25073u32);
        // secret polynomial p(x) = 7 + 3x + 2x^2, p(0) = 7
        let eval = |x: u32| {
            (BigUint::from(7u32) + 3u32 * x + 2u32 * x * x) % &order
        };
        let indices = [1usize, 2, 4];
        let mut secret = BigUint::from(0u8);
        for &k in &indices {
            let coefficient = lagrange_coefficient(&indices, k, &order);
            secret = (secret + eval(k as u32) * coefficient) % &order;
        }
        assert_eq!(secret, BigUint::from(7u8));
    }

    #[test]
    fn share_serializes_with_spec_field_names() {
        let f = setup(2, 3);
        let ciphertext = encrypt(&f.group, &f.public_key, &BigUint::from(5u8)).unwrap();
        let share = create_decryption_share(&f.group, &f.shares[0], &ciphertext);
        let json = serde_json::to_value(&share).unwrap();
        assert!(json.get("nr").is_some());
        assert!(json.get("decShare").is_some());
        assert!(json.get("zkp").and_then(|z| z.get("c")).is_some());
        assert!(json.get("zkp").and_then(|z| z.get("f")).is_some());
    }
}
