//! Distributed key generation.
//!
//! Each teller holds a private random polynomial, publishes Feldman
//! commitments `A[k,i] = g^{a[k,i]}` with a dlog NIZKP per coefficient,
//! and hands every peer `l` the share `p_k(l) mod q`. A teller finalizes
//! its private key share from exactly `n - 1` verified peer records; any
//! inconsistency aborts with an error naming the offending teller.

use std::collections::BTreeSet;

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{ThresholdConfig, ThresholdError};
use crate::group::CyclicGroup;
use crate::proofs::DlogProof;
use crate::{crypto_serde, rng};

const LOG_TARGET: &str = "verivote::threshold::dkg";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DkgError {
    #[error(transparent)]
    Config(#[from] ThresholdError),
    #[error("expected {expected} peer records, got {got}")]
    WrongRecordCount { expected: usize, got: usize },
    #[error("duplicate record from teller {0}")]
    DuplicateProducer(usize),
    #[error("record from teller {producer} is malformed: {reason}")]
    MalformedRecord { producer: usize, reason: String },
    #[error("teller {0} received its own record as a peer record")]
    RecordFromSelf(usize),
    #[error("coefficient proof {index} from teller {producer} does not verify")]
    InvalidCoefficientProof { producer: usize, index: usize },
    #[error("share from teller {producer} fails the Feldman consistency check")]
    InconsistentShare { producer: usize },
    #[error("expected blinded coefficients from all {expected} tellers, got {got}")]
    WrongContributionCount { expected: usize, got: usize },
}

/// Polynomial over `Z_q`, coefficients in ascending degree order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Polynomial {
    coefficients: Vec<BigUint>,
}

impl Polynomial {
    /// Random polynomial of the given length (degree `length - 1`) with
    /// a nonzero leading coefficient.
    pub fn random(length: usize, order: &BigUint) -> Self {
        assert!(length >= 1, "a polynomial has at least one coefficient");
        let mut coefficients: Vec<BigUint> =
            (0..length - 1).map(|_| rng::random_below(order)).collect();
        coefficients.push(random_nonzero(order));
        Self { coefficients }
    }

    pub fn coefficients(&self) -> &[BigUint] {
        &self.coefficients
    }

    pub fn len(&self) -> usize {
        self.coefficients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coefficients.is_empty()
    }

    /// Horner evaluation mod `q`.
    pub fn evaluate(&self, x: &BigUint, order: &BigUint) -> BigUint {
        self.coefficients
            .iter()
            .rev()
            .fold(BigUint::from(0u8), |acc, coefficient| {
                (acc * x + coefficient) % order
            })
    }
}

/// Uniform in `[1, q)`.
fn random_nonzero(order: &BigUint) -> BigUint {
    rng::random_below(&(order - 1u8)) + 1u8
}

/// What teller `k` hands teller `l`: the evaluation `p_k(l)` plus the
/// public commitments and proofs needed to verify it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyShareRecord<E> {
    pub producer: usize,
    #[serde(with = "crypto_serde::decimal")]
    pub share: BigUint,
    #[serde(rename = "blindedCoefficients")]
    pub blinded_coefficients: Vec<E>,
    pub proofs: Vec<DlogProof>,
}

/// A finalized private key share.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateKeyShare<E> {
    pub nr: usize,
    #[serde(rename = "keyShare", with = "crypto_serde::decimal")]
    pub key_share: BigUint,
    pub commitment: E,
}

/// One teller's DKG state.
#[derive(Clone, Debug)]
pub struct DkgTeller<G: CyclicGroup> {
    group: G,
    config: ThresholdConfig,
    index: usize,
    polynomial: Polynomial,
    blinded_coefficients: Vec<G::Element>,
    proofs: Vec<DlogProof>,
}

impl<G: CyclicGroup> DkgTeller<G> {
    pub fn new(group: G, config: ThresholdConfig, index: usize) -> Result<Self, DkgError> {
        config.check_index(index)?;
        let polynomial = Polynomial::random(config.threshold(), group.order());
        let blinded_coefficients: Vec<G::Element> = polynomial
            .coefficients()
            .iter()
            .map(|a| group.pow_u(&group.generator(), a))
            .collect();
        let proofs: Vec<DlogProof> = polynomial
            .coefficients()
            .iter()
            .map(|a| DlogProof::prove(&group, a))
            .collect();
        tracing::debug!(target: LOG_TARGET, index, "teller key material generated");
        Ok(Self {
            group,
            config,
            index,
            polynomial,
            blinded_coefficients,
            proofs,
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn blinded_coefficients(&self) -> &[G::Element] {
        &self.blinded_coefficients
    }

    pub fn coefficient_proofs(&self) -> &[DlogProof] {
        &self.proofs
    }

    /// The record this teller sends to peer `l`.
    pub fn record_for(&self, peer: usize) -> Result<KeyShareRecord<G::Element>, DkgError> {
        self.config.check_index(peer)?;
        Ok(KeyShareRecord {
            producer: self.index,
            share: self
                .polynomial
                .evaluate(&BigUint::from(peer), self.group.order()),
            blinded_coefficients: self.blinded_coefficients.clone(),
            proofs: self.proofs.clone(),
        })
    }

    /// Verify one peer record against this teller's index.
    fn verify_record(&self, record: &KeyShareRecord<G::Element>) -> Result<(), DkgError> {
        let producer = record.producer;
        // coefficient and proof sequences must agree in length with the
        // configured threshold
        if record.blinded_coefficients.len() != self.config.threshold()
            || record.proofs.len() != record.blinded_coefficients.len()
        {
            return Err(DkgError::MalformedRecord {
                producer,
                reason: format!(
                    "expected {} blinded coefficients with proofs, got {}/{}",
                    self.config.threshold(),
                    record.blinded_coefficients.len(),
                    record.proofs.len()
                ),
            });
        }
        if &record.share >= self.group.order() {
            return Err(DkgError::MalformedRecord {
                producer,
                reason: "share exceeds the group order".into(),
            });
        }
        for (index, (coefficient, proof)) in record
            .blinded_coefficients
            .iter()
            .zip(record.proofs.iter())
            .enumerate()
        {
            if !proof.verify(&self.group, coefficient).is_correct() {
                return Err(DkgError::InvalidCoefficientProof { producer, index });
            }
        }
        // Feldman: g^{p_k(l)} must equal Π_i A[k,i]^{l^i}
        let l = BigUint::from(self.index);
        let mut power = BigUint::from(1u8);
        let mut expected = self.group.identity();
        for coefficient in &record.blinded_coefficients {
            expected = self
                .group
                .mul(&expected, &self.group.pow_u(coefficient, &power));
            power = power * &l % self.group.order();
        }
        if self.group.pow_u(&self.group.generator(), &record.share) != expected {
            return Err(DkgError::InconsistentShare { producer });
        }
        Ok(())
    }

    /// Combine exactly `n - 1` verified peer records with this teller's
    /// own evaluation into the private key share
    /// `y_l = Σ_k p_k(l) mod q`.
    pub fn finalize(
        &self,
        records: &[KeyShareRecord<G::Element>],
    ) -> Result<PrivateKeyShare<G::Element>, DkgError> {
        let expected = self.config.tellers() - 1;
        if records.len() != expected {
            return Err(DkgError::WrongRecordCount {
                expected,
                got: records.len(),
            });
        }
        let mut seen = BTreeSet::new();
        for record in records {
            self.config.check_index(record.producer)?;
            if record.producer == self.index {
                return Err(DkgError::RecordFromSelf(record.producer));
            }
            if !seen.insert(record.producer) {
                return Err(DkgError::DuplicateProducer(record.producer));
            }
            self.verify_record(record)?;
        }
        let own = self
            .polynomial
            .evaluate(&BigUint::from(self.index), self.group.order());
        let key_share = records
            .iter()
            .fold(own, |acc, record| (acc + &record.share) % self.group.order());
        let commitment = self.group.pow_u(&self.group.generator(), &key_share);
        tracing::debug!(target: LOG_TARGET, index = self.index, "finalized key share");
        Ok(PrivateKeyShare {
            nr: self.index,
            key_share,
            commitment,
        })
    }
}

/// Combined public encryption key `Y_0 = Π_k A[k,0]`. Requires exactly
/// one contribution per teller.
pub fn combined_public_key<G: CyclicGroup>(
    group: &G,
    coefficient_sets: &[Vec<G::Element>],
    config: &ThresholdConfig,
) -> Result<G::Element, DkgError> {
    if coefficient_sets.len() != config.tellers() {
        return Err(DkgError::WrongContributionCount {
            expected: config.tellers(),
            got: coefficient_sets.len(),
        });
    }
    let firsts = coefficient_sets
        .iter()
        .enumerate()
        .map(|(teller, set)| {
            set.first().ok_or(DkgError::MalformedRecord {
                producer: teller + 1,
                reason: "empty coefficient set".into(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(group.product(firsts))
}

/// Publicly reconstruct teller `l`'s key-share commitment
/// `Y_l = Π_k Π_i A[k,i]^{l^i}` from the global coefficient sets.
pub fn public_key_share<G: CyclicGroup>(
    group: &G,
    coefficient_sets: &[Vec<G::Element>],
    config: &ThresholdConfig,
    teller: usize,
) -> Result<G::Element, DkgError> {
    config.check_index(teller)?;
    if coefficient_sets.len() != config.tellers() {
        return Err(DkgError::WrongContributionCount {
            expected: config.tellers(),
            got: coefficient_sets.len(),
        });
    }
    let l = BigUint::from(teller);
    let mut share = group.identity();
    for set in coefficient_sets {
        let mut power = BigUint::from(1u8);
        for coefficient in set {
            share = group.mul(&share, &group.pow_u(coefficient, &power));
            power = power * &l % group.order();
        }
    }
    Ok(share)
}
