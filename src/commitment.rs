//! Pedersen commitments: a single-value scheme with a seed-derived key,
//! and the vector generalization used by the shuffle proof.

use num_bigint::BigUint;
use thiserror::Error;

use crate::group::{CyclicGroup, GroupError};
use crate::rng;

const LOG_TARGET: &str = "verivote::commitment";

/// Seed of the single-value commitment key.
pub const PEDERSEN_COMMITMENT_SEED: &[u8] = b"pedersen-commitment-key";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CommitmentError {
    #[error("{got} values exceed the key capacity {capacity}")]
    TooManyValues { got: usize, capacity: usize },
    #[error(transparent)]
    Group(#[from] GroupError),
}

/// Single-value Pedersen commitment `com(v; r) = g^v · ck^r`.
/// Perfectly hiding, computationally binding.
#[derive(Clone, Debug)]
pub struct PedersenScheme<G: CyclicGroup> {
    group: G,
    key: G::Element,
}

impl<G: CyclicGroup> PedersenScheme<G> {
    /// Derive the commitment key from the fixed seed.
    pub fn new(group: G) -> Self {
        let key = group
            .elements_from_seed(1, PEDERSEN_COMMITMENT_SEED)
            .remove(0);
        Self { group, key }
    }

    /// Use an externally agreed key (e.g. published election parameters).
    pub fn with_key(group: G, key: G::Element) -> Self {
        Self { group, key }
    }

    pub fn key(&self) -> &G::Element {
        &self.key
    }

    pub fn commit(&self, value: &BigUint, coin: &BigUint) -> G::Element {
        self.group.mul(
            &self.group.pow_u(&self.group.generator(), value),
            &self.group.pow_u(&self.key, coin),
        )
    }

    /// Commit under a fresh uniform coin, returning it as the witness.
    pub fn commit_fresh(&self, value: &BigUint) -> (G::Element, BigUint) {
        let coin = rng::random_below(self.group.order());
        (self.commit(value, &coin), coin)
    }
}

/// Key for vector Pedersen commitments: a blinding base `h` and message
/// bases `h_1..h_n`, all seed-derived independent generators.
#[derive(Clone, Debug)]
pub struct MultiCommitmentKey<G: CyclicGroup> {
    pub h: G::Element,
    pub hs: Vec<G::Element>,
}

impl<G: CyclicGroup> MultiCommitmentKey<G> {
    /// Derive a key with capacity `n` from `elements_from_seed(n + 1, seed)`;
    /// index 0 becomes the blinding base.
    pub fn derive(group: &G, capacity: usize, seed: &[u8]) -> Self {
        let mut elements = group.elements_from_seed(capacity + 1, seed);
        let h = elements.remove(0);
        tracing::debug!(target: LOG_TARGET, capacity, "derived multi-commitment key");
        Self { h, hs: elements }
    }

    pub fn capacity(&self) -> usize {
        self.hs.len()
    }

    /// `com(values; r) = h^r · Π h_i^{values_i}` for up to `capacity`
    /// values.
    pub fn commit(
        &self,
        group: &G,
        values: &[BigUint],
        coin: &BigUint,
    ) -> Result<G::Element, CommitmentError> {
        if values.len() > self.hs.len() {
            return Err(CommitmentError::TooManyValues {
                got: values.len(),
                capacity: self.hs.len(),
            });
        }
        let commitment = self
            .hs
            .iter()
            .zip(values.iter())
            .fold(group.pow_u(&self.h, coin), |acc, (base, value)| {
                group.mul(&acc, &group.pow_u(base, value))
            });
        Ok(commitment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::schnorr::test_group;
    use crate::group::{CurvePoint, GroupElement, SecpGroup};

    #[test]
    fn same_value_distinct_coins_distinct_commitments() {
        let scheme = PedersenScheme::new(test_group());
        let value = BigUint::from(42u8);
        let (c1, r1) = scheme.commit_fresh(&value);
        let (c2, r2) = scheme.commit_fresh(&value);
        assert_ne!(r1, r2);
        assert_ne!(c1, c2);
    }

    #[test]
    fn coins_equivalent_mod_q_commit_equally() {
        let group = test_group();
        let q = group.order().clone();
        let scheme = PedersenScheme::new(group);
        let value = BigUint::from(7u8);
        let coin = BigUint::from(123u8);
        let shifted = &coin + &q;
        assert_eq!(scheme.commit(&value, &coin), scheme.commit(&value, &shifted));
    }

    #[test]
    fn published_secp_commitment_key_opens_the_fixtures() {
        let group = SecpGroup::new();
        // published election-parameter key
        let key_bytes =
            hex::decode("0373744f99d31509eb5f8caaabc0cc3fab70e571a5db4d762020723b9cd6ada260")
                .unwrap();
        let key: CurvePoint = group.element_from_bytes(&key_bytes).unwrap();
        let scheme = PedersenScheme::with_key(group, key);

        let value = BigUint::from(42u8);
        let coin = BigUint::parse_bytes(
            b"1897394776788888888854555455455455455455455455455455765",
            10,
        )
        .unwrap();
        assert_eq!(
            hex::encode(scheme.commit(&value, &coin).to_bytes()),
            "021d51f3a8dd18477bafcb5e149314d6e03669bbfc65bf8cb975f46e2527be7901"
        );

        // second-device challenge commitment
        let challenge = BigUint::parse_bytes(
            b"108039209026641834721998202775536164454916176078442584841940316235417705823230",
            10,
        )
        .unwrap();
        let challenge_coin = BigUint::parse_bytes(
            b"44267717001895006656767798790813376597351395807170189462353830054915294464906",
            10,
        )
        .unwrap();
        assert_eq!(
            hex::encode(scheme.commit(&challenge, &challenge_coin).to_bytes()),
            "030e1a9be2459151057e9d731b524ca435f1c05bc0a95d3d82b30512d306172b17"
        );
    }

    #[test]
    fn multi_commitment_respects_capacity_and_homomorphism() {
        let group = test_group();
        let key = MultiCommitmentKey::derive(&group, 4, b"test-multi-key");
        assert_eq!(key.capacity(), 4);

        let values: Vec<BigUint> = (1u8..=4).map(BigUint::from).collect();
        let coin = BigUint::from(99u8);
        let commitment = key.commit(&group, &values, &coin).unwrap();

        // shorter vectors are allowed
        key.commit(&group, &values[..2], &coin).unwrap();
        // longer are not
        let too_many: Vec<BigUint> = (0u8..5).map(BigUint::from).collect();
        assert!(matches!(
            key.commit(&group, &too_many, &coin),
            Err(CommitmentError::TooManyValues { got: 5, capacity: 4 })
        ));

        // com(v; r) * com(v'; r') = com(v + v'; r + r')
        let values2: Vec<BigUint> = (5u8..=8).map(BigUint::from).collect();
        let coin2 = BigUint::from(3u8);
        let commitment2 = key.commit(&group, &values2, &coin2).unwrap();
        let sums: Vec<BigUint> = values
            .iter()
            .zip(values2.iter())
            .map(|(a, b)| a + b)
            .collect();
        let combined = key.commit(&group, &sums, &(&coin + &coin2)).unwrap();
        assert_eq!(group.mul(&commitment, &commitment2), combined);
    }
}
