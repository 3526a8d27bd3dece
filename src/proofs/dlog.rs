//! Schnorr proof of knowledge of a discrete logarithm: given `X = g^x`,
//! prove knowledge of `x` without revealing it.

use num_bigint::{BigInt, BigUint};
use serde::{Deserialize, Serialize};

use crate::group::{CyclicGroup, GroupElement};
use crate::transcript::Transcript;
use crate::verify::VerificationResult;
use crate::{crypto_serde, rng};

const LOG_TARGET: &str = "verivote::proofs::dlog";

/// A non-interactive `(c, f)` proof of knowledge of `x` with `X = g^x`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DlogProof {
    #[serde(with = "crypto_serde::decimal")]
    pub c: BigUint,
    #[serde(with = "crypto_serde::decimal")]
    pub f: BigUint,
}

/// Default Fiat-Shamir challenge over `g || X || A`.
fn default_challenge<G: CyclicGroup>(
    group: &G,
    statement: &G::Element,
    announcement: &G::Element,
) -> BigUint {
    let mut transcript = Transcript::new();
    transcript
        .append_bytes(&group.generator().to_bytes())
        .append_bytes(&statement.to_bytes())
        .append_bytes(&announcement.to_bytes());
    transcript.challenge(group.order())
}

impl DlogProof {
    /// Prove knowledge of `witness` for the statement `g^witness`.
    pub fn prove<G: CyclicGroup>(group: &G, witness: &BigUint) -> Self {
        let statement = group.pow_u(&group.generator(), witness);
        Self::prove_with_challenger(group, witness, |announcement| {
            default_challenge(group, &statement, announcement)
        })
    }

    /// Prove with a caller-supplied challenger (Schnorr-signature-style
    /// variants replace the default transcript).
    pub fn prove_with_challenger<G, F>(group: &G, witness: &BigUint, challenger: F) -> Self
    where
        G: CyclicGroup,
        F: FnOnce(&G::Element) -> BigUint,
    {
        let q = group.order();
        let nonce = rng::random_below(q);
        let announcement = group.pow_u(&group.generator(), &nonce);
        let c = challenger(&announcement) % q;
        tracing::debug!(target: LOG_TARGET, "dlog challenge derived");
        let f = (&nonce + &c * witness) % q;
        Self { c, f }
    }

    /// Verify against the statement `X`: reconstruct
    /// `A' = g^f · X^{-c}` and require the challenge to reproduce.
    pub fn verify<G: CyclicGroup>(&self, group: &G, statement: &G::Element) -> VerificationResult {
        self.verify_with_challenger(group, statement, |announcement| {
            default_challenge(group, statement, announcement)
        })
    }

    pub fn verify_with_challenger<G, F>(
        &self,
        group: &G,
        statement: &G::Element,
        challenger: F,
    ) -> VerificationResult
    where
        G: CyclicGroup,
        F: FnOnce(&G::Element) -> BigUint,
    {
        if !group.is_valid_element(statement) {
            return VerificationResult::Failed("statement is not a group element".into());
        }
        if &self.f >= group.order() {
            return VerificationResult::Failed("response out of range".into());
        }
        let reconstructed = group.mul(
            &group.pow_u(&group.generator(), &self.f),
            &group.pow(statement, &-BigInt::from(self.c.clone())),
        );
        let expected = challenger(&reconstructed) % group.order();
        VerificationResult::expect(expected == self.c, "dlog challenge mismatch").on_failure(
            |reason| tracing::warn!(target: LOG_TARGET, reason, "dlog verification failed"),
        )
    }
}
