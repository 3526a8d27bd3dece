//! Chaum-Pedersen proof of equality of discrete logarithms: a single
//! witness `x` with `X = g_X^x` and `Y = g_Y^x`.

use num_bigint::{BigInt, BigUint};
use serde::{Deserialize, Serialize};

use crate::group::{CyclicGroup, GroupElement};
use crate::transcript::Transcript;
use crate::verify::VerificationResult;
use crate::{crypto_serde, rng};

const LOG_TARGET: &str = "verivote::proofs::eqlog";

/// A non-interactive `(c, f)` proof that `log_{g_X} X = log_{g_Y} Y`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EqlogProof {
    #[serde(with = "crypto_serde::decimal")]
    pub c: BigUint,
    #[serde(with = "crypto_serde::decimal")]
    pub f: BigUint,
}

/// The two bases and two statements of an eqlog instance.
#[derive(Clone, Debug)]
pub struct EqlogInstance<E> {
    pub base_x: E,
    pub base_y: E,
    pub statement_x: E,
    pub statement_y: E,
}

fn challenge<G: CyclicGroup>(
    group: &G,
    instance: &EqlogInstance<G::Element>,
    announcement_x: &G::Element,
    announcement_y: &G::Element,
) -> BigUint {
    let mut transcript = Transcript::new();
    transcript
        .append_bytes(&instance.base_x.to_bytes())
        .append_bytes(&instance.base_y.to_bytes())
        .append_bytes(&instance.statement_x.to_bytes())
        .append_bytes(&instance.statement_y.to_bytes())
        .append_bytes(&announcement_x.to_bytes())
        .append_bytes(&announcement_y.to_bytes());
    transcript.challenge(group.order())
}

impl EqlogProof {
    /// Prove that `instance.statement_x = base_x^witness` and
    /// `instance.statement_y = base_y^witness`.
    pub fn prove<G: CyclicGroup>(
        group: &G,
        instance: &EqlogInstance<G::Element>,
        witness: &BigUint,
    ) -> Self {
        let q = group.order();
        let nonce = rng::random_below(q);
        let announcement_x = group.pow_u(&instance.base_x, &nonce);
        let announcement_y = group.pow_u(&instance.base_y, &nonce);
        let c = challenge(group, instance, &announcement_x, &announcement_y);
        tracing::debug!(target: LOG_TARGET, "eqlog challenge derived");
        let f = (&nonce + &c * witness) % q;
        Self { c, f }
    }

    /// Verify by reconstructing both announcements and requiring the
    /// challenge to reproduce.
    pub fn verify<G: CyclicGroup>(
        &self,
        group: &G,
        instance: &EqlogInstance<G::Element>,
    ) -> VerificationResult {
        for (element, name) in [
            (&instance.base_x, "base X"),
            (&instance.base_y, "base Y"),
            (&instance.statement_x, "statement X"),
            (&instance.statement_y, "statement Y"),
        ] {
            if !group.is_valid_element(element) {
                return VerificationResult::Failed(format!("{name} is not a group element"));
            }
        }
        if &self.f >= group.order() {
            return VerificationResult::Failed("response out of range".into());
        }
        let minus_c = -BigInt::from(self.c.clone());
        let announcement_x = group.mul(
            &group.pow_u(&instance.base_x, &self.f),
            &group.pow(&instance.statement_x, &minus_c),
        );
        let announcement_y = group.mul(
            &group.pow_u(&instance.base_y, &self.f),
            &group.pow(&instance.statement_y, &minus_c),
        );
        let expected = challenge(group, instance, &announcement_x, &announcement_y);
        VerificationResult::expect(expected == self.c, "eqlog challenge mismatch").on_failure(
            |reason| tracing::warn!(target: LOG_TARGET, reason, "eqlog verification failed"),
        )
    }
}
