//! Verifiable decryption: the key holder publishes the decryption
//! factor `D = α^sk` together with an eqlog proof that `sk` is the
//! joint discrete log of `(pk, D)` with bases `(g, α)`.

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use super::eqlog::{EqlogInstance, EqlogProof};
use crate::elgamal::Ciphertext;
use crate::group::CyclicGroup;
use crate::verify::VerificationResult;

const LOG_TARGET: &str = "verivote::proofs::decryption";

/// A decryption factor and its proof of correctness.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiableDecryption<E> {
    #[serde(rename = "decryptionFactor")]
    pub factor: E,
    pub zkp: EqlogProof,
}

/// Compute `D = α^sk` and prove it correct against `pk = g^sk`.
pub fn prove_decryption<G: CyclicGroup>(
    group: &G,
    secret_key: &BigUint,
    ciphertext: &Ciphertext<G::Element>,
) -> VerifiableDecryption<G::Element> {
    let factor = group.pow_u(&ciphertext.x, secret_key);
    let instance = EqlogInstance {
        base_x: group.generator(),
        base_y: ciphertext.x.clone(),
        statement_x: group.pow_u(&group.generator(), secret_key),
        statement_y: factor.clone(),
    };
    let zkp = EqlogProof::prove(group, &instance, secret_key);
    tracing::debug!(target: LOG_TARGET, "produced verifiable decryption factor");
    VerifiableDecryption { factor, zkp }
}

/// Verify the eqlog proof for `(g, α) → (pk, D)`, and optionally that
/// the factor opens the ciphertext to `claimed_plaintext`.
pub fn verify_decryption<G: CyclicGroup>(
    group: &G,
    public_key: &G::Element,
    ciphertext: &Ciphertext<G::Element>,
    decryption: &VerifiableDecryption<G::Element>,
    claimed_plaintext: Option<&BigUint>,
) -> VerificationResult {
    let instance = EqlogInstance {
        base_x: group.generator(),
        base_y: ciphertext.x.clone(),
        statement_x: public_key.clone(),
        statement_y: decryption.factor.clone(),
    };
    decryption
        .zkp
        .verify(group, &instance)
        .and_expect(
            || match claimed_plaintext {
                Some(expected) => {
                    let opened = group.mul(&ciphertext.y, &group.inverse(&decryption.factor));
                    &group.decode(&opened) == expected
                }
                None => true,
            },
            "decryption factor does not open to the claimed plaintext",
        )
        .on_failure(|reason| {
            tracing::warn!(target: LOG_TARGET, reason, "decryption verification failed");
        })
}
