//! Proof of a correct re-encryption shuffle (HLKD17, Wikström-style).
//!
//! The prover commits to its permutation, derives the challenge vector
//! `u` and the final challenge `C` from branches of one shared
//! transcript prefix, and answers with responses that let the verifier
//! recompute the announcement from public data alone. The N-indexed
//! products on both sides are parallelized; any schedule producing the
//! same arithmetic result is acceptable.

use num_bigint::{BigInt, BigUint};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::{batch_width, ShuffleError, ShuffleWitness};
use crate::commitment::MultiCommitmentKey;
use crate::crypto_serde;
use crate::elgamal::MultiCiphertext;
use crate::group::{CyclicGroup, GroupElement};
use crate::rng;
use crate::transcript::Transcript;
use crate::verify::VerificationResult;

const LOG_TARGET: &str = "verivote::shuffle::proof";

/// The announcement 6-tuple.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShuffleAnnouncement<E> {
    pub t1: E,
    pub t2: E,
    pub t3: E,
    pub t4x: Vec<E>,
    pub t4y: Vec<E>,
    #[serde(rename = "tHat")]
    pub t_hat: Vec<E>,
}

/// The responses.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShuffleResponses {
    #[serde(with = "crypto_serde::decimal")]
    pub s1: BigUint,
    #[serde(with = "crypto_serde::decimal")]
    pub s2: BigUint,
    #[serde(with = "crypto_serde::decimal")]
    pub s3: BigUint,
    #[serde(with = "crypto_serde::decimal_vec")]
    pub s4: Vec<BigUint>,
    #[serde(rename = "sHat", with = "crypto_serde::decimal_vec")]
    pub s_hat: Vec<BigUint>,
    #[serde(rename = "sPrime", with = "crypto_serde::decimal_vec")]
    pub s_prime: Vec<BigUint>,
}

/// Zero-knowledge proof that the outputs are a re-encryption and
/// permutation of the inputs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShuffleProof<E> {
    pub t: ShuffleAnnouncement<E>,
    pub s: ShuffleResponses,
    pub c: Vec<E>,
    #[serde(rename = "cHat")]
    pub c_hat: Vec<E>,
}

/// Shared transcript prefix over the public data:
/// `(N, W, g, pk, h, h_1..h_N, inputs, outputs, c)`.
fn base_transcript<G: CyclicGroup>(
    group: &G,
    public_key: &G::Element,
    commitment_key: &MultiCommitmentKey<G>,
    inputs: &[MultiCiphertext<G::Element>],
    outputs: &[MultiCiphertext<G::Element>],
    permutation_commitments: &[G::Element],
) -> Transcript {
    let mut transcript = Transcript::new();
    transcript
        .append_i32(inputs.len() as i32)
        .append_i32(inputs[0].width() as i32)
        .append_bytes(&group.generator().to_bytes())
        .append_bytes(&public_key.to_bytes())
        .append_bytes(&commitment_key.h.to_bytes());
    for base in commitment_key.hs.iter().take(inputs.len()) {
        transcript.append_bytes(&base.to_bytes());
    }
    for batch in [inputs, outputs] {
        for multi in batch {
            for ciphertext in &multi.ciphertexts {
                transcript
                    .append_bytes(&ciphertext.x.to_bytes())
                    .append_bytes(&ciphertext.y.to_bytes());
            }
        }
    }
    for commitment in permutation_commitments {
        transcript.append_bytes(&commitment.to_bytes());
    }
    transcript
}

/// Per-input challenges `u[i]` from branches of the shared prefix.
fn challenge_vector<G: CyclicGroup>(group: &G, base: &Transcript, n: usize) -> Vec<BigUint> {
    (0..n)
        .into_par_iter()
        .map(|i| {
            let mut branch = base.clone();
            branch.append_i32(i as i32 + 1);
            branch.challenge(group.order())
        })
        .collect()
}

/// Final challenge `C` over the seed, the chain commitments and the
/// announcement.
fn final_challenge<G: CyclicGroup>(
    group: &G,
    base: &Transcript,
    c_hat: &[G::Element],
    announcement: &ShuffleAnnouncement<G::Element>,
) -> BigUint {
    let mut branch = base.clone();
    for element in c_hat {
        branch.append_bytes(&element.to_bytes());
    }
    branch
        .append_bytes(&announcement.t1.to_bytes())
        .append_bytes(&announcement.t2.to_bytes())
        .append_bytes(&announcement.t3.to_bytes());
    for (t4x, t4y) in announcement.t4x.iter().zip(announcement.t4y.iter()) {
        branch
            .append_bytes(&t4x.to_bytes())
            .append_bytes(&t4y.to_bytes());
    }
    for element in &announcement.t_hat {
        branch.append_bytes(&element.to_bytes());
    }
    branch.challenge(group.order())
}

fn par_product<G: CyclicGroup>(group: &G, factors: Vec<G::Element>) -> G::Element {
    factors
        .into_par_iter()
        .reduce(|| group.identity(), |a, b| group.mul(&a, &b))
}

/// Generate the shuffle proof for `(inputs, outputs, witness)`.
pub fn prove_shuffle<G: CyclicGroup>(
    group: &G,
    public_key: &G::Element,
    commitment_key: &MultiCommitmentKey<G>,
    inputs: &[MultiCiphertext<G::Element>],
    outputs: &[MultiCiphertext<G::Element>],
    witness: &ShuffleWitness,
) -> Result<ShuffleProof<G::Element>, ShuffleError> {
    let n = inputs.len();
    let width = batch_width(inputs)?;
    if outputs.len() != n || batch_width(outputs)? != width {
        return Err(ShuffleError::WitnessShape);
    }
    if witness.permutation.len() != n
        || witness.coins.len() != n
        || witness.coins.iter().any(|row| row.len() != width)
    {
        return Err(ShuffleError::WitnessShape);
    }
    if commitment_key.capacity() < n {
        return Err(ShuffleError::KeyCapacity {
            capacity: commitment_key.capacity(),
            required: n,
        });
    }
    let q = group.order();
    let two = BigUint::from(2u8);
    if q <= &two {
        return Err(ShuffleError::UnsupportedGroup);
    }
    let g = group.generator();
    let h = &commitment_key.h;
    let hs = &commitment_key.hs[..n];
    let permutation = &witness.permutation;

    // 1. permutation commitment c_i = h^{r_i} * h_{π(i)}
    let r: Vec<BigUint> = (0..n).map(|_| rng::random_below(q)).collect();
    let c: Vec<G::Element> = (0..n)
        .map(|i| group.mul(&group.pow_u(h, &r[i]), &hs[permutation.apply(i)]))
        .collect();

    // 2. challenge vector from the shared prefix; u'[i] = u[π⁻¹(i)]
    let base = base_transcript(group, public_key, commitment_key, inputs, outputs, &c);
    let u = challenge_vector(group, &base, n);
    let u_prime: Vec<BigUint> = (0..n).map(|i| u[permutation.invert(i)].clone()).collect();

    // 3. chain commitment ĉ_i = h^{r̂_i} * ĉ_{i-1}^{u'_i}, ĉ_{-1} = h_1
    let r_hat: Vec<BigUint> = (0..n).map(|_| rng::random_below(q)).collect();
    let mut c_hat: Vec<G::Element> = Vec::with_capacity(n);
    let mut previous = hs[0].clone();
    for i in 0..n {
        let link = group.mul(
            &group.pow_u(h, &r_hat[i]),
            &group.pow_u(&previous, &u_prime[i]),
        );
        c_hat.push(link.clone());
        previous = link;
    }

    // 4. witness aggregates
    let r_bar = r.iter().fold(BigUint::from(0u8), |acc, v| (acc + v) % q);
    let r_tilde = r
        .iter()
        .zip(u.iter())
        .fold(BigUint::from(0u8), |acc, (ri, ui)| (acc + ri * ui) % q);
    let r_star: Vec<BigUint> = (0..width)
        .map(|j| {
            (0..n).fold(BigUint::from(0u8), |acc, i| {
                (acc + &witness.coins[i][j] * &u[i]) % q
            })
        })
        .collect();
    let mut r_diamond = BigUint::from(0u8);
    let mut chain_product = BigUint::from(1u8);
    for i in (0..n).rev() {
        r_diamond = (r_diamond + &r_hat[i] * &chain_product) % q;
        chain_product = chain_product * &u_prime[i] % q;
    }

    // 5. announcement
    let blind = |low: &BigUint| rng::random_in_range(low, q).expect("q was checked to exceed 2");
    let omega_1 = blind(&two);
    let omega_2 = blind(&two);
    let omega_3 = blind(&two);
    let omega_4: Vec<BigUint> = (0..width).map(|_| blind(&two)).collect();
    let omega_hat: Vec<BigUint> = (0..n).map(|_| rng::random_below(q)).collect();
    let omega_prime: Vec<BigUint> = (0..n).map(|_| rng::random_below(q)).collect();

    let t1 = group.pow_u(h, &omega_1);
    let t2 = group.pow_u(h, &omega_2);
    let t3 = group.mul(
        &group.pow_u(h, &omega_3),
        &par_product(
            group,
            (0..n)
                .into_par_iter()
                .map(|i| group.pow_u(&hs[i], &omega_prime[i]))
                .collect(),
        ),
    );
    let t4_pair: Vec<(G::Element, G::Element)> = (0..width)
        .into_par_iter()
        .map(|j| {
            let minus_omega = -BigInt::from(omega_4[j].clone());
            let xs = par_product(
                group,
                (0..n)
                    .into_par_iter()
                    .map(|i| group.pow_u(&outputs[i].ciphertexts[j].x, &omega_prime[i]))
                    .collect(),
            );
            let ys = par_product(
                group,
                (0..n)
                    .into_par_iter()
                    .map(|i| group.pow_u(&outputs[i].ciphertexts[j].y, &omega_prime[i]))
                    .collect(),
            );
            (
                group.mul(&group.pow(&g, &minus_omega), &xs),
                group.mul(&group.pow(public_key, &minus_omega), &ys),
            )
        })
        .collect();
    let t_hat: Vec<G::Element> = (0..n)
        .into_par_iter()
        .map(|i| {
            let previous = if i == 0 { &hs[0] } else { &c_hat[i - 1] };
            group.mul(
                &group.pow_u(h, &omega_hat[i]),
                &group.pow_u(previous, &omega_prime[i]),
            )
        })
        .collect();

    let announcement = ShuffleAnnouncement {
        t1,
        t2,
        t3,
        t4x: t4_pair.iter().map(|p| p.0.clone()).collect(),
        t4y: t4_pair.iter().map(|p| p.1.clone()).collect(),
        t_hat,
    };

    // 6. challenge
    let challenge = final_challenge(group, &base, &c_hat, &announcement);

    // 7. responses
    let responses = ShuffleResponses {
        s1: (&omega_1 + &challenge * &r_bar) % q,
        s2: (&omega_2 + &challenge * &r_diamond) % q,
        s3: (&omega_3 + &challenge * &r_tilde) % q,
        s4: (0..width)
            .map(|j| (&omega_4[j] + &challenge * &r_star[j]) % q)
            .collect(),
        s_hat: (0..n)
            .map(|i| (&omega_hat[i] + &challenge * &r_hat[i]) % q)
            .collect(),
        s_prime: (0..n)
            .map(|i| (&omega_prime[i] + &challenge * &u_prime[i]) % q)
            .collect(),
    };
    tracing::debug!(target: LOG_TARGET, n, width, "shuffle proof generated");

    Ok(ShuffleProof {
        t: announcement,
        s: responses,
        c,
        c_hat,
    })
}

/// Verify a shuffle proof. Size and element-validity checks come first;
/// every mismatch names the failing clause.
pub fn verify_shuffle<G: CyclicGroup>(
    group: &G,
    public_key: &G::Element,
    commitment_key: &MultiCommitmentKey<G>,
    inputs: &[MultiCiphertext<G::Element>],
    outputs: &[MultiCiphertext<G::Element>],
    proof: &ShuffleProof<G::Element>,
) -> VerificationResult {
    // -- sizes
    let n = inputs.len();
    let width = match batch_width(inputs) {
        Ok(w) => w,
        Err(e) => return VerificationResult::Failed(format!("inputs: {e}")),
    };
    match batch_width(outputs) {
        Ok(w) if outputs.len() == n && w == width => {}
        Ok(_) | Err(_) => {
            return VerificationResult::Failed(
                "outputs do not match the input batch shape".into(),
            )
        }
    }
    if commitment_key.capacity() < n {
        return VerificationResult::Failed("commitment key is too small for the batch".into());
    }
    if proof.c.len() != n || proof.c_hat.len() != n {
        return VerificationResult::Failed("commitment vector sizes do not match N".into());
    }
    if proof.t.t_hat.len() != n
        || proof.s.s_hat.len() != n
        || proof.s.s_prime.len() != n
        || proof.t.t4x.len() != width
        || proof.t.t4y.len() != width
        || proof.s.s4.len() != width
    {
        return VerificationResult::Failed("proof component sizes do not match N and W".into());
    }
    let q = group.order();
    let responses_in_range = proof
        .s
        .s4
        .iter()
        .chain(proof.s.s_hat.iter())
        .chain(proof.s.s_prime.iter())
        .chain([&proof.s.s1, &proof.s.s2, &proof.s.s3])
        .all(|s| s < q);
    if !responses_in_range {
        return VerificationResult::Failed("response out of range".into());
    }

    // -- element validity (wire data is validated before use)
    let wire_elements: Vec<&G::Element> = proof
        .c
        .iter()
        .chain(proof.c_hat.iter())
        .chain(proof.t.t_hat.iter())
        .chain(proof.t.t4x.iter())
        .chain(proof.t.t4y.iter())
        .chain([&proof.t.t1, &proof.t.t2, &proof.t.t3])
        .chain(
            outputs
                .iter()
                .flat_map(|m| m.ciphertexts.iter())
                .flat_map(|c| [&c.x, &c.y]),
        )
        .collect();
    if !wire_elements
        .par_iter()
        .all(|element| group.is_valid_element(element))
    {
        return VerificationResult::Failed("proof contains an invalid group element".into());
    }

    let g = group.generator();
    let h = &commitment_key.h;
    let hs = &commitment_key.hs[..n];

    // -- challenges
    let base = base_transcript(group, public_key, commitment_key, inputs, outputs, &proof.c);
    let u = challenge_vector(group, &base, n);
    let challenge = final_challenge(group, &base, &proof.c_hat, &proof.t);
    let minus_c = -BigInt::from(challenge.clone());

    // t1: c̄ = Π c_i / Π h_i, expect t1 = c̄^{-C} * h^{s1}
    let c_bar = group.mul(
        &par_product(group, proof.c.to_vec()),
        &group.inverse(&par_product(group, hs.to_vec())),
    );
    let expected_t1 = group.mul(&group.pow(&c_bar, &minus_c), &group.pow_u(h, &proof.s.s1));
    if expected_t1 != proof.t.t1 {
        return fail("t1 mismatch");
    }

    // t2: ĉ = ĉ_{N-1} * h_1^{-Π u_i}, expect t2 = ĉ^{-C} * h^{s2}
    let u_product = u.iter().fold(BigUint::from(1u8), |acc, ui| acc * ui % q);
    let c_hat_bar = group.mul(
        &proof.c_hat[n - 1],
        &group.pow(&hs[0], &-BigInt::from(u_product)),
    );
    let expected_t2 = group.mul(
        &group.pow(&c_hat_bar, &minus_c),
        &group.pow_u(h, &proof.s.s2),
    );
    if expected_t2 != proof.t.t2 {
        return fail("t2 mismatch");
    }

    // t3: c̃ = Π c_i^{u_i}, expect t3 = c̃^{-C} * h^{s3} * Π h_i^{s'_i}
    let c_tilde = par_product(
        group,
        (0..n)
            .into_par_iter()
            .map(|i| group.pow_u(&proof.c[i], &u[i]))
            .collect(),
    );
    let expected_t3 = group.mul(
        &group.mul(&group.pow(&c_tilde, &minus_c), &group.pow_u(h, &proof.s.s3)),
        &par_product(
            group,
            (0..n)
                .into_par_iter()
                .map(|i| group.pow_u(&hs[i], &proof.s.s_prime[i]))
                .collect(),
        ),
    );
    if expected_t3 != proof.t.t3 {
        return fail("t3 mismatch");
    }

    // t4: for each slot j, both coordinates
    let t4_failure = (0..width).into_par_iter().find_map_first(|j| {
        let a_x = par_product(
            group,
            (0..n)
                .into_par_iter()
                .map(|i| group.pow_u(&inputs[i].ciphertexts[j].x, &u[i]))
                .collect(),
        );
        let a_y = par_product(
            group,
            (0..n)
                .into_par_iter()
                .map(|i| group.pow_u(&inputs[i].ciphertexts[j].y, &u[i]))
                .collect(),
        );
        let minus_s4 = -BigInt::from(proof.s.s4[j].clone());
        let expected_x = group.mul(
            &group.mul(&group.pow(&a_x, &minus_c), &group.pow(&g, &minus_s4)),
            &par_product(
                group,
                (0..n)
                    .into_par_iter()
                    .map(|i| group.pow_u(&outputs[i].ciphertexts[j].x, &proof.s.s_prime[i]))
                    .collect(),
            ),
        );
        if expected_x != proof.t.t4x[j] {
            return Some(format!("t4x[{j}] mismatch"));
        }
        let expected_y = group.mul(
            &group.mul(&group.pow(&a_y, &minus_c), &group.pow(public_key, &minus_s4)),
            &par_product(
                group,
                (0..n)
                    .into_par_iter()
                    .map(|i| group.pow_u(&outputs[i].ciphertexts[j].y, &proof.s.s_prime[i]))
                    .collect(),
            ),
        );
        if expected_y != proof.t.t4y[j] {
            return Some(format!("t4y[{j}] mismatch"));
        }
        None
    });
    if let Some(reason) = t4_failure {
        return fail(&reason);
    }

    // t̂: per-link chain checks
    let t_hat_failure = (0..n).into_par_iter().find_map_first(|i| {
        let previous = if i == 0 { &hs[0] } else { &proof.c_hat[i - 1] };
        let expected = group.mul(
            &group.mul(
                &group.pow(&proof.c_hat[i], &minus_c),
                &group.pow_u(h, &proof.s.s_hat[i]),
            ),
            &group.pow_u(previous, &proof.s.s_prime[i]),
        );
        (expected != proof.t.t_hat[i]).then(|| format!("tHat[{i}] mismatch"))
    });
    if let Some(reason) = t_hat_failure {
        return fail(&reason);
    }

    VerificationResult::Correct
}

fn fail(reason: &str) -> VerificationResult {
    tracing::warn!(target: LOG_TARGET, reason, "shuffle verification failed");
    VerificationResult::Failed(reason.to_string())
}
