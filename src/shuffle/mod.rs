//! Verifiable re-encryption mix-net: shuffle generation and the
//! Haenni-Locher-Koenig-Dubuis 2017 proof of a correct shuffle.

pub mod permutation;
pub mod proof;

use num_bigint::BigUint;
use thiserror::Error;

use crate::commitment::MultiCommitmentKey;
use crate::elgamal::{re_randomize, MultiCiphertext};
use crate::group::CyclicGroup;
use crate::rng;

pub use permutation::{Permutation, PermutationError};
pub use proof::{prove_shuffle, verify_shuffle, ShuffleProof};

const LOG_TARGET: &str = "verivote::shuffle";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ShuffleError {
    #[error("cannot shuffle an empty batch")]
    EmptyBatch,
    #[error("multi-ciphertext {index} has width {got}, expected {expected}")]
    RaggedWidths {
        index: usize,
        got: usize,
        expected: usize,
    },
    #[error("commitment key capacity {capacity} is below the batch size {required}")]
    KeyCapacity { capacity: usize, required: usize },
    #[error("witness shape does not match the batch")]
    WitnessShape,
    #[error("group order is too small to sample re-encryption coins")]
    UnsupportedGroup,
}

/// The prover's secret for one shuffle: the permutation and the
/// re-encryption coins, `coins[i][j]` belonging to input `i`, slot `j`.
#[derive(Clone, Debug)]
pub struct ShuffleWitness {
    pub permutation: Permutation,
    pub coins: Vec<Vec<BigUint>>,
}

/// A shuffled batch with its proof.
#[derive(Clone, Debug)]
pub struct ShuffledBatch<E> {
    pub outputs: Vec<MultiCiphertext<E>>,
    pub proof: ShuffleProof<E>,
}

/// Uniform width of a batch, or the precise shape error.
pub(crate) fn batch_width<E>(inputs: &[MultiCiphertext<E>]) -> Result<usize, ShuffleError> {
    let first = inputs.first().ok_or(ShuffleError::EmptyBatch)?;
    let width = first.width();
    if width == 0 {
        return Err(ShuffleError::EmptyBatch);
    }
    for (index, multi) in inputs.iter().enumerate() {
        if multi.width() != width {
            return Err(ShuffleError::RaggedWidths {
                index,
                got: multi.width(),
                expected: width,
            });
        }
    }
    Ok(width)
}

/// Re-encrypt every input under fresh coins and reorder by a random
/// permutation: output position `i` carries the re-encryption of input
/// `π⁻¹(i)`. Auxiliary data travels with its ciphertext. Never fails on
/// a well-formed batch.
pub fn shuffle<G: CyclicGroup>(
    group: &G,
    public_key: &G::Element,
    inputs: &[MultiCiphertext<G::Element>],
) -> Result<(Vec<MultiCiphertext<G::Element>>, ShuffleWitness), ShuffleError> {
    let width = batch_width(inputs)?;
    let two = BigUint::from(2u8);
    if group.order() <= &two {
        return Err(ShuffleError::UnsupportedGroup);
    }

    let coins: Vec<Vec<BigUint>> = (0..inputs.len())
        .map(|_| {
            (0..width)
                .map(|_| {
                    rng::random_in_range(&two, group.order())
                        .expect("the order was checked to exceed 2")
                })
                .collect()
        })
        .collect();
    let permutation = Permutation::random(inputs.len());

    let re_encrypted: Vec<MultiCiphertext<G::Element>> = inputs
        .iter()
        .zip(coins.iter())
        .map(|(multi, multi_coins)| MultiCiphertext {
            ciphertexts: multi
                .ciphertexts
                .iter()
                .zip(multi_coins.iter())
                .map(|(ciphertext, coin)| re_randomize(group, ciphertext, public_key, coin))
                .collect(),
            aux_data: multi.aux_data.clone(),
        })
        .collect();

    let outputs: Vec<MultiCiphertext<G::Element>> = (0..inputs.len())
        .map(|i| re_encrypted[permutation.invert(i)].clone())
        .collect();

    tracing::debug!(
        target: LOG_TARGET,
        batch = inputs.len(),
        width,
        "generated re-encryption shuffle"
    );
    Ok((outputs, ShuffleWitness { permutation, coins }))
}

/// Shuffle and prove in one step.
pub fn shuffle_and_prove<G: CyclicGroup>(
    group: &G,
    public_key: &G::Element,
    commitment_key: &MultiCommitmentKey<G>,
    inputs: &[MultiCiphertext<G::Element>],
) -> Result<ShuffledBatch<G::Element>, ShuffleError> {
    let (outputs, witness) = shuffle(group, public_key, inputs)?;
    let proof = prove_shuffle(group, public_key, commitment_key, inputs, &outputs, &witness)?;
    Ok(ShuffledBatch { outputs, proof })
}
