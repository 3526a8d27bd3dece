//! ElGamal encryption over an abstract cyclic group, plus the chunked
//! codec that splits arbitrary byte messages across group-sized blocks.

use std::collections::BTreeMap;

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::group::{CyclicGroup, GroupError};
use crate::rng;
use thiserror::Error;

const LOG_TARGET: &str = "verivote::elgamal";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ElGamalError {
    #[error(transparent)]
    Group(#[from] GroupError),
    #[error("group order is too small for chunked messages")]
    UnsupportedGroup,
    #[error("chunk of {got} bytes exceeds the {expected}-byte block size")]
    OversizedBlock { got: usize, expected: usize },
    #[error("chunked message is shorter than its pad")]
    TruncatedMessage,
    #[error("nonzero byte inside the zero pad")]
    CorruptPad,
    #[error("multi-ciphertext is empty")]
    EmptyMultiCiphertext,
}

/// ElGamal key pair `(sk, pk = g^sk)`.
#[derive(Clone, Debug)]
pub struct KeyPair<G: CyclicGroup> {
    pub secret_key: BigUint,
    pub public_key: G::Element,
}

impl<G: CyclicGroup> KeyPair<G> {
    pub fn from_secret(group: &G, secret_key: BigUint) -> Self {
        let public_key = group.pow_u(&group.generator(), &secret_key);
        Self {
            secret_key,
            public_key,
        }
    }

    pub fn generate(group: &G) -> Self {
        Self::from_secret(group, random_unit_exponent(group))
    }
}

/// Uniform exponent in `[1, q)`.
pub(crate) fn random_unit_exponent<G: CyclicGroup>(group: &G) -> BigUint {
    rng::random_below(&(group.order() - 1u8)) + 1u8
}

/// An ElGamal pair `(x, y) = (g^r, m · pk^r)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ciphertext<E> {
    pub x: E,
    pub y: E,
}

impl<E> Ciphertext<E> {
    pub fn new(x: E, y: E) -> Self {
        Self { x, y }
    }
}

/// Ordered sequence of ciphertexts carrying one logical plaintext, with
/// optional auxiliary metadata that is opaque to the core and preserved
/// through re-encryption shuffles.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiCiphertext<E> {
    pub ciphertexts: Vec<Ciphertext<E>>,
    #[serde(rename = "auxData", skip_serializing_if = "Option::is_none", default)]
    pub aux_data: Option<BTreeMap<String, String>>,
}

impl<E> MultiCiphertext<E> {
    pub fn new(ciphertexts: Vec<Ciphertext<E>>) -> Self {
        Self {
            ciphertexts,
            aux_data: None,
        }
    }

    pub fn with_aux_data(
        ciphertexts: Vec<Ciphertext<E>>,
        aux_data: BTreeMap<String, String>,
    ) -> Self {
        Self {
            ciphertexts,
            aux_data: Some(aux_data),
        }
    }

    /// Number of ciphertext slots (the width W).
    pub fn width(&self) -> usize {
        self.ciphertexts.len()
    }
}

/// Encrypt an integer message in `[0, message_upper_bound)`.
pub fn encrypt<G: CyclicGroup>(
    group: &G,
    public_key: &G::Element,
    message: &BigUint,
) -> Result<Ciphertext<G::Element>, ElGamalError> {
    let r = random_unit_exponent(group);
    encrypt_with_coin(group, public_key, message, &r)
}

/// Encrypt with a caller-chosen randomness (used by tests and by
/// deterministic re-encryption paths).
pub fn encrypt_with_coin<G: CyclicGroup>(
    group: &G,
    public_key: &G::Element,
    message: &BigUint,
    coin: &BigUint,
) -> Result<Ciphertext<G::Element>, ElGamalError> {
    let encoded = group.encode(message)?;
    Ok(Ciphertext {
        x: group.pow_u(&group.generator(), coin),
        y: group.mul(&encoded, &group.pow_u(public_key, coin)),
    })
}

/// `decode(y · (x^sk)^{-1})`.
pub fn decrypt<G: CyclicGroup>(
    group: &G,
    secret_key: &BigUint,
    ciphertext: &Ciphertext<G::Element>,
) -> BigUint {
    let shared = group.pow_u(&ciphertext.x, secret_key);
    group.decode(&group.mul(&ciphertext.y, &group.inverse(&shared)))
}

/// Multiply in an encryption of the identity with fresh randomness `r`.
pub fn re_randomize<G: CyclicGroup>(
    group: &G,
    ciphertext: &Ciphertext<G::Element>,
    public_key: &G::Element,
    coin: &BigUint,
) -> Ciphertext<G::Element> {
    Ciphertext {
        x: group.mul(&ciphertext.x, &group.pow_u(&group.generator(), coin)),
        y: group.mul(&ciphertext.y, &group.pow_u(public_key, coin)),
    }
}

/// Chunk block size in bytes for a group of order `q`.
pub fn block_size<G: CyclicGroup>(group: &G) -> Result<usize, ElGamalError> {
    let size = ((group.order().bits() - 1) / 8) as usize;
    if size < 3 {
        return Err(ElGamalError::UnsupportedGroup);
    }
    Ok(size)
}

/// Split a byte message into non-negative block integers: a two-byte
/// big-endian pad length, the message, then that many zero bytes, cut
/// into `block_size` pieces.
pub fn message_to_blocks<G: CyclicGroup>(
    group: &G,
    message: &[u8],
) -> Result<Vec<BigUint>, ElGamalError> {
    let size = block_size(group)?;
    let pad = (size - (message.len() + 2) % size) % size;
    let mut framed = Vec::with_capacity(message.len() + 2 + pad);
    framed.extend_from_slice(&(pad as u16).to_be_bytes());
    framed.extend_from_slice(message);
    framed.resize(message.len() + 2 + pad, 0);
    Ok(framed
        .chunks(size)
        .map(BigUint::from_bytes_be)
        .collect())
}

/// Inverse of [`message_to_blocks`]: strict about block width and about
/// the zero pad.
pub fn blocks_to_message<G: CyclicGroup>(
    group: &G,
    blocks: &[BigUint],
) -> Result<Vec<u8>, ElGamalError> {
    let size = block_size(group)?;
    let mut framed = Vec::with_capacity(blocks.len() * size);
    for block in blocks {
        let mut bytes = block.to_bytes_be();
        // a leading sign byte may appear on integers that filled the block
        if bytes.len() == size + 1 && bytes[0] == 0 {
            bytes.remove(0);
        }
        if bytes.len() > size {
            return Err(ElGamalError::OversizedBlock {
                got: bytes.len(),
                expected: size,
            });
        }
        framed.extend_from_slice(&vec![0u8; size - bytes.len()]);
        framed.extend_from_slice(&bytes);
    }
    if framed.len() < 2 {
        return Err(ElGamalError::TruncatedMessage);
    }
    let pad = u16::from_be_bytes([framed[0], framed[1]]) as usize;
    if framed.len() < 2 + pad {
        return Err(ElGamalError::TruncatedMessage);
    }
    let body_end = framed.len() - pad;
    if framed[body_end..].iter().any(|b| *b != 0) {
        return Err(ElGamalError::CorruptPad);
    }
    Ok(framed[2..body_end].to_vec())
}

/// Encrypt an arbitrary byte message as a multi-ciphertext of chunked
/// blocks.
pub fn encrypt_bytes<G: CyclicGroup>(
    group: &G,
    public_key: &G::Element,
    message: &[u8],
) -> Result<MultiCiphertext<G::Element>, ElGamalError> {
    let blocks = message_to_blocks(group, message)?;
    tracing::debug!(
        target: LOG_TARGET,
        blocks = blocks.len(),
        bytes = message.len(),
        "encrypting chunked message"
    );
    let ciphertexts = blocks
        .iter()
        .map(|block| encrypt(group, public_key, block))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(MultiCiphertext::new(ciphertexts))
}

/// Decrypt a chunked multi-ciphertext back into its byte message.
pub fn decrypt_bytes<G: CyclicGroup>(
    group: &G,
    secret_key: &BigUint,
    multi: &MultiCiphertext<G::Element>,
) -> Result<Vec<u8>, ElGamalError> {
    if multi.ciphertexts.is_empty() {
        return Err(ElGamalError::EmptyMultiCiphertext);
    }
    let blocks: Vec<BigUint> = multi
        .ciphertexts
        .iter()
        .map(|c| decrypt(group, secret_key, c))
        .collect();
    blocks_to_message(group, &blocks)
}
