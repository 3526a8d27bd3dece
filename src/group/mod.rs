//! Abstract cyclic group of prime order.
//!
//! Every algorithm in this crate (ElGamal, the sigma proofs, the
//! threshold key machinery, the shuffle) is generic over
//! [`CyclicGroup`]. The group is a pure capability set carried by value;
//! the two concrete instantiations ([`schnorr::SchnorrGroup`] and
//! [`secp256k1::SecpGroup`]) are internally disjoint modules.

pub mod schnorr;
pub mod secp256k1;

use std::fmt::Debug;

use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use thiserror::Error;

pub use schnorr::{SchnorrElement, SchnorrGroup};
pub use secp256k1::{CurvePoint, SecpGroup};

/// Seed tag for per-index generator derivation: the ASCII bytes "ggen".
pub const GENERATOR_SEED_TAG: [u8; 4] = *b"ggen";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum GroupError {
    #[error("message {0} is outside the encodable range")]
    MessageOutOfRange(String),
    #[error("no curve point found for message {0}")]
    UnencodableMessage(String),
    #[error("invalid group element encoding: {0}")]
    InvalidEncoding(String),
    #[error("value is not a member of the group")]
    NotAGroupElement,
    #[error("invalid group parameters: {0}")]
    InvalidParameters(String),
}

/// An opaque group element. Equality is structural algebraic equality;
/// the canonical byte serialization is the one that feeds Fiat-Shamir.
pub trait GroupElement:
    Clone + PartialEq + Eq + Debug + Send + Sync + serde::Serialize + serde::de::DeserializeOwned
{
    /// Canonical byte serialization.
    fn to_bytes(&self) -> Vec<u8>;
}

/// Cyclic group of prime order `q` with fixed generator `g`.
pub trait CyclicGroup: Clone + Debug + Send + Sync {
    type Element: GroupElement;

    /// The prime order `q`.
    fn order(&self) -> &BigUint;

    fn identity(&self) -> Self::Element;

    fn generator(&self) -> Self::Element;

    /// Exclusive upper bound of the integer range `encode` accepts.
    fn message_upper_bound(&self) -> &BigUint;

    fn mul(&self, a: &Self::Element, b: &Self::Element) -> Self::Element;

    /// `base^exponent`, normalizing the exponent modulo `q` first
    /// (negative exponents are allowed).
    fn pow(&self, base: &Self::Element, exponent: &BigInt) -> Self::Element;

    fn inverse(&self, a: &Self::Element) -> Self::Element;

    /// Injective map of `[0, message_upper_bound)` into the group.
    fn encode(&self, message: &BigUint) -> Result<Self::Element, GroupError>;

    /// Left inverse of `encode`.
    fn decode(&self, element: &Self::Element) -> BigUint;

    /// Parse canonical bytes; fails on anything that is not a valid
    /// group element.
    fn element_from_bytes(&self, bytes: &[u8]) -> Result<Self::Element, GroupError>;

    fn is_valid_element(&self, candidate: &Self::Element) -> bool;

    /// `count` pseudo-random, reproducible, independent generators. The
    /// element at `index` is derived from `seed || "ggen" || BE32(index)`.
    fn elements_from_seed(&self, count: usize, seed: &[u8]) -> Vec<Self::Element>;

    /// Convenience power with a non-negative exponent.
    fn pow_u(&self, base: &Self::Element, exponent: &BigUint) -> Self::Element {
        self.pow(base, &BigInt::from(exponent.clone()))
    }

    /// Product over an iterator of elements.
    fn product<'a, I>(&self, elements: I) -> Self::Element
    where
        Self::Element: 'a,
        I: IntoIterator<Item = &'a Self::Element>,
    {
        elements
            .into_iter()
            .fold(self.identity(), |acc, e| self.mul(&acc, e))
    }
}

/// Normalize a possibly negative exponent into `[0, q)`.
pub(crate) fn normalize_exponent(exponent: &BigInt, order: &BigUint) -> BigUint {
    let modulus = BigInt::from(order.clone());
    exponent
        .mod_floor(&modulus)
        .to_biguint()
        .expect("floor-mod of a positive modulus is non-negative")
}

/// Per-index seed for `elements_from_seed`.
pub(crate) fn element_seed(seed: &[u8], index: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(seed.len() + 8);
    out.extend_from_slice(seed);
    out.extend_from_slice(&GENERATOR_SEED_TAG);
    out.extend_from_slice(&(index as u32).to_be_bytes());
    out
}
