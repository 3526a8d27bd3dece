//! secp256k1 instantiation of the group abstraction.
//!
//! Point arithmetic is delegated to `k256`; this module contributes the
//! Koblitz message embedding (k = 80), the canonical 33-byte compressed
//! SEC1 serialization, and seeded derivation of independent points.

use std::fmt;

use k256::elliptic_curve::point::DecompressPoint;
use k256::elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint};
use k256::elliptic_curve::subtle::Choice;
use k256::elliptic_curve::PrimeField;
use k256::{AffinePoint, EncodedPoint, FieldBytes, ProjectivePoint, Scalar};
use num_bigint::{BigInt, BigUint};
use num_traits::{One, Zero};
use once_cell::sync::Lazy;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::{element_seed, normalize_exponent, CyclicGroup, GroupElement, GroupError};
use crate::kdf::NumbersFromSeed;

const LOG_TARGET: &str = "verivote::group::secp256k1";

/// Koblitz embedding width: up to `k` candidate x-coordinates per message.
const KOBLITZ_K: u32 = 80;

/// Field modulus p.
static FIELD_MODULUS: Lazy<BigUint> = Lazy::new(|| {
    BigUint::parse_bytes(
        b"fffffffffffffffffffffffffffffffffffffffffffffffffffffffefffffc2f",
        16,
    )
    .expect("secp256k1 field modulus hex is valid")
});

/// Group order n.
static GROUP_ORDER: Lazy<BigUint> = Lazy::new(|| {
    BigUint::parse_bytes(
        b"fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364141",
        16,
    )
    .expect("secp256k1 group order hex is valid")
});

/// `⌊p / 80⌋`, the exclusive bound of the Koblitz-encodable range.
static MESSAGE_BOUND: Lazy<BigUint> = Lazy::new(|| &*FIELD_MODULUS / KOBLITZ_K);

/// A secp256k1 point in affine form.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct CurvePoint(pub(crate) AffinePoint);

impl CurvePoint {
    pub fn as_affine(&self) -> &AffinePoint {
        &self.0
    }

    fn x_coordinate(&self) -> BigUint {
        match self.0.to_encoded_point(false).x() {
            Some(x) => BigUint::from_bytes_be(x),
            None => BigUint::zero(),
        }
    }
}

impl fmt::Debug for CurvePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CurvePoint({})", hex::encode(self.to_bytes()))
    }
}

impl GroupElement for CurvePoint {
    fn to_bytes(&self) -> Vec<u8> {
        self.0.to_encoded_point(true).as_bytes().to_vec()
    }
}

impl Serialize for CurvePoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.to_bytes()))
    }
}

impl<'de> Deserialize<'de> for CurvePoint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        parse_point_bytes(&bytes).map_err(serde::de::Error::custom)
    }
}

fn parse_point_bytes(bytes: &[u8]) -> Result<CurvePoint, GroupError> {
    let encoded = EncodedPoint::from_bytes(bytes)
        .map_err(|e| GroupError::InvalidEncoding(e.to_string()))?;
    if !encoded.is_compressed() && !encoded.is_identity() {
        return Err(GroupError::InvalidEncoding(
            "expected compressed SEC1 encoding".into(),
        ));
    }
    Option::<AffinePoint>::from(AffinePoint::from_encoded_point(&encoded))
        .map(CurvePoint)
        .ok_or(GroupError::NotAGroupElement)
}

fn field_bytes(value: &BigUint) -> FieldBytes {
    let raw = value.to_bytes_be();
    let mut buf = [0u8; 32];
    buf[32 - raw.len()..].copy_from_slice(&raw);
    FieldBytes::from(buf)
}

/// Decompress the point with the given x-coordinate (`x < p`) and y
/// parity, if it exists on the curve.
fn lift_x(x: &BigUint, y_is_odd: bool) -> Option<AffinePoint> {
    Option::from(AffinePoint::decompress(
        &field_bytes(x),
        Choice::from(y_is_odd as u8),
    ))
}

fn scalar_from_exponent(exponent: &BigInt) -> Scalar {
    let normalized = normalize_exponent(exponent, &GROUP_ORDER);
    Option::from(Scalar::from_repr(field_bytes(&normalized)))
        .expect("a value reduced mod n is a canonical scalar")
}

/// The secp256k1 group.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct SecpGroup;

impl SecpGroup {
    pub fn new() -> Self {
        Self
    }

    pub fn field_modulus(&self) -> &BigUint {
        &FIELD_MODULUS
    }
}

impl fmt::Debug for SecpGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecpGroup")
    }
}

impl CyclicGroup for SecpGroup {
    type Element = CurvePoint;

    fn order(&self) -> &BigUint {
        &GROUP_ORDER
    }

    fn identity(&self) -> CurvePoint {
        CurvePoint(AffinePoint::IDENTITY)
    }

    fn generator(&self) -> CurvePoint {
        CurvePoint(AffinePoint::GENERATOR)
    }

    fn message_upper_bound(&self) -> &BigUint {
        &MESSAGE_BOUND
    }

    fn mul(&self, a: &CurvePoint, b: &CurvePoint) -> CurvePoint {
        CurvePoint((ProjectivePoint::from(a.0) + ProjectivePoint::from(b.0)).to_affine())
    }

    fn pow(&self, base: &CurvePoint, exponent: &BigInt) -> CurvePoint {
        let scalar = scalar_from_exponent(exponent);
        CurvePoint((ProjectivePoint::from(base.0) * scalar).to_affine())
    }

    fn inverse(&self, a: &CurvePoint) -> CurvePoint {
        CurvePoint((-ProjectivePoint::from(a.0)).to_affine())
    }

    fn encode(&self, message: &BigUint) -> Result<CurvePoint, GroupError> {
        if message >= &*MESSAGE_BOUND {
            return Err(GroupError::MessageOutOfRange(message.to_string()));
        }
        let scaled = message * KOBLITZ_K;
        for i in 1..=KOBLITZ_K {
            let x = (&scaled + i) % &*FIELD_MODULUS;
            if let Some(point) = lift_x(&x, false) {
                return Ok(CurvePoint(point));
            }
        }
        // probability ~2^-80 per message for a random curve
        Err(GroupError::UnencodableMessage(message.to_string()))
    }

    fn decode(&self, element: &CurvePoint) -> BigUint {
        let x = element.x_coordinate();
        if x.is_zero() {
            return BigUint::zero();
        }
        (x - BigUint::one()) / KOBLITZ_K
    }

    fn element_from_bytes(&self, bytes: &[u8]) -> Result<CurvePoint, GroupError> {
        parse_point_bytes(bytes)
    }

    fn is_valid_element(&self, _candidate: &CurvePoint) -> bool {
        // the affine representation is on-curve by construction; wire
        // inputs are filtered by element_from_bytes
        true
    }

    fn elements_from_seed(&self, count: usize, seed: &[u8]) -> Vec<CurvePoint> {
        let two_p = &*FIELD_MODULUS * 2u8;
        (0..count)
            .map(|index| {
                let point = NumbersFromSeed::new(two_p.clone(), &element_seed(seed, index))
                    .find_map(|w| {
                        let x = &w % &*FIELD_MODULUS;
                        let flip = w >= *FIELD_MODULUS;
                        lift_x(&x, flip).filter(|p| p != &AffinePoint::IDENTITY)
                    })
                    .expect("the candidate stream is infinite and half of all x lift");
                tracing::debug!(target: LOG_TARGET, index, "derived independent point from seed");
                CurvePoint(point)
            })
            .collect()
    }
}
