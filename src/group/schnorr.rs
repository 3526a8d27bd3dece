//! Prime-order subgroup of quadratic residues modulo a safe prime
//! `p = 2q + 1`, with `g` a residue generating the order-`q` subgroup.
//!
//! Elements are integers in `[1, p)`; canonical bytes are the minimal
//! big-endian two's-complement encoding. The predefined 1536/2048/3072
//! bit groups use the RFC 3526 moduli (`p ≡ 7 (mod 8)`, so `g = 2` is a
//! quadratic residue); the 512-bit test-strength group uses the largest
//! safe prime below `2^512`.

use std::fmt;

use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use num_traits::{One, Zero};
use once_cell::sync::Lazy;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::{element_seed, normalize_exponent, CyclicGroup, GroupElement, GroupError};
use crate::kdf::NumbersFromSeed;
use crate::transcript::twos_complement_bytes;

const LOG_TARGET: &str = "verivote::group::schnorr";

/// An integer in `[1, p)`. Only values produced by its group are
/// guaranteed to be subgroup members; wire inputs must pass
/// [`CyclicGroup::element_from_bytes`] or [`CyclicGroup::is_valid_element`].
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SchnorrElement(pub BigUint);

impl SchnorrElement {
    pub fn value(&self) -> &BigUint {
        &self.0
    }
}

impl fmt::Debug for SchnorrElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SchnorrElement({})", self.0)
    }
}

impl GroupElement for SchnorrElement {
    fn to_bytes(&self) -> Vec<u8> {
        twos_complement_bytes(&self.0)
    }
}

impl Serialize for SchnorrElement {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.to_bytes()))
    }
}

impl<'de> Deserialize<'de> for SchnorrElement {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        parse_element_bytes(&bytes).map_err(serde::de::Error::custom)
    }
}

fn parse_element_bytes(bytes: &[u8]) -> Result<SchnorrElement, GroupError> {
    if bytes.is_empty() {
        return Err(GroupError::InvalidEncoding("empty element bytes".into()));
    }
    if bytes[0] & 0x80 != 0 {
        // two's complement: a set high bit reads as a negative number
        return Err(GroupError::InvalidEncoding(
            "negative two's-complement element".into(),
        ));
    }
    Ok(SchnorrElement(BigUint::from_bytes_be(bytes)))
}

#[derive(Clone, PartialEq, Eq)]
pub struct SchnorrGroup {
    modulus: BigUint,
    order: BigUint,
    generator: BigUint,
}

impl fmt::Debug for SchnorrGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SchnorrGroup({} bits)", self.modulus.bits())
    }
}

impl SchnorrGroup {
    /// Build a group from a safe prime `p = 2q + 1` and a generator of
    /// the order-`q` subgroup. Primality of `p` and `q` is the caller's
    /// contract; the algebraic relations are checked.
    pub fn new(modulus: BigUint, generator: BigUint) -> Result<Self, GroupError> {
        if modulus.is_even() || modulus <= BigUint::from(5u8) {
            return Err(GroupError::InvalidParameters(
                "modulus must be an odd prime > 5".into(),
            ));
        }
        let order = (&modulus - 1u8) >> 1;
        if generator <= BigUint::one() || generator >= modulus {
            return Err(GroupError::InvalidParameters(
                "generator must lie in [2, p)".into(),
            ));
        }
        if generator.modpow(&order, &modulus) != BigUint::one() {
            return Err(GroupError::InvalidParameters(
                "generator is not in the order-q subgroup".into(),
            ));
        }
        Ok(Self {
            modulus,
            order,
            generator,
        })
    }

    pub fn modulus(&self) -> &BigUint {
        &self.modulus
    }

    /// Predefined 512-bit test-strength group.
    pub fn group_512() -> Self {
        PREDEFINED_512.clone()
    }

    /// Predefined RFC 3526 1536-bit group.
    pub fn group_1536() -> Self {
        PREDEFINED_1536.clone()
    }

    /// Predefined RFC 3526 2048-bit group.
    pub fn group_2048() -> Self {
        PREDEFINED_2048.clone()
    }

    /// Predefined RFC 3526 3072-bit group.
    pub fn group_3072() -> Self {
        PREDEFINED_3072.clone()
    }
}

impl CyclicGroup for SchnorrGroup {
    type Element = SchnorrElement;

    fn order(&self) -> &BigUint {
        &self.order
    }

    fn identity(&self) -> SchnorrElement {
        SchnorrElement(BigUint::one())
    }

    fn generator(&self) -> SchnorrElement {
        SchnorrElement(self.generator.clone())
    }

    fn message_upper_bound(&self) -> &BigUint {
        &self.order
    }

    fn mul(&self, a: &SchnorrElement, b: &SchnorrElement) -> SchnorrElement {
        SchnorrElement(&a.0 * &b.0 % &self.modulus)
    }

    fn pow(&self, base: &SchnorrElement, exponent: &BigInt) -> SchnorrElement {
        let normalized = normalize_exponent(exponent, &self.order);
        SchnorrElement(base.0.modpow(&normalized, &self.modulus))
    }

    fn inverse(&self, a: &SchnorrElement) -> SchnorrElement {
        // a^(p-2) = a^(-1) mod p for prime p
        let exponent = &self.modulus - 2u8;
        SchnorrElement(a.0.modpow(&exponent, &self.modulus))
    }

    fn encode(&self, message: &BigUint) -> Result<SchnorrElement, GroupError> {
        if message >= &self.order {
            return Err(GroupError::MessageOutOfRange(message.to_string()));
        }
        let x = message + 1u8;
        // exactly one of x, p - x is a quadratic residue
        if x.modpow(&self.order, &self.modulus) == BigUint::one() {
            Ok(SchnorrElement(x))
        } else {
            Ok(SchnorrElement(&self.modulus - x))
        }
    }

    fn decode(&self, element: &SchnorrElement) -> BigUint {
        if element.0 <= self.order {
            &element.0 - 1u8
        } else {
            &self.modulus - &element.0 - 1u8
        }
    }

    fn element_from_bytes(&self, bytes: &[u8]) -> Result<SchnorrElement, GroupError> {
        let element = parse_element_bytes(bytes)?;
        if !self.is_valid_element(&element) {
            return Err(GroupError::NotAGroupElement);
        }
        Ok(element)
    }

    fn is_valid_element(&self, candidate: &SchnorrElement) -> bool {
        !candidate.0.is_zero()
            && candidate.0 < self.modulus
            && candidate.0.modpow(&self.order, &self.modulus) == BigUint::one()
    }

    fn elements_from_seed(&self, count: usize, seed: &[u8]) -> Vec<SchnorrElement> {
        let two = BigUint::from(2u8);
        (0..count)
            .map(|index| {
                let derived = NumbersFromSeed::new(self.modulus.clone(), &element_seed(seed, index))
                    .map(|w| w.modpow(&two, &self.modulus))
                    .find(|candidate| candidate >= &two)
                    .expect("squaring a uniform sequence yields residues >= 2");
                tracing::debug!(
                    target: LOG_TARGET,
                    index,
                    "derived independent generator from seed"
                );
                SchnorrElement(derived)
            })
            .collect()
    }
}

fn predefined(hex_modulus: &str) -> SchnorrGroup {
    let modulus =
        BigUint::parse_bytes(hex_modulus.as_bytes(), 16).expect("predefined modulus hex is valid");
    SchnorrGroup::new(modulus, BigUint::from(2u8)).expect("predefined group parameters are valid")
}

// Largest safe prime below 2^512 (p = 2^512 - 235937, p ≡ 7 mod 8).
static PREDEFINED_512: Lazy<SchnorrGroup> = Lazy::new(|| {
    let modulus = (BigUint::one() << 512) - BigUint::from(235937u32);
    SchnorrGroup::new(modulus, BigUint::from(2u8)).expect("512-bit group parameters are valid")
});

// RFC 3526, 1536-bit MODP group modulus.
static PREDEFINED_1536: Lazy<SchnorrGroup> = Lazy::new(|| {
    predefined(concat!(
        "ffffffffffffffffc90fdaa22168c234c4c6628b80dc1cd1",
        "29024e088a67cc74020bbea63b139b22514a08798e3404dd",
        "ef9519b3cd3a431b302b0a6df25f14374fe1356d6d51c245",
        "e485b576625e7ec6f44c42e9a637ed6b0bff5cb6f406b7ed",
        "ee386bfb5a899fa5ae9f24117c4b1fe649286651ece45b3d",
        "c2007cb8a163bf0598da48361c55d39a69163fa8fd24cf5f",
        "83655d23dca3ad961c62f356208552bb9ed529077096966d",
        "670c354e4abc9804f1746c08ca237327ffffffffffffffff",
    ))
});

// RFC 3526, 2048-bit MODP group modulus.
static PREDEFINED_2048: Lazy<SchnorrGroup> = Lazy::new(|| {
    predefined(concat!(
        "ffffffffffffffffc90fdaa22168c234c4c6628b80dc1cd1",
        "29024e088a67cc74020bbea63b139b22514a08798e3404dd",
        "ef9519b3cd3a431b302b0a6df25f14374fe1356d6d51c245",
        "e485b576625e7ec6f44c42e9a637ed6b0bff5cb6f406b7ed",
        "ee386bfb5a899fa5ae9f24117c4b1fe649286651ece45b3d",
        "c2007cb8a163bf0598da48361c55d39a69163fa8fd24cf5f",
        "83655d23dca3ad961c62f356208552bb9ed529077096966d",
        "670c354e4abc9804f1746c08ca18217c32905e462e36ce3b",
        "e39e772c180e86039b2783a2ec07a28fb5c55df06f4c52c9",
        "de2bcbf6955817183995497cea956ae515d2261898fa0510",
        "15728e5a8aacaa68ffffffffffffffff",
    ))
});

// RFC 3526, 3072-bit MODP group modulus.
static PREDEFINED_3072: Lazy<SchnorrGroup> = Lazy::new(|| {
    predefined(concat!(
        "ffffffffffffffffc90fdaa22168c234c4c6628b80dc1cd1",
        "29024e088a67cc74020bbea63b139b22514a08798e3404dd",
        "ef9519b3cd3a431b302b0a6df25f14374fe1356d6d51c245",
        "e485b576625e7ec6f44c42e9a637ed6b0bff5cb6f406b7ed",
        "ee386bfb5a899fa5ae9f24117c4b1fe649286651ece45b3d",
        "c2007cb8a163bf0598da48361c55d39a69163fa8fd24cf5f",
        "83655d23dca3ad961c62f356208552bb9ed529077096966d",
        "670c354e4abc9804f1746c08ca18217c32905e462e36ce3b",
        "e39e772c180e86039b2783a2ec07a28fb5c55df06f4c52c9",
        "de2bcbf6955817183995497cea956ae515d2261898fa0510",
        "15728e5a8aaac42dad33170d04507a33a85521abdf1cba64",
        "ecfb850458dbef0a8aea71575d060c7db3970f85a6e1e4c7",
        "abf5ae8cdb0933d71e8c94e04a25619dcee3d2261ad2ee6b",
        "f12ffa06d98a0864d87602733ec86a64521f2b18177b200c",
        "bbe117577a615d6c770988c0bad946e208e24fa074e5ab31",
        "43db5bfce0fd108e4b82d120a93ad2caffffffffffffffff",
    ))
});

/// A small safe-prime group for fast tests. Not cryptographically
/// meaningful.
#[cfg(test)]
pub(crate) fn test_group() -> SchnorrGroup {
    // p = 50147 = 2 * 25073 + 1, both prime; 4 is always a residue
    SchnorrGroup::new(BigUint::from(50147u32), BigUint::from(4u8)).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng;

    fn random_exponent(group: &SchnorrGroup) -> BigUint {
        rng::random_below(group.order())
    }

    #[test]
    fn group_laws_hold() {
        let group = test_group();
        let g = group.generator();
        let a = group.pow_u(&g, &random_exponent(&group));
        let b = group.pow_u(&g, &random_exponent(&group));
        let c = group.pow_u(&g, &random_exponent(&group));

        // commutativity and associativity
        assert_eq!(group.mul(&a, &b), group.mul(&b, &a));
        assert_eq!(
            group.mul(&group.mul(&a, &b), &c),
            group.mul(&a, &group.mul(&b, &c))
        );
        // identity and inverse
        assert_eq!(group.mul(&group.identity(), &a), a);
        assert_eq!(group.mul(&a, &group.inverse(&a)), group.identity());
        // g^q = 1
        assert_eq!(group.pow_u(&g, group.order()), group.identity());
    }

    #[test]
    fn exponent_laws_hold() {
        let group = test_group();
        let g = group.generator();
        let b = random_exponent(&group);
        let c = random_exponent(&group);
        // (g^b)^c = g^(b*c)
        assert_eq!(
            group.pow_u(&group.pow_u(&g, &b), &c),
            group.pow_u(&g, &(&b * &c))
        );
        // g^(b+c) = g^b * g^c
        assert_eq!(
            group.pow_u(&g, &(&b + &c)),
            group.mul(&group.pow_u(&g, &b), &group.pow_u(&g, &c))
        );
        // negative exponents normalize
        assert_eq!(
            group.pow(&g, &BigInt::from(-1)),
            group.inverse(&g)
        );
    }

    #[test]
    fn encode_decode_round_trip() {
        let group = test_group();
        for m in 0u32..200 {
            let message = BigUint::from(m);
            let element = group.encode(&message).unwrap();
            assert!(group.is_valid_element(&element), "encode must land in the subgroup");
            assert_eq!(group.decode(&element), message);
        }
        // boundary: largest encodable message
        let top = group.message_upper_bound() - 1u8;
        let element = group.encode(&top).unwrap();
        assert_eq!(group.decode(&element), top);
        // out of range fails
        assert!(group.encode(group.message_upper_bound()).is_err());
    }

    #[test]
    fn canonical_bytes_round_trip_and_reject_garbage() {
        let group = test_group();
        let e = group.pow_u(&group.generator(), &random_exponent(&group));
        let bytes = e.to_bytes();
        assert_eq!(group.element_from_bytes(&bytes).unwrap(), e);

        // 5 is a quadratic non-residue mod 50147: not in the subgroup
        assert_eq!(
            group.element_from_bytes(&[0x05]),
            Err(GroupError::NotAGroupElement)
        );
        // negative two's complement
        assert!(group.element_from_bytes(&[0x80]).is_err());
        // zero is not an element
        assert!(group.element_from_bytes(&[0x00]).is_err());
    }

    #[test]
    fn seeded_elements_are_deterministic_valid_and_distinct() {
        let group = test_group();
        let a = group.elements_from_seed(3, b"seed");
        let b = group.elements_from_seed(3, b"seed");
        assert_eq!(a, b);
        for e in &a {
            assert!(group.is_valid_element(e));
            assert!(e.0 >= BigUint::from(2u8));
        }
        let c = group.elements_from_seed(3, b"other-seed");
        assert_ne!(a, c);
    }

    #[test]
    fn predefined_groups_have_expected_shape() {
        for (group, bits) in [
            (SchnorrGroup::group_512(), 512),
            (SchnorrGroup::group_1536(), 1536),
            (SchnorrGroup::group_2048(), 2048),
            (SchnorrGroup::group_3072(), 3072),
        ] {
            assert_eq!(group.modulus().bits(), bits);
            assert_eq!(group.order().bits(), bits - 1);
            // g is in the subgroup and not the identity
            assert!(group.is_valid_element(&group.generator()));
            assert_ne!(group.generator(), group.identity());
            // g^q = 1 pins the subgroup order
            assert_eq!(
                group.pow_u(&group.generator(), group.order()),
                group.identity()
            );
        }
    }

    #[test]
    fn rejects_bad_parameters() {
        // even modulus
        assert!(SchnorrGroup::new(BigUint::from(50148u32), BigUint::from(4u8)).is_err());
        // 5 is a quadratic non-residue mod 50147, so it lies outside the subgroup
        assert!(SchnorrGroup::new(BigUint::from(50147u32), BigUint::from(5u8)).is_err());
    }

    #[test]
    fn serde_round_trip_as_hex() {
        let group = test_group();
        let e = group.encode(&BigUint::from(99u8)).unwrap();
        let json = serde_json::to_string(&e).unwrap();
        assert!(json.starts_with('"'));
        let back: SchnorrElement = serde_json::from_str(&json).unwrap();
        assert_eq!(back, e);
    }
}
