//! Canonical transcript digesting for Fiat-Shamir challenges.
//!
//! A [`Transcript`] wraps an append-only SHA-512 state. Cloning takes a
//! snapshot of the partial digest, so branch transcripts (the shuffle
//! proof derives its whole challenge vector and its final challenge from
//! one shared prefix) never mutate the parent.

use num_bigint::BigUint;
use sha2::{Digest, Sha512};

use crate::bytes::ByteString;
use crate::kdf::number_from_seed;

/// Minimal big-endian two's-complement encoding of a non-negative
/// integer: a leading zero byte is present exactly when the high bit of
/// the magnitude would otherwise read as a sign.
pub fn twos_complement_bytes(value: &BigUint) -> Vec<u8> {
    let mut bytes = value.to_bytes_be();
    if bytes[0] & 0x80 != 0 {
        bytes.insert(0, 0);
    }
    bytes
}

#[derive(Clone, Default)]
pub struct Transcript {
    state: Sha512,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append_raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.state.update(bytes);
        self
    }

    /// Length-prefixed raw bytes: `BE32(len) || bytes`.
    pub fn append_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.state.update((bytes.len() as u32).to_be_bytes());
        self.state.update(bytes);
        self
    }

    pub fn append_byte_string(&mut self, bs: &ByteString) -> &mut Self {
        self.append_bytes(bs.as_slice())
    }

    pub fn append_utf8(&mut self, s: &str) -> &mut Self {
        self.append_bytes(s.as_bytes())
    }

    pub fn append_i32(&mut self, value: i32) -> &mut Self {
        self.state.update(value.to_be_bytes());
        self
    }

    pub fn append_i64(&mut self, value: i64) -> &mut Self {
        self.state.update(value.to_be_bytes());
        self
    }

    /// Big integer as `BE32(len) || minimal two's-complement bytes`.
    pub fn append_uint(&mut self, value: &BigUint) -> &mut Self {
        let bytes = twos_complement_bytes(value);
        self.append_bytes(&bytes)
    }

    /// Finalize a branch of the transcript.
    pub fn digest(&self) -> sha2::digest::Output<Sha512> {
        self.state.clone().finalize()
    }

    /// Derive a pseudo-uniform challenge in `[0, bound)` from the current
    /// state. The parent transcript is left untouched.
    pub fn challenge(&self, bound: &BigUint) -> BigUint {
        number_from_seed(bound, &self.digest())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_complement_encoding_is_minimal() {
        assert_eq!(twos_complement_bytes(&BigUint::from(0u8)), vec![0]);
        assert_eq!(twos_complement_bytes(&BigUint::from(1u8)), vec![1]);
        assert_eq!(twos_complement_bytes(&BigUint::from(127u8)), vec![127]);
        // high bit set: sign byte required
        assert_eq!(twos_complement_bytes(&BigUint::from(128u8)), vec![0, 128]);
        assert_eq!(twos_complement_bytes(&BigUint::from(0x8000u32)), vec![0, 0x80, 0]);
    }

    #[test]
    fn cloning_branches_without_mutating_the_parent() {
        let mut base = Transcript::new();
        base.append_utf8("prefix");
        let before = base.digest();

        let mut branch = base.clone();
        branch.append_i32(42);
        assert_ne!(branch.digest(), before);
        assert_eq!(base.digest(), before);

        // two identical branches agree
        let mut branch2 = base.clone();
        branch2.append_i32(42);
        assert_eq!(branch.digest(), branch2.digest());
    }

    #[test]
    fn challenge_is_below_bound_and_deterministic() {
        let bound = BigUint::from(1u32) << 128;
        let mut t = Transcript::new();
        t.append_uint(&BigUint::from(7u8)).append_utf8("x");
        let c1 = t.challenge(&bound);
        let c2 = t.challenge(&bound);
        assert_eq!(c1, c2);
        assert!(c1 < bound);
    }

    #[test]
    fn framing_distinguishes_adjacent_appends() {
        let mut a = Transcript::new();
        a.append_bytes(b"ab").append_bytes(b"c");
        let mut b = Transcript::new();
        b.append_bytes(b"a").append_bytes(b"bc");
        assert_ne!(a.digest(), b.digest());
    }
}
