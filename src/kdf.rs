//! NIST SP 800-108 counter-mode KDF over HMAC-SHA-512, and derivation
//! of pseudo-uniform integers in a given range from a seed.

use hmac::{Hmac, Mac};
use num_bigint::BigUint;
use sha2::{Digest, Sha512};

type HmacSha512 = Hmac<Sha512>;

pub const GENERATOR_LABEL: &[u8] = b"generator";
pub const POLYAS_CONTEXT: &[u8] = b"Polyas";

/// Derives exactly `length` bytes from `key` by concatenating
/// `HMAC-SHA-512(key, BE32(i) || label || 0x00 || context || BE32(length))`
/// for block index `i = 0, 1, ...`.
pub fn kdf(key: &[u8], label: &[u8], context: &[u8], length: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(length);
    let mut block_index: u32 = 0;
    while out.len() < length {
        let mut mac =
            HmacSha512::new_from_slice(key).expect("HMAC-SHA-512 accepts keys of any length");
        mac.update(&block_index.to_be_bytes());
        mac.update(label);
        mac.update(&[0u8]);
        mac.update(context);
        mac.update(&(length as u32).to_be_bytes());
        out.extend_from_slice(&mac.finalize().into_bytes());
        block_index += 1;
    }
    out.truncate(length);
    out
}

/// Infinite sequence of pseudo-uniform integers in `[0, m)` derived from a
/// seed. Candidate `c = 1, 2, ...` runs the KDF keyed by
/// `seed || BE32(c)` with label "generator" and context "Polyas", clears
/// the excess high bits of the leading byte, and is rejected unless `< m`.
pub struct NumbersFromSeed {
    bound: BigUint,
    seed: Vec<u8>,
    bit_length: u64,
    byte_length: usize,
    counter: u32,
}

impl NumbersFromSeed {
    pub fn new(bound: BigUint, seed: &[u8]) -> Self {
        let bit_length = bound.bits();
        Self {
            bound,
            seed: seed.to_vec(),
            bit_length,
            byte_length: bit_length.div_ceil(8) as usize,
            counter: 0,
        }
    }
}

impl Iterator for NumbersFromSeed {
    type Item = BigUint;

    fn next(&mut self) -> Option<BigUint> {
        loop {
            self.counter += 1;
            let mut key = self.seed.clone();
            key.extend_from_slice(&self.counter.to_be_bytes());
            let mut block = kdf(&key, GENERATOR_LABEL, POLYAS_CONTEXT, self.byte_length);
            let excess = 8 * self.byte_length as u64 - self.bit_length;
            if excess > 0 {
                block[0] &= 0xFFu8 >> excess;
            }
            let candidate = BigUint::from_bytes_be(&block);
            if candidate < self.bound {
                return Some(candidate);
            }
        }
    }
}

/// First pseudo-uniform integer in `[0, m)` derived from `seed`.
pub fn number_from_seed(bound: &BigUint, seed: &[u8]) -> BigUint {
    NumbersFromSeed::new(bound.clone(), seed)
        .next()
        .expect("sequence is infinite")
}

/// `number_from_seed` over the SHA-512 digest of `data`. This is the
/// challenge map used by every Fiat-Shamir transcript in the crate.
pub fn uniform_hash(bound: &BigUint, data: &[u8]) -> BigUint {
    number_from_seed(bound, &Sha512::digest(data))
}
