//! ECIES transport over secp256k1.
//!
//! `k = SHA-256(Y || Z || pk)` with ephemeral `Y = g^y` and shared
//! secret `Z = pk^y`; the body is AES-256-GCM with a deterministic zero
//! IV under the per-message key, laid out as `Y_bytes(33) || body`.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use num_bigint::BigUint;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::bytes::ByteString;
use crate::elgamal::random_unit_exponent;
use crate::group::{CurvePoint, CyclicGroup, GroupElement, GroupError, SecpGroup};

const LOG_TARGET: &str = "verivote::ecies";

/// Compressed SEC1 point length; the ciphertext must at least carry `Y`.
const POINT_LEN: usize = 33;
const ZERO_NONCE: [u8; 12] = [0u8; 12];

#[derive(Error, Debug, PartialEq, Eq)]
pub enum EciesError {
    #[error("ciphertext of {0} bytes is too short to contain the ephemeral key")]
    TooShort(usize),
    #[error(transparent)]
    InvalidPoint(#[from] GroupError),
    #[error("authenticated decryption failed")]
    Aead,
}

fn derive_key(ephemeral: &CurvePoint, shared: &CurvePoint, public_key: &CurvePoint) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(ephemeral.to_bytes());
    hasher.update(shared.to_bytes());
    hasher.update(public_key.to_bytes());
    hasher.finalize().into()
}

/// Encrypt `plaintext` to the holder of `public_key`.
pub fn encrypt(public_key: &CurvePoint, plaintext: &[u8]) -> Result<ByteString, EciesError> {
    let group = SecpGroup::new();
    let ephemeral_secret = random_unit_exponent(&group);
    let ephemeral = group.pow_u(&group.generator(), &ephemeral_secret);
    let shared = group.pow_u(public_key, &ephemeral_secret);

    let key = derive_key(&ephemeral, &shared, public_key);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));
    let body = cipher
        .encrypt(Nonce::from_slice(&ZERO_NONCE), plaintext)
        .map_err(|_| EciesError::Aead)?;

    let mut out = ephemeral.to_bytes();
    out.extend_from_slice(&body);
    tracing::debug!(target: LOG_TARGET, bytes = plaintext.len(), "ecies encrypt");
    Ok(ByteString::new(out))
}

/// Decrypt a `Y || body` ciphertext with the receiver's secret key.
pub fn decrypt(secret_key: &BigUint, ciphertext: &ByteString) -> Result<Vec<u8>, EciesError> {
    if ciphertext.len() < POINT_LEN {
        return Err(EciesError::TooShort(ciphertext.len()));
    }
    let group = SecpGroup::new();
    let ephemeral = group.element_from_bytes(&ciphertext.as_slice()[..POINT_LEN])?;
    let shared = group.pow_u(&ephemeral, secret_key);
    let public_key = group.pow_u(&group.generator(), secret_key);

    let key = derive_key(&ephemeral, &shared, &public_key);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));
    cipher
        .decrypt(
            Nonce::from_slice(&ZERO_NONCE),
            &ciphertext.as_slice()[POINT_LEN..],
        )
        .map_err(|_| EciesError::Aead)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elgamal::KeyPair;

    #[test]
    fn encrypt_decrypt_round_trip() {
        let group = SecpGroup::new();
        let keys = KeyPair::generate(&group);
        for message in [b"".as_slice(), b"x".as_slice(), b"a longer transport payload"] {
            let ciphertext = encrypt(&keys.public_key, message).unwrap();
            assert_eq!(decrypt(&keys.secret_key, &ciphertext).unwrap(), message);
        }
    }

    #[test]
    fn layout_is_ephemeral_key_then_body() {
        let group = SecpGroup::new();
        let keys = KeyPair::generate(&group);
        let ciphertext = encrypt(&keys.public_key, b"payload").unwrap();
        // 33-byte point, then AEAD body (plaintext + 16-byte tag)
        assert_eq!(ciphertext.len(), 33 + 7 + 16);
        let tag = ciphertext.as_slice()[0];
        assert!(tag == 0x02 || tag == 0x03);
    }

    #[test]
    fn short_and_corrupt_ciphertexts_are_rejected() {
        let group = SecpGroup::new();
        let keys = KeyPair::generate(&group);
        assert_eq!(
            decrypt(&keys.secret_key, &ByteString::new(vec![0u8; 10])),
            Err(EciesError::TooShort(10))
        );

        let ciphertext = encrypt(&keys.public_key, b"payload").unwrap();
        let mut corrupt = ciphertext.as_slice().to_vec();
        let last = corrupt.len() - 1;
        corrupt[last] ^= 1;
        assert_eq!(
            decrypt(&keys.secret_key, &ByteString::new(corrupt)),
            Err(EciesError::Aead)
        );
    }

    #[test]
    fn wrong_key_fails_authentication() {
        let group = SecpGroup::new();
        let keys = KeyPair::generate(&group);
        let other = KeyPair::generate(&group);
        let ciphertext = encrypt(&keys.public_key, b"payload").unwrap();
        assert_eq!(
            decrypt(&other.secret_key, &ciphertext),
            Err(EciesError::Aead)
        );
    }
}
