//! Cryptographic core of a verifiable e-voting system.
//!
//! The crate provides ElGamal encryption over an abstract prime-order
//! cyclic group with two instantiations (a safe-prime Schnorr group and
//! secp256k1), Fiat-Shamir sigma proofs (dlog, eqlog, verifiable
//! decryption), Pedersen single and vector commitments, verifiable
//! threshold key generation and decryption via Shamir/Feldman sharing,
//! and a verifiable re-encryption mix-net with an HLKD17 proof of
//! correct shuffle.

pub mod bytes;
pub mod commitment;
pub mod crypto_serde;
pub mod ecies;
pub mod elgamal;
pub mod group;
pub mod kdf;
pub mod proofs;
pub mod rng;
pub mod shuffle;
pub mod threshold;
pub mod transcript;
pub mod verify;

pub use bytes::{ByteBuilder, ByteReader, ByteString};
pub use commitment::{MultiCommitmentKey, PedersenScheme};
pub use elgamal::{Ciphertext, KeyPair, MultiCiphertext};
pub use group::{CurvePoint, CyclicGroup, GroupElement, SchnorrElement, SchnorrGroup, SecpGroup};
pub use proofs::{DlogProof, EqlogProof};
pub use shuffle::{Permutation, ShuffleProof};
pub use threshold::{DecryptionShare, DkgTeller, PrivateKeyShare, ThresholdConfig};
pub use transcript::Transcript;
pub use verify::VerificationResult;
