//! Non-interactive zero-knowledge proofs obtained from Sigma protocols
//! by Fiat-Shamir. All challenges are derived as
//! `uniform_hash(q, transcript)` over canonical transcripts of the
//! statement.

pub mod decryption;
pub mod dlog;
pub mod eqlog;

pub use decryption::{prove_decryption, verify_decryption, VerifiableDecryption};
pub use dlog::DlogProof;
pub use eqlog::EqlogProof;
