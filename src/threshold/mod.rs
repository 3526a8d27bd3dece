//! Verifiable threshold key generation and decryption based on
//! Shamir/Feldman secret sharing.

pub mod decryption;
pub mod dkg;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use decryption::{
    combine_decryption_shares, combine_multi_decryption_shares, create_decryption_share,
    create_multi_decryption_share, lagrange_coefficient, verify_decryption_share,
    verify_multi_decryption_share, DecryptionShare, MultiDecryptionShare,
};
pub use dkg::{
    combined_public_key, public_key_share, DkgError, DkgTeller, KeyShareRecord, Polynomial,
    PrivateKeyShare,
};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ThresholdError {
    #[error("invalid threshold configuration: t={threshold}, n={tellers}")]
    InvalidConfig { threshold: usize, tellers: usize },
    #[error("need at least {required} decryption shares, got {got}")]
    NotEnoughShares { required: usize, got: usize },
    #[error("duplicate share index {0}")]
    DuplicateShareIndex(usize),
    #[error("share index {index} out of range [1, {tellers}]")]
    ShareIndexOutOfRange { index: usize, tellers: usize },
    #[error("multi-ciphertext width {width} does not match {shares} share factors")]
    WidthMismatch { width: usize, shares: usize },
}

/// `t`-out-of-`n` threshold parameters with `1 ≤ t ≤ n`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    threshold: usize,
    tellers: usize,
}

impl ThresholdConfig {
    pub fn new(threshold: usize, tellers: usize) -> Result<Self, ThresholdError> {
        if threshold < 1 || threshold > tellers {
            return Err(ThresholdError::InvalidConfig { threshold, tellers });
        }
        Ok(Self { threshold, tellers })
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn tellers(&self) -> usize {
        self.tellers
    }

    pub(crate) fn check_index(&self, index: usize) -> Result<(), ThresholdError> {
        if index < 1 || index > self.tellers {
            return Err(ThresholdError::ShareIndexOutOfRange {
                index,
                tellers: self.tellers,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_bounds_are_enforced() {
        assert!(ThresholdConfig::new(1, 1).is_ok());
        assert!(ThresholdConfig::new(3, 5).is_ok());
        assert!(ThresholdConfig::new(0, 5).is_err());
        assert!(ThresholdConfig::new(6, 5).is_err());
    }
}
