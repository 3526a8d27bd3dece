//! Permutations of `{0, .., N-1}` stored with their precomputed inverse.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::rng;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PermutationError {
    #[error("array of length {0} is not a permutation of its indices")]
    NotAPermutation(usize),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permutation {
    forward: Vec<usize>,
    inverse: Vec<usize>,
}

impl Permutation {
    /// Uniform random permutation via Fisher-Yates, drawing indices from
    /// the global random source.
    pub fn random(len: usize) -> Self {
        let mut forward: Vec<usize> = (0..len).collect();
        for i in (1..len).rev() {
            let j = rng::random_usize(i + 1);
            forward.swap(i, j);
        }
        Self::from_forward(forward).expect("a shuffled index array is a permutation")
    }

    pub fn identity(len: usize) -> Self {
        Self {
            forward: (0..len).collect(),
            inverse: (0..len).collect(),
        }
    }

    /// Validate and adopt a forward array, precomputing the inverse.
    pub fn from_forward(forward: Vec<usize>) -> Result<Self, PermutationError> {
        let len = forward.len();
        let mut inverse = vec![usize::MAX; len];
        for (position, &target) in forward.iter().enumerate() {
            if target >= len || inverse[target] != usize::MAX {
                return Err(PermutationError::NotAPermutation(len));
            }
            inverse[target] = position;
        }
        Ok(Self { forward, inverse })
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// `π(i)`.
    pub fn apply(&self, i: usize) -> usize {
        self.forward[i]
    }

    /// `π⁻¹(i)`.
    pub fn invert(&self, i: usize) -> usize {
        self.inverse[i]
    }

    pub fn forward(&self) -> &[usize] {
        &self.forward
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverse_undoes_forward() {
        for len in [0usize, 1, 2, 7, 64] {
            let permutation = Permutation::random(len);
            for i in 0..len {
                assert_eq!(permutation.invert(permutation.apply(i)), i);
                assert_eq!(permutation.apply(permutation.invert(i)), i);
            }
        }
    }

    #[test]
    fn values_form_the_full_index_multiset() {
        let permutation = Permutation::random(50);
        let mut values: Vec<usize> = permutation.forward().to_vec();
        values.sort_unstable();
        assert_eq!(values, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn from_forward_rejects_non_bijections() {
        assert!(Permutation::from_forward(vec![0, 0, 1]).is_err());
        assert!(Permutation::from_forward(vec![0, 3]).is_err());
        assert!(Permutation::from_forward(vec![2, 0, 1]).is_ok());
    }

    #[test]
    fn random_permutations_eventually_differ() {
        let a = Permutation::random(20);
        let differs = (0..10).any(|_| Permutation::random(20) != a);
        assert!(differs, "40 draws of S_20 should not all collide");
    }
}
