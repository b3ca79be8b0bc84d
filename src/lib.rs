//! A library to convert binary tree topologies to and from Phylo2Vec vectors.
//!
//! A tree with `n` leaves labelled `0..n` is encoded as a vector `v` of
//! `n - 1` integers with `0 <= v[i] <= 2i`: starting from the cherry `(0,1)`,
//! leaf `i + 1` is attached to the branch numbered `v[i]`.
//!
//! ```
//! use phylo2vec::tree::{to_newick, to_vector};
//! use phylo2vec::sample;
//!
//! let v = sample(20, false);
//! let newick = to_newick(&v);
//!
//! assert_eq!(to_vector(&newick).unwrap(), v);
//! ```

use rand::prelude::*;

use tree::PhyloVec;

pub mod tree;

/// Samples a random Phylo2Vec vector for a tree with `n_leaves` leaves.
///
/// If `ordered` is `true`, each new leaf branches off an existing leaf,
/// i.e. `v[i]` is drawn in `0..=i` instead of `0..=2i`.
pub fn sample(n_leaves: usize, ordered: bool) -> PhyloVec {
    let mut rng = thread_rng();
    sample_with_rng(n_leaves, ordered, &mut rng)
}

/// Samples a random Phylo2Vec vector with the given random number generator
/// ```
/// use rand::{rngs::StdRng, SeedableRng};
/// use phylo2vec::{sample_with_rng, tree::check_v};
///
/// let mut rng = StdRng::seed_from_u64(42);
/// let v = sample_with_rng(10, false, &mut rng);
///
/// assert_eq!(v.len(), 9);
/// assert!(check_v(&v).is_ok());
/// ```
pub fn sample_with_rng<R: Rng + ?Sized>(n_leaves: usize, ordered: bool, rng: &mut R) -> PhyloVec {
    (0..n_leaves.saturating_sub(1))
        .map(|i| {
            let max = if ordered { i } else { 2 * i };
            rng.gen_range(0..=max)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use crate::tree::{check_v, is_ordered};

    #[test]
    fn sample_sizes() {
        let mut rng = StdRng::seed_from_u64(0);
        for n_leaves in [0, 1, 2, 3, 10, 257] {
            let v = sample_with_rng(n_leaves, false, &mut rng);
            assert_eq!(v.len(), n_leaves.saturating_sub(1));
            assert!(check_v(&v).is_ok());
        }
    }

    #[test]
    fn sample_ordered() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let v = sample_with_rng(50, true, &mut rng);
            assert!(is_ordered(&v));
        }
        assert!(is_ordered(&sample(50, true)));
    }

    #[test]
    fn sample_is_deterministic_with_seed() {
        let v1 = sample_with_rng(100, false, &mut StdRng::seed_from_u64(1234));
        let v2 = sample_with_rng(100, false, &mut StdRng::seed_from_u64(1234));
        assert_eq!(v1, v2);
    }

    #[test]
    fn sample_uses_full_range() {
        // The first entry is always 0, later ones reach internal branches
        let mut rng = StdRng::seed_from_u64(3);
        let samples: Vec<PhyloVec> = (0..200)
            .map(|_| sample_with_rng(5, false, &mut rng))
            .collect();

        assert!(samples.iter().all(|v| v[0] == 0));
        assert!(samples.iter().any(|v| !is_ordered(v)));
    }
}
