//! Prefix-sum index over leaf positions, used to build Phylo2Vec vectors.

/// A Fenwick tree (binary indexed tree) counting marked leaves.
///
/// Positions are 1-based and go from `1` to `n_leaves`.
///
/// # Example
/// ```
/// use phylo2vec::tree::Fenwick;
///
/// let mut bit = Fenwick::new(5);
/// bit.update(2, 1);
/// bit.update(4, 1);
///
/// assert_eq!(bit.prefix_sum(1), 0);
/// assert_eq!(bit.prefix_sum(3), 1);
/// assert_eq!(bit.prefix_sum(5), 2);
/// ```
#[derive(Debug, Clone)]
pub struct Fenwick {
    n_leaves: usize,
    data: Vec<usize>,
}

impl Fenwick {
    /// Creates an index over positions `1..=n_leaves` with all counts at 0
    pub fn new(n_leaves: usize) -> Self {
        Self {
            n_leaves,
            data: vec![0; n_leaves + 1],
        }
    }

    /// Number of marked units in `[1, pos]`. Positions past the end are clamped.
    pub fn prefix_sum(&self, pos: usize) -> usize {
        let mut i = pos.min(self.n_leaves);
        let mut sum = 0;
        while i > 0 {
            sum += self.data[i];
            i -= lowbit(i);
        }
        sum
    }

    /// Adds `delta` at position `pos`. Position 0 is ignored.
    pub fn update(&mut self, pos: usize, delta: usize) {
        let mut i = pos;
        if i == 0 {
            return;
        }
        while i <= self.n_leaves {
            self.data[i] += delta;
            i += lowbit(i);
        }
    }
}

#[inline]
fn lowbit(i: usize) -> usize {
    i & i.wrapping_neg()
}
