//! Convert Phylo2Vec vectors to ancestries and canonicalize cherries.

use fixedbitset::FixedBitSet;
use log::trace;

use super::avl::AvlTree;
use super::vector::TreeError;
use super::{Ancestry, NodeId, Pairs};

/// Gets the ordered list of leaf pairs merged when building the tree of `v`.
///
/// Each pair `(a, b)` merges the subtree currently containing leaf `a`
/// with the one containing leaf `b`.
/// ```
/// use phylo2vec::tree::get_pairs;
///
/// assert_eq!(get_pairs(&[0, 0, 0]), vec![(0, 3), (0, 2), (0, 1)]);
/// assert_eq!(get_pairs(&[0, 2]), vec![(0, 1), (0, 2)]);
/// ```
pub fn get_pairs(v: &[usize]) -> Pairs {
    if v.is_empty() {
        return Vec::new();
    }

    let mut avl_tree = AvlTree::with_capacity(v.len());
    // The first two leaves always form a cherry
    avl_tree.insert(0, (0, 1));

    for (i, &vi) in v.iter().enumerate().skip(1) {
        let next_leaf = i + 1;
        if vi <= i {
            // The branch leading to leaf vi gives birth to next_leaf,
            // this is the shallowest pair so far
            avl_tree.insert(0, (vi, next_leaf));
        } else {
            // An internal branch gives birth to next_leaf, right above
            // the pair currently at index vi - next_leaf
            let index = vi - next_leaf;
            let (anchor, _) = avl_tree.lookup(index);
            avl_tree.insert(index + 1, (anchor, next_leaf));
        }
    }

    avl_tree.get_pairs()
}

/// Follows parent links up to the highest known ancestor of `node`,
/// compressing the path on the way.
fn find_highest_parent(parents: &mut [Option<NodeId>], node: NodeId) -> NodeId {
    let mut highest = node;
    while let Some(parent) = parents[highest] {
        highest = parent;
    }

    let mut current = node;
    while let Some(parent) = parents[current] {
        if parent != highest {
            parents[current] = Some(highest);
        }
        current = parent;
    }

    highest
}

/// Gets the ancestry of the tree encoded by `v`.
///
/// Rows are in construction order: row `i` merges two nodes into the
/// internal node `n_leaves + i`, so the last row holds the root `2 * n_leaves - 2`.
/// ```
/// use phylo2vec::tree::get_ancestry;
///
/// assert_eq!(
///     get_ancestry(&[0, 0, 0]),
///     vec![[0, 3, 4], [4, 2, 5], [5, 1, 6]]
/// );
/// ```
pub fn get_ancestry(v: &[usize]) -> Ancestry {
    let pairs = get_pairs(v);
    let n_leaves = v.len() + 1;

    let mut parents: Vec<Option<NodeId>> = vec![None; 2 * n_leaves - 1];
    let mut ancestry = Vec::with_capacity(pairs.len());

    for (i, (c1, c2)) in pairs.into_iter().enumerate() {
        let next_parent = n_leaves + i;
        let parent_c1 = find_highest_parent(&mut parents, c1);
        let parent_c2 = find_highest_parent(&mut parents, c2);

        ancestry.push([parent_c1, parent_c2, next_parent]);

        parents[parent_c1] = Some(next_parent);
        parents[parent_c2] = Some(next_parent);
    }

    ancestry
}

/// Checks that `ancestry` is a binary tree in construction order: row `i`
/// has parent `n_leaves + i`, both children have smaller ids than their
/// parent and every node but the root is a child exactly once.
/// ```
/// use phylo2vec::tree::{check_ancestry, get_ancestry, TreeError};
///
/// assert!(check_ancestry(&get_ancestry(&[0, 0, 1, 0])).is_ok());
/// assert_eq!(
///     check_ancestry(&vec![[0, 1, 3], [3, 2, 9]]),
///     Err(TreeError::InvalidAncestry { row: 1 })
/// );
/// ```
pub fn check_ancestry(ancestry: &Ancestry) -> Result<(), TreeError> {
    let n_leaves = ancestry.len() + 1;
    let mut seen = FixedBitSet::with_capacity(2 * n_leaves - 1);

    for (row, &[c1, c2, parent]) in ancestry.iter().enumerate() {
        if parent != n_leaves + row || c1 >= parent || c2 >= parent || c1 == c2 {
            return Err(TreeError::InvalidAncestry { row });
        }
        if seen.put(c1) || seen.put(c2) {
            return Err(TreeError::InvalidAncestry { row });
        }
    }

    Ok(())
}

/// Canonicalizes cherries whose third column is the parent id.
///
/// Rows are sorted by parent, each child is replaced by its smallest
/// descending leaf and the third column by the largest of the two.
/// The rows are then put in construction order with [`order_cherries_no_parents`].
///
/// Fails if a row refers to a child that is neither a leaf nor the parent
/// of a previous row, and `cherries` is then left unchanged.
/// ```
/// use phylo2vec::tree::order_cherries;
///
/// let mut cherries = vec![[0, 4, 5], [5, 2, 7], [1, 3, 6], [7, 6, 8]];
/// order_cherries(&mut cherries).unwrap();
///
/// assert_eq!(cherries, vec![[0, 4, 4], [1, 3, 3], [0, 2, 2], [0, 1, 1]]);
/// ```
pub fn order_cherries(cherries: &mut Ancestry) -> Result<(), TreeError> {
    if cherries.is_empty() {
        return Ok(());
    }

    let mut rows = cherries.clone();
    rows.sort_by_key(|row| row[2]);

    let max_id = rows.iter().flatten().copied().max().unwrap_or(0);
    let mut min_desc: Vec<Option<NodeId>> = vec![None; max_id + 1];

    for row in rows.iter_mut() {
        let [c1, c2, parent] = *row;
        let min_desc1 = min_desc[c1].unwrap_or(c1);
        let min_desc2 = min_desc[c2].unwrap_or(c2);

        min_desc[parent] = Some(min_desc1.min(min_desc2));
        *row = [min_desc1, min_desc2, min_desc1.max(min_desc2)];
    }

    order_cherries_no_parents(&mut rows)?;
    *cherries = rows;
    Ok(())
}

/// Puts cherries in construction order, i.e. the order in which
/// [`get_ancestry`] would merge them.
///
/// Each row must name its children by their smallest descending leaf and
/// rows must be listed children first (e.g. in Newick closing order).
/// Every leaf `c > 0` is the largest of the two children of exactly one row,
/// which is the row where leaf `c` joins the tree of leaves `0..c`.
/// That row goes right after the row of its sister subtree, or at the front
/// when the sister is a single leaf, which mirrors the insertions of [`get_pairs`].
///
/// Fails with [`TreeError::InvalidAncestry`] if a row names a child that is
/// not a leaf, or if two rows share their largest child. `cherries` is then
/// left unchanged.
/// ```
/// use phylo2vec::tree::{order_cherries_no_parents, TreeError};
///
/// // Cherries of "((0,2),(1,3));" in closing order
/// let mut cherries = vec![[0, 2, 2], [1, 3, 3], [0, 1, 1]];
/// order_cherries_no_parents(&mut cherries).unwrap();
///
/// assert_eq!(cherries, vec![[1, 3, 3], [0, 2, 2], [0, 1, 1]]);
///
/// // Rows with parent ids instead of smallest leaves
/// let mut cherries = vec![[0, 1, 3], [3, 2, 4]];
/// assert_eq!(
///     order_cherries_no_parents(&mut cherries),
///     Err(TreeError::InvalidAncestry { row: 1 })
/// );
/// ```
pub fn order_cherries_no_parents(cherries: &mut Ancestry) -> Result<(), TreeError> {
    let n_leaves = cherries.len() + 1;

    // Row holding each leaf as its largest child
    let mut row_of_leaf: Vec<Option<usize>> = vec![None; n_leaves];
    // chains[m]: largest children of the rows whose smallest child is m, bottom to top
    let mut chains: Vec<Vec<NodeId>> = vec![Vec::new(); n_leaves];

    for (r, row) in cherries.iter().enumerate() {
        let (low, high) = (row[0].min(row[1]), row[0].max(row[1]));
        if low == high || high >= n_leaves || row_of_leaf[high].is_some() {
            return Err(TreeError::InvalidAncestry { row: r });
        }
        row_of_leaf[high] = Some(r);
        chains[low].push(high);
    }

    // The sister of a leaf is the closest lower row on its chain that joined
    // the tree before it: a previous smaller element search.
    let mut sister_row: Vec<Option<NodeId>> = vec![None; n_leaves];
    let mut stack: Vec<NodeId> = Vec::new();
    for chain in chains.iter() {
        stack.clear();
        for &leaf in chain {
            while stack.last().is_some_and(|&top| top > leaf) {
                stack.pop();
            }
            sister_row[leaf] = stack.last().copied();
            stack.push(leaf);
        }
    }

    // Keys are distinct and in 1..n, so every row is replayed once
    // in a linked list
    let mut next: Vec<Option<NodeId>> = vec![None; n_leaves];
    let mut head: Option<NodeId> = None;
    for leaf in 1..n_leaves {
        match sister_row[leaf] {
            None => {
                next[leaf] = head;
                head = Some(leaf);
            }
            Some(sister) => {
                next[leaf] = next[sister];
                next[sister] = Some(leaf);
            }
        }
        trace!("leaf {leaf} joins after {:?}", sister_row[leaf]);
    }

    let mut ordered = Vec::with_capacity(cherries.len());
    let mut current = head;
    while let Some(leaf) = current {
        if let Some(r) = row_of_leaf[leaf] {
            ordered.push(cherries[r]);
        }
        current = next[leaf];
    }

    *cherries = ordered;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairs_of_small_vectors() {
        let test_cases: Vec<(Vec<usize>, Pairs)> = vec![
            (vec![], vec![]),
            (vec![0], vec![(0, 1)]),
            (vec![0, 0], vec![(0, 2), (0, 1)]),
            (vec![0, 1], vec![(1, 2), (0, 1)]),
            (vec![0, 2], vec![(0, 1), (0, 2)]),
            (vec![0, 0, 3], vec![(0, 2), (0, 3), (0, 1)]),
            (vec![0, 2, 4], vec![(0, 1), (0, 2), (0, 3)]),
            (vec![0, 1, 2], vec![(2, 3), (1, 2), (0, 1)]),
        ];

        for (v, pairs) in test_cases {
            assert_eq!(get_pairs(&v), pairs, "pairs of {v:?}");
        }
    }

    #[test]
    fn ancestry_of_small_vectors() {
        let test_cases: Vec<(Vec<usize>, Ancestry)> = vec![
            (vec![], vec![]),
            (vec![0], vec![[0, 1, 2]]),
            (vec![0, 2], vec![[0, 1, 3], [3, 2, 4]]),
            (vec![0, 1, 2], vec![[2, 3, 4], [1, 4, 5], [0, 5, 6]]),
            (
                vec![0, 0, 1, 0],
                vec![[0, 4, 5], [1, 3, 6], [5, 2, 7], [7, 6, 8]],
            ),
        ];

        for (v, ancestry) in test_cases {
            assert_eq!(get_ancestry(&v), ancestry, "ancestry of {v:?}");
        }
    }

    #[test]
    fn ancestry_is_a_tree() {
        let v = vec![0, 2, 3, 1, 8, 5, 12, 0, 9];
        let ancestry = get_ancestry(&v);
        let n_leaves = v.len() + 1;

        assert_eq!(ancestry.len(), n_leaves - 1);
        assert_eq!(ancestry.last().unwrap()[2], 2 * n_leaves - 2);

        let mut seen_as_child = vec![0; 2 * n_leaves - 1];
        for (i, [c1, c2, p]) in ancestry.iter().enumerate() {
            assert_eq!(*p, n_leaves + i);
            assert!(c1 < p && c2 < p);
            seen_as_child[*c1] += 1;
            seen_as_child[*c2] += 1;
        }
        assert!(seen_as_child[..2 * n_leaves - 2].iter().all(|&c| c == 1));
        assert_eq!(seen_as_child[2 * n_leaves - 2], 0);
    }

    #[test]
    fn order_cherries_ignores_label_values() {
        // Same topology, internal labels permuted
        let mut canonical = vec![[0, 4, 5], [5, 2, 7], [1, 3, 6], [7, 6, 8]];
        let mut permuted = vec![[0, 4, 5], [5, 2, 6], [1, 3, 7], [6, 7, 8]];
        order_cherries(&mut canonical).unwrap();
        order_cherries(&mut permuted).unwrap();

        assert_eq!(canonical, permuted);
    }

    #[test]
    fn order_cherries_no_parents_matches_construction() {
        let v = vec![0, 0, 3];
        // (((0,2),3),1) in closing order
        let mut cherries = vec![[0, 2, 2], [0, 3, 3], [0, 1, 1]];
        order_cherries_no_parents(&mut cherries).unwrap();
        assert_eq!(cherries, vec![[0, 2, 2], [0, 3, 3], [0, 1, 1]]);

        let mut from_ancestry = get_ancestry(&v);
        order_cherries(&mut from_ancestry).unwrap();
        assert_eq!(from_ancestry, cherries);
    }

    #[test]
    fn check_ancestries() {
        for v in [vec![], vec![0], vec![0, 2], vec![0, 2, 3, 1, 8, 5, 12, 0, 9]] {
            assert_eq!(check_ancestry(&get_ancestry(&v)), Ok(()), "{v:?}");
        }

        let test_cases: Vec<(Ancestry, usize)> = vec![
            // Wrong parent id
            (vec![[0, 1, 3], [3, 2, 9]], 1),
            // Child larger than its parent
            (vec![[0, 4, 3], [3, 2, 4]], 0),
            // Node used twice as a child
            (vec![[0, 1, 3], [1, 2, 4]], 1),
            (vec![[1, 1, 2]], 0),
        ];
        for (ancestry, row) in test_cases {
            assert_eq!(
                check_ancestry(&ancestry),
                Err(TreeError::InvalidAncestry { row }),
                "{ancestry:?}"
            );
        }
    }

    #[test]
    fn order_malformed_cherries() {
        // Parent ids in place of smallest leaves
        let ancestry = get_ancestry(&[0, 0, 1, 0]);
        let mut cherries = ancestry.clone();
        assert_eq!(
            order_cherries_no_parents(&mut cherries),
            Err(TreeError::InvalidAncestry { row: 2 })
        );
        assert_eq!(cherries, ancestry);

        let test_cases: Vec<(Ancestry, usize)> = vec![
            // Leaf 2 keys two rows
            (vec![[0, 2, 2], [1, 2, 2], [0, 1, 1]], 1),
            // Cherry of a leaf with itself
            (vec![[1, 1, 1], [0, 2, 2]], 0),
        ];
        for (mut cherries, row) in test_cases {
            assert_eq!(
                order_cherries_no_parents(&mut cherries),
                Err(TreeError::InvalidAncestry { row })
            );
        }

        // Child 7 is never defined as a parent
        let mut cherries = vec![[0, 4, 5], [1, 3, 6], [5, 2, 8], [7, 6, 9]];
        let unchanged = cherries.clone();
        assert!(order_cherries(&mut cherries).is_err());
        assert_eq!(cherries, unchanged);
    }
}
