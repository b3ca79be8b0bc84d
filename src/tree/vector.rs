//! Conversions between Phylo2Vec vectors and Newick strings, and
//! operations on the trees they encode.

use std::iter::zip;

use fixedbitset::FixedBitSet;
use log::{debug, trace};
use ptree::{print_tree, TreeBuilder};
use thiserror::Error;

use super::ancestry::{get_ancestry, order_cherries, order_cherries_no_parents};
use super::fenwick::Fenwick;
use super::newick::{get_cherries, get_cherries_no_parents, write_newick, NewickParseError};
use super::{Ancestry, NewickFormat, NodeId, PhyloVec};

/// Errors that can occur when validating or editing Phylo2Vec vectors.
#[derive(Error, Debug)]
pub enum TreeError {
    /// A vector entry is outside of its allowed range `0..=2i`
    #[error("v[{index}] = {value} is out of range, it must be between 0 and {max}.")]
    InvalidVectorEntry {
        /// Position of the entry
        index: usize,
        /// Value of the entry
        value: usize,
        /// Largest allowed value at this position
        max: usize,
    },
    /// A leaf that does not exist in (or cannot be added to) the tree
    #[error("Leaf {leaf} is out of range for a tree with {n_leaves} leaves.")]
    LeafOutOfRange {
        /// The requested leaf
        leaf: NodeId,
        /// Number of leaves in the tree
        n_leaves: usize,
    },
    /// A branch position that does not exist in the tree
    #[error("Cannot attach a leaf at position {pos}, it must be at most {max}.")]
    InvalidPosition {
        /// The requested position
        pos: usize,
        /// Largest allowed position
        max: usize,
    },
    /// A node id that is not in the tree
    #[error("Could not find node with id {0}")]
    NodeNotFound(NodeId),
    /// The tree has a single leaf, so there is nothing to remove
    #[error("The tree has a single leaf.")]
    IsEmpty,
    /// A row of an ancestry or of a list of cherries does not fit in a tree
    #[error("Row {row} of the ancestry does not fit in a binary tree.")]
    InvalidAncestry {
        /// Index of the first offending row
        row: usize,
    },
    /// There was an [`std::io::Error`] when printing the tree.
    #[error("Error writing tree to console")]
    IoError(#[from] std::io::Error),
}

// I/O errors are compared by kind
impl PartialEq for TreeError {
    fn eq(&self, other: &Self) -> bool {
        use TreeError::*;

        match (self, other) {
            (
                InvalidVectorEntry { index, value, max },
                InvalidVectorEntry {
                    index: other_index,
                    value: other_value,
                    max: other_max,
                },
            ) => (index, value, max) == (other_index, other_value, other_max),
            (
                LeafOutOfRange { leaf, n_leaves },
                LeafOutOfRange {
                    leaf: other_leaf,
                    n_leaves: other_n_leaves,
                },
            ) => (leaf, n_leaves) == (other_leaf, other_n_leaves),
            (
                InvalidPosition { pos, max },
                InvalidPosition {
                    pos: other_pos,
                    max: other_max,
                },
            ) => (pos, max) == (other_pos, other_max),
            (NodeNotFound(node), NodeNotFound(other_node)) => node == other_node,
            (IsEmpty, IsEmpty) => true,
            (InvalidAncestry { row }, InvalidAncestry { row: other_row }) => row == other_row,
            (IoError(error), IoError(other_error)) => error.kind() == other_error.kind(),
            _ => false,
        }
    }
}

impl Eq for TreeError {}

/// Checks that every entry of `v` satisfies `0 <= v[i] <= 2i`.
/// ```
/// use phylo2vec::tree::check_v;
///
/// assert!(check_v(&[0, 2, 4]).is_ok());
/// assert!(check_v(&[0, 3]).is_err());
/// ```
pub fn check_v(v: &[usize]) -> Result<(), TreeError> {
    match v.iter().enumerate().find(|&(i, &vi)| vi > 2 * i) {
        Some((index, &value)) => Err(TreeError::InvalidVectorEntry {
            index,
            value,
            max: 2 * index,
        }),
        None => Ok(()),
    }
}

/// Returns `true` if `v[i] <= i` for every entry, i.e. every new leaf
/// branches off an existing leaf.
/// ```
/// use phylo2vec::tree::is_ordered;
///
/// assert!(is_ordered(&[0, 1, 2]));
/// assert!(!is_ordered(&[0, 2]));
/// ```
pub fn is_ordered(v: &[usize]) -> bool {
    v.iter().enumerate().all(|(i, &vi)| vi <= i)
}

/// Converts a Phylo2Vec vector to a Newick string with parent labels.
///
/// The vector is not validated, see [`check_v`].
/// ```
/// use phylo2vec::tree::to_newick;
///
/// assert_eq!(to_newick(&[0, 0, 0]), "(((0,3)4,2)5,1)6;");
/// assert_eq!(to_newick(&[0, 2]), "((0,1)3,2)4;");
/// ```
pub fn to_newick(v: &[usize]) -> String {
    to_formatted_newick(v, NewickFormat::WithParents)
}

/// Converts a Phylo2Vec vector to a Newick string without parent labels.
/// ```
/// use phylo2vec::tree::to_newick_no_parents;
///
/// assert_eq!(to_newick_no_parents(&[0, 0, 0]), "(((0,3),2),1);");
/// ```
pub fn to_newick_no_parents(v: &[usize]) -> String {
    to_formatted_newick(v, NewickFormat::NoParents)
}

/// Converts a Phylo2Vec vector to a Newick string in the given format
pub fn to_formatted_newick(v: &[usize], format: NewickFormat) -> String {
    debug!("Writing tree with {} leaves as {format:?} newick", v.len() + 1);
    let ancestry = get_ancestry(v);
    write_newick(&ancestry, format)
}

/// Builds a Phylo2Vec vector from cherries in construction order, as
/// returned by [`order_cherries`] or [`order_cherries_no_parents`].
///
/// Leaf `c = max(child1, child2)` of each row is the leaf added at step
/// `c - 1`. It attaches to leaf `min(child1, child2)` if no larger leaf joined
/// that branch before it, and to an internal branch otherwise.
///
/// Every leaf but 0 must be the largest child of exactly one row, otherwise
/// this fails with [`TreeError::InvalidAncestry`].
/// ```
/// use phylo2vec::tree::{build_vector, TreeError};
///
/// let cherries = vec![[0, 4, 4], [1, 3, 3], [0, 2, 2], [0, 1, 1]];
/// assert_eq!(build_vector(&cherries).unwrap(), vec![0, 0, 1, 0]);
///
/// let cherries = vec![[0, 1, 3], [3, 2, 4]];
/// assert_eq!(build_vector(&cherries), Err(TreeError::InvalidAncestry { row: 1 }));
/// ```
pub fn build_vector(cherries: &Ancestry) -> Result<PhyloVec, TreeError> {
    let n_leaves = cherries.len() + 1;
    let mut v = vec![0; cherries.len()];
    let mut written = FixedBitSet::with_capacity(cherries.len());
    let mut bit = Fenwick::new(n_leaves);

    for (row, &[c1, c2, _]) in cherries.iter().enumerate() {
        let (c_min, c_max) = (c1.min(c2), c1.max(c2));
        if c_min == c_max || c_max >= n_leaves || written.put(c_max - 1) {
            return Err(TreeError::InvalidAncestry { row });
        }

        let idx = bit.prefix_sum(c_max - 1);
        v[c_max - 1] = if idx == 0 { c_min } else { c_max - 1 + idx };
        bit.update(c_max, 1);
    }

    Ok(v)
}

/// Converts a Newick string with parent labels to a Phylo2Vec vector.
///
/// Internal labels only need to be larger than the labels of their children:
/// trees that differ only by their internal labels give the same vector.
/// ```
/// use phylo2vec::tree::to_vector;
///
/// assert_eq!(to_vector("(((0,4)5,2)7,(1,3)6)8;").unwrap(), vec![0, 0, 1, 0]);
/// assert_eq!(to_vector("(((0,4)5,2)6,(1,3)7)8;").unwrap(), vec![0, 0, 1, 0]);
/// ```
pub fn to_vector(newick: &str) -> Result<PhyloVec, NewickParseError> {
    let mut cherries = get_cherries(newick)?;
    debug!("Read {} cherries from labelled newick", cherries.len());
    order_cherries(&mut cherries)?;
    Ok(build_vector(&cherries)?)
}

/// Converts a Newick string without parent labels to a Phylo2Vec vector.
/// ```
/// use phylo2vec::tree::to_vector_no_parents;
///
/// assert_eq!(to_vector_no_parents("(((0,3),2),1);").unwrap(), vec![0, 0, 0]);
/// ```
pub fn to_vector_no_parents(newick: &str) -> Result<PhyloVec, NewickParseError> {
    let mut cherries = get_cherries_no_parents(newick)?;
    debug!("Read {} cherries from unlabelled newick", cherries.len());
    order_cherries_no_parents(&mut cherries)?;
    Ok(build_vector(&cherries)?)
}

/// Converts a Newick string in the given format to a Phylo2Vec vector
pub fn to_formatted_vector(
    newick: &str,
    format: NewickFormat,
) -> Result<PhyloVec, NewickParseError> {
    match format {
        NewickFormat::WithParents => to_vector(newick),
        NewickFormat::NoParents => to_vector_no_parents(newick),
    }
}

/// Finds the first `(row, column)` of `ancestry` that holds `leaf`
/// ```
/// use phylo2vec::tree::find_coords_of_first_leaf;
///
/// let ancestry = vec![[0, 1, 3], [3, 2, 4]];
/// assert_eq!(find_coords_of_first_leaf(&ancestry, 2), Some((1, 1)));
/// assert_eq!(find_coords_of_first_leaf(&ancestry, 5), None);
/// ```
pub fn find_coords_of_first_leaf(ancestry: &Ancestry, leaf: NodeId) -> Option<(usize, usize)> {
    ancestry.iter().enumerate().find_map(|(row, triplet)| {
        triplet
            .iter()
            .position(|&node| node == leaf)
            .map(|col| (row, col))
    })
}

/// Adds leaf `leaf` to the tree encoded by `v`, on the branch at `pos`.
///
/// Leaves `leaf..n` of the original tree are renumbered `leaf + 1..=n`.
/// `pos` follows the vector convention: it must be at most `2 * v.len()`.
/// ```
/// use phylo2vec::tree::add_leaf;
///
/// assert_eq!(add_leaf(&[0], 0, 0).unwrap(), vec![0, 2]);
/// assert_eq!(add_leaf(&[0, 0, 1, 0], 3, 5).unwrap(), vec![0, 0, 0, 1, 0]);
/// ```
pub fn add_leaf(v: &[usize], leaf: NodeId, pos: usize) -> Result<PhyloVec, TreeError> {
    check_v(v)?;
    let n_leaves = v.len() + 1;
    if leaf > n_leaves {
        return Err(TreeError::LeafOutOfRange {
            leaf,
            n_leaves: n_leaves + 1,
        });
    }
    if pos > 2 * v.len() {
        return Err(TreeError::InvalidPosition {
            pos,
            max: 2 * v.len(),
        });
    }

    // Grow the tree with a new last leaf, then give it the requested number
    let mut extended = v.to_vec();
    extended.push(pos);
    let mut ancestry = get_ancestry(&extended);

    let (new_row, new_col) = find_coords_of_first_leaf(&ancestry, n_leaves)
        .ok_or(TreeError::NodeNotFound(n_leaves))?;
    trace!("New leaf {n_leaves} found at ({new_row}, {new_col})");

    for (r, triplet) in ancestry.iter_mut().enumerate() {
        for (c, node) in triplet.iter_mut().enumerate() {
            if (r, c) != (new_row, new_col) && *node >= leaf {
                *node += 1;
            }
        }
    }
    ancestry[new_row][new_col] = leaf;

    order_cherries(&mut ancestry)?;
    build_vector(&ancestry)
}

/// Removes `leaf` from the tree encoded by `v`.
///
/// Leaves after `leaf` are renumbered one lower. Returns the new vector and
/// the id of the removed leaf's sister in the original tree. With
/// `sister' = if sister >= leaf { sister - 1 } else { sister }`,
/// `add_leaf(&new_v, leaf, sister')` gives back `v`.
/// ```
/// use phylo2vec::tree::{add_leaf, remove_leaf};
///
/// let v = vec![0, 0, 1, 0];
/// let (removed, sister) = remove_leaf(&v, 2).unwrap();
/// assert_eq!((removed.clone(), sister), (vec![0, 1, 0], 5));
///
/// assert_eq!(add_leaf(&removed, 2, sister - 1).unwrap(), v);
/// ```
pub fn remove_leaf(v: &[usize], leaf: NodeId) -> Result<(PhyloVec, NodeId), TreeError> {
    check_v(v)?;
    if v.is_empty() {
        return Err(TreeError::IsEmpty);
    }
    let n_leaves = v.len() + 1;
    if leaf >= n_leaves {
        return Err(TreeError::LeafOutOfRange { leaf, n_leaves });
    }

    let ancestry = get_ancestry(v);
    let (leaf_row, leaf_col) =
        find_coords_of_first_leaf(&ancestry, leaf).ok_or(TreeError::NodeNotFound(leaf))?;
    let [c1, c2, parent] = ancestry[leaf_row];
    let sister = if leaf_col == 0 { c2 } else { c1 };
    trace!("Removing leaf {leaf} with parent {parent} and sister {sister}");

    let mut edited: Ancestry = ancestry
        .iter()
        .enumerate()
        .filter(|&(r, _)| r != leaf_row)
        .map(|(_, triplet)| {
            triplet.map(|node| {
                let node = if node == parent { sister } else { node };
                match node {
                    // Close the gaps left by the leaf and by its parent
                    n if n > leaf && n > parent => n - 2,
                    n if n > leaf => n - 1,
                    n => n,
                }
            })
        })
        .collect();

    order_cherries(&mut edited)?;
    Ok((build_vector(&edited)?, sister))
}

/// Parent of every node of the tree of `ancestry`, `None` for the root
fn get_parents(ancestry: &Ancestry) -> Vec<Option<NodeId>> {
    let mut parents = vec![None; 2 * ancestry.len() + 1];
    for &[c1, c2, parent] in ancestry {
        parents[c1] = Some(parent);
        parents[c2] = Some(parent);
    }
    parents
}

/// Gets the paths from every node of the tree encoded by `v` to the root.
///
/// `paths[node]` starts at `node` and lists its ancestors in increasing order,
/// ending with the root `2 * n_leaves - 2`.
/// ```
/// use phylo2vec::tree::get_ancestry_paths;
///
/// let paths = get_ancestry_paths(&[0, 2]).unwrap();
/// assert_eq!(paths, vec![vec![0, 3, 4], vec![1, 3, 4], vec![2, 4], vec![3, 4], vec![4]]);
/// ```
pub fn get_ancestry_paths(v: &[usize]) -> Result<Vec<Vec<NodeId>>, TreeError> {
    check_v(v)?;
    let parents = get_parents(&get_ancestry(v));

    // Parents have larger ids than their children: fill paths from the root down
    let mut paths: Vec<Vec<NodeId>> = vec![Vec::new(); parents.len()];
    for node in (0..parents.len()).rev() {
        let mut path = vec![node];
        if let Some(parent) = parents[node] {
            path.extend_from_slice(&paths[parent]);
        }
        paths[node] = path;
    }

    Ok(paths)
}

/// Gets the path from the root to `node` in the tree encoded by `v`
/// ```
/// use phylo2vec::tree::get_path_from_root;
///
/// assert_eq!(get_path_from_root(&[0, 2], 1).unwrap(), vec![4, 3, 1]);
/// assert!(get_path_from_root(&[0, 2], 5).is_err());
/// ```
pub fn get_path_from_root(v: &[usize], node: NodeId) -> Result<Vec<NodeId>, TreeError> {
    check_v(v)?;
    let parents = get_parents(&get_ancestry(v));
    path_from_root(&parents, node)
}

fn path_from_root(parents: &[Option<NodeId>], node: NodeId) -> Result<Vec<NodeId>, TreeError> {
    if node >= parents.len() {
        return Err(TreeError::NodeNotFound(node));
    }

    let mut path = vec![];
    let mut current_node = node;
    loop {
        path.push(current_node);
        match parents[current_node] {
            Some(parent) => current_node = parent,
            None => break,
        }
    }

    Ok(path.into_iter().rev().collect())
}

/// Gets the most recent common ancestor of two nodes of the tree encoded by `v`
/// ```
/// use phylo2vec::tree::get_common_ancestor;
///
/// // ((0,1)3,2)4;
/// let v = vec![0, 2];
/// assert_eq!(get_common_ancestor(&v, 0, 1).unwrap(), 3);
/// assert_eq!(get_common_ancestor(&v, 0, 2).unwrap(), 4);
/// ```
pub fn get_common_ancestor(
    v: &[usize],
    source: NodeId,
    target: NodeId,
) -> Result<NodeId, TreeError> {
    check_v(v)?;
    let parents = get_parents(&get_ancestry(v));

    let root_to_source = path_from_root(&parents, source)?;
    let root_to_target = path_from_root(&parents, target)?;
    if source == target {
        return Ok(source);
    }

    let cursor = zip(root_to_source.iter(), root_to_target.iter())
        .position(|(s, t)| s != t)
        .unwrap_or_else(|| {
            // One node is an ancestor of the other
            root_to_source.len().min(root_to_target.len())
        });

    Ok(root_to_source[cursor - 1])
}

/// Print the tree encoded by `v` to the console
pub fn print(v: &[usize]) -> Result<(), TreeError> {
    enum Step {
        Enter(NodeId),
        Exit,
    }

    check_v(v)?;
    let ancestry = get_ancestry(v);
    let n_leaves = v.len() + 1;
    let root = 2 * n_leaves - 2;

    let mut builder = TreeBuilder::new(root.to_string());
    let mut stack = match ancestry.last() {
        Some(&[c1, c2, _]) => vec![Step::Enter(c2), Step::Enter(c1)],
        None => vec![],
    };

    while let Some(step) = stack.pop() {
        match step {
            Step::Enter(node) if node < n_leaves => {
                builder.add_empty_child(node.to_string());
            }
            Step::Enter(node) => {
                let [c1, c2, _] = ancestry[node - n_leaves];
                builder.begin_child(node.to_string());
                stack.push(Step::Exit);
                stack.push(Step::Enter(c2));
                stack.push(Step::Enter(c1));
            }
            Step::Exit => {
                builder.end_child();
            }
        }
    }

    let tree = builder.build();
    print_tree(&tree)?;
    Ok(())
}
