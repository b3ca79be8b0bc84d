//! Encode and decode binary tree topologies.
//!
//! This module defines the different representations of a binary tree
//! with `n` leaves labelled `0..n`:
//!  - A [`PhyloVec`], the Phylo2Vec vector of `n - 1` integers.
//!  - An [`Ancestry`], the list of `n - 1` merges `[child1, child2, parent]`.
//!  - A Newick string where every node is an integer.
//!
//! as well as the functions to convert between them and edit trees.
//!

mod ancestry;
mod avl;
mod fenwick;
mod newick;
mod vector;

pub use self::ancestry::{
    check_ancestry, get_ancestry, get_pairs, order_cherries, order_cherries_no_parents,
};
pub use self::avl::AvlTree;
pub use self::fenwick::Fenwick;
pub use self::newick::{
    build_newick, find_num_leaves, get_cherries, get_cherries_no_parents,
    remove_branch_length_annotations, remove_parent_labels, NewickParseError,
};
pub use self::vector::{
    add_leaf, build_vector, check_v, find_coords_of_first_leaf, get_ancestry_paths,
    get_common_ancestor, get_path_from_root, is_ordered, print, remove_leaf, to_formatted_newick,
    to_formatted_vector, to_newick, to_newick_no_parents, to_vector, to_vector_no_parents,
    TreeError,
};

/// A type that represents identifiers of nodes in a tree.
/// Leaves are numbered `0..n` and internal nodes `n..2n - 1`.
pub type NodeId = usize;

/// A Phylo2Vec vector: `v[i]` is the branch from which leaf `i + 1` is born,
/// with `0 <= v[i] <= 2i`.
pub type PhyloVec = Vec<usize>;

/// A pair of leaves merged together while building a tree
pub type Pair = (NodeId, NodeId);

/// Ordered list of [`Pair`] objects
pub type Pairs = Vec<Pair>;

/// Ordered list of `[child1, child2, parent]` triplets
pub type Ancestry = Vec<[NodeId; 3]>;

/// Newick input and output format
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum NewickFormat {
    /// Internal nodes are labelled with their id, e.g. `((0,2)3,1)4;`
    WithParents,
    /// Only leaves are labelled, e.g. `((0,2),1);`
    NoParents,
}
