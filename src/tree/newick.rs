//! Read and write integer Newick strings.
//!
//! Every node of these Newick strings is an integer: leaves are numbered
//! `0..n` and internal nodes, when labelled, `n..2n - 1`. For example the
//! tree with ancestry `[[0, 2, 3], [3, 1, 4]]` is written `((0,2)3,1)4;`
//! or `((0,2),1);` without parent labels.

use fixedbitset::FixedBitSet;
use itertools::Itertools;
use thiserror::Error;

use super::ancestry::check_ancestry;
use super::vector::TreeError;
use super::{Ancestry, NewickFormat, NodeId};

/// Errors that can occur when parsing newick strings.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum NewickParseError {
    /// The newick string is missing a final semi-colon
    #[error("The tree is missing a semi colon at the end.")]
    NoClosingSemicolon,
    /// There is an unclosed bracket in the newick String
    #[error("Missing a closing bracket.")]
    UnclosedBracket,
    /// We are trying to close a subtree but have no opening bracket
    #[error("Parent node of subtree not found")]
    NoSubtreeParent,
    /// There is no node at all in the newick string
    #[error("The newick string has no nodes.")]
    IsEmpty,
    /// A character that does not belong at this position
    #[error("Unexpected character {0:?} at position {1}.")]
    UnexpectedCharacter(char, usize),
    /// A subtree does not have exactly two children
    #[error("The subtree closing at position {0} does not have exactly two children.")]
    NotBinary(usize),
    /// The newick string describes several trees or is missing brackets
    #[error("The newick string has more than one root.")]
    MultipleRoots,
    /// A subtree has no parent label in a newick string with parent labels
    #[error("Missing parent label at position {0}.")]
    MissingParentLabel(usize),
    /// A subtree has a parent label in a newick string without parent labels
    #[error("Unexpected parent label at position {0}.")]
    UnexpectedParentLabel(usize),
    /// There was a [`std::num::ParseIntError`] when parsing a node
    #[error("Could not parse a node")]
    IntError(#[from] std::num::ParseIntError),
    /// A node id does not fit a tree with this number of leaves
    #[error("Node {node} is out of range for a tree with {n_leaves} leaves.")]
    InvalidNode {
        /// Id of the node
        node: NodeId,
        /// Number of leaves in the tree
        n_leaves: usize,
    },
    /// A node id appears more than once
    #[error("Node {0} appears more than once.")]
    DuplicateNode(NodeId),
    /// A parent label is not larger than the id of one of its children
    #[error("Parent {parent} must be labelled with a larger id than its child {child}.")]
    UnorderedLabel {
        /// Label of the parent
        parent: NodeId,
        /// Id of the child
        child: NodeId,
    },
    /// The cherries read from the newick string do not form a tree
    #[error(transparent)]
    InvalidTree(#[from] TreeError),
}

/// Writes an ancestry as a newick string.
///
/// The ancestry must be in construction order, as returned by
/// [`get_ancestry`](super::get_ancestry): the children of node `p` are
/// found in row `p - n_leaves`. Other ancestries are rejected, see
/// [`check_ancestry`](super::check_ancestry).
/// ```
/// use phylo2vec::tree::{build_newick, NewickFormat, TreeError};
///
/// let ancestry = vec![[0, 3, 4], [4, 2, 5], [5, 1, 6]];
///
/// assert_eq!(build_newick(&ancestry, NewickFormat::WithParents).unwrap(), "(((0,3)4,2)5,1)6;");
/// assert_eq!(build_newick(&ancestry, NewickFormat::NoParents).unwrap(), "(((0,3),2),1);");
///
/// assert_eq!(
///     build_newick(&vec![[0, 1, 3], [3, 2, 9]], NewickFormat::WithParents),
///     Err(TreeError::InvalidAncestry { row: 1 })
/// );
/// ```
pub fn build_newick(ancestry: &Ancestry, format: NewickFormat) -> Result<String, TreeError> {
    check_ancestry(ancestry)?;
    Ok(write_newick(ancestry, format))
}

/// Writes an ancestry that is known to be in construction order
pub(super) fn write_newick(ancestry: &Ancestry, format: NewickFormat) -> String {
    enum Token {
        Node(NodeId),
        Comma,
        Close(NodeId),
    }

    let n_leaves = ancestry.len() + 1;
    let Some(&[_, _, root]) = ancestry.last() else {
        return "0;".to_string();
    };

    let mut newick = String::with_capacity(8 * n_leaves);
    let mut stack = vec![Token::Node(root)];

    // Explicit stack instead of recursion: deep trees would overflow the call stack
    while let Some(token) = stack.pop() {
        match token {
            Token::Node(node) if node < n_leaves => newick.push_str(&node.to_string()),
            Token::Node(node) => {
                let [c1, c2, _] = ancestry[node - n_leaves];
                newick.push('(');
                stack.push(Token::Close(node));
                stack.push(Token::Node(c2));
                stack.push(Token::Comma);
                stack.push(Token::Node(c1));
            }
            Token::Comma => newick.push(','),
            Token::Close(node) => {
                newick.push(')');
                if format == NewickFormat::WithParents {
                    newick.push_str(&node.to_string());
                }
            }
        }
    }

    newick.push(';');
    newick
}

/// Parses the integer starting at `start`, returns it with the position right after it
fn parse_node(body: &str, start: usize) -> Result<(NodeId, usize), NewickParseError> {
    let end = body[start..]
        .find(|c: char| !c.is_ascii_digit())
        .map_or(body.len(), |offset| start + offset);
    Ok((body[start..end].parse()?, end))
}

/// Checks that leaves are exactly `0..n` and parent labels exactly `n..2n - 1`
fn check_nodes(leaves: &[NodeId], labels: &[NodeId]) -> Result<(), NewickParseError> {
    let n_leaves = leaves.len();
    let mut seen = FixedBitSet::with_capacity(2 * n_leaves - 1);

    for &leaf in leaves {
        if leaf >= n_leaves {
            return Err(NewickParseError::InvalidNode {
                node: leaf,
                n_leaves,
            });
        }
        if seen.put(leaf) {
            return Err(NewickParseError::DuplicateNode(leaf));
        }
    }

    for &label in labels {
        if label < n_leaves || label > 2 * n_leaves - 2 {
            return Err(NewickParseError::InvalidNode {
                node: label,
                n_leaves,
            });
        }
        if seen.put(label) {
            return Err(NewickParseError::DuplicateNode(label));
        }
    }

    Ok(())
}

/// Scans a newick string and returns its cherries in closing order
fn parse_cherries(newick: &str, format: NewickFormat) -> Result<Ancestry, NewickParseError> {
    let body = newick
        .trim_end()
        .strip_suffix(';')
        .ok_or(NewickParseError::NoClosingSemicolon)?;
    let bytes = body.as_bytes();

    let mut cherries = Ancestry::new();
    // Pending nodes, and the stack height at each open bracket
    let mut stack: Vec<NodeId> = Vec::new();
    let mut open_delimiters: Vec<usize> = Vec::new();
    let mut leaves: Vec<NodeId> = Vec::new();
    let mut labels: Vec<NodeId> = Vec::new();

    let mut expect_node = true;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'(' if expect_node => {
                open_delimiters.push(stack.len());
                i += 1;
            }
            b',' if !expect_node => {
                match open_delimiters.last() {
                    Some(&start) if stack.len() == start + 1 => {}
                    Some(_) => return Err(NewickParseError::NotBinary(i)),
                    None => return Err(NewickParseError::MultipleRoots),
                }
                expect_node = true;
                i += 1;
            }
            b')' if !expect_node => {
                let start = open_delimiters
                    .pop()
                    .ok_or(NewickParseError::NoSubtreeParent)?;
                if stack.len() != start + 2 {
                    return Err(NewickParseError::NotBinary(i));
                }
                let (Some(c2), Some(c1)) = (stack.pop(), stack.pop()) else {
                    return Err(NewickParseError::NotBinary(i));
                };
                i += 1;

                let has_label = bytes.get(i).is_some_and(u8::is_ascii_digit);
                match format {
                    NewickFormat::WithParents => {
                        if !has_label {
                            return Err(NewickParseError::MissingParentLabel(i));
                        }
                        let (parent, end) = parse_node(body, i)?;
                        let child = c1.max(c2);
                        if parent <= child {
                            return Err(NewickParseError::UnorderedLabel { parent, child });
                        }
                        labels.push(parent);
                        cherries.push([c1, c2, parent]);
                        stack.push(parent);
                        i = end;
                    }
                    NewickFormat::NoParents => {
                        if has_label {
                            return Err(NewickParseError::UnexpectedParentLabel(i));
                        }
                        // The smallest leaf stands in for the subtree
                        cherries.push([c1, c2, c1.max(c2)]);
                        stack.push(c1.min(c2));
                    }
                }
                expect_node = false;
            }
            b'0'..=b'9' if expect_node => {
                let (leaf, end) = parse_node(body, i)?;
                leaves.push(leaf);
                stack.push(leaf);
                i = end;
                expect_node = false;
            }
            _ => {
                let c = body[i..].chars().next().unwrap_or_default();
                return Err(NewickParseError::UnexpectedCharacter(c, i));
            }
        }
    }

    if !open_delimiters.is_empty() {
        return Err(NewickParseError::UnclosedBracket);
    }
    match stack.len() {
        0 => return Err(NewickParseError::IsEmpty),
        1 => {}
        _ => return Err(NewickParseError::MultipleRoots),
    }

    check_nodes(&leaves, &labels)?;

    Ok(cherries)
}

/// Gets all cherries `[child1, child2, parent]` of a newick string with
/// parent labels, in the order their subtrees close.
/// ```
/// use phylo2vec::tree::get_cherries;
///
/// let cherries = get_cherries("(((0,4)5,2)7,(1,3)6)8;").unwrap();
/// assert_eq!(cherries, vec![[0, 4, 5], [5, 2, 7], [1, 3, 6], [7, 6, 8]]);
///
/// assert!(get_cherries("(((0,4)5,2)7,(1,3)6)8").is_err());
/// ```
pub fn get_cherries(newick: &str) -> Result<Ancestry, NewickParseError> {
    parse_cherries(newick, NewickFormat::WithParents)
}

/// Gets all cherries of a newick string without parent labels, in the order
/// their subtrees close.
///
/// Each subtree is represented by its smallest leaf, so a cherry is
/// `[child1, child2, max(child1, child2)]`.
/// ```
/// use phylo2vec::tree::get_cherries_no_parents;
///
/// let cherries = get_cherries_no_parents("(((0,4),2),(1,3));").unwrap();
/// assert_eq!(cherries, vec![[0, 4, 4], [0, 2, 2], [1, 3, 3], [0, 1, 1]]);
/// ```
pub fn get_cherries_no_parents(newick: &str) -> Result<Ancestry, NewickParseError> {
    parse_cherries(newick, NewickFormat::NoParents)
}

/// Removes parent labels from a newick string.
/// Branch lengths and other annotations are kept.
/// ```
/// use phylo2vec::tree::remove_parent_labels;
///
/// assert_eq!(remove_parent_labels("(((2,1)4,0)5,3)6;"), "(((2,1),0),3);");
/// assert_eq!(remove_parent_labels("((2:0.1,1:0.2)4:0.3,0:1.0)5;"), "((2:0.1,1:0.2):0.3,0:1.0);");
/// ```
pub fn remove_parent_labels(newick: &str) -> String {
    let mut output = String::with_capacity(newick.len());
    let mut in_label = false;

    for c in newick.chars() {
        if in_label {
            if matches!(c, ',' | ')' | ';' | ':') {
                in_label = false;
            } else {
                continue;
            }
        }
        if c == ')' {
            in_label = true;
        }
        output.push(c);
    }

    output
}

/// Removes branch length annotations from a newick string.
/// ```
/// use phylo2vec::tree::remove_branch_length_annotations;
///
/// assert_eq!(
///     remove_branch_length_annotations("(((2:0.02,1:0.01),0:0.041),3:1.42);"),
///     "(((2,1),0),3);"
/// );
/// ```
pub fn remove_branch_length_annotations(newick: &str) -> String {
    let mut output = String::with_capacity(newick.len());
    let mut in_length = false;

    for c in newick.chars() {
        if c == ':' {
            in_length = true;
            continue;
        }
        if in_length {
            if matches!(c, ',' | ')' | ';') {
                in_length = false;
            } else {
                continue;
            }
        }
        output.push(c);
    }

    output
}

/// Counts the leaves of an integer newick string, i.e. the integers
/// directly following an opening bracket or a comma.
/// ```
/// use phylo2vec::tree::find_num_leaves;
///
/// assert_eq!(find_num_leaves("(((0,4)5,2)7,(1,3)6)8;"), 5);
/// assert_eq!(find_num_leaves("((0,2),1);"), 3);
/// assert_eq!(find_num_leaves("0;"), 1);
/// ```
pub fn find_num_leaves(newick: &str) -> usize {
    let starts_with_leaf = newick.bytes().next().is_some_and(|c| c.is_ascii_digit());

    newick
        .bytes()
        .tuple_windows()
        .filter(|(previous, c)| matches!(previous, b'(' | b',') && c.is_ascii_digit())
        .count()
        + usize::from(starts_with_leaf)
}
