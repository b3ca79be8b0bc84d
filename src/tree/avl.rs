//! Order statistics tree used to build the pairs of a Phylo2Vec vector.
//!
//! The tree is an AVL tree keyed by position rather than by value: inserting
//! at index `i` makes the new element the `i`-th element of the in-order
//! sequence. Nodes live in an arena and refer to each other by index.

use super::Pair;

#[derive(Debug, Clone)]
struct AvlNode {
    value: Pair,
    left: Option<usize>,
    right: Option<usize>,
    /// Height of the subtree rooted at this node
    height: usize,
    /// Number of nodes in the subtree rooted at this node
    size: usize,
}

impl AvlNode {
    fn new(value: Pair) -> Self {
        Self {
            value,
            left: None,
            right: None,
            height: 1,
            size: 1,
        }
    }
}

/// A balanced binary tree indexed by position, storing [`Pair`] objects.
///
/// # Example
/// ```
/// use phylo2vec::tree::AvlTree;
///
/// let mut tree = AvlTree::new();
/// tree.insert(0, (0, 1));
/// tree.insert(0, (0, 2));
/// tree.insert(1, (0, 3));
///
/// assert_eq!(tree.lookup(1), (0, 3));
/// assert_eq!(tree.get_pairs(), vec![(0, 2), (0, 3), (0, 1)]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct AvlTree {
    nodes: Vec<AvlNode>,
    root: Option<usize>,
}

impl AvlTree {
    /// Creates a new empty tree
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            root: None,
        }
    }

    /// Creates an empty tree with room for `capacity` pairs
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            root: None,
        }
    }

    /// Number of pairs stored in the tree
    pub fn len(&self) -> usize {
        self.size(self.root)
    }

    /// Returns `true` if the tree holds no pairs
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Height of the tree, 0 if it is empty
    pub fn height(&self) -> usize {
        self.height_of(self.root)
    }

    /// Inserts `value` so that it becomes the element at position `index`.
    /// Indices past the end append the value.
    pub fn insert(&mut self, index: usize, value: Pair) {
        let root = self.insert_by_index(self.root, index, value);
        self.root = Some(root);
    }

    /// Returns the pair at position `index`, or `(0, 0)` if the index is out of bounds.
    pub fn lookup(&self, index: usize) -> Pair {
        let mut current = self.root;
        let mut index = index;
        while let Some(idx) = current {
            let node = &self.nodes[idx];
            let left_size = self.size(node.left);
            if index < left_size {
                current = node.left;
            } else if index == left_size {
                return node.value;
            } else {
                index -= left_size + 1;
                current = node.right;
            }
        }

        (0, 0)
    }

    /// Returns all pairs in position order
    pub fn get_pairs(&self) -> Vec<Pair> {
        let mut pairs = Vec::with_capacity(self.len());
        let mut stack = Vec::new();
        let mut current = self.root;

        while current.is_some() || !stack.is_empty() {
            while let Some(idx) = current {
                stack.push(idx);
                current = self.nodes[idx].left;
            }
            if let Some(idx) = stack.pop() {
                pairs.push(self.nodes[idx].value);
                current = self.nodes[idx].right;
            }
        }

        pairs
    }

    fn height_of(&self, node: Option<usize>) -> usize {
        node.map_or(0, |idx| self.nodes[idx].height)
    }

    fn size(&self, node: Option<usize>) -> usize {
        node.map_or(0, |idx| self.nodes[idx].size)
    }

    fn balance_factor(&self, node: Option<usize>) -> isize {
        match node {
            None => 0,
            Some(idx) => {
                self.height_of(self.nodes[idx].left) as isize
                    - self.height_of(self.nodes[idx].right) as isize
            }
        }
    }

    fn update(&mut self, idx: usize) {
        let (left, right) = (self.nodes[idx].left, self.nodes[idx].right);
        self.nodes[idx].height = 1 + self.height_of(left).max(self.height_of(right));
        self.nodes[idx].size = 1 + self.size(left) + self.size(right);
    }

    fn right_rotate(&mut self, y: usize) -> usize {
        let Some(x) = self.nodes[y].left else {
            return y;
        };
        let t2 = self.nodes[x].right;
        self.nodes[x].right = Some(y);
        self.nodes[y].left = t2;
        self.update(y);
        self.update(x);
        x
    }

    fn left_rotate(&mut self, x: usize) -> usize {
        let Some(y) = self.nodes[x].right else {
            return x;
        };
        let t2 = self.nodes[y].left;
        self.nodes[y].left = Some(x);
        self.nodes[x].right = t2;
        self.update(x);
        self.update(y);
        y
    }

    fn rebalance(&mut self, idx: usize) -> usize {
        let balance = self.balance_factor(Some(idx));

        if balance > 1 {
            let left = self.nodes[idx].left;
            // Left Right case
            if self.balance_factor(left) < 0 {
                if let Some(left) = left {
                    let new_left = self.left_rotate(left);
                    self.nodes[idx].left = Some(new_left);
                }
            }
            return self.right_rotate(idx);
        }

        if balance < -1 {
            let right = self.nodes[idx].right;
            // Right Left case
            if self.balance_factor(right) > 0 {
                if let Some(right) = right {
                    let new_right = self.right_rotate(right);
                    self.nodes[idx].right = Some(new_right);
                }
            }
            return self.left_rotate(idx);
        }

        idx
    }

    fn insert_by_index(&mut self, node: Option<usize>, index: usize, value: Pair) -> usize {
        let Some(idx) = node else {
            self.nodes.push(AvlNode::new(value));
            return self.nodes.len() - 1;
        };

        let left_size = self.size(self.nodes[idx].left);
        if index <= left_size {
            let left = self.insert_by_index(self.nodes[idx].left, index, value);
            self.nodes[idx].left = Some(left);
        } else {
            let right =
                self.insert_by_index(self.nodes[idx].right, index - left_size - 1, value);
            self.nodes[idx].right = Some(right);
        }

        self.update(idx);
        self.rebalance(idx)
    }
}
