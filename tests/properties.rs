use proptest::prelude::*;

use phylo2vec::tree::{
    add_leaf, build_newick, check_ancestry, check_v, get_ancestry, get_common_ancestor, remove_leaf,
    remove_parent_labels, to_newick, to_newick_no_parents, to_vector, to_vector_no_parents,
    NewickFormat, PhyloVec,
};

/// Valid vectors for trees with 2 to `max_leaves` leaves
fn vectors(max_leaves: usize) -> impl Strategy<Value = PhyloVec> {
    (2..=max_leaves).prop_flat_map(|n_leaves| {
        (0..n_leaves - 1)
            .map(|i| 0..=2 * i)
            .collect::<Vec<_>>()
    })
}

/// Labels internal nodes in the order their subtrees close
fn label_by_closing_order(newick: &str, n_leaves: usize) -> String {
    let mut labelled = String::with_capacity(2 * newick.len());
    let mut next_label = n_leaves;
    for c in newick.chars() {
        labelled.push(c);
        if c == ')' {
            labelled.push_str(&next_label.to_string());
            next_label += 1;
        }
    }
    labelled
}

proptest! {
    #[test]
    fn labelled_round_trip(v in vectors(200)) {
        prop_assert_eq!(to_vector(&to_newick(&v)).unwrap(), v);
    }

    #[test]
    fn unlabelled_round_trip(v in vectors(200)) {
        let newick = to_newick_no_parents(&v);
        prop_assert_eq!(&newick, &remove_parent_labels(&to_newick(&v)));
        prop_assert_eq!(to_vector_no_parents(&newick).unwrap(), v);
    }

    #[test]
    fn decoding_ignores_internal_labels(v in vectors(100)) {
        let relabelled = label_by_closing_order(&to_newick_no_parents(&v), v.len() + 1);
        prop_assert_eq!(to_vector(&relabelled).unwrap(), v);
    }

    #[test]
    fn decoding_ignores_child_order(v in vectors(100), swaps in prop::collection::vec(any::<bool>(), 100)) {
        let mut ancestry = get_ancestry(&v);
        for (row, swap) in ancestry.iter_mut().zip(swaps) {
            if swap {
                row.swap(0, 1);
            }
        }

        let with_parents = build_newick(&ancestry, NewickFormat::WithParents).unwrap();
        let no_parents = build_newick(&ancestry, NewickFormat::NoParents).unwrap();

        prop_assert_eq!(to_vector(&with_parents).unwrap(), v.clone());
        prop_assert_eq!(to_vector_no_parents(&no_parents).unwrap(), v);
    }

    #[test]
    fn remove_then_add_leaf(v in vectors(60), leaf_seed in any::<usize>()) {
        let leaf = leaf_seed % (v.len() + 1);
        let (removed, sister) = remove_leaf(&v, leaf).unwrap();
        prop_assert!(check_v(&removed).is_ok());
        prop_assert_eq!(removed.len(), v.len() - 1);

        let pos = if sister >= leaf { sister - 1 } else { sister };
        prop_assert_eq!(add_leaf(&removed, leaf, pos).unwrap(), v);
    }

    #[test]
    fn ancestry_is_a_binary_tree(v in vectors(200)) {
        let n_leaves = v.len() + 1;
        let ancestry = get_ancestry(&v);
        prop_assert!(check_ancestry(&ancestry).is_ok());
        prop_assert_eq!(ancestry.len(), n_leaves - 1);
        prop_assert_eq!(ancestry.last().map(|row| row[2]), Some(2 * n_leaves - 2));

        let mut seen_as_child = vec![0; 2 * n_leaves - 1];
        for (i, &[c1, c2, parent]) in ancestry.iter().enumerate() {
            prop_assert_eq!(parent, n_leaves + i);
            seen_as_child[c1] += 1;
            seen_as_child[c2] += 1;
        }
        prop_assert!(seen_as_child[..2 * n_leaves - 2].iter().all(|&count| count == 1));
        prop_assert_eq!(seen_as_child[2 * n_leaves - 2], 0);
    }

    #[test]
    fn common_ancestor_of_cherry(v in vectors(100)) {
        let root = 2 * v.len();
        for &[c1, c2, parent] in get_ancestry(&v).iter() {
            prop_assert_eq!(get_common_ancestor(&v, c1, c2).unwrap(), parent);
            prop_assert_eq!(get_common_ancestor(&v, c1, root).unwrap(), root);
        }
    }

    #[test]
    fn vector_bounds(v in vectors(50), index_seed in any::<usize>()) {
        let i = index_seed % v.len();
        let mut v = v;

        v[i] = 2 * i;
        prop_assert!(check_v(&v).is_ok());
        v[i] = 0;
        prop_assert!(check_v(&v).is_ok());
        v[i] = 2 * i + 1;
        prop_assert!(check_v(&v).is_err());
    }
}
