//! The public index type. Mirrors the reference implementation's `BTree`:
//! a thin struct whose methods are one-line delegations into the free
//! functions of [`crate::algorithm`], which hold the actual tree surgery.

use crate::algorithm;
use crate::arena::{Arena, NodeId};
use crate::metric::{DistanceStats, Key};
use crate::node::Node;
use crate::Entry;

/// A dynamic, paged, balanced index over a generic metric space.
///
/// `NROUTES` bounds how many routing slots an internal node holds;
/// `LEAFCAP` bounds how many entries a leaf holds. Both are fixed at
/// construction via const generics so every node's storage is an inline
/// array rather than a heap-allocated, separately-capacity-tracked buffer.
///
/// No entry is ever removed except through [`Tree::delete`], and no
/// rebalancing happens on delete: the tree can only grow taller, never
/// shrink, over its lifetime. See the crate's top-level docs for what this
/// does and doesn't guarantee.
pub struct Tree<K, const NROUTES: usize, const LEAFCAP: usize> {
    pub(crate) arena: Arena<Node<K, NROUTES>>,
    pub(crate) root: Option<NodeId>,
    pub(crate) count: usize,
    pub(crate) stats: DistanceStats,
}

impl<K: Key, const NROUTES: usize, const LEAFCAP: usize> Tree<K, NROUTES, LEAFCAP> {
    /// Builds an empty tree. Panics if `NROUTES < 2` or `LEAFCAP < 1`, since
    /// no split can produce a usable tree below those bounds.
    pub fn new() -> Self {
        assert!(NROUTES >= 2, "an internal node needs at least 2 routes");
        assert!(LEAFCAP >= 1, "a leaf needs at least 1 slot");
        Tree {
            arena: Arena::new(),
            root: None,
            count: 0,
            stats: DistanceStats::new(),
        }
    }

    /// Number of entries currently stored.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Inserts `entry`, descending via the closest-pivot rule and growing
    /// cover radii along the path, splitting the target leaf if it's full.
    pub fn insert(&mut self, entry: Entry<K>) {
        algorithm::insert(self, entry);
    }

    /// Returns every stored entry within `radius` of `query`, pruning
    /// subtrees whose cover radius cannot reach the query ball.
    pub fn range_query(&self, query: &K, radius: f64) -> Vec<Entry<K>> {
        algorithm::range_query(self, query, radius)
    }

    /// Removes every stored entry whose key is exactly `target` reachable
    /// along the single closest-pivot descent path, returning how many were
    /// removed. A key that also occurs in a subtree `select_route` didn't
    /// choose is not found — delete does not fan out the way range query
    /// does.
    pub fn delete(&mut self, target: &K) -> usize {
        algorithm::delete_entry(self, target)
    }

    /// Empties the tree, releasing every node.
    pub fn clear(&mut self) {
        algorithm::clear(self);
    }

    /// A rough byte estimate of the tree's resident storage: node and entry
    /// counts times their in-memory sizes, not a precise allocator tally.
    pub fn memory_usage(&self) -> usize {
        algorithm::memory_usage(self)
    }

    /// Distance-evaluation counters for this tree instance, split by
    /// build-time (insert/split) and query-time (range query/delete) phase.
    pub fn stats(&self) -> &DistanceStats {
        &self.stats
    }
}

impl<K: Key, const NROUTES: usize, const LEAFCAP: usize> Default for Tree<K, NROUTES, LEAFCAP> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm;
    use quickcheck_macros::quickcheck;
    use std::collections::BTreeSet;

    #[derive(Debug, Clone, PartialEq)]
    struct Scalar(f64);

    impl Key for Scalar {
        fn distance(&self, other: &Self) -> f64 {
            (self.0 - other.0).abs()
        }
    }

    #[test]
    fn empty_tree_has_no_entries() {
        let tree: Tree<Scalar, 4, 4> = Tree::new();
        assert_eq!(tree.len(), 0);
        assert!(tree.is_empty());
        assert!(tree.range_query(&Scalar(0.0), 100.0).is_empty());
    }

    #[test]
    fn single_insert_is_found_by_range_query() {
        let mut tree: Tree<Scalar, 4, 4> = Tree::new();
        tree.insert(Entry::new(1, Scalar(5.0)));
        assert_eq!(tree.len(), 1);
        let found = tree.range_query(&Scalar(5.0), 0.0);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, 1);
    }

    #[test]
    fn insert_past_leaf_capacity_triggers_split_and_all_entries_survive() {
        let mut tree: Tree<Scalar, 4, 4> = Tree::new();
        for i in 0..64u64 {
            tree.insert(Entry::new(i, Scalar(i as f64)));
        }
        assert_eq!(tree.len(), 64);
        let found = tree.range_query(&Scalar(0.0), 1000.0);
        assert_eq!(found.len(), 64);
    }

    #[test]
    fn delete_removes_matching_entry() {
        let mut tree: Tree<Scalar, 4, 4> = Tree::new();
        for i in 0..32u64 {
            tree.insert(Entry::new(i, Scalar(i as f64)));
        }
        let removed = tree.delete(&Scalar(10.0));
        assert_eq!(removed, 1);
        assert_eq!(tree.len(), 31);
        let found = tree.range_query(&Scalar(10.0), 0.0);
        assert!(found.is_empty());
    }

    #[test]
    fn clear_empties_tree() {
        let mut tree: Tree<Scalar, 4, 4> = Tree::new();
        for i in 0..20u64 {
            tree.insert(Entry::new(i, Scalar(i as f64)));
        }
        tree.clear();
        assert_eq!(tree.len(), 0);
        assert!(tree.range_query(&Scalar(0.0), 1000.0).is_empty());
    }

    #[test]
    fn range_query_excludes_entries_outside_radius() {
        let mut tree: Tree<Scalar, 4, 4> = Tree::new();
        for i in 0..40u64 {
            tree.insert(Entry::new(i, Scalar(i as f64)));
        }
        let found = tree.range_query(&Scalar(0.0), 5.0);
        assert!(found.iter().all(|e| e.key.0 <= 5.0));
        assert!(found.len() >= 6);
    }

    #[quickcheck]
    fn qc_every_inserted_key_is_found_at_radius_zero(xs: Vec<i32>) -> bool {
        let mut tree: Tree<Scalar, 4, 8> = Tree::new();
        let mut reference: BTreeSet<i64> = BTreeSet::new();

        for (i, x) in xs.iter().enumerate() {
            tree.insert(Entry::new(i as u64, Scalar(*x as f64)));
            reference.insert(*x as i64);
        }

        reference.iter().all(|k| {
            tree.range_query(&Scalar(*k as f64), 0.0)
                .iter()
                .any(|e| e.key.0 == *k as f64)
        })
    }

    #[quickcheck]
    fn qc_size_matches_insert_count(xs: Vec<i32>) -> bool {
        let mut tree: Tree<Scalar, 4, 8> = Tree::new();
        for (i, x) in xs.iter().enumerate() {
            tree.insert(Entry::new(i as u64, Scalar(*x as f64)));
        }
        tree.len() == xs.len()
    }

    const EPS: f64 = 1e-9;

    fn collect_keys<K: Key, const NR: usize, const LC: usize>(
        tree: &Tree<K, NR, LC>,
        id: NodeId,
        out: &mut Vec<K>,
    ) {
        match tree.arena.get(id) {
            Node::Leaf(leaf) => out.extend(leaf.entries.iter().map(|e| e.key.clone())),
            Node::Internal(internal) => {
                for slot in internal.routes.iter().flatten() {
                    collect_keys(tree, slot.child, out);
                }
            }
        }
    }

    // Invariant 1 (containment) and invariant 2 (stored-distance fidelity)
    // from the spec's Testable Properties, checked by walking the arena
    // directly rather than through the public API.
    fn check_containment_and_distance_fidelity<K: Key, const NR: usize, const LC: usize>(
        tree: &Tree<K, NR, LC>,
        id: NodeId,
    ) {
        let parent_key = algorithm::parent_route_key(tree, id);
        match tree.arena.get(id) {
            Node::Leaf(leaf) => {
                for e in &leaf.entries {
                    let expected = parent_key.as_ref().map_or(0.0, |pk| pk.distance(&e.key));
                    assert!((e.d - expected).abs() < EPS, "DbEntry.d fidelity violated");
                }
            }
            Node::Internal(internal) => {
                for slot in internal.routes.iter().flatten() {
                    let expected = parent_key.as_ref().map_or(0.0, |pk| pk.distance(&slot.key));
                    assert!((slot.d - expected).abs() < EPS, "RoutingSlot.d fidelity violated");

                    let mut descendants = Vec::new();
                    collect_keys(tree, slot.child, &mut descendants);
                    for k in &descendants {
                        assert!(
                            slot.key.distance(k) <= slot.cover_radius + EPS,
                            "containment violated"
                        );
                    }

                    check_containment_and_distance_fidelity(tree, slot.child);
                }
            }
        }
    }

    #[test]
    fn containment_and_distance_fidelity_hold_after_many_inserts() {
        let mut tree: Tree<Scalar, 2, 4> = Tree::new();
        for i in 0..300u64 {
            let key = ((i.wrapping_mul(2654435761)) % 1000) as f64;
            tree.insert(Entry::new(i, Scalar(key)));
        }

        if let Some(root) = tree.root {
            check_containment_and_distance_fidelity(&tree, root);
        }
    }
}
