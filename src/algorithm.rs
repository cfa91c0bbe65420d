//! Split/promote, cover-radius maintenance, and the pruning traversals.
//! Free functions operating on `Tree` storage, kept out of `tree.rs` the
//! way the reference implementation keeps `tree_algorithm.rs` out of `BTree`.

use std::collections::VecDeque;
use std::mem::size_of;

use crate::arena::NodeId;
use crate::metric::{distance, DistanceStats, Key, Phase};
use crate::node::{DbEntry, InternalNode, LeafNode, Node, RoutingSlot};
use crate::tree::Tree;
use crate::Entry;

pub(crate) fn insert<K: Key, const NROUTES: usize, const LEAFCAP: usize>(
    tree: &mut Tree<K, NROUTES, LEAFCAP>,
    entry: Entry<K>,
) {
    match tree.root {
        None => {
            let mut leaf = LeafNode::new();
            leaf.store_entry(
                DbEntry {
                    id: entry.id,
                    key: entry.key,
                    d: 0.0,
                },
                LEAFCAP,
            )
            .expect("empty leaf always has room");
            tree.root = Some(tree.arena.insert(Node::Leaf(leaf)));
        }
        Some(root_id) => descend_and_insert(tree, root_id, entry),
    }
    tree.count += 1;
}

fn descend_and_insert<K: Key, const NROUTES: usize, const LEAFCAP: usize>(
    tree: &mut Tree<K, NROUTES, LEAFCAP>,
    mut node_id: NodeId,
    entry: Entry<K>,
) {
    let mut d = 0.0;
    loop {
        let descend_into = match tree.arena.get_mut(node_id) {
            Node::Internal(internal) => {
                let selected = internal
                    .select_route(&entry.key, true, &tree.stats)
                    .expect("a well-formed internal node always has an occupied slot");
                d = selected.dist;
                Some(selected.child)
            }
            Node::Leaf(_) => None,
        };

        match descend_into {
            Some(child) => node_id = child,
            None => {
                let leaf = tree.arena.get_mut(node_id).as_leaf_mut();
                if !leaf.is_full(LEAFCAP) {
                    leaf.store_entry(
                        DbEntry {
                            id: entry.id,
                            key: entry.key,
                            d,
                        },
                        LEAFCAP,
                    )
                    .expect("just checked capacity");
                } else {
                    split_leaf(
                        tree,
                        node_id,
                        DbEntry {
                            id: entry.id,
                            key: entry.key,
                            d,
                        },
                    );
                }
                return;
            }
        }
    }
}

// 5-iteration alternating farthest-point probe; the two slots end up
// holding the last two distinct probe endpoints.
fn promote<K: Key>(entries: &[DbEntry<K>], stats: &DistanceStats) -> (DbEntry<K>, DbEntry<K>) {
    debug_assert!(!entries.is_empty());

    let mut slots = [entries[0].clone(), entries[0].clone()];
    let mut pivot_key = entries[0].key.clone();
    let mut current = 0usize;

    const ITERATIONS: usize = 5;
    for _ in 0..ITERATIONS {
        let mut max_pos = 0usize;
        let mut max_d = 0.0f64;
        let mut found = false;
        for (j, e) in entries.iter().enumerate() {
            let d = distance(&pivot_key, &e.key, stats, Phase::Build);
            if d > max_d {
                max_pos = j;
                max_d = d;
                found = true;
            }
        }
        // found stays false only when every candidate coincides with the pivot
        let chosen = if found {
            entries[max_pos].clone()
        } else {
            entries[0].clone()
        };
        pivot_key = chosen.key.clone();
        current += 1;
        slots[current % 2] = chosen;
    }

    (slots[0].clone(), slots[1].clone())
}

// closest pivot wins, ties go to pivot 1
fn partition<K: Key>(
    entries: Vec<DbEntry<K>>,
    pivot1: &DbEntry<K>,
    pivot2: &DbEntry<K>,
    stats: &DistanceStats,
) -> (Vec<DbEntry<K>>, Vec<DbEntry<K>>, f64, f64) {
    let mut e1 = Vec::new();
    let mut e2 = Vec::new();
    let mut radius1 = 0.0f64;
    let mut radius2 = 0.0f64;

    for e in entries {
        let d1 = distance(&pivot1.key, &e.key, stats, Phase::Build);
        let d2 = distance(&pivot2.key, &e.key, stats, Phase::Build);
        if d1 <= d2 {
            radius1 = radius1.max(d1);
            e1.push(DbEntry {
                id: e.id,
                key: e.key,
                d: d1,
            });
        } else {
            radius2 = radius2.max(d2);
            e2.push(DbEntry {
                id: e.id,
                key: e.key,
                d: d2,
            });
        }
    }

    (e1, e2, radius1, radius2)
}

fn split_leaf<K: Key, const NROUTES: usize, const LEAFCAP: usize>(
    tree: &mut Tree<K, NROUTES, LEAFCAP>,
    leaf_id: NodeId,
    overflow_entry: DbEntry<K>,
) {
    let mut entries = tree.arena.get(leaf_id).as_leaf().get_entries();
    entries.push(overflow_entry);

    let (pivot1, pivot2) = promote(&entries, &tree.stats);
    let (e1, e2, radius1, radius2) = partition(entries, &pivot1, &pivot2, &tree.stats);

    let mut sibling = LeafNode::new();
    for e in e2 {
        sibling.push_unchecked(e);
    }
    let sibling_id = tree.arena.insert(Node::Leaf(sibling));

    {
        let original = tree.arena.get_mut(leaf_id).as_leaf_mut();
        original.clear();
        for e in e1 {
            original.push_unchecked(e);
        }
    }

    let robj1 = RoutingSlot {
        id: pivot1.id,
        key: pivot1.key,
        child: leaf_id,
        cover_radius: radius1,
        d: 0.0,
    };
    let robj2 = RoutingSlot {
        id: pivot2.id,
        key: pivot2.key,
        child: sibling_id,
        cover_radius: radius2,
        d: 0.0,
    };

    install_split(tree, leaf_id, robj1, robj2);
}

// Parent-full case grafts a fresh two-child internal under the split
// node's old slot without re-promoting the parent's other routes — see
// the open-question note in DESIGN.md, height balance is not preserved.
fn install_split<K: Key, const NROUTES: usize, const LEAFCAP: usize>(
    tree: &mut Tree<K, NROUTES, LEAFCAP>,
    original_id: NodeId,
    mut robj1: RoutingSlot<K>,
    robj2: RoutingSlot<K>,
) {
    match tree.arena.get(original_id).parent() {
        None => {
            let mut qnode: InternalNode<K, NROUTES> = InternalNode::new();
            let child1 = robj1.child;
            let child2 = robj2.child;
            let idx1 = qnode.store_route(robj1).expect("fresh node has room");
            let idx2 = qnode.store_route(robj2).expect("fresh node has room");
            let qnode_id = tree.arena.insert(Node::Internal(qnode));
            set_child_node(tree, qnode_id, idx1, child1);
            set_child_node(tree, qnode_id, idx2, child2);
            tree.root = Some(qnode_id);
        }
        Some((parent_id, original_slot)) => {
            let parent_full = tree.arena.get(parent_id).as_internal().is_full();
            if !parent_full {
                let grandparent_key = grandparent_route_key(tree, parent_id);
                robj1.d = match &grandparent_key {
                    Some(k) => distance(k, &robj1.key, &tree.stats, Phase::Build),
                    None => 0.0,
                };
                let mut robj2 = robj2;
                robj2.d = match &grandparent_key {
                    Some(k) => distance(k, &robj2.key, &tree.stats, Phase::Build),
                    None => 0.0,
                };

                let child1 = robj1.child;
                let child2 = robj2.child;
                tree.arena
                    .get_mut(parent_id)
                    .as_internal_mut()
                    .confirm_route(robj1, original_slot);
                set_child_node(tree, parent_id, original_slot, child1);

                let idx2 = tree
                    .arena
                    .get_mut(parent_id)
                    .as_internal_mut()
                    .store_route(robj2)
                    .expect("checked not full");
                set_child_node(tree, parent_id, idx2, child2);
            } else {
                let p_key = tree
                    .arena
                    .get(parent_id)
                    .as_internal()
                    .get_route(original_slot)
                    .expect("original_slot still holds the pre-split route")
                    .key
                    .clone();

                robj1.d = distance(&p_key, &robj1.key, &tree.stats, Phase::Build);
                let mut robj2 = robj2;
                robj2.d = distance(&p_key, &robj2.key, &tree.stats, Phase::Build);

                let child1 = robj1.child;
                let child2 = robj2.child;
                let mut qnode: InternalNode<K, NROUTES> = InternalNode::new();
                let idx1 = qnode.store_route(robj1).expect("fresh node has room");
                let idx2 = qnode.store_route(robj2).expect("fresh node has room");
                let qnode_id = tree.arena.insert(Node::Internal(qnode));
                set_child_node(tree, qnode_id, idx1, child1);
                set_child_node(tree, qnode_id, idx2, child2);

                set_child_node(tree, parent_id, original_slot, qnode_id);
            }
        }
    }
}

// must run even when the slot's subtree id is unchanged, or the back-pointer
// goes stale and later pruning distance lookups get misled
fn set_child_node<K: Key, const NROUTES: usize, const LEAFCAP: usize>(
    tree: &mut Tree<K, NROUTES, LEAFCAP>,
    parent_id: NodeId,
    slot_index: usize,
    child_id: NodeId,
) {
    tree.arena
        .get_mut(parent_id)
        .as_internal_mut()
        .set_slot_child(slot_index, child_id);
    tree.arena
        .get_mut(child_id)
        .set_parent(Some((parent_id, slot_index)));
}

fn grandparent_route_key<K: Key, const NROUTES: usize, const LEAFCAP: usize>(
    tree: &Tree<K, NROUTES, LEAFCAP>,
    parent_id: NodeId,
) -> Option<K> {
    tree.arena.get(parent_id).parent().map(|(gp_id, gp_slot)| {
        tree.arena
            .get(gp_id)
            .as_internal()
            .get_route(gp_slot)
            .expect("back-pointer must reference an occupied slot")
            .key
            .clone()
    })
}

pub(crate) fn parent_route_key<K: Key, const NROUTES: usize, const LEAFCAP: usize>(
    tree: &Tree<K, NROUTES, LEAFCAP>,
    node_id: NodeId,
) -> Option<K> {
    tree.arena.get(node_id).parent().map(|(pid, slot)| {
        tree.arena
            .get(pid)
            .as_internal()
            .get_route(slot)
            .expect("back-pointer must reference an occupied slot")
            .key
            .clone()
    })
}

pub(crate) fn range_query<K: Key, const NROUTES: usize, const LEAFCAP: usize>(
    tree: &Tree<K, NROUTES, LEAFCAP>,
    query: &K,
    radius: f64,
) -> Vec<Entry<K>> {
    let mut results = Vec::new();
    let mut work_queue: VecDeque<NodeId> = VecDeque::new();
    if let Some(root) = tree.root {
        work_queue.push_back(root);
    }

    while let Some(node_id) = work_queue.pop_front() {
        let parent_key = parent_route_key(tree, node_id);
        match tree.arena.get(node_id) {
            Node::Internal(internal) => {
                internal.select_routes(
                    parent_key.as_ref(),
                    query,
                    radius,
                    &mut work_queue,
                    &tree.stats,
                );
            }
            Node::Leaf(leaf) => {
                leaf.select_entries(parent_key.as_ref(), query, radius, &mut results, &tree.stats);
            }
        }
    }

    results
}

// single-path descent: a match in a subtree select_route didn't choose is not found
pub(crate) fn delete_entry<K: Key, const NROUTES: usize, const LEAFCAP: usize>(
    tree: &mut Tree<K, NROUTES, LEAFCAP>,
    target: &K,
) -> usize {
    let mut node_id = match tree.root {
        Some(id) => id,
        None => return 0,
    };

    loop {
        let next = match tree.arena.get_mut(node_id) {
            Node::Internal(internal) => {
                let selected = internal
                    .select_route(target, false, &tree.stats)
                    .expect("a well-formed internal node always has an occupied slot");
                Some(selected.child)
            }
            Node::Leaf(_) => None,
        };
        match next {
            Some(child) => node_id = child,
            None => break,
        }
    }

    let parent_key = parent_route_key(tree, node_id);
    let removed = tree
        .arena
        .get_mut(node_id)
        .as_leaf_mut()
        .delete_entry(parent_key.as_ref(), target, &tree.stats);
    tree.count -= removed;
    removed
}

pub(crate) fn clear<K, const NROUTES: usize, const LEAFCAP: usize>(
    tree: &mut Tree<K, NROUTES, LEAFCAP>,
) {
    // the reference walks a work queue deleting nodes one at a time; our
    // nodes have no storage outside the arena, so one clear() reaches the
    // same end state without the traversal
    tree.arena.clear();
    tree.root = None;
    tree.count = 0;
}

pub(crate) fn memory_usage<K, const NROUTES: usize, const LEAFCAP: usize>(
    tree: &Tree<K, NROUTES, LEAFCAP>,
) -> usize {
    let mut n_internal = 0usize;
    let mut n_leaf = 0usize;
    for node in tree.arena.iter() {
        match node {
            Node::Internal(_) => n_internal += 1,
            Node::Leaf(_) => n_leaf += 1,
        }
    }

    n_internal * size_of::<InternalNode<K, NROUTES>>()
        + n_leaf * size_of::<LeafNode<K>>()
        + tree.count * size_of::<DbEntry<K>>()
        + size_of::<Tree<K, NROUTES, LEAFCAP>>()
}
