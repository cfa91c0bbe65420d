use crate::error::MTreeError;
use crate::metric::{distance, DistanceStats, Key, Phase};
use crate::Entry;

use super::ParentLink;

// d: distance from key to the leaf's parent route, 0 at the root
#[derive(Debug, Clone)]
pub(crate) struct DbEntry<K> {
    pub(crate) id: u64,
    pub(crate) key: K,
    pub(crate) d: f64,
}

// order carries no semantics; deletion swap-removes
#[derive(Debug)]
pub(crate) struct LeafNode<K> {
    pub(crate) entries: Vec<DbEntry<K>>,
    pub(crate) parent: ParentLink,
}

impl<K> LeafNode<K> {
    pub(crate) fn new() -> Self {
        LeafNode {
            entries: Vec::new(),
            parent: None,
        }
    }

    pub(crate) fn size(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_full(&self, leaf_cap: usize) -> bool {
        self.entries.len() >= leaf_cap
    }

    pub(crate) fn store_entry(
        &mut self,
        entry: DbEntry<K>,
        leaf_cap: usize,
    ) -> Result<usize, MTreeError> {
        if self.entries.len() >= leaf_cap {
            return Err(MTreeError::CapacityExceeded);
        }
        let index = self.entries.len();
        self.entries.push(entry);
        Ok(index)
    }

    pub(crate) fn get_entries(&self) -> Vec<DbEntry<K>>
    where
        K: Clone,
    {
        self.entries.clone()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    // split can land more than leaf_cap entries on one side of the pivot
    // when many keys coincide, so the post-split leaves skip the cap check
    pub(crate) fn push_unchecked(&mut self, entry: DbEntry<K>) {
        self.entries.push(entry);
    }
}

impl<K: Key> LeafNode<K> {
    fn distance_to_parent_route(
        &self,
        parent_key: Option<&K>,
        query: &K,
        stats: &DistanceStats,
        phase: Phase,
    ) -> f64 {
        match parent_key {
            Some(pk) => distance(pk, query, stats, phase),
            None => 0.0,
        }
    }

    pub(crate) fn select_entries(
        &self,
        parent_key: Option<&K>,
        query: &K,
        radius: f64,
        results: &mut Vec<Entry<K>>,
        stats: &DistanceStats,
    ) {
        let dp = self.distance_to_parent_route(parent_key, query, stats, Phase::Query);
        for e in &self.entries {
            if (dp - e.d).abs() > radius {
                continue;
            }
            let de = distance(&e.key, query, stats, Phase::Query);
            if de <= radius {
                results.push(Entry {
                    id: e.id,
                    key: e.key.clone(),
                });
            }
        }
    }

    pub(crate) fn delete_entry(
        &mut self,
        parent_key: Option<&K>,
        target: &K,
        stats: &DistanceStats,
    ) -> usize {
        let dp = self.distance_to_parent_route(parent_key, target, stats, Phase::Query);
        let mut removed = 0;
        let mut i = 0;
        while i < self.entries.len() {
            if dp != self.entries[i].d {
                i += 1;
                continue;
            }
            if distance(target, &self.entries[i].key, stats, Phase::Query) == 0.0 {
                self.entries.swap_remove(i);
                removed += 1;
                // do not advance i: swap_remove brought a new entry into this slot
            } else {
                i += 1;
            }
        }
        removed
    }
}
