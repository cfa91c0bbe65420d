use std::collections::VecDeque;

use crate::arena::NodeId;
use crate::error::MTreeError;
use crate::metric::{distance, DistanceStats, Key, Phase};

use super::ParentLink;

// d: distance from this pivot to the parent's own pivot, 0 at the root
#[derive(Debug, Clone)]
pub(crate) struct RoutingSlot<K> {
    pub(crate) id: u64,
    pub(crate) key: K,
    pub(crate) child: NodeId,
    pub(crate) cover_radius: f64,
    pub(crate) d: f64,
}

pub(crate) struct SelectedRoute<K> {
    pub(crate) index: usize,
    pub(crate) child: NodeId,
    pub(crate) key: K,
    pub(crate) dist: f64,
}

// None slot is vacant, standing in for the reference's sentinel child pointer
#[derive(Debug)]
pub(crate) struct InternalNode<K, const NROUTES: usize> {
    pub(crate) routes: [Option<RoutingSlot<K>>; NROUTES],
    pub(crate) n_routes: usize,
    pub(crate) parent: ParentLink,
}

impl<K, const NROUTES: usize> InternalNode<K, NROUTES> {
    pub(crate) fn new() -> Self {
        InternalNode {
            routes: std::array::from_fn(|_| None),
            n_routes: 0,
            parent: None,
        }
    }

    pub(crate) fn size(&self) -> usize {
        self.n_routes
    }

    pub(crate) fn is_full(&self) -> bool {
        self.n_routes >= NROUTES
    }

    pub(crate) fn get_route(&self, index: usize) -> Option<&RoutingSlot<K>> {
        self.routes[index].as_ref()
    }

    pub(crate) fn get_routes(&self) -> Vec<&RoutingSlot<K>> {
        self.routes.iter().filter_map(|r| r.as_ref()).collect()
    }

    pub(crate) fn store_route(&mut self, slot: RoutingSlot<K>) -> Result<usize, MTreeError> {
        if self.is_full() {
            return Err(MTreeError::CapacityExceeded);
        }
        let index = self
            .routes
            .iter()
            .position(|r| r.is_none())
            .expect("is_full() said there was room");
        self.routes[index] = Some(slot);
        self.n_routes += 1;
        Ok(index)
    }

    pub(crate) fn confirm_route(&mut self, slot: RoutingSlot<K>, index: usize) {
        if self.routes[index].is_none() {
            self.n_routes += 1;
        }
        self.routes[index] = Some(slot);
    }

    pub(crate) fn set_slot_child(&mut self, index: usize, child: NodeId) {
        self.routes[index]
            .as_mut()
            .expect("set_slot_child on a vacant slot")
            .child = child;
    }

    pub(crate) fn clear(&mut self) {
        for slot in self.routes.iter_mut() {
            *slot = None;
        }
        self.n_routes = 0;
    }
}

impl<K: Key, const NROUTES: usize> InternalNode<K, NROUTES> {
    // ties broken by lowest slot index; insert=true grows the winning slot's
    // cover radius if needed, the only place cover radii grow during descent
    pub(crate) fn select_route(
        &mut self,
        new_key: &K,
        insert: bool,
        stats: &DistanceStats,
    ) -> Result<SelectedRoute<K>, MTreeError> {
        let mut best: Option<(usize, f64)> = None;
        for (i, slot) in self.routes.iter().enumerate() {
            if let Some(r) = slot {
                let d = distance(new_key, &r.key, stats, Phase::Build);
                if best.map_or(true, |(_, bd)| d < bd) {
                    best = Some((i, d));
                }
            }
        }
        let (index, dist) = best.ok_or(MTreeError::EmptyNode)?;

        let slot = self.routes[index]
            .as_mut()
            .expect("index came from a just-observed occupied slot");
        if insert && dist > slot.cover_radius {
            slot.cover_radius = dist;
        }

        Ok(SelectedRoute {
            index,
            child: slot.child,
            key: slot.key.clone(),
            dist,
        })
    }

    pub(crate) fn select_routes(
        &self,
        parent_key: Option<&K>,
        query: &K,
        radius: f64,
        work_queue: &mut VecDeque<NodeId>,
        stats: &DistanceStats,
    ) {
        let dp = match parent_key {
            Some(pk) => distance(pk, query, stats, Phase::Query),
            None => 0.0,
        };
        for slot in self.routes.iter().flatten() {
            let bound = radius + slot.cover_radius;
            if (dp - slot.d).abs() > bound {
                continue;
            }
            let dq = distance(&slot.key, query, stats, Phase::Query);
            if dq <= bound {
                work_queue.push_back(slot.child);
            }
        }
    }
}
