use std::sync::atomic::{AtomicU64, Ordering};

/// The contract a key type must satisfy to be indexed by [`crate::Tree`].
///
/// `distance` must be symmetric, non-negative, zero iff the two keys are
/// equal, and must respect the triangle inequality. The pruning filters in
/// [`crate::node`] rely on these properties for correctness; a metric that
/// violates them yields undefined query results, not a panic.
pub trait Key: Clone {
    fn distance(&self, other: &Self) -> f64;
}

/// Per-tree counters of distance evaluations, split by whether the call
/// happened while building the tree (insert/split) or while answering a
/// query (range search, delete). Resettable by the caller.
///
/// This replaces the reference implementation's per-key-type static
/// counters: a counter that belongs to one `Tree` instance composes with
/// multiple trees and multiple threads holding independent trees, whereas a
/// `static` keyed only on `T` would silently pool counts across unrelated
/// trees that happen to share a key type.
#[derive(Debug, Default)]
pub struct DistanceStats {
    build_ops: AtomicU64,
    query_ops: AtomicU64,
}

/// Which phase a distance evaluation happened in, for [`DistanceStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Build,
    Query,
}

impl DistanceStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&self, phase: Phase) {
        match phase {
            Phase::Build => self.record_build(),
            Phase::Query => self.record_query(),
        }
    }

    pub fn build_ops(&self) -> u64 {
        self.build_ops.load(Ordering::Relaxed)
    }

    pub fn query_ops(&self) -> u64 {
        self.query_ops.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.build_ops.store(0, Ordering::Relaxed);
        self.query_ops.store(0, Ordering::Relaxed);
    }

    pub(crate) fn record_build(&self) {
        self.build_ops.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_query(&self) {
        self.query_ops.fetch_add(1, Ordering::Relaxed);
    }
}

/// Evaluate the metric between two keys, tallying the call against `stats`.
/// Every distance evaluation in the tree (descent, split, pruning) goes
/// through this so the build/query counters stay accurate without touching
/// a process-global.
pub(crate) fn distance<K: Key>(a: &K, b: &K, stats: &DistanceStats, phase: Phase) -> f64 {
    stats.record(phase);
    a.distance(b)
}
