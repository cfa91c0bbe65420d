//! A dynamic, paged, balanced index over a generic metric space.
//!
//! Given any key type equipped with a [`metric::Key::distance`] satisfying
//! the triangle inequality, [`Tree`] supports insertion and range search in
//! sub-linear expected distance evaluations by pruning subtrees whose cover
//! radii cannot overlap the query ball.
//!
//! This crate is the core index only: no persistence, no concurrent access,
//! no nearest-neighbor query, and no rebalancing on delete. See
//! [`Tree::delete`] and [`Tree::range_query`] for what is and isn't
//! guaranteed.

mod algorithm;
mod arena;
pub mod error;
pub mod metric;
mod node;
mod tree;

pub use error::MTreeError;
pub use metric::{DistanceStats, Key};
pub use tree::Tree;

/// A caller-visible record: a stable id paired with a key from the metric
/// domain. This is the external view both of what gets inserted and of
/// what a range query returns.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry<K> {
    pub id: u64,
    pub key: K,
}

impl<K> Entry<K> {
    pub fn new(id: u64, key: K) -> Self {
        Entry { id, key }
    }
}
