use thiserror::Error;

/// Internal error conditions that a well-formed tree should never produce.
///
/// These never escape the public [`crate::Tree`] surface on well-formed
/// inputs; reaching one of these indicates a logic bug in the tree itself
/// rather than a caller mistake, and callers should treat it as fatal.
///
/// The reference implementation also carries an `unknown-node-kind` error,
/// raised when a runtime type tag on a node fails to match either node
/// variant. Nodes here are a plain Rust enum matched exhaustively by the
/// compiler, so that discriminant mismatch cannot occur and the variant is
/// dropped rather than kept around as permanently unreachable.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MTreeError {
    #[error("node is at capacity")]
    CapacityExceeded,
    #[error("internal node has no occupied routing slots")]
    EmptyNode,
}
