//! Errors raised by graph queries

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// The closure was queried before `build()` or after a mutation.
    #[error("taxonomy graph is not built; call build() after the last mutation")]
    NotBuilt,
    /// The node was never registered, or was removed before the last build.
    #[error("node '{0}' is not part of the taxonomy graph")]
    NotFound(String),
}
