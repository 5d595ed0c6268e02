//! Errors for entity-kind lookups.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NodesError {
    /// Wire value outside the known entity kinds.
    #[error("unknown entity kind {0}")]
    UnknownKind(u8),

    #[error("unknown entity kind name `{0}`")]
    UnknownKindName(String),
}
