//! World errors.

use engine::EngineError;
use nodes::{EntityKind, NodesError};
use thiserror::Error;

/// Result type for world operations.
pub type WorldResult<T> = Result<T, WorldError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorldError {
    /// Orphan mode outside the known values.
    #[error("invalid orphan mode {0}")]
    InvalidOrphanMode(u8),

    #[error("no entity for object id {object_id}")]
    UnknownObject { object_id: u16 },

    /// A live entity already occupies the object id.
    #[error("object id {object_id} is already in use")]
    ObjectInUse { object_id: u16 },

    /// A clone create named a different kind than the existing entity.
    #[error("object {object_id} is a {existing}, not a {requested}")]
    KindMismatch {
        object_id: u16,
        existing: EntityKind,
        requested: EntityKind,
    },

    /// A client touched an entity owned by someone else.
    #[error("client {net_id} does not own object {object_id}")]
    NotOwner { net_id: u32, object_id: u16 },

    /// Object ids are 13 bits wide.
    #[error("object id {0} is out of range")]
    ObjectIdOutOfRange(u16),

    #[error("script handle pool is full ({capacity} entries)")]
    HandlePoolExhausted { capacity: usize },

    #[error(transparent)]
    Kind(#[from] NodesError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}
