//! Gated schema trees for entity sync trees.
//!
//! This crate defines the static shape of replicated entity state:
//! - [`GateMask`] and [`SyncType`], which decide whether a node takes part in an operation
//! - [`NodeDef`] builders ([`branch`], [`leaf`]) that describe an entity kind's tree
//! - [`EntitySchema`], the flattened, validated form with a [`FieldRegistry`]
//! - [`SerializeNode`], the symmetric serializer field-group content is written against
//! - Deterministic schema hashing
//!
//! # Design Principles
//!
//! - **Schemas are data** - Each entity kind is a builder function, flattened once at startup.
//! - **O(1) typed lookup** - The registry maps field-group types to stable leaf slots.
//! - **One layout, two directions** - Content is described once and drives both decode and encode.
//! - **Deterministic hashing** - Schema hash is stable given the same definition.

mod error;
mod field;
mod gate;
mod hash;
mod schema;

pub use error::{SchemaError, SchemaResult};
pub use field::{
    FieldGroup, GameBuild, NodeData, NodeReader, NodeWriter, Packable, SerializeNode, Serializer,
};
pub use gate::{masks, GateMask, SyncType};
pub use hash::schema_hash;
pub use schema::{
    branch, leaf, EntitySchema, FieldRegistry, LeafDef, LeafSlot, LeafSpec, NodeDef, NodeIndex,
    SchemaNode, SchemaNodeKind, MAX_LEAF_CAPACITY,
};
