//! Schema validation errors.

use thiserror::Error;

/// Result type for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors that can occur when building or validating a schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// The root of a schema must be a branch.
    #[error("schema `{schema}` root must be a branch")]
    RootNotBranch { schema: &'static str },

    /// The same field-group type is declared by more than one leaf.
    #[error("schema `{schema}` declares field group `{group}` more than once")]
    DuplicateFieldGroup {
        schema: &'static str,
        group: &'static str,
    },

    /// Leaf payload capacity must be between 1 and 1024 bytes.
    #[error("field group `{group}` has invalid capacity {capacity} bytes")]
    InvalidCapacity { group: &'static str, capacity: u16 },

    /// A schema may declare at most `u16::MAX` leaves.
    #[error("schema `{schema}` declares too many leaves ({count})")]
    TooManyLeaves { schema: &'static str, count: usize },
}
