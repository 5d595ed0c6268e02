//! Engine errors.

use bitstream::BitError;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors surfaced by sync-tree operations.
///
/// Malformed inbound data is never an error; it is recorded in a
/// [`ParseReport`](crate::ParseReport) instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The tree's schema does not declare the requested field group.
    #[error("field group `{group}` is not part of schema `{schema}`")]
    UnknownFieldGroup {
        schema: &'static str,
        group: &'static str,
    },

    /// Server-authored content does not fit the leaf.
    #[error("encoded `{group}` is {bits} bits, capacity is {capacity} bits")]
    PayloadTooLarge {
        group: &'static str,
        bits: usize,
        capacity: usize,
    },

    /// Bit-level failure while encoding.
    #[error(transparent)]
    Bit(#[from] BitError),
}
