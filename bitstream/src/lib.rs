//! MSB-first bit cursor used by entity sync trees.
//!
//! This crate provides [`BitWriter`] and [`BitReader`] for bit-level encoding and decoding,
//! including the sign-magnitude integers and fixed-point floats that sync-tree field groups
//! are packed with.
//!
//! # Design Principles
//!
//! - **No unsafe code** - Safety is paramount.
//! - **Bounded operations** - All reads/writes are bounds-checked.
//! - **No domain knowledge** - This crate knows nothing about entities, schemas, or clients.
//! - **Explicit errors** - All failures return structured errors, never panic.
//!
//! # Fixed-point encodings
//!
//! | Encoding | Layout | Decoded value |
//! |---|---|---|
//! | signed | sign bit, `n - 1` magnitude bits | `±magnitude` |
//! | float | `n` bits | `raw / (2^n - 1) * div` |
//! | signed float | signed `n` | `raw / (2^(n-1) - 1) * div` |
//!
//! # Example
//!
//! ```
//! use bitstream::{BitReader, BitWriter};
//!
//! let mut writer = BitWriter::new();
//! writer.write_bit(true);
//! writer.write_bits(42, 7).unwrap();
//! writer.write_signed(-3, 4).unwrap();
//!
//! let bytes = writer.finish();
//!
//! let mut reader = BitReader::new(&bytes);
//! assert!(reader.read_bit().unwrap());
//! assert_eq!(reader.read_bits(7).unwrap(), 42);
//! assert_eq!(reader.read_signed(4).unwrap(), -3);
//! ```

mod error;
mod reader;
mod writer;

pub use error::{BitError, BitResult};
pub use reader::BitReader;
pub use writer::BitWriter;

/// Largest raw value of an `n`-bit unsigned fixed-point field, as a float.
pub(crate) fn unsigned_scale(bits: u8) -> f32 {
    ((1u64 << bits) - 1) as f32
}

/// Largest magnitude of an `n`-bit signed fixed-point field, as a float.
pub(crate) fn signed_scale(bits: u8) -> f32 {
    ((1u64 << (bits - 1)) - 1) as f32
}
