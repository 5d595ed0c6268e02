//! Runtime sync trees for entity state replication.
//!
//! A [`SyncTree`] is one live instance of an [`EntitySchema`](schema::EntitySchema)
//! bound to a networked entity. The owning client's packets are parsed into
//! per-leaf payload buffers; outbound snapshots are unparsed per target client,
//! sending only the leaves that client has not yet acknowledged.
//!
//! # Wire format
//!
//! ```text
//! [obj-type bit, update/migrate only] [gated tree bits ...]
//! participating leaf: [13-bit length L] [L payload bits]
//! ```
//!
//! Nodes whose gate fails contribute zero bits.
//!
//! # Design Principles
//!
//! - **One lock per tree** - Parse, unparse and visit are mutually exclusive on a tree.
//! - **Degrade, don't abort** - Malformed leaves are clamped and reported, never fatal.
//! - **Acks are per leaf, per client** - Cleared together on change, set one at a time on send.
//! - **Typed access through the registry** - Absent field groups are `None`, not errors.

mod client;
mod config;
mod context;
mod error;
mod leaf;
mod lock;
mod tree;

pub use client::{ClientSet, ClientSlot, MAX_CLIENTS};
pub use config::{ChangePolicy, EngineConfig};
pub use context::{ParseContext, ParseReport, UnparseContext};
pub use error::{EngineError, EngineResult};
pub use leaf::{LENGTH_PREFIX_BITS, MAX_PAYLOAD_BITS};
pub use tree::{LeafInfo, LeafView, NodeRef, NodeRefKind, SyncTree};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_api_exports() {
        let _ = EngineConfig::default();
        let _ = ClientSet::new();
        let _ = ParseReport::default();
        let _: EngineResult<()> = Ok(());
        assert_eq!(LENGTH_PREFIX_BITS, 13);
        assert_eq!(MAX_PAYLOAD_BITS, 8191);
        assert_eq!(MAX_CLIENTS, 2048);
    }

    #[test]
    fn tree_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SyncTree>();
    }
}
