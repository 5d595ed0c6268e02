//! Connected clients as seen by the world.

use std::sync::atomic::{AtomicU32, Ordering};

use engine::ClientSlot;

/// A connected client.
///
/// Shared as `Arc<Client>`; entities only keep weak references to their
/// owners so a dropped client never stays alive through the registry.
#[derive(Debug)]
pub struct Client {
    net_id: u32,
    slot: ClientSlot,
    name: String,
    routing_bucket: AtomicU32,
}

impl Client {
    #[must_use]
    pub fn new(net_id: u32, slot: ClientSlot, name: impl Into<String>) -> Self {
        Self {
            net_id,
            slot,
            name: name.into(),
            routing_bucket: AtomicU32::new(0),
        }
    }

    #[must_use]
    pub const fn net_id(&self) -> u32 {
        self.net_id
    }

    #[must_use]
    pub const fn slot(&self) -> ClientSlot {
        self.slot
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn routing_bucket(&self) -> u32 {
        self.routing_bucket.load(Ordering::Acquire)
    }

    /// Stores a new bucket and returns the previous one.
    pub(crate) fn swap_routing_bucket(&self, bucket: u32) -> u32 {
        self.routing_bucket.swap(bucket, Ordering::AcqRel)
    }
}

impl PartialEq for Client {
    fn eq(&self, other: &Self) -> bool {
        self.net_id == other.net_id
    }
}

impl Eq for Client {}
