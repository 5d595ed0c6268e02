//! Notifications raised by the game state.

use std::sync::Arc;

use crate::client::Client;
use crate::entity::SyncEntity;

/// Receives lifecycle events from [`GameState`](crate::GameState).
///
/// Every method defaults to a no-op. Calls happen after the registry
/// locks are released, so implementations may call back into the state.
pub trait GameStateObserver: Send + Sync {
    fn entity_created(&self, _entity: &Arc<SyncEntity>) {}

    fn entity_removed(&self, _entity: &Arc<SyncEntity>) {}

    /// Ownership moved from `previous` to the entity's current owner.
    fn owner_changed(&self, _entity: &Arc<SyncEntity>, _previous: Option<&Arc<Client>>) {}

    fn entity_routing_bucket_changed(&self, _entity: &Arc<SyncEntity>, _old: u32, _new: u32) {}

    /// Relevance for `client` must be recomputed.
    fn client_routing_bucket_changed(&self, _client: &Arc<Client>, _old: u32, _new: u32) {}
}

/// Observer that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl GameStateObserver for NoopObserver {}
