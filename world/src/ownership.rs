//! Ownership changes and client drops.

use std::sync::Arc;

use nodes::{EntityKind, TreeAccessors, Vec3};
use tracing::{debug, info};

use crate::client::Client;
use crate::entity::{EntityOrphanMode, SyncEntity};
use crate::state::GameState;

/// What a client drop did to the entities it owned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DropSummary {
    pub deleted: usize,
    pub reassigned: usize,
    /// Entities left in place without an owner.
    pub kept: usize,
    /// Object ids the client held but never used.
    pub released_ids: usize,
}

impl GameState {
    /// Moves `entity` to `new_owner`.
    ///
    /// Every leaf's acks are cleared so the new owner's view is resent in
    /// full to everyone.
    pub fn reassign_entity(&self, entity: &Arc<SyncEntity>, new_owner: Option<&Arc<Client>>) {
        let previous = entity.set_owner(new_owner);
        entity.tree().reset_acks();

        if let Some(owner) = new_owner {
            self.object_ids.lock().transfer(
                entity.object_id(),
                previous.as_ref().map(|c| c.net_id()),
                owner.net_id(),
            );
        }

        debug!(
            object_id = entity.object_id(),
            from = previous.as_ref().map(|c| c.net_id()),
            to = new_owner.map(|c| c.net_id()),
            "entity reassigned"
        );
        self.observer.owner_changed(entity, previous.as_ref());
    }

    /// World position of `entity`, following what it stands on.
    ///
    /// A ped or player standing on another live entity is placed at that
    /// entity's position plus the recorded offset.
    #[must_use]
    pub fn entity_position(&self, entity: &SyncEntity) -> Vec3 {
        let own = entity.tree_position();
        let Some(on) = entity.tree().standing_on() else {
            return own;
        };
        if on.object_id == entity.object_id() {
            return own;
        }
        match self.raw_entity(on.object_id).filter(|support| support.is_live()) {
            Some(support) => {
                let base = support.tree_position();
                Vec3::new(
                    base.x + on.offset.x,
                    base.y + on.offset.y,
                    base.z + on.offset.z,
                )
            }
            None => own,
        }
    }

    /// Applies orphan policy to everything `client` owned.
    ///
    /// `connected` lists the clients still in the session; `client` itself
    /// is skipped if present. Entities whose owner is already gone are
    /// handled the same way. Afterwards the client's slot is cleared from
    /// every entity so a later client in the same slot starts fresh.
    pub fn handle_client_drop(&self, client: &Arc<Client>, connected: &[Arc<Client>]) -> DropSummary {
        let mut summary = DropSummary::default();

        for entity in self.entities() {
            if entity
                .first_owner()
                .is_some_and(|first| first.net_id() == client.net_id())
            {
                entity.mark_first_owner_dropped();
            }

            let orphaned = match entity.owner() {
                None => true,
                Some(owner) => owner.net_id() == client.net_id(),
            };
            if !orphaned {
                continue;
            }

            if entity.kind() == EntityKind::Player {
                summary.deleted += self.delete_entity(&entity, false);
                continue;
            }

            match entity.orphan_mode() {
                EntityOrphanMode::KeepEntity => {
                    if entity.owner().is_some() {
                        self.reassign_entity(&entity, None);
                    }
                    summary.kept += 1;
                }
                EntityOrphanMode::DeleteOnOwnerDisconnect if entity.first_owner_dropped() => {
                    summary.deleted += self.delete_entity(&entity, false);
                }
                EntityOrphanMode::DeleteOnOwnerDisconnect
                | EntityOrphanMode::DeleteWhenNotRelevant => {
                    match self.nearest_client(&entity, client, connected) {
                        Some(target) => {
                            self.reassign_entity(&entity, Some(&target));
                            summary.reassigned += 1;
                        }
                        None => {
                            debug!(object_id = entity.object_id(), "no candidates, deleting");
                            summary.deleted += self.delete_entity(&entity, false);
                        }
                    }
                }
            }
        }

        let slot = client.slot();
        for entity in self.all_entities() {
            entity.forget_client(slot);
        }
        self.forget_player_entity(client.net_id());
        summary.released_ids = self.object_ids.lock().release_client(client.net_id());

        info!(
            net_id = client.net_id(),
            deleted = summary.deleted,
            reassigned = summary.reassigned,
            kept = summary.kept,
            "client dropped"
        );
        summary
    }

    /// Closest remaining client by player-entity position. Clients without
    /// a player entity rank last.
    fn nearest_client(
        &self,
        entity: &SyncEntity,
        dropped: &Client,
        connected: &[Arc<Client>],
    ) -> Option<Arc<Client>> {
        let pos = self.entity_position(entity);
        connected
            .iter()
            .filter(|candidate| candidate.net_id() != dropped.net_id())
            .map(|candidate| {
                let distance = self
                    .player_entity(candidate.net_id())
                    .map_or(f32::MAX, |player| {
                        self.entity_position(&player).distance_sq(pos)
                    });
                (distance, candidate)
            })
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, candidate)| Arc::clone(candidate))
    }
}
