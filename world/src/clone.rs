//! Clone packet processing.
//!
//! Owners stream their entities to the server as clone creates and syncs.
//! The server parses each one into the entity's tree, then builds
//! per-client updates from the same tree. Transport framing (message
//! headers, compression, ack batching) is the caller's concern; these
//! functions take the object id, sender timestamp and tree payload it
//! already split out.

use std::sync::Arc;

use bitstream::{BitReader, BitWriter};
use engine::{ParseContext, ParseReport, UnparseContext};
use nodes::EntityKind;
use schema::SyncType;
use tracing::{debug, trace, warn};

use crate::client::Client;
use crate::entity::SyncEntity;
use crate::error::{WorldError, WorldResult};
use crate::state::{GameState, SERVER_PLAYER_ID};

/// Tree payload of one inbound clone create or sync.
#[derive(Debug, Clone, Copy)]
pub struct ClonePayload<'a> {
    pub object_id: u16,
    /// Sender-side timestamp the packet was stamped with.
    pub timestamp: u32,
    pub data: &'a [u8],
    /// Meaningful bits in `data`; `None` uses every byte.
    pub bit_len: Option<usize>,
}

impl<'a> ClonePayload<'a> {
    #[must_use]
    pub const fn new(object_id: u16, timestamp: u32, data: &'a [u8]) -> Self {
        Self {
            object_id,
            timestamp,
            data,
            bit_len: None,
        }
    }

    #[must_use]
    pub const fn with_bit_len(mut self, bits: usize) -> Self {
        self.bit_len = Some(bits);
        self
    }

    fn reader(&self) -> BitReader<'a> {
        match self.bit_len {
            Some(bits) => BitReader::with_bit_len(self.data, bits),
            None => BitReader::new(self.data),
        }
    }
}

/// Result of applying an inbound clone packet.
#[derive(Debug, Clone)]
pub enum CloneOutcome {
    /// The sender owns the entity and its payload was parsed.
    Applied {
        entity: Arc<SyncEntity>,
        report: ParseReport,
    },
    /// The packet was valid but not applied, e.g. a sync from a non-owner.
    Ignored,
}

impl CloneOutcome {
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

/// One outbound clone message for a single client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloneUpdate {
    pub object_id: u16,
    pub kind: EntityKind,
    pub sync_type: SyncType,
    /// Net id of the entity's owner, if it has one.
    pub owner: Option<u32>,
    pub timestamp: u32,
    pub bit_len: usize,
    pub data: Vec<u8>,
}

impl GameState {
    /// Applies a clone create from `client`.
    ///
    /// Creates the entity if none exists or the existing one lost its
    /// owner. After parsing, every leaf's acks are cleared so all other
    /// clients receive the full new state.
    pub fn process_clone_create(
        &self,
        client: &Arc<Client>,
        kind: EntityKind,
        payload: &ClonePayload<'_>,
    ) -> WorldResult<CloneOutcome> {
        let object_id = payload.object_id;
        let entity = match self.raw_entity(object_id) {
            Some(existing) if existing.is_live() && existing.owner().is_some() => {
                if existing.kind() != kind {
                    warn!(
                        net_id = client.net_id(),
                        object_id,
                        existing = %existing.kind(),
                        requested = %kind,
                        "clone create for a different kind"
                    );
                    return Err(WorldError::KindMismatch {
                        object_id,
                        existing: existing.kind(),
                        requested: kind,
                    });
                }
                existing
            }
            Some(stale) => {
                self.evict(&stale);
                self.create_entity(kind, object_id, Some(client))?
            }
            None => self.create_entity(kind, object_id, Some(client))?,
        };

        let outcome = self.apply_clone(client, &entity, SyncType::Create, payload);
        if outcome.is_applied() {
            entity.tree().reset_acks();
            if kind == EntityKind::Player {
                self.make_script_handle(&entity)?;
            }
        }
        Ok(outcome)
    }

    /// Applies a clone sync from `client`.
    ///
    /// Syncs for unknown or ownerless entities are dropped.
    pub fn process_clone_sync(
        &self,
        client: &Arc<Client>,
        payload: &ClonePayload<'_>,
    ) -> WorldResult<CloneOutcome> {
        let Some(entity) = self
            .get_entity_by_object(SERVER_PLAYER_ID, payload.object_id)
            .filter(|entity| entity.owner().is_some())
        else {
            debug!(
                net_id = client.net_id(),
                object_id = payload.object_id,
                "clone sync for unknown entity"
            );
            return Ok(CloneOutcome::Ignored);
        };

        Ok(self.apply_clone(client, &entity, SyncType::Update, payload))
    }

    /// Migrates an entity to `target`, or to `client` when `target` is
    /// `None`.
    pub fn process_clone_takeover(
        &self,
        client: &Arc<Client>,
        target: Option<&Arc<Client>>,
        object_id: u16,
    ) -> WorldResult<Arc<SyncEntity>> {
        let entity = self
            .get_entity_by_object(SERVER_PLAYER_ID, object_id)
            .ok_or(WorldError::UnknownObject { object_id })?;
        let new_owner = target.unwrap_or(client);
        self.reassign_entity(&entity, Some(new_owner));
        Ok(entity)
    }

    /// Deletes an entity at its owner's request.
    ///
    /// Returns `false` when no live entity exists under the id.
    pub fn process_clone_remove(&self, client: &Arc<Client>, object_id: u16) -> WorldResult<bool> {
        let Some(entity) = self.get_entity_by_object(SERVER_PLAYER_ID, object_id) else {
            return Ok(false);
        };
        if let Some(owner) = entity.owner() {
            if owner.net_id() != client.net_id() {
                warn!(
                    net_id = client.net_id(),
                    owner = owner.net_id(),
                    object_id,
                    "clone remove from non-owner"
                );
                return Err(WorldError::NotOwner {
                    net_id: client.net_id(),
                    object_id,
                });
            }
        }
        Ok(self.delete_entity(&entity, false) > 0)
    }

    /// Records that `client` holds a replica of the entity.
    pub fn acknowledge_creation(&self, client: &Client, object_id: u16) -> WorldResult<()> {
        let entity = self
            .raw_entity(object_id)
            .ok_or(WorldError::UnknownObject { object_id })?;
        entity.ack_creation(client.slot());
        Ok(())
    }

    /// Serializes what `target` has not acknowledged yet.
    ///
    /// Returns `None` when nothing is pending. A successful write marks
    /// the entity relevant to `target`.
    pub fn build_clone_update(
        &self,
        entity: &SyncEntity,
        target: &Client,
        sync_type: SyncType,
        first_update: bool,
    ) -> WorldResult<Option<CloneUpdate>> {
        let mut ctx = UnparseContext::new(sync_type, target.slot());
        if first_update {
            ctx = ctx.first_update();
        }

        let mut writer = BitWriter::new();
        if !entity.tree().unparse(&mut writer, &ctx)? {
            return Ok(None);
        }
        entity.mark_relevant(target.slot());

        let bit_len = writer.bits_written();
        Ok(Some(CloneUpdate {
            object_id: entity.object_id(),
            kind: entity.kind(),
            sync_type,
            owner: entity.owner().map(|owner| owner.net_id()),
            timestamp: entity.timestamp(),
            bit_len,
            data: writer.finish(),
        }))
    }

    /// Builds this frame's updates for `target`.
    ///
    /// Covers every live entity in the client's routing bucket except the
    /// ones it owns. Entities the client has not acknowledged are sent as
    /// creates.
    pub fn collect_clone_updates(&self, target: &Client) -> WorldResult<Vec<CloneUpdate>> {
        let slot = target.slot();
        let bucket = target.routing_bucket();
        let mut updates = Vec::new();

        for entity in self.entities() {
            if entity.routing_bucket() != bucket || entity.is_owned_by(target) {
                continue;
            }
            let sync_type = if entity.has_acked_creation(slot) {
                SyncType::Update
            } else {
                SyncType::Create
            };
            if let Some(update) = self.build_clone_update(&entity, target, sync_type, false)? {
                updates.push(update);
            }
        }

        trace!(net_id = target.net_id(), count = updates.len(), "collected clone updates");
        Ok(updates)
    }

    fn apply_clone(
        &self,
        client: &Arc<Client>,
        entity: &Arc<SyncEntity>,
        sync_type: SyncType,
        payload: &ClonePayload<'_>,
    ) -> CloneOutcome {
        entity.ack_creation(client.slot());

        if !entity.is_owned_by(client) {
            debug!(
                net_id = client.net_id(),
                object_id = entity.object_id(),
                "clone packet from non-owner ignored"
            );
            return CloneOutcome::Ignored;
        }

        entity.set_timestamp(payload.timestamp);
        let ctx = ParseContext::new(sync_type)
            .with_timestamp(payload.timestamp)
            .with_frame_index(self.frame_index());
        let report = entity.tree().parse(&mut payload.reader(), &ctx);
        if !report.is_clean() {
            debug!(
                object_id = entity.object_id(),
                truncated = report.truncated,
                overflowed = report.overflowed,
                decode_failures = report.decode_failures,
                exhausted = report.exhausted,
                "degraded clone payload"
            );
        }

        CloneOutcome::Applied {
            entity: Arc::clone(entity),
            report,
        }
    }
}
