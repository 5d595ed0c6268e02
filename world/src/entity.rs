//! Networked entities.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};
use std::sync::{Arc, Weak};

use engine::{ClientSet, ClientSlot, SyncTree};
use nodes::{EntityKind, TreeAccessors, Vec3};
use parking_lot::{Mutex, RwLock};

use crate::client::Client;
use crate::error::WorldError;

/// Largest object id a clone packet can address (13 bits).
pub const MAX_OBJECT_ID: u16 = (1 << 13) - 1;

/// Packs a player id and object id into an entity handle.
#[must_use]
pub const fn make_entity_handle(player_id: u8, object_id: u16) -> u32 {
    ((player_id as u32 + 1) << 16) | object_id as u32
}

/// What happens to an entity when its owner disconnects.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum EntityOrphanMode {
    /// Hand the entity to the nearest remaining client, delete if none.
    #[default]
    DeleteWhenNotRelevant = 0,
    /// Delete once the client that created the entity has dropped.
    DeleteOnOwnerDisconnect = 1,
    /// Keep the entity without an owner.
    KeepEntity = 2,
}

impl TryFrom<u8> for EntityOrphanMode {
    type Error = WorldError;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(Self::DeleteWhenNotRelevant),
            1 => Ok(Self::DeleteOnOwnerDisconnect),
            2 => Ok(Self::KeepEntity),
            other => Err(WorldError::InvalidOrphanMode(other)),
        }
    }
}

#[derive(Debug, Default)]
struct Owners {
    current: Weak<Client>,
    first: Weak<Client>,
    last: Weak<Client>,
}

/// One networked entity and its sync tree.
///
/// Kind and handle are fixed at creation. Ownership, routing and the
/// lifecycle flags change under their own locks and atomics so readers
/// never need the registry lock.
#[derive(Debug)]
pub struct SyncEntity {
    handle: u32,
    player_id: u8,
    object_id: u16,
    kind: EntityKind,
    tree: SyncTree,
    owners: RwLock<Owners>,
    routing_bucket: AtomicU32,
    orphan_mode: AtomicU8,
    timestamp: AtomicU32,
    deleting: AtomicBool,
    finalizing: AtomicBool,
    first_owner_dropped: AtomicBool,
    relevant_to: Mutex<ClientSet>,
    acked_creation: Mutex<ClientSet>,
    script_handle: Mutex<Option<u32>>,
}

impl SyncEntity {
    pub(crate) fn new(
        player_id: u8,
        object_id: u16,
        kind: EntityKind,
        tree: SyncTree,
        owner: Option<&Arc<Client>>,
        orphan_mode: EntityOrphanMode,
    ) -> Self {
        let owner = owner.map(Arc::downgrade).unwrap_or_default();
        let routing_bucket = owner.upgrade().map_or(0, |client| client.routing_bucket());
        Self {
            handle: make_entity_handle(player_id, object_id),
            player_id,
            object_id,
            kind,
            tree,
            owners: RwLock::new(Owners {
                current: owner.clone(),
                first: owner,
                last: Weak::new(),
            }),
            routing_bucket: AtomicU32::new(routing_bucket),
            orphan_mode: AtomicU8::new(orphan_mode as u8),
            timestamp: AtomicU32::new(0),
            deleting: AtomicBool::new(false),
            finalizing: AtomicBool::new(false),
            first_owner_dropped: AtomicBool::new(false),
            relevant_to: Mutex::new(ClientSet::new()),
            acked_creation: Mutex::new(ClientSet::new()),
            script_handle: Mutex::new(None),
        }
    }

    #[must_use]
    pub const fn handle(&self) -> u32 {
        self.handle
    }

    #[must_use]
    pub const fn player_id(&self) -> u8 {
        self.player_id
    }

    #[must_use]
    pub const fn object_id(&self) -> u16 {
        self.object_id
    }

    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        self.kind
    }

    #[must_use]
    pub const fn tree(&self) -> &SyncTree {
        &self.tree
    }

    /// Current owner, `None` when ownerless or the owner is gone.
    #[must_use]
    pub fn owner(&self) -> Option<Arc<Client>> {
        self.owners.read().current.upgrade()
    }

    /// Client that created the entity.
    #[must_use]
    pub fn first_owner(&self) -> Option<Arc<Client>> {
        self.owners.read().first.upgrade()
    }

    /// Owner before the most recent ownership change.
    #[must_use]
    pub fn last_owner(&self) -> Option<Arc<Client>> {
        self.owners.read().last.upgrade()
    }

    #[must_use]
    pub fn is_owned_by(&self, client: &Client) -> bool {
        self.owner().is_some_and(|owner| owner.net_id() == client.net_id())
    }

    /// Replaces the owner and returns the previous one.
    pub(crate) fn set_owner(&self, owner: Option<&Arc<Client>>) -> Option<Arc<Client>> {
        let mut owners = self.owners.write();
        let previous = std::mem::take(&mut owners.current);
        owners.current = owner.map(Arc::downgrade).unwrap_or_default();
        owners.last = previous.clone();
        previous.upgrade()
    }

    #[must_use]
    pub fn routing_bucket(&self) -> u32 {
        self.routing_bucket.load(Ordering::Acquire)
    }

    pub(crate) fn swap_routing_bucket(&self, bucket: u32) -> u32 {
        self.routing_bucket.swap(bucket, Ordering::AcqRel)
    }

    #[must_use]
    pub fn orphan_mode(&self) -> EntityOrphanMode {
        EntityOrphanMode::try_from(self.orphan_mode.load(Ordering::Acquire)).unwrap_or_default()
    }

    pub(crate) fn set_orphan_mode(&self, mode: EntityOrphanMode) {
        self.orphan_mode.store(mode as u8, Ordering::Release);
    }

    /// Sender timestamp of the last accepted clone packet.
    #[must_use]
    pub fn timestamp(&self) -> u32 {
        self.timestamp.load(Ordering::Acquire)
    }

    pub(crate) fn set_timestamp(&self, timestamp: u32) {
        self.timestamp.store(timestamp, Ordering::Release);
    }

    #[must_use]
    pub fn is_deleting(&self) -> bool {
        self.deleting.load(Ordering::Acquire)
    }

    /// Marks the entity for deletion; `false` if it already was.
    pub(crate) fn mark_deleting(&self) -> bool {
        !self.deleting.swap(true, Ordering::AcqRel)
    }

    #[must_use]
    pub fn is_finalizing(&self) -> bool {
        self.finalizing.load(Ordering::Acquire)
    }

    pub(crate) fn mark_finalizing(&self) {
        self.finalizing.store(true, Ordering::Release);
    }

    /// Whether the entity is visible to native-facing lookups.
    #[must_use]
    pub fn is_live(&self) -> bool {
        !self.is_deleting() && !self.is_finalizing()
    }

    #[must_use]
    pub fn first_owner_dropped(&self) -> bool {
        self.first_owner_dropped.load(Ordering::Acquire)
    }

    pub(crate) fn mark_first_owner_dropped(&self) {
        self.first_owner_dropped.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_relevant_to(&self, slot: ClientSlot) -> bool {
        self.relevant_to.lock().contains(slot)
    }

    /// Clients the entity has been created on.
    #[must_use]
    pub fn relevant_to(&self) -> ClientSet {
        self.relevant_to.lock().clone()
    }

    pub(crate) fn mark_relevant(&self, slot: ClientSlot) {
        self.relevant_to.lock().insert(slot);
    }

    #[must_use]
    pub fn has_acked_creation(&self, slot: ClientSlot) -> bool {
        self.acked_creation.lock().contains(slot)
    }

    pub(crate) fn ack_creation(&self, slot: ClientSlot) {
        self.acked_creation.lock().insert(slot);
    }

    /// Drops per-client state for a slot that is being vacated.
    pub(crate) fn forget_client(&self, slot: ClientSlot) {
        self.relevant_to.lock().remove(slot);
        self.acked_creation.lock().remove(slot);
    }

    #[must_use]
    pub fn script_handle(&self) -> Option<u32> {
        *self.script_handle.lock()
    }

    pub(crate) fn set_script_handle(&self, handle: Option<u32>) {
        *self.script_handle.lock() = handle;
    }

    /// Highest frame index a clone packet for this entity arrived in.
    #[must_use]
    pub fn last_frame_index(&self) -> u64 {
        self.tree.last_frame_index()
    }

    /// Position from the entity's own tree, ignoring what it stands on.
    #[must_use]
    pub fn tree_position(&self) -> Vec3 {
        self.tree.position()
    }
}
