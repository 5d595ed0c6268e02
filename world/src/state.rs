//! The game-state registry.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use nodes::{make_sync_tree, EntityKind, TreeAccessors};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

use crate::client::Client;
use crate::config::WorldConfig;
use crate::entity::{make_entity_handle, EntityOrphanMode, SyncEntity, MAX_OBJECT_ID};
use crate::error::{WorldError, WorldResult};
use crate::handles::ScriptHandlePool;
use crate::ids::ObjectIdAllocator;
use crate::observer::{GameStateObserver, NoopObserver};

/// Player id every server-tracked entity is filed under.
pub const SERVER_PLAYER_ID: u8 = 0;

/// Registry of every networked entity.
///
/// Passed by reference to whatever needs it; there is no global instance.
/// Entities are keyed by object id. Lookups used by scripts skip entities
/// that are being deleted; [`GameState::entity_exists`] does not.
pub struct GameState {
    config: WorldConfig,
    entities: RwLock<HashMap<u16, Arc<SyncEntity>>>,
    /// Player entity per client, by net id.
    player_entities: RwLock<HashMap<u32, Arc<SyncEntity>>>,
    handles: Mutex<ScriptHandlePool>,
    pub(crate) object_ids: Mutex<ObjectIdAllocator>,
    frame_index: AtomicU64,
    pub(crate) observer: Arc<dyn GameStateObserver>,
}

impl std::fmt::Debug for GameState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameState")
            .field("config", &self.config)
            .field("entities", &self.entities.read().len())
            .field("frame_index", &self.frame_index())
            .finish_non_exhaustive()
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new(WorldConfig::default())
    }
}

impl GameState {
    #[must_use]
    pub fn new(config: WorldConfig) -> Self {
        Self::with_observer(config, Arc::new(NoopObserver))
    }

    #[must_use]
    pub fn with_observer(config: WorldConfig, observer: Arc<dyn GameStateObserver>) -> Self {
        Self {
            handles: Mutex::new(ScriptHandlePool::new(config.script_handle_capacity)),
            config,
            entities: RwLock::new(HashMap::new()),
            player_entities: RwLock::new(HashMap::new()),
            object_ids: Mutex::new(ObjectIdAllocator::new()),
            frame_index: AtomicU64::new(0),
            observer,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &WorldConfig {
        &self.config
    }

    #[must_use]
    pub fn frame_index(&self) -> u64 {
        self.frame_index.load(Ordering::Acquire)
    }

    /// Creates an entity of `kind` under `object_id`.
    ///
    /// The entity starts with the configured orphan mode and the owner's
    /// routing bucket. Player entities are also filed under their owner.
    pub fn create_entity(
        &self,
        kind: EntityKind,
        object_id: u16,
        owner: Option<&Arc<Client>>,
    ) -> WorldResult<Arc<SyncEntity>> {
        if object_id == 0 || object_id > MAX_OBJECT_ID {
            return Err(WorldError::ObjectIdOutOfRange(object_id));
        }

        let entity = {
            let mut entities = self.entities.write();
            if entities.contains_key(&object_id) {
                return Err(WorldError::ObjectInUse { object_id });
            }
            let entity = Arc::new(SyncEntity::new(
                SERVER_PLAYER_ID,
                object_id,
                kind,
                make_sync_tree(kind, self.config.engine),
                owner,
                self.config.default_orphan_mode,
            ));
            entities.insert(object_id, Arc::clone(&entity));
            entity
        };

        {
            let mut ids = self.object_ids.lock();
            ids.mark_used(object_id)?;
            if let Some(owner) = owner {
                ids.transfer(object_id, None, owner.net_id());
            }
        }

        if let (EntityKind::Player, Some(owner)) = (kind, owner) {
            self.player_entities
                .write()
                .insert(owner.net_id(), Arc::clone(&entity));
        }

        debug!(
            object_id,
            kind = %kind,
            owner = owner.map(|c| c.net_id()),
            "created entity"
        );
        self.observer.entity_created(&entity);
        Ok(entity)
    }

    /// Live entity behind a script handle.
    #[must_use]
    pub fn get_entity(&self, script_handle: u32) -> Option<Arc<SyncEntity>> {
        let handle = self.handles.lock().get(script_handle)?;
        let entity = self.lookup(handle)?;
        entity.is_live().then_some(entity)
    }

    /// Live entity addressed by player id and object id.
    #[must_use]
    pub fn get_entity_by_object(&self, player_id: u8, object_id: u16) -> Option<Arc<SyncEntity>> {
        self.lookup(make_entity_handle(player_id, object_id))
            .filter(|entity| entity.is_live())
    }

    /// Whether anything, including an entity mid-deletion, owns `handle`.
    #[must_use]
    pub fn entity_exists(&self, handle: u32) -> bool {
        self.lookup(handle).is_some()
    }

    /// Entity under `object_id` regardless of its lifecycle state.
    #[must_use]
    pub fn raw_entity(&self, object_id: u16) -> Option<Arc<SyncEntity>> {
        self.entities.read().get(&object_id).cloned()
    }

    fn lookup(&self, handle: u32) -> Option<Arc<SyncEntity>> {
        let object_id = u16::try_from(handle & 0xFFFF).ok()?;
        self.raw_entity(object_id)
            .filter(|entity| entity.handle() == handle)
    }

    /// Live entities, in no particular order.
    #[must_use]
    pub fn entities(&self) -> Vec<Arc<SyncEntity>> {
        self.entities
            .read()
            .values()
            .filter(|entity| entity.is_live())
            .cloned()
            .collect()
    }

    pub(crate) fn all_entities(&self) -> Vec<Arc<SyncEntity>> {
        self.entities.read().values().cloned().collect()
    }

    /// Number of registered entities, including ones being deleted.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.read().is_empty()
    }

    /// Script handle for `entity`, allocating one on first use.
    pub fn make_script_handle(&self, entity: &SyncEntity) -> WorldResult<u32> {
        if let Some(handle) = entity.script_handle() {
            return Ok(handle);
        }
        let mut handles = self.handles.lock();
        let script_handle = match handles.find(entity.handle()) {
            Some(existing) => existing,
            None => handles.insert(entity.handle())?,
        };
        entity.set_script_handle(Some(script_handle));
        Ok(script_handle)
    }

    /// Marks `entity` for deletion, along with its linked carriages when
    /// `recursive` is set. Returns how many entities were newly marked.
    pub fn delete_entity(&self, entity: &Arc<SyncEntity>, recursive: bool) -> usize {
        let targets = if recursive {
            let mut linked = Vec::new();
            self.iterate_linked(entity, |carriage| linked.push(Arc::clone(carriage)));
            linked
        } else {
            vec![Arc::clone(entity)]
        };

        let mut removed = Vec::new();
        for target in targets {
            if !target.mark_deleting() {
                continue;
            }
            {
                let mut players = self.player_entities.write();
                players.retain(|_, player| !Arc::ptr_eq(player, &target));
            }
            debug!(object_id = target.object_id(), kind = %target.kind(), "deleting entity");
            removed.push(target);
        }

        for target in &removed {
            self.observer.entity_removed(target);
        }
        removed.len()
    }

    /// Drops `entity` from the registry immediately, skipping the
    /// deleting and finalizing steps.
    pub(crate) fn evict(&self, entity: &Arc<SyncEntity>) {
        let removed = {
            let mut entities = self.entities.write();
            match entities.get(&entity.object_id()) {
                Some(current) if Arc::ptr_eq(current, entity) => {
                    entities.remove(&entity.object_id())
                }
                _ => None,
            }
        };
        let Some(removed) = removed else {
            return;
        };

        self.player_entities
            .write()
            .retain(|_, player| !Arc::ptr_eq(player, &removed));
        if let Some(script_handle) = removed.script_handle() {
            self.handles.lock().remove(script_handle);
            removed.set_script_handle(None);
        }
        self.object_ids.lock().release(removed.object_id());
        removed.mark_finalizing();

        debug!(object_id = removed.object_id(), "evicted stale entity");
        if removed.mark_deleting() {
            self.observer.entity_removed(&removed);
        }
    }

    /// Advances deleted entities one lifecycle step.
    ///
    /// Entities marked deleting become finalizing; entities already
    /// finalizing leave the registry, freeing their script handle and
    /// object id. Returns how many entities left.
    pub fn finalize_deletions(&self) -> usize {
        let gone: Vec<Arc<SyncEntity>> = {
            let mut entities = self.entities.write();
            let mut gone = Vec::new();
            entities.retain(|_, entity| {
                if entity.is_finalizing() {
                    gone.push(Arc::clone(entity));
                    return false;
                }
                if entity.is_deleting() {
                    entity.mark_finalizing();
                }
                true
            });
            gone
        };

        if gone.is_empty() {
            return 0;
        }

        {
            let mut handles = self.handles.lock();
            let mut ids = self.object_ids.lock();
            for entity in &gone {
                if let Some(script_handle) = entity.script_handle() {
                    handles.remove(script_handle);
                    entity.set_script_handle(None);
                }
                ids.release(entity.object_id());
            }
        }
        debug!(count = gone.len(), "finalized deleted entities");
        gone.len()
    }

    /// Visits `entity` and every carriage linked to it.
    ///
    /// A train consist is walked from its engine carriage along the
    /// `connected_carriage` links. Other kinds visit only themselves.
    /// Each entity is visited at most once.
    pub fn iterate_linked<F>(&self, entity: &Arc<SyncEntity>, mut visitor: F)
    where
        F: FnMut(&Arc<SyncEntity>),
    {
        visitor(entity);
        if entity.kind() != EntityKind::Train {
            return;
        }

        let mut visited = HashSet::from([entity.object_id()]);
        let start = entity
            .tree()
            .train_state()
            .map(|state| state.engine_carriage)
            .filter(|id| *id != 0)
            .and_then(|id| self.raw_entity(id))
            .filter(|engine| engine.kind() == EntityKind::Train)
            .unwrap_or_else(|| Arc::clone(entity));

        let mut walked = HashSet::new();
        let mut cursor = Some(start);
        while let Some(carriage) = cursor.take() {
            if !walked.insert(carriage.object_id()) {
                break;
            }
            if visited.insert(carriage.object_id()) {
                visitor(&carriage);
            }
            cursor = carriage
                .tree()
                .train_state()
                .map(|state| state.connected_carriage)
                .filter(|id| *id != 0)
                .and_then(|id| self.raw_entity(id))
                .filter(|next| next.kind() == EntityKind::Train);
        }
    }

    /// Sets the orphan mode on `entity`, and on its consist if `recursive`.
    pub fn set_orphan_mode(&self, entity: &Arc<SyncEntity>, mode: EntityOrphanMode, recursive: bool) {
        if recursive {
            self.iterate_linked(entity, |carriage| carriage.set_orphan_mode(mode));
        } else {
            entity.set_orphan_mode(mode);
        }
    }

    /// Moves `entity` into `bucket`, notifying the observer on change.
    pub fn set_entity_routing_bucket(&self, entity: &Arc<SyncEntity>, bucket: u32) {
        let old = entity.swap_routing_bucket(bucket);
        if old != bucket {
            debug!(object_id = entity.object_id(), old, new = bucket, "entity routing bucket changed");
            self.observer.entity_routing_bucket_changed(entity, old, bucket);
        }
    }

    /// Moves `client` into `bucket`, notifying the observer on change.
    pub fn set_client_routing_bucket(&self, client: &Arc<Client>, bucket: u32) {
        let old = client.swap_routing_bucket(bucket);
        if old != bucket {
            debug!(net_id = client.net_id(), old, new = bucket, "client routing bucket changed");
            self.observer.client_routing_bucket_changed(client, old, bucket);
        }
    }

    /// Starts a new server frame and finalizes pending deletions.
    pub fn advance_frame(&self) -> u64 {
        let frame = self.frame_index.fetch_add(1, Ordering::AcqRel) + 1;
        let finalized = self.finalize_deletions();
        if finalized > 0 {
            info!(frame, finalized, "frame advanced");
        }
        frame
    }

    /// The player entity controlled by `net_id`.
    #[must_use]
    pub fn player_entity(&self, net_id: u32) -> Option<Arc<SyncEntity>> {
        self.player_entities
            .read()
            .get(&net_id)
            .filter(|entity| entity.is_live())
            .cloned()
    }

    pub(crate) fn forget_player_entity(&self, net_id: u32) -> Option<Arc<SyncEntity>> {
        self.player_entities.write().remove(&net_id)
    }

    /// Hands up to `count` unused object ids to `client`.
    pub fn allocate_object_ids(&self, client: &Client, count: usize) -> Vec<u16> {
        self.object_ids.lock().allocate(client.net_id(), count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handles::SCRIPT_HANDLE_BASE;
    use engine::ClientSlot;
    use nodes::TrainGameState;

    fn state() -> GameState {
        GameState::new(WorldConfig::for_testing())
    }

    fn client(net_id: u32) -> Arc<Client> {
        Arc::new(Client::new(
            net_id,
            ClientSlot::new(net_id as u16).unwrap(),
            format!("client-{net_id}"),
        ))
    }

    fn carriage(state: &GameState, object_id: u16, engine: u16, next: u16) -> Arc<SyncEntity> {
        let entity = state.create_entity(EntityKind::Train, object_id, None).unwrap();
        entity
            .tree()
            .set_data(TrainGameState {
                engine_carriage: engine,
                connected_carriage: next,
                ..TrainGameState::default()
            })
            .unwrap();
        entity
    }

    #[test]
    fn create_and_lookup() {
        let state = state();
        let owner = client(1);
        let entity = state
            .create_entity(EntityKind::Automobile, 10, Some(&owner))
            .unwrap();
        assert_eq!(entity.handle(), make_entity_handle(0, 10));
        assert!(state.entity_exists(entity.handle()));
        assert!(Arc::ptr_eq(
            &state.get_entity_by_object(0, 10).unwrap(),
            &entity
        ));
        assert!(state.get_entity_by_object(1, 10).is_none());
        assert_eq!(
            state.create_entity(EntityKind::Ped, 10, None).unwrap_err(),
            WorldError::ObjectInUse { object_id: 10 }
        );
        assert_eq!(
            state.create_entity(EntityKind::Ped, 0, None).unwrap_err(),
            WorldError::ObjectIdOutOfRange(0)
        );
    }

    #[test]
    fn player_entities_are_filed_by_owner() {
        let state = state();
        let owner = client(4);
        let player = state
            .create_entity(EntityKind::Player, 20, Some(&owner))
            .unwrap();
        assert!(Arc::ptr_eq(&state.player_entity(4).unwrap(), &player));
        state.delete_entity(&player, false);
        assert!(state.player_entity(4).is_none());
    }

    #[test]
    fn script_handles_are_stable_and_skip_deleted_entities() {
        let state = state();
        let entity = state.create_entity(EntityKind::Object, 5, None).unwrap();
        let handle = state.make_script_handle(&entity).unwrap();
        assert_eq!(handle, SCRIPT_HANDLE_BASE);
        assert_eq!(state.make_script_handle(&entity).unwrap(), handle);
        assert!(state.get_entity(handle).is_some());

        state.delete_entity(&entity, false);
        assert!(state.get_entity(handle).is_none());
        assert!(state.get_entity_by_object(0, 5).is_none());
        assert!(state.entity_exists(entity.handle()));
    }

    #[test]
    fn deletion_finalizes_over_two_frames() {
        let state = state();
        let entity = state.create_entity(EntityKind::Object, 5, None).unwrap();
        let handle = state.make_script_handle(&entity).unwrap();
        assert_eq!(state.delete_entity(&entity, false), 1);
        assert_eq!(state.delete_entity(&entity, false), 0);

        state.advance_frame();
        assert!(entity.is_finalizing());
        assert!(state.entity_exists(entity.handle()));

        state.advance_frame();
        assert!(!state.entity_exists(entity.handle()));
        assert!(state.get_entity(handle).is_none());
        assert!(entity.script_handle().is_none());
        assert!(!state.object_ids.lock().is_used(5));
        assert_eq!(state.frame_index(), 2);

        // The freed id can be reused.
        state.create_entity(EntityKind::Object, 5, None).unwrap();
    }

    #[test]
    fn linked_carriages_are_walked_from_the_engine() {
        let state = state();
        let engine = carriage(&state, 1, 1, 2);
        let middle = carriage(&state, 2, 1, 3);
        carriage(&state, 3, 1, 0);

        let mut seen = Vec::new();
        state.iterate_linked(&middle, |c| seen.push(c.object_id()));
        assert_eq!(seen, vec![2, 1, 3]);

        assert_eq!(state.delete_entity(&engine, true), 3);
        assert!(state.entities().is_empty());
    }

    #[test]
    fn carriage_cycles_terminate() {
        let state = state();
        carriage(&state, 1, 1, 2);
        let last = carriage(&state, 2, 1, 1);
        let mut seen = Vec::new();
        state.iterate_linked(&last, |c| seen.push(c.object_id()));
        assert_eq!(seen, vec![2, 1]);
    }

    #[test]
    fn engine_link_to_a_non_train_is_not_followed() {
        let state = state();
        let car = state.create_entity(EntityKind::Automobile, 5, None).unwrap();
        let train = carriage(&state, 10, 5, 0);

        let mut seen = Vec::new();
        state.iterate_linked(&train, |c| seen.push(c.object_id()));
        assert_eq!(seen, vec![10]);

        assert_eq!(state.delete_entity(&train, true), 1);
        assert!(!car.is_deleting());
        assert!(state.get_entity_by_object(SERVER_PLAYER_ID, 5).is_some());

        let before = car.orphan_mode();
        state.set_orphan_mode(&train, EntityOrphanMode::KeepEntity, true);
        assert_eq!(car.orphan_mode(), before);
    }

    #[test]
    fn non_trains_visit_only_themselves() {
        let state = state();
        let car = state.create_entity(EntityKind::Automobile, 9, None).unwrap();
        let mut count = 0;
        state.iterate_linked(&car, |_| count += 1);
        assert_eq!(count, 1);
    }

    #[test]
    fn orphan_mode_propagates_along_consist() {
        let state = state();
        let engine = carriage(&state, 1, 1, 2);
        let trailer = carriage(&state, 2, 1, 0);
        state.set_orphan_mode(&engine, EntityOrphanMode::KeepEntity, true);
        assert_eq!(trailer.orphan_mode(), EntityOrphanMode::KeepEntity);

        state.set_orphan_mode(&engine, EntityOrphanMode::DeleteOnOwnerDisconnect, false);
        assert_eq!(engine.orphan_mode(), EntityOrphanMode::DeleteOnOwnerDisconnect);
        assert_eq!(trailer.orphan_mode(), EntityOrphanMode::KeepEntity);
    }

    #[test]
    fn routing_bucket_changes_are_applied() {
        let state = state();
        let owner = client(2);
        let entity = state.create_entity(EntityKind::Ped, 3, Some(&owner)).unwrap();
        state.set_entity_routing_bucket(&entity, 4);
        assert_eq!(entity.routing_bucket(), 4);
        state.set_client_routing_bucket(&owner, 9);
        assert_eq!(owner.routing_bucket(), 9);
        assert_eq!(entity.routing_bucket(), 4);
    }
}
