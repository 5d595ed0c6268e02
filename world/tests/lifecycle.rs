use std::sync::Arc;

use bitstream::{BitReader, BitWriter};
use engine::{ClientSlot, EngineConfig, ParseContext, UnparseContext};
use nodes::{make_sync_tree, EntityKind, TreeAccessors, VehicleCreation, VehicleHealth};
use parking_lot::Mutex;
use proptest::prelude::*;
use schema::SyncType;
use world::{
    Client, CloneOutcome, ClonePayload, GameState, GameStateObserver, SyncEntity, WorldConfig,
    WorldError,
};

const MODEL: u32 = 0x4F48_FC4;

fn client(net_id: u32, slot: u16) -> Arc<Client> {
    Arc::new(Client::new(
        net_id,
        ClientSlot::new(slot).unwrap(),
        format!("player-{net_id}"),
    ))
}

/// The owner's local copy of a car, serialized the way it would send it.
struct OwnerCar {
    tree: engine::SyncTree,
}

impl OwnerCar {
    fn new() -> Self {
        let tree = make_sync_tree(EntityKind::Automobile, EngineConfig::for_testing());
        tree.set_data(VehicleCreation {
            model: MODEL,
            max_health: 1000,
            ..VehicleCreation::default()
        })
        .unwrap();
        tree.set_data(VehicleHealth {
            engine_health: 1000,
            body_health: 1000,
            ..VehicleHealth::default()
        })
        .unwrap();
        Self { tree }
    }

    fn serialize(&self, sync_type: SyncType) -> (Vec<u8>, usize) {
        let mut writer = BitWriter::new();
        self.tree
            .unparse(
                &mut writer,
                &UnparseContext::new(sync_type, ClientSlot::new(0).unwrap()),
            )
            .unwrap();
        let bits = writer.bits_written();
        (writer.finish(), bits)
    }
}

fn create_car(state: &GameState, owner: &Arc<Client>, object_id: u16) -> Arc<SyncEntity> {
    let (bytes, bits) = OwnerCar::new().serialize(SyncType::Create);
    let payload = ClonePayload::new(object_id, 100, &bytes).with_bit_len(bits);
    match state
        .process_clone_create(owner, EntityKind::Automobile, &payload)
        .unwrap()
    {
        CloneOutcome::Applied { entity, report } => {
            assert!(report.is_clean(), "{report:?}");
            entity
        }
        CloneOutcome::Ignored => panic!("create from owner was ignored"),
    }
}

#[test]
fn clone_create_is_replicated_to_other_clients() {
    let state = GameState::new(WorldConfig::for_testing());
    let alice = client(1, 0);
    let bob = client(2, 1);
    let car = create_car(&state, &alice, 40);

    assert!(car.is_owned_by(&alice));
    assert!(car.has_acked_creation(alice.slot()));
    assert_eq!(car.timestamp(), 100);
    assert_eq!(car.tree().model_hash(), Some(MODEL));

    assert!(state.collect_clone_updates(&alice).unwrap().is_empty());

    let updates = state.collect_clone_updates(&bob).unwrap();
    assert_eq!(updates.len(), 1);
    let update = &updates[0];
    assert_eq!(update.sync_type, SyncType::Create);
    assert_eq!(update.object_id, 40);
    assert_eq!(update.owner, Some(1));
    assert!(car.is_relevant_to(bob.slot()));

    let replica = make_sync_tree(EntityKind::Automobile, EngineConfig::for_testing());
    let report = replica.parse(
        &mut BitReader::with_bit_len(&update.data, update.bit_len),
        &ParseContext::new(SyncType::Create),
    );
    assert!(report.is_clean());
    assert_eq!(replica.model_hash(), Some(MODEL));
    assert_eq!(replica.vehicle_health().map(|h| h.body_health), Some(1000));
}

#[test]
fn creates_repeat_until_acknowledged() {
    let state = GameState::new(WorldConfig::for_testing());
    let alice = client(1, 0);
    let bob = client(2, 1);
    create_car(&state, &alice, 40);

    assert_eq!(state.collect_clone_updates(&bob).unwrap().len(), 1);
    assert_eq!(state.collect_clone_updates(&bob).unwrap().len(), 1);

    state.acknowledge_creation(&bob, 40).unwrap();
    assert!(state.collect_clone_updates(&bob).unwrap().is_empty());
    assert_eq!(
        state.acknowledge_creation(&bob, 41),
        Err(WorldError::UnknownObject { object_id: 41 })
    );
}

#[test]
fn owner_sync_reaches_acknowledged_clients_as_update() {
    let state = GameState::new(WorldConfig::for_testing());
    let alice = client(1, 0);
    let bob = client(2, 1);
    let car = create_car(&state, &alice, 40);
    state.collect_clone_updates(&bob).unwrap();
    state.acknowledge_creation(&bob, 40).unwrap();

    let source = OwnerCar::new();
    source
        .tree
        .set_data(VehicleHealth {
            engine_health: 250,
            body_health: 600,
            ..VehicleHealth::default()
        })
        .unwrap();
    let (bytes, bits) = source.serialize(SyncType::Update);
    let outcome = state
        .process_clone_sync(&alice, &ClonePayload::new(40, 200, &bytes).with_bit_len(bits))
        .unwrap();
    assert!(outcome.is_applied());
    assert_eq!(car.tree().vehicle_health().map(|h| h.engine_health), Some(250));
    assert_eq!(car.timestamp(), 200);

    let updates = state.collect_clone_updates(&bob).unwrap();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].sync_type, SyncType::Update);
}

#[test]
fn packets_from_non_owners_are_ignored() {
    let state = GameState::new(WorldConfig::for_testing());
    let alice = client(1, 0);
    let mallory = client(3, 2);
    let car = create_car(&state, &alice, 40);

    let (bytes, bits) = OwnerCar::new().serialize(SyncType::Update);
    let payload = ClonePayload::new(40, 300, &bytes).with_bit_len(bits);
    let outcome = state.process_clone_sync(&mallory, &payload).unwrap();
    assert!(!outcome.is_applied());
    assert_eq!(car.timestamp(), 100);
    assert!(car.has_acked_creation(mallory.slot()));

    let unknown = ClonePayload::new(41, 300, &bytes).with_bit_len(bits);
    assert!(!state.process_clone_sync(&alice, &unknown).unwrap().is_applied());

    assert_eq!(
        state.process_clone_remove(&mallory, 40),
        Err(WorldError::NotOwner {
            net_id: 3,
            object_id: 40
        })
    );
    assert!(car.is_live());
}

#[test]
fn create_with_wrong_kind_is_rejected() {
    let state = GameState::new(WorldConfig::for_testing());
    let alice = client(1, 0);
    create_car(&state, &alice, 40);
    let result = state.process_clone_create(&alice, EntityKind::Ped, &ClonePayload::new(40, 0, &[]));
    assert_eq!(
        result.unwrap_err(),
        WorldError::KindMismatch {
            object_id: 40,
            existing: EntityKind::Automobile,
            requested: EntityKind::Ped,
        }
    );
}

#[test]
fn create_replaces_an_entity_whose_owner_is_gone() {
    let state = GameState::new(WorldConfig::for_testing());
    let alice = client(1, 0);
    let bob = client(2, 1);
    let old = create_car(&state, &alice, 40);
    drop(alice);
    assert!(old.owner().is_none());

    let new = create_car(&state, &bob, 40);
    assert!(!Arc::ptr_eq(&old, &new));
    assert!(new.is_owned_by(&bob));
    assert!(!old.is_live());
}

#[test]
fn takeover_moves_ownership_and_resends_state() {
    let state = GameState::new(WorldConfig::for_testing());
    let alice = client(1, 0);
    let bob = client(2, 1);
    let car = create_car(&state, &alice, 40);

    state.process_clone_takeover(&bob, None, 40).unwrap();
    assert!(car.is_owned_by(&bob));

    // Alice already holds the entity, so she gets an update with everything.
    let updates = state.collect_clone_updates(&alice).unwrap();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].sync_type, SyncType::Update);

    assert_eq!(
        state.process_clone_takeover(&bob, None, 99).unwrap_err(),
        WorldError::UnknownObject { object_id: 99 }
    );
}

#[test]
fn removal_frees_the_id_after_two_frames() {
    let state = GameState::new(WorldConfig::for_testing());
    let alice = client(1, 0);
    let car = create_car(&state, &alice, 40);
    let handle = car.handle();

    assert!(state.process_clone_remove(&alice, 40).unwrap());
    assert!(!state.process_clone_remove(&alice, 40).unwrap());
    assert!(state.entity_exists(handle));

    state.advance_frame();
    state.advance_frame();
    assert!(!state.entity_exists(handle));
    create_car(&state, &alice, 40);
}

#[test]
fn routing_buckets_partition_updates() {
    let state = GameState::new(WorldConfig::for_testing());
    let alice = client(1, 0);
    let bob = client(2, 1);
    let car = create_car(&state, &alice, 40);

    state.set_client_routing_bucket(&bob, 5);
    assert!(state.collect_clone_updates(&bob).unwrap().is_empty());

    state.set_entity_routing_bucket(&car, 5);
    assert_eq!(state.collect_clone_updates(&bob).unwrap().len(), 1);
}

#[test]
fn reused_slot_starts_from_creation() {
    let state = GameState::new(WorldConfig::for_testing());
    let alice = client(1, 0);
    let bob = client(2, 1);
    create_car(&state, &alice, 40);
    state.collect_clone_updates(&bob).unwrap();
    state.acknowledge_creation(&bob, 40).unwrap();

    state.handle_client_drop(&bob, &[Arc::clone(&alice)]);

    let carol = client(3, 1);
    let updates = state.collect_clone_updates(&carol).unwrap();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].sync_type, SyncType::Create);
}

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl GameStateObserver for Recorder {
    fn entity_created(&self, entity: &Arc<SyncEntity>) {
        self.events.lock().push(format!("created {}", entity.object_id()));
    }

    fn entity_removed(&self, entity: &Arc<SyncEntity>) {
        self.events.lock().push(format!("removed {}", entity.object_id()));
    }

    fn owner_changed(&self, entity: &Arc<SyncEntity>, previous: Option<&Arc<Client>>) {
        self.events.lock().push(format!(
            "owner {} {:?} -> {:?}",
            entity.object_id(),
            previous.map(|c| c.net_id()),
            entity.owner().map(|c| c.net_id())
        ));
    }

    fn entity_routing_bucket_changed(&self, entity: &Arc<SyncEntity>, old: u32, new: u32) {
        self.events
            .lock()
            .push(format!("bucket {} {old} -> {new}", entity.object_id()));
    }

    fn client_routing_bucket_changed(&self, client: &Arc<Client>, old: u32, new: u32) {
        self.events
            .lock()
            .push(format!("client bucket {} {old} -> {new}", client.net_id()));
    }
}

#[test]
fn observer_sees_lifecycle_events() {
    let recorder = Arc::new(Recorder::default());
    let state = GameState::with_observer(WorldConfig::for_testing(), recorder.clone());
    let alice = client(1, 0);
    let bob = client(2, 1);

    let car = create_car(&state, &alice, 40);
    state.process_clone_takeover(&alice, Some(&bob), 40).unwrap();
    state.set_entity_routing_bucket(&car, 2);
    state.set_entity_routing_bucket(&car, 2);
    state.set_client_routing_bucket(&alice, 2);
    state.process_clone_remove(&bob, 40).unwrap();

    assert_eq!(
        *recorder.events.lock(),
        vec![
            "created 40".to_owned(),
            "owner 40 Some(1) -> Some(2)".to_owned(),
            "bucket 40 0 -> 2".to_owned(),
            "client bucket 1 0 -> 2".to_owned(),
            "removed 40".to_owned(),
        ]
    );
}

proptest! {
    #[test]
    fn arbitrary_create_payloads_never_panic(
        kind in 0u8..14,
        object_id in 1u16..=8191,
        bytes in prop::collection::vec(any::<u8>(), 0..256),
    ) {
        let state = GameState::new(WorldConfig::for_testing());
        let owner = client(1, 0);
        let kind = EntityKind::try_from(kind).unwrap();
        let outcome = state
            .process_clone_create(&owner, kind, &ClonePayload::new(object_id, 0, &bytes))
            .unwrap();
        prop_assert!(outcome.is_applied());
        let _ = state.collect_clone_updates(&client(2, 1)).unwrap();
    }
}
