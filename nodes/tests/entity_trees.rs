use std::sync::Arc;

use bitstream::{BitReader, BitWriter};
use engine::{ClientSlot, EngineConfig, NodeRefKind, ParseContext, SyncTree, UnparseContext};
use nodes::{
    make_sync_tree, schema_for, DoorMovement, EntityKind, PedHealth, PopType, Sector,
    SectorPosition, TreeAccessors, Vec3, VehicleCreation, VehicleHealth,
};
use proptest::prelude::*;
use schema::{branch, leaf, masks, EntitySchema, GateMask, SyncType};

fn client(index: u16) -> ClientSlot {
    ClientSlot::new(index).unwrap()
}

fn unparse(tree: &SyncTree, ctx: &UnparseContext) -> (Vec<u8>, usize, bool) {
    let mut writer = BitWriter::new();
    let wrote = tree.unparse(&mut writer, ctx).unwrap();
    let bits = writer.bits_written();
    (writer.finish(), bits, wrote)
}

fn automobile_source() -> SyncTree {
    let tree = make_sync_tree(EntityKind::Automobile, EngineConfig::for_testing());
    tree.set_data(VehicleCreation {
        model: 0xB779_A091,
        pop_type: PopType::Mission.raw(),
        random_seed: 4242,
        car_budget: true,
        max_health: 1000,
        ..VehicleCreation::default()
    })
    .unwrap();
    tree.set_data(VehicleHealth {
        engine_health: 420,
        body_health: 875,
        ..VehicleHealth::default()
    })
    .unwrap();
    tree.set_data(Sector {
        x: 520,
        y: 498,
        z: 26,
    })
    .unwrap();
    tree.set_data(SectorPosition {
        pos: Vec3::new(12.5, 40.0, 8.0),
    })
    .unwrap();
    tree
}

#[test]
fn minimal_vehicle_create_carries_creation_only() {
    let schema = Arc::new(
        EntitySchema::new(
            "VehicleMinimal",
            branch(
                GateMask::new(masks::ALL, 0, 0),
                vec![
                    leaf::<VehicleCreation>(GateMask::new(SyncType::Create.bits(), 0, 0), 14),
                    leaf::<VehicleHealth>(GateMask::new(SyncType::Update.bits(), 0, 0), 57),
                ],
            ),
        )
        .unwrap(),
    );

    let source = SyncTree::with_config(Arc::clone(&schema), EngineConfig::for_testing());
    source
        .set_data(VehicleCreation {
            model: 0x1F3D_44B5,
            ..VehicleCreation::default()
        })
        .unwrap();
    source
        .set_data(VehicleHealth {
            engine_health: 10,
            ..VehicleHealth::default()
        })
        .unwrap();

    let (bytes, bits, wrote) = unparse(&source, &UnparseContext::new(SyncType::Create, client(0)));
    assert!(wrote);

    let replica = SyncTree::with_config(schema, EngineConfig::for_testing());
    let report = replica.parse(
        &mut BitReader::with_bit_len(&bytes, bits),
        &ParseContext::new(SyncType::Create),
    );
    assert!(report.is_clean());
    assert_eq!(report.bits_consumed, bits);
    assert_eq!(replica.model_hash(), Some(0x1F3D_44B5));
    assert!(replica.vehicle_health().is_none());
}

#[test]
fn automobile_create_round_trips_through_the_wire() {
    let source = automobile_source();
    let (bytes, bits, wrote) = unparse(&source, &UnparseContext::new(SyncType::Create, client(3)));
    assert!(wrote);

    let replica = make_sync_tree(EntityKind::Automobile, EngineConfig::for_testing());
    let report = replica.parse(
        &mut BitReader::with_bit_len(&bytes, bits),
        &ParseContext::new(SyncType::Create).with_frame_index(9),
    );
    assert!(report.is_clean(), "{report:?}");
    assert_eq!(report.leaves_parsed, 4);
    assert_eq!(replica.last_frame_index(), 9);

    assert_eq!(replica.model_hash(), Some(0xB779_A091));
    assert_eq!(replica.population_type(), Some(PopType::Mission));
    let creation = replica.get::<VehicleCreation>().unwrap();
    assert!(creation.car_budget);
    assert_eq!(creation.random_seed, 4242);

    let health = replica.vehicle_health().unwrap();
    assert_eq!(health.engine_health, 420);
    assert_eq!(health.body_health, 875);

    let expected = source.position();
    let actual = replica.position();
    assert!(expected.distance_sq(actual) < 0.01, "{expected:?} vs {actual:?}");
}

#[test]
fn acknowledged_content_is_not_resent() {
    let source = automobile_source();
    let target = client(5);
    let (_, _, first) = unparse(&source, &UnparseContext::new(SyncType::Create, target));
    assert!(first);
    assert_eq!(source.is_acked::<VehicleHealth>(target), Some(true));

    let (_, _, again) = unparse(&source, &UnparseContext::new(SyncType::Update, target));
    assert!(!again);

    source
        .set_data(VehicleHealth {
            engine_health: -100,
            ..VehicleHealth::default()
        })
        .unwrap();
    assert_eq!(source.is_acked::<VehicleHealth>(target), Some(false));
    let (_, _, resent) = unparse(&source, &UnparseContext::new(SyncType::Update, target));
    assert!(resent);
}

#[test]
fn update_leaves_creation_untouched() {
    let source = automobile_source();
    let replica = make_sync_tree(EntityKind::Automobile, EngineConfig::for_testing());
    let (bytes, bits, _) = unparse(&source, &UnparseContext::new(SyncType::Create, client(1)));
    replica.parse(
        &mut BitReader::with_bit_len(&bytes, bits),
        &ParseContext::new(SyncType::Create),
    );

    source
        .set_data(VehicleHealth {
            engine_health: 15,
            body_health: 300,
            ..VehicleHealth::default()
        })
        .unwrap();
    let (bytes, bits, wrote) = unparse(&source, &UnparseContext::new(SyncType::Update, client(1)));
    assert!(wrote);
    let report = replica.parse(
        &mut BitReader::with_bit_len(&bytes, bits),
        &ParseContext::new(SyncType::Update),
    );
    assert_eq!(report.obj_type, 1);
    assert_eq!(report.leaves_parsed, 1);
    assert_eq!(replica.vehicle_health().map(|h| h.engine_health), Some(15));
    assert_eq!(replica.model_hash(), Some(0xB779_A091));
}

#[test]
fn door_registry_has_no_vehicle_groups() {
    let door = schema_for(EntityKind::Door);
    assert!(door.registry().lookup::<VehicleHealth>().is_none());
    assert!(door.registry().lookup::<DoorMovement>().is_some());
    assert!(door.registry().lookup::<PedHealth>().is_none());

    let tree = make_sync_tree(EntityKind::Door, EngineConfig::for_testing());
    assert!(tree.vehicle_health().is_none());
    assert!(tree.door_movement().is_none());
}

#[test]
fn zero_length_leaf_clears_prior_content() {
    let replica = make_sync_tree(EntityKind::Door, EngineConfig::for_testing());
    replica.set_data(DoorMovement {
        closed: true,
        ..DoorMovement::default()
    })
    .unwrap();
    let _ = unparse(&replica, &UnparseContext::new(SyncType::Update, client(0)));
    assert_eq!(replica.is_acked::<DoorMovement>(client(0)), Some(true));
    let version = replica.leaf_info::<DoorMovement>().unwrap().version;

    // Update: obj-type bit, game-state branch absent, movement present with
    // length zero, migration branch gated out.
    let mut writer = BitWriter::new();
    writer.write_bit(false);
    writer.write_bit(false);
    writer.write_bit(true);
    writer.write_bits(0, 13).unwrap();
    let bits = writer.bits_written();
    let bytes = writer.finish();

    let report = replica.parse(
        &mut BitReader::with_bit_len(&bytes, bits),
        &ParseContext::new(SyncType::Update),
    );
    assert_eq!(report.leaves_parsed, 0);
    assert_eq!(report.leaves_changed, 1);
    assert_eq!(report.bits_consumed, bits);

    let info = replica.leaf_info::<DoorMovement>().unwrap();
    assert_eq!(info.len_bits, 0);
    assert_eq!(info.version, version + 1);
    assert_eq!(info.acked_by, 0);
    assert!(replica.door_movement().is_none());

    let (_, _, wrote) = unparse(&replica, &UnparseContext::new(SyncType::Create, client(1)));
    assert!(!wrote);
}

fn leaf_payloads(tree: &SyncTree) -> Vec<(usize, usize, Vec<u8>)> {
    let mut leaves = Vec::new();
    tree.visit(|node| {
        if let NodeRefKind::Leaf(view) = node.kind {
            let bytes = view.payload[..view.len_bits.div_ceil(8)].to_vec();
            leaves.push((view.slot.index(), view.len_bits, bytes));
        }
    });
    leaves
}

proptest! {
    #[test]
    fn arbitrary_bytes_never_panic(
        kind in 0u8..14,
        sync in prop::sample::select(vec![SyncType::Create, SyncType::Update, SyncType::Migrate]),
        bytes in prop::collection::vec(any::<u8>(), 0..512),
    ) {
        let kind = EntityKind::try_from(kind).unwrap();
        let tree = make_sync_tree(kind, EngineConfig::for_testing());
        let report = tree.parse_bytes(&bytes, &ParseContext::new(sync));
        prop_assert!(report.bits_consumed <= bytes.len() * 8);

        let _ = tree.position();
        let _ = tree.model_hash();
        let mut writer = BitWriter::new();
        prop_assert!(tree
            .unparse(&mut writer, &UnparseContext::new(sync, ClientSlot::new(0).unwrap()))
            .is_ok());
    }

    #[test]
    fn every_kind_round_trips_for_every_sync_type(
        kind in prop::sample::select(EntityKind::ALL.to_vec()),
        fill in prop::sample::select(vec![SyncType::Create, SyncType::Update, SyncType::Migrate]),
        sync in prop::sample::select(vec![SyncType::Create, SyncType::Update, SyncType::Migrate]),
        bytes in prop::collection::vec(any::<u8>(), 0..512),
    ) {
        let source = make_sync_tree(kind, EngineConfig::for_testing());
        source.parse_bytes(&bytes, &ParseContext::new(fill));

        let (wire, bits_written, _) = unparse(&source, &UnparseContext::new(sync, client(0)));
        let replica = make_sync_tree(kind, EngineConfig::for_testing());
        let report = replica.parse(
            &mut BitReader::with_bit_len(&wire, bits_written),
            &ParseContext::new(sync),
        );
        prop_assert_eq!(report.bits_consumed, bits_written);
        prop_assert!(!report.exhausted);

        let sent = leaf_payloads(&source);
        for (slot, len_bits, payload) in leaf_payloads(&replica) {
            if len_bits == 0 {
                continue;
            }
            let (_, source_len, source_payload) = &sent[slot];
            prop_assert_eq!(len_bits, *source_len);
            prop_assert_eq!(&payload, source_payload);
        }
    }
}
