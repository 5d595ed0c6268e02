#![no_main]

use bitstream::BitWriter;
use engine::{ClientSlot, EngineConfig, ParseContext, UnparseContext};
use libfuzzer_sys::fuzz_target;
use nodes::{make_sync_tree, EntityKind, TreeAccessors};
use schema::SyncType;

const SYNC_TYPES: [SyncType; 3] = [SyncType::Create, SyncType::Update, SyncType::Migrate];

fuzz_target!(|data: &[u8]| {
    let Some((&selector, payload)) = data.split_first() else {
        return;
    };
    let Ok(kind) = EntityKind::try_from(selector % 14) else {
        return;
    };
    let sync_type = SYNC_TYPES[usize::from(selector >> 4) % SYNC_TYPES.len()];

    let tree = make_sync_tree(kind, EngineConfig::for_testing());
    let report = tree.parse_bytes(payload, &ParseContext::new(sync_type));
    assert!(report.bits_consumed <= payload.len() * 8);

    let _ = tree.position();
    let _ = tree.model_hash();

    let mut writer = BitWriter::new();
    let target = ClientSlot::new(0).expect("slot 0 is valid");
    assert!(tree
        .unparse(&mut writer, &UnparseContext::new(sync_type, target))
        .is_ok());
});
