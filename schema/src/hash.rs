//! Deterministic schema hashing.

use blake3::Hasher;

use crate::gate::GateMask;
use crate::schema::{EntitySchema, SchemaNodeKind};

/// Computes a deterministic hash over a schema's shape.
///
/// Covers node order, nesting depth, gates, leaf capacities, field-group
/// names and first-update flags. Two peers that agree on the hash agree on
/// the wire layout of every tree built from the schema.
#[must_use]
pub fn schema_hash(schema: &EntitySchema) -> u64 {
    let mut hasher = Hasher::new();
    write_str(&mut hasher, schema.name());
    write_u32(&mut hasher, schema.nodes().len() as u32);

    for node in schema.nodes() {
        write_u16(&mut hasher, node.depth);
        write_gate(&mut hasher, node.gate);
        match &node.kind {
            SchemaNodeKind::Branch { children } => {
                write_u8(&mut hasher, 0);
                write_u32(&mut hasher, children.len() as u32);
            }
            SchemaNodeKind::Leaf { slot } => {
                write_u8(&mut hasher, 1);
                if let Some(leaf) = schema.leaf(*slot) {
                    write_u16(&mut hasher, leaf.capacity_bytes);
                    write_str(&mut hasher, leaf.group.name());
                    write_u8(&mut hasher, u8::from(leaf.send_on_first_update));
                }
            }
        }
    }

    let hash = hasher.finalize();
    let mut out = [0u8; 8];
    out.copy_from_slice(&hash.as_bytes()[..8]);
    u64::from_le_bytes(out)
}

fn write_gate(hasher: &mut Hasher, gate: GateMask) {
    write_u32(hasher, gate.read_mask);
    write_u32(hasher, gate.cond_mask);
    write_u32(hasher, gate.obj_mask);
}

fn write_str(hasher: &mut Hasher, value: &str) {
    write_u32(hasher, value.len() as u32);
    hasher.update(value.as_bytes());
}

fn write_u8(hasher: &mut Hasher, value: u8) {
    hasher.update(&[value]);
}

fn write_u16(hasher: &mut Hasher, value: u16) {
    hasher.update(&value.to_le_bytes());
}

fn write_u32(hasher: &mut Hasher, value: u32) {
    hasher.update(&value.to_le_bytes());
}
