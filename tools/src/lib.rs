//! Inspection and decoding tools for synctree schemas and clone payloads.
//!
//! - Dump an entity kind's schema tree with gates, capacities and slots
//! - Decode a captured clone payload into a fresh tree and report each leaf
//!
//! # Design Principles
//!
//! - **First-class tooling** - These tools are part of the product, not afterthoughts.
//! - **Human-readable output** - Make it easy to see what went over the wire.

use std::fmt::Write as _;

use bitstream::BitReader;
use engine::{EngineConfig, NodeRefKind, ParseContext, ParseReport};
use nodes::{make_sync_tree, EntityKind};
use schema::{EntitySchema, GateMask, SchemaNodeKind, SyncType};
use serde::Serialize;

/// Gate of one schema node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GateReport {
    pub read_mask: u32,
    pub cond_mask: u32,
    pub obj_mask: u32,
}

impl From<GateMask> for GateReport {
    fn from(gate: GateMask) -> Self {
        Self {
            read_mask: gate.read_mask,
            cond_mask: gate.cond_mask,
            obj_mask: gate.obj_mask,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeReportKind {
    Branch {
        children: usize,
    },
    Leaf {
        slot: usize,
        group: &'static str,
        capacity_bytes: u16,
        decoded: bool,
        send_on_first_update: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeReport {
    pub index: usize,
    pub depth: u16,
    pub gate: GateReport,
    #[serde(flatten)]
    pub kind: NodeReportKind,
}

/// Flattened view of an entity schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaReport {
    pub name: &'static str,
    pub hash: u64,
    pub leaf_count: usize,
    pub nodes: Vec<NodeReport>,
}

/// Describes `schema` node by node in pre-order.
#[must_use]
pub fn describe_schema(schema: &EntitySchema) -> SchemaReport {
    let nodes = schema
        .nodes()
        .iter()
        .enumerate()
        .filter_map(|(index, node)| {
            let kind = match &node.kind {
                SchemaNodeKind::Branch { children } => NodeReportKind::Branch {
                    children: children.len(),
                },
                SchemaNodeKind::Leaf { slot } => {
                    let spec = schema.leaf(*slot)?;
                    NodeReportKind::Leaf {
                        slot: slot.index(),
                        group: spec.group.name(),
                        capacity_bytes: spec.capacity_bytes,
                        decoded: spec.group.is_decoded(),
                        send_on_first_update: spec.send_on_first_update,
                    }
                }
            };
            Some(NodeReport {
                index,
                depth: node.depth,
                gate: node.gate.into(),
                kind,
            })
        })
        .collect();

    SchemaReport {
        name: schema.name(),
        hash: schema.hash(),
        leaf_count: schema.leaves().len(),
        nodes,
    }
}

/// Human-readable schema tree.
#[must_use]
pub fn format_schema_pretty(report: &SchemaReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} (hash 0x{:016x}, {} leaves)",
        report.name, report.hash, report.leaf_count
    );
    for node in &report.nodes {
        let indent = "  ".repeat(usize::from(node.depth) + 1);
        let gate = format!(
            "[{}, {}, {}]",
            node.gate.read_mask, node.gate.cond_mask, node.gate.obj_mask
        );
        match &node.kind {
            NodeReportKind::Branch { children } => {
                let _ = writeln!(out, "{indent}branch {gate} ({children} children)");
            }
            NodeReportKind::Leaf {
                slot,
                group,
                capacity_bytes,
                decoded,
                send_on_first_update,
            } => {
                let _ = writeln!(
                    out,
                    "{indent}#{slot} {group} {gate} {capacity_bytes}B{}{}",
                    if *decoded { "" } else { " opaque" },
                    if *send_on_first_update { "" } else { " no-first-update" },
                );
            }
        }
    }
    out
}

/// Parse statistics for one decoded payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParseSummary {
    pub obj_type: u32,
    pub leaves_parsed: usize,
    pub leaves_changed: usize,
    pub overflowed: usize,
    pub truncated: usize,
    pub decode_failures: usize,
    pub exhausted: bool,
    pub bits_consumed: usize,
    pub clean: bool,
}

impl From<&ParseReport> for ParseSummary {
    fn from(report: &ParseReport) -> Self {
        Self {
            obj_type: report.obj_type,
            leaves_parsed: report.leaves_parsed,
            leaves_changed: report.leaves_changed,
            overflowed: report.overflowed,
            truncated: report.truncated,
            decode_failures: report.decode_failures,
            exhausted: report.exhausted,
            bits_consumed: report.bits_consumed,
            clean: report.is_clean(),
        }
    }
}

/// One leaf that carried data in a decoded payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeafReport {
    pub slot: usize,
    pub group: &'static str,
    pub bits: usize,
    pub payload_hex: String,
    /// Debug rendering of decoded content; `None` for opaque groups.
    pub content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodeReport {
    pub kind: EntityKind,
    pub sync_type: SyncType,
    pub input_bits: usize,
    pub summary: ParseSummary,
    pub leaves: Vec<LeafReport>,
}

/// Parses a captured clone payload into a fresh tree of `kind`.
///
/// `bit_len` bounds the meaningful bits; `None` uses every byte.
#[must_use]
pub fn decode_clone_payload(
    bytes: &[u8],
    bit_len: Option<usize>,
    kind: EntityKind,
    sync_type: SyncType,
    config: EngineConfig,
) -> DecodeReport {
    let tree = make_sync_tree(kind, config);
    let mut reader = match bit_len {
        Some(bits) => BitReader::with_bit_len(bytes, bits),
        None => BitReader::new(bytes),
    };
    let input_bits = reader.bit_len();
    let report = tree.parse(&mut reader, &ParseContext::new(sync_type));

    let mut leaves = Vec::new();
    tree.visit(|node| {
        let NodeRefKind::Leaf(view) = node.kind else {
            return;
        };
        if view.len_bits == 0 {
            return;
        }
        leaves.push(LeafReport {
            slot: view.slot.index(),
            group: view.spec.group.name(),
            bits: view.len_bits,
            payload_hex: hex(view.payload),
            content: view
                .data
                .filter(|data| data.is_decoded())
                .map(|data| format!("{data:?}")),
        });
    });

    tracing::debug!(kind = %kind, leaves = leaves.len(), "decoded clone payload");
    DecodeReport {
        kind,
        sync_type,
        input_bits,
        summary: ParseSummary::from(&report),
        leaves,
    }
}

/// Human-readable decode output.
#[must_use]
pub fn format_decode_pretty(report: &DecodeReport) -> String {
    let mut out = String::new();
    let summary = &report.summary;
    let _ = writeln!(
        out,
        "{} {:?}: {} of {} bits consumed, obj_type {}",
        report.kind, report.sync_type, summary.bits_consumed, report.input_bits, summary.obj_type
    );
    let _ = writeln!(
        out,
        "leaves parsed: {} changed: {}",
        summary.leaves_parsed, summary.leaves_changed
    );
    if !summary.clean {
        let _ = writeln!(
            out,
            "degraded: overflowed {} truncated {} decode failures {} exhausted {}",
            summary.overflowed, summary.truncated, summary.decode_failures, summary.exhausted
        );
    }
    for leaf in &report.leaves {
        let _ = writeln!(
            out,
            "  #{} {} ({} bits) {}",
            leaf.slot, leaf.group, leaf.bits, leaf.payload_hex
        );
        if let Some(content) = &leaf.content {
            let _ = writeln!(out, "    {content}");
        }
    }
    out
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut out, byte| {
        let _ = write!(out, "{byte:02x}");
        out
    })
}
