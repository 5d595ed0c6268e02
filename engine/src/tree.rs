//! Runtime sync tree bound to one entity.

use std::sync::Arc;

use bitstream::{BitReader, BitResult, BitWriter};
use schema::{
    EntitySchema, GateMask, LeafSlot, LeafSpec, NodeData, NodeIndex, SchemaNodeKind,
    SerializeNode,
};
use tracing::{debug, trace};

use crate::client::ClientSlot;
use crate::config::EngineConfig;
use crate::context::{ParseContext, ParseReport, UnparseContext};
use crate::error::{EngineError, EngineResult};
use crate::leaf::{LeafState, MAX_PAYLOAD_BITS};
use crate::lock::TreeLock;

#[derive(Debug)]
struct TreeState {
    leaves: Vec<LeafState>,
    last_frame_index: u64,
}

/// One live instance of an [`EntitySchema`].
///
/// Every operation takes the tree's lock for its whole duration, so a
/// parse never interleaves with an unparse or a visit on the same tree.
#[derive(Debug)]
pub struct SyncTree {
    schema: Arc<EntitySchema>,
    config: EngineConfig,
    state: TreeLock<TreeState>,
}

/// Snapshot of a leaf's bookkeeping, returned by [`SyncTree::leaf_info`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafInfo {
    pub slot: LeafSlot,
    pub payload: Vec<u8>,
    pub len_bits: usize,
    pub version: u64,
    pub frame_index: u64,
    pub timestamp: u32,
    pub acked_by: usize,
}

/// A node handed to [`SyncTree::visit`] callbacks.
#[derive(Debug, Clone, Copy)]
pub struct NodeRef<'a> {
    pub index: NodeIndex,
    pub depth: u16,
    pub gate: GateMask,
    pub kind: NodeRefKind<'a>,
}

#[derive(Debug, Clone, Copy)]
pub enum NodeRefKind<'a> {
    Branch { children: usize },
    Leaf(LeafView<'a>),
}

/// Read-only view of a leaf during a visit.
#[derive(Debug, Clone, Copy)]
pub struct LeafView<'a> {
    pub slot: LeafSlot,
    pub spec: &'a LeafSpec,
    pub payload: &'a [u8],
    pub len_bits: usize,
    pub version: u64,
    /// `None` until content has been received or set.
    pub data: Option<&'a dyn NodeData>,
}

impl<'a> LeafView<'a> {
    /// Typed view of the content, if it is a `T`.
    #[must_use]
    pub fn downcast<T: SerializeNode>(&self) -> Option<&'a T> {
        self.data.and_then(|data| data.as_any().downcast_ref::<T>())
    }
}

impl SyncTree {
    /// Creates an empty tree with the default configuration.
    #[must_use]
    pub fn new(schema: Arc<EntitySchema>) -> Self {
        Self::with_config(schema, EngineConfig::default())
    }

    #[must_use]
    pub fn with_config(schema: Arc<EntitySchema>, config: EngineConfig) -> Self {
        let leaves = schema.leaves().iter().map(LeafState::new).collect();
        Self {
            schema,
            config,
            state: TreeLock::new(TreeState {
                leaves,
                last_frame_index: 0,
            }),
        }
    }

    #[must_use]
    pub fn schema(&self) -> &Arc<EntitySchema> {
        &self.schema
    }

    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Parses an inbound clone payload.
    ///
    /// Update and migrate payloads start with the object-type marker bit.
    /// Malformed input never fails the parse; it is counted in the report.
    pub fn parse(&self, reader: &mut BitReader<'_>, ctx: &ParseContext) -> ParseReport {
        let mut state = self.state.lock();
        let mut report = ParseReport::default();
        let start = reader.bit_position();

        let result = self.parse_root(&mut state, reader, ctx, &mut report);
        if let Err(err) = result {
            report.exhausted = true;
            debug!(
                schema = self.schema.name(),
                error = %err,
                "clone payload ended early"
            );
        }
        if report.leaves_parsed > 0 || report.leaves_changed > 0 {
            state.last_frame_index = state.last_frame_index.max(ctx.frame_index);
        }
        report.bits_consumed = reader.bit_position() - start;
        trace!(
            schema = self.schema.name(),
            sync_type = ?ctx.sync_type,
            leaves = report.leaves_parsed,
            changed = report.leaves_changed,
            bits = report.bits_consumed,
            "parsed clone payload"
        );
        report
    }

    fn parse_root(
        &self,
        state: &mut TreeState,
        reader: &mut BitReader<'_>,
        ctx: &ParseContext,
        report: &mut ParseReport,
    ) -> BitResult<()> {
        if ctx.sync_type.has_obj_type_bit() {
            report.obj_type = u32::from(reader.read_bit()?);
        }
        let obj_type = report.obj_type;
        self.parse_node(state, self.schema.root(), reader, ctx, obj_type, report)
    }

    /// Convenience wrapper around [`parse`](Self::parse) for a byte buffer.
    pub fn parse_bytes(&self, bytes: &[u8], ctx: &ParseContext) -> ParseReport {
        self.parse(&mut BitReader::new(bytes), ctx)
    }

    fn parse_node(
        &self,
        state: &mut TreeState,
        index: NodeIndex,
        reader: &mut BitReader<'_>,
        ctx: &ParseContext,
        obj_type: u32,
        report: &mut ParseReport,
    ) -> BitResult<()> {
        let Some(node) = self.schema.node(index) else {
            return Ok(());
        };
        if !node
            .gate
            .should_read(reader, ctx.sync_type.bits(), obj_type)?
        {
            return Ok(());
        }
        match &node.kind {
            SchemaNodeKind::Branch { children } => {
                for &child in children {
                    self.parse_node(state, child, reader, ctx, obj_type, report)?;
                }
                Ok(())
            }
            SchemaNodeKind::Leaf { slot } => {
                let Some(spec) = self.schema.leaf(*slot) else {
                    return Ok(());
                };
                state.leaves[slot.index()].parse(
                    spec,
                    reader,
                    ctx,
                    self.config.change_policy,
                    self.config.game_build,
                    report,
                )
            }
        }
    }

    /// Writes the payloads the context's target still needs.
    ///
    /// Returns whether any leaf content was written. Every leaf that was
    /// written is marked as acknowledged by the target.
    ///
    /// `false` does not mean nothing was written: gate bits still go out,
    /// and a participating leaf without a presence bit that has nothing
    /// to send writes a zero 13-bit length. Its acks are left untouched.
    pub fn unparse(&self, writer: &mut BitWriter, ctx: &UnparseContext) -> EngineResult<bool> {
        let mut state = self.state.lock();
        if ctx.sync_type.has_obj_type_bit() {
            writer.write_bit(true);
        }
        let wrote = self.unparse_node(&mut state, self.schema.root(), writer, ctx)?;
        trace!(
            schema = self.schema.name(),
            sync_type = ?ctx.sync_type,
            target = ctx.target.index(),
            wrote,
            "unparsed clone payload"
        );
        Ok(wrote)
    }

    fn unparse_node(
        &self,
        state: &mut TreeState,
        index: NodeIndex,
        writer: &mut BitWriter,
        ctx: &UnparseContext,
    ) -> BitResult<bool> {
        let Some(node) = self.schema.node(index) else {
            return Ok(false);
        };
        let sync_type = ctx.sync_type.bits();
        let obj_type = ctx.obj_type();

        match &node.kind {
            SchemaNodeKind::Branch { children } => {
                let mark = writer.bits_written();
                if !node.gate.should_write(writer, sync_type, obj_type, true) {
                    return Ok(false);
                }
                let mut wrote = false;
                for &child in children {
                    wrote |= self.unparse_node(state, child, writer, ctx)?;
                }
                if !wrote && node.gate.has_presence_bit(sync_type) {
                    // Nothing below produced content: collapse to a single absent bit.
                    writer.truncate(mark);
                    writer.write_bit(false);
                }
                Ok(wrote)
            }
            SchemaNodeKind::Leaf { slot } => {
                let Some(spec) = self.schema.leaf(*slot) else {
                    return Ok(false);
                };
                let leaf = &mut state.leaves[slot.index()];
                let send = leaf.wants_send(spec, ctx);
                if !node.gate.should_write(writer, sync_type, obj_type, send) {
                    return Ok(false);
                }
                if send {
                    leaf.write(writer, ctx)?;
                    Ok(true)
                } else {
                    writer.write_bits(0, crate::leaf::LENGTH_PREFIX_BITS)?;
                    Ok(false)
                }
            }
        }
    }

    /// Pre-order traversal over every node.
    ///
    /// The tree stays locked while `visitor` runs; calling back into the
    /// same tree from the visitor is a programming error.
    pub fn visit<F>(&self, mut visitor: F)
    where
        F: FnMut(NodeRef<'_>),
    {
        let state = self.state.lock();
        for (index, node) in self.schema.nodes().iter().enumerate() {
            let kind = match &node.kind {
                SchemaNodeKind::Branch { children } => NodeRefKind::Branch {
                    children: children.len(),
                },
                SchemaNodeKind::Leaf { slot } => {
                    let Some(spec) = self.schema.leaf(*slot) else {
                        continue;
                    };
                    let leaf = &state.leaves[slot.index()];
                    NodeRefKind::Leaf(LeafView {
                        slot: *slot,
                        spec,
                        payload: &leaf.payload[..leaf.len_bits.div_ceil(8)],
                        len_bits: leaf.len_bits,
                        version: leaf.version,
                        data: leaf.has_content.then_some(leaf.data.as_ref()),
                    })
                }
            };
            visitor(NodeRef {
                index,
                depth: node.depth,
                gate: node.gate,
                kind,
            });
        }
    }

    /// Clears every leaf's acknowledgements so all content is resent.
    pub fn reset_acks(&self) {
        let mut state = self.state.lock();
        for leaf in &mut state.leaves {
            leaf.acked.clear();
        }
    }

    /// Highest frame index any leaf was parsed in.
    #[must_use]
    pub fn last_frame_index(&self) -> u64 {
        self.state.lock().last_frame_index
    }

    /// Slot of the field group `T`, or `None` if the schema lacks it.
    #[must_use]
    pub fn slot_of<T: SerializeNode>(&self) -> Option<LeafSlot> {
        self.schema.registry().lookup::<T>()
    }

    /// Decoded content of `T`.
    ///
    /// `None` if the schema does not declare `T` or no content has arrived yet.
    #[must_use]
    pub fn get<T: SerializeNode>(&self) -> Option<T> {
        self.with_data(|data: &T| data.clone())
    }

    /// Runs `f` against the decoded content of `T` without cloning it.
    pub fn with_data<T, R, F>(&self, f: F) -> Option<R>
    where
        T: SerializeNode,
        F: FnOnce(&T) -> R,
    {
        let slot = self.slot_of::<T>()?;
        let state = self.state.lock();
        let leaf = &state.leaves[slot.index()];
        if !leaf.has_content {
            return None;
        }
        leaf.data.as_any().downcast_ref::<T>().map(f)
    }

    /// Replaces the content of `T` with server-authored data.
    ///
    /// The content is encoded into the leaf's payload, the version is
    /// bumped and every acknowledgement is cleared.
    pub fn set_data<T: SerializeNode>(&self, value: T) -> EngineResult<()> {
        let slot = self
            .slot_of::<T>()
            .ok_or(EngineError::UnknownFieldGroup {
                schema: self.schema.name(),
                group: T::NAME,
            })?;
        let capacity = self
            .schema
            .leaf(slot)
            .map_or(0, LeafSpec::capacity_bits)
            .min(MAX_PAYLOAD_BITS);

        let mut writer = BitWriter::new();
        value.encode(&mut writer, self.config.game_build)?;
        let bits = writer.bits_written();
        if bits > capacity {
            return Err(EngineError::PayloadTooLarge {
                group: T::NAME,
                bits,
                capacity,
            });
        }

        let mut state = self.state.lock();
        state.leaves[slot.index()].store(writer.finish(), bits, Box::new(value));
        debug!(
            schema = self.schema.name(),
            group = T::NAME,
            bits,
            "server-authored leaf content stored"
        );
        Ok(())
    }

    /// Bookkeeping for the leaf carrying `T`.
    #[must_use]
    pub fn leaf_info<T: SerializeNode>(&self) -> Option<LeafInfo> {
        self.leaf_info_at(self.slot_of::<T>()?)
    }

    /// Bookkeeping for the leaf at `slot`.
    #[must_use]
    pub fn leaf_info_at(&self, slot: LeafSlot) -> Option<LeafInfo> {
        let state = self.state.lock();
        let leaf = state.leaves.get(slot.index())?;
        Some(LeafInfo {
            slot,
            payload: leaf.payload[..leaf.len_bits.div_ceil(8)].to_vec(),
            len_bits: leaf.len_bits,
            version: leaf.version,
            frame_index: leaf.frame_index,
            timestamp: leaf.timestamp,
            acked_by: leaf.acked.len(),
        })
    }

    /// Whether `client` has acknowledged the current content of `T`.
    #[must_use]
    pub fn is_acked<T: SerializeNode>(&self, client: ClientSlot) -> Option<bool> {
        let slot = self.slot_of::<T>()?;
        let state = self.state.lock();
        Some(state.leaves[slot.index()].acked.contains(client))
    }
}
