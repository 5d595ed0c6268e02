//! Runtime state of one leaf and its wire operations.

use bitstream::{BitReader, BitResult, BitWriter};
use schema::{GameBuild, LeafSpec, NodeData};
use tracing::debug;

use crate::client::ClientSet;
use crate::config::ChangePolicy;
use crate::context::{ParseContext, ParseReport, UnparseContext};

/// Width of the length prefix in front of every participating leaf.
pub const LENGTH_PREFIX_BITS: u8 = 13;

/// Largest payload expressible by the length prefix.
pub const MAX_PAYLOAD_BITS: usize = (1 << LENGTH_PREFIX_BITS) - 1;

#[derive(Debug)]
pub(crate) struct LeafState {
    pub(crate) payload: Vec<u8>,
    pub(crate) len_bits: usize,
    pub(crate) acked: ClientSet,
    pub(crate) version: u64,
    pub(crate) frame_index: u64,
    pub(crate) timestamp: u32,
    pub(crate) data: Box<dyn NodeData>,
    pub(crate) has_content: bool,
}

impl LeafState {
    pub(crate) fn new(spec: &LeafSpec) -> Self {
        Self {
            payload: vec![0; spec.capacity_bytes as usize],
            len_bits: 0,
            acked: ClientSet::new(),
            version: 0,
            frame_index: 0,
            timestamp: 0,
            data: spec.group.instantiate(),
            has_content: false,
        }
    }

    /// Reads this leaf's length prefix and payload; the gate has already
    /// been evaluated.
    pub(crate) fn parse(
        &mut self,
        spec: &LeafSpec,
        reader: &mut BitReader<'_>,
        ctx: &ParseContext,
        policy: ChangePolicy,
        build: GameBuild,
        report: &mut ParseReport,
    ) -> BitResult<()> {
        let declared = reader.read_bits(LENGTH_PREFIX_BITS)? as usize;
        let start = reader.bit_position();
        let available = reader.bits_remaining();
        let capacity = spec.capacity_bits();
        let captured = declared.min(capacity).min(available);

        if declared > capacity {
            report.overflowed += 1;
            debug!(
                group = spec.group.name(),
                declared_bits = declared,
                capacity_bits = capacity,
                "leaf length exceeds capacity, decoding truncated window"
            );
        }
        if declared > available {
            report.truncated += 1;
            debug!(
                group = spec.group.name(),
                declared_bits = declared,
                available_bits = available,
                "leaf length runs past end of stream"
            );
        }

        let mut captured_bytes = vec![0u8; self.payload.len()];
        reader.read_raw_bits(&mut captured_bytes, captured)?;
        reader.seek((start + declared).min(reader.bit_len()))?;

        let changed = match policy {
            ChangePolicy::Always => true,
            ChangePolicy::PayloadDiff => {
                captured != self.len_bits || captured_bytes != self.payload
            }
        };

        self.payload = captured_bytes;
        self.len_bits = captured;
        self.timestamp = ctx.timestamp;
        self.frame_index = ctx.frame_index;

        if captured == 0 {
            // An empty leaf clears whatever the owner sent before.
            self.data = spec.group.instantiate();
            self.has_content = false;
        } else if spec.group.is_decoded() {
            let mut window = BitReader::with_bit_len(&self.payload, captured);
            match self.data.decode(&mut window, build) {
                Ok(()) => self.has_content = true,
                Err(err) => {
                    report.decode_failures += 1;
                    debug!(
                        group = spec.group.name(),
                        bits = captured,
                        error = %err,
                        "leaf content failed to decode"
                    );
                }
            }
        } else {
            self.has_content = true;
        }

        if captured > 0 {
            report.leaves_parsed += 1;
        }
        if changed {
            report.leaves_changed += 1;
            self.version += 1;
            self.acked.clear();
        }
        Ok(())
    }

    /// Whether this leaf wants to send its payload to the context's target.
    pub(crate) fn wants_send(&self, spec: &LeafSpec, ctx: &UnparseContext) -> bool {
        if self.len_bits == 0 {
            return false;
        }
        let mut send =
            ctx.sync_type == schema::SyncType::Create || !self.acked.contains(ctx.target);
        if ctx.timestamp.is_some_and(|ts| ts != self.timestamp) {
            send = false;
        }
        if ctx.first_update && (!spec.send_on_first_update || !spec.gate.is_additional()) {
            send = false;
        }
        send
    }

    /// Writes the length prefix and payload. The gate has already been
    /// evaluated and said this leaf participates.
    pub(crate) fn write(&mut self, writer: &mut BitWriter, ctx: &UnparseContext) -> BitResult<()> {
        writer.write_bits(self.len_bits as u64, LENGTH_PREFIX_BITS)?;
        writer.write_raw_bits(&self.payload, self.len_bits)?;
        self.acked.insert(ctx.target);
        Ok(())
    }

    /// Replaces the payload with server-authored bits.
    pub(crate) fn store(&mut self, bytes: Vec<u8>, bits: usize, data: Box<dyn NodeData>) {
        let mut payload = bytes;
        payload.resize(self.payload.len().max(payload.len()), 0);
        self.payload = payload;
        self.len_bits = bits;
        self.data = data;
        self.has_content = true;
        self.version += 1;
        self.acked.clear();
    }
}
