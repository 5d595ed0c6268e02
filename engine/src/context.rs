//! Per-operation contexts and parse diagnostics.

use schema::SyncType;

use crate::client::ClientSlot;

/// Inputs to one inbound parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseContext {
    pub sync_type: SyncType,
    /// Sender timestamp recorded on every leaf the parse fills.
    pub timestamp: u32,
    /// Server frame the packet belongs to.
    pub frame_index: u64,
}

impl ParseContext {
    #[must_use]
    pub const fn new(sync_type: SyncType) -> Self {
        Self {
            sync_type,
            timestamp: 0,
            frame_index: 0,
        }
    }

    #[must_use]
    pub const fn with_timestamp(mut self, timestamp: u32) -> Self {
        self.timestamp = timestamp;
        self
    }

    #[must_use]
    pub const fn with_frame_index(mut self, frame_index: u64) -> Self {
        self.frame_index = frame_index;
        self
    }
}

/// Inputs to one outbound unparse for a single target client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnparseContext {
    pub sync_type: SyncType,
    pub target: ClientSlot,
    /// Only leaves last written with this timestamp are sent.
    pub timestamp: Option<u32>,
    /// First update after the target learned about the entity.
    pub first_update: bool,
}

impl UnparseContext {
    #[must_use]
    pub const fn new(sync_type: SyncType, target: ClientSlot) -> Self {
        Self {
            sync_type,
            target,
            timestamp: None,
            first_update: false,
        }
    }

    #[must_use]
    pub const fn with_timestamp(mut self, timestamp: u32) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    #[must_use]
    pub const fn first_update(mut self) -> Self {
        self.first_update = true;
        self
    }

    /// Object type the server always writes: 1 when the marker bit is sent.
    #[must_use]
    pub const fn obj_type(&self) -> u32 {
        if self.sync_type.has_obj_type_bit() {
            1
        } else {
            0
        }
    }
}

/// What happened during one parse.
///
/// Degraded input is counted here rather than failing the parse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseReport {
    /// Object type read from the marker bit, 0 for creates.
    pub obj_type: u32,
    /// Leaves that carried a non-empty payload.
    pub leaves_parsed: usize,
    /// Leaves whose content was treated as changed.
    pub leaves_changed: usize,
    /// Leaves whose declared length exceeded their capacity.
    pub overflowed: usize,
    /// Leaves whose declared length ran past the end of the stream.
    pub truncated: usize,
    /// Leaves whose content decoder failed on the captured bits.
    pub decode_failures: usize,
    /// The stream ended while a gate bit or length prefix was expected.
    pub exhausted: bool,
    /// Bits consumed from the stream.
    pub bits_consumed: usize,
}

impl ParseReport {
    /// Whether the input was fully well-formed.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.overflowed == 0 && self.truncated == 0 && self.decode_failures == 0 && !self.exhausted
    }
}
