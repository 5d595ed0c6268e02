//! Gate masks and sync-type bitmasks.

use bitstream::{BitReader, BitResult, BitWriter};

/// The kind of operation driving gate evaluation.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum SyncType {
    /// Full state sent when an entity first becomes known to a client.
    Create = 1,
    /// Incremental update from the owning client.
    Update = 2,
    /// Ownership migration between clients.
    Migrate = 4,
}

impl SyncType {
    /// The bitmask value matched against gate masks.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self as u32
    }

    /// Whether this operation carries the leading object-type bit.
    #[must_use]
    pub const fn has_obj_type_bit(self) -> bool {
        matches!(self, Self::Update | Self::Migrate)
    }
}

/// Well-known gate mask values used by entity schemas.
pub mod masks {
    /// Every sync type.
    pub const ALL: u32 = 127;
    /// Sync types 1, 2, 4, 16 and 64.
    pub const WITH_CREATE: u32 = 87;
    /// Sync types 2, 4, 16 and 64.
    pub const WITHOUT_CREATE: u32 = 86;
}

/// Three-field participation condition attached to every schema node.
///
/// Evaluation order:
/// 1. a non-zero `obj_mask` that does not intersect the object type fails;
/// 2. a `read_mask` that does not intersect the sync type fails;
/// 3. a `cond_mask` that intersects the sync type makes participation
///    depend on one presence bit in the stream;
/// 4. otherwise the node participates without consuming any bits.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GateMask {
    pub read_mask: u32,
    pub cond_mask: u32,
    pub obj_mask: u32,
}

impl GateMask {
    /// Creates a gate from its read, conditional and object-type masks.
    #[must_use]
    pub const fn new(read_mask: u32, cond_mask: u32, obj_mask: u32) -> Self {
        Self {
            read_mask,
            cond_mask,
            obj_mask,
        }
    }

    /// Whether the node participates before any presence bit is considered.
    #[must_use]
    pub const fn applies(&self, sync_type: u32, obj_type: u32) -> bool {
        if self.obj_mask != 0 && (obj_type & self.obj_mask) == 0 {
            return false;
        }
        (self.read_mask & sync_type) != 0
    }

    /// Whether participation is encoded as a presence bit for this sync type.
    #[must_use]
    pub const fn has_presence_bit(&self, sync_type: u32) -> bool {
        (self.cond_mask & sync_type) != 0
    }

    /// Whether the node carries the activation flag in its object-type mask.
    #[must_use]
    pub const fn is_additional(&self) -> bool {
        (self.obj_mask & 1) != 0
    }

    /// Decides participation while decoding, consuming the presence bit if
    /// one is encoded.
    pub fn should_read(
        &self,
        reader: &mut BitReader<'_>,
        sync_type: u32,
        obj_type: u32,
    ) -> BitResult<bool> {
        if !self.applies(sync_type, obj_type) {
            return Ok(false);
        }
        if self.has_presence_bit(sync_type) {
            return reader.read_bit();
        }
        Ok(true)
    }

    /// Decides participation while encoding. When a presence bit is encoded,
    /// `default` is written and returned.
    pub fn should_write(
        &self,
        writer: &mut BitWriter,
        sync_type: u32,
        obj_type: u32,
        default: bool,
    ) -> bool {
        if !self.applies(sync_type, obj_type) {
            return false;
        }
        if self.has_presence_bit(sync_type) {
            writer.write_bit(default);
            return default;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::masks::{ALL, WITH_CREATE, WITHOUT_CREATE};

    const CREATE: u32 = SyncType::Create.bits();
    const UPDATE: u32 = SyncType::Update.bits();

    #[test]
    fn read_mask_gates_participation() {
        let gate = GateMask::new(1, 0, 0);
        assert!(gate.applies(CREATE, 0));
        assert!(!gate.applies(UPDATE, 0));
    }

    #[test]
    fn obj_mask_gates_participation() {
        let gate = GateMask::new(ALL, 0, 1);
        assert!(!gate.applies(UPDATE, 0));
        assert!(gate.applies(UPDATE, 1));
    }

    #[test]
    fn should_read_consumes_presence_bit() {
        let gate = GateMask::new(ALL, WITH_CREATE, 0);
        let data = [0b0100_0000];
        let mut reader = BitReader::new(&data);
        assert!(!gate.should_read(&mut reader, UPDATE, 0).unwrap());
        assert!(gate.should_read(&mut reader, UPDATE, 0).unwrap());
        assert_eq!(reader.bit_position(), 2);
    }

    #[test]
    fn should_read_without_presence_bit_consumes_nothing() {
        let gate = GateMask::new(ALL, WITHOUT_CREATE, 0);
        let data = [0x00];
        let mut reader = BitReader::new(&data);
        assert!(gate.should_read(&mut reader, CREATE, 0).unwrap());
        assert_eq!(reader.bit_position(), 0);
    }

    #[test]
    fn failed_gate_consumes_nothing() {
        let gate = GateMask::new(4, 4, 0);
        let data = [0xFF];
        let mut reader = BitReader::new(&data);
        assert!(!gate.should_read(&mut reader, UPDATE, 1).unwrap());
        assert_eq!(reader.bit_position(), 0);

        let mut writer = BitWriter::new();
        assert!(!gate.should_write(&mut writer, UPDATE, 1, true));
        assert_eq!(writer.bits_written(), 0);
    }

    #[test]
    fn should_write_emits_default() {
        let gate = GateMask::new(ALL, WITHOUT_CREATE, 0);
        let mut writer = BitWriter::new();
        assert!(!gate.should_write(&mut writer, UPDATE, 0, false));
        assert!(gate.should_write(&mut writer, UPDATE, 0, true));
        assert_eq!(writer.bits_written(), 2);
        assert_eq!(writer.finish(), vec![0b0100_0000]);
    }

    #[test]
    fn should_write_ignores_default_without_presence_bit() {
        let gate = GateMask::new(ALL, 0, 0);
        let mut writer = BitWriter::new();
        assert!(gate.should_write(&mut writer, UPDATE, 0, false));
        assert_eq!(writer.bits_written(), 0);
    }

    #[test]
    fn additional_flag() {
        assert!(GateMask::new(4, 0, 1).is_additional());
        assert!(!GateMask::new(4, 0, 0).is_additional());
    }

    #[test]
    fn obj_type_bit_only_for_update_and_migrate() {
        assert!(!SyncType::Create.has_obj_type_bit());
        assert!(SyncType::Update.has_obj_type_bit());
        assert!(SyncType::Migrate.has_obj_type_bit());
    }
}
