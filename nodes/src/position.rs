//! Sector-relative position field groups.
//!
//! World positions are split into a coarse sector index ([`Sector`]) and a
//! sector-local offset carried by one of several alternative field groups,
//! depending on the entity kind.

use bitstream::BitResult;
use schema::{SerializeNode, Serializer};

/// Sector width along X and Y, in metres.
pub const SECTOR_SIZE_XY: f32 = 54.0;
/// Sector height along Z, in metres.
pub const SECTOR_SIZE_Z: f32 = 69.0;
/// Sector index of the world origin along X and Y.
pub const SECTOR_ORIGIN_XY: u16 = 512;
/// Depth of the lowest sector below zero height, in metres.
pub const SECTOR_FLOOR_Z: f32 = 1700.0;

/// Basic 3D vector.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    #[must_use]
    pub fn distance_sq(self, other: Self) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dx * dx + dy * dy + dz * dz
    }
}

impl From<[f32; 3]> for Vec3 {
    fn from([x, y, z]: [f32; 3]) -> Self {
        Self { x, y, z }
    }
}

impl From<Vec3> for [f32; 3] {
    fn from(v: Vec3) -> Self {
        [v.x, v.y, v.z]
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sector {
    pub x: u16,
    pub y: u16,
    pub z: u8,
}

impl Default for Sector {
    fn default() -> Self {
        Self {
            x: SECTOR_ORIGIN_XY,
            y: SECTOR_ORIGIN_XY,
            z: 0,
        }
    }
}

impl Sector {
    /// World-space corner of the sector.
    #[must_use]
    pub fn origin(&self) -> Vec3 {
        Vec3 {
            x: (f32::from(self.x) - f32::from(SECTOR_ORIGIN_XY)) * SECTOR_SIZE_XY,
            y: (f32::from(self.y) - f32::from(SECTOR_ORIGIN_XY)) * SECTOR_SIZE_XY,
            z: f32::from(self.z) * SECTOR_SIZE_Z - SECTOR_FLOOR_Z,
        }
    }

    /// Sector containing `world` and the offset of `world` inside it.
    #[must_use]
    pub fn split(world: Vec3) -> (Self, Vec3) {
        let sx = (world.x / SECTOR_SIZE_XY).floor() + f32::from(SECTOR_ORIGIN_XY);
        let sy = (world.y / SECTOR_SIZE_XY).floor() + f32::from(SECTOR_ORIGIN_XY);
        let sz = ((world.z + SECTOR_FLOOR_Z) / SECTOR_SIZE_Z).floor();
        let sector = Self {
            x: sx.clamp(0.0, 1023.0) as u16,
            y: sy.clamp(0.0, 1023.0) as u16,
            z: sz.clamp(0.0, 63.0) as u8,
        };
        let origin = sector.origin();
        let local = Vec3 {
            x: world.x - origin.x,
            y: world.y - origin.y,
            z: world.z - origin.z,
        };
        (sector, local)
    }
}

impl SerializeNode for Sector {
    const NAME: &'static str = "Sector";

    fn serialize<S: Serializer>(&mut self, s: &mut S) -> BitResult<()> {
        s.uint(&mut self.x, 10)?;
        s.uint(&mut self.y, 10)?;
        s.uint(&mut self.z, 6)
    }
}

fn sector_local<S: Serializer>(s: &mut S, pos: &mut Vec3, bits: u8) -> BitResult<()> {
    s.float(&mut pos.x, bits, SECTOR_SIZE_XY)?;
    s.float(&mut pos.y, bits, SECTOR_SIZE_XY)?;
    s.float(&mut pos.z, bits, SECTOR_SIZE_Z)
}

/// Sector-local offset used by vehicles.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SectorPosition {
    pub pos: Vec3,
}

impl SerializeNode for SectorPosition {
    const NAME: &'static str = "SectorPosition";

    fn serialize<S: Serializer>(&mut self, s: &mut S) -> BitResult<()> {
        sector_local(s, &mut self.pos, 12)
    }
}

/// Sector-local offset used by objects, optionally at 20-bit precision.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectSectorPos {
    pub high_res: bool,
    pub pos: Vec3,
}

impl SerializeNode for ObjectSectorPos {
    const NAME: &'static str = "ObjectSectorPos";

    fn serialize<S: Serializer>(&mut self, s: &mut S) -> BitResult<()> {
        s.bool(&mut self.high_res)?;
        let bits = if self.high_res { 20 } else { 12 };
        sector_local(s, &mut self.pos, bits)
    }
}

/// Entity a ped or player stands on, with the local offset on it.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StandingOn {
    /// Object id of the supporting entity.
    pub object_id: u16,
    pub offset: Vec3,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerSectorPos {
    pub has_extra: bool,
    pub flags: [bool; 2],
    pub standing_on: Option<StandingOn>,
    pub pos: Vec3,
}

impl SerializeNode for PlayerSectorPos {
    const NAME: &'static str = "PlayerSectorPos";

    fn serialize<S: Serializer>(&mut self, s: &mut S) -> BitResult<()> {
        self.has_extra |= self.standing_on.is_some();
        s.bool(&mut self.has_extra)?;
        if self.has_extra {
            s.bool(&mut self.flags[0])?;
            s.bool(&mut self.flags[1])?;
            let mut standing = self.standing_on.is_some();
            s.bool(&mut standing)?;
            if standing {
                let mut on = self.standing_on.unwrap_or_default();
                s.uint(&mut on.object_id, 13)?;
                s.signed_float(&mut on.offset.x, 14, 40.0)?;
                s.signed_float(&mut on.offset.y, 14, 40.0)?;
                s.signed_float(&mut on.offset.z, 10, 20.0)?;
                self.standing_on = Some(on);
            } else {
                self.standing_on = None;
            }
        }
        sector_local(s, &mut self.pos, 12)
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PedSectorPosMap {
    pub pos: Vec3,
    pub is_nm: bool,
    pub standing_on: Option<StandingOn>,
}

impl SerializeNode for PedSectorPosMap {
    const NAME: &'static str = "PedSectorPosMap";

    fn serialize<S: Serializer>(&mut self, s: &mut S) -> BitResult<()> {
        sector_local(s, &mut self.pos, 12)?;

        let mut has_extra = self.is_nm || self.standing_on.is_some();
        s.bool(&mut has_extra)?;
        if has_extra {
            s.bool(&mut self.is_nm)?;
            let mut standing = self.standing_on.is_some();
            s.bool(&mut standing)?;
            if standing {
                let mut on = self.standing_on.unwrap_or_default();
                s.uint(&mut on.object_id, 13)?;
                s.signed_float(&mut on.offset.x, 12, 16.0)?;
                s.signed_float(&mut on.offset.y, 12, 16.0)?;
                s.signed_float(&mut on.offset.z, 10, 4.0)?;
                self.standing_on = Some(on);
            } else {
                self.standing_on = None;
            }
        }
        Ok(())
    }
}

opaque_groups!(PedSectorPosNavMesh, PickupSectorPos);
