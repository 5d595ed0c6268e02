//! Field groups shared by every physical entity.

use bitstream::BitResult;
use schema::{SerializeNode, Serializer};

use crate::packing::{optional, stepped};

const VELOCITY_STEP: f32 = 0.0625;
const ANG_VELOCITY_STEP: f32 = 0.031_25;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhysicalGameState {
    pub is_visible: bool,
    pub flag2: bool,
    pub flag3: bool,
    pub flag4: bool,
    pub val1: u8,
    pub unk204: Option<u16>,
    pub unk5: bool,
}

impl SerializeNode for PhysicalGameState {
    const NAME: &'static str = "PhysicalGameState";

    fn serialize<S: Serializer>(&mut self, s: &mut S) -> BitResult<()> {
        s.bool(&mut self.is_visible)?;
        s.bool(&mut self.flag2)?;
        s.bool(&mut self.flag3)?;
        s.bool(&mut self.flag4)?;
        if self.flag4 {
            s.uint(&mut self.val1, 3)?;
            if s.build().at_least(2060) {
                optional(s, &mut self.unk204, 16)?;
            }
        } else {
            self.val1 = 0;
        }
        if s.build().at_least(2545) {
            s.bool(&mut self.unk5)?;
        }
        Ok(())
    }
}

/// Linear velocity in metres per second, 1/16 precision.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhysicalVelocity {
    pub velocity: [f32; 3],
}

impl SerializeNode for PhysicalVelocity {
    const NAME: &'static str = "PhysicalVelocity";

    fn serialize<S: Serializer>(&mut self, s: &mut S) -> BitResult<()> {
        for axis in &mut self.velocity {
            stepped(s, axis, 12, VELOCITY_STEP)?;
        }
        Ok(())
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhysicalAngVelocity {
    pub velocity: [f32; 3],
}

impl SerializeNode for PhysicalAngVelocity {
    const NAME: &'static str = "PhysicalAngVelocity";

    fn serialize<S: Serializer>(&mut self, s: &mut S) -> BitResult<()> {
        for axis in &mut self.velocity {
            stepped(s, axis, 10, ANG_VELOCITY_STEP)?;
        }
        Ok(())
    }
}

opaque_groups!(
    GlobalFlags,
    DynamicEntityGameState,
    PhysicalAttach,
    PhysicalHealth,
    Migration,
    PhysicalMigration,
    PhysicalScriptMigration,
);
