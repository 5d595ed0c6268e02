//! Door field groups.

use bitstream::BitResult;
use schema::{SerializeNode, Serializer};

use crate::packing::{optional, world_coords};
use crate::position::Vec3;
use crate::script::{script_info, ScriptObjectInfo};

/// Creation data; doors carry an absolute position instead of a sector.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DoorCreation {
    pub model: u32,
    pub pos: Vec3,
    pub script_door: bool,
    pub player_wants_control: bool,
}

impl SerializeNode for DoorCreation {
    const NAME: &'static str = "DoorCreation";

    fn serialize<S: Serializer>(&mut self, s: &mut S) -> BitResult<()> {
        s.uint(&mut self.model, 32)?;
        let mut pos: [f32; 3] = self.pos.into();
        world_coords(s, &mut pos)?;
        self.pos = pos.into();
        s.bool(&mut self.script_door)?;
        if self.script_door {
            self.player_wants_control = false;
        } else {
            s.bool(&mut self.player_wants_control)?;
        }
        Ok(())
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DoorMovement {
    pub is_manual: bool,
    /// Only meaningful for manual doors.
    pub open_ratio: f32,
    pub opening: bool,
    pub fully_open: bool,
    pub closed: bool,
}

impl SerializeNode for DoorMovement {
    const NAME: &'static str = "DoorMovement";

    fn serialize<S: Serializer>(&mut self, s: &mut S) -> BitResult<()> {
        s.bool(&mut self.is_manual)?;
        if self.is_manual {
            s.signed_float(&mut self.open_ratio, 8, 1.0)
        } else {
            s.bool(&mut self.opening)?;
            s.bool(&mut self.fully_open)?;
            s.bool(&mut self.closed)
        }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DoorScriptInfo {
    pub script: Option<ScriptObjectInfo>,
    pub door_system_hash: u32,
    pub existing_door_system_entry: bool,
}

impl SerializeNode for DoorScriptInfo {
    const NAME: &'static str = "DoorScriptInfo";

    fn serialize<S: Serializer>(&mut self, s: &mut S) -> BitResult<()> {
        script_info(s, &mut self.script)?;
        if self.script.is_some() {
            s.uint(&mut self.door_system_hash, 32)?;
            s.bool(&mut self.existing_door_system_entry)?;
        }
        Ok(())
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DoorAutomaticInfo {
    pub distance: f32,
    pub slide_rate: f32,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DoorScriptGameState {
    pub door_system_state: u8,
    pub automatic: Option<DoorAutomaticInfo>,
    pub broken_flags: Option<u32>,
    pub damaged_flags: Option<u32>,
    pub hold_open: bool,
}

impl SerializeNode for DoorScriptGameState {
    const NAME: &'static str = "DoorScriptGameState";

    fn serialize<S: Serializer>(&mut self, s: &mut S) -> BitResult<()> {
        s.uint(&mut self.door_system_state, 3)?;

        let mut has_automatic = self.automatic.is_some();
        s.bool(&mut has_automatic)?;
        if has_automatic {
            let mut info = self.automatic.unwrap_or_default();
            s.signed_float(&mut info.distance, 9, 100.0)?;
            s.signed_float(&mut info.slide_rate, 9, 30.0)?;
            self.automatic = Some(info);
        } else {
            self.automatic = None;
        }

        optional(s, &mut self.broken_flags, 18)?;
        optional(s, &mut self.damaged_flags, 18)?;
        s.bool(&mut self.hold_open)
    }
}
