//! Ped field groups, shared with players where the layout is the same.

use std::f32::consts::TAU;

use bitstream::BitResult;
use schema::{SerializeNode, Serializer};

use crate::packing::optional;
use crate::pop::PopType;

/// Max health assumed until a ped reports its own.
pub const DEFAULT_PED_MAX_HEALTH: u16 = 200;

/// Number of task-specific slots a ped tree carries.
pub const PED_TASK_SLOTS: usize = 8;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VehicleSeat {
    pub vehicle_id: u16,
    pub seat: u8,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PedCreation {
    pub respawn_object_id: bool,
    pub respawn_flagged_for_removal: bool,
    pub pop_type: u8,
    pub model: u32,
    pub random_seed: u16,
    pub voice_hash: u32,
    /// Vehicle the ped was created in.
    pub vehicle: Option<VehicleSeat>,
    pub prop: Option<u32>,
    pub is_standing: bool,
    pub attribute_damage_to_player: Option<u8>,
    pub max_health: u16,
    pub unk_bool: bool,
}

impl PedCreation {
    #[must_use]
    pub const fn pop_type(&self) -> Option<PopType> {
        PopType::from_raw(self.pop_type)
    }
}

impl SerializeNode for PedCreation {
    const NAME: &'static str = "PedCreation";

    fn serialize<S: Serializer>(&mut self, s: &mut S) -> BitResult<()> {
        s.bool(&mut self.respawn_object_id)?;
        s.bool(&mut self.respawn_flagged_for_removal)?;
        s.uint(&mut self.pop_type, 4)?;
        s.uint(&mut self.model, 32)?;
        s.uint(&mut self.random_seed, 16)?;

        let mut in_vehicle = self.vehicle.is_some();
        s.bool(&mut in_vehicle)?;
        s.uint(&mut self.voice_hash, 32)?;
        if in_vehicle {
            let mut seat = self.vehicle.unwrap_or_default();
            s.uint(&mut seat.vehicle_id, 13)?;
            s.uint(&mut seat.seat, 5)?;
            self.vehicle = Some(seat);
        } else {
            self.vehicle = None;
        }

        optional(s, &mut self.prop, 32)?;
        s.bool(&mut self.is_standing)?;
        optional(s, &mut self.attribute_damage_to_player, 5)?;
        s.uint(&mut self.max_health, 13)?;
        s.bool(&mut self.unk_bool)
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PedHealth {
    pub health: u16,
    /// Only sent when it differs from [`DEFAULT_PED_MAX_HEALTH`].
    pub max_health: Option<u16>,
    pub killed_with_headshot: bool,
    pub killed_with_melee: bool,
    pub armour: u16,
    pub unk1: Option<u16>,
    pub unk2: Option<u16>,
    /// Object id of the entity that last damaged the ped.
    pub source_of_damage: Option<u16>,
    pub cause_of_death: u32,
    pub hurt_started: bool,
    pub hurt_end_time: u8,
    pub weapon_damage_component: Option<u8>,
}

impl PedHealth {
    #[must_use]
    pub fn max_health(&self) -> u16 {
        self.max_health.unwrap_or(DEFAULT_PED_MAX_HEALTH)
    }
}

impl SerializeNode for PedHealth {
    const NAME: &'static str = "PedHealth";

    fn serialize<S: Serializer>(&mut self, s: &mut S) -> BitResult<()> {
        let mut is_fine = self.health == self.max_health()
            && !self.killed_with_headshot
            && !self.killed_with_melee;
        s.bool(&mut is_fine)?;
        optional(s, &mut self.max_health, 13)?;

        if is_fine {
            self.health = self.max_health();
            self.killed_with_headshot = false;
            self.killed_with_melee = false;
        } else {
            s.uint(&mut self.health, 13)?;
            s.bool(&mut self.killed_with_headshot)?;
            s.bool(&mut self.killed_with_melee)?;
        }

        let mut no_armour = self.armour == 0;
        s.bool(&mut no_armour)?;
        if no_armour {
            self.armour = 0;
        } else {
            s.uint(&mut self.armour, 13)?;
        }

        if s.build().at_least(2060) {
            let mut unk1_absent = self.unk1.is_none();
            let mut unk2_present = self.unk2.is_some();
            s.bool(&mut unk1_absent)?;
            s.bool(&mut unk2_present)?;
            if unk2_present {
                let mut value = self.unk2.unwrap_or_default();
                s.uint(&mut value, 13)?;
                self.unk2 = Some(value);
            } else {
                self.unk2 = None;
            }
            if unk1_absent {
                self.unk1 = None;
            } else {
                let mut value = self.unk1.unwrap_or_default();
                s.uint(&mut value, 13)?;
                self.unk1 = Some(value);
            }
        }

        optional(s, &mut self.source_of_damage, 13)?;
        s.uint(&mut self.cause_of_death, 32)?;
        s.bool(&mut self.hurt_started)?;
        s.uint(&mut self.hurt_end_time, 2)?;
        optional(s, &mut self.weapon_damage_component, 8)
    }
}

/// Headings in radians.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PedOrientation {
    pub current_heading: f32,
    pub desired_heading: f32,
}

impl SerializeNode for PedOrientation {
    const NAME: &'static str = "PedOrientation";

    fn serialize<S: Serializer>(&mut self, s: &mut S) -> BitResult<()> {
        s.signed_float(&mut self.current_heading, 8, TAU)?;
        s.signed_float(&mut self.desired_heading, 8, TAU)
    }
}

const TASK_SLOT_NAMES: [&str; PED_TASK_SLOTS] = [
    "PedTaskSpecific0",
    "PedTaskSpecific1",
    "PedTaskSpecific2",
    "PedTaskSpecific3",
    "PedTaskSpecific4",
    "PedTaskSpecific5",
    "PedTaskSpecific6",
    "PedTaskSpecific7",
];

/// One of the eight task-specific slots; each slot is its own field group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PedTaskSpecific<const SLOT: u8>;

impl<const SLOT: u8> SerializeNode for PedTaskSpecific<SLOT> {
    const NAME: &'static str = TASK_SLOT_NAMES[SLOT as usize];
    const DECODED: bool = false;

    fn serialize<S: Serializer>(&mut self, _s: &mut S) -> BitResult<()> {
        Ok(())
    }
}

opaque_groups!(
    PedScriptCreation,
    PedGameState,
    PedComponentReservation,
    PedScriptGameState,
    PedAttach,
    PedMovementGroup,
    PedAi,
    PedAppearance,
    PedMovement,
    PedTaskTree,
    PedInventory,
    PedTaskSequence,
);
