//! Vehicle field groups.

use bitstream::BitResult;
use schema::{SerializeNode, Serializer};

use crate::packing::{optional, stepped};
use crate::pop::PopType;

/// Health value reported when a component is undamaged.
pub const FULL_HEALTH: i32 = 1000;

const ANG_VELOCITY_STEP: f32 = 0.031_25;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VehicleCreation {
    pub model: u32,
    pub pop_type: u8,
    pub random_seed: u16,
    pub car_budget: bool,
    pub max_health: u32,
    pub status: u8,
    pub creation_token: u32,
    pub needs_hotwire: bool,
    pub tyres_dont_burst: bool,
    pub unk5: bool,
}

impl VehicleCreation {
    #[must_use]
    pub const fn pop_type(&self) -> Option<PopType> {
        PopType::from_raw(self.pop_type)
    }
}

impl SerializeNode for VehicleCreation {
    const NAME: &'static str = "VehicleCreation";

    fn serialize<S: Serializer>(&mut self, s: &mut S) -> BitResult<()> {
        s.uint(&mut self.model, 32)?;
        s.uint(&mut self.pop_type, 4)?;
        s.uint(&mut self.random_seed, 16)?;
        if matches!(self.pop_type(), Some(pop) if pop.is_script_owned()) {
            s.bool(&mut self.car_budget)?;
        }
        s.uint(&mut self.max_health, 19)?;
        s.uint(&mut self.status, 3)?;
        s.uint(&mut self.creation_token, 32)?;
        s.bool(&mut self.needs_hotwire)?;
        s.bool(&mut self.tyres_dont_burst)?;
        s.bool(&mut self.unk5)
    }
}

/// Door state at creation; individual doors are only sent when not all closed.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AutomobileCreation {
    pub all_doors_closed: bool,
    pub doors_closed: [bool; 10],
}

impl SerializeNode for AutomobileCreation {
    const NAME: &'static str = "AutomobileCreation";

    fn serialize<S: Serializer>(&mut self, s: &mut S) -> BitResult<()> {
        s.bool(&mut self.all_doors_closed)?;
        if !self.all_doors_closed {
            for door in &mut self.doors_closed {
                s.bool(door)?;
            }
        }
        Ok(())
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TyreStatus {
    pub heat: Option<u8>,
    pub burst: bool,
    pub on_rim: bool,
    pub unk: [bool; 2],
}

impl TyreStatus {
    /// 0 intact, 1 burst, 2 on rim.
    #[must_use]
    pub const fn state(&self) -> u8 {
        if self.on_rim {
            2
        } else if self.burst {
            1
        } else {
            0
        }
    }
}

/// Engine, petrol tank, body and tyre health.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VehicleHealth {
    pub flags: [bool; 2],
    pub engine_health: i32,
    pub petrol_tank_health: i32,
    /// Empty when every tyre is fine.
    pub tyres: Vec<TyreStatus>,
    /// Empty when no wheel carries extra state.
    pub wheel_extras: Vec<Option<u16>>,
    pub body_health: i32,
    pub unk_health: Option<i32>,
    pub last_damage: Option<(bool, u32)>,
    pub unk21: u8,
    pub total_repairs: u8,
    pub unk_token: Option<u64>,
}

impl Default for VehicleHealth {
    fn default() -> Self {
        Self {
            flags: [false; 2],
            engine_health: FULL_HEALTH,
            petrol_tank_health: FULL_HEALTH,
            tyres: Vec::new(),
            wheel_extras: Vec::new(),
            body_health: FULL_HEALTH,
            unk_health: None,
            last_damage: None,
            unk21: 0,
            total_repairs: 0,
            unk_token: None,
        }
    }
}

impl VehicleHealth {
    #[must_use]
    pub fn tyres_fine(&self) -> bool {
        self.tyres.is_empty()
    }

    /// Hash of the weapon that last damaged the vehicle.
    #[must_use]
    pub fn last_damage_source(&self) -> Option<u32> {
        self.last_damage.map(|(_, source)| source)
    }
}

impl SerializeNode for VehicleHealth {
    const NAME: &'static str = "VehicleHealth";

    fn serialize<S: Serializer>(&mut self, s: &mut S) -> BitResult<()> {
        s.bool(&mut self.flags[0])?;
        s.bool(&mut self.flags[1])?;

        let mut engine_damaged = self.engine_health != FULL_HEALTH;
        let mut tank_damaged = self.petrol_tank_health != FULL_HEALTH;
        s.bool(&mut engine_damaged)?;
        s.bool(&mut tank_damaged)?;
        if engine_damaged {
            s.signed(&mut self.engine_health, 19)?;
        } else {
            self.engine_health = FULL_HEALTH;
        }
        if tank_damaged {
            s.signed(&mut self.petrol_tank_health, 19)?;
        } else {
            self.petrol_tank_health = FULL_HEALTH;
        }

        let mut tyres_fine = self.tyres.is_empty();
        let mut no_extras = self.wheel_extras.is_empty();
        s.bool(&mut tyres_fine)?;
        s.bool(&mut no_extras)?;

        if !tyres_fine || !no_extras {
            let mut wheels = self.tyres.len().max(self.wheel_extras.len()) as u8;
            s.uint(&mut wheels, 4)?;
            let wheels = usize::from(wheels);

            if tyres_fine {
                self.tyres.clear();
            } else {
                self.tyres.resize(wheels, TyreStatus::default());
                for tyre in &mut self.tyres {
                    if s.build().at_least(2060) {
                        optional(s, &mut tyre.heat, 8)?;
                    }
                    s.bool(&mut tyre.burst)?;
                    s.bool(&mut tyre.on_rim)?;
                    s.bool(&mut tyre.unk[0])?;
                    s.bool(&mut tyre.unk[1])?;
                }
            }

            if no_extras {
                self.wheel_extras.clear();
            } else {
                self.wheel_extras.resize(wheels, None);
                for extra in &mut self.wheel_extras {
                    optional(s, extra, 10)?;
                }
            }
        } else {
            self.tyres.clear();
            self.wheel_extras.clear();
        }

        let mut body_fine = self.body_health == FULL_HEALTH;
        s.bool(&mut body_fine)?;
        if body_fine {
            self.body_health = FULL_HEALTH;
        } else {
            s.signed(&mut self.body_health, 19)?;
        }

        let mut unk_absent = self.unk_health.is_none();
        s.bool(&mut unk_absent)?;
        if unk_absent {
            self.unk_health = None;
        } else {
            let mut value = self.unk_health.unwrap_or_default();
            s.signed(&mut value, 19)?;
            self.unk_health = Some(value);
        }

        let mut has_damage = self.last_damage.is_some();
        s.bool(&mut has_damage)?;
        if has_damage {
            let (mut flag, mut source) = self.last_damage.unwrap_or_default();
            s.bool(&mut flag)?;
            s.uint(&mut source, 32)?;
            self.last_damage = Some((flag, source));
        } else {
            self.last_damage = None;
        }

        s.uint(&mut self.unk21, 4)?;
        s.uint(&mut self.total_repairs, 4)?;
        optional(s, &mut self.unk_token, 64)
    }
}

/// Angular velocity; a resting vehicle sends a flag instead of the vector.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VehicleAngVelocity {
    pub at_rest: bool,
    pub rest_flag: bool,
    pub velocity: [f32; 3],
}

impl SerializeNode for VehicleAngVelocity {
    const NAME: &'static str = "VehicleAngVelocity";

    fn serialize<S: Serializer>(&mut self, s: &mut S) -> BitResult<()> {
        s.bool(&mut self.at_rest)?;
        if self.at_rest {
            self.velocity = [0.0; 3];
            s.bool(&mut self.rest_flag)
        } else {
            for axis in &mut self.velocity {
                stepped(s, axis, 10, ANG_VELOCITY_STEP)?;
            }
            Ok(())
        }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VehicleSteering {
    /// Normalised to `[-1, 1]`.
    pub angle: f32,
}

impl SerializeNode for VehicleSteering {
    const NAME: &'static str = "VehicleSteering";

    fn serialize<S: Serializer>(&mut self, s: &mut S) -> BitResult<()> {
        s.signed_float(&mut self.angle, 10, 1.0)
    }
}

opaque_groups!(
    VehicleGameState,
    VehicleScriptGameState,
    VehicleAppearance,
    VehicleDamageStatus,
    VehicleComponentReservation,
    VehicleTask,
    VehicleControl,
    VehicleGadget,
    VehicleProximityMigration,
    BikeGameState,
    BoatGameState,
    HeliHealth,
    HeliControl,
    PlaneGameState,
    PlaneControl,
    SubmarineGameState,
    SubmarineControl,
);
