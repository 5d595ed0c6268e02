//! Typed reads over a [`SyncTree`].
//!
//! Every accessor resolves its field group through the tree's own schema.
//! A kind that does not carry the group, or a leaf that has not received
//! content yet, reads as `None`.

use engine::SyncTree;

use crate::door::{DoorCreation, DoorMovement, DoorScriptGameState, DoorScriptInfo};
use crate::orientation::EntityOrientation;
use crate::ped::{PedCreation, PedHealth, PedOrientation};
use crate::physical::{PhysicalAngVelocity, PhysicalGameState, PhysicalVelocity};
use crate::pickup::PickupPlacementCreation;
use crate::player::PlayerCamera;
use crate::pop::PopType;
use crate::position::{
    ObjectSectorPos, PedSectorPosMap, PlayerSectorPos, Sector, SectorPosition, StandingOn, Vec3,
};
use crate::script::EntityScriptInfo;
use crate::train::TrainGameState;
use crate::vehicle::{VehicleAngVelocity, VehicleCreation, VehicleHealth};

/// Read accessors shared by every entity kind.
pub trait TreeAccessors {
    /// World-space position.
    ///
    /// Sector-based kinds combine [`Sector`] with the first sector-local
    /// offset present; a missing sector counts as the origin sector.
    /// Doors and pickup placements report their absolute creation position.
    fn position(&self) -> Vec3;

    fn velocity(&self) -> Option<Vec3>;

    /// Vehicle angular velocity, or the physical one for other kinds.
    fn angular_velocity(&self) -> Option<Vec3>;

    fn population_type(&self) -> Option<PopType>;

    fn model_hash(&self) -> Option<u32>;

    /// Hash of the script that owns the entity, if any.
    fn script_hash(&self) -> Option<u32>;

    fn is_visible(&self) -> Option<bool>;

    fn vehicle_health(&self) -> Option<VehicleHealth>;

    fn ped_health(&self) -> Option<PedHealth>;

    fn ped_orientation(&self) -> Option<PedOrientation>;

    fn entity_orientation(&self) -> Option<EntityOrientation>;

    fn door_movement(&self) -> Option<DoorMovement>;

    fn door_script_info(&self) -> Option<DoorScriptInfo>;

    fn door_script_game_state(&self) -> Option<DoorScriptGameState>;

    fn train_state(&self) -> Option<TrainGameState>;

    fn player_camera(&self) -> Option<PlayerCamera>;

    /// Entity a ped or player is standing on.
    fn standing_on(&self) -> Option<StandingOn>;
}

impl TreeAccessors for SyncTree {
    fn position(&self) -> Vec3 {
        if let Some(pos) = self.with_data(|door: &DoorCreation| door.pos) {
            return pos;
        }
        if let Some(pos) = self
            .with_data(|placement: &PickupPlacementCreation| placement.pos)
            .flatten()
        {
            return pos;
        }

        let origin = self.get::<Sector>().unwrap_or_default().origin();
        let local = sector_local(self).unwrap_or_default();
        Vec3::new(origin.x + local.x, origin.y + local.y, origin.z + local.z)
    }

    fn velocity(&self) -> Option<Vec3> {
        self.with_data(|v: &PhysicalVelocity| v.velocity.into())
    }

    fn angular_velocity(&self) -> Option<Vec3> {
        self.with_data(|v: &VehicleAngVelocity| v.velocity.into())
            .or_else(|| self.with_data(|v: &PhysicalAngVelocity| v.velocity.into()))
    }

    fn population_type(&self) -> Option<PopType> {
        self.with_data(VehicleCreation::pop_type)
            .or_else(|| self.with_data(PedCreation::pop_type))
            .flatten()
    }

    fn model_hash(&self) -> Option<u32> {
        self.with_data(|c: &VehicleCreation| c.model)
            .or_else(|| self.with_data(|c: &PedCreation| c.model))
            .or_else(|| self.with_data(|c: &DoorCreation| c.model))
    }

    fn script_hash(&self) -> Option<u32> {
        self.with_data(|info: &EntityScriptInfo| info.script.map(|script| script.script_hash))
            .or_else(|| {
                self.with_data(|info: &DoorScriptInfo| {
                    info.script.map(|script| script.script_hash)
                })
            })
            .flatten()
    }

    fn is_visible(&self) -> Option<bool> {
        self.with_data(|state: &PhysicalGameState| state.is_visible)
    }

    fn vehicle_health(&self) -> Option<VehicleHealth> {
        self.get()
    }

    fn ped_health(&self) -> Option<PedHealth> {
        self.get()
    }

    fn ped_orientation(&self) -> Option<PedOrientation> {
        self.get()
    }

    fn entity_orientation(&self) -> Option<EntityOrientation> {
        self.get()
    }

    fn door_movement(&self) -> Option<DoorMovement> {
        self.get()
    }

    fn door_script_info(&self) -> Option<DoorScriptInfo> {
        self.get()
    }

    fn door_script_game_state(&self) -> Option<DoorScriptGameState> {
        self.get()
    }

    fn train_state(&self) -> Option<TrainGameState> {
        self.get()
    }

    fn player_camera(&self) -> Option<PlayerCamera> {
        self.get()
    }

    fn standing_on(&self) -> Option<StandingOn> {
        self.with_data(|pos: &PlayerSectorPos| pos.standing_on)
            .or_else(|| self.with_data(|pos: &PedSectorPosMap| pos.standing_on))
            .flatten()
    }
}

fn sector_local(tree: &SyncTree) -> Option<Vec3> {
    tree.with_data(|p: &SectorPosition| p.pos)
        .or_else(|| tree.with_data(|p: &PlayerSectorPos| p.pos))
        .or_else(|| tree.with_data(|p: &ObjectSectorPos| p.pos))
        .or_else(|| tree.with_data(|p: &PedSectorPosMap| p.pos))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinds::{make_sync_tree, EntityKind};
    use crate::script::ScriptObjectInfo;
    use engine::EngineConfig;

    fn tree(kind: EntityKind) -> SyncTree {
        make_sync_tree(kind, EngineConfig::for_testing())
    }

    #[test]
    fn empty_tree_sits_at_origin_sector() {
        let automobile = tree(EntityKind::Automobile);
        assert_eq!(automobile.position(), Vec3::new(0.0, 0.0, -1700.0));
        assert!(automobile.vehicle_health().is_none());
        assert!(automobile.model_hash().is_none());
    }

    #[test]
    fn sector_and_offset_compose() {
        let automobile = tree(EntityKind::Automobile);
        automobile
            .set_data(Sector {
                x: 514,
                y: 500,
                z: 25,
            })
            .unwrap();
        automobile
            .set_data(SectorPosition {
                pos: Vec3::new(10.0, 20.0, 30.0),
            })
            .unwrap();
        let pos = automobile.position();
        assert!((pos.x - (2.0 * 54.0 + 10.0)).abs() < 0.05);
        assert!((pos.y - (-12.0 * 54.0 + 20.0)).abs() < 0.05);
        assert!((pos.z - (25.0 * 69.0 - 1700.0 + 30.0)).abs() < 0.05);
    }

    #[test]
    fn door_uses_absolute_creation_position() {
        let door = tree(EntityKind::Door);
        door.set_data(DoorCreation {
            model: 0x1234,
            pos: Vec3::new(-500.0, 250.0, 40.0),
            ..DoorCreation::default()
        })
        .unwrap();
        let pos = door.position();
        assert!((pos.x + 500.0).abs() < 0.2);
        assert!((pos.y - 250.0).abs() < 0.2);
        assert!((pos.z - 40.0).abs() < 0.05);
        assert_eq!(door.model_hash(), Some(0x1234));
    }

    #[test]
    fn placement_without_position_falls_back() {
        let placement = tree(EntityKind::PickupPlacement);
        placement
            .set_data(PickupPlacementCreation { pos: None })
            .unwrap();
        assert_eq!(placement.position(), Vec3::new(0.0, 0.0, -1700.0));
    }

    #[test]
    fn kinds_without_a_group_report_none() {
        let door = tree(EntityKind::Door);
        assert!(door.vehicle_health().is_none());
        assert!(door.ped_health().is_none());
        assert!(door.velocity().is_none());
        assert!(door.population_type().is_none());

        let ped = tree(EntityKind::Ped);
        assert!(ped.door_movement().is_none());
        assert!(ped.train_state().is_none());
    }

    #[test]
    fn ped_reads() {
        let ped = tree(EntityKind::Ped);
        ped.set_data(PedCreation {
            pop_type: PopType::Mission.raw(),
            model: 0xC0DE,
            max_health: 200,
            ..PedCreation::default()
        })
        .unwrap();
        ped.set_data(PedSectorPosMap {
            pos: Vec3::new(1.0, 2.0, 3.0),
            is_nm: false,
            standing_on: Some(StandingOn {
                object_id: 31,
                offset: Vec3::default(),
            }),
        })
        .unwrap();
        assert_eq!(ped.population_type(), Some(PopType::Mission));
        assert_eq!(ped.model_hash(), Some(0xC0DE));
        assert_eq!(ped.standing_on().map(|on| on.object_id), Some(31));
        assert!((ped.position().x - 1.0).abs() < 0.05);
    }

    #[test]
    fn script_hash_comes_from_either_script_group() {
        let object = tree(EntityKind::Object);
        object
            .set_data(EntityScriptInfo {
                script: Some(ScriptObjectInfo {
                    script_hash: 0xFEED,
                    ..ScriptObjectInfo::default()
                }),
            })
            .unwrap();
        assert_eq!(object.script_hash(), Some(0xFEED));

        let door = tree(EntityKind::Door);
        door.set_data(DoorScriptInfo::default()).unwrap();
        assert_eq!(door.script_hash(), None);
    }

    #[test]
    fn angular_velocity_prefers_vehicle_group() {
        let automobile = tree(EntityKind::Automobile);
        automobile
            .set_data(VehicleAngVelocity {
                at_rest: false,
                rest_flag: false,
                velocity: [0.5, 0.0, -0.5],
            })
            .unwrap();
        let spin = automobile.angular_velocity().unwrap();
        assert!((spin.x - 0.5).abs() < 0.05);
        assert!((spin.z + 0.5).abs() < 0.05);
    }
}
