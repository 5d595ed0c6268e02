//! Entity-kind schemas and field-group content.
//!
//! This crate gives the generic sync-tree engine its concrete shape:
//! - [`EntityKind`] and one schema builder per kind, cached by [`schema_for`]
//! - decoded field groups (creation data, health, positions, orientation, doors, trains)
//! - opaque field groups carried as raw payload only
//! - [`TreeAccessors`], typed reads that tolerate kinds lacking a field group
//!
//! # Design Principles
//!
//! - **Layouts are fixed** - Gates and capacities match what peers put on the wire.
//! - **Decode what is read** - Groups no server path consumes stay opaque.
//! - **Absent is not an error** - Every accessor returns `None` for kinds without the group.

#[macro_use]
mod macros;

mod accessors;
mod door;
mod error;
mod kinds;
mod object;
mod orientation;
mod packing;
mod ped;
mod physical;
mod pickup;
mod player;
mod pop;
mod position;
mod script;
mod train;
mod vehicle;

pub use accessors::TreeAccessors;
pub use door::{DoorAutomaticInfo, DoorCreation, DoorMovement, DoorScriptGameState, DoorScriptInfo};
pub use error::NodesError;
pub use kinds::{definition, make_sync_tree, schema_for, EntityKind};
pub use object::{ObjectCreation, ObjectGameState, ObjectScriptGameState};
pub use orientation::{CompressedQuaternion, EntityOrientation, ObjectOrientation};
pub use ped::{
    PedAi, PedAppearance, PedAttach, PedComponentReservation, PedCreation, PedGameState,
    PedHealth, PedInventory, PedMovement, PedMovementGroup, PedOrientation, PedScriptCreation,
    PedScriptGameState, PedTaskSequence, PedTaskSpecific, PedTaskTree, VehicleSeat,
    DEFAULT_PED_MAX_HEALTH, PED_TASK_SLOTS,
};
pub use physical::{
    DynamicEntityGameState, GlobalFlags, Migration, PhysicalAngVelocity, PhysicalAttach,
    PhysicalGameState, PhysicalHealth, PhysicalMigration, PhysicalScriptMigration,
    PhysicalVelocity,
};
pub use pickup::{
    PickupCreation, PickupPlacementCreation, PickupPlacementState, PickupScriptGameState,
};
pub use player::{
    CameraMode, PlayerAmbientModelStreaming, PlayerAppearance, PlayerCamera, PlayerCreation,
    PlayerExtendedGameState, PlayerGameState, PlayerGamer, PlayerPedGroup, PlayerWantedAndLos,
};
pub use pop::PopType;
pub use position::{
    ObjectSectorPos, PedSectorPosMap, PedSectorPosNavMesh, PickupSectorPos, PlayerSectorPos,
    Sector, SectorPosition, StandingOn, Vec3, SECTOR_FLOOR_Z, SECTOR_ORIGIN_XY, SECTOR_SIZE_XY,
    SECTOR_SIZE_Z,
};
pub use script::{
    EntityScriptGameState, EntityScriptInfo, PhysicalScriptGameState, ScriptObjectInfo,
};
pub use train::TrainGameState;
pub use vehicle::{
    AutomobileCreation, BikeGameState, BoatGameState, HeliControl, HeliHealth, PlaneControl,
    PlaneGameState, SubmarineControl, SubmarineGameState, TyreStatus, VehicleAngVelocity,
    VehicleAppearance, VehicleComponentReservation, VehicleControl, VehicleCreation,
    VehicleDamageStatus, VehicleGadget, VehicleGameState, VehicleHealth,
    VehicleProximityMigration, VehicleScriptGameState, VehicleSteering, VehicleTask,
    FULL_HEALTH,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_api_exports() {
        assert_eq!(EntityKind::ALL.len(), 14);
        assert_eq!(PED_TASK_SLOTS, 8);
        assert_eq!(DEFAULT_PED_MAX_HEALTH, 200);
        assert_eq!(Sector::default().origin(), Vec3::new(0.0, 0.0, -SECTOR_FLOOR_Z));
        let _ = NodesError::UnknownKind(99);
    }
}
