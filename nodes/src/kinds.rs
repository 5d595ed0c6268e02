//! Entity kinds and their sync-tree schemas.
//!
//! Every schema is a small builder function returning a [`NodeDef`] tree;
//! [`schema_for`] flattens each one once and caches the result.

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

use engine::{EngineConfig, SyncTree};
use schema::{branch, leaf, EntitySchema, GateMask, NodeDef};
use tracing::debug;

use crate::door::{DoorCreation, DoorMovement, DoorScriptGameState, DoorScriptInfo};
use crate::error::NodesError;
use crate::object::{ObjectCreation, ObjectGameState, ObjectScriptGameState};
use crate::orientation::{EntityOrientation, ObjectOrientation};
use crate::ped::{
    PedAi, PedAppearance, PedAttach, PedComponentReservation, PedCreation, PedGameState,
    PedHealth, PedInventory, PedMovement, PedMovementGroup, PedOrientation, PedScriptCreation,
    PedScriptGameState, PedTaskSequence, PedTaskSpecific, PedTaskTree,
};
use crate::physical::{
    DynamicEntityGameState, GlobalFlags, Migration, PhysicalAngVelocity, PhysicalAttach,
    PhysicalGameState, PhysicalHealth, PhysicalMigration, PhysicalScriptMigration,
    PhysicalVelocity,
};
use crate::pickup::{
    PickupCreation, PickupPlacementCreation, PickupPlacementState, PickupScriptGameState,
};
use crate::player::{
    PlayerAmbientModelStreaming, PlayerAppearance, PlayerCamera, PlayerCreation,
    PlayerExtendedGameState, PlayerGameState, PlayerGamer, PlayerPedGroup, PlayerWantedAndLos,
};
use crate::position::{
    ObjectSectorPos, PedSectorPosMap, PedSectorPosNavMesh, PickupSectorPos, PlayerSectorPos,
    Sector, SectorPosition,
};
use crate::script::{EntityScriptGameState, EntityScriptInfo, PhysicalScriptGameState};
use crate::train::TrainGameState;
use crate::vehicle::{
    AutomobileCreation, BikeGameState, BoatGameState, HeliControl, HeliHealth, PlaneControl,
    PlaneGameState, SubmarineControl, SubmarineGameState, VehicleAngVelocity, VehicleAppearance,
    VehicleComponentReservation, VehicleControl, VehicleCreation, VehicleDamageStatus,
    VehicleGadget, VehicleGameState, VehicleHealth, VehicleProximityMigration,
    VehicleScriptGameState, VehicleSteering, VehicleTask,
};

/// Networked entity kinds, in wire order.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum EntityKind {
    Automobile = 0,
    Bike = 1,
    Boat = 2,
    Door = 3,
    Heli = 4,
    Object = 5,
    Ped = 6,
    Pickup = 7,
    PickupPlacement = 8,
    Plane = 9,
    Submarine = 10,
    Player = 11,
    Trailer = 12,
    Train = 13,
}

impl EntityKind {
    pub const ALL: [Self; 14] = [
        Self::Automobile,
        Self::Bike,
        Self::Boat,
        Self::Door,
        Self::Heli,
        Self::Object,
        Self::Ped,
        Self::Pickup,
        Self::PickupPlacement,
        Self::Plane,
        Self::Submarine,
        Self::Player,
        Self::Trailer,
        Self::Train,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Automobile => "automobile",
            Self::Bike => "bike",
            Self::Boat => "boat",
            Self::Door => "door",
            Self::Heli => "heli",
            Self::Object => "object",
            Self::Ped => "ped",
            Self::Pickup => "pickup",
            Self::PickupPlacement => "pickup_placement",
            Self::Plane => "plane",
            Self::Submarine => "submarine",
            Self::Player => "player",
            Self::Trailer => "trailer",
            Self::Train => "train",
        }
    }

    #[must_use]
    pub const fn is_vehicle(self) -> bool {
        matches!(
            self,
            Self::Automobile
                | Self::Bike
                | Self::Boat
                | Self::Heli
                | Self::Plane
                | Self::Submarine
                | Self::Trailer
                | Self::Train
        )
    }

    /// Peds and players.
    #[must_use]
    pub const fn is_ped(self) -> bool {
        matches!(self, Self::Ped | Self::Player)
    }
}

impl TryFrom<u8> for EntityKind {
    type Error = NodesError;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .get(usize::from(raw))
            .copied()
            .ok_or(NodesError::UnknownKind(raw))
    }
}

impl FromStr for EntityKind {
    type Err = NodesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| NodesError::UnknownKindName(s.to_owned()))
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Cached schema for `kind`.
#[must_use]
pub fn schema_for(kind: EntityKind) -> Arc<EntitySchema> {
    static SCHEMAS: OnceLock<Vec<Arc<EntitySchema>>> = OnceLock::new();
    let schemas = SCHEMAS.get_or_init(|| {
        EntityKind::ALL
            .iter()
            .map(|&kind| {
                let schema = EntitySchema::new(kind.name(), definition(kind))
                    .expect("built-in entity schemas are valid");
                debug!(
                    kind = kind.name(),
                    leaves = schema.leaves().len(),
                    hash = schema.hash(),
                    "built entity schema"
                );
                Arc::new(schema)
            })
            .collect()
    });
    Arc::clone(&schemas[kind as usize])
}

/// Fresh sync tree for an entity of `kind`.
#[must_use]
pub fn make_sync_tree(kind: EntityKind, config: EngineConfig) -> SyncTree {
    SyncTree::with_config(schema_for(kind), config)
}

/// Definition tree of `kind`.
#[must_use]
pub fn definition(kind: EntityKind) -> NodeDef {
    match kind {
        EntityKind::Automobile => vehicle(VehicleLayout {
            creation: automobile_creation(),
            ..VehicleLayout::default()
        }),
        EntityKind::Bike => vehicle(VehicleLayout {
            state_extra: vec![leaf::<BikeGameState>(gate(127, 127, 0), 1)],
            ..VehicleLayout::default()
        }),
        EntityKind::Boat => vehicle(VehicleLayout {
            outer: gate(127, 87, 0),
            inner: gate(127, 87, 0),
            state: gate(127, 87, 0),
            state_extra: vec![leaf::<BoatGameState>(gate(87, 87, 0), 5)],
            ..VehicleLayout::default()
        }),
        EntityKind::Door => door(),
        EntityKind::Heli => vehicle(VehicleLayout {
            creation: automobile_creation(),
            outer: gate(127, 87, 0),
            trailing: vec![leaf::<HeliHealth>(gate(87, 87, 0), 16)],
            control_extra: vec![leaf::<HeliControl>(gate(86, 86, 0), 8)],
            ..VehicleLayout::default()
        }),
        EntityKind::Object => object(),
        EntityKind::Ped => ped(),
        EntityKind::Pickup => pickup(),
        EntityKind::PickupPlacement => pickup_placement(),
        EntityKind::Plane => vehicle(VehicleLayout {
            trailing: vec![leaf::<PlaneGameState>(gate(127, 127, 0), 52)],
            control_extra: vec![leaf::<PlaneControl>(gate(86, 86, 0), 7)],
            ..VehicleLayout::default()
        }),
        EntityKind::Submarine => vehicle(VehicleLayout {
            outer: gate(127, 87, 0),
            inner: gate(127, 87, 0),
            state: gate(127, 87, 0),
            state_extra: vec![leaf::<SubmarineGameState>(gate(87, 87, 0), 1)],
            control_extra: vec![leaf::<SubmarineControl>(gate(86, 86, 0), 4)],
            ..VehicleLayout::default()
        }),
        EntityKind::Player => player(),
        EntityKind::Trailer => vehicle(VehicleLayout {
            creation: automobile_creation(),
            ..VehicleLayout::default()
        }),
        EntityKind::Train => vehicle(VehicleLayout {
            state_extra: vec![leaf::<TrainGameState>(gate(127, 127, 0), 16)],
            ..VehicleLayout::default()
        }),
    }
}

const fn gate(read: u32, cond: u32, obj: u32) -> GateMask {
    GateMask::new(read, cond, obj)
}

fn root(children: Vec<NodeDef>) -> NodeDef {
    branch(gate(127, 0, 0), children)
}

fn creation(children: Vec<NodeDef>) -> NodeDef {
    branch(gate(1, 0, 0), children)
}

fn automobile_creation() -> Vec<NodeDef> {
    vec![
        leaf::<VehicleCreation>(gate(1, 0, 0), 14),
        leaf::<AutomobileCreation>(gate(1, 0, 0), 2),
    ]
}

fn physical_migration() -> Vec<NodeDef> {
    vec![
        leaf::<Migration>(gate(4, 0, 0), 13),
        leaf::<PhysicalMigration>(gate(4, 0, 0), 1),
        leaf::<PhysicalScriptMigration>(gate(4, 0, 1), 1),
    ]
}

/// The parts in which vehicle trees differ from one another.
struct VehicleLayout {
    creation: Vec<NodeDef>,
    outer: GateMask,
    inner: GateMask,
    state: GateMask,
    /// Appended to the game-state group.
    state_extra: Vec<NodeDef>,
    /// Appended after the vehicle task leaf.
    trailing: Vec<NodeDef>,
    /// Appended to the control group.
    control_extra: Vec<NodeDef>,
}

impl Default for VehicleLayout {
    fn default() -> Self {
        Self {
            creation: vec![leaf::<VehicleCreation>(gate(1, 0, 0), 14)],
            outer: gate(127, 127, 0),
            inner: gate(127, 127, 0),
            state: gate(127, 127, 0),
            state_extra: Vec::new(),
            trailing: Vec::new(),
            control_extra: Vec::new(),
        }
    }
}

fn vehicle(layout: VehicleLayout) -> NodeDef {
    let mut state = vec![
        leaf::<GlobalFlags>(gate(127, 127, 0), 2),
        leaf::<DynamicEntityGameState>(gate(127, 127, 0), 102),
        leaf::<PhysicalGameState>(gate(127, 127, 0), 4),
        leaf::<VehicleGameState>(gate(127, 127, 0), 57),
    ];
    state.extend(layout.state_extra);

    let script = vec![
        leaf::<EntityScriptGameState>(gate(127, 127, 1), 1),
        leaf::<PhysicalScriptGameState>(gate(127, 127, 1), 13),
        leaf::<VehicleScriptGameState>(gate(127, 127, 1), 48),
        leaf::<EntityScriptInfo>(gate(127, 127, 1), 24),
    ];

    let mut game_state = vec![
        branch(
            layout.inner,
            vec![branch(layout.state, state), branch(gate(127, 127, 1), script)],
        ),
        leaf::<PhysicalAttach>(gate(127, 127, 0), 28),
        leaf::<VehicleAppearance>(gate(127, 127, 0), 179),
        leaf::<VehicleDamageStatus>(gate(127, 127, 0), 34),
        leaf::<VehicleComponentReservation>(gate(127, 127, 0), 65),
        leaf::<VehicleHealth>(gate(127, 127, 0), 57),
        leaf::<VehicleTask>(gate(127, 127, 0), 34),
    ];
    game_state.extend(layout.trailing);

    let mut control = vec![
        leaf::<VehicleSteering>(gate(86, 86, 0), 2),
        leaf::<VehicleControl>(gate(87, 87, 0), 28),
        leaf::<VehicleGadget>(gate(127, 127, 0), 30),
    ];
    control.extend(layout.control_extra);

    let movement = vec![
        leaf::<Sector>(gate(87, 87, 0), 4),
        leaf::<SectorPosition>(gate(87, 87, 0), 5),
        leaf::<EntityOrientation>(gate(87, 87, 0), 5),
        leaf::<PhysicalVelocity>(gate(87, 87, 0), 5),
        leaf::<VehicleAngVelocity>(gate(87, 87, 0), 4),
        branch(gate(127, 86, 0), control),
    ];

    let mut migration = physical_migration();
    migration.push(leaf::<VehicleProximityMigration>(gate(4, 0, 0), 36));

    root(vec![
        creation(layout.creation),
        branch(layout.outer, game_state),
        branch(gate(127, 86, 0), movement),
        branch(gate(4, 0, 0), migration),
    ])
}

fn door() -> NodeDef {
    root(vec![
        creation(vec![leaf::<DoorCreation>(gate(1, 0, 0), 12)]),
        branch(
            gate(127, 127, 0),
            vec![
                leaf::<GlobalFlags>(gate(127, 127, 0), 2),
                leaf::<DoorScriptInfo>(gate(127, 127, 1), 28),
                leaf::<DoorScriptGameState>(gate(127, 127, 1), 8),
            ],
        ),
        leaf::<DoorMovement>(gate(86, 86, 0), 2),
        branch(
            gate(4, 0, 0),
            vec![
                leaf::<Migration>(gate(4, 0, 0), 13),
                leaf::<PhysicalScriptMigration>(gate(4, 0, 1), 1),
            ],
        ),
    ])
}

fn object() -> NodeDef {
    root(vec![
        creation(vec![leaf::<ObjectCreation>(gate(1, 0, 0), 18)]),
        branch(
            gate(127, 127, 0),
            vec![
                branch(
                    gate(127, 127, 0),
                    vec![
                        branch(
                            gate(127, 127, 0),
                            vec![
                                leaf::<GlobalFlags>(gate(127, 127, 0), 2),
                                leaf::<DynamicEntityGameState>(gate(127, 127, 0), 102),
                                leaf::<PhysicalGameState>(gate(127, 127, 0), 4),
                                leaf::<ObjectGameState>(gate(127, 127, 0), 44),
                            ],
                        ),
                        branch(
                            gate(127, 127, 1),
                            vec![
                                leaf::<EntityScriptGameState>(gate(127, 127, 1), 1),
                                leaf::<PhysicalScriptGameState>(gate(127, 127, 1), 13),
                                leaf::<ObjectScriptGameState>(gate(127, 127, 1), 12),
                                leaf::<EntityScriptInfo>(gate(127, 127, 1), 24),
                            ],
                        ),
                    ],
                ),
                leaf::<PhysicalAttach>(gate(127, 127, 0), 28),
                leaf::<PhysicalHealth>(gate(127, 127, 0), 19),
            ],
        ),
        branch(
            gate(87, 87, 0),
            vec![
                leaf::<Sector>(gate(87, 87, 0), 4),
                leaf::<ObjectSectorPos>(gate(87, 87, 0), 8),
                leaf::<ObjectOrientation>(gate(87, 87, 0), 8),
                leaf::<PhysicalVelocity>(gate(87, 87, 0), 5),
                leaf::<PhysicalAngVelocity>(gate(87, 87, 0), 4),
            ],
        ),
        branch(gate(4, 0, 0), physical_migration()),
    ])
}

fn ped_task_slots() -> NodeDef {
    let specific = gate(87, 87, 0);
    branch(
        gate(127, 87, 0),
        vec![
            leaf::<PedTaskTree>(gate(127, 127, 0), 28),
            leaf::<PedTaskSpecific<0>>(specific, 77),
            leaf::<PedTaskSpecific<1>>(specific, 77),
            leaf::<PedTaskSpecific<2>>(specific, 77),
            leaf::<PedTaskSpecific<3>>(specific, 77),
            leaf::<PedTaskSpecific<4>>(specific, 77),
            leaf::<PedTaskSpecific<5>>(specific, 77),
            leaf::<PedTaskSpecific<6>>(specific, 77),
            leaf::<PedTaskSpecific<7>>(specific, 77),
        ],
    )
}

fn ped_state() -> Vec<NodeDef> {
    vec![
        leaf::<GlobalFlags>(gate(127, 127, 0), 2),
        leaf::<DynamicEntityGameState>(gate(127, 127, 0), 102),
        leaf::<PhysicalGameState>(gate(127, 127, 0), 4),
        leaf::<PedGameState>(gate(127, 127, 0), 103),
        leaf::<PedComponentReservation>(gate(127, 127, 0), 65),
    ]
}

fn ped() -> NodeDef {
    let mut migration = physical_migration();
    migration.push(leaf::<PedInventory>(gate(5, 0, 0), 316));
    migration.push(leaf::<PedTaskSequence>(gate(4, 4, 1), 1));

    root(vec![
        creation(vec![
            leaf::<PedCreation>(gate(1, 0, 0), 20),
            leaf::<PedScriptCreation>(gate(1, 0, 1), 1),
        ]),
        branch(
            gate(127, 87, 0),
            vec![
                branch(
                    gate(127, 127, 0),
                    vec![
                        branch(gate(127, 127, 0), ped_state()),
                        branch(
                            gate(127, 127, 1),
                            vec![
                                leaf::<EntityScriptGameState>(gate(127, 127, 1), 1),
                                leaf::<PhysicalScriptGameState>(gate(127, 127, 1), 13),
                                leaf::<PedScriptGameState>(gate(127, 127, 1), 110),
                                leaf::<EntityScriptInfo>(gate(127, 127, 1), 24),
                            ],
                        ),
                    ],
                ),
                leaf::<PedAttach>(gate(127, 127, 1), 22),
                leaf::<PedHealth>(gate(127, 127, 0), 17),
                leaf::<PedMovementGroup>(gate(87, 87, 0), 26),
                leaf::<PedAi>(gate(127, 127, 1), 9),
                leaf::<PedAppearance>(gate(87, 87, 0), 141),
            ],
        ),
        branch(
            gate(127, 87, 0),
            vec![
                leaf::<PedOrientation>(gate(87, 87, 0), 3),
                leaf::<PedMovement>(gate(87, 87, 0), 5),
                ped_task_slots(),
                leaf::<Sector>(gate(87, 87, 0), 4),
                leaf::<PedSectorPosMap>(gate(87, 87, 0), 12),
                leaf::<PedSectorPosNavMesh>(gate(87, 87, 0), 4),
            ],
        ),
        branch(gate(5, 0, 0), migration),
    ])
}

fn player() -> NodeDef {
    root(vec![
        creation(vec![leaf::<PlayerCreation>(gate(1, 0, 0), 128)]),
        branch(
            gate(127, 86, 0),
            vec![
                branch(
                    gate(127, 87, 0),
                    vec![
                        branch(gate(127, 127, 0), ped_state()),
                        branch(
                            gate(127, 87, 0),
                            vec![
                                leaf::<EntityScriptGameState>(gate(127, 127, 1), 1),
                                leaf::<PlayerGameState>(gate(87, 87, 0), 102),
                            ],
                        ),
                    ],
                ),
                leaf::<PedAttach>(gate(127, 127, 1), 22),
                leaf::<PedHealth>(gate(127, 127, 0), 17),
                leaf::<PedMovementGroup>(gate(87, 87, 0), 26),
                leaf::<PedAi>(gate(127, 127, 1), 9),
                leaf::<PlayerAppearance>(gate(87, 87, 0), 544),
                leaf::<PlayerPedGroup>(gate(86, 86, 0), 19),
                leaf::<PlayerAmbientModelStreaming>(gate(86, 86, 0), 5),
                leaf::<PlayerGamer>(gate(86, 86, 0), 326),
                leaf::<PlayerExtendedGameState>(gate(86, 86, 0), 20),
            ],
        ),
        branch(
            gate(127, 86, 0),
            vec![
                leaf::<PedOrientation>(gate(87, 87, 0), 3),
                leaf::<PedMovement>(gate(87, 87, 0), 5),
                ped_task_slots(),
                leaf::<Sector>(gate(87, 87, 0), 4),
                leaf::<PlayerSectorPos>(gate(87, 87, 0), 13),
                leaf::<PlayerCamera>(gate(86, 86, 0), 24),
                leaf::<PlayerWantedAndLos>(gate(86, 86, 0), 30),
            ],
        ),
        branch(gate(4, 0, 0), physical_migration()),
    ])
}

fn pickup() -> NodeDef {
    root(vec![
        creation(vec![leaf::<PickupCreation>(gate(1, 0, 0), 66)]),
        branch(
            gate(127, 127, 0),
            vec![
                branch(
                    gate(127, 127, 0),
                    vec![
                        leaf::<GlobalFlags>(gate(127, 127, 0), 2),
                        leaf::<DynamicEntityGameState>(gate(127, 127, 0), 102),
                    ],
                ),
                branch(
                    gate(127, 127, 1),
                    vec![
                        leaf::<PickupScriptGameState>(gate(127, 127, 1), 14),
                        leaf::<PhysicalGameState>(gate(127, 127, 1), 4),
                        leaf::<EntityScriptGameState>(gate(127, 127, 1), 1),
                        leaf::<PhysicalScriptGameState>(gate(127, 127, 1), 13),
                        leaf::<EntityScriptInfo>(gate(127, 127, 1), 24),
                        leaf::<PhysicalHealth>(gate(127, 127, 1), 19),
                    ],
                ),
                leaf::<PhysicalAttach>(gate(127, 127, 1), 28),
            ],
        ),
        branch(
            gate(87, 87, 0),
            vec![
                leaf::<Sector>(gate(87, 87, 0), 4),
                leaf::<PickupSectorPos>(gate(87, 87, 0), 8),
                leaf::<EntityOrientation>(gate(87, 87, 0), 5),
                leaf::<PhysicalVelocity>(gate(87, 87, 0), 5),
                leaf::<PhysicalAngVelocity>(gate(87, 87, 0), 4),
            ],
        ),
        branch(
            gate(4, 0, 0),
            vec![
                leaf::<Migration>(gate(4, 0, 0), 13),
                leaf::<PhysicalMigration>(gate(4, 0, 1), 1),
                leaf::<PhysicalScriptMigration>(gate(4, 0, 1), 1),
            ],
        ),
    ])
}

fn pickup_placement() -> NodeDef {
    root(vec![
        leaf::<PickupPlacementCreation>(gate(1, 0, 0), 54),
        leaf::<Migration>(gate(4, 0, 0), 13),
        leaf::<GlobalFlags>(gate(127, 127, 0), 2),
        leaf::<PickupPlacementState>(gate(127, 127, 0), 7),
    ])
}
