//! Player-only field groups. Players reuse most ped groups.

use std::f32::consts::TAU;

use bitstream::BitResult;
use schema::{SerializeNode, Serializer};

use crate::packing::world_coords;
use crate::position::Vec3;

const CAMERA_OFFSET_RANGE: f32 = 16000.0;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CameraMode {
    /// Gameplay camera following the player.
    #[default]
    Follow,
    /// Free camera at an absolute position.
    Free,
    /// Gameplay camera displaced by an offset.
    Offset,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerCamera {
    pub mode: CameraMode,
    pub flag: bool,
    /// Absolute position in [`CameraMode::Free`], offset in [`CameraMode::Offset`].
    pub position: Vec3,
    pub pitch: f32,
    pub heading: f32,
}

impl SerializeNode for PlayerCamera {
    const NAME: &'static str = "PlayerCamera";

    fn serialize<S: Serializer>(&mut self, s: &mut S) -> BitResult<()> {
        let mut free = self.mode == CameraMode::Free;
        s.bool(&mut free)?;
        if free {
            self.mode = CameraMode::Free;
            s.bool(&mut self.flag)?;
            let mut pos: [f32; 3] = self.position.into();
            world_coords(s, &mut pos)?;
            self.position = pos.into();
        } else {
            let mut has_offset = self.mode == CameraMode::Offset;
            s.bool(&mut has_offset)?;
            s.bool(&mut self.flag)?;
            if has_offset {
                self.mode = CameraMode::Offset;
                s.signed_float(&mut self.position.x, 19, CAMERA_OFFSET_RANGE)?;
                s.signed_float(&mut self.position.y, 19, CAMERA_OFFSET_RANGE)?;
                s.signed_float(&mut self.position.z, 19, CAMERA_OFFSET_RANGE)?;
            } else {
                self.mode = CameraMode::Follow;
                self.position = Vec3::default();
            }
        }
        s.signed_float(&mut self.pitch, 10, TAU)?;
        s.signed_float(&mut self.heading, 10, TAU)
    }
}

opaque_groups!(
    PlayerCreation,
    PlayerGameState,
    PlayerAppearance,
    PlayerPedGroup,
    PlayerAmbientModelStreaming,
    PlayerGamer,
    PlayerExtendedGameState,
    PlayerWantedAndLos,
);
