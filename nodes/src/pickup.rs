//! Pickup field groups.

use bitstream::BitResult;
use schema::{SerializeNode, Serializer};

use crate::packing::world_coords;
use crate::position::Vec3;

/// Placement data; the position is omitted for portable pickups.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PickupPlacementCreation {
    pub pos: Option<Vec3>,
}

impl SerializeNode for PickupPlacementCreation {
    const NAME: &'static str = "PickupPlacementCreation";

    fn serialize<S: Serializer>(&mut self, s: &mut S) -> BitResult<()> {
        let mut omitted = self.pos.is_none();
        s.bool(&mut omitted)?;
        if omitted {
            self.pos = None;
        } else {
            let mut pos: [f32; 3] = self.pos.unwrap_or_default().into();
            world_coords(s, &mut pos)?;
            self.pos = Some(pos.into());
        }
        Ok(())
    }
}

opaque_groups!(PickupCreation, PickupScriptGameState, PickupPlacementState);

#[cfg(test)]
mod tests {
    use super::*;
    use bitstream::{BitReader, BitWriter};
    use schema::{GameBuild, NodeData};

    #[test]
    fn omitted_position_is_one_bit() {
        let mut writer = BitWriter::new();
        PickupPlacementCreation::default()
            .encode(&mut writer, GameBuild::BASELINE)
            .unwrap();
        assert_eq!(writer.bits_written(), 1);
    }

    #[test]
    fn placed_pickup_keeps_its_position() {
        let placement = PickupPlacementCreation {
            pos: Some(Vec3::new(100.0, -2000.0, 5.0)),
        };
        let mut writer = BitWriter::new();
        placement.encode(&mut writer, GameBuild::BASELINE).unwrap();
        assert_eq!(writer.bits_written(), 58);
        let bytes = writer.finish();

        let mut decoded = PickupPlacementCreation::default();
        decoded
            .decode(&mut BitReader::new(&bytes), GameBuild::BASELINE)
            .unwrap();
        let pos = decoded.pos.unwrap();
        assert!((pos.x - 100.0).abs() < 0.2);
        assert!((pos.y + 2000.0).abs() < 0.2);
        assert!((pos.z - 5.0).abs() < 0.05);
    }
}
