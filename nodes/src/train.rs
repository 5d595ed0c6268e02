//! Train field groups.

use bitstream::BitResult;
use schema::{SerializeNode, Serializer};

/// Carriage state; links name other carriages by object id, 0 for none.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainGameState {
    pub engine_carriage: u16,
    /// Carriage attached behind this one.
    pub connected_carriage: u16,
    /// Carriage this one is attached to.
    pub connected_to_carriage: u16,
    pub engine_offset: f32,
    pub config_index: u8,
    pub carriage_index: u8,
    /// 0 main line, 3 metro.
    pub track_id: u8,
    pub cruise_speed: f32,
    pub train_state: u8,
    pub is_start_carriage: bool,
    pub is_end_carriage: bool,
    pub unk12: bool,
    pub direction: bool,
    pub unk14: bool,
    pub render_derailed: bool,
    pub unk_flags: [bool; 3],
    pub force_doors_open: bool,
}

impl TrainGameState {
    #[must_use]
    pub const fn is_engine(&self) -> bool {
        self.carriage_index == 0
    }
}

impl SerializeNode for TrainGameState {
    const NAME: &'static str = "TrainGameState";

    fn serialize<S: Serializer>(&mut self, s: &mut S) -> BitResult<()> {
        s.uint(&mut self.engine_carriage, 13)?;
        s.uint(&mut self.connected_carriage, 13)?;
        s.uint(&mut self.connected_to_carriage, 13)?;
        s.signed_float(&mut self.engine_offset, 32, 1000.0)?;
        s.uint(&mut self.config_index, 8)?;
        s.uint(&mut self.carriage_index, 8)?;
        s.uint(&mut self.track_id, 8)?;
        s.signed_float(&mut self.cruise_speed, 8, 30.0)?;
        s.uint(&mut self.train_state, 3)?;
        s.bool(&mut self.is_start_carriage)?;
        s.bool(&mut self.is_end_carriage)?;
        s.bool(&mut self.unk12)?;
        s.bool(&mut self.direction)?;
        s.bool(&mut self.unk14)?;
        s.bool(&mut self.render_derailed)?;
        if s.build().at_least(2372) {
            for flag in &mut self.unk_flags {
                s.bool(flag)?;
            }
        }
        s.bool(&mut self.force_doors_open)
    }
}
