//! Packing helpers shared by content serializers.

use bitstream::BitResult;
use schema::{Packable, Serializer};

/// Presence bit followed by the value when present.
pub(crate) fn optional<S, T>(s: &mut S, value: &mut Option<T>, bits: u8) -> BitResult<()>
where
    S: Serializer,
    T: Packable + Default,
{
    let mut present = value.is_some();
    s.bool(&mut present)?;
    if present {
        let mut inner = value.unwrap_or_default();
        s.uint(&mut inner, bits)?;
        *value = Some(inner);
    } else {
        *value = None;
    }
    Ok(())
}

/// Sign-magnitude integer scaled by `step`.
///
/// Writing truncates toward zero and clamps to the representable range.
pub(crate) fn stepped<S: Serializer>(
    s: &mut S,
    value: &mut f32,
    bits: u8,
    step: f32,
) -> BitResult<()> {
    let limit = (1i32 << (bits - 1)) - 1;
    let mut raw = ((*value / step) as i32).clamp(-limit, limit);
    s.signed(&mut raw, bits)?;
    *value = raw as f32 * step;
    Ok(())
}

/// Absolute world coordinate packed as signed X/Y and a Z offset by the
/// world floor.
pub(crate) fn world_coords<S: Serializer>(s: &mut S, pos: &mut [f32; 3]) -> BitResult<()> {
    s.signed_float(&mut pos[0], 19, WORLD_HALF_EXTENT)?;
    s.signed_float(&mut pos[1], 19, WORLD_HALF_EXTENT)?;
    let mut z = pos[2] + WORLD_FLOOR;
    s.float(&mut z, 19, WORLD_HEIGHT)?;
    pos[2] = z - WORLD_FLOOR;
    Ok(())
}

const WORLD_HALF_EXTENT: f32 = 27648.0;
const WORLD_HEIGHT: f32 = 4416.0;
const WORLD_FLOOR: f32 = 1700.0;

#[cfg(test)]
mod tests {
    use super::*;
    use bitstream::{BitReader, BitWriter};
    use schema::{GameBuild, NodeReader, NodeWriter};

    #[test]
    fn stepped_values_snap_to_the_step() {
        let mut writer = BitWriter::new();
        let mut v = 3.1f32;
        stepped(&mut NodeWriter::new(&mut writer, GameBuild::BASELINE), &mut v, 12, 0.0625).unwrap();
        assert!((v - 3.0625).abs() < 1e-6);
        let bytes = writer.finish();

        let mut out = 0.0f32;
        let mut reader = BitReader::new(&bytes);
        stepped(&mut NodeReader::new(&mut reader, GameBuild::BASELINE), &mut out, 12, 0.0625).unwrap();
        assert!((out - 3.0625).abs() < 1e-6);
    }

    #[test]
    fn stepped_clamps_out_of_range() {
        let mut writer = BitWriter::new();
        let mut v = -10_000.0f32;
        stepped(&mut NodeWriter::new(&mut writer, GameBuild::BASELINE), &mut v, 10, 0.031_25).unwrap();
        assert!((v + 511.0 * 0.031_25).abs() < 1e-4);
    }

    #[test]
    fn optional_costs_one_bit_when_absent() {
        let mut writer = BitWriter::new();
        let mut none: Option<u32> = None;
        let mut some = Some(0x55u8);
        {
            let mut s = NodeWriter::new(&mut writer, GameBuild::BASELINE);
            optional(&mut s, &mut none, 32).unwrap();
            optional(&mut s, &mut some, 7).unwrap();
        }
        assert_eq!(writer.bits_written(), 1 + 1 + 7);
        let bytes = writer.finish();

        let mut a: Option<u32> = Some(9);
        let mut b: Option<u8> = None;
        let mut reader = BitReader::new(&bytes);
        let mut s = NodeReader::new(&mut reader, GameBuild::BASELINE);
        optional(&mut s, &mut a, 32).unwrap();
        optional(&mut s, &mut b, 7).unwrap();
        assert_eq!(a, None);
        assert_eq!(b, Some(0x55));
    }

    #[test]
    fn world_coords_restore_within_precision() {
        let mut writer = BitWriter::new();
        let mut pos = [-1234.5f32, 880.25, 31.0];
        let original = pos;
        world_coords(&mut NodeWriter::new(&mut writer, GameBuild::BASELINE), &mut pos).unwrap();
        assert_eq!(writer.bits_written(), 57);
        let bytes = writer.finish();

        let mut out = [0.0f32; 3];
        let mut reader = BitReader::new(&bytes);
        world_coords(&mut NodeReader::new(&mut reader, GameBuild::BASELINE), &mut out).unwrap();
        for (a, b) in out.iter().zip(original) {
            assert!((a - b).abs() < 0.2, "{a} vs {b}");
        }
    }
}
