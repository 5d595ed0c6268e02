//! Orientation field groups.

use std::f32::consts::{FRAC_1_SQRT_2, PI};

use bitstream::BitResult;
use schema::{SerializeNode, Serializer};

const COMPONENT_MAX: f32 = 2047.0;
const HIGH_RES_DIVISOR: f32 = PI * 4.0;

/// Quaternion packed as its three smallest components.
///
/// `largest` names the dropped component (x, y, z, w); it is rebuilt from
/// the unit-length constraint.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompressedQuaternion {
    pub largest: u8,
    pub a: u16,
    pub b: u16,
    pub c: u16,
}

impl CompressedQuaternion {
    /// Packs a unit quaternion given as `[x, y, z, w]`.
    #[must_use]
    pub fn from_quaternion(q: [f32; 4]) -> Self {
        let mut largest = 0;
        for i in 1..4 {
            if q[i].abs() > q[largest].abs() {
                largest = i;
            }
        }
        let sign = if q[largest] < 0.0 { -1.0 } else { 1.0 };
        let mut rest = q
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != largest)
            .map(|(_, v)| pack_component(v * sign));
        Self {
            largest: largest as u8,
            a: rest.next().unwrap_or(0),
            b: rest.next().unwrap_or(0),
            c: rest.next().unwrap_or(0),
        }
    }

    /// Unpacks to `[x, y, z, w]`.
    #[must_use]
    pub fn to_quaternion(&self) -> [f32; 4] {
        let small = [
            unpack_component(self.a),
            unpack_component(self.b),
            unpack_component(self.c),
        ];
        let rebuilt = (1.0 - small.iter().map(|v| v * v).sum::<f32>())
            .max(0.0)
            .sqrt();
        let largest = usize::from(self.largest.min(3));
        let mut out = [0.0; 4];
        let mut rest = small.into_iter();
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = if i == largest {
                rebuilt
            } else {
                rest.next().unwrap_or(0.0)
            };
        }
        out
    }

    fn serialize<S: Serializer>(&mut self, s: &mut S) -> BitResult<()> {
        s.uint(&mut self.largest, 2)?;
        s.uint(&mut self.a, 11)?;
        s.uint(&mut self.b, 11)?;
        s.uint(&mut self.c, 11)
    }
}

fn pack_component(value: f32) -> u16 {
    let normalized = ((value + FRAC_1_SQRT_2) / (2.0 * FRAC_1_SQRT_2)).clamp(0.0, 1.0);
    (normalized * COMPONENT_MAX).round() as u16
}

fn unpack_component(raw: u16) -> f32 {
    f32::from(raw.min(2047)) / COMPONENT_MAX * (2.0 * FRAC_1_SQRT_2) - FRAC_1_SQRT_2
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityOrientation {
    pub quat: CompressedQuaternion,
}

impl SerializeNode for EntityOrientation {
    const NAME: &'static str = "EntityOrientation";

    fn serialize<S: Serializer>(&mut self, s: &mut S) -> BitResult<()> {
        self.quat.serialize(s)
    }
}

/// Object orientation, either as Euler angles or a packed quaternion.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectOrientation {
    pub high_res: bool,
    pub rotation: [f32; 3],
    pub quat: CompressedQuaternion,
}

impl SerializeNode for ObjectOrientation {
    const NAME: &'static str = "ObjectOrientation";

    fn serialize<S: Serializer>(&mut self, s: &mut S) -> BitResult<()> {
        s.bool(&mut self.high_res)?;
        if self.high_res {
            for angle in &mut self.rotation {
                s.signed_float(angle, 20, HIGH_RES_DIVISOR)?;
            }
            Ok(())
        } else {
            self.quat.serialize(s)
        }
    }
}
