//! Field-group content types and the serializer they are written against.
//!
//! A field group describes its wire layout once, in [`SerializeNode::serialize`].
//! The same function decodes a captured leaf payload ([`NodeReader`]) and
//! encodes server-authored content ([`NodeWriter`]).

use std::any::{Any, TypeId};
use std::fmt;

use bitstream::{BitReader, BitResult, BitWriter};

/// Game build the peer is running; gates build-dependent fields.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GameBuild(pub u32);

impl GameBuild {
    /// Baseline build assumed when nothing else is configured.
    pub const BASELINE: Self = Self(1604);

    /// Whether this build is `build` or newer.
    #[must_use]
    pub const fn at_least(self, build: u32) -> bool {
        self.0 >= build
    }
}

impl Default for GameBuild {
    fn default() -> Self {
        Self::BASELINE
    }
}

/// Unsigned integers that can be packed into a fixed number of bits.
pub trait Packable: Copy {
    fn to_bits(self) -> u64;
    fn from_bits(bits: u64) -> Self;
}

macro_rules! impl_packable {
    ($($ty:ty),*) => {
        $(
            impl Packable for $ty {
                fn to_bits(self) -> u64 {
                    u64::from(self)
                }

                fn from_bits(bits: u64) -> Self {
                    bits as Self
                }
            }
        )*
    };
}

impl_packable!(u8, u16, u32, u64);

/// Symmetric field serializer.
///
/// Implemented by [`NodeReader`] (fills the value from the stream) and
/// [`NodeWriter`] (writes the value to the stream).
pub trait Serializer {
    /// Game build the content is encoded for.
    fn build(&self) -> GameBuild;

    /// `true` while decoding.
    fn is_reading(&self) -> bool;

    fn bool(&mut self, value: &mut bool) -> BitResult<()>;

    fn uint<T: Packable>(&mut self, value: &mut T, bits: u8) -> BitResult<()>;

    /// Sign-magnitude integer.
    fn signed(&mut self, value: &mut i32, bits: u8) -> BitResult<()>;

    /// Unsigned fixed-point value in `[0, divisor]`.
    fn float(&mut self, value: &mut f32, bits: u8, divisor: f32) -> BitResult<()>;

    /// Signed fixed-point value in `[-divisor, divisor]`.
    fn signed_float(&mut self, value: &mut f32, bits: u8, divisor: f32) -> BitResult<()>;
}

/// Decoding side of [`Serializer`].
#[derive(Debug)]
pub struct NodeReader<'r, 'a> {
    reader: &'r mut BitReader<'a>,
    build: GameBuild,
}

impl<'r, 'a> NodeReader<'r, 'a> {
    pub fn new(reader: &'r mut BitReader<'a>, build: GameBuild) -> Self {
        Self { reader, build }
    }
}

impl Serializer for NodeReader<'_, '_> {
    fn build(&self) -> GameBuild {
        self.build
    }

    fn is_reading(&self) -> bool {
        true
    }

    fn bool(&mut self, value: &mut bool) -> BitResult<()> {
        *value = self.reader.read_bit()?;
        Ok(())
    }

    fn uint<T: Packable>(&mut self, value: &mut T, bits: u8) -> BitResult<()> {
        *value = T::from_bits(self.reader.read_bits(bits)?);
        Ok(())
    }

    fn signed(&mut self, value: &mut i32, bits: u8) -> BitResult<()> {
        *value = self.reader.read_signed(bits)? as i32;
        Ok(())
    }

    fn float(&mut self, value: &mut f32, bits: u8, divisor: f32) -> BitResult<()> {
        *value = self.reader.read_float(bits, divisor)?;
        Ok(())
    }

    fn signed_float(&mut self, value: &mut f32, bits: u8, divisor: f32) -> BitResult<()> {
        *value = self.reader.read_signed_float(bits, divisor)?;
        Ok(())
    }
}

/// Encoding side of [`Serializer`].
#[derive(Debug)]
pub struct NodeWriter<'w> {
    writer: &'w mut BitWriter,
    build: GameBuild,
}

impl<'w> NodeWriter<'w> {
    pub fn new(writer: &'w mut BitWriter, build: GameBuild) -> Self {
        Self { writer, build }
    }
}

impl Serializer for NodeWriter<'_> {
    fn build(&self) -> GameBuild {
        self.build
    }

    fn is_reading(&self) -> bool {
        false
    }

    fn bool(&mut self, value: &mut bool) -> BitResult<()> {
        self.writer.write_bit(*value);
        Ok(())
    }

    fn uint<T: Packable>(&mut self, value: &mut T, bits: u8) -> BitResult<()> {
        self.writer.write_bits(value.to_bits(), bits)
    }

    fn signed(&mut self, value: &mut i32, bits: u8) -> BitResult<()> {
        self.writer.write_signed(i64::from(*value), bits)
    }

    fn float(&mut self, value: &mut f32, bits: u8, divisor: f32) -> BitResult<()> {
        self.writer.write_float(*value, bits, divisor)
    }

    fn signed_float(&mut self, value: &mut f32, bits: u8, divisor: f32) -> BitResult<()> {
        self.writer.write_signed_float(*value, bits, divisor)
    }
}

/// Typed content of one field group.
pub trait SerializeNode: Default + Clone + fmt::Debug + Send + Sync + 'static {
    /// Stable, human-readable name of the field group.
    const NAME: &'static str;

    /// `false` for field groups carried only as raw payload.
    const DECODED: bool = true;

    /// Describes the wire layout of the content.
    fn serialize<S: Serializer>(&mut self, s: &mut S) -> BitResult<()>;
}

/// Object-safe view of field-group content stored inside a sync tree.
pub trait NodeData: Any + Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    fn is_decoded(&self) -> bool;

    /// Replaces the content with what `reader` holds. On error the previous
    /// content is kept.
    fn decode(&mut self, reader: &mut BitReader<'_>, build: GameBuild) -> BitResult<()>;

    fn encode(&self, writer: &mut BitWriter, build: GameBuild) -> BitResult<()>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: SerializeNode> NodeData for T {
    fn name(&self) -> &'static str {
        T::NAME
    }

    fn is_decoded(&self) -> bool {
        T::DECODED
    }

    fn decode(&mut self, reader: &mut BitReader<'_>, build: GameBuild) -> BitResult<()> {
        let mut fresh = T::default();
        fresh.serialize(&mut NodeReader::new(reader, build))?;
        *self = fresh;
        Ok(())
    }

    fn encode(&self, writer: &mut BitWriter, build: GameBuild) -> BitResult<()> {
        self.clone().serialize(&mut NodeWriter::new(writer, build))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Type-erased descriptor of a field group, stored in schema leaves.
#[derive(Clone, Copy)]
pub struct FieldGroup {
    id: TypeId,
    name: &'static str,
    decoded: bool,
    factory: fn() -> Box<dyn NodeData>,
}

impl FieldGroup {
    /// Descriptor for the field-group type `T`.
    #[must_use]
    pub fn of<T: SerializeNode>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: T::NAME,
            decoded: T::DECODED,
            factory: boxed_default::<T>,
        }
    }

    #[must_use]
    pub const fn group_id(&self) -> TypeId {
        self.id
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub const fn is_decoded(&self) -> bool {
        self.decoded
    }

    /// Creates default content for this field group.
    #[must_use]
    pub fn instantiate(&self) -> Box<dyn NodeData> {
        (self.factory)()
    }
}

impl fmt::Debug for FieldGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldGroup")
            .field("name", &self.name)
            .field("decoded", &self.decoded)
            .finish_non_exhaustive()
    }
}

impl PartialEq for FieldGroup {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for FieldGroup {}

fn boxed_default<T: SerializeNode>() -> Box<dyn NodeData> {
    Box::<T>::default()
}
