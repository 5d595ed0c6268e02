//! Bit-level reader with bounded operations.

use crate::error::{BitError, BitResult};
use crate::{signed_scale, unsigned_scale};

/// A bit-level reader for decoding packed binary data.
///
/// Bits are consumed most-significant first within each byte. The readable
/// window may be shorter than the backing slice (see [`with_bit_len`]), and
/// the cursor can be moved in both directions with [`seek`].
///
/// All read operations are bounds-checked and return errors on failure.
/// The reader never panics on malformed input.
///
/// [`with_bit_len`]: Self::with_bit_len
/// [`seek`]: Self::seek
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    len_bits: usize,
    bit_pos: usize,
}

impl<'a> BitReader<'a> {
    /// Creates a new `BitReader` over the whole byte slice.
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            len_bits: data.len().saturating_mul(8),
            bit_pos: 0,
        }
    }

    /// Creates a reader whose window ends after `bits` bits.
    ///
    /// `bits` is clamped to the size of `data`.
    #[must_use]
    pub fn with_bit_len(data: &'a [u8], bits: usize) -> Self {
        Self {
            data,
            len_bits: bits.min(data.len().saturating_mul(8)),
            bit_pos: 0,
        }
    }

    /// Length of the readable window in bits.
    #[must_use]
    pub const fn bit_len(&self) -> usize {
        self.len_bits
    }

    /// Returns the number of bits remaining to read.
    #[must_use]
    pub const fn bits_remaining(&self) -> usize {
        self.len_bits.saturating_sub(self.bit_pos)
    }

    /// Returns `true` if there are no more bits to read.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bits_remaining() == 0
    }

    /// Returns the current bit position.
    #[must_use]
    pub const fn bit_position(&self) -> usize {
        self.bit_pos
    }

    /// Moves the cursor to an absolute bit position inside the window.
    pub fn seek(&mut self, bit: usize) -> BitResult<()> {
        if bit > self.len_bits {
            return Err(BitError::SeekOutOfRange {
                target: bit,
                len: self.len_bits,
            });
        }
        self.bit_pos = bit;
        Ok(())
    }

    /// Advances the cursor by `bits` without decoding them.
    pub fn skip(&mut self, bits: usize) -> BitResult<()> {
        self.ensure_bits(bits)?;
        self.bit_pos += bits;
        Ok(())
    }

    /// Reads a single bit as a boolean.
    pub fn read_bit(&mut self) -> BitResult<bool> {
        self.ensure_bits(1)?;
        let byte_idx = self.bit_pos / 8;
        let bit_idx = self.bit_pos % 8;
        let bit = (self.data[byte_idx] >> (7 - bit_idx)) & 1;
        self.bit_pos += 1;
        Ok(bit == 1)
    }

    /// Reads up to 64 bits as an unsigned integer.
    pub fn read_bits(&mut self, bits: u8) -> BitResult<u64> {
        if bits > 64 {
            return Err(BitError::InvalidBitCount {
                bits: bits as usize,
                max_bits: 64,
            });
        }
        if bits == 0 {
            return Ok(0);
        }
        self.ensure_bits(bits as usize)?;

        let mut value = 0u64;
        for _ in 0..bits {
            value = (value << 1) | u64::from(self.read_bit()?);
        }
        Ok(value)
    }

    /// Reads a sign-magnitude integer: one sign bit followed by `bits - 1`
    /// magnitude bits.
    pub fn read_signed(&mut self, bits: u8) -> BitResult<i64> {
        if bits == 0 || bits > 64 {
            return Err(BitError::InvalidBitCount {
                bits: bits as usize,
                max_bits: 64,
            });
        }
        self.ensure_bits(bits as usize)?;
        let negative = self.read_bit()?;
        let magnitude = self.read_bits(bits - 1)? as i64;
        Ok(if negative { -magnitude } else { magnitude })
    }

    /// Reads an unsigned fixed-point value scaled to `[0, divisor]`.
    pub fn read_float(&mut self, bits: u8, divisor: f32) -> BitResult<f32> {
        check_float_bits(bits)?;
        let raw = self.read_bits(bits)?;
        Ok(raw as f32 / unsigned_scale(bits) * divisor)
    }

    /// Reads a signed fixed-point value scaled to `[-divisor, divisor]`.
    pub fn read_signed_float(&mut self, bits: u8, divisor: f32) -> BitResult<f32> {
        check_float_bits(bits)?;
        let raw = self.read_signed(bits)?;
        Ok(raw as f32 / signed_scale(bits) * divisor)
    }

    /// Copies `bits` raw bits into `dst`, packed MSB-first from `dst[0]`.
    ///
    /// Trailing bits of the last touched byte are zeroed. Bytes of `dst`
    /// beyond the copied range are left untouched.
    pub fn read_raw_bits(&mut self, dst: &mut [u8], bits: usize) -> BitResult<()> {
        let max_bits = dst.len().saturating_mul(8);
        if bits > max_bits {
            return Err(BitError::InvalidBitCount { bits, max_bits });
        }
        self.ensure_bits(bits)?;

        let full = bits / 8;
        for byte in dst.iter_mut().take(full) {
            *byte = self.read_bits(8)? as u8;
        }
        let rem = bits % 8;
        if rem > 0 {
            let tail = self.read_bits(rem as u8)? as u8;
            dst[full] = tail << (8 - rem);
        }
        Ok(())
    }

    fn ensure_bits(&self, bits: usize) -> BitResult<()> {
        let available = self.bits_remaining();
        if bits > available {
            return Err(BitError::UnexpectedEof {
                requested: bits,
                available,
            });
        }
        Ok(())
    }
}

pub(crate) fn check_float_bits(bits: u8) -> BitResult<()> {
    if !(2..=32).contains(&bits) {
        return Err(BitError::InvalidBitCount {
            bits: bits as usize,
            max_bits: 32,
        });
    }
    Ok(())
}
