//! Bit-level writer for encoding packed binary data.

use crate::error::{BitError, BitResult};
use crate::reader::check_float_bits;
use crate::{signed_scale, unsigned_scale};

/// A bit-level writer for encoding packed binary data.
///
/// Bits are appended most-significant first. Unused trailing bits of the
/// last byte are always zero, so [`as_bytes`](Self::as_bytes) can be handed
/// to a [`BitReader`](crate::BitReader) at any point.
#[derive(Debug, Default, Clone)]
pub struct BitWriter {
    bytes: Vec<u8>,
    bit_len: usize,
}

impl BitWriter {
    /// Creates a new empty `BitWriter`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new `BitWriter` with pre-allocated capacity.
    #[must_use]
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(bytes),
            bit_len: 0,
        }
    }

    /// Returns the number of bits written so far.
    #[must_use]
    pub const fn bits_written(&self) -> usize {
        self.bit_len
    }

    /// Returns the bytes written so far, zero-padded to a byte boundary.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Writes a single bit.
    pub fn write_bit(&mut self, value: bool) {
        let bit_idx = self.bit_len % 8;
        if bit_idx == 0 {
            self.bytes.push(0);
        }
        if value {
            if let Some(last) = self.bytes.last_mut() {
                *last |= 0x80 >> bit_idx;
            }
        }
        self.bit_len += 1;
    }

    /// Writes up to 64 bits from an unsigned integer.
    ///
    /// # Errors
    ///
    /// Returns [`BitError::InvalidBitCount`] if `bits > 64`.
    /// Returns [`BitError::ValueOutOfRange`] if `value` doesn't fit in `bits`.
    pub fn write_bits(&mut self, value: u64, bits: u8) -> BitResult<()> {
        if bits > 64 {
            return Err(BitError::InvalidBitCount {
                bits: bits as usize,
                max_bits: 64,
            });
        }
        if bits == 0 {
            return Ok(());
        }
        if bits < 64 && value >= (1u64 << bits) {
            return Err(BitError::ValueOutOfRange {
                value,
                bits: bits as usize,
            });
        }

        for i in (0..bits).rev() {
            self.write_bit((value >> i) & 1 == 1);
        }
        Ok(())
    }

    /// Writes a sign-magnitude integer: one sign bit followed by `bits - 1`
    /// magnitude bits.
    pub fn write_signed(&mut self, value: i64, bits: u8) -> BitResult<()> {
        if bits == 0 || bits > 64 {
            return Err(BitError::InvalidBitCount {
                bits: bits as usize,
                max_bits: 64,
            });
        }
        let magnitude = value.unsigned_abs();
        let magnitude_bits = bits - 1;
        if magnitude_bits < 64 && magnitude >= (1u64 << magnitude_bits) {
            return Err(BitError::ValueOutOfRange {
                value: magnitude,
                bits: magnitude_bits as usize,
            });
        }
        self.write_bit(value < 0);
        self.write_bits(magnitude, magnitude_bits)
    }

    /// Writes an unsigned fixed-point value in `[0, divisor]`.
    ///
    /// The scaled value is truncated toward zero and clamped to the
    /// representable range.
    pub fn write_float(&mut self, value: f32, bits: u8, divisor: f32) -> BitResult<()> {
        check_float_bits(bits)?;
        let max = unsigned_scale(bits);
        let raw = ((value / divisor) * max).clamp(0.0, max) as u64;
        self.write_bits(raw, bits)
    }

    /// Writes a signed fixed-point value in `[-divisor, divisor]`.
    ///
    /// The scaled value is truncated toward zero and clamped to the
    /// representable range.
    pub fn write_signed_float(&mut self, value: f32, bits: u8, divisor: f32) -> BitResult<()> {
        check_float_bits(bits)?;
        let max = signed_scale(bits);
        let raw = ((value / divisor) * max).clamp(-max, max) as i64;
        self.write_signed(raw, bits)
    }

    /// Appends `bits` raw bits taken MSB-first from `src`.
    pub fn write_raw_bits(&mut self, src: &[u8], bits: usize) -> BitResult<()> {
        let max_bits = src.len().saturating_mul(8);
        if bits > max_bits {
            return Err(BitError::InvalidBitCount { bits, max_bits });
        }
        let full = bits / 8;
        for &byte in &src[..full] {
            self.write_bits(u64::from(byte), 8)?;
        }
        let rem = bits % 8;
        if rem > 0 {
            let tail = src[full] >> (8 - rem);
            self.write_bits(u64::from(tail), rem as u8)?;
        }
        Ok(())
    }

    /// Discards everything written after the first `bits` bits.
    ///
    /// Has no effect if `bits` is not smaller than the current length.
    pub fn truncate(&mut self, bits: usize) {
        if bits >= self.bit_len {
            return;
        }
        self.bit_len = bits;
        self.bytes.truncate(bits.div_ceil(8));
        let rem = bits % 8;
        if rem > 0 {
            if let Some(last) = self.bytes.last_mut() {
                *last &= 0xFF << (8 - rem);
            }
        }
    }

    /// Finishes writing and returns the byte buffer.
    ///
    /// If the last byte is incomplete, it is padded with zeros on the right.
    #[must_use]
    pub fn finish(self) -> Vec<u8> {
        self.bytes
    }

    /// Finishes writing and appends to the provided buffer.
    pub fn finish_into(mut self, buf: &mut Vec<u8>) {
        buf.append(&mut self.bytes);
    }
}
