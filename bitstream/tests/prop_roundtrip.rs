use bitstream::{BitReader, BitWriter};
use proptest::prelude::*;

#[derive(Clone, Debug)]
enum Op {
    Bit(bool),
    Bits { bits: u8, value: u64 },
    Signed { bits: u8, value: i64 },
    Float { bits: u8, value: f32, divisor: f32 },
    SignedFloat { bits: u8, value: f32, divisor: f32 },
    Raw { bytes: Vec<u8>, bits: usize },
}

fn mask_value(bits: u8, value: u64) -> u64 {
    if bits >= 64 {
        value
    } else {
        let mask = (1u64 << bits) - 1;
        value & mask
    }
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        any::<bool>().prop_map(Op::Bit),
        (1u8..=64, any::<u64>()).prop_map(|(bits, value)| Op::Bits {
            bits,
            value: mask_value(bits, value),
        }),
        (2u8..=32, any::<i32>()).prop_map(|(bits, value)| {
            let max = (1i64 << (bits - 1)) - 1;
            Op::Signed {
                bits,
                value: i64::from(value) % (max + 1),
            }
        }),
        (4u8..=24, 0.0f32..1.0, 1.0f32..5000.0).prop_map(|(bits, frac, divisor)| Op::Float {
            bits,
            value: frac * divisor,
            divisor,
        }),
        (4u8..=24, -1.0f32..1.0, 1.0f32..5000.0).prop_map(|(bits, frac, divisor)| {
            Op::SignedFloat {
                bits,
                value: frac * divisor,
                divisor,
            }
        }),
        prop::collection::vec(any::<u8>(), 1..16).prop_flat_map(|bytes| {
            let max = bytes.len() * 8;
            (Just(bytes), 0..=max).prop_map(|(bytes, bits)| Op::Raw { bytes, bits })
        }),
    ]
}

fn raw_prefix(bytes: &[u8], bits: usize) -> Vec<u8> {
    let mut out = bytes[..bits.div_ceil(8)].to_vec();
    if bits % 8 != 0 {
        if let Some(last) = out.last_mut() {
            *last &= 0xFF << (8 - bits % 8);
        }
    }
    out
}

proptest! {
    #[test]
    fn prop_roundtrip_ops(ops in prop::collection::vec(op_strategy(), 1..64)) {
        let mut writer = BitWriter::new();
        for op in &ops {
            match op {
                Op::Bit(b) => writer.write_bit(*b),
                Op::Bits { bits, value } => writer.write_bits(*value, *bits).unwrap(),
                Op::Signed { bits, value } => writer.write_signed(*value, *bits).unwrap(),
                Op::Float { bits, value, divisor } => {
                    writer.write_float(*value, *bits, *divisor).unwrap();
                }
                Op::SignedFloat { bits, value, divisor } => {
                    writer.write_signed_float(*value, *bits, *divisor).unwrap();
                }
                Op::Raw { bytes, bits } => writer.write_raw_bits(bytes, *bits).unwrap(),
            }
        }
        let total = writer.bits_written();
        let bytes = writer.finish();

        let mut reader = BitReader::with_bit_len(&bytes, total);
        for op in &ops {
            match op {
                Op::Bit(b) => prop_assert_eq!(reader.read_bit().unwrap(), *b),
                Op::Bits { bits, value } => prop_assert_eq!(reader.read_bits(*bits).unwrap(), *value),
                Op::Signed { bits, value } => prop_assert_eq!(reader.read_signed(*bits).unwrap(), *value),
                Op::Float { bits, value, divisor } => {
                    let step = divisor / ((1u64 << bits) - 1) as f32;
                    let decoded = reader.read_float(*bits, *divisor).unwrap();
                    prop_assert!((decoded - value).abs() <= step * 1.01 + divisor * 1e-5);
                }
                Op::SignedFloat { bits, value, divisor } => {
                    let step = divisor / ((1u64 << (bits - 1)) - 1) as f32;
                    let decoded = reader.read_signed_float(*bits, *divisor).unwrap();
                    prop_assert!((decoded - value).abs() <= step * 1.01 + divisor * 1e-5);
                }
                Op::Raw { bytes, bits } => {
                    let mut dst = vec![0u8; bytes.len()];
                    reader.read_raw_bits(&mut dst, *bits).unwrap();
                    prop_assert_eq!(
                        raw_prefix(&dst, *bits),
                        raw_prefix(bytes, *bits)
                    );
                }
            }
        }
        prop_assert!(reader.is_empty());
    }

    #[test]
    fn prop_truncate_then_rewrite(value in any::<u32>(), keep in 0usize..32) {
        let mut writer = BitWriter::new();
        writer.write_bits(u64::from(value), 32).unwrap();
        writer.truncate(keep);
        writer.write_bits(0, 32 - keep as u8).unwrap();
        let bytes = writer.finish();
        let mut reader = BitReader::new(&bytes);
        let expected = if keep == 0 { 0 } else { (u64::from(value) >> (32 - keep)) << (32 - keep) };
        prop_assert_eq!(reader.read_bits(32).unwrap(), expected);
    }
}
