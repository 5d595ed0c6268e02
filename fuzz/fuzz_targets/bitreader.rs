#![no_main]

use bitstream::BitReader;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut reader = BitReader::new(data);
    let mut idx = 0usize;

    // Input bytes pick a bounded sequence of reads.
    while idx < data.len() && idx < 1024 {
        let op = data[idx] % 7;
        let arg = data.get(idx + 1).copied().unwrap_or(0);
        idx += 1;

        match op {
            0 => {
                let _ = reader.read_bit();
            }
            1 => {
                let _ = reader.read_bits(arg % 66);
            }
            2 => {
                let _ = reader.read_signed(arg % 66);
            }
            3 => {
                let _ = reader.read_float(arg % 33, 100.0);
            }
            4 => {
                let _ = reader.read_signed_float(arg % 33, 100.0);
            }
            5 => {
                let _ = reader.seek(usize::from(arg) * 3);
            }
            _ => {
                let mut dst = [0u8; 32];
                let _ = reader.read_raw_bits(&mut dst, usize::from(arg));
            }
        }
        assert!(reader.bit_position() <= reader.bit_len());
    }
});
