//! Conversions between application values and the bit and register tables of a slave
//!
//! Bit arrays handled here are packed the way Modbus puts them on the wire: 8 bits per byte,
//! bit `n` of the array in bit `n % 8` of byte `n / 8`.

use crate::common::bits;

/// Decode an IEEE-754 single precision value stored in two consecutive registers
///
/// The first register holds the low 16 bits, the second register the high 16 bits.
///
/// ```
/// let value = modbus_master::data::get_float(&[0x229A, 0x4465]);
/// assert!((value - 916.540649).abs() < 1e-4);
/// ```
pub fn get_float(src: &[u16; 2]) -> f32 {
    let bits = (src[1] as u32) << 16 | (src[0] as u32);
    f32::from_bits(bits)
}

/// Encode an IEEE-754 single precision value into two consecutive registers
///
/// This is the inverse of [`get_float`].
pub fn set_float(value: f32, dest: &mut [u16; 2]) {
    let bits = value.to_bits();
    dest[0] = bits as u16;
    dest[1] = (bits >> 16) as u16;
}

/// Collect up to 8 bits of `src`, beginning at `bit_index`, into a byte
///
/// The first bit lands in the least significant position. A `count` larger than 8 is clamped to 8
/// and bits beyond the end of `src` read as zero.
pub fn get_byte_from_bits(src: &[u8], bit_index: usize, count: usize) -> u8 {
    let mut value: u8 = 0;
    for i in 0..count.min(8) {
        if bits::get_bit(src, bit_index + i).unwrap_or(false) {
            value |= 1 << i as u8;
        }
    }
    value
}

/// Write all 8 bits of `value` into `dest` starting at `bit_index`, least significant bit first
pub fn set_bits_from_byte(dest: &mut [u8], bit_index: usize, value: u8) {
    set_bits_from_bytes(dest, bit_index, 8, &[value]);
}

/// Copy the first `count` bits of `src` into `dest` starting at `bit_index`
///
/// Bits of `dest` outside of the written span are left untouched, as are positions past the end
/// of `dest`.
pub fn set_bits_from_bytes(dest: &mut [u8], bit_index: usize, count: usize, src: &[u8]) {
    for i in 0..count {
        let value = match bits::get_bit(src, i) {
            Some(x) => x,
            None => return,
        };
        if !bits::set_bit(dest, bit_index + i, value) {
            return;
        }
    }
}

/// Pack a slice of bits into bytes
pub fn pack_bits(values: &[bool]) -> Vec<u8> {
    let mut bytes = vec![0u8; values.len().div_ceil(8)];
    for (index, value) in values.iter().enumerate() {
        bits::set_bit(&mut bytes, index, *value);
    }
    bytes
}

/// Unpack the first `count` bits of `src`, stopping early if `src` runs out
pub fn unpack_bits(src: &[u8], count: usize) -> Vec<bool> {
    (0..count)
        .map_while(|index| bits::get_bit(src, index))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_uses_low_word_first() {
        let mut registers = [0u16; 2];
        set_float(916.540649, &mut registers);
        assert_eq!(registers, [0x229A, 0x4465]);
        assert_eq!(get_float(&registers), 916.540649);
    }

    #[test]
    fn float_round_trips_special_values() {
        for value in [0.0f32, -1.5, f32::MAX, f32::MIN_POSITIVE, f32::INFINITY] {
            let mut registers = [0u16; 2];
            set_float(value, &mut registers);
            assert_eq!(get_float(&registers), value);
        }
    }

    #[test]
    fn byte_from_bits_spans_byte_boundaries() {
        // bits 4..12 of 0xF0 0x0A
        assert_eq!(get_byte_from_bits(&[0xF0, 0x0A], 4, 8), 0xAF);
        assert_eq!(get_byte_from_bits(&[0xF0, 0x0A], 4, 3), 0x07);
        assert_eq!(get_byte_from_bits(&[0xF0, 0x0A], 4, 20), 0xAF);
    }

    #[test]
    fn bits_written_and_read_back_match() {
        let mut table = [0u8; 3];
        set_bits_from_bytes(&mut table, 3, 12, &[0xB5, 0x06]);
        assert_eq!(get_byte_from_bits(&table, 3, 8), 0xB5);
        assert_eq!(get_byte_from_bits(&table, 11, 4), 0x06);
    }

    #[test]
    fn writing_bits_leaves_neighbours_untouched() {
        let mut table = [0xFF, 0xFF];
        set_bits_from_bytes(&mut table, 2, 4, &[0x00]);
        assert_eq!(table, [0xC3, 0xFF]);

        let mut table = [0x00, 0x00];
        set_bits_from_byte(&mut table, 4, 0xFF);
        assert_eq!(table, [0xF0, 0x0F]);
    }

    #[test]
    fn packs_and_unpacks_bits() {
        let values = [true, false, true, true, false, false, true, true, true];
        let packed = pack_bits(&values);
        assert_eq!(packed, vec![0xCD, 0x01]);
        assert_eq!(unpack_bits(&packed, values.len()), values.to_vec());
        assert_eq!(unpack_bits(&packed, 20).len(), 16);
    }
}
