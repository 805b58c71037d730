use crate::error::InternalError;

use scursor::WriteCursor;

pub(crate) fn num_bytes_for_bits(count: u16) -> usize {
    (count as usize + 7) / 8
}

/// byte count field preceding packed coils in a write multiple coils request
pub(crate) fn calc_bytes_for_bits(num_bits: usize) -> Result<u8, InternalError> {
    let div_8 = num_bits / 8;

    let count = if num_bits % 8 == 0 { div_8 } else { div_8 + 1 };

    u8::try_from(count).map_err(|_| InternalError::BadByteCount(count))
}

/// byte count field preceding register values
pub(crate) fn calc_bytes_for_registers(num_registers: usize) -> Result<u8, InternalError> {
    let count = 2 * num_registers;
    u8::try_from(count).map_err(|_| InternalError::BadByteCount(count))
}

/// writes the values 8 per byte, first value in the least significant bit
pub(crate) fn write_packed_bits(
    cursor: &mut WriteCursor,
    values: &[bool],
) -> Result<(), InternalError> {
    for chunk in values.chunks(8) {
        let mut acc: u8 = 0;
        for (count, value) in chunk.iter().enumerate() {
            if *value {
                acc |= 1 << count as u8;
            }
        }
        cursor.write_u8(acc)?;
    }
    Ok(())
}

pub(crate) fn get_bit(bytes: &[u8], index: usize) -> Option<bool> {
    bytes
        .get(index / 8)
        .map(|byte| (*byte & (1 << (index % 8) as u8)) != 0)
}

pub(crate) fn set_bit(bytes: &mut [u8], index: usize, value: bool) -> bool {
    match bytes.get_mut(index / 8) {
        Some(byte) => {
            let mask = 1 << (index % 8) as u8;
            if value {
                *byte |= mask;
            } else {
                *byte &= !mask;
            }
            true
        }
        None => false,
    }
}
