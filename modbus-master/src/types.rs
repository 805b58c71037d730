use crate::constants::slave;
use crate::decode::PduDecodeLevel;
use crate::error::{AduParseError, InvalidAddress, InvalidQuantity, RequestError};
use crate::transport::FrameType;

use scursor::ReadCursor;

/// Modbus unit identifier, just a type-safe wrapper around `u8`
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Ord, Eq, Hash)]
pub struct UnitId {
    /// underlying raw value
    pub value: u8,
}

/// Start and count tuple used when making various requests
/// Cannot be constructed with invalid start/count
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AddressRange {
    /// Starting address of the range
    pub start: u16,
    /// Count of elements in the range
    pub count: u16,
}

/// Value and its address
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Indexed<T> {
    /// Address of the value
    pub index: u16,
    /// Associated value
    pub value: T,
}

/// Zero-copy type used to iterate over a collection of packed bits
#[derive(Debug, Copy, Clone)]
pub(crate) struct BitIterator<'a> {
    bytes: &'a [u8],
    range: AddressRange,
    pos: u16,
}

pub(crate) struct BitIteratorDisplay<'a> {
    iterator: BitIterator<'a>,
    level: PduDecodeLevel,
}

/// Zero-copy type used to iterate over a collection of registers
#[derive(Debug, Copy, Clone)]
pub(crate) struct RegisterIterator<'a> {
    bytes: &'a [u8],
    range: AddressRange,
    pos: u16,
}

pub(crate) struct RegisterIteratorDisplay<'a> {
    iterator: RegisterIterator<'a>,
    level: PduDecodeLevel,
}

impl std::fmt::Display for UnitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#04X}", self.value)
    }
}

impl<'a> BitIterator<'a> {
    pub(crate) fn parse_all(
        range: AddressRange,
        cursor: &mut ReadCursor<'a>,
    ) -> Result<Self, RequestError> {
        let bytes = read_payload(
            cursor,
            crate::common::bits::num_bytes_for_bits(range.count),
        )?;
        Ok(Self {
            bytes,
            range,
            pos: 0,
        })
    }
}

/// the rest of the reply must be exactly `count` bytes
pub(crate) fn read_payload<'a>(
    cursor: &mut ReadCursor<'a>,
    count: usize,
) -> Result<&'a [u8], RequestError> {
    if cursor.remaining() < count {
        let remaining = cursor.remaining();
        return Err(AduParseError::InsufficientBytesForByteCount(count, remaining).into());
    }
    let bytes = cursor.read_bytes(count)?;
    cursor.expect_empty()?;
    Ok(bytes)
}

impl<'a> BitIteratorDisplay<'a> {
    pub(crate) fn new(level: PduDecodeLevel, iterator: BitIterator<'a>) -> Self {
        Self { iterator, level }
    }
}

impl std::fmt::Display for BitIteratorDisplay<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.iterator.range)?;

        if self.level.data_values() {
            for x in self.iterator {
                write!(f, "\n{x}")?;
            }
        }

        Ok(())
    }
}

impl<'a> RegisterIterator<'a> {
    pub(crate) fn parse_all(
        range: AddressRange,
        cursor: &mut ReadCursor<'a>,
    ) -> Result<Self, RequestError> {
        let bytes = read_payload(cursor, 2 * (range.count as usize))?;
        Ok(Self {
            bytes,
            range,
            pos: 0,
        })
    }
}

impl<'a> RegisterIteratorDisplay<'a> {
    pub(crate) fn new(level: PduDecodeLevel, iterator: RegisterIterator<'a>) -> Self {
        Self { iterator, level }
    }
}

impl std::fmt::Display for RegisterIteratorDisplay<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.iterator.range)?;

        if self.level.data_values() {
            for x in self.iterator {
                write!(f, "\n{x}")?;
            }
        }

        Ok(())
    }
}

impl<'a> Iterator for BitIterator<'a> {
    type Item = Indexed<bool>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos == self.range.count {
            return None;
        }
        let bit = crate::common::bits::get_bit(self.bytes, self.pos as usize)?;
        let address = self.range.start.wrapping_add(self.pos);
        self.pos += 1;
        Some(Indexed::new(address, bit))
    }

    // implementing this allows collect to optimize the vector capacity
    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.range.count - self.pos) as usize;
        (remaining, Some(remaining))
    }
}

impl<'a> Iterator for RegisterIterator<'a> {
    type Item = Indexed<u16>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos == self.range.count {
            return None;
        }

        let pos = 2 * (self.pos as usize);
        match self.bytes.get(pos..pos + 2) {
            Some([high, low]) => {
                let value = ((*high as u16) << 8) | *low as u16;
                let index = self.range.start.wrapping_add(self.pos);
                self.pos += 1;
                Some(Indexed::new(index, value))
            }
            _ => None,
        }
    }

    // implementing this allows collect to optimize the vector capacity
    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.range.count - self.pos) as usize;
        (remaining, Some(remaining))
    }
}

pub(crate) fn coil_from_u16(value: u16) -> Result<bool, AduParseError> {
    match value {
        crate::constants::coil::ON => Ok(true),
        crate::constants::coil::OFF => Ok(false),
        _ => Err(AduParseError::UnknownCoilState(value)),
    }
}

pub(crate) fn coil_to_u16(value: bool) -> u16 {
    if value {
        crate::constants::coil::ON
    } else {
        crate::constants::coil::OFF
    }
}

impl AddressRange {
    /// Create a new address range
    ///
    /// Fails if the count is zero, or if `start + count` exceeds the 65536 addresses of a table.
    pub fn try_from(start: u16, count: u16) -> Result<Self, RequestError> {
        if count == 0 {
            return Err(InvalidQuantity::CountOfZero.into());
        }

        let max_start = u16::MAX - (count - 1);

        if start > max_start {
            return Err(InvalidAddress::AddressOverflow(start, count).into());
        }

        Ok(Self { start, count })
    }

    /// Converts to std::ops::Range
    pub fn to_std_range(self) -> std::ops::Range<usize> {
        let start = self.start as usize;
        let end = start + (self.count as usize);
        start..end
    }

    pub(crate) fn limited_count(self, limit: u16) -> Result<Self, RequestError> {
        if self.count > limit {
            return Err(InvalidQuantity::CountTooLarge(self.count, limit).into());
        }
        Ok(self)
    }
}

impl std::fmt::Display for AddressRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "start: {:#06X} qty: {}", self.start, self.count)
    }
}

impl<T> Indexed<T> {
    /// Create a new indexed value
    pub fn new(index: u16, value: T) -> Self {
        Indexed { index, value }
    }
}

impl std::fmt::Display for Indexed<bool> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "idx: {:#06X} value: {}", self.index, self.value as i32)
    }
}

impl std::fmt::Display for Indexed<u16> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "idx: {:#06X} value: {:#06X}", self.index, self.value)
    }
}

impl UnitId {
    /// Create a new UnitId
    pub fn new(value: u8) -> Self {
        Self { value }
    }

    /// Broadcast address (only in RTU)
    pub fn broadcast() -> Self {
        Self {
            value: slave::BROADCAST,
        }
    }

    /// Returns true if this is the broadcast address
    pub fn is_broadcast(&self) -> bool {
        self.value == slave::BROADCAST
    }

    /// Returns true if the address is reserved in RTU mode
    ///
    /// Users should *not* use reserved addresses in RTU mode.
    pub fn is_rtu_reserved(&self) -> bool {
        self.value > slave::MAX_ADDRESS
    }

    /// Check that the id may be used as the destination of requests with a given framing
    ///
    /// Broadcast and 1..=247 are always valid. TCP additionally accepts `0xFF`, the id used when
    /// the server is not a gateway and ignores the field.
    pub fn validate_for(self, frame_type: FrameType) -> Result<Self, InvalidAddress> {
        match frame_type {
            FrameType::Tcp if self.value == slave::TCP_ANY_SLAVE => Ok(self),
            _ if self.is_rtu_reserved() => Err(InvalidAddress::SlaveOutOfRange(self.value)),
            _ => Ok(self),
        }
    }
}

/// Create the default UnitId of `0xFF`
impl Default for UnitId {
    fn default() -> Self {
        Self {
            value: slave::TCP_ANY_SLAVE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_start_max_count_of_one_is_allowed() {
        AddressRange::try_from(u16::MAX, 1).unwrap();
    }

    #[test]
    fn address_maximum_range_is_ok() {
        AddressRange::try_from(0, 0xFFFF).unwrap();
    }

    #[test]
    fn address_count_zero_fails_validation() {
        assert_eq!(
            AddressRange::try_from(0, 0),
            Err(RequestError::InvalidQuantity(InvalidQuantity::CountOfZero))
        );
    }

    #[test]
    fn start_max_count_of_two_overflows() {
        assert_eq!(
            AddressRange::try_from(u16::MAX, 2),
            Err(RequestError::InvalidAddress(
                InvalidAddress::AddressOverflow(u16::MAX, 2)
            ))
        );
    }

    #[test]
    fn correctly_iterates_over_low_order_bits() {
        let mut cursor = ReadCursor::new(&[0x03]);
        let iterator =
            BitIterator::parse_all(AddressRange::try_from(1, 3).unwrap(), &mut cursor).unwrap();
        assert_eq!(iterator.size_hint(), (3, Some(3)));
        let values: Vec<Indexed<bool>> = iterator.collect();
        assert_eq!(
            values,
            vec![
                Indexed::new(1, true),
                Indexed::new(2, true),
                Indexed::new(3, false)
            ]
        );
    }

    #[test]
    fn correctly_iterates_over_registers() {
        let mut cursor = ReadCursor::new(&[0xFF, 0xFF, 0x01, 0xCC]);
        let iterator =
            RegisterIterator::parse_all(AddressRange::try_from(1, 2).unwrap(), &mut cursor)
                .unwrap();

        assert_eq!(iterator.size_hint(), (2, Some(2)));
        let values: Vec<Indexed<u16>> = iterator.collect();
        assert_eq!(
            values,
            vec![Indexed::new(1, 0xFFFF), Indexed::new(2, 0x01CC)]
        );
    }

    #[test]
    fn broadcast_address() {
        assert_eq!(UnitId::broadcast(), UnitId::new(0x00));
        assert!(UnitId::broadcast().is_broadcast());
    }

    #[test]
    fn rtu_reserved_address() {
        assert!(UnitId::new(248).is_rtu_reserved());
        assert!(UnitId::new(255).is_rtu_reserved());
        assert!(!UnitId::new(41).is_rtu_reserved());
    }

    #[test]
    fn any_slave_sentinel_is_only_valid_on_tcp() {
        assert!(UnitId::new(0xFF).validate_for(FrameType::Tcp).is_ok());
        assert_eq!(
            UnitId::new(0xFF).validate_for(FrameType::Rtu),
            Err(InvalidAddress::SlaveOutOfRange(0xFF))
        );
        assert_eq!(
            UnitId::new(248).validate_for(FrameType::Tcp),
            Err(InvalidAddress::SlaveOutOfRange(248))
        );
        assert!(UnitId::new(247).validate_for(FrameType::Rtu).is_ok());
        assert!(UnitId::broadcast().validate_for(FrameType::Rtu).is_ok());
    }
}
