use crate::constants::limits;
use crate::error::{InvalidAddress, InvalidQuantity, RequestError};
use crate::types::{AddressRange, UnitId};

/// Classes of request that share a quantity ceiling
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OperationKind {
    /// read coils or discrete inputs
    ReadBits,
    /// write multiple coils
    WriteBits,
    /// read holding or input registers, and the read side of write-and-read
    ReadRegisters,
    /// write multiple registers
    WriteRegisters,
    /// the write side of write-and-read
    WriteAndReadRegisters,
}

impl OperationKind {
    /// Largest quantity a single request of this kind may carry
    pub fn max_quantity(self) -> u16 {
        match self {
            OperationKind::ReadBits => limits::MAX_READ_BITS_COUNT,
            OperationKind::WriteBits => limits::MAX_WRITE_BITS_COUNT,
            OperationKind::ReadRegisters => limits::MAX_READ_REGISTERS_COUNT,
            OperationKind::WriteRegisters => limits::MAX_WRITE_REGISTERS_COUNT,
            OperationKind::WriteAndReadRegisters => limits::MAX_RW_WRITE_REGISTERS_COUNT,
        }
    }
}

/// Check a start address and quantity against the limits of an operation
///
/// The quantity is checked first: a zero or oversized quantity fails with
/// [`RequestError::InvalidQuantity`] even if the range would also overflow the table.
///
/// ```
/// use modbus_master::{validate, OperationKind, RequestError, InvalidQuantity};
///
/// assert!(validate(OperationKind::ReadRegisters, 0, 125).is_ok());
/// assert_eq!(
///     validate(OperationKind::ReadRegisters, 0, 126),
///     Err(RequestError::InvalidQuantity(InvalidQuantity::CountTooLarge(126, 125)))
/// );
/// ```
pub fn validate(
    kind: OperationKind,
    start: u16,
    quantity: u16,
) -> Result<AddressRange, RequestError> {
    if quantity == 0 {
        return Err(InvalidQuantity::CountOfZero.into());
    }
    let max = kind.max_quantity();
    if quantity > max {
        return Err(InvalidQuantity::CountTooLarge(quantity, max).into());
    }
    AddressRange::try_from(start, quantity)?.limited_count(max)
}

/// Validate a range whose quantity comes from the length of a slice of values to write
pub(crate) fn validate_values<T>(
    kind: OperationKind,
    start: u16,
    values: &[T],
) -> Result<AddressRange, RequestError> {
    let quantity =
        u16::try_from(values.len()).map_err(|_| InvalidQuantity::TooManyValues(values.len()))?;
    validate(kind, start, quantity)
}

/// Read requests expect a reply from exactly one slave
pub(crate) fn check_read_destination(unit_id: UnitId) -> Result<(), RequestError> {
    if unit_id.is_broadcast() {
        return Err(InvalidAddress::BroadcastRead.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_each_ceiling_and_rejects_one_more() {
        for (kind, max) in [
            (OperationKind::ReadBits, 2000),
            (OperationKind::WriteBits, 1968),
            (OperationKind::ReadRegisters, 125),
            (OperationKind::WriteRegisters, 123),
            (OperationKind::WriteAndReadRegisters, 121),
        ] {
            assert_eq!(kind.max_quantity(), max);
            assert_eq!(
                validate(kind, 0, max),
                Ok(AddressRange {
                    start: 0,
                    count: max
                })
            );
            assert_eq!(
                validate(kind, 0, max + 1),
                Err(RequestError::InvalidQuantity(InvalidQuantity::CountTooLarge(
                    max + 1,
                    max
                )))
            );
        }
    }

    #[test]
    fn rejects_zero_quantity() {
        assert_eq!(
            validate(OperationKind::ReadBits, 10, 0),
            Err(RequestError::InvalidQuantity(InvalidQuantity::CountOfZero))
        );
    }

    #[test]
    fn range_may_end_exactly_at_the_top_of_the_table() {
        assert!(validate(OperationKind::ReadRegisters, 0xFFFF, 1).is_ok());
        assert!(validate(OperationKind::ReadRegisters, 0xFF83, 125).is_ok());
        assert_eq!(
            validate(OperationKind::ReadRegisters, 0xFF84, 125),
            Err(RequestError::InvalidAddress(InvalidAddress::AddressOverflow(
                0xFF84, 125
            )))
        );
    }

    #[test]
    fn quantity_is_checked_before_address() {
        assert_eq!(
            validate(OperationKind::ReadBits, 0xFFFF, 3000),
            Err(RequestError::InvalidQuantity(InvalidQuantity::CountTooLarge(
                3000, 2000
            )))
        );
    }

    #[test]
    fn value_slices_longer_than_u16_are_rejected() {
        let values = vec![0u16; 70000];
        assert_eq!(
            validate_values(OperationKind::WriteRegisters, 0, &values),
            Err(RequestError::InvalidQuantity(InvalidQuantity::TooManyValues(
                70000
            )))
        );
        assert_eq!(
            validate_values::<bool>(OperationKind::WriteBits, 0, &[]),
            Err(RequestError::InvalidQuantity(InvalidQuantity::CountOfZero))
        );
    }

    #[test]
    fn broadcast_reads_are_rejected() {
        assert_eq!(
            check_read_destination(UnitId::broadcast()),
            Err(RequestError::InvalidAddress(InvalidAddress::BroadcastRead))
        );
        assert!(check_read_destination(UnitId::new(1)).is_ok());
    }
}
