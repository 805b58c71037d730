use crate::client::validation::{validate, validate_values, OperationKind};
use crate::common::bits::{calc_bytes_for_bits, calc_bytes_for_registers, write_packed_bits};
use crate::common::function::FunctionCode;
use crate::common::traits::{Loggable, Serialize};
use crate::decode::PduDecodeLevel;
use crate::error::RequestError;
use crate::types::{coil_to_u16, AddressRange, Indexed};

use scursor::WriteCursor;

/// Values of a write multiple request along with the range they are written to
#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) struct WriteMultiple<'a, T> {
    pub(crate) range: AddressRange,
    pub(crate) values: &'a [T],
}

impl<'a, T> WriteMultiple<'a, T>
where
    T: Copy,
{
    fn iter(&self) -> impl Iterator<Item = Indexed<T>> + 'a {
        let start = self.range.start;
        self.values
            .iter()
            .enumerate()
            .map(move |(i, value)| Indexed::new(start.wrapping_add(i as u16), *value))
    }
}

/// A request that passed validation and can be encoded
#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) enum Request<'a> {
    ReadCoils(AddressRange),
    ReadDiscreteInputs(AddressRange),
    ReadHoldingRegisters(AddressRange),
    ReadInputRegisters(AddressRange),
    WriteSingleCoil(Indexed<bool>),
    WriteSingleRegister(Indexed<u16>),
    WriteMultipleCoils(WriteMultiple<'a, bool>),
    WriteMultipleRegisters(WriteMultiple<'a, u16>),
    WriteAndReadRegisters(WriteMultiple<'a, u16>, AddressRange),
    ReportSlaveId,
}

impl<'a> Request<'a> {
    pub(crate) fn read_coils(start: u16, count: u16) -> Result<Self, RequestError> {
        Ok(Request::ReadCoils(validate(OperationKind::ReadBits, start, count)?))
    }

    pub(crate) fn read_discrete_inputs(start: u16, count: u16) -> Result<Self, RequestError> {
        Ok(Request::ReadDiscreteInputs(validate(
            OperationKind::ReadBits,
            start,
            count,
        )?))
    }

    pub(crate) fn read_holding_registers(start: u16, count: u16) -> Result<Self, RequestError> {
        Ok(Request::ReadHoldingRegisters(validate(
            OperationKind::ReadRegisters,
            start,
            count,
        )?))
    }

    pub(crate) fn read_input_registers(start: u16, count: u16) -> Result<Self, RequestError> {
        Ok(Request::ReadInputRegisters(validate(
            OperationKind::ReadRegisters,
            start,
            count,
        )?))
    }

    pub(crate) fn write_single_coil(address: u16, value: bool) -> Self {
        Request::WriteSingleCoil(Indexed::new(address, value))
    }

    pub(crate) fn write_single_register(address: u16, value: u16) -> Self {
        Request::WriteSingleRegister(Indexed::new(address, value))
    }

    pub(crate) fn write_multiple_coils(
        start: u16,
        values: &'a [bool],
    ) -> Result<Self, RequestError> {
        let range = validate_values(OperationKind::WriteBits, start, values)?;
        Ok(Request::WriteMultipleCoils(WriteMultiple { range, values }))
    }

    pub(crate) fn write_multiple_registers(
        start: u16,
        values: &'a [u16],
    ) -> Result<Self, RequestError> {
        let range = validate_values(OperationKind::WriteRegisters, start, values)?;
        Ok(Request::WriteMultipleRegisters(WriteMultiple { range, values }))
    }

    pub(crate) fn write_and_read_registers(
        write_start: u16,
        values: &'a [u16],
        read_start: u16,
        read_count: u16,
    ) -> Result<Self, RequestError> {
        let write = validate_values(OperationKind::WriteAndReadRegisters, write_start, values)?;
        let read = validate(OperationKind::ReadRegisters, read_start, read_count)?;
        Ok(Request::WriteAndReadRegisters(
            WriteMultiple {
                range: write,
                values,
            },
            read,
        ))
    }

    pub(crate) fn function(&self) -> FunctionCode {
        match self {
            Request::ReadCoils(_) => FunctionCode::ReadCoils,
            Request::ReadDiscreteInputs(_) => FunctionCode::ReadDiscreteInputs,
            Request::ReadHoldingRegisters(_) => FunctionCode::ReadHoldingRegisters,
            Request::ReadInputRegisters(_) => FunctionCode::ReadInputRegisters,
            Request::WriteSingleCoil(_) => FunctionCode::WriteSingleCoil,
            Request::WriteSingleRegister(_) => FunctionCode::WriteSingleRegister,
            Request::WriteMultipleCoils(_) => FunctionCode::WriteMultipleCoils,
            Request::WriteMultipleRegisters(_) => FunctionCode::WriteMultipleRegisters,
            Request::WriteAndReadRegisters(_, _) => FunctionCode::WriteAndReadRegisters,
            Request::ReportSlaveId => FunctionCode::ReportSlaveId,
        }
    }
}

impl Serialize for Request<'_> {
    fn serialize(&self, cursor: &mut WriteCursor) -> Result<(), RequestError> {
        cursor.write_u8(self.function().get_value())?;
        match self {
            Request::ReadCoils(range)
            | Request::ReadDiscreteInputs(range)
            | Request::ReadHoldingRegisters(range)
            | Request::ReadInputRegisters(range) => range.serialize(cursor),
            Request::WriteSingleCoil(x) => {
                cursor.write_u16_be(x.index)?;
                cursor.write_u16_be(coil_to_u16(x.value))?;
                Ok(())
            }
            Request::WriteSingleRegister(x) => {
                cursor.write_u16_be(x.index)?;
                cursor.write_u16_be(x.value)?;
                Ok(())
            }
            Request::WriteMultipleCoils(x) => {
                x.range.serialize(cursor)?;
                cursor.write_u8(calc_bytes_for_bits(x.values.len())?)?;
                write_packed_bits(cursor, x.values)?;
                Ok(())
            }
            Request::WriteMultipleRegisters(x) => {
                x.range.serialize(cursor)?;
                write_registers(cursor, x.values)
            }
            Request::WriteAndReadRegisters(write, read) => {
                read.serialize(cursor)?;
                write.range.serialize(cursor)?;
                write_registers(cursor, write.values)
            }
            Request::ReportSlaveId => Ok(()),
        }
    }
}

impl Serialize for AddressRange {
    fn serialize(&self, cursor: &mut WriteCursor) -> Result<(), RequestError> {
        cursor.write_u16_be(self.start)?;
        cursor.write_u16_be(self.count)?;
        Ok(())
    }
}

fn write_registers(cursor: &mut WriteCursor, values: &[u16]) -> Result<(), RequestError> {
    cursor.write_u8(calc_bytes_for_registers(values.len())?)?;
    for value in values {
        cursor.write_u16_be(*value)?;
    }
    Ok(())
}

impl Loggable for Request<'_> {
    fn log(&self, level: PduDecodeLevel, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.function())?;

        if !level.data_headers() {
            return Ok(());
        }

        match self {
            Request::ReadCoils(range)
            | Request::ReadDiscreteInputs(range)
            | Request::ReadHoldingRegisters(range)
            | Request::ReadInputRegisters(range) => write!(f, " {range}"),
            Request::WriteSingleCoil(x) => write!(f, " {x}"),
            Request::WriteSingleRegister(x) => write!(f, " {x}"),
            Request::WriteMultipleCoils(x) => {
                write!(f, " {}", x.range)?;
                if level.data_values() {
                    for value in x.iter() {
                        write!(f, "\n{value}")?;
                    }
                }
                Ok(())
            }
            Request::WriteMultipleRegisters(x) => {
                write!(f, " {}", x.range)?;
                if level.data_values() {
                    for value in x.iter() {
                        write!(f, "\n{value}")?;
                    }
                }
                Ok(())
            }
            Request::WriteAndReadRegisters(write, read) => {
                write!(f, " read {read} write {}", write.range)?;
                if level.data_values() {
                    for value in write.iter() {
                        write!(f, "\n{value}")?;
                    }
                }
                Ok(())
            }
            Request::ReportSlaveId => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::traits::LoggableDisplay;
    use crate::error::InvalidQuantity;

    fn encode(request: &Request) -> Vec<u8> {
        let mut buffer = [0u8; 256];
        let mut cursor = WriteCursor::new(&mut buffer);
        request.serialize(&mut cursor).unwrap();
        let length = cursor.position();
        buffer[..length].to_vec()
    }

    #[test]
    fn encodes_read_requests() {
        assert_eq!(
            encode(&Request::read_coils(0x0013, 0x0025).unwrap()),
            vec![0x01, 0x00, 0x13, 0x00, 0x25]
        );
        assert_eq!(
            encode(&Request::read_input_registers(0x0008, 1).unwrap()),
            vec![0x04, 0x00, 0x08, 0x00, 0x01]
        );
    }

    #[test]
    fn encodes_single_writes() {
        assert_eq!(
            encode(&Request::write_single_coil(0x00AC, true)),
            vec![0x05, 0x00, 0xAC, 0xFF, 0x00]
        );
        assert_eq!(
            encode(&Request::write_single_coil(0x00AC, false)),
            vec![0x05, 0x00, 0xAC, 0x00, 0x00]
        );
        assert_eq!(
            encode(&Request::write_single_register(0x0001, 0x0003)),
            vec![0x06, 0x00, 0x01, 0x00, 0x03]
        );
    }

    #[test]
    fn encodes_write_multiple_coils_with_byte_count() {
        let values = [
            true, false, true, true, false, false, true, true, true, false,
        ];
        assert_eq!(
            encode(&Request::write_multiple_coils(0x0013, &values).unwrap()),
            vec![0x0F, 0x00, 0x13, 0x00, 0x0A, 0x02, 0xCD, 0x01]
        );
    }

    #[test]
    fn encodes_write_multiple_registers_with_byte_count() {
        assert_eq!(
            encode(&Request::write_multiple_registers(0x0001, &[0x000A, 0x0102]).unwrap()),
            vec![0x10, 0x00, 0x01, 0x00, 0x02, 0x04, 0x00, 0x0A, 0x01, 0x02]
        );
    }

    #[test]
    fn encodes_write_and_read_with_read_fields_first() {
        let values = [0x00FF, 0x00FF, 0x00FF];
        let request = Request::write_and_read_registers(0x000E, &values, 0x0003, 6).unwrap();
        assert_eq!(
            encode(&request),
            vec![
                0x17, 0x00, 0x03, 0x00, 0x06, 0x00, 0x0E, 0x00, 0x03, 0x06, 0x00, 0xFF, 0x00,
                0xFF, 0x00, 0xFF
            ]
        );
    }

    #[test]
    fn encodes_report_slave_id_as_function_code_only() {
        assert_eq!(encode(&Request::ReportSlaveId), vec![0x11]);
    }

    #[test]
    fn write_and_read_limits_apply_to_each_side() {
        let values = [0u16; 122];
        assert_eq!(
            Request::write_and_read_registers(0, &values, 0, 1),
            Err(RequestError::InvalidQuantity(InvalidQuantity::CountTooLarge(
                122, 121
            )))
        );
        assert_eq!(
            Request::write_and_read_registers(0, &values[..121], 0, 126),
            Err(RequestError::InvalidQuantity(InvalidQuantity::CountTooLarge(
                126, 125
            )))
        );
    }

    #[test]
    fn maximum_sized_requests_fit_in_a_pdu() {
        let coils = [true; 1968];
        assert_eq!(
            encode(&Request::write_multiple_coils(0, &coils).unwrap()).len(),
            6 + 246
        );
        let registers = [0xFFFF; 123];
        assert_eq!(
            encode(&Request::write_multiple_registers(0, &registers).unwrap()).len(),
            6 + 246
        );
    }

    #[test]
    fn logs_values_only_at_the_most_verbose_level() {
        let request = Request::write_multiple_registers(0x0001, &[0x000A]).unwrap();
        assert_eq!(
            LoggableDisplay::new(&request, PduDecodeLevel::FunctionCode).to_string(),
            "WRITE MULTIPLE REGISTERS (0x10)"
        );
        assert_eq!(
            LoggableDisplay::new(&request, PduDecodeLevel::DataHeaders).to_string(),
            "WRITE MULTIPLE REGISTERS (0x10) start: 0x0001 qty: 1"
        );
        assert_eq!(
            LoggableDisplay::new(&request, PduDecodeLevel::DataValues).to_string(),
            "WRITE MULTIPLE REGISTERS (0x10) start: 0x0001 qty: 1\nidx: 0x0001 value: 0x000A"
        );
    }
}
