use crate::client::request::{Request, WriteMultiple};
use crate::common::bits::num_bytes_for_bits;
use crate::common::function::FunctionCode;
use crate::decode::PduDecodeLevel;
use crate::error::{AduParseError, InternalError, RequestError};
use crate::exception::ExceptionCode;
use crate::types::{
    coil_from_u16, read_payload, AddressRange, BitIterator, BitIteratorDisplay, Indexed,
    RegisterIterator, RegisterIteratorDisplay,
};

use scursor::ReadCursor;

/// Data carried by a successful reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Response {
    Bits(Vec<bool>),
    Registers(Vec<u16>),
    Written,
    SlaveId(Vec<u8>),
}

impl Response {
    pub(crate) fn into_bits(self) -> Result<Vec<bool>, RequestError> {
        match self {
            Response::Bits(x) => Ok(x),
            _ => Err(InternalError::UnexpectedResponse.into()),
        }
    }

    pub(crate) fn into_registers(self) -> Result<Vec<u16>, RequestError> {
        match self {
            Response::Registers(x) => Ok(x),
            _ => Err(InternalError::UnexpectedResponse.into()),
        }
    }

    pub(crate) fn into_written(self) -> Result<(), RequestError> {
        match self {
            Response::Written => Ok(()),
            _ => Err(InternalError::UnexpectedResponse.into()),
        }
    }

    pub(crate) fn into_slave_id(self) -> Result<Vec<u8>, RequestError> {
        match self {
            Response::SlaveId(x) => Ok(x),
            _ => Err(InternalError::UnexpectedResponse.into()),
        }
    }
}

/// Decode the reply PDU to a request
pub(crate) fn parse_response(
    request: &Request,
    pdu: &[u8],
    level: PduDecodeLevel,
) -> Result<Response, RequestError> {
    let function = request.function();
    let mut cursor = ReadCursor::new(pdu);
    let received = cursor.read_u8()?;

    if received & 0x80 != 0 {
        if received != function.as_error() {
            return Err(AduParseError::FunctionMismatch(received, function.get_value()).into());
        }
        let ex = ExceptionCode::from(cursor.read_u8()?);
        if level.enabled() {
            tracing::warn!("PDU RX - Modbus exception {:?} ({:#04X})", ex, u8::from(ex));
        }
        return Err(RequestError::SlaveException(ex));
    }

    if received != function.get_value() {
        return Err(AduParseError::FunctionMismatch(received, function.get_value()).into());
    }

    let response = match request {
        Request::ReadCoils(range) | Request::ReadDiscreteInputs(range) => {
            read_byte_count(&mut cursor, num_bytes_for_bits(range.count))?;
            let iterator = BitIterator::parse_all(*range, &mut cursor)?;
            log_rx(function, level, BitIteratorDisplay::new(level, iterator));
            Response::Bits(iterator.map(|x| x.value).collect())
        }
        Request::ReadHoldingRegisters(range)
        | Request::ReadInputRegisters(range)
        | Request::WriteAndReadRegisters(_, range) => {
            parse_registers(function, *range, &mut cursor, level)?
        }
        Request::WriteSingleCoil(expected) => {
            let address = cursor.read_u16_be()?;
            let value = coil_from_u16(cursor.read_u16_be()?)?;
            cursor.expect_empty()?;
            let echo = Indexed::new(address, value);
            check_echo(*expected == echo)?;
            log_rx(function, level, echo);
            Response::Written
        }
        Request::WriteSingleRegister(expected) => {
            let echo = Indexed::new(cursor.read_u16_be()?, cursor.read_u16_be()?);
            cursor.expect_empty()?;
            check_echo(*expected == echo)?;
            log_rx(function, level, echo);
            Response::Written
        }
        Request::WriteMultipleCoils(WriteMultiple { range, .. }) => {
            parse_write_multiple(function, *range, &mut cursor, level)?
        }
        Request::WriteMultipleRegisters(WriteMultiple { range, .. }) => {
            parse_write_multiple(function, *range, &mut cursor, level)?
        }
        Request::ReportSlaveId => {
            let byte_count = cursor.read_u8()? as usize;
            if byte_count == 0 {
                return Err(AduParseError::ByteCountZero.into());
            }
            let data = read_payload(&mut cursor, byte_count)?;
            log_rx(function, level, SlaveIdDisplay { level, data });
            Response::SlaveId(data.to_vec())
        }
    };

    Ok(response)
}

fn read_byte_count(cursor: &mut ReadCursor, expected: usize) -> Result<(), RequestError> {
    let byte_count = cursor.read_u8()? as usize;
    if byte_count != expected {
        return Err(AduParseError::ByteCountMismatch(byte_count, expected).into());
    }
    Ok(())
}

fn parse_registers(
    function: FunctionCode,
    range: AddressRange,
    cursor: &mut ReadCursor,
    level: PduDecodeLevel,
) -> Result<Response, RequestError> {
    read_byte_count(cursor, 2 * range.count as usize)?;
    let iterator = RegisterIterator::parse_all(range, cursor)?;
    log_rx(function, level, RegisterIteratorDisplay::new(level, iterator));
    Ok(Response::Registers(iterator.map(|x| x.value).collect()))
}

fn parse_write_multiple(
    function: FunctionCode,
    range: AddressRange,
    cursor: &mut ReadCursor,
    level: PduDecodeLevel,
) -> Result<Response, RequestError> {
    let echo = AddressRange {
        start: cursor.read_u16_be()?,
        count: cursor.read_u16_be()?,
    };
    cursor.expect_empty()?;
    check_echo(echo == range)?;
    log_rx(function, level, echo);
    Ok(Response::Written)
}

fn check_echo(matches: bool) -> Result<(), RequestError> {
    if !matches {
        return Err(AduParseError::ReplyEchoMismatch.into());
    }
    Ok(())
}

fn log_rx<T: std::fmt::Display>(function: FunctionCode, level: PduDecodeLevel, details: T) {
    if level.data_headers() {
        tracing::info!("PDU RX - {} {}", function, details);
    } else if level.enabled() {
        tracing::info!("PDU RX - {}", function);
    }
}

struct SlaveIdDisplay<'a> {
    level: PduDecodeLevel,
    data: &'a [u8],
}

impl std::fmt::Display for SlaveIdDisplay<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "byte count: {}", self.data.len())?;
        if self.level.data_values() {
            crate::common::phys::format_bytes(f, self.data)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(request: &Request, pdu: &[u8]) -> Result<Response, RequestError> {
        parse_response(request, pdu, PduDecodeLevel::Nothing)
    }

    #[test]
    fn decodes_packed_coils() {
        let request = Request::read_coils(0x0013, 10).unwrap();
        assert_eq!(
            parse(&request, &[0x01, 0x02, 0xCD, 0x01]),
            Ok(Response::Bits(vec![
                true, false, true, true, false, false, true, true, true, false
            ]))
        );
    }

    #[test]
    fn decodes_registers() {
        let request = Request::read_holding_registers(0x006B, 3).unwrap();
        assert_eq!(
            parse(&request, &[0x03, 0x06, 0x02, 0x2B, 0x00, 0x00, 0x00, 0x64]),
            Ok(Response::Registers(vec![0x022B, 0x0000, 0x0064]))
        );
    }

    #[test]
    fn exception_reply_maps_to_slave_exception() {
        let request = Request::read_holding_registers(0x006B, 3).unwrap();
        assert_eq!(
            parse(&request, &[0x83, 0x02]),
            Err(RequestError::SlaveException(
                ExceptionCode::IllegalDataAddress
            ))
        );
    }

    #[test]
    fn exception_for_another_function_is_a_bad_response() {
        let request = Request::read_holding_registers(0x006B, 3).unwrap();
        assert_eq!(
            parse(&request, &[0x84, 0x02]),
            Err(RequestError::BadResponse(AduParseError::FunctionMismatch(
                0x84, 0x03
            )))
        );
    }

    #[test]
    fn function_mismatch_is_a_bad_response() {
        let request = Request::read_input_registers(0, 1).unwrap();
        assert_eq!(
            parse(&request, &[0x03, 0x02, 0x00, 0x01]),
            Err(RequestError::BadResponse(AduParseError::FunctionMismatch(
                0x03, 0x04
            )))
        );
    }

    #[test]
    fn byte_count_must_match_requested_quantity() {
        let request = Request::read_holding_registers(0, 2).unwrap();
        assert_eq!(
            parse(&request, &[0x03, 0x02, 0x00, 0x01]),
            Err(RequestError::BadResponse(AduParseError::ByteCountMismatch(
                2, 4
            )))
        );

        let request = Request::read_coils(0, 9).unwrap();
        assert_eq!(
            parse(&request, &[0x01, 0x01, 0xFF]),
            Err(RequestError::BadResponse(AduParseError::ByteCountMismatch(
                1, 2
            )))
        );
    }

    #[test]
    fn payload_must_match_byte_count() {
        let request = Request::read_holding_registers(0, 2).unwrap();
        assert_eq!(
            parse(&request, &[0x03, 0x04, 0x00, 0x01, 0x00]),
            Err(RequestError::BadResponse(
                AduParseError::InsufficientBytesForByteCount(4, 3)
            ))
        );
        assert_eq!(
            parse(&request, &[0x03, 0x04, 0x00, 0x01, 0x00, 0x02, 0xFF]),
            Err(RequestError::BadResponse(AduParseError::TrailingBytes(1)))
        );
    }

    #[test]
    fn write_replies_must_echo_the_request() {
        let request = Request::write_single_register(0x0001, 0x0003);
        assert_eq!(
            parse(&request, &[0x06, 0x00, 0x01, 0x00, 0x03]),
            Ok(Response::Written)
        );
        assert_eq!(
            parse(&request, &[0x06, 0x00, 0x01, 0x00, 0x04]),
            Err(RequestError::BadResponse(AduParseError::ReplyEchoMismatch))
        );

        let request = Request::write_single_coil(0x00AC, true);
        assert_eq!(
            parse(&request, &[0x05, 0x00, 0xAC, 0xFF, 0x00]),
            Ok(Response::Written)
        );
        assert_eq!(
            parse(&request, &[0x05, 0x00, 0xAC, 0x12, 0x34]),
            Err(RequestError::BadResponse(AduParseError::UnknownCoilState(
                0x1234
            )))
        );

        let values = [0x000A, 0x0102];
        let request = Request::write_multiple_registers(0x0001, &values).unwrap();
        assert_eq!(
            parse(&request, &[0x10, 0x00, 0x01, 0x00, 0x02]),
            Ok(Response::Written)
        );
        assert_eq!(
            parse(&request, &[0x10, 0x00, 0x01, 0x00, 0x01]),
            Err(RequestError::BadResponse(AduParseError::ReplyEchoMismatch))
        );
    }

    #[test]
    fn write_and_read_returns_the_read_side() {
        let values = [0x00FF; 3];
        let request = Request::write_and_read_registers(0x000E, &values, 0x0003, 2).unwrap();
        assert_eq!(
            parse(&request, &[0x17, 0x04, 0x00, 0xFE, 0x0A, 0xCD]),
            Ok(Response::Registers(vec![0x00FE, 0x0ACD]))
        );
    }

    #[test]
    fn report_slave_id_returns_raw_bytes() {
        assert_eq!(
            parse(&Request::ReportSlaveId, &[0x11, 0x03, 0x2A, 0xFF, 0x01]),
            Ok(Response::SlaveId(vec![0x2A, 0xFF, 0x01]))
        );
        assert_eq!(
            parse(&Request::ReportSlaveId, &[0x11, 0x00]),
            Err(RequestError::BadResponse(AduParseError::ByteCountZero))
        );
        assert_eq!(
            parse(&Request::ReportSlaveId, &[0x11, 0x04, 0x2A, 0xFF, 0x01]),
            Err(RequestError::BadResponse(
                AduParseError::InsufficientBytesForByteCount(4, 3)
            ))
        );
    }
}
