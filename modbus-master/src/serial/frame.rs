use crate::common::buffer::ReadBuffer;
use crate::common::frame::{Frame, FrameHeader};
use crate::common::function::FunctionCode;
use crate::common::traits::Serialize;
use crate::constants::frame::MAX_PDU_LENGTH;
use crate::decode::AduDecodeLevel;
use crate::error::{FrameParseError, InternalError, RequestError};
use crate::types::UnitId;

use scursor::WriteCursor;

pub(crate) mod constants {
    use crate::constants::frame::MAX_PDU_LENGTH;

    pub(crate) const HEADER_LENGTH: usize = 1;
    pub(crate) const FUNCTION_CODE_LENGTH: usize = 1;
    pub(crate) const CRC_LENGTH: usize = 2;
    pub(crate) const MAX_FRAME_LENGTH: usize = HEADER_LENGTH + MAX_PDU_LENGTH + CRC_LENGTH;
}

/// precomputes the CRC table as a constant!
const CRC: crc::Crc<u16> = crc::Crc::<u16>::new(&crc::CRC_16_MODBUS);

#[derive(Clone, Copy)]
enum ParseState {
    Start,
    ReadFullBody(UnitId, usize),          // unit_id, length of rest
    ReadToOffsetForLength(UnitId, usize), // unit_id, length to length
}

#[derive(Clone, Copy)]
enum LengthMode {
    /// The length is always the same (without function code)
    Fixed(usize),
    /// You need to read X more bytes. The last byte contains the number of extra bytes to read after that
    Offset(usize),
    /// Unknown function code, can't determine the size
    Unknown,
}

/// Parses replies from a slave. RTU carries no length field, so the length is derived from the
/// function code of each reply.
pub(crate) struct RtuParser {
    state: ParseState,
    // applied to function codes the library never issues itself
    fallback: LengthMode,
}

impl RtuParser {
    pub(crate) fn new_response_parser() -> Self {
        Self {
            state: ParseState::Start,
            fallback: LengthMode::Unknown,
        }
    }

    /// Parser for confirmations to raw requests, which may use any function code
    ///
    /// Replies to unknown function codes are assumed to echo 4 bytes, like the write functions.
    pub(crate) fn new_confirmation_parser() -> Self {
        Self {
            state: ParseState::Start,
            fallback: LengthMode::Fixed(4),
        }
    }

    // Returns how to calculate the length of the body
    fn length_mode(&self, function_code: u8) -> LengthMode {
        if function_code & 0x80 != 0 {
            return LengthMode::Fixed(1);
        }

        let function_code = match FunctionCode::get(function_code) {
            Some(code) => code,
            None => return self.fallback,
        };

        match function_code {
            FunctionCode::ReadCoils => LengthMode::Offset(1),
            FunctionCode::ReadDiscreteInputs => LengthMode::Offset(1),
            FunctionCode::ReadHoldingRegisters => LengthMode::Offset(1),
            FunctionCode::ReadInputRegisters => LengthMode::Offset(1),
            FunctionCode::WriteSingleCoil => LengthMode::Fixed(4),
            FunctionCode::WriteSingleRegister => LengthMode::Fixed(4),
            FunctionCode::WriteMultipleCoils => LengthMode::Fixed(4),
            FunctionCode::WriteMultipleRegisters => LengthMode::Fixed(4),
            FunctionCode::ReportSlaveId => LengthMode::Offset(1),
            FunctionCode::WriteAndReadRegisters => LengthMode::Offset(1),
        }
    }

    pub(crate) fn parse(
        &mut self,
        cursor: &mut ReadBuffer,
        decode_level: AduDecodeLevel,
    ) -> Result<Option<Frame>, RequestError> {
        match self.state {
            ParseState::Start => {
                if cursor.len() < 2 {
                    return Ok(None);
                }

                let unit_id = UnitId::new(cursor.read_u8()?);

                if unit_id.is_rtu_reserved() {
                    tracing::warn!("received reserved unit ID {}, passing it through", unit_id);
                }

                // the function code stays in the buffer so that the PDU can be read in one piece
                let raw_function_code = cursor.peek_at(0)?;

                self.state = match self.length_mode(raw_function_code) {
                    LengthMode::Fixed(length) => ParseState::ReadFullBody(unit_id, length),
                    LengthMode::Offset(offset) => {
                        ParseState::ReadToOffsetForLength(unit_id, offset)
                    }
                    LengthMode::Unknown => {
                        return Err(FrameParseError::UnknownFunctionCode(raw_function_code).into())
                    }
                };

                self.parse(cursor, decode_level)
            }
            ParseState::ReadToOffsetForLength(unit_id, offset) => {
                if cursor.len() < constants::FUNCTION_CODE_LENGTH + offset {
                    return Ok(None);
                }

                // Get the complete size
                let extra_bytes_to_read =
                    cursor.peek_at(constants::FUNCTION_CODE_LENGTH + offset - 1)? as usize;
                self.state = ParseState::ReadFullBody(unit_id, offset + extra_bytes_to_read);

                self.parse(cursor, decode_level)
            }
            ParseState::ReadFullBody(unit_id, length) => {
                if constants::FUNCTION_CODE_LENGTH + length > MAX_PDU_LENGTH {
                    return Err(FrameParseError::FrameLengthTooBig(
                        constants::FUNCTION_CODE_LENGTH + length,
                        MAX_PDU_LENGTH,
                    )
                    .into());
                }

                if cursor.len() < constants::FUNCTION_CODE_LENGTH + length + constants::CRC_LENGTH {
                    return Ok(None);
                }

                let pdu = cursor
                    .read(constants::FUNCTION_CODE_LENGTH + length)?
                    .to_vec();
                let received_crc = cursor.read_u16_le()?;

                let expected_crc = {
                    let mut digest = CRC.digest();
                    digest.update(&[unit_id.value]);
                    digest.update(&pdu);
                    digest.finalize()
                };

                self.state = ParseState::Start;

                if received_crc != expected_crc {
                    return Err(
                        FrameParseError::CrcValidationFailure(received_crc, expected_crc).into(),
                    );
                }

                if decode_level.enabled() {
                    tracing::info!(
                        "RTU RX - {}",
                        RtuDisplay::new(decode_level, unit_id, &pdu, received_crc)
                    );
                }

                let mut adu = Vec::with_capacity(
                    pdu.len() + constants::HEADER_LENGTH + constants::CRC_LENGTH,
                );
                adu.push(unit_id.value);
                adu.extend_from_slice(&pdu);
                adu.extend_from_slice(&received_crc.to_le_bytes());

                Ok(Some(Frame::new(
                    FrameHeader::new_rtu_header(unit_id),
                    pdu,
                    adu,
                )))
            }
        }
    }
}

/// write the slave address, the PDU, and the CRC
///
/// returns the total length of the ADU
pub(crate) fn format_rtu(
    buffer: &mut [u8],
    header: FrameHeader,
    msg: &dyn Serialize,
    decode_level: AduDecodeLevel,
) -> Result<usize, RequestError> {
    let end_pdu = {
        let mut cursor = WriteCursor::new(&mut *buffer);
        cursor.write_u8(header.unit_id.value)?;
        msg.serialize(&mut cursor)?;
        cursor.position()
    };

    let crc = CRC.checksum(
        buffer
            .get(..end_pdu)
            .ok_or(InternalError::BadSeekOperation)?,
    );
    {
        let mut cursor = WriteCursor::new(&mut *buffer);
        cursor.seek_to(end_pdu)?;
        cursor.write_u16_le(crc)?;
    }

    if decode_level.enabled() {
        let payload = buffer
            .get(constants::HEADER_LENGTH..end_pdu)
            .ok_or(InternalError::BadSeekOperation)?;
        tracing::info!(
            "RTU TX - {}",
            RtuDisplay::new(decode_level, header.unit_id, payload, crc)
        );
    }

    Ok(end_pdu + constants::CRC_LENGTH)
}

pub(crate) struct RtuDisplay<'a> {
    level: AduDecodeLevel,
    unit_id: UnitId,
    payload: &'a [u8],
    crc: u16,
}

impl<'a> RtuDisplay<'a> {
    pub(crate) fn new(level: AduDecodeLevel, unit_id: UnitId, payload: &'a [u8], crc: u16) -> Self {
        RtuDisplay {
            level,
            unit_id,
            payload,
            crc,
        }
    }
}

impl std::fmt::Display for RtuDisplay<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "dest: {} crc: {:#06X} (payload len = {})",
            self.unit_id,
            self.crc,
            self.payload.len(),
        )?;
        if self.level.payload_enabled() {
            crate::common::phys::format_bytes(f, self.payload)?;
        }
        Ok(())
    }
}
