use crate::common::buffer::ReadBuffer;
use crate::common::frame::{Frame, FrameHeader, TxId};
use crate::common::traits::Serialize;
use crate::decode::AduDecodeLevel;
use crate::error::{FrameParseError, InternalError, RequestError};
use crate::types::UnitId;

use scursor::WriteCursor;

pub(crate) mod constants {
    use crate::constants::frame::MAX_PDU_LENGTH;

    pub(crate) const HEADER_LENGTH: usize = 7;
    pub(crate) const MAX_FRAME_LENGTH: usize = HEADER_LENGTH + MAX_PDU_LENGTH;
    // includes the 1 byte unit id
    pub(crate) const MAX_LENGTH_FIELD: usize = MAX_PDU_LENGTH + 1;
}

#[derive(Clone, Copy)]
struct MbapHeader {
    tx_id: TxId,
    adu_length: usize,
    unit_id: UnitId,
}

#[derive(Clone, Copy)]
enum ParseState {
    Begin,
    Header(MbapHeader),
}

pub(crate) struct MbapParser {
    state: ParseState,
}

impl MbapParser {
    pub(crate) fn new() -> Self {
        Self {
            state: ParseState::Begin,
        }
    }

    fn parse_header(cursor: &mut ReadBuffer) -> Result<MbapHeader, RequestError> {
        let tx_id = TxId::new(cursor.read_u16_be()?);
        let protocol_id = cursor.read_u16_be()?;
        let length = cursor.read_u16_be()? as usize;
        let unit_id = UnitId::new(cursor.read_u8()?);

        if protocol_id != 0 {
            return Err(FrameParseError::UnknownProtocolId(protocol_id).into());
        }

        if length > constants::MAX_LENGTH_FIELD {
            return Err(
                FrameParseError::MbapLengthTooBig(length, constants::MAX_LENGTH_FIELD).into(),
            );
        }

        // must be > 0 b/c the 1-byte unit identifier counts towards length
        if length == 0 {
            return Err(FrameParseError::MbapLengthZero.into());
        }

        Ok(MbapHeader {
            tx_id,
            adu_length: length - 1,
            unit_id,
        })
    }

    fn parse_body(header: &MbapHeader, cursor: &mut ReadBuffer) -> Result<Frame, RequestError> {
        let pdu = cursor.read(header.adu_length)?.to_vec();

        let mut adu = Vec::with_capacity(constants::HEADER_LENGTH + pdu.len());
        adu.extend_from_slice(&header.tx_id.to_u16().to_be_bytes());
        adu.extend_from_slice(&[0x00, 0x00]);
        adu.extend_from_slice(&((header.adu_length + 1) as u16).to_be_bytes());
        adu.push(header.unit_id.value);
        adu.extend_from_slice(&pdu);

        Ok(Frame::new(
            FrameHeader::new_tcp_header(header.unit_id, header.tx_id),
            pdu,
            adu,
        ))
    }

    pub(crate) fn parse(
        &mut self,
        cursor: &mut ReadBuffer,
        decode_level: AduDecodeLevel,
    ) -> Result<Option<Frame>, RequestError> {
        match self.state {
            ParseState::Header(header) => {
                if cursor.len() < header.adu_length {
                    return Ok(None);
                }

                let frame = Self::parse_body(&header, cursor)?;
                self.state = ParseState::Begin;

                if decode_level.enabled() {
                    tracing::info!(
                        "MBAP RX - {}",
                        MbapDisplay::new(decode_level, frame.header, frame.payload())
                    );
                }

                Ok(Some(frame))
            }
            ParseState::Begin => {
                if cursor.len() < constants::HEADER_LENGTH {
                    return Ok(None);
                }

                self.state = ParseState::Header(Self::parse_header(cursor)?);
                self.parse(cursor, decode_level)
            }
        }
    }
}

/// write the MBAP header, the PDU, and back-fill the length field
///
/// returns the total length of the ADU
pub(crate) fn format_mbap(
    buffer: &mut [u8],
    header: FrameHeader,
    msg: &dyn Serialize,
    decode_level: AduDecodeLevel,
) -> Result<usize, RequestError> {
    let tx_id = header.tx_id.unwrap_or_default();

    let (start_pdu, end_pdu) = {
        let mut cursor = WriteCursor::new(&mut *buffer);
        cursor.write_u16_be(tx_id.to_u16())?;
        cursor.write_u16_be(0)?;
        cursor.skip(2)?; // write the length later
        cursor.write_u8(header.unit_id.value)?;

        let start_pdu = cursor.position();
        msg.serialize(&mut cursor)?;
        let end_pdu = cursor.position();

        // the length field includes the unit id
        let pdu_length = end_pdu - start_pdu;
        let length_field = u16::try_from(pdu_length + 1)
            .map_err(|_| InternalError::AduTooBig(pdu_length))?;
        cursor.seek_to(4)?;
        cursor.write_u16_be(length_field)?;
        (start_pdu, end_pdu)
    };

    if decode_level.enabled() {
        let payload = buffer
            .get(start_pdu..end_pdu)
            .ok_or(InternalError::BadSeekOperation)?;
        tracing::info!(
            "MBAP TX - {}",
            MbapDisplay::new(decode_level, header, payload)
        );
    }

    Ok(end_pdu)
}

pub(crate) struct MbapDisplay<'a> {
    level: AduDecodeLevel,
    header: FrameHeader,
    payload: &'a [u8],
}

impl<'a> MbapDisplay<'a> {
    pub(crate) fn new(level: AduDecodeLevel, header: FrameHeader, payload: &'a [u8]) -> Self {
        MbapDisplay {
            level,
            header,
            payload,
        }
    }
}

impl std::fmt::Display for MbapDisplay<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "tx_id: {} unit: {} len: {}",
            self.header.tx_id.unwrap_or_default(),
            self.header.unit_id,
            self.payload.len()
        )?;
        if self.level.payload_enabled() {
            crate::common::phys::format_bytes(f, self.payload)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::client::timeout::{ReceiveTimer, Timeouts};
    use crate::common::frame::FramedReader;
    use crate::common::traits::RawPdu;
    use crate::decode::DecodeLevel;
    use crate::mock::mock;
    use crate::transport::FrameType;

    use super::*;

    //                            |   tx id  |  proto id |  length  | unit |  payload   |
    const SIMPLE_FRAME: &[u8] = &[0x00, 0x07, 0x00, 0x00, 0x00, 0x03, 0x2A, 0x03, 0x04];

    fn assert_equals_simple_frame(frame: &Frame) {
        assert_eq!(frame.header.tx_id, Some(TxId::new(0x0007)));
        assert_eq!(frame.header.unit_id, UnitId::new(0x2A));
        assert_eq!(frame.payload(), &[0x03, 0x04]);
    }

    fn read_frames(chunks: &[&[u8]]) -> Result<Frame, RequestError> {
        let (mut io, mut handle) = mock(FrameType::Tcp);
        for chunk in chunks {
            handle.read(chunk);
        }
        let mut reader = FramedReader::new(FrameType::Tcp);
        let mut timer = ReceiveTimer::new(Timeouts::default());
        reader.next_frame(&mut io, &mut timer, DecodeLevel::nothing())
    }

    fn test_segmented_parse(split_at: usize) {
        let (f1, f2) = SIMPLE_FRAME.split_at(split_at);
        let frame = read_frames(&[f1, f2]).unwrap();
        assert_equals_simple_frame(&frame);
    }

    #[test]
    fn correctly_formats_frame() {
        let mut buffer = [0u8; constants::MAX_FRAME_LENGTH];
        let msg = RawPdu {
            bytes: &[0x03, 0x04],
        };
        let header = FrameHeader::new_tcp_header(UnitId::new(42), TxId::new(7));
        let length = format_mbap(&mut buffer, header, &msg, AduDecodeLevel::Nothing).unwrap();

        assert_eq!(&buffer[..length], SIMPLE_FRAME)
    }

    #[test]
    fn can_parse_frame_from_stream() {
        let frame = read_frames(&[SIMPLE_FRAME]).unwrap();
        assert_equals_simple_frame(&frame);
        assert_eq!(frame.into_adu(), SIMPLE_FRAME.to_vec());
    }

    #[test]
    fn can_parse_maximum_size_frame() {
        // maximum PDU length is 253, so max MBAP length value is 254 which is 0xFE
        let header: &[u8] = &[0x00, 0x07, 0x00, 0x00, 0x00, 0xFE, 0x2A];
        let payload: &[u8] = &[0xCC; 253];

        let frame = read_frames(&[header, payload]).unwrap();

        assert_eq!(frame.payload(), payload);
    }

    #[test]
    fn can_parse_frame_if_segmented_in_header() {
        test_segmented_parse(4);
    }

    #[test]
    fn can_parse_frame_if_segmented_in_payload() {
        test_segmented_parse(8);
    }

    #[test]
    fn incomplete_frame_times_out() {
        assert_eq!(read_frames(&[&SIMPLE_FRAME[..8]]).err(), Some(RequestError::Timeout));
    }

    #[test]
    fn errors_on_bad_protocol_id() {
        let frame: &[u8] = &[0x00, 0x07, 0xCA, 0xFE, 0x00, 0x01, 0x2A];
        assert_eq!(
            read_frames(&[frame]).err(),
            Some(RequestError::BadFrame(FrameParseError::UnknownProtocolId(
                0xCAFE
            )))
        );
    }

    #[test]
    fn errors_on_length_of_zero() {
        let frame: &[u8] = &[0x00, 0x07, 0x00, 0x00, 0x00, 0x00, 0x2A];
        assert_eq!(
            read_frames(&[frame]).err(),
            Some(RequestError::BadFrame(FrameParseError::MbapLengthZero))
        );
    }

    #[test]
    fn errors_when_mbap_length_too_big() {
        let frame: &[u8] = &[0x00, 0x07, 0x00, 0x00, 0x00, 0xFF, 0x2A];
        assert_eq!(
            read_frames(&[frame]).err(),
            Some(RequestError::BadFrame(FrameParseError::MbapLengthTooBig(
                0xFF,
                constants::MAX_LENGTH_FIELD,
            )))
        );
    }
}
