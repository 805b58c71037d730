use crate::client::timeout::ReceiveTimer;
use crate::common::buffer::ReadBuffer;
use crate::common::traits::Serialize;
use crate::constants::frame::MAX_TCP_ADU_LENGTH;
use crate::decode::{AduDecodeLevel, DecodeLevel};
use crate::error::{InternalError, RequestError};
use crate::serial::frame::RtuParser;
use crate::tcp::frame::MbapParser;
use crate::transport::{FrameType, Transport};
use crate::types::UnitId;

#[derive(PartialEq, Eq, Copy, Clone, Debug, Default)]
pub(crate) struct TxId {
    value: u16,
}

impl TxId {
    pub(crate) fn new(value: u16) -> Self {
        TxId { value }
    }

    pub(crate) fn to_u16(self) -> u16 {
        self.value
    }

    pub(crate) fn next(&mut self) -> TxId {
        let ret = self.value;
        self.value = self.value.wrapping_add(1);
        TxId::new(ret)
    }
}

impl std::fmt::Display for TxId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#06X}", self.value)
    }
}

/// Addressing information carried around a PDU
///
/// The transaction id only exists with MBAP framing.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct FrameHeader {
    pub(crate) unit_id: UnitId,
    pub(crate) tx_id: Option<TxId>,
}

impl FrameHeader {
    pub(crate) fn new_tcp_header(unit_id: UnitId, tx_id: TxId) -> Self {
        FrameHeader {
            unit_id,
            tx_id: Some(tx_id),
        }
    }

    pub(crate) fn new_rtu_header(unit_id: UnitId) -> Self {
        FrameHeader {
            unit_id,
            tx_id: None,
        }
    }
}

/// A complete received ADU
#[derive(Clone, Debug)]
pub(crate) struct Frame {
    pub(crate) header: FrameHeader,
    pdu: Vec<u8>,
    adu: Vec<u8>,
}

impl Frame {
    pub(crate) fn new(header: FrameHeader, pdu: Vec<u8>, adu: Vec<u8>) -> Frame {
        Frame { header, pdu, adu }
    }

    pub(crate) fn payload(&self) -> &[u8] {
        &self.pdu
    }

    pub(crate) fn into_adu(self) -> Vec<u8> {
        self.adu
    }
}

/// Wraps PDUs with the header/trailer of a framing
pub(crate) struct FrameWriter {
    frame_type: FrameType,
    buffer: [u8; MAX_TCP_ADU_LENGTH],
}

impl FrameWriter {
    pub(crate) fn new(frame_type: FrameType) -> Self {
        Self {
            frame_type,
            buffer: [0; MAX_TCP_ADU_LENGTH],
        }
    }

    pub(crate) fn format(
        &mut self,
        header: FrameHeader,
        msg: &dyn Serialize,
        level: AduDecodeLevel,
    ) -> Result<&[u8], RequestError> {
        let buffer = self.buffer.as_mut();
        let length = match self.frame_type {
            FrameType::Tcp => crate::tcp::frame::format_mbap(buffer, header, msg, level)?,
            FrameType::Rtu => crate::serial::frame::format_rtu(buffer, header, msg, level)?,
        };
        self.buffer
            .get(..length)
            .ok_or(RequestError::Internal(InternalError::BadSeekOperation))
    }
}

pub(crate) enum FrameParser {
    Mbap(MbapParser),
    Rtu(RtuParser),
}

impl FrameParser {
    pub(crate) fn new(frame_type: FrameType) -> Self {
        match frame_type {
            FrameType::Tcp => FrameParser::Mbap(MbapParser::new()),
            FrameType::Rtu => FrameParser::Rtu(RtuParser::new_response_parser()),
        }
    }

    /// Like `new`, but RTU replies to unknown function codes get a default length
    pub(crate) fn confirmation(frame_type: FrameType) -> Self {
        match frame_type {
            FrameType::Tcp => FrameParser::Mbap(MbapParser::new()),
            FrameType::Rtu => FrameParser::Rtu(RtuParser::new_confirmation_parser()),
        }
    }

    fn max_frame_size(&self) -> usize {
        match self {
            FrameParser::Mbap(_) => crate::tcp::frame::constants::MAX_FRAME_LENGTH,
            FrameParser::Rtu(_) => crate::serial::frame::constants::MAX_FRAME_LENGTH,
        }
    }

    /// Ok(None) means more bytes are required
    fn parse(
        &mut self,
        cursor: &mut ReadBuffer,
        level: AduDecodeLevel,
    ) -> Result<Option<Frame>, RequestError> {
        match self {
            FrameParser::Mbap(x) => x.parse(cursor, level),
            FrameParser::Rtu(x) => x.parse(cursor, level),
        }
    }
}

pub(crate) struct FramedReader {
    parser: FrameParser,
    buffer: ReadBuffer,
}

impl FramedReader {
    pub(crate) fn new(frame_type: FrameType) -> Self {
        Self::with_parser(FrameParser::new(frame_type))
    }

    /// Reader for the reply to a raw request
    pub(crate) fn confirmation(frame_type: FrameType) -> Self {
        Self::with_parser(FrameParser::confirmation(frame_type))
    }

    fn with_parser(parser: FrameParser) -> Self {
        let size = parser.max_frame_size();
        Self {
            parser,
            buffer: ReadBuffer::new(size),
        }
    }

    /// Assemble the next frame, reading within the windows handed out by the timer
    pub(crate) fn next_frame<T>(
        &mut self,
        io: &mut T,
        timer: &mut ReceiveTimer,
        level: DecodeLevel,
    ) -> Result<Frame, RequestError>
    where
        T: Transport + ?Sized,
    {
        loop {
            if let Some(frame) = self.parser.parse(&mut self.buffer, level.adu)? {
                return Ok(frame);
            }

            let window = timer.window();
            if window.is_zero() {
                return Err(RequestError::Timeout);
            }
            self.buffer.read_some(io, window, level.physical)?;
            timer.on_bytes_received();
        }
    }
}
