use crate::exception::ExceptionCode;

/// Top level error type for every operation performed by a [`ModbusContext`](crate::ModbusContext)
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// The context is not connected, call `connect()` first
    NotConnected,
    /// An address (register, coil or slave) is out of range for the requested operation
    InvalidAddress(InvalidAddress),
    /// A quantity of values is zero, too large for the operation, or otherwise not encodable
    InvalidQuantity(InvalidQuantity),
    /// No reply, or an incomplete reply, was received within the configured timeouts
    Timeout,
    /// The transport reported an I/O error
    TransportFailure(std::io::ErrorKind),
    /// The bytes received could not be assembled into a valid ADU
    BadFrame(FrameParseError),
    /// A complete reply was received but its contents do not match the request
    BadResponse(AduParseError),
    /// The slave answered with an exception reply
    SlaveException(ExceptionCode),
    /// An error occurred in the library itself while encoding a request
    Internal(InternalError),
}

impl RequestError {
    /// Returns true for failures of the link or the framing that an error recovery mode may act upon
    ///
    /// Replies that were received intact (exceptions, mismatched replies) and errors detected before
    /// anything was sent are never recoverable.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            RequestError::Timeout | RequestError::TransportFailure(_) | RequestError::BadFrame(_)
        )
    }
}

impl std::error::Error for RequestError {}

impl std::fmt::Display for RequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            RequestError::NotConnected => f.write_str("no connection exists to the Modbus slave"),
            RequestError::InvalidAddress(err) => write!(f, "invalid address: {err}"),
            RequestError::InvalidQuantity(err) => write!(f, "invalid quantity: {err}"),
            RequestError::Timeout => {
                f.write_str("timeout occurred before receiving a complete reply from the slave")
            }
            RequestError::TransportFailure(kind) => write!(f, "transport failure: {kind}"),
            RequestError::BadFrame(err) => write!(f, "bad frame: {err}"),
            RequestError::BadResponse(err) => write!(f, "bad response: {err}"),
            RequestError::SlaveException(ex) => write!(f, "slave exception: {ex}"),
            RequestError::Internal(err) => write!(f, "internal error: {err}"),
        }
    }
}

impl From<std::io::Error> for RequestError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => RequestError::Timeout,
            kind => RequestError::TransportFailure(kind),
        }
    }
}

impl From<InvalidAddress> for RequestError {
    fn from(err: InvalidAddress) -> Self {
        RequestError::InvalidAddress(err)
    }
}

impl From<InvalidQuantity> for RequestError {
    fn from(err: InvalidQuantity) -> Self {
        RequestError::InvalidQuantity(err)
    }
}

impl From<FrameParseError> for RequestError {
    fn from(err: FrameParseError) -> Self {
        RequestError::BadFrame(err)
    }
}

impl From<AduParseError> for RequestError {
    fn from(err: AduParseError) -> Self {
        RequestError::BadResponse(err)
    }
}

impl From<ExceptionCode> for RequestError {
    fn from(ex: ExceptionCode) -> Self {
        RequestError::SlaveException(ex)
    }
}

impl From<InternalError> for RequestError {
    fn from(err: InternalError) -> Self {
        RequestError::Internal(err)
    }
}

impl From<scursor::WriteError> for RequestError {
    fn from(err: scursor::WriteError) -> Self {
        RequestError::Internal(err.into())
    }
}

impl From<scursor::ReadError> for RequestError {
    fn from(_: scursor::ReadError) -> Self {
        RequestError::BadResponse(AduParseError::InsufficientBytes)
    }
}

impl From<scursor::TrailingBytes> for RequestError {
    fn from(x: scursor::TrailingBytes) -> Self {
        RequestError::BadResponse(AduParseError::TrailingBytes(x.count.get()))
    }
}

/// Addressing errors detected before a request is sent
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum InvalidAddress {
    /// start + quantity would exceed the 65536 addresses of a Modbus table
    AddressOverflow(u16, u16),
    /// Slave id is not usable with the framing of the transport
    SlaveOutOfRange(u8),
    /// Read requests cannot be broadcast
    BroadcastRead,
}

impl std::error::Error for InvalidAddress {}

impl std::fmt::Display for InvalidAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            InvalidAddress::AddressOverflow(start, count) => write!(
                f,
                "start == {start} and count = {count} would overflow the representation of u16"
            ),
            InvalidAddress::SlaveOutOfRange(id) => {
                write!(f, "slave id {id} is not valid for this transport")
            }
            InvalidAddress::BroadcastRead => {
                f.write_str("read requests cannot be sent to the broadcast address")
            }
        }
    }
}

/// Quantity errors detected before a request is sent
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum InvalidQuantity {
    /// Count of zero not allowed
    CountOfZero,
    /// Count is larger than the limit for the operation (count, limit)
    CountTooLarge(u16, u16),
    /// More values were supplied than can be represented in a request
    TooManyValues(usize),
    /// A raw request must hold a slave id, a function code, and fit in a single ADU
    RawRequestLength(usize),
}

impl std::error::Error for InvalidQuantity {}

impl std::fmt::Display for InvalidQuantity {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            InvalidQuantity::CountOfZero => f.write_str("range contains count == 0"),
            InvalidQuantity::CountTooLarge(count, limit) => write!(
                f,
                "the requested count of objects ({count}) exceeds the maximum allowed count of {limit} for this type"
            ),
            InvalidQuantity::TooManyValues(len) => {
                write!(f, "{len} values cannot be represented in a single request")
            }
            InvalidQuantity::RawRequestLength(len) => {
                write!(f, "raw request of {len} bytes is not a valid slave id + PDU")
            }
        }
    }
}

/// Errors that occur while assembling bytes from the transport into an ADU
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FrameParseError {
    /// Received TCP frame with the length field set to zero
    MbapLengthZero,
    /// Received TCP frame with length that exceeds max allowed size (length, max)
    MbapLengthTooBig(usize, usize),
    /// Received TCP frame within non-Modbus protocol id
    UnknownProtocolId(u16),
    /// Received a serial frame whose length exceeds max allowed size (length, max)
    FrameLengthTooBig(usize, usize),
    /// Received a serial frame with a function code for which the length cannot be determined
    UnknownFunctionCode(u8),
    /// Received a serial frame with an invalid CRC (received, expected)
    CrcValidationFailure(u16, u16),
}

impl std::error::Error for FrameParseError {}

impl std::fmt::Display for FrameParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            FrameParseError::MbapLengthZero => {
                f.write_str("Received TCP frame with the length field set to zero")
            }
            FrameParseError::MbapLengthTooBig(size, max) => write!(
                f,
                "Received TCP frame with length ({size}) that exceeds max allowed size ({max})"
            ),
            FrameParseError::UnknownProtocolId(id) => {
                write!(f, "Received TCP frame with non-Modbus protocol id: {id}")
            }
            FrameParseError::FrameLengthTooBig(size, max) => write!(
                f,
                "Received RTU frame with length ({size}) that exceeds max allowed size ({max})"
            ),
            FrameParseError::UnknownFunctionCode(code) => write!(
                f,
                "Received RTU frame with function code {code:#04X} whose length cannot be determined"
            ),
            FrameParseError::CrcValidationFailure(received, expected) => write!(
                f,
                "Received RTU frame with CRC {received:#06X} while {expected:#06X} was expected"
            ),
        }
    }
}

/// Errors that occur while parsing a complete reply PDU
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AduParseError {
    /// Reply is too short to be valid
    InsufficientBytes,
    /// Byte count doesn't match the actual number of bytes present
    InsufficientBytesForByteCount(usize, usize),
    /// Reply contains extra trailing bytes
    TrailingBytes(usize),
    /// Byte count does not match what the request asked for (received, expected)
    ByteCountMismatch(usize, usize),
    /// Byte count of zero in a variable length reply
    ByteCountZero,
    /// Reply function code does not match the request (received, expected)
    FunctionMismatch(u8, u8),
    /// A write reply did not echo the address and value or quantity of the request
    ReplyEchoMismatch,
    /// An unknown coil state was specified in a write single coil reply
    UnknownCoilState(u16),
}

impl std::error::Error for AduParseError {}

impl std::fmt::Display for AduParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            AduParseError::InsufficientBytes => f.write_str("response is too short to be valid"),
            AduParseError::InsufficientBytesForByteCount(count, remaining) => write!(
                f,
                "byte count ({count}) doesn't match the actual number of bytes remaining ({remaining})"
            ),
            AduParseError::TrailingBytes(remaining) => {
                write!(f, "response contains {remaining} extra trailing bytes")
            }
            AduParseError::ByteCountMismatch(received, expected) => write!(
                f,
                "byte count ({received}) doesn't match the requested quantity ({expected} bytes)"
            ),
            AduParseError::ByteCountZero => f.write_str("byte count of zero in reply"),
            AduParseError::FunctionMismatch(received, expected) => write!(
                f,
                "received function code {received:#04X} in reply to {expected:#04X}"
            ),
            AduParseError::ReplyEchoMismatch => {
                f.write_str("reply did not contain the same values as the write request")
            }
            AduParseError::UnknownCoilState(value) => write!(
                f,
                "received coil state with unspecified value: {value:#06X}"
            ),
        }
    }
}

/// Errors that indicate faulty logic in the library itself if they occur
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum InternalError {
    /// Insufficient space for write operation (requested, remaining)
    InsufficientWriteSpace(usize, usize),
    /// The calculated ADU size exceeds what is allowed
    AduTooBig(usize),
    /// Attempted to read more bytes than present (requested, remaining)
    InsufficientBytesForRead(usize, usize),
    /// Cursor seek operation exceeded the bounds of the underlying buffer
    BadSeekOperation,
    /// Byte count would exceed maximum allowed size in the ADU of u8
    BadByteCount(usize),
    /// The decoded reply does not carry the kind of data the request asked for
    UnexpectedResponse,
}

impl std::error::Error for InternalError {}

impl std::fmt::Display for InternalError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            InternalError::InsufficientWriteSpace(written, remaining) => write!(
                f,
                "attempted to write {written} bytes with {remaining} bytes remaining"
            ),
            InternalError::AduTooBig(size) => write!(
                f,
                "ADU length of {size} exceeds the maximum allowed length"
            ),
            InternalError::InsufficientBytesForRead(requested, remaining) => write!(
                f,
                "attempted to read {requested} bytes with only {remaining} remaining"
            ),
            InternalError::BadSeekOperation => {
                f.write_str("Cursor seek operation exceeded the bounds of the underlying buffer")
            }
            InternalError::BadByteCount(size) => write!(
                f,
                "byte count of {size} exceeds maximum size of u8"
            ),
            InternalError::UnexpectedResponse => {
                f.write_str("decoded reply does not match the kind of request")
            }
        }
    }
}

impl From<scursor::WriteError> for InternalError {
    fn from(err: scursor::WriteError) -> Self {
        match err {
            scursor::WriteError::NumericOverflow | scursor::WriteError::BadSeek { .. } => {
                InternalError::BadSeekOperation
            }
            scursor::WriteError::WriteOverflow { remaining, written } => {
                InternalError::InsufficientWriteSpace(written, remaining)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_link_and_framing_failures_are_recoverable() {
        assert!(RequestError::Timeout.is_recoverable());
        assert!(RequestError::TransportFailure(std::io::ErrorKind::BrokenPipe).is_recoverable());
        assert!(RequestError::BadFrame(FrameParseError::MbapLengthZero).is_recoverable());

        assert!(!RequestError::NotConnected.is_recoverable());
        assert!(!RequestError::SlaveException(ExceptionCode::IllegalDataAddress).is_recoverable());
        assert!(!RequestError::BadResponse(AduParseError::ReplyEchoMismatch).is_recoverable());
        assert!(!RequestError::InvalidQuantity(InvalidQuantity::CountOfZero).is_recoverable());
        assert!(
            !RequestError::InvalidAddress(InvalidAddress::AddressOverflow(0xFFFF, 2))
                .is_recoverable()
        );
    }

    #[test]
    fn expired_reads_map_to_timeout() {
        let err: RequestError = std::io::Error::from(std::io::ErrorKind::TimedOut).into();
        assert_eq!(err, RequestError::Timeout);
        let err: RequestError = std::io::Error::from(std::io::ErrorKind::WouldBlock).into();
        assert_eq!(err, RequestError::Timeout);
        let err: RequestError = std::io::Error::from(std::io::ErrorKind::ConnectionReset).into();
        assert_eq!(
            err,
            RequestError::TransportFailure(std::io::ErrorKind::ConnectionReset)
        );
    }

    #[test]
    fn cursor_errors_map_to_parse_and_internal_errors() {
        let mut cursor = scursor::ReadCursor::new(&[0xCA, 0xFE, 0x01]);
        assert_eq!(cursor.read_u16_be().ok(), Some(0xCAFE));
        let err: RequestError = cursor.expect_empty().unwrap_err().into();
        assert_eq!(err, RequestError::BadResponse(AduParseError::TrailingBytes(1)));
        assert_eq!(cursor.read_u8().ok(), Some(0x01));
        let err: RequestError = cursor.read_u8().unwrap_err().into();
        assert_eq!(err, RequestError::BadResponse(AduParseError::InsufficientBytes));

        let mut buffer = [0u8; 1];
        let mut cursor = scursor::WriteCursor::new(&mut buffer);
        let err: RequestError = cursor.write_u16_be(0x0102).unwrap_err().into();
        assert!(matches!(err, RequestError::Internal(_)));
    }
}
