use crate::constants::exceptions;

/// Exception codes a slave may return instead of a normal reply
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Ord, Eq)]
pub enum ExceptionCode {
    /// The function code received in the query is not an allowable action for the slave
    IllegalFunction,
    /// The data address received in the query is not an allowable address for the slave
    IllegalDataAddress,
    /// A value contained in the request is not an allowable value for the slave
    IllegalDataValue,
    /// An unrecoverable error occurred while the slave was attempting to perform the requested
    /// action
    SlaveDeviceFailure,
    /// Specialized use in conjunction with programming commands
    ///
    /// The slave has accepted the request and is processing it
    Acknowledge,
    /// Specialized use in conjunction with programming commands
    ///
    /// The slave is engaged in processing a long–duration program command, try again later
    SlaveDeviceBusy,
    /// The slave cannot perform the program function received in the query
    NegativeAcknowledge,
    /// Specialized use in conjunction with function codes 20 and 21 and reference type 6, to
    /// indicate that the extended file area failed to pass a consistency check.
    ///
    /// The slave attempted to read a record file, but detected a parity error in the memory
    MemoryParityError,
    /// Specialized use in conjunction with gateways.
    ///
    /// Indicates that the gateway was unable to allocate an internal communication path from
    /// the input port to the output port for processing the request. Usually means that the
    /// gateway is mis-configured or overloaded
    GatewayPathUnavailable,
    /// Specialized use in conjunction with gateways.
    ///
    /// Indicates that no response was obtained from the target device. Usually means that the
    /// device is not present on the network.
    GatewayTargetFailedToRespond,
    /// The exception code received is not defined in the standard
    Unknown(u8),
}

impl From<u8> for ExceptionCode {
    fn from(value: u8) -> Self {
        match value {
            exceptions::ILLEGAL_FUNCTION => ExceptionCode::IllegalFunction,
            exceptions::ILLEGAL_DATA_ADDRESS => ExceptionCode::IllegalDataAddress,
            exceptions::ILLEGAL_DATA_VALUE => ExceptionCode::IllegalDataValue,
            exceptions::SLAVE_DEVICE_FAILURE => ExceptionCode::SlaveDeviceFailure,
            exceptions::ACKNOWLEDGE => ExceptionCode::Acknowledge,
            exceptions::SLAVE_DEVICE_BUSY => ExceptionCode::SlaveDeviceBusy,
            exceptions::NEGATIVE_ACKNOWLEDGE => ExceptionCode::NegativeAcknowledge,
            exceptions::MEMORY_PARITY_ERROR => ExceptionCode::MemoryParityError,
            exceptions::GATEWAY_PATH_UNAVAILABLE => ExceptionCode::GatewayPathUnavailable,
            exceptions::GATEWAY_TARGET_FAILED_TO_RESPOND => {
                ExceptionCode::GatewayTargetFailedToRespond
            }
            _ => ExceptionCode::Unknown(value),
        }
    }
}

impl From<ExceptionCode> for u8 {
    fn from(ex: ExceptionCode) -> Self {
        match ex {
            ExceptionCode::IllegalFunction => exceptions::ILLEGAL_FUNCTION,
            ExceptionCode::IllegalDataAddress => exceptions::ILLEGAL_DATA_ADDRESS,
            ExceptionCode::IllegalDataValue => exceptions::ILLEGAL_DATA_VALUE,
            ExceptionCode::SlaveDeviceFailure => exceptions::SLAVE_DEVICE_FAILURE,
            ExceptionCode::Acknowledge => exceptions::ACKNOWLEDGE,
            ExceptionCode::SlaveDeviceBusy => exceptions::SLAVE_DEVICE_BUSY,
            ExceptionCode::NegativeAcknowledge => exceptions::NEGATIVE_ACKNOWLEDGE,
            ExceptionCode::MemoryParityError => exceptions::MEMORY_PARITY_ERROR,
            ExceptionCode::GatewayPathUnavailable => exceptions::GATEWAY_PATH_UNAVAILABLE,
            ExceptionCode::GatewayTargetFailedToRespond => {
                exceptions::GATEWAY_TARGET_FAILED_TO_RESPOND
            }
            ExceptionCode::Unknown(value) => value,
        }
    }
}

impl std::error::Error for ExceptionCode {}

impl std::fmt::Display for ExceptionCode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        let text = match self {
            ExceptionCode::IllegalFunction => {
                "function code received in the query is not an allowable action for the slave"
            }
            ExceptionCode::IllegalDataAddress => {
                "data address received in the query is not an allowable address for the slave"
            }
            ExceptionCode::IllegalDataValue => {
                "value contained in the request is not an allowable value for the slave"
            }
            ExceptionCode::SlaveDeviceFailure => {
                "unrecoverable error occurred while the slave was attempting to perform the requested action"
            }
            ExceptionCode::Acknowledge => "slave has accepted the request and is processing it",
            ExceptionCode::SlaveDeviceBusy => {
                "slave is engaged in processing a long-duration program command, try again later"
            }
            ExceptionCode::NegativeAcknowledge => {
                "slave cannot perform the program function received in the query"
            }
            ExceptionCode::MemoryParityError => {
                "slave attempted to read a record file, but detected a parity error in the memory"
            }
            ExceptionCode::GatewayPathUnavailable => {
                "gateway was unable to allocate an internal communication path from the input port to the output port for processing the request"
            }
            ExceptionCode::GatewayTargetFailedToRespond => {
                "gateway did not receive a response from the target device"
            }
            ExceptionCode::Unknown(code) => {
                return write!(f, "received unknown exception code: {code}")
            }
        };
        f.write_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_standard_codes_both_ways() {
        for raw in [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x0A, 0x0B] {
            let code = ExceptionCode::from(raw);
            assert!(!matches!(code, ExceptionCode::Unknown(_)));
            assert_eq!(u8::from(code), raw);
        }
    }

    #[test]
    fn preserves_unknown_codes() {
        assert_eq!(ExceptionCode::from(0x09), ExceptionCode::Unknown(0x09));
        assert_eq!(u8::from(ExceptionCode::Unknown(0x42)), 0x42);
    }
}
