pub(crate) mod frame;

#[cfg(feature = "serial")]
mod transport;

#[cfg(feature = "serial")]
pub use transport::RtuTransport;

#[cfg(feature = "serial")]
pub use tokio_serial::{DataBits, FlowControl, Parity, StopBits};

/// Serial port settings
#[cfg(feature = "serial")]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SerialSettings {
    /// Baud rate of the port
    pub baud_rate: u32,
    /// Number of bits used to represent a character sent on the line
    pub data_bits: DataBits,
    /// Type of signalling to use for controlling data transfer
    pub flow_control: FlowControl,
    /// Number of bits to use to signal the end of a character
    pub stop_bits: StopBits,
    /// Type of parity to use for error checking
    pub parity: Parity,
}

#[cfg(feature = "serial")]
impl SerialSettings {
    pub(crate) fn builder(&self, path: &str) -> tokio_serial::SerialPortBuilder {
        tokio_serial::new(path, self.baud_rate)
            .data_bits(self.data_bits)
            .flow_control(self.flow_control)
            .stop_bits(self.stop_bits)
            .parity(self.parity)
    }
}

#[cfg(feature = "serial")]
impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            baud_rate: 9600,
            data_bits: DataBits::Eight,
            flow_control: FlowControl::None,
            stop_bits: StopBits::One,
            parity: Parity::None,
        }
    }
}
