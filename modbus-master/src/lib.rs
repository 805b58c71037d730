//! A synchronous implementation of the [Modbus](http://modbus.org/) master (client) role
//! for TCP and RTU links.
//!
//! # Features
//!
//! * Blocking request/response API, one request in flight per context
//! * Validation of addresses and quantities before anything is sent
//! * Configurable response and inter-byte timeouts
//! * Configurable recovery from link and framing errors
//! * Panic-free parsing
//! * Protocol decoding at three layers via [`tracing`](https://docs.rs/tracing)
//!
//! # Supported modes
//!
//! * TCP (MBAP framing)
//! * RTU over a serial line, behind the default `serial` feature
//! * Any byte pipe that implements [`Transport`]
//!
//! # Supported Functions
//!
//! * Read Coils
//! * Read Discrete Inputs
//! * Read Holding Registers
//! * Read Input Registers
//! * Write Single Coil
//! * Write Single Register
//! * Write Multiple Coils
//! * Write Multiple Registers
//! * Report Slave Id
//! * Write And Read Registers
//! * Raw requests with the framing applied by the library
//!
//! # Example
//!
//! Poll some holding registers every 3 seconds, reconnecting when the link fails
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use modbus_master::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut ctx = ModbusContext::tcp("127.0.0.1", 502);
//!     ctx.set_slave(1)?;
//!     ctx.set_response_timeout(Duration::from_secs(1));
//!     ctx.set_error_recovery(ErrorRecoveryMode::Link | ErrorRecoveryMode::Protocol);
//!     ctx.connect()?;
//!
//!     loop {
//!         match ctx.read_holding_registers(0, 5) {
//!             Ok(values) => {
//!                 for (i, value) in values.iter().enumerate() {
//!                     println!("index: {i} value: {value}");
//!                 }
//!             }
//!             Err(err) => println!("error: {err}"),
//!         }
//!         std::thread::sleep(Duration::from_secs(3));
//!     }
//! }
//! ```

/// Protocol constants and limits
pub mod constants;
/// Conversions between values and packed bit or register tables
pub mod data;
/// Error types associated with making requests
pub mod error;

mod client;
mod common;
mod decode;
mod exception;
mod serial;
mod tcp;
mod transport;
mod types;

#[cfg(test)]
mod mock;

pub use crate::client::context::ModbusContext;
pub use crate::client::recovery::ErrorRecoveryMode;
pub use crate::client::timeout::{InvalidTimeout, Timeouts};
pub use crate::client::validation::{validate, OperationKind};
pub use crate::decode::{AduDecodeLevel, DecodeLevel, PduDecodeLevel, PhysDecodeLevel};
pub use crate::error::{
    AduParseError, FrameParseError, InternalError, InvalidAddress, InvalidQuantity, RequestError,
};
pub use crate::exception::ExceptionCode;
#[cfg(feature = "serial")]
pub use crate::serial::{DataBits, FlowControl, Parity, RtuTransport, SerialSettings, StopBits};
pub use crate::tcp::transport::TcpTransport;
pub use crate::tcp::DEFAULT_PORT;
pub use crate::transport::{FrameType, Transport};
pub use crate::types::{AddressRange, Indexed, UnitId};
