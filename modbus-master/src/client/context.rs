use std::time::Duration;

use crate::client::recovery::{Decision, ErrorRecoveryMode, RecoveryController, RecoveryStep};
use crate::client::request::Request;
use crate::client::response::{parse_response, Response};
use crate::client::timeout::{ReceiveTimer, Timeouts};
use crate::client::validation::check_read_destination;
use crate::common::frame::{Frame, FrameHeader, FrameWriter, FramedReader, TxId};
use crate::common::phys;
use crate::common::traits::{Loggable, LoggableDisplay, RawPdu, Serialize};
use crate::constants::frame::MAX_PDU_LENGTH;
use crate::decode::DecodeLevel;
use crate::error::{InvalidQuantity, RequestError};
use crate::tcp::transport::TcpTransport;
use crate::transport::{FrameType, Transport};
use crate::types::UnitId;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ConnectionState {
    Disconnected,
    Connected,
}

/// A Modbus master bound to a single transport
///
/// Every operation blocks the calling thread until the reply is decoded, the timeouts expire, or
/// the configured [`ErrorRecoveryMode`] gives up. Only one request is ever in flight, which the
/// `&mut self` receivers enforce.
///
/// The transport is closed when the context is dropped.
///
/// ```no_run
/// use modbus_master::{ModbusContext, RequestError};
///
/// fn main() -> Result<(), RequestError> {
///     let mut ctx = ModbusContext::tcp("127.0.0.1", 502);
///     ctx.set_slave(1)?;
///     ctx.connect()?;
///     let registers = ctx.read_holding_registers(0, 10)?;
///     println!("{registers:?}");
///     Ok(())
/// }
/// ```
pub struct ModbusContext<T: Transport> {
    transport: T,
    slave: UnitId,
    timeouts: Timeouts,
    recovery: ErrorRecoveryMode,
    decode: DecodeLevel,
    state: ConnectionState,
    tx_id: TxId,
    writer: FrameWriter,
    // header of the last raw request, used to match its confirmation
    raw_header: Option<FrameHeader>,
}

impl ModbusContext<TcpTransport> {
    /// Create a context that talks to a Modbus TCP server
    ///
    /// Nothing is opened until [`ModbusContext::connect`] is called.
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self::new(TcpTransport::new(host, port))
    }
}

#[cfg(feature = "serial")]
impl ModbusContext<crate::serial::RtuTransport> {
    /// Create a context that talks to Modbus RTU slaves on a serial line
    ///
    /// Nothing is opened until [`ModbusContext::connect`] is called.
    pub fn rtu(path: impl Into<String>, settings: crate::serial::SerialSettings) -> Self {
        Self::new(crate::serial::RtuTransport::new(path, settings))
    }
}

impl<T: Transport> ModbusContext<T> {
    /// Wrap a transport
    ///
    /// The slave id defaults to `0xFF` for TCP framing and `1` for RTU framing.
    pub fn new(transport: T) -> Self {
        let frame_type = transport.frame_type();
        let slave = match frame_type {
            FrameType::Tcp => UnitId::default(),
            FrameType::Rtu => UnitId::new(1),
        };
        Self {
            transport,
            slave,
            timeouts: Timeouts::default(),
            recovery: ErrorRecoveryMode::None,
            decode: DecodeLevel::nothing(),
            state: ConnectionState::Disconnected,
            tx_id: TxId::default(),
            writer: FrameWriter::new(frame_type),
            raw_header: None,
        }
    }

    /// Framing of the underlying transport
    pub fn frame_type(&self) -> FrameType {
        self.transport.frame_type()
    }

    /// Open the transport, a no-op if it is already open
    pub fn connect(&mut self) -> Result<(), RequestError> {
        if self.is_connected() {
            return Ok(());
        }
        self.transport.connect()?;
        self.state = ConnectionState::Connected;
        tracing::info!("connected ({})", self.frame_type());
        Ok(())
    }

    /// Close the transport
    ///
    /// Calling this more than once has no further effect.
    pub fn close(&mut self) {
        if self.is_connected() {
            self.transport.close();
            self.state = ConnectionState::Disconnected;
            self.raw_header = None;
            tracing::info!("closed ({})", self.frame_type());
        }
    }

    /// True between a successful [`connect`](Self::connect) and the next [`close`](Self::close)
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Discard input received but not read, returning the number of bytes dropped
    pub fn flush(&mut self) -> Result<usize, RequestError> {
        self.check_connected()?;
        let count = self.transport.flush()?;
        if count > 0 {
            tracing::info!("flushed {} bytes", count);
        }
        Ok(count)
    }

    /// Set the slave addressed by subsequent requests
    ///
    /// Accepts 0 (broadcast), 1 to 247, and 0xFF on TCP framing.
    pub fn set_slave(&mut self, slave: u8) -> Result<(), RequestError> {
        self.slave = UnitId::new(slave).validate_for(self.frame_type())?;
        Ok(())
    }

    /// Slave addressed by requests
    pub fn slave(&self) -> u8 {
        self.slave.value
    }

    /// Maximum wait for the first byte of a reply
    pub fn set_response_timeout(&mut self, timeout: Duration) {
        self.timeouts.response = timeout;
    }

    /// Maximum wait for the first byte of a reply
    pub fn response_timeout(&self) -> Duration {
        self.timeouts.response
    }

    /// Maximum gap between two bytes of a reply
    pub fn set_byte_timeout(&mut self, timeout: Duration) {
        self.timeouts.byte = timeout;
    }

    /// Maximum gap between two bytes of a reply
    pub fn byte_timeout(&self) -> Duration {
        self.timeouts.byte
    }

    /// Set both timeouts at once
    pub fn set_timeouts(&mut self, timeouts: Timeouts) {
        self.timeouts = timeouts;
    }

    /// Currently configured timeouts
    pub fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    /// Choose how link and framing failures are handled
    pub fn set_error_recovery(&mut self, mode: ErrorRecoveryMode) {
        self.recovery = mode;
    }

    /// How link and framing failures are handled
    pub fn error_recovery(&self) -> ErrorRecoveryMode {
        self.recovery
    }

    /// Turn protocol logging fully on or off
    pub fn set_debug(&mut self, enabled: bool) {
        let level = if enabled {
            DecodeLevel::verbose()
        } else {
            DecodeLevel::nothing()
        };
        self.set_decode_level(level);
    }

    /// Choose how much of each layer is logged
    pub fn set_decode_level(&mut self, level: DecodeLevel) {
        if self.decode != level {
            tracing::info!("decode level changed: {:?}", level);
            self.decode = level;
        }
    }

    /// Current protocol logging levels
    pub fn decode_level(&self) -> DecodeLevel {
        self.decode
    }

    /// Read coils (0x01)
    pub fn read_coils(&mut self, start: u16, count: u16) -> Result<Vec<bool>, RequestError> {
        self.check_read()?;
        let request = Request::read_coils(start, count)?;
        self.execute(&request)?.into_bits()
    }

    /// Read discrete inputs (0x02)
    pub fn read_discrete_inputs(
        &mut self,
        start: u16,
        count: u16,
    ) -> Result<Vec<bool>, RequestError> {
        self.check_read()?;
        let request = Request::read_discrete_inputs(start, count)?;
        self.execute(&request)?.into_bits()
    }

    /// Read holding registers (0x03)
    pub fn read_holding_registers(
        &mut self,
        start: u16,
        count: u16,
    ) -> Result<Vec<u16>, RequestError> {
        self.check_read()?;
        let request = Request::read_holding_registers(start, count)?;
        self.execute(&request)?.into_registers()
    }

    /// Read input registers (0x04)
    pub fn read_input_registers(
        &mut self,
        start: u16,
        count: u16,
    ) -> Result<Vec<u16>, RequestError> {
        self.check_read()?;
        let request = Request::read_input_registers(start, count)?;
        self.execute(&request)?.into_registers()
    }

    /// Write a single coil (0x05)
    pub fn write_single_coil(&mut self, address: u16, value: bool) -> Result<(), RequestError> {
        self.check_connected()?;
        self.execute(&Request::write_single_coil(address, value))?
            .into_written()
    }

    /// Write a single register (0x06)
    pub fn write_single_register(&mut self, address: u16, value: u16) -> Result<(), RequestError> {
        self.check_connected()?;
        self.execute(&Request::write_single_register(address, value))?
            .into_written()
    }

    /// Write consecutive coils (0x0F)
    pub fn write_multiple_coils(
        &mut self,
        start: u16,
        values: &[bool],
    ) -> Result<(), RequestError> {
        self.check_connected()?;
        let request = Request::write_multiple_coils(start, values)?;
        self.execute(&request)?.into_written()
    }

    /// Write consecutive registers (0x10)
    pub fn write_multiple_registers(
        &mut self,
        start: u16,
        values: &[u16],
    ) -> Result<(), RequestError> {
        self.check_connected()?;
        let request = Request::write_multiple_registers(start, values)?;
        self.execute(&request)?.into_written()
    }

    /// Write registers then read registers in a single transaction (0x17)
    ///
    /// The slave performs the write before the read.
    pub fn write_and_read_registers(
        &mut self,
        write_start: u16,
        values: &[u16],
        read_start: u16,
        read_count: u16,
    ) -> Result<Vec<u16>, RequestError> {
        self.check_read()?;
        let request =
            Request::write_and_read_registers(write_start, values, read_start, read_count)?;
        self.execute(&request)?.into_registers()
    }

    /// Report slave id (0x11)
    ///
    /// Returns the device specific data of the reply, starting after the byte count.
    pub fn report_slave_id(&mut self) -> Result<Vec<u8>, RequestError> {
        self.check_read()?;
        self.execute(&Request::ReportSlaveId)?.into_slave_id()
    }

    /// Send a request that is not interpreted by the context
    ///
    /// `raw` is the slave id followed by the PDU. The framing of the transport is added and the
    /// length of the whole ADU that was sent is returned. Error recovery is not applied. The reply
    /// is obtained with [`receive_confirmation`](Self::receive_confirmation).
    pub fn send_raw_request(&mut self, raw: &[u8]) -> Result<usize, RequestError> {
        self.check_connected()?;
        let (unit_id, pdu) = match raw.split_first() {
            Some((unit_id, pdu)) if !pdu.is_empty() && pdu.len() <= MAX_PDU_LENGTH => {
                (UnitId::new(*unit_id), pdu)
            }
            _ => return Err(InvalidQuantity::RawRequestLength(raw.len()).into()),
        };

        let header = self.next_header(unit_id);
        let length = self.send_frame(header, &RawPdu { bytes: pdu })?;
        self.raw_header = Some(header);
        Ok(length)
    }

    /// Receive the reply to the last raw request as a complete ADU, framing included
    pub fn receive_confirmation(&mut self) -> Result<Vec<u8>, RequestError> {
        self.check_connected()?;
        let expected = self.raw_header.take();
        let reader = FramedReader::confirmation(self.frame_type());
        let frame = self.receive_frame(reader, expected)?;
        Ok(frame.into_adu())
    }

    fn check_connected(&self) -> Result<(), RequestError> {
        if !self.is_connected() {
            return Err(RequestError::NotConnected);
        }
        Ok(())
    }

    fn check_read(&self) -> Result<(), RequestError> {
        self.check_connected()?;
        check_read_destination(self.slave)
    }

    fn execute(&mut self, request: &Request) -> Result<Response, RequestError> {
        let mut recovery = RecoveryController::new(self.recovery);
        loop {
            recovery.on_send();
            let err = match self.exchange(request) {
                Ok(response) => {
                    recovery.on_success();
                    return Ok(response);
                }
                Err(err) => err,
            };

            match recovery.on_failure(err) {
                Decision::Surface(err) => {
                    tracing::warn!("request error: {}", err);
                    return Err(err);
                }
                Decision::Recover(step) => {
                    if let Err(err) = self.recover(step) {
                        tracing::warn!("{} failed: {}", step, err);
                        return Err(recovery.abort());
                    }
                }
            }
        }
    }

    fn recover(&mut self, step: RecoveryStep) -> Result<(), RequestError> {
        match step {
            RecoveryStep::Reconnect => {
                self.close();
                self.connect()
            }
            RecoveryStep::Flush => {
                self.flush()?;
                Ok(())
            }
        }
    }

    fn exchange(&mut self, request: &Request) -> Result<Response, RequestError> {
        let header = self.next_header(self.slave);
        self.send_frame(header, request)?;

        // slaves never answer a broadcast on a serial line
        if self.frame_type() == FrameType::Rtu && header.unit_id.is_broadcast() {
            return Ok(Response::Written);
        }

        let reader = FramedReader::new(self.frame_type());
        let frame = self.receive_frame(reader, Some(header))?;
        parse_response(request, frame.payload(), self.decode.pdu)
    }

    fn next_header(&mut self, unit_id: UnitId) -> FrameHeader {
        match self.frame_type() {
            FrameType::Tcp => FrameHeader::new_tcp_header(unit_id, self.tx_id.next()),
            FrameType::Rtu => FrameHeader::new_rtu_header(unit_id),
        }
    }

    fn send_frame<S>(&mut self, header: FrameHeader, msg: &S) -> Result<usize, RequestError>
    where
        S: Serialize + Loggable,
    {
        if self.decode.pdu.enabled() {
            tracing::info!("PDU TX - {}", LoggableDisplay::new(msg, self.decode.pdu));
        }
        let bytes = self.writer.format(header, msg, self.decode.adu)?;
        phys::write(&mut self.transport, bytes, self.decode.physical)?;
        Ok(bytes.len())
    }

    /// receive frames until one answers `expected`, or any frame if there is nothing to match
    fn receive_frame(
        &mut self,
        mut reader: FramedReader,
        expected: Option<FrameHeader>,
    ) -> Result<Frame, RequestError> {
        let mut timer = ReceiveTimer::new(self.timeouts);
        loop {
            let frame = reader.next_frame(&mut self.transport, &mut timer, self.decode)?;

            let Some(expected) = expected else {
                return Ok(frame);
            };

            match self.frame_type() {
                FrameType::Tcp if frame.header.tx_id != expected.tx_id => {
                    tracing::warn!(
                        "ignoring reply with tx id {:?} while expecting {:?}",
                        frame.header.tx_id,
                        expected.tx_id
                    );
                }
                FrameType::Rtu if frame.header.unit_id != expected.unit_id => {
                    tracing::warn!(
                        "ignoring reply from unit {} while expecting {}",
                        frame.header.unit_id,
                        expected.unit_id
                    );
                }
                _ => return Ok(frame),
            }

            timer.restart();
        }
    }
}

impl<T: Transport> Drop for ModbusContext<T> {
    fn drop(&mut self) {
        self.close();
    }
}
