use std::io::{Error, ErrorKind};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::runtime::Runtime;
use tokio::time::Instant;
use tokio_serial::{ClearBuffer, SerialPort, SerialStream};

use crate::common::phys::calculate_inter_frame_delay;
use crate::serial::SerialSettings;
use crate::tcp::transport::create_runtime;
use crate::transport::{FrameType, Transport};

/// Transport over a serial line, using RTU framing
///
/// Consecutive frames are separated by at least the silent interval that the baud rate
/// requires. Like [`TcpTransport`](crate::TcpTransport), the port is driven by a private
/// single-threaded tokio runtime and must not be used from within another async runtime.
pub struct RtuTransport {
    path: String,
    settings: SerialSettings,
    inter_frame_delay: Duration,
    last_activity: Option<Instant>,
    stream: Option<SerialStream>,
    runtime: Option<Runtime>,
}

impl RtuTransport {
    /// Create a transport for the serial port at `path`
    ///
    /// The port is not opened until [`Transport::connect`] is called.
    pub fn new(path: impl Into<String>, settings: SerialSettings) -> Self {
        Self {
            path: path.into(),
            settings,
            inter_frame_delay: calculate_inter_frame_delay(settings.baud_rate),
            last_activity: None,
            stream: None,
            runtime: None,
        }
    }

    /// Path of the serial port
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Settings used when opening the port
    pub fn settings(&self) -> SerialSettings {
        self.settings
    }
}

impl Transport for RtuTransport {
    fn frame_type(&self) -> FrameType {
        FrameType::Rtu
    }

    fn connect(&mut self) -> std::io::Result<()> {
        let runtime = create_runtime(&mut self.runtime)?;
        // registering the port with the reactor requires the runtime context
        let _guard = runtime.enter();
        let stream = match SerialStream::open(&self.settings.builder(&self.path)) {
            Ok(stream) => stream,
            Err(err) => {
                tracing::warn!("unable to open serial port {}: {}", self.path, err);
                return Err(err.into());
            }
        };
        tracing::info!("serial port open: {}", self.path);
        self.stream = Some(stream);
        self.last_activity = None;
        Ok(())
    }

    fn close(&mut self) {
        if self.stream.take().is_some() {
            tracing::info!("serial port closed: {}", self.path);
        }
    }

    fn send(&mut self, data: &[u8]) -> std::io::Result<()> {
        let Self {
            inter_frame_delay,
            last_activity,
            stream,
            runtime,
            ..
        } = self;
        let (Some(runtime), Some(stream)) = (runtime.as_ref(), stream.as_mut()) else {
            return Err(Error::from(ErrorKind::NotConnected));
        };

        runtime.block_on(async {
            // respect the silent interval between frames
            if let Some(last) = *last_activity {
                tokio::time::sleep_until(last + *inter_frame_delay).await;
            }
            let result = stream.write_all(data).await;
            *last_activity = Some(Instant::now());
            result
        })
    }

    fn recv(&mut self, buffer: &mut [u8], window: Duration) -> std::io::Result<usize> {
        let Self {
            last_activity,
            stream,
            runtime,
            ..
        } = self;
        let (Some(runtime), Some(stream)) = (runtime.as_ref(), stream.as_mut()) else {
            return Err(Error::from(ErrorKind::NotConnected));
        };

        let count = runtime.block_on(async {
            match tokio::time::timeout(window, stream.read(buffer)).await {
                Ok(result) => result,
                Err(_) => Err(Error::from(ErrorKind::TimedOut)),
            }
        })?;
        *last_activity = Some(Instant::now());
        Ok(count)
    }

    fn flush(&mut self) -> std::io::Result<usize> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(Error::from(ErrorKind::NotConnected));
        };
        let pending = stream.bytes_to_read()?;
        stream.clear(ClearBuffer::Input)?;
        Ok(pending as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_before_connect_fails_with_not_connected() {
        let mut transport = RtuTransport::new("/dev/null-modbus", SerialSettings::default());
        assert_eq!(transport.frame_type(), FrameType::Rtu);
        assert_eq!(
            transport.send(&[0x01]).unwrap_err().kind(),
            ErrorKind::NotConnected
        );
        assert_eq!(transport.flush().unwrap_err().kind(), ErrorKind::NotConnected);
        transport.close();
    }

    #[test]
    fn silent_interval_follows_the_baud_rate() {
        let settings = SerialSettings {
            baud_rate: 115_200,
            ..SerialSettings::default()
        };
        let transport = RtuTransport::new("/dev/ttyUSB0", settings);
        assert_eq!(transport.inter_frame_delay, Duration::from_micros(1750));
        assert_eq!(transport.path(), "/dev/ttyUSB0");
    }
}
