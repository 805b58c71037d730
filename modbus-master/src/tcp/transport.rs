use std::io::{Error, ErrorKind};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::runtime::Runtime;

use crate::transport::{FrameType, Transport};

// input that trickles in later than this is left for the next read
const FLUSH_WINDOW: Duration = Duration::from_millis(5);

/// Transport over a TCP socket, using MBAP framing
///
/// The socket is driven by a private single-threaded tokio runtime that is created on the first
/// connect. The transport blocks the calling thread and must not be used from within another
/// async runtime.
pub struct TcpTransport {
    host: String,
    port: u16,
    connect_timeout: Duration,
    stream: Option<TcpStream>,
    runtime: Option<Runtime>,
}

impl TcpTransport {
    /// Default time allowed to establish a connection
    pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

    /// Create a transport for a host name or IP address and a port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            connect_timeout: Self::DEFAULT_CONNECT_TIMEOUT,
            stream: None,
            runtime: None,
        }
    }

    /// Change the time allowed to establish a connection
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Remote host
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Remote port
    pub fn port(&self) -> u16 {
        self.port
    }

    fn parts(&mut self) -> std::io::Result<(&Runtime, &mut TcpStream)> {
        match (self.runtime.as_ref(), self.stream.as_mut()) {
            (Some(runtime), Some(stream)) => Ok((runtime, stream)),
            _ => Err(Error::from(ErrorKind::NotConnected)),
        }
    }
}

pub(crate) fn create_runtime(slot: &mut Option<Runtime>) -> std::io::Result<&Runtime> {
    if slot.is_none() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        *slot = Some(runtime);
    }
    slot.as_ref().ok_or_else(|| Error::from(ErrorKind::Other))
}

impl Transport for TcpTransport {
    fn frame_type(&self) -> FrameType {
        FrameType::Tcp
    }

    fn connect(&mut self) -> std::io::Result<()> {
        let runtime = create_runtime(&mut self.runtime)?;
        let addr = (self.host.as_str(), self.port);
        let timeout = self.connect_timeout;

        let stream = runtime.block_on(async {
            match tokio::time::timeout(timeout, TcpStream::connect(addr)).await {
                Ok(result) => result,
                Err(_) => Err(Error::from(ErrorKind::TimedOut)),
            }
        });

        let stream = match stream {
            Ok(stream) => stream,
            Err(err) => {
                tracing::warn!("error connecting to {}:{}: {}", self.host, self.port, err);
                return Err(err);
            }
        };

        if let Err(err) = stream.set_nodelay(true) {
            tracing::warn!("unable to enable TCP_NODELAY: {}", err);
        }

        tracing::info!("connected to: {}:{}", self.host, self.port);
        self.stream = Some(stream);
        Ok(())
    }

    fn close(&mut self) {
        if self.stream.take().is_some() {
            tracing::info!("disconnected from: {}:{}", self.host, self.port);
        }
    }

    fn send(&mut self, data: &[u8]) -> std::io::Result<()> {
        let (runtime, stream) = self.parts()?;
        runtime.block_on(stream.write_all(data))
    }

    fn recv(&mut self, buffer: &mut [u8], window: Duration) -> std::io::Result<usize> {
        let (runtime, stream) = self.parts()?;
        runtime.block_on(async {
            match tokio::time::timeout(window, stream.read(buffer)).await {
                Ok(result) => result,
                Err(_) => Err(Error::from(ErrorKind::TimedOut)),
            }
        })
    }

    fn flush(&mut self) -> std::io::Result<usize> {
        let (runtime, stream) = self.parts()?;
        runtime.block_on(async {
            let mut buffer = [0u8; crate::constants::frame::MAX_TCP_ADU_LENGTH];
            let mut count = 0;
            loop {
                match tokio::time::timeout(FLUSH_WINDOW, stream.read(&mut buffer)).await {
                    // nothing more arrived, or the peer closed the socket
                    Err(_) | Ok(Ok(0)) => return Ok(count),
                    Ok(Ok(n)) => count += n,
                    Ok(Err(err)) => return Err(err),
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_before_connect_fails_with_not_connected() {
        let mut transport = TcpTransport::new("127.0.0.1", 502);
        assert_eq!(
            transport.send(&[0x01]).unwrap_err().kind(),
            ErrorKind::NotConnected
        );
        let mut buffer = [0u8; 4];
        assert_eq!(
            transport
                .recv(&mut buffer, Duration::from_millis(1))
                .unwrap_err()
                .kind(),
            ErrorKind::NotConnected
        );
        assert_eq!(transport.flush().unwrap_err().kind(), ErrorKind::NotConnected);
        // closing an unopened transport is harmless
        transport.close();
    }

    #[test]
    fn reads_and_flushes_from_a_socket() {
        use std::io::Write;

        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let mut transport = TcpTransport::new("127.0.0.1", port);
        transport.connect().unwrap();
        let (mut peer, _) = listener.accept().unwrap();

        let mut buffer = [0u8; 16];
        assert_eq!(
            transport
                .recv(&mut buffer, Duration::from_millis(10))
                .unwrap_err()
                .kind(),
            ErrorKind::TimedOut
        );

        peer.write_all(&[0x01, 0x02, 0x03]).unwrap();
        let count = transport.recv(&mut buffer, Duration::from_secs(5)).unwrap();
        assert_eq!(&buffer[..count], &[0x01, 0x02, 0x03][..count]);

        transport.close();
        assert_eq!(
            transport.send(&[0x01]).unwrap_err().kind(),
            ErrorKind::NotConnected
        );
    }
}
