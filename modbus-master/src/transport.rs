use std::time::Duration;

/// Framing used to carry PDUs over a transport
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FrameType {
    /// MBAP header with transaction id, used over TCP sockets
    Tcp,
    /// slave address prefix and CRC-16 suffix, used over serial lines
    Rtu,
}

impl std::fmt::Display for FrameType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            FrameType::Tcp => f.write_str("TCP"),
            FrameType::Rtu => f.write_str("RTU"),
        }
    }
}

/// Byte pipe consumed by a [`ModbusContext`](crate::ModbusContext)
///
/// Implementations move bytes only. Framing, validation, timeouts between bytes, and error
/// recovery all live in the context.
pub trait Transport {
    /// Framing that the context must apply to requests sent over this transport
    fn frame_type(&self) -> FrameType;

    /// Open the underlying link
    fn connect(&mut self) -> std::io::Result<()>;

    /// Release the underlying link, a no-op if it is not open
    fn close(&mut self);

    /// Write all of `data` to the link
    fn send(&mut self, data: &[u8]) -> std::io::Result<()>;

    /// Read whatever is available into `buffer`, waiting at most `window` for the first byte
    ///
    /// An expired window is reported as [`std::io::ErrorKind::TimedOut`]. A return value of zero
    /// means the peer closed the link.
    fn recv(&mut self, buffer: &mut [u8], window: Duration) -> std::io::Result<usize>;

    /// Discard any input that has been received but not read, returning the number of bytes dropped
    fn flush(&mut self) -> std::io::Result<usize>;
}

impl<T> Transport for Box<T>
where
    T: Transport + ?Sized,
{
    fn frame_type(&self) -> FrameType {
        (**self).frame_type()
    }

    fn connect(&mut self) -> std::io::Result<()> {
        (**self).connect()
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn send(&mut self, data: &[u8]) -> std::io::Result<()> {
        (**self).send(data)
    }

    fn recv(&mut self, buffer: &mut [u8], window: Duration) -> std::io::Result<usize> {
        (**self).recv(buffer, window)
    }

    fn flush(&mut self) -> std::io::Result<usize> {
        (**self).flush()
    }
}
