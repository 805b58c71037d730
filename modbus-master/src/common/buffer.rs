use std::time::Duration;

use crate::decode::PhysDecodeLevel;
use crate::error::{InternalError, RequestError};
use crate::transport::Transport;

pub(crate) struct ReadBuffer {
    buffer: Vec<u8>,
    begin: usize,
    end: usize,
}

impl ReadBuffer {
    pub(crate) fn new(capacity: usize) -> Self {
        ReadBuffer {
            buffer: vec![0; capacity],
            begin: 0,
            end: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.end - self.begin
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.begin == self.end
    }

    pub(crate) fn read(&mut self, count: usize) -> Result<&[u8], InternalError> {
        if self.len() < count {
            return Err(InternalError::InsufficientBytesForRead(count, self.len()));
        }

        match self.buffer.get(self.begin..(self.begin + count)) {
            Some(ret) => {
                self.begin += count;
                Ok(ret)
            }
            None => Err(InternalError::InsufficientBytesForRead(count, self.len())),
        }
    }

    pub(crate) fn peek_at(&self, idx: usize) -> Result<u8, InternalError> {
        if self.len() < idx + 1 {
            return Err(InternalError::InsufficientBytesForRead(idx + 1, self.len()));
        }

        match self.buffer.get(self.begin + idx) {
            Some(ret) => Ok(*ret),
            None => Err(InternalError::InsufficientBytesForRead(idx + 1, self.len())),
        }
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, InternalError> {
        if self.is_empty() {
            return Err(InternalError::InsufficientBytesForRead(1, 0));
        }
        match self.buffer.get(self.begin) {
            Some(ret) => {
                self.begin += 1;
                Ok(*ret)
            }
            None => Err(InternalError::InsufficientBytesForRead(1, 0)),
        }
    }

    pub(crate) fn read_u16_be(&mut self) -> Result<u16, InternalError> {
        let b1 = self.read_u8()? as u16;
        let b2 = self.read_u8()? as u16;
        Ok((b1 << 8) | b2)
    }

    pub(crate) fn read_u16_le(&mut self) -> Result<u16, InternalError> {
        let b1 = self.read_u8()? as u16;
        let b2 = self.read_u8()? as u16;
        Ok((b2 << 8) | b1)
    }

    pub(crate) fn read_some<T>(
        &mut self,
        io: &mut T,
        window: Duration,
        decode_level: PhysDecodeLevel,
    ) -> Result<usize, RequestError>
    where
        T: Transport + ?Sized,
    {
        // before we read any data, check to see if the buffer is empty and adjust the indices
        // this allows use to make the biggest read possible, and avoids subsequent buffer shifting later
        if self.is_empty() {
            self.begin = 0;
            self.end = 0;
        }

        // if we've reached capacity, but still need more data we have to shift
        if self.end == self.buffer.len() {
            let length = self.len();
            self.buffer.copy_within(self.begin..self.end, 0);
            self.begin = 0;
            self.end = length;
        }

        let count =
            crate::common::phys::read(io, &mut self.buffer[self.end..], window, decode_level)?;

        if count == 0 {
            return Err(RequestError::TransportFailure(
                std::io::ErrorKind::UnexpectedEof,
            ));
        }
        self.end += count;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::mock;
    use crate::transport::FrameType;

    const WINDOW: Duration = Duration::from_millis(100);

    #[test]
    fn errors_when_reading_to_many_bytes() {
        let mut buffer = ReadBuffer::new(10);
        assert_eq!(
            buffer.read_u8(),
            Err(InternalError::InsufficientBytesForRead(1, 0))
        );
        assert_eq!(
            buffer.read(1),
            Err(InternalError::InsufficientBytesForRead(1, 0))
        );
        assert_eq!(
            buffer.peek_at(0),
            Err(InternalError::InsufficientBytesForRead(1, 0))
        );
    }

    #[test]
    fn shifts_contents_when_buffer_at_capacity() {
        let (mut io, mut handle) = mock(FrameType::Tcp);
        handle.read(&[0x01, 0x02, 0x03]);
        handle.read(&[0x04, 0x05]);

        let mut buffer = ReadBuffer::new(3);
        assert_eq!(
            buffer.read_some(&mut io, WINDOW, PhysDecodeLevel::Nothing),
            Ok(3)
        );
        assert_eq!(buffer.read(2).unwrap(), &[0x01, 0x02]);
        assert_eq!(
            buffer.read_some(&mut io, WINDOW, PhysDecodeLevel::Nothing),
            Ok(2)
        );
        assert_eq!(buffer.peek_at(2), Ok(0x05));
        assert_eq!(buffer.read(3).unwrap(), &[0x03, 0x04, 0x05]);
    }

    #[test]
    fn closed_link_is_a_transport_failure() {
        let (mut io, mut handle) = mock(FrameType::Tcp);
        handle.read(&[]);

        let mut buffer = ReadBuffer::new(8);
        assert_eq!(
            buffer.read_some(&mut io, WINDOW, PhysDecodeLevel::Nothing),
            Err(RequestError::TransportFailure(
                std::io::ErrorKind::UnexpectedEof
            ))
        );
    }
}
