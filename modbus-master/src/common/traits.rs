use crate::decode::PduDecodeLevel;
use crate::error::RequestError;

use scursor::WriteCursor;

/// Writes a complete PDU, function code included
pub(crate) trait Serialize {
    fn serialize(&self, cursor: &mut WriteCursor) -> Result<(), RequestError>;
}

pub(crate) trait Loggable {
    fn log(&self, level: PduDecodeLevel, f: &mut std::fmt::Formatter) -> std::fmt::Result;
}

pub(crate) struct LoggableDisplay<'a, T: Loggable> {
    loggable: &'a T,
    level: PduDecodeLevel,
}

impl<'a, T: Loggable> LoggableDisplay<'a, T> {
    pub(crate) fn new(loggable: &'a T, level: PduDecodeLevel) -> Self {
        Self { loggable, level }
    }
}

impl<T: Loggable> std::fmt::Display for LoggableDisplay<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        self.loggable.log(self.level, f)
    }
}

/// PDU supplied verbatim by the caller
pub(crate) struct RawPdu<'a> {
    pub(crate) bytes: &'a [u8],
}

impl Serialize for RawPdu<'_> {
    fn serialize(&self, cursor: &mut WriteCursor) -> Result<(), RequestError> {
        cursor.write_bytes(self.bytes)?;
        Ok(())
    }
}

impl Loggable for RawPdu<'_> {
    fn log(&self, level: PduDecodeLevel, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if let Some(function) = self.bytes.first() {
            write!(f, "RAW ({function:#04X})")?;
        }
        if level.data_values() {
            if let Some(data) = self.bytes.get(1..) {
                crate::common::phys::format_bytes(f, data)?;
            }
        }
        Ok(())
    }
}
