use std::fmt::Write;
use std::time::Duration;

use crate::decode::PhysDecodeLevel;
use crate::transport::Transport;

/// read from the transport, logging what was received
pub(crate) fn read<T>(
    io: &mut T,
    buffer: &mut [u8],
    window: Duration,
    decode_level: PhysDecodeLevel,
) -> Result<usize, std::io::Error>
where
    T: Transport + ?Sized,
{
    let length = io.recv(buffer, window)?;

    if decode_level.enabled() {
        if let Some(x) = buffer.get(0..length) {
            tracing::info!("PHYS RX - {}", PhysDisplay::new(decode_level, x))
        }
    }

    Ok(length)
}

/// write to the transport, logging what is sent
pub(crate) fn write<T>(
    io: &mut T,
    data: &[u8],
    decode_level: PhysDecodeLevel,
) -> Result<(), std::io::Error>
where
    T: Transport + ?Sized,
{
    if decode_level.enabled() {
        tracing::info!("PHYS TX - {}", PhysDisplay::new(decode_level, data));
    }

    io.send(data)
}

pub(crate) struct PhysDisplay<'a> {
    level: PhysDecodeLevel,
    data: &'a [u8],
}

impl<'a> PhysDisplay<'a> {
    pub(crate) fn new(level: PhysDecodeLevel, data: &'a [u8]) -> Self {
        PhysDisplay { level, data }
    }
}

impl std::fmt::Display for PhysDisplay<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{} bytes", self.data.len())?;
        if self.level.data_enabled() {
            format_bytes(f, self.data)?;
        }
        Ok(())
    }
}

/// Silent interval that must separate two RTU frames on the line
#[cfg(feature = "serial")]
pub(crate) fn calculate_inter_frame_delay(baud_rate: u32) -> Duration {
    // Modbus RTU uses 11-bit characters (1 start, 8 data, 1 parity or stop, 1 stop)
    const NUM_BITS_IN_CHAR: u64 = 11;

    // above 19200 baud the delay is fixed
    const MAX_BAUD_RATE: u32 = 19200;
    const MIN_DELAY: Duration = Duration::from_micros(1750);

    match baud_rate {
        0 => {
            tracing::warn!(
                "baud rate of zero, defaulting to an inter-frame delay of {} us",
                MIN_DELAY.as_micros()
            );
            MIN_DELAY
        }
        x if x <= MAX_BAUD_RATE => {
            let character_time = Duration::from_secs(NUM_BITS_IN_CHAR) / x;
            35 * character_time / 10 // multiply by 3.5
        }
        _ => MIN_DELAY,
    }
}

const BYTES_PER_DECODE_LINE: usize = 18;

pub(crate) fn format_bytes(f: &mut std::fmt::Formatter, bytes: &[u8]) -> std::fmt::Result {
    for chunk in bytes.chunks(BYTES_PER_DECODE_LINE) {
        writeln!(f)?;
        let mut first = true;
        for byte in chunk {
            if !first {
                f.write_char(' ')?;
            }
            first = false;
            write!(f, "{byte:02X?}")?;
        }
    }
    Ok(())
}
