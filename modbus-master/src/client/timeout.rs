use std::time::Duration;

/// Response and inter-byte timeouts applied while waiting for a reply
///
/// A zero duration means "do not wait": a read that would need to wait fails with
/// [`RequestError::Timeout`](crate::RequestError::Timeout) immediately.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Timeouts {
    /// Maximum wait for the first byte of a reply
    pub response: Duration,
    /// Maximum wait between two consecutive chunks of the same reply
    pub byte: Duration,
}

/// Sub-second part of a split timeout was not below one second
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct InvalidTimeout {
    /// the rejected sub-second part in microseconds
    pub micros: u32,
}

impl std::error::Error for InvalidTimeout {}

impl std::fmt::Display for InvalidTimeout {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "sub-second part of a timeout must be below 1000000 us, got {}",
            self.micros
        )
    }
}

impl Timeouts {
    /// default for both timeouts
    pub const DEFAULT: Duration = Duration::from_millis(500);

    /// Create timeouts from their two durations
    pub fn new(response: Duration, byte: Duration) -> Self {
        Self { response, byte }
    }

    /// Build a single timeout from whole seconds plus microseconds
    ///
    /// ```
    /// use modbus_master::Timeouts;
    /// use std::time::Duration;
    ///
    /// assert_eq!(Timeouts::from_parts(1, 500_000), Ok(Duration::from_millis(1500)));
    /// assert!(Timeouts::from_parts(0, 1_000_000).is_err());
    /// ```
    pub fn from_parts(secs: u32, micros: u32) -> Result<Duration, InvalidTimeout> {
        if micros >= 1_000_000 {
            return Err(InvalidTimeout { micros });
        }
        Ok(Duration::from_secs(secs as u64) + Duration::from_micros(micros as u64))
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            response: Self::DEFAULT,
            byte: Self::DEFAULT,
        }
    }
}

/// Hands out the read window for each step of receiving a reply
///
/// The response timeout applies until the first bytes arrive, the byte timeout after that.
#[derive(Debug)]
pub(crate) struct ReceiveTimer {
    timeouts: Timeouts,
    receiving: bool,
}

impl ReceiveTimer {
    pub(crate) fn new(timeouts: Timeouts) -> Self {
        Self {
            timeouts,
            receiving: false,
        }
    }

    pub(crate) fn window(&self) -> Duration {
        if self.receiving {
            self.timeouts.byte
        } else {
            self.timeouts.response
        }
    }

    pub(crate) fn on_bytes_received(&mut self) {
        self.receiving = true;
    }

    /// wait for a new reply, e.g. after discarding a frame that answered some other request
    pub(crate) fn restart(&mut self) {
        self.receiving = false;
    }
}
