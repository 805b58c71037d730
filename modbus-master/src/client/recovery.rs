use crate::error::RequestError;

/// Controls what a context does after a request fails at the link or framing level
///
/// Modes combine with `|`:
///
/// ```
/// use modbus_master::ErrorRecoveryMode;
///
/// assert_eq!(
///     ErrorRecoveryMode::Link | ErrorRecoveryMode::Protocol,
///     ErrorRecoveryMode::LinkAndProtocol
/// );
/// ```
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ErrorRecoveryMode {
    /// surface every failure immediately
    #[default]
    None,
    /// close and re-open the link, then retry the request once
    Link,
    /// discard unread input, then retry the request once
    Protocol,
    /// link recovery first, then protocol recovery if the retry also fails
    LinkAndProtocol,
}

impl ErrorRecoveryMode {
    /// Build a mode from its two flags
    pub fn new(link: bool, protocol: bool) -> Self {
        match (link, protocol) {
            (false, false) => Self::None,
            (true, false) => Self::Link,
            (false, true) => Self::Protocol,
            (true, true) => Self::LinkAndProtocol,
        }
    }

    /// True if the link is re-opened after a failure
    pub fn link(self) -> bool {
        matches!(self, Self::Link | Self::LinkAndProtocol)
    }

    /// True if unread input is flushed after a failure
    pub fn protocol(self) -> bool {
        matches!(self, Self::Protocol | Self::LinkAndProtocol)
    }

    fn steps(self) -> &'static [RecoveryStep] {
        match self {
            Self::None => &[],
            Self::Link => &[RecoveryStep::Reconnect],
            Self::Protocol => &[RecoveryStep::Flush],
            Self::LinkAndProtocol => &[RecoveryStep::Reconnect, RecoveryStep::Flush],
        }
    }
}

impl std::ops::BitOr for ErrorRecoveryMode {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self::new(self.link() || rhs.link(), self.protocol() || rhs.protocol())
    }
}

impl std::fmt::Display for ErrorRecoveryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::None => f.write_str("none"),
            Self::Link => f.write_str("link"),
            Self::Protocol => f.write_str("protocol"),
            Self::LinkAndProtocol => f.write_str("link and protocol"),
        }
    }
}

/// Action the context must take before retrying a request
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum RecoveryStep {
    Reconnect,
    Flush,
}

impl std::fmt::Display for RecoveryStep {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Reconnect => f.write_str("reconnect"),
            Self::Flush => f.write_str("flush"),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum RecoveryState {
    Idle,
    AwaitingReply,
    Recovering,
}

/// What to do with a failed attempt
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Decision {
    Surface(RequestError),
    Recover(RecoveryStep),
}

/// Tracks the recovery of a single request
///
/// Each recovery step of the mode is taken at most once and is followed by exactly one retry.
/// Once the steps are used up the first recoverable failure is surfaced.
#[derive(Debug)]
pub(crate) struct RecoveryController {
    mode: ErrorRecoveryMode,
    state: RecoveryState,
    steps_taken: usize,
    original: Option<RequestError>,
}

impl RecoveryController {
    pub(crate) fn new(mode: ErrorRecoveryMode) -> Self {
        Self {
            mode,
            state: RecoveryState::Idle,
            steps_taken: 0,
            original: None,
        }
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> RecoveryState {
        self.state
    }

    pub(crate) fn on_send(&mut self) {
        if self.state == RecoveryState::Idle {
            self.steps_taken = 0;
            self.original = None;
        }
        self.state = RecoveryState::AwaitingReply;
    }

    pub(crate) fn on_success(&mut self) {
        self.reset();
    }

    pub(crate) fn on_failure(&mut self, err: RequestError) -> Decision {
        if !err.is_recoverable() {
            self.reset();
            return Decision::Surface(err);
        }

        let original = *self.original.get_or_insert(err);

        match self.mode.steps().get(self.steps_taken) {
            Some(step) => {
                self.steps_taken += 1;
                self.state = RecoveryState::Recovering;
                tracing::warn!("{}, recovering with {}", err, step);
                Decision::Recover(*step)
            }
            None => {
                self.reset();
                Decision::Surface(original)
            }
        }
    }

    /// the recovery step itself failed, give up with the first failure
    pub(crate) fn abort(&mut self) -> RequestError {
        let original = self.original.unwrap_or(RequestError::NotConnected);
        self.reset();
        original
    }

    fn reset(&mut self) {
        self.state = RecoveryState::Idle;
        self.steps_taken = 0;
        self.original = None;
    }
}
