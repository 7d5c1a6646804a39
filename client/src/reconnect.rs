use std::time::Duration;

use crate::config::ReconnectPolicy;

/// WebSocket close code for a normal, intentional closure.
pub const CLOSE_NORMAL: u16 = 1000;

/// Adapter connection lifecycle.
///
/// `Connecting -> Open -> Closing -> Closed`, or straight to `Closed` on a
/// transport error. `Closed` either loops back to `Connecting` after a backoff
/// or ends in `Stopped`, which is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closing,
    Closed,
    Stopped,
}

impl ConnectionState {
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Open => "Connected",
            ConnectionState::Closing => "Closing",
            ConnectionState::Closed => "Disconnected",
            ConnectionState::Stopped => "Offline",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseCause {
    Normal,
    Abnormal,
}

impl CloseCause {
    /// Only an explicit 1000 is normal. No close frame at all means the
    /// transport dropped.
    pub fn from_code(code: Option<u16>) -> Self {
        match code {
            Some(CLOSE_NORMAL) => CloseCause::Normal,
            _ => CloseCause::Abnormal,
        }
    }
}

/// Attempt counter for one adapter session.
#[derive(Debug)]
pub struct Reconnector {
    policy: ReconnectPolicy,
    attempts: u32,
}

impl Reconnector {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            policy,
            attempts: 0,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn on_open(&mut self) {
        self.attempts = 0;
    }

    /// Delay before the next attempt, or `None` to stop for good.
    pub fn on_close(&mut self, cause: CloseCause) -> Option<Duration> {
        if cause == CloseCause::Normal || self.attempts >= self.policy.max_attempts {
            return None;
        }
        let delay = self.policy.delay_for(self.attempts);
        self.attempts += 1;
        Some(delay)
    }
}
