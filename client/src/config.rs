use std::time::Duration;

pub const DEFAULT_WS_URL: &str = "ws://127.0.0.1:3000/";

/// Exponential backoff for abnormal disconnects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Reconnects allowed in a row before giving up for the session.
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_attempts: 5,
        }
    }
}

impl ReconnectPolicy {
    /// `min(base_delay * 2^attempt, max_delay)`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        2u32.checked_pow(attempt)
            .and_then(|factor| self.base_delay.checked_mul(factor))
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.base_delay.is_zero() {
            return Err("base_delay must be > 0".to_string());
        }
        if self.max_delay < self.base_delay {
            return Err("max_delay must be >= base_delay".to_string());
        }
        Ok(())
    }
}

/// Client network adapter configuration
#[derive(Debug, Clone)]
pub struct AdapterConfig {
    pub url: String,
    /// Cadence of outbound position reports
    pub send_interval: Duration,
    pub reconnect: ReconnectPolicy,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_WS_URL.to_string(),
            send_interval: Duration::from_millis(50),
            reconnect: ReconnectPolicy::default(),
        }
    }
}

impl AdapterConfig {
    pub fn from_env() -> Self {
        Self::with_url(std::env::var("DOODLE_WS_URL").ok())
    }

    fn with_url(url: Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
            config.url = url.trim().to_string();
        }
        config
    }

    pub fn validate(&self) -> Result<(), String> {
        let url = url::Url::parse(&self.url).map_err(|e| format!("url {:?}: {}", self.url, e))?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(format!("url scheme must be ws or wss, got {:?}", url.scheme()));
        }
        if self.send_interval.is_zero() {
            return Err("send_interval must be > 0".to_string());
        }
        self.reconnect.validate()
    }
}
