use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timing and capacity knobs for a streaming session.
///
/// Durations are kept in milliseconds so the struct reads naturally from TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Typing cadence: one queued chunk is revealed per interval
    pub drain_interval_ms: u64,
    /// Pause between the last revealed chunk and swapping in the final message
    pub completion_delay_ms: u64,
    /// Pause between finalizing and clearing the streaming state
    pub settle_delay_ms: u64,
    pub timeline_capacity: usize,
    pub channel_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            drain_interval_ms: 15,
            completion_delay_ms: 120,
            settle_delay_ms: 50,
            timeline_capacity: 50,
            channel_capacity: 256,
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_drain_interval(mut self, interval: Duration) -> Self {
        self.drain_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn with_completion_delay(mut self, delay: Duration) -> Self {
        self.completion_delay_ms = delay.as_millis() as u64;
        self
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay_ms = delay.as_millis() as u64;
        self
    }

    pub fn with_timeline_capacity(mut self, capacity: usize) -> Self {
        self.timeline_capacity = capacity;
        self
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Never zero; `tokio::time::interval` panics on a zero period
    pub fn drain_interval(&self) -> Duration {
        Duration::from_millis(self.drain_interval_ms.max(1))
    }

    pub fn completion_delay(&self) -> Duration {
        Duration::from_millis(self.completion_delay_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: SessionConfig = serde_json::from_str(r#"{"drain_interval_ms": 30}"#).unwrap();
        assert_eq!(config.drain_interval(), Duration::from_millis(30));
        assert_eq!(config.timeline_capacity, 50);
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let config = SessionConfig::new().with_drain_interval(Duration::ZERO);
        assert_eq!(config.drain_interval(), Duration::from_millis(1));
    }
}
