//! Per-device settings and session timing knobs.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::bluetooth::{
    CONNECT_TIMEOUT_MS, DEFAULT_LIGHTNESS, IDLE_DISCONNECT_DELAY_MS, INITIAL_BACKOFF_MS,
    MAX_BACKOFF_MS, MAX_RECONNECT_ATTEMPTS, MAX_WRITE_ATTEMPTS, RECONNECT_COOLDOWN_MS,
    SCAN_TIMEOUT_MS, WRITE_RETRY_DELAY_MS,
};

/// Settings for one strip.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Platform identifier or MAC address of the target strip.
    pub identity: String,
    /// Lightness used when deriving RGB from hue and saturation.
    pub lightness: f64,
    /// Session timing and retry knobs.
    pub tuning: SessionTuning,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            identity: String::new(),
            lightness: DEFAULT_LIGHTNESS,
            tuning: SessionTuning::default(),
        }
    }
}

/// Every timing and retry knob of a session.
///
/// All durations are milliseconds so the struct serializes flat.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionTuning {
    /// Maximum attempts per queued write.
    pub write_attempts: u32,
    /// Delay between attempts of the same write.
    pub write_retry_delay_ms: u64,
    /// Quiet period after the last write before disconnecting.
    pub idle_disconnect_ms: u64,
    /// Maximum consecutive connection attempts before cooling down.
    pub max_reconnect_attempts: u32,
    /// First reconnect backoff delay; doubles on consecutive failures.
    pub initial_backoff_ms: u64,
    /// Upper bound on the reconnect backoff delay.
    pub max_backoff_ms: u64,
    /// Rest period after reconnect attempts are exhausted.
    pub reconnect_cooldown_ms: u64,
    /// Timeout for one connect + characteristic discovery cycle.
    pub connect_timeout_ms: u64,
    /// How long a scan may run before giving up on the peripheral.
    pub scan_timeout_ms: u64,
}

impl Default for SessionTuning {
    fn default() -> Self {
        Self {
            write_attempts: MAX_WRITE_ATTEMPTS,
            write_retry_delay_ms: WRITE_RETRY_DELAY_MS,
            idle_disconnect_ms: IDLE_DISCONNECT_DELAY_MS,
            max_reconnect_attempts: MAX_RECONNECT_ATTEMPTS,
            initial_backoff_ms: INITIAL_BACKOFF_MS,
            max_backoff_ms: MAX_BACKOFF_MS,
            reconnect_cooldown_ms: RECONNECT_COOLDOWN_MS,
            connect_timeout_ms: CONNECT_TIMEOUT_MS,
            scan_timeout_ms: SCAN_TIMEOUT_MS,
        }
    }
}

impl SessionTuning {
    pub fn write_retry_delay(&self) -> Duration {
        Duration::from_millis(self.write_retry_delay_ms)
    }

    pub fn idle_disconnect_delay(&self) -> Duration {
        Duration::from_millis(self.idle_disconnect_ms)
    }

    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }

    pub fn reconnect_cooldown(&self) -> Duration {
        Duration::from_millis(self.reconnect_cooldown_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn scan_timeout(&self) -> Duration {
        Duration::from_millis(self.scan_timeout_ms)
    }
}
