//! Constants used throughout the crate.
//! This module contains the service and characteristic identifiers of
//! the strip firmware plus the timing and retry defaults.

use uuid::Uuid;

/// Advertised name prefixes used by BLEDOM-family strips.
pub const ADVERTISED_NAME_PREFIXES: &[&str] = &["ELK-BLEDOM", "ELK-BLE", "MELK", "LEDBLE"];

/// The UUID of the LED control service.
pub const UUID_LED_SERVICE: Uuid = Uuid::from_u128(0x0000fff0_0000_1000_8000_00805f9b34fb);

/// The UUID of the characteristic command frames are written to.
pub const UUID_LED_WRITE_CHAR: Uuid = Uuid::from_u128(0x0000fff3_0000_1000_8000_00805f9b34fb);

/// Maximum attempts per queued write.
pub const MAX_WRITE_ATTEMPTS: u32 = 3;

/// Delay between attempts of the same write, in milliseconds.
pub const WRITE_RETRY_DELAY_MS: u64 = 1_000;

/// Quiet period after the last write before the link is torn down,
/// in milliseconds.
pub const IDLE_DISCONNECT_DELAY_MS: u64 = 5_000;

/// Maximum consecutive connection attempts before cooling down.
pub const MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// First reconnect backoff delay in milliseconds; doubles on each
/// consecutive failure.
pub const INITIAL_BACKOFF_MS: u64 = 1_000;

/// Upper bound on the reconnect backoff delay, in milliseconds.
pub const MAX_BACKOFF_MS: u64 = 30_000;

/// Rest period after reconnect attempts are exhausted, in milliseconds.
pub const RECONNECT_COOLDOWN_MS: u64 = 60_000;

/// Timeout for one connect + characteristic discovery cycle,
/// in milliseconds.
pub const CONNECT_TIMEOUT_MS: u64 = 10_000;

/// How long a scan may run before locating the peripheral is abandoned,
/// in milliseconds.
pub const SCAN_TIMEOUT_MS: u64 = 10_000;

/// Fixed lightness used when deriving RGB from hue and saturation.
pub const DEFAULT_LIGHTNESS: f64 = 0.5;
