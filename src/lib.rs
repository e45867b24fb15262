//! Session management and command encoding for BLEDOM-family
//! Bluetooth LE LED strips.
//!
//! The crate turns the unreliable, session-oriented BLE link into a
//! logical "send this command to the strip" operation: commands are
//! serialized through a per-device queue, failed writes are retried a
//! bounded number of times, lost connections are re-established with
//! exponential backoff, and an idle link is torn down after a quiet
//! period to conserve it.

// Module declarations
pub mod config;
pub mod core;
pub mod error;

// Re-export the public surface
pub use crate::config::{AppConfig, DeviceConfig, SessionTuning};
pub use crate::core::bluetooth::{
    BluestLink, Effect, Frame, LightCommand, LightLink, SessionHandle, SessionStatus,
};
pub use crate::core::color::hsl_to_rgb;
pub use crate::core::light::{LightState, LightStrip};
pub use crate::error::{Error, Result};
