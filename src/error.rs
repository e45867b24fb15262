//! Error types surfaced by the crate.

use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type of the public API.
#[derive(Debug, Error)]
pub enum Error {
    /// A parameter was rejected before anything reached the transport.
    #[error("{what} out of range: {value} (expected {range})")]
    Parameter {
        what: &'static str,
        value: u32,
        range: &'static str,
    },

    /// The configuration cannot be used as given.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// An effect name did not match any known mode.
    #[error("unknown effect: {0}")]
    UnknownEffect(String),

    /// A connection cycle failed; the session backs off and retries.
    #[error("connection attempt {attempts} failed: {reason}")]
    Connection { attempts: u32, reason: String },

    /// Reconnect attempts are exhausted; the session rests before
    /// trying again.
    #[error("reconnect attempts exhausted; cooling down")]
    CoolingDown,

    /// A write was abandoned after its last permitted attempt.
    #[error("write abandoned after {attempts} attempts: {reason}")]
    Write { attempts: u32, reason: String },

    /// The session task is no longer running.
    #[error("session closed")]
    SessionClosed,

    #[error(transparent)]
    Link(#[from] LinkError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Failures at the BLE transport layer.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("no bluetooth adapter available")]
    AdapterUnavailable,

    #[error("no peripheral matching {0} discovered")]
    NotFound(String),

    #[error("peripheral not located yet")]
    NotLocated,

    #[error("service {0} not found")]
    ServiceNotFound(Uuid),

    #[error("write characteristic {0} not found")]
    CharacteristicNotFound(Uuid),

    #[error("not attached to the peripheral")]
    NotAttached,

    #[error("connect timed out after {0:?}")]
    ConnectTimeout(Duration),

    #[error(transparent)]
    Ble(#[from] bluest::Error),
}
