//! Shared data structures for the bluetooth module.

use std::fmt;

/// Connection lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub enum SessionStatus {
    /// No link and nothing in progress.
    #[default]
    Idle,
    /// Discovery is running for the bound identity.
    Scanning,
    /// A connect + characteristic discovery cycle is in progress.
    Connecting,
    /// The write characteristic is resolved and usable.
    Connected,
    /// A deliberate teardown is in progress.
    Disconnecting,
    /// The link was lost and is being re-established.
    Reconnecting,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::Scanning => "scanning",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnecting => "disconnecting",
            Self::Reconnecting => "reconnecting",
        };
        f.write_str(label)
    }
}

/// A peripheral that matched the bound identity during discovery.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DiscoveredLight {
    /// Platform-specific unique identifier for the peripheral.
    pub id: String,
    /// Advertised local name, if any.
    pub name: Option<String>,
    /// MAC address when one can be extracted from the identifier.
    pub address: Option<String>,
}
