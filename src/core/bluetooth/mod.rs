//! Bluetooth functionality for the BLEDOM bridge.
//! This module handles discovery, connection/session management, write
//! serialization, and the command codec.

mod commands;
mod constants;
mod link;
mod queue;
mod scanner;
mod session;
mod types;

// Re-export types that should be publicly accessible
pub use commands::{Effect, FRAME_HEAD, FRAME_LEN, FRAME_TAIL, Frame, LightCommand};
pub use constants::*; // Re-export all constants
pub use link::{BluestLink, LightLink};
pub use queue::WriteQueue;
pub use scanner::LightScanner;
pub use session::{SessionHandle, spawn_session};
pub use types::{DiscoveredLight, SessionStatus};

#[cfg(test)]
pub(crate) use link::testing::ScriptedLink;
