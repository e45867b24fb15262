//! The seam between the session machine and the BLE stack.
//! One implementor drives a real adapter through `bluest`; tests use a
//! scripted in-memory link.

use std::time::Duration;

use async_trait::async_trait;
use bluest::{Adapter, Characteristic, ConnectionEvent, Device};
use futures_util::StreamExt;
use log::{debug, info};

use crate::core::bluetooth::constants::{UUID_LED_SERVICE, UUID_LED_WRITE_CHAR};
use crate::core::bluetooth::scanner::LightScanner;
use crate::error::LinkError;

/// Transport operations the session relies on.
#[async_trait]
pub trait LightLink: Send + Sync + 'static {
    /// Resolves the bound identity to a peripheral handle.
    async fn locate(&mut self) -> Result<(), LinkError>;

    /// True once a peripheral handle is held.
    fn located(&self) -> bool;

    /// Connects and resolves the write characteristic.
    async fn attach(&mut self) -> Result<(), LinkError>;

    /// True while the connection and write characteristic are usable.
    async fn is_attached(&self) -> bool;

    /// Writes one frame to the write characteristic.
    async fn write_frame(&mut self, frame: &[u8]) -> Result<(), LinkError>;

    /// Tears the connection down and invalidates the write
    /// characteristic. Idempotent.
    async fn detach(&mut self) -> Result<(), LinkError>;

    /// Forgets the peripheral handle entirely; the next use rescans.
    fn forget(&mut self);

    /// Resolves when an established connection drops on its own.
    /// Pends forever while no connection exists.
    async fn closed(&self);
}

/// [`LightLink`] over a real Bluetooth adapter.
pub struct BluestLink {
    adapter: Adapter,
    scanner: LightScanner,
    identity: String,
    scan_window: Duration,
    device: Option<Device>,
    write_char: Option<Characteristic>,
}

impl BluestLink {
    /// Opens the default adapter and binds the link to one identity.
    pub async fn new(identity: impl Into<String>, scan_window: Duration) -> Result<Self, LinkError> {
        let adapter = Adapter::default()
            .await
            .ok_or(LinkError::AdapterUnavailable)?;
        adapter.wait_available().await?;
        info!("Bluetooth adapter is available");
        Ok(Self {
            scanner: LightScanner::new(adapter.clone()),
            adapter,
            identity: identity.into(),
            scan_window,
            device: None,
            write_char: None,
        })
    }
}

#[async_trait]
impl LightLink for BluestLink {
    async fn locate(&mut self) -> Result<(), LinkError> {
        if self.device.is_some() {
            return Ok(());
        }
        let (device, _found) = self.scanner.locate(&self.identity, self.scan_window).await?;
        self.device = Some(device);
        Ok(())
    }

    fn located(&self) -> bool {
        self.device.is_some()
    }

    async fn attach(&mut self) -> Result<(), LinkError> {
        let device = self.device.as_ref().ok_or(LinkError::NotLocated)?;

        if !device.is_connected().await {
            debug!("Initiating connection to {}", device.id());
            self.adapter.connect_device(device).await?;
        }

        debug!("Connection established, discovering services");
        let services = device.services().await?;
        let led_service = services
            .iter()
            .find(|service| service.uuid() == UUID_LED_SERVICE)
            .ok_or(LinkError::ServiceNotFound(UUID_LED_SERVICE))?
            .clone();

        let characteristics = led_service.characteristics().await?;
        let write_char = characteristics
            .into_iter()
            .find(|characteristic| characteristic.uuid() == UUID_LED_WRITE_CHAR)
            .ok_or(LinkError::CharacteristicNotFound(UUID_LED_WRITE_CHAR))?;

        info!("Found write characteristic {}", write_char.uuid());
        self.write_char = Some(write_char);
        Ok(())
    }

    async fn is_attached(&self) -> bool {
        match (&self.device, &self.write_char) {
            (Some(device), Some(_)) => device.is_connected().await,
            _ => false,
        }
    }

    async fn write_frame(&mut self, frame: &[u8]) -> Result<(), LinkError> {
        let write_char = self.write_char.as_ref().ok_or(LinkError::NotAttached)?;
        write_char.write(frame).await?;
        Ok(())
    }

    async fn detach(&mut self) -> Result<(), LinkError> {
        self.write_char = None;
        if let Some(device) = &self.device {
            if device.is_connected().await {
                debug!("Disconnecting from {}", device.id());
                self.adapter.disconnect_device(device).await?;
            }
        }
        Ok(())
    }

    fn forget(&mut self) {
        self.write_char = None;
        self.device = None;
    }

    async fn closed(&self) {
        let Some(device) = &self.device else {
            return std::future::pending().await;
        };
        match self.adapter.device_connection_events(device).await {
            Ok(mut events) => {
                while let Some(event) = events.next().await {
                    if matches!(event, ConnectionEvent::Disconnected) {
                        return;
                    }
                }
                // Stream ended without a disconnect event; nothing more
                // will be reported, fall back to failing writes.
                std::future::pending().await
            }
            Err(err) => {
                debug!("Connection events unavailable: {err}");
                std::future::pending().await
            }
        }
    }
}
