//! Peripheral discovery.
//! A session registers interest in exactly one identity; the scanner
//! runs the advertisement stream until that identity shows up, then
//! stops scanning and hands the peripheral back.

use std::time::Duration;

use bluest::{Adapter, Device};
use futures_util::StreamExt;
use log::{debug, info, warn};
use regex::Regex;

use crate::core::bluetooth::constants::ADVERTISED_NAME_PREFIXES;
use crate::core::bluetooth::types::DiscoveredLight;
use crate::error::LinkError;

/// Discovery front-end bound to one adapter.
pub struct LightScanner {
    adapter: Adapter,
}

impl LightScanner {
    pub fn new(adapter: Adapter) -> Self {
        Self { adapter }
    }

    /// Scans until a peripheral matching `identity` is found.
    ///
    /// The identity may be a platform device identifier or a MAC
    /// address; comparison is case-insensitive. Scanning stops as soon
    /// as the match is made or the window elapses.
    pub async fn locate(
        &self,
        identity: &str,
        window: Duration,
    ) -> Result<(Device, DiscoveredLight), LinkError> {
        self.adapter.wait_available().await?;

        // A connected peripheral no longer advertises; check those first.
        for device in self.adapter.connected_devices().await? {
            if identity_matches(identity, &device.id().to_string()) {
                let found = describe(&device, device.name().ok());
                info!(
                    "Target already connected: {} ({})",
                    found.id,
                    found.name.as_deref().unwrap_or("unnamed")
                );
                return Ok((device, found));
            }
        }

        info!("Scanning for {identity}");
        let mut advertisements = self.adapter.scan(&[]).await?;
        let deadline = tokio::time::sleep(window);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                advertisement = advertisements.next() => {
                    let Some(advertisement) = advertisement else {
                        info!("Advertisement stream ended");
                        return Err(LinkError::NotFound(identity.to_string()));
                    };
                    let device = advertisement.device;
                    let found = describe(&device, advertisement.adv_data.local_name.clone());
                    debug!(
                        "Discovered {} ({}) rssi {:?}",
                        found.id,
                        found.name.as_deref().unwrap_or("unnamed"),
                        advertisement.rssi
                    );
                    if identity_matches(identity, &found.id) {
                        if !has_known_prefix(found.name.as_deref()) {
                            warn!("Matched peripheral advertises unexpected name {:?}", found.name);
                        }
                        info!(
                            "Matched peripheral {} ({})",
                            found.id,
                            found.name.as_deref().unwrap_or("unnamed")
                        );
                        return Ok((device, found));
                    }
                }
                () = &mut deadline => {
                    warn!("No peripheral matching {identity} within {window:?}");
                    return Err(LinkError::NotFound(identity.to_string()));
                }
            }
        }
    }
}

fn describe(device: &Device, name: Option<String>) -> DiscoveredLight {
    let id = device.id().to_string();
    let address = extract_mac_address(&id);
    DiscoveredLight { id, name, address }
}

/// Pulls a MAC address out of a platform-specific device identifier.
fn extract_mac_address(device_id: &str) -> Option<String> {
    let re = Regex::new(r"([0-9A-Fa-f]{2}[:-]){5}([0-9A-Fa-f]{2})").unwrap();
    re.find_iter(device_id)
        .last()
        .map(|m| m.as_str().to_uppercase().replace('-', ":"))
}

fn identity_matches(identity: &str, device_id: &str) -> bool {
    if identity.eq_ignore_ascii_case(device_id) {
        return true;
    }
    match (extract_mac_address(identity), extract_mac_address(device_id)) {
        (Some(wanted), Some(seen)) => wanted == seen,
        _ => false,
    }
}

fn has_known_prefix(name: Option<&str>) -> bool {
    name.is_some_and(|name| {
        ADVERTISED_NAME_PREFIXES
            .iter()
            .any(|prefix| name.starts_with(prefix))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mac_addresses_extract_from_platform_ids() {
        assert_eq!(
            extract_mac_address("ledstrip-BE:58:F2:11:22:33"),
            Some("BE:58:F2:11:22:33".to_string())
        );
        assert_eq!(
            extract_mac_address("be-58-f2-11-22-33"),
            Some("BE:58:F2:11:22:33".to_string())
        );
        assert_eq!(extract_mac_address("no-mac-here"), None);
    }

    #[test]
    fn identities_match_by_id_or_mac() {
        assert!(identity_matches("ABC", "abc"));
        assert!(identity_matches(
            "be:58:f2:11:22:33",
            "ledstrip-BE:58:F2:11:22:33"
        ));
        assert!(!identity_matches(
            "be:58:f2:11:22:33",
            "ledstrip-BE:58:F2:11:22:34"
        ));
        assert!(!identity_matches("other", "ledstrip-BE:58:F2:11:22:33"));
    }

    #[test]
    fn known_prefixes_are_recognized() {
        assert!(has_known_prefix(Some("ELK-BLEDOM 1234")));
        assert!(has_known_prefix(Some("MELK-X")));
        assert!(!has_known_prefix(Some("Gear VR Controller")));
        assert!(!has_known_prefix(None));
    }
}
