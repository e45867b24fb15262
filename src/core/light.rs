//! The public device surface.
//! `LightStrip` turns high-level intents (power, brightness, color,
//! effects) into command frames, pushes them through the session's
//! write queue, and tracks the last values the strip confirmed.

use std::sync::Mutex;

use log::debug;
use tokio::task::JoinHandle;

use crate::config::DeviceConfig;
use crate::core::bluetooth::{
    BluestLink, Effect, LightCommand, LightLink, SessionHandle, SessionStatus, spawn_session,
};
use crate::core::color::hsl_to_rgb;
use crate::error::{Error, Result};

/// Last confirmed values, mutated only after a write succeeds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightState {
    pub power: bool,
    /// Brightness percentage, 0-100.
    pub brightness: u8,
    /// Hue in degrees, 0-360.
    pub hue: u16,
    /// Saturation percentage, 0-100.
    pub saturation: u8,
    /// Active animation mode, if one was set.
    pub effect: Option<Effect>,
    /// Animation speed percentage, if one was set.
    pub effect_speed: Option<u8>,
}

impl Default for LightState {
    fn default() -> Self {
        Self {
            power: false,
            brightness: 100,
            hue: 0,
            saturation: 0,
            effect: None,
            effect_speed: None,
        }
    }
}

/// One BLEDOM strip addressed through its own session.
pub struct LightStrip {
    session: SessionHandle,
    task: JoinHandle<()>,
    state: Mutex<LightState>,
    lightness: f64,
}

impl LightStrip {
    /// Binds a strip to the identity in `config`.
    ///
    /// The link comes up lazily: the first command scans, connects and
    /// resolves the write characteristic.
    pub async fn new(config: DeviceConfig) -> Result<Self> {
        if config.identity.trim().is_empty() {
            return Err(Error::Config("device identity is required".to_string()));
        }
        let link = BluestLink::new(config.identity.as_str(), config.tuning.scan_timeout()).await?;
        Ok(Self::with_link(link, &config))
    }

    /// Builds a strip over any transport implementation.
    pub fn with_link<L: LightLink>(link: L, config: &DeviceConfig) -> Self {
        let (session, task) = spawn_session(link, config.tuning.clone());
        Self {
            session,
            task,
            state: Mutex::new(LightState::default()),
            lightness: config.lightness,
        }
    }

    /// Turns the strip on or off.
    pub async fn set_power(&self, on: bool) -> Result<()> {
        self.submit(LightCommand::Power(on)).await?;
        self.state.lock().unwrap().power = on;
        Ok(())
    }

    /// Sets the brightness percentage (0-100).
    pub async fn set_brightness(&self, level: u8) -> Result<()> {
        self.submit(LightCommand::Brightness(level)).await?;
        self.state.lock().unwrap().brightness = level;
        Ok(())
    }

    /// Sets a static color.
    pub async fn set_rgb(&self, r: u8, g: u8, b: u8) -> Result<()> {
        self.submit(LightCommand::Rgb { r, g, b }).await
    }

    /// Sets the hue in degrees (0-360), re-deriving the color from the
    /// cached saturation and the fixed lightness.
    pub async fn set_hue(&self, hue: u16) -> Result<()> {
        if hue > 360 {
            return Err(Error::Parameter {
                what: "hue",
                value: u32::from(hue),
                range: "0-360",
            });
        }
        let saturation = self.state.lock().unwrap().saturation;
        let (r, g, b) = hsl_to_rgb(
            f64::from(hue) / 360.0,
            f64::from(saturation) / 100.0,
            self.lightness,
        );
        self.submit(LightCommand::Rgb { r, g, b }).await?;
        self.state.lock().unwrap().hue = hue;
        Ok(())
    }

    /// Sets the saturation percentage (0-100), re-deriving the color
    /// from the cached hue and the fixed lightness.
    pub async fn set_saturation(&self, saturation: u8) -> Result<()> {
        if saturation > 100 {
            return Err(Error::Parameter {
                what: "saturation",
                value: u32::from(saturation),
                range: "0-100",
            });
        }
        let hue = self.state.lock().unwrap().hue;
        let (r, g, b) = hsl_to_rgb(
            f64::from(hue) / 360.0,
            f64::from(saturation) / 100.0,
            self.lightness,
        );
        self.submit(LightCommand::Rgb { r, g, b }).await?;
        self.state.lock().unwrap().saturation = saturation;
        Ok(())
    }

    /// Starts a built-in animation mode.
    pub async fn set_effect(&self, effect: Effect) -> Result<()> {
        self.submit(LightCommand::Effect(effect)).await?;
        self.state.lock().unwrap().effect = Some(effect);
        Ok(())
    }

    /// Sets the animation speed percentage (0-100).
    pub async fn set_effect_speed(&self, speed: u8) -> Result<()> {
        self.submit(LightCommand::EffectSpeed(speed)).await?;
        self.state.lock().unwrap().effect_speed = Some(speed);
        Ok(())
    }

    /// Snapshot of the last confirmed values.
    pub fn state(&self) -> LightState {
        *self.state.lock().unwrap()
    }

    /// Current connection status of the underlying session.
    pub fn status(&self) -> SessionStatus {
        self.session.status()
    }

    /// Disconnects and stops the session task.
    pub async fn shutdown(self) {
        self.session.shutdown();
        let _ = self.task.await;
    }

    async fn submit(&self, command: LightCommand) -> Result<()> {
        let frame = command.encode()?;
        debug!("Submitting {command:?} as {frame:02x?}");
        self.session.submit(frame).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bluetooth::ScriptedLink;

    fn test_strip() -> (LightStrip, ScriptedLink) {
        let link = ScriptedLink::new();
        let config = DeviceConfig {
            identity: "aa:bb:cc:dd:ee:ff".to_string(),
            ..DeviceConfig::default()
        };
        let strip = LightStrip::with_link(link.clone(), &config);
        (strip, link)
    }

    #[tokio::test(start_paused = true)]
    async fn rejects_out_of_range_input_without_transport() {
        let (strip, link) = test_strip();

        assert!(matches!(
            strip.set_brightness(101).await.unwrap_err(),
            Error::Parameter { .. }
        ));
        assert!(matches!(
            strip.set_effect_speed(101).await.unwrap_err(),
            Error::Parameter { .. }
        ));
        assert!(matches!(
            strip.set_hue(361).await.unwrap_err(),
            Error::Parameter { .. }
        ));
        assert!(matches!(
            strip.set_saturation(101).await.unwrap_err(),
            Error::Parameter { .. }
        ));

        assert_eq!(link.attach_calls(), 0);
        assert!(link.writes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn power_updates_cache_after_confirmed_write() {
        let (strip, link) = test_strip();
        assert!(!strip.state().power);

        strip.set_power(true).await.unwrap();
        assert!(strip.state().power);
        assert_eq!(
            link.writes(),
            vec![LightCommand::Power(true).encode().unwrap().to_vec()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn failed_write_leaves_cache_untouched() {
        let (strip, link) = test_strip();
        link.fail_next_writes(3);

        strip.set_power(true).await.unwrap_err();
        assert!(!strip.state().power);
    }

    #[tokio::test(start_paused = true)]
    async fn hue_and_saturation_resolve_through_rgb() {
        let (strip, link) = test_strip();

        strip.set_saturation(100).await.unwrap();
        strip.set_hue(120).await.unwrap();

        let state = strip.state();
        assert_eq!(state.hue, 120);
        assert_eq!(state.saturation, 100);

        let (r, g, b) = hsl_to_rgb(120.0 / 360.0, 1.0, 0.5);
        assert_eq!((r, g, b), (0, 255, 0));
        let last = link.writes().last().cloned().unwrap();
        assert_eq!(
            last,
            LightCommand::Rgb { r, g, b }.encode().unwrap().to_vec()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn effect_and_speed_update_cache() {
        let (strip, _link) = test_strip();

        strip.set_effect(Effect::CrossfadeRgb).await.unwrap();
        strip.set_effect_speed(40).await.unwrap();

        let state = strip.state();
        assert_eq!(state.effect, Some(Effect::CrossfadeRgb));
        assert_eq!(state.effect_speed, Some(40));
    }
}
