//! Command frames understood by the strip firmware.
//! Every command encodes to a fixed nine-byte frame delimited by a
//! leading `0x7e` and a trailing `0xef` marker.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Length of every command frame.
pub const FRAME_LEN: usize = 9;

/// A fully encoded command frame.
pub type Frame = [u8; FRAME_LEN];

/// Leading marker byte of every frame.
pub const FRAME_HEAD: u8 = 0x7e;

/// Trailing marker byte of every frame.
pub const FRAME_TAIL: u8 = 0xef;

/// Commands that can be sent to the strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightCommand {
    /// Turn the strip on or off.
    Power(bool),
    /// Brightness percentage, 0-100.
    Brightness(u8),
    /// Static color.
    Rgb { r: u8, g: u8, b: u8 },
    /// Built-in animation mode.
    Effect(Effect),
    /// Animation speed percentage, 0-100.
    EffectSpeed(u8),
}

impl LightCommand {
    /// Encodes the command into its wire frame.
    ///
    /// Percentage-valued commands are rejected with [`Error::Parameter`]
    /// before anything reaches the transport.
    pub fn encode(self) -> Result<Frame> {
        match self {
            Self::Power(on) => {
                let payload: [u8; 3] = if on { [0xf0, 0x00, 0x01] } else { [0x00, 0x00, 0x00] };
                Ok([
                    FRAME_HEAD, 0x04, 0x04, payload[0], payload[1], payload[2], 0xff, 0x00,
                    FRAME_TAIL,
                ])
            }
            Self::Brightness(level) => {
                check_percent("brightness", level)?;
                Ok([FRAME_HEAD, 0x04, 0x01, level, 0x01, 0xff, 0xff, 0x00, FRAME_TAIL])
            }
            Self::Rgb { r, g, b } => Ok([FRAME_HEAD, 0x07, 0x05, 0x03, r, g, b, 0x10, FRAME_TAIL]),
            Self::Effect(effect) => Ok([
                FRAME_HEAD,
                0x00,
                0x03,
                0x03,
                effect.code(),
                0x03,
                0x00,
                0x00,
                FRAME_TAIL,
            ]),
            Self::EffectSpeed(speed) => {
                check_percent("effect speed", speed)?;
                Ok([FRAME_HEAD, 0x00, 0x02, 0x02, speed, 0x00, 0x00, 0x00, FRAME_TAIL])
            }
        }
    }
}

fn check_percent(what: &'static str, value: u8) -> Result<()> {
    if value > 100 {
        return Err(Error::Parameter {
            what,
            value: u32::from(value),
            range: "0-100",
        });
    }
    Ok(())
}

/// Built-in animation modes and their firmware codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Effect {
    JumpRgb = 0x87,
    JumpRgbycmw = 0x88,
    CrossfadeRed = 0x8b,
    CrossfadeGreen = 0x8c,
    CrossfadeBlue = 0x8d,
    CrossfadeYellow = 0x8e,
    CrossfadeCyan = 0x8f,
    CrossfadeMagenta = 0x90,
    CrossfadeWhite = 0x91,
    CrossfadeRg = 0x92,
    CrossfadeRb = 0x93,
    CrossfadeGb = 0x94,
    CrossfadeRgb = 0x89,
    CrossfadeRgbycmw = 0x8a,
    BlinkRed = 0x96,
    BlinkGreen = 0x97,
    BlinkBlue = 0x98,
    BlinkYellow = 0x99,
    BlinkCyan = 0x9a,
    BlinkMagenta = 0x9b,
    BlinkWhite = 0x9c,
    BlinkRgbycmw = 0x95,
}

impl Effect {
    /// Every supported mode.
    pub const ALL: [Effect; 22] = [
        Effect::JumpRgb,
        Effect::JumpRgbycmw,
        Effect::CrossfadeRed,
        Effect::CrossfadeGreen,
        Effect::CrossfadeBlue,
        Effect::CrossfadeYellow,
        Effect::CrossfadeCyan,
        Effect::CrossfadeMagenta,
        Effect::CrossfadeWhite,
        Effect::CrossfadeRg,
        Effect::CrossfadeRb,
        Effect::CrossfadeGb,
        Effect::CrossfadeRgb,
        Effect::CrossfadeRgbycmw,
        Effect::BlinkRed,
        Effect::BlinkGreen,
        Effect::BlinkBlue,
        Effect::BlinkYellow,
        Effect::BlinkCyan,
        Effect::BlinkMagenta,
        Effect::BlinkWhite,
        Effect::BlinkRgbycmw,
    ];

    /// Firmware code for this mode.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Looks a mode up by its firmware code.
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|effect| effect.code() == code)
    }

    /// Canonical name of the mode.
    pub fn name(self) -> &'static str {
        match self {
            Self::JumpRgb => "JUMP_RGB",
            Self::JumpRgbycmw => "JUMP_RGBYCMW",
            Self::CrossfadeRed => "CROSSFADE_RED",
            Self::CrossfadeGreen => "CROSSFADE_GREEN",
            Self::CrossfadeBlue => "CROSSFADE_BLUE",
            Self::CrossfadeYellow => "CROSSFADE_YELLOW",
            Self::CrossfadeCyan => "CROSSFADE_CYAN",
            Self::CrossfadeMagenta => "CROSSFADE_MAGENTA",
            Self::CrossfadeWhite => "CROSSFADE_WHITE",
            Self::CrossfadeRg => "CROSSFADE_RG",
            Self::CrossfadeRb => "CROSSFADE_RB",
            Self::CrossfadeGb => "CROSSFADE_GB",
            Self::CrossfadeRgb => "CROSSFADE_RGB",
            Self::CrossfadeRgbycmw => "CROSSFADE_RGBYCMW",
            Self::BlinkRed => "BLINK_RED",
            Self::BlinkGreen => "BLINK_GREEN",
            Self::BlinkBlue => "BLINK_BLUE",
            Self::BlinkYellow => "BLINK_YELLOW",
            Self::BlinkCyan => "BLINK_CYAN",
            Self::BlinkMagenta => "BLINK_MAGENTA",
            Self::BlinkWhite => "BLINK_WHITE",
            Self::BlinkRgbycmw => "BLINK_RGBYCMW",
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Effect {
    type Err = Error;

    /// Parses a mode name such as `CROSSFADE_RED`. Matching is
    /// case-insensitive and treats `-` and `_` as interchangeable.
    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_uppercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|effect| effect.name() == wanted)
            .ok_or_else(|| Error::UnknownEffect(s.to_string()))
    }
}
