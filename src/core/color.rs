//! HSL to RGB conversion used by the hue/saturation command path.

/// Converts an HSL triple, every component in `[0, 1]`, to 8-bit RGB.
///
/// Saturation zero short-circuits to the achromatic gray for the given
/// lightness. Channels are rounded half away from zero.
pub fn hsl_to_rgb(hue: f64, saturation: f64, lightness: f64) -> (u8, u8, u8) {
    if saturation == 0.0 {
        let gray = (lightness * 255.0).round() as u8;
        return (gray, gray, gray);
    }

    let q = if lightness < 0.5 {
        lightness * (1.0 + saturation)
    } else {
        lightness + saturation - lightness * saturation
    };
    let p = 2.0 * lightness - q;

    let r = hue_to_channel(p, q, hue + 1.0 / 3.0);
    let g = hue_to_channel(p, q, hue);
    let b = hue_to_channel(p, q, hue - 1.0 / 3.0);

    (
        (r * 255.0).round() as u8,
        (g * 255.0).round() as u8,
        (b * 255.0).round() as u8,
    )
}

fn hue_to_channel(p: f64, q: f64, t: f64) -> f64 {
    let mut t = t;
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }
    if t < 1.0 / 6.0 {
        return p + (q - p) * 6.0 * t;
    }
    if t < 1.0 / 2.0 {
        return q;
    }
    if t < 2.0 / 3.0 {
        return p + (q - p) * (2.0 / 3.0 - t) * 6.0;
    }
    p
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn achromatic_inputs_produce_gray() {
        assert_eq!(hsl_to_rgb(0.0, 0.0, 0.0), (0, 0, 0));
        assert_eq!(hsl_to_rgb(0.7, 0.0, 1.0), (255, 255, 255));
        // 0.5 * 255 = 127.5 rounds away from zero
        assert_eq!(hsl_to_rgb(0.3, 0.0, 0.5), (128, 128, 128));
    }

    #[test]
    fn primary_hues_hit_full_channels() {
        assert_eq!(hsl_to_rgb(0.0, 1.0, 0.5), (255, 0, 0));
        assert_eq!(hsl_to_rgb(1.0 / 3.0, 1.0, 0.5), (0, 255, 0));
        assert_eq!(hsl_to_rgb(2.0 / 3.0, 1.0, 0.5), (0, 0, 255));
        // Hue wraps: 1.0 is red again
        assert_eq!(hsl_to_rgb(1.0, 1.0, 0.5), (255, 0, 0));
    }

    #[test]
    fn secondary_hues() {
        assert_eq!(hsl_to_rgb(0.5, 1.0, 0.5), (0, 255, 255));
        assert_eq!(hsl_to_rgb(1.0 / 6.0, 1.0, 0.5), (255, 255, 0));
    }

    #[test]
    fn lightness_scales_toward_white() {
        let (r, g, b) = hsl_to_rgb(0.0, 1.0, 0.75);
        assert_eq!(r, 255);
        assert_eq!(g, b);
        assert!(g > 0);
    }
}
