//! Color helpers and palettes.
//!
//! Colors are `Vec3` RGB triples in `0.0..=1.0`, matching the renderer's
//! instance layout.

use crate::seed::SimRng;
use glam::Vec3;
use rand::Rng;

/// Color palette used for spawning and recoloring particles.
///
/// Each palette is five evenly spaced stops; [`Palette::sample`]
/// interpolates between them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Palette {
    /// Deep blues through violet to white.
    #[default]
    Cosmic,
    /// Black through red, orange, yellow, white.
    Fire,
    /// White through light blue to deep blue.
    Ice,
    /// Vibrant pink, cyan, purple.
    Neon,
    /// Natural greens and browns.
    Forest,
    /// Classic rainbow gradient.
    Rainbow,
    /// Black to white.
    Grayscale,
}

impl Palette {
    /// All palettes in catalog order.
    pub const ALL: [Palette; 7] = [
        Palette::Cosmic,
        Palette::Fire,
        Palette::Ice,
        Palette::Neon,
        Palette::Forest,
        Palette::Rainbow,
        Palette::Grayscale,
    ];

    /// Resolve a palette by its lowercase name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "cosmic" => Some(Palette::Cosmic),
            "fire" => Some(Palette::Fire),
            "ice" => Some(Palette::Ice),
            "neon" => Some(Palette::Neon),
            "forest" => Some(Palette::Forest),
            "rainbow" => Some(Palette::Rainbow),
            "grayscale" => Some(Palette::Grayscale),
            _ => None,
        }
    }

    /// Lowercase name used in profiles.
    pub fn name(&self) -> &'static str {
        match self {
            Palette::Cosmic => "cosmic",
            Palette::Fire => "fire",
            Palette::Ice => "ice",
            Palette::Neon => "neon",
            Palette::Forest => "forest",
            Palette::Rainbow => "rainbow",
            Palette::Grayscale => "grayscale",
        }
    }

    /// Get the palette's color stops.
    pub fn colors(&self) -> [Vec3; 5] {
        match self {
            Palette::Cosmic => [
                Vec3::new(0.05, 0.08, 0.35), // Midnight
                Vec3::new(0.20, 0.25, 0.75), // Blue
                Vec3::new(0.50, 0.30, 0.85), // Violet
                Vec3::new(0.85, 0.55, 0.95), // Orchid
                Vec3::new(1.00, 0.98, 1.00), // Starlight
            ],
            Palette::Fire => [
                Vec3::new(0.10, 0.00, 0.00),
                Vec3::new(0.60, 0.05, 0.00),
                Vec3::new(0.95, 0.35, 0.00),
                Vec3::new(1.00, 0.75, 0.10),
                Vec3::new(1.00, 1.00, 0.85),
            ],
            Palette::Ice => [
                Vec3::new(1.00, 1.00, 1.00),
                Vec3::new(0.75, 0.90, 1.00),
                Vec3::new(0.45, 0.70, 0.95),
                Vec3::new(0.20, 0.45, 0.85),
                Vec3::new(0.05, 0.15, 0.55),
            ],
            Palette::Neon => [
                Vec3::new(1.00, 0.10, 0.60), // Hot pink
                Vec3::new(0.60, 0.10, 1.00), // Purple
                Vec3::new(0.10, 0.90, 1.00), // Cyan
                Vec3::new(0.20, 1.00, 0.40), // Lime
                Vec3::new(1.00, 0.95, 0.20), // Yellow
            ],
            Palette::Forest => [
                Vec3::new(0.15, 0.30, 0.10),
                Vec3::new(0.25, 0.50, 0.15),
                Vec3::new(0.45, 0.65, 0.25),
                Vec3::new(0.55, 0.45, 0.25),
                Vec3::new(0.40, 0.28, 0.15),
            ],
            Palette::Rainbow => [
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(1.0, 0.8, 0.0),
                Vec3::new(0.0, 1.0, 0.2),
                Vec3::new(0.0, 0.5, 1.0),
                Vec3::new(0.6, 0.0, 1.0),
            ],
            Palette::Grayscale => [
                Vec3::splat(0.0),
                Vec3::splat(0.25),
                Vec3::splat(0.5),
                Vec3::splat(0.75),
                Vec3::splat(1.0),
            ],
        }
    }

    /// Interpolated color at `t` in `0.0..=1.0` (clamped).
    pub fn sample(&self, t: f32) -> Vec3 {
        let stops = self.colors();
        let scaled = t.clamp(0.0, 1.0) * (stops.len() - 1) as f32;
        let i = (scaled.floor() as usize).min(stops.len() - 2);
        let frac = scaled - i as f32;
        stops[i].lerp(stops[i + 1], frac)
    }

    /// A random color along the palette.
    pub fn random(&self, rng: &mut SimRng) -> Vec3 {
        self.sample(rng.gen())
    }
}

/// Convert HSV (all components in `0..1`, hue wraps) to RGB.
pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> Vec3 {
    let h = h.rem_euclid(1.0) * 6.0;
    let s = s.clamp(0.0, 1.0);
    let v = v.clamp(0.0, 1.0);
    let c = v * s;
    let x = c * (1.0 - ((h % 2.0) - 1.0).abs());
    let m = v - c;
    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    Vec3::new(r + m, g + m, b + m)
}

/// Perceived luminance of an RGB color.
pub fn luminance(c: Vec3) -> f32 {
    c.dot(Vec3::new(0.299, 0.587, 0.114))
}

/// Move `c` toward gray by `amount` in `0..=1`.
pub fn desaturate(c: Vec3, amount: f32) -> Vec3 {
    c.lerp(Vec3::splat(luminance(c)), amount.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_endpoints() {
        for palette in Palette::ALL {
            let stops = palette.colors();
            assert!((palette.sample(0.0) - stops[0]).length() < 1e-6);
            assert!((palette.sample(1.0) - stops[4]).length() < 1e-6);
        }
    }

    #[test]
    fn test_palette_names_roundtrip() {
        for palette in Palette::ALL {
            assert_eq!(Palette::from_name(palette.name()), Some(palette));
        }
        assert_eq!(Palette::from_name("plaid"), None);
    }

    #[test]
    fn test_hsv_primaries() {
        assert!((hsv_to_rgb(0.0, 1.0, 1.0) - Vec3::new(1.0, 0.0, 0.0)).length() < 1e-5);
        assert!((hsv_to_rgb(1.0 / 3.0, 1.0, 1.0) - Vec3::new(0.0, 1.0, 0.0)).length() < 1e-5);
        assert!((hsv_to_rgb(2.0 / 3.0, 1.0, 1.0) - Vec3::new(0.0, 0.0, 1.0)).length() < 1e-5);
        // Hue wraps
        assert!((hsv_to_rgb(1.0, 1.0, 1.0) - hsv_to_rgb(0.0, 1.0, 1.0)).length() < 1e-5);
    }

    #[test]
    fn test_desaturate_full() {
        let gray = desaturate(Vec3::new(1.0, 0.0, 0.0), 1.0);
        assert!((gray.x - gray.y).abs() < 1e-6);
        assert!((gray.y - gray.z).abs() < 1e-6);
    }
}
