use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_rgba(self, alpha: u8) -> [u8; 4] {
        [self.r, self.g, self.b, alpha]
    }
}

/// Piecewise-linear gradient over evenly spaced stops.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColorScale {
    pub name: &'static str,
    stops: &'static [Color],
}

const INFERNO: &[Color] = &[
    Color::rgb(0, 0, 4),
    Color::rgb(31, 12, 72),
    Color::rgb(85, 15, 109),
    Color::rgb(136, 34, 106),
    Color::rgb(186, 54, 85),
    Color::rgb(227, 89, 51),
    Color::rgb(249, 140, 10),
    Color::rgb(249, 201, 50),
    Color::rgb(252, 255, 164),
];

const MAGMA: &[Color] = &[
    Color::rgb(0, 0, 4),
    Color::rgb(28, 16, 68),
    Color::rgb(79, 18, 123),
    Color::rgb(129, 37, 129),
    Color::rgb(181, 54, 122),
    Color::rgb(229, 80, 100),
    Color::rgb(251, 135, 97),
    Color::rgb(254, 194, 135),
    Color::rgb(252, 253, 191),
];

const GRAYSCALE: &[Color] = &[Color::rgb(0, 0, 0), Color::rgb(255, 255, 255)];

impl ColorScale {
    pub const INFERNO: ColorScale = ColorScale { name: "inferno", stops: INFERNO };
    pub const MAGMA: ColorScale = ColorScale { name: "magma", stops: MAGMA };
    pub const GRAYSCALE: ColorScale = ColorScale { name: "grayscale", stops: GRAYSCALE };

    pub const ALL: [ColorScale; 3] = [Self::INFERNO, Self::MAGMA, Self::GRAYSCALE];

    pub fn by_name(name: &str) -> Option<ColorScale> {
        Self::ALL
            .into_iter()
            .find(|s| s.name.eq_ignore_ascii_case(name.trim()))
    }

    /// Resolve `name`, falling back to `default` with a warning.
    pub fn by_name_or(name: &str, default: ColorScale) -> ColorScale {
        Self::by_name(name).unwrap_or_else(|| {
            log::warn!("Unknown color scale '{}', using {}", name, default.name);
            default
        })
    }

    /// Map `t` in 0.0-1.0 to a color. Out-of-range input is clamped.
    pub fn color(&self, t: f32) -> Color {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let segments = self.stops.len() - 1;
        let pos = t * segments as f32;
        let idx = (pos.floor() as usize).min(segments - 1);
        let frac = pos - idx as f32;

        let (a, b) = (self.stops[idx], self.stops[idx + 1]);
        let lerp = |x: u8, y: u8| (x as f32 + (y as f32 - x as f32) * frac).round() as u8;
        Color::rgb(lerp(a.r, b.r), lerp(a.g, b.g), lerp(a.b, b.b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_hit_first_and_last_stop() {
        for scale in ColorScale::ALL {
            assert_eq!(scale.color(0.0), scale.stops[0]);
            assert_eq!(scale.color(1.0), *scale.stops.last().unwrap());
        }
    }

    #[test]
    fn grayscale_interpolates_linearly() {
        assert_eq!(ColorScale::GRAYSCALE.color(0.5), Color::rgb(128, 128, 128));
    }

    #[test]
    fn out_of_range_input_is_clamped() {
        let s = ColorScale::INFERNO;
        assert_eq!(s.color(-2.0), s.color(0.0));
        assert_eq!(s.color(7.0), s.color(1.0));
        assert_eq!(s.color(f32::NAN), s.color(0.0));
    }

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(ColorScale::by_name("Magma"), Some(ColorScale::MAGMA));
        assert_eq!(ColorScale::by_name("jet"), None);
        assert_eq!(
            ColorScale::by_name_or("jet", ColorScale::INFERNO),
            ColorScale::INFERNO
        );
    }
}
