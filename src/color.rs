use std::collections::BTreeMap;

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Golden-angle hue step: colour `i` never changes when more are requested,
/// so appending a derived column keeps the existing series colours.
const HUE_STEP: f32 = 137.508;

/// Generates `n` visually distinct colours.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    (0..n)
        .map(|i| {
            let hue = (i as f32 * HUE_STEP) % 360.0;
            let hsl = Hsl::new(hue, 0.70, 0.55);
            let rgb: Srgb = hsl.into_color();
            Color32::from_rgb(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Color mapping: column name → Color32
// ---------------------------------------------------------------------------

/// Maps the plotted columns of a table to distinct colours, by position.
#[derive(Debug, Clone)]
pub struct ColorMap {
    mapping: BTreeMap<String, Color32>,
    default_color: Color32,
}

impl ColorMap {
    pub fn new(columns: &[String]) -> Self {
        let mapping = columns
            .iter()
            .cloned()
            .zip(generate_palette(columns.len()))
            .collect();

        ColorMap {
            mapping,
            default_color: Color32::LIGHT_BLUE,
        }
    }

    pub fn color_for(&self, column: &str) -> Color32 {
        self.mapping
            .get(column)
            .copied()
            .unwrap_or(self.default_color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_prefix_is_stable() {
        let small = generate_palette(3);
        let large = generate_palette(8);
        assert_eq!(&large[..3], &small[..]);
    }

    #[test]
    fn unknown_column_gets_default() {
        let map = ColorMap::new(&["a".to_string()]);
        assert_eq!(map.color_for("zzz"), Color32::LIGHT_BLUE);
        assert_ne!(map.color_for("a"), Color32::LIGHT_BLUE);
    }
}
