use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

// ---------------------------------------------------------------------------
// Ozone colour: the column layer fill
// ---------------------------------------------------------------------------

/// Fill colour for an ozone value: `[o3 * 3, 200 - o3 * 2, 100]`, each
/// channel clamped to `0..=255`. Low ozone is green, high ozone is red.
pub fn ozone_color(o3: f64) -> Color32 {
    let channel = |v: f64| v.round().clamp(0.0, 255.0) as u8;
    Color32::from_rgb(channel(o3 * 3.0), channel(200.0 - o3 * 2.0), 100)
}

// ---------------------------------------------------------------------------
// Density ramp: the hexagon layer fill
// ---------------------------------------------------------------------------

/// Colour for a bin holding `count` records when the densest bin holds `max`.
/// Hue runs from yellow (sparse) to red (densest).
pub fn density_color(count: usize, max: usize) -> Color32 {
    let t = if max == 0 {
        0.0
    } else {
        (count as f32 / max as f32).clamp(0.0, 1.0)
    };
    let hue = 60.0 * (1.0 - t);
    let hsl = Hsl::new(hue, 0.85, 0.55 - 0.15 * t);
    let rgb: Srgb = hsl.into_color();
    Color32::from_rgb(
        (rgb.red * 255.0) as u8,
        (rgb.green * 255.0) as u8,
        (rgb.blue * 255.0) as u8,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ozone_color_follows_formula_and_clamps() {
        assert_eq!(ozone_color(0.0), Color32::from_rgb(0, 200, 100));
        assert_eq!(ozone_color(40.0), Color32::from_rgb(120, 120, 100));
        assert_eq!(ozone_color(120.0), Color32::from_rgb(255, 0, 100));
        assert_eq!(ozone_color(-10.0), Color32::from_rgb(0, 220, 100));
    }

    #[test]
    fn density_ramp_goes_yellow_to_red() {
        let sparse = density_color(0, 10);
        let dense = density_color(10, 10);
        assert!(sparse.g() > 150, "{sparse:?}");
        assert!(dense.r() > 150 && dense.g() < 30, "{dense:?}");
        assert_eq!(density_color(3, 0), sparse);
    }
}
