// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use image::Rgba;

/// Color type for visualization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color(pub u8, pub u8, pub u8);

impl Color {
    /// Red color.
    pub const RED: Color = Color(255, 0, 0);
    /// Blue color.
    pub const BLUE: Color = Color(0, 0, 255);

    /// Create a new color from RGB values.
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self(r, g, b)
    }

    /// RGBA pixel with the given opacity (0.0 to 1.0).
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn with_alpha(self, alpha: f32) -> Rgba<u8> {
        let a = (alpha.clamp(0.0, 1.0) * 255.0).round() as u8;
        Rgba([self.0, self.1, self.2, a])
    }
}
