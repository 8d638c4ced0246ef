use serde::{Deserialize, Serialize};

/// RGBA color with every channel expressed in the `0..=255` range.
///
/// Channels are plain floats and are never clamped, so values outside the
/// range survive until they are converted for the graphics backend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    r: f32,
    g: f32,
    b: f32,
    #[serde(default = "opaque")]
    a: f32,
}

impl Default for Color {
    fn default() -> Self {
        Self::rgba(255.0, 255.0, 255.0, 255.0)
    }
}

impl Color {
    pub const OPAQUE: f32 = 255.0;

    /// Creates an opaque color.
    pub const fn new(red: f32, green: f32, blue: f32) -> Self {
        Self::rgba(red, green, blue, Self::OPAQUE)
    }

    pub const fn rgba(red: f32, green: f32, blue: f32, alpha: f32) -> Self {
        Self {
            r: red,
            g: green,
            b: blue,
            a: alpha,
        }
    }

    /// Replaces all four channels.
    pub fn set(&mut self, red: f32, green: f32, blue: f32, alpha: f32) {
        *self = Self::rgba(red, green, blue, alpha);
    }

    pub fn red(&self) -> f32 {
        self.r
    }

    pub fn green(&self) -> f32 {
        self.g
    }

    pub fn blue(&self) -> f32 {
        self.b
    }

    pub fn alpha(&self) -> f32 {
        self.a
    }

    /// Converts to the `0.0..=1.0` convention expected by the backend.
    pub fn to_normalized(self) -> [f32; 4] {
        [
            self.r / 255.0,
            self.g / 255.0,
            self.b / 255.0,
            self.a / 255.0,
        ]
    }
}

fn opaque() -> f32 {
    Color::OPAQUE
}
