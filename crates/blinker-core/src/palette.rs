// Blink and default colors for RGB and RGBW strips.

use blinker_api::Color;

/// The fixed colors the controller drives the strip with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    /// Short-press pattern: alternates `blue` and `white`.
    pub blue: Color,
    pub white: Color,
    /// Long-press pattern: alternates `red` and `off`.
    pub red: Color,
    pub off: Color,
}

impl Palette {
    /// Four-channel strips drive the dedicated white LED instead of mixing.
    pub const RGBW: Self = Self {
        blue: Color::rgbw(0, 0, 255, 0),
        white: Color::rgbw(0, 0, 0, 255),
        red: Color::rgbw(255, 0, 0, 0),
        off: Color::rgbw(0, 0, 0, 0),
    };

    pub const RGB: Self = Self {
        blue: Color::rgb(0, 0, 255),
        white: Color::rgb(255, 255, 255),
        red: Color::rgb(255, 0, 0),
        off: Color::rgb(0, 0, 0),
    };

    pub fn for_strip(rgbw: bool) -> Self {
        if rgbw { Self::RGBW } else { Self::RGB }
    }

    /// `(color, brightness)` pairs for the short pattern.
    pub fn short_pattern(&self, brightness: u8) -> [(Color, u8); 2] {
        [(self.blue, brightness), (self.white, brightness)]
    }

    /// `(color, brightness)` pairs for the long pattern. "Off" is sent at
    /// zero brightness.
    pub fn long_pattern(&self, brightness: u8) -> [(Color, u8); 2] {
        [(self.red, brightness), (self.off, 0)]
    }
}
