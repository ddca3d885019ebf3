// WLED JSON API wire types
//
// Only the fields the controller depends on are modelled. Unknown fields
// in responses are ignored so newer firmware keeps working.

use serde::{Deserialize, Serialize};

/// A segment color as WLED encodes it: `[r, g, b]` or `[r, g, b, w]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Color {
    Rgb([u8; 3]),
    Rgbw([u8; 4]),
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::Rgb([r, g, b])
    }

    pub const fn rgbw(r: u8, g: u8, b: u8, w: u8) -> Self {
        Self::Rgbw([r, g, b, w])
    }

    /// Returns `true` if every channel is zero.
    pub fn is_off(&self) -> bool {
        match self {
            Self::Rgb(c) => c.iter().all(|v| *v == 0),
            Self::Rgbw(c) => c.iter().all(|v| *v == 0),
        }
    }
}

/// Response body of `GET /json/info`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeviceInfo {
    pub name: String,
    /// Firmware version string.
    pub ver: String,
    pub leds: LedInfo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct LedInfo {
    pub count: u32,
}

/// Response body of `GET /json` (aggregate status). Only the effect
/// catalog is read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub effects: Vec<String>,
}

/// Body of `POST /json/state`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatePayload {
    pub on: bool,
    /// Master brightness, 0-255.
    pub bri: u8,
    /// Transition time in milliseconds.
    pub transition: u32,
    pub seg: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub id: u8,
    /// Primary / secondary colors. Omitted when selecting an effect so the
    /// device keeps its current palette.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub col: Option<Vec<Color>>,
    /// Effect index (0 = solid).
    pub fx: u16,
    /// Effect speed.
    pub sx: u8,
    /// Effect intensity.
    pub ix: u8,
}

impl StatePayload {
    /// A solid color on segment 0.
    pub fn solid(color: Color, brightness: u8, transition_ms: u32) -> Self {
        Self {
            on: true,
            bri: brightness,
            transition: transition_ms,
            seg: vec![Segment {
                id: 0,
                col: Some(vec![color]),
                fx: 0,
                sx: 0,
                ix: 0,
            }],
        }
    }

    /// Select effect `fx` on segment 0 without touching its colors.
    pub fn effect(fx: u16, speed: u8, intensity: u8, brightness: u8, transition_ms: u32) -> Self {
        Self {
            on: true,
            bri: brightness,
            transition: transition_ms,
            seg: vec![Segment {
                id: 0,
                col: None,
                fx,
                sx: speed,
                ix: intensity,
            }],
        }
    }

    /// The first color of segment 0, if any.
    pub fn primary_color(&self) -> Option<Color> {
        self.seg
            .first()
            .and_then(|s| s.col.as_ref())
            .and_then(|c| c.first().copied())
    }
}
