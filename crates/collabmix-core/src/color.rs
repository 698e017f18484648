//! Track colors and color assignment.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{MixError, Result};

/// 8-bit RGB color used as a track's background.
///
/// Serializes as a `#RRGGBB` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TrackColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl TrackColor {
    /// Create a color from RGB components.
    #[inline]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Format as `#RRGGBB`.
    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    /// Parse `#RRGGBB` or `RRGGBB`.
    pub fn from_hex(s: &str) -> Result<Self> {
        let digits = s.strip_prefix('#').unwrap_or(s);
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(MixError::InvalidParameter(format!(
                "expected a #RRGGBB color, got {s:?}"
            )));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&digits[range], 16)
                .map_err(|e| MixError::InvalidParameter(format!("bad color {s:?}: {e}")))
        };
        Ok(Self {
            r: channel(0..2)?,
            g: channel(2..4)?,
            b: channel(4..6)?,
        })
    }

    // Default palette
    pub const CORAL: Self = Self::rgb(0xFF, 0x6B, 0x6B);
    pub const AMBER: Self = Self::rgb(0xFF, 0xB3, 0x47);
    pub const LIME: Self = Self::rgb(0xA3, 0xD9, 0x4E);
    pub const TEAL: Self = Self::rgb(0x2E, 0xC4, 0xB6);
    pub const SKY: Self = Self::rgb(0x4D, 0xA8, 0xDA);
    pub const INDIGO: Self = Self::rgb(0x5C, 0x6B, 0xC0);
    pub const ORCHID: Self = Self::rgb(0xB5, 0x65, 0xD8);
    pub const ROSE: Self = Self::rgb(0xE8, 0x5D, 0x9C);
}

impl fmt::Display for TrackColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl TryFrom<String> for TrackColor {
    type Error = MixError;

    fn try_from(value: String) -> Result<Self> {
        Self::from_hex(&value)
    }
}

impl From<TrackColor> for String {
    fn from(color: TrackColor) -> Self {
        color.to_hex()
    }
}

/// The palette new sessions draw from.
pub const DEFAULT_PALETTE: [TrackColor; 8] = [
    TrackColor::CORAL,
    TrackColor::AMBER,
    TrackColor::LIME,
    TrackColor::TEAL,
    TrackColor::SKY,
    TrackColor::INDIGO,
    TrackColor::ORCHID,
    TrackColor::ROSE,
];

/// How a new track gets its color.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "colors")]
pub enum ColorScheme {
    /// Uniform choice from a fixed palette. Colors may repeat across tracks.
    Palette(Vec<TrackColor>),
    /// Every hex digit drawn uniformly, giving any `#RRGGBB`.
    RandomHex,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self::Palette(DEFAULT_PALETTE.to_vec())
    }
}

impl ColorScheme {
    /// Draw a color for a new track.
    ///
    /// An empty palette falls back to random hex; `MixConfig::validate`
    /// rejects that configuration up front.
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> TrackColor {
        match self {
            Self::Palette(colors) if !colors.is_empty() => {
                colors[rng.random_range(0..colors.len())]
            }
            _ => {
                let mut channel = || {
                    let hi: u8 = rng.random_range(0..16);
                    let lo: u8 = rng.random_range(0..16);
                    hi * 16 + lo
                };
                TrackColor::rgb(channel(), channel(), channel())
            }
        }
    }
}
