use std::fmt;
use std::str::FromStr;

use image::Rgba;

use crate::error::{MatchError, MatchResult};

/// Top-left coordinate of a template-sized window in source image space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

impl Point {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// A raw, unmerged detection as produced by the extractor.
pub type MatchCandidate = Point;

/// A merged detection. Same shape as a candidate; the coordinate is the
/// floored mean of its group.
pub type Match = Point;

/// Width and height shared by every box in a detection pass (the template size).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BoxSize {
    pub width: u32,
    pub height: u32,
}

impl BoxSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn of<I: image::GenericImageView>(image: &I) -> Self {
        let (width, height) = image.dimensions();
        Self { width, height }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn size(&self) -> BoxSize {
        BoxSize::new(self.width, self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.size().is_empty()
    }
}

/// An RGBA color picked by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn channels(&self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::rgb(255, 0, 0)
    }
}

impl From<Color> for Rgba<u8> {
    fn from(color: Color) -> Self {
        Rgba(color.channels())
    }
}

/// Parses `#RRGGBB`. Alpha is always 255.
impl FromStr for Color {
    type Err = MatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || MatchError::MalformedColor(s.to_string());

        let hex = s.strip_prefix('#').ok_or_else(malformed)?;
        if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(malformed());
        }

        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|_| malformed())
        };
        Ok(Self::rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Blend weight of the recolor, in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Opacity(f64);

impl Opacity {
    pub const TRANSPARENT: Opacity = Opacity(0.0);
    pub const OPAQUE: Opacity = Opacity(1.0);

    pub fn new(value: f64) -> MatchResult<Self> {
        if !(0.0..=1.0).contains(&value) {
            return Err(MatchError::InvalidOpacity(value));
        }
        Ok(Self(value))
    }

    /// Slider value in `[0, 100]`.
    pub fn from_percent(percent: u32) -> MatchResult<Self> {
        if percent > 100 {
            return Err(MatchError::InvalidOpacityPercent(percent));
        }
        Ok(Self(percent as f64 / 100.0))
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl Default for Opacity {
    fn default() -> Self {
        Self(0.5)
    }
}
