use geo_types::Coord;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentColor {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl SegmentColor {
    pub const BLACK: SegmentColor = SegmentColor::rgb(0, 0, 0);
    pub const BLUE: SegmentColor = SegmentColor::rgb(0, 0, 255);

    pub const fn rgb(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    /// Parses `#rrggbb`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#')?;
        if digits.len() != 6 || !digits.is_ascii() {
            return None;
        }

        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&digits[range], 16).ok();
        Some(Self::rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.red, self.green, self.blue)
    }
}

impl Default for SegmentColor {
    fn default() -> Self {
        Self::BLUE
    }
}

/// A piece of the drawn route between two consecutive accepted samples.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteSegment {
    pub start: Coord,
    pub end: Coord,
    pub color: SegmentColor,
}

/// Visible map area, given as a center and a span in meters along each axis.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapRegion {
    pub center: Coord,
    pub latitudinal_meters: f64,
    pub longitudinal_meters: f64,
}

impl MapRegion {
    pub fn square(center: Coord, span_meters: f64) -> Self {
        Self {
            center,
            latitudinal_meters: span_meters,
            longitudinal_meters: span_meters,
        }
    }
}

#[test]
fn parse_hex_color() {
    assert_eq!(SegmentColor::from_hex("#0000ff"), Some(SegmentColor::BLUE));
    assert_eq!(SegmentColor::from_hex("#FF8000"), Some(SegmentColor::rgb(255, 128, 0)));
    assert_eq!(SegmentColor::from_hex("0000ff"), None);
    assert_eq!(SegmentColor::from_hex("#00ff"), None);
    assert_eq!(SegmentColor::from_hex("#gg0000"), None);
    assert_eq!(SegmentColor::rgb(255, 128, 0).to_hex(), "#ff8000");
}
