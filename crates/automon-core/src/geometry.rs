//! Canonical-resolution geometry and device scaling

use serde::{Deserialize, Serialize};

/// Working width all frames are normalized to.
pub const CANONICAL_WIDTH: u32 = 1280;
/// Working height all frames are normalized to.
pub const CANONICAL_HEIGHT: u32 = 720;

/// Axis-aligned pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Screen point, serialized as an `[x, y]` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "(i32, i32)", into = "(i32, i32)")]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl From<(i32, i32)> for Point {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

impl From<Point> for (i32, i32) {
    fn from(p: Point) -> Self {
        (p.x, p.y)
    }
}

/// Device orientation as reported by the frame source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Portrait,
    #[default]
    Landscape,
}

/// Mapping between a device-native resolution and the canonical working
/// resolution, with independent horizontal and vertical ratios.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceScale {
    native: (u32, u32),
    canonical: (u32, u32),
    ratio_x: f64,
    ratio_y: f64,
}

impl DeviceScale {
    /// Scale of a device already running at 1280×720.
    pub fn identity() -> Self {
        Self {
            native: (CANONICAL_WIDTH, CANONICAL_HEIGHT),
            canonical: (CANONICAL_WIDTH, CANONICAL_HEIGHT),
            ratio_x: 1.0,
            ratio_y: 1.0,
        }
    }

    /// Derive the scale for a device-native `width`×`height`.
    ///
    /// The short side is pinned to 720 and the long side keeps the device
    /// aspect ratio, so a 1920×1080 device works at 1280×720 and a 2400×1080
    /// one at 1600×720. Portrait frames get the transposed canonical size.
    pub fn for_resolution(width: u32, height: u32) -> Self {
        if (width, height) == (CANONICAL_WIDTH, CANONICAL_HEIGHT) || width == 0 || height == 0 {
            return Self::identity();
        }

        let (long, short) = (width.max(height), width.min(height));
        let scaled_long = (CANONICAL_HEIGHT as u64 * long as u64 / short as u64) as u32;
        let canonical = if height > width {
            (CANONICAL_HEIGHT, scaled_long)
        } else {
            (scaled_long, CANONICAL_HEIGHT)
        };

        Self {
            native: (width, height),
            canonical,
            ratio_x: width as f64 / canonical.0 as f64,
            ratio_y: height as f64 / canonical.1 as f64,
        }
    }

    pub fn native(&self) -> (u32, u32) {
        self.native
    }

    pub fn canonical(&self) -> (u32, u32) {
        self.canonical
    }

    pub fn ratios(&self) -> (f64, f64) {
        (self.ratio_x, self.ratio_y)
    }

    pub fn is_resized(&self) -> bool {
        self.native != self.canonical
    }

    /// Canonical x to device x, truncating.
    pub fn scale_x(&self, x: i32) -> i32 {
        if self.is_resized() {
            (x as f64 * self.ratio_x) as i32
        } else {
            x
        }
    }

    /// Canonical y to device y, truncating.
    pub fn scale_y(&self, y: i32) -> i32 {
        if self.is_resized() {
            (y as f64 * self.ratio_y) as i32
        } else {
            y
        }
    }

    /// Device point back to canonical coordinates, for drawing on frames.
    pub fn unscale(&self, x: i32, y: i32) -> (i32, i32) {
        if self.is_resized() {
            ((x as f64 / self.ratio_x) as i32, (y as f64 / self.ratio_y) as i32)
        } else {
            (x, y)
        }
    }
}

impl Default for DeviceScale {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_scale() {
        let scale = DeviceScale::for_resolution(1280, 720);
        assert!(!scale.is_resized());
        assert_eq!(scale.scale_x(100), 100);
        assert_eq!(scale.scale_y(77), 77);
    }

    #[test]
    fn test_full_hd_scale() {
        let scale = DeviceScale::for_resolution(1920, 1080);
        assert_eq!(scale.canonical(), (1280, 720));
        assert_eq!(scale.scale_x(640), 960);
        assert_eq!(scale.scale_y(360), 540);
    }

    #[test]
    fn test_wide_device_keeps_aspect() {
        let scale = DeviceScale::for_resolution(2400, 1080);
        assert_eq!(scale.canonical(), (1600, 720));
        assert_eq!(scale.scale_x(100), 150);
        assert_eq!(scale.scale_y(100), 150);
    }

    #[test]
    fn test_portrait_device() {
        let scale = DeviceScale::for_resolution(1080, 1920);
        assert_eq!(scale.canonical(), (720, 1280));
        assert_eq!(scale.unscale(1080, 1920), (720, 1280));
    }

    #[test]
    fn test_point_serde_pair() {
        let p: Point = serde_json::from_str("[1240, 45]").unwrap();
        assert_eq!(p, Point::new(1240, 45));
    }
}
