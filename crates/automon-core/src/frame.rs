//! Captured frames and the shared last-frame cell

use crate::geometry::DeviceScale;
use image::imageops::{self, FilterType};
use image::{GrayImage, Luma, RgbImage};
use parking_lot::RwLock;
use std::sync::Arc;

/// A screen capture at canonical working resolution.
///
/// The frame remembers the scale it was normalized with so that detections
/// can be mapped back to device coordinates.
#[derive(Debug, Clone)]
pub struct Frame {
    image: RgbImage,
    scale: DeviceScale,
}

impl Frame {
    /// Wrap an image that is already at canonical resolution.
    pub fn new(image: RgbImage) -> Self {
        Self {
            image,
            scale: DeviceScale::identity(),
        }
    }

    /// Normalize a device-native capture to the canonical resolution.
    pub fn canonicalize(raw: RgbImage) -> Self {
        let scale = DeviceScale::for_resolution(raw.width(), raw.height());
        if !scale.is_resized() {
            return Self { image: raw, scale };
        }
        let (width, height) = scale.canonical();
        let image = imageops::resize(&raw, width, height, FilterType::Triangle);
        Self { image, scale }
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn scale(&self) -> DeviceScale {
        self.scale
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn is_empty(&self) -> bool {
        self.image.width() == 0 || self.image.height() == 0
    }

    pub fn to_gray(&self) -> GrayImage {
        luma(&self.image)
    }
}

/// Rec.601 luma (0.299 R + 0.587 G + 0.114 B) in 14-bit fixed point.
///
/// Thresholds for grayscale matching are calibrated against these weights;
/// `image::imageops::grayscale` uses Rec.709 and scores differently.
pub fn luma(image: &RgbImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b] = image.get_pixel(x, y).0;
        let v = (r as u32 * 4899 + g as u32 * 9617 + b as u32 * 1868 + (1 << 13)) >> 14;
        Luma([v as u8])
    })
}

/// Holder of the most recent frame.
///
/// Only the running navigator stores into it; any number of threads may read
/// a snapshot. Readers get an `Arc` and never block the writer for longer
/// than a pointer swap.
#[derive(Debug, Clone, Default)]
pub struct FrameCell {
    inner: Arc<RwLock<Option<Arc<Frame>>>>,
}

impl FrameCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the last frame, returning the shared handle to it.
    pub fn store(&self, frame: Frame) -> Arc<Frame> {
        let frame = Arc::new(frame);
        *self.inner.write() = Some(frame.clone());
        frame
    }

    pub fn latest(&self) -> Option<Arc<Frame>> {
        self.inner.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize_full_hd() {
        let frame = Frame::canonicalize(RgbImage::new(1920, 1080));
        assert_eq!((frame.width(), frame.height()), (1280, 720));
        assert!(frame.scale().is_resized());
    }

    #[test]
    fn test_canonical_frame_untouched() {
        let frame = Frame::canonicalize(RgbImage::new(1280, 720));
        assert_eq!((frame.width(), frame.height()), (1280, 720));
        assert!(!frame.scale().is_resized());
    }

    #[test]
    fn test_luma_uses_rec601_weights() {
        let image = RgbImage::from_fn(3, 1, |x, _| match x {
            0 => image::Rgb([255, 0, 0]),
            1 => image::Rgb([0, 255, 0]),
            _ => image::Rgb([0, 0, 255]),
        });
        let gray = luma(&image);
        assert_eq!(gray.as_raw(), &vec![76, 150, 29]);

        let white = luma(&RgbImage::from_pixel(1, 1, image::Rgb([255, 255, 255])));
        assert_eq!(white.as_raw(), &vec![255]);
    }

    #[test]
    fn test_frame_cell_shares_latest() {
        let cell = FrameCell::new();
        let reader = cell.clone();
        assert!(reader.latest().is_none());

        cell.store(Frame::new(RgbImage::new(4, 4)));
        assert_eq!(reader.latest().map(|f| f.width()), Some(4));
    }
}
