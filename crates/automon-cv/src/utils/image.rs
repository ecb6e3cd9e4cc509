//! Image processing utilities

use crate::Result;
use anyhow::Context;
use automon_core::{Detection, DeviceScale, Rect};
use image::{GrayImage, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_rect_mut};
use std::path::Path;

/// Image utility functions
pub struct ImageUtils;

impl ImageUtils {
    /// Load image as RGB
    pub fn load_rgb<P: AsRef<Path>>(path: P) -> Result<RgbImage> {
        let img = image::open(&path)
            .with_context(|| format!("Failed to open image: {:?}", path.as_ref()))?;
        Ok(img.to_rgb8())
    }

    /// Save image, format picked from the extension
    pub fn save_rgb<P: AsRef<Path>>(image: &RgbImage, path: P) -> Result<()> {
        image
            .save(&path)
            .with_context(|| format!("Failed to save image: {:?}", path.as_ref()))
    }

    /// Copy out a sub-rectangle
    pub fn crop(image: &RgbImage, rect: Rect) -> RgbImage {
        image::imageops::crop_imm(image, rect.x, rect.y, rect.width, rect.height).to_image()
    }

    /// Similarity of two equally sized grayscale images, `1 - L2 / (w * h)`.
    ///
    /// Differently sized images are never similar.
    pub fn similarity(a: &GrayImage, b: &GrayImage) -> f64 {
        if a.dimensions() != b.dimensions() || a.width() == 0 || a.height() == 0 {
            return 0.0;
        }
        let l2 = a
            .as_raw()
            .iter()
            .zip(b.as_raw())
            .map(|(&p, &q)| {
                let d = p as f64 - q as f64;
                d * d
            })
            .sum::<f64>()
            .sqrt();
        1.0 - l2 / (a.width() as f64 * a.height() as f64)
    }

    /// Whether two frames show effectively the same picture
    pub fn frames_similar(a: &GrayImage, b: &GrayImage) -> bool {
        Self::similarity(a, b) > 0.99
    }

    /// Draw detections onto a canonical frame, first detection green fading
    /// to blue for later ones
    pub fn annotate(image: &RgbImage, detections: &[Detection], scale: DeviceScale) -> RgbImage {
        let mut output = image.clone();
        let last = detections.len().saturating_sub(1).max(1) as f32;

        for (i, detection) in detections.iter().enumerate() {
            let t = i as f32 / last;
            let color = Rgb([0, ((1.0 - t) * 255.0) as u8, (t * 255.0) as u8]);
            let (x, y) = scale.unscale(detection.x, detection.y);
            draw_filled_circle_mut(&mut output, (x, y), 7, color);
        }

        output
    }

    /// Outline the search rectangles of a region
    pub fn outline(image: &mut RgbImage, rects: &[Rect]) {
        for rect in rects.iter().filter(|r| !r.is_empty()) {
            let r = imageproc::rect::Rect::at(rect.x as i32, rect.y as i32).of_size(rect.width, rect.height);
            draw_hollow_rect_mut(image, r, Rgb([255, 0, 0]));
        }
    }
}
