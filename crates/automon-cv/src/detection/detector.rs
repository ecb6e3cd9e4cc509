//! Asset detection over canonical frames

use super::config::DetectionConfig;
use crate::cluster::{self, MatchGroup};
use crate::template::{Template, TemplateMatcher, TemplateStore};
use crate::traits::TemplateMatchable;
use crate::utils::ImageUtils;
use automon_core::{Detection, Error, Frame, Rect, Region, Result};
use image::RgbImage;
use std::borrow::Cow;
use std::sync::Arc;

/// Per-query matching options
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MatchOptions {
    /// Minimum score; the template's own threshold when `None`
    pub threshold: Option<f32>,
    /// Match on luma instead of color
    pub grayscale: bool,
}

impl MatchOptions {
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn with_grayscale(mut self, grayscale: bool) -> Self {
        self.grayscale = grayscale;
        self
    }
}

/// Detection engine: locates templates from the store inside frames
#[derive(Debug, Clone)]
pub struct Detector {
    config: DetectionConfig,
    store: TemplateStore,
    matcher: TemplateMatcher,
}

impl Detector {
    /// Create new detector over an existing store
    pub fn new(config: DetectionConfig, store: TemplateStore) -> Self {
        let matcher = TemplateMatcher::new(config.matching_method);
        Self {
            config,
            store,
            matcher,
        }
    }

    /// Create a detector and load its templates from the configured directories
    pub fn from_config(config: DetectionConfig) -> crate::Result<Self> {
        let store = TemplateStore::load(&config.loader()?)?;
        Ok(Self::new(config, store))
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    pub fn store(&self) -> &TemplateStore {
        &self.store
    }

    /// Re-read templates and manifest from disk, swapping the store contents
    pub fn reload(&self) -> crate::Result<usize> {
        self.store.reload(&self.config.loader()?)
    }

    /// Locate every on-screen instance of `asset` in `frame`.
    ///
    /// Returns device-resolution click points; an empty list when nothing
    /// scores above the threshold.
    pub fn detect(&self, asset: impl AsRef<str>, frame: &Frame, options: MatchOptions) -> Result<Vec<Detection>> {
        let name = asset.as_ref();
        let template = self
            .store
            .get(name)
            .ok_or_else(|| Error::UnknownAsset(name.to_string()))?;

        let threshold = options.threshold.unwrap_or(template.threshold);
        if !(0.0..=1.0).contains(&threshold) {
            return Err(Error::InvalidThreshold(threshold));
        }
        if frame.is_empty() {
            return Err(Error::EmptyFrame);
        }

        let mut detections = Vec::new();
        for crop in template.region.crops(frame.width(), frame.height()) {
            if crop.is_empty() {
                continue;
            }
            let groups = self.match_groups(frame.image(), crop, &template, threshold, options.grayscale);
            detections.extend(
                groups
                    .iter()
                    .map(|group| self.to_detection(group, crop, &template, frame)),
            );
        }

        tracing::trace!(asset = name, found = detections.len(), "detect");
        Ok(detections)
    }

    /// Total detections over several assets
    pub fn count<A: AsRef<str>>(&self, assets: &[A], frame: &Frame, options: MatchOptions) -> Result<usize> {
        let mut total = 0;
        for asset in assets {
            total += self.detect(asset, frame, options)?.len();
        }
        Ok(total)
    }

    /// Reference image of an asset, for debugging
    pub fn template_image(&self, asset: impl AsRef<str>) -> Result<RgbImage> {
        let name = asset.as_ref();
        self.store
            .get(name)
            .map(|t| t.image.clone())
            .ok_or_else(|| Error::UnknownAsset(name.to_string()))
    }

    fn match_groups(
        &self,
        image: &RgbImage,
        crop: Rect,
        template: &Template,
        threshold: f32,
        grayscale: bool,
    ) -> Vec<MatchGroup> {
        let searched: Cow<'_, RgbImage> = if crop == Rect::new(0, 0, image.width(), image.height()) {
            Cow::Borrowed(image)
        } else {
            Cow::Owned(ImageUtils::crop(image, crop))
        };

        let surface = self.matcher.score_surface(&searched, template, grayscale);
        let found = cluster::candidates(&surface, threshold);
        cluster::cluster(&found, self.config.cluster_radius)
    }

    fn to_detection(&self, group: &MatchGroup, crop: Rect, template: &Arc<Template>, frame: &Frame) -> Detection {
        let (ax, ay) = group.anchor();
        let (x, y) = (ax + crop.x, ay + crop.y);

        if self.config.suggest_regions && template.region.is_all() {
            let found = Rect::new(x, y, template.width(), template.height());
            if let Some(region) = Region::enclosing(found, frame.width(), frame.height()) {
                tracing::debug!(
                    "Optimization suggestion: asset '{}' found in Region::{}",
                    template.id,
                    region
                );
            }
        }

        let divisor = self.config.click_bias_divisor;
        let click_x = (x as f64 + template.width() as f64 / divisor) as i32;
        let click_y = (y as f64 + template.height() as f64 / divisor) as i32;
        let scale = frame.scale();

        Detection::new(
            template.id.clone(),
            scale.scale_x(click_x),
            scale.scale_y(click_y),
            group.best_score(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use automon_core::AssetId;
    use image::Rgb;

    fn pattern(width: u32, height: u32, seed: u32) -> RgbImage {
        let mut state = seed;
        RgbImage::from_fn(width, height, |_, _| {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let v = (state >> 16) as u8;
            Rgb([v, v.wrapping_add(70), v.wrapping_mul(5)])
        })
    }

    fn detector_with(template: Template) -> Detector {
        Detector::new(DetectionConfig::default(), TemplateStore::from_templates([template]))
    }

    #[test]
    fn test_unknown_asset() {
        let detector = detector_with(Template::new(AssetId::new("a"), pattern(4, 4, 1)));
        let frame = Frame::new(RgbImage::new(20, 20));
        let err = detector.detect("b", &frame, MatchOptions::default()).unwrap_err();
        assert!(matches!(err, Error::UnknownAsset(name) if name == "b"));
    }

    #[test]
    fn test_invalid_threshold() {
        let detector = detector_with(Template::new(AssetId::new("a"), pattern(4, 4, 1)));
        let frame = Frame::new(RgbImage::new(20, 20));
        let options = MatchOptions::default().with_threshold(1.5);
        assert!(matches!(
            detector.detect("a", &frame, options),
            Err(Error::InvalidThreshold(_))
        ));
    }

    #[test]
    fn test_empty_frame() {
        let detector = detector_with(Template::new(AssetId::new("a"), pattern(4, 4, 1)));
        let frame = Frame::new(RgbImage::new(0, 0));
        assert!(matches!(
            detector.detect("a", &frame, MatchOptions::default()),
            Err(Error::EmptyFrame)
        ));
    }

    #[test]
    fn test_region_prunes_search() {
        let tpl = pattern(10, 10, 9);
        let mut image = RgbImage::new(120, 80);
        image::imageops::replace(&mut image, &tpl, 90, 60);
        let frame = Frame::new(image);

        let top_only = detector_with(Template::new(AssetId::new("a"), tpl.clone()).with_region(Region::TOP));
        assert!(top_only.detect("a", &frame, MatchOptions::default()).unwrap().is_empty());

        let bottom_right =
            detector_with(Template::new(AssetId::new("a"), tpl).with_region(Region::BOTTOM_RIGHT));
        let found = bottom_right.detect("a", &frame, MatchOptions::default()).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].point(), (95, 65));
    }

    #[test]
    fn test_ad_area_searches_both_corners() {
        let tpl = pattern(8, 8, 21);
        let mut image = RgbImage::new(90, 60);
        image::imageops::replace(&mut image, &tpl, 2, 3);
        image::imageops::replace(&mut image, &tpl, 80, 5);
        // center copy lies outside both ninths
        image::imageops::replace(&mut image, &tpl, 40, 30);
        let frame = Frame::new(image);

        let detector = detector_with(Template::new(AssetId::new("ad"), tpl).with_region(Region::AD_AREA));
        let mut found = detector.detect("ad", &frame, MatchOptions::default()).unwrap();
        found.sort_by_key(|d| d.x);
        let points: Vec<(i32, i32)> = found.iter().map(Detection::point).collect();
        assert_eq!(points, vec![(6, 7), (84, 9)]);
    }

    #[test]
    fn test_resized_frame_scales_click_point() {
        // 8px blocks survive the 1.5x round trip through resampling
        let tpl = RgbImage::from_fn(24, 24, |x, y| {
            let cell = (x / 8 + 3 * (y / 8)) as u8;
            Rgb([cell.wrapping_mul(53), 255 - cell.wrapping_mul(29), cell.wrapping_mul(97)])
        });
        let mut canonical = RgbImage::new(1280, 720);
        image::imageops::replace(&mut canonical, &tpl, 96, 192);
        let native = image::imageops::resize(&canonical, 1920, 1080, image::imageops::FilterType::Nearest);
        let frame = Frame::canonicalize(native);
        assert!(frame.scale().is_resized());

        let detector = detector_with(Template::new(AssetId::new("a"), tpl).with_region(Region::TOP_LEFT));
        let found = detector
            .detect("a", &frame, MatchOptions::default().with_threshold(0.8))
            .unwrap();
        assert_eq!(found.len(), 1);
        // (96 + 12) * 1.5, (192 + 12) * 1.5 give or take resampling drift
        assert!((found[0].x - 162).abs() <= 3, "x = {}", found[0].x);
        assert!((found[0].y - 306).abs() <= 3, "y = {}", found[0].y);
    }

    #[test]
    fn test_template_image_accessor() {
        let detector = detector_with(Template::new(AssetId::new("a"), pattern(3, 2, 1)));
        assert_eq!(detector.template_image("a").unwrap().dimensions(), (3, 2));
        assert!(detector.template_image("zz").is_err());
    }
}
