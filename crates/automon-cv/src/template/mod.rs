//! Template matching module

pub mod loader;
pub mod manifest;
pub mod matcher;
pub mod store;

pub use loader::TemplateLoader;
pub use manifest::{AssetManifest, ManifestEntry};
pub use matcher::TemplateMatcher;
pub use store::TemplateStore;

use automon_core::{AssetId, Region};
use image::{GrayImage, RgbImage};
use serde::{Deserialize, Serialize};

/// Default minimum correlation score for a detection.
pub const DEFAULT_THRESHOLD: f32 = 0.9;

/// Template data structure
#[derive(Debug, Clone)]
pub struct Template {
    pub id: AssetId,
    pub image: RgbImage,
    /// Rec.601 luma of `image`
    pub gray: GrayImage,
    pub region: Region,
    pub threshold: f32,
}

impl Template {
    pub fn new(id: AssetId, image: RgbImage) -> Self {
        let gray = automon_core::luma(&image);
        Self {
            id,
            image,
            gray,
            region: Region::ALL,
            threshold: DEFAULT_THRESHOLD,
        }
    }

    pub fn with_region(mut self, region: Region) -> Self {
        self.region = region;
        self
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Template matching method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MatchingMethod {
    /// Correlation coefficient, per-channel mean removed (default)
    #[default]
    CCoeffNormed,
    /// Normalized cross-correlation on luma
    CCorrNormed,
}
