//! Automon Computer Vision Library
//!
//! Template-correlation detection of on-screen assets: region pruning,
//! first-fit match clustering and click-point canonicalization.

pub mod cluster;
pub mod template;
pub mod detection;
pub mod utils;

// Re-export commonly used types
pub use cluster::{Candidate, MatchGroup};
pub use detection::{DetectionConfig, Detector, MatchOptions};
pub use template::{AssetManifest, Template, TemplateLoader, TemplateMatcher, TemplateStore};

// Loading and I/O errors; detection itself returns `automon_core::Result`
pub type Result<T> = anyhow::Result<T>;

/// Core traits for the CV system
pub mod traits {
    use super::*;
    use automon_core::AssetId;
    use image::RgbImage;
    use std::collections::HashMap;

    /// Anything that can (re)produce the full asset-to-template map
    pub trait TemplateSource {
        fn load_templates(&self) -> Result<HashMap<AssetId, Template>>;
    }

    /// Trait for template matching implementations
    pub trait TemplateMatchable {
        /// Score surface of `template` slid over `image`, row-major,
        /// `(image.width - template.width + 1)` columns wide
        fn score_surface(&self, image: &RgbImage, template: &Template, grayscale: bool) -> ScoreSurface;
    }

    /// Correlation scores for every placement of a template
    #[derive(Debug, Clone, Default)]
    pub struct ScoreSurface {
        pub width: u32,
        pub height: u32,
        pub scores: Vec<f32>,
    }

    impl ScoreSurface {
        pub fn get(&self, x: u32, y: u32) -> f32 {
            self.scores[(y * self.width + x) as usize]
        }
    }
}
