//! Detection configuration

use crate::template::{AssetManifest, MatchingMethod, TemplateLoader, DEFAULT_THRESHOLD};
use crate::cluster::CLUSTER_RADIUS;
use crate::Result;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main detection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub template_dirs: Vec<PathBuf>,
    pub manifest: Option<PathBuf>,
    pub matching_method: MatchingMethod,
    pub default_threshold: f32,
    pub cluster_radius: u32,
    /// Divisor applied to the template size when offsetting the click point
    /// from the match corner. 1.9 rather than 2 puts the click slightly above
    /// and left of the template center.
    pub click_bias_divisor: f64,
    /// Log a tighter region for `ALL` assets found inside a half or quadrant
    pub suggest_regions: bool,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            template_dirs: vec!["assets".into()],
            manifest: None,
            matching_method: MatchingMethod::CCoeffNormed,
            default_threshold: DEFAULT_THRESHOLD,
            cluster_radius: CLUSTER_RADIUS,
            click_bias_divisor: 1.9,
            suggest_regions: true,
        }
    }
}

impl DetectionConfig {
    /// Luma-only cross-correlation, cheaper on large frames
    pub fn fast_luma() -> Self {
        Self {
            matching_method: MatchingMethod::CCorrNormed,
            ..Default::default()
        }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read detection config: {:?}", path.as_ref()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Invalid detection config: {:?}", path.as_ref()))
    }

    /// Template loader for the configured directories and manifest
    pub fn loader(&self) -> Result<TemplateLoader> {
        let manifest = match &self.manifest {
            Some(path) => AssetManifest::load(path)?,
            None => AssetManifest::default(),
        };

        let mut loader = TemplateLoader::new()
            .with_manifest(manifest)
            .with_default_threshold(self.default_threshold);
        for dir in &self.template_dirs {
            loader = loader.add_template_dir(dir);
        }
        Ok(loader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() -> Result<()> {
        let config: DetectionConfig = serde_json::from_str(r#"{ "default_threshold": 0.8 }"#)?;
        assert_eq!(config.default_threshold, 0.8);
        assert_eq!(config.cluster_radius, 5);
        assert_eq!(config.click_bias_divisor, 1.9);
        assert_eq!(config.matching_method, MatchingMethod::CCoeffNormed);
        Ok(())
    }
}
