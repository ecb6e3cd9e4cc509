//! Template loading utilities

use super::{AssetManifest, Template, DEFAULT_THRESHOLD};
use crate::traits::TemplateSource;
use crate::utils::image::ImageUtils;
use crate::Result;
use anyhow::Context;
use automon_core::{AssetId, Region};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Template loader scanning asset directories
///
/// Every image file becomes a template whose asset id is its file name
/// (`exit.png`). Regions and thresholds come from the manifest.
#[derive(Debug, Clone)]
pub struct TemplateLoader {
    template_dirs: Vec<PathBuf>,
    supported_extensions: Vec<String>,
    manifest: AssetManifest,
    default_threshold: f32,
}

impl TemplateLoader {
    /// Create new template loader
    pub fn new() -> Self {
        Self {
            template_dirs: Vec::new(),
            supported_extensions: vec![
                "png".to_string(),
                "jpg".to_string(),
                "jpeg".to_string(),
                "bmp".to_string(),
            ],
            manifest: AssetManifest::default(),
            default_threshold: DEFAULT_THRESHOLD,
        }
    }

    /// Add template directory
    pub fn add_template_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.template_dirs.push(dir.as_ref().to_path_buf());
        self
    }

    pub fn with_manifest(mut self, manifest: AssetManifest) -> Self {
        self.manifest = manifest;
        self
    }

    /// Threshold for assets the manifest gives none
    pub fn with_default_threshold(mut self, threshold: f32) -> Self {
        self.default_threshold = threshold;
        self
    }

    /// Load all templates from directories
    pub fn load_all_templates(&self) -> Result<HashMap<AssetId, Template>> {
        let mut templates = HashMap::new();

        for dir in &self.template_dirs {
            if !dir.exists() {
                tracing::warn!("Template directory {:?} does not exist", dir);
                continue;
            }

            let entries = fs::read_dir(dir)
                .with_context(|| format!("Failed to read directory: {:?}", dir))?;

            for entry in entries {
                let path = entry?.path();
                if !self.is_supported(&path) {
                    continue;
                }
                let Some(name) = path.file_name().map(|n| n.to_string_lossy().to_string()) else {
                    continue;
                };

                let template = self.build_template(&name, &path)?;
                templates.insert(template.id.clone(), template);
            }
        }

        for name in self.manifest.assets.keys() {
            if !templates.contains_key(name.as_str()) {
                tracing::warn!("Asset {} is missing", name);
            }
        }

        Ok(templates)
    }

    fn build_template(&self, name: &str, path: &Path) -> Result<Template> {
        let image = ImageUtils::load_rgb(path)
            .with_context(|| format!("Failed to load template: {:?}", path))?;

        let mut template = Template::new(AssetId::new(name), image)
            .with_threshold(self.default_threshold);

        match self.manifest.entry(name) {
            Some(entry) => {
                if entry.region == Region::ALL {
                    tracing::debug!("Asset '{}' is using Region::ALL. Consider optimizing.", name);
                }
                template = template.with_region(entry.region);
                if let Some(threshold) = entry.threshold {
                    template = template.with_threshold(threshold);
                }
            }
            None => {
                tracing::debug!("Asset '{}' has no region defined. Defaulting to Region::ALL", name);
            }
        }

        Ok(template)
    }

    fn is_supported(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .is_some_and(|ext| self.supported_extensions.contains(&ext))
    }
}

impl Default for TemplateLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateSource for TemplateLoader {
    fn load_templates(&self) -> Result<HashMap<AssetId, Template>> {
        self.load_all_templates()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn write_png(dir: &Path, name: &str) -> Result<()> {
        let img = RgbImage::from_fn(6, 4, |x, y| Rgb([(x * 40) as u8, (y * 60) as u8, 7]));
        img.save(dir.join(name))?;
        Ok(())
    }

    #[test]
    fn test_load_all_applies_manifest() -> Result<()> {
        let dir = tempfile::tempdir()?;
        write_png(dir.path(), "exit.png")?;
        write_png(dir.path(), "wheel.png")?;
        fs::write(dir.path().join("notes.txt"), "ignored")?;

        let manifest = AssetManifest::default()
            .with_entry("exit.png", Region::TOP_RIGHT)
            .with_entry("missing.png", Region::ALL);
        let loader = TemplateLoader::new()
            .add_template_dir(dir.path())
            .with_manifest(manifest);

        let templates = loader.load_all_templates()?;
        assert_eq!(templates.len(), 2);
        assert_eq!(templates["exit.png"].region, Region::TOP_RIGHT);
        assert_eq!(templates["wheel.png"].region, Region::ALL);
        assert_eq!((templates["exit.png"].width(), templates["exit.png"].height()), (6, 4));
        Ok(())
    }

    #[test]
    fn test_asset_ids_are_file_names() -> Result<()> {
        let dir = tempfile::tempdir()?;
        write_png(dir.path(), "Resume.PNG")?;

        let manifest = AssetManifest::default().with_entry("Resume.PNG", Region::BOTTOM);
        let templates = TemplateLoader::new()
            .add_template_dir(dir.path())
            .with_manifest(manifest)
            .load_templates()?;

        let ids: Vec<&str> = templates.keys().map(AssetId::as_str).collect();
        assert_eq!(ids, vec!["Resume.PNG"]);
        assert_eq!(templates["Resume.PNG"].region, Region::BOTTOM);
        Ok(())
    }
}
