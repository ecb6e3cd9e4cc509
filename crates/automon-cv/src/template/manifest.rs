//! Per-asset search regions and thresholds supplied as configuration

use crate::Result;
use anyhow::Context;
use automon_core::Region;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Declared metadata for one asset
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestEntry {
    pub region: Region,
    pub threshold: Option<f32>,
}

/// Asset manifest, keyed by asset id (the template's file name)
///
/// ```json
/// { "assets": { "exit.png": { "region": "TOP_RIGHT" }, "wheel.png": {} } }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetManifest {
    #[serde(default)]
    pub assets: BTreeMap<String, ManifestEntry>,
}

impl AssetManifest {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read manifest: {:?}", path.as_ref()))?;
        Self::from_json(&text).with_context(|| format!("Invalid manifest: {:?}", path.as_ref()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let manifest: Self = serde_json::from_str(text)?;
        for (name, entry) in &manifest.assets {
            if let Some(t) = entry.threshold {
                anyhow::ensure!((0.0..=1.0).contains(&t), "threshold {} of '{}' is outside [0, 1]", t, name);
            }
        }
        Ok(manifest)
    }

    pub fn entry(&self, name: &str) -> Option<&ManifestEntry> {
        self.assets.get(name)
    }

    pub fn with_entry(mut self, name: impl Into<String>, region: Region) -> Self {
        self.assets.insert(
            name.into(),
            ManifestEntry {
                region,
                threshold: None,
            },
        );
        self
    }
}
