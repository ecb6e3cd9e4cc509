//! Asset identifiers and detections

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

/// Interned asset key.
///
/// Names coming from external data are checked against the template store
/// before they reach the matcher, so an `AssetId` held by the navigator always
/// refers to a loaded template unless the store was reloaded since.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(Arc<str>);

impl AssetId {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for AssetId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for AssetId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AssetId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for AssetId {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

/// One located instance of a template: a device-resolution click point and
/// the best correlation score of the match group it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub asset: AssetId,
    pub x: i32,
    pub y: i32,
    pub score: f32,
}

impl Detection {
    pub fn new(asset: AssetId, x: i32, y: i32, score: f32) -> Self {
        Self { asset, x, y, score }
    }

    pub fn point(&self) -> (i32, i32) {
        (self.x, self.y)
    }
}

/// Render a list of assets as `a | b | c` for log lines and error messages.
pub fn describe(assets: &[AssetId]) -> String {
    assets
        .iter()
        .map(AssetId::as_str)
        .collect::<Vec<_>>()
        .join(" | ")
}
