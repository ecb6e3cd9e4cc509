//! Offline detection on screenshot files

use anyhow::Context;
use automon_core::{AssetId, Detection, Frame};
use automon_cv::utils::ImageUtils;
use automon_cv::{Detector, MatchOptions};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Detections of a set of assets in one screenshot
#[derive(Debug, Serialize)]
pub struct ScanReport {
    pub screenshot: PathBuf,
    pub native: (u32, u32),
    pub canonical: (u32, u32),
    pub detections: Vec<Detection>,
}

impl ScanReport {
    pub fn count(&self) -> usize {
        self.detections.len()
    }
}

/// Load a device screenshot and normalize it to canonical resolution
pub fn load_frame(path: &Path) -> anyhow::Result<Frame> {
    let raw = ImageUtils::load_rgb(path)?;
    Ok(Frame::canonicalize(raw))
}

/// Resolve asset names given on the command line
pub fn resolve_assets(detector: &Detector, names: &[String]) -> anyhow::Result<Vec<AssetId>> {
    names
        .iter()
        .map(|name| detector.store().resolve(name).map_err(anyhow::Error::from))
        .collect()
}

/// Detections of `assets` in an already loaded frame
pub fn detect_all(detector: &Detector, frame: &Frame, assets: &[AssetId], options: MatchOptions) -> anyhow::Result<Vec<Detection>> {
    let mut detections = Vec::new();
    for asset in assets {
        let found = detector
            .detect(asset, frame, options)
            .with_context(|| format!("Detection of {} failed", asset))?;
        tracing::info!("{}: {} found", asset, found.len());
        detections.extend(found);
    }
    Ok(detections)
}

fn report(screenshot: &Path, frame: &Frame, detections: Vec<Detection>) -> ScanReport {
    ScanReport {
        screenshot: screenshot.to_path_buf(),
        native: frame.scale().native(),
        canonical: (frame.width(), frame.height()),
        detections,
    }
}

pub fn scan(detector: &Detector, screenshot: &Path, assets: &[AssetId], options: MatchOptions) -> anyhow::Result<ScanReport> {
    let frame = load_frame(screenshot)?;
    let detections = detect_all(detector, &frame, assets, options)?;
    Ok(report(screenshot, &frame, detections))
}

/// Scan and write the canonical frame with detections drawn on it.
///
/// With `show_regions` the search rectangles of each asset are outlined too.
pub fn annotate(
    detector: &Detector,
    screenshot: &Path,
    assets: &[AssetId],
    options: MatchOptions,
    output: &Path,
    show_regions: bool,
) -> anyhow::Result<ScanReport> {
    let frame = load_frame(screenshot)?;
    let detections = detect_all(detector, &frame, assets, options)?;

    let mut image = ImageUtils::annotate(frame.image(), &detections, frame.scale());
    if show_regions {
        for asset in assets {
            if let Some(template) = detector.store().get(asset.as_str()) {
                let crops = template.region.crops(frame.width(), frame.height());
                ImageUtils::outline(&mut image, &crops);
            }
        }
    }

    ImageUtils::save_rgb(&image, output)?;
    tracing::info!("Annotated frame written to {}", output.display());
    Ok(report(screenshot, &frame, detections))
}
