//! Navigation configuration

use anyhow::Context;
use automon_core::{AssetId, Orientation, Point};
use automon_cv::TemplateStore;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Landmarks, timings and interrupt-handler tuning for a [`Navigator`](crate::Navigator).
///
/// Durations are plain milliseconds so the JSON form stays readable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// Any of these on screen means the application is in its normal state
    pub in_app_assets: Vec<AssetId>,
    /// Landmark showing the ad finished and the application resumed
    pub resume_landmark: Option<AssetId>,
    pub exit_asset: Option<AssetId>,
    /// "Remove ads" upsell shown after an interstitial
    pub no_ads_asset: Option<AssetId>,
    pub slider_asset: Option<AssetId>,
    pub continue_asset: Option<AssetId>,
    pub resume_ad_asset: Option<AssetId>,
    /// Close buttons of well-known ad networks
    pub common_ads: Vec<AssetId>,

    /// Canonical close-button spots tried in landscape
    pub horizontal_ad_spots: Vec<Point>,
    /// Canonical close-button spots tried in portrait
    pub vertical_ad_spots: Vec<Point>,

    pub retry_delay_ms: u64,
    pub poll_interval_ms: u64,
    pub tap_hold_ms: u64,
    pub click_pause_ms: u64,
    pub back_pause_ms: u64,
    pub back_attempts: u32,
    pub resume_retries: u32,
    pub ad_spot_pause_ms: u64,
    pub ad_wait_max_ms: u64,
    pub change_interval_ms: u64,
    pub wait_timeout_ms: u64,
    pub sequence_timeout_ms: u64,
    pub common_ad_threshold: f32,

    pub slider_drag_px: i32,
    pub slider_drag_ms: u32,
    pub slider_pause_ms: u64,
    pub slider_continue_pause_ms: u64,
    /// Drags after which the operator is asked to help
    pub slider_operator_after: u32,
    pub slider_max_drags: u32,
    pub slider_verify_retries: u32,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            in_app_assets: Vec::new(),
            resume_landmark: None,
            exit_asset: None,
            no_ads_asset: None,
            slider_asset: None,
            continue_asset: None,
            resume_ad_asset: None,
            common_ads: Vec::new(),
            horizontal_ad_spots: vec![Point::new(1240, 45), Point::new(1240, 35), Point::new(1250, 85)],
            vertical_ad_spots: vec![Point::new(630, 50), Point::new(666, 80), Point::new(680, 25)],
            retry_delay_ms: 100,
            poll_interval_ms: 100,
            tap_hold_ms: 100,
            click_pause_ms: 500,
            back_pause_ms: 1000,
            back_attempts: 5,
            resume_retries: 5,
            ad_spot_pause_ms: 250,
            ad_wait_max_ms: 18_000,
            change_interval_ms: 500,
            wait_timeout_ms: 10_000,
            sequence_timeout_ms: 7_000,
            common_ad_threshold: 0.8,
            slider_drag_px: 25,
            slider_drag_ms: 300,
            slider_pause_ms: 500,
            slider_continue_pause_ms: 1000,
            slider_operator_after: 30,
            slider_max_drags: 60,
            slider_verify_retries: 3,
        }
    }
}

impl NavigationConfig {
    /// Near-zero pauses, for replaying recorded frames
    pub fn fast() -> Self {
        Self {
            retry_delay_ms: 1,
            poll_interval_ms: 5,
            tap_hold_ms: 0,
            click_pause_ms: 0,
            back_pause_ms: 0,
            back_attempts: 2,
            resume_retries: 1,
            ad_spot_pause_ms: 0,
            ad_wait_max_ms: 200,
            change_interval_ms: 1,
            wait_timeout_ms: 200,
            sequence_timeout_ms: 100,
            slider_drag_ms: 0,
            slider_pause_ms: 0,
            slider_continue_pause_ms: 0,
            ..Default::default()
        }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read navigation config: {:?}", path.as_ref()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Invalid navigation config: {:?}", path.as_ref()))
    }

    /// Check that every configured asset is loaded in `store`
    pub fn validate(&self, store: &TemplateStore) -> automon_core::Result<()> {
        let optional = [
            &self.resume_landmark,
            &self.exit_asset,
            &self.no_ads_asset,
            &self.slider_asset,
            &self.continue_asset,
            &self.resume_ad_asset,
        ];
        let named = self
            .in_app_assets
            .iter()
            .chain(&self.common_ads)
            .chain(optional.into_iter().flatten());

        for asset in named {
            store.resolve(asset.as_str())?;
        }
        if !(0.0..=1.0).contains(&self.common_ad_threshold) {
            return Err(automon_core::Error::InvalidThreshold(self.common_ad_threshold));
        }
        Ok(())
    }

    /// Close-button spots for the given orientation
    pub fn ad_spots(&self, orientation: Orientation) -> &[Point] {
        match orientation {
            Orientation::Landscape => &self.horizontal_ad_spots,
            Orientation::Portrait => &self.vertical_ad_spots,
        }
    }

    /// Upper bound on ad-handler iterations
    pub fn max_ad_iterations(&self) -> usize {
        self.horizontal_ad_spots.len().max(self.vertical_ad_spots.len()) * 4
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }

    pub fn sequence_timeout(&self) -> Duration {
        Duration::from_millis(self.sequence_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use automon_cv::Template;
    use image::RgbImage;

    #[test]
    fn test_partial_json() -> anyhow::Result<()> {
        let config: NavigationConfig = serde_json::from_str(
            r#"{
                "in_app_assets": ["battle.png", "shop.png"],
                "exit_asset": "exit.png",
                "horizontal_ad_spots": [[1200, 40]]
            }"#,
        )?;
        assert_eq!(config.in_app_assets.len(), 2);
        assert_eq!(config.exit_asset.as_ref().map(AssetId::as_str), Some("exit.png"));
        assert_eq!(config.ad_spots(Orientation::Landscape), &[Point::new(1200, 40)]);
        assert_eq!(config.vertical_ad_spots.len(), 3);
        assert_eq!(config.max_ad_iterations(), 12);
        assert_eq!(config.poll_interval(), Duration::from_millis(100));
        Ok(())
    }

    #[test]
    fn test_validate_against_store() {
        let store = TemplateStore::from_templates([Template::new(AssetId::new("exit.png"), RgbImage::new(2, 2))]);
        let mut config = NavigationConfig {
            exit_asset: Some(AssetId::new("exit.png")),
            ..Default::default()
        };
        assert!(config.validate(&store).is_ok());

        config.common_ads.push(AssetId::new("commonad1.png"));
        assert!(matches!(
            config.validate(&store),
            Err(automon_core::Error::UnknownAsset(name)) if name == "commonad1.png"
        ));
    }
}
