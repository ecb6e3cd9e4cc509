use super::NavigationOutcome;
use crate::navigator::{ClickOptions, ContainsOptions, Navigator};
use automon_core::{DeviceScale, Error, FrameSource, Result};
use automon_cv::utils::ImageUtils;
use std::slice;
use std::time::{Duration, Instant};

impl<S: FrameSource> Navigator<S> {
    /// Dismiss an advertisement interstitial.
    ///
    /// Returns `false` when the application was already in its normal state
    /// and `true` once an ad was dealt with. Fails with [`Error::SkipAd`] when
    /// the bounded number of attempts runs out.
    pub fn skip_ad(&mut self) -> Result<bool> {
        if self.in_application(None)? {
            return Ok(false);
        }

        let max_iterations = self.config.max_ad_iterations();
        let mut orientation = self.source.orientation()?;
        let mut index = 0;
        let mut taps = 0;
        let mut cleared = false;

        for _ in 0..=max_iterations {
            if self.in_application(None)? || self.resume_landmark_visible()? || self.back_out()? {
                cleared = true;
                break;
            }

            match self.check_common_ads()? {
                NavigationOutcome::Skipped => {
                    self.dismiss_no_ads()?;
                    tracing::info!("Skipped common ad");
                    return Ok(true);
                }
                NavigationOutcome::Resumed => {
                    self.wait_out_ad(Duration::from_millis(self.config.ad_wait_max_ms))?;
                    continue;
                }
                NavigationOutcome::NotFound => {}
            }

            let current = self.source.orientation()?;
            if current != orientation {
                tracing::debug!(?current, "orientation changed");
                orientation = current;
                index = 0;
            }
            let spots = self.config.ad_spots(orientation);
            if spots.is_empty() {
                continue;
            }
            if index >= spots.len() {
                index = 0;
            }

            let spot = spots[index];
            let (width, height) = self.source.resolution();
            let scale = DeviceScale::for_resolution(width, height);
            self.tap(scale.scale_x(spot.x), scale.scale_y(spot.y))?;
            index += 1;
            taps += 1;
            self.pause(Duration::from_millis(self.config.ad_spot_pause_ms))?;
        }

        if !cleared {
            return Err(Error::SkipAd(max_iterations));
        }

        tracing::info!("Skipped ad in {} taps", taps);
        if let Some(exit) = self.config.exit_asset.clone() {
            self.click(slice::from_ref(&exit), ClickOptions::default().skip_interrupts())?;
        }
        self.dismiss_no_ads()?;
        Ok(true)
    }

    /// Look for a well-known ad close button and press it
    pub fn check_common_ads(&mut self) -> Result<NavigationOutcome> {
        if self.config.common_ads.is_empty() {
            return Ok(NavigationOutcome::NotFound);
        }

        let frame = self.capture()?;
        let options = ClickOptions::default()
            .skip_interrupts()
            .grayscale()
            .threshold(self.config.common_ad_threshold)
            .frame(frame);

        for ad in self.config.common_ads.clone() {
            if !self.click(slice::from_ref(&ad), options.clone())? {
                continue;
            }
            tracing::debug!("Ad detected: {}", ad);

            if let Some(resume) = self.config.resume_ad_asset.clone() {
                if self.click(slice::from_ref(&resume), ClickOptions::default().skip_interrupts())? {
                    return Ok(NavigationOutcome::Resumed);
                }
            }
            return Ok(if self.in_application(None)? {
                NavigationOutcome::Skipped
            } else {
                NavigationOutcome::NotFound
            });
        }

        Ok(NavigationOutcome::NotFound)
    }

    /// Let a running ad play until it can be closed, stops moving, or
    /// `max_wait` passes
    pub fn wait_out_ad(&mut self, max_wait: Duration) -> Result<()> {
        let deadline = Instant::now() + max_wait;
        let mut resumed = false;

        while Instant::now() < deadline {
            if !resumed {
                match self.check_common_ads()? {
                    NavigationOutcome::Resumed => {
                        tracing::info!("Resumed ad");
                        resumed = true;
                        continue;
                    }
                    NavigationOutcome::Skipped => {
                        tracing::info!("Skipped common ad in wait");
                        return Ok(());
                    }
                    NavigationOutcome::NotFound => {}
                }
            }
            if self.in_application(None)? {
                return Ok(());
            }
            if self.screen_settled(Duration::from_millis(self.config.change_interval_ms))? {
                tracing::debug!("Ad is not moving");
                return Ok(());
            }
        }

        Ok(())
    }

    /// Whether two frames `interval` apart show the same picture
    pub fn screen_settled(&mut self, interval: Duration) -> Result<bool> {
        let before = self.capture()?;
        self.pause(interval)?;
        let after = self.capture()?;
        Ok(ImageUtils::frames_similar(&before.to_gray(), &after.to_gray()))
    }

    fn resume_landmark_visible(&mut self) -> Result<bool> {
        let Some(landmark) = self.config.resume_landmark.clone() else {
            return Ok(false);
        };
        let options = ContainsOptions::default()
            .skip_interrupts()
            .retries(self.config.resume_retries);
        self.screen_contains(slice::from_ref(&landmark), options)
    }

    /// Press back until the application shows again
    fn back_out(&mut self) -> Result<bool> {
        for _ in 0..self.config.back_attempts {
            if self.in_application(None)? {
                return Ok(true);
            }
            self.click_back(true)?;
        }
        self.in_application(None)
    }

    fn dismiss_no_ads(&mut self) -> Result<()> {
        let Some(no_ads) = self.config.no_ads_asset.clone() else {
            return Ok(());
        };
        if self.screen_contains(slice::from_ref(&no_ads), ContainsOptions::default().skip_interrupts())? {
            self.click_back(true)?;
        }
        Ok(())
    }
}
