use crate::navigator::Navigator;
use crate::progress::ProgressLevel;
use automon_core::{AssetId, Detection, Error, Frame, FrameSource, Result};
use automon_cv::MatchOptions;
use std::time::Duration;

impl<S: FrameSource> Navigator<S> {
    /// Clear an "are you there" slider challenge visible in `frame`.
    ///
    /// Drags the handle right a little at a time until the continue button
    /// shows, taps it and checks that the challenge is gone. Returns whether a
    /// challenge was handled, in which case the caller should recapture.
    pub(crate) fn skip_slider(&mut self, frame: &Frame) -> Result<bool> {
        let Some(slider) = self.config.slider_asset.clone() else {
            return Ok(false);
        };
        let mut handle = self.first_detection(&slider, frame)?;
        if handle.is_none() {
            return Ok(false);
        }

        let mut drags = 0;
        while let Some(at) = handle {
            if drags >= self.config.slider_max_drags {
                self.report(ProgressLevel::Error, "Slider challenge could not be cleared");
                return Err(Error::Slider(format!("still visible after {} drags", drags)));
            }

            self.control().check()?;
            let to = at.x + self.config.slider_drag_px;
            self.source.swipe(at.x, at.y, to, at.y, self.config.slider_drag_ms)?;
            self.pause(Duration::from_millis(self.config.slider_pause_ms))?;
            drags += 1;

            if drags == self.config.slider_operator_after {
                tracing::warn!(drags, "slider not solved automatically");
                self.report(ProgressLevel::Warning, "Please move the slider to the right");
            }

            let current = self.capture()?;
            if let Some(button) = self.continue_button(&current)? {
                self.tap(button.x, button.y)?;
                self.pause(Duration::from_millis(self.config.slider_continue_pause_ms))?;
                return self.verify_slider_gone(&slider, drags);
            }
            handle = self.first_detection(&slider, &current)?;
        }

        tracing::info!(drags, "slider went away");
        Ok(true)
    }

    fn verify_slider_gone(&mut self, slider: &AssetId, drags: u32) -> Result<bool> {
        for attempt in 0..self.config.slider_verify_retries.max(1) {
            if attempt > 0 {
                self.pause(self.config.retry_delay())?;
            }
            let frame = self.capture()?;
            if self.first_detection(slider, &frame)?.is_none() {
                tracing::info!(drags, "Skipped are you there");
                return Ok(true);
            }
        }
        Err(Error::Slider("still visible after tapping continue".to_string()))
    }

    fn continue_button(&self, frame: &Frame) -> Result<Option<Detection>> {
        match &self.config.continue_asset {
            Some(asset) => self.first_detection(asset, frame),
            None => Ok(None),
        }
    }

    fn first_detection(&self, asset: &AssetId, frame: &Frame) -> Result<Option<Detection>> {
        Ok(self
            .detector
            .detect(asset, frame, MatchOptions::default())?
            .into_iter()
            .next())
    }
}
