//! Interrupt-aware navigation over a frame source
//!
//! The navigator keeps no notion of "current screen". Whether the application
//! is in its normal state is inferred per query from the configured landmark
//! assets; when it is not, the ad handler runs before the query is trusted.
//! The slider handler runs on every containment query.

use crate::config::NavigationConfig;
use crate::progress::{ProgressLevel, ProgressSink};
use crate::sequence::Sequence;
use automon_core::asset::describe;
use automon_core::{AssetId, Error, Frame, FrameCell, FrameSource, Result, RunControl};
use automon_cv::{Detector, MatchOptions};
use std::slice;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Longest uninterrupted sleep; cancellation is observed at this granularity
const TICK: Duration = Duration::from_millis(100);

/// Options for [`Navigator::screen_contains`]
#[derive(Debug, Clone)]
pub struct ContainsOptions {
    pub retries: u32,
    pub threshold: Option<f32>,
    pub grayscale: bool,
    pub skip_interrupts: bool,
    /// Frame to inspect on the first attempt instead of capturing
    pub frame: Option<Arc<Frame>>,
}

impl Default for ContainsOptions {
    fn default() -> Self {
        Self {
            retries: 1,
            threshold: None,
            grayscale: false,
            skip_interrupts: false,
            frame: None,
        }
    }
}

impl ContainsOptions {
    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn threshold(mut self, threshold: f32) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn grayscale(mut self) -> Self {
        self.grayscale = true;
        self
    }

    pub fn skip_interrupts(mut self) -> Self {
        self.skip_interrupts = true;
        self
    }

    pub fn frame(mut self, frame: Arc<Frame>) -> Self {
        self.frame = Some(frame);
        self
    }

    fn match_options(&self) -> MatchOptions {
        MatchOptions {
            threshold: self.threshold,
            grayscale: self.grayscale,
        }
    }
}

/// Options for [`Navigator::wait_for`]
#[derive(Debug, Clone, Default)]
pub struct WaitOptions {
    pub timeout: Duration,
    /// Sleep after the assets appeared
    pub pause_after: Duration,
    /// Fail with [`Error::Wait`] instead of returning `false`
    pub raise: bool,
    pub skip_interrupts: bool,
}

impl WaitOptions {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Default::default()
        }
    }

    pub fn pause_after(mut self, pause: Duration) -> Self {
        self.pause_after = pause;
        self
    }

    pub fn raise(mut self) -> Self {
        self.raise = true;
        self
    }

    pub fn skip_interrupts(mut self) -> Self {
        self.skip_interrupts = true;
        self
    }
}

/// Options for [`Navigator::click`]
#[derive(Debug, Clone, Default)]
pub struct ClickOptions {
    /// Which detection to tap when an asset appears several times
    pub index: usize,
    /// Pause after the tap; the configured click pause when `None`
    pub pause: Option<Duration>,
    pub frame: Option<Arc<Frame>>,
    pub raise: bool,
    pub threshold: Option<f32>,
    pub grayscale: bool,
    pub skip_interrupts: bool,
}

impl ClickOptions {
    pub fn index(mut self, index: usize) -> Self {
        self.index = index;
        self
    }

    pub fn pause(mut self, pause: Duration) -> Self {
        self.pause = Some(pause);
        self
    }

    pub fn frame(mut self, frame: Arc<Frame>) -> Self {
        self.frame = Some(frame);
        self
    }

    pub fn raise(mut self) -> Self {
        self.raise = true;
        self
    }

    pub fn threshold(mut self, threshold: f32) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn grayscale(mut self) -> Self {
        self.grayscale = true;
        self
    }

    pub fn skip_interrupts(mut self) -> Self {
        self.skip_interrupts = true;
        self
    }
}

/// Options for [`Navigator::follow_sequence`]
#[derive(Debug, Clone)]
pub struct FollowOptions {
    pub max_tries: u32,
    /// Limit for each individual wait
    pub timeout: Duration,
    pub raise: bool,
}

impl FollowOptions {
    pub fn new(timeout: Duration) -> Self {
        Self {
            max_tries: 1,
            timeout,
            raise: false,
        }
    }

    pub fn max_tries(mut self, max_tries: u32) -> Self {
        self.max_tries = max_tries;
        self
    }

    pub fn raise(mut self) -> Self {
        self.raise = true;
        self
    }
}

type ResetFn<'a, S> = &'a mut dyn FnMut(&mut Navigator<S>) -> Result<()>;

/// Drives a [`FrameSource`] by what is visible on its screen
pub struct Navigator<S: FrameSource> {
    pub(crate) source: S,
    pub(crate) detector: Detector,
    pub(crate) config: NavigationConfig,
    control: RunControl,
    last_frame: FrameCell,
    progress: Option<ProgressSink>,
}

impl<S: FrameSource> Navigator<S> {
    /// Create a navigator, checking the configured assets against the detector's store
    pub fn new(source: S, detector: Detector, config: NavigationConfig) -> Result<Self> {
        config.validate(detector.store())?;
        Ok(Self {
            source,
            detector,
            config,
            control: RunControl::new(),
            last_frame: FrameCell::new(),
            progress: None,
        })
    }

    /// Share cancel and freeze flags with a host
    pub fn with_control(mut self, control: RunControl) -> Self {
        self.control = control;
        self
    }

    pub fn with_progress(mut self, sink: ProgressSink) -> Self {
        self.progress = Some(sink);
        self
    }

    pub fn control(&self) -> &RunControl {
        &self.control
    }

    pub fn config(&self) -> &NavigationConfig {
        &self.config
    }

    pub fn detector(&self) -> &Detector {
        &self.detector
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn into_source(self) -> S {
        self.source
    }

    /// Reader handle on the most recent frame
    pub fn frame_cell(&self) -> FrameCell {
        self.last_frame.clone()
    }

    pub fn last_frame(&self) -> Option<Arc<Frame>> {
        self.last_frame.latest()
    }

    pub(crate) fn report(&self, level: ProgressLevel, message: &str) {
        if let Some(sink) = &self.progress {
            sink(level, message);
        }
    }

    /// Capture a fresh frame, blocking while frozen
    pub fn capture(&mut self) -> Result<Arc<Frame>> {
        while self.control.is_frozen() {
            self.control.check()?;
            std::thread::sleep(TICK);
        }
        self.control.check()?;

        let frame = self.source.capture_frame()?;
        Ok(self.last_frame.store(frame))
    }

    /// Sleep in short ticks, aborting on cancellation
    pub fn pause(&self, duration: Duration) -> Result<()> {
        let deadline = Instant::now() + duration;
        loop {
            self.control.check()?;
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            std::thread::sleep((deadline - now).min(TICK));
        }
    }

    /// Press and release at a device point
    pub fn tap(&mut self, x: i32, y: i32) -> Result<()> {
        self.control.check()?;
        tracing::debug!(x, y, "tap");
        self.source.tap(x, y)?;
        self.pause(Duration::from_millis(self.config.tap_hold_ms))
    }

    /// Whether any of `assets` is on screen, dismissing interrupts first
    pub fn screen_contains(&mut self, assets: &[AssetId], options: ContainsOptions) -> Result<bool> {
        Ok(self.find_frame(assets, options)?.is_some())
    }

    /// Frame in which one of `assets` was found
    pub(crate) fn find_frame(&mut self, assets: &[AssetId], options: ContainsOptions) -> Result<Option<Arc<Frame>>> {
        let match_options = options.match_options();
        let mut given = options.frame;

        for attempt in 0..options.retries.max(1) {
            if attempt > 0 {
                self.pause(self.config.retry_delay())?;
            }
            let mut frame = match given.take() {
                Some(frame) => frame,
                None => self.capture()?,
            };

            if !options.skip_interrupts && !self.in_application(Some(frame.clone()))? && self.skip_ad()? {
                frame = self.capture()?;
            }
            if self.skip_slider(&frame)? {
                frame = self.capture()?;
            }

            for asset in assets {
                if !self.detector.detect(asset, &frame, match_options)?.is_empty() {
                    return Ok(Some(frame));
                }
            }
        }

        Ok(None)
    }

    /// Whether the application shows one of its normal-state landmarks.
    ///
    /// Without configured landmarks the application is always considered in
    /// its normal state and ads are never handled.
    pub fn in_application(&mut self, frame: Option<Arc<Frame>>) -> Result<bool> {
        if self.config.in_app_assets.is_empty() {
            return Ok(true);
        }
        let assets = self.config.in_app_assets.clone();
        let mut options = ContainsOptions::default().skip_interrupts();
        options.frame = frame;
        self.screen_contains(&assets, options)
    }

    /// Poll until any of `assets` appears or the timeout passes
    pub fn wait_for(&mut self, assets: &[AssetId], options: WaitOptions) -> Result<bool> {
        let start = Instant::now();

        while start.elapsed() < options.timeout {
            let mut contains = ContainsOptions::default();
            contains.skip_interrupts = options.skip_interrupts;
            if self.screen_contains(assets, contains)? {
                self.pause(options.pause_after)?;
                return Ok(true);
            }
            self.pause(self.config.poll_interval())?;
        }

        tracing::debug!("gave up waiting for [{}] after {:?}", describe(assets), options.timeout);
        if options.raise {
            return Err(Error::Wait {
                assets: describe(assets),
                timeout: options.timeout,
            });
        }
        Ok(false)
    }

    /// Tap the first of `assets` present on screen
    pub fn click(&mut self, assets: &[AssetId], options: ClickOptions) -> Result<bool> {
        let frame = match options.frame.clone() {
            Some(frame) => frame,
            None => self.capture()?,
        };
        let match_options = MatchOptions {
            threshold: options.threshold,
            grayscale: options.grayscale,
        };

        for asset in assets {
            let contains = ContainsOptions {
                retries: 1,
                threshold: options.threshold,
                grayscale: options.grayscale,
                skip_interrupts: options.skip_interrupts,
                frame: Some(frame.clone()),
            };
            let Some(found_in) = self.find_frame(slice::from_ref(asset), contains)? else {
                continue;
            };

            let detections = self.detector.detect(asset, &found_in, match_options)?;
            let Some(target) = detections.get(options.index) else {
                return Err(Error::Click(format!(
                    "index {} is out of range for asset {} ({} found)",
                    options.index,
                    asset,
                    detections.len()
                )));
            };

            tracing::debug!("click {} at ({}, {})", asset, target.x, target.y);
            self.tap(target.x, target.y)?;
            self.pause(options.pause.unwrap_or(Duration::from_millis(self.config.click_pause_ms)))?;
            return Ok(true);
        }

        if options.raise {
            return Err(Error::Click(format!("could not find any of [{}]", describe(assets))));
        }
        Ok(false)
    }

    /// Device back action, clearing an ad first unless told otherwise
    pub fn click_back(&mut self, skip_interrupts: bool) -> Result<()> {
        if !skip_interrupts && !self.in_application(None)? {
            self.skip_ad()?;
        }
        self.control.check()?;
        self.source.back()?;
        self.pause(Duration::from_millis(self.config.back_pause_ms))
    }

    /// Walk a sequence: wait for the first step, then click each step and
    /// wait for the one after it.
    pub fn follow_sequence(&mut self, sequence: &Sequence, options: FollowOptions) -> Result<bool> {
        self.follow_with(sequence, &options, None)
    }

    /// Like [`follow_sequence`](Self::follow_sequence), calling `reset`
    /// before every retry to bring the screen back to a known state
    pub fn follow_sequence_with_reset<F>(&mut self, sequence: &Sequence, options: FollowOptions, mut reset: F) -> Result<bool>
    where
        F: FnMut(&mut Navigator<S>) -> Result<()>,
    {
        let reset: ResetFn<'_, S> = &mut reset;
        self.follow_with(sequence, &options, Some(reset))
    }

    fn follow_with(&mut self, sequence: &Sequence, options: &FollowOptions, mut reset: Option<ResetFn<'_, S>>) -> Result<bool> {
        let tries = options.max_tries.max(1);
        let mut failed_at = 0;

        for attempt in 0..tries {
            if attempt > 0 {
                tracing::info!("Failed to follow sequence '{}' at step {}, trying again", sequence.name(), failed_at);
                if let Some(reset) = reset.as_mut() {
                    reset(self)?;
                }
            }
            match self.run_sequence(sequence, options.timeout)? {
                None => return Ok(true),
                Some(step) => failed_at = step,
            }
        }

        if options.raise {
            return Err(Error::FollowSequence {
                step: failed_at,
                assets: describe(sequence.step_assets(failed_at)),
                tries,
            });
        }
        Ok(false)
    }

    /// One pass over the sequence, returning the failing step if any
    fn run_sequence(&mut self, sequence: &Sequence, timeout: Duration) -> Result<Option<usize>> {
        if !self.wait_for(sequence.step_assets(0), WaitOptions::new(timeout))? {
            return Ok(Some(0));
        }

        for (i, pair) in sequence.steps().windows(2).enumerate() {
            let Some(current) = &pair[0] else {
                return Ok(Some(i));
            };
            let mut click = ClickOptions::default();
            click.frame = self.last_frame.latest();
            if !self.click(current.assets(), click)? {
                return Ok(Some(i));
            }
            if let Some(next) = &pair[1] {
                if !self.wait_for(next.assets(), WaitOptions::new(timeout))? {
                    return Ok(Some(i));
                }
            }
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::Step;
    use crate::source::ReplaySource;
    use automon_cv::{DetectionConfig, Template, TemplateStore};
    use image::{Rgb, RgbImage};

    fn marker(seed: u32) -> RgbImage {
        let mut state = seed;
        RgbImage::from_fn(6, 6, |_, _| {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let v = (state >> 16) as u8;
            Rgb([v, v.rotate_left(3), !v])
        })
    }

    fn screen(with: &[(&RgbImage, u32, u32)]) -> Frame {
        let mut image = RgbImage::from_pixel(64, 48, Rgb([20, 20, 20]));
        for (img, x, y) in with {
            image::imageops::replace(&mut image, *img, *x as i64, *y as i64);
        }
        Frame::new(image)
    }

    fn navigator(frames: Vec<Frame>) -> Navigator<ReplaySource> {
        let store = TemplateStore::from_templates([
            Template::new(AssetId::new("a"), marker(1)),
            Template::new(AssetId::new("b"), marker(90)),
        ]);
        let detector = Detector::new(DetectionConfig::default(), store);
        Navigator::new(ReplaySource::new(frames), detector, NavigationConfig::fast()).unwrap()
    }

    fn ids(names: &[&str]) -> Vec<AssetId> {
        names.iter().map(|n| AssetId::new(n)).collect()
    }

    #[test]
    fn test_screen_contains_retries_capture() -> Result<()> {
        let a = marker(1);
        let mut nav = navigator(vec![screen(&[]), screen(&[]), screen(&[(&a, 10, 10)])]);

        assert!(!nav.screen_contains(&ids(&["a"]), ContainsOptions::default().retries(2))?);
        assert!(nav.screen_contains(&ids(&["a"]), ContainsOptions::default())?);
        assert_eq!(nav.source().captures(), 3);
        Ok(())
    }

    #[test]
    fn test_given_frame_used_first() -> Result<()> {
        let a = marker(1);
        let mut nav = navigator(vec![screen(&[])]);
        let given = Arc::new(screen(&[(&a, 4, 4)]));

        assert!(nav.screen_contains(&ids(&["a"]), ContainsOptions::default().frame(given))?);
        assert_eq!(nav.source().captures(), 0);
        Ok(())
    }

    #[test]
    fn test_click_taps_detection() -> Result<()> {
        let b = marker(90);
        let mut nav = navigator(vec![screen(&[(&b, 40, 30)])]);

        assert!(nav.click(&ids(&["a", "b"]), ClickOptions::default())?);
        assert_eq!(nav.source().taps().collect::<Vec<_>>(), vec![(43, 33)]);
        Ok(())
    }

    #[test]
    fn test_click_index_out_of_range() {
        let a = marker(1);
        let mut nav = navigator(vec![screen(&[(&a, 10, 10)])]);
        let err = nav.click(&ids(&["a"]), ClickOptions::default().index(1)).unwrap_err();
        assert!(matches!(err, Error::Click(_)));
    }

    #[test]
    fn test_click_nothing_found() -> Result<()> {
        let mut nav = navigator(vec![screen(&[])]);
        assert!(!nav.click(&ids(&["a", "b"]), ClickOptions::default())?);
        assert!(matches!(
            nav.click(&ids(&["a"]), ClickOptions::default().raise()),
            Err(Error::Click(_))
        ));
        assert_eq!(nav.source().taps().count(), 0);
        Ok(())
    }

    #[test]
    fn test_wait_for_raise() {
        let mut nav = navigator(vec![screen(&[])]);
        let err = nav
            .wait_for(&ids(&["a"]), WaitOptions::new(Duration::from_millis(30)).raise())
            .unwrap_err();
        assert!(matches!(err, Error::Wait { assets, .. } if assets == "a"));
    }

    #[test]
    fn test_follow_sequence_success() -> Result<()> {
        let (a, b) = (marker(1), marker(90));
        let mut nav = navigator(vec![screen(&[(&a, 10, 10)]), screen(&[(&b, 30, 20)])]);
        let sequence = Sequence::new(
            "a_then_b",
            vec![Some(Step::from(AssetId::new("a"))), Some(Step::from(AssetId::new("b"))), None],
        )?;

        assert!(nav.follow_sequence(&sequence, FollowOptions::new(Duration::from_millis(100)))?);
        assert_eq!(nav.source().taps().collect::<Vec<_>>(), vec![(13, 13), (33, 23)]);
        Ok(())
    }

    #[test]
    fn test_follow_sequence_resets_between_tries() -> Result<()> {
        let a = marker(1);
        let mut nav = navigator(vec![screen(&[(&a, 10, 10)])]);
        let sequence = Sequence::new(
            "never_b",
            vec![Some(Step::from(AssetId::new("a"))), Some(Step::from(AssetId::new("b")))],
        )?;

        let mut resets = 0;
        let options = FollowOptions::new(Duration::from_millis(20)).max_tries(3);
        let followed = nav.follow_sequence_with_reset(&sequence, options, |_| {
            resets += 1;
            Ok(())
        })?;
        assert!(!followed);
        assert_eq!(resets, 2);
        assert_eq!(nav.source().taps().count(), 3);
        Ok(())
    }

    #[test]
    fn test_frozen_capture_honors_cancel() {
        let mut nav = navigator(vec![screen(&[])]);
        let control = nav.control().clone();
        control.freeze();

        let host = control.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            host.cancel();
        });
        assert!(nav.capture().unwrap_err().is_cancelled());
        handle.join().unwrap();
        assert_eq!(nav.source().captures(), 0);
        assert!(!control.is_cancel_requested());
    }
}
