//! Replay of recorded frames

use anyhow::Context;
use automon_core::{Frame, FrameSource, Orientation};
use automon_cv::utils::ImageUtils;
use image::RgbImage;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Input injected into a [`ReplaySource`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum InputEvent {
    Tap { x: i32, y: i32 },
    Swipe { x1: i32, y1: i32, x2: i32, y2: i32 },
    Back,
}

/// When a replay moves on to its next frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Advance {
    /// Every capture returns the next frame
    #[default]
    EveryCapture,
    /// The screen changes only in response to input
    OnInput,
}

/// A [`FrameSource`] replaying a fixed list of frames.
///
/// Once the list runs out the last frame is repeated. Injected input is
/// recorded rather than executed.
#[derive(Debug, Clone)]
pub struct ReplaySource {
    frames: Vec<Frame>,
    cursor: usize,
    advance: Advance,
    captures: usize,
    events: Vec<InputEvent>,
    orientation: Orientation,
    resolution: (u32, u32),
}

impl ReplaySource {
    /// Replay frames that are already at canonical resolution
    pub fn new(frames: Vec<Frame>) -> Self {
        let resolution = frames
            .first()
            .map(|f| f.scale().native())
            .unwrap_or((automon_core::CANONICAL_WIDTH, automon_core::CANONICAL_HEIGHT));
        let orientation = if resolution.0 >= resolution.1 {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        };

        Self {
            frames,
            cursor: 0,
            advance: Advance::default(),
            captures: 0,
            events: Vec::new(),
            orientation,
            resolution,
        }
    }

    /// Replay device-native screenshots, normalizing each one
    pub fn from_images(images: impl IntoIterator<Item = RgbImage>) -> Self {
        Self::new(images.into_iter().map(Frame::canonicalize).collect())
    }

    /// Replay the images of a directory in file-name order
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> anyhow::Result<Self> {
        let dir = dir.as_ref();
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read frame directory: {:?}", dir))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .map(|ext| ext.to_string_lossy().to_lowercase())
                    .is_some_and(|ext| matches!(ext.as_str(), "png" | "jpg" | "jpeg" | "bmp"))
            })
            .collect();
        paths.sort();

        if paths.is_empty() {
            anyhow::bail!("No frames found in {:?}", dir);
        }

        let images = paths
            .iter()
            .map(ImageUtils::load_rgb)
            .collect::<anyhow::Result<Vec<_>>>()?;
        tracing::debug!(frames = images.len(), "replaying {:?}", dir);
        Ok(Self::from_images(images))
    }

    pub fn with_advance(mut self, advance: Advance) -> Self {
        self.advance = advance;
        self
    }

    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.resolution = (width, height);
        self
    }

    /// Change the reported orientation mid-replay
    pub fn set_orientation(&mut self, orientation: Orientation) {
        self.orientation = orientation;
    }

    pub fn events(&self) -> &[InputEvent] {
        &self.events
    }

    pub fn taps(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.events.iter().filter_map(|e| match *e {
            InputEvent::Tap { x, y } => Some((x, y)),
            _ => None,
        })
    }

    pub fn captures(&self) -> usize {
        self.captures
    }

    /// Index of the frame the next capture returns
    pub fn position(&self) -> usize {
        self.cursor
    }

    fn step(&mut self) {
        if self.cursor + 1 < self.frames.len() {
            self.cursor += 1;
        }
    }

    fn record(&mut self, event: InputEvent) {
        self.events.push(event);
        if self.advance == Advance::OnInput {
            self.step();
        }
    }
}

impl FrameSource for ReplaySource {
    fn capture_frame(&mut self) -> anyhow::Result<Frame> {
        let frame = self
            .frames
            .get(self.cursor)
            .cloned()
            .context("Replay has no frames")?;
        self.captures += 1;
        if self.advance == Advance::EveryCapture {
            self.step();
        }
        Ok(frame)
    }

    fn tap(&mut self, x: i32, y: i32) -> anyhow::Result<()> {
        self.record(InputEvent::Tap { x, y });
        Ok(())
    }

    fn swipe(&mut self, x1: i32, y1: i32, x2: i32, y2: i32, _duration_ms: u32) -> anyhow::Result<()> {
        self.record(InputEvent::Swipe { x1, y1, x2, y2 });
        Ok(())
    }

    fn back(&mut self) -> anyhow::Result<()> {
        self.record(InputEvent::Back);
        Ok(())
    }

    fn orientation(&mut self) -> anyhow::Result<Orientation> {
        Ok(self.orientation)
    }

    fn resolution(&self) -> (u32, u32) {
        self.resolution
    }
}
