//! Detection engine and its configuration

pub mod config;
pub mod detector;

pub use config::DetectionConfig;
pub use detector::{Detector, MatchOptions};
