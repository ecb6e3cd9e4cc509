//! Error kinds surfaced by detection and navigation

use std::time::Duration;
use thiserror::Error;

/// Errors raised by the detection engine and the navigator.
///
/// A missing match is never an error; only invalid input, exhausted loops,
/// device failures and cancellation are.
#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown asset '{0}'")]
    UnknownAsset(String),

    #[error("threshold {0} is outside [0, 1]")]
    InvalidThreshold(f32),

    #[error("frame is empty")]
    EmptyFrame,

    #[error("could not find any of [{assets}] within {timeout:?}")]
    Wait { assets: String, timeout: Duration },

    #[error("failed to follow sequence at step {step} ([{assets}]) after {tries} tries")]
    FollowSequence {
        step: usize,
        assets: String,
        tries: u32,
    },

    #[error("click failed: {0}")]
    Click(String),

    #[error("slider challenge not cleared: {0}")]
    Slider(String),

    #[error("failed to skip ad after {0} iterations")]
    SkipAd(usize),

    #[error("invalid sequence: {0}")]
    InvalidSequence(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("device error: {0:#}")]
    Device(#[from] anyhow::Error),
}

impl Error {
    /// Cancellation is a cooperative abort, not a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
