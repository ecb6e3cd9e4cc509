//! Bundled frame sources

pub mod replay;

pub use replay::{Advance, InputEvent, ReplaySource};
