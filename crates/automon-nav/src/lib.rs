//! Automon Navigation Library
//!
//! Screen-containment queries, timed waits and multi-step click sequences
//! over a [`FrameSource`](automon_core::FrameSource), with opportunistic
//! dismissal of slider challenges and advertisement interstitials.

pub mod config;
pub mod interrupts;
pub mod navigator;
pub mod progress;
pub mod sequence;
pub mod source;

pub use config::NavigationConfig;
pub use interrupts::NavigationOutcome;
pub use navigator::{ClickOptions, ContainsOptions, FollowOptions, Navigator, WaitOptions};
pub use progress::{ProgressLevel, ProgressSink};
pub use sequence::{Sequence, SequenceBook, Step};
pub use source::{InputEvent, ReplaySource};
