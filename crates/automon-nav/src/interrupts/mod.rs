//! Handlers for transient overlays
//!
//! Both handlers are extra `impl` blocks on [`Navigator`](crate::Navigator)
//! so they share its capture, cancellation and pause plumbing.

mod ads;
mod slider;

use serde::Serialize;

/// Result of looking for a well-known ad close button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NavigationOutcome {
    /// Closed, and the application is back
    Skipped,
    NotFound,
    /// Closed, but the ad offered to resume and was resumed
    Resumed,
}
