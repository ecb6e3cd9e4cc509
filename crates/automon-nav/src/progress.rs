//! Human-readable status for a host UI

use serde::Serialize;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for ProgressLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProgressLevel::Debug => "debug",
            ProgressLevel::Info => "info",
            ProgressLevel::Warning => "warning",
            ProgressLevel::Error => "error",
        };
        f.write_str(name)
    }
}

/// Callback receiving status lines, callable from the worker thread
pub type ProgressSink = Arc<dyn Fn(ProgressLevel, &str) + Send + Sync>;

/// Sink that forwards status lines to `tracing`
pub fn tracing_sink() -> ProgressSink {
    Arc::new(|level, message| match level {
        ProgressLevel::Debug => tracing::debug!("{}", message),
        ProgressLevel::Info => tracing::info!("{}", message),
        ProgressLevel::Warning => tracing::warn!("{}", message),
        ProgressLevel::Error => tracing::error!("{}", message),
    })
}
