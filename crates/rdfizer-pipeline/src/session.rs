//! Per-run identity and the wrapper log location.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

/// Identity stamped on every artifact a run writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunIdentity {
    /// `%Y%m%dT%H%M%S`
    pub run_id: String,
    /// `%Y-%m-%dT%H:%M:%S`
    pub timestamp: String,
}

impl RunIdentity {
    /// Identity for the current local time.
    pub fn now() -> Self {
        Self::at(Local::now())
    }

    /// Identity for `moment`.
    pub fn at(moment: DateTime<Local>) -> Self {
        Self {
            run_id: moment.format("%Y%m%dT%H%M%S").to_string(),
            timestamp: moment.format("%Y-%m-%dT%H:%M:%S").to_string(),
        }
    }

    /// Identity from preformatted values.
    pub fn new(run_id: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            timestamp: timestamp.into(),
        }
    }
}

/// `<metrics>/.wrapper_logs/wrapper-<run_id>.log`
pub fn wrapper_log_path(metrics_dir: &Path, run_id: &str) -> PathBuf {
    metrics_dir
        .join(".wrapper_logs")
        .join(format!("wrapper-{run_id}.log"))
}
