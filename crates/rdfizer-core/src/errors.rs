//! Structured error types shared across the rdfizer crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Exit code reported for validation and usage errors.
pub const EXIT_VALIDATION: u8 = 2;
/// Exit code reported when no more specific code is available.
pub const EXIT_FAILURE: u8 = 1;

/// Structured payload attached to every [`RdfizerError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (paths, prefixes, methods, etc.).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the caller resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Canonical error type for the conversion pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum RdfizerError {
    /// Bad CLI combinations, missing paths, unsupported methods or extensions.
    #[error("validation error: {0}")]
    Validation(ErrorInfo),
    /// Missing sibling TSV files or an expected triplet that was never produced.
    #[error("discovery error: {0}")]
    Discovery(ErrorInfo),
    /// An external tool exited with a non-zero status.
    #[error("external step failed: {info}")]
    ExternalStep {
        /// Diagnostic payload naming the failing step.
        info: ErrorInfo,
        /// Exit code reported by the external tool.
        exit_code: i32,
    },
    /// Failures while reading or rewriting the metrics ledger and its artifacts.
    #[error("ledger error: {0}")]
    Ledger(ErrorInfo),
    /// Failures while removing intermediates, including the container fallback.
    #[error("cleanup error: {0}")]
    Cleanup(ErrorInfo),
    /// Other filesystem failures.
    #[error("io error: {0}")]
    Io(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

impl RdfizerError {
    /// Shorthand for a [`RdfizerError::Validation`] error.
    pub fn validation(code: impl Into<String>, message: impl Into<String>) -> Self {
        RdfizerError::Validation(ErrorInfo::new(code, message))
    }

    /// Shorthand for a [`RdfizerError::Discovery`] error.
    pub fn discovery(code: impl Into<String>, message: impl Into<String>) -> Self {
        RdfizerError::Discovery(ErrorInfo::new(code, message))
    }

    /// Builds an [`RdfizerError::ExternalStep`] error for the named step.
    pub fn step_failed(step: &str, exit_code: i32) -> Self {
        RdfizerError::ExternalStep {
            info: ErrorInfo::new("external_step", format!("{step} failed"))
                .with_context("step", step)
                .with_context("exit_code", exit_code.to_string()),
            exit_code,
        }
    }

    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            RdfizerError::Validation(info)
            | RdfizerError::Discovery(info)
            | RdfizerError::Ledger(info)
            | RdfizerError::Cleanup(info)
            | RdfizerError::Io(info) => info,
            RdfizerError::ExternalStep { info, .. } => info,
        }
    }

    /// Process exit code the CLI reports for this error.
    ///
    /// Validation errors map to `2`; external failures surface the tool's own
    /// code when it fits a process status, everything else maps to `1`.
    pub fn exit_code(&self) -> u8 {
        match self {
            RdfizerError::Validation(_) => EXIT_VALIDATION,
            RdfizerError::ExternalStep { exit_code, .. } => match u8::try_from(*exit_code) {
                Ok(0) | Err(_) => EXIT_FAILURE,
                Ok(code) => code,
            },
            _ => EXIT_FAILURE,
        }
    }
}

/// Wraps an I/O failure on `path` into an [`RdfizerError::Io`].
pub fn io_error(code: &str, path: &std::path::Path, err: impl ToString) -> RdfizerError {
    RdfizerError::Io(
        ErrorInfo::new(code, err.to_string()).with_context("path", path.display().to_string()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn external_step_surfaces_tool_exit_code() {
        assert_eq!(RdfizerError::step_failed("gzip", 7).exit_code(), 7);
        assert_eq!(RdfizerError::step_failed("gzip", 0).exit_code(), 1);
        assert_eq!(RdfizerError::step_failed("gzip", -1).exit_code(), 1);
        assert_eq!(RdfizerError::step_failed("gzip", 300).exit_code(), 1);
    }

    #[test]
    fn display_includes_context_and_hint() {
        let err = RdfizerError::Validation(
            ErrorInfo::new("bad_flag", "mutually exclusive")
                .with_context("flag", "--build")
                .with_hint("drop one"),
        );
        let rendered = err.to_string();
        assert!(rendered.contains("flag=--build"));
        assert!(rendered.contains("hint: drop one"));
    }
}
