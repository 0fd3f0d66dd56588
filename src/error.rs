//! Error handling for sensorflow
//!
//! This module defines the crate-level error type and a Result alias.
//! Configuration problems found while wiring the analysis graph live in
//! [`crate::pipeline::PipelineError`] and are wrapped here.

use crate::pipeline::PipelineError;
use thiserror::Error;

/// Main error type for sensorflow operations
#[derive(Error, Debug)]
pub enum SensorflowError {
    /// Errors found while building the analysis graph
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Errors in the experiment definition itself
    #[error("Configuration error: {0}")]
    Config(String),

    /// TOML parse errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON parse errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Errors related to the scheduler thread
    #[error("Scheduler error: {0}")]
    Scheduler(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<SensorflowError>,
    },
}

impl SensorflowError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        SensorflowError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

/// Result type alias for sensorflow operations
pub type Result<T> = std::result::Result<T, SensorflowError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<SensorflowError>,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.into().with_context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SensorflowError::Config("no buffers declared".to_string());
        assert_eq!(err.to_string(), "Configuration error: no buffers declared");
    }

    #[test]
    fn test_error_with_context() {
        let err = SensorflowError::Scheduler("thread panicked".to_string());
        let with_ctx = err.with_context("Failed to stop session");
        assert!(with_ctx.to_string().contains("Failed to stop session"));
        assert!(with_ctx.to_string().contains("thread panicked"));
    }

    #[test]
    fn test_pipeline_error_converts() {
        let result: std::result::Result<(), PipelineError> = Err(PipelineError::CycleDetected {
            modules: vec!["a".into(), "b".into()],
        });
        let err = result.context("Loading experiment").unwrap_err();
        let text = err.to_string();
        assert!(text.starts_with("Loading experiment"));
        assert!(text.contains("a -> b"));
    }
}
