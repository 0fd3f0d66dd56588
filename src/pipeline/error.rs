//! Pipeline-specific error types.
//!
//! All of these are configuration errors: they are raised while the graph is
//! being compiled and prevent the experiment from starting. Runtime numeric
//! edge cases never produce an error.

use thiserror::Error;

/// Errors that can occur while building the analysis graph.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("Module '{module}': missing required input '{input}'")]
    MissingInput { module: String, input: String },

    #[error("Module '{module}': missing required output '{output}'")]
    MissingOutput { module: String, output: String },

    #[error("Module '{module}': needs at least one {what}")]
    NoBindings { module: String, what: &'static str },

    #[error("Module '{module}': unknown input '{input}'")]
    UnknownInput { module: String, input: String },

    #[error("Module '{module}': unknown output '{output}'")]
    UnknownOutput { module: String, output: String },

    #[error("Module '{module}': input '{input}' must be bound to a buffer")]
    BufferRequired { module: String, input: String },

    #[error("Module '{module}': binding '{binding}' references unknown buffer '{buffer}'")]
    UnknownBuffer {
        module: String,
        binding: String,
        buffer: String,
    },

    #[error("Buffer '{0}' is declared more than once")]
    DuplicateBuffer(String),

    #[error("Module name '{0}' is used more than once")]
    DuplicateModule(String),

    #[error("Buffer '{buffer}' is written by both '{first}' and '{second}'")]
    DuplicateWriter {
        buffer: String,
        first: String,
        second: String,
    },

    #[error("Cycle detected between modules: {}", .modules.join(" -> "))]
    CycleDetected { modules: Vec<String> },

    #[error(
        "Module '{module}': output '{output}' produces up to {produced} values but buffer '{buffer}' holds {capacity}"
    )]
    ArityMismatch {
        module: String,
        output: String,
        buffer: String,
        produced: usize,
        capacity: usize,
    },

    #[error("Module '{module}': unknown parameter '{param}'")]
    UnknownParameter { module: String, param: String },

    #[error("Module '{module}': invalid value for parameter '{param}': {message}")]
    InvalidParameter {
        module: String,
        param: String,
        message: String,
    },
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
