//! Experiment definitions
//!
//! An experiment declares its buffers and the analysis modules wired between
//! them. Definitions are plain serde types and can be read from TOML or JSON:
//!
//! ```toml
//! [[buffers]]
//! name = "distance"
//! capacity = 1000
//!
//! [[buffers]]
//! name = "speed"
//! capacity = 1000
//!
//! [[modules]]
//! name = "speed"
//! kind = "divide"
//! inputs = [
//!     { name = "dividend", buffer = "distance" },
//!     { name = "divisor", value = 2.5 },
//! ]
//! outputs = [{ name = "out", buffer = "speed" }]
//! ```
//!
//! Loading a definition only checks its syntax. Wiring errors (unknown
//! buffers, cycles, missing inputs) are reported when a session is built
//! from it, see [`crate::pipeline::PipelineCompiler`].

pub mod settings;

pub use settings::*;

use crate::error::{Result, SensorflowError};
use crate::pipeline::ModuleKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Default buffer capacity when a definition does not give one
pub const DEFAULT_BUFFER_CAPACITY: usize = 1000;

/// Complete experiment definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// Optional display title
    #[serde(default)]
    pub title: Option<String>,

    /// Buffers, created in declaration order
    #[serde(default)]
    pub buffers: Vec<BufferConfig>,

    /// Analysis modules
    #[serde(default)]
    pub modules: Vec<ModuleConfig>,

    /// Scheduler settings
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

impl ExperimentConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML definition
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Parse a JSON definition
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load a definition from disk, choosing the format by file extension
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| SensorflowError::from(e).with_context(format!("{}", path.display())))?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&text),
            Some("json") => Self::from_json_str(&text),
            other => Err(SensorflowError::Config(format!(
                "Unsupported experiment file extension: {:?}",
                other.unwrap_or("")
            ))),
        }
    }

    pub fn with_buffer(mut self, buffer: BufferConfig) -> Self {
        self.buffers.push(buffer);
        self
    }

    pub fn with_module(mut self, module: ModuleConfig) -> Self {
        self.modules.push(module);
        self
    }
}

/// Declaration of one buffer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BufferConfig {
    /// Unique name within the experiment
    pub name: String,

    /// Maximum number of samples retained
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Write-once buffer (configuration values, edit fields)
    #[serde(default, rename = "static")]
    pub static_buffer: bool,

    /// Values written when the session is created
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub initial: Vec<f64>,
}

fn default_capacity() -> usize {
    DEFAULT_BUFFER_CAPACITY
}

impl BufferConfig {
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        Self {
            name: name.into(),
            capacity,
            static_buffer: false,
            initial: Vec::new(),
        }
    }

    /// Make this a write-once buffer holding `values`
    pub fn fixed(mut self, values: Vec<f64>) -> Self {
        self.static_buffer = true;
        self.initial = values;
        self
    }

    pub fn initial(mut self, values: Vec<f64>) -> Self {
        self.initial = values;
        self
    }
}

/// Declaration of one analysis module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleConfig {
    /// Name used in logs and error messages
    pub name: String,

    /// Operator
    pub kind: ModuleKind,

    /// Inputs in declaration order
    #[serde(default)]
    pub inputs: Vec<InputConfig>,

    /// Outputs in declaration order
    #[serde(default)]
    pub outputs: Vec<OutputConfig>,

    /// Operator-specific parameters
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, ParamValue>,
}

impl ModuleConfig {
    pub fn new(name: impl Into<String>, kind: ModuleKind) -> Self {
        Self {
            name: name.into(),
            kind,
            inputs: Vec::new(),
            outputs: Vec::new(),
            params: BTreeMap::new(),
        }
    }

    pub fn input_buffer(mut self, name: impl Into<String>, buffer: impl Into<String>) -> Self {
        self.inputs.push(InputConfig {
            name: name.into(),
            source: InputSource::Buffer(buffer.into()),
        });
        self
    }

    pub fn input_value(mut self, name: impl Into<String>, value: f64) -> Self {
        self.inputs.push(InputConfig {
            name: name.into(),
            source: InputSource::Value(value),
        });
        self
    }

    /// Clear-first output
    pub fn output(self, name: impl Into<String>, buffer: impl Into<String>) -> Self {
        self.output_with(name, buffer, true)
    }

    /// Appending output
    pub fn output_append(self, name: impl Into<String>, buffer: impl Into<String>) -> Self {
        self.output_with(name, buffer, false)
    }

    fn output_with(mut self, name: impl Into<String>, buffer: impl Into<String>, clear: bool) -> Self {
        self.outputs.push(OutputConfig {
            name: name.into(),
            buffer: buffer.into(),
            clear,
        });
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

/// One named input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputConfig {
    pub name: String,

    #[serde(flatten)]
    pub source: InputSource,
}

/// Where an input reads from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputSource {
    /// Contents of a named buffer
    Buffer(String),
    /// A fixed number
    Value(f64),
}

/// One named output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    pub name: String,

    /// Target buffer
    pub buffer: String,

    /// Replace the buffer's contents on every run instead of appending
    #[serde(default = "default_clear")]
    pub clear: bool,
}

fn default_clear() -> bool {
    true
}

/// Operator parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl ParamValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(v) => Some(*v),
            ParamValue::String(s) => match s.as_str() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Int(v) => Some(*v as f64),
            ParamValue::Float(v) => Some(*v),
            ParamValue::String(s) => s.trim().parse().ok(),
            ParamValue::Bool(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::String(v) => Some(v),
            _ => None,
        }
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::String(v.to_string())
    }
}
