//! Error types
//!
//! Construction-time failures are typed and fatal. Per-call failures inside
//! the pipeline are logged and recovered locally, so only constructors and
//! loaders return these.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid TOML in {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(String),

    #[error("{stage}.{field} must have exactly 3 entries, got {len}")]
    ChannelStats {
        stage: &'static str,
        field: &'static str,
        len: usize,
    },

    #[error("{stage}.std[{index}] must be positive, got {value}")]
    NonPositiveStd {
        stage: &'static str,
        index: usize,
        value: f32,
    },

    #[error("{field} must be within [0, 1], got {value}")]
    ThresholdOutOfRange { field: &'static str, value: f32 },

    #[error("{stage}.{field} is invalid: {reason}")]
    InvalidField {
        stage: &'static str,
        field: &'static str,
        reason: String,
    },

    #[error("{stage}.input_shape {template:?} is invalid: {reason}")]
    ShapeTemplate {
        stage: &'static str,
        template: Vec<i64>,
        reason: String,
    },

    #[error("{stage} model not found: {path}")]
    ModelNotFound { stage: &'static str, path: PathBuf },
}

/// Character dictionary loading errors
#[derive(Debug, Error)]
pub enum DictionaryError {
    #[error("Failed to read dictionary {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Dictionary is empty")]
    Empty,
}

/// Failures reported by an inference backend
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Failed to create ONNX session: {0}")]
    Session(String),

    #[error("Model has no input named {0}")]
    UnknownInput(String),

    #[error("Model has no output named {0}")]
    UnknownOutput(String),

    #[error("Failed to build input tensor: {0}")]
    Tensor(String),

    #[error("Inference failed: {0}")]
    Run(String),

    #[error("Failed to extract output {name}: {reason}")]
    Extract { name: String, reason: String },

    #[error("Model produced no outputs")]
    NoOutputs,
}

/// Umbrella error returned by pipeline constructors
#[derive(Debug, Error)]
pub enum OcrError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Dictionary(#[from] DictionaryError),

    #[error(transparent)]
    Inference(#[from] InferenceError),

    #[error("Pipeline pool needs at least one worker")]
    EmptyPool,

    #[error("Pipeline pool is closed")]
    PoolClosed,
}
