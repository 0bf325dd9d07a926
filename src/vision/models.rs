//! Inference backends
//!
//! The pipeline treats the model as an opaque function from one NCHW tensor
//! to a list of output tensors. [`OnnxEngine`] is the ONNX Runtime
//! implementation used in production; tests substitute scripted engines.

use ndarray::{Array4, ArrayD};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{ConfigError, InferenceError, OcrError};

/// Tensor in, tensors out
pub trait InferenceEngine: Send {
    /// Run the model on `input`, feeding it as the first of `input_names` and
    /// returning the outputs listed in `output_names` (all outputs, in model
    /// order, when the list is empty)
    fn run(
        &mut self,
        input: &Array4<f32>,
        input_names: &[String],
        output_names: &[String],
    ) -> Result<Vec<ArrayD<f32>>, InferenceError>;

    /// Describe the loaded model
    fn metadata(&self) -> EngineMetadata {
        EngineMetadata::default()
    }
}

/// Model description reported by `info`
#[derive(Debug, Clone, Default, Serialize)]
pub struct EngineMetadata {
    pub model_path: Option<PathBuf>,
    pub inputs: Vec<TensorInfo>,
    pub outputs: Vec<TensorInfo>,
}

/// Tensor shape information
#[derive(Debug, Clone, Serialize)]
pub struct TensorInfo {
    pub name: String,
    pub shape: Vec<i64>,
}

/// ONNX Runtime session
pub struct OnnxEngine {
    session: Session,
    model_path: PathBuf,
    input_names: Vec<String>,
    output_names: Vec<String>,
}

impl OnnxEngine {
    /// Create a new ONNX session from a model file
    pub fn new(stage: &'static str, model_path: &Path, intra_threads: usize) -> Result<Self, OcrError> {
        if !model_path.exists() {
            return Err(ConfigError::ModelNotFound {
                stage,
                path: model_path.to_path_buf(),
            }
            .into());
        }

        info!("Loading {} model from {:?}", stage, model_path);

        let session = build_session(model_path, intra_threads)
            .map_err(|e| InferenceError::Session(format!("{}: {}", model_path.display(), e)))?;

        let input_names: Vec<String> = session
            .inputs
            .iter()
            .map(|input| input.name.clone())
            .collect();

        let output_names: Vec<String> = session
            .outputs
            .iter()
            .map(|output| output.name.clone())
            .collect();

        info!(
            "Model loaded. Inputs: {:?}, Outputs: {:?}",
            input_names, output_names
        );

        Ok(Self {
            session,
            model_path: model_path.to_path_buf(),
            input_names,
            output_names,
        })
    }

    /// Check configured tensor names against the model
    pub fn check_names(&self, inputs: &[String], outputs: &[String]) -> Result<(), InferenceError> {
        if let Some(name) = inputs.first() {
            if !self.input_names.contains(name) {
                return Err(InferenceError::UnknownInput(name.clone()));
            }
        }
        if let Some(name) = outputs.iter().find(|n| !self.output_names.contains(n)) {
            return Err(InferenceError::UnknownOutput(name.clone()));
        }
        Ok(())
    }

    /// Get input names
    pub fn input_names(&self) -> &[String] {
        &self.input_names
    }

    /// Get output names
    pub fn output_names(&self) -> &[String] {
        &self.output_names
    }
}

fn build_session(model_path: &Path, intra_threads: usize) -> ort::Result<Session> {
    Session::builder()?
        .with_execution_providers([CPUExecutionProvider::default().build()])?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .with_intra_threads(intra_threads)?
        .commit_from_file(model_path)
}

/// Extract shape from ONNX value type
fn extract_shape(value_type: &ort::value::ValueType) -> Vec<i64> {
    value_type
        .tensor_shape()
        .map(|shape| shape.iter().copied().collect())
        .unwrap_or_default()
}

impl InferenceEngine for OnnxEngine {
    fn run(
        &mut self,
        input: &Array4<f32>,
        input_names: &[String],
        output_names: &[String],
    ) -> Result<Vec<ArrayD<f32>>, InferenceError> {
        let input_name = input_names
            .first()
            .or_else(|| self.input_names.first())
            .cloned()
            .ok_or_else(|| InferenceError::UnknownInput(String::new()))?;

        let wanted: Vec<String> = if output_names.is_empty() {
            self.output_names.clone()
        } else {
            output_names.to_vec()
        };
        if let Some(name) = wanted.iter().find(|n| !self.output_names.contains(n)) {
            return Err(InferenceError::UnknownOutput(name.clone()));
        }

        let input_value =
            Value::from_array(input.to_owned()).map_err(|e| InferenceError::Tensor(e.to_string()))?;

        let outputs = self
            .session
            .run(ort::inputs![input_name.as_str() => input_value])
            .map_err(|e| InferenceError::Run(e.to_string()))?;

        let mut tensors = Vec::with_capacity(wanted.len());
        for name in &wanted {
            let array = outputs[name.as_str()]
                .try_extract_array::<f32>()
                .map_err(|e| InferenceError::Extract {
                    name: name.clone(),
                    reason: e.to_string(),
                })?;
            debug!("Output {} shape: {:?}", name, array.shape());
            tensors.push(array.to_owned());
        }

        if tensors.is_empty() {
            return Err(InferenceError::NoOutputs);
        }
        Ok(tensors)
    }

    fn metadata(&self) -> EngineMetadata {
        EngineMetadata {
            model_path: Some(self.model_path.clone()),
            inputs: self
                .session
                .inputs
                .iter()
                .map(|input| TensorInfo {
                    name: input.name.clone(),
                    shape: extract_shape(&input.input_type),
                })
                .collect(),
            outputs: self
                .session
                .outputs
                .iter()
                .map(|output| TensorInfo {
                    name: output.name.clone(),
                    shape: extract_shape(&output.output_type),
                })
                .collect(),
        }
    }
}
