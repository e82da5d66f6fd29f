use crate::errors::{InferenceError, ModelLoadError};
use ndarray::{Array4, ArrayD};
use ort::session::Session;
use ort::session::builder::GraphOptimizationLevel;
use ort::value::Tensor;
use std::path::Path;
use tracing::debug;

/// An onnxruntime inference session.
///
/// Both the detector and the classifier in this project are just wrappers
/// around an ONNX inference session that handles running the model on
/// hardware. Each model has one image input and we only read its first output.
pub struct OrtInferenceSession {
    session: Session,
    input_name: String,
    output_name: String,
}

impl OrtInferenceSession {
    pub fn new(model_path: &Path) -> Result<Self, ModelLoadError> {
        if !model_path.is_file() {
            return Err(ModelLoadError::MissingArtifact(model_path.to_path_buf()));
        }
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .commit_from_file(model_path)?;
        let input_name = match session.inputs.first() {
            Some(input) => input.name.clone(),
            None => "images".to_string(),
        };
        let output_name = match session.outputs.first() {
            Some(output) => output.name.clone(),
            None => "output0".to_string(),
        };
        debug!(?model_path, %input_name, %output_name, "created inference session");
        Ok(Self {
            session,
            input_name,
            output_name,
        })
    }

    /// Runs the model on a batch of one and returns its first output.
    pub fn run(&self, input_array: Array4<f32>) -> Result<ArrayD<f32>, InferenceError> {
        let input = Tensor::from_array(input_array)?;
        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => input]?)?;
        let output = outputs[self.output_name.as_str()]
            .try_extract_tensor::<f32>()?
            .into_owned();
        Ok(output)
    }
}
