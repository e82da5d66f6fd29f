use crate::classification::image_classifier::{
    Classification, ImageClassifier, classification_from_probabilities,
};
use crate::errors::{InferenceError, ModelLoadError};
use crate::image_utils::image_conversion::{TensorLayout, convert_rgb_image_to_owned_array};
use crate::image_utils::image_io::resize_rgb8;
use crate::object_detection::ort_inference_session::OrtInferenceSession;
use image::RgbImage;
use std::path::Path;

/// An image classifier exported to ONNX.
///
/// Input is one image resized to `input_size` x `input_size` with values in [0, 1]; output is a
/// probability for every label.
pub struct OnnxClassifier {
    ort_session: OrtInferenceSession,
    labels: Vec<String>,
    input_size: u32,
    layout: TensorLayout,
}

impl OnnxClassifier {
    pub fn new(
        model_path: &Path,
        labels: Vec<String>,
        input_size: u32,
        layout: TensorLayout,
    ) -> Result<Self, ModelLoadError> {
        let ort_session = OrtInferenceSession::new(model_path)?;
        Ok(OnnxClassifier {
            ort_session,
            labels,
            input_size,
            layout,
        })
    }
}

impl ImageClassifier for OnnxClassifier {
    fn classify(&self, image: &RgbImage) -> Result<Classification, InferenceError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(InferenceError::InvalidImage("image has no pixels".to_string()));
        }
        let resized = resize_rgb8(image, self.input_size, self.input_size);
        let input_array = convert_rgb_image_to_owned_array(&resized, self.layout);
        let output = self.ort_session.run(input_array)?;
        let probabilities: Vec<f32> = output.iter().copied().collect();
        classification_from_probabilities(&probabilities, &self.labels)
    }

    fn labels(&self) -> &[String] {
        &self.labels
    }
}
