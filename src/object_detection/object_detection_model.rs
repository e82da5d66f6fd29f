use crate::annotations::detection_set::DetectionSet;
use crate::errors::InferenceError;
use crate::rendering::renderer::Renderer;
use image::RgbImage;
use serde::{Deserialize, Serialize};

/// The two knobs every detector call takes.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct Thresholds {
    /// Minimum score for a detection to be reported. Kept low on purpose so the mirrored pass
    /// has a chance to add objects the first pass misses.
    pub confidence: f32,
    /// Intersection over union above which overlapping boxes of the same class are suppressed.
    pub iou: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds {
            confidence: 0.1,
            iou: 0.5,
        }
    }
}

/// Defines a trait that all object detection models must follow.
///
/// A model turns an image into detections whose coordinates are pixels of that same image.
/// Confidence filtering and non maximum suppression are the model's job.
pub trait ObjectDetectionModel: Send + Sync {
    fn run_inference(
        &self,
        image: &RgbImage,
        thresholds: &Thresholds,
    ) -> Result<DetectionSet, InferenceError>;

    fn class_names(&self) -> &[String];
}

/// The output of a single detector call.
#[derive(Clone, Debug, PartialEq)]
pub struct Prediction {
    /// The input image with the detections drawn on it.
    pub annotated: RgbImage,
    pub detections: DetectionSet,
}

/// The black box the fusion code talks to: detect, then draw.
pub trait Detector: Send + Sync {
    fn predict(&self, image: &RgbImage, thresholds: &Thresholds)
    -> Result<Prediction, InferenceError>;
}

/// Pairs a model with a renderer so it can be used as a [`Detector`].
pub struct AnnotatingDetector<M: ObjectDetectionModel> {
    model: M,
    renderer: Renderer,
}

impl<M: ObjectDetectionModel> AnnotatingDetector<M> {
    pub fn new(model: M, renderer: Renderer) -> Self {
        AnnotatingDetector { model, renderer }
    }

    pub fn model(&self) -> &M {
        &self.model
    }
}

impl<M: ObjectDetectionModel> Detector for AnnotatingDetector<M> {
    fn predict(
        &self,
        image: &RgbImage,
        thresholds: &Thresholds,
    ) -> Result<Prediction, InferenceError> {
        let detections = self.model.run_inference(image, thresholds)?;
        let annotated = self.renderer.render(image, &detections);
        Ok(Prediction {
            annotated,
            detections,
        })
    }
}
