use crate::annotations::bounding_box::BoundingBox;
use crate::annotations::detection::Detection;
use crate::annotations::detection_set::DetectionSet;
use crate::errors::{InferenceError, ModelLoadError};
use crate::image_utils::image_conversion::{TensorLayout, convert_rgb_image_to_owned_array};
use crate::image_utils::image_io::resize_rgb8;
use crate::object_detection::object_detection_model::{ObjectDetectionModel, Thresholds};
use crate::object_detection::object_detection_utils::{
    non_maximum_suppression, read_classes_txt_file,
};
use crate::object_detection::ort_inference_session::OrtInferenceSession;
use image::RgbImage;
use ndarray::{ArrayView2, Axis, Ix2};
use std::path::Path;
use tracing::debug;

/// A YOLOv8 style detector exported to ONNX.
///
/// The model output has shape (1, 4 + number of classes, number of candidates). The first four
/// rows are the centre x, centre y, width and height of each candidate in model input pixels,
/// the rest are per class scores.
pub struct Yolov8 {
    ort_session: OrtInferenceSession,
    class_names: Vec<String>,
    input_width: u32,
    input_height: u32,
}

impl Yolov8 {
    pub fn new(
        model_path: &Path,
        class_names: Vec<String>,
        input_width: u32,
        input_height: u32,
    ) -> Result<Self, ModelLoadError> {
        let ort_session = OrtInferenceSession::new(model_path)?;
        Ok(Yolov8 {
            ort_session,
            class_names,
            input_width,
            input_height,
        })
    }

    /// Loads the model and reads its class names from a text file, one per line.
    pub fn load(
        model_path: &Path,
        classes_path: &Path,
        input_width: u32,
        input_height: u32,
    ) -> Result<Self, ModelLoadError> {
        let class_names = read_classes_txt_file(classes_path)?;
        Yolov8::new(model_path, class_names, input_width, input_height)
    }
}

impl ObjectDetectionModel for Yolov8 {
    fn run_inference(
        &self,
        image: &RgbImage,
        thresholds: &Thresholds,
    ) -> Result<DetectionSet, InferenceError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(InferenceError::InvalidImage(format!(
                "image has no pixels ({}x{})",
                image.width(),
                image.height()
            )));
        }
        let resized = resize_rgb8(image, self.input_width, self.input_height);
        let input_array = convert_rgb_image_to_owned_array(&resized, TensorLayout::Nchw);
        let output = self.ort_session.run(input_array)?;
        if output.ndim() != 3 || output.shape()[1] <= 4 {
            return Err(InferenceError::InvalidOutput(format!(
                "expected (1, 4 + classes, candidates), got {:?}",
                output.shape()
            )));
        }
        let predictions = output
            .index_axis(Axis(0), 0)
            .into_dimensionality::<Ix2>()?;
        let scale = (
            image.width() as f32 / self.input_width as f32,
            image.height() as f32 / self.input_height as f32,
        );
        let candidates = decode_predictions(
            predictions,
            &self.class_names,
            scale,
            image.dimensions(),
            thresholds.confidence,
        );
        let candidate_count = candidates.len();
        let detections = non_maximum_suppression(candidates, thresholds.iou);
        debug!(
            candidates = candidate_count,
            kept = detections.len(),
            "yolov8 inference finished"
        );
        Ok(detections)
    }

    fn class_names(&self) -> &[String] {
        &self.class_names
    }
}

/// Turns raw candidates into detections in source image pixels.
///
/// Each candidate takes the class with the highest score; candidates whose score is below
/// `confidence` are skipped. Boxes are scaled by `scale` and clamped to `image_size`. Class ids
/// without a name are labelled with the id itself. Candidates with NaN scores or coordinates are
/// dropped.
pub fn decode_predictions(
    predictions: ArrayView2<f32>,
    class_names: &[String],
    scale: (f32, f32),
    image_size: (u32, u32),
    confidence: f32,
) -> DetectionSet {
    let (scale_x, scale_y) = scale;
    let (image_width, image_height) = (image_size.0 as f32, image_size.1 as f32);
    let mut detections = DetectionSet::new();
    for candidate in predictions.axis_iter(Axis(1)) {
        let best = candidate
            .iter()
            .skip(4) // skips bounding box coords.
            .copied()
            .enumerate()
            .reduce(|accum, row| if row.1 > accum.1 { row } else { accum });
        let Some((class_id, prob)) = best else {
            continue;
        };
        if prob.is_nan() || prob < confidence {
            continue;
        }
        let label = match class_names.get(class_id) {
            Some(v) => v.clone(),
            None => class_id.to_string(),
        };
        let x = candidate[0] * scale_x;
        let y = candidate[1] * scale_y;
        let w = candidate[2] * scale_x;
        let h = candidate[3] * scale_y;
        let bbox = BoundingBox::new(
            (x - w / 2.0).clamp(0.0, image_width),
            (y - h / 2.0).clamp(0.0, image_height),
            (x + w / 2.0).clamp(0.0, image_width),
            (y + h / 2.0).clamp(0.0, image_height),
            label,
        );
        match bbox {
            Ok(bbox) => detections.push(Detection::new(class_id, prob, bbox)),
            Err(reason) => debug!(%reason, "dropping malformed candidate"),
        }
    }
    detections
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn class_names() -> Vec<String> {
        vec!["Tom".to_string(), "Jerry".to_string()]
    }

    #[test]
    fn decode_keeps_confident_candidates() {
        // Columns are candidates; rows are cx, cy, w, h, score(Tom), score(Jerry).
        let predictions = array![
            [20_f32, 50_f32, 10_f32],
            [20_f32, 50_f32, 10_f32],
            [10_f32, 20_f32, 4_f32],
            [10_f32, 20_f32, 4_f32],
            [0.9_f32, 0.1_f32, 0.01_f32],
            [0.05_f32, 0.7_f32, 0.02_f32],
        ];
        let dets =
            decode_predictions(predictions.view(), &class_names(), (1.0, 1.0), (100, 100), 0.5);
        assert_eq!(dets.len(), 2);
        let first = &dets.as_slice()[0];
        assert_eq!(first.label(), "Tom");
        assert_eq!(first.class_id(), 0);
        assert_eq!(first.confidence(), 0.9_f32);
        assert_eq!(first.bounding_box().as_xyxy(), (15_f32, 15_f32, 25_f32, 25_f32));
        assert_eq!(dets.as_slice()[1].label(), "Jerry");
    }

    #[test]
    fn decode_scales_and_clamps_boxes() {
        let predictions = array![[2_f32], [2_f32], [8_f32], [2_f32], [0.8_f32]];
        let dets = decode_predictions(
            predictions.view(),
            &["Tom".to_string()],
            (2.0, 3.0),
            (100, 100),
            0.5,
        );
        // Centre (4, 6), size (16, 6): left edge clamps to 0.
        assert_eq!(dets.as_slice()[0].bounding_box().as_xyxy(), (0_f32, 3_f32, 12_f32, 9_f32));
    }

    #[test]
    fn unknown_class_ids_fall_back_to_the_number() {
        let predictions = array![
            [5_f32],
            [5_f32],
            [2_f32],
            [2_f32],
            [0.1_f32],
            [0.2_f32],
            [0.9_f32]
        ];
        let dets =
            decode_predictions(predictions.view(), &class_names(), (1.0, 1.0), (10, 10), 0.5);
        assert_eq!(dets.as_slice()[0].label(), "2");
        assert_eq!(dets.as_slice()[0].class_id(), 2);
    }

    #[test]
    fn nan_candidates_are_dropped() {
        let predictions = array![
            [20_f32, f32::NAN, 30_f32],
            [20_f32, 20_f32, 30_f32],
            [10_f32, 10_f32, 10_f32],
            [10_f32, 10_f32, 10_f32],
            [f32::NAN, 0.9_f32, 0.8_f32],
        ];
        let dets =
            decode_predictions(predictions.view(), &class_names(), (1.0, 1.0), (100, 100), 0.5);
        assert_eq!(dets.len(), 1);
        assert_eq!(dets.as_slice()[0].confidence(), 0.8_f32);
    }

    #[test]
    fn missing_model_is_a_load_error() {
        let result = Yolov8::new(Path::new("./model/missing.onnx"), class_names(), 640, 640);
        assert!(matches!(result, Err(ModelLoadError::MissingArtifact(_))));
    }
}
