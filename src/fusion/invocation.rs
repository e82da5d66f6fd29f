use crate::errors::InferenceError;
use crate::fusion::view::ViewTransform;
use crate::object_detection::object_detection_model::{Detector, Prediction, Thresholds};
use image::RgbImage;
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

/// Runs the detector on one view of `image`.
///
/// The view's transform is applied first. With a timeout the call runs on its own thread and is
/// abandoned once the timeout passes; the worker is left to finish on its own. The annotated
/// frame must have the same size as the image the detector was given.
pub fn invoke_view(
    detector: &Arc<dyn Detector>,
    view: ViewTransform,
    image: &RgbImage,
    thresholds: &Thresholds,
    timeout: Option<Duration>,
) -> Result<Prediction, InferenceError> {
    let started = Instant::now();
    let view_image = view.apply(image);
    let (expected_width, expected_height) = view_image.dimensions();
    let prediction = match timeout {
        None => detector.predict(&view_image, thresholds)?,
        Some(timeout) => predict_with_timeout(
            Arc::clone(detector),
            view,
            view_image,
            *thresholds,
            timeout,
        )?,
    };
    let (actual_width, actual_height) = prediction.annotated.dimensions();
    if (actual_width, actual_height) != (expected_width, expected_height) {
        return Err(InferenceError::DimensionMismatch {
            view: view.name(),
            expected_width,
            expected_height,
            actual_width,
            actual_height,
        });
    }
    debug!(
        view = view.name(),
        detections = prediction.detections.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "view inference finished"
    );
    Ok(prediction)
}

fn predict_with_timeout(
    detector: Arc<dyn Detector>,
    view: ViewTransform,
    image: RgbImage,
    thresholds: Thresholds,
    timeout: Duration,
) -> Result<Prediction, InferenceError> {
    let (sender, receiver) = mpsc::channel();
    thread::Builder::new()
        .name(format!("detector-{}", view.name()))
        .spawn(move || {
            let _ = sender.send(detector.predict(&image, &thresholds));
        })
        .map_err(|e| InferenceError::Backend(format!("failed to start detector worker: {}", e)))?;
    match receiver.recv_timeout(timeout) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => Err(InferenceError::Timeout {
            view: view.name(),
            timeout,
        }),
        Err(RecvTimeoutError::Disconnected) => {
            Err(InferenceError::WorkerLost { view: view.name() })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::detection_set::DetectionSet;
    use image::Rgb;

    struct EchoDetector;

    impl Detector for EchoDetector {
        fn predict(&self, image: &RgbImage, _: &Thresholds) -> Result<Prediction, InferenceError> {
            Ok(Prediction {
                annotated: image.clone(),
                detections: DetectionSet::new(),
            })
        }
    }

    struct SlowDetector(Duration);

    impl Detector for SlowDetector {
        fn predict(&self, image: &RgbImage, _: &Thresholds) -> Result<Prediction, InferenceError> {
            thread::sleep(self.0);
            Ok(Prediction {
                annotated: image.clone(),
                detections: DetectionSet::new(),
            })
        }
    }

    struct PanickingDetector;

    impl Detector for PanickingDetector {
        fn predict(&self, _: &RgbImage, _: &Thresholds) -> Result<Prediction, InferenceError> {
            panic!("backend crashed");
        }
    }

    struct WrongSizeDetector;

    impl Detector for WrongSizeDetector {
        fn predict(&self, _: &RgbImage, _: &Thresholds) -> Result<Prediction, InferenceError> {
            Ok(Prediction {
                annotated: RgbImage::new(1, 1),
                detections: DetectionSet::new(),
            })
        }
    }

    fn marked_image() -> RgbImage {
        let mut img = RgbImage::new(4, 2);
        img.put_pixel(0, 0, Rgb([255, 0, 0]));
        img
    }

    #[test]
    fn detector_sees_the_transformed_view() {
        let detector: Arc<dyn Detector> = Arc::new(EchoDetector);
        let img = marked_image();
        let prediction = invoke_view(
            &detector,
            ViewTransform::HorizontalMirror,
            &img,
            &Thresholds::default(),
            None,
        )
        .unwrap();
        assert_eq!(prediction.annotated.get_pixel(3, 0), &Rgb([255, 0, 0]));
        assert_eq!(prediction.annotated.get_pixel(0, 0), &Rgb([0, 0, 0]));
    }

    #[test]
    fn finishes_within_timeout() {
        let detector: Arc<dyn Detector> = Arc::new(EchoDetector);
        let img = marked_image();
        let prediction = invoke_view(
            &detector,
            ViewTransform::Identity,
            &img,
            &Thresholds::default(),
            Some(Duration::from_secs(5)),
        )
        .unwrap();
        assert_eq!(prediction.annotated, img);
    }

    #[test]
    fn slow_detector_times_out() {
        let detector: Arc<dyn Detector> = Arc::new(SlowDetector(Duration::from_millis(500)));
        let result = invoke_view(
            &detector,
            ViewTransform::HorizontalMirror,
            &marked_image(),
            &Thresholds::default(),
            Some(Duration::from_millis(20)),
        );
        assert!(matches!(
            result,
            Err(InferenceError::Timeout {
                view: "horizontal_mirror",
                ..
            })
        ));
    }

    #[test]
    fn crashed_worker_is_reported() {
        let detector: Arc<dyn Detector> = Arc::new(PanickingDetector);
        let result = invoke_view(
            &detector,
            ViewTransform::Identity,
            &marked_image(),
            &Thresholds::default(),
            Some(Duration::from_secs(5)),
        );
        assert!(matches!(result, Err(InferenceError::WorkerLost { view: "identity" })));
    }

    #[test]
    fn annotated_frame_must_match_view_size() {
        let detector: Arc<dyn Detector> = Arc::new(WrongSizeDetector);
        let result = invoke_view(
            &detector,
            ViewTransform::Identity,
            &marked_image(),
            &Thresholds::default(),
            None,
        );
        assert!(matches!(
            result,
            Err(InferenceError::DimensionMismatch {
                expected_width: 4,
                expected_height: 2,
                actual_width: 1,
                actual_height: 1,
                ..
            })
        ));
    }
}
