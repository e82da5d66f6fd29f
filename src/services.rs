use crate::classification::image_classifier::{Classification, ImageClassifier};
use crate::classification::onnx_classifier::OnnxClassifier;
use crate::config::AppConfig;
use crate::errors::{ModelLoadError, ServiceError};
use crate::fusion::multi_view::{FusionOutcome, MultiViewFusion};
use crate::object_detection::object_detection_model::{AnnotatingDetector, Detector, Thresholds};
use crate::object_detection::yolov8::Yolov8;
use crate::rendering::renderer::Renderer;
use image::RgbImage;
use std::sync::Arc;
use tracing::{error, info};

/// What a run of the process uses the models for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Detection,
    Classification,
}

impl Mode {
    pub fn name(self) -> &'static str {
        match self {
            Mode::Detection => "detection",
            Mode::Classification => "classification",
        }
    }
}

/// The models of the process, loaded once at start-up and shared by every request.
///
/// Each mode holds either its loaded model or the reason it failed to load. A failure only
/// disables its own mode, and a mode that was never loaded reports itself as not configured.
pub struct InferenceServices {
    detector: Option<Result<Arc<dyn Detector>, Arc<ModelLoadError>>>,
    classifier: Option<Result<Arc<dyn ImageClassifier>, Arc<ModelLoadError>>>,
}

impl InferenceServices {
    pub fn new(
        detector: Option<Result<Arc<dyn Detector>, ModelLoadError>>,
        classifier: Option<Result<Arc<dyn ImageClassifier>, ModelLoadError>>,
    ) -> Self {
        InferenceServices {
            detector: detector.map(|slot| slot.map_err(Arc::new)),
            classifier: classifier.map(|slot| slot.map_err(Arc::new)),
        }
    }

    /// Loads the model `mode` needs, as named in `config`.
    pub fn load(config: &AppConfig, renderer: Renderer, mode: Mode) -> Self {
        match mode {
            Mode::Detection => InferenceServices::new(Some(load_detector(config, renderer)), None),
            Mode::Classification => InferenceServices::new(None, load_classifier(config)),
        }
    }

    pub fn detector(&self) -> Result<&Arc<dyn Detector>, ServiceError> {
        loaded_model(&self.detector, Mode::Detection)
    }

    pub fn classifier(&self) -> Result<&Arc<dyn ImageClassifier>, ServiceError> {
        loaded_model(&self.classifier, Mode::Classification)
    }

    pub fn detect(
        &self,
        fusion: &MultiViewFusion,
        image: &RgbImage,
        thresholds: &Thresholds,
    ) -> Result<FusionOutcome, ServiceError> {
        let detector = self.detector()?;
        Ok(fusion.fuse(detector, image, thresholds)?)
    }

    pub fn classify(&self, image: &RgbImage) -> Result<Classification, ServiceError> {
        let classifier = self.classifier()?;
        Ok(classifier.classify(image)?)
    }
}

fn loaded_model<T: ?Sized>(
    slot: &Option<Result<Arc<T>, Arc<ModelLoadError>>>,
    mode: Mode,
) -> Result<&Arc<T>, ServiceError> {
    match slot {
        None => Err(ServiceError::NotConfigured(mode.name())),
        Some(Ok(model)) => Ok(model),
        Some(Err(cause)) => Err(ServiceError::ModelUnavailable {
            mode: mode.name(),
            cause: Arc::clone(cause),
        }),
    }
}

fn load_detector(
    config: &AppConfig,
    renderer: Renderer,
) -> Result<Arc<dyn Detector>, ModelLoadError> {
    let detector_config = &config.detector;
    let detector = Yolov8::load(
        &detector_config.model_path,
        &detector_config.classes_path,
        detector_config.input_width,
        detector_config.input_height,
    )
    .map(|model| Arc::new(AnnotatingDetector::new(model, renderer)) as Arc<dyn Detector>);
    match &detector {
        Ok(_) => info!(model = ?detector_config.model_path, "detector loaded"),
        Err(e) => error!(
            model = ?detector_config.model_path,
            error = %e,
            "detector failed to load"
        ),
    }
    detector
}

/// `None` when no classifier is configured.
fn load_classifier(config: &AppConfig) -> Option<Result<Arc<dyn ImageClassifier>, ModelLoadError>> {
    let classifier_config = config.classifier.as_ref()?;
    let classifier = OnnxClassifier::new(
        &classifier_config.model_path,
        classifier_config.labels.clone(),
        classifier_config.input_size,
        classifier_config.layout,
    )
    .map(|model| Arc::new(model) as Arc<dyn ImageClassifier>);
    match &classifier {
        Ok(_) => info!(model = ?classifier_config.model_path, "classifier loaded"),
        Err(e) => error!(
            model = ?classifier_config.model_path,
            error = %e,
            "classifier failed to load"
        ),
    }
    Some(classifier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::detection_set::{DetectionSet, DetectionSummary};
    use crate::config::ClassifierConfig;
    use crate::errors::InferenceError;
    use crate::image_utils::image_conversion::TensorLayout;
    use crate::object_detection::object_detection_model::Prediction;
    use std::path::PathBuf;

    struct NothingDetector;

    impl Detector for NothingDetector {
        fn predict(&self, image: &RgbImage, _: &Thresholds) -> Result<Prediction, InferenceError> {
            Ok(Prediction {
                annotated: image.clone(),
                detections: DetectionSet::new(),
            })
        }
    }

    struct ConstantClassifier {
        labels: Vec<String>,
    }

    impl ImageClassifier for ConstantClassifier {
        fn classify(&self, _: &RgbImage) -> Result<Classification, InferenceError> {
            Ok(Classification {
                label: self.labels[0].clone(),
                confidence: 1.0,
            })
        }

        fn labels(&self) -> &[String] {
            &self.labels
        }
    }

    fn missing_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.detector.model_path = PathBuf::from("./does/not/exist.onnx");
        config.detector.classes_path = PathBuf::from("./does/not/exist.txt");
        config
    }

    #[test]
    fn missing_detector_disables_detection() {
        let services =
            InferenceServices::load(&missing_config(), Renderer::default(), Mode::Detection);
        assert!(matches!(
            services.detector(),
            Err(ServiceError::ModelUnavailable {
                mode: "detection",
                ..
            })
        ));
        assert!(matches!(
            services.classifier(),
            Err(ServiceError::NotConfigured("classification"))
        ));
    }

    #[test]
    fn classification_does_not_load_the_detector() {
        let services =
            InferenceServices::load(&missing_config(), Renderer::default(), Mode::Classification);
        assert!(matches!(
            services.detector(),
            Err(ServiceError::NotConfigured("detection"))
        ));
        assert!(matches!(
            services.classify(&RgbImage::new(4, 4)),
            Err(ServiceError::NotConfigured("classification"))
        ));
    }

    #[test]
    fn missing_classifier_is_reported() {
        let mut config = missing_config();
        config.classifier = Some(ClassifierConfig {
            model_path: PathBuf::from("./does/not/exist.onnx"),
            labels: vec!["Tom".to_string()],
            input_size: 224,
            layout: TensorLayout::Nhwc,
        });
        let services = InferenceServices::load(&config, Renderer::default(), Mode::Classification);
        let result = services.classify(&RgbImage::new(4, 4));
        assert!(matches!(
            result,
            Err(ServiceError::ModelUnavailable {
                mode: "classification",
                ..
            })
        ));
    }

    #[test]
    fn classifier_works_when_detector_failed() {
        let services = InferenceServices::new(
            Some(Err(ModelLoadError::MissingArtifact(PathBuf::from("detector.onnx")))),
            Some(Ok(Arc::new(ConstantClassifier {
                labels: vec!["Jerry".to_string()],
            }) as Arc<dyn ImageClassifier>)),
        );
        assert!(services.detector().is_err());
        let classification = services.classify(&RgbImage::new(4, 4)).unwrap();
        assert_eq!(classification.label, "Jerry");
    }

    #[test]
    fn detect_runs_the_fusion() {
        let detector = Arc::new(NothingDetector) as Arc<dyn Detector>;
        let services = InferenceServices::new(Some(Ok(detector)), None);
        let img = RgbImage::new(6, 4);
        let outcome = services
            .detect(&MultiViewFusion::dual_view(), &img, &Thresholds::default())
            .unwrap();
        assert_eq!(outcome.views.len(), 2);
        assert_eq!(outcome.summary(), DetectionSummary::NoObjects);
    }
}
