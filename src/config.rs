use crate::fusion::multi_view::{BoxProjection, Compositing, MultiViewFusion};
use crate::fusion::view::ViewTransform;
use crate::image_utils::image_conversion::TensorLayout;
use crate::object_detection::object_detection_model::Thresholds;
use crate::rendering::renderer::Renderer;
use ab_glyph::FontArc;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("failed to load font {path:?}: {reason}")]
    Font { path: PathBuf, reason: String },
}

/// Everything the tool can be told from its JSON config file.
///
/// Every field has a default, so an empty object (or no file at all) is a valid config.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub detector: DetectorConfig,
    pub classifier: Option<ClassifierConfig>,
    pub thresholds: Thresholds,
    pub fusion: FusionConfig,
    pub preprocess: PreprocessConfig,
    pub render: RenderConfig,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct DetectorConfig {
    pub model_path: PathBuf,
    /// Class names, one per line, in model class id order.
    pub classes_path: PathBuf,
    pub input_width: u32,
    pub input_height: u32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        DetectorConfig {
            model_path: PathBuf::from("model/detector.onnx"),
            classes_path: PathBuf::from("model/classes.txt"),
            input_width: 640,
            input_height: 640,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ClassifierConfig {
    pub model_path: PathBuf,
    /// In model output order.
    pub labels: Vec<String>,
    #[serde(default = "default_classifier_input_size")]
    pub input_size: u32,
    #[serde(default)]
    pub layout: TensorLayout,
}

fn default_classifier_input_size() -> u32 {
    224
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CompositingMode {
    #[default]
    PixelMax,
    Overlay,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FusionConfig {
    pub views: Vec<ViewTransform>,
    pub box_projection: BoxProjection,
    pub compositing: CompositingMode,
    pub parallel: bool,
    /// Per detector call. No limit when absent.
    pub timeout_ms: Option<u64>,
}

impl Default for FusionConfig {
    fn default() -> Self {
        FusionConfig {
            views: vec![ViewTransform::Identity, ViewTransform::HorizontalMirror],
            box_projection: BoxProjection::ViewSpace,
            compositing: CompositingMode::PixelMax,
            parallel: false,
            timeout_ms: None,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PreprocessConfig {
    /// [width, height] every input is resized to before inference. `null` keeps the input size.
    pub resize: Option<[u32; 2]>,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        PreprocessConfig {
            resize: Some([640, 480]),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    pub line_thickness: u32,
    /// TrueType font for label tags. Boxes are drawn without labels when absent.
    pub font_path: Option<PathBuf>,
    pub font_scale: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            line_thickness: 2,
            font_path: None,
            font_scale: 18.0,
        }
    }
}

impl AppConfig {
    /// Reads and validates a config file, or returns the defaults when there is none.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => AppConfig::from_file(path)?,
            None => AppConfig::default(),
        };
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let in_unit_range = |value: f32| (0.0..=1.0).contains(&value);
        if !in_unit_range(self.thresholds.confidence) {
            return Err(ConfigError::Invalid(format!(
                "confidence threshold {} is outside [0, 1]",
                self.thresholds.confidence
            )));
        }
        if !in_unit_range(self.thresholds.iou) {
            return Err(ConfigError::Invalid(format!(
                "iou threshold {} is outside [0, 1]",
                self.thresholds.iou
            )));
        }
        if self.fusion.views.is_empty() {
            return Err(ConfigError::Invalid("fusion needs at least one view".to_string()));
        }
        if self.fusion.timeout_ms == Some(0) {
            return Err(ConfigError::Invalid("timeout_ms must be positive".to_string()));
        }
        if self.detector.input_width == 0 || self.detector.input_height == 0 {
            return Err(ConfigError::Invalid("detector input size must be positive".to_string()));
        }
        if let Some([width, height]) = self.preprocess.resize {
            if width == 0 || height == 0 {
                return Err(ConfigError::Invalid(format!(
                    "cannot resize inputs to {}x{}",
                    width, height
                )));
            }
        }
        if let Some(classifier) = &self.classifier {
            if classifier.labels.is_empty() {
                return Err(ConfigError::Invalid(
                    "classifier needs at least one label".to_string(),
                ));
            }
            if classifier.input_size == 0 {
                return Err(ConfigError::Invalid(
                    "classifier input size must be positive".to_string(),
                ));
            }
        }
        if self.render.font_scale <= 0.0 {
            return Err(ConfigError::Invalid("font_scale must be positive".to_string()));
        }
        Ok(())
    }

    pub fn renderer(&self) -> Result<Renderer, ConfigError> {
        let renderer = Renderer::new(self.render.line_thickness);
        let Some(font_path) = &self.render.font_path else {
            return Ok(renderer);
        };
        let font_error = |reason: String| ConfigError::Font {
            path: font_path.clone(),
            reason,
        };
        let bytes = fs::read(font_path).map_err(|e| font_error(e.to_string()))?;
        let font = FontArc::try_from_vec(bytes).map_err(|e| font_error(e.to_string()))?;
        Ok(renderer.with_font(font, self.render.font_scale))
    }

    /// The fusion described by this config. `renderer` is only used by overlay compositing.
    pub fn fusion(&self, renderer: &Renderer) -> MultiViewFusion {
        let compositing = match self.fusion.compositing {
            CompositingMode::PixelMax => Compositing::PixelMax,
            CompositingMode::Overlay => Compositing::Overlay(renderer.clone()),
        };
        MultiViewFusion::new(self.fusion.views.clone())
            .with_box_projection(self.fusion.box_projection)
            .with_compositing(compositing)
            .with_parallel(self.fusion.parallel)
            .with_timeout(self.fusion.timeout_ms.map(Duration::from_millis))
    }
}
