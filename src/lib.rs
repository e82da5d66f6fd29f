pub mod annotations;
pub mod classification;
pub mod cli;
pub mod config;
pub mod errors;
pub mod fusion;
pub mod image_utils;
pub mod object_detection;
pub mod rendering;
pub mod report;
pub mod services;

pub use crate::annotations::detection::Detection;
pub use crate::annotations::detection_set::{DetectionSet, DetectionSummary};
pub use crate::config::AppConfig;
pub use crate::errors::{InferenceError, ModelLoadError, ServiceError};
pub use crate::fusion::multi_view::{FusionOutcome, MultiViewFusion, fuse_dual_view};
pub use crate::fusion::view::ViewTransform;
pub use crate::object_detection::object_detection_model::{Detector, Prediction, Thresholds};
pub use crate::services::{InferenceServices, Mode};
