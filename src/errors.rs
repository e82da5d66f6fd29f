use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Raised when a detector or classifier artifact cannot be brought into memory.
///
/// A load failure only disables the mode that needed the artifact; the other
/// mode keeps working if its own model loaded.
#[derive(Debug, Error)]
pub enum ModelLoadError {
    #[error("model artifact does not exist, or cannot be read: {0:?}")]
    MissingArtifact(PathBuf),
    #[error("failed to read label file {path:?}: {source}")]
    Labels {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("label file {0:?} contains no labels")]
    EmptyLabels(PathBuf),
    #[error("failed to create inference session: {0}")]
    Session(#[from] ort::Error),
}

/// Raised when a single prediction (or a fusion of several) cannot complete.
///
/// There is no retry and no partial result: the caller receives this error in
/// place of the whole output.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("inference backend failed: {0}")]
    Backend(String),
    #[error("invalid input image: {0}")]
    InvalidImage(String),
    #[error("unexpected model output: {0}")]
    InvalidOutput(String),
    #[error(
        "annotated frame from view '{view}' is {actual_width}x{actual_height}, \
        expected {expected_width}x{expected_height}"
    )]
    DimensionMismatch {
        view: &'static str,
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },
    #[error("detector call for view '{view}' did not finish within {timeout:?}")]
    Timeout { view: &'static str, timeout: Duration },
    #[error("detector worker for view '{view}' exited without a result")]
    WorkerLost { view: &'static str },
    #[error("fusion needs at least one view")]
    NoViews,
}

impl From<ort::Error> for InferenceError {
    fn from(e: ort::Error) -> Self {
        InferenceError::Backend(e.to_string())
    }
}

impl From<ndarray::ShapeError> for InferenceError {
    fn from(e: ndarray::ShapeError) -> Self {
        InferenceError::InvalidOutput(e.to_string())
    }
}

/// Raised when a mode of the inference services cannot serve a request.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0} mode is not configured")]
    NotConfigured(&'static str),
    #[error("{mode} mode is unavailable because its model failed to load")]
    ModelUnavailable {
        mode: &'static str,
        #[source]
        cause: Arc<ModelLoadError>,
    },
    #[error(transparent)]
    Inference(#[from] InferenceError),
}
