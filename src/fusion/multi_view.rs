//! Runs one detector over several views of an image and merges what it finds.
//!
//! With the default views (the image itself, then its horizontal mirror) this is the dual-view
//! heuristic: the annotated frames are merged by per-channel maximum and the detection lists are
//! concatenated as they are. Boxes from the mirrored pass stay in mirrored coordinates, both in
//! the detection list and in the merged frame. `BoxProjection::SourceSpace` and
//! `Compositing::Overlay` switch to geometric fusion instead.

use crate::annotations::detection_set::{DetectionSet, DetectionSummary};
use crate::errors::InferenceError;
use crate::fusion::invocation::invoke_view;
use crate::fusion::view::ViewTransform;
use crate::image_utils::compositing::pixelwise_max;
use crate::object_detection::object_detection_model::{Detector, Prediction, Thresholds};
use crate::rendering::renderer::Renderer;
use image::RgbImage;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Which coordinate space merged boxes are reported in.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BoxProjection {
    /// Each box stays in the coordinates of the view it was found in.
    #[default]
    ViewSpace,
    /// Boxes are mapped back into the source image with the view's inverse transform.
    SourceSpace,
}

/// How the merged annotated frame is produced.
#[derive(Clone, Debug, Default)]
pub enum Compositing {
    /// Per-channel maximum over every view's annotated frame, each in its own view space.
    #[default]
    PixelMax,
    /// All merged detections drawn over one clean copy of the source image.
    Overlay(Renderer),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ViewReport {
    pub view: ViewTransform,
    pub detection_count: usize,
}

/// The merged result of a fusion call.
#[derive(Clone, Debug, PartialEq)]
pub struct FusionOutcome {
    /// Same dimensions as the source image.
    pub annotated: RgbImage,
    /// Every view's detections, view after view, in emission order.
    pub detections: DetectionSet,
    pub views: Vec<ViewReport>,
}

impl FusionOutcome {
    pub fn summary(&self) -> DetectionSummary {
        self.detections.summary()
    }
}

/// Multi-view detection fusion.
#[derive(Clone, Debug)]
pub struct MultiViewFusion {
    views: Vec<ViewTransform>,
    box_projection: BoxProjection,
    compositing: Compositing,
    parallel: bool,
    timeout: Option<Duration>,
}

impl Default for MultiViewFusion {
    fn default() -> Self {
        MultiViewFusion::dual_view()
    }
}

impl MultiViewFusion {
    /// The image as-is, then its horizontal mirror.
    pub fn dual_view() -> Self {
        MultiViewFusion::new(vec![ViewTransform::Identity, ViewTransform::HorizontalMirror])
    }

    /// A plain single detector pass.
    pub fn single_view() -> Self {
        MultiViewFusion::new(vec![ViewTransform::Identity])
    }

    pub fn new(views: Vec<ViewTransform>) -> Self {
        MultiViewFusion {
            views,
            box_projection: BoxProjection::default(),
            compositing: Compositing::default(),
            parallel: false,
            timeout: None,
        }
    }

    pub fn with_box_projection(mut self, box_projection: BoxProjection) -> Self {
        self.box_projection = box_projection;
        self
    }

    pub fn with_compositing(mut self, compositing: Compositing) -> Self {
        self.compositing = compositing;
        self
    }

    /// Runs the views concurrently. The merged output is the same as running them in order.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Bounds every single detector call.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn views(&self) -> &[ViewTransform] {
        &self.views
    }

    /// Runs the detector on every view and merges the results.
    ///
    /// Fails as a whole if any detector call fails; nothing from the other views is returned.
    pub fn fuse(
        &self,
        detector: &Arc<dyn Detector>,
        image: &RgbImage,
        thresholds: &Thresholds,
    ) -> Result<FusionOutcome, InferenceError> {
        if self.views.is_empty() {
            return Err(InferenceError::NoViews);
        }
        let started = Instant::now();
        let invoke = |view: &ViewTransform| {
            invoke_view(detector, *view, image, thresholds, self.timeout)
        };
        let predictions: Vec<Prediction> = if self.parallel && self.views.len() > 1 {
            self.views.par_iter().map(invoke).collect::<Result<_, _>>()?
        } else {
            self.views.iter().map(invoke).collect::<Result<_, _>>()?
        };

        let (width, height) = image.dimensions();
        let mut detections = DetectionSet::new();
        let mut reports = Vec::with_capacity(self.views.len());
        for (view, prediction) in self.views.iter().zip(&predictions) {
            reports.push(ViewReport {
                view: *view,
                detection_count: prediction.detections.len(),
            });
            match self.box_projection {
                BoxProjection::ViewSpace => {
                    detections.extend(prediction.detections.iter().cloned())
                }
                BoxProjection::SourceSpace => detections.extend(
                    prediction
                        .detections
                        .iter()
                        .map(|det| view.invert_detection(det, width, height)),
                ),
            }
        }

        let annotated = match &self.compositing {
            Compositing::PixelMax => composite_pixel_max(&self.views, &predictions, image)?,
            Compositing::Overlay(renderer) => renderer.render(image, &detections),
        };
        debug!(
            views = self.views.len(),
            detections = detections.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "fusion finished"
        );
        Ok(FusionOutcome {
            annotated,
            detections,
            views: reports,
        })
    }
}

/// The dual-view heuristic with its default settings.
pub fn fuse_dual_view(
    detector: &Arc<dyn Detector>,
    image: &RgbImage,
    thresholds: &Thresholds,
) -> Result<FusionOutcome, InferenceError> {
    MultiViewFusion::dual_view().fuse(detector, image, thresholds)
}

fn composite_pixel_max(
    views: &[ViewTransform],
    predictions: &[Prediction],
    image: &RgbImage,
) -> Result<RgbImage, InferenceError> {
    let mut merged = match predictions.first() {
        Some(first) => first.annotated.clone(),
        None => return Err(InferenceError::NoViews),
    };
    for (view, prediction) in views.iter().zip(predictions).skip(1) {
        merged = pixelwise_max(&merged, &prediction.annotated).ok_or_else(|| {
            InferenceError::DimensionMismatch {
                view: view.name(),
                expected_width: image.width(),
                expected_height: image.height(),
                actual_width: prediction.annotated.width(),
                actual_height: prediction.annotated.height(),
            }
        })?;
    }
    Ok(merged)
}
