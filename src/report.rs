use crate::annotations::detection::Detection;
use crate::fusion::multi_view::{FusionOutcome, ViewReport};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// One detection as written to a report. `bbox` is [x, y, w, h] in pixels.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DetectionRecord {
    pub class_id: usize,
    pub label: String,
    pub confidence: f32,
    pub bbox: [f32; 4],
}

impl From<&Detection> for DetectionRecord {
    fn from(detection: &Detection) -> Self {
        let (x, y, w, h) = detection.bounding_box().as_xywh();
        DetectionRecord {
            class_id: detection.class_id(),
            label: detection.label().to_string(),
            confidence: detection.confidence(),
            bbox: [x, y, w, h],
        }
    }
}

/// The JSON written next to every annotated frame.
#[derive(Clone, Debug, Serialize)]
pub struct DetectionReport {
    pub source: String,
    pub width: u32,
    pub height: u32,
    pub summary: String,
    pub label_counts: String,
    pub views: Vec<ViewReport>,
    pub detections: Vec<DetectionRecord>,
}

impl DetectionReport {
    pub fn new(source: &Path, outcome: &FusionOutcome) -> Self {
        DetectionReport {
            source: source.display().to_string(),
            width: outcome.annotated.width(),
            height: outcome.annotated.height(),
            summary: outcome.summary().to_string(),
            label_counts: outcome.detections.label_counts(),
            views: outcome.views.clone(),
            detections: outcome.detections.iter().map(DetectionRecord::from).collect(),
        }
    }

    pub fn write_json(&self, filepath: &Path) -> io::Result<()> {
        let mut writer = BufWriter::new(File::create(filepath)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()
    }
}
