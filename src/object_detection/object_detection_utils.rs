use crate::annotations::detection::Detection;
use crate::annotations::detection_set::DetectionSet;
use crate::errors::ModelLoadError;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Reads a file with the class names into a vector so that the number ids
/// which come directly from the ORT inference session can be given meaning.
///
/// One label per line; surrounding whitespace and blank lines are dropped.
pub fn read_classes_txt_file(filepath: &Path) -> Result<Vec<String>, ModelLoadError> {
    let to_load_error = |source| ModelLoadError::Labels {
        path: filepath.to_path_buf(),
        source,
    };
    let file = File::open(filepath).map_err(to_load_error)?;
    let mut class_names = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line.map_err(to_load_error)?;
        let name = line.trim();
        if !name.is_empty() {
            class_names.push(name.to_string());
        }
    }
    if class_names.is_empty() {
        return Err(ModelLoadError::EmptyLabels(filepath.to_path_buf()));
    }
    Ok(class_names)
}

/// Non maxmimum suppression is a way of removing duplicate detections.
///
/// Detections are visited from most to least confident; a detection is dropped when it overlaps
/// an already kept detection of the same class by more than `iou_threshold`. The result is
/// ordered by descending confidence.
pub fn non_maximum_suppression(detections: DetectionSet, iou_threshold: f32) -> DetectionSet {
    let mut detections: Vec<Detection> = detections.into_iter().collect();
    detections.sort_by(|a, b| b.confidence().total_cmp(&a.confidence()));
    let mut detections_to_remove: Vec<bool> = vec![false; detections.len()];
    for (current_index, current_det) in detections.iter().enumerate() {
        if detections_to_remove[current_index] {
            continue;
        }
        for (other_index, other_det) in detections[current_index + 1..].iter().enumerate() {
            if detections_to_remove[current_index + other_index + 1] {
                continue;
            }
            if current_det.label() != other_det.label() {
                continue;
            }
            let iou = current_det
                .bounding_box()
                .intersection_over_union(other_det.bounding_box());
            if iou > iou_threshold {
                detections_to_remove[current_index + other_index + 1] = true;
            }
        }
    }
    detections
        .into_iter()
        .zip(detections_to_remove)
        .filter(|(_, remove)| !remove)
        .map(|(det, _)| det)
        .collect()
}
