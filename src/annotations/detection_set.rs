use crate::annotations::detection::Detection;
use itertools::Itertools;
use std::fmt;

/// An ordered sequence of detections.
///
/// Order is the order in which detections were emitted. Nothing is deduplicated: overlapping
/// boxes from different inference passes are all kept.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DetectionSet {
    detections: Vec<Detection>,
}

impl DetectionSet {
    pub fn new() -> Self {
        DetectionSet::default()
    }

    pub fn push(&mut self, detection: Detection) {
        self.detections.push(detection);
    }

    pub fn len(&self) -> usize {
        self.detections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Detection> {
        self.detections.iter()
    }

    pub fn as_slice(&self) -> &[Detection] {
        &self.detections
    }

    /// Every distinct label, in the order it was first seen.
    pub fn unique_labels(&self) -> Vec<String> {
        self.iter()
            .map(|det| det.label().to_string())
            .unique()
            .collect()
    }

    /// Human readable per-label counts, e.g. "2 Tom, 1 Jerry".
    pub fn label_counts(&self) -> String {
        let counts = self.iter().map(Detection::label).counts();
        self.iter()
            .map(Detection::label)
            .unique()
            .map(|label| format!("{} {}", counts[label], label))
            .join(", ")
    }

    pub fn summary(&self) -> DetectionSummary {
        if self.is_empty() {
            DetectionSummary::NoObjects
        } else {
            DetectionSummary::Detected(self.unique_labels())
        }
    }
}

impl From<Vec<Detection>> for DetectionSet {
    fn from(detections: Vec<Detection>) -> Self {
        DetectionSet { detections }
    }
}

impl FromIterator<Detection> for DetectionSet {
    fn from_iter<I: IntoIterator<Item = Detection>>(iter: I) -> Self {
        DetectionSet {
            detections: iter.into_iter().collect(),
        }
    }
}

impl Extend<Detection> for DetectionSet {
    fn extend<I: IntoIterator<Item = Detection>>(&mut self, iter: I) {
        self.detections.extend(iter);
    }
}

impl IntoIterator for DetectionSet {
    type Item = Detection;
    type IntoIter = std::vec::IntoIter<Detection>;

    fn into_iter(self) -> Self::IntoIter {
        self.detections.into_iter()
    }
}

impl<'a> IntoIterator for &'a DetectionSet {
    type Item = &'a Detection;
    type IntoIter = std::slice::Iter<'a, Detection>;

    fn into_iter(self) -> Self::IntoIter {
        self.detections.iter()
    }
}

/// What a finished inference reports to the user.
///
/// Finding nothing is a valid outcome and is kept apart from failure, which is an error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DetectionSummary {
    Detected(Vec<String>),
    NoObjects,
}

impl fmt::Display for DetectionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectionSummary::Detected(labels) => write!(f, "detected: {}", labels.join(", ")),
            DetectionSummary::NoObjects => write!(f, "no objects detected"),
        }
    }
}
