use crate::annotations::bounding_box::BoundingBox;

/// A detection is what is produced as output from an object detection model.
///
/// A detection is a bounding box combined with the class id the model emitted and a confidence
/// score: a probability value that encodes the model's belief that the detection is true. The
/// label is the bounding box's category. Detections are never modified after a model creates
/// them; transformations produce new values.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    class_id: usize,
    confidence: f32,
    bounding_box: BoundingBox,
}

impl Detection {
    pub fn new(class_id: usize, confidence: f32, bounding_box: BoundingBox) -> Self {
        Detection {
            class_id,
            confidence,
            bounding_box,
        }
    }

    pub fn class_id(&self) -> usize {
        self.class_id
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn bounding_box(&self) -> &BoundingBox {
        &self.bounding_box
    }

    pub fn label(&self) -> &str {
        self.bounding_box.category()
    }

    /// A copy of this detection placed in a different box.
    pub fn with_bounding_box(&self, bounding_box: BoundingBox) -> Detection {
        Detection {
            class_id: self.class_id,
            confidence: self.confidence,
            bounding_box,
        }
    }
}
