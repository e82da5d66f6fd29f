use serde::Serialize;

/// A struct representing a bounding box.
///
/// A bounding box is the rectangle a detector places around an object, together with the
/// category it believes the object belongs to. The category doubles as the human readable
/// label shown next to the box.
///
/// This project uses the standard convention of the left side of the image being x=0 and the top
/// of the image being y=0. Coordinates are in pixels of the image the detector was given.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BoundingBox {
    left: f32,
    top: f32,
    right: f32,
    bottom: f32,
    category: String,
}

impl BoundingBox {
    /// Checks if a box has valid parameters before constructing.
    pub fn new(
        left: f32,
        top: f32,
        right: f32,
        bottom: f32,
        category: String,
    ) -> Result<Self, String> {
        if ![left, top, right, bottom].iter().all(|v| v.is_finite()) {
            Err(format!(
                "Failed to create BoundingBox, coordinates must be finite ({}, {}, {}, {}).",
                left, top, right, bottom
            ))
        } else if left > right {
            Err(format!(
                "Failed to create BoundingBox, value for left > value for right ({} > {}).",
                left, right
            ))
        } else if top > bottom {
            Err(format!(
                "Failed to create BoundingBox, value for top > value for bottom ({} > {}).",
                top, bottom
            ))
        } else {
            Ok(BoundingBox {
                left,
                top,
                right,
                bottom,
                category,
            })
        }
    }

    /// Builds a box from its top left corner and size.
    pub fn from_xywh(x: f32, y: f32, w: f32, h: f32, category: String) -> Result<Self, String> {
        BoundingBox::new(x, y, x + w, y + h, category)
    }

    pub fn left(&self) -> f32 {
        self.left
    }

    pub fn top(&self) -> f32 {
        self.top
    }

    pub fn right(&self) -> f32 {
        self.right
    }

    pub fn bottom(&self) -> f32 {
        self.bottom
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    pub fn center(&self) -> (f32, f32) {
        (
            self.left + self.width() / 2.0,
            self.top + self.height() / 2.0,
        )
    }

    pub fn as_xyxy(&self) -> (f32, f32, f32, f32) {
        (self.left, self.top, self.right, self.bottom)
    }

    /// (x, y, w, h) with (x, y) the top left corner.
    pub fn as_xywh(&self) -> (f32, f32, f32, f32) {
        (self.left, self.top, self.width(), self.height())
    }

    pub fn intersection_over_union(&self, other: &BoundingBox) -> f32 {
        let inter_width = (self.right.min(other.right) - self.left.max(other.left)).max(0.0);
        let inter_height = (self.bottom.min(other.bottom) - self.top.max(other.top)).max(0.0);
        let intersection = inter_width * inter_height;
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            0.0
        } else {
            intersection / union
        }
    }

    /// The same box as seen in an image mirrored around its vertical axis.
    ///
    /// `image_width` is the width of the image the box lives in. Mirroring twice with the same
    /// width gives back the original box.
    pub fn mirrored_horizontally(&self, image_width: f32) -> BoundingBox {
        BoundingBox {
            left: image_width - self.right,
            top: self.top,
            right: image_width - self.left,
            bottom: self.bottom,
            category: self.category.clone(),
        }
    }

    /// The same box as seen in an image mirrored around its horizontal axis.
    pub fn mirrored_vertically(&self, image_height: f32) -> BoundingBox {
        BoundingBox {
            left: self.left,
            top: image_height - self.bottom,
            right: self.right,
            bottom: image_height - self.top,
            category: self.category.clone(),
        }
    }
}
