use crate::annotations::detection::Detection;
use image::RgbImage;
use image::imageops::{flip_horizontal, flip_vertical};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One way of looking at an image before handing it to the detector.
///
/// Each transform has an inverse used to map boxes found in the transformed image back into the
/// source image. Every transform here is its own inverse and keeps the image dimensions.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewTransform {
    Identity,
    /// Column order reversed.
    HorizontalMirror,
    /// Row order reversed.
    VerticalMirror,
}

impl ViewTransform {
    pub fn name(&self) -> &'static str {
        match self {
            ViewTransform::Identity => "identity",
            ViewTransform::HorizontalMirror => "horizontal_mirror",
            ViewTransform::VerticalMirror => "vertical_mirror",
        }
    }

    pub fn apply(&self, image: &RgbImage) -> RgbImage {
        match self {
            ViewTransform::Identity => image.clone(),
            ViewTransform::HorizontalMirror => flip_horizontal(image),
            ViewTransform::VerticalMirror => flip_vertical(image),
        }
    }

    /// Maps a detection found in this view back into the coordinates of a
    /// `source_width` x `source_height` source image.
    pub fn invert_detection(
        &self,
        detection: &Detection,
        source_width: u32,
        source_height: u32,
    ) -> Detection {
        let bbox = detection.bounding_box();
        match self {
            ViewTransform::Identity => detection.clone(),
            ViewTransform::HorizontalMirror => {
                detection.with_bounding_box(bbox.mirrored_horizontally(source_width as f32))
            }
            ViewTransform::VerticalMirror => {
                detection.with_bounding_box(bbox.mirrored_vertically(source_height as f32))
            }
        }
    }
}

impl fmt::Display for ViewTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::bounding_box::BoundingBox;
    use image::Rgb;

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| Rgb([x as u8, y as u8, (x * y) as u8]))
    }

    #[test]
    fn horizontal_mirror_reverses_columns() {
        let img = gradient(5, 3);
        let mirrored = ViewTransform::HorizontalMirror.apply(&img);
        assert_eq!(mirrored.dimensions(), (5, 3));
        for (x, y, pixel) in mirrored.enumerate_pixels() {
            assert_eq!(pixel, img.get_pixel(4 - x, y));
        }
    }

    #[test]
    fn vertical_mirror_reverses_rows() {
        let img = gradient(5, 3);
        let mirrored = ViewTransform::VerticalMirror.apply(&img);
        for (x, y, pixel) in mirrored.enumerate_pixels() {
            assert_eq!(pixel, img.get_pixel(x, 2 - y));
        }
    }

    #[test]
    fn transforms_are_involutive() {
        let img = gradient(7, 4);
        for view in [
            ViewTransform::Identity,
            ViewTransform::HorizontalMirror,
            ViewTransform::VerticalMirror,
        ] {
            assert_eq!(view.apply(&view.apply(&img)), img, "{}", view);
        }
    }

    #[test]
    fn inverting_a_mirrored_detection() {
        let det = Detection::new(
            0,
            0.9,
            BoundingBox::new(10_f32, 10_f32, 50_f32, 50_f32, "Tom".to_string()).unwrap(),
        );
        let back = ViewTransform::HorizontalMirror.invert_detection(&det, 100, 80);
        assert_eq!(back.bounding_box().as_xyxy(), (50_f32, 10_f32, 90_f32, 50_f32));
        assert_eq!(back.label(), "Tom");
        assert_eq!(back.confidence(), 0.9_f32);
        let back = ViewTransform::VerticalMirror.invert_detection(&det, 100, 80);
        assert_eq!(back.bounding_box().as_xyxy(), (10_f32, 30_f32, 50_f32, 70_f32));
        assert_eq!(ViewTransform::Identity.invert_detection(&det, 100, 80), det);
    }

    #[test]
    fn names_match_config_spelling() {
        let view: ViewTransform = serde_json::from_str("\"horizontal_mirror\"").unwrap();
        assert_eq!(view, ViewTransform::HorizontalMirror);
        assert_eq!(view.to_string(), "horizontal_mirror");
    }
}
