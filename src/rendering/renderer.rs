use crate::annotations::detection::Detection;
use crate::annotations::detection_set::DetectionSet;
use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use std::fmt;

/// Box colours, picked by class id.
const PALETTE: [[u8; 3]; 20] = [
    [255, 56, 56],
    [255, 157, 151],
    [255, 112, 31],
    [255, 178, 29],
    [207, 210, 49],
    [72, 249, 10],
    [146, 204, 23],
    [61, 219, 134],
    [26, 147, 52],
    [0, 212, 187],
    [44, 153, 168],
    [0, 194, 255],
    [52, 69, 147],
    [100, 115, 255],
    [0, 24, 236],
    [132, 56, 255],
    [82, 0, 133],
    [203, 56, 255],
    [255, 149, 200],
    [255, 55, 199],
];

const TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

pub fn palette_color(class_id: usize) -> Rgb<u8> {
    Rgb(PALETTE[class_id % PALETTE.len()])
}

/// Draws detections over a copy of an image.
///
/// Every detection gets a hollow rectangle in its class colour. When a font is available a
/// filled tag with the label and confidence is placed above the box (or inside it, when the
/// box touches the top of the image).
#[derive(Clone)]
pub struct Renderer {
    line_thickness: u32,
    font: Option<FontArc>,
    font_scale: f32,
}

impl fmt::Debug for Renderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Renderer")
            .field("line_thickness", &self.line_thickness)
            .field("font", &self.font.as_ref().map(|_| "loaded"))
            .field("font_scale", &self.font_scale)
            .finish()
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Renderer::new(2)
    }
}

impl Renderer {
    pub fn new(line_thickness: u32) -> Self {
        Renderer {
            line_thickness: line_thickness.max(1),
            font: None,
            font_scale: 18.0,
        }
    }

    pub fn with_font(mut self, font: FontArc, font_scale: f32) -> Self {
        self.font = Some(font);
        self.font_scale = font_scale;
        self
    }

    pub fn render(&self, image: &RgbImage, detections: &DetectionSet) -> RgbImage {
        let mut canvas = image.clone();
        for detection in detections {
            self.draw_detection(&mut canvas, detection);
        }
        canvas
    }

    fn draw_detection(&self, canvas: &mut RgbImage, detection: &Detection) {
        let color = palette_color(detection.class_id());
        let (left, top, right, bottom) = detection.bounding_box().as_xyxy();
        let (left, top) = (left.round() as i32, top.round() as i32);
        let (right, bottom) = (right.round() as i32, bottom.round() as i32);

        for offset in 0..self.line_thickness as i32 {
            let width = right - left - 2 * offset;
            let height = bottom - top - 2 * offset;
            if width <= 0 || height <= 0 {
                break;
            }
            let rect = Rect::at(left + offset, top + offset).of_size(width as u32, height as u32);
            draw_hollow_rect_mut(canvas, rect, color);
        }

        if let Some(font) = &self.font {
            let text = format!("{} {:.2}", detection.label(), detection.confidence());
            let scale = PxScale::from(self.font_scale);
            let (text_width, text_height) = text_size(scale, font, &text);
            if text_width == 0 || text_height == 0 {
                return;
            }
            let tag_height = text_height as i32 + 4;
            let tag_top = if top - tag_height >= 0 { top - tag_height } else { top };
            let tag = Rect::at(left, tag_top).of_size(text_width + 4, tag_height as u32);
            draw_filled_rect_mut(canvas, tag, color);
            draw_text_mut(canvas, TEXT_COLOR, left + 2, tag_top + 2, scale, font, &text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::bounding_box::BoundingBox;

    fn det(class_id: usize, left: f32, top: f32, right: f32, bottom: f32) -> Detection {
        Detection::new(
            class_id,
            0.9_f32,
            BoundingBox::new(left, top, right, bottom, "Tom".to_string()).unwrap(),
        )
    }

    #[test]
    fn nothing_to_draw_leaves_image_unchanged() {
        let img = RgbImage::from_pixel(8, 8, Rgb([7, 7, 7]));
        assert_eq!(Renderer::default().render(&img, &DetectionSet::new()), img);
    }

    #[test]
    fn box_outline_uses_class_colour() {
        let img = RgbImage::new(20, 20);
        let dets: DetectionSet = vec![det(3, 2_f32, 2_f32, 12_f32, 12_f32)].into();
        let rendered = Renderer::new(1).render(&img, &dets);
        assert_eq!(rendered.dimensions(), (20, 20));
        assert_eq!(rendered.get_pixel(2, 2), &palette_color(3));
        assert_eq!(rendered.get_pixel(11, 11), &palette_color(3));
        assert_eq!(rendered.get_pixel(6, 6), &Rgb([0, 0, 0]));
        assert_eq!(img.get_pixel(2, 2), &Rgb([0, 0, 0]));
    }

    #[test]
    fn thickness_draws_nested_outlines() {
        let img = RgbImage::new(20, 20);
        let dets: DetectionSet = vec![det(0, 2_f32, 2_f32, 12_f32, 12_f32)].into();
        let rendered = Renderer::new(2).render(&img, &dets);
        assert_eq!(rendered.get_pixel(3, 3), &palette_color(0));
        assert_eq!(rendered.get_pixel(4, 4), &Rgb([0, 0, 0]));
    }

    #[test]
    fn boxes_outside_the_image_do_not_panic() {
        let img = RgbImage::new(10, 10);
        let dets: DetectionSet = vec![
            det(1, -5_f32, -5_f32, 30_f32, 30_f32),
            det(2, 4_f32, 4_f32, 4_f32, 4_f32),
        ]
        .into();
        let rendered = Renderer::default().render(&img, &dets);
        assert_eq!(rendered.dimensions(), (10, 10));
    }

    #[test]
    fn palette_wraps_around() {
        assert_eq!(palette_color(0), palette_color(PALETTE.len()));
    }
}
