use image::RgbImage;
use ndarray::Array4;
use serde::Deserialize;

/// How the channels of an image tensor are laid out.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TensorLayout {
    /// (image, channel, row, column). What YOLO exports expect.
    Nchw,
    /// (image, row, column, channel). What Keras exports expect.
    #[default]
    Nhwc,
}

/// Converts an rgb8 image into a batch of one with values scaled to [0, 1].
pub fn convert_rgb_image_to_owned_array(rgb_image: &RgbImage, layout: TensorLayout) -> Array4<f32> {
    let width = rgb_image.width() as usize;
    let height = rgb_image.height() as usize;
    let mut image_array = match layout {
        TensorLayout::Nchw => Array4::zeros((1, 3, height, width)),
        TensorLayout::Nhwc => Array4::zeros((1, height, width, 3)),
    };
    for (x, y, pixel) in rgb_image.enumerate_pixels() {
        let x = x as usize;
        let y = y as usize;
        for (channel, value) in pixel.0.iter().enumerate() {
            let value = (*value as f32) / 255.;
            match layout {
                TensorLayout::Nchw => image_array[[0, channel, y, x]] = value,
                TensorLayout::Nhwc => image_array[[0, y, x, channel]] = value,
            }
        }
    }
    image_array
}
