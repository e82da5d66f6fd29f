use image::RgbImage;

/// Combines two frames by taking the larger value of every channel of every pixel.
///
/// Returns `None` when the frames differ in size.
pub fn pixelwise_max(a: &RgbImage, b: &RgbImage) -> Option<RgbImage> {
    if a.dimensions() != b.dimensions() {
        return None;
    }
    let merged: Vec<u8> = a
        .as_raw()
        .iter()
        .zip(b.as_raw().iter())
        .map(|(x, y)| *x.max(y))
        .collect();
    RgbImage::from_raw(a.width(), a.height(), merged)
}
