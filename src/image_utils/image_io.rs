use image::imageops::FilterType;
use image::{self, ImageResult, RgbImage};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const VALID_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

pub fn read_image_as_rgb8(filepath: &Path) -> ImageResult<RgbImage> {
    Ok(image::open(filepath)?.into_rgb8())
}

pub fn save_rgb8(image: &RgbImage, filepath: &Path) -> ImageResult<()> {
    image.save(filepath)
}

/// Resizes to exactly `width` x `height`, ignoring the aspect ratio.
pub fn resize_rgb8(image: &RgbImage, width: u32, height: u32) -> RgbImage {
    if image.dimensions() == (width, height) {
        return image.clone();
    }
    image::imageops::resize(image, width, height, FilterType::Triangle)
}

/// True for files with an image extension this tool accepts.
pub fn has_image_extension(filepath: &Path) -> bool {
    match filepath.extension().and_then(|ext| ext.to_str()) {
        Some(ext) => VALID_EXTENSIONS.contains(&ext.to_lowercase().as_str()),
        None => false,
    }
}

/// The image files under `source`, sorted. A file is returned as-is when it is an image.
pub fn collect_image_paths(source: &Path) -> walkdir::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in WalkDir::new(source).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file() && has_image_extension(entry.path()) {
            paths.push(entry.into_path());
        }
    }
    Ok(paths)
}
