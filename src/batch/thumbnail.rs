//! JPEG thumbnails for the gallery grid.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};

use crate::errors::AppResult;

/// Thumbnails fit inside a square of this size
pub const THUMBNAIL_SIZE: u32 = 800;

/// JPEG quality of generated thumbnails
pub const JPEG_QUALITY: u8 = 82;

/// Write a JPEG thumbnail of `image` to `dest`. Smaller images are not upscaled.
pub fn write_thumbnail(image: &DynamicImage, dest: &Path) -> AppResult<(u32, u32)> {
    let (width, height) = image.dimensions();
    let resized = if width > THUMBNAIL_SIZE || height > THUMBNAIL_SIZE {
        image.resize(THUMBNAIL_SIZE, THUMBNAIL_SIZE, FilterType::Lanczos3)
    } else {
        image.clone()
    };

    // JPEG has no alpha channel
    let rgb = resized.to_rgb8();

    let mut writer = BufWriter::new(File::create(dest)?);
    JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY).encode_image(&rgb)?;
    writer.flush()?;

    Ok(rgb.dimensions())
}
