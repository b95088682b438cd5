use image::RgbImage;
use image::imageops::FilterType;
use ndarray::Array4;

use super::model::InferenceError;

/// Decode uploaded bytes into an RGB raster. Grayscale and paletted sources
/// are expanded to three channels by the conversion.
pub fn decode_image(bytes: &[u8]) -> Result<RgbImage, InferenceError> {
    let decoded = image::load_from_memory(bytes)?;
    Ok(decoded.to_rgb8())
}

/// Resize to `target` and pack into a (1, H, W, 3) batch array scaled to
/// [0, 1].
pub fn prepare(image: &RgbImage, target: (u32, u32)) -> Array4<f32> {
    to_batch_array(image, target, 1.0 / 255.0)
}

/// Same layout with raw 0-255 floats, matching the classifier's
/// training-time image-to-array conversion.
pub fn prepare_raw(image: &RgbImage, target: (u32, u32)) -> Array4<f32> {
    to_batch_array(image, target, 1.0)
}

fn to_batch_array(image: &RgbImage, (width, height): (u32, u32), scale: f32) -> Array4<f32> {
    let resized = image::imageops::resize(image, width, height, FilterType::Triangle);
    let mut array = Array4::zeros((1, height as usize, width as usize, 3));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for channel in 0..3 {
            array[[0, y as usize, x as usize, channel]] = f32::from(pixel[channel]) * scale;
        }
    }
    array
}
