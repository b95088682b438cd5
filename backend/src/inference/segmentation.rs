use image::imageops::FilterType;
use image::{GrayImage, Luma, RgbImage};
use ndarray::Array2;

use super::config::InferenceConfig;
use super::model::{InferenceError, Segmenter};
use super::preprocess;

pub struct SegmentationOutput {
    pub overlay: RgbImage,
    pub tumor_pixels: u64,
    pub tumor_percent: f32,
}

/// Run the full segmentation pipeline. `None` means no segmenter is
/// available and the caller should omit the overlay. Internal failures
/// degrade to the unmodified original with zero coverage; they never abort
/// a request whose classification succeeded.
pub fn segment_and_overlay(
    segmenter: Option<&Segmenter>,
    image: &RgbImage,
    config: &InferenceConfig,
) -> Option<SegmentationOutput> {
    let segmenter = segmenter?;
    match run_pipeline(segmenter, image, config) {
        Ok(output) => Some(output),
        Err(e) => {
            log::warn!("Segmentation failed, returning unsegmented image: {}", e);
            Some(SegmentationOutput {
                overlay: image.clone(),
                tumor_pixels: 0,
                tumor_percent: 0.0,
            })
        }
    }
}

fn run_pipeline(
    segmenter: &Segmenter,
    image: &RgbImage,
    config: &InferenceConfig,
) -> Result<SegmentationOutput, InferenceError> {
    let input = preprocess::prepare(image, config.segment_size);
    let map = segmenter.segment(&input)?;
    let mask = threshold_mask(&map, config.mask_threshold);
    let tumor_pixels: u64 = mask.iter().map(|&cell| u64::from(cell)).sum();
    let tumor_percent = 100.0 * tumor_pixels as f32 / mask.len() as f32;
    let upsampled = upsample_nearest(&mask, image.width(), image.height());
    let overlay = composite_overlay(image, &upsampled);
    Ok(SegmentationOutput {
        overlay,
        tumor_pixels,
        tumor_percent,
    })
}

/// Strict threshold; cells are exactly 0 or 1.
pub(crate) fn threshold_mask(map: &Array2<f32>, threshold: f32) -> Array2<u8> {
    map.mapv(|p| u8::from(p > threshold))
}

/// Nearest-neighbor upsampling to the original resolution keeps the mask
/// binary; no blending happens at the resize stage.
pub(crate) fn upsample_nearest(mask: &Array2<u8>, width: u32, height: u32) -> GrayImage {
    let (rows, cols) = mask.dim();
    let small = GrayImage::from_fn(cols as u32, rows as u32, |x, y| {
        Luma([mask[[y as usize, x as usize]] * 255])
    });
    image::imageops::resize(&small, width, height, FilterType::Nearest)
}

/// Red tint at 30% opacity inside the mask; pixels outside the mask are
/// copied untouched, so an empty mask reproduces the original exactly.
pub(crate) fn composite_overlay(original: &RgbImage, mask: &GrayImage) -> RgbImage {
    let mut overlay = original.clone();
    for (x, y, pixel) in overlay.enumerate_pixels_mut() {
        if mask.get_pixel(x, y)[0] > 0 {
            let [r, g, b] = pixel.0;
            pixel.0 = [blend(r, 255), blend(g, 0), blend(b, 0)];
        }
    }
    overlay
}

fn blend(original: u8, tint: u8) -> u8 {
    (0.7 * f32::from(original) + 0.3 * f32::from(tint))
        .round()
        .min(255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn sample_image() -> RgbImage {
        RgbImage::from_fn(64, 48, |x, y| Rgb([x as u8, y as u8, 100]))
    }

    #[test]
    fn thresholding_is_strict_and_binary() {
        let map = Array2::from_shape_vec((2, 2), vec![0.49, 0.5, 0.51, 1.0]).unwrap();
        let mask = threshold_mask(&map, 0.5);
        assert_eq!(mask.as_slice().unwrap(), [0, 0, 1, 1]);
    }

    #[test]
    fn coverage_counts_and_percentage() {
        let mut map = Array2::zeros((4, 4));
        map[[0, 0]] = 0.9;
        map[[3, 3]] = 0.9;
        let mask = threshold_mask(&map, 0.5);
        let pixels: u64 = mask.iter().map(|&c| u64::from(c)).sum();
        assert_eq!(pixels, 2);
        let percent = 100.0 * pixels as f32 / mask.len() as f32;
        assert!((percent - 12.5).abs() < 1e-6);
    }

    #[test]
    fn upsampling_preserves_binary_values() {
        let mut mask = Array2::zeros((2, 2));
        mask[[0, 1]] = 1;
        let upsampled = upsample_nearest(&mask, 64, 64);
        assert!(upsampled.pixels().all(|p| p[0] == 0 || p[0] == 255));
        assert_eq!(upsampled.get_pixel(48, 8)[0], 255);
        assert_eq!(upsampled.get_pixel(8, 48)[0], 0);
    }

    #[test]
    fn masked_pixels_blend_toward_red() {
        let original = RgbImage::from_pixel(2, 1, Rgb([100, 100, 100]));
        let mut mask = GrayImage::new(2, 1);
        mask.put_pixel(1, 0, Luma([255]));
        let overlay = composite_overlay(&original, &mask);
        assert_eq!(overlay.get_pixel(0, 0).0, [100, 100, 100]);
        assert_eq!(overlay.get_pixel(1, 0).0, [147, 70, 70]);
    }

    #[test]
    fn blend_clamps_to_byte_range() {
        assert_eq!(blend(255, 255), 255);
        assert_eq!(blend(0, 0), 0);
    }

    #[test]
    fn empty_mask_leaves_overlay_identical_to_original() {
        let image = sample_image();
        let output = segment_and_overlay(
            Some(&Segmenter::fallback()),
            &image,
            &InferenceConfig::default(),
        )
        .unwrap();
        assert_eq!(output.tumor_pixels, 0);
        assert_eq!(output.tumor_percent, 0.0);
        assert_eq!(output.overlay.as_raw(), image.as_raw());
    }

    #[test]
    fn missing_segmenter_yields_none() {
        assert!(segment_and_overlay(None, &sample_image(), &InferenceConfig::default()).is_none());
    }
}
