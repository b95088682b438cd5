use std::io::Cursor;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, RgbImage};
use shared::{ClassificationReport, PredictionResponse, SegmentationReport};

use super::config::InferenceConfig;
use super::model::InferenceError;
use super::segmentation::SegmentationOutput;

/// PNG-encode at thumbnail size and wrap as a data URI for the JSON payload.
pub fn encode_data_uri(
    image: &RgbImage,
    (width, height): (u32, u32),
) -> Result<String, InferenceError> {
    let resized = image::imageops::resize(image, width, height, FilterType::Triangle);
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(resized).write_to(&mut buffer, ImageFormat::Png)?;
    Ok(format!(
        "data:image/png;base64,{}",
        STANDARD.encode(buffer.into_inner())
    ))
}

/// Merge both pipeline halves into the wire response. Detection compares the
/// full-precision coverage against the configured threshold; only the
/// reported percentage is rounded.
pub fn assemble_response(
    classification: ClassificationReport,
    segmentation: Option<SegmentationOutput>,
    original: &RgbImage,
    config: &InferenceConfig,
) -> Result<PredictionResponse, InferenceError> {
    let segmentation = match segmentation {
        Some(output) => SegmentationReport {
            tumor_detected: output.tumor_percent > config.detection_threshold,
            pixels: output.tumor_pixels,
            percentage: round2(output.tumor_percent),
            image: Some(encode_data_uri(&output.overlay, config.thumbnail_size)?),
        },
        None => SegmentationReport {
            tumor_detected: false,
            pixels: 0,
            percentage: 0.0,
            image: None,
        },
    };

    Ok(PredictionResponse {
        success: true,
        classification,
        segmentation,
        original_image: encode_data_uri(original, config.thumbnail_size)?,
    })
}

fn round2(value: f32) -> f32 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use shared::TumorClass;

    fn report() -> ClassificationReport {
        ClassificationReport {
            predicted: TumorClass::Notumor.to_string(),
            confidence: 90.0,
            details: vec![],
        }
    }

    fn output(percent: f32, pixels: u64) -> SegmentationOutput {
        SegmentationOutput {
            overlay: RgbImage::from_pixel(8, 8, Rgb([10, 20, 30])),
            tumor_pixels: pixels,
            tumor_percent: percent,
        }
    }

    #[test]
    fn detection_threshold_is_strict() {
        let config = InferenceConfig::default();
        let original = RgbImage::new(8, 8);

        let at = assemble_response(report(), Some(output(0.1, 16)), &original, &config).unwrap();
        assert!(!at.segmentation.tumor_detected);

        let above = assemble_response(report(), Some(output(0.11, 18)), &original, &config).unwrap();
        assert!(above.segmentation.tumor_detected);
    }

    #[test]
    fn percentage_is_rounded_to_two_decimals() {
        let config = InferenceConfig::default();
        let original = RgbImage::new(8, 8);
        let response =
            assemble_response(report(), Some(output(12.3456, 2022)), &original, &config).unwrap();
        assert_eq!(response.segmentation.percentage, 12.35);
        assert_eq!(response.segmentation.pixels, 2022);
    }

    #[test]
    fn missing_segmentation_zeroes_the_report() {
        let config = InferenceConfig::default();
        let original = RgbImage::new(8, 8);
        let response = assemble_response(report(), None, &original, &config).unwrap();
        assert!(response.success);
        assert!(!response.segmentation.tumor_detected);
        assert_eq!(response.segmentation.pixels, 0);
        assert_eq!(response.segmentation.percentage, 0.0);
        assert!(response.segmentation.image.is_none());
        assert!(
            response
                .original_image
                .starts_with("data:image/png;base64,")
        );
    }

    #[test]
    fn wire_format_matches_the_api_contract() {
        let config = InferenceConfig::default();
        let original = RgbImage::new(8, 8);
        let response = assemble_response(report(), None, &original, &config).unwrap();
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["classification"]["class"], "notumor");
        assert!(json["segmentation"]["image"].is_null());
        assert_eq!(json["segmentation"]["tumor_detected"], false);
    }

    #[test]
    fn data_uri_decodes_back_to_a_thumbnail() {
        let image = RgbImage::from_pixel(100, 60, Rgb([5, 6, 7]));
        let uri = encode_data_uri(&image, (400, 400)).unwrap();
        let payload = uri.strip_prefix("data:image/png;base64,").unwrap();
        let bytes = STANDARD.decode(payload).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.width(), 400);
        assert_eq!(decoded.height(), 400);
    }
}
