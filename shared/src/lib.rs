use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumCount, EnumIter};

/// The fixed label set the classifier was trained on, in training order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, EnumCount)]
#[strum(serialize_all = "lowercase")]
pub enum TumorClass {
    Glioma,
    Meningioma,
    Notumor,
    Pituitary,
}

impl TumorClass {
    /// Every class, in training order.
    pub fn all() -> Vec<TumorClass> {
        use strum::IntoEnumIterator;
        Self::iter().collect()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ClassScore {
    pub label: String,
    pub probability: f32,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ClassificationReport {
    #[serde(rename = "class")]
    pub predicted: String,
    pub confidence: f32,
    pub details: Vec<ClassScore>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SegmentationReport {
    pub tumor_detected: bool,
    pub pixels: u64,
    pub percentage: f32,
    pub image: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PredictionResponse {
    pub success: bool,
    pub classification: ClassificationReport,
    pub segmentation: SegmentationReport,
    pub original_image: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct HealthResponse {
    pub status: String,
    pub classification_loaded: bool,
    pub segmentation_loaded: bool,
    pub message: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ErrorResponse {
    pub error: String,
    pub success: bool,
    pub message: String,
}
