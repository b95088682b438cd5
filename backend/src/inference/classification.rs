use image::RgbImage;
use shared::{ClassScore, ClassificationReport, TumorClass};

use super::config::InferenceConfig;
use super::model::{Classifier, InferenceError};
use super::preprocess;

/// Classify an uploaded image and rank every known label.
pub fn classify_image(
    classifier: &Classifier,
    image: &RgbImage,
    config: &InferenceConfig,
) -> Result<ClassificationReport, InferenceError> {
    let input = preprocess::prepare_raw(image, config.classify_size);
    let probabilities = classifier.classify(&input)?;
    rank_probabilities(&probabilities)
}

/// Pure ranking step over a probability vector: argmax picks the headline
/// prediction (first maximum wins ties), every label is paired with its
/// probability in percent, sorted descending. The sort is stable, so equal
/// probabilities keep training order.
pub fn rank_probabilities(probabilities: &[f32]) -> Result<ClassificationReport, InferenceError> {
    let classes = TumorClass::all();
    if probabilities.len() != classes.len() {
        return Err(InferenceError::OutputShape(format!(
            "expected {} class probabilities, got {}",
            classes.len(),
            probabilities.len()
        )));
    }

    let (top_index, top_probability) = probabilities.iter().enumerate().fold(
        (0usize, f32::NEG_INFINITY),
        |(best_index, best), (index, &p)| {
            if p > best { (index, p) } else { (best_index, best) }
        },
    );

    let mut details: Vec<ClassScore> = classes
        .iter()
        .zip(probabilities)
        .map(|(class, &p)| ClassScore {
            label: class.to_string(),
            probability: p * 100.0,
        })
        .collect();
    details.sort_by(|a, b| {
        b.probability
            .partial_cmp(&a.probability)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    Ok(ClassificationReport {
        predicted: classes[top_index].to_string(),
        confidence: top_probability * 100.0,
        details,
    })
}
