use serde::{Deserialize, Serialize};

/// Tunables for both pipelines. The two thresholds are configuration rather
/// than invariants; the shipped defaults match the values the models were
/// evaluated with. Sizes are (width, height).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    pub classify_size: (u32, u32),
    pub segment_size: (u32, u32),
    pub mask_threshold: f32,
    pub detection_threshold: f32,
    pub thumbnail_size: (u32, u32),
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            classify_size: (224, 224),
            segment_size: (128, 128),
            mask_threshold: 0.5,
            detection_threshold: 0.1,
            thumbnail_size: (400, 400),
        }
    }
}

impl InferenceConfig {
    /// Load from the workspace config file; a missing or invalid file logs a
    /// warning and falls back to the compiled-in defaults.
    pub fn load() -> Self {
        let path = match std::env::var("CARGO_MANIFEST_DIR") {
            Ok(dir) => format!("{}/../config/inference.yaml", dir),
            Err(_) => "config/inference.yaml".to_string(),
        };
        Self::load_from(&path)
    }

    fn load_from(path: &str) -> Self {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!("Inference config {} not readable ({}); using defaults", path, e);
                return Self::default();
            }
        };
        match serde_yaml::from_str(&raw) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Inference config {} invalid ({}); using defaults", path, e);
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = InferenceConfig::load_from("no/such/inference.yaml");
        assert_eq!(config.segment_size, (128, 128));
        assert_eq!(config.mask_threshold, 0.5);
        assert_eq!(config.detection_threshold, 0.1);
    }

    #[test]
    fn shipped_config_shape_parses() {
        let raw = "classify_size: [224, 224]\nsegment_size: [128, 128]\nmask_threshold: 0.5\ndetection_threshold: 0.1\nthumbnail_size: [400, 400]\n";
        let config: InferenceConfig = serde_yaml::from_str(raw).unwrap();
        assert_eq!(config.classify_size, (224, 224));
        assert_eq!(config.thumbnail_size, (400, 400));
    }

    #[test]
    fn partial_config_keeps_remaining_defaults() {
        let config: InferenceConfig = serde_yaml::from_str("mask_threshold: 0.6\n").unwrap();
        assert_eq!(config.mask_threshold, 0.6);
        assert_eq!(config.segment_size, (128, 128));
    }
}
