use std::env;

/// Process-level settings. Every value has a default so the service starts
/// in a bare environment; absent model artifacts degrade to fallbacks at
/// load time rather than failing here.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub classifier_path: String,
    pub segmenter_path: String,
    pub port: String,
    pub static_dir: String,
}

impl ServiceConfig {
    pub fn from_env() -> Self {
        let static_dir = if let Ok(manifest_dir) = env::var("CARGO_MANIFEST_DIR") {
            format!("{}/../static", manifest_dir)
        } else {
            "/usr/src/app/static".to_string()
        };

        Self {
            classifier_path: env::var("CLASSIFIER_MODEL_PATH")
                .unwrap_or_else(|_| "models/classifier.pt".to_string()),
            segmenter_path: env::var("SEGMENTER_MODEL_PATH")
                .unwrap_or_else(|_| "models/segmentation.pt".to_string()),
            port: env::var("PORT").unwrap_or_else(|_| "8081".to_string()),
            static_dir: env::var("STATIC_DIR").unwrap_or(static_dir),
        }
    }
}
