use std::sync::Mutex;

use ndarray::{Array2, Array4};
use tch::nn::ModuleT;
use tch::{CModule, Device, Kind, Tensor};

use shared::TumorClass;

use crate::config::ServiceConfig;

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("model execution failed: {0}")]
    Model(#[from] tch::TchError),
    #[error("unexpected model output shape: {0}")]
    OutputShape(String),
}

enum Backend {
    TorchScript { module: Mutex<CModule>, device: Device },
    Fallback,
}

impl Backend {
    fn load(path: &str, kind: &str) -> Backend {
        let device = Device::cuda_if_available();
        match CModule::load_on_device(path, device) {
            Ok(module) => {
                log::info!("{} model loaded from {}", kind, path);
                Backend::TorchScript {
                    module: Mutex::new(module),
                    device,
                }
            }
            Err(e) => {
                log::warn!("{} model unavailable at {} ({}); using fallback", kind, path, e);
                Backend::Fallback
            }
        }
    }
}

/// 4-way tumor-type classifier. The fallback predicts the uniform
/// distribution so the API stays callable without the trained artifact.
pub struct Classifier {
    backend: Backend,
}

impl Classifier {
    pub fn load(path: &str) -> Self {
        Self {
            backend: Backend::load(path, "Classification"),
        }
    }

    pub fn fallback() -> Self {
        Self {
            backend: Backend::Fallback,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self.backend, Backend::Fallback)
    }

    /// Probability distribution over the known classes.
    pub fn classify(&self, input: &Array4<f32>) -> Result<Vec<f32>, InferenceError> {
        let classes = TumorClass::all().len();
        match &self.backend {
            Backend::TorchScript { module, device } => {
                let tensor = to_input_tensor(input, *device);
                let output = module.lock().unwrap().forward_t(&tensor, false);
                let probs = output.softmax(-1, Kind::Float).reshape([-1]);
                let numel = probs.size()[0] as usize;
                if numel != classes {
                    return Err(InferenceError::OutputShape(format!(
                        "expected {} class probabilities, got {}",
                        classes, numel
                    )));
                }
                let mut buf = vec![0.0f32; numel];
                probs.copy_data(&mut buf, numel);
                Ok(buf)
            }
            Backend::Fallback => Ok(vec![1.0 / classes as f32; classes]),
        }
    }
}

/// U-Net-style tumor segmenter producing a per-pixel probability map. The
/// fallback predicts an empty map at input resolution.
pub struct Segmenter {
    backend: Backend,
}

impl Segmenter {
    pub fn load(path: &str) -> Self {
        Self {
            backend: Backend::load(path, "Segmentation"),
        }
    }

    pub fn fallback() -> Self {
        Self {
            backend: Backend::Fallback,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self.backend, Backend::Fallback)
    }

    pub fn segment(&self, input: &Array4<f32>) -> Result<Array2<f32>, InferenceError> {
        let (_, height, width, _) = input.dim();
        match &self.backend {
            Backend::TorchScript { module, device } => {
                let tensor = to_input_tensor(input, *device);
                let output = module.lock().unwrap().forward_t(&tensor, false);
                extract_map(&output)
            }
            Backend::Fallback => Ok(Array2::zeros((height, width))),
        }
    }
}

/// Pack a (1, H, W, 3) batch array into a framework tensor on the model's
/// device.
fn to_input_tensor(input: &Array4<f32>, device: Device) -> Tensor {
    let (n, h, w, c) = input.dim();
    let data: Vec<f32> = input.iter().copied().collect();
    Tensor::from_slice(&data)
        .reshape([n as i64, h as i64, w as i64, c as i64])
        .to_device(device)
}

/// Reduce the raw segmenter output to a single H×W map. Channel 0 is the
/// tumor-probability channel when the model emits more than one.
fn extract_map(output: &Tensor) -> Result<Array2<f32>, InferenceError> {
    let sizes = output.size();
    let (flat, height, width) = match sizes.as_slice() {
        [1, h, w] | [1, h, w, 1] => (output.reshape([-1]), *h, *w),
        [1, h, w, _] => (output.select(3, 0).reshape([-1]), *h, *w),
        _ => {
            return Err(InferenceError::OutputShape(format!(
                "segmentation output has shape {:?}",
                sizes
            )));
        }
    };
    let numel = (height * width) as usize;
    let mut buf = vec![0.0f32; numel];
    flat.to_kind(Kind::Float).copy_data(&mut buf, numel);
    Array2::from_shape_vec((height as usize, width as usize), buf)
        .map_err(|e| InferenceError::OutputShape(e.to_string()))
}

/// Process-wide model state, constructed once at startup and shared
/// read-only by all requests. Loading never fails: a missing or broken
/// artifact degrades to a fallback instead of aborting.
pub struct ModelRegistry {
    classifier: Option<Classifier>,
    segmenter: Option<Segmenter>,
}

impl ModelRegistry {
    pub fn load(config: &ServiceConfig) -> Self {
        Self::with_models(
            Some(Classifier::load(&config.classifier_path)),
            Some(Segmenter::load(&config.segmenter_path)),
        )
    }

    pub fn with_models(classifier: Option<Classifier>, segmenter: Option<Segmenter>) -> Self {
        Self {
            classifier,
            segmenter,
        }
    }

    pub fn classifier(&self) -> Option<&Classifier> {
        self.classifier.as_ref()
    }

    pub fn segmenter(&self) -> Option<&Segmenter> {
        self.segmenter.as_ref()
    }

    pub fn classification_loaded(&self) -> bool {
        self.classifier.is_some()
    }

    pub fn segmentation_loaded(&self) -> bool {
        self.segmenter.is_some()
    }

    pub fn degraded(&self) -> bool {
        self.classifier.as_ref().is_none_or(Classifier::is_fallback)
            || self.segmenter.as_ref().is_none_or(Segmenter::is_fallback)
    }
}
