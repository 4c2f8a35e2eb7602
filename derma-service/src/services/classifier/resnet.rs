//! ResNet image classifier backed by candle.
//!
//! Weights are read once from a safetensors file whose classification head
//! must match the configured label table.

use super::{top1, Classifier, ClassifierError};
use crate::config::ClassifierConfig;
use crate::models::ClassificationResult;
use candle_core::{DType, Device, Module, Tensor, D};
use candle_nn::{Func, VarBuilder};
use candle_transformers::models::resnet;
use image::imageops::FilterType;
use image::RgbImage;
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Supported ResNet depths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResNetVariant {
    ResNet18,
    ResNet34,
    ResNet50,
}

impl fmt::Display for ResNetVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResNetVariant::ResNet18 => "resnet18",
            ResNetVariant::ResNet34 => "resnet34",
            ResNetVariant::ResNet50 => "resnet50",
        };
        f.write_str(name)
    }
}

impl FromStr for ResNetVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "resnet18" => Ok(ResNetVariant::ResNet18),
            "resnet34" => Ok(ResNetVariant::ResNet34),
            "resnet50" => Ok(ResNetVariant::ResNet50),
            other => Err(format!(
                "unknown architecture '{}' (expected resnet18, resnet34 or resnet50)",
                other
            )),
        }
    }
}

pub struct ResNetClassifier {
    model: Func<'static>,
    device: Device,
    input_size: u32,
    name: String,
}

impl ResNetClassifier {
    /// Load weights and verify the head produces `num_classes` scores.
    pub fn load(config: &ClassifierConfig, num_classes: usize) -> Result<Self, ClassifierError> {
        if num_classes == 0 {
            return Err(ClassifierError::Load(
                "label table is empty; cannot size classification head".to_string(),
            ));
        }
        if !config.weights_path.exists() {
            return Err(ClassifierError::Load(format!(
                "weights file does not exist: {}",
                config.weights_path.display()
            )));
        }

        let device = match config.device.as_str() {
            "cuda" => Device::new_cuda(0)
                .map_err(|e| ClassifierError::Load(format!("Failed to initialize CUDA: {}", e)))?,
            "cpu" => Device::Cpu,
            other => {
                return Err(ClassifierError::Load(format!(
                    "unsupported device '{}'",
                    other
                )))
            }
        };

        let started = Instant::now();
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(
                std::slice::from_ref(&config.weights_path),
                DType::F32,
                &device,
            )
            .map_err(|e| ClassifierError::Load(format!("Failed to load weights: {}", e)))?
        };

        let model = match config.architecture {
            ResNetVariant::ResNet18 => resnet::resnet18(num_classes, vb),
            ResNetVariant::ResNet34 => resnet::resnet34(num_classes, vb),
            ResNetVariant::ResNet50 => resnet::resnet50(num_classes, vb),
        }
        .map_err(|e| {
            ClassifierError::Load(format!(
                "Failed to build {} with {} classes: {}",
                config.architecture, num_classes, e
            ))
        })?;

        let classifier = Self {
            model,
            device,
            input_size: config.input_size,
            name: config.architecture.to_string(),
        };
        classifier.verify_head(num_classes)?;

        tracing::info!(
            architecture = %config.architecture,
            weights = %config.weights_path.display(),
            num_classes,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Loaded image classifier"
        );

        Ok(classifier)
    }

    fn verify_head(&self, num_classes: usize) -> Result<(), ClassifierError> {
        let size = self.input_size as usize;
        let probe = Tensor::zeros((1, 3, size, size), DType::F32, &self.device)?;
        let logits = self.model.forward(&probe)?;
        let produced = logits.dim(D::Minus1)?;
        if produced != num_classes {
            return Err(ClassifierError::Load(format!(
                "model outputs {} classes but the label table has {}",
                produced, num_classes
            )));
        }
        Ok(())
    }

    /// Resize to the model's input size and normalise with ImageNet statistics.
    fn preprocess(&self, image: &RgbImage) -> Result<Tensor, ClassifierError> {
        let size = self.input_size;
        let resized = image::imageops::resize(image, size, size, FilterType::Triangle);
        let side = size as usize;

        let pixels = Tensor::from_vec(resized.into_raw(), (side, side, 3), &self.device)?
            .permute((2, 0, 1))?
            .to_dtype(DType::F32)?;
        let pixels = (pixels / 255.0)?;

        let mean = Tensor::new(&IMAGENET_MEAN, &self.device)?.reshape((3, 1, 1))?;
        let std = Tensor::new(&IMAGENET_STD, &self.device)?.reshape((3, 1, 1))?;

        Ok(pixels
            .broadcast_sub(&mean)?
            .broadcast_div(&std)?
            .unsqueeze(0)?)
    }
}

impl Classifier for ResNetClassifier {
    fn classify(&self, image: &RgbImage) -> Result<ClassificationResult, ClassifierError> {
        let input = self.preprocess(image)?;
        let logits = self.model.forward(&input)?;
        let probs = candle_nn::ops::softmax(&logits, D::Minus1)?
            .squeeze(0)?
            .to_vec1::<f32>()?;
        top1(&probs)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn parses_architecture_names() {
        assert_eq!("resnet18".parse::<ResNetVariant>(), Ok(ResNetVariant::ResNet18));
        assert_eq!(" ResNet50 ".parse::<ResNetVariant>(), Ok(ResNetVariant::ResNet50));
        assert!("yolov8".parse::<ResNetVariant>().is_err());
        assert_eq!(ResNetVariant::ResNet34.to_string(), "resnet34");
    }

    #[test]
    fn missing_weights_fail_to_load() {
        let config = ClassifierConfig {
            weights_path: PathBuf::from("does/not/exist.safetensors"),
            architecture: ResNetVariant::ResNet18,
            device: "cpu".to_string(),
            input_size: 224,
        };
        let err = ResNetClassifier::load(&config, 10).err().unwrap();
        assert!(matches!(err, ClassifierError::Load(msg) if msg.contains("does not exist")));
    }

    #[test]
    fn empty_label_table_is_rejected() {
        let config = ClassifierConfig {
            weights_path: PathBuf::from("does/not/exist.safetensors"),
            architecture: ResNetVariant::ResNet18,
            device: "cpu".to_string(),
            input_size: 224,
        };
        let err = ResNetClassifier::load(&config, 0).err().unwrap();
        assert!(matches!(err, ClassifierError::Load(msg) if msg.contains("empty")));
    }
}
