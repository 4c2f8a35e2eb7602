//! Image classifier abstraction and implementations.
//!
//! Inference is synchronous and CPU/GPU bound; callers run it on the
//! blocking thread pool.

pub mod mock;
pub mod resnet;

use crate::models::ClassificationResult;
use image::RgbImage;
use thiserror::Error;

pub use mock::MockClassifier;
pub use resnet::{ResNetClassifier, ResNetVariant};

/// Error type for classifier operations.
#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("Model load failed: {0}")]
    Load(String),

    #[error("Inference failed: {0}")]
    Inference(#[from] candle_core::Error),

    #[error("Model produced no class scores")]
    EmptyOutput,

    #[error("Model produced a non-finite score for class {0}")]
    InvalidScore(usize),

    /// A classifier without a loaded model, such as [`MockClassifier`] set
    /// up to fail. Model-backed classifiers report `Load` or `Inference`.
    #[error("Classifier unavailable: {0}")]
    Unavailable(String),
}

/// Maps a decoded RGB image to its most likely class.
pub trait Classifier: Send + Sync {
    fn classify(&self, image: &RgbImage) -> Result<ClassificationResult, ClassifierError>;

    /// Short identifier reported by the health endpoint.
    fn name(&self) -> &str;
}

/// Pick the highest-probability class from a score vector.
pub fn top1(scores: &[f32]) -> Result<ClassificationResult, ClassifierError> {
    let mut best: Option<(usize, f32)> = None;
    for (index, &score) in scores.iter().enumerate() {
        if !score.is_finite() {
            return Err(ClassifierError::InvalidScore(index));
        }
        match best {
            Some((_, best_score)) if best_score >= score => {}
            _ => best = Some((index, score)),
        }
    }

    best.map(|(index, score)| ClassificationResult::new(index, score.clamp(0.0, 1.0)))
        .ok_or(ClassifierError::EmptyOutput)
}
