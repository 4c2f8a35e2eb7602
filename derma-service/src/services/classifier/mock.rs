//! Mock classifier for testing.

use super::{Classifier, ClassifierError};
use crate::models::ClassificationResult;
use image::RgbImage;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Returns a fixed classification (or failure) and counts invocations.
pub struct MockClassifier {
    outcome: Result<ClassificationResult, String>,
    calls: AtomicUsize,
}

impl MockClassifier {
    pub fn returning(class_index: usize, confidence: f32) -> Self {
        Self {
            outcome: Ok(ClassificationResult::new(class_index, confidence)),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            outcome: Err(message.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Classifier for MockClassifier {
    fn classify(&self, _image: &RgbImage) -> Result<ClassificationResult, ClassifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome
            .clone()
            .map_err(ClassifierError::Unavailable)
    }

    fn name(&self) -> &str {
        "mock"
    }
}
