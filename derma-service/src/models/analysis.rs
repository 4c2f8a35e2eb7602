use serde::{Deserialize, Serialize};

/// Top-1 output of a classifier run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassificationResult {
    pub class_index: usize,
    /// Probability of `class_index`, in [0, 1].
    pub confidence: f32,
}

impl ClassificationResult {
    pub fn new(class_index: usize, confidence: f32) -> Self {
        Self {
            class_index,
            confidence,
        }
    }
}

/// Body of a successful `POST /analyze`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub disease: String,
    pub confidence: f64,
    pub explanation: String,
}

/// Round a confidence score to three decimal places for the response body.
///
/// Ties go to the even neighbour, the same way the percentage text rounds.
pub fn round_confidence(confidence: f32) -> f64 {
    (f64::from(confidence) * 1000.0).round_ties_even() / 1000.0
}

/// Render a confidence score as a percentage with one decimal, e.g. `82.3%`.
pub fn format_percent(confidence: f32) -> String {
    format!("{:.1}%", f64::from(confidence) * 100.0)
}
