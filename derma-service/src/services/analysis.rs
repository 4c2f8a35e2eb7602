//! Classify-then-explain flow behind `POST /analyze`.
//!
//! One call runs decode → classify → confidence gate → (optional) explain.
//! Only decoding and classification can fail; every explainer problem is
//! absorbed into a deterministic fallback text.

use crate::models::{format_percent, round_confidence, AnalysisResponse, LabelTable};
use crate::services::classifier::{Classifier, ClassifierError};
use crate::services::image_codec::{self, ImageCodecError};
use crate::services::metrics::{self, AnalysisOutcome};
use crate::services::providers::Explainer;
use image::RgbImage;
use service_core::error::AppError;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Scores strictly below this are reported as uncertain.
pub const CONFIDENCE_THRESHOLD: f32 = 0.4;

pub const UNCERTAIN_LABEL: &str = "Uncertain";

pub const LOW_CONFIDENCE_MESSAGE: &str = "The AI is not confident enough (low score). \
     Please upload a clearer, well-lit close-up image of the affected skin.";

pub const DISCLAIMER: &str = "This is not a substitute for professional medical advice.";

pub const EXPLAINER_UNAVAILABLE_NOTICE: &str =
    "The explanation service is temporarily unavailable. Please try again later.";

/// Raw upload as received from the multipart body.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub bytes: Vec<u8>,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
}

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Invalid image: {0}")]
    InvalidImage(#[from] ImageCodecError),

    #[error("Classification failed: {0}")]
    Classifier(#[from] ClassifierError),

    #[error("Classification task aborted: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

impl From<AnalysisError> for AppError {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::InvalidImage(e) => {
                tracing::info!(error = %e, "Rejected undecodable upload");
                AppError::BadRequest(anyhow::anyhow!("Invalid image"))
            }
            other => AppError::InternalError(anyhow::Error::new(other)),
        }
    }
}

/// Prompt sent to the explainer for a confident classification.
pub fn build_prompt(disease: &str, confidence: f32) -> String {
    format!(
        "You are a caring dermatologist speaking to a patient.\n\
         The AI detected: {disease}\n\
         Confidence: {percent}\n\
         \n\
         In simple, kind language (max 250 words):\n\
         • What is {disease}?\n\
         • Common causes and symptoms\n\
         • Home remedies or over-the-counter options\n\
         • When to see a doctor immediately\n\
         End with: \"{DISCLAIMER}\"",
        disease = disease,
        percent = format_percent(confidence),
    )
}

/// Text returned when the explainer cannot answer.
pub fn fallback_explanation(disease: &str, confidence: f32) -> String {
    format!(
        "Disease detected: {} ({} confidence). {} {}",
        disease,
        format_percent(confidence),
        EXPLAINER_UNAVAILABLE_NOTICE,
        DISCLAIMER
    )
}

pub struct AnalysisService {
    classifier: Arc<dyn Classifier>,
    explainer: Arc<dyn Explainer>,
    labels: Arc<LabelTable>,
    explain_timeout: Duration,
}

impl AnalysisService {
    pub fn new(
        classifier: Arc<dyn Classifier>,
        explainer: Arc<dyn Explainer>,
        labels: Arc<LabelTable>,
        explain_timeout: Duration,
    ) -> Self {
        Self {
            classifier,
            explainer,
            labels,
            explain_timeout,
        }
    }

    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    pub fn classifier_name(&self) -> &str {
        self.classifier.name()
    }

    pub fn explainer(&self) -> &dyn Explainer {
        self.explainer.as_ref()
    }

    pub async fn analyze(&self, upload: UploadedImage) -> Result<AnalysisResponse, AnalysisError> {
        let classifier = Arc::clone(&self.classifier);
        let byte_len = upload.bytes.len();
        let content_type = upload.content_type.clone().unwrap_or_default();

        let (image, classification) = tokio::task::spawn_blocking(move || {
            let image = image_codec::decode_rgb(&upload.bytes)?;
            let started = Instant::now();
            let classification = classifier.classify(&image)?;
            metrics::record_classification(started.elapsed());
            Ok::<_, AnalysisError>((image, classification))
        })
        .await??;

        if !classification.confidence.is_finite() {
            return Err(ClassifierError::InvalidScore(classification.class_index).into());
        }
        let confidence = classification.confidence.clamp(0.0, 1.0);

        tracing::info!(
            bytes = byte_len,
            content_type = %content_type,
            width = image.width(),
            height = image.height(),
            class_index = classification.class_index,
            confidence,
            "Image classified"
        );

        if confidence < CONFIDENCE_THRESHOLD {
            metrics::record_outcome(AnalysisOutcome::Uncertain);
            return Ok(AnalysisResponse {
                disease: UNCERTAIN_LABEL.to_string(),
                confidence: round_confidence(confidence),
                explanation: LOW_CONFIDENCE_MESSAGE.to_string(),
            });
        }

        if self.labels.get(classification.class_index).is_none() {
            tracing::warn!(
                class_index = classification.class_index,
                table_len = self.labels.len(),
                "Classifier index outside label table"
            );
        }
        let disease = self.labels.display_label(classification.class_index);
        let explanation = self.explain(&disease, confidence, Arc::new(image)).await;

        Ok(AnalysisResponse {
            disease,
            confidence: round_confidence(confidence),
            explanation,
        })
    }

    async fn explain(&self, disease: &str, confidence: f32, image: Arc<RgbImage>) -> String {
        let prompt = build_prompt(disease, confidence);
        let started = Instant::now();
        let outcome =
            tokio::time::timeout(self.explain_timeout, self.explainer.explain(&prompt, image))
                .await;
        metrics::record_explanation(started.elapsed());

        let failure = match outcome {
            Ok(Ok(text)) if !text.trim().is_empty() => {
                metrics::record_outcome(AnalysisOutcome::Explained);
                return text.trim().to_string();
            }
            Ok(Ok(_)) => "empty explanation".to_string(),
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!("timed out after {:?}", self.explain_timeout),
        };

        tracing::warn!(
            model = self.explainer.model(),
            disease,
            error = %failure,
            "Explainer unavailable, using fallback text"
        );
        metrics::record_outcome(AnalysisOutcome::ExplainerFallback);
        fallback_explanation(disease, confidence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::classifier::MockClassifier;
    use crate::services::image_codec::png_bytes;
    use crate::services::providers::MockExplainer;

    struct Harness {
        classifier: Arc<MockClassifier>,
        explainer: Arc<MockExplainer>,
        service: AnalysisService,
    }

    fn harness(classifier: MockClassifier, explainer: MockExplainer) -> Harness {
        let classifier = Arc::new(classifier);
        let explainer = Arc::new(explainer);
        let service = AnalysisService::new(
            classifier.clone(),
            explainer.clone(),
            Arc::new(LabelTable::default()),
            Duration::from_millis(200),
        );
        Harness {
            classifier,
            explainer,
            service,
        }
    }

    fn upload() -> UploadedImage {
        UploadedImage {
            bytes: png_bytes(16, 16),
            file_name: Some("lesion.png".into()),
            content_type: Some("image/png".into()),
        }
    }

    #[tokio::test]
    async fn low_confidence_skips_explainer() {
        let h = harness(MockClassifier::returning(7, 0.19), MockExplainer::replying("unused"));

        let response = h.service.analyze(upload()).await.unwrap();

        assert_eq!(response.disease, UNCERTAIN_LABEL);
        assert_eq!(response.confidence, 0.19);
        assert_eq!(response.explanation, LOW_CONFIDENCE_MESSAGE);
        assert_eq!(h.explainer.calls(), 0);
    }

    #[tokio::test]
    async fn confident_result_is_explained_once() {
        let h = harness(
            MockClassifier::returning(5, 0.469),
            MockExplainer::replying("  Psoriasis is a chronic skin condition.  \n"),
        );

        let response = h.service.analyze(upload()).await.unwrap();

        assert_eq!(response.disease, "Psoriasis");
        assert_eq!(response.confidence, 0.469);
        assert_eq!(response.explanation, "Psoriasis is a chronic skin condition.");

        let prompts = h.explainer.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Psoriasis"));
        assert!(prompts[0].contains("46.9%"));
    }

    #[tokio::test]
    async fn threshold_itself_counts_as_confident() {
        let h = harness(MockClassifier::returning(0, 0.4), MockExplainer::replying("ok"));

        let response = h.service.analyze(upload()).await.unwrap();

        assert_eq!(response.disease, "Acne");
        assert_eq!(response.confidence, 0.4);
        assert_eq!(h.explainer.calls(), 1);
    }

    #[tokio::test]
    async fn just_below_threshold_is_uncertain() {
        let h = harness(MockClassifier::returning(0, 0.399_9), MockExplainer::replying("ok"));

        let response = h.service.analyze(upload()).await.unwrap();

        assert_eq!(response.disease, UNCERTAIN_LABEL);
        assert_eq!(response.confidence, 0.4);
        assert_eq!(h.explainer.calls(), 0);
    }

    #[tokio::test]
    async fn explainer_failure_falls_back() {
        let h = harness(MockClassifier::returning(5, 0.82), MockExplainer::failing());

        let response = h.service.analyze(upload()).await.unwrap();

        assert_eq!(response.disease, "Psoriasis");
        assert_eq!(response.confidence, 0.82);
        assert!(response.explanation.contains("Psoriasis"));
        assert!(response.explanation.contains("82.0%"));
        assert!(response.explanation.contains("temporarily unavailable"));
        assert!(response.explanation.contains(DISCLAIMER));
        assert_eq!(h.explainer.calls(), 1);
    }

    #[tokio::test]
    async fn blank_explanation_falls_back() {
        let h = harness(MockClassifier::returning(3, 0.9), MockExplainer::replying("   "));

        let response = h.service.analyze(upload()).await.unwrap();

        assert_eq!(response.explanation, fallback_explanation("Eczema", 0.9));
    }

    #[tokio::test]
    async fn explainer_timeout_falls_back() {
        let h = harness(MockClassifier::returning(9, 0.75), MockExplainer::hanging());

        let response = h.service.analyze(upload()).await.unwrap();

        assert_eq!(response.disease, "Vitiligo");
        assert!(response.explanation.contains("temporarily unavailable"));
    }

    #[tokio::test]
    async fn out_of_range_index_uses_unknown_label() {
        let h = harness(MockClassifier::returning(42, 0.9), MockExplainer::replying("text"));

        let response = h.service.analyze(upload()).await.unwrap();

        assert_eq!(response.disease, crate::models::UNKNOWN_LABEL);
    }

    #[tokio::test]
    async fn undecodable_image_never_reaches_classifier() {
        let h = harness(MockClassifier::returning(5, 0.9), MockExplainer::replying("text"));
        let bad = UploadedImage {
            bytes: b"GIF89a-but-not-really".to_vec(),
            file_name: None,
            content_type: None,
        };

        let err = h.service.analyze(bad).await.unwrap_err();

        assert!(matches!(err, AnalysisError::InvalidImage(_)));
        assert_eq!(h.classifier.calls(), 0);
        assert_eq!(h.explainer.calls(), 0);
    }

    #[tokio::test]
    async fn classifier_failure_propagates() {
        let h = harness(MockClassifier::failing("weights corrupted"), MockExplainer::replying("x"));

        let err = h.service.analyze(upload()).await.unwrap_err();

        assert!(matches!(err, AnalysisError::Classifier(_)));
        assert_eq!(h.explainer.calls(), 0);
    }

    #[tokio::test]
    async fn non_finite_confidence_is_a_classifier_failure() {
        let h = harness(MockClassifier::returning(1, f32::NAN), MockExplainer::replying("x"));

        let err = h.service.analyze(upload()).await.unwrap_err();

        assert!(matches!(
            err,
            AnalysisError::Classifier(ClassifierError::InvalidScore(1))
        ));
    }

    #[test]
    fn prompt_follows_outline_and_disclaimer() {
        let prompt = build_prompt("Actinic Keratosis", 0.823);
        assert!(prompt.contains("The AI detected: Actinic Keratosis"));
        assert!(prompt.contains("Confidence: 82.3%"));
        assert!(prompt.contains("max 250 words"));
        assert!(prompt.contains("What is Actinic Keratosis?"));
        assert!(prompt.contains("When to see a doctor immediately"));
        assert!(prompt.ends_with(&format!("\"{}\"", DISCLAIMER)));
    }

    #[test]
    fn analysis_errors_map_to_http_errors() {
        let invalid: AppError =
            AnalysisError::InvalidImage(image_codec::decode_rgb(b"x").unwrap_err()).into();
        assert!(matches!(invalid, AppError::BadRequest(ref e) if e.to_string() == "Invalid image"));

        let failed: AppError =
            AnalysisError::Classifier(ClassifierError::EmptyOutput).into();
        assert!(matches!(failed, AppError::InternalError(_)));
    }
}
