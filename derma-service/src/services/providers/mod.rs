//! Explanation provider abstractions and implementations.
//!
//! The analysis flow only depends on the [`Explainer`] trait, so the Gemini
//! backend can be swapped for the mock in tests.

pub mod gemini;
pub mod mock;

use async_trait::async_trait;
use image::RgbImage;
use std::sync::Arc;
use thiserror::Error;

pub use gemini::{GeminiConfig, GeminiExplainer};
pub use mock::MockExplainer;

/// Error type for provider operations.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Content filtered")]
    ContentFiltered,

    #[error("Provider returned no text")]
    EmptyResponse,

    #[error("Network error: {0}")]
    NetworkError(String),
}

/// Produces patient-facing explanatory text for a classified image.
#[async_trait]
pub trait Explainer: Send + Sync {
    /// Generate an explanation for `prompt`, with the image attached as context.
    ///
    /// Implementations must keep CPU-heavy image work off the async runtime.
    async fn explain(&self, prompt: &str, image: Arc<RgbImage>) -> Result<String, ProviderError>;

    /// Verify credentials and reachability.
    async fn health_check(&self) -> Result<(), ProviderError>;

    /// Model identifier reported by the health endpoint.
    fn model(&self) -> &str;
}
