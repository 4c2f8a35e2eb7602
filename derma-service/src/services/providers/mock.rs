//! Mock explainer for testing.

use super::{Explainer, ProviderError};
use async_trait::async_trait;
use image::RgbImage;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
enum Behavior {
    Reply(String),
    Fail,
    Hang,
}

/// Explainer that replies with canned text, fails, or never answers, and
/// records every prompt it receives.
pub struct MockExplainer {
    behavior: Behavior,
    prompts: Mutex<Vec<String>>,
}

impl MockExplainer {
    pub fn replying(text: &str) -> Self {
        Self::with(Behavior::Reply(text.to_string()))
    }

    pub fn failing() -> Self {
        Self::with(Behavior::Fail)
    }

    /// Never completes; exercises the caller's timeout.
    pub fn hanging() -> Self {
        Self::with(Behavior::Hang)
    }

    fn with(behavior: Behavior) -> Self {
        Self {
            behavior,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Explainer for MockExplainer {
    async fn explain(&self, prompt: &str, _image: Arc<RgbImage>) -> Result<String, ProviderError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        match &self.behavior {
            Behavior::Reply(text) => Ok(text.clone()),
            Behavior::Fail => Err(ProviderError::ApiError(
                "Mock explainer configured to fail".to_string(),
            )),
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(ProviderError::NetworkError("Mock explainer woke up".to_string()))
            }
        }
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        match self.behavior {
            Behavior::Fail => Err(ProviderError::NotConfigured(
                "Mock explainer configured to fail".to_string(),
            )),
            _ => Ok(()),
        }
    }

    fn model(&self) -> &str {
        "mock"
    }
}
