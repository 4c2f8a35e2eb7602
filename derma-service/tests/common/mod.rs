//! Shared helpers for derma-service integration tests.
//!
//! The app runs on a random port with mock capabilities, so no model weights
//! or network access are needed.

#![allow(dead_code)]

use derma_service::config::{ClassifierConfig, DermaConfig, GeminiSettings, UploadConfig};
use derma_service::models::LabelTable;
use derma_service::services::classifier::{MockClassifier, ResNetVariant};
use derma_service::services::providers::gemini::GEMINI_API_BASE;
use derma_service::services::providers::MockExplainer;
use derma_service::services::AnalysisService;
use derma_service::startup::{AppState, Application};
use image::{ImageFormat, Rgb, RgbImage};
use secrecy::Secret;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub fn test_config() -> DermaConfig {
    DermaConfig {
        common: service_core::config::Config {
            host: "127.0.0.1".to_string(),
            port: 0, // Random port
        },
        classifier: ClassifierConfig {
            weights_path: PathBuf::from("models/skin_classifier.safetensors"),
            architecture: ResNetVariant::ResNet18,
            device: "cpu".to_string(),
            input_size: 224,
        },
        gemini: GeminiSettings {
            api_key: Secret::new("test-api-key".to_string()),
            model: "gemini-2.5-flash".to_string(),
            api_base: GEMINI_API_BASE.to_string(),
            timeout_secs: 1,
            verify_on_startup: false,
        },
        upload: UploadConfig {
            max_bytes: 10 * 1024 * 1024,
        },
        static_dir: None,
    }
}

/// State for router-level tests that drive the service with `oneshot`.
pub fn test_state(
    config: DermaConfig,
    classifier: Arc<MockClassifier>,
    explainer: Arc<MockExplainer>,
) -> AppState {
    let analyzer = AnalysisService::new(
        classifier,
        explainer,
        Arc::new(LabelTable::default()),
        config.explain_timeout(),
    );
    AppState {
        config,
        analyzer: Arc::new(analyzer),
    }
}

/// Small solid-colour PNG.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_pixel(width, height, Rgb([200, 120, 90]));
    let mut out = Cursor::new(Vec::new());
    image
        .write_to(&mut out, ImageFormat::Png)
        .expect("Failed to encode test PNG");
    out.into_inner()
}

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub classifier: Arc<MockClassifier>,
    pub explainer: Arc<MockExplainer>,
    pub client: reqwest::Client,
}

impl TestApp {
    pub async fn spawn(classifier: MockClassifier, explainer: MockExplainer) -> Self {
        Self::spawn_with(test_config(), classifier, explainer).await
    }

    pub async fn spawn_with(
        config: DermaConfig,
        classifier: MockClassifier,
        explainer: MockExplainer,
    ) -> Self {
        let classifier = Arc::new(classifier);
        let explainer = Arc::new(explainer);

        let app = Application::build_with(
            config,
            LabelTable::default(),
            classifier.clone(),
            explainer.clone(),
        )
        .await
        .expect("Failed to build application");

        let port = app.port();

        // Spawn the server in the background
        tokio::spawn(async move {
            let _ = app.run_until_stopped().await;
        });

        Self {
            address: format!("http://127.0.0.1:{}", port),
            port,
            classifier,
            explainer,
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .expect("Failed to build HTTP client"),
        }
    }

    /// POST `bytes` to `/analyze` as the `image` field.
    pub async fn analyze(&self, bytes: Vec<u8>) -> reqwest::Response {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name("lesion.png")
            .mime_str("image/png")
            .expect("Invalid mime type");
        let form = reqwest::multipart::Form::new().part("image", part);
        self.post_form(form).await
    }

    pub async fn post_form(&self, form: reqwest::multipart::Form) -> reqwest::Response {
        self.client
            .post(format!("{}/analyze", self.address))
            .multipart(form)
            .send()
            .await
            .expect("Failed to send request")
    }
}
