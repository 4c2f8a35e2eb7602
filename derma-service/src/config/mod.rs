use crate::models::LabelTable;
use crate::services::classifier::ResNetVariant;
use crate::services::providers::gemini::{GeminiConfig, GEMINI_API_BASE};
use secrecy::Secret;
use serde::Deserialize;
use service_core::config::{self as core_config, get_env, is_production, optional_env, parse_env};
use service_core::error::AppError;
use std::path::PathBuf;
use std::time::Duration;

/// Default upload ceiling (10MB).
const DEFAULT_UPLOAD_MAX_BYTES: usize = 10 * 1024 * 1024;

/// Images forwarded to the explainer are shrunk to this longest side.
const ATTACHMENT_MAX_SIDE: u32 = 1024;

#[derive(Debug, Clone, Deserialize)]
pub struct DermaConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub classifier: ClassifierConfig,
    pub gemini: GeminiSettings,
    pub upload: UploadConfig,
    /// Directory with the browser front-end; not served when unset.
    pub static_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierConfig {
    /// Safetensors file holding the network weights.
    pub weights_path: PathBuf,
    pub architecture: ResNetVariant,
    /// `cpu` or `cuda`.
    pub device: String,
    /// Side length of the square model input.
    pub input_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiSettings {
    pub api_key: Secret<String>,
    pub model: String,
    pub api_base: String,
    pub timeout_secs: u64,
    /// Call the models endpoint before serving to prove the key works.
    pub verify_on_startup: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    pub max_bytes: usize,
}

impl DermaConfig {
    pub fn load() -> Result<Self, AppError> {
        // Load common config (handles .env and APP__ prefix)
        let common_config = core_config::Config::load()?;
        let is_prod = is_production();

        let api_key = get_env("GOOGLE_API_KEY", None, is_prod)?;
        if api_key.trim().is_empty() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "GOOGLE_API_KEY is set but empty"
            )));
        }

        let config = DermaConfig {
            common: common_config,
            classifier: ClassifierConfig {
                weights_path: PathBuf::from(get_env(
                    "CLASSIFIER_WEIGHTS_PATH",
                    Some("models/skin_classifier.safetensors"),
                    is_prod,
                )?),
                architecture: parse_env("CLASSIFIER_ARCHITECTURE", "resnet18", is_prod)?,
                device: get_env("CLASSIFIER_DEVICE", Some("cpu"), is_prod)?,
                input_size: parse_env("CLASSIFIER_INPUT_SIZE", "224", is_prod)?,
            },
            gemini: GeminiSettings {
                api_key: Secret::new(api_key),
                model: get_env("GEMINI_MODEL", Some("gemini-2.5-flash"), is_prod)?,
                api_base: get_env("GEMINI_API_BASE", Some(GEMINI_API_BASE), is_prod)?,
                timeout_secs: parse_env("GEMINI_TIMEOUT_SECS", "30", is_prod)?,
                verify_on_startup: parse_env("GEMINI_VERIFY_ON_STARTUP", "true", is_prod)?,
            },
            upload: UploadConfig {
                max_bytes: parse_env(
                    "UPLOAD_MAX_BYTES",
                    &DEFAULT_UPLOAD_MAX_BYTES.to_string(),
                    is_prod,
                )?,
            },
            static_dir: optional_env("STATIC_DIR").map(PathBuf::from),
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values that parse but cannot work at runtime.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.classifier.input_size == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "CLASSIFIER_INPUT_SIZE must be greater than zero"
            )));
        }
        Ok(())
    }

    /// Label table for the classifier head; `CLASSIFIER_LABELS` overrides the
    /// built-in list.
    pub fn label_table(&self) -> LabelTable {
        match optional_env("CLASSIFIER_LABELS") {
            Some(raw) => LabelTable::from_csv(&raw),
            None => LabelTable::default(),
        }
    }

    /// Deadline for one explanation, covering encoding and the HTTP exchange.
    pub fn explain_timeout(&self) -> Duration {
        Duration::from_secs(self.gemini.timeout_secs.max(1))
    }

    pub fn gemini_config(&self) -> GeminiConfig {
        GeminiConfig {
            api_key: self.gemini.api_key.clone(),
            model: self.gemini.model.clone(),
            api_base: self.gemini.api_base.clone(),
            request_timeout: self.explain_timeout(),
            attachment_max_side: ATTACHMENT_MAX_SIDE,
        }
    }
}
