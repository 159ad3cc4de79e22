use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::fs;
use tokio::sync::OnceCell;
use tokio::time::Duration;
use tracing::{debug, info};

use crate::catalog::ModelCard;
use crate::config::Config;
use crate::download::{FetchError, download_model, model_url};
use crate::events::ChatMessage;

/// File name of a cached model artifact inside its model directory
pub const MODEL_FILE_NAME: &str = "model.litert";

const CONTEXT_HINT: &str = " (continuing from previous context)";

/// Errors surfaced by an inference engine
#[derive(Debug, Error)]
pub enum InferenceError {
    /// The model could not be fetched or cached
    #[error("model {model_id} is unavailable: {source}")]
    ModelUnavailable {
        model_id: String,
        #[source]
        source: FetchError,
    },
}

/// Local inference backend
#[async_trait]
pub trait InferenceEngine: Send + Sync {
    /// Make sure the model artifact is available locally and return its path
    async fn ensure_ready(&self, model: &ModelCard) -> Result<PathBuf, InferenceError>;

    /// Produce a reply to `prompt`, given the history that already ends with it
    async fn generate_reply(
        &self,
        model: &ModelCard,
        history: &[ChatMessage],
        prompt: &str,
    ) -> Result<String, InferenceError>;
}

/// Downloads model artifacts on demand and answers with a canned reply
pub struct LocalModelManager {
    client: Client,
    models_dir: PathBuf,
    url_template: String,
    warmup: Duration,
    warm_models: Mutex<HashMap<String, Arc<OnceCell<PathBuf>>>>,
}

impl LocalModelManager {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("pixel-assistant/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            models_dir: config.models_dir.clone(),
            url_template: config.model_url_template.clone(),
            warmup: Duration::from_millis(config.warmup_ms),
            warm_models: Mutex::new(HashMap::new()),
        })
    }

    /// Where the artifact for `model` lives once downloaded
    pub fn model_path(&self, model: &ModelCard) -> PathBuf {
        self.models_dir
            .join(model.cache_dir_name())
            .join(MODEL_FILE_NAME)
    }

    /// Whether the artifact is already on disk
    pub fn is_cached(&self, model: &ModelCard) -> bool {
        self.model_path(model).exists()
    }

    /// Whether `model_id` has been made ready during this run
    pub fn is_warm(&self, model_id: &str) -> bool {
        self.warm_models
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(model_id)
            .is_some_and(|cell| cell.initialized())
    }

    fn slot(&self, model_id: &str) -> Arc<OnceCell<PathBuf>> {
        let mut warm = self.warm_models.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(warm.entry(model_id.to_string()).or_default())
    }

    async fn prepare(&self, model: &ModelCard) -> Result<PathBuf, FetchError> {
        let model_file = self.model_path(model);
        if let Some(parent) = model_file.parent() {
            fs::create_dir_all(parent).await?;
        }

        if fs::try_exists(&model_file).await? {
            debug!("Model {} already cached at {}", model.id, model_file.display());
        } else {
            let url = model_url(&self.url_template, &model.id);
            download_model(&self.client, &url, &model_file).await?;
        }

        info!("Model {} ready", model.id);
        Ok(model_file)
    }

    async fn warm_up(&self, model: &ModelCard) {
        if !self.warmup.is_zero() {
            debug!("Warming up {} for {:?}", model.id, self.warmup);
            tokio::time::sleep(self.warmup).await;
        }
    }
}

#[async_trait]
impl InferenceEngine for LocalModelManager {
    async fn ensure_ready(&self, model: &ModelCard) -> Result<PathBuf, InferenceError> {
        let slot = self.slot(&model.id);
        if let Some(path) = slot.get() {
            debug!("Model {} already warm", model.id);
            return Ok(path.clone());
        }

        let path = slot
            .get_or_try_init(|| self.prepare(model))
            .await
            .map_err(|source| InferenceError::ModelUnavailable {
                model_id: model.id.clone(),
                source,
            })?;
        Ok(path.clone())
    }

    async fn generate_reply(
        &self,
        model: &ModelCard,
        history: &[ChatMessage],
        prompt: &str,
    ) -> Result<String, InferenceError> {
        self.ensure_ready(model).await?;
        self.warm_up(model).await;
        Ok(placeholder_reply(model, history, prompt))
    }
}

/// Stand-in for real generation: echoes the prompt under the model's name
pub fn placeholder_reply(model: &ModelCard, history: &[ChatMessage], prompt: &str) -> String {
    let continuing = history.iter().any(ChatMessage::is_assistant);
    format!(
        "{} says: {}{}",
        model.display_name,
        prompt.trim(),
        if continuing { CONTEXT_HINT } else { "" }
    )
}
