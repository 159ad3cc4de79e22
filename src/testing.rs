//! Inference stubs shared by unit tests.

use async_trait::async_trait;
use std::path::PathBuf;
use tokio::time::Duration;

use crate::catalog::ModelCard;
use crate::download::FetchError;
use crate::events::ChatMessage;
use crate::llm::{InferenceEngine, InferenceError, placeholder_reply};

/// Answers immediately with the placeholder reply
pub struct EchoEngine;

#[async_trait]
impl InferenceEngine for EchoEngine {
    async fn ensure_ready(&self, model: &ModelCard) -> Result<PathBuf, InferenceError> {
        Ok(PathBuf::from(model.cache_dir_name()))
    }

    async fn generate_reply(
        &self,
        model: &ModelCard,
        history: &[ChatMessage],
        prompt: &str,
    ) -> Result<String, InferenceError> {
        Ok(placeholder_reply(model, history, prompt))
    }
}

/// Never gets its model ready
pub struct FailingEngine;

#[async_trait]
impl InferenceEngine for FailingEngine {
    async fn ensure_ready(&self, model: &ModelCard) -> Result<PathBuf, InferenceError> {
        Err(InferenceError::ModelUnavailable {
            model_id: model.id.clone(),
            source: FetchError::EmptyBody,
        })
    }

    async fn generate_reply(
        &self,
        model: &ModelCard,
        _history: &[ChatMessage],
        _prompt: &str,
    ) -> Result<String, InferenceError> {
        self.ensure_ready(model).await?;
        unreachable!("model is never ready")
    }
}

/// Like [`EchoEngine`], but a prompt of `"slow"` takes a minute
pub struct SlowEngine;

#[async_trait]
impl InferenceEngine for SlowEngine {
    async fn ensure_ready(&self, model: &ModelCard) -> Result<PathBuf, InferenceError> {
        EchoEngine.ensure_ready(model).await
    }

    async fn generate_reply(
        &self,
        model: &ModelCard,
        history: &[ChatMessage],
        prompt: &str,
    ) -> Result<String, InferenceError> {
        if prompt == "slow" {
            tokio::time::sleep(Duration::from_secs(60)).await;
        }
        EchoEngine.generate_reply(model, history, prompt).await
    }
}
