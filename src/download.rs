//! Fetching model artifacts into the local cache.

use futures::StreamExt;
use reqwest::{Client, StatusCode};
use std::path::Path;
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Why a model artifact could not be fetched
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("server returned {0}")]
    Status(StatusCode),

    #[error("empty response body")]
    EmptyBody,

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("cache write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Fill `{model_id}` into a download URL template
pub fn model_url(template: &str, model_id: &str) -> String {
    template.replace("{model_id}", model_id)
}

/// Stream `url` into `destination`, returning the number of bytes written.
///
/// The body goes to `<destination>.tmp` first and is only renamed into place
/// once complete and non-empty.
pub async fn download_model(
    client: &Client,
    url: &str,
    destination: &Path,
) -> Result<u64, FetchError> {
    info!("Downloading model from {}", url);

    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).await?;
    }

    let response = client.get(url).send().await?;
    if !response.status().is_success() {
        return Err(FetchError::Status(response.status()));
    }

    let total_size = response.content_length().unwrap_or(0);
    let temp_path = destination.with_extension("tmp");

    match write_body(response, &temp_path, total_size).await {
        Ok(0) => {
            let _ = fs::remove_file(&temp_path).await;
            Err(FetchError::EmptyBody)
        }
        Ok(written) => {
            fs::rename(&temp_path, destination).await?;
            info!("Saved {} bytes to {}", written, destination.display());
            Ok(written)
        }
        Err(e) => {
            let _ = fs::remove_file(&temp_path).await;
            Err(e)
        }
    }
}

async fn write_body(
    response: reqwest::Response,
    temp_path: &Path,
    total_size: u64,
) -> Result<u64, FetchError> {
    let mut file = fs::File::create(temp_path).await?;
    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;
    let mut last_progress: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;

        if total_size > 0 {
            let progress = downloaded * 100 / total_size;
            if progress != last_progress {
                last_progress = progress;
                debug!("Download progress: {}%", progress);
            }
        }
    }

    file.flush().await?;
    Ok(downloaded)
}
