//! Remote embedder: OpenAI-compatible `/embeddings` endpoint.
//!
//! Every call has a bounded timeout. 429 and 5xx responses are retried with
//! exponential backoff; anything else fails fast so the analyzer can degrade.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::embedding::{EmbedError, Embedder};

const MAX_RETRIES: u32 = 3;

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

#[derive(Clone)]
pub struct RemoteEmbedder {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
}

impl RemoteEmbedder {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        model: String,
        timeout: Duration,
    ) -> Result<Self, EmbedError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", base_url.trim_end_matches('/')),
            api_key,
            model,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Embedder for RemoteEmbedder {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request_body = EmbeddingRequest {
            model: &self.model,
            input: texts,
        };

        let mut last_error: Option<EmbedError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 250ms, 500ms
                let delay = Duration::from_millis(250 * (1 << (attempt - 1)));
                debug!(
                    "Embedding call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let mut request = self.client.post(&self.endpoint).json(&request_body);
            if let Some(key) = &self.api_key {
                request = request.bearer_auth(key);
            }

            let response = match request.send().await {
                Ok(r) => r,
                Err(e) if e.is_timeout() || e.is_connect() => {
                    last_error = Some(EmbedError::Http(e));
                    continue;
                }
                Err(e) => return Err(EmbedError::Http(e)),
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                debug!("Embedding API returned {}: {}", status, body);
                last_error = Some(retryable_error(status.as_u16(), body, attempt));
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<ApiError>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(EmbedError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let parsed: EmbeddingResponse = response.json().await?;
            let vectors = order_by_index(parsed.data, texts.len())?;

            debug!("Embedding call succeeded: inputs={}", texts.len());
            return Ok(vectors);
        }

        Err(last_error.unwrap_or(EmbedError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }
}

/// Error for a retryable status. `retries` is how many retries preceded this attempt.
fn retryable_error(status: u16, body: String, retries: u32) -> EmbedError {
    if status == 429 {
        EmbedError::RateLimited { retries }
    } else {
        EmbedError::Api {
            status,
            message: body,
        }
    }
}

/// Restores input order from the `index` field and checks the count.
fn order_by_index(mut data: Vec<EmbeddingData>, expected: usize) -> Result<Vec<Vec<f32>>, EmbedError> {
    if data.len() != expected {
        return Err(EmbedError::CountMismatch {
            expected,
            got: data.len(),
        });
    }
    data.sort_by_key(|d| d.index);
    Ok(data.into_iter().map(|d| d.embedding).collect())
}
