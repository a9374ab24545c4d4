
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use crate::cache::Document;
use crate::config::EmbeddingConfig;
use crate::{RagError, Result};

const MAX_ERROR_BODY_CHARS: usize = 512;

/// Client for an OpenAI-compatible `/embeddings` endpoint
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    base_url: Url,
    model: String,
    api_key: String,
    batch_size: usize,
    max_input_chars: usize,
    batch_delay: Duration,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingsResponse {
    pub data: Vec<EmbeddingData>,
    #[serde(default)]
    pub usage: UsageInfo,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingData {
    pub embedding: Vec<f32>,
    pub index: usize,
}

/// Token accounting reported by the API, logged and otherwise ignored
#[derive(Debug, Default, Deserialize)]
pub struct UsageInfo {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

impl OpenAiClient {
    #[inline]
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| RagError::Config(e.to_string()))?;
        let api_key = config
            .resolve_api_key()
            .map_err(|e| RagError::Config(e.to_string()))?;

        // Url::join replaces the final segment unless the base ends with a slash
        let mut base = config.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)
            .map_err(|e| RagError::Config(format!("Invalid embedding URL {}: {}", base, e)))?;

        Ok(Self {
            base_url,
            model: config.model.clone(),
            api_key,
            batch_size: config.batch_size as usize,
            max_input_chars: config.max_input_chars,
            batch_delay: Duration::from_millis(config.batch_delay_ms),
            agent: build_agent(Duration::from_secs(config.timeout_seconds)),
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = build_agent(timeout);
        self
    }

    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send one request to the embeddings endpoint.
    ///
    /// Inputs longer than the configured limit are cut down to their prefix.
    #[inline]
    pub fn create_embeddings(&self, inputs: &[String]) -> Result<EmbeddingsResponse> {
        let url = self
            .base_url
            .join("embeddings")
            .map_err(|e| RagError::Config(format!("Failed to build embeddings URL: {}", e)))?;

        let request = EmbeddingsRequest {
            model: &self.model,
            input: inputs
                .iter()
                .map(|text| truncate_input(text, self.max_input_chars))
                .collect(),
        };
        let request_json = serde_json::to_string(&request).map_err(|e| {
            RagError::Embedding(format!("Failed to serialize embedding request: {}", e))
        })?;

        debug!("Requesting {} embeddings from {}", inputs.len(), url);

        let mut response = self
            .agent
            .post(url.as_str())
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send(&request_json)
            .map_err(|e| RagError::Network {
                status: None,
                message: format!("Failed to send embedding request to {}: {}", url, e),
            })?;

        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| RagError::Network {
                status: Some(status),
                message: format!("Failed to read embedding response: {}", e),
            })?;

        if status != 200 {
            return Err(RagError::Network {
                status: Some(status),
                message: format!(
                    "Embedding API returned an error: {}",
                    body_snippet(&body)
                ),
            });
        }

        let parsed: EmbeddingsResponse = serde_json::from_str(&body).map_err(|e| {
            RagError::Embedding(format!("Failed to decode embedding response: {}", e))
        })?;

        debug!(
            "Embedding usage: {} prompt tokens, {} total tokens",
            parsed.usage.prompt_tokens, parsed.usage.total_tokens
        );

        Ok(parsed)
    }

    /// Embed a batch of texts, returning vectors in input order.
    ///
    /// Fails with [`RagError::InconsistentBatch`] when the vector count differs
    /// from the input count, and with [`RagError::InvalidBatchIndex`] when an
    /// index is out of range or repeated.
    #[inline]
    pub fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let response = self.create_embeddings(texts)?;
        order_by_index(response.data, texts.len())
    }

    /// Embed a single query string
    #[inline]
    pub fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_texts(&[text.to_string()])?;
        vectors.pop().ok_or(RagError::InconsistentBatch {
            expected: 1,
            actual: 0,
        })
    }

    /// Fill in the embedding of every document, one batch at a time.
    ///
    /// Batches are sent sequentially with a short pause between them. The
    /// first failing batch aborts the pass; documents embedded by earlier
    /// batches keep their vectors.
    #[inline]
    pub fn generate_document_embeddings(&self, documents: &mut [Document]) -> Result<()> {
        if documents.is_empty() {
            return Ok(());
        }

        let total = documents.len();
        let batch_count = total.div_ceil(self.batch_size);
        info!(
            "Generating embeddings for {} documents in {} batches",
            total, batch_count
        );

        let bar = if console::user_attended_stderr() {
            ProgressBar::new(total as u64).with_style(
                ProgressStyle::with_template("{spinner} [{pos}/{len}] Embedding {msg}")
                    .expect("style template is valid"),
            )
        } else {
            ProgressBar::hidden()
        };

        for (batch_index, batch) in documents.chunks_mut(self.batch_size).enumerate() {
            let start = batch_index * self.batch_size;
            debug!(
                "Embedding documents {}-{} of {}",
                start,
                start + batch.len(),
                total
            );
            if let Some(first) = batch.first() {
                bar.set_message(first.path.clone());
            }

            let texts: Vec<String> = batch.iter().map(|doc| doc.content.clone()).collect();
            let vectors = self.embed_texts(&texts).inspect_err(|_| bar.abandon())?;

            for (document, vector) in batch.iter_mut().zip(vectors) {
                document.embedding = vector;
            }
            bar.inc(batch.len() as u64);

            if batch_index + 1 < batch_count && !self.batch_delay.is_zero() {
                std::thread::sleep(self.batch_delay);
            }
        }

        bar.finish_and_clear();
        info!("Generated embeddings for {} documents", total);
        Ok(())
    }
}

fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build()
        .into()
}

/// Keep at most `max_chars` characters of `text`
pub(crate) fn truncate_input(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => text.get(..byte_index).unwrap_or(text).to_string(),
        None => text.to_string(),
    }
}

/// Place each returned vector at the position given by its `index`
fn order_by_index(data: Vec<EmbeddingData>, expected: usize) -> Result<Vec<Vec<f32>>> {
    if data.len() != expected {
        return Err(RagError::InconsistentBatch {
            expected,
            actual: data.len(),
        });
    }

    let mut slots: Vec<Option<Vec<f32>>> = vec![None; expected];
    for item in data {
        let index = item.index;
        let Some(slot) = slots.get_mut(index) else {
            return Err(RagError::InvalidBatchIndex { index, expected });
        };
        if slot.replace(item.embedding).is_some() {
            return Err(RagError::InvalidBatchIndex { index, expected });
        }
    }

    slots
        .into_iter()
        .enumerate()
        .map(|(index, slot)| slot.ok_or(RagError::InvalidBatchIndex { index, expected }))
        .collect()
}

pub(crate) fn body_snippet(body: &str) -> String {
    let trimmed = body.trim();
    let snippet = truncate_input(trimmed, MAX_ERROR_BODY_CHARS);
    if snippet.len() < trimmed.len() {
        format!("{}…", snippet)
    } else {
        snippet
    }
}
