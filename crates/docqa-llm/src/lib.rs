//! Generator backed by a local Ollama server.
//!
//! Only `POST {endpoint}/api/generate` with `stream=false` is used. In
//! deterministic mode sampling is disabled (`temperature=0`, `top_k=1`) and
//! the seed is pinned so repeated prompts produce the same text.

use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

use docqa_core::config::LlmSettings;
use docqa_core::traits::{GenerationParams, Generator};

const FIXED_SEED: u64 = 42;

#[derive(Debug, Error)]
pub enum LlmError {
    /// Empty endpoint or one without an http/https scheme.
    #[error("invalid Ollama endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}: {snippet}")]
    HttpStatus { status: StatusCode, url: String, snippet: String },

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("model returned an empty response")]
    EmptyResponse,
}

pub type Result<T> = std::result::Result<T, LlmError>;

pub struct OllamaGenerator {
    client: reqwest::blocking::Client,
    model: String,
    url_generate: String,
}

impl OllamaGenerator {
    pub fn new(settings: &LlmSettings) -> Result<Self> {
        let base = validate_endpoint(&settings.endpoint)?;
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs.max(1)))
            .build()?;
        Ok(Self { client, model: settings.model.clone(), url_generate: format!("{base}/api/generate") })
    }

    #[instrument(skip_all, fields(model = %self.model))]
    fn request(&self, prompt: &str, params: &GenerationParams) -> Result<String> {
        let body = GenerateRequest::new(&self.model, prompt, params);

        debug!("POST {}", self.url_generate);
        let resp = self.client.post(&self.url_generate).json(&body).send()?;

        if !resp.status().is_success() {
            let status = resp.status();
            let snippet = resp.text().unwrap_or_default().chars().take(240).collect();
            return Err(LlmError::HttpStatus { status, url: self.url_generate.clone(), snippet });
        }

        let out: GenerateResponse = resp
            .json()
            .map_err(|e| LlmError::Decode(format!("{e}; ensure `stream=false` is used")))?;
        let text = out.response.trim();
        if text.is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(text.to_string())
    }
}

impl Generator for OllamaGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn generate(&self, prompt: &str, params: &GenerationParams) -> anyhow::Result<String> {
        Ok(self.request(prompt, params)?)
    }
}

/// Trimmed base URL without a trailing slash.
fn validate_endpoint(endpoint: &str) -> Result<String> {
    let trimmed = endpoint.trim();
    if trimmed.is_empty() || !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(LlmError::InvalidEndpoint(endpoint.to_string()));
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

impl<'a> GenerateRequest<'a> {
    fn new(model: &'a str, prompt: &'a str, params: &GenerationParams) -> Self {
        let options = if params.deterministic {
            GenerateOptions {
                temperature: Some(0.0),
                top_k: Some(1),
                seed: Some(FIXED_SEED),
                num_predict: params.max_length,
            }
        } else {
            GenerateOptions { num_predict: params.max_length, ..GenerateOptions::default() }
        };
        Self { model, prompt, stream: false, options }
    }
}

/// Subset of Ollama `options`.
#[derive(Debug, Default, Serialize)]
struct GenerateOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
    num_predict: usize,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}
