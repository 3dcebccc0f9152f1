//! Client for the hosted text-to-image inference API.
//!
//! One attempt is a single `POST {base_url}/{model}`. A 404 for the requested
//! model triggers a sequential walk over [`FALLBACK_MODELS`]; every other
//! outcome is terminal for the call.

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::{Client, StatusCode, header::CONTENT_TYPE};
use serde::Deserialize;
use serde_json::json;
use url::Url;

use crate::image_processing;

pub const DEFAULT_API_URL: &str = "https://api-inference.huggingface.co/models/";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// A 200 body larger than this is treated as image data even without an
/// `image/*` content type.
pub const MIN_IMAGE_BYTES: usize = 1024;

/// Tried in order when the requested model is rejected with 404.
pub const FALLBACK_MODELS: &[&str] = &[
    "stabilityai/stable-diffusion-xl-base-1.0",
    "runwayml/stable-diffusion-v1-5",
    "CompVis/stable-diffusion-v1-4",
    "stabilityai/stable-diffusion-2-1",
];

const PROMPT_LOG_CHARS: usize = 100;

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("Missing API key. Set HUGGINGFACE_API_KEY to enable image generation.")]
    MissingCredential,

    #[error("Model is currently loading. Please try again in a few moments.")]
    ModelLoading,

    #[error("Rate limit exceeded. Please wait before making another request.")]
    RateLimited,

    #[error("Invalid API key. Please check your Hugging Face API key.")]
    InvalidCredential,

    #[error("Model {0} was not found")]
    ModelNotFound(String),

    #[error("Model {0} is not available and no fallback model succeeded")]
    ModelUnavailable(String),

    #[error("API Error: {0}")]
    Api(String),

    #[error("Unexpected response from API")]
    UnexpectedResponse,

    #[error("API request failed with status {0}")]
    Status(u16),

    #[error("Request timed out. The model might be busy, please try again.")]
    Timeout,

    #[error("Connection error. Please check your internet connection.")]
    Connection,

    #[error("Unexpected error: {0}")]
    Request(reqwest::Error),

    #[error("Invalid inference endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Invalid model id: {0:?}")]
    InvalidModel(String),

    #[error("Failed to write generated image: {0}")]
    Io(#[from] std::io::Error),

    #[error("Error processing generated image: {0}")]
    Processing(String),
}

impl From<reqwest::Error> for InferenceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            InferenceError::Timeout
        } else if err.is_connect() {
            InferenceError::Connection
        } else {
            InferenceError::Request(err)
        }
    }
}

/// Successful outcome of [`InferenceClient::generate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub model_used: String,
    pub fallback: bool,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct InferenceConfig {
    pub api_key: Option<String>,
    pub base_url: Url,
    pub timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<serde_json::Value>,
}

pub struct InferenceClient {
    client: Client,
    api_key: Option<String>,
    base_url: Url,
}

impl InferenceClient {
    pub fn new(config: InferenceConfig) -> Result<Self, InferenceError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        let api_key = config.api_key.filter(|key| !key.trim().is_empty());
        Ok(Self {
            client,
            api_key,
            base_url: config.base_url,
        })
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    /// Produces a normalized RGB PNG at `output` for `prompt` using `model`,
    /// falling back through [`FALLBACK_MODELS`] when `model` is unknown
    /// upstream.
    pub async fn generate(
        &self,
        prompt: &str,
        model: &str,
        output: &Path,
    ) -> Result<Generation, InferenceError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(InferenceError::MissingCredential)?;

        match self.attempt(api_key, prompt, model, output).await {
            Ok(()) => Ok(Generation {
                model_used: model.to_string(),
                fallback: false,
                message: "Image generated successfully".to_string(),
            }),
            Err(InferenceError::ModelNotFound(_)) => {
                tracing::warn!(model, "model not found upstream, trying fallback models");
                self.generate_with_fallback(api_key, prompt, model, output)
                    .await
            }
            Err(err) => Err(err),
        }
    }

    async fn generate_with_fallback(
        &self,
        api_key: &str,
        prompt: &str,
        requested: &str,
        output: &Path,
    ) -> Result<Generation, InferenceError> {
        for candidate in FALLBACK_MODELS.iter().copied().filter(|id| *id != requested) {
            tracing::info!(requested, fallback = candidate, "trying fallback model");
            match self.attempt(api_key, prompt, candidate, output).await {
                Ok(()) => {
                    return Ok(Generation {
                        model_used: candidate.to_string(),
                        fallback: true,
                        message: format!(
                            "Image generated successfully using fallback model {candidate}"
                        ),
                    });
                }
                Err(err) => {
                    tracing::warn!(fallback = candidate, error = %err, "fallback model failed");
                }
            }
        }
        Err(InferenceError::ModelUnavailable(requested.to_string()))
    }

    async fn attempt(
        &self,
        api_key: &str,
        prompt: &str,
        model: &str,
        output: &Path,
    ) -> Result<(), InferenceError> {
        let endpoint = self.model_url(model)?;
        let prompt_preview: String = prompt.chars().take(PROMPT_LOG_CHARS).collect();
        tracing::info!(model, prompt = %prompt_preview, "generating image");

        let response = self
            .client
            .post(endpoint)
            .bearer_auth(api_key)
            .json(&json!({
                "inputs": prompt,
                "parameters": {
                    "num_inference_steps": 50,
                    "guidance_scale": 7.5,
                    "width": 512,
                    "height": 512
                }
            }))
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::SERVICE_UNAVAILABLE => return Err(InferenceError::ModelLoading),
            StatusCode::TOO_MANY_REQUESTS => return Err(InferenceError::RateLimited),
            StatusCode::UNAUTHORIZED => return Err(InferenceError::InvalidCredential),
            StatusCode::NOT_FOUND => return Err(InferenceError::ModelNotFound(model.to_string())),
            status => {
                let text = response.text().await.unwrap_or_default();
                tracing::error!(%status, body = %text, "inference request failed");
                return Err(InferenceError::Status(status.as_u16()));
            }
        }

        let is_image_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("image/"));
        let bytes = response.bytes().await?;

        if !is_image_type && bytes.len() <= MIN_IMAGE_BYTES {
            return Err(classify_non_image_body(&bytes));
        }

        tokio::fs::write(output, &bytes).await?;
        normalize(output.to_path_buf()).await?;
        tracing::info!(model, path = %output.display(), "image saved");
        Ok(())
    }

    /// Each `/`-separated part of the id becomes one path segment. Ids with
    /// empty, `.` or `..` parts are rejected rather than normalized away.
    fn model_url(&self, model: &str) -> Result<Url, InferenceError> {
        let segments: Vec<&str> = model.split('/').collect();
        if segments
            .iter()
            .any(|segment| segment.is_empty() || *segment == "." || *segment == "..")
        {
            return Err(InferenceError::InvalidModel(model.to_string()));
        }

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| InferenceError::InvalidEndpoint(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

fn classify_non_image_body(bytes: &[u8]) -> InferenceError {
    match serde_json::from_slice::<ApiErrorBody>(bytes) {
        Ok(body) => {
            let message = match body.error {
                Some(serde_json::Value::String(message)) => message,
                Some(other) => other.to_string(),
                None => "Unknown error from API".to_string(),
            };
            tracing::error!(error = %message, "API returned error");
            InferenceError::Api(message)
        }
        Err(_) => {
            let preview: String = String::from_utf8_lossy(bytes).chars().take(200).collect();
            tracing::error!(body = %preview, "unexpected response format");
            InferenceError::UnexpectedResponse
        }
    }
}

async fn normalize(path: PathBuf) -> Result<(), InferenceError> {
    tokio::task::spawn_blocking(move || image_processing::normalize_to_rgb_png(&path))
        .await
        .map_err(|err| InferenceError::Processing(err.to_string()))?
        .map_err(|err| InferenceError::Processing(err.to_string()))
}
