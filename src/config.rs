use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use url::Url;

use crate::inference::{DEFAULT_API_URL, DEFAULT_TIMEOUT_SECS, InferenceConfig};
use crate::url_validation::validate_http_url;

pub const DEFAULT_MAX_CONTENT_LENGTH: usize = 16 * 1024 * 1024;

/// Application configuration loaded from environment variables.
///
/// | Env Var                  | Default                                        |
/// |--------------------------|------------------------------------------------|
/// | `HOST`                   | `0.0.0.0`                                      |
/// | `PORT`                   | `5000`                                         |
/// | `DATABASE_URL`           | `sqlite://texttoimage.db`                      |
/// | `UPLOAD_DIR`             | `static/generated`                             |
/// | `MAX_CONTENT_LENGTH`     | `16777216`                                     |
/// | `HUGGINGFACE_API_KEY`    | unset                                          |
/// | `INFERENCE_API_URL`      | `https://api-inference.huggingface.co/models/` |
/// | `INFERENCE_TIMEOUT_SECS` | `60`                                           |
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub upload_dir: PathBuf,
    pub max_content_length: usize,
    pub inference: InferenceConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let host = non_empty_var("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_var("PORT", 5000u16)?;
        let database_url =
            non_empty_var("DATABASE_URL").unwrap_or_else(|| "sqlite://texttoimage.db".to_string());
        let upload_dir = non_empty_var("UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("static/generated"));
        let max_content_length = parse_var("MAX_CONTENT_LENGTH", DEFAULT_MAX_CONTENT_LENGTH)?;

        let api_key = non_empty_var("HUGGINGFACE_API_KEY");
        let raw_url =
            non_empty_var("INFERENCE_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let base_url: Url = validate_http_url(&raw_url)
            .with_context(|| format!("INFERENCE_API_URL is invalid: {raw_url}"))?;
        let timeout_secs = parse_var("INFERENCE_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;

        Ok(Self {
            host,
            port,
            database_url,
            upload_dir,
            max_content_length,
            inference: InferenceConfig {
                api_key,
                base_url,
                timeout: Duration::from_secs(timeout_secs),
            },
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match non_empty_var(name) {
        Some(value) => value
            .parse()
            .with_context(|| format!("{name} must be a valid number, got {value:?}")),
        None => Ok(default),
    }
}
