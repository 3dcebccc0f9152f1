use anyhow::{Result, anyhow, bail};
use url::Url;

/// Parses `raw` as an absolute http(s) URL.
pub fn validate_http_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        bail!("url must not be empty");
    }
    let parsed = Url::parse(trimmed).map_err(|err| anyhow!("invalid url: {err}"))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(anyhow!("only http or https urls are allowed, got {scheme}")),
    }
}
