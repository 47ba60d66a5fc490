use anyhow::{bail, Context, Result};
use reqwest::blocking::Client;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Endpoint used when the caller does not override it.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:4000/api/shader";

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub endpoint: Url,
}

impl GeneratorConfig {
    pub fn new(endpoint: impl AsRef<str>) -> Result<Self> {
        let raw = endpoint.as_ref().trim();
        if raw.is_empty() {
            bail!("generator endpoint must not be empty");
        }
        Ok(Self {
            endpoint: Url::parse(raw)
                .with_context(|| format!("invalid generator endpoint '{raw}'"))?,
        })
    }
}

/// Blocking HTTP client for the remote shader-generation service.
///
/// One request per description: `POST {"description": ...}` answered by
/// `{"shader": ...}`. Every failure shape (connect error, non-2xx status,
/// malformed or empty reply) is reported as an error; the fallback policy
/// lives a layer up in [`crate::ShaderProvider`].
#[derive(Debug, Clone)]
pub struct GeneratorClient {
    http: Client,
    config: GeneratorConfig,
}

impl GeneratorClient {
    pub fn new(config: GeneratorConfig) -> Result<Self> {
        let http = Client::builder().build()?;
        Ok(Self { http, config })
    }

    pub fn endpoint(&self) -> &Url {
        &self.config.endpoint
    }

    pub fn generate(&self, description: &str) -> Result<String> {
        let url = self.config.endpoint.clone();
        debug!(%url, description, "requesting shader generation");
        let response = self
            .http
            .post(url.clone())
            .json(&GenerateRequest { description })
            .send()
            .with_context(|| format!("requesting {url}"))?
            .error_for_status()
            .context("shader generation service returned an error status")?;
        let body = response.text()?;
        parse_reply(&body)
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    description: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateReply {
    #[serde(default)]
    shader: String,
}

/// Decodes a generation reply, rejecting an absent or empty `shader` field as
/// a malformed response.
pub(crate) fn parse_reply(body: &str) -> Result<String> {
    match serde_json::from_str::<GenerateReply>(body) {
        Ok(reply) => {
            if reply.shader.trim().is_empty() {
                bail!("generation service reply has no usable 'shader' field");
            }
            Ok(reply.shader)
        }
        Err(_) => {
            let snippet = body.chars().take(200).collect::<String>();
            bail!("unexpected generation service response; expected a JSON object with a 'shader' field. First 200 bytes: {snippet}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wellformed_reply() {
        let shader = parse_reply(r#"{"shader": "void main() {}"}"#).unwrap();
        assert_eq!(shader, "void main() {}");
    }

    #[test]
    fn rejects_missing_shader_field() {
        let err = parse_reply(r#"{"status": "ok"}"#).unwrap_err();
        assert!(err.to_string().contains("no usable 'shader' field"));
    }

    #[test]
    fn rejects_empty_shader_field() {
        assert!(parse_reply(r#"{"shader": "   "}"#).is_err());
    }

    #[test]
    fn rejects_non_json_body() {
        let err = parse_reply("<html>502 Bad Gateway</html>").unwrap_err();
        assert!(err.to_string().contains("unexpected generation service response"));
    }

    #[test]
    fn config_rejects_empty_endpoint() {
        assert!(GeneratorConfig::new("   ").is_err());
    }

    #[test]
    fn config_parses_default_endpoint() {
        let config = GeneratorConfig::new(DEFAULT_ENDPOINT).unwrap();
        assert_eq!(config.endpoint.path(), "/api/shader");
    }
}
