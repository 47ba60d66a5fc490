//! Combines the remote client and the fallback table into the provider the
//! view layer talks to.
//!
//! Precedence: one remote attempt, then the canned table, then failure. The
//! transport error from a failed remote attempt is carried on whichever path
//! follows it — inside [`ShaderOrigin::Fallback`] when a canned shader was
//! served, inside [`ProvideError::NoFallback`] when nothing matched — so the
//! caller can always show the raw failure next to whatever it renders.

use anyhow::{anyhow, Result};
use thiserror::Error;
use tracing::{debug, warn};

use crate::client::GeneratorClient;
use crate::fallback::FallbackTable;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShaderOrigin {
    Remote,
    Fallback { transport_error: String },
}

#[derive(Debug, Clone)]
pub struct GeneratedShader {
    pub source: String,
    pub origin: ShaderOrigin,
    /// Name of the fallback rule that matched, if any.
    pub rule: Option<String>,
}

#[derive(Debug, Error)]
pub enum ProvideError {
    #[error("shader generation failed ({transport_error}); no canned fallback matches the description")]
    NoFallback { transport_error: String },
}

#[derive(Debug, Clone)]
pub struct ShaderProvider {
    client: Option<GeneratorClient>,
    table: FallbackTable,
}

impl ShaderProvider {
    /// `client: None` disables the remote attempt entirely (offline mode);
    /// every request then goes straight to the fallback policy.
    pub fn new(client: Option<GeneratorClient>, table: FallbackTable) -> Self {
        Self { client, table }
    }

    pub fn provide(&self, description: &str) -> Result<GeneratedShader, ProvideError> {
        self.provide_with(description, |description| match &self.client {
            Some(client) => client.generate(description),
            None => Err(anyhow!("remote generation disabled")),
        })
    }

    /// Same policy with the remote call injected, so tests can force any
    /// transport outcome without a network.
    pub fn provide_with<F>(
        &self,
        description: &str,
        generate: F,
    ) -> Result<GeneratedShader, ProvideError>
    where
        F: FnOnce(&str) -> Result<String>,
    {
        match generate(description) {
            Ok(source) => {
                debug!(bytes = source.len(), "using remotely generated shader");
                Ok(GeneratedShader {
                    source,
                    origin: ShaderOrigin::Remote,
                    rule: None,
                })
            }
            Err(err) => {
                let transport_error = format!("{err:#}");
                match self.table.select(description) {
                    Some(rule) => {
                        warn!(
                            error = %transport_error,
                            rule = %rule.name,
                            "remote generation failed; serving canned shader"
                        );
                        Ok(GeneratedShader {
                            source: rule.source.clone(),
                            origin: ShaderOrigin::Fallback { transport_error },
                            rule: Some(rule.name.clone()),
                        })
                    }
                    None => {
                        warn!(error = %transport_error, "remote generation failed with no fallback match");
                        Err(ProvideError::NoFallback { transport_error })
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline_provider() -> ShaderProvider {
        ShaderProvider::new(None, FallbackTable::builtin())
    }

    #[test]
    fn remote_success_wins_over_fallback() {
        let provider = offline_provider();
        let shader = provider
            .provide_with("a blue background", |_| Ok("void main() {}".into()))
            .unwrap();
        assert_eq!(shader.origin, ShaderOrigin::Remote);
        assert_eq!(shader.source, "void main() {}");
        assert!(shader.rule.is_none());
    }

    #[test]
    fn transport_failure_serves_canned_blue_shader() {
        let provider = offline_provider();
        let shader = provider
            .provide_with("a blue background", |_| Err(anyhow!("connection refused")))
            .unwrap();
        assert!(shader.source.contains("vec4(0.0, 0.0, 1.0, 1.0)"));
        assert_eq!(shader.rule.as_deref(), Some("blue-fill"));
        match shader.origin {
            ShaderOrigin::Fallback { transport_error } => {
                assert!(transport_error.contains("connection refused"));
            }
            other => panic!("expected fallback origin, got {other:?}"),
        }
    }

    #[test]
    fn transport_failure_serves_canned_gradient_shader() {
        let provider = offline_provider();
        let shader = provider
            .provide_with("a gradient backdrop", |_| Err(anyhow!("HTTP 404")))
            .unwrap();
        assert_eq!(shader.rule.as_deref(), Some("gradient"));
        assert!(shader.source.contains("gl_FragCoord"));
    }

    #[test]
    fn unmatched_description_surfaces_transport_error() {
        let provider = offline_provider();
        let err = provider
            .provide_with("a shiny metal sphere", |_| Err(anyhow!("HTTP 503")))
            .unwrap_err();
        let ProvideError::NoFallback { transport_error } = err;
        assert!(transport_error.contains("HTTP 503"));
    }

    #[test]
    fn empty_description_matches_no_fallback() {
        let provider = offline_provider();
        assert!(provider
            .provide_with("", |_| Err(anyhow!("timed out")))
            .is_err());
    }

    #[test]
    fn offline_provider_never_calls_remote() {
        let provider = offline_provider();
        let shader = provider.provide("a blue background").unwrap();
        assert!(matches!(shader.origin, ShaderOrigin::Fallback { .. }));
    }
}
