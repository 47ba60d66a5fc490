//! Shader source acquisition for the playground's text-to-shader panel.
//!
//! A description travels through two layers: [`GeneratorClient`] performs the
//! single remote generation request, and [`ShaderProvider`] wraps it with the
//! deterministic fallback policy — on any transport failure the description
//! is matched against a canned-shader table, and only when that also comes up
//! empty does the caller see an error. Callers always learn the shader's
//! [`ShaderOrigin`] so a fallback can be reported alongside the source.

mod client;
mod fallback;
mod provider;

pub use client::{GeneratorClient, GeneratorConfig, DEFAULT_ENDPOINT};
pub use fallback::{FallbackRule, FallbackTable};
pub use provider::{GeneratedShader, ProvideError, ShaderOrigin, ShaderProvider};
