//! Headless shader pipeline for the playground.
//!
//! The flow per update is deliberately flat:
//!
//! ```text
//!   fragment source text
//!          │ prepare_fragment_source()
//!          ▼
//!   naga GLSL front-end ──▶ CompileError { stage, log }
//!          │ ok
//!          ▼
//!   wgpu modules ─▶ pipeline ─▶ quad upload ─▶ clear + one draw ─▶ Rendered
//! ```
//!
//! [`RenderPipeline`] owns the GPU context for one fixed-size offscreen
//! surface and rebuilds every other object on each [`RenderPipeline::render`]
//! call, so a failed compile can never leave a half-built frame behind. The
//! last successful frame stays resident for pixel readback and PNG export.

mod compile;
mod context;
mod pipeline;

pub use compile::{prepare_fragment_source, validate_fragment_source, CompileStage};
pub use context::{ContextError, GpuContext};
pub use pipeline::{RenderOutcome, RenderPipeline, RendererConfig, DEFAULT_SURFACE_SIZE};
