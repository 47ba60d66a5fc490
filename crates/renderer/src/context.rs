use thiserror::Error;
use tracing::debug;

/// Why the graphics context could not be brought up.
///
/// Both variants are blocking for the session; the pipeline reports them to
/// callers as `RenderOutcome::ContextUnavailable` and does not retry on its
/// own.
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("no suitable GPU adapter available: {0}")]
    AdapterUnavailable(String),

    #[error("failed to create GPU device: {0}")]
    DeviceRequest(String),
}

/// Device and queue for headless rendering.
#[derive(Debug)]
pub struct GpuContext {
    pub(crate) device: wgpu::Device,
    pub(crate) queue: wgpu::Queue,
}

impl GpuContext {
    pub fn acquire() -> Result<Self, ContextError> {
        let instance = wgpu::Instance::default();
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|err| ContextError::AdapterUnavailable(err.to_string()))?;

        debug!(adapter = ?adapter.get_info(), "acquired GPU adapter");

        let descriptor = wgpu::DeviceDescriptor {
            label: Some("shaderdesk device"),
            required_features: wgpu::Features::empty(),
            required_limits: adapter.limits(),
            memory_hints: wgpu::MemoryHints::default(),
            trace: wgpu::Trace::default(),
        };
        let (device, queue) = pollster::block_on(adapter.request_device(&descriptor))
            .map_err(|err| ContextError::DeviceRequest(err.to_string()))?;

        Ok(Self { device, queue })
    }
}
