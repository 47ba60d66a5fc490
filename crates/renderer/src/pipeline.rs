use std::path::Path;

use anyhow::{Context, Result};
use bytemuck::{Pod, Zeroable};
use tracing::{debug, info, warn};
use wgpu::util::DeviceExt;

use crate::compile::{
    compile_fragment_shader, compile_vertex_shader, prepare_fragment_source,
    validate_fragment_source, CompileStage,
};
use crate::context::GpuContext;

/// Matches the reference surface: 400×400 logical pixels.
pub const DEFAULT_SURFACE_SIZE: (u32, u32) = (400, 400);

const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Offscreen target size in physical pixels.
    pub surface_size: (u32, u32),
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            surface_size: DEFAULT_SURFACE_SIZE,
        }
    }
}

/// Result of one render attempt. Failure variants carry everything the view
/// needs to display; nothing here propagates as a fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    Rendered,
    CompileError { stage: CompileStage, log: String },
    ContextUnavailable,
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct QuadVertex {
    position: [f32; 2],
}

const POSITION_ATTRIBUTES: [wgpu::VertexAttribute; 1] =
    wgpu::vertex_attr_array![0 => Float32x2];

/// Full-viewport quad, two triangles as a 4-vertex strip.
const QUAD_VERTICES: [QuadVertex; 4] = [
    QuadVertex { position: [-1.0, -1.0] },
    QuadVertex { position: [1.0, -1.0] },
    QuadVertex { position: [-1.0, 1.0] },
    QuadVertex { position: [1.0, 1.0] },
];

/// Compiles and draws one fragment shader at a time against an offscreen
/// surface.
///
/// The GPU context is the only cached resource; shader modules, pipeline,
/// vertex buffer, and target texture are recreated on every call and the
/// previous generation is dropped when the new frame replaces it. A failed
/// attempt leaves the last successful frame untouched.
pub struct RenderPipeline {
    config: RendererConfig,
    context: Option<GpuContext>,
    frame: Option<FrameTarget>,
    frames_rendered: u64,
}

struct FrameTarget {
    texture: wgpu::Texture,
}

impl RenderPipeline {
    pub fn new(config: RendererConfig) -> Self {
        Self {
            config,
            context: None,
            frame: None,
            frames_rendered: 0,
        }
    }

    pub fn surface_size(&self) -> (u32, u32) {
        self.config.surface_size
    }

    /// Count of successfully rendered frames; failures do not advance it.
    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    /// Runs the full compile-link-draw sequence for `fragment_source`.
    pub fn render(&mut self, fragment_source: &str) -> RenderOutcome {
        if let Err(err) = self.ensure_context() {
            warn!(error = %err, "graphics context unavailable");
            return RenderOutcome::ContextUnavailable;
        }
        let Some(context) = self.context.as_ref() else {
            return RenderOutcome::ContextUnavailable;
        };

        let prepared = prepare_fragment_source(fragment_source);
        if let Err(log) = validate_fragment_source(&prepared) {
            debug!(log_lines = log.lines().count(), "fragment shader rejected");
            return RenderOutcome::CompileError {
                stage: CompileStage::Fragment,
                log,
            };
        }

        match draw_frame(context, self.config.surface_size, &prepared) {
            Ok(target) => {
                // Dropping the previous frame here releases its texture.
                self.frame = Some(target);
                self.frames_rendered += 1;
                debug!(frames = self.frames_rendered, "rendered frame");
                RenderOutcome::Rendered
            }
            Err(outcome) => outcome,
        }
    }

    /// Reads the last rendered frame back as tightly packed RGBA8 rows.
    pub fn read_pixels(&self) -> Result<Vec<u8>> {
        let context = self
            .context
            .as_ref()
            .context("no graphics context; nothing has been rendered")?;
        let frame = self
            .frame
            .as_ref()
            .context("no frame has been rendered yet")?;
        read_target_pixels(context, &frame.texture, self.config.surface_size)
    }

    pub fn export_png(&self, path: &Path) -> Result<()> {
        let (width, height) = self.config.surface_size;
        let pixels = self.read_pixels()?;
        let image = image::RgbaImage::from_raw(width, height, pixels)
            .context("rendered frame has unexpected pixel count")?;
        image
            .save_with_format(path, image::ImageFormat::Png)
            .with_context(|| format!("failed to write PNG to {}", path.display()))?;
        info!(path = %path.display(), width, height, "exported rendered frame");
        Ok(())
    }

    fn ensure_context(&mut self) -> Result<(), crate::context::ContextError> {
        if self.context.is_none() {
            let context = GpuContext::acquire()?;
            info!("acquired headless GPU context");
            self.context = Some(context);
        }
        Ok(())
    }
}

/// Builds every per-frame object, records the clear + draw, and submits.
///
/// Objects created here that are not part of the returned frame drop on
/// every exit path, including the link-failure return.
fn draw_frame(
    context: &GpuContext,
    (width, height): (u32, u32),
    fragment_source: &str,
) -> Result<FrameTarget, RenderOutcome> {
    let device = &context.device;

    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let vertex_module = compile_vertex_shader(device);
    let fragment_module = compile_fragment_shader(device, fragment_source);
    if let Some(error) = pollster::block_on(device.pop_error_scope()) {
        return Err(RenderOutcome::CompileError {
            stage: CompileStage::Fragment,
            log: error.to_string(),
        });
    }

    let target = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("playground render target"),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: TARGET_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("playground pipeline layout"),
        bind_group_layouts: &[],
        push_constant_ranges: &[],
    });

    // Pipeline creation is the link stage: stage-interface mismatches only
    // surface here, not in the per-stage front-end pass.
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("playground pipeline"),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &vertex_module,
            entry_point: Some("main"),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<QuadVertex>() as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &POSITION_ATTRIBUTES,
            }],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleStrip,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            unclipped_depth: false,
            polygon_mode: wgpu::PolygonMode::Fill,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module: &fragment_module,
            entry_point: Some("main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: TARGET_FORMAT,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        multiview: None,
        cache: None,
    });
    if let Some(error) = pollster::block_on(device.pop_error_scope()) {
        return Err(RenderOutcome::CompileError {
            stage: CompileStage::Link,
            log: error.to_string(),
        });
    }

    let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("playground quad vertices"),
        contents: bytemuck::cast_slice(&QUAD_VERTICES),
        usage: wgpu::BufferUsages::VERTEX,
    });

    let view = target.create_view(&wgpu::TextureViewDescriptor::default());
    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("render encoder"),
    });
    {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("render pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        render_pass.set_pipeline(&pipeline);
        render_pass.set_vertex_buffer(0, vertex_buffer.slice(..));
        render_pass.draw(0..QUAD_VERTICES.len() as u32, 0..1);
    }
    context.queue.submit(std::iter::once(encoder.finish()));

    Ok(FrameTarget { texture: target })
}

fn read_target_pixels(
    context: &GpuContext,
    target: &wgpu::Texture,
    (width, height): (u32, u32),
) -> Result<Vec<u8>> {
    let unpadded_bytes_per_row = width * 4;
    let padded_bytes_per_row = unpadded_bytes_per_row
        .div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
        * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

    let readback = context.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("readback buffer"),
        size: u64::from(padded_bytes_per_row) * u64::from(height),
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = context
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("readback encoder"),
        });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture: target,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &readback,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded_bytes_per_row),
                rows_per_image: Some(height),
            },
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
    context.queue.submit(std::iter::once(encoder.finish()));

    let slice = readback.slice(..);
    let (sender, receiver) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = sender.send(result);
    });
    context
        .device
        .poll(wgpu::PollType::Wait)
        .context("failed to wait for readback")?;
    receiver
        .recv()
        .context("readback mapping callback dropped")?
        .context("failed to map readback buffer")?;

    let mapped = slice.get_mapped_range();
    let mut pixels = Vec::with_capacity((unpadded_bytes_per_row * height) as usize);
    for row in mapped.chunks(padded_bytes_per_row as usize) {
        pixels.extend_from_slice(&row[..unpadded_bytes_per_row as usize]);
    }
    drop(mapped);
    readback.unmap();
    Ok(pixels)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLUE_FILL: &str = r"#version 450
layout(location = 0) out vec4 out_color;

void main() {
    out_color = vec4(0.0, 0.0, 1.0, 1.0);
}
";

    fn headless_pipeline() -> RenderPipeline {
        RenderPipeline::new(RendererConfig::default())
    }

    /// Renders once, returning `None` when the environment has no adapter so
    /// device-dependent tests can degrade to a skip.
    fn render_or_skip(pipeline: &mut RenderPipeline, source: &str) -> Option<RenderOutcome> {
        match pipeline.render(source) {
            RenderOutcome::ContextUnavailable => {
                eprintln!("skipping: no GPU adapter in this environment");
                None
            }
            outcome => Some(outcome),
        }
    }

    #[test]
    fn renders_valid_fragment_shader() {
        let mut pipeline = headless_pipeline();
        let Some(outcome) = render_or_skip(&mut pipeline, BLUE_FILL) else {
            return;
        };
        assert_eq!(outcome, RenderOutcome::Rendered);
        assert_eq!(pipeline.frames_rendered(), 1);
    }

    #[test]
    fn repeated_renders_produce_the_same_outcome() {
        let mut pipeline = headless_pipeline();
        let Some(first) = render_or_skip(&mut pipeline, BLUE_FILL) else {
            return;
        };
        let second = pipeline.render(BLUE_FILL);
        assert_eq!(first, RenderOutcome::Rendered);
        assert_eq!(second, RenderOutcome::Rendered);
        assert_eq!(pipeline.frames_rendered(), 2);
    }

    #[test]
    fn invalid_fragment_reports_fragment_stage_with_log() {
        let mut pipeline = headless_pipeline();
        let Some(outcome) = render_or_skip(&mut pipeline, "not valid glsl !!!") else {
            return;
        };
        match outcome {
            RenderOutcome::CompileError { stage, log } => {
                assert_eq!(stage, CompileStage::Fragment);
                assert!(!log.is_empty());
            }
            other => panic!("expected a compile error, got {other:?}"),
        }
        assert_eq!(pipeline.frames_rendered(), 0);
    }

    #[test]
    fn failed_compile_leaves_previous_frame_standing() {
        let mut pipeline = headless_pipeline();
        if render_or_skip(&mut pipeline, BLUE_FILL).is_none() {
            return;
        }
        let outcome = pipeline.render("also not glsl @@");
        assert!(matches!(outcome, RenderOutcome::CompileError { .. }));
        assert_eq!(pipeline.frames_rendered(), 1);
        assert!(pipeline.read_pixels().is_ok());
    }

    #[test]
    fn blue_fill_reads_back_blue_pixels() {
        let mut pipeline = headless_pipeline();
        if render_or_skip(&mut pipeline, BLUE_FILL).is_none() {
            return;
        }
        let pixels = pipeline.read_pixels().expect("readback");
        let (width, height) = pipeline.surface_size();
        assert_eq!(pixels.len(), (width * height * 4) as usize);
        assert_eq!(&pixels[..4], &[0, 0, 255, 255]);
    }

    #[test]
    fn readback_without_a_frame_is_an_error() {
        let pipeline = headless_pipeline();
        assert!(pipeline.read_pixels().is_err());
    }
}
