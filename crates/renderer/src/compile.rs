use std::borrow::Cow;
use std::fmt;

use wgpu::naga;

/// Stage attribution for compile and link diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileStage {
    Vertex,
    Fragment,
    Link,
}

impl fmt::Display for CompileStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vertex => f.write_str("vertex"),
            Self::Fragment => f.write_str("fragment"),
            Self::Link => f.write_str("link"),
        }
    }
}

/// Fixed full-viewport vertex shader; user input never reaches this stage.
pub(crate) const VERTEX_SHADER_GLSL: &str = r"#version 450
layout(location = 0) in vec2 a_position;

void main() {
    gl_Position = vec4(a_position, 0.0, 1.0);
}
";

/// Normalizes untrusted fragment source before compilation.
///
/// Generated shaders frequently omit the `#version` directive the GLSL
/// front-end insists on; inject one when absent, pass the text through
/// untouched otherwise.
pub fn prepare_fragment_source(source: &str) -> Cow<'_, str> {
    let has_version = source
        .lines()
        .any(|line| line.trim_start().starts_with("#version"));
    if has_version {
        Cow::Borrowed(source)
    } else {
        Cow::Owned(format!("#version 450\n{source}"))
    }
}

/// Runs the naga GLSL front-end over fragment source without touching the GPU.
///
/// Parse and module validation both feed the same failure path; the returned
/// log is the front-end's rendered diagnostic and is never empty for a
/// rejected shader.
pub fn validate_fragment_source(source: &str) -> Result<(), String> {
    let mut frontend = naga::front::glsl::Frontend::default();
    let options = naga::front::glsl::Options::from(naga::ShaderStage::Fragment);
    let module = match frontend.parse(&options, source) {
        Ok(module) => module,
        Err(errors) => return Err(errors.emit_to_string(source)),
    };

    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    );
    match validator.validate(&module) {
        Ok(_) => Ok(()),
        Err(error) => Err(error.emit_to_string(source)),
    }
}

/// Compiles the fixed quad vertex shader.
pub(crate) fn compile_vertex_shader(device: &wgpu::Device) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("quad vertex"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(VERTEX_SHADER_GLSL),
            stage: naga::ShaderStage::Vertex,
            defines: &[],
        },
    })
}

/// Compiles prepared, front-end-validated fragment source.
pub(crate) fn compile_fragment_shader(device: &wgpu::Device, source: &str) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("playground fragment"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Owned(source.to_owned()),
            stage: naga::ShaderStage::Fragment,
            defines: &[],
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_FRAGMENT: &str = r"#version 450
layout(location = 0) out vec4 out_color;

void main() {
    out_color = vec4(0.25, 0.5, 0.75, 1.0);
}
";

    #[test]
    fn prepare_injects_missing_version_directive() {
        let prepared = prepare_fragment_source("void main() {}");
        assert!(prepared.starts_with("#version 450\n"));
    }

    #[test]
    fn prepare_keeps_existing_version_directive() {
        let prepared = prepare_fragment_source(VALID_FRAGMENT);
        assert_eq!(prepared.as_ref(), VALID_FRAGMENT);
    }

    #[test]
    fn accepts_valid_fragment_source() {
        assert!(validate_fragment_source(VALID_FRAGMENT).is_ok());
    }

    #[test]
    fn accepts_fragment_using_frag_coord() {
        let source = r"#version 450
layout(location = 0) out vec4 out_color;

void main() {
    vec2 uv = gl_FragCoord.xy / 400.0;
    out_color = vec4(uv.x, uv.y, 0.5, 1.0);
}
";
        assert!(validate_fragment_source(source).is_ok());
    }

    #[test]
    fn rejects_garbage_with_diagnostic_log() {
        let prepared = prepare_fragment_source("not valid glsl !!!");
        let log = validate_fragment_source(&prepared).unwrap_err();
        assert!(!log.is_empty());
    }

    #[test]
    fn vertex_shader_passes_its_own_front_end() {
        let mut frontend = naga::front::glsl::Frontend::default();
        let options = naga::front::glsl::Options::from(naga::ShaderStage::Vertex);
        assert!(frontend.parse(&options, VERTEX_SHADER_GLSL).is_ok());
    }

    #[test]
    fn stage_labels_match_reporting_convention() {
        assert_eq!(CompileStage::Fragment.to_string(), "fragment");
        assert_eq!(CompileStage::Link.to_string(), "link");
    }
}
