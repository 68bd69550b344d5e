//! Shading-language feature level of the graphics device.

use crate::device::{GraphicsDevice, StageKind};
use tracing::info;

/// Minimum shader model `Shader::load` accepts.
pub const MIN_SHADER_MODEL: u32 = 2;

/// What the driver supports, probed once per context and handed to every
/// shader created on it.
///
/// Shader models:
/// - 0: no GLSL at all
/// - 1: GLSL through the ARB shader object extensions only
/// - 2: GLSL 1.10 or newer
/// - 3: GLSL 1.30 or newer
/// - 4: GLSL 1.50 or newer (core geometry shaders)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphicsCapabilities {
    shader_model: u32,
    glsl_version: Option<(u32, u32)>,
    vertex: bool,
    geometry: bool,
    fragment: bool,
}

impl GraphicsCapabilities {
    pub fn new(shader_model: u32, vertex: bool, geometry: bool, fragment: bool) -> Self {
        Self {
            shader_model,
            glsl_version: None,
            vertex,
            geometry,
            fragment,
        }
    }

    /// A platform without any shading language. Shaders stay inert.
    pub fn unsupported() -> Self {
        Self::new(0, false, false, false)
    }

    /// Queries the driver's version string and extensions.
    pub fn probe(device: &impl GraphicsDevice) -> Self {
        let raw = device.shading_language_version();
        let glsl_version = parse_glsl_version(&raw);
        let numeric = glsl_version.map(|(major, minor)| major * 100 + minor).unwrap_or(0);

        let arb_objects = device.has_extension("GL_ARB_shader_objects");
        let shader_model = match numeric {
            n if n >= 150 => 4,
            n if n >= 130 => 3,
            n if n >= 110 => 2,
            _ if arb_objects => 1,
            _ => 0,
        };

        let vertex = numeric >= 110 || (arb_objects && device.has_extension("GL_ARB_vertex_shader"));
        let fragment = numeric >= 110 || (arb_objects && device.has_extension("GL_ARB_fragment_shader"));
        let geometry = numeric >= 150
            || device.has_extension("GL_ARB_geometry_shader4")
            || device.has_extension("GL_EXT_geometry_shader4");

        info!(
            "GLSL version {:?} -> shader model {} (vertex: {}, geometry: {}, fragment: {})",
            raw, shader_model, vertex, geometry, fragment
        );

        Self {
            shader_model,
            glsl_version,
            vertex,
            geometry,
            fragment,
        }
    }

    pub fn shader_model(&self) -> u32 {
        self.shader_model
    }

    /// Parsed `(major, minor)` version, minor normalised to two digits.
    pub fn glsl_version(&self) -> Option<(u32, u32)> {
        self.glsl_version
    }

    pub fn has_vertex_support(&self) -> bool {
        self.vertex
    }

    pub fn has_geometry_support(&self) -> bool {
        self.geometry
    }

    pub fn has_fragment_support(&self) -> bool {
        self.fragment
    }

    pub fn supports_stage(&self, kind: StageKind) -> bool {
        match kind {
            StageKind::Vertex => self.vertex,
            StageKind::Geometry => self.geometry,
            StageKind::Fragment => self.fragment,
        }
    }

    /// Whether shaders can be loaded at all.
    pub fn is_supported(&self) -> bool {
        self.shader_model >= MIN_SHADER_MODEL
    }
}

/// Extracts `major.minor` from strings like `"4.60 NVIDIA"`,
/// `"1.20"` or `"OpenGL ES GLSL ES 3.00"`.
pub fn parse_glsl_version(raw: &str) -> Option<(u32, u32)> {
    raw.split_whitespace().find_map(|token| {
        let (major, rest) = token.split_once('.')?;
        let minor: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
        let major = major.parse::<u32>().ok()?;
        let value = minor.parse::<u32>().ok()?;
        let minor = if minor.len() == 1 { value * 10 } else { value };
        Some((major, minor))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::RecordingDevice;

    #[test]
    fn test_parse_version_strings() {
        assert_eq!(parse_glsl_version("4.60 NVIDIA"), Some((4, 60)));
        assert_eq!(parse_glsl_version("1.20"), Some((1, 20)));
        assert_eq!(parse_glsl_version("OpenGL ES GLSL ES 3.00"), Some((3, 0)));
        assert_eq!(parse_glsl_version("1.5"), Some((1, 50)));
        assert_eq!(parse_glsl_version(""), None);
        assert_eq!(parse_glsl_version("unknown"), None);
    }

    #[test]
    fn test_detect_modern_driver() {
        let caps = GraphicsCapabilities::probe(&RecordingDevice::with_version("4.50 core"));
        assert_eq!(caps.shader_model(), 4);
        assert!(caps.has_vertex_support() && caps.has_geometry_support() && caps.has_fragment_support());
        assert!(caps.is_supported());
    }

    #[test]
    fn test_detect_glsl_120_needs_extension_for_geometry() {
        let plain = GraphicsCapabilities::probe(&RecordingDevice::with_version("1.20"));
        assert_eq!(plain.shader_model(), 2);
        assert!(!plain.has_geometry_support());

        let ext = GraphicsCapabilities::probe(
            &RecordingDevice::with_version("1.20").with_extension("GL_EXT_geometry_shader4"),
        );
        assert!(ext.has_geometry_support());
    }

    #[test]
    fn test_detect_arb_only_is_not_loadable() {
        let device = RecordingDevice::with_version("")
            .with_extension("GL_ARB_shader_objects")
            .with_extension("GL_ARB_vertex_shader")
            .with_extension("GL_ARB_fragment_shader");
        let caps = GraphicsCapabilities::probe(&device);
        assert_eq!(caps.shader_model(), 1);
        assert!(caps.has_vertex_support());
        assert!(!caps.is_supported());
    }
}
