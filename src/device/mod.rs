//! The graphics device seam.
//!
//! Everything the shader lifecycle needs from the GPU goes through
//! [`GraphicsDevice`]. All calls happen on the thread that owns the context.

#[cfg(feature = "gl")]
pub mod gl;
pub mod recording;

#[cfg(feature = "gl")]
pub use gl::GlowDevice;
pub use recording::RecordingDevice;

use crate::texture::TextureKind;
use crate::uniform::UniformValue;
use std::fmt;
use std::num::NonZeroU32;

/// Compiled stage object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StageId(pub NonZeroU32);

/// Linked program object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramId(pub NonZeroU32);

/// Uniform location inside a linked program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub u32);

/// Texture object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub NonZeroU32);

/// Programmable pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StageKind {
    Vertex,
    Geometry,
    Fragment,
}

impl StageKind {
    /// Stages in attach order.
    pub const ALL: [StageKind; 3] = [StageKind::Vertex, StageKind::Geometry, StageKind::Fragment];
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageKind::Vertex => write!(f, "vertex"),
            StageKind::Geometry => write!(f, "geometry"),
            StageKind::Fragment => write!(f, "fragment"),
        }
    }
}

/// Low-level GPU calls used by [`Shader`](crate::Shader).
///
/// Methods take `&self`: the device is shared between shaders of the same
/// context and GL state is global anyway.
pub trait GraphicsDevice {
    /// Raw `GL_SHADING_LANGUAGE_VERSION` string, empty if unavailable.
    fn shading_language_version(&self) -> String;
    fn has_extension(&self, name: &str) -> bool;

    fn create_stage(&self, kind: StageKind) -> Result<StageId, String>;
    /// Submits the source and compiles it. Returns the compile status.
    fn compile_stage(&self, stage: StageId, source: &str) -> bool;
    fn stage_info_log(&self, stage: StageId) -> String;
    fn delete_stage(&self, stage: StageId);

    fn create_program(&self) -> Result<ProgramId, String>;
    fn attach_stage(&self, program: ProgramId, stage: StageId);
    fn detach_stage(&self, program: ProgramId, stage: StageId);
    /// Links the program. Returns the link status.
    fn link_program(&self, program: ProgramId) -> bool;
    fn program_info_log(&self, program: ProgramId) -> String;
    fn delete_program(&self, program: ProgramId);
    fn use_program(&self, program: Option<ProgramId>);

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation>;
    fn attribute_location(&self, program: ProgramId, name: &str) -> Option<u32>;
    /// Uploads to the currently used program.
    fn upload_uniform(&self, location: UniformLocation, value: &UniformValue);
    /// Points a sampler uniform at a texture unit.
    fn upload_sampler(&self, location: UniformLocation, unit: u32);

    fn active_texture(&self, unit: u32);
    fn bind_texture(&self, kind: TextureKind, texture: Option<TextureId>);

    /// Pops the pending error flag, if any.
    fn take_error(&self) -> Option<u32>;
}
