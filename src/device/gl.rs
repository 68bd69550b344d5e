//! [`GraphicsDevice`] over a `glow` OpenGL context.

use super::{GraphicsDevice, ProgramId, StageId, StageKind, TextureId, UniformLocation};
use crate::texture::TextureKind;
use crate::uniform::{ScalarType, UniformValue};
use glow::HasContext;

/// OpenGL device. The context must be current on the calling thread.
pub struct GlowDevice {
    gl: glow::Context,
}

impl GlowDevice {
    pub fn new(gl: glow::Context) -> Self {
        Self { gl }
    }

    pub fn context(&self) -> &glow::Context {
        &self.gl
    }
}

fn stage_type(kind: StageKind) -> u32 {
    match kind {
        StageKind::Vertex => glow::VERTEX_SHADER,
        StageKind::Geometry => glow::GEOMETRY_SHADER,
        StageKind::Fragment => glow::FRAGMENT_SHADER,
    }
}

fn texture_target(kind: TextureKind) -> u32 {
    match kind {
        TextureKind::Tex2D => glow::TEXTURE_2D,
        TextureKind::Tex3D => glow::TEXTURE_3D,
        TextureKind::Cubemap => glow::TEXTURE_CUBE_MAP,
    }
}

fn shader(stage: StageId) -> glow::NativeShader {
    glow::NativeShader(stage.0)
}

fn program(program: ProgramId) -> glow::NativeProgram {
    glow::NativeProgram(program.0)
}

impl GraphicsDevice for GlowDevice {
    fn shading_language_version(&self) -> String {
        unsafe { self.gl.get_parameter_string(glow::SHADING_LANGUAGE_VERSION) }
    }

    fn has_extension(&self, name: &str) -> bool {
        self.gl.supported_extensions().contains(name)
    }

    fn create_stage(&self, kind: StageKind) -> Result<StageId, String> {
        let shader = unsafe { self.gl.create_shader(stage_type(kind))? };
        Ok(StageId(shader.0))
    }

    fn compile_stage(&self, stage: StageId, source: &str) -> bool {
        unsafe {
            self.gl.shader_source(shader(stage), source);
            self.gl.compile_shader(shader(stage));
            self.gl.get_shader_compile_status(shader(stage))
        }
    }

    fn stage_info_log(&self, stage: StageId) -> String {
        unsafe { self.gl.get_shader_info_log(shader(stage)) }
    }

    fn delete_stage(&self, stage: StageId) {
        unsafe { self.gl.delete_shader(shader(stage)) }
    }

    fn create_program(&self) -> Result<ProgramId, String> {
        let program = unsafe { self.gl.create_program()? };
        Ok(ProgramId(program.0))
    }

    fn attach_stage(&self, prog: ProgramId, stage: StageId) {
        unsafe { self.gl.attach_shader(program(prog), shader(stage)) }
    }

    fn detach_stage(&self, prog: ProgramId, stage: StageId) {
        unsafe { self.gl.detach_shader(program(prog), shader(stage)) }
    }

    fn link_program(&self, prog: ProgramId) -> bool {
        unsafe {
            self.gl.link_program(program(prog));
            self.gl.get_program_link_status(program(prog))
        }
    }

    fn program_info_log(&self, prog: ProgramId) -> String {
        unsafe { self.gl.get_program_info_log(program(prog)) }
    }

    fn delete_program(&self, prog: ProgramId) {
        unsafe { self.gl.delete_program(program(prog)) }
    }

    fn use_program(&self, prog: Option<ProgramId>) {
        unsafe { self.gl.use_program(prog.map(program)) }
    }

    fn uniform_location(&self, prog: ProgramId, name: &str) -> Option<UniformLocation> {
        unsafe {
            self.gl
                .get_uniform_location(program(prog), name)
                .map(|loc| UniformLocation(loc.0))
        }
    }

    fn attribute_location(&self, prog: ProgramId, name: &str) -> Option<u32> {
        unsafe { self.gl.get_attrib_location(program(prog), name) }
    }

    fn upload_uniform(&self, location: UniformLocation, value: &UniformValue) {
        let loc = glow::NativeUniformLocation(location.0);
        let loc = Some(&loc);
        unsafe {
            match (value.scalar_type(), value) {
                (_, UniformValue::Mat4(m)) => self.gl.uniform_matrix_4_f32_slice(loc, false, m),
                (ScalarType::Float, _) => {
                    let v = value.as_floats();
                    match v.len() {
                        1 => self.gl.uniform_1_f32_slice(loc, v),
                        2 => self.gl.uniform_2_f32_slice(loc, v),
                        3 => self.gl.uniform_3_f32_slice(loc, v),
                        _ => self.gl.uniform_4_f32_slice(loc, v),
                    }
                }
                (ScalarType::Int | ScalarType::Bool, _) => {
                    let ints = value.as_ints();
                    let v = ints.as_slice();
                    match v.len() {
                        1 => self.gl.uniform_1_i32_slice(loc, v),
                        2 => self.gl.uniform_2_i32_slice(loc, v),
                        3 => self.gl.uniform_3_i32_slice(loc, v),
                        _ => self.gl.uniform_4_i32_slice(loc, v),
                    }
                }
            }
        }
    }

    fn upload_sampler(&self, location: UniformLocation, unit: u32) {
        let loc = glow::NativeUniformLocation(location.0);
        unsafe { self.gl.uniform_1_i32(Some(&loc), unit as i32) }
    }

    fn active_texture(&self, unit: u32) {
        unsafe { self.gl.active_texture(glow::TEXTURE0 + unit) }
    }

    fn bind_texture(&self, kind: TextureKind, texture: Option<TextureId>) {
        unsafe {
            self.gl
                .bind_texture(texture_target(kind), texture.map(|t| glow::NativeTexture(t.0)))
        }
    }

    fn take_error(&self) -> Option<u32> {
        match unsafe { self.gl.get_error() } {
            glow::NO_ERROR => None,
            code => Some(code),
        }
    }
}
