//! Shader resources: load, reload, apply.

mod bind;
mod program;

pub use program::{ProgramState, ProgramStatus};

use crate::capabilities::GraphicsCapabilities;
use crate::config::ShaderConfig;
use crate::descriptor::ShaderDescriptor;
use crate::device::{GraphicsDevice, ProgramId, StageKind, UniformLocation};
use crate::error::{Result, ShaderError};
use crate::monitor::{self, ReloadMonitor};
use crate::params::ParameterStore;
use crate::preamble::Preamble;
use crate::texture::{TextureKind, TextureLoader, TextureRef};
use crate::uniform::UniformValue;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, info, warn};

/// A GLSL program built from stage files, with its uniforms and samplers.
///
/// Parameters can be set at any time. They are kept pending until the next
/// [`Shader::apply_shader`], which resolves them against the linked program.
/// Reloading keeps every parameter and only re-resolves locations.
///
/// The shader is tied to the thread owning the graphics context.
pub struct Shader<D: GraphicsDevice> {
    device: Rc<D>,
    caps: GraphicsCapabilities,
    config: ShaderConfig,
    resource: Option<PathBuf>,
    descriptor: ShaderDescriptor,
    params: ParameterStore,
    preamble: Preamble,
    state: Option<ProgramState>,
    status: ProgramStatus,
    loader: Option<Rc<dyn TextureLoader>>,
    monitor: Option<Box<dyn ReloadMonitor>>,
}

impl<D: GraphicsDevice> Shader<D> {
    /// A shader without a descriptor. Add stages with [`Shader::add_stage_file`].
    pub fn new(device: Rc<D>, caps: GraphicsCapabilities) -> Self {
        Self {
            device,
            caps,
            config: ShaderConfig::default(),
            resource: None,
            descriptor: ShaderDescriptor::new(),
            params: ParameterStore::new(),
            preamble: Preamble::new(),
            state: None,
            status: ProgramStatus::Unloaded,
            loader: None,
            monitor: None,
        }
    }

    /// A shader described by a descriptor file, polling it for changes
    /// with the default configuration.
    pub fn from_file(device: Rc<D>, caps: GraphicsCapabilities, path: impl Into<PathBuf>) -> Self {
        let mut shader = Self::new(device, caps);
        shader.resource = Some(path.into());
        shader.monitor = monitor::from_config(&shader.config);
        shader
    }

    /// Replaces the configuration and the monitor it selects.
    pub fn with_config(mut self, config: ShaderConfig) -> Self {
        self.monitor = monitor::from_config(&config);
        self.config = config;
        self
    }

    /// Overrides the change monitor.
    pub fn with_monitor(mut self, monitor: Box<dyn ReloadMonitor>) -> Self {
        self.monitor = Some(monitor);
        self
    }

    pub fn without_monitor(mut self) -> Self {
        self.monitor = None;
        self
    }

    /// Loader used for textures named in the descriptor.
    pub fn with_texture_loader(mut self, loader: Rc<dyn TextureLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn resource(&self) -> Option<&Path> {
        self.resource.as_deref()
    }

    pub fn descriptor(&self) -> &ShaderDescriptor {
        &self.descriptor
    }

    /// Adds a stage file for shaders built without a descriptor.
    /// Replaced on the next load if the shader has a descriptor.
    pub fn add_stage_file(&mut self, kind: StageKind, path: impl Into<PathBuf>) {
        self.descriptor.add_stage_file(kind, path);
    }

    pub fn status(&self) -> ProgramStatus {
        self.status
    }

    pub fn is_loaded(&self) -> bool {
        self.state.is_some()
    }

    pub fn program(&self) -> Option<ProgramId> {
        self.state.as_ref().map(ProgramState::program)
    }

    pub fn program_state(&self) -> Option<&ProgramState> {
        self.state.as_ref()
    }

    pub fn parameters(&self) -> &ParameterStore {
        &self.params
    }

    /// Parses the descriptor (if any), then compiles and links the program.
    ///
    /// All or nothing: on any error the shader is left unloaded. A no-op on
    /// platforms without a usable shading language.
    pub fn load(&mut self) -> Result<()> {
        if !self.caps.is_supported() {
            debug!("Shader model {} is not supported, not loading", self.caps.shader_model());
            return Ok(());
        }
        if self.state.is_some() {
            self.unload();
        }
        self.reset_properties();

        if let Some(path) = self.resource.clone() {
            info!("Loading shader from {:?}", path);
            let parsed = ShaderDescriptor::from_file(&path, &self.config);
            let watched = match &parsed {
                Ok(descriptor) => descriptor.watched_files(),
                Err(_) => {
                    let mut files = self.descriptor.watched_files();
                    if files.first() != Some(&path) {
                        files.insert(0, path.clone());
                    }
                    files
                }
            };
            self.rebaseline(&watched);
            let descriptor = parsed?;
            self.populate(&descriptor)?;
            self.descriptor = descriptor;
        } else {
            let watched = self.descriptor.watched_files();
            self.rebaseline(&watched);
        }

        if !self.descriptor.has_stages() {
            return Err(ShaderError::Config("No shaders specified".to_string()));
        }

        info!("Binding the shader program to the GPU");
        self.status = ProgramStatus::Compiling;
        let state = self.build_program().inspect_err(|_| {
            self.status = ProgramStatus::Unloaded;
        })?;
        self.state = Some(state);
        self.status = ProgramStatus::Loaded;
        Ok(())
    }

    fn rebaseline(&mut self, files: &[PathBuf]) {
        if let Some(monitor) = self.monitor.as_mut() {
            monitor.rebaseline(files);
        }
    }

    /// Registers the descriptor's textures and initial uniform values.
    fn populate(&mut self, descriptor: &ShaderDescriptor) -> Result<()> {
        for texture in descriptor.textures() {
            let Some(loader) = &self.loader else {
                warn!("No texture loader set, skipping texture {:?}", texture.name);
                continue;
            };
            let resource = loader
                .load(texture.kind, &texture.path)
                .map_err(|reason| ShaderError::Texture {
                    name: texture.name.clone(),
                    path: texture.path.clone(),
                    reason,
                })?;
            self.params.set_texture(&texture.name, texture.kind, resource);
        }
        for (name, value) in descriptor.uniforms() {
            self.params.set_uniform(name, *value);
        }
        Ok(())
    }

    fn build_program(&mut self) -> Result<ProgramState> {
        let device = &*self.device;
        let program = device.create_program().map_err(ShaderError::Device)?;
        let mut state = ProgramState {
            program,
            stages: Vec::new(),
            next_unit: self.params.next_free_unit(),
        };

        for kind in StageKind::ALL {
            let files = self.descriptor.stage_files(kind);
            if files.is_empty() {
                continue;
            }
            if !self.caps.supports_stage(kind) {
                warn!("{} shaders are not supported, skipping {:?}", kind, files);
                continue;
            }
            match program::compile_stage(device, &self.preamble, kind, files, self.config.log_info_logs) {
                Ok(stage) => {
                    device.attach_stage(program, stage);
                    state.stages.push((kind, stage));
                }
                Err(e) => {
                    state.destroy(device);
                    return Err(e);
                }
            }
        }

        if let Err(e) = program::link(device, &state, self.config.log_info_logs) {
            state.destroy(device);
            return Err(e);
        }
        self.status = ProgramStatus::Linked;
        Ok(state)
    }

    /// Deletes the program and its stages. Safe to call when unloaded.
    pub fn unload(&mut self) {
        if !self.caps.is_supported() {
            return;
        }
        if let Some(state) = self.state.take() {
            debug!("Unloading shader program {:?}", state.program);
            state.destroy(&*self.device);
        }
        self.status = ProgramStatus::Unloaded;
    }

    /// Moves every bound parameter back to pending and forgets locations.
    /// Samplers keep the texture unit they were first given.
    pub fn reset_properties(&mut self) {
        self.params.reset();
        if let Some(state) = self.state.as_mut() {
            state.next_unit = self.params.next_free_unit();
        }
    }

    /// Reloads if a watched file changed, activates the program, resolves
    /// pending parameters and binds textures.
    pub fn apply_shader(&mut self) -> Result<()> {
        if !self.caps.is_supported() {
            return Ok(());
        }
        self.check_reload()?;

        let device = &*self.device;
        let state = self.state.as_mut().ok_or(ShaderError::NotLoaded)?;
        device.use_program(Some(state.program));
        bind::resolve_uniforms(device, state.program, self.params.uniforms_mut())?;
        for kind in TextureKind::ALL {
            let (samplers, units) = self.params.sampler_units_mut(kind);
            bind::resolve_samplers(device, state.program, samplers, units, &mut state.next_unit)?;
        }
        bind::bind_textures(device, &self.params);
        Ok(())
    }

    fn check_reload(&mut self) -> Result<()> {
        let Some(monitor) = self.monitor.as_mut() else {
            return Ok(());
        };
        if monitor.needs_reload() {
            info!("Reloading shader {:?}", self.resource);
            self.release_shader();
            self.unload();
            self.load()?;
        }
        Ok(())
    }

    /// Deactivates the program.
    pub fn release_shader(&mut self) {
        if self.caps.is_supported() {
            self.device.use_program(None);
        }
    }

    /// Sets a uniform, resolved on the next apply.
    pub fn set_uniform(&mut self, name: &str, value: impl Into<UniformValue>) {
        self.params.set_uniform(name, value.into());
    }

    /// Sets a uniform and uploads it right away if the program is loaded.
    ///
    /// Leaves the program in use.
    pub fn set_uniform_forced(&mut self, name: &str, value: impl Into<UniformValue>) -> Result<()> {
        self.params.set_uniform(name, value.into());
        let device = &*self.device;
        let Some(state) = self.state.as_ref() else {
            return Ok(());
        };
        device.use_program(Some(state.program));
        bind::resolve_pending_uniform(device, state.program, self.params.uniforms_mut(), name)
    }

    /// Latest value set for `name`, pending or bound.
    pub fn uniform(&self, name: &str) -> Option<UniformValue> {
        self.params.uniform(name)
    }

    /// Sets a sampler's texture, resolved on the next apply.
    pub fn set_texture(&mut self, name: &str, kind: TextureKind, texture: TextureRef) {
        self.params.set_texture(name, kind, texture);
    }

    /// Sets a sampler's texture and wires it up right away if the program
    /// is loaded. The texture itself is bound on the next apply.
    pub fn set_texture_forced(&mut self, name: &str, kind: TextureKind, texture: TextureRef) -> Result<()> {
        self.params.set_texture(name, kind, texture);
        let device = &*self.device;
        let Some(state) = self.state.as_mut() else {
            return Ok(());
        };
        device.use_program(Some(state.program));
        let (samplers, units) = self.params.sampler_units_mut(kind);
        bind::resolve_pending_sampler(device, state.program, samplers, units, name, &mut state.next_unit)
    }

    pub fn texture(&self, name: &str, kind: TextureKind) -> Option<TextureRef> {
        self.params.texture(name, kind)
    }

    /// Every texture referenced by this shader.
    pub fn textures(&self) -> Vec<TextureRef> {
        self.params.textures()
    }

    /// Location of a uniform in the linked program.
    pub fn uniform_location(&self, name: &str) -> Result<UniformLocation> {
        let state = self.state.as_ref().ok_or(ShaderError::NotLoaded)?;
        if let Some(location) = self.params.uniforms().bound().get(name).and_then(|s| s.location) {
            return Ok(location);
        }
        self.device
            .uniform_location(state.program, name)
            .ok_or_else(|| ShaderError::UnknownUniform(name.to_string()))
    }

    pub fn attribute_location(&self, name: &str) -> Result<u32> {
        let state = self.state.as_ref().ok_or(ShaderError::NotLoaded)?;
        self.device
            .attribute_location(state.program, name)
            .ok_or_else(|| ShaderError::UnknownAttribute(name.to_string()))
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute_location(name).is_ok()
    }

    pub fn add_version(&mut self, version: &str) {
        self.preamble.add_version(version);
    }

    pub fn add_define(&mut self, name: &str) {
        self.preamble.add_define(name);
    }

    pub fn add_define_value(&mut self, name: &str, value: i32) {
        self.preamble.add_define_value(name, value);
    }

    pub fn clear_defines(&mut self) {
        self.preamble.clear();
    }

    pub fn preamble(&self) -> &Preamble {
        &self.preamble
    }

    pub fn capabilities(&self) -> &GraphicsCapabilities {
        &self.caps
    }

    pub fn shader_model(&self) -> u32 {
        self.caps.shader_model()
    }

    pub fn has_vertex_support(&self) -> bool {
        self.caps.has_vertex_support()
    }

    pub fn has_geometry_support(&self) -> bool {
        self.caps.has_geometry_support()
    }

    pub fn has_fragment_support(&self) -> bool {
        self.caps.has_fragment_support()
    }

    /// Dumps every uniform and sampler at debug level.
    pub fn log_parameters(&self) {
        let uniforms = self.params.uniforms();
        for (name, slot) in uniforms.bound() {
            debug!("uniform {} = {} (bound at {:?})", name, slot.value, slot.location);
        }
        for (name, slot) in uniforms.unbound() {
            debug!("uniform {} = {} (pending)", name, slot.value);
        }
        for kind in TextureKind::ALL {
            let samplers = self.params.samplers(kind);
            for (name, slot) in samplers.bound() {
                debug!("{} sampler {} -> unit {:?} ({:?})", kind, name, slot.unit, slot.texture);
            }
            for (name, slot) in samplers.unbound() {
                debug!("{} sampler {} pending ({:?})", kind, name, slot.texture);
            }
        }
    }
}

impl<D: GraphicsDevice> Drop for Shader<D> {
    fn drop(&mut self) {
        self.unload();
    }
}
