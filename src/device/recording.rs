//! In-memory device that records every call.
//!
//! Used by the test suites and handy for exercising shader code without a
//! GL context. Compilation fails for any source containing `#error`, which is
//! also what a real GLSL compiler does.

use super::{GraphicsDevice, ProgramId, StageId, StageKind, TextureId, UniformLocation};
use crate::texture::TextureKind;
use crate::uniform::UniformValue;
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::num::NonZeroU32;

/// A recorded device call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateStage(StageKind, StageId),
    CompileStage(StageId, String),
    DeleteStage(StageId),
    CreateProgram(ProgramId),
    AttachStage(ProgramId, StageId),
    DetachStage(ProgramId, StageId),
    LinkProgram(ProgramId),
    DeleteProgram(ProgramId),
    UseProgram(Option<ProgramId>),
    UniformLocation(ProgramId, String),
    UploadUniform(UniformLocation, UniformValue),
    UploadSampler(UniformLocation, u32),
    ActiveTexture(u32),
    BindTexture(TextureKind, Option<TextureId>),
}

#[derive(Debug, Default)]
struct State {
    calls: Vec<Call>,
    stages: BTreeMap<StageId, StageKind>,
    programs: BTreeSet<ProgramId>,
    uniforms: Vec<String>,
    attributes: Vec<String>,
    extensions: BTreeSet<String>,
}

/// Fake [`GraphicsDevice`].
#[derive(Debug)]
pub struct RecordingDevice {
    version: String,
    next_id: Cell<u32>,
    fail_link: Cell<bool>,
    pending_error: Cell<Option<u32>>,
    state: RefCell<State>,
}

impl Default for RecordingDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingDevice {
    /// A GLSL 4.50 device with no known uniforms.
    pub fn new() -> Self {
        Self::with_version("4.50 NVIDIA")
    }

    pub fn with_version(version: &str) -> Self {
        Self {
            version: version.to_string(),
            next_id: Cell::new(1),
            fail_link: Cell::new(false),
            pending_error: Cell::new(None),
            state: RefCell::new(State::default()),
        }
    }

    /// Names every linked program reports as active uniforms.
    /// Locations are assigned in the given order.
    pub fn with_uniforms(self, names: &[&str]) -> Self {
        self.state.borrow_mut().uniforms = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn with_attributes(self, names: &[&str]) -> Self {
        self.state.borrow_mut().attributes = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn with_extension(self, name: &str) -> Self {
        self.state.borrow_mut().extensions.insert(name.to_string());
        self
    }

    /// Adds an active uniform, as if the shader source had been edited.
    pub fn define_uniform(&self, name: &str) {
        let mut state = self.state.borrow_mut();
        if !state.uniforms.iter().any(|n| n == name) {
            state.uniforms.push(name.to_string());
        }
    }

    /// Makes every following link fail.
    pub fn set_link_failure(&self, fail: bool) {
        self.fail_link.set(fail);
    }

    /// Raises an error flag returned by the next [`GraphicsDevice::take_error`].
    pub fn raise_error(&self, code: u32) {
        self.pending_error.set(Some(code));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.borrow().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.state.borrow().calls.iter().filter(|c| pred(c)).count()
    }

    /// Sources submitted for compilation, in order.
    pub fn compiled_sources(&self) -> Vec<String> {
        self.state
            .borrow()
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::CompileStage(_, source) => Some(source.clone()),
                _ => None,
            })
            .collect()
    }

    /// Stage objects created and not yet deleted.
    pub fn live_stages(&self) -> usize {
        self.state.borrow().stages.len()
    }

    /// Program objects created and not yet deleted.
    pub fn live_programs(&self) -> usize {
        self.state.borrow().programs.len()
    }

    fn next(&self) -> NonZeroU32 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        NonZeroU32::new(id).unwrap_or(NonZeroU32::MIN)
    }

    fn record(&self, call: Call) {
        self.state.borrow_mut().calls.push(call);
    }
}

impl GraphicsDevice for RecordingDevice {
    fn shading_language_version(&self) -> String {
        self.version.clone()
    }

    fn has_extension(&self, name: &str) -> bool {
        self.state.borrow().extensions.contains(name)
    }

    fn create_stage(&self, kind: StageKind) -> Result<StageId, String> {
        let id = StageId(self.next());
        self.state.borrow_mut().stages.insert(id, kind);
        self.record(Call::CreateStage(kind, id));
        Ok(id)
    }

    fn compile_stage(&self, stage: StageId, source: &str) -> bool {
        self.record(Call::CompileStage(stage, source.to_string()));
        !source.contains("#error")
    }

    fn stage_info_log(&self, stage: StageId) -> String {
        let state = self.state.borrow();
        let source = state.calls.iter().rev().find_map(|c| match c {
            Call::CompileStage(id, source) if *id == stage => Some(source),
            _ => None,
        });
        match source.and_then(|s| s.lines().position(|l| l.trim_start().starts_with("#error"))) {
            Some(line) => format!("0:{}: error: #error directive", line + 1),
            None => String::new(),
        }
    }

    fn delete_stage(&self, stage: StageId) {
        self.state.borrow_mut().stages.remove(&stage);
        self.record(Call::DeleteStage(stage));
    }

    fn create_program(&self) -> Result<ProgramId, String> {
        let id = ProgramId(self.next());
        self.state.borrow_mut().programs.insert(id);
        self.record(Call::CreateProgram(id));
        Ok(id)
    }

    fn attach_stage(&self, program: ProgramId, stage: StageId) {
        self.record(Call::AttachStage(program, stage));
    }

    fn detach_stage(&self, program: ProgramId, stage: StageId) {
        self.record(Call::DetachStage(program, stage));
    }

    fn link_program(&self, program: ProgramId) -> bool {
        self.record(Call::LinkProgram(program));
        !self.fail_link.get()
    }

    fn program_info_log(&self, _program: ProgramId) -> String {
        if self.fail_link.get() {
            "error: vertex output not consumed by fragment stage".to_string()
        } else {
            String::new()
        }
    }

    fn delete_program(&self, program: ProgramId) {
        self.state.borrow_mut().programs.remove(&program);
        self.record(Call::DeleteProgram(program));
    }

    fn use_program(&self, program: Option<ProgramId>) {
        self.record(Call::UseProgram(program));
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        self.record(Call::UniformLocation(program, name.to_string()));
        self.state
            .borrow()
            .uniforms
            .iter()
            .position(|n| n == name)
            .map(|i| UniformLocation(i as u32))
    }

    fn attribute_location(&self, _program: ProgramId, name: &str) -> Option<u32> {
        self.state
            .borrow()
            .attributes
            .iter()
            .position(|n| n == name)
            .map(|i| i as u32)
    }

    fn upload_uniform(&self, location: UniformLocation, value: &UniformValue) {
        self.record(Call::UploadUniform(location, *value));
    }

    fn upload_sampler(&self, location: UniformLocation, unit: u32) {
        self.record(Call::UploadSampler(location, unit));
    }

    fn active_texture(&self, unit: u32) {
        self.record(Call::ActiveTexture(unit));
    }

    fn bind_texture(&self, kind: TextureKind, texture: Option<TextureId>) {
        self.record(Call::BindTexture(kind, texture));
    }

    fn take_error(&self) -> Option<u32> {
        self.pending_error.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_fails_on_error_directive() {
        let device = RecordingDevice::new();
        let stage = device.create_stage(StageKind::Fragment).unwrap();
        assert!(device.compile_stage(stage, "void main() {}"));
        assert!(!device.compile_stage(stage, "void main() {}\n#error nope\n"));
        assert_eq!(device.stage_info_log(stage), "0:2: error: #error directive");
    }

    #[test]
    fn test_tracks_live_objects() {
        let device = RecordingDevice::new();
        let program = device.create_program().unwrap();
        let stage = device.create_stage(StageKind::Vertex).unwrap();
        assert_eq!((device.live_programs(), device.live_stages()), (1, 1));
        device.delete_stage(stage);
        device.delete_program(program);
        assert_eq!((device.live_programs(), device.live_stages()), (0, 0));
    }

    #[test]
    fn test_uniform_locations_follow_declaration_order() {
        let device = RecordingDevice::new().with_uniforms(&["a", "b"]);
        let program = device.create_program().unwrap();
        assert_eq!(device.uniform_location(program, "b"), Some(UniformLocation(1)));
        assert_eq!(device.uniform_location(program, "c"), None);
        device.define_uniform("c");
        assert_eq!(device.uniform_location(program, "c"), Some(UniformLocation(2)));
    }
}
