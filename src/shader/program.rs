//! Compiling stages and linking programs.

use crate::device::{GraphicsDevice, ProgramId, StageId, StageKind};
use crate::error::{Result, ShaderError};
use crate::preamble::Preamble;
use std::fs;
use std::path::PathBuf;
use tracing::{error, info, warn};

/// Where a shader is in its load cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProgramStatus {
    #[default]
    Unloaded,
    Compiling,
    Linked,
    Loaded,
}

/// A linked program and the stages attached to it.
#[derive(Debug)]
pub struct ProgramState {
    pub(crate) program: ProgramId,
    pub(crate) stages: Vec<(StageKind, StageId)>,
    /// Next texture unit handed to a newly resolved sampler.
    pub(crate) next_unit: u32,
}

impl ProgramState {
    pub fn program(&self) -> ProgramId {
        self.program
    }

    pub fn stages(&self) -> &[(StageKind, StageId)] {
        &self.stages
    }

    pub fn next_unit(&self) -> u32 {
        self.next_unit
    }

    /// Detaches and deletes every stage, then the program.
    pub(crate) fn destroy<D: GraphicsDevice + ?Sized>(self, device: &D) {
        for (_, stage) in &self.stages {
            device.detach_stage(self.program, *stage);
            device.delete_stage(*stage);
        }
        device.delete_program(self.program);
    }
}

/// Reads, prefixes and compiles one stage from its files.
pub(crate) fn compile_stage<D: GraphicsDevice + ?Sized>(
    device: &D,
    preamble: &Preamble,
    kind: StageKind,
    files: &[PathBuf],
    log_info: bool,
) -> Result<StageId> {
    let mut chunks = Vec::with_capacity(files.len());
    for file in files {
        info!("Loading {} shader: {:?}", kind, file);
        chunks.push(fs::read_to_string(file).map_err(|e| ShaderError::io(file, e))?);
    }
    let source = preamble.apply(&chunks);

    let stage = device.create_stage(kind).map_err(ShaderError::Device)?;
    if !device.compile_stage(stage, &source) {
        let log = device.stage_info_log(stage);
        error!("Failed compiling {} shader consisting of: {:?}", kind, files);
        error!("Compile errors: {}", log);
        device.delete_stage(stage);
        return Err(ShaderError::Compile {
            stage: kind,
            files: files.to_vec(),
            log,
        });
    }

    let log = device.stage_info_log(stage);
    if log_info && !log.trim().is_empty() {
        info!("Shader InfoLog:\n{}", log);
    }
    Ok(stage)
}

/// Links `state.program`. On failure the caller must destroy the state.
pub(crate) fn link<D: GraphicsDevice + ?Sized>(device: &D, state: &ProgramState, log_info: bool) -> Result<()> {
    let linked = device.link_program(state.program);
    let log = device.program_info_log(state.program);
    if let Some(code) = device.take_error() {
        warn!("Graphics error 0x{:04X} while linking shader program", code);
    }
    if !linked {
        error!("Could not link shader program: {}", log);
        return Err(ShaderError::Link { log });
    }
    if log_info && !log.trim().is_empty() {
        info!("Program InfoLog:\n{}", log);
    }
    Ok(())
}
