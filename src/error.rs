//! Error type shared by every shader operation.

use crate::device::StageKind;
use std::path::PathBuf;
use thiserror::Error;

/// Hard failures surfaced to the caller.
///
/// Soft problems (a malformed descriptor line, a file that could not be
/// stat'ed while polling) are logged instead and never show up here.
#[derive(Debug, Error)]
pub enum ShaderError {
    /// The shader is configured in a way that cannot be loaded.
    #[error("shader configuration error: {0}")]
    Config(String),

    /// A texture directive without the mandatory `name|path` separator.
    #[error("line {line}: missing '|' between texture name and file in {directive:?}")]
    MissingSeparator { line: usize, directive: String },

    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A stage failed to compile. `log` is the driver's info log.
    #[error("failed compiling {stage} shader from {files:?}: {log}")]
    Compile {
        stage: StageKind,
        files: Vec<PathBuf>,
        log: String,
    },

    #[error("could not link shader program: {log}")]
    Link { log: String },

    /// The graphics device refused to create an object.
    #[error("graphics device error: {0}")]
    Device(String),

    /// The name is not an active uniform of the linked program.
    #[error("no such uniform named {0:?}")]
    UnknownUniform(String),

    #[error("no such attribute named {0:?}")]
    UnknownAttribute(String),

    #[error("no shader program loaded")]
    NotLoaded,

    #[error("failed to load texture {name:?} from {path:?}: {reason}")]
    Texture {
        name: String,
        path: PathBuf,
        reason: String,
    },

    #[error("invalid configuration file: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl ShaderError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ShaderError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ShaderError>;
