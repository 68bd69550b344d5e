//! Glint: GLSL shader programs with live reload.
//!
//! Loads programs described by small descriptor files, keeps their uniforms
//! and samplers across rebuilds, and reloads them when any file changes.

pub mod capabilities;
pub mod config;
pub mod descriptor;
pub mod device;
pub mod error;
pub mod monitor;
pub mod params;
pub mod preamble;
pub mod shader;
pub mod texture;
pub mod uniform;
pub mod validate;

pub use capabilities::GraphicsCapabilities;
pub use config::{ShaderConfig, WatchMode};
pub use device::{GraphicsDevice, StageKind};
pub use error::{Result, ShaderError};
pub use shader::{ProgramStatus, Shader};
pub use texture::{TextureKind, TextureRef};
pub use uniform::UniformValue;
