//! Offline GLSL validation through naga.
//!
//! naga only understands GLSL 440 and later, and has no geometry stage, so
//! anything else is reported as skipped rather than invalid.

use crate::device::StageKind;
use naga::front::glsl::{Frontend, Options};
use naga::valid::{Capabilities, ValidationFlags, Validator};
use naga::ShaderStage;
use tracing::debug;

const MIN_VALIDATED_VERSION: u32 = 440;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    Valid,
    Skipped(String),
    Invalid(String),
}

impl Validation {
    pub fn is_invalid(&self) -> bool {
        matches!(self, Validation::Invalid(_))
    }
}

/// The number in the first `#version` line, if any.
pub fn declared_version(source: &str) -> Option<u32> {
    source
        .lines()
        .map(str::trim_start)
        .find_map(|line| line.strip_prefix("#version"))
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|v| v.parse().ok())
}

/// Parses and validates one fully assembled stage source.
pub fn validate_stage(kind: StageKind, source: &str) -> Validation {
    let stage = match kind {
        StageKind::Vertex => ShaderStage::Vertex,
        StageKind::Fragment => ShaderStage::Fragment,
        StageKind::Geometry => return Validation::Skipped("geometry shaders are not supported by naga".to_string()),
    };
    match declared_version(source) {
        Some(version) if version >= MIN_VALIDATED_VERSION => {}
        Some(version) => return Validation::Skipped(format!("GLSL {} is older than {}", version, MIN_VALIDATED_VERSION)),
        None => return Validation::Skipped("no #version directive".to_string()),
    }

    let mut frontend = Frontend::default();
    let module = match frontend.parse(&Options::from(stage), source) {
        Ok(module) => module,
        Err(e) => return Validation::Invalid(format!("GLSL parse error: {:?}", e)),
    };
    let mut validator = Validator::new(ValidationFlags::all(), Capabilities::all());
    match validator.validate(&module) {
        Ok(_) => {
            debug!("{} shader validated", kind);
            Validation::Valid
        }
        Err(e) => Validation::Invalid(format!("Shader validation error: {:?}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_version() {
        assert_eq!(declared_version("#version 450 core\nvoid main() {}"), Some(450));
        assert_eq!(declared_version("  #version 120\n"), Some(120));
        assert_eq!(declared_version("void main() {}"), None);
    }

    #[test]
    fn test_old_or_unversioned_sources_are_skipped() {
        assert!(matches!(
            validate_stage(StageKind::Fragment, "#version 330\nvoid main() {}"),
            Validation::Skipped(_)
        ));
        assert!(matches!(validate_stage(StageKind::Vertex, "void main() {}"), Validation::Skipped(_)));
        assert!(matches!(
            validate_stage(StageKind::Geometry, "#version 450\nvoid main() {}"),
            Validation::Skipped(_)
        ));
    }

    #[test]
    fn test_syntax_error_is_invalid() {
        let result = validate_stage(StageKind::Fragment, "#version 450\nvoid main() { this is not glsl }");
        assert!(result.is_invalid());
    }
}
