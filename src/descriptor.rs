//! Parser for `.glsl` shader descriptor files.
//!
//! One directive per line:
//!
//! ```text
//! # comment
//! vert: path/to/file.vert
//! geom: path/to/file.geom
//! frag: path/to/file.frag
//! text: samplerName|path/to/texture.png     (also tex2D: and tex3D:)
//! attr: uniformName = f0 [f1 f2 f3]         (also unif:)
//! ```

use crate::config::ShaderConfig;
use crate::device::StageKind;
use crate::error::{Result, ShaderError};
use crate::texture::TextureKind;
use crate::uniform::UniformValue;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::warn;

/// A `name|path` sampler binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureDirective {
    pub name: String,
    pub kind: TextureKind,
    pub path: PathBuf,
}

/// Parsed descriptor: stage files, textures and initial uniform values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShaderDescriptor {
    path: Option<PathBuf>,
    vertex: Vec<PathBuf>,
    geometry: Vec<PathBuf>,
    fragment: Vec<PathBuf>,
    textures: Vec<TextureDirective>,
    uniforms: Vec<(String, UniformValue)>,
    skipped_lines: Vec<usize>,
}

impl ShaderDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a descriptor file and resolves its stage paths through `config`.
    pub fn from_file(path: &Path, config: &ShaderConfig) -> Result<Self> {
        let file = File::open(path).map_err(|e| ShaderError::io(path, e))?;
        let mut descriptor = parse_descriptor(BufReader::new(file), path)?;
        let base_dir = path.parent().filter(|p| !p.as_os_str().is_empty());
        for kind in StageKind::ALL {
            for stage in descriptor.stage_files_mut(kind) {
                *stage = config.resolve(stage, base_dir);
            }
        }
        descriptor.path = Some(path.to_path_buf());
        Ok(descriptor)
    }

    /// The descriptor file, if parsed from disk.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn stage_files(&self, kind: StageKind) -> &[PathBuf] {
        match kind {
            StageKind::Vertex => &self.vertex,
            StageKind::Geometry => &self.geometry,
            StageKind::Fragment => &self.fragment,
        }
    }

    fn stage_files_mut(&mut self, kind: StageKind) -> &mut Vec<PathBuf> {
        match kind {
            StageKind::Vertex => &mut self.vertex,
            StageKind::Geometry => &mut self.geometry,
            StageKind::Fragment => &mut self.fragment,
        }
    }

    pub fn add_stage_file(&mut self, kind: StageKind, path: impl Into<PathBuf>) {
        self.stage_files_mut(kind).push(path.into());
    }

    /// Whether any stage file was specified.
    pub fn has_stages(&self) -> bool {
        StageKind::ALL.iter().any(|k| !self.stage_files(*k).is_empty())
    }

    pub fn textures(&self) -> &[TextureDirective] {
        &self.textures
    }

    pub fn uniforms(&self) -> &[(String, UniformValue)] {
        &self.uniforms
    }

    /// Line numbers (1-based) of malformed directives that were skipped.
    pub fn skipped_lines(&self) -> &[usize] {
        &self.skipped_lines
    }

    /// The descriptor file followed by every stage file, for change tracking.
    pub fn watched_files(&self) -> Vec<PathBuf> {
        self.path
            .iter()
            .cloned()
            .chain(StageKind::ALL.iter().flat_map(|k| self.stage_files(*k).iter().cloned()))
            .collect()
    }
}

enum Directive {
    Stage(StageKind),
    Texture(TextureKind),
    Uniform,
}

fn directive(tag: &str) -> Option<Directive> {
    match tag {
        "vert" => Some(Directive::Stage(StageKind::Vertex)),
        "geom" => Some(Directive::Stage(StageKind::Geometry)),
        "frag" => Some(Directive::Stage(StageKind::Fragment)),
        "text" | "tex2D" => Some(Directive::Texture(TextureKind::Tex2D)),
        "tex3D" => Some(Directive::Texture(TextureKind::Tex3D)),
        "attr" | "unif" => Some(Directive::Uniform),
        _ => None,
    }
}

/// Parses descriptor text read from `origin`.
///
/// Malformed lines are logged and skipped, including lines that are not
/// valid UTF-8 (comments with such bytes are simply ignored). A texture
/// directive without a `|` separator fails the whole parse since the name
/// cannot be guessed. Stage paths are returned as written; see
/// [`ShaderDescriptor::from_file`] for resolution.
pub fn parse_descriptor(reader: impl BufRead, origin: &Path) -> Result<ShaderDescriptor> {
    let mut descriptor = ShaderDescriptor::new();

    for (index, bytes) in reader.split(b'\n').enumerate() {
        let number = index + 1;
        let bytes = bytes.map_err(|e| ShaderError::io(origin, e))?;
        let line = String::from_utf8_lossy(&bytes);
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if std::str::from_utf8(&bytes).is_err() {
            warn!("Line({}) in {:?} is not valid UTF-8: '{}'", number, origin, trimmed);
            descriptor.skipped_lines.push(number);
            continue;
        }

        let parsed = trimmed
            .split_once(':')
            .and_then(|(tag, rest)| directive(tag).map(|d| (d, rest.trim())));
        let Some((kind, rest)) = parsed else {
            warn!("Line({}) Unknown directive: '{}'", number, trimmed);
            descriptor.skipped_lines.push(number);
            continue;
        };

        let accepted = match kind {
            Directive::Stage(stage) => match rest.split_whitespace().next() {
                Some(file) => {
                    descriptor.add_stage_file(stage, file);
                    true
                }
                None => {
                    warn!("Line({}) Invalid {} shader.", number, stage);
                    false
                }
            },
            Directive::Texture(texture) => parse_texture(number, trimmed, rest, texture, &mut descriptor)?,
            Directive::Uniform => match parse_uniform(rest) {
                Some((name, value)) => {
                    descriptor.uniforms.push((name, value));
                    true
                }
                None => {
                    warn!("Line({}) Invalid uniform: '{}'", number, rest);
                    false
                }
            },
        };
        if !accepted {
            descriptor.skipped_lines.push(number);
        }
    }

    Ok(descriptor)
}

fn parse_texture(
    number: usize,
    line: &str,
    rest: &str,
    kind: TextureKind,
    descriptor: &mut ShaderDescriptor,
) -> Result<bool> {
    let Some(token) = rest.split_whitespace().next() else {
        warn!("Line({}) Invalid texture resource: '{}'", number, line);
        return Ok(false);
    };
    // The last '|' separates, so names may contain one.
    let (name, path) = match token.rsplit_once('|') {
        Some((name, path)) if !name.is_empty() => (name, path),
        _ => {
            return Err(ShaderError::MissingSeparator {
                line: number,
                directive: line.to_string(),
            })
        }
    };
    if path.is_empty() {
        warn!("Line({}) Texture '{}' has no file", number, name);
        return Ok(false);
    }
    descriptor.textures.push(TextureDirective {
        name: name.to_string(),
        kind,
        path: PathBuf::from(path),
    });
    Ok(true)
}

/// `name = f0 [f1 f2 f3]`. Reading stops at the first token that is not a
/// number, so trailing comments are tolerated.
fn parse_uniform(rest: &str) -> Option<(String, UniformValue)> {
    let (name, values) = rest.split_once('=')?;
    let name = name.trim();
    if name.is_empty() || name.contains(char::is_whitespace) {
        return None;
    }
    let floats: Vec<f32> = values
        .split_whitespace()
        .map_while(|token| token.parse::<f32>().ok())
        .take(4)
        .collect();
    UniformValue::from_floats(&floats).map(|value| (name.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn parse(text: &str) -> Result<ShaderDescriptor> {
        parse_descriptor(Cursor::new(text), Path::new("test.glsl"))
    }

    #[test]
    fn test_uniform_arity_sets_kind() {
        let d = parse("attr: color = 1.0 0.5 0.25").unwrap();
        assert_eq!(d.uniforms(), &[("color".to_string(), UniformValue::Vec3([1.0, 0.5, 0.25]))]);

        let d = parse("unif: scale = 2\nunif: uv = 0 1\nattr: tint = 1 1 1 0.5 # rgba").unwrap();
        assert_eq!(d.uniforms()[0].1, UniformValue::Float(2.0));
        assert_eq!(d.uniforms()[1].1, UniformValue::Vec2([0.0, 1.0]));
        assert_eq!(d.uniforms()[2].1, UniformValue::Vec4([1.0, 1.0, 1.0, 0.5]));
    }

    #[test]
    fn test_texture_directive() {
        let d = parse("text: diffuse|wood.png").unwrap();
        assert_eq!(
            d.textures(),
            &[TextureDirective {
                name: "diffuse".to_string(),
                kind: TextureKind::Tex2D,
                path: PathBuf::from("wood.png"),
            }]
        );

        let d = parse("tex3D: volume|noise.raw\ntex2D: normals|n.png").unwrap();
        assert_eq!(d.textures()[0].kind, TextureKind::Tex3D);
        assert_eq!(d.textures()[1].kind, TextureKind::Tex2D);
    }

    #[test]
    fn test_texture_without_separator_fails() {
        match parse("vert: a.vert\ntext: badline") {
            Err(ShaderError::MissingSeparator { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected missing separator, got {:?}", other),
        }
        assert!(matches!(parse("text: |wood.png"), Err(ShaderError::MissingSeparator { .. })));
    }

    #[test]
    fn test_stage_lists_keep_order() {
        let d = parse("vert: a.vert\nfrag: b.frag\nvert: c.vert\ngeom:d.geom").unwrap();
        assert_eq!(d.stage_files(StageKind::Vertex), &[PathBuf::from("a.vert"), PathBuf::from("c.vert")]);
        assert_eq!(d.stage_files(StageKind::Fragment), &[PathBuf::from("b.frag")]);
        assert_eq!(d.stage_files(StageKind::Geometry), &[PathBuf::from("d.geom")]);
        assert!(d.has_stages());
    }

    #[test]
    fn test_comments_blank_and_malformed_lines_are_skipped() {
        let text = "# header\n\n   \nvert:\nattr: x =\nattr: nameonly\nfrag: ok.frag\nbogus: 1\n";
        let d = parse(text).unwrap();
        assert_eq!(d.stage_files(StageKind::Fragment), &[PathBuf::from("ok.frag")]);
        assert!(d.uniforms().is_empty());
        assert_eq!(d.skipped_lines(), &[4, 5, 6, 8]);
    }

    #[test]
    fn test_invalid_utf8_lines_are_skipped() {
        let bytes: &[u8] = b"vert: a.vert\n# caf\xE9\nfrag: b.frag\nunif: t\xE9 = 1\r\n";
        let d = parse_descriptor(Cursor::new(bytes), Path::new("latin1.glsl")).unwrap();
        assert_eq!(d.stage_files(StageKind::Vertex), &[PathBuf::from("a.vert")]);
        assert_eq!(d.stage_files(StageKind::Fragment), &[PathBuf::from("b.frag")]);
        assert!(d.uniforms().is_empty());
        assert_eq!(d.skipped_lines(), &[4]);
    }

    #[test]
    fn test_texture_splits_at_last_separator() {
        let d = parse("text: a|b|c.png").unwrap();
        assert_eq!(d.textures()[0].name, "a|b");
        assert_eq!(d.textures()[0].path, PathBuf::from("c.png"));
    }

    #[test]
    fn test_bare_tex2d_tag_is_not_a_texture() {
        let d = parse("tex2D diffuse|wood.png").unwrap();
        assert!(d.textures().is_empty());
        assert_eq!(d.skipped_lines(), &[1]);
    }

    #[test]
    fn test_from_file_resolves_relative_to_descriptor() {
        let dir = std::env::temp_dir().join(format!("glint_descriptor_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("plain.vert"), "void main() {}").unwrap();
        let path = dir.join("plain.glsl");
        std::fs::write(&path, "vert: plain.vert\nfrag: missing.frag\n").unwrap();

        let d = ShaderDescriptor::from_file(&path, &ShaderConfig::default()).unwrap();
        assert_eq!(d.stage_files(StageKind::Vertex), &[dir.join("plain.vert")]);
        assert_eq!(d.stage_files(StageKind::Fragment), &[dir.join("missing.frag")]);
        assert_eq!(
            d.watched_files(),
            vec![path.clone(), dir.join("plain.vert"), dir.join("missing.frag")]
        );

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
