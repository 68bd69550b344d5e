//! Texture resources referenced by sampler slots.
//!
//! Textures are owned by a resource cache outside the shader. A shader only
//! keeps an `Rc` to them, so releasing a shader never frees a texture that is
//! still in use elsewhere.

use crate::device::TextureId;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::debug;

/// Sampler dimensionality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TextureKind {
    Tex2D,
    Tex3D,
    Cubemap,
}

impl TextureKind {
    pub const ALL: [TextureKind; 3] = [TextureKind::Tex2D, TextureKind::Tex3D, TextureKind::Cubemap];
}

impl fmt::Display for TextureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextureKind::Tex2D => write!(f, "2D"),
            TextureKind::Tex3D => write!(f, "3D"),
            TextureKind::Cubemap => write!(f, "cubemap"),
        }
    }
}

/// A texture living on the graphics device.
pub trait TextureResource: fmt::Debug {
    /// Device handle, or `None` while the texture has not been uploaded.
    fn id(&self) -> Option<TextureId>;

    /// File the texture was created from, if any.
    fn path(&self) -> Option<&Path> {
        None
    }
}

/// Shared, non-owning handle to a texture.
pub type TextureRef = Rc<dyn TextureResource>;

/// Creates texture resources for `text:`/`tex2D:`/`tex3D:` directives.
pub trait TextureLoader {
    fn load(&self, kind: TextureKind, path: &Path) -> Result<TextureRef, String>;
}

/// A texture identified by its source file whose device id is filled in by
/// whoever uploads it.
#[derive(Debug)]
pub struct FileTexture {
    path: PathBuf,
    kind: TextureKind,
    id: Cell<Option<TextureId>>,
}

impl FileTexture {
    pub fn new(path: impl Into<PathBuf>, kind: TextureKind) -> Self {
        Self {
            path: path.into(),
            kind,
            id: Cell::new(None),
        }
    }

    pub fn kind(&self) -> TextureKind {
        self.kind
    }

    /// Records the device handle after upload.
    pub fn set_id(&self, id: Option<TextureId>) {
        self.id.set(id);
    }
}

impl TextureResource for FileTexture {
    fn id(&self) -> Option<TextureId> {
        self.id.get()
    }

    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

/// Loader that hands out one shared [`FileTexture`] per `(kind, path)`.
///
/// Every shader naming the same file gets the same `Rc`, so the cache stays
/// the owner of record.
#[derive(Debug, Default)]
pub struct TextureCache {
    entries: RefCell<HashMap<(TextureKind, PathBuf), Rc<FileTexture>>>,
}

impl TextureCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Typed access to a cached texture, e.g. to set its device id.
    pub fn get(&self, kind: TextureKind, path: &Path) -> Option<Rc<FileTexture>> {
        self.entries.borrow().get(&(kind, path.to_path_buf())).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl TextureLoader for TextureCache {
    fn load(&self, kind: TextureKind, path: &Path) -> Result<TextureRef, String> {
        let mut entries = self.entries.borrow_mut();
        let texture = entries
            .entry((kind, path.to_path_buf()))
            .or_insert_with(|| {
                debug!("Caching {} texture {:?}", kind, path);
                Rc::new(FileTexture::new(path, kind))
            })
            .clone();
        Ok(texture)
    }
}
