//! Two-generation parameter store.
//!
//! Every parameter lives in an *unbound* map while it waits to be resolved
//! against the linked program, and in a *bound* map once its location (and
//! texture unit, for samplers) is known. Setters only ever write to the
//! unbound map; [`Generations::reset`] pushes everything back to unbound
//! when the program is rebuilt.

use crate::device::UniformLocation;
use crate::texture::{TextureKind, TextureRef};
use crate::uniform::UniformValue;
use std::collections::BTreeMap;
use std::mem;
use std::rc::Rc;

/// Slot state that must be forgotten when the program changes.
pub trait Resolvable {
    fn clear_resolution(&mut self);
    fn is_resolved(&self) -> bool;
}

#[derive(Debug, Clone, PartialEq)]
pub struct UniformSlot {
    pub value: UniformValue,
    pub location: Option<UniformLocation>,
}

impl UniformSlot {
    pub fn new(value: UniformValue) -> Self {
        Self { value, location: None }
    }
}

impl Resolvable for UniformSlot {
    fn clear_resolution(&mut self) {
        self.location = None;
    }

    fn is_resolved(&self) -> bool {
        self.location.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct SamplerSlot {
    pub texture: TextureRef,
    pub unit: Option<u32>,
    pub location: Option<UniformLocation>,
}

impl SamplerSlot {
    pub fn new(texture: TextureRef) -> Self {
        Self {
            texture,
            unit: None,
            location: None,
        }
    }
}

impl Resolvable for SamplerSlot {
    fn clear_resolution(&mut self) {
        self.unit = None;
        self.location = None;
    }

    fn is_resolved(&self) -> bool {
        self.unit.is_some() || self.location.is_some()
    }
}

/// Unbound and bound maps for one kind of slot.
#[derive(Debug, Clone)]
pub struct Generations<S> {
    unbound: BTreeMap<String, S>,
    bound: BTreeMap<String, S>,
}

impl<S> Default for Generations<S> {
    fn default() -> Self {
        Self {
            unbound: BTreeMap::new(),
            bound: BTreeMap::new(),
        }
    }
}

impl<S: Resolvable> Generations<S> {
    /// Records a pending value, even if a bound slot of that name exists.
    pub fn set(&mut self, name: &str, slot: S) {
        self.unbound.insert(name.to_string(), slot);
    }

    /// The most recent value: pending if any, else bound.
    pub fn get(&self, name: &str) -> Option<&S> {
        self.unbound.get(name).or_else(|| self.bound.get(name))
    }

    pub fn unbound(&self) -> &BTreeMap<String, S> {
        &self.unbound
    }

    pub fn bound(&self) -> &BTreeMap<String, S> {
        &self.bound
    }

    pub(crate) fn bound_mut(&mut self) -> &mut BTreeMap<String, S> {
        &mut self.bound
    }

    /// Removes and returns everything pending resolution.
    pub(crate) fn take_unbound(&mut self) -> BTreeMap<String, S> {
        mem::take(&mut self.unbound)
    }

    pub(crate) fn take_pending(&mut self, name: &str) -> Option<S> {
        self.unbound.remove(name)
    }

    /// Puts back entries that could not be resolved.
    pub(crate) fn restore_unbound(&mut self, rest: impl IntoIterator<Item = (String, S)>) {
        for (name, slot) in rest {
            self.unbound.entry(name).or_insert(slot);
        }
    }

    /// Moves every bound slot back to unbound and forgets all resolutions.
    /// Pending values win over bound ones of the same name.
    pub fn reset(&mut self) {
        for (name, slot) in mem::take(&mut self.bound) {
            self.unbound.entry(name).or_insert(slot);
        }
        for slot in self.unbound.values_mut() {
            slot.clear_resolution();
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        let pending = self.unbound.keys();
        let bound = self.bound.keys().filter(move |k| !self.unbound.contains_key(*k));
        pending.chain(bound)
    }
}

/// Uniforms plus 2D, 3D and cubemap samplers.
#[derive(Debug, Clone, Default)]
pub struct ParameterStore {
    uniforms: Generations<UniformSlot>,
    tex2d: Generations<SamplerSlot>,
    tex3d: Generations<SamplerSlot>,
    cubemaps: Generations<SamplerSlot>,
    /// Texture unit handed out to each sampler name, per kind. Survives
    /// [`ParameterStore::reset`] so a sampler keeps its unit across rebuilds.
    units: [BTreeMap<String, u32>; 3],
}

fn kind_index(kind: TextureKind) -> usize {
    match kind {
        TextureKind::Tex2D => 0,
        TextureKind::Tex3D => 1,
        TextureKind::Cubemap => 2,
    }
}

impl ParameterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_uniform(&mut self, name: &str, value: UniformValue) {
        self.uniforms.set(name, UniformSlot::new(value));
    }

    pub fn uniform(&self, name: &str) -> Option<UniformValue> {
        self.uniforms.get(name).map(|slot| slot.value)
    }

    pub fn set_texture(&mut self, name: &str, kind: TextureKind, texture: TextureRef) {
        self.samplers_mut(kind).set(name, SamplerSlot::new(texture));
    }

    pub fn texture(&self, name: &str, kind: TextureKind) -> Option<TextureRef> {
        self.samplers(kind).get(name).map(|slot| Rc::clone(&slot.texture))
    }

    pub fn uniforms(&self) -> &Generations<UniformSlot> {
        &self.uniforms
    }

    pub(crate) fn uniforms_mut(&mut self) -> &mut Generations<UniformSlot> {
        &mut self.uniforms
    }

    pub fn samplers(&self, kind: TextureKind) -> &Generations<SamplerSlot> {
        match kind {
            TextureKind::Tex2D => &self.tex2d,
            TextureKind::Tex3D => &self.tex3d,
            TextureKind::Cubemap => &self.cubemaps,
        }
    }

    pub(crate) fn samplers_mut(&mut self, kind: TextureKind) -> &mut Generations<SamplerSlot> {
        match kind {
            TextureKind::Tex2D => &mut self.tex2d,
            TextureKind::Tex3D => &mut self.tex3d,
            TextureKind::Cubemap => &mut self.cubemaps,
        }
    }

    /// Samplers of one kind together with their remembered units.
    pub(crate) fn sampler_units_mut(
        &mut self,
        kind: TextureKind,
    ) -> (&mut Generations<SamplerSlot>, &mut BTreeMap<String, u32>) {
        let units = &mut self.units[kind_index(kind)];
        let samplers = match kind {
            TextureKind::Tex2D => &mut self.tex2d,
            TextureKind::Tex3D => &mut self.tex3d,
            TextureKind::Cubemap => &mut self.cubemaps,
        };
        (samplers, units)
    }

    /// The unit `name` was given the first time it was resolved.
    pub fn sampler_unit(&self, name: &str, kind: TextureKind) -> Option<u32> {
        self.units[kind_index(kind)].get(name).copied()
    }

    /// First texture unit not yet handed out to any sampler.
    pub fn next_free_unit(&self) -> u32 {
        self.units
            .iter()
            .flat_map(BTreeMap::values)
            .map(|unit| unit + 1)
            .max()
            .unwrap_or(0)
    }

    /// Every texture held, bound or pending, in kind then name order.
    /// A name with both a pending and a bound slot contributes both textures.
    pub fn textures(&self) -> Vec<TextureRef> {
        TextureKind::ALL
            .iter()
            .flat_map(|kind| {
                let samplers = self.samplers(*kind);
                samplers.bound().values().chain(samplers.unbound().values())
            })
            .map(|slot| Rc::clone(&slot.texture))
            .collect()
    }

    /// Resets every generation for a program rebuild. Unit assignments
    /// are kept.
    pub fn reset(&mut self) {
        self.uniforms.reset();
        for kind in TextureKind::ALL {
            self.samplers_mut(kind).reset();
        }
    }

    /// True when nothing is bound and no pending slot is resolved.
    pub fn is_unresolved(&self) -> bool {
        let uniforms = self.uniforms.bound().is_empty()
            && self.uniforms.unbound().values().all(|s| !s.is_resolved());
        uniforms
            && TextureKind::ALL.iter().all(|kind| {
                let samplers = self.samplers(*kind);
                samplers.bound().is_empty() && samplers.unbound().values().all(|s| !s.is_resolved())
            })
    }
}
