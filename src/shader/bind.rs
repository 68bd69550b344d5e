//! Resolving pending parameters against the active program.
//!
//! All functions assume the program is already in use on the device.

use crate::device::{GraphicsDevice, ProgramId};
use crate::error::{Result, ShaderError};
use crate::params::{Generations, ParameterStore, SamplerSlot, UniformSlot};
use crate::texture::{TextureKind, TextureResource};
use std::collections::BTreeMap;
use std::rc::Rc;

/// Resolves and uploads every pending uniform.
///
/// On failure the failing slot and everything after it stay pending.
pub(crate) fn resolve_uniforms<D: GraphicsDevice + ?Sized>(
    device: &D,
    program: ProgramId,
    uniforms: &mut Generations<UniformSlot>,
) -> Result<()> {
    let mut pending = uniforms.take_unbound().into_iter();
    while let Some((name, slot)) = pending.next() {
        if let Err(e) = resolve_uniform(device, program, uniforms, &name, &slot) {
            uniforms.restore_unbound(std::iter::once((name, slot)).chain(pending));
            return Err(e);
        }
    }
    Ok(())
}

/// Resolves a single pending uniform, if there is one.
pub(crate) fn resolve_pending_uniform<D: GraphicsDevice + ?Sized>(
    device: &D,
    program: ProgramId,
    uniforms: &mut Generations<UniformSlot>,
    name: &str,
) -> Result<()> {
    let Some(slot) = uniforms.take_pending(name) else {
        return Ok(());
    };
    resolve_uniform(device, program, uniforms, name, &slot).inspect_err(|_| {
        uniforms.restore_unbound([(name.to_string(), slot.clone())]);
    })
}

fn resolve_uniform<D: GraphicsDevice + ?Sized>(
    device: &D,
    program: ProgramId,
    uniforms: &mut Generations<UniformSlot>,
    name: &str,
    slot: &UniformSlot,
) -> Result<()> {
    // Known name: the location is still valid for this program.
    if let Some(bound) = uniforms.bound_mut().get_mut(name) {
        bound.value = slot.value;
        if let Some(location) = bound.location {
            device.upload_uniform(location, &bound.value);
        }
        return Ok(());
    }

    let location = device
        .uniform_location(program, name)
        .ok_or_else(|| ShaderError::UnknownUniform(name.to_string()))?;
    device.upload_uniform(location, &slot.value);
    uniforms.bound_mut().insert(
        name.to_string(),
        UniformSlot {
            value: slot.value,
            location: Some(location),
        },
    );
    Ok(())
}

/// Resolves every pending sampler of one kind.
///
/// Names seen for the first time get the next free texture unit; names seen
/// before get the unit they had, even across program rebuilds. Names already
/// bound keep their wiring and only swap texture.
pub(crate) fn resolve_samplers<D: GraphicsDevice + ?Sized>(
    device: &D,
    program: ProgramId,
    samplers: &mut Generations<SamplerSlot>,
    units: &mut BTreeMap<String, u32>,
    next_unit: &mut u32,
) -> Result<()> {
    let mut pending = samplers.take_unbound().into_iter();
    while let Some((name, slot)) = pending.next() {
        if let Err(e) = resolve_sampler(device, program, samplers, units, &name, &slot, next_unit) {
            samplers.restore_unbound(std::iter::once((name, slot)).chain(pending));
            return Err(e);
        }
    }
    Ok(())
}

/// Resolves a single pending sampler, if there is one.
pub(crate) fn resolve_pending_sampler<D: GraphicsDevice + ?Sized>(
    device: &D,
    program: ProgramId,
    samplers: &mut Generations<SamplerSlot>,
    units: &mut BTreeMap<String, u32>,
    name: &str,
    next_unit: &mut u32,
) -> Result<()> {
    let Some(slot) = samplers.take_pending(name) else {
        return Ok(());
    };
    resolve_sampler(device, program, samplers, units, name, &slot, next_unit).inspect_err(|_| {
        samplers.restore_unbound([(name.to_string(), slot.clone())]);
    })
}

fn resolve_sampler<D: GraphicsDevice + ?Sized>(
    device: &D,
    program: ProgramId,
    samplers: &mut Generations<SamplerSlot>,
    units: &mut BTreeMap<String, u32>,
    name: &str,
    slot: &SamplerSlot,
    next_unit: &mut u32,
) -> Result<()> {
    if let Some(bound) = samplers.bound_mut().get_mut(name) {
        bound.texture = Rc::clone(&slot.texture);
        return Ok(());
    }

    let location = device
        .uniform_location(program, name)
        .ok_or_else(|| ShaderError::UnknownUniform(name.to_string()))?;
    let unit = match units.get(name) {
        Some(unit) => *unit,
        None => {
            let unit = *next_unit;
            *next_unit += 1;
            units.insert(name.to_string(), unit);
            unit
        }
    };
    device.upload_sampler(location, unit);
    samplers.bound_mut().insert(
        name.to_string(),
        SamplerSlot {
            texture: Rc::clone(&slot.texture),
            unit: Some(unit),
            location: Some(location),
        },
    );
    Ok(())
}

/// Binds every bound texture to its unit, then leaves unit 0 active.
pub(crate) fn bind_textures<D: GraphicsDevice + ?Sized>(device: &D, params: &ParameterStore) {
    for kind in TextureKind::ALL {
        for slot in params.samplers(kind).bound().values() {
            if let Some(unit) = slot.unit {
                device.active_texture(unit);
                device.bind_texture(kind, slot.texture.id());
            }
        }
    }
    device.active_texture(0);
}
