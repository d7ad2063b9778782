/// Bounded texture-unit allocator.
///
/// Each texture key holds at most one unit. A key keeps its unit across
/// hot reloads: when the texture behind it is rebuilt, the same unit is
/// rebound to the new object, so other bound samplers are undisturbed.
///
/// Architecture:
/// - Slot table + [`SlotAllocator`] behind one mutex
/// - Lock order: texture store (resolve) before the slot table, slot table
///   before the device
/// - Every `bind` writes a unit index into the sampler uniform, 0 on failure
/// - Unloading a texture from the store releases its unit

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::graphics_device::{lock_device, GraphicsDevice, UniformLocation, UniformValue};
use crate::resource::{TextureStore, VersionedId};
use crate::utils::SlotAllocator;
use crate::{engine_debug, engine_err, engine_error, engine_internal_error};

const SOURCE: &str = "lumen::SamplerManager";

/// A texture bound to a unit, at the build it was bound with
#[derive(Debug, Clone, PartialEq, Eq)]
struct SlotBinding {
    texture_key: String,
    bound: VersionedId,
}

struct SamplerSlots {
    allocator: SlotAllocator,
    slots: Vec<Option<SlotBinding>>,
    units_by_key: FxHashMap<String, u32>,
}

pub struct SamplerManager {
    graphics_device: Arc<Mutex<dyn GraphicsDevice>>,
    textures: Arc<TextureStore>,
    state: Arc<Mutex<SamplerSlots>>,
    failures: AtomicU64,
}

impl SamplerManager {
    /// Create a manager over `min(unit_limit, device maximum)` texture units
    pub fn new(
        graphics_device: Arc<Mutex<dyn GraphicsDevice>>,
        textures: Arc<TextureStore>,
        unit_limit: Option<u32>,
    ) -> Self {
        let device_units = lock_device(&graphics_device).max_texture_units();
        let capacity = unit_limit.map_or(device_units, |limit| limit.min(device_units));
        engine_debug!(SOURCE, "{} texture units available", capacity);
        let state = Arc::new(Mutex::new(SamplerSlots {
            allocator: SlotAllocator::new(capacity),
            slots: vec![None; capacity as usize],
            units_by_key: FxHashMap::default(),
        }));

        let slots = Arc::downgrade(&state);
        let device = graphics_device.clone();
        textures.on_unload(move |texture_key| {
            let Some(state) = slots.upgrade() else {
                return;
            };
            let mut state = lock_slots(&state);
            if let Some(unit) = Self::release(&mut state, texture_key) {
                lock_device(&device).bind_texture_unit(unit, None);
                engine_debug!(SOURCE, "Released unit {} of unloaded '{}'", unit, texture_key);
            }
        });

        Self {
            graphics_device,
            textures,
            state,
            failures: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SamplerSlots> {
        lock_slots(&self.state)
    }

    /// Bind the texture stored under `texture_key` and point `sampler` at its unit
    ///
    /// A key without a unit gets the lowest free one. A key whose texture was
    /// rebuilt since it was bound is rebound on the same unit.
    ///
    /// # Returns
    ///
    /// The unit index written into `sampler`
    ///
    /// # Errors
    ///
    /// - `NotLoaded` if the texture store has no such key; `sampler` gets
    ///   unit 0 and any unit the key still held is released
    /// - `NoFreeTextureUnit` if every unit is taken; `sampler` gets unit 0
    pub fn bind(&self, sampler: UniformLocation, texture_key: &str) -> Result<u32> {
        let resolved = self.textures.resolve(texture_key);
        let mut state = self.lock();

        let Some((versioned_id, texture)) = resolved else {
            let stale = Self::release(&mut state, texture_key);
            let mut device = lock_device(&self.graphics_device);
            if let Some(unit) = stale {
                device.bind_texture_unit(unit, None);
            }
            device.set_uniform(sampler, &UniformValue::Int(0));
            self.failures.fetch_add(1, Ordering::Relaxed);
            return Err(engine_err!(SOURCE, NotLoaded, "texture '{}'", texture_key));
        };

        let unit = match state.units_by_key.get(texture_key).copied() {
            Some(unit) => {
                let bound = state.slots[unit as usize].as_ref().map(|binding| binding.bound);
                if bound != Some(versioned_id) {
                    match bound {
                        Some(previous) => engine_debug!(SOURCE, "Rebinding unit {} for '{}' ({} -> {})",
                            unit, texture_key, previous, versioned_id),
                        None => engine_internal_error!(SOURCE, "unit {} of '{}' has no binding", unit, texture_key),
                    }
                    state.slots[unit as usize] = Some(SlotBinding {
                        texture_key: texture_key.to_string(),
                        bound: versioned_id,
                    });
                    lock_device(&self.graphics_device).bind_texture_unit(unit, Some(texture.handle()));
                }
                unit
            }
            None => {
                let Some(unit) = state.allocator.alloc() else {
                    lock_device(&self.graphics_device).set_uniform(sampler, &UniformValue::Int(0));
                    self.failures.fetch_add(1, Ordering::Relaxed);
                    let capacity = state.allocator.capacity();
                    engine_error!(SOURCE, "Cannot bind '{}': all {} texture units are in use", texture_key, capacity);
                    return Err(Error::NoFreeTextureUnit(capacity));
                };
                engine_debug!(SOURCE, "Binding '{}' ({}) to unit {}", texture_key, versioned_id, unit);
                state.slots[unit as usize] = Some(SlotBinding {
                    texture_key: texture_key.to_string(),
                    bound: versioned_id,
                });
                state.units_by_key.insert(texture_key.to_string(), unit);
                lock_device(&self.graphics_device).bind_texture_unit(unit, Some(texture.handle()));
                unit
            }
        };

        lock_device(&self.graphics_device).set_uniform(sampler, &UniformValue::Int(unit as i32));
        Ok(unit)
    }

    /// Release the unit held by `texture_key`
    ///
    /// # Errors
    ///
    /// `NotLoaded` if the key holds no unit.
    pub fn unbind(&self, texture_key: &str) -> Result<()> {
        let mut state = self.lock();
        let Some(unit) = Self::release(&mut state, texture_key) else {
            return Err(engine_err!(SOURCE, NotLoaded, "texture '{}' holds no texture unit", texture_key));
        };
        lock_device(&self.graphics_device).bind_texture_unit(unit, None);
        engine_debug!(SOURCE, "Released unit {} of '{}'", unit, texture_key);
        Ok(())
    }

    /// Release every unit
    pub fn unbind_all(&self) {
        let mut state = self.lock();
        let keys: Vec<String> = state.units_by_key.keys().cloned().collect();
        let mut device = lock_device(&self.graphics_device);
        for key in keys {
            if let Some(unit) = Self::release(&mut state, &key) {
                device.bind_texture_unit(unit, None);
            }
        }
    }

    fn release(state: &mut SamplerSlots, texture_key: &str) -> Option<u32> {
        let unit = state.units_by_key.remove(texture_key)?;
        state.slots[unit as usize] = None;
        if !state.allocator.free(unit) {
            engine_internal_error!(SOURCE, "unit {} of '{}' was not allocated", unit, texture_key);
        }
        Some(unit)
    }

    // ===== QUERIES =====

    /// Unit currently held by `texture_key`
    pub fn unit_of(&self, texture_key: &str) -> Option<u32> {
        self.lock().units_by_key.get(texture_key).copied()
    }

    /// Texture key bound on `unit`
    pub fn key_on_unit(&self, unit: u32) -> Option<String> {
        self.lock()
            .slots
            .get(unit as usize)
            .and_then(|slot| slot.as_ref().map(|binding| binding.texture_key.clone()))
    }

    /// Number of occupied units
    pub fn bound_count(&self) -> u32 {
        self.lock().allocator.len()
    }

    /// Number of units managed
    pub fn capacity(&self) -> u32 {
        self.lock().allocator.capacity()
    }

    /// Binds that fell back to unit 0 since creation
    pub fn failure_count(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}

fn lock_slots(state: &Mutex<SamplerSlots>) -> MutexGuard<'_, SamplerSlots> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
#[path = "sampler_manager_tests.rs"]
mod tests;
