/// Keyed, hot-reloadable, generation-versioned GPU resource registry.
///
/// One `ResourceStore` exists per resource kind (shader programs, textures).
/// Each key maps to at most one live GPU object. Rebuilding a key keeps its
/// `id` and bumps its `generation`, so cached bindings can detect staleness
/// by comparing [`VersionedId`]s.
///
/// Architecture:
/// - Map guarded by one `RwLock`: `resolve` takes the shared side, `load`,
///   `reload` and `unload` the exclusive side for the whole build
/// - Double buffer per key: `live` serves, the previous generation waits in
///   `intermediate` until the next successful rebuild retires it
/// - Source paths are registered with a [`FileWatcher`]; a background loop
///   started by [`start_hot_reloading`](ResourceStore::start_hot_reloading)
///   reloads every key under a changed path

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use rustc_hash::FxHashMap;

use crate::error::Result;
use crate::graphics_device::{lock_device, GraphicsDevice};
use crate::hot_reload::{CancellationToken, FileWatcher};
use crate::{engine_debug, engine_err, engine_error, engine_info, engine_warn};

// ============================================================================
// VersionedId
// ============================================================================

/// Identity of one concrete build of the GPU object behind a key
///
/// `id` is unique per store and stable across rebuilds; `generation` starts
/// at 0 and grows by one per successful rebuild. The zero value never names
/// a loaded resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct VersionedId {
    pub id: u32,
    pub generation: u32,
}

impl VersionedId {
    pub const ZERO: VersionedId = VersionedId { id: 0, generation: 0 };

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

impl fmt::Display for VersionedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.id, self.generation)
    }
}

// ============================================================================
// StoreResource
// ============================================================================

/// A GPU object kind a [`ResourceStore`] can build, rebuild and free
///
/// Building is split in two: `prepare` does file I/O and decoding without
/// touching the device, `create` issues the GPU calls.
pub trait StoreResource: Send + Sync + Sized + 'static {
    /// Caller-supplied description (source paths, sampling state, ...)
    type Definition: Clone + PartialEq + fmt::Debug + Send + Sync + 'static;

    /// CPU-side data produced by `prepare`
    type Source;

    /// Log source, e.g. "lumen::ShaderStore"
    const LOG_SOURCE: &'static str;

    /// Short kind name used for thread names
    const KIND: &'static str;

    /// Canonicalize a definition before it is stored (path cleaning)
    fn normalize(definition: &mut Self::Definition);

    /// Files whose changes should trigger a rebuild
    fn source_paths(definition: &Self::Definition) -> Vec<PathBuf>;

    /// Read and decode the sources
    fn prepare(definition: &Self::Definition) -> Result<Self::Source>;

    /// Create the GPU object
    fn create(device: &mut dyn GraphicsDevice, source: Self::Source) -> Result<Self>;

    /// Free every GPU handle owned by the object
    fn destroy(&self, device: &mut dyn GraphicsDevice);
}

// ============================================================================
// LoadedResource
// ============================================================================

struct LoadedResource<R: StoreResource> {
    versioned_id: VersionedId,
    live: Arc<R>,
    /// Previous generation, freed by the next successful rebuild
    intermediate: Option<Arc<R>>,
    definition: R::Definition,
    /// Source paths the watcher accepted for this key
    watched: Vec<PathBuf>,
}

// ============================================================================
// ResourceStore
// ============================================================================

/// Callback run with the key of every unloaded resource
type UnloadHook = Box<dyn Fn(&str) + Send + Sync>;

pub struct ResourceStore<R: StoreResource> {
    graphics_device: Arc<Mutex<dyn GraphicsDevice>>,
    resources: RwLock<FxHashMap<String, LoadedResource<R>>>,
    next_id: AtomicU32,
    watcher: Arc<FileWatcher<String>>,
    hot_reload: Mutex<Option<CancellationToken>>,
    unload_hooks: Mutex<Vec<UnloadHook>>,
}

impl<R: StoreResource> ResourceStore<R> {
    /// Create an empty store building objects on `graphics_device`
    pub fn new(graphics_device: Arc<Mutex<dyn GraphicsDevice>>) -> Self {
        Self {
            graphics_device,
            resources: RwLock::new(FxHashMap::default()),
            next_id: AtomicU32::new(1),
            watcher: Arc::new(FileWatcher::new()),
            hot_reload: Mutex::new(None),
            unload_hooks: Mutex::new(Vec::new()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, FxHashMap<String, LoadedResource<R>>> {
        self.resources.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, FxHashMap<String, LoadedResource<R>>> {
        self.resources.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn hot_reload_slot(&self) -> MutexGuard<'_, Option<CancellationToken>> {
        self.hot_reload.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ===== LOADING =====

    /// Build the object for `key`, or rebuild it if `key` is already loaded
    ///
    /// A rebuild keeps the id and bumps the generation. A failed build leaves
    /// the store exactly as it was: nothing registered for a new key, the
    /// previous object and definition kept for an existing one.
    ///
    /// # Returns
    ///
    /// The versioned id now served under `key`
    ///
    /// # Errors
    ///
    /// `IoError` for unreadable sources, `BuildFailed` for compile, link or
    /// decode failures.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let id = shaders.load("sprite", ShaderProgramDefinition::new("sprite.vert", "sprite.frag"))?;
    /// assert_eq!(id.generation, 0);
    /// ```
    pub fn load(&self, key: impl Into<String>, mut definition: R::Definition) -> Result<VersionedId> {
        let key = key.into();
        R::normalize(&mut definition);

        let mut resources = self.write();
        if resources.contains_key(&key) {
            return self.rebuild(&mut resources, &key, Some(definition));
        }

        let object = self.build(&key, &definition)?;
        let versioned_id = VersionedId {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            generation: 0,
        };
        let watched = self.watch_sources(&key, &definition);
        resources.insert(key.clone(), LoadedResource {
            versioned_id,
            live: Arc::new(object),
            intermediate: None,
            definition,
            watched,
        });

        engine_debug!(R::LOG_SOURCE, "Loaded '{}' as {}", key, versioned_id);
        Ok(versioned_id)
    }

    /// Load several definitions in order, stopping at the first failure
    pub fn load_all<I, K>(&self, definitions: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, R::Definition)>,
        K: Into<String>,
    {
        for (key, definition) in definitions {
            self.load(key, definition)?;
        }
        Ok(())
    }

    /// Rebuild `key` from its stored definition
    ///
    /// # Errors
    ///
    /// `NotLoaded` for an unknown key, otherwise the build error; on error
    /// the current generation keeps serving.
    pub fn reload(&self, key: &str) -> Result<VersionedId> {
        let mut resources = self.write();
        self.rebuild(&mut resources, key, None)
    }

    fn build(&self, key: &str, definition: &R::Definition) -> Result<R> {
        let result = R::prepare(definition).and_then(|source| {
            let mut device = lock_device(&self.graphics_device);
            R::create(&mut *device, source)
        });
        if let Err(err) = &result {
            engine_error!(R::LOG_SOURCE, "Failed to build '{}': {}", key, err);
        }
        result
    }

    fn rebuild(
        &self,
        resources: &mut FxHashMap<String, LoadedResource<R>>,
        key: &str,
        new_definition: Option<R::Definition>,
    ) -> Result<VersionedId> {
        let Some(entry) = resources.get_mut(key) else {
            return Err(engine_err!(R::LOG_SOURCE, NotLoaded, "{}", key));
        };

        let object = self.build(key, new_definition.as_ref().unwrap_or(&entry.definition))?;

        if let Some(retired) = entry.intermediate.take() {
            let mut device = lock_device(&self.graphics_device);
            retired.destroy(&mut *device);
        }
        entry.intermediate = Some(std::mem::replace(&mut entry.live, Arc::new(object)));
        entry.versioned_id.generation += 1;

        if let Some(definition) = new_definition {
            if definition != entry.definition {
                self.unwatch_sources(key, &entry.watched);
                entry.watched = self.watch_sources(key, &definition);
                entry.definition = definition;
            }
        }

        engine_debug!(R::LOG_SOURCE, "Rebuilt '{}' as {}", key, entry.versioned_id);
        Ok(entry.versioned_id)
    }

    // ===== UNLOADING =====

    /// Free the live and intermediate objects of `key` and drop its watches
    ///
    /// # Errors
    ///
    /// `NotLoaded` if `key` is unknown.
    pub fn unload(&self, key: &str) -> Result<()> {
        let removed = self.write().remove(key);
        match removed {
            Some(entry) => {
                self.release(key, entry);
                Ok(())
            }
            None => Err(engine_err!(R::LOG_SOURCE, NotLoaded, "{}", key)),
        }
    }

    /// Unload every key
    pub fn unload_all(&self) {
        let drained: Vec<_> = self.write().drain().collect();
        for (key, entry) in drained {
            self.release(&key, entry);
        }
    }

    /// Run `hook` with the key of every resource unloaded from now on
    ///
    /// Hooks run after the GPU objects are freed, with no store lock held, so
    /// they may resolve keys or take the device.
    pub fn on_unload(&self, hook: impl Fn(&str) + Send + Sync + 'static) {
        self.unload_hooks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Box::new(hook));
    }

    fn release(&self, key: &str, entry: LoadedResource<R>) {
        self.unwatch_sources(key, &entry.watched);
        {
            let mut device = lock_device(&self.graphics_device);
            entry.live.destroy(&mut *device);
            if let Some(intermediate) = &entry.intermediate {
                intermediate.destroy(&mut *device);
            }
        }
        engine_debug!(R::LOG_SOURCE, "Unloaded '{}' ({})", key, entry.versioned_id);
        for hook in self.unload_hooks.lock().unwrap_or_else(PoisonError::into_inner).iter() {
            hook(key);
        }
    }

    // ===== WATCHES =====

    fn source_paths(definition: &R::Definition) -> Vec<PathBuf> {
        let mut paths = R::source_paths(definition);
        paths.sort();
        paths.dedup();
        paths
    }

    fn watch_sources(&self, key: &str, definition: &R::Definition) -> Vec<PathBuf> {
        Self::source_paths(definition)
            .into_iter()
            .filter(|path| match self.watcher.add(path, key.to_string()) {
                Ok(()) => true,
                Err(err) => {
                    engine_warn!(R::LOG_SOURCE, "'{}' will not hot reload: {}", key, err);
                    false
                }
            })
            .collect()
    }

    fn unwatch_sources(&self, key: &str, watched: &[PathBuf]) {
        for path in watched {
            if let Err(err) = self.watcher.remove(path, &key.to_string()) {
                crate::engine_internal_error!(R::LOG_SOURCE, "watch bookkeeping for '{}': {}", key, err);
            }
        }
    }

    // ===== ACCESS =====

    /// Current versioned id and live object of `key`
    ///
    /// `None` is the not-found result; every caller handles it explicitly.
    /// Takes the shared lock and clones one `Arc`, nothing else.
    pub fn resolve(&self, key: &str) -> Option<(VersionedId, Arc<R>)> {
        self.read()
            .get(key)
            .map(|entry| (entry.versioned_id, entry.live.clone()))
    }

    /// Current versioned id of `key`
    pub fn versioned_id(&self, key: &str) -> Option<VersionedId> {
        self.read().get(key).map(|entry| entry.versioned_id)
    }

    /// Stored (normalized) definition of `key`
    pub fn definition(&self, key: &str) -> Option<R::Definition> {
        self.read().get(key).map(|entry| entry.definition.clone())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.read().contains_key(key)
    }

    /// Number of loaded keys
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Loaded keys, in no particular order
    pub fn keys(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    // ===== HOT RELOADING =====

    /// Start the background watch loop for this store
    ///
    /// The loop runs on its own thread until `cancel` (or a parent of it) is
    /// cancelled, [`stop_hot_reloading`](Self::stop_hot_reloading) is called
    /// or the store is dropped. Reload failures are logged as warnings and
    /// never stop the loop.
    ///
    /// # Errors
    ///
    /// `AlreadyRunning` if hot reloading is already active on this store.
    pub fn start_hot_reloading(self: &Arc<Self>, cancel: &CancellationToken) -> Result<()> {
        let token = {
            let mut slot = self.hot_reload_slot();
            if slot.is_some() {
                return Err(engine_err!(R::LOG_SOURCE, AlreadyRunning, "hot reloading already started"));
            }
            let token = cancel.child_token();
            *slot = Some(token.clone());
            token
        };

        let store = Arc::downgrade(self);
        let watcher = self.watcher.clone();
        let loop_token = token.clone();
        let spawned = std::thread::Builder::new()
            .name(format!("lumen-{}-hot-reload", R::KIND))
            .spawn(move || Self::watch_loop(store, watcher, loop_token));

        if let Err(err) = spawned {
            self.hot_reload_slot().take();
            return Err(engine_err!(R::LOG_SOURCE, BackendError, "spawn hot reload thread: {}", err));
        }
        engine_info!(R::LOG_SOURCE, "Hot reloading started");
        Ok(())
    }

    fn watch_loop(store: Weak<Self>, watcher: Arc<FileWatcher<String>>, token: CancellationToken) {
        let result = watcher.watch(&token, |key| {
            let Some(store) = store.upgrade() else {
                token.cancel();
                return;
            };
            match store.reload(key) {
                Ok(versioned_id) => engine_info!(R::LOG_SOURCE, "Hot reloaded '{}' as {}", key, versioned_id),
                Err(err) => engine_warn!(R::LOG_SOURCE,
                    "Hot reload of '{}' failed, previous generation keeps serving: {}", key, err),
            }
        });
        if let Err(err) = result {
            engine_warn!(R::LOG_SOURCE, "Hot reload loop ended: {}", err);
        }
        // A slot holding a live token belongs to a loop started after this one
        token.cancel();
        if let Some(store) = store.upgrade() {
            let mut slot = store.hot_reload_slot();
            if slot.as_ref().is_some_and(CancellationToken::is_cancelled) {
                *slot = None;
            }
        }
    }

    /// Stop the watch loop, if any
    pub fn stop_hot_reloading(&self) {
        if let Some(token) = self.hot_reload_slot().take() {
            token.cancel();
            engine_info!(R::LOG_SOURCE, "Hot reloading stopped");
        }
    }

    /// Whether a watch loop has been started and not stopped
    pub fn is_hot_reloading(&self) -> bool {
        self.hot_reload_slot().is_some()
    }

    /// Whether the watch loop has armed its OS watcher
    pub fn is_watching(&self) -> bool {
        self.watcher.is_watching()
    }
}

impl<R: StoreResource> Drop for ResourceStore<R> {
    fn drop(&mut self) {
        self.stop_hot_reloading();
        self.unload_all();
    }
}

#[cfg(test)]
#[path = "resource_store_tests.rs"]
mod tests;
