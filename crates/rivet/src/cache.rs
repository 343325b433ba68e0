//! Metatable Cache
//!
//! One descriptor per host type, generated on first use and shared by every
//! proxy of that type for the life of the `State`. Type-constructor
//! metatables live in a second namespace keyed by the same types.
//!
//! The cache is stored in the `State` registry under [`CACHE_KEY`]. A single
//! lock covers lookup, generation and insertion, so two threads asking for
//! the same type at once get the same descriptor.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use rivet_sdk::{Metatable, RegistryValue, State};
use rivet_types::HostType;
use rustc_hash::FxHashMap;

use crate::adaptors::type_proxy;
use crate::config::BridgeConfig;
use crate::descriptor::Descriptor;

/// Registry key holding the cache
pub const CACHE_KEY: &str = "rivet.metatable_cache";

struct CacheInner {
    config: BridgeConfig,
    regular: FxHashMap<HostType, Arc<Descriptor>>,
    types: FxHashMap<HostType, Arc<Metatable>>,
}

/// Per-`State` descriptor cache
pub struct MetatableCache {
    inner: Mutex<CacheInner>,
    /// Descriptors and type metatables generated so far
    generations: AtomicUsize,
}

impl MetatableCache {
    fn new() -> Self {
        MetatableCache {
            inner: Mutex::new(CacheInner {
                config: BridgeConfig::default(),
                regular: FxHashMap::default(),
                types: FxHashMap::default(),
            }),
            generations: AtomicUsize::new(0),
        }
    }

    /// The cache of `state`, created on first use
    ///
    /// # Panics
    ///
    /// Panics if the registry slot holds anything other than a cache; the
    /// state is corrupt and nothing it hands out can be trusted.
    pub fn of(state: &State) -> Arc<MetatableCache> {
        let entry = state.registry_get_or_insert_with(CACHE_KEY, || {
            Arc::new(MetatableCache::new()) as RegistryValue
        });
        match entry.downcast::<MetatableCache>() {
            Ok(cache) => cache,
            Err(_) => {
                tracing::warn!(key = CACHE_KEY, "registry slot holds a foreign value");
                panic!("rivet: corrupt metatable cache in registry slot {}", CACHE_KEY);
            }
        }
    }

    /// Replace the configuration; refused once anything was generated
    pub fn configure(&self, config: BridgeConfig) -> bool {
        let mut inner = self.inner.lock();
        if !inner.regular.is_empty() || !inner.types.is_empty() {
            tracing::debug!("configuration refused after first generation");
            return false;
        }
        inner.config = config;
        true
    }

    /// Active configuration
    pub fn config(&self) -> BridgeConfig {
        self.inner.lock().config.clone()
    }

    /// Descriptor for proxies of `ty`, generating it on first request
    pub fn instance_descriptor(&self, ty: &HostType) -> Arc<Descriptor> {
        let mut inner = self.inner.lock();
        if let Some(descriptor) = inner.regular.get(ty) {
            tracing::trace!(ty = %ty, "descriptor cache hit");
            return descriptor.clone();
        }
        let descriptor = Arc::new(Descriptor::generate(ty, &inner.config));
        self.generations.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            ty = %ty,
            adaptor = ?descriptor.kind(),
            fields = descriptor.members().field_count(),
            "generated descriptor"
        );
        inner.regular.insert(ty.clone(), descriptor.clone());
        descriptor
    }

    /// Metatable for constructor proxies of `ty`
    pub fn type_metatable(&self, ty: &HostType) -> Arc<Metatable> {
        let mut inner = self.inner.lock();
        if let Some(metatable) = inner.types.get(ty) {
            tracing::trace!(ty = %ty, "type metatable cache hit");
            return metatable.clone();
        }
        let metatable = Arc::new(type_proxy::metatable(ty));
        self.generations.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(ty = %ty, "generated type metatable");
        inner.types.insert(ty.clone(), metatable.clone());
        metatable
    }

    /// Number of generations performed so far
    pub fn generation_count(&self) -> usize {
        self.generations.load(Ordering::Relaxed)
    }

    /// Number of cached instance descriptors
    pub fn len(&self) -> usize {
        self.inner.lock().regular.len()
    }

    /// Whether no instance descriptor has been cached
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
