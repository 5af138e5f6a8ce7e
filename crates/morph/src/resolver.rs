// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 morph contributors

//! Resolver: the cache-plus-factory façade all mapper lookups flow through.
//!
//! The resolver guarantees that expensive synthesis happens at most once
//! per `(source, destination)` pair. A hit is a lock-free read; a miss
//! builds from the registered provider *outside* any cache lock and
//! publishes via insert-if-absent, so racing callers may build duplicates
//! but exactly one instance is ever published and all callers observe it.
//! A key is either absent or maps to one fully formed mapper — never a
//! half-built entry.
//!
//! Registering a descriptor for (S, D) also registers the derived
//! providers its member sites commonly need: the optional-value adapter
//! keys and the element-wise `Vec<S> -> Vec<D>` key.
//!
//! Lifecycle: create once, register pairs, share by reference. There is
//! no teardown; published mappers live as long as the resolver.

use crate::adapters;
use crate::descriptor::{MappingDescriptor, ShapeKind};
use crate::error::MapError;
use crate::synth::{self, CompiledMapper, ErasedMapper, SynthesisMode};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::any::{type_name, Any, TypeId};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Identity of a compiled mapper: source and destination type ids.
pub type PairKey = (TypeId, TypeId);

/// Resolver configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolverOptions {
    pub mode: SynthesisMode,
}

/// One published mapper, held both typed (for the public surface) and
/// erased (for delegated member sites).
#[derive(Clone)]
struct CacheEntry {
    typed: Arc<dyn Any + Send + Sync>,
    erased: Arc<dyn ErasedMapper>,
}

impl CacheEntry {
    fn new<S: 'static, D: 'static>(mapper: Arc<CompiledMapper<S, D>>) -> Self {
        Self {
            typed: Arc::clone(&mapper) as Arc<dyn Any + Send + Sync>,
            erased: mapper,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProviderKind {
    Descriptor,
    Adapter,
}

impl ProviderKind {
    fn label(self) -> &'static str {
        match self {
            ProviderKind::Descriptor => "pair",
            ProviderKind::Adapter => "adapter",
        }
    }
}

type BuildFn = Arc<dyn Fn(&Resolver) -> Result<CacheEntry, MapError> + Send + Sync>;

struct Provider {
    kind: ProviderKind,
    build: BuildFn,
}

/// Cache-plus-factory for compiled mappers.
pub struct Resolver {
    mappers: DashMap<PairKey, CacheEntry>,
    providers: DashMap<PairKey, Provider>,
    options: ResolverOptions,
    builds: AtomicU64,
    names: AtomicU64,
}

impl Resolver {
    pub fn new() -> Self {
        Self::with_options(ResolverOptions::default())
    }

    pub fn with_options(options: ResolverOptions) -> Self {
        Self {
            mappers: DashMap::new(),
            providers: DashMap::new(),
            options,
            builds: AtomicU64::new(0),
            names: AtomicU64::new(0),
        }
    }

    pub fn options(&self) -> ResolverOptions {
        self.options
    }

    /// Number of mappers published so far. Lost races do not count, so
    /// this is exactly one per resolved key.
    pub fn build_count(&self) -> u64 {
        self.builds.load(Ordering::Relaxed)
    }

    /// Register the mapping descriptor for (S, D), together with the
    /// derived optional-adapter and sequence providers. Registration is
    /// first-wins: an existing provider for a key is kept.
    pub fn register<S: 'static, D: 'static>(&self, descriptor: MappingDescriptor<S, D>) {
        let source_shape = descriptor.source_shape();
        let source_name = type_name::<S>();
        let dest_name = type_name::<D>();
        let key = (TypeId::of::<S>(), TypeId::of::<D>());
        let desc = Arc::new(descriptor);

        {
            let desc = Arc::clone(&desc);
            self.insert_provider(
                key,
                ProviderKind::Descriptor,
                Arc::new(move |resolver: &Resolver| {
                    let mapper =
                        synth::synthesize(&desc, resolver.options.mode, resolver.next_name())?;
                    Ok(CacheEntry::new(Arc::new(mapper)))
                }),
                source_name,
                dest_name,
            );
        }

        let optional_key = (TypeId::of::<Option<S>>(), TypeId::of::<Option<D>>());
        if source_shape == ShapeKind::Reference {
            // Reference shapes get the synthesized absent-aware form so
            // the hook-then-short-circuit ordering holds.
            let desc = Arc::clone(&desc);
            self.insert_provider(
                optional_key,
                ProviderKind::Descriptor,
                Arc::new(move |resolver: &Resolver| {
                    let mapper = synth::synthesize_nullable(
                        &desc,
                        resolver.options.mode,
                        resolver.next_name(),
                    )?;
                    Ok(CacheEntry::new(Arc::new(mapper)))
                }),
                type_name::<Option<S>>(),
                type_name::<Option<D>>(),
            );
        } else {
            self.insert_provider(
                optional_key,
                ProviderKind::Adapter,
                Arc::new(|_resolver: &Resolver| {
                    Ok(CacheEntry::new(Arc::new(
                        adapters::optional_to_optional::<S, D>(),
                    )))
                }),
                type_name::<Option<S>>(),
                type_name::<Option<D>>(),
            );
        }

        self.insert_provider(
            (TypeId::of::<Option<S>>(), TypeId::of::<D>()),
            ProviderKind::Adapter,
            Arc::new(|_resolver: &Resolver| {
                Ok(CacheEntry::new(Arc::new(
                    adapters::optional_to_required::<S, D>(),
                )))
            }),
            type_name::<Option<S>>(),
            dest_name,
        );
        self.insert_provider(
            (TypeId::of::<S>(), TypeId::of::<Option<D>>()),
            ProviderKind::Adapter,
            Arc::new(|_resolver: &Resolver| {
                Ok(CacheEntry::new(Arc::new(
                    adapters::required_to_optional::<S, D>(),
                )))
            }),
            source_name,
            type_name::<Option<D>>(),
        );
        self.insert_provider(
            (TypeId::of::<Vec<S>>(), TypeId::of::<Vec<D>>()),
            ProviderKind::Adapter,
            Arc::new(|_resolver: &Resolver| {
                Ok(CacheEntry::new(Arc::new(adapters::sequence::<S, D>())))
            }),
            type_name::<Vec<S>>(),
            type_name::<Vec<D>>(),
        );
    }

    /// Look up or build the mapper for (S, D). `Ok(None)` means no
    /// provider is registered for the key.
    pub fn get<S: 'static, D: 'static>(
        &self,
    ) -> Result<Option<Arc<CompiledMapper<S, D>>>, MapError> {
        let key = (TypeId::of::<S>(), TypeId::of::<D>());
        match self.resolve_entry(key, type_name::<S>(), type_name::<D>())? {
            None => Ok(None),
            Some(entry) => match entry.typed.downcast::<CompiledMapper<S, D>>() {
                Ok(typed) => Ok(Some(typed)),
                // The key ties every cache entry to its concrete pair type.
                Err(_) => unreachable!("cache entry matches its key"),
            },
        }
    }

    /// [`Self::get`], but an unresolvable key is a hard error. Delegated
    /// member sites use this so a nested configuration failure surfaces
    /// at the outer pair's first invocation with the pair named.
    pub fn get_with_verify<S: 'static, D: 'static>(
        &self,
    ) -> Result<Arc<CompiledMapper<S, D>>, MapError> {
        self.get::<S, D>()?.ok_or_else(|| MapError::UnresolvedPair {
            source: type_name::<S>(),
            dest: type_name::<D>(),
        })
    }

    /// Erased lookup for delegated member sites.
    pub(crate) fn erased_with_verify(
        &self,
        key: PairKey,
        source: &'static str,
        dest: &'static str,
    ) -> Result<Arc<dyn ErasedMapper>, MapError> {
        match self.resolve_entry(key, source, dest)? {
            Some(entry) => Ok(entry.erased),
            None => Err(MapError::UnresolvedPair { source, dest }),
        }
    }

    fn resolve_entry(
        &self,
        key: PairKey,
        source: &'static str,
        dest: &'static str,
    ) -> Result<Option<CacheEntry>, MapError> {
        if let Some(entry) = self.mappers.get(&key) {
            return Ok(Some(entry.value().clone()));
        }
        let (kind, build) = match self.providers.get(&key) {
            Some(provider) => (provider.kind, Arc::clone(&provider.build)),
            None => return Ok(None),
        };
        // Build outside the cache lock; a racing caller may build the
        // same pair, and the first insert wins below.
        let entry = build(self)?;
        let published = match self.mappers.entry(key) {
            Entry::Occupied(existing) => {
                log::debug!("[resolver] race lost {} -> {}, adopting winner", source, dest);
                existing.get().clone()
            }
            Entry::Vacant(slot) => {
                let total = self.builds.fetch_add(1, Ordering::Relaxed) + 1;
                log::debug!(
                    "[resolver] publish {} {} -> {} (builds={})",
                    kind.label(),
                    source,
                    dest,
                    total
                );
                slot.insert(entry.clone());
                entry
            }
        };
        Ok(Some(published))
    }

    fn insert_provider(
        &self,
        key: PairKey,
        kind: ProviderKind,
        build: BuildFn,
        source: &'static str,
        dest: &'static str,
    ) {
        match self.providers.entry(key) {
            Entry::Occupied(_) => {
                log::debug!("[resolver] register skip (exists) {} -> {}", source, dest);
            }
            Entry::Vacant(slot) => {
                log::debug!("[resolver] register {} {} -> {}", kind.label(), source, dest);
                slot.insert(Provider { kind, build });
            }
        }
    }

    /// Sequence number for synthetic mapper names.
    pub(crate) fn next_name(&self) -> u64 {
        self.names.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}
