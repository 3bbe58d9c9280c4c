//! The variant registry and its per-class cache.
//!
//! [`VariantRegistry`] answers "which variants apply to this class" once per
//! class and caches the answer. The cache lives in the registry instance,
//! not in process-global state; [`VariantRegistry::invalidate`] must be
//! called whenever the host configuration changes (and between isolated
//! tests) so stale variant sets do not leak.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use searchsync_core::{HostSchema, Record, RecordClass, Result, VariantKey};

use crate::config::VariantConfig;
use crate::subsites::SubsiteVariant;
use crate::variant::{SearchVariant, VariantOutcome};
use crate::versioned::VersionedVariant;

/// The variants applicable to one record class, in registration order.
///
/// Cheap to clone (Arc internals).
#[derive(Clone, Default)]
pub struct VariantSet(Arc<[Arc<dyn SearchVariant>]>);

impl VariantSet {
    /// Number of applicable variants.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if no variant applies.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates the variants in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn SearchVariant>> {
        self.0.iter()
    }

    /// Names of the variants, in order.
    pub fn names(&self) -> Vec<String> {
        self.0.iter().map(|v| v.name().to_string()).collect()
    }

    /// Union of the fields tracked by every variant.
    pub fn tracked_fields(&self) -> Vec<String> {
        self.0.iter().flat_map(|v| v.tracked_fields()).collect()
    }
}

impl fmt::Debug for VariantSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.iter().map(|v| v.name())).finish()
    }
}

/// One concrete document scope produced by expanding a record.
#[derive(Debug, Clone, PartialEq)]
pub struct Expansion {
    /// Variant coordinates of the document
    pub key: VariantKey,
    /// Record view to index, or `None` if the document must not exist
    pub view: Option<Record>,
}

impl Expansion {
    /// Returns `true` if a document should exist for this scope.
    pub fn is_present(&self) -> bool {
        self.view.is_some()
    }
}

struct Inner {
    strategies: Vec<Arc<dyn SearchVariant>>,
    cache: HashMap<RecordClass, VariantSet>,
}

/// Registry of variant strategies with a per-class applicability cache.
pub struct VariantRegistry {
    host: Arc<dyn HostSchema>,
    inner: RwLock<Inner>,
}

impl VariantRegistry {
    /// Creates an empty registry probing `host` for capabilities.
    pub fn new(host: Arc<dyn HostSchema>) -> Self {
        Self {
            host,
            inner: RwLock::new(Inner {
                strategies: Vec::new(),
                cache: HashMap::new(),
            }),
        }
    }

    /// Creates a registry with the built-in variants enabled by `config`.
    pub fn from_config(host: Arc<dyn HostSchema>, config: &VariantConfig) -> Self {
        let registry = Self::new(host);
        if config.versioned {
            registry.register(Arc::new(VersionedVariant::with_published_field(
                &config.published_field,
            )));
        }
        if config.subsites {
            registry.register(Arc::new(SubsiteVariant::with_subsite_field(
                &config.subsite_field,
            )));
        }
        registry
    }

    /// The host schema this registry probes.
    pub fn host(&self) -> &Arc<dyn HostSchema> {
        &self.host
    }

    /// Registers a strategy and invalidates the cache.
    pub fn register(&self, variant: Arc<dyn SearchVariant>) {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        tracing::debug!(variant = variant.name(), "registering search variant");
        inner.strategies.push(variant);
        inner.cache.clear();
    }

    /// The registered strategy named `name`, whatever classes it applies to.
    pub fn strategy(&self, name: &str) -> Option<Arc<dyn SearchVariant>> {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .strategies
            .iter()
            .find(|v| v.name() == name)
            .cloned()
    }

    /// Drops every cached variant set.
    ///
    /// Runs under the write lock: readers see either the full old cache or
    /// an empty one, never a partial clear.
    pub fn invalidate(&self) {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner.cache.clear();
        tracing::debug!("variant cache invalidated");
    }

    /// Number of classes with a cached variant set.
    pub fn cached_classes(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .cache
            .len()
    }

    /// The variants that apply to `class`, computed once and cached.
    pub fn variants_for(&self, class: &RecordClass) -> VariantSet {
        {
            let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
            if let Some(set) = inner.cache.get(class) {
                return set.clone();
            }
        }

        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        if let Some(set) = inner.cache.get(class) {
            return set.clone();
        }
        let applicable: Vec<Arc<dyn SearchVariant>> = inner
            .strategies
            .iter()
            .filter(|v| v.applies_to(class, self.host.as_ref()))
            .cloned()
            .collect();
        let set = VariantSet(applicable.into());
        tracing::trace!(class = %class, variants = ?set, "resolved variants");
        inner.cache.insert(class.clone(), set.clone());
        set
    }

    /// Expands a record into every variant scope it occupies.
    ///
    /// Applicable variants combine as a cartesian product in registration
    /// order. A scope is present only if every component is present; each
    /// variant sees the view produced by the ones before it.
    pub fn expand(&self, record: &Record) -> Result<Vec<Expansion>> {
        let variants = self.variants_for(&record.class);
        let mut scopes = vec![Expansion {
            key: VariantKey::empty(),
            view: Some(record.clone()),
        }];

        for variant in variants.iter() {
            let mut next = Vec::with_capacity(scopes.len() * 2);
            for scope in scopes {
                let basis = scope.view.as_ref().unwrap_or(record);
                for outcome in variant.apply(basis)? {
                    let key = scope.key.with(variant.name(), outcome.value());
                    let view = match (outcome, scope.view.is_some()) {
                        (VariantOutcome::Present { view, .. }, true) => Some(view),
                        _ => None,
                    };
                    next.push(Expansion { key, view });
                }
            }
            scopes = next;
        }

        Ok(scopes)
    }
}

impl fmt::Debug for VariantRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        f.debug_struct("VariantRegistry")
            .field(
                "strategies",
                &inner.strategies.iter().map(|v| v.name()).collect::<Vec<_>>(),
            )
            .field("cached_classes", &inner.cache.len())
            .finish()
    }
}
