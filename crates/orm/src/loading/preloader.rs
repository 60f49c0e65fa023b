//! Batch association preloading
//!
//! [`Preloader`] walks a [`PreloadSpec`] over a set of owner records, groups
//! owners per association declaration and concrete target model, runs one
//! [`LoaderStrategy`](crate::loading::strategies::LoaderStrategy) per group,
//! and recurses into nested specs over the records each level produced.
//!
//! Owners whose model does not declare a requested association normally fail
//! the whole walk. Under a polymorphic parent with lax resolution enabled
//! (see [`crate::loading::lax`]) such owners are skipped instead, which is
//! what makes heterogeneous morph-to targets preloadable with a single spec.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::{PreloadError, PreloadResult};
use crate::loading::lax::lax_enabled;
use crate::loading::loader::{GroupKey, Loader};
use crate::loading::observer::{notify_access, notify_batch, PreloadObserver};
use crate::loading::scope::PreloadScope;
use crate::loading::strategies::StrategyRegistry;
use crate::record::{Record, UniqueRecords};
use crate::relationships::metadata::RelationshipMetadata;
use crate::relationships::registry::{global_registry, TypeRegistry};
use crate::relationships::spec::PreloadSpec;

/// Batch-loads declared associations for a set of records.
///
/// Construction is cheap; the preloader borrows nothing from the records it
/// loads and can be reused across calls. Lax resolution defaults to the
/// scoped or process-wide setting and can be pinned per preloader with
/// [`lax`](Preloader::lax).
pub struct Preloader {
    registry: Arc<TypeRegistry>,
    strategies: Arc<StrategyRegistry>,
    scope: PreloadScope,
    observers: Vec<Arc<dyn PreloadObserver>>,
    lax_override: Option<bool>,
}

impl Preloader {
    /// Create a preloader over the global type registry
    pub fn new(strategies: StrategyRegistry) -> Self {
        Self::with_registry(global_registry().clone(), strategies)
    }

    /// Create a preloader over an explicit type registry
    pub fn with_registry(registry: TypeRegistry, strategies: StrategyRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            strategies: Arc::new(strategies),
            scope: PreloadScope::none(),
            observers: Vec::new(),
            lax_override: None,
        }
    }

    /// Constrain the records every loader in the walk may attach
    pub fn with_scope(mut self, scope: PreloadScope) -> Self {
        self.scope = scope;
        self
    }

    /// Register an observer notified of association accesses and batches
    pub fn with_observer(mut self, observer: Arc<dyn PreloadObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Pin lax resolution for this preloader, ignoring the scoped and
    /// process-wide settings
    pub fn lax(mut self, enabled: bool) -> Self {
        self.lax_override = Some(enabled);
        self
    }

    /// The scope applied to every loaded association
    pub fn scope(&self) -> &PreloadScope {
        &self.scope
    }

    /// The type registry reflections are resolved against
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Load every association the spec names onto the given records.
    ///
    /// Returns one [`Loader`] per (association declaration, concrete target
    /// model) group, in the order groups were first encountered. Nothing is
    /// tolerated at the root level: a record without a requested association
    /// is an error regardless of lax mode, because tolerance only applies
    /// below a polymorphic join.
    pub async fn preload(
        &self,
        records: &[Arc<Record>],
        spec: &PreloadSpec,
    ) -> PreloadResult<Vec<Loader>> {
        if records.is_empty() || spec.is_empty() {
            return Ok(Vec::new());
        }

        tracing::debug!(
            "Preloading {} association path(s) for {} record(s) (lax: {})",
            spec.len(),
            records.len(),
            self.lax_now()
        );

        self.preloaders_on(spec, records, false).await
    }

    /// Whether missing reflections are tolerated right now. An explicit
    /// override wins over the scoped and process-wide settings.
    fn lax_now(&self) -> bool {
        self.lax_override.unwrap_or_else(lax_enabled)
    }

    /// Dispatch one spec node. Boxed because list and mapping nodes recurse.
    fn preloaders_on<'a>(
        &'a self,
        spec: &'a PreloadSpec,
        owners: &'a [Arc<Record>],
        polymorphic_parent: bool,
    ) -> Pin<Box<dyn Future<Output = PreloadResult<Vec<Loader>>> + Send + 'a>> {
        Box::pin(async move {
            match spec {
                PreloadSpec::Name(name) => {
                    self.preloaders_for_one(name, owners, polymorphic_parent).await
                }
                PreloadSpec::List(items) => {
                    let mut loaders = Vec::new();
                    for item in items {
                        loaders.extend(self.preloaders_on(item, owners, polymorphic_parent).await?);
                    }
                    Ok(loaders)
                }
                PreloadSpec::Mapping(pairs) => {
                    let mut loaders = Vec::new();
                    for (name, child) in pairs {
                        loaders.extend(
                            self.preloaders_for_mapping(name, child, owners, polymorphic_parent)
                                .await?,
                        );
                    }
                    Ok(loaders)
                }
            }
        })
    }

    /// Load one association level, then recurse the child spec over the
    /// records that level produced.
    ///
    /// Parent loaders are grouped by association declaration before the
    /// recursion so that each declaration passes its own per-record
    /// resolution flag down: children of a morph-to load tolerantly when lax
    /// mode is on, children of fixed-target declarations never do.
    async fn preloaders_for_mapping(
        &self,
        name: &str,
        child: &PreloadSpec,
        owners: &[Arc<Record>],
        polymorphic_parent: bool,
    ) -> PreloadResult<Vec<Loader>> {
        let mut loaders = self.preloaders_for_one(name, owners, polymorphic_parent).await?;

        let mut groups: Vec<(RelationshipMetadata, UniqueRecords)> = Vec::new();
        for loader in &loaders {
            match groups
                .iter()
                .position(|(metadata, _)| metadata == loader.metadata())
            {
                Some(index) => groups[index].1.extend(loader.preloaded_records()),
                None => {
                    let mut unique = UniqueRecords::new();
                    unique.extend(loader.preloaded_records());
                    groups.push((loader.metadata().clone(), unique));
                }
            }
        }

        for (metadata, unique) in groups {
            let children = unique.into_vec();
            let resolves_per_record = metadata.resolves_target_per_record();
            loaders.extend(self.preloaders_on(child, &children, resolves_per_record).await?);
        }

        Ok(loaders)
    }

    /// Group the owners for one association name and run one loader per
    /// group, in first-encounter order.
    async fn preloaders_for_one(
        &self,
        name: &str,
        owners: &[Arc<Record>],
        polymorphic_parent: bool,
    ) -> PreloadResult<Vec<Loader>> {
        notify_batch(&self.observers, owners, name);

        let buckets = self.grouped_records(name, owners, polymorphic_parent)?;
        let mut loaders = Vec::with_capacity(buckets.len());

        for (key, group) in buckets {
            let strategy = self.strategies.strategy_for(&key.metadata)?;
            let loader = strategy
                .run(&key.target, &group, &key.metadata, &self.scope)
                .await?;
            tracing::debug!(
                "Loaded '{}' -> {} for {} owner(s): {} record(s)",
                name,
                key.target,
                group.len(),
                loader.preloaded_records().len()
            );
            loaders.push(loader);
        }

        Ok(loaders)
    }

    /// Bucket owners by (association declaration, concrete target model).
    ///
    /// Missing reflections are tolerated only under a polymorphic parent
    /// with lax resolution on. A morph-to owner with a null type column is
    /// always skipped silently since there is nothing to load for it.
    fn grouped_records(
        &self,
        name: &str,
        owners: &[Arc<Record>],
        polymorphic_parent: bool,
    ) -> PreloadResult<Vec<(GroupKey, Vec<Arc<Record>>)>> {
        let tolerate_missing = polymorphic_parent && self.lax_now();
        let mut buckets: Vec<(GroupKey, Vec<Arc<Record>>)> = Vec::new();

        for owner in owners {
            notify_access(&self.observers, owner, name);

            let Some(metadata) = self.registry.reflect_on_association(owner.model(), name) else {
                if tolerate_missing {
                    tracing::debug!(
                        "Skipping '{}' record without association '{}'",
                        owner.model(),
                        name
                    );
                    continue;
                }
                return Err(PreloadError::association_not_found(owner.model(), name));
            };

            let Some(target) = self.resolve_target(owner, &metadata, tolerate_missing)? else {
                continue;
            };

            match buckets
                .iter()
                .position(|(key, _)| key.metadata == metadata && key.target == target)
            {
                Some(index) => buckets[index].1.push(Arc::clone(owner)),
                None => buckets.push((GroupKey::new(metadata, target), vec![Arc::clone(owner)])),
            }
        }

        Ok(buckets)
    }

    /// The concrete target model for one owner, or `None` when the owner
    /// contributes nothing to this association level.
    fn resolve_target(
        &self,
        owner: &Arc<Record>,
        metadata: &RelationshipMetadata,
        tolerate_missing: bool,
    ) -> PreloadResult<Option<String>> {
        if !metadata.resolves_target_per_record() {
            return match metadata.target() {
                Some(target) => Ok(Some(target.to_string())),
                None => Err(PreloadError::configuration(format!(
                    "association '{}' on model '{}' declares no target model",
                    metadata.name,
                    owner.model()
                ))),
            };
        }

        let poly = metadata.polymorphic.as_ref().ok_or_else(|| {
            PreloadError::configuration(format!(
                "morph-to association '{}' on model '{}' is missing its polymorphic configuration",
                metadata.name,
                owner.model()
            ))
        })?;

        let Some(type_name) = owner
            .attribute_str(&poly.type_column)
            .filter(|type_name| !type_name.is_empty())
        else {
            return Ok(None);
        };

        if !self.registry.contains_model(type_name) {
            if tolerate_missing {
                tracing::warn!(
                    "Skipping unregistered morph target '{}' for '{}.{}'",
                    type_name,
                    owner.model(),
                    metadata.name
                );
                return Ok(None);
            }
            return Err(PreloadError::target_type_unresolved(
                owner.model(),
                &metadata.name,
                type_name,
            ));
        }

        Ok(Some(type_name.to_string()))
    }
}

impl fmt::Debug for Preloader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Preloader")
            .field("scope", &self.scope)
            .field("observers", &self.observers.len())
            .field("lax_override", &self.lax_override)
            .finish()
    }
}
