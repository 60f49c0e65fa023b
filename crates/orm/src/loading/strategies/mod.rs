//! Loader strategies - pluggable fetch logic per relationship kind
//!
//! The engine never fetches records itself; it resolves a strategy for each
//! owner group's relationship kind and delegates. Hosts swap in their own
//! strategies per kind to bind the engine to a real record source.

pub mod memory;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::{PreloadError, PreloadResult};
use crate::loading::loader::Loader;
use crate::loading::scope::PreloadScope;
use crate::record::Record;
use crate::relationships::metadata::{RelationshipKind, RelationshipMetadata};

pub use memory::{
    BelongsToLoader, HasManyLoader, ManyToManyLoader, MorphToLoader, RelationStore,
};

/// Fetch logic for one group of owners sharing a reflection and a concrete
/// target model.
///
/// A strategy loads the related records, fills each owner's association
/// slot, and returns the group's [`Loader`]. Record source failures
/// propagate unchanged.
#[async_trait]
pub trait LoaderStrategy: Send + Sync {
    async fn run(
        &self,
        target: &str,
        owners: &[Arc<Record>],
        metadata: &RelationshipMetadata,
        scope: &PreloadScope,
    ) -> PreloadResult<Loader>;
}

/// Registry mapping relationship kinds to loader strategies.
///
/// Cloning yields another handle to the same registrations. A kind without
/// a registration is an engine configuration error, never tolerated by lax
/// mode.
#[derive(Clone, Default)]
pub struct StrategyRegistry {
    strategies: Arc<DashMap<RelationshipKind, Arc<dyn LoaderStrategy>>>,
}

impl StrategyRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            strategies: Arc::new(DashMap::new()),
        }
    }

    /// Register the strategy for a relationship kind, replacing any
    /// earlier registration
    pub fn register(&self, kind: RelationshipKind, strategy: Arc<dyn LoaderStrategy>) {
        self.strategies.insert(kind, strategy);
    }

    /// Resolve the strategy for a reflection's kind
    pub fn strategy_for(
        &self,
        metadata: &RelationshipMetadata,
    ) -> PreloadResult<Arc<dyn LoaderStrategy>> {
        self.strategies
            .get(&metadata.kind)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| {
                PreloadError::configuration(format!(
                    "no loader strategy registered for {:?} (association '{}')",
                    metadata.kind, metadata.name
                ))
            })
    }

    /// The kinds with a registered strategy
    pub fn registered_kinds(&self) -> Vec<RelationshipKind> {
        self.strategies.iter().map(|entry| *entry.key()).collect()
    }

    /// Number of registered strategies
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    /// Returns true if no strategies are registered
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

impl fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrategyRegistry")
            .field("kinds", &self.registered_kinds())
            .finish()
    }
}
