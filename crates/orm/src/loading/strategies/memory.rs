//! In-memory loader strategies over a shared record store
//!
//! [`RelationStore`] keeps records per model in insertion order and is the
//! record source the reference strategies fetch from. Hosts backed by a real
//! database implement [`LoaderStrategy`](super::LoaderStrategy) themselves;
//! these implementations define the expected slotting, ordering, and
//! deduplication behavior and carry the test and bench fixtures.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value as JsonValue;

use super::{LoaderStrategy, StrategyRegistry};
use crate::error::{PreloadError, PreloadResult};
use crate::loading::loader::Loader;
use crate::loading::scope::PreloadScope;
use crate::record::{Record, UniqueRecords};
use crate::relationships::metadata::{RelationshipKind, RelationshipMetadata};

/// Thread-safe in-memory record store keyed by model name.
///
/// Cloning yields another handle to the same tables. Records keep their
/// insertion order per model, which is the order loaders scan them in.
#[derive(Debug, Clone, Default)]
pub struct RelationStore {
    tables: Arc<DashMap<String, Vec<Arc<Record>>>>,
}

impl RelationStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            tables: Arc::new(DashMap::new()),
        }
    }

    /// Insert a record under its model name
    pub fn insert(&self, record: Record) -> Arc<Record> {
        let model = record.model().to_string();
        let record = Arc::new(record);
        self.tables
            .entry(model)
            .or_default()
            .push(Arc::clone(&record));
        record
    }

    /// Insert a record built from a JSON object of column values
    pub fn insert_value(&self, model: &str, value: JsonValue) -> PreloadResult<Arc<Record>> {
        Ok(self.insert(Record::from_value(model, value)?))
    }

    /// All records of a model, in insertion order
    pub fn records_of(&self, model: &str) -> Vec<Arc<Record>> {
        self.tables
            .get(model)
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    /// The first record of a model whose column equals the value
    pub fn find_by(&self, model: &str, column: &str, value: &JsonValue) -> Option<Arc<Record>> {
        self.tables
            .get(model)?
            .iter()
            .find(|record| record.attribute(column) == Some(value))
            .cloned()
    }

    /// Number of records stored for a model
    pub fn count(&self, model: &str) -> usize {
        self.tables
            .get(model)
            .map(|records| records.len())
            .unwrap_or(0)
    }

    /// The model names with at least one record
    pub fn models(&self) -> Vec<String> {
        self.tables.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Build a strategy registry covering every relationship kind with the
    /// in-memory strategies over this store
    pub fn standard_strategies(&self) -> StrategyRegistry {
        let registry = StrategyRegistry::new();

        let has_style: Arc<HasManyLoader> = Arc::new(HasManyLoader::new(self.clone()));
        registry.register(
            RelationshipKind::BelongsTo,
            Arc::new(BelongsToLoader::new(self.clone())),
        );
        registry.register(RelationshipKind::HasOne, has_style.clone());
        registry.register(RelationshipKind::HasMany, has_style.clone());
        registry.register(RelationshipKind::MorphOne, has_style.clone());
        registry.register(RelationshipKind::MorphMany, has_style);
        registry.register(
            RelationshipKind::MorphTo,
            Arc::new(MorphToLoader::new(self.clone())),
        );
        registry.register(
            RelationshipKind::ManyToMany,
            Arc::new(ManyToManyLoader::new(self.clone())),
        );

        registry
    }
}

/// Loads belongs-to associations: owner foreign key against the target's
/// local key. One record at most per owner.
#[derive(Debug, Clone)]
pub struct BelongsToLoader {
    store: RelationStore,
}

impl BelongsToLoader {
    pub fn new(store: RelationStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl LoaderStrategy for BelongsToLoader {
    async fn run(
        &self,
        target: &str,
        owners: &[Arc<Record>],
        metadata: &RelationshipMetadata,
        scope: &PreloadScope,
    ) -> PreloadResult<Loader> {
        let mut unique = UniqueRecords::new();

        for owner in owners {
            let matched = owner
                .attribute(&metadata.foreign_key)
                .filter(|fk| !fk.is_null())
                .and_then(|fk| self.store.find_by(target, &metadata.local_key, fk))
                .filter(|record| scope.matches(record))
                .map(|record| vec![record])
                .unwrap_or_default();

            unique.extend(&matched);
            owner.fill_association(&metadata.name, matched);
        }

        Ok(Loader::new(
            metadata.clone(),
            target,
            owners.to_vec(),
            unique.into_vec(),
        ))
    }
}

/// Loads the has-style kinds: target foreign key against the owner's local
/// key. Serves has-one, has-many, morph-one, and morph-many; the morph kinds
/// additionally match the target's type column against the owner's model.
/// To-one kinds keep only the first match per owner.
#[derive(Debug, Clone)]
pub struct HasManyLoader {
    store: RelationStore,
}

impl HasManyLoader {
    pub fn new(store: RelationStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl LoaderStrategy for HasManyLoader {
    async fn run(
        &self,
        target: &str,
        owners: &[Arc<Record>],
        metadata: &RelationshipMetadata,
        scope: &PreloadScope,
    ) -> PreloadResult<Loader> {
        let table = self.store.records_of(target);
        let mut unique = UniqueRecords::new();

        for owner in owners {
            let mut matched = Vec::new();

            if let Some(local) = owner
                .attribute(&metadata.local_key)
                .filter(|value| !value.is_null())
            {
                for record in &table {
                    if record.attribute(&metadata.foreign_key) != Some(local) {
                        continue;
                    }
                    if let Some(poly) = &metadata.polymorphic {
                        if record.attribute_str(&poly.type_column) != Some(owner.model()) {
                            continue;
                        }
                    }
                    if !scope.matches(record) {
                        continue;
                    }
                    matched.push(Arc::clone(record));
                    if !metadata.kind.is_collection() {
                        break;
                    }
                }
            }

            unique.extend(&matched);
            owner.fill_association(&metadata.name, matched);
        }

        Ok(Loader::new(
            metadata.clone(),
            target,
            owners.to_vec(),
            unique.into_vec(),
        ))
    }
}

/// Loads morph-to associations for one already-resolved target model: the
/// owner's id column against the target's local key. Owners with a null id
/// column get an empty result.
#[derive(Debug, Clone)]
pub struct MorphToLoader {
    store: RelationStore,
}

impl MorphToLoader {
    pub fn new(store: RelationStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl LoaderStrategy for MorphToLoader {
    async fn run(
        &self,
        target: &str,
        owners: &[Arc<Record>],
        metadata: &RelationshipMetadata,
        scope: &PreloadScope,
    ) -> PreloadResult<Loader> {
        let poly = metadata.polymorphic.as_ref().ok_or_else(|| {
            PreloadError::configuration(format!(
                "morph-to association '{}' is missing its polymorphic configuration",
                metadata.name
            ))
        })?;
        let mut unique = UniqueRecords::new();

        for owner in owners {
            let matched = owner
                .attribute(&poly.id_column)
                .filter(|fk| !fk.is_null())
                .and_then(|fk| self.store.find_by(target, &metadata.local_key, fk))
                .filter(|record| scope.matches(record))
                .map(|record| vec![record])
                .unwrap_or_default();

            unique.extend(&matched);
            owner.fill_association(&metadata.name, matched);
        }

        Ok(Loader::new(
            metadata.clone(),
            target,
            owners.to_vec(),
            unique.into_vec(),
        ))
    }
}

/// Loads many-to-many associations through a pivot model: owner local key to
/// the pivot's local column, pivot foreign column to the target's primary
/// key (`id`). Matches keep pivot-row order per owner.
#[derive(Debug, Clone)]
pub struct ManyToManyLoader {
    store: RelationStore,
}

impl ManyToManyLoader {
    pub fn new(store: RelationStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl LoaderStrategy for ManyToManyLoader {
    async fn run(
        &self,
        target: &str,
        owners: &[Arc<Record>],
        metadata: &RelationshipMetadata,
        scope: &PreloadScope,
    ) -> PreloadResult<Loader> {
        let pivot = metadata.pivot.as_ref().ok_or_else(|| {
            PreloadError::configuration(format!(
                "many-to-many association '{}' is missing its pivot configuration",
                metadata.name
            ))
        })?;
        let pivot_rows = self.store.records_of(&pivot.model);
        let targets = self.store.records_of(target);
        let mut unique = UniqueRecords::new();

        for owner in owners {
            let mut matched = Vec::new();

            if let Some(local) = owner
                .attribute(&metadata.local_key)
                .filter(|value| !value.is_null())
            {
                for row in &pivot_rows {
                    if row.attribute(&pivot.local_key) != Some(local) {
                        continue;
                    }
                    let Some(target_id) = row
                        .attribute(&pivot.foreign_key)
                        .filter(|value| !value.is_null())
                    else {
                        continue;
                    };
                    let Some(record) = targets
                        .iter()
                        .find(|record| record.attribute("id") == Some(target_id))
                    else {
                        continue;
                    };
                    if !scope.matches(record) {
                        continue;
                    }
                    matched.push(Arc::clone(record));
                }
            }

            unique.extend(&matched);
            owner.fill_association(&metadata.name, matched);
        }

        Ok(Loader::new(
            metadata.clone(),
            target,
            owners.to_vec(),
            unique.into_vec(),
        ))
    }
}
