//! Owner records - the untyped row representation the preloader works over
//!
//! A [`Record`] carries a model name, a map of column values, and one
//! write-once slot per preloaded association. Slots are shared through
//! `Arc<Record>` so the same record instance can appear both in a caller's
//! result set and as a preloaded target of another record.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use serde_json::Value as JsonValue;

use crate::error::{PreloadError, PreloadResult};
use crate::loading::lax;
use crate::relationships::metadata::RelationshipMetadata;
use crate::relationships::registry::{global_registry, TypeRegistry};

/// Identity of a record: its model name plus primary key value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordKey {
    pub model: String,
    pub id: JsonValue,
}

/// Write-once container for one preloaded association result.
///
/// The first fill wins; later fills are ignored, so a record reached through
/// several parents keeps the result of whichever loader ran first.
#[derive(Debug, Default)]
pub struct AssociationSlot {
    records: OnceLock<Vec<Arc<Record>>>,
}

impl AssociationSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the preloaded records unless the slot is already filled
    pub fn fill(&self, records: Vec<Arc<Record>>) {
        let _ = self.records.set(records);
    }

    /// Returns true once the slot has been filled
    pub fn is_loaded(&self) -> bool {
        self.records.get().is_some()
    }

    /// The preloaded records, if the slot has been filled
    pub fn records(&self) -> Option<&[Arc<Record>]> {
        self.records.get().map(|records| records.as_slice())
    }
}

/// An untyped record: model name, attribute map, and preloaded associations
pub struct Record {
    model: String,
    attributes: HashMap<String, JsonValue>,
    associations: DashMap<String, AssociationSlot>,
}

impl Record {
    /// Create a record with no attributes
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            attributes: HashMap::new(),
            associations: DashMap::new(),
        }
    }

    /// Add an attribute value
    pub fn with_attribute(mut self, name: impl Into<String>, value: JsonValue) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    /// Build a record from a JSON object of column values
    pub fn from_value(model: impl Into<String>, value: JsonValue) -> PreloadResult<Self> {
        match value {
            JsonValue::Object(map) => Ok(Self {
                model: model.into(),
                attributes: map.into_iter().collect(),
                associations: DashMap::new(),
            }),
            other => Err(PreloadError::configuration(format!(
                "record attributes must be a JSON object, got {}",
                other
            ))),
        }
    }

    /// The record's model name
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Read an attribute value
    pub fn attribute(&self, name: &str) -> Option<&JsonValue> {
        self.attributes.get(name)
    }

    /// Read an attribute as a string slice
    pub fn attribute_str(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).and_then(JsonValue::as_str)
    }

    /// All attribute values
    pub fn attributes(&self) -> &HashMap<String, JsonValue> {
        &self.attributes
    }

    /// The primary key value, if present and non-null
    pub fn primary_key(&self) -> Option<&JsonValue> {
        self.attributes.get("id").filter(|id| !id.is_null())
    }

    /// The record's identity, if it has a primary key
    pub fn key(&self) -> Option<RecordKey> {
        self.primary_key().map(|id| RecordKey {
            model: self.model.clone(),
            id: id.clone(),
        })
    }

    /// Store a preloaded association result. The first fill of a name wins;
    /// later fills of the same name are ignored.
    pub fn fill_association(&self, name: &str, records: Vec<Arc<Record>>) {
        self.associations
            .entry(name.to_string())
            .or_default()
            .fill(records);
    }

    /// Returns true once an association has been preloaded
    pub fn association_loaded(&self, name: &str) -> bool {
        self.associations
            .get(name)
            .map(|slot| slot.is_loaded())
            .unwrap_or(false)
    }

    /// The preloaded records for an association, if it has been loaded
    pub fn loaded_association(&self, name: &str) -> Option<Vec<Arc<Record>>> {
        self.associations
            .get(name)
            .and_then(|slot| slot.records().map(|records| records.to_vec()))
    }

    /// The single preloaded record for a to-one association
    pub fn loaded_one(&self, name: &str) -> Option<Arc<Record>> {
        self.loaded_association(name)
            .and_then(|records| records.into_iter().next())
    }

    /// Names of all associations that have been preloaded
    pub fn loaded_association_names(&self) -> Vec<String> {
        self.associations
            .iter()
            .filter(|entry| entry.value().is_loaded())
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Resolve a declared association against the global registry.
    ///
    /// Returns the reflection view, or `None` when the model declares no such
    /// association and lax resolution is in effect. In strict mode a missing
    /// reflection is an error naming the model and association.
    pub fn association(&self, name: &str) -> PreloadResult<Option<AssociationRef>> {
        self.association_with(global_registry(), name)
    }

    /// Resolve a declared association against a specific registry
    pub fn association_with(
        &self,
        registry: &TypeRegistry,
        name: &str,
    ) -> PreloadResult<Option<AssociationRef>> {
        match registry.reflect_on_association(&self.model, name) {
            Some(metadata) => {
                // Attach the cache slot so a later fill and this access
                // share one entry.
                self.associations.entry(name.to_string()).or_default();
                let target = self.target_type(&metadata);
                Ok(Some(AssociationRef { metadata, target }))
            }
            None if lax::lax_enabled() => Ok(None),
            None => Err(PreloadError::association_not_found(&self.model, name)),
        }
    }

    /// The concrete target model this record's row resolves an association
    /// to: the declared target for fixed-target kinds, the type column value
    /// for morph-to. `None` when the type column is absent or null.
    pub fn target_type(&self, metadata: &RelationshipMetadata) -> Option<String> {
        if metadata.resolves_target_per_record() {
            let poly = metadata.polymorphic.as_ref()?;
            self.attribute_str(&poly.type_column)
                .filter(|target| !target.is_empty())
                .map(|target| target.to_string())
        } else {
            metadata.target().map(|target| target.to_string())
        }
    }
}

// Slots can hold records that point back at their owners once both sides of
// a relationship are preloaded, so the derived Debug would not terminate.
impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("model", &self.model)
            .field("id", &self.attribute("id"))
            .field("loaded", &self.loaded_association_names())
            .finish()
    }
}

/// Order-preserving collector that keeps the first occurrence of each
/// record. Records with a primary key deduplicate by identity, records
/// without one by allocation.
#[derive(Debug, Default)]
pub(crate) struct UniqueRecords {
    seen_keys: std::collections::HashSet<RecordKey>,
    seen_instances: std::collections::HashSet<usize>,
    records: Vec<Arc<Record>>,
}

impl UniqueRecords {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, record: &Arc<Record>) {
        let fresh = match record.key() {
            Some(key) => self.seen_keys.insert(key),
            None => self.seen_instances.insert(Arc::as_ptr(record) as usize),
        };
        if fresh {
            self.records.push(Arc::clone(record));
        }
    }

    pub(crate) fn extend<'a>(&mut self, records: impl IntoIterator<Item = &'a Arc<Record>>) {
        for record in records {
            self.push(record);
        }
    }

    pub(crate) fn into_vec(self) -> Vec<Arc<Record>> {
        self.records
    }
}

/// Reflection view of one association as declared by a record's model
#[derive(Debug, Clone)]
pub struct AssociationRef {
    metadata: RelationshipMetadata,
    target: Option<String>,
}

impl AssociationRef {
    /// The declared reflection metadata
    pub fn metadata(&self) -> &RelationshipMetadata {
        &self.metadata
    }

    /// The concrete target model for this record's row, if resolvable
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }
}
