//! Type registry - runtime storage for model names and their reflections

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;

use super::metadata::RelationshipMetadata;
use crate::error::{PreloadError, PreloadResult};

/// Thread-safe registry of known models and the associations they declare.
///
/// Cloning a registry yields another handle to the same underlying maps, so
/// a registry can be shared freely between the preloader and callers.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    /// Map of model name -> association name -> metadata. A model registered
    /// with no associations holds an empty inner map.
    relationships: Arc<DashMap<String, HashMap<String, RelationshipMetadata>>>,
}

impl TypeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            relationships: Arc::new(DashMap::new()),
        }
    }

    /// Register a model name without any associations.
    ///
    /// Morph-to resolution only accepts type names that are registered, so
    /// leaf models that declare nothing still need to be registered.
    pub fn register_model(&self, model: &str) {
        self.relationships
            .entry(model.to_string())
            .or_insert_with(HashMap::new);
    }

    /// Register an association on a model, keyed by the metadata's name.
    /// Registering the same name again replaces the earlier declaration.
    pub fn register(&self, model: &str, metadata: RelationshipMetadata) -> PreloadResult<()> {
        metadata.validate()?;

        let mut model_relationships = self
            .relationships
            .entry(model.to_string())
            .or_insert_with(HashMap::new);
        model_relationships.insert(metadata.name.clone(), metadata);

        Ok(())
    }

    /// Look up the reflection a model declares under `name`
    pub fn reflect_on_association(
        &self,
        model: &str,
        name: &str,
    ) -> Option<RelationshipMetadata> {
        self.relationships.get(model)?.get(name).cloned()
    }

    /// Returns true if the model name is registered
    pub fn contains_model(&self, model: &str) -> bool {
        self.relationships.contains_key(model)
    }

    /// Returns true if the model declares an association under `name`
    pub fn has_association(&self, model: &str, name: &str) -> bool {
        self.relationships
            .get(model)
            .map(|relationships| relationships.contains_key(name))
            .unwrap_or(false)
    }

    /// Get all associations declared by a model
    pub fn relationships_for(
        &self,
        model: &str,
    ) -> Option<HashMap<String, RelationshipMetadata>> {
        self.relationships.get(model).map(|entry| entry.clone())
    }

    /// Get all association names declared by a model
    pub fn relationship_names(&self, model: &str) -> Vec<String> {
        self.relationships
            .get(model)
            .map(|relationships| relationships.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Get statistics about the registry
    pub fn stats(&self) -> RegistryStats {
        let registered_models = self.relationships.len();
        let total_relationships: usize = self
            .relationships
            .iter()
            .map(|entry| entry.value().len())
            .sum();
        let polymorphic_relationships: usize = self
            .relationships
            .iter()
            .map(|entry| {
                entry
                    .value()
                    .values()
                    .filter(|metadata| metadata.is_polymorphic())
                    .count()
            })
            .sum();

        RegistryStats {
            registered_models,
            total_relationships,
            polymorphic_relationships,
        }
    }

    /// Clear all registered models and associations
    pub fn clear(&self) {
        self.relationships.clear();
    }

    /// Validate every registered reflection
    pub fn validate_all(&self) -> PreloadResult<()> {
        for model_entry in self.relationships.iter() {
            for (name, metadata) in model_entry.value() {
                metadata.validate().map_err(|e| {
                    PreloadError::configuration(format!(
                        "validation failed for association '{}' on model '{}': {}",
                        name,
                        model_entry.key(),
                        e
                    ))
                })?;
            }
        }
        Ok(())
    }
}

/// Statistics about the type registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryStats {
    pub registered_models: usize,
    pub total_relationships: usize,
    pub polymorphic_relationships: usize,
}

/// Global registry instance for the application
static GLOBAL_REGISTRY: std::sync::OnceLock<TypeRegistry> = std::sync::OnceLock::new();

/// Get the global type registry
pub fn global_registry() -> &'static TypeRegistry {
    GLOBAL_REGISTRY.get_or_init(TypeRegistry::new)
}

/// Convenience macro for registering associations on the global registry
#[macro_export]
macro_rules! register_association {
    ($model:expr, $metadata:expr) => {
        $crate::relationships::registry::global_registry()
            .register($model, $metadata)
            .expect("Failed to register association");
    };
}
