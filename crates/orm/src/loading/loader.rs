//! Load results - the per-group outcome of an association preload

use std::sync::Arc;

use crate::record::Record;
use crate::relationships::metadata::RelationshipMetadata;

/// Grouping key for one batch of owners: the reflection they share and the
/// concrete target model their rows resolve to.
///
/// Owners of different models funnel into the same group when they declare
/// structurally equal reflections against the same target, which is what
/// lets one loader serve a polymorphic parent's mixed results.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupKey {
    /// The shared reflection metadata
    pub metadata: RelationshipMetadata,

    /// The concrete target model for this group
    pub target: String,
}

impl GroupKey {
    pub fn new(metadata: RelationshipMetadata, target: impl Into<String>) -> Self {
        Self {
            metadata,
            target: target.into(),
        }
    }
}

/// The result of preloading one association for one group of owners.
///
/// Holds the owners served, the reflection loaded, and the related records
/// fetched for the group in first-encounter order.
#[derive(Debug)]
pub struct Loader {
    metadata: RelationshipMetadata,
    target: String,
    owners: Vec<Arc<Record>>,
    records: Vec<Arc<Record>>,
}

impl Loader {
    /// Create a loader result for one group
    pub fn new(
        metadata: RelationshipMetadata,
        target: impl Into<String>,
        owners: Vec<Arc<Record>>,
        records: Vec<Arc<Record>>,
    ) -> Self {
        Self {
            metadata,
            target: target.into(),
            owners,
            records,
        }
    }

    /// The association name this loader served
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// The reflection metadata this loader served
    pub fn metadata(&self) -> &RelationshipMetadata {
        &self.metadata
    }

    /// The concrete target model records were loaded from
    pub fn target(&self) -> &str {
        &self.target
    }

    /// The owners covered by this loader
    pub fn owners(&self) -> &[Arc<Record>] {
        &self.owners
    }

    /// The related records fetched for this group, deduplicated and in
    /// first-encounter order
    pub fn preloaded_records(&self) -> &[Arc<Record>] {
        &self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_group_key_equality_spans_owner_models() {
        let task_side = GroupKey::new(
            RelationshipMetadata::morph_many("comments", "Comment", "commentable"),
            "Comment",
        );
        let project_side = GroupKey::new(
            RelationshipMetadata::morph_many("comments", "Comment", "commentable"),
            "Comment",
        );
        assert_eq!(task_side, project_side);

        let other_target = GroupKey::new(
            RelationshipMetadata::morph_many("comments", "Comment", "commentable"),
            "Reaction",
        );
        assert_ne!(task_side, other_target);
    }

    #[test]
    fn test_loader_accessors() {
        let owner = Arc::new(Record::new("Task").with_attribute("id", json!(1)));
        let related = Arc::new(
            Record::new("Comment")
                .with_attribute("id", json!(10))
                .with_attribute("commentable_id", json!(1)),
        );

        let loader = Loader::new(
            RelationshipMetadata::morph_many("comments", "Comment", "commentable"),
            "Comment",
            vec![owner.clone()],
            vec![related.clone()],
        );

        assert_eq!(loader.name(), "comments");
        assert_eq!(loader.target(), "Comment");
        assert_eq!(loader.owners().len(), 1);
        assert_eq!(loader.preloaded_records().len(), 1);
        assert_eq!(
            loader.preloaded_records()[0].attribute("id"),
            Some(&json!(10))
        );
    }
}
