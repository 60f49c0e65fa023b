//! Relationship metadata - reflection data consumed by the preloader

use serde::{Deserialize, Serialize};

use crate::error::{PreloadError, PreloadResult};

/// Defines the kind of relationship between models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationshipKind {
    /// Many-to-one relationship (belongsTo)
    BelongsTo,
    /// One-to-one relationship (hasOne)
    HasOne,
    /// One-to-many relationship (hasMany)
    HasMany,
    /// Many-to-many relationship through a pivot model
    ManyToMany,
    /// Inverse polymorphic relationship; the target model comes from a type
    /// column on each owner row
    MorphTo,
    /// Polymorphic one-to-one relationship
    MorphOne,
    /// Polymorphic one-to-many relationship
    MorphMany,
}

impl RelationshipKind {
    /// Returns true if this relationship kind is polymorphic
    pub fn is_polymorphic(self) -> bool {
        matches!(self, Self::MorphTo | Self::MorphOne | Self::MorphMany)
    }

    /// Returns true if this relationship returns a collection
    pub fn is_collection(self) -> bool {
        matches!(self, Self::HasMany | Self::ManyToMany | Self::MorphMany)
    }

    /// Returns true if this relationship kind requires a pivot model
    pub fn requires_pivot(self) -> bool {
        matches!(self, Self::ManyToMany)
    }

    /// Returns true if the target model is resolved per owner row rather than
    /// fixed by the declaration. Only morph-to works this way; morph-one and
    /// morph-many declare a fixed target and are polymorphic on the child side.
    pub fn resolves_target_per_record(self) -> bool {
        matches!(self, Self::MorphTo)
    }
}

/// Relationship metadata describing one declared association on a model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipMetadata {
    /// The kind of relationship
    pub kind: RelationshipKind,

    /// Name of the association (field name on the owning model)
    pub name: String,

    /// The target model's type name; `None` for morph-to, where the target
    /// is read from the type column of each owner
    pub target: Option<String>,

    /// The foreign key column. On the owning side for belongs-to and
    /// morph-to, on the target side for the has-style kinds
    pub foreign_key: String,

    /// The key column the foreign key matches (defaults to "id")
    pub local_key: String,

    /// Polymorphic column configuration, present for the morph kinds
    pub polymorphic: Option<PolymorphicConfig>,

    /// Pivot configuration, present for many-to-many
    pub pivot: Option<PivotConfig>,
}

impl RelationshipMetadata {
    /// Create a belongs-to relationship; the foreign key defaults to
    /// `{name}_id` on the owning model
    pub fn belongs_to(name: impl Into<String>, target: impl Into<String>) -> Self {
        let name = name.into();
        let foreign_key = format!("{}_id", name);
        Self {
            kind: RelationshipKind::BelongsTo,
            name,
            target: Some(target.into()),
            foreign_key,
            local_key: "id".to_string(),
            polymorphic: None,
            pivot: None,
        }
    }

    /// Create a has-one relationship; the foreign key lives on the target
    pub fn has_one(
        name: impl Into<String>,
        target: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self {
            kind: RelationshipKind::HasOne,
            name: name.into(),
            target: Some(target.into()),
            foreign_key: foreign_key.into(),
            local_key: "id".to_string(),
            polymorphic: None,
            pivot: None,
        }
    }

    /// Create a has-many relationship; the foreign key lives on the target
    pub fn has_many(
        name: impl Into<String>,
        target: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self {
            kind: RelationshipKind::HasMany,
            name: name.into(),
            target: Some(target.into()),
            foreign_key: foreign_key.into(),
            local_key: "id".to_string(),
            polymorphic: None,
            pivot: None,
        }
    }

    /// Create a many-to-many relationship through a pivot model
    pub fn many_to_many(
        name: impl Into<String>,
        target: impl Into<String>,
        pivot: PivotConfig,
    ) -> Self {
        Self {
            kind: RelationshipKind::ManyToMany,
            name: name.into(),
            target: Some(target.into()),
            foreign_key: pivot.foreign_key.clone(),
            local_key: "id".to_string(),
            pivot: Some(pivot),
            polymorphic: None,
        }
    }

    /// Create a morph-to relationship. The type and id columns default to
    /// `{name}_type` and `{name}_id` on the owning model
    pub fn morph_to(name: impl Into<String>) -> Self {
        let name = name.into();
        let polymorphic = PolymorphicConfig::new(
            format!("{}_type", name),
            format!("{}_id", name),
        );
        Self {
            kind: RelationshipKind::MorphTo,
            foreign_key: polymorphic.id_column.clone(),
            name,
            target: None,
            local_key: "id".to_string(),
            polymorphic: Some(polymorphic),
            pivot: None,
        }
    }

    /// Create a morph-one relationship. `morph_name` is the name the target
    /// model stores the owner under, e.g. `commentable`
    pub fn morph_one(
        name: impl Into<String>,
        target: impl Into<String>,
        morph_name: &str,
    ) -> Self {
        let polymorphic = PolymorphicConfig::new(
            format!("{}_type", morph_name),
            format!("{}_id", morph_name),
        );
        Self {
            kind: RelationshipKind::MorphOne,
            name: name.into(),
            target: Some(target.into()),
            foreign_key: polymorphic.id_column.clone(),
            local_key: "id".to_string(),
            polymorphic: Some(polymorphic),
            pivot: None,
        }
    }

    /// Create a morph-many relationship. `morph_name` is the name the target
    /// model stores the owner under, e.g. `commentable`
    pub fn morph_many(
        name: impl Into<String>,
        target: impl Into<String>,
        morph_name: &str,
    ) -> Self {
        let polymorphic = PolymorphicConfig::new(
            format!("{}_type", morph_name),
            format!("{}_id", morph_name),
        );
        Self {
            kind: RelationshipKind::MorphMany,
            name: name.into(),
            target: Some(target.into()),
            foreign_key: polymorphic.id_column.clone(),
            local_key: "id".to_string(),
            polymorphic: Some(polymorphic),
            pivot: None,
        }
    }

    /// Override the foreign key column
    pub fn with_foreign_key(mut self, foreign_key: impl Into<String>) -> Self {
        self.foreign_key = foreign_key.into();
        self
    }

    /// Override the local key column
    pub fn with_local_key(mut self, local_key: impl Into<String>) -> Self {
        self.local_key = local_key.into();
        self
    }

    /// Override the polymorphic configuration
    pub fn with_polymorphic(mut self, polymorphic: PolymorphicConfig) -> Self {
        self.polymorphic = Some(polymorphic);
        self
    }

    /// Override the pivot configuration
    pub fn with_pivot(mut self, pivot: PivotConfig) -> Self {
        self.pivot = Some(pivot);
        self
    }

    /// Returns true if this relationship is polymorphic
    pub fn is_polymorphic(&self) -> bool {
        self.kind.is_polymorphic()
    }

    /// Returns true if the target model must be resolved per owner row
    pub fn resolves_target_per_record(&self) -> bool {
        self.kind.resolves_target_per_record()
    }

    /// The declared target model, if the kind fixes one
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// Validate the relationship metadata for consistency
    pub fn validate(&self) -> PreloadResult<()> {
        if self.name.is_empty() {
            return Err(PreloadError::configuration(
                "relationship name cannot be empty",
            ));
        }

        if self.foreign_key.is_empty() || self.local_key.is_empty() {
            return Err(PreloadError::configuration(format!(
                "relationship '{}' requires foreign and local key columns",
                self.name
            )));
        }

        if self.kind.requires_pivot() && self.pivot.is_none() {
            return Err(PreloadError::configuration(format!(
                "relationship '{}' of kind {:?} requires pivot configuration",
                self.name, self.kind
            )));
        }

        if self.kind.is_polymorphic() && self.polymorphic.is_none() {
            return Err(PreloadError::configuration(format!(
                "relationship '{}' of kind {:?} requires polymorphic configuration",
                self.name, self.kind
            )));
        }

        if self.kind.resolves_target_per_record() {
            if self.target.is_some() {
                return Err(PreloadError::configuration(format!(
                    "morph-to relationship '{}' cannot declare a fixed target",
                    self.name
                )));
            }
        } else if self.target.is_none() {
            return Err(PreloadError::configuration(format!(
                "relationship '{}' of kind {:?} requires a target model",
                self.name, self.kind
            )));
        }

        if let Some(ref pivot) = self.pivot {
            pivot.validate()?;
        }

        if let Some(ref poly) = self.polymorphic {
            poly.validate()?;
        }

        Ok(())
    }
}

/// Pivot configuration for many-to-many relationships
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PivotConfig {
    /// The pivot model name
    pub model: String,

    /// The pivot column referencing the owning model
    pub local_key: String,

    /// The pivot column referencing the target model
    pub foreign_key: String,
}

impl PivotConfig {
    /// Create a new pivot configuration
    pub fn new(
        model: impl Into<String>,
        local_key: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            local_key: local_key.into(),
            foreign_key: foreign_key.into(),
        }
    }

    /// Validate the pivot configuration
    pub fn validate(&self) -> PreloadResult<()> {
        if self.model.is_empty() {
            return Err(PreloadError::configuration(
                "pivot model cannot be empty",
            ));
        }

        if self.local_key.is_empty() || self.foreign_key.is_empty() {
            return Err(PreloadError::configuration(
                "pivot key columns cannot be empty",
            ));
        }

        if self.local_key == self.foreign_key {
            return Err(PreloadError::configuration(
                "pivot key columns must be different",
            ));
        }

        Ok(())
    }
}

/// Polymorphic column configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolymorphicConfig {
    /// The column storing the target model's type name
    pub type_column: String,

    /// The column storing the target's foreign key
    pub id_column: String,
}

impl PolymorphicConfig {
    /// Create a new polymorphic configuration
    pub fn new(type_column: impl Into<String>, id_column: impl Into<String>) -> Self {
        Self {
            type_column: type_column.into(),
            id_column: id_column.into(),
        }
    }

    /// Validate the polymorphic configuration
    pub fn validate(&self) -> PreloadResult<()> {
        if self.type_column.is_empty() {
            return Err(PreloadError::configuration(
                "polymorphic type column cannot be empty",
            ));
        }

        if self.id_column.is_empty() {
            return Err(PreloadError::configuration(
                "polymorphic id column cannot be empty",
            ));
        }

        if self.type_column == self.id_column {
            return Err(PreloadError::configuration(
                "polymorphic type column and id column must be different",
            ));
        }

        Ok(())
    }
}
