//! Error types for the preloading engine
//!
//! Provides error handling for preload tree validation, reflection
//! lookups, and polymorphic target resolution.

/// Result type alias for preload operations
pub type PreloadResult<T> = Result<T, PreloadError>;

/// ORM result type alias
pub type OrmResult<T> = PreloadResult<T>;

/// Error types for preload operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum PreloadError {
    /// Preload tree node was neither a name, a list, nor a mapping
    #[error("{value} was not recognised for preloading")]
    InvalidSpec { value: serde_json::Value },

    /// Owner model declares no association under this name
    #[error("association '{association}' was not found on model '{model}'")]
    AssociationNotFound { model: String, association: String },

    /// Polymorphic type name does not resolve to a registered model
    #[error("cannot resolve target type '{target}' for association '{association}' on model '{model}'")]
    TargetTypeUnresolved {
        model: String,
        association: String,
        target: String,
    },

    /// Engine or strategy registry misconfiguration
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// Record source failure surfaced by a loader strategy
    #[error("backend error: {message}")]
    Backend { message: String },
}

impl PreloadError {
    pub fn association_not_found(model: impl Into<String>, association: impl Into<String>) -> Self {
        PreloadError::AssociationNotFound {
            model: model.into(),
            association: association.into(),
        }
    }

    pub fn target_type_unresolved(
        model: impl Into<String>,
        association: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        PreloadError::TargetTypeUnresolved {
            model: model.into(),
            association: association.into(),
            target: target.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        PreloadError::Configuration {
            message: message.into(),
        }
    }

    pub fn backend(message: impl Into<String>) -> Self {
        PreloadError::Backend {
            message: message.into(),
        }
    }
}

// Convert from serde_json errors
impl From<serde_json::Error> for PreloadError {
    fn from(err: serde_json::Error) -> Self {
        PreloadError::Backend {
            message: err.to_string(),
        }
    }
}

// Convert from anyhow errors
impl From<anyhow::Error> for PreloadError {
    fn from(err: anyhow::Error) -> Self {
        PreloadError::Backend {
            message: err.to_string(),
        }
    }
}
