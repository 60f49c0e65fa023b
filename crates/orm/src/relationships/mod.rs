//! Relationships module - reflection metadata, the type registry, and
//! preload specifications

pub mod metadata;
pub mod registry;
pub mod spec;

// Re-export main types
pub use metadata::*;
pub use registry::*;
pub use spec::*;
