//! # trellis-orm: Association Preloading for trellis
//!
//! Batch eager loading of declared associations across record graphs,
//! including polymorphic morph-to associations whose concrete target model
//! is resolved per row from a type column.
//!
//! The preload engine walks a spec tree over a set of owner records, groups
//! owners by reflection and concrete target, runs one loader strategy per
//! group, and recurses into nested specs over the records each level
//! produced. Under a polymorphic parent, lax resolution tolerates target
//! models that do not declare a requested association instead of failing
//! the whole walk; see [`loading::with_lax`] and [`config::PreloadConfig`]
//! for the scoped and process-wide controls.

pub mod config;
pub mod error;
pub mod loading;
pub mod record;
pub mod relationships;

// Re-export core traits and types
pub use config::*;
pub use error::*;
pub use loading::*;
pub use record::*;
pub use relationships::*;
