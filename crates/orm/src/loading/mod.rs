/// Association loading modules for the trellis ORM
/// Provides batch preloading, loader strategies, scoping, and lax-mode controls

pub mod lax;
pub mod loader;
pub mod observer;
pub mod preloader;
pub mod scope;
pub mod strategies;

pub use lax::{lax_enabled, scoped_override, with_lax};
pub use loader::{GroupKey, Loader};
pub use observer::PreloadObserver;
pub use preloader::Preloader;
pub use scope::{ConstraintOperator, PreloadScope, ScopeConstraint};
pub use strategies::{
    BelongsToLoader, HasManyLoader, LoaderStrategy, ManyToManyLoader, MorphToLoader, RelationStore,
    StrategyRegistry,
};
