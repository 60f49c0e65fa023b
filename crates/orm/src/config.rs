//! Engine configuration
//!
//! Holds process-wide defaults for the preloader. The lax default is the
//! fallback consulted when no task-scoped override is active; see
//! [`crate::loading::lax`] for the scoped override.

use std::sync::atomic::{AtomicBool, Ordering};

/// Process-wide default for lax resolution of missing reflections.
static LAX_BY_DEFAULT: AtomicBool = AtomicBool::new(false);

/// Configuration for the preloading engine
#[derive(Debug, Clone, PartialEq)]
pub struct PreloadConfig {
    /// Whether owners with a missing reflection under a polymorphic parent
    /// are skipped instead of failing the whole preload
    pub lax_by_default: bool,
}

impl Default for PreloadConfig {
    fn default() -> Self {
        Self {
            lax_by_default: false,
        }
    }
}

impl PreloadConfig {
    /// Create a configuration with strict defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable lax resolution by default
    pub fn with_lax_by_default(mut self, enabled: bool) -> Self {
        self.lax_by_default = enabled;
        self
    }

    /// Install this configuration as the process-wide default
    pub fn apply(&self) {
        set_lax_by_default(self.lax_by_default);
    }
}

/// Set the process-wide lax default.
pub fn set_lax_by_default(enabled: bool) {
    LAX_BY_DEFAULT.store(enabled, Ordering::Relaxed);
}

/// Read the process-wide lax default.
pub fn lax_by_default() -> bool {
    LAX_BY_DEFAULT.load(Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_strict() {
        let config = PreloadConfig::default();
        assert!(!config.lax_by_default);
    }

    #[test]
    fn test_builder_enables_lax() {
        let config = PreloadConfig::new().with_lax_by_default(true);
        assert!(config.lax_by_default);
    }
}
