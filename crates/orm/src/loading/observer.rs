//! Preload observers - instrumentation hooks around association loading
//!
//! Observers let hosts watch association access and batch loading without
//! participating in it, the seam N+1 detectors and query profilers hook
//! into. Observer panics are caught and discarded; instrumentation must
//! never fail a preload.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use crate::record::Record;

/// Observer of preload activity. All methods default to no-ops so
/// implementors override only the events they care about.
pub trait PreloadObserver: Send + Sync {
    /// Called once per owner as its reflection is resolved
    fn on_association_accessed(&self, _record: &Record, _association: &str) {}

    /// Called once per association batch, before any loading starts
    fn on_batch_preload(&self, _owners: &[Arc<Record>], _association: &str) {}
}

/// Notify every observer of a batch preload, in registration order.
pub(crate) fn notify_batch(
    observers: &[Arc<dyn PreloadObserver>],
    owners: &[Arc<Record>],
    association: &str,
) {
    for observer in observers {
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            observer.on_batch_preload(owners, association);
        }));
        if outcome.is_err() {
            tracing::warn!(
                "preload observer panicked in on_batch_preload for '{}'",
                association
            );
        }
    }
}

/// Notify every observer of one owner's association access.
pub(crate) fn notify_access(
    observers: &[Arc<dyn PreloadObserver>],
    record: &Record,
    association: &str,
) {
    for observer in observers {
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            observer.on_association_accessed(record, association);
        }));
        if outcome.is_err() {
            tracing::warn!(
                "preload observer panicked in on_association_accessed for '{}'",
                association
            );
        }
    }
}
