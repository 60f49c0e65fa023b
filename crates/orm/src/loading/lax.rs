//! Lax resolution scope
//!
//! Lax mode tolerates owners whose model declares no reflection under the
//! association being preloaded, provided the association was reached through
//! a polymorphic parent. The toggle is task-scoped: [`with_lax`] overrides
//! the process-wide default for the duration of one future, and the override
//! is dropped with the scope no matter how the future exits.

use std::future::Future;

use crate::config;

tokio::task_local! {
    /// Task-scoped override of the process-wide lax default.
    static LAX_OVERRIDE: bool;
}

/// Run `fut` with lax resolution forced on or off.
///
/// Scopes nest; the innermost override wins. Code outside the scope,
/// including other tasks running concurrently, is unaffected.
pub async fn with_lax<F>(enabled: bool, fut: F) -> F::Output
where
    F: Future,
{
    LAX_OVERRIDE.scope(enabled, fut).await
}

/// Whether lax resolution is currently in effect: the innermost task-scoped
/// override if one is active, the process-wide default otherwise.
pub fn lax_enabled() -> bool {
    scoped_override().unwrap_or_else(config::lax_by_default)
}

/// The task-scoped override, if the caller is inside a [`with_lax`] scope.
pub fn scoped_override() -> Option<bool> {
    LAX_OVERRIDE.try_with(|enabled| *enabled).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{PreloadError, PreloadResult};

    #[tokio::test]
    async fn test_no_override_outside_scope() {
        assert_eq!(scoped_override(), None);
    }

    #[tokio::test]
    async fn test_with_lax_sets_override_inside_scope() {
        let seen = with_lax(true, async { (scoped_override(), lax_enabled()) }).await;
        assert_eq!(seen, (Some(true), true));
        assert_eq!(scoped_override(), None);
    }

    #[tokio::test]
    async fn test_nested_scope_shadows_and_restores() {
        with_lax(true, async {
            assert!(lax_enabled());
            with_lax(false, async {
                assert!(!lax_enabled());
            })
            .await;
            assert!(lax_enabled());
        })
        .await;
    }

    #[tokio::test]
    async fn test_error_propagates_and_scope_unwinds() {
        let result: PreloadResult<()> = with_lax(true, async {
            Err(PreloadError::backend("record source offline"))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(scoped_override(), None);
    }

    #[tokio::test]
    async fn test_override_does_not_leak_to_other_tasks() {
        let (ready_tx, ready_rx) = tokio::sync::oneshot::channel();
        let (done_tx, done_rx) = tokio::sync::oneshot::channel();

        let outsider = tokio::spawn(async move {
            ready_rx.await.unwrap();
            let seen = scoped_override();
            done_tx.send(()).unwrap();
            seen
        });

        let inside = with_lax(true, async {
            ready_tx.send(()).unwrap();
            done_rx.await.unwrap();
            scoped_override()
        })
        .await;

        assert_eq!(inside, Some(true));
        assert_eq!(outsider.await.unwrap(), None);
    }
}
