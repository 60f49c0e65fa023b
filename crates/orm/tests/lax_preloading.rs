use std::sync::Arc;

use serde_json::json;

use trellis_orm::{
    error::PreloadError,
    loading::{with_lax, PreloadObserver, Preloader, RelationStore},
    record::Record,
    register_association,
    relationships::{global_registry, PreloadSpec, RelationshipMetadata},
};

/// Register the shared world on the global registry. Registration replaces
/// by association name, so repeated calls from parallel tests are harmless.
fn register_world() {
    let registry = global_registry();
    registry
        .register(
            "Project",
            RelationshipMetadata::has_many("tasks", "Task", "project_id"),
        )
        .unwrap();
    registry
        .register(
            "Project",
            RelationshipMetadata::morph_many("comments", "Comment", "commentable"),
        )
        .unwrap();
    registry
        .register("Task", RelationshipMetadata::belongs_to("project", "Project"))
        .unwrap();
    registry
        .register(
            "Task",
            RelationshipMetadata::morph_many("comments", "Comment", "commentable"),
        )
        .unwrap();
    registry
        .register("Comment", RelationshipMetadata::morph_to("commentable"))
        .unwrap();
}

/// Two projects, three tasks, and a comment feed spanning both morph-to
/// target models.
fn seeded_store() -> RelationStore {
    let store = RelationStore::new();
    store
        .insert_value("Project", json!({"id": 1, "name": "alpha"}))
        .unwrap();
    store
        .insert_value("Project", json!({"id": 2, "name": "beta"}))
        .unwrap();
    store
        .insert_value("Task", json!({"id": 10, "project_id": 1, "state": "open"}))
        .unwrap();
    store
        .insert_value("Task", json!({"id": 11, "project_id": 1, "state": "done"}))
        .unwrap();
    store
        .insert_value("Task", json!({"id": 12, "project_id": 2, "state": "open"}))
        .unwrap();
    store
        .insert_value(
            "Comment",
            json!({"id": 100, "commentable_type": "Task", "commentable_id": 10}),
        )
        .unwrap();
    store
        .insert_value(
            "Comment",
            json!({"id": 101, "commentable_type": "Project", "commentable_id": 1}),
        )
        .unwrap();
    store
        .insert_value(
            "Comment",
            json!({"id": 102, "commentable_type": "Task", "commentable_id": 11}),
        )
        .unwrap();
    store
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mixed_comment_feed_requires_lax() {
        register_world();
        let store = seeded_store();
        let comments = store.records_of("Comment");
        let spec = PreloadSpec::try_from(&json!({"commentable": "project"})).unwrap();

        // Strict mode fails the walk because Project does not declare
        // `project`, even though every Task-backed comment could load it.
        let strict = Preloader::new(store.standard_strategies());
        let err = strict.preload(&comments, &spec).await.unwrap_err();
        match err {
            PreloadError::AssociationNotFound { model, association } => {
                assert_eq!(model, "Project");
                assert_eq!(association, "project");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let lax = Preloader::new(store.standard_strategies()).lax(true);
        let loaders = lax.preload(&comments, &spec).await.unwrap();

        // One loader per morph-to target plus the nested level served only
        // by the Task-backed records.
        assert_eq!(loaders.len(), 3);
        assert_eq!(loaders[0].name(), "commentable");
        assert_eq!(loaders[0].target(), "Task");
        assert_eq!(loaders[1].name(), "commentable");
        assert_eq!(loaders[1].target(), "Project");
        assert_eq!(loaders[2].name(), "project");

        let on_task = &comments[0];
        let task = on_task.loaded_one("commentable").unwrap();
        assert_eq!(task.attribute("id"), Some(&json!(10)));
        assert_eq!(
            task.loaded_one("project").unwrap().attribute_str("name"),
            Some("alpha")
        );

        let on_project = &comments[1];
        let project = on_project.loaded_one("commentable").unwrap();
        assert_eq!(project.attribute_str("name"), Some("alpha"));
        assert!(!project.association_loaded("project"));
    }

    #[tokio::test]
    async fn test_scoped_lax_covers_the_whole_preload() {
        register_world();
        let store = seeded_store();
        let comments = store.records_of("Comment");
        let spec = PreloadSpec::try_from(&json!({"commentable": "project"})).unwrap();
        let preloader = Preloader::new(store.standard_strategies());

        let loaders = with_lax(true, preloader.preload(&comments, &spec))
            .await
            .unwrap();
        assert_eq!(loaders.len(), 3);

        // Outside the scope the same preloader is strict again.
        let err = preloader.preload(&comments, &spec).await.unwrap_err();
        assert!(matches!(err, PreloadError::AssociationNotFound { .. }));
    }

    #[tokio::test]
    async fn test_deep_nesting_through_polymorphic_join() {
        register_world();
        let store = seeded_store();
        let comments = store.records_of("Comment");
        let spec = PreloadSpec::try_from(&json!({"commentable": {"project": "tasks"}})).unwrap();

        let loaders = Preloader::new(store.standard_strategies())
            .lax(true)
            .preload(&comments, &spec)
            .await
            .unwrap();
        assert_eq!(loaders.len(), 4);

        let task = comments[0].loaded_one("commentable").unwrap();
        let project = task.loaded_one("project").unwrap();
        let tasks = project.loaded_association("tasks").unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].attribute("id"), Some(&json!(10)));
        assert_eq!(tasks[1].attribute("id"), Some(&json!(11)));
    }

    #[tokio::test]
    async fn test_macro_registered_morph_targets() {
        register_world();
        register_association!("Attachment", RelationshipMetadata::morph_to("attachable"));
        register_association!(
            "Task",
            RelationshipMetadata::morph_many("attachments", "Attachment", "attachable")
        );
        global_registry().register_model("Note");

        let store = seeded_store();
        store
            .insert_value("Note", json!({"id": 50, "body": "remember the milk"}))
            .unwrap();
        let on_task = store
            .insert_value(
                "Attachment",
                json!({"id": 200, "attachable_type": "Task", "attachable_id": 10}),
            )
            .unwrap();
        let on_note = store
            .insert_value(
                "Attachment",
                json!({"id": 201, "attachable_type": "Note", "attachable_id": 50}),
            )
            .unwrap();

        let spec = PreloadSpec::try_from(&json!({"attachable": "project"})).unwrap();
        let loaders = Preloader::new(store.standard_strategies())
            .lax(true)
            .preload(&[on_task.clone(), on_note.clone()], &spec)
            .await
            .unwrap();

        assert_eq!(loaders.len(), 3);
        assert_eq!(
            on_task
                .loaded_one("attachable")
                .unwrap()
                .loaded_one("project")
                .unwrap()
                .attribute_str("name"),
            Some("alpha")
        );

        let note = on_note.loaded_one("attachable").unwrap();
        assert_eq!(note.attribute_str("body"), Some("remember the milk"));
        assert!(!note.association_loaded("project"));
    }

    #[tokio::test]
    async fn test_null_and_dangling_morph_rows_load_quietly() {
        register_world();
        let store = seeded_store();
        let on_task = store.find_by("Comment", "id", &json!(100)).unwrap();
        let untyped = store
            .insert_value(
                "Comment",
                json!({"id": 103, "commentable_type": null, "commentable_id": null}),
            )
            .unwrap();
        let dangling = store
            .insert_value(
                "Comment",
                json!({"id": 105, "commentable_type": "Task", "commentable_id": 999}),
            )
            .unwrap();

        let loaders = Preloader::new(store.standard_strategies())
            .preload(
                &[on_task.clone(), untyped.clone(), dangling.clone()],
                &PreloadSpec::name("commentable"),
            )
            .await
            .unwrap();

        // The null-typed row contributes no group; the dangling one groups
        // under Task and simply matches nothing.
        assert_eq!(loaders.len(), 1);
        assert!(on_task.association_loaded("commentable"));
        assert!(!untyped.association_loaded("commentable"));
        assert!(dangling.association_loaded("commentable"));
        assert!(dangling.loaded_association("commentable").unwrap().is_empty());
    }

    #[derive(Default)]
    struct CountingObserver {
        accesses: std::sync::atomic::AtomicUsize,
        batches: std::sync::atomic::AtomicUsize,
    }

    impl PreloadObserver for CountingObserver {
        fn on_association_accessed(&self, _record: &Record, _association: &str) {
            self.accesses
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        }

        fn on_batch_preload(&self, _owners: &[Arc<Record>], _association: &str) {
            self.batches
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_observer_instruments_the_lax_walk() {
        register_world();
        let store = seeded_store();
        let on_task = store.find_by("Comment", "id", &json!(100)).unwrap();
        let on_project = store.find_by("Comment", "id", &json!(101)).unwrap();
        let observer = Arc::new(CountingObserver::default());

        let spec = PreloadSpec::try_from(&json!({"commentable": "project"})).unwrap();
        Preloader::new(store.standard_strategies())
            .lax(true)
            .with_observer(observer.clone())
            .preload(&[on_task, on_project], &spec)
            .await
            .unwrap();

        let batches = observer.batches.load(std::sync::atomic::Ordering::SeqCst);
        let accesses = observer.accesses.load(std::sync::atomic::Ordering::SeqCst);
        // One batch per level; two owners accessed at each level.
        assert_eq!(batches, 2);
        assert_eq!(accesses, 4);
    }
}
