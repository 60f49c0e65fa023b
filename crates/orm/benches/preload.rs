//! Preload Engine Performance Benchmarks
//!
//! Tests spec parsing and batch preloading over flat and mixed morph-to
//! owner sets

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::json;
use tokio::runtime::Runtime;
use trellis_orm::{
    loading::{Preloader, RelationStore},
    relationships::{PreloadSpec, RelationshipMetadata, TypeRegistry},
};

fn world_registry() -> TypeRegistry {
    let registry = TypeRegistry::new();
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
    registry
}

/// Ten projects, `tasks` tasks spread across them, and `comments` comments
/// alternating between Task and Project targets.
fn seeded_store(tasks: usize, comments: usize) -> RelationStore {
    let store = RelationStore::new();
    for id in 1..=10 {
        store
            .insert_value("Project", json!({"id": id, "name": format!("project_{}", id)}))
            .unwrap();
    }
    for id in 1..=tasks {
        store
            .insert_value(
                "Task",
                json!({"id": id, "project_id": (id % 10) + 1, "state": "open"}),
            )
            .unwrap();
    }
    for id in 1..=comments {
        let (kind, target_id) = if id % 2 == 0 {
            ("Task", (id % tasks.max(1)) + 1)
        } else {
            ("Project", (id % 10) + 1)
        };
        store
            .insert_value(
                "Comment",
                json!({
                    "id": 10_000 + id,
                    "commentable_type": kind,
                    "commentable_id": target_id,
                }),
            )
            .unwrap();
    }
    store
}

fn bench_spec_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("spec_parsing");

    group.bench_function("single_name", |b| {
        b.iter(|| black_box(PreloadSpec::parse(black_box("comments")).unwrap()))
    });

    group.bench_function("dotted_path", |b| {
        b.iter(|| {
            black_box(PreloadSpec::parse(black_box("commentable.project.tasks")).unwrap())
        })
    });

    group.bench_function("json_tree", |b| {
        let value = json!({"commentable": ["project", "comments"]});
        b.iter(|| black_box(PreloadSpec::try_from(black_box(&value)).unwrap()))
    });

    group.finish();
}

fn bench_flat_preload(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("flat_preload");

    for &count in &[10, 100, 500] {
        let store = seeded_store(count, 0);
        let owners = store.records_of("Task");
        let preloader = Preloader::with_registry(world_registry(), store.standard_strategies());
        let spec = PreloadSpec::name("project");

        group.bench_with_input(BenchmarkId::new("belongs_to", count), &count, |b, _| {
            b.iter(|| {
                rt.block_on(async {
                    let loaders = preloader.preload(&owners, &spec).await.unwrap();
                    black_box(loaders)
                })
            })
        });
    }

    group.finish();
}

fn bench_polymorphic_preload(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("polymorphic_preload");

    for &count in &[10, 100, 500] {
        let store = seeded_store(100, count);
        let owners = store.records_of("Comment");
        let preloader =
            Preloader::with_registry(world_registry(), store.standard_strategies()).lax(true);
        let spec = PreloadSpec::try_from(&json!({"commentable": "project"})).unwrap();

        group.bench_with_input(
            BenchmarkId::new("mixed_morph_targets", count),
            &count,
            |b, _| {
                b.iter(|| {
                    rt.block_on(async {
                        let loaders = preloader.preload(&owners, &spec).await.unwrap();
                        black_box(loaders)
                    })
                })
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_spec_parsing,
    bench_flat_preload,
    bench_polymorphic_preload
);
criterion_main!(benches);
