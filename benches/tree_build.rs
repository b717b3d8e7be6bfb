//! Tree materialization over an in-memory SQLite forest for each way of
//! reading it, plus flattening of an already built tree.

use comment_tree::{
    BuildStrategy, DatabaseStore, TreeBuilder,
    entity::{comment, post, user},
    flatten,
    generator::{TreeShape, generate_comment_tree, insert_comments},
};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use sea_orm::{ActiveModelTrait, ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema, Set};
use std::hint::black_box;

const POST: i32 = 1;

async fn create_table<E: EntityTrait>(db: &DatabaseConnection, entity: E) {
    let backend = db.get_database_backend();
    let stmt = Schema::new(backend).create_table_from_entity(entity);
    db.execute_raw(backend.build(&stmt)).await.unwrap();
}

async fn seeded(shape: TreeShape) -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    create_table(&db, user::Entity).await;
    create_table(&db, post::Entity).await;
    create_table(&db, comment::Entity).await;

    user::ActiveModel {
        id: Set(1),
        name: Set("bench".to_owned()),
    }
    .insert(&db)
    .await
    .unwrap();
    post::ActiveModel {
        id: Set(POST),
        author_id: Set(1),
        title: Set("bench".to_owned()),
        content: Set(String::new()),
    }
    .insert(&db)
    .await
    .unwrap();

    insert_comments(&db, &generate_comment_tree(POST, 1, 1, shape))
        .await
        .unwrap();
    db
}

fn bench_tree_build(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("tree_build");

    for top_level in [10, 50, 100] {
        for max_depth in [3, 5] {
            for replies_per_comment in [2, 4] {
                let shape = TreeShape {
                    top_level,
                    max_depth,
                    replies_per_comment,
                    seed: 42,
                };
                let store = DatabaseStore::new(runtime.block_on(seeded(shape)));
                let label = format!("{top_level}x{max_depth}x{replies_per_comment}");

                group.bench_with_input(BenchmarkId::new("recursive", &label), &store, |b, store| {
                    b.to_async(&runtime).iter(|| async {
                        let roots = TreeBuilder::new(store)
                            .build(POST, BuildStrategy::Recursive)
                            .await
                            .unwrap();
                        black_box(roots);
                    });
                });
                group.bench_with_input(BenchmarkId::new("iterative", &label), &store, |b, store| {
                    b.to_async(&runtime).iter(|| async {
                        let roots = TreeBuilder::new(store)
                            .build(POST, BuildStrategy::Iterative)
                            .await
                            .unwrap();
                        black_box(roots);
                    });
                });
                let roots = runtime
                    .block_on(TreeBuilder::new(&store).build(POST, BuildStrategy::Iterative))
                    .unwrap();
                group.bench_with_input(BenchmarkId::new("flatten", &label), &roots, |b, roots| {
                    b.iter(|| black_box(flatten(roots)));
                });
                group.bench_with_input(BenchmarkId::new("two_level", &label), &store, |b, store| {
                    b.to_async(&runtime).iter(|| async {
                        let threads = TreeBuilder::new(store).threads(POST, true).await.unwrap();
                        black_box(threads);
                    });
                });
            }
        }
    }

    group.finish();
}

criterion_group!(benches, bench_tree_build);
criterion_main!(benches);
