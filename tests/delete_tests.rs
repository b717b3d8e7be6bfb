pub mod common;

use comment_tree::{
    SubtreeDeleter,
    entity::comment,
    generator::{TreeShape, count_recursive},
};
use common::{OTHER_POST, POST, TestContext};
use pretty_assertions::assert_eq;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};
use std::collections::HashSet;

#[tokio::test]
async fn deletes_comment_and_descendants() {
    let ctx = TestContext::new().await;
    ctx.insert(1, POST, None).await;
    ctx.insert(2, POST, Some(1)).await;
    ctx.insert(3, POST, Some(2)).await;
    ctx.insert(4, POST, Some(2)).await;
    ctx.insert(5, POST, Some(1)).await;
    ctx.insert(6, POST, None).await;
    ctx.insert(7, OTHER_POST, None).await;

    let store = ctx.store();
    let deleted = SubtreeDeleter::new(&store).delete(2).await.unwrap().unwrap();

    assert_eq!(deleted.post_id, POST);
    assert_eq!(deleted.root(), Some(2));
    assert_eq!(deleted.descendants(), 2);
    assert_eq!(deleted.targeted.len(), 3);
    assert!(deleted.is_complete());

    let remaining: Vec<i32> = comment::Entity::find()
        .order_by_asc(comment::Column::Id)
        .all(&ctx.db)
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.id)
        .collect();
    assert_eq!(remaining, vec![1, 5, 6, 7]);
}

#[tokio::test]
async fn leaves_no_dangling_replies() {
    let ctx = TestContext::new().await;
    let comments = ctx
        .generate(TreeShape {
            top_level: 5,
            max_depth: 5,
            replies_per_comment: 3,
            seed: 3,
        })
        .await;
    // batches smaller than the subtree still land in one transaction
    let store = ctx.store().with_delete_batch_size(4);

    let before = comments.len();
    let subtree = count_recursive(&comments, Some(1));
    let deleted = SubtreeDeleter::new(&store).delete(1).await.unwrap().unwrap();
    assert_eq!(deleted.targeted.len(), subtree + 1);

    let remaining = comment::Entity::find()
        .filter(comment::Column::PostId.eq(POST))
        .all(&ctx.db)
        .await
        .unwrap();
    assert_eq!(remaining.len(), before - subtree - 1);

    let ids: HashSet<i32> = remaining.iter().map(|c| c.id).collect();
    for comment in &remaining {
        if let Some(parent_id) = comment.parent_id {
            assert!(ids.contains(&parent_id), "{} lost its parent", comment.id);
        }
    }
}

#[tokio::test]
async fn unknown_comment_is_not_deleted() {
    let ctx = TestContext::new().await;
    ctx.insert(1, POST, None).await;
    let store = ctx.store();

    assert_eq!(SubtreeDeleter::new(&store).delete(99).await.unwrap(), None);
    assert_eq!(comment::Entity::find().count(&ctx.db).await.unwrap(), 1);
}
