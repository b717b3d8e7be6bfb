#![allow(dead_code)]

use comment_tree::{
    CommentId, CommentNode, DatabaseStore, PostId, UserId,
    entity::{comment, post, user},
    generator::{TreeShape, generate_comment_tree, insert_comments},
};
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, Database, DatabaseConnection, DbConn, DbErr, EntityTrait,
    ExecResult, Schema, Set,
};
use std::collections::BTreeSet;

pub const AUTHOR: UserId = 1;
pub const POST: PostId = 1;
pub const OTHER_POST: PostId = 2;

pub struct TestContext {
    pub db: DatabaseConnection,
}

impl TestContext {
    /// Fresh in-memory database with one author and two posts
    pub async fn new() -> Self {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let db = Database::connect("sqlite::memory:").await.unwrap();
        setup_schema(&db).await.unwrap();
        seed(&db).await.unwrap();

        Self { db }
    }

    pub fn store(&self) -> DatabaseStore {
        DatabaseStore::new(self.db.clone())
    }

    pub async fn insert(&self, id: CommentId, post_id: PostId, parent_id: Option<CommentId>) -> comment::Model {
        comment::ActiveModel {
            id: Set(id),
            post_id: Set(post_id),
            author_id: Set(AUTHOR),
            content: Set(format!("comment {id}")),
            parent_id: Set(parent_id),
            attachment_url: Set(None),
        }
        .insert(&self.db)
        .await
        .unwrap()
    }

    /// Insert a seeded forest under [`POST`] and return it
    pub async fn generate(&self, shape: TreeShape) -> Vec<comment::Model> {
        let comments = generate_comment_tree(POST, AUTHOR, 1, shape);
        insert_comments(&self.db, &comments).await.unwrap();
        comments
    }
}

async fn create_table<E>(db: &DbConn, entity: E) -> Result<ExecResult, DbErr>
where
    E: EntityTrait,
{
    let backend = db.get_database_backend();
    let stmt = Schema::new(backend).create_table_from_entity(entity);
    db.execute_raw(backend.build(&stmt)).await
}

pub async fn setup_schema(db: &DbConn) -> Result<(), DbErr> {
    create_table(db, user::Entity).await?;
    create_table(db, post::Entity).await?;
    create_table(db, comment::Entity).await?;
    Ok(())
}

async fn seed(db: &DbConn) -> Result<(), DbErr> {
    user::ActiveModel {
        id: Set(AUTHOR),
        name: Set("Alice".to_owned()),
    }
    .insert(db)
    .await?;

    for (id, title) in [(POST, "First post"), (OTHER_POST, "Second post")] {
        post::ActiveModel {
            id: Set(id),
            author_id: Set(AUTHOR),
            title: Set(title.to_owned()),
            content: Set(format!("{title} body")),
        }
        .insert(db)
        .await?;
    }
    Ok(())
}

/// Every comment id of a forest
pub fn node_set(roots: &[CommentNode]) -> BTreeSet<CommentId> {
    let mut ids = BTreeSet::new();
    let mut stack: Vec<&CommentNode> = roots.iter().collect();
    while let Some(node) = stack.pop() {
        ids.insert(node.id());
        stack.extend(node.replies.iter());
    }
    ids
}

/// Every `(parent, child)` edge of a forest
pub fn edge_set(roots: &[CommentNode]) -> BTreeSet<(CommentId, CommentId)> {
    roots.iter().flat_map(CommentNode::edges).collect()
}
