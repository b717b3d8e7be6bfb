//! The node store: where comment records live.

mod database;

pub use database::DatabaseStore;

use crate::{CommentId, PostId, UserId, entity::comment, error::Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Input of [`CommentStore::create`]; the id is generated by the store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewComment {
    pub post_id: PostId,
    pub author_id: UserId,
    pub content: String,
    pub parent_id: Option<CommentId>,
    pub attachment_url: Option<String>,
}

impl NewComment {
    pub fn top_level(post_id: PostId, author_id: UserId, content: impl Into<String>) -> Self {
        Self {
            post_id,
            author_id,
            content: content.into(),
            parent_id: None,
            attachment_url: None,
        }
    }

    pub fn reply(parent: &comment::Model, author_id: UserId, content: impl Into<String>) -> Self {
        Self {
            parent_id: Some(parent.id),
            ..Self::top_level(parent.post_id, author_id, content)
        }
    }

    pub fn with_attachment(mut self, url: impl Into<String>) -> Self {
        self.attachment_url = Some(url.into());
        self
    }
}

/// Fetches and persists comment records by post and by parent relation.
///
/// A store knows nothing about tree shape; the tree builder, flattener and
/// subtree deleter are layered on top of it. Every failure to reach or hear
/// back from the backing store is reported as
/// [`Error::StoreUnavailable`](crate::Error::StoreUnavailable).
#[async_trait]
pub trait CommentStore: Send + Sync {
    async fn find_by_id(&self, id: CommentId) -> Result<Option<comment::Model>>;

    /// Top-level comments of a post, followed by their direct replies when
    /// `include_replies` is set
    async fn fetch_by_post(&self, post_id: PostId, include_replies: bool) -> Result<Vec<comment::Model>>;

    /// Every comment of a post, in one round trip
    async fn fetch_all_by_post(&self, post_id: PostId) -> Result<Vec<comment::Model>>;

    /// Every comment of a post, resolved by a recursive query from the
    /// top-level comments when [`supports_recursive_query`] holds. Comments
    /// the query cannot reach are still returned, so that a parent cycle is
    /// reported by the caller instead of silently dropped.
    ///
    /// [`supports_recursive_query`]: CommentStore::supports_recursive_query
    async fn fetch_all_recursive(&self, post_id: PostId) -> Result<Vec<comment::Model>> {
        self.fetch_all_by_post(post_id).await
    }

    fn supports_recursive_query(&self) -> bool {
        false
    }

    async fn create(&self, comment: NewComment) -> Result<comment::Model>;

    /// `Ok(None)` when the comment does not exist
    async fn update_content(&self, id: CommentId, content: String) -> Result<Option<comment::Model>>;

    /// Deletes exactly one record
    async fn delete_by_id(&self, id: CommentId) -> Result<bool>;

    /// Deletes all `ids` in the given order, returning the number of records
    /// removed. Transactional stores override this to make the batch atomic;
    /// the fallback removes one record at a time.
    async fn delete_batch(&self, ids: &[CommentId]) -> Result<u64> {
        let mut removed = 0;
        for &id in ids {
            if self.delete_by_id(id).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}
