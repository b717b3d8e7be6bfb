use crate::{
    CommentId, PostId,
    cache::{CacheBackend, MemoryCache, TreeCache},
    config::TreeConfig,
    entity::comment,
    error::{RelationError, Result},
    store::{CommentStore, NewComment},
    tree::{BuildStrategy, CommentNode, FlatComment, SubtreeDeleter, TreeBuilder, flatten},
};
use std::{sync::Arc, time::Duration};

/// Read and write API over one [`CommentStore`].
///
/// Tree and flat views are served from a [`TreeCache`]; every mutation
/// invalidates the views of the post it touched once the store has confirmed
/// it.
#[derive(Debug)]
pub struct CommentService<S, B = MemoryCache> {
    store: S,
    cache: TreeCache<B>,
    strategy: Option<BuildStrategy>,
}

impl<S> CommentService<S>
where
    S: CommentStore,
{
    pub fn from_config(store: S, config: &TreeConfig) -> Self {
        let cache = TreeCache::new(MemoryCache::new(config.cache_max_capacity), config.cache_idle());
        Self {
            store,
            cache,
            strategy: config.strategy,
        }
    }

    /// In-memory cache with the given sliding expiration
    pub fn with_memory_cache(store: S, idle: Duration) -> Self {
        Self::new(store, TreeCache::new(MemoryCache::new(10_000), idle))
    }
}

impl<S, B> CommentService<S, B>
where
    S: CommentStore,
    B: CacheBackend,
{
    pub fn new(store: S, cache: TreeCache<B>) -> Self {
        Self {
            store,
            cache,
            strategy: None,
        }
    }

    /// Always build with `strategy` instead of choosing by store capability
    pub fn with_strategy(mut self, strategy: BuildStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn strategy(&self) -> BuildStrategy {
        self.strategy
            .unwrap_or_else(|| BuildStrategy::preferred(&self.store))
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn cache(&self) -> &TreeCache<B> {
        &self.cache
    }

    /// Nested comments of a post
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn comment_tree(&self, post_id: PostId) -> Result<Arc<Vec<CommentNode>>> {
        self.cache
            .get_or_build(post_id, || self.build_tree(post_id))
            .await
    }

    /// Pre-order listing of a post's comments with depth and path
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn flat_comments(&self, post_id: PostId) -> Result<Arc<Vec<FlatComment>>> {
        self.cache
            .get_or_build(post_id, || async move {
                let roots = self.build_tree(post_id).await?;
                Ok(flatten(&roots))
            })
            .await
    }

    /// Top-level comments with their direct replies, read straight from the store
    pub async fn comment_threads(&self, post_id: PostId, include_replies: bool) -> Result<Vec<CommentNode>> {
        TreeBuilder::new(&self.store)
            .threads(post_id, include_replies)
            .await
    }

    pub async fn find_comment(&self, id: CommentId) -> Result<Option<comment::Model>> {
        self.store.find_by_id(id).await
    }

    /// Store a new comment; a reply must name an existing comment of the same post
    #[tracing::instrument(level = "debug", skip(self, comment), fields(post_id = comment.post_id, parent_id = ?comment.parent_id))]
    pub async fn create_comment(&self, comment: NewComment) -> Result<comment::Model> {
        if let Some(parent_id) = comment.parent_id {
            let parent = self.store.find_by_id(parent_id).await?;
            if parent.is_none_or(|parent| parent.post_id != comment.post_id) {
                let violation = RelationError::UnknownParent {
                    parent_id,
                    post_id: comment.post_id,
                };
                tracing::warn!(%violation, "rejected reply");
                return Err(violation.into());
            }
        }

        let created = self.store.create(comment).await?;
        self.cache.invalidate(created.post_id).await;
        Ok(created)
    }

    /// `Ok(None)` when the comment does not exist
    #[tracing::instrument(level = "debug", skip(self, content))]
    pub async fn update_comment(&self, id: CommentId, content: String) -> Result<Option<comment::Model>> {
        let updated = self.store.update_content(id, content).await?;
        if let Some(comment) = &updated {
            self.cache.invalidate(comment.post_id).await;
        }
        Ok(updated)
    }

    /// Delete a comment and all of its replies; `false` when it does not exist
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn delete_comment(&self, id: CommentId) -> Result<bool> {
        match SubtreeDeleter::new(&self.store).delete(id).await? {
            Some(deleted) => {
                self.cache.invalidate(deleted.post_id).await;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn build_tree(&self, post_id: PostId) -> Result<Vec<CommentNode>> {
        TreeBuilder::new(&self.store)
            .build(post_id, self.strategy())
            .await
    }
}
