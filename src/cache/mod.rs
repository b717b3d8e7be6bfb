//! Per-post memoization of tree and flat views.

mod memory;

pub use memory::MemoryCache;

use crate::{
    PostId,
    error::Result,
    tree::{CommentNode, FlatComment},
};
use async_trait::async_trait;
use std::{
    collections::{HashMap, hash_map::Entry},
    future::Future,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

/// Which materialized view of a post's comments a cache entry holds
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ViewKind {
    Tree,
    Flat,
}

impl ViewKind {
    pub const ALL: [ViewKind; 2] = [ViewKind::Tree, ViewKind::Flat];

    pub fn cache_key(&self, post_id: PostId) -> String {
        match self {
            Self::Tree => format!("comment_tree:{post_id}"),
            Self::Flat => format!("comment_flat:{post_id}"),
        }
    }
}

/// A cached view, shared between all readers of the same post
#[derive(Clone, Debug)]
pub enum CachedView {
    Tree(Arc<Vec<CommentNode>>),
    Flat(Arc<Vec<FlatComment>>),
}

/// Key/value storage with sliding expiration, keyed by opaque strings.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Option<CachedView>;

    /// Store `value`, expiring it once it has gone unread for `idle`
    async fn set(&self, key: String, value: CachedView, idle: Duration);

    async fn remove(&self, key: &str);
}

/// A view type that can live in a [`TreeCache`]
pub trait CacheableView: Sized + Send + Sync {
    const KIND: ViewKind;

    fn into_cached(view: Arc<Self>) -> CachedView;

    fn from_cached(view: CachedView) -> Option<Arc<Self>>;
}

impl CacheableView for Vec<CommentNode> {
    const KIND: ViewKind = ViewKind::Tree;

    fn into_cached(view: Arc<Self>) -> CachedView {
        CachedView::Tree(view)
    }

    fn from_cached(view: CachedView) -> Option<Arc<Self>> {
        match view {
            CachedView::Tree(view) => Some(view),
            CachedView::Flat(_) => None,
        }
    }
}

impl CacheableView for Vec<FlatComment> {
    const KIND: ViewKind = ViewKind::Flat;

    fn into_cached(view: Arc<Self>) -> CachedView {
        CachedView::Flat(view)
    }

    fn from_cached(view: CachedView) -> Option<Arc<Self>> {
        match view {
            CachedView::Flat(view) => Some(view),
            CachedView::Tree(_) => None,
        }
    }
}

/// Populate-on-miss cache of materialized views, invalidated per post.
///
/// Concurrent misses on the same post may each rebuild; the last one stored
/// wins. While a post has rebuilds in flight it carries a generation that
/// [`invalidate`] bumps, and a rebuild only stays published if no
/// invalidation happened while it ran, so a view read from the store before a
/// mutation can never outlive that mutation's invalidation. A post's entry is
/// dropped once its last rebuild finishes.
///
/// [`invalidate`]: TreeCache::invalidate
#[derive(Debug)]
pub struct TreeCache<B> {
    backend: B,
    idle: Duration,
    rebuilds: Mutex<HashMap<PostId, Rebuilds>>,
}

#[derive(Debug, Default)]
struct Rebuilds {
    generation: u64,
    in_flight: usize,
}

/// Registers one rebuild of a post for as long as it lives
struct RebuildGuard<'a> {
    rebuilds: &'a Mutex<HashMap<PostId, Rebuilds>>,
    post_id: PostId,
    generation: u64,
}

impl<'a> RebuildGuard<'a> {
    fn begin(rebuilds: &'a Mutex<HashMap<PostId, Rebuilds>>, post_id: PostId) -> Self {
        let mut map = rebuilds.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = map.entry(post_id).or_default();
        entry.in_flight += 1;
        let generation = entry.generation;
        drop(map);
        Self {
            rebuilds,
            post_id,
            generation,
        }
    }

    /// No invalidation of the post since this rebuild began
    fn is_current(&self) -> bool {
        self.rebuilds
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&self.post_id)
            .is_some_and(|entry| entry.generation == self.generation)
    }
}

impl Drop for RebuildGuard<'_> {
    fn drop(&mut self) {
        let mut map = self.rebuilds.lock().unwrap_or_else(PoisonError::into_inner);
        if let Entry::Occupied(mut entry) = map.entry(self.post_id) {
            entry.get_mut().in_flight -= 1;
            if entry.get().in_flight == 0 {
                entry.remove();
            }
        }
    }
}

impl<B> TreeCache<B>
where
    B: CacheBackend,
{
    pub fn new(backend: B, idle: Duration) -> Self {
        Self {
            backend,
            idle,
            rebuilds: Mutex::new(HashMap::new()),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn idle(&self) -> Duration {
        self.idle
    }

    /// Cached view of kind `V::KIND` for `post_id`, or the result of `build`
    /// which is then cached. Build failures are returned and never cached.
    pub async fn get_or_build<V, F, Fut>(&self, post_id: PostId, build: F) -> Result<Arc<V>>
    where
        V: CacheableView,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        let key = V::KIND.cache_key(post_id);
        if let Some(view) = self.backend.get(&key).await.and_then(V::from_cached) {
            tracing::debug!(%key, "comment view cache hit");
            return Ok(view);
        }

        tracing::debug!(%key, "comment view cache miss");
        let rebuild = RebuildGuard::begin(&self.rebuilds, post_id);
        let view = Arc::new(build().await?);

        if rebuild.is_current() {
            self.backend
                .set(key.clone(), V::into_cached(view.clone()), self.idle)
                .await;
            // an invalidation may have slipped in between the check and the set
            if !rebuild.is_current() {
                self.backend.remove(&key).await;
            }
        } else {
            tracing::debug!(%key, "post changed during rebuild, not caching");
        }

        Ok(view)
    }

    /// Drop every cached view of `post_id`
    pub async fn invalidate(&self, post_id: PostId) {
        if let Some(entry) = self
            .rebuilds
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(&post_id)
        {
            entry.generation += 1;
        }
        for kind in ViewKind::ALL {
            self.backend.remove(&kind.cache_key(post_id)).await;
        }
        tracing::debug!(post_id, "invalidated comment views");
    }

    /// Posts with a rebuild currently in flight
    pub fn rebuilding(&self) -> usize {
        self.rebuilds
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
