use super::{CacheBackend, CachedView};
use async_trait::async_trait;
use moka::{Expiry, future::Cache};
use std::time::{Duration, Instant};

/// In-process [`CacheBackend`] on a bounded `moka` cache.
///
/// Each entry carries its own idle period; reading an entry restarts it.
#[derive(Clone, Debug)]
pub struct MemoryCache {
    inner: Cache<String, Entry>,
}

#[derive(Clone, Debug)]
struct Entry {
    view: CachedView,
    idle: Duration,
}

struct SlidingExpiry;

impl Expiry<String, Entry> for SlidingExpiry {
    fn expire_after_create(&self, _key: &String, value: &Entry, _created_at: Instant) -> Option<Duration> {
        Some(value.idle)
    }

    fn expire_after_read(
        &self,
        _key: &String,
        value: &Entry,
        _read_at: Instant,
        _duration_until_expiry: Option<Duration>,
        _last_modified_at: Instant,
    ) -> Option<Duration> {
        Some(value.idle)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.idle)
    }
}

impl MemoryCache {
    pub fn new(max_capacity: u64) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_capacity)
                .expire_after(SlidingExpiry)
                .build(),
        }
    }

    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn get(&self, key: &str) -> Option<CachedView> {
        self.inner.get(key).await.map(|entry| entry.view)
    }

    async fn set(&self, key: String, value: CachedView, idle: Duration) {
        self.inner.insert(key, Entry { view: value, idle }).await;
    }

    async fn remove(&self, key: &str) {
        self.inner.invalidate(key).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn view() -> CachedView {
        CachedView::Flat(Arc::new(Vec::new()))
    }

    #[tokio::test]
    async fn set_get_remove() {
        let cache = MemoryCache::new(10);
        cache.set("a".to_owned(), view(), Duration::from_secs(60)).await;

        assert!(matches!(cache.get("a").await, Some(CachedView::Flat(_))));
        assert!(cache.get("b").await.is_none());

        cache.remove("a").await;
        assert!(cache.get("a").await.is_none());
    }

    #[tokio::test]
    async fn reads_extend_idle_expiry() {
        let cache = MemoryCache::new(10);
        let idle = Duration::from_millis(400);
        cache.set("a".to_owned(), view(), idle).await;

        // three reads spaced under the idle period keep the entry alive well
        // past its first deadline
        for _ in 0..3 {
            tokio::time::sleep(Duration::from_millis(200)).await;
            assert!(cache.get("a").await.is_some());
        }

        tokio::time::sleep(Duration::from_millis(800)).await;
        assert!(cache.get("a").await.is_none());
    }
}
