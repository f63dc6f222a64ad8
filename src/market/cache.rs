//! Time-bounded single-value cache
//!
//! Holds the last good value for a fixed freshness window. Readers never
//! block each other; a writer only replaces the slot.

use tokio::sync::RwLock;
use tokio::time::{Duration, Instant};

pub struct TtlCache<T> {
    ttl: Duration,
    slot: RwLock<Option<(Instant, T)>>,
}

impl<T: Clone> TtlCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: RwLock::new(None),
        }
    }

    /// Cache that never holds a value
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    pub const fn is_enabled(&self) -> bool {
        !self.ttl.is_zero()
    }

    /// Return the cached value if it is still inside the freshness window
    pub async fn get(&self) -> Option<T> {
        if !self.is_enabled() {
            return None;
        }
        let slot = self.slot.read().await;
        slot.as_ref()
            .filter(|(stored_at, _)| stored_at.elapsed() < self.ttl)
            .map(|(_, value)| value.clone())
    }

    pub async fn insert(&self, value: T) {
        if !self.is_enabled() {
            return;
        }
        *self.slot.write().await = Some((Instant::now(), value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_value_served_within_window() {
        let cache = TtlCache::new(Duration::from_secs(300));
        assert_eq!(cache.get().await, None::<u32>);

        cache.insert(7).await;
        tokio::time::advance(Duration::from_secs(299)).await;
        assert_eq!(cache.get().await, Some(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_value_expires() {
        let cache = TtlCache::new(Duration::from_secs(300));
        cache.insert(7).await;
        tokio::time::advance(Duration::from_secs(300)).await;
        assert_eq!(cache.get().await, None);

        cache.insert(8).await;
        assert_eq!(cache.get().await, Some(8));
    }

    #[tokio::test]
    async fn test_disabled_cache_stores_nothing() {
        let cache = TtlCache::disabled();
        cache.insert("x").await;
        assert_eq!(cache.get().await, None);
        assert!(!cache.is_enabled());
    }
}
