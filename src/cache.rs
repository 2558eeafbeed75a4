//! Time-bounded memoization for shared resources
//!
//! A `TtlCell` holds one value and the instant it was built. Reads within the
//! time-to-live return a clone of the value; the first read after expiry
//! rebuilds it. A cell without a TTL keeps its value for the process lifetime.
//! Failed initializations are not stored, so the next read retries.

use std::future::Future;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

pub struct TtlCell<T> {
    ttl: Option<Duration>,
    slot: RwLock<Option<(T, Instant)>>,
}

impl<T: Clone> TtlCell<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl: Some(ttl),
            slot: RwLock::new(None),
        }
    }

    /// A cell whose value never expires
    pub fn for_lifetime() -> Self {
        Self {
            ttl: None,
            slot: RwLock::new(None),
        }
    }

    /// A lifetime cell already holding `value`
    pub fn preloaded(value: T) -> Self {
        Self {
            ttl: None,
            slot: RwLock::new(Some((value, Instant::now()))),
        }
    }

    fn is_fresh(&self, built_at: Instant) -> bool {
        match self.ttl {
            Some(ttl) => built_at.elapsed() < ttl,
            None => true,
        }
    }

    /// Returns the cached value, building it with `init` when absent or stale
    pub async fn get_or_try_init<F, Fut, E>(&self, init: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        // Check cache first
        {
            let slot = self.slot.read().await;
            if let Some((value, built_at)) = slot.as_ref() {
                if self.is_fresh(*built_at) {
                    return Ok(value.clone());
                }
            }
        }

        let mut slot = self.slot.write().await;
        // Another task may have rebuilt it while we waited for the lock
        if let Some((value, built_at)) = slot.as_ref() {
            if self.is_fresh(*built_at) {
                return Ok(value.clone());
            }
        }

        let value = init().await?;
        *slot = Some((value.clone(), Instant::now()));
        Ok(value)
    }

    pub async fn invalidate(&self) {
        let mut slot = self.slot.write().await;
        *slot = None;
    }

    pub async fn is_populated(&self) -> bool {
        let slot = self.slot.read().await;
        matches!(slot.as_ref(), Some((_, built_at)) if self.is_fresh(*built_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_value_is_reused_within_ttl() {
        let cell = TtlCell::new(Duration::from_secs(60));
        let builds = AtomicUsize::new(0);

        for _ in 0..3 {
            let value: Result<u32, ()> = cell
                .get_or_try_init(|| async {
                    builds.fetch_add(1, Ordering::SeqCst);
                    Ok(42)
                })
                .await;
            assert_eq!(value, Ok(42));
        }
        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_expired_value_is_rebuilt() {
        let cell = TtlCell::new(Duration::from_millis(10));
        let _: Result<u32, ()> = cell.get_or_try_init(|| async { Ok(1) }).await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(!cell.is_populated().await);

        let value: Result<u32, ()> = cell.get_or_try_init(|| async { Ok(2) }).await;
        assert_eq!(value, Ok(2));
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let cell: TtlCell<u32> = TtlCell::for_lifetime();
        let first: Result<u32, &str> = cell.get_or_try_init(|| async { Err("offline") }).await;
        assert_eq!(first, Err("offline"));
        assert!(!cell.is_populated().await);

        let second: Result<u32, &str> = cell.get_or_try_init(|| async { Ok(5) }).await;
        assert_eq!(second, Ok(5));
    }

    #[tokio::test]
    async fn test_invalidate_forces_rebuild() {
        let cell = TtlCell::for_lifetime();
        let _: Result<&str, ()> = cell.get_or_try_init(|| async { Ok("old") }).await;
        cell.invalidate().await;
        let value: Result<&str, ()> = cell.get_or_try_init(|| async { Ok("new") }).await;
        assert_eq!(value, Ok("new"));
    }

    #[tokio::test]
    async fn test_preloaded_skips_init() {
        let cell = TtlCell::preloaded(9u32);
        assert!(cell.is_populated().await);
        let value: Result<u32, ()> = cell.get_or_try_init(|| async { Ok(1) }).await;
        assert_eq!(value, Ok(9));
    }
}
