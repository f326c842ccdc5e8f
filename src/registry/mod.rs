use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, instrument};

pub mod client;
mod error;
mod lifetime;
pub mod message;
pub mod server;

pub use error::Error;
pub use lifetime::Lifetime;

/// A lease currently recorded for a resource. It may already be expired:
/// stale entries are only replaced when the resource is locked again.
///
/// `expires_at` is read from the monotonic clock, so wall clock steps do not
/// move it. `None` means the lease never expires.
#[derive(Clone, Debug, PartialEq)]
pub struct LockEntry {
    pub version: u64,
    pub expires_at: Option<Instant>,
}

impl LockEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|expires_at| now < expires_at)
    }
}

#[derive(Debug, Default)]
struct State {
    entries: HashMap<String, LockEntry>,
    last_version: u64,
}

/// In-memory lock table.
///
/// Every operation holds the same mutex for its whole read-check-write
/// sequence, which also serializes the fencing token counter shared by all
/// resources.
#[derive(Clone, Debug, Default)]
pub struct Registry {
    state: Arc<Mutex<State>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire `resource` for `lifetime` and return its fencing token.
    ///
    /// # Errors
    ///
    /// * `Error::AlreadyLocked` if a non-expired lease exists for `resource`
    /// * `Error::VersionExhausted` if the token counter cannot be incremented
    #[instrument(skip(self))]
    pub async fn lock(&self, resource: &str, lifetime: Lifetime) -> Result<u64, Error> {
        let mut state = self.state.lock().await;
        let now = Instant::now();

        if let Some(previous) = state.entries.get(resource) {
            if previous.is_live(now) {
                debug!(version = previous.version, "Lease is still live");
                return Err(Error::AlreadyLocked(resource.to_string()));
            }
            debug!(version = previous.version, "Replacing expired lease");
        }

        let version = state
            .last_version
            .checked_add(1)
            .ok_or(Error::VersionExhausted)?;
        state.last_version = version;
        state.entries.insert(
            resource.to_string(),
            LockEntry {
                version,
                expires_at: lifetime.expires_after(now),
            },
        );

        debug!(version, "Lease granted");
        Ok(version)
    }

    /// Release `resource` if `version` is the token of the recorded lease.
    /// Expiration is not checked.
    ///
    /// # Errors
    ///
    /// * `Error::AlreadyUnlocked` if no lease is recorded for `resource`
    /// * `Error::VersionMismatch` if the recorded lease has another token
    #[instrument(skip(self))]
    pub async fn unlock(&self, resource: &str, version: u64) -> Result<(), Error> {
        let mut state = self.state.lock().await;

        let Some(previous) = state.entries.get(resource) else {
            return Err(Error::AlreadyUnlocked(resource.to_string()));
        };
        if previous.version != version {
            return Err(Error::VersionMismatch {
                resource: resource.to_string(),
                expected: previous.version,
                got: version,
            });
        }

        state.entries.remove(resource);
        debug!("Lease released");
        Ok(())
    }

    /// Number of recorded leases, expired ones included.
    pub async fn entry_count(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    #[cfg(test)]
    pub async fn entry(&self, resource: &str) -> Option<LockEntry> {
        self.state.lock().await.entries.get(resource).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn one_minute() -> Lifetime {
        Lifetime::from_secs(60)
    }

    #[tokio::test]
    async fn test_lock_returns_increasing_versions_across_resources() {
        let registry = Registry::new();

        let mut previous = 0;
        for resource in ["a", "b", "c", "d"] {
            let version = registry.lock(resource, one_minute()).await.unwrap();
            assert!(version > previous);
            previous = version;
        }
        assert_eq!(previous, 4);
    }

    #[tokio::test]
    async fn test_lock_live_resource_fails() {
        let registry = Registry::new();

        let version = registry.lock("foo", one_minute()).await.unwrap();
        let error = registry.lock("foo", one_minute()).await.unwrap_err();
        assert_eq!(error, Error::AlreadyLocked("foo".to_string()));

        // the first lease is untouched and still releasable
        assert_eq!(registry.entry("foo").await.unwrap().version, version);
        registry.unlock("foo", version).await.unwrap();
    }

    #[tokio::test]
    async fn test_unlock_then_relock() {
        let registry = Registry::new();

        let first = registry.lock("foo", one_minute()).await.unwrap();
        registry.unlock("foo", first).await.unwrap();
        assert_eq!(registry.entry_count().await, 0);

        let second = registry.lock("foo", one_minute()).await.unwrap();
        assert!(second > first);
    }

    #[tokio::test]
    async fn test_unlock_never_locked() {
        let registry = Registry::new();

        let error = registry.unlock("foo", 1).await.unwrap_err();
        assert_eq!(error, Error::AlreadyUnlocked("foo".to_string()));
    }

    #[tokio::test]
    async fn test_unlock_twice() {
        let registry = Registry::new();

        let version = registry.lock("foo", one_minute()).await.unwrap();
        registry.unlock("foo", version).await.unwrap();

        let error = registry.unlock("foo", version).await.unwrap_err();
        assert_eq!(error, Error::AlreadyUnlocked("foo".to_string()));
    }

    #[tokio::test]
    async fn test_unlock_wrong_version_keeps_entry() {
        let registry = Registry::new();

        let version = registry.lock("foo", one_minute()).await.unwrap();
        let error = registry.unlock("foo", version + 1).await.unwrap_err();
        assert_eq!(
            error,
            Error::VersionMismatch {
                resource: "foo".to_string(),
                expected: version,
                got: version + 1,
            }
        );

        assert!(registry.entry("foo").await.is_some());
        registry.unlock("foo", version).await.unwrap();
    }

    #[tokio::test]
    async fn test_zero_and_negative_lifetimes_are_already_expired() {
        let registry = Registry::new();

        let first = registry.lock("foo", Lifetime::from_nanos(0)).await.unwrap();
        let second = registry.lock("foo", one_minute()).await.unwrap();
        assert!(second > first);

        let third = registry.lock("bar", Lifetime::from_secs(-5)).await.unwrap();
        let fourth = registry.lock("bar", one_minute()).await.unwrap();
        assert!(fourth > third);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lock_after_expiry() {
        let registry = Registry::new();

        let first = registry.lock("foo", Lifetime::from_secs(10)).await.unwrap();

        tokio::time::advance(Duration::from_secs(9)).await;
        assert!(registry.lock("foo", one_minute()).await.is_err());

        // expiry is exclusive: a lease expiring exactly now is stale
        tokio::time::advance(Duration::from_secs(1)).await;
        let second = registry.lock("foo", one_minute()).await.unwrap();
        assert_eq!(second, first + 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unlock_ignores_expiry() {
        let registry = Registry::new();

        let version = registry.lock("foo", Lifetime::from_secs(1)).await.unwrap();
        tokio::time::advance(Duration::from_secs(3600)).await;

        registry.unlock("foo", version).await.unwrap();
        assert!(registry.entry("foo").await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_unlock_after_takeover_is_rejected() {
        let registry = Registry::new();

        let stale = registry.lock("foo", Lifetime::from_secs(1)).await.unwrap();
        tokio::time::advance(Duration::from_secs(2)).await;
        let current = registry.lock("foo", one_minute()).await.unwrap();

        let error = registry.unlock("foo", stale).await.unwrap_err();
        assert_eq!(
            error,
            Error::VersionMismatch {
                resource: "foo".to_string(),
                expected: current,
                got: stale,
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entries_are_not_reclaimed() {
        let registry = Registry::new();

        registry.lock("foo", Lifetime::from_secs(1)).await.unwrap();
        registry.lock("bar", Lifetime::from_secs(1)).await.unwrap();
        tokio::time::advance(Duration::from_secs(300)).await;

        assert_eq!(registry.entry_count().await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiration_is_a_monotonic_deadline() {
        let registry = Registry::new();
        let now = Instant::now();

        let version = registry.lock("foo", Lifetime::from_secs(30)).await.unwrap();
        assert_eq!(
            registry.entry("foo").await,
            Some(LockEntry {
                version,
                expires_at: Some(now + Duration::from_secs(30)),
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_maximum_lifetime_outlasts_a_year() {
        let registry = Registry::new();

        let version = registry
            .lock("foo", Lifetime::from_nanos(i64::MAX))
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(365 * 24 * 3600)).await;

        assert!(registry.lock("foo", one_minute()).await.is_err());
        registry.unlock("foo", version).await.unwrap();
    }

    #[tokio::test]
    async fn test_version_counter_exhaustion() {
        let registry = Registry::new();
        registry.state.lock().await.last_version = u64::MAX - 1;

        assert_eq!(registry.lock("foo", one_minute()).await, Ok(u64::MAX));
        assert_eq!(
            registry.lock("bar", one_minute()).await,
            Err(Error::VersionExhausted)
        );
        assert!(registry.entry("bar").await.is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_lock_single_winner() {
        let registry = Registry::new();
        let contenders = 64;

        let handles = (0..contenders)
            .map(|_| {
                let registry = registry.clone();
                tokio::spawn(async move { registry.lock("foo", one_minute()).await })
            })
            .collect::<Vec<_>>();

        let mut winners = Vec::new();
        let mut losers = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(version) => winners.push(version),
                Err(Error::AlreadyLocked(resource)) => {
                    assert_eq!(resource, "foo");
                    losers += 1;
                }
                Err(error) => panic!("unexpected error: {error}"),
            }
        }

        assert_eq!(winners, vec![1]);
        assert_eq!(losers, contenders - 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_versions_are_unique() {
        let registry = Registry::new();

        let handles = (0..100)
            .map(|i| {
                let registry = registry.clone();
                tokio::spawn(async move {
                    registry
                        .lock(&format!("resource-{i}"), one_minute())
                        .await
                })
            })
            .collect::<Vec<_>>();

        let mut versions = Vec::new();
        for handle in handles {
            versions.push(handle.await.unwrap().unwrap());
        }
        versions.sort_unstable();
        versions.dedup();
        assert_eq!(versions, (1..=100).collect::<Vec<u64>>());
    }
}
