//! The keyed entity cache and mutation coordinator.
//!
//! [`SyncCache`] is the single source of truth for what the views currently
//! believe the server state is. Reads go through [`SyncCache::query`], which
//! caches by [`QueryKey`] and collapses concurrent fetches for the same key
//! into one flight. Writes go through [`SyncCache::mutate`], which invalidates
//! the declared keys only after the operation succeeds.
//!
//! Staleness is purely invalidation-driven — there is no time-based expiry.
//!
//! # Known non-determinism
//!
//! Fetches for *different* keys complete in whatever order the network
//! delivers; a later-issued but faster-completing fetch may land first.
//! Within one key there is no such race: the flight is single.
//! Invalidating a key while its fetch is in flight delivers the in-flight
//! result to its waiters but lands the entry stale, so the next read
//! refetches rather than trusting pre-mutation data.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

use crate::error::{Error, Result};
use crate::key::QueryKey;

// ============================================================================
// Freshness
// ============================================================================

/// Freshness state of a cache entry: whether it is safe to return without
/// refetching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Freshness {
    /// Never fetched.
    #[default]
    Absent,
    /// A fetch is in flight.
    Loading,
    /// Cached and safe to return.
    Fresh,
    /// Invalidated; the next query refetches.
    Stale,
    /// The last fetch failed; the next query refetches.
    Errored,
}

impl fmt::Display for Freshness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => write!(f, "absent"),
            Self::Loading => write!(f, "loading"),
            Self::Fresh => write!(f, "fresh"),
            Self::Stale => write!(f, "stale"),
            Self::Errored => write!(f, "errored"),
        }
    }
}

// ============================================================================
// SyncCache
// ============================================================================

/// Type-erased cached value. Each key stores whatever type its fetcher
/// returns; readers get it back as `Arc<T>` via downcast.
type Stored = Arc<dyn Any + Send + Sync>;

#[derive(Default)]
struct Slot {
    freshness: Freshness,
    value: Option<Stored>,
    error: Option<String>,
    /// Completion channel of the in-flight fetch, present while Loading.
    done: Option<watch::Receiver<bool>>,
    /// Set when the entry is invalidated mid-flight: the result still goes
    /// to its waiters but the entry lands stale.
    land_stale: bool,
}

/// What `begin` decided for a query.
enum Begin {
    /// Fresh value available.
    Hit(Stored),
    /// A flight is up; join it.
    Wait(watch::Receiver<bool>),
    /// This caller runs the fetch and completes the channel.
    Lead(watch::Sender<bool>),
}

/// What a joined waiter sees once the flight settles.
enum Observed {
    Ready(Stored),
    Failed(String),
    /// A new flight replaced the one we were waiting on.
    Pending(watch::Receiver<bool>),
    NeedsFetch,
}

/// The process-wide cache and mutation coordinator.
///
/// Cheap to clone (Arc internals); all clones share one cache.
#[derive(Clone, Default)]
pub struct SyncCache {
    inner: Arc<Mutex<HashMap<QueryKey, Slot>>>,
}

impl SyncCache {
    /// Empty cache: every key starts absent.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read through the cache.
    ///
    /// Returns the cached value when the entry is fresh. Otherwise runs
    /// `fetcher` (or joins the flight already running for this key), stores
    /// the result, marks the entry fresh, and returns it. Exactly one
    /// fetcher runs per key per flight; concurrent callers all observe that
    /// flight's result. A failed fetch marks the entry errored and every
    /// joined caller gets the same [`Error::Fetch`].
    pub async fn query<T, E, F, Fut>(&self, key: QueryKey, fetcher: F) -> Result<Arc<T>>
    where
        T: Send + Sync + 'static,
        E: fmt::Display,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        let completion = loop {
            match self.begin(&key) {
                Begin::Hit(value) => return Self::downcast(&key, value),
                Begin::Lead(tx) => break tx,
                Begin::Wait(rx) => match self.join_flight(&key, rx).await {
                    Some(outcome) => return outcome,
                    None => continue,
                },
            }
        };

        log::debug!("Fetching '{key}'");
        match fetcher().await {
            Ok(value) => {
                let value = Arc::new(value);
                let stored: Stored = value.clone();
                self.finish(&key, Ok(stored));
                let _ = completion.send(true);
                Ok(value)
            }
            Err(e) => {
                let message = e.to_string();
                log::debug!("Fetch for '{key}' failed: {message}");
                self.finish(&key, Err(message.clone()));
                let _ = completion.send(true);
                Err(Error::Fetch { key, message })
            }
        }
    }

    /// Run a write operation, invalidating the declared keys on success.
    ///
    /// On failure the cache is left untouched and the operation's own error
    /// comes back unchanged — no retry, no partial invalidation.
    pub async fn mutate<T, E, F, Fut>(
        &self,
        invalidates: &[QueryKey],
        op: F,
    ) -> std::result::Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        let output = op().await?;
        for key in invalidates {
            self.invalidate(key);
        }
        Ok(output)
    }

    /// Mark an entry stale so the next query refetches.
    ///
    /// An entry with a fetch in flight is flagged to land stale instead; an
    /// absent entry stays absent.
    pub fn invalidate(&self, key: &QueryKey) {
        let mut map = self.lock();
        let Some(slot) = map.get_mut(key) else {
            return;
        };
        match slot.freshness {
            Freshness::Loading => slot.land_stale = true,
            Freshness::Absent => {}
            _ => slot.freshness = Freshness::Stale,
        }
        log::debug!("Invalidated '{key}'");
    }

    /// User-triggered full resync: unconditionally invalidate the fixed
    /// top-level key set.
    pub fn refresh_all(&self) {
        log::info!("Refreshing all top-level views");
        for key in &QueryKey::TOP_LEVEL {
            self.invalidate(key);
        }
    }

    /// Current freshness of a key.
    pub fn freshness(&self, key: &QueryKey) -> Freshness {
        self.lock()
            .get(key)
            .map(|slot| slot.freshness)
            .unwrap_or_default()
    }

    /// Message of the most recent failed fetch for a key, if any.
    pub fn last_error(&self, key: &QueryKey) -> Option<String> {
        self.lock().get(key).and_then(|slot| slot.error.clone())
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn begin(&self, key: &QueryKey) -> Begin {
        let mut map = self.lock();
        let slot = map.entry(key.clone()).or_default();
        match slot.freshness {
            Freshness::Fresh => match &slot.value {
                Some(value) => Begin::Hit(value.clone()),
                None => Self::start_flight(slot),
            },
            Freshness::Loading => match &slot.done {
                // A closed completion channel means the leader was dropped
                // mid-flight; take the fetch over.
                Some(rx) if rx.has_changed().is_ok() => Begin::Wait(rx.clone()),
                _ => Self::start_flight(slot),
            },
            Freshness::Absent | Freshness::Stale | Freshness::Errored => Self::start_flight(slot),
        }
    }

    fn start_flight(slot: &mut Slot) -> Begin {
        let (tx, rx) = watch::channel(false);
        slot.freshness = Freshness::Loading;
        slot.done = Some(rx);
        slot.land_stale = false;
        Begin::Lead(tx)
    }

    /// Wait on a flight's completion and report its outcome. `None` means
    /// the entry needs a fresh fetch (e.g. it landed stale); the caller
    /// loops back to `begin`.
    async fn join_flight<T>(
        &self,
        key: &QueryKey,
        mut rx: watch::Receiver<bool>,
    ) -> Option<Result<Arc<T>>>
    where
        T: Send + Sync + 'static,
    {
        loop {
            // Err means the leader was dropped; re-inspect either way.
            let _ = rx.changed().await;
            match self.observe(key) {
                Observed::Ready(value) => return Some(Self::downcast(key, value)),
                Observed::Failed(message) => {
                    return Some(Err(Error::Fetch {
                        key: key.clone(),
                        message,
                    }));
                }
                Observed::Pending(next) => rx = next,
                Observed::NeedsFetch => return None,
            }
        }
    }

    fn observe(&self, key: &QueryKey) -> Observed {
        let map = self.lock();
        let Some(slot) = map.get(key) else {
            return Observed::NeedsFetch;
        };
        match slot.freshness {
            Freshness::Fresh => match &slot.value {
                Some(value) => Observed::Ready(value.clone()),
                None => Observed::NeedsFetch,
            },
            Freshness::Errored => Observed::Failed(
                slot.error
                    .clone()
                    .unwrap_or_else(|| "fetch failed".to_string()),
            ),
            Freshness::Loading => match &slot.done {
                Some(rx) if rx.has_changed().is_ok() => Observed::Pending(rx.clone()),
                _ => Observed::NeedsFetch,
            },
            Freshness::Absent | Freshness::Stale => Observed::NeedsFetch,
        }
    }

    /// Record a flight's outcome. A successful result lands fresh unless the
    /// entry was invalidated mid-flight; a failure keeps any previous value
    /// and records the message.
    fn finish(&self, key: &QueryKey, outcome: std::result::Result<Stored, String>) {
        let mut map = self.lock();
        let Some(slot) = map.get_mut(key) else {
            return;
        };
        match outcome {
            Ok(value) => {
                slot.value = Some(value);
                slot.error = None;
                slot.freshness = if slot.land_stale {
                    Freshness::Stale
                } else {
                    Freshness::Fresh
                };
            }
            Err(message) => {
                slot.error = Some(message);
                slot.freshness = Freshness::Errored;
            }
        }
        slot.land_stale = false;
        slot.done = None;
    }

    fn downcast<T: Send + Sync + 'static>(key: &QueryKey, value: Stored) -> Result<Arc<T>> {
        value.downcast().map_err(|_| Error::Type { key: key.clone() })
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<QueryKey, Slot>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for SyncCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let map = self.lock();
        let mut entries = f.debug_map();
        for (key, slot) in map.iter() {
            entries.entry(&key.to_string(), &slot.freshness.to_string());
        }
        entries.finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    async fn counted_fetch(
        counter: Arc<AtomicUsize>,
        value: Vec<String>,
    ) -> std::result::Result<Vec<String>, String> {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(value)
    }

    fn tasks(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_freshness_display() {
        assert_eq!(Freshness::Absent.to_string(), "absent");
        assert_eq!(Freshness::Loading.to_string(), "loading");
        assert_eq!(Freshness::Fresh.to_string(), "fresh");
        assert_eq!(Freshness::Stale.to_string(), "stale");
        assert_eq!(Freshness::Errored.to_string(), "errored");
    }

    #[test]
    fn test_unknown_key_is_absent() {
        let cache = SyncCache::new();
        assert_eq!(cache.freshness(&QueryKey::Projects), Freshness::Absent);
        assert_eq!(cache.last_error(&QueryKey::Projects), None);
    }

    #[tokio::test]
    async fn test_query_fetches_once_then_hits_cache() {
        let cache = SyncCache::new();
        let fetches = Arc::new(AtomicUsize::new(0));

        let first = cache
            .query(QueryKey::Tasks, || counted_fetch(fetches.clone(), tasks(&["t1"])))
            .await
            .unwrap();
        assert_eq!(*first, tasks(&["t1"]));
        assert_eq!(cache.freshness(&QueryKey::Tasks), Freshness::Fresh);

        let second = cache
            .query(QueryKey::Tasks, || counted_fetch(fetches.clone(), tasks(&["t2"])))
            .await
            .unwrap();
        // The second fetcher never ran; the cached value came back.
        assert_eq!(*second, tasks(&["t1"]));
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_queries_deduplicate() {
        let cache = SyncCache::new();
        let fetches = Arc::new(AtomicUsize::new(0));

        let slow_fetch = || {
            let fetches = fetches.clone();
            async move {
                fetches.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok::<_, String>(tasks(&["t1", "t2"]))
            }
        };

        let (a, b, c) = tokio::join!(
            cache.query(QueryKey::Tasks, slow_fetch.clone()),
            cache.query(QueryKey::Tasks, slow_fetch.clone()),
            cache.query(QueryKey::Tasks, slow_fetch),
        );

        assert_eq!(fetches.load(Ordering::SeqCst), 1);
        assert_eq!(*a.unwrap(), tasks(&["t1", "t2"]));
        assert_eq!(*b.unwrap(), tasks(&["t1", "t2"]));
        assert_eq!(*c.unwrap(), tasks(&["t1", "t2"]));
    }

    #[tokio::test]
    async fn test_invalidate_triggers_exactly_one_refetch() {
        let cache = SyncCache::new();
        let fetches = Arc::new(AtomicUsize::new(0));

        cache
            .query(QueryKey::Projects, || counted_fetch(fetches.clone(), tasks(&["a"])))
            .await
            .unwrap();

        cache.invalidate(&QueryKey::Projects);
        assert_eq!(cache.freshness(&QueryKey::Projects), Freshness::Stale);

        let refetched = cache
            .query(QueryKey::Projects, || counted_fetch(fetches.clone(), tasks(&["b"])))
            .await
            .unwrap();
        assert_eq!(*refetched, tasks(&["b"]));
        assert_eq!(fetches.load(Ordering::SeqCst), 2);
        assert_eq!(cache.freshness(&QueryKey::Projects), Freshness::Fresh);
    }

    #[tokio::test]
    async fn test_invalidate_absent_key_stays_absent() {
        let cache = SyncCache::new();
        cache.invalidate(&QueryKey::Team);
        assert_eq!(cache.freshness(&QueryKey::Team), Freshness::Absent);
    }

    #[tokio::test]
    async fn test_mutate_success_invalidates_declared_keys_only() {
        let cache = SyncCache::new();
        let fetches = Arc::new(AtomicUsize::new(0));

        for key in [QueryKey::Finance, QueryKey::FinanceRaw, QueryKey::Tasks] {
            cache
                .query(key, || counted_fetch(fetches.clone(), tasks(&["seed"])))
                .await
                .unwrap();
        }

        cache
            .mutate(&[QueryKey::Finance, QueryKey::FinanceRaw], || async {
                Ok::<_, String>("created")
            })
            .await
            .unwrap();

        assert_eq!(cache.freshness(&QueryKey::Finance), Freshness::Stale);
        assert_eq!(cache.freshness(&QueryKey::FinanceRaw), Freshness::Stale);
        // Undeclared keys keep their cached value.
        assert_eq!(cache.freshness(&QueryKey::Tasks), Freshness::Fresh);
    }

    #[tokio::test]
    async fn test_mutate_failure_leaves_cache_untouched() {
        let cache = SyncCache::new();
        let fetches = Arc::new(AtomicUsize::new(0));

        cache
            .query(QueryKey::Tasks, || {
                counted_fetch(fetches.clone(), tasks(&["t1", "t2"]))
            })
            .await
            .unwrap();

        let err = cache
            .mutate(&[QueryKey::Tasks], || async {
                Err::<(), String>("HTTP 500 Internal Server Error: boom".to_string())
            })
            .await
            .unwrap_err();
        assert_eq!(err, "HTTP 500 Internal Server Error: boom");

        // The entry is still fresh and still contains t1.
        assert_eq!(cache.freshness(&QueryKey::Tasks), Freshness::Fresh);
        let cached = cache
            .query(QueryKey::Tasks, || counted_fetch(fetches.clone(), tasks(&[])))
            .await
            .unwrap();
        assert!(cached.contains(&"t1".to_string()));
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_fetch_marks_errored_and_next_query_refetches() {
        let cache = SyncCache::new();

        let err = cache
            .query(QueryKey::Clients, || async {
                Err::<Vec<String>, String>("connection reset".to_string())
            })
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "fetch for 'clients' failed: connection reset"
        );
        assert_eq!(cache.freshness(&QueryKey::Clients), Freshness::Errored);
        assert_eq!(
            cache.last_error(&QueryKey::Clients),
            Some("connection reset".to_string())
        );

        // The next query retries and clears the error.
        let value = cache
            .query(QueryKey::Clients, || async {
                Ok::<_, String>(tasks(&["c1"]))
            })
            .await
            .unwrap();
        assert_eq!(*value, tasks(&["c1"]));
        assert_eq!(cache.freshness(&QueryKey::Clients), Freshness::Fresh);
        assert_eq!(cache.last_error(&QueryKey::Clients), None);
    }

    #[tokio::test]
    async fn test_joined_waiter_observes_the_flights_error() {
        let cache = SyncCache::new();
        let fetches = Arc::new(AtomicUsize::new(0));

        let leader = {
            let cache = cache.clone();
            let fetches = fetches.clone();
            tokio::spawn(async move {
                cache
                    .query(QueryKey::Team, || {
                        let fetches = fetches.clone();
                        async move {
                            fetches.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(30)).await;
                            Err::<Vec<String>, String>("boom".to_string())
                        }
                    })
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(5)).await;
        let joined = cache
            .query(QueryKey::Team, || {
                let fetches = fetches.clone();
                async move {
                    fetches.fetch_add(1, Ordering::SeqCst);
                    Ok::<Vec<String>, String>(tasks(&["never"]))
                }
            })
            .await;

        let led = leader.await.unwrap();
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
        assert_eq!(
            led.unwrap_err().to_string(),
            "fetch for 'team' failed: boom"
        );
        assert_eq!(
            joined.unwrap_err().to_string(),
            "fetch for 'team' failed: boom"
        );
    }

    #[tokio::test]
    async fn test_invalidate_during_flight_lands_stale() {
        let cache = SyncCache::new();
        let fetches = Arc::new(AtomicUsize::new(0));

        let leader = {
            let cache = cache.clone();
            let fetches = fetches.clone();
            tokio::spawn(async move {
                cache
                    .query(QueryKey::Tasks, || {
                        let fetches = fetches.clone();
                        async move {
                            fetches.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(30)).await;
                            Ok::<_, String>(tasks(&["pre-mutation"]))
                        }
                    })
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(cache.freshness(&QueryKey::Tasks), Freshness::Loading);
        cache.invalidate(&QueryKey::Tasks);

        // The in-flight result is still delivered to its caller...
        let value = leader.await.unwrap().unwrap();
        assert_eq!(*value, tasks(&["pre-mutation"]));
        // ...but the entry landed stale, so the next read refetches.
        assert_eq!(cache.freshness(&QueryKey::Tasks), Freshness::Stale);
        cache
            .query(QueryKey::Tasks, || {
                counted_fetch(fetches.clone(), tasks(&["post-mutation"]))
            })
            .await
            .unwrap();
        assert_eq!(fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_refresh_all_marks_top_level_stale() {
        let cache = SyncCache::new();
        let fetches = Arc::new(AtomicUsize::new(0));

        for key in [
            QueryKey::Projects,
            QueryKey::Finance,
            QueryKey::Tasks,
            QueryKey::Clients,
            QueryKey::Team,
            QueryKey::Overview,
        ] {
            cache
                .query(key, || counted_fetch(fetches.clone(), tasks(&["seed"])))
                .await
                .unwrap();
        }

        cache.refresh_all();

        for key in &QueryKey::TOP_LEVEL {
            assert_eq!(cache.freshness(key), Freshness::Stale, "key {key}");
        }
        // Overview is not part of the fixed top-level set.
        assert_eq!(cache.freshness(&QueryKey::Overview), Freshness::Fresh);
    }

    #[tokio::test]
    async fn test_type_mismatch_is_reported() {
        let cache = SyncCache::new();
        cache
            .query(QueryKey::Tasks, || async {
                Ok::<_, String>(tasks(&["t1"]))
            })
            .await
            .unwrap();

        let err = cache
            .query(QueryKey::Tasks, || async { Ok::<u64, String>(7) })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Type { .. }));
    }

    #[tokio::test]
    async fn test_clones_share_the_cache() {
        let cache = SyncCache::new();
        let fetches = Arc::new(AtomicUsize::new(0));

        cache
            .query(QueryKey::Projects, || counted_fetch(fetches.clone(), tasks(&["p"])))
            .await
            .unwrap();

        let clone = cache.clone();
        clone
            .query(QueryKey::Projects, || counted_fetch(fetches.clone(), tasks(&["q"])))
            .await
            .unwrap();
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    // Compile-time check: the cache must be shareable across tasks.
    fn _assert_send_sync<T: Send + Sync>() {}
    #[test]
    fn test_cache_send_sync() {
        _assert_send_sync::<SyncCache>();
        _assert_send_sync::<Freshness>();
    }
}
