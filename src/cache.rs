//! In-memory query cache with stale-while-revalidate, request coalescing,
//! declarative retry and observer-based garbage collection.
//!
//! # Resolution
//!
//! ```text
//! resolve(key) ──► fresh value?  ── yes ─► return value (no fetch)
//!                      │ no
//!                      ▼
//!                  stale value? ── yes ─► return value, start one background refresh
//!                      │ no
//!                      ▼
//!                  in flight?   ── yes ─► wait on the in-flight broadcast
//!                      │ no
//!                      ▼
//!                  sticky error? ─ yes ─► return the error (until invalidated)
//!                      │ no
//!                      ▼
//!                  spawn fetch task, wait on its broadcast
//! ```
//!
//! Fetches run on spawned tasks, so a background refresh finishes even when
//! nobody awaits it. The task stores its outcome and broadcasts it to every
//! waiter while holding the same lock under which waiters subscribe, so no
//! waiter can miss the result.

use crate::error::QueryError;
use crate::keys::{ResourceKey, ResourceKind};
use crate::retry::{run_with_retry, RetryPolicy};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::Instant;

pub const DEFAULT_STALE_TIME: Duration = Duration::from_secs(60 * 60);
pub const DEFAULT_GC_TIME: Duration = Duration::from_secs(10 * 60);

/// Staleness, GC and retry settings. Per-kind overrides are plain config.
#[derive(Clone, Debug)]
pub struct CachePolicy {
    pub stale_time: Duration,
    pub stale_overrides: HashMap<ResourceKind, Duration>,
    pub gc_time: Duration,
    pub retry: RetryPolicy,
    pub retry_overrides: HashMap<ResourceKind, u32>,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            stale_time: DEFAULT_STALE_TIME,
            stale_overrides: HashMap::new(),
            gc_time: DEFAULT_GC_TIME,
            retry: RetryPolicy::default(),
            retry_overrides: HashMap::new(),
        }
    }
}

impl CachePolicy {
    pub fn stale_time_for(&self, kind: ResourceKind) -> Duration {
        self.stale_overrides
            .get(&kind)
            .copied()
            .unwrap_or(self.stale_time)
    }

    pub fn retry_for(&self, kind: ResourceKind) -> RetryPolicy {
        match self.retry_overrides.get(&kind) {
            Some(n) => self.retry.with_max_retries(*n),
            None => self.retry,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchStatus {
    /// Known key, never fetched.
    Idle,
    /// A fetch is in flight (initial load or background refresh).
    Pending,
    Success,
    Error,
}

/// Point-in-time view of one entry, without its value.
#[derive(Clone, Debug)]
pub struct EntrySnapshot {
    pub key: ResourceKey,
    pub fetch_status: FetchStatus,
    pub has_value: bool,
    pub error: Option<QueryError>,
    pub fetched_at: Option<Instant>,
    pub stale_at: Option<Instant>,
    /// When the entry becomes eligible for GC; `None` while observed.
    pub expires_at: Option<Instant>,
    pub observers: usize,
    pub invalidated: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Fresh values served without a fetch.
    pub hits: u64,
    /// Stale values served while revalidating.
    pub stale_hits: u64,
    /// Resolves that had to wait for a new fetch.
    pub misses: u64,
    /// Resolves that attached to an already in-flight fetch.
    pub coalesced: u64,
    /// Fetch tasks started (each may make several attempts).
    pub fetches: u64,
    pub evictions: u64,
}

type Outcome<V> = Result<V, QueryError>;

struct InFlight<V> {
    id: u64,
    epoch: u64,
    tx: broadcast::Sender<Outcome<V>>,
}

struct Entry<V> {
    value: Option<V>,
    error: Option<QueryError>,
    status: FetchStatus,
    fetched_at: Option<Instant>,
    invalidated: bool,
    /// Bumped by every invalidate; a fetch only clears `invalidated` if no
    /// invalidation happened after it started.
    epoch: u64,
    in_flight: Option<InFlight<V>>,
    observers: usize,
    unobserved_since: Option<Instant>,
}

impl<V> Entry<V> {
    fn new(now: Instant) -> Self {
        Self {
            value: None,
            error: None,
            status: FetchStatus::Idle,
            fetched_at: None,
            invalidated: false,
            epoch: 0,
            in_flight: None,
            observers: 0,
            unobserved_since: Some(now),
        }
    }
}

struct State<V> {
    entries: HashMap<ResourceKey, Entry<V>>,
    stats: CacheStats,
    next_fetch_id: u64,
}

struct Shared<V> {
    state: Mutex<State<V>>,
    policy: CachePolicy,
}

/// Keyed cache of query results. Cloning shares the same storage.
pub struct QueryCache<V> {
    shared: Arc<Shared<V>>,
}

impl<V> Clone for QueryCache<V> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

enum Plan<V> {
    Ready(Outcome<V>),
    Wait(broadcast::Receiver<Outcome<V>>),
}

impl<V> QueryCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(policy: CachePolicy) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    entries: HashMap::new(),
                    stats: CacheStats::default(),
                    next_fetch_id: 0,
                }),
                policy,
            }),
        }
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.shared.policy
    }

    fn lock(&self) -> MutexGuard<'_, State<V>> {
        lock_state(&self.shared)
    }

    /// Resolve `key`, fetching through `fetch` when needed.
    ///
    /// `fetch` may be called several times for one resolve (retries), and not
    /// at all when a fresh value or an in-flight request already exists.
    pub async fn resolve<F, Fut>(&self, key: ResourceKey, fetch: F) -> Result<V, QueryError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V, QueryError>> + Send + 'static,
    {
        let plan = {
            let mut guard = self.lock();
            let state = &mut *guard;
            let now = Instant::now();
            let stale_time = self.shared.policy.stale_time_for(key.kind);
            let entry = state
                .entries
                .entry(key.clone())
                .or_insert_with(|| Entry::new(now));

            if let Some(value) = entry.value.clone() {
                let fresh = !entry.invalidated
                    && entry.fetched_at.is_some_and(|t| now < t + stale_time);
                if fresh {
                    state.stats.hits += 1;
                    log::trace!("[cache] hit {key}");
                } else {
                    state.stats.stale_hits += 1;
                    if entry.in_flight.is_none() {
                        log::debug!("[cache] stale {key}, revalidating in background");
                        let fetch_id = state.next_fetch_id;
                        state.next_fetch_id += 1;
                        state.stats.fetches += 1;
                        // Nobody waits on a background refresh.
                        drop(self.start_fetch(entry, fetch_id, key.clone(), fetch));
                    }
                }
                Plan::Ready(Ok(value))
            } else if let Some(in_flight) = &entry.in_flight {
                state.stats.coalesced += 1;
                log::debug!("[cache] coalescing {key} onto in-flight fetch");
                Plan::Wait(in_flight.tx.subscribe())
            } else if let (Some(err), false) = (&entry.error, entry.invalidated) {
                Plan::Ready(Err(err.clone()))
            } else {
                state.stats.misses += 1;
                state.stats.fetches += 1;
                let fetch_id = state.next_fetch_id;
                state.next_fetch_id += 1;
                log::debug!("[cache] miss {key}, fetching");
                Plan::Wait(self.start_fetch(entry, fetch_id, key.clone(), fetch))
            }
        };

        match plan {
            Plan::Ready(outcome) => outcome,
            Plan::Wait(mut rx) => match rx.recv().await {
                Ok(outcome) => outcome,
                Err(_) => Err(QueryError::Network(
                    "fetch task ended without a result".to_string(),
                )),
            },
        }
    }

    /// Mark the entry in flight and spawn the fetch task. Must be called with
    /// the state lock held; returns a receiver subscribed before the spawn.
    fn start_fetch<F, Fut>(
        &self,
        entry: &mut Entry<V>,
        fetch_id: u64,
        key: ResourceKey,
        fetch: F,
    ) -> broadcast::Receiver<Outcome<V>>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V, QueryError>> + Send + 'static,
    {
        let (tx, rx) = broadcast::channel(1);
        entry.in_flight = Some(InFlight {
            id: fetch_id,
            epoch: entry.epoch,
            tx: tx.clone(),
        });
        entry.status = FetchStatus::Pending;

        let shared = Arc::clone(&self.shared);
        let retry = self.shared.policy.retry_for(key.kind);
        tokio::spawn(async move {
            let label = key.to_string();
            // The attempts run on their own task so a panic in `fetch` still
            // completes the entry instead of leaving it in flight.
            let attempts = tokio::spawn({
                let label = label.clone();
                async move { run_with_retry(&retry, &label, || fetch()).await }
            });
            let outcome = match attempts.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    log::error!("[cache] fetch task for {label} aborted: {e}");
                    Err(QueryError::Network(format!("fetch task for {label} aborted")))
                }
            };
            complete(&shared, &key, fetch_id, outcome, &tx);
        });
        rx
    }

    /// Synchronous peek at the cached value, fresh or stale. Never fetches.
    pub fn cached(&self, key: &ResourceKey) -> Option<V> {
        self.lock().entries.get(key).and_then(|e| e.value.clone())
    }

    /// Force the next resolve of `key` to go to the network.
    ///
    /// A value already present keeps being served while the refetch runs; an
    /// errored entry is refetched and awaited.
    pub fn invalidate(&self, key: &ResourceKey) {
        if let Some(entry) = self.lock().entries.get_mut(key) {
            entry.invalidated = true;
            entry.epoch += 1;
            log::debug!("[cache] invalidated {key}");
        }
    }

    /// Invalidate every key matching `pred`; returns how many were marked.
    pub fn invalidate_matching(&self, pred: impl Fn(&ResourceKey) -> bool) -> usize {
        let mut state = self.lock();
        let mut n = 0;
        for (key, entry) in state.entries.iter_mut() {
            if pred(key) {
                entry.invalidated = true;
                entry.epoch += 1;
                n += 1;
            }
        }
        n
    }

    /// Drop an entry outright. An in-flight fetch still delivers to its waiters
    /// but its result is not stored.
    pub fn remove(&self, key: &ResourceKey) -> bool {
        self.lock().entries.remove(key).is_some()
    }

    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &ResourceKey) -> bool {
        self.lock().entries.contains_key(key)
    }

    /// Register an active consumer of `key`. The entry cannot be garbage
    /// collected while any observer is alive.
    pub fn observe(&self, key: ResourceKey) -> Observer<V> {
        {
            let mut state = self.lock();
            let entry = state
                .entries
                .entry(key.clone())
                .or_insert_with(|| Entry::new(Instant::now()));
            entry.observers += 1;
            entry.unobserved_since = None;
        }
        Observer {
            shared: Arc::clone(&self.shared),
            key,
        }
    }

    /// Evict entries that have been unobserved for at least the GC window.
    /// Entries with observers or an in-flight fetch are never evicted.
    pub fn collect_garbage(&self) -> usize {
        let gc_time = self.shared.policy.gc_time;
        let now = Instant::now();
        let mut state = self.lock();
        let before = state.entries.len();
        state.entries.retain(|key, e| {
            let expired = e.observers == 0
                && e.in_flight.is_none()
                && e
                    .unobserved_since
                    .is_some_and(|t| now.saturating_duration_since(t) >= gc_time);
            if expired {
                log::debug!("[cache] evicting {key}");
            }
            !expired
        });
        let evicted = before - state.entries.len();
        state.stats.evictions += evicted as u64;
        evicted
    }

    /// Run [`collect_garbage`](Self::collect_garbage) every `every` on the
    /// current tokio runtime.
    pub fn spawn_gc(&self, every: Duration) -> JoinHandle<()> {
        let cache = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let n = cache.collect_garbage();
                if n > 0 {
                    log::info!("[cache] gc evicted {n} entries ({} left)", cache.len());
                }
            }
        })
    }

    pub fn snapshot(&self, key: &ResourceKey) -> Option<EntrySnapshot> {
        let state = self.lock();
        let e = state.entries.get(key)?;
        let stale_time = self.shared.policy.stale_time_for(key.kind);
        Some(EntrySnapshot {
            key: key.clone(),
            fetch_status: e.status,
            has_value: e.value.is_some(),
            error: e.error.clone(),
            fetched_at: e.fetched_at,
            stale_at: e.fetched_at.map(|t| t + stale_time),
            expires_at: if e.observers == 0 {
                e.unobserved_since.map(|t| t + self.shared.policy.gc_time)
            } else {
                None
            },
            observers: e.observers,
            invalidated: e.invalidated,
        })
    }

    pub fn status(&self, key: &ResourceKey) -> FetchStatus {
        self.lock()
            .entries
            .get(key)
            .map(|e| e.status)
            .unwrap_or(FetchStatus::Idle)
    }

    /// True if any of `keys` has a fetch in flight.
    pub fn any_pending<'a>(&self, keys: impl IntoIterator<Item = &'a ResourceKey>) -> bool {
        let state = self.lock();
        keys.into_iter().any(|k| {
            state
                .entries
                .get(k)
                .is_some_and(|e| e.status == FetchStatus::Pending)
        })
    }

    pub fn stats(&self) -> CacheStats {
        self.lock().stats
    }

    pub fn log_stats(&self) {
        let state = self.lock();
        let s = state.stats;
        log::info!(
            "[cache] entries={} hits={} stale_hits={} misses={} coalesced={} fetches={} evictions={}",
            state.entries.len(),
            s.hits,
            s.stale_hits,
            s.misses,
            s.coalesced,
            s.fetches,
            s.evictions
        );
    }
}

fn lock_state<V>(shared: &Shared<V>) -> MutexGuard<'_, State<V>> {
    // A panic while holding the lock cannot leave an entry half-written in a
    // way later readers care about, so keep going with the inner state.
    shared
        .state
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Store a finished fetch and broadcast it to every waiter.
fn complete<V: Clone>(
    shared: &Shared<V>,
    key: &ResourceKey,
    fetch_id: u64,
    outcome: Outcome<V>,
    tx: &broadcast::Sender<Outcome<V>>,
) {
    let mut state = lock_state(shared);
    let now = Instant::now();
    match state.entries.get_mut(key) {
        Some(entry) if entry.in_flight.as_ref().is_some_and(|f| f.id == fetch_id) => {
            let started_epoch = entry.in_flight.take().map(|f| f.epoch).unwrap_or_default();
            if started_epoch == entry.epoch {
                entry.invalidated = false;
            }
            match &outcome {
                Ok(v) => {
                    entry.value = Some(v.clone());
                    entry.error = None;
                    entry.fetched_at = Some(now);
                    entry.status = FetchStatus::Success;
                    log::debug!("[cache] stored {key}");
                }
                Err(e) => {
                    // A failed refresh keeps serving the previous value.
                    entry.error = Some(e.clone());
                    entry.status = FetchStatus::Error;
                    log::warn!("[cache] fetch for {key} failed: {e}");
                }
            }
            if entry.observers == 0 && entry.unobserved_since.is_none() {
                entry.unobserved_since = Some(now);
            }
        }
        _ => log::debug!("[cache] dropping result for {key}: entry removed or superseded"),
    }
    let waiters = tx.receiver_count();
    // Err only means nobody is listening, e.g. a background refresh.
    let _ = tx.send(outcome);
    if waiters > 1 {
        log::debug!("[cache] delivered {key} to {waiters} waiters");
    }
}

/// RAII handle marking a cache entry as in use.
pub struct Observer<V> {
    shared: Arc<Shared<V>>,
    key: ResourceKey,
}

impl<V> Observer<V> {
    pub fn key(&self) -> &ResourceKey {
        &self.key
    }
}

impl<V> Drop for Observer<V> {
    fn drop(&mut self) {
        let mut state = lock_state(&self.shared);
        if let Some(entry) = state.entries.get_mut(&self.key) {
            entry.observers = entry.observers.saturating_sub(1);
            if entry.observers == 0 {
                entry.unobserved_since = Some(Instant::now());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Version;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn key() -> ResourceKey {
        ResourceKey::champions(Some(&Version::from("14.1.1"))).unwrap()
    }

    /// Fetcher returning the call number, counting calls.
    fn counting(calls: &Arc<AtomicU32>) -> impl Fn() -> futures::future::Ready<Result<u32, QueryError>> + Send + Sync + 'static {
        let calls = Arc::clone(calls);
        move || futures::future::ready(Ok(calls.fetch_add(1, Ordering::SeqCst) + 1))
    }

    fn failing(
        calls: &Arc<AtomicU32>,
        err: QueryError,
    ) -> impl Fn() -> futures::future::Ready<Result<u32, QueryError>> + Send + Sync + 'static {
        let calls = Arc::clone(calls);
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            futures::future::ready(Err(err.clone()))
        }
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_fresh_entry_served_without_fetch() {
        let cache = QueryCache::new(CachePolicy::default());
        let calls = Arc::new(AtomicU32::new(0));

        assert_eq!(cache.resolve(key(), counting(&calls)).await, Ok(1));
        tokio::time::advance(Duration::from_secs(59 * 60)).await;
        assert_eq!(cache.resolve(key(), counting(&calls)).await, Ok(1));

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.status(&key()), FetchStatus::Success);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_entry_revalidates_once_in_background() {
        let cache = QueryCache::new(CachePolicy::default());
        let calls = Arc::new(AtomicU32::new(0));
        cache.resolve(key(), counting(&calls)).await.unwrap();

        tokio::time::advance(Duration::from_secs(61 * 60)).await;

        // Both callers get the old value immediately; only one refresh starts.
        assert_eq!(cache.resolve(key(), counting(&calls)).await, Ok(1));
        assert_eq!(cache.resolve(key(), counting(&calls)).await, Ok(1));
        settle().await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.cached(&key()), Some(2));
        assert_eq!(cache.stats().stale_hits, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_per_kind_stale_override() {
        let mut policy = CachePolicy::default();
        policy
            .stale_overrides
            .insert(ResourceKind::Champions, Duration::from_secs(60));
        let cache = QueryCache::new(policy);
        let calls = Arc::new(AtomicU32::new(0));

        cache.resolve(key(), counting(&calls)).await.unwrap();
        tokio::time::advance(Duration::from_secs(61)).await;
        cache.resolve(key(), counting(&calls)).await.unwrap();
        settle().await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_resolves_share_one_fetch() {
        let cache = QueryCache::new(CachePolicy::default());
        let calls = Arc::new(AtomicU32::new(0));
        let slow = {
            let calls = Arc::clone(&calls);
            move || {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Ok::<u32, QueryError>(7)
                }
            }
        };

        let results = futures::future::join_all(
            (0..5).map(|_| cache.resolve(key(), slow.clone())),
        )
        .await;

        assert!(results.iter().all(|r| *r == Ok(7)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats().coalesced, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_error_retried_three_times() {
        let cache = QueryCache::new(CachePolicy::default());
        let calls = Arc::new(AtomicU32::new(0));
        let err = QueryError::HttpStatus { status: 500, path: "/x".into() };

        let res = cache.resolve(key(), failing(&calls, err.clone())).await;
        assert_eq!(res, Err(err));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(cache.status(&key()), FetchStatus::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found_attempted_once() {
        let cache = QueryCache::new(CachePolicy::default());
        let calls = Arc::new(AtomicU32::new(0));
        let err = QueryError::HttpStatus { status: 404, path: "/x".into() };

        assert_eq!(cache.resolve(key(), failing(&calls, err.clone())).await, Err(err));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_is_sticky_until_invalidated() {
        let cache = QueryCache::new(CachePolicy::default());
        let calls = Arc::new(AtomicU32::new(0));
        let err = QueryError::HttpStatus { status: 404, path: "/x".into() };
        cache.resolve(key(), failing(&calls, err.clone())).await.unwrap_err();

        // Second resolve surfaces the stored error without refetching.
        assert_eq!(cache.resolve(key(), counting(&calls)).await, Err(err));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        cache.invalidate(&key());
        assert_eq!(cache.resolve(key(), counting(&calls)).await, Ok(2));
        let snap = cache.snapshot(&key()).unwrap();
        assert!(!snap.invalidated);
        assert!(snap.error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refresh_keeps_previous_value() {
        let cache = QueryCache::new(CachePolicy::default());
        let calls = Arc::new(AtomicU32::new(0));
        cache.resolve(key(), counting(&calls)).await.unwrap();

        cache.invalidate(&key());
        let err = QueryError::HttpStatus { status: 403, path: "/x".into() };
        assert_eq!(cache.resolve(key(), failing(&calls, err.clone())).await, Ok(1));
        settle().await;

        let snap = cache.snapshot(&key()).unwrap();
        assert!(snap.has_value);
        assert_eq!(snap.error, Some(err));
        assert_eq!(cache.cached(&key()), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gc_spares_observed_entries() {
        let cache = QueryCache::new(CachePolicy::default());
        let calls = Arc::new(AtomicU32::new(0));
        let other = ResourceKey::versions();

        let observer = cache.observe(key());
        cache.resolve(key(), counting(&calls)).await.unwrap();
        cache.resolve(other.clone(), counting(&calls)).await.unwrap();

        tokio::time::advance(Duration::from_secs(9 * 60)).await;
        assert_eq!(cache.collect_garbage(), 0);

        tokio::time::advance(Duration::from_secs(2 * 60)).await;
        assert_eq!(cache.collect_garbage(), 1);
        assert!(cache.contains(&key()));
        assert!(!cache.contains(&other));

        drop(observer);
        assert!(cache.snapshot(&key()).unwrap().expires_at.is_some());
        tokio::time::advance(Duration::from_secs(10 * 60)).await;
        assert_eq!(cache.collect_garbage(), 1);
        assert!(cache.is_empty());
        assert_eq!(cache.stats().evictions, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_removed_entry_still_answers_waiters() {
        let cache = QueryCache::new(CachePolicy::default());
        let c2 = cache.clone();
        let handle = tokio::spawn(async move {
            c2.resolve(key(), || async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok::<u32, QueryError>(3)
            })
            .await
        });
        settle().await;
        assert!(cache.any_pending([&key()]));
        cache.remove(&key());

        assert_eq!(handle.await.unwrap(), Ok(3));
        assert!(!cache.contains(&key()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_fetch_fails_waiters_and_clears_in_flight() {
        let cache = QueryCache::new(CachePolicy::default());
        let calls = Arc::new(AtomicU32::new(0));
        let exploding = || -> futures::future::Ready<Result<u32, QueryError>> {
            panic!("decoder blew up")
        };

        let (a, b) = tokio::join!(
            cache.resolve(key(), exploding),
            cache.resolve(key(), exploding)
        );
        assert!(matches!(a, Err(QueryError::Network(_))));
        assert!(matches!(b, Err(QueryError::Network(_))));
        assert_eq!(cache.status(&key()), FetchStatus::Error);
        assert!(!cache.any_pending([&key()]));

        cache.invalidate(&key());
        assert_eq!(cache.resolve(key(), counting(&calls)).await, Ok(1));
    }
}
