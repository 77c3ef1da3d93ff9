//! Query cache
//!
//! Entries are keyed by [`QueryKey`] and hold the raw JSON the backend
//! returned. An entry is *fresh* while it is younger than `stale_time` and has
//! not been invalidated; reads of a fresh entry never touch the network. Stale
//! entries are still served as "previous data" while a refetch is in flight.
//! Entries older than `gc_time` are evicted.
//!
//! Concurrent reads of the same key share one request. Every write
//! (set, invalidate, remove) is applied before the matching [`CacheEvent`] is
//! broadcast, so a subscriber reacting to an event always sees the new state.

use dashmap::DashMap;
use fleetdesk_core::Resource;
use fleetdesk_observability::Metrics;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared, WeakShared};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::key::QueryKey;
use crate::result::{QueryError, QueryResult};

const EVENT_CHANNEL_CAPACITY: usize = 256;

type FetchResult = Result<Arc<Value>, QueryError>;
type SharedFetch = Shared<BoxFuture<'static, FetchResult>>;

/// A registered request.
///
/// The map only holds a weak handle: once every waiter is gone the request
/// is dropped and the slot reads as empty. `id` tells a finished request
/// whether the slot still belongs to it. `discarded` is set when the key is
/// removed or the cache cleared, and the result is then never stored.
struct InFlight {
    id: u64,
    fetch: WeakShared<BoxFuture<'static, FetchResult>>,
    discarded: Arc<AtomicBool>,
}

impl InFlight {
    fn live(&self) -> Option<SharedFetch> {
        self.fetch.upgrade()
    }

    fn discard(&self) {
        self.discarded.store(true, Ordering::SeqCst);
    }
}

/// Cache behavior
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// How long a fetched entry counts as fresh
    pub stale_time: Duration,
    /// How long an entry is kept at all
    pub gc_time: Duration,
    /// Retries for failed reads (mutations never retry)
    pub retry: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            stale_time: Duration::ZERO,
            gc_time: Duration::from_secs(300),
            retry: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub data: Arc<Value>,
    pub fetched_at: Instant,
    pub invalidated: bool,
}

impl CacheEntry {
    fn new(data: Arc<Value>) -> Self {
        Self {
            data,
            fetched_at: Instant::now(),
            invalidated: false,
        }
    }

    pub fn age(&self) -> Duration {
        self.fetched_at.elapsed()
    }

    pub fn is_stale(&self, stale_time: Duration) -> bool {
        self.invalidated || self.age() >= stale_time
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheEventKind {
    Updated,
    Invalidated,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEvent {
    pub key: QueryKey,
    pub kind: CacheEventKind,
}

struct CacheInner {
    entries: DashMap<QueryKey, CacheEntry>,
    inflight: Mutex<HashMap<QueryKey, InFlight>>,
    next_fetch_id: AtomicU64,
    /// Bumped on every invalidation; a fetch that started before the bump
    /// stores its result already invalidated
    generation: AtomicU64,
    events: broadcast::Sender<CacheEvent>,
    config: CacheConfig,
    metrics: Option<Metrics>,
}

impl CacheInner {
    fn emit(&self, key: &QueryKey, kind: CacheEventKind) {
        // No subscribers is fine
        let _ = self.events.send(CacheEvent {
            key: key.clone(),
            kind,
        });
    }

    fn store(&self, key: &QueryKey, data: Arc<Value>, invalidated: bool) {
        let mut entry = CacheEntry::new(data);
        entry.invalidated = invalidated;
        self.entries.insert(key.clone(), entry);
        self.emit(key, CacheEventKind::Updated);
    }

    fn inflight(&self) -> std::sync::MutexGuard<'_, HashMap<QueryKey, InFlight>> {
        self.inflight.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Shared, cheaply clonable handle to the cache
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<CacheInner>,
}

impl QueryCache {
    pub fn new(config: CacheConfig) -> Self {
        Self::build(config, None)
    }

    /// Build a cache that reports hits, misses and invalidations
    pub fn with_metrics(config: CacheConfig, metrics: Metrics) -> Self {
        Self::build(config, Some(metrics))
    }

    fn build(config: CacheConfig, metrics: Option<Metrics>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(CacheInner {
                entries: DashMap::new(),
                inflight: Mutex::new(HashMap::new()),
                next_fetch_id: AtomicU64::new(0),
                generation: AtomicU64::new(0),
                events,
                config,
                metrics,
            }),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Subscribe to cache change events
    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.inner.events.subscribe()
    }

    /// Current entry for a key; entries past `gc_time` are evicted instead
    pub fn get(&self, key: &QueryKey) -> Option<CacheEntry> {
        let entry = self.inner.entries.get(key).map(|e| e.value().clone())?;
        if entry.age() >= self.inner.config.gc_time {
            self.inner.entries.remove(key);
            self.inner.emit(key, CacheEventKind::Removed);
            return None;
        }
        Some(entry)
    }

    /// Store fresh data for a key
    pub fn set(&self, key: QueryKey, data: Value) {
        trace!("Cache set {}", key);
        self.inner.store(&key, Arc::new(data), false);
    }

    /// Mark an entry stale so the next read refetches.
    ///
    /// Returns whether an entry or an in-flight request existed for the key.
    pub fn invalidate(&self, key: &QueryKey) -> bool {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        let had_request = self
            .inner
            .inflight()
            .remove(key)
            .is_some_and(|request| request.live().is_some());

        let had_entry = match self.inner.entries.get_mut(key) {
            Some(mut entry) => {
                entry.invalidated = true;
                true
            }
            None => false,
        };

        if had_entry {
            self.inner.emit(key, CacheEventKind::Invalidated);
            if let Some(metrics) = &self.inner.metrics {
                metrics.record_invalidation(key.resource.as_str(), 1);
            }
        }
        had_entry || had_request
    }

    /// Invalidate every key of a resource matching the predicate
    pub fn invalidate_where(
        &self,
        resource: Resource,
        predicate: impl Fn(&QueryKey) -> bool,
    ) -> usize {
        let mut keys: Vec<QueryKey> = self
            .inner
            .entries
            .iter()
            .map(|e| e.key().clone())
            .filter(|k| k.resource == resource && predicate(k))
            .collect();
        keys.extend(
            self.inner
                .inflight()
                .iter()
                .filter(|(k, request)| {
                    k.resource == resource && predicate(*k) && request.live().is_some()
                })
                .map(|(k, _)| k.clone()),
        );
        keys.sort_by_key(|k| k.to_string());
        keys.dedup();

        let count = keys.iter().filter(|key| self.invalidate(key)).count();
        debug!("Invalidated {} {} cache entries", count, resource);
        count
    }

    /// Invalidate every entry of a resource
    pub fn invalidate_resource(&self, resource: Resource) -> usize {
        self.invalidate_where(resource, |_| true)
    }

    /// Invalidate all list and sub-resource entries of a resource
    pub fn invalidate_collections(&self, resource: Resource) -> usize {
        self.invalidate_where(resource, |k| k.is_list() || k.is_sub())
    }

    /// Evict an entry; a request in flight for it will not store its result
    pub fn remove(&self, key: &QueryKey) -> Option<CacheEntry> {
        if let Some(request) = self.inner.inflight().remove(key) {
            request.discard();
        }
        let removed = self.inner.entries.remove(key).map(|(_, entry)| entry);
        if removed.is_some() {
            self.inner.emit(key, CacheEventKind::Removed);
        }
        removed
    }

    /// Evict every entry matching the predicate
    pub fn remove_where(&self, predicate: impl Fn(&QueryKey) -> bool) -> usize {
        let keys: Vec<QueryKey> = self
            .inner
            .entries
            .iter()
            .map(|e| e.key().clone())
            .filter(|k| predicate(k))
            .collect();
        keys.iter().filter(|key| self.remove(key).is_some()).count()
    }

    /// Evict entries older than `gc_time`
    pub fn gc(&self) -> usize {
        let gc_time = self.inner.config.gc_time;
        self.remove_where_entry(|entry| entry.age() >= gc_time)
    }

    fn remove_where_entry(&self, predicate: impl Fn(&CacheEntry) -> bool) -> usize {
        let keys: Vec<QueryKey> = self
            .inner
            .entries
            .iter()
            .filter(|e| predicate(e.value()))
            .map(|e| e.key().clone())
            .collect();
        keys.iter().filter(|key| self.remove(key).is_some()).count()
    }

    /// Drop every entry. Requests still in flight finish for their waiters
    /// but their results are not stored.
    pub fn clear(&self) {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        for (_, request) in self.inner.inflight().drain() {
            request.discard();
        }
        let keys: Vec<QueryKey> = self.inner.entries.iter().map(|e| e.key().clone()).collect();
        for key in keys {
            self.remove(&key);
        }
    }

    /// Copy of every entry, sorted by key
    pub fn snapshot(&self) -> Vec<(QueryKey, CacheEntry)> {
        let mut entries: Vec<(QueryKey, CacheEntry)> = self
            .inner
            .entries
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        entries.sort_by_key(|(k, _)| k.to_string());
        entries
    }

    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    pub fn is_fetching(&self, key: &QueryKey) -> bool {
        self.inner
            .inflight()
            .get(key)
            .is_some_and(|request| request.live().is_some())
    }

    /// Non-blocking view of a key: `Loading` while a request is in flight
    /// (with any previous data), `Success` if cached, `Idle` otherwise
    pub fn peek(&self, key: &QueryKey) -> QueryResult<Arc<Value>> {
        let previous = self.get(key).map(|e| e.data);
        if self.is_fetching(key) {
            QueryResult::loading(previous)
        } else {
            match previous {
                Some(data) => QueryResult::success(data),
                None => QueryResult::idle(),
            }
        }
    }

    /// Return fresh cached data or fetch it.
    ///
    /// Callers asking for the same key while a request is in flight wait on
    /// that request instead of starting their own. `fetcher` is only invoked
    /// when a new request is needed. The result is written to the cache
    /// before any waiter resumes.
    pub async fn fetch<F, Fut>(&self, key: QueryKey, fetcher: F) -> Result<Arc<Value>, QueryError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, QueryError>> + Send + 'static,
    {
        let resource = key.resource.as_str();

        if let Some(entry) = self.get(&key)
            && !entry.is_stale(self.inner.config.stale_time)
        {
            trace!("Cache hit {}", key);
            if let Some(metrics) = &self.inner.metrics {
                metrics.record_cache_hit(resource);
            }
            return Ok(entry.data);
        }

        let shared = {
            let mut inflight = self.inner.inflight();
            match inflight.get(&key).and_then(InFlight::live) {
                Some(existing) => {
                    trace!("Joining in-flight request for {}", key);
                    if let Some(metrics) = &self.inner.metrics {
                        metrics.record_cache_join(resource);
                    }
                    existing
                }
                None => {
                    // An abandoned registration is replaced like a miss
                    debug!("Cache miss {}, fetching", key);
                    if let Some(metrics) = &self.inner.metrics {
                        metrics.record_cache_miss(resource);
                    }
                    let id = self.inner.next_fetch_id.fetch_add(1, Ordering::Relaxed);
                    let discarded = Arc::new(AtomicBool::new(false));
                    let shared =
                        self.start_fetch(key.clone(), id, Arc::clone(&discarded), fetcher());
                    match shared.downgrade() {
                        Some(fetch) => {
                            inflight.insert(
                                key,
                                InFlight {
                                    id,
                                    fetch,
                                    discarded,
                                },
                            );
                        }
                        None => {
                            inflight.remove(&key);
                        }
                    }
                    shared
                }
            }
        };

        shared.await
    }

    fn start_fetch<Fut>(
        &self,
        key: QueryKey,
        id: u64,
        discarded: Arc<AtomicBool>,
        request: Fut,
    ) -> SharedFetch
    where
        Fut: Future<Output = Result<Value, QueryError>> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        let started_generation = inner.generation.load(Ordering::SeqCst);

        async move {
            let result = request.await.map(Arc::new);

            // Held across the store so `clear` can't slip in between
            let mut inflight = inner.inflight();
            if let Ok(data) = &result
                && !discarded.load(Ordering::SeqCst)
            {
                let invalidated_meanwhile =
                    inner.generation.load(Ordering::SeqCst) != started_generation;
                inner.store(&key, Arc::clone(data), invalidated_meanwhile);
            }

            // Only drop our own registration; an invalidation may already
            // have replaced it with a newer request
            if inflight.get(&key).is_some_and(|current| current.id == id) {
                inflight.remove(&key);
            }
            drop(inflight);

            result
        }
        .boxed()
        .shared()
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}
