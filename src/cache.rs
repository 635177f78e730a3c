//! Recolor result cache
//!
//! A bounded, recency-ordered store of recolored sprites. Every key moves
//! through three states:
//!
//! - **absent**: nothing known; the next request starts a computation
//! - **pending**: a computation is running; further requests await the same
//!   shared result instead of starting another decode + transform
//! - **present**: the result is stored and served from memory
//!
//! A failed computation returns the key to *absent* so a later request can
//! retry. Capacity is an entry count; inserting past it evicts the least
//! recently used entry, where both reads and writes count as use.
//!
//! Computations run as detached tokio tasks. Once started they finish and
//! populate the cache even if every caller that asked for them has gone away.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::num::NonZeroUsize;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Weak};

use futures::future::{BoxFuture, FutureExt, Shared};
use lru::LruCache;
use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::codec::{EncodedImage, ImageSource};
use crate::color::TargetColor;
use crate::engine::RecolorError;
use crate::families::SpriteFamily;
use crate::range::ColorRange;

/// Capacity used when none is configured.
pub const DEFAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(256) {
    Some(n) => n,
    None => unreachable!(),
};

/// Identifies one recolored output: which sprite, which color range, which
/// target color.
///
/// The range's exact bounds are part of the key; the family name only labels
/// it in logs. Two families sharing a name but not a range never share
/// entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecolorKey {
    image: ImageSource,
    family: Arc<str>,
    range: ColorRange,
    target: TargetColor,
}

impl RecolorKey {
    pub fn new(
        image: ImageSource,
        family: impl Into<Arc<str>>,
        range: ColorRange,
        target: TargetColor,
    ) -> Self {
        Self { image, family: family.into(), range, target }
    }

    /// Key for recoloring `image` within `family`'s range.
    pub fn for_family(image: ImageSource, family: &SpriteFamily, target: TargetColor) -> Self {
        Self { image, family: family.id(), range: family.range().clone(), target }
    }

    pub fn image(&self) -> &ImageSource {
        &self.image
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    pub fn range(&self) -> &ColorRange {
        &self.range
    }

    pub fn target(&self) -> TargetColor {
        self.target
    }
}

impl fmt::Display for RecolorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{} -> {}]", self.image, self.family, self.target)
    }
}

/// Counters describing cache behavior since construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Requests served from a stored entry
    pub hits: u64,
    /// Requests that started a computation
    pub misses: u64,
    /// Requests that joined a computation already in flight
    pub coalesced: u64,
    /// Entries dropped to stay within capacity
    pub evictions: u64,
    /// Computations that ended in an error
    pub failures: u64,
}

type SharedResult<V> = Shared<BoxFuture<'static, Result<V, RecolorError>>>;

struct Pending<V> {
    generation: u64,
    result: SharedResult<V>,
}

struct CacheState<V> {
    ready: LruCache<RecolorKey, V>,
    pending: HashMap<RecolorKey, Pending<V>>,
    /// Bumped by `clear()`; results from older generations are not stored.
    generation: u64,
    stats: CacheStats,
}

impl<V: Clone> CacheState<V> {
    fn settle(&mut self, key: &RecolorKey, generation: u64, outcome: &Result<V, RecolorError>) {
        if generation != self.generation {
            tracing::debug!(key = %key, "dropping result computed before the cache was cleared");
            return;
        }
        self.pending.remove(key);

        match outcome {
            Ok(value) => {
                if let Some((evicted, _)) = self.ready.push(key.clone(), value.clone()) {
                    if &evicted != key {
                        self.stats.evictions += 1;
                        tracing::debug!(evicted = %evicted, "evicted least recently used entry");
                    }
                }
            }
            Err(e) => {
                self.stats.failures += 1;
                tracing::debug!(key = %key, error = %e, "computation failed, key left uncached");
            }
        }
    }

    fn abandon(&mut self, key: &RecolorKey, generation: u64) {
        if self.pending.get(key).is_some_and(|p| p.generation == generation) {
            self.pending.remove(key);
            self.stats.failures += 1;
        }
    }
}

enum Lookup<V> {
    Hit(V),
    Join(SharedResult<V>),
    Start { generation: u64, result: SharedResult<V>, done: oneshot::Sender<Result<V, RecolorError>> },
}

/// Shared handle to a bounded LRU store of recolor results.
///
/// Cloning the handle is cheap; all clones see the same entries.
pub struct RecolorCache<V = EncodedImage> {
    state: Arc<Mutex<CacheState<V>>>,
}

impl<V> Clone for RecolorCache<V> {
    fn clone(&self) -> Self {
        Self { state: Arc::clone(&self.state) }
    }
}

impl<V> fmt::Debug for RecolorCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("RecolorCache")
            .field("len", &state.ready.len())
            .field("capacity", &state.ready.cap())
            .field("pending", &state.pending.len())
            .field("stats", &state.stats)
            .finish()
    }
}

impl<V: Clone + Send + Sync + 'static> Default for RecolorCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl<V: Clone + Send + Sync + 'static> RecolorCache<V> {
    /// Create an empty cache holding at most `capacity` entries.
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            state: Arc::new(Mutex::new(CacheState {
                ready: LruCache::new(capacity),
                pending: HashMap::new(),
                generation: 0,
                stats: CacheStats::default(),
            })),
        }
    }

    /// Return the cached value for `key`, or compute, store and return it.
    ///
    /// `compute` is only invoked when the key is neither stored nor already
    /// being computed. Concurrent callers for the same key all receive the
    /// result of the single computation.
    ///
    /// # Errors
    ///
    /// Returns the computation's error. Failed results are not cached.
    ///
    /// # Panics
    ///
    /// Must be called from within a tokio runtime.
    pub async fn get_or_compute<F, Fut>(&self, key: RecolorKey, compute: F) -> Result<V, RecolorError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, RecolorError>> + Send + 'static,
    {
        match self.lookup(&key) {
            Lookup::Hit(value) => Ok(value),
            Lookup::Join(result) => result.await,
            Lookup::Start { generation, result, done } => {
                let computation = compute();
                let state = Arc::clone(&self.state);
                tokio::spawn(async move {
                    let outcome = AssertUnwindSafe(computation)
                        .catch_unwind()
                        .await
                        .unwrap_or_else(|_| Err(RecolorError::Task("computation panicked".to_string())));
                    state.lock().settle(&key, generation, &outcome);
                    // Nobody waiting is fine; the value is already stored
                    let _ = done.send(outcome);
                });
                result.await
            }
        }
    }

    /// Decide, in one critical section, whether `key` is a hit, joins a
    /// pending computation, or must start one.
    fn lookup(&self, key: &RecolorKey) -> Lookup<V> {
        let mut state = self.state.lock();

        if let Some(value) = state.ready.get(key).cloned() {
            state.stats.hits += 1;
            tracing::trace!(key = %key, "cache hit");
            return Lookup::Hit(value);
        }

        if let Some(pending) = state.pending.get(key) {
            let result = pending.result.clone();
            state.stats.coalesced += 1;
            tracing::trace!(key = %key, "joining in-flight computation");
            return Lookup::Join(result);
        }

        state.stats.misses += 1;
        tracing::debug!(key = %key, "cache miss");

        let generation = state.generation;
        let (done, received) = oneshot::channel();
        let weak: Weak<Mutex<CacheState<V>>> = Arc::downgrade(&self.state);
        let abandoned_key = key.clone();
        let result = received
            .map(move |received| {
                received.unwrap_or_else(|_| {
                    if let Some(state) = weak.upgrade() {
                        state.lock().abandon(&abandoned_key, generation);
                    }
                    Err(RecolorError::Abandoned)
                })
            })
            .boxed()
            .shared();

        state.pending.insert(key.clone(), Pending { generation, result: result.clone() });
        Lookup::Start { generation, result, done }
    }

    /// Stored value for `key`, promoting it to most recently used.
    pub fn get(&self, key: &RecolorKey) -> Option<V> {
        let mut state = self.state.lock();
        let value = state.ready.get(key).cloned();
        if value.is_some() {
            state.stats.hits += 1;
        }
        value
    }

    /// Whether a value is stored for `key`. Does not affect recency.
    pub fn contains(&self, key: &RecolorKey) -> bool {
        self.state.lock().ready.contains(key)
    }

    /// Whether a computation for `key` is in flight.
    pub fn is_pending(&self, key: &RecolorKey) -> bool {
        self.state.lock().pending.contains_key(key)
    }

    /// Stored keys, most recently used first.
    pub fn keys(&self) -> Vec<RecolorKey> {
        self.state.lock().ready.iter().map(|(k, _)| k.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.state.lock().ready.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.state.lock().ready.cap().get()
    }

    pub fn pending_count(&self) -> usize {
        self.state.lock().pending.len()
    }

    pub fn stats(&self) -> CacheStats {
        self.state.lock().stats
    }

    /// Drop every stored entry.
    ///
    /// Computations already in flight still resolve for their callers, but
    /// their results are not stored.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        let dropped = state.ready.len();
        state.ready.clear();
        state.pending.clear();
        state.generation += 1;
        tracing::info!(dropped, "recolor cache cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::families::get_builtin;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn key(n: u8) -> RecolorKey {
        let blue = get_builtin("blue").unwrap();
        RecolorKey::for_family(ImageSource::new(format!("sprite{n}.png")), &blue, TargetColor::new(n, 0, 0))
    }

    fn cache(capacity: usize) -> RecolorCache<u32> {
        RecolorCache::new(NonZeroUsize::new(capacity).unwrap())
    }

    async fn insert(cache: &RecolorCache<u32>, k: RecolorKey, value: u32) {
        cache.get_or_compute(k, move || async move { Ok(value) }).await.unwrap();
    }

    #[tokio::test]
    async fn test_second_call_is_a_hit() {
        let cache = cache(4);
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let calls = Arc::clone(&calls);
            let value = cache
                .get_or_compute(key(1), move || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Ok(42) }
                })
                .await
                .unwrap();
            assert_eq!(value, 42);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses), (1, 1));
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_one_computation() {
        let cache = cache(4);
        let calls = Arc::new(AtomicUsize::new(0));
        let (gate_tx, gate_rx) = oneshot::channel::<()>();

        let first = {
            let calls = Arc::clone(&calls);
            cache.get_or_compute(key(1), move || {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    let _ = gate_rx.await;
                    Ok(7)
                }
            })
        };
        let second = {
            let calls = Arc::clone(&calls);
            cache.get_or_compute(key(1), move || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(8) }
            })
        };
        let open_gate = async {
            tokio::task::yield_now().await;
            gate_tx.send(()).unwrap();
        };

        let (a, b, ()) = tokio::join!(first, second, open_gate);
        assert_eq!(a.unwrap(), 7);
        assert_eq!(b.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats().coalesced, 1);
        assert_eq!(cache.pending_count(), 0);
        assert!(cache.contains(&key(1)));
    }

    #[tokio::test]
    async fn test_lru_evicts_least_recently_inserted() {
        let cache = cache(2);
        insert(&cache, key(1), 1).await;
        insert(&cache, key(2), 2).await;
        insert(&cache, key(3), 3).await;

        assert!(!cache.contains(&key(1)));
        assert!(cache.contains(&key(2)));
        assert!(cache.contains(&key(3)));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[tokio::test]
    async fn test_reads_count_as_use() {
        let cache = cache(2);
        insert(&cache, key(1), 1).await;
        insert(&cache, key(2), 2).await;

        // Touch key 1 through the compute path; key 2 becomes least recent
        insert(&cache, key(1), 99).await;
        assert_eq!(cache.keys(), vec![key(1), key(2)]);

        insert(&cache, key(3), 3).await;
        assert!(cache.contains(&key(1)));
        assert!(!cache.contains(&key(2)));
        assert_eq!(cache.get(&key(1)), Some(1));
    }

    #[tokio::test]
    async fn test_capacity_is_never_exceeded() {
        let cache = cache(8);
        for n in 0..100u8 {
            insert(&cache, key(n), n as u32).await;
            assert!(cache.len() <= 8);
        }
        assert_eq!(cache.len(), 8);
        assert_eq!(cache.capacity(), 8);
        assert_eq!(cache.stats().evictions, 92);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let cache = cache(4);
        let err = cache
            .get_or_compute(key(1), || async { Err(RecolorError::Task("boom".to_string())) })
            .await
            .unwrap_err();
        assert!(matches!(err, RecolorError::Task(_)));
        assert!(!cache.contains(&key(1)));
        assert!(!cache.is_pending(&key(1)));

        insert(&cache, key(1), 5).await;
        assert_eq!(cache.get(&key(1)), Some(5));
        assert_eq!(cache.stats().failures, 1);
    }

    #[tokio::test]
    async fn test_panicking_computation_is_reported_and_not_cached() {
        let cache = cache(4);
        let err = cache
            .get_or_compute(key(1), || async {
                if true {
                    panic!("decoder exploded");
                }
                Ok(1)
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RecolorError::Task(_)));
        assert!(!cache.is_pending(&key(1)));
    }

    #[tokio::test]
    async fn test_computation_finishes_after_caller_goes_away() {
        let cache = cache(4);
        let (gate_tx, gate_rx) = oneshot::channel::<()>();

        let mut request = Box::pin(cache.get_or_compute(key(1), move || async move {
            let _ = gate_rx.await;
            Ok(11)
        }));
        assert!(futures::poll!(&mut request).is_pending());
        drop(request);

        gate_tx.send(()).unwrap();
        for _ in 0..100 {
            if cache.contains(&key(1)) {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(cache.get(&key(1)), Some(11));
    }

    #[tokio::test]
    async fn test_clear_discards_in_flight_results() {
        let cache = cache(4);
        insert(&cache, key(2), 2).await;
        let (gate_tx, gate_rx) = oneshot::channel::<()>();

        let request = cache.get_or_compute(key(1), move || async move {
            let _ = gate_rx.await;
            Ok(1)
        });
        let clear_then_open = async {
            tokio::task::yield_now().await;
            cache.clear();
            gate_tx.send(()).unwrap();
        };

        let (value, ()) = tokio::join!(request, clear_then_open);
        assert_eq!(value.unwrap(), 1);
        assert!(cache.is_empty());
        assert_eq!(cache.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_clones_share_entries() {
        let cache = cache(4);
        let other = cache.clone();
        insert(&cache, key(1), 1).await;
        assert_eq!(other.get(&key(1)), Some(1));
    }
}
