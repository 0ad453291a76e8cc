//! Bounded LRU memoization for indicator computations.
//!
//! Keys are [`Fingerprint`]s built from the computation's identity, a small
//! sample of the input series (first two and last two values) and the
//! remaining arguments. Two different series of equal length that share those
//! four values and the same arguments collide, and the cached result of the
//! first is returned for the second. This is a known approximation: strategies recompute the same
//! indicator over the same series many times during a search, and hashing a
//! whole series on every lookup would cost more than the indicator itself.
//! Callers that need exact freshness use [`MemoizationCache::disabled`].

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};
use std::sync::Mutex;

use crate::error::Result;
use crate::types::ParamValue;

/// Number of leading and trailing samples that go into a fingerprint.
const SAMPLE_EDGE: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(u64);

impl Fingerprint {
    pub fn new(function_id: &str, series: &[f64], args: &[ParamValue]) -> Self {
        let mut hasher = DefaultHasher::new();
        function_id.hash(&mut hasher);

        series.len().hash(&mut hasher);
        let head = series.len().min(SAMPLE_EDGE);
        let tail_start = series.len().saturating_sub(SAMPLE_EDGE);
        for v in series[..head].iter().chain(&series[tail_start..]) {
            v.to_bits().hash(&mut hasher);
        }

        for arg in args {
            match arg {
                ParamValue::Int(v) => (0u8, *v).hash(&mut hasher),
                ParamValue::Float(v) => (1u8, v.to_bits()).hash(&mut hasher),
                ParamValue::Text(v) => (2u8, v).hash(&mut hasher),
            }
        }

        Self(hasher.finish())
    }
}

struct LruState<V> {
    entries: HashMap<Fingerprint, (V, u64)>,
    // recency tick -> key, oldest first
    order: BTreeMap<u64, Fingerprint>,
    tick: u64,
}

impl<V: Clone> LruState<V> {
    fn touch(&mut self, key: Fingerprint) -> Option<V> {
        self.tick += 1;
        let tick = self.tick;
        let (value, last) = self.entries.get_mut(&key)?;
        self.order.remove(&*last);
        *last = tick;
        self.order.insert(tick, key);
        Some(value.clone())
    }

    fn insert(&mut self, key: Fingerprint, value: V, capacity: usize) {
        self.tick += 1;
        self.entries.insert(key, (value, self.tick));
        self.order.insert(self.tick, key);

        while self.entries.len() > capacity {
            let Some((_, oldest)) = self.order.pop_first() else {
                break;
            };
            self.entries.remove(&oldest);
        }
    }
}

/// Thread-safe LRU cache; one instance is shared by every evaluation of a run.
pub struct MemoizationCache<V = Vec<f64>> {
    state: Mutex<LruState<V>>,
    capacity: usize,
    enabled: bool,
}

impl<V: Clone> MemoizationCache<V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(LruState {
                entries: HashMap::with_capacity(capacity),
                order: BTreeMap::new(),
                tick: 0,
            }),
            capacity: capacity.max(1),
            enabled: true,
        }
    }

    /// A cache that never stores anything; every call recomputes.
    pub fn disabled() -> Self {
        let mut cache = Self::new(1);
        cache.enabled = false;
        cache
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &Fingerprint) -> bool {
        self.lock().entries.contains_key(key)
    }

    /// Lookup that promotes a hit to most-recently-used.
    pub fn get(&self, key: &Fingerprint) -> Option<V> {
        self.lock().touch(*key)
    }

    pub fn insert(&self, key: Fingerprint, value: V) {
        if !self.enabled {
            return;
        }
        self.lock().insert(key, value, self.capacity);
    }

    pub fn clear(&self) {
        let mut state = self.lock();
        state.entries.clear();
        state.order.clear();
    }

    /// Return the cached value for `(function_id, series sample, args)` or
    /// compute, store and return it.
    ///
    /// The lock is not held while `compute` runs. When two threads miss on the
    /// same key concurrently the first insert wins and both callers receive
    /// that value.
    pub fn get_or_compute<F>(
        &self,
        function_id: &str,
        series: &[f64],
        args: &[ParamValue],
        compute: F,
    ) -> Result<V>
    where
        F: FnOnce() -> Result<V>,
    {
        if !self.enabled {
            return compute();
        }

        let key = Fingerprint::new(function_id, series, args);
        if let Some(hit) = self.get(&key) {
            return Ok(hit);
        }

        let value = compute()?;

        let mut state = self.lock();
        if let Some(existing) = state.touch(key) {
            return Ok(existing);
        }
        state.insert(key, value.clone(), self.capacity);
        Ok(value)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LruState<V>> {
        // Entries stay consistent even if a holder panicked.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}
