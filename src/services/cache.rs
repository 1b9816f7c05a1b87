use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use serde_json::Value;
use tracing::debug;

struct CacheEntry {
    value: Value,
    inserted_at: Instant,
    last_used: u64,
}

struct CacheState {
    entries: HashMap<String, CacheEntry>,
    clock: u64,
}

/// Response cache keyed by request URL, bounded by `capacity` with
/// least-recently-used eviction and an optional time-to-live.
pub struct ResponseCache {
    state: Mutex<CacheState>,
    capacity: usize,
    ttl: Option<Duration>,
}

impl ResponseCache {
    pub fn new(capacity: usize, ttl: Option<Duration>) -> Self {
        Self {
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                clock: 0,
            }),
            capacity: capacity.max(1),
            ttl,
        }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        let mut state = self.lock();
        state.clock += 1;
        let tick = state.clock;

        let expired = match state.entries.get(key) {
            Some(entry) => self.is_expired(entry),
            None => return None,
        };

        if expired {
            debug!("Dropping expired cache entry for: {}", key);
            state.entries.remove(key);
            return None;
        }

        let entry = state.entries.get_mut(key)?;
        entry.last_used = tick;
        Some(entry.value.clone())
    }

    pub fn set(&self, key: &str, value: Value) {
        let mut state = self.lock();
        state.clock += 1;
        let tick = state.clock;

        if !state.entries.contains_key(key) && state.entries.len() >= self.capacity {
            let oldest = state
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(candidate, _)| candidate.clone());
            if let Some(oldest) = oldest {
                state.entries.remove(&oldest);
            }
        }

        state.entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                inserted_at: Instant::now(),
                last_used: tick,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    fn is_expired(&self, entry: &CacheEntry) -> bool {
        match self.ttl {
            Some(ttl) => entry.inserted_at.elapsed() >= ttl,
            None => false,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheState> {
        // A poisoned cache only means a panic mid-update; the map is still usable.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
