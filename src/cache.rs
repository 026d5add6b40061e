use crate::ports::Clock;

use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use time::{Duration, OffsetDateTime};

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    stored_at: OffsetDateTime,
    ttl: Duration,
}

/// Bounded key/value store for API responses. Eviction is FIFO by insertion
/// order when full; expiry is checked lazily on read. A performance aid only,
/// never an authorization or deduplication mechanism.
#[derive(Debug)]
pub struct ResponseCache<C> {
    clock: C,
    capacity: usize,
    entries: HashMap<String, CacheEntry>,
    order: VecDeque<String>,
}

impl<C: Clock> ResponseCache<C> {
    pub fn new(clock: C, capacity: usize) -> Self {
        Self {
            clock,
            capacity: capacity.max(1),
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    pub fn set(&mut self, key: &str, value: Value, ttl: Duration) {
        let stored_at = self.clock.now();
        if let Some(entry) = self.entries.get_mut(key) {
            // Overwrites keep the key's original slot in the eviction order.
            entry.value = value;
            entry.stored_at = stored_at;
            entry.ttl = ttl;
            return;
        }

        if self.entries.len() >= self.capacity
            && let Some(oldest) = self.order.pop_front()
        {
            self.entries.remove(&oldest);
        }

        self.order.push_back(key.to_string());
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                stored_at,
                ttl,
            },
        );
    }

    pub fn get(&mut self, key: &str) -> Option<Value> {
        let now = self.clock.now();
        let expired = match self.entries.get(key) {
            Some(entry) => now - entry.stored_at > entry.ttl,
            None => return None,
        };
        if expired {
            self.remove(key);
            return None;
        }
        self.entries.get(key).map(|entry| entry.value.clone())
    }

    pub fn has(&mut self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Without a pattern, drops everything. With a pattern, drops every key
    /// containing it as a substring (linear scan).
    pub fn invalidate(&mut self, pattern: Option<&str>) {
        match pattern {
            None => {
                self.entries.clear();
                self.order.clear();
            }
            Some(pattern) => {
                let matching: Vec<String> = self
                    .entries
                    .keys()
                    .filter(|key| key.contains(pattern))
                    .cloned()
                    .collect();
                for key in matching {
                    self.remove(&key);
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
        self.order.retain(|queued| queued != key);
    }
}

/// Read-through helper: serve a fresh cached value or invoke the fetcher and
/// store its result. Concurrent misses each invoke the fetcher; last write
/// wins.
pub async fn with_cache<C, F, Fut, E>(
    cache: &Mutex<ResponseCache<C>>,
    key: &str,
    ttl: Duration,
    fetcher: F,
) -> Result<Value, E>
where
    C: Clock,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Value, E>>,
{
    if let Some(value) = cache.lock().expect("cache lock").get(key) {
        return Ok(value);
    }
    let value = fetcher().await?;
    cache
        .lock()
        .expect("cache lock")
        .set(key, value.clone(), ttl);
    Ok(value)
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    #[derive(Clone)]
    struct ManualClock {
        now: Arc<Mutex<OffsetDateTime>>,
    }

    impl ManualClock {
        fn new() -> Self {
            Self {
                now: Arc::new(Mutex::new(OffsetDateTime::UNIX_EPOCH)),
            }
        }

        fn advance(&self, duration: Duration) {
            let mut now = self.now.lock().expect("clock lock");
            *now += duration;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> OffsetDateTime {
            *self.now.lock().expect("clock lock")
        }
    }

    #[test]
    fn set__should_evict_oldest_entry_at_capacity() {
        // Given
        let clock = ManualClock::new();
        let mut cache = ResponseCache::new(clock, 3);
        cache.set("a", json!(1), Duration::seconds(60));
        cache.set("b", json!(2), Duration::seconds(60));
        cache.set("c", json!(3), Duration::seconds(60));

        // When
        cache.set("d", json!(4), Duration::seconds(60));

        // Then
        assert_eq!(cache.len(), 3);
        assert!(cache.get("a").is_none());
        assert_eq!(cache.get("b"), Some(json!(2)));
        assert_eq!(cache.get("d"), Some(json!(4)));
    }

    #[test]
    fn set__should_keep_slot_when_overwriting() {
        // Given
        let clock = ManualClock::new();
        let mut cache = ResponseCache::new(clock, 2);
        cache.set("a", json!(1), Duration::seconds(60));
        cache.set("b", json!(2), Duration::seconds(60));

        // When
        cache.set("a", json!(10), Duration::seconds(60));
        cache.set("c", json!(3), Duration::seconds(60));

        // Then: "a" kept its original slot, so it was still the oldest.
        assert!(cache.get("a").is_none());
        assert_eq!(cache.get("b"), Some(json!(2)));
        assert_eq!(cache.get("c"), Some(json!(3)));
    }

    #[test]
    fn get__should_expire_entry_after_ttl() {
        // Given
        let clock = ManualClock::new();
        let mut cache = ResponseCache::new(clock.clone(), 10);
        cache.set("a", json!(1), Duration::seconds(30));

        // When
        clock.advance(Duration::seconds(31));

        // Then
        assert!(cache.get("a").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn get__should_return_fresh_entry_within_ttl() {
        // Given
        let clock = ManualClock::new();
        let mut cache = ResponseCache::new(clock.clone(), 10);
        cache.set("a", json!(1), Duration::seconds(30));

        // When
        clock.advance(Duration::seconds(29));

        // Then
        assert_eq!(cache.get("a"), Some(json!(1)));
        assert!(cache.has("a"));
    }

    #[test]
    fn invalidate__should_clear_everything_without_pattern() {
        // Given
        let clock = ManualClock::new();
        let mut cache = ResponseCache::new(clock, 10);
        cache.set("users:list", json!(1), Duration::seconds(60));
        cache.set("tasks:list", json!(2), Duration::seconds(60));

        // When
        cache.invalidate(None);

        // Then
        assert!(cache.is_empty());
    }

    #[test]
    fn invalidate__should_drop_keys_containing_pattern() {
        // Given
        let clock = ManualClock::new();
        let mut cache = ResponseCache::new(clock, 10);
        cache.set("users:list", json!(1), Duration::seconds(60));
        cache.set("users:42", json!(2), Duration::seconds(60));
        cache.set("tasks:list", json!(3), Duration::seconds(60));

        // When
        cache.invalidate(Some("users"));

        // Then
        assert!(cache.get("users:list").is_none());
        assert!(cache.get("users:42").is_none());
        assert_eq!(cache.get("tasks:list"), Some(json!(3)));
    }

    #[test]
    fn evicted_keys__should_not_linger_in_order_queue() {
        // Given
        let clock = ManualClock::new();
        let mut cache = ResponseCache::new(clock, 2);
        cache.set("a", json!(1), Duration::seconds(60));
        cache.set("b", json!(2), Duration::seconds(60));
        cache.invalidate(Some("a"));

        // When: capacity has room again, both inserts must survive.
        cache.set("c", json!(3), Duration::seconds(60));

        // Then
        assert_eq!(cache.get("b"), Some(json!(2)));
        assert_eq!(cache.get("c"), Some(json!(3)));
    }

    #[tokio::test]
    async fn with_cache__should_fetch_once_then_serve_cached() {
        // Given
        let clock = ManualClock::new();
        let cache = Mutex::new(ResponseCache::new(clock, 10));
        let calls = Arc::new(Mutex::new(0u32));

        let fetcher = || {
            let calls = Arc::clone(&calls);
            move || async move {
                *calls.lock().expect("calls lock") += 1;
                Ok::<_, ()>(json!({"users": 3}))
            }
        };

        // When
        let first = with_cache(&cache, "users:list", Duration::seconds(60), fetcher())
            .await
            .expect("first fetch");
        let second = with_cache(&cache, "users:list", Duration::seconds(60), fetcher())
            .await
            .expect("second fetch");

        // Then
        assert_eq!(first, second);
        assert_eq!(*calls.lock().expect("calls lock"), 1);
    }
}
