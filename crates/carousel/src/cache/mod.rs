//! # Keyed Cache
//!
//! A string-keyed map of shared values with an asynchronous fill protocol.
//!
//! A request either hits and answers immediately, or misses and hands a
//! [`Completion`] to a producer. The producer finishes the completion from
//! any thread; a successful value is installed under the key and then
//! delivered to the requester.
//!
//! Concurrent misses on the same key are not merged: each one runs its own
//! producer and the last completion to install wins the slot. Every
//! requester still receives the value its own producer made.
//!
//! The lock is never held while a producer or a callback runs.

mod types;

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

pub use types::{CacheCallback, CacheStats, CacheStatus};

use crate::ErrorKind;

struct Entries<V> {
    values: HashMap<String, Arc<V>>,
    stats: CacheStats,
}

/// String-keyed cache of `Arc<V>` values
pub struct KeyedCache<V> {
    name: &'static str,
    entries: Arc<Mutex<Entries<V>>>,
}

impl<V> Clone for KeyedCache<V> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<V: Send + Sync + 'static> KeyedCache<V> {
    /// Create an empty cache. `name` labels its log events.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: Arc::new(Mutex::new(Entries {
                values: HashMap::new(),
                stats: CacheStats::default(),
            })),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Cached value of `key`, without touching the hit/miss counters
    pub fn get(&self, key: &str) -> Option<Arc<V>> {
        self.entries.lock().values.get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries.lock().values.keys().cloned().collect()
    }

    /// Look up `key`, producing it on a miss.
    ///
    /// On a hit `callback` runs before this returns and `produce` is never
    /// called. On a miss `produce` receives the [`Completion`] that will
    /// eventually call `callback`.
    pub fn request<P, C>(&self, key: impl Into<String>, produce: P, callback: C) -> CacheStatus
    where
        P: FnOnce(Completion<V>),
        C: FnOnce(ErrorKind, Option<Arc<V>>) + Send + 'static,
    {
        let key = key.into();
        let cached = {
            let mut entries = self.entries.lock();
            let cached = entries.values.get(&key).cloned();
            if cached.is_some() {
                entries.stats.hits += 1;
            } else {
                entries.stats.misses += 1;
            }
            cached
        };

        if let Some(value) = cached {
            trace!(cache = self.name, %key, "Cache hit");
            callback(ErrorKind::None, Some(value));
            return CacheStatus::Hit;
        }

        trace!(cache = self.name, %key, "Cache miss");
        produce(Completion {
            cache: self.clone(),
            key,
            callback: Box::new(callback),
        });
        CacheStatus::Miss
    }

    /// Install `value` under `key`, replacing any previous value
    pub fn insert(&self, key: impl Into<String>, value: V) -> Arc<V> {
        let value = Arc::new(value);
        self.insert_arc(key.into(), Arc::clone(&value));
        value
    }

    fn insert_arc(&self, key: String, value: Arc<V>) {
        let replaced = {
            let mut entries = self.entries.lock();
            entries.stats.inserts += 1;
            entries.values.insert(key.clone(), value)
        };
        debug!(
            cache = self.name,
            %key,
            replaced = replaced.is_some(),
            "Cache insert"
        );
    }

    /// Drop the entry of `key`. Holders of the value keep it alive.
    pub fn remove(&self, key: &str) -> Option<Arc<V>> {
        let removed = {
            let mut entries = self.entries.lock();
            let removed = entries.values.remove(key);
            if removed.is_some() {
                entries.stats.removals += 1;
            }
            removed
        };
        if removed.is_some() {
            debug!(cache = self.name, %key, "Cache remove");
        }
        removed
    }

    /// Drop the entry holding exactly this value
    pub fn remove_value(&self, value: &Arc<V>) -> bool {
        let mut entries = self.entries.lock();
        let key = entries
            .values
            .iter()
            .find(|(_, cached)| Arc::ptr_eq(cached, value))
            .map(|(key, _)| key.clone());

        match key {
            Some(key) => {
                entries.values.remove(&key);
                entries.stats.removals += 1;
                drop(entries);
                debug!(cache = self.name, %key, "Cache remove by value");
                true
            }
            None => false,
        }
    }

    pub fn clear(&self) {
        let mut entries = self.entries.lock();
        let count = entries.values.len() as u64;
        entries.values.clear();
        entries.stats.removals += count;
    }

    pub fn stats(&self) -> CacheStats {
        self.entries.lock().stats
    }
}

/// Pending fill of one cache miss.
///
/// Dropping a completion without finishing it drops the requester's callback
/// unanswered.
pub struct Completion<V> {
    cache: KeyedCache<V>,
    key: String,
    callback: CacheCallback<V>,
}

impl<V: Send + Sync + 'static> Completion<V> {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Install a produced value, or report why there is none, then answer the requester
    pub fn complete(self, result: Result<V, ErrorKind>) {
        self.complete_then(result, |_| {});
    }

    /// Like [`complete`](Self::complete), running `then` on the installed
    /// value before the requester is answered
    pub fn complete_then<F>(self, result: Result<V, ErrorKind>, then: F)
    where
        F: FnOnce(&Arc<V>),
    {
        let Completion {
            cache,
            key,
            callback,
        } = self;

        match result {
            Ok(value) => {
                let value = Arc::new(value);
                cache.insert_arc(key, Arc::clone(&value));
                then(&value);
                callback(ErrorKind::None, Some(value));
            }
            Err(error) => {
                debug!(cache = cache.name, %key, %error, "Cache fill failed");
                callback(error, None);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::thread;

    #[test]
    fn hit_skips_producer() {
        let cache = KeyedCache::new("test");
        cache.insert("a", 1u32);

        let (tx, rx) = mpsc::channel();
        let status = cache.request(
            "a",
            |_completion| panic!("producer must not run on a hit"),
            move |error, value| tx.send((error, value)).unwrap(),
        );

        assert_eq!(status, CacheStatus::Hit);
        let (error, value) = rx.try_recv().unwrap();
        assert_eq!(error, ErrorKind::None);
        assert_eq!(*value.unwrap(), 1);
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn miss_installs_produced_value() {
        let cache = KeyedCache::new("test");
        let (tx, rx) = mpsc::channel();

        let status = cache.request(
            "a",
            |completion| {
                thread::spawn(move || completion.complete(Ok(String::from("made"))));
            },
            move |error, value| tx.send((error, value)).unwrap(),
        );

        assert_eq!(status, CacheStatus::Miss);
        let (error, value) = rx.recv().unwrap();
        assert_eq!(error, ErrorKind::None);
        assert_eq!(value.as_deref().map(String::as_str), Some("made"));
        assert_eq!(cache.get("a").as_deref().map(String::as_str), Some("made"));

        let stats = cache.stats();
        assert_eq!((stats.misses, stats.inserts), (1, 1));
    }

    #[test]
    fn failed_fill_installs_nothing() {
        let cache: KeyedCache<u32> = KeyedCache::new("test");
        let (tx, rx) = mpsc::channel();

        cache.request(
            "a",
            |completion| completion.complete(Err(ErrorKind::CouldNotCreateResource)),
            move |error, value| tx.send((error, value.is_none())).unwrap(),
        );

        assert_eq!(
            rx.recv().unwrap(),
            (ErrorKind::CouldNotCreateResource, true)
        );
        assert!(cache.is_empty());
    }

    #[test]
    fn concurrent_misses_are_not_merged() {
        let cache = KeyedCache::new("test");
        let mut pending = Vec::new();
        let (tx, rx) = mpsc::channel();

        for _ in 0..2 {
            let tx = tx.clone();
            cache.request(
                "k",
                |completion| pending.push(completion),
                move |_, value| tx.send(value.unwrap()).unwrap(),
            );
        }
        assert_eq!(pending.len(), 2);
        assert_eq!(cache.stats().misses, 2);

        let mut pending = pending.into_iter();
        pending.next().unwrap().complete(Ok(1u32));
        pending.next().unwrap().complete(Ok(2u32));

        assert_eq!(*rx.recv().unwrap(), 1);
        assert_eq!(*rx.recv().unwrap(), 2);
        assert_eq!(*cache.get("k").unwrap(), 2);
    }

    #[test]
    fn callback_may_reenter_cache() {
        let cache = KeyedCache::new("test");
        let inner = cache.clone();
        let (tx, rx) = mpsc::channel();

        cache.request(
            "a",
            |completion| completion.complete(Ok(7u32)),
            move |_, _| tx.send(inner.len()).unwrap(),
        );

        assert_eq!(rx.recv().unwrap(), 1);
    }

    #[test]
    fn complete_then_runs_before_callback() {
        let cache = KeyedCache::new("test");
        let (tx, rx) = mpsc::channel();
        let then_tx = tx.clone();

        cache.request(
            "a",
            |completion| {
                completion.complete_then(Ok(3u32), move |value| {
                    then_tx.send(format!("then {value}")).unwrap()
                })
            },
            move |_, value| tx.send(format!("callback {}", value.unwrap())).unwrap(),
        );

        assert_eq!(rx.recv().unwrap(), "then 3");
        assert_eq!(rx.recv().unwrap(), "callback 3");
    }

    #[test]
    fn removal_keeps_holders_alive() {
        let cache = KeyedCache::new("test");
        let held = cache.insert("a", vec![1u8, 2, 3]);

        let removed = cache.remove("a").unwrap();
        assert!(Arc::ptr_eq(&held, &removed));
        assert_eq!(*held, vec![1, 2, 3]);
        assert!(cache.remove("a").is_none());
        assert_eq!(cache.stats().removals, 1);
    }

    #[test]
    fn remove_value_matches_identity() {
        let cache = KeyedCache::new("test");
        let a = cache.insert("a", 5u32);
        cache.insert("b", 5u32);
        let stranger = Arc::new(5u32);

        assert!(!cache.remove_value(&stranger));
        assert!(cache.remove_value(&a));
        assert_eq!(cache.keys(), vec!["b".to_string()]);

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.stats().removals, 2);
    }

    #[test]
    fn hit_ratio() {
        let stats = CacheStats {
            hits: 3,
            misses: 1,
            ..CacheStats::default()
        };
        assert_eq!(stats.hit_ratio(), 0.75);
        assert_eq!(CacheStats::default().hit_ratio(), 0.0);
    }
}
