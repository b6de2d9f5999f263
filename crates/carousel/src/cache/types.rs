//! # Cache Types
//!
//! Common types shared by every keyed cache.

use std::sync::Arc;

use serde::Serialize;

use crate::ErrorKind;

/// Outcome of a cache lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Value was cached; the callback already ran
    Hit,
    /// Value was missing; the producer was started
    Miss,
}

/// Counters of one cache
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
    pub removals: u64,
}

impl CacheStats {
    /// Fraction of lookups served from the cache
    pub fn hit_ratio(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            return 0.0;
        }
        self.hits as f64 / lookups as f64
    }
}

/// Callback of an asynchronous cache request
pub type CacheCallback<V> = Box<dyn FnOnce(ErrorKind, Option<Arc<V>>) + Send + 'static>;
