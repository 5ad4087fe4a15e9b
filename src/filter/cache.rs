//! Response caching filter.
//!
//! Serves fresh `GET` responses from memory by short-circuiting the request
//! chain, and stores successful responses on the way back out. The same
//! instance must be registered as both a request and a response filter.

use std::collections::HashMap;
use std::io;
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};

use http::{Method, StatusCode};

use crate::config::ChainConfig;
use crate::core::{FilterContext, Response};

use super::{RequestFilter, ResponseFilter};

/// Context key holding the cache key of a cacheable miss.
const CACHE_KEY: &str = "cache.key";
/// Context key set when the response came from the cache.
const CACHE_HIT: &str = "cache.hit";

/// Upper bound on stored entries when not configured.
pub const DEFAULT_MAX_ENTRIES: usize = 1024;

struct CacheEntry {
    response: Response,
    stored_at: Instant,
}

/// In-memory response cache keyed by request URI.
pub struct CacheFilter {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
    max_entries: usize,
}

impl CacheFilter {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    /// Returns None if caching is disabled.
    pub fn from_config(config: &ChainConfig) -> Option<Self> {
        config
            .cache_ttl
            .map(|ttl| Self::new(ttl).with_max_entries(config.cache_max_entries))
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every stored response.
    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn lookup(&self, key: &str) -> Option<Response> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(key)
            .filter(|e| e.stored_at.elapsed() < self.ttl)
            .map(|e| e.response.clone())
    }

    fn store(&self, key: String, response: Response) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);

        if entries.len() >= self.max_entries && !entries.contains_key(&key) {
            let ttl = self.ttl;
            entries.retain(|_, e| e.stored_at.elapsed() < ttl);
            if entries.len() >= self.max_entries {
                tracing::debug!(key = %key, "response cache full, not storing");
                return;
            }
        }

        entries.insert(
            key,
            CacheEntry {
                response,
                stored_at: Instant::now(),
            },
        );
    }
}

impl RequestFilter for CacheFilter {
    fn pre_filter(&self, ctx: &mut FilterContext) -> io::Result<()> {
        if ctx.request.method() != Method::GET {
            return Ok(());
        }

        let key = ctx.request.uri().to_string();
        match self.lookup(&key) {
            Some(cached) => {
                tracing::debug!(key = %key, "response cache hit");
                ctx.set(CACHE_HIT, true);
                ctx.set_response(cached.with_header("x-cache", "HIT"));
            }
            None => {
                ctx.set_response_header("X-Cache", "MISS");
                ctx.set(CACHE_KEY, key);
            }
        }

        Ok(())
    }
}

impl ResponseFilter for CacheFilter {
    fn post_filter(&self, ctx: &mut FilterContext) -> io::Result<()> {
        if ctx.get::<bool>(CACHE_HIT).copied().unwrap_or(false) {
            return Ok(());
        }

        let Some(key) = ctx.remove::<String>(CACHE_KEY) else {
            return Ok(());
        };

        if let Some(res) = ctx.response().filter(|r| r.status() == StatusCode::OK) {
            self.store(key, res.clone());
        }

        Ok(())
    }
}
