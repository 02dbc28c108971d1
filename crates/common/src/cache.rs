//! Get-or-compute cache with TTL expiry, single-flight de-duplication and
//! pattern invalidation.
//!
//! One cache instance is constructed per process and injected (`Arc<Cache>`)
//! into every dependent; there is no global singleton. Values are stored as
//! `serde_json::Value` so one store serves heterogeneous lookup classes and
//! `invalidate_pattern` can sweep across them.

use anyhow::{Context, Result};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;

/// Outcome broadcast to de-duplicated waiters. Errors travel as text: the
/// original `anyhow::Error` is not `Clone` and failures are never cached.
type FlightOutcome = Result<serde_json::Value, String>;

struct StoredEntry {
    value: serde_json::Value,
    expires_at: Instant,
}

#[derive(Default)]
struct CacheInner {
    entries: HashMap<String, StoredEntry>,
    in_flight: HashMap<String, broadcast::Sender<FlightOutcome>>,
}

#[derive(Default)]
pub struct Cache {
    inner: Mutex<CacheInner>,
}

/// Releases the in-flight slot if the leading compute is dropped mid-way
/// (request cancellation). Dropping the sender wakes waiters, which then
/// retry and elect a new leader.
struct FlightGuard<'a> {
    cache: &'a Cache,
    key: &'a str,
    armed: bool,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.cache.lock().in_flight.remove(self.key);
        }
    }
}

impl Cache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        // The mutex is only ever held for map operations, never across an
        // await; a poisoned lock means a panic mid-map-op, safe to continue.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return the cached value for `key` if present and unexpired; otherwise
    /// run `compute`, store its result with `ttl`, and return it.
    ///
    /// Concurrent calls for the same key are de-duplicated: exactly one
    /// compute runs, the rest await its outcome. A compute failure is handed
    /// to the caller and all subscribed waiters, and nothing is stored, so a
    /// transient outage self-heals on the next call.
    pub async fn get_with<T, F, Fut>(&self, key: &str, ttl: Duration, compute: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        loop {
            let waiter = {
                let mut inner = self.lock();
                if let Some(entry) = inner.entries.get(key) {
                    if entry.expires_at > Instant::now() {
                        metrics::counter!("conviction_cache_hits_total").increment(1);
                        let value = entry.value.clone();
                        drop(inner);
                        return serde_json::from_value(value)
                            .with_context(|| format!("cached value for {key} has wrong shape"));
                    }
                    inner.entries.remove(key);
                }
                match inner.in_flight.get(key) {
                    Some(tx) => Some(tx.subscribe()),
                    None => {
                        let (tx, _rx) = broadcast::channel(1);
                        inner.in_flight.insert(key.to_string(), tx);
                        None
                    }
                }
            };

            let Some(mut rx) = waiter else {
                metrics::counter!("conviction_cache_misses_total").increment(1);
                return self.lead_compute(key, ttl, compute).await;
            };

            metrics::counter!("conviction_cache_waits_total").increment(1);
            match rx.recv().await {
                Ok(Ok(value)) => {
                    return serde_json::from_value(value)
                        .with_context(|| format!("in-flight value for {key} has wrong shape"));
                }
                Ok(Err(msg)) => anyhow::bail!("{msg}"),
                // Leader dropped without broadcasting; retry and take over.
                Err(_) => continue,
            }
        }
    }

    async fn lead_compute<T, F, Fut>(&self, key: &str, ttl: Duration, compute: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut guard = FlightGuard {
            cache: self,
            key,
            armed: true,
        };
        let outcome = compute().await;

        let (result, broadcast_msg) = match outcome {
            Ok(value) => match serde_json::to_value(&value) {
                Ok(json) => {
                    let mut inner = self.lock();
                    inner.entries.insert(
                        key.to_string(),
                        StoredEntry {
                            value: json.clone(),
                            expires_at: Instant::now() + ttl,
                        },
                    );
                    (Ok(value), Ok(json))
                }
                Err(e) => {
                    let msg = format!("failed to serialize value for {key}: {e}");
                    (Err(anyhow::Error::new(e).context(msg.clone())), Err(msg))
                }
            },
            Err(e) => {
                let msg = e.to_string();
                (Err(e), Err(msg))
            }
        };

        let tx = self.lock().in_flight.remove(key);
        guard.armed = false;
        if let Some(tx) = tx {
            // No receivers is fine: nobody waited on this key.
            let _ = tx.send(broadcast_msg);
        }
        result
    }

    /// Remove one entry. A no-op for unknown keys.
    pub fn invalidate(&self, key: &str) {
        if self.lock().entries.remove(key).is_some() {
            metrics::counter!("conviction_cache_invalidations_total").increment(1);
        }
    }

    /// Remove every entry whose key matches `pattern`; returns how many were
    /// dropped. In-flight computes are unaffected and will re-store on
    /// completion.
    pub fn invalidate_pattern(&self, pattern: &Regex) -> usize {
        let mut inner = self.lock();
        let before = inner.entries.len();
        inner.entries.retain(|key, _| !pattern.is_match(key));
        let removed = before - inner.entries.len();
        if removed > 0 {
            metrics::counter!("conviction_cache_invalidations_total").increment(removed as u64);
        }
        removed
    }

    /// Drop expired entries. Total size is otherwise unbounded; long-lived
    /// processes call this from a housekeeping tick.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut inner = self.lock();
        let before = inner.entries.len();
        inner.entries.retain(|_, entry| entry.expires_at > now);
        before - inner.entries.len()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }
}
