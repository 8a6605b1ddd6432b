//! Per-key recurring revalidation timers.
//!
//! Keeps resources fresh while a user is actively viewing them. Each key
//! moves Stopped -> Running -> Stopped; the registry holds at most one timer
//! handle per key, start is idempotent and stop of an unregistered key is a
//! no-op.

use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use super::engine::{InvalidationScope, QueryEngine};
use super::key::QueryKey;

/// Observability snapshot of the timer registry.
#[derive(Debug, Clone, Serialize)]
pub struct SyncStatus {
    pub active_keys: Vec<String>,
    pub count: usize,
}

/// Owns the start/stop lifecycle of background revalidation timers.
pub struct BackgroundSyncManager {
    engine: Arc<dyn QueryEngine>,
    timers: DashMap<QueryKey, JoinHandle<()>>,
}

impl BackgroundSyncManager {
    /// Create a manager with no active timers.
    pub fn new(engine: Arc<dyn QueryEngine>) -> Self {
        Self {
            engine,
            timers: DashMap::new(),
        }
    }

    /// Start a recurring revalidation timer for `key`.
    ///
    /// A no-op when the key already has a timer. On each tick, if the engine
    /// holds a cached entry for the key, an active-observers-only
    /// invalidation is issued; invalidation errors are logged and ticking
    /// continues. The revalidation itself runs detached, so stopping the
    /// timer never aborts one already in flight.
    pub fn start(&self, key: &QueryKey, interval_ms: u64) {
        match self.timers.entry(key.clone()) {
            Entry::Occupied(_) => {}
            Entry::Vacant(slot) => {
                let engine = Arc::clone(&self.engine);
                let timer_key = key.clone();
                let handle = tokio::spawn(async move {
                    let mut ticker = interval(Duration::from_millis(interval_ms.max(1)));
                    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                    // The first tick completes immediately; consume it so
                    // revalidations land on interval boundaries.
                    ticker.tick().await;
                    loop {
                        ticker.tick().await;
                        if engine.cached_entry(&timer_key).is_none() {
                            continue;
                        }
                        let engine = Arc::clone(&engine);
                        let sync_key = timer_key.clone();
                        tokio::spawn(async move {
                            if let Err(err) = engine
                                .invalidate(&sync_key, InvalidationScope::ActiveObservers)
                                .await
                            {
                                log::warn!("background revalidation of {sync_key} failed: {err}");
                            }
                        });
                    }
                });
                slot.insert(handle);
                log::debug!("background sync started for {key} every {interval_ms}ms");
            }
        }
    }

    /// Stop the timer for `key`, if one is registered.
    pub fn stop(&self, key: &QueryKey) {
        if let Some((_, handle)) = self.timers.remove(key) {
            handle.abort();
            log::debug!("background sync stopped for {key}");
        }
    }

    /// Stop every registered timer. Used at orchestrator teardown.
    pub fn stop_all(&self) {
        let keys: Vec<QueryKey> = self.timers.iter().map(|entry| entry.key().clone()).collect();
        for key in &keys {
            self.stop(key);
        }
        if !keys.is_empty() {
            log::debug!("stopped {} background sync timers", keys.len());
        }
    }

    /// Keys with an active timer and their count.
    pub fn status(&self) -> SyncStatus {
        let active_keys: Vec<String> = self.timers.iter().map(|entry| entry.key().to_string()).collect();
        SyncStatus {
            count: active_keys.len(),
            active_keys,
        }
    }
}

impl Drop for BackgroundSyncManager {
    fn drop(&mut self) {
        for entry in self.timers.iter() {
            entry.value().abort();
        }
    }
}
