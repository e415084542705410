//! Volume- and TTL-bounded in-memory blob cache.

use std::{
    collections::{HashMap, VecDeque},
    sync::Mutex,
    time::{Duration, Instant},
};

use sfrodb_proto::Uid;

use crate::CoreError;

/// Cache sizing and expiry configuration.
#[derive(Debug, Clone, Copy)]
pub struct CacheConfig {
    /// Aggregate byte budget across all entries.
    pub volume_max: usize,
    /// Largest single blob eligible for insertion; larger blobs are
    /// served through but never cached.
    pub item_volume_max: usize,
    /// Age, in seconds, after which an entry becomes unreachable.
    pub item_ttl_sec: u64,
}

struct Entry {
    blob: std::sync::Arc<[u8]>,
    inserted_at: Instant,
    size: usize,
}

struct CacheInner {
    entries: HashMap<Uid, Entry>,
    /// Insertion order, oldest first, for FIFO eviction.
    order: VecDeque<Uid>,
    total_size: usize,
}

/// A key→blob cache bounded by aggregate volume and per-entry TTL.
///
/// All operations take one short-lived [`std::sync::Mutex`] critical
/// section; there is no separate lock per entry.
pub struct Cache {
    config: CacheConfig,
    inner: Mutex<CacheInner>,
}

impl Cache {
    /// Build an empty cache under `config`.
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                order: VecDeque::new(),
                total_size: 0,
            }),
        }
    }

    fn ttl(&self) -> Duration {
        Duration::from_secs(self.config.item_ttl_sec)
    }

    /// Look up `key`. Returns `None` if absent or expired.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn get(&self, key: &Uid) -> Option<std::sync::Arc<[u8]>> {
        let mut inner = self.inner.lock().expect("cache mutex poisoned");
        let ttl = self.ttl();

        let expired = inner.entries.get(key).is_some_and(|e| e.inserted_at.elapsed() >= ttl);
        if expired {
            evict_one(&mut inner, key);
            return None;
        }

        inner.entries.get(key).map(|e| e.blob.clone())
    }

    /// Presence check that does not revive an expired entry.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn exists(&self, key: &Uid) -> bool {
        let inner = self.inner.lock().expect("cache mutex poisoned");
        let ttl = self.ttl();
        inner.entries.get(key).is_some_and(|e| e.inserted_at.elapsed() < ttl)
    }

    /// Insert `blob` under `key`, evicting expired and then oldest entries
    /// to make room as needed.
    ///
    /// A no-op (returns `Ok(())` without touching state) if `blob` exceeds
    /// `item_volume_max`, or if `key` is already present with
    /// byte-identical contents.
    ///
    /// # Errors
    ///
    /// [`CoreError::CacheNoRoom`] if `blob` fits under `item_volume_max`
    /// but the cache cannot make room for it even after evicting every
    /// expired and then every FIFO-eligible entry. Callers treat this as
    /// non-fatal: the blob is still served, just not cached.
    #[allow(clippy::expect_used)]
    pub fn put(&self, key: &Uid, blob: std::sync::Arc<[u8]>) -> Result<(), CoreError> {
        let size = blob.len();
        if size > self.config.item_volume_max {
            return Ok(());
        }

        let mut inner = self.inner.lock().expect("cache mutex poisoned");

        if let Some(existing) = inner.entries.get(key) {
            if existing.blob.as_ref() == blob.as_ref() {
                return Ok(());
            }
            evict_one(&mut inner, key);
        }

        evict_expired(&mut inner, self.ttl());

        while inner.total_size + size > self.config.volume_max {
            let Some(oldest) = inner.order.front().cloned() else {
                return Err(CoreError::CacheNoRoom);
            };
            evict_one(&mut inner, &oldest);
        }

        inner.total_size += size;
        inner.order.push_back(key.clone());
        inner.entries.insert(key.clone(), Entry { blob, inserted_at: Instant::now(), size });

        Ok(())
    }

    /// Remove `key`. Returns whether it was present.
    #[allow(clippy::expect_used)]
    pub fn remove(&self, key: &Uid) -> bool {
        let mut inner = self.inner.lock().expect("cache mutex poisoned");
        let was_present = inner.entries.contains_key(key);
        evict_one(&mut inner, key);
        was_present
    }

    /// Remove every entry.
    #[allow(clippy::expect_used)]
    pub fn clear(&self) {
        let mut inner = self.inner.lock().expect("cache mutex poisoned");
        inner.entries.clear();
        inner.order.clear();
        inner.total_size = 0;
    }

    /// Current aggregate size in bytes. Exposed for tests and metrics.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn volume(&self) -> usize {
        self.inner.lock().expect("cache mutex poisoned").total_size
    }
}

fn evict_one(inner: &mut CacheInner, key: &Uid) {
    if let Some(entry) = inner.entries.remove(key) {
        inner.total_size -= entry.size;
        inner.order.retain(|k| k != key);
    }
}

fn evict_expired(inner: &mut CacheInner, ttl: Duration) {
    let expired: Vec<Uid> = inner
        .entries
        .iter()
        .filter(|(_, e)| e.inserted_at.elapsed() >= ttl)
        .map(|(k, _)| k.clone())
        .collect();
    for key in expired {
        evict_one(inner, &key);
    }
}
