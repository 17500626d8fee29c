// Yatube - A blog with groups, comments and author subscriptions
// Copyright (C) 2025 Yatube Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Time-bounded cache for rendered listings
//!
//! The backend is injected so it can be swapped or faked. Reads fail open:
//! whatever goes wrong with the backend, the caller still gets a freshly
//! computed value.

mod clock;

pub use clock::{Clock, SystemClock};

#[cfg(test)]
pub(crate) use clock::ManualClock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::log_cache;

/// Errors a cache backend can report
#[derive(Debug, Error)]
pub enum CacheError {
    #[cfg(test)]
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),

    #[error("ttl out of range: {0:?}")]
    InvalidTtl(Duration),
}

/// Key-value store with per-entry expiry
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Get a live entry
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError>;

    /// Store an entry that expires after `ttl`, replacing any previous one
    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<(), CacheError>;

    /// Drop every entry
    async fn clear(&self) -> Result<(), CacheError>;
}

struct CacheEntry {
    value: Value,
    expires_at: DateTime<Utc>,
}

/// In-process cache backend
///
/// Expired entries are swept on every write. When full, the entry closest
/// to expiry makes room for the new one.
pub struct MemoryCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    clock: Arc<dyn Clock>,
    max_entries: usize,
}

impl MemoryCache {
    pub fn new(clock: Arc<dyn Clock>, max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
            max_entries: max_entries.max(1),
        }
    }

    /// Number of stored entries, expired ones included
    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        let now = self.clock.now();
        {
            let guard = self.entries.read().await;
            match guard.get(key) {
                Some(entry) if entry.expires_at > now => return Ok(Some(entry.value.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }

        // Expired; drop it unless someone refreshed it in the meantime
        let mut guard = self.entries.write().await;
        if guard.get(key).is_some_and(|entry| entry.expires_at <= now) {
            guard.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<(), CacheError> {
        let now = self.clock.now();
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|delta| now.checked_add_signed(delta))
            .ok_or(CacheError::InvalidTtl(ttl))?;

        let mut guard = self.entries.write().await;
        guard.retain(|_, entry| entry.expires_at > now);

        if guard.len() >= self.max_entries && !guard.contains_key(key) {
            let oldest = guard
                .iter()
                .min_by_key(|(_, entry)| entry.expires_at)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                debug!(key = %oldest, "Evicting cache entry to make room");
                guard.remove(&oldest);
            }
        }

        guard.insert(key.to_string(), CacheEntry { value, expires_at });
        Ok(())
    }

    async fn clear(&self) -> Result<(), CacheError> {
        self.entries.write().await.clear();
        Ok(())
    }
}

/// Read-through cache for computed pages
#[derive(Clone)]
pub struct PageCache {
    backend: Arc<dyn CacheBackend>,
}

impl PageCache {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self { backend }
    }

    /// Return the cached value for `key`, or compute, store and return it
    pub async fn get_or_compute<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        compute: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        match self.backend.get(key).await {
            Ok(Some(value)) => match serde_json::from_value::<T>(value) {
                Ok(hit) => {
                    log_cache!(hit, key);
                    return Ok(hit);
                }
                Err(e) => warn!(key, error = %e, "Discarding undecodable cache entry"),
            },
            Ok(None) => log_cache!(miss, key),
            Err(e) => warn!(key, error = %e, "Cache read failed, computing directly"),
        }

        let fresh = compute().await?;

        match serde_json::to_value(&fresh) {
            Ok(value) => {
                if let Err(e) = self.backend.set(key, value, ttl).await {
                    warn!(key, error = %e, "Cache write failed");
                }
            }
            Err(e) => warn!(key, error = %e, "Value not cacheable"),
        }

        Ok(fresh)
    }

    /// Evict everything
    pub async fn clear(&self) -> Result<(), CacheError> {
        self.backend.clear().await?;
        log_cache!(cleared);
        Ok(())
    }
}
