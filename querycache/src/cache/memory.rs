// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! In-process cache backend

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use super::{Cache, CacheError, Clock, SystemClock};

#[derive(Debug, Clone)]
struct StoredEntry {
    bytes: Vec<u8>,
    expires_at: Option<i64>,
}

impl StoredEntry {
    fn is_expired(&self, now: i64) -> bool {
        matches!(self.expires_at, Some(expires_at) if expires_at <= now)
    }
}

/// Cache held in process memory; entries expire lazily on read
pub struct MemoryCache {
    entries: RwLock<HashMap<String, StoredEntry>>,
    clock: Arc<dyn Clock>,
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Number of entries that have not expired
    pub fn len(&self) -> usize {
        let now = self.clock.now();
        self.entries
            .read()
            .values()
            .filter(|entry| !entry.is_expired(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains_key(&self, key: &str) -> bool {
        let now = self.clock.now();
        self.entries
            .read()
            .get(key)
            .is_some_and(|entry| !entry.is_expired(now))
    }
}

impl Cache for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let now = self.clock.now();
        {
            let entries = self.entries.read();
            match entries.get(key) {
                None => return Ok(None),
                Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.bytes.clone())),
                Some(_) => {}
            }
        }

        // Remove expired entry
        self.entries.write().remove(key);
        Ok(None)
    }

    fn set(&self, key: &str, value: Vec<u8>, expire_secs: i64) -> Result<(), CacheError> {
        let expires_at = (expire_secs > 0).then(|| self.clock.now() + expire_secs);
        self.entries.write().insert(
            key.to_string(),
            StoredEntry {
                bytes: value,
                expires_at,
            },
        );
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.entries.write().remove(key).is_some())
    }

    fn flush(&self) -> Result<(), CacheError> {
        self.entries.write().clear();
        Ok(())
    }
}
