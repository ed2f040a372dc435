// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Cached execution of shaped queries
//!
//! Results are looked up under a derived cache key; on a miss the query is
//! computed, shaped and stored. Entries stored with a group are also added
//! to that group's index so the whole group can be flushed at once.
//!
//! Known gaps: concurrent callers computing the same key all run the query
//! (no stampede protection), the entry write and the group-index write are
//! two separate cache calls, and concurrent writers to one group index
//! overwrite each other.

use std::sync::Arc;

use crate::cache::{Cache, Clock, GroupIndex};
use crate::error::QueryError;
use crate::keys::{CacheKey, CacheKeyDeriver, Discriminators, GroupName};
use crate::params::ParamList;
use crate::shape::{Shape, ShapedResult};

/// Expiry used when none (or a non-positive one) is requested
pub const DEFAULT_EXPIRE_SECS: i64 = 3600;

/// Everything that identifies one cached query
#[derive(Debug, Clone, Copy)]
pub struct CacheRequest<'a> {
    pub shape: Shape,
    pub expire_secs: Option<i64>,
    pub sql: &'a str,
    pub params: &'a ParamList,
    pub discriminators: &'a Discriminators,
}

/// What to remove from the cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushTarget {
    /// The entire cache
    All,
    /// Every member of a group, then the group index
    Group(GroupName),
    /// The single entry for literal SQL text and key
    Query { sql: String, key: Option<String> },
}

impl FlushTarget {
    /// Classify flush arguments: nothing flushes everything, a `group:`
    /// argument flushes that group, anything else is SQL text
    pub fn from_args(sql: Option<&str>, key: Option<&str>) -> Self {
        match sql {
            None => FlushTarget::All,
            Some(text) => match GroupName::parse(text) {
                Some(group) => FlushTarget::Group(group),
                None => FlushTarget::Query {
                    sql: text.to_string(),
                    key: key.map(str::to_string),
                },
            },
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
    pub write_failures: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Cache-aside executor over an injected cache collaborator
pub struct CachingQueryExecutor {
    cache: Arc<dyn Cache>,
    keys: CacheKeyDeriver,
    clock: Arc<dyn Clock>,
    default_expire_secs: i64,
    stats: CacheStats,
}

impl CachingQueryExecutor {
    pub fn new(cache: Arc<dyn Cache>, keys: CacheKeyDeriver, clock: Arc<dyn Clock>) -> Self {
        Self {
            cache,
            keys,
            clock,
            default_expire_secs: DEFAULT_EXPIRE_SECS,
            stats: CacheStats::default(),
        }
    }

    pub fn with_default_expire(mut self, expire_secs: i64) -> Self {
        if expire_secs > 0 {
            self.default_expire_secs = expire_secs;
        }
        self
    }

    pub fn keys(&self) -> &CacheKeyDeriver {
        &self.keys
    }

    pub fn cache(&self) -> &Arc<dyn Cache> {
        &self.cache
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.clone()
    }

    pub fn reset_stats(&mut self) {
        self.stats = CacheStats::default();
    }

    pub fn effective_expire(&self, requested: Option<i64>) -> i64 {
        match requested {
            Some(secs) if secs > 0 => secs,
            _ => self.default_expire_secs,
        }
    }

    /// Key a request is stored under
    pub fn key_for(&self, request: &CacheRequest<'_>) -> CacheKey {
        self.keys.derive_key(
            request.sql,
            request.discriminators.key.as_deref(),
            request.shape,
            request.params,
        )
    }

    /// Return the cached result for `request`, computing and storing it on a
    /// miss
    ///
    /// A hit is returned as stored, without checking current data. Failures
    /// to store are logged and counted but the computed result is still
    /// returned.
    pub fn execute_cached<F>(
        &mut self,
        request: &CacheRequest<'_>,
        compute: F,
    ) -> Result<ShapedResult, QueryError>
    where
        F: FnOnce() -> Result<ShapedResult, QueryError>,
    {
        let key = self.key_for(request);
        let expire_secs = self.effective_expire(request.expire_secs);
        log::debug!(
            "Cache GET shape={} expire={} sql=[{}] key={:?} group={:?} hkey={}",
            request.shape,
            expire_secs,
            request.sql,
            request.discriminators.key,
            request.discriminators.group.as_ref().map(|g| g.as_str()),
            key
        );

        if let Some(cached) = self.lookup(&key) {
            self.stats.hits += 1;
            return Ok(cached);
        }
        self.stats.misses += 1;

        let result = compute()?;

        let group = request.discriminators.group.as_ref();
        if let Err(e) = self.store(&key, &result, expire_secs, group) {
            self.stats.write_failures += 1;
            log::warn!("{} (hkey={})", e, key);
        }
        Ok(result)
    }

    fn lookup(&self, key: &CacheKey) -> Option<ShapedResult> {
        match self.cache.get(key.as_str()) {
            Ok(Some(bytes)) => match bincode::deserialize::<ShapedResult>(&bytes) {
                Ok(result) => Some(result),
                Err(e) => {
                    log::warn!("Discarding undecodable cache entry {}: {}", key, e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                log::warn!("Cache read failed for {}: {}", key, e);
                None
            }
        }
    }

    /// Store a shaped result, then record it in its group's index
    fn store(
        &mut self,
        key: &CacheKey,
        result: &ShapedResult,
        expire_secs: i64,
        group: Option<&GroupName>,
    ) -> Result<(), QueryError> {
        let bytes = bincode::serialize(result)?;
        self.cache.set(key.as_str(), bytes, expire_secs)?;
        self.stats.writes += 1;
        log::debug!("Cache SET hkey={} expire={}", key, expire_secs);

        if let Some(group) = group {
            let group_key = self.keys.derive_group_key(group);
            let now = self.clock.now();
            let mut index = self.read_group(group)?;
            let pruned = index.prune(now);
            if pruned > 0 {
                log::debug!("Pruned {} expired member(s) from {}", pruned, group);
            }
            index.insert(key.clone(), now + expire_secs);
            self.cache
                .set(group_key.as_str(), index.encode()?, expire_secs)?;
            self.stats.writes += 1;
        }
        Ok(())
    }

    /// Current index of a group; a missing index is empty
    pub fn read_group(&self, group: &GroupName) -> Result<GroupIndex, QueryError> {
        let group_key = self.keys.derive_group_key(group);
        match self.cache.get(group_key.as_str())? {
            Some(bytes) => GroupIndex::decode(&bytes).or_else(|e| {
                log::warn!("Ignoring undecodable index for {}: {}", group, e);
                Ok(GroupIndex::new())
            }),
            None => Ok(GroupIndex::new()),
        }
    }

    /// Remove cached entries, returning how many were deleted
    pub fn flush(&mut self, target: &FlushTarget) -> Result<usize, QueryError> {
        match target {
            FlushTarget::All => {
                log::info!("Flushing entire cache");
                self.cache.flush()?;
                Ok(0)
            }
            FlushTarget::Group(group) => {
                let index = self.read_group(group)?;
                let mut deleted = 0;
                for member in index.keys() {
                    if self.cache.delete(member.as_str())? {
                        deleted += 1;
                    }
                }
                let group_key = self.keys.derive_group_key(group);
                self.cache.delete(group_key.as_str())?;
                log::info!("Flushed {} entries of {}", deleted, group);
                Ok(deleted)
            }
            FlushTarget::Query { sql, key } => {
                let hkey = self.keys.derive_literal_key(sql, key.as_deref());
                log::debug!("Flushing sql=[{}] key={:?} hkey={}", sql, key, hkey);
                Ok(usize::from(self.cache.delete(hkey.as_str())?))
            }
        }
    }
}
