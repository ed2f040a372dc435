// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Membership index of a cache group

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::QueryError;
use crate::keys::CacheKey;

/// Cache keys of one group mapped to their absolute expiry (Unix seconds)
///
/// Expired members are only dropped when the index is next read for an
/// update, never eagerly.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GroupIndex {
    members: BTreeMap<CacheKey, i64>,
}

impl GroupIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, QueryError> {
        Ok(bincode::deserialize(bytes)?)
    }

    pub fn encode(&self) -> Result<Vec<u8>, QueryError> {
        Ok(bincode::serialize(self)?)
    }

    /// Drop members whose expiry is before `now`, returning how many went
    pub fn prune(&mut self, now: i64) -> usize {
        let before = self.members.len();
        self.members.retain(|_, expires_at| *expires_at >= now);
        before - self.members.len()
    }

    pub fn insert(&mut self, key: CacheKey, expires_at: i64) {
        self.members.insert(key, expires_at);
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.members.contains_key(key)
    }

    pub fn expires_at(&self, key: &CacheKey) -> Option<i64> {
        self.members.get(key).copied()
    }

    pub fn keys(&self) -> impl Iterator<Item = &CacheKey> {
        self.members.keys()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
