// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Cache collaborator contract
//!
//! This module provides:
//! - The `Cache` trait every backend satisfies (get/set/delete/flush)
//! - Group indexes used for bulk invalidation
//! - An in-process backend
//! - Parsing of `type:host:port:compress` backend selectors

pub mod backend;
pub mod group_index;
pub mod memory;

pub use backend::{BackendKind, CacheBackendSpec};
pub use group_index::GroupIndex;
pub use memory::MemoryCache;

use thiserror::Error;

/// Errors reported by a cache backend
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CacheError {
    #[error("Cache backend error: {0}")]
    Backend(String),

    #[error("Unsupported cache backend: {0}")]
    Unsupported(String),
}

/// Key/value store holding encoded results and group indexes
///
/// Calls are synchronous and may block for as long as the backend does.
/// An `expire_secs` of zero or less stores the value without expiry.
pub trait Cache: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    fn set(&self, key: &str, value: Vec<u8>, expire_secs: i64) -> Result<(), CacheError>;

    /// Returns whether an entry was removed
    fn delete(&self, key: &str) -> Result<bool, CacheError>;

    fn flush(&self) -> Result<(), CacheError>;
}

/// Source of the current Unix time in seconds
pub trait Clock: Send + Sync {
    fn now(&self) -> i64;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}
