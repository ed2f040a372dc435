// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Cache backend selector strings (`type:host:port:compress`)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use super::{Cache, CacheError, Clock, MemoryCache};
use crate::error::QueryError;

/// Family of cache backend named by a selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackendKind {
    /// Files on local disk; the host field is the cache directory
    Disk,
    /// Process memory
    InProcess,
    /// Memcache-like server
    Memcache,
    /// Redis-like server
    Redis,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Disk => "disk",
            BackendKind::InProcess => "memory",
            BackendKind::Memcache => "memcache",
            BackendKind::Redis => "redis",
        }
    }

    /// Unknown names select the disk backend
    fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "memory" | "inproc" | "in-proc" | "apc" => BackendKind::InProcess,
            "memcache" | "memcached" => BackendKind::Memcache,
            "redis" => BackendKind::Redis,
            _ => BackendKind::Disk,
        }
    }
}

/// Parsed backend selector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheBackendSpec {
    pub kind: BackendKind,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub compress: bool,
}

impl Default for CacheBackendSpec {
    fn default() -> Self {
        Self {
            kind: BackendKind::Disk,
            host: None,
            port: None,
            compress: false,
        }
    }
}

impl CacheBackendSpec {
    pub fn parse(selector: &str) -> Result<Self, QueryError> {
        let mut parts = selector.splitn(4, ':');
        let kind = BackendKind::from_name(parts.next().unwrap_or("").trim());
        let host = parts
            .next()
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(str::to_string);
        let port = match parts.next().map(str::trim).filter(|p| !p.is_empty()) {
            Some(port) => Some(port.parse::<u16>().map_err(|_| {
                QueryError::Config(format!("invalid cache port '{}' in '{}'", port, selector))
            })?),
            None => None,
        };
        let compress = matches!(
            parts.next().map(|c| c.trim().to_ascii_lowercase()).as_deref(),
            Some("1" | "true" | "yes" | "on")
        );

        Ok(Self {
            kind,
            host,
            port,
            compress,
        })
    }

    /// Build the backend when it lives in this process
    ///
    /// Remote and disk backends are wired by the application.
    pub fn connect_in_process(&self, clock: Arc<dyn Clock>) -> Result<Arc<dyn Cache>, QueryError> {
        match self.kind {
            BackendKind::InProcess => {
                log::debug!("Using in-process cache backend");
                Ok(Arc::new(MemoryCache::with_clock(clock)))
            }
            other => Err(QueryError::Config(
                CacheError::Unsupported(format!(
                    "{} backends must be supplied by the application",
                    other.as_str()
                ))
                .to_string(),
            )),
        }
    }
}

impl FromStr for CacheBackendSpec {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for CacheBackendSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.kind.as_str(),
            self.host.as_deref().unwrap_or(""),
            self.port.map(|p| p.to_string()).unwrap_or_default(),
            if self.compress { "1" } else { "0" }
        )
    }
}
