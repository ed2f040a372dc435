// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Cache key and group key derivation
//!
//! Keys are SHA-256 digests of the site key, the SQL text and a
//! discriminator. The discriminator is the caller's explicit key when given;
//! otherwise the shape name followed by the flattened parameter list.
//! Discriminators starting with `group:` name a group instead of a key, so a
//! plain key can never begin with that prefix.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::error::QueryError;
use crate::params::ParamList;
use crate::shape::Shape;

/// Prefix marking a discriminator as a group name
pub const GROUP_PREFIX: &str = "group:";

/// Site key used when none is configured
pub const DEFAULT_SITE_KEY: &str = "QUERYCACHE";

/// Digest identifying one cached result
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Digest identifying the index of a group
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupKey(String);

impl GroupKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A group name, always held in its prefixed `group:<name>` form
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupName(String);

impl GroupName {
    /// Build from a bare name, adding the prefix
    pub fn new(name: &str) -> Self {
        if is_group_name(name) {
            GroupName(name.to_string())
        } else {
            GroupName(format!("{}{}", GROUP_PREFIX, name))
        }
    }

    /// Accept only strings already carrying the prefix
    pub fn parse(text: &str) -> Option<Self> {
        is_group_name(text).then(|| GroupName(text.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The name without its prefix
    pub fn name(&self) -> &str {
        &self.0[GROUP_PREFIX.len()..]
    }
}

impl fmt::Display for GroupName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn is_group_name(text: &str) -> bool {
    text.starts_with(GROUP_PREFIX)
}

/// Explicit key and group supplied after the SQL and its parameters
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Discriminators {
    pub key: Option<String>,
    pub group: Option<GroupName>,
}

impl Discriminators {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_key(key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            group: None,
        }
    }

    pub fn group(mut self, group: GroupName) -> Self {
        self.group = Some(group);
        self
    }

    /// Classify up to two trailing arguments
    ///
    /// Any argument starting with `group:` is the group, wherever it sits;
    /// the other one is the explicit key.
    pub fn from_trailing<S: AsRef<str>>(args: &[S]) -> Result<Self, QueryError> {
        if args.len() > 2 {
            return Err(QueryError::InvalidParameterList(format!(
                "expected at most a key and a group after the parameters, got {} extra arguments",
                args.len()
            )));
        }

        let mut discriminators = Self::default();
        for arg in args {
            let arg = arg.as_ref();
            match GroupName::parse(arg) {
                Some(group) if discriminators.group.is_none() => discriminators.group = Some(group),
                Some(_) => {
                    return Err(QueryError::InvalidParameterList(
                        "more than one group given".to_string(),
                    ))
                }
                None if discriminators.key.is_none() => {
                    discriminators.key = Some(arg.to_string())
                }
                None => {
                    return Err(QueryError::InvalidParameterList(
                        "more than one cache key given".to_string(),
                    ))
                }
            }
        }
        Ok(discriminators)
    }
}

/// Derives namespaced cache keys from the configured site key
#[derive(Debug, Clone)]
pub struct CacheKeyDeriver {
    site_key: String,
}

impl Default for CacheKeyDeriver {
    fn default() -> Self {
        Self::new(DEFAULT_SITE_KEY)
    }
}

impl CacheKeyDeriver {
    pub fn new(site_key: impl Into<String>) -> Self {
        Self {
            site_key: site_key.into(),
        }
    }

    pub fn site_key(&self) -> &str {
        &self.site_key
    }

    /// Key for a shaped query result
    ///
    /// With an explicit key the parameter values play no part in the key.
    pub fn derive_key(
        &self,
        sql: &str,
        explicit_key: Option<&str>,
        shape: Shape,
        params: &ParamList,
    ) -> CacheKey {
        let discriminator = match explicit_key {
            Some(key) => key.to_string(),
            None => format!("{}{}", shape.name(), params.discriminator()),
        };
        CacheKey(self.digest(&[sql, &discriminator]))
    }

    /// Key for literal SQL text plus an optional key, as used when flushing
    pub fn derive_literal_key(&self, sql: &str, key: Option<&str>) -> CacheKey {
        CacheKey(self.digest(&[sql, key.unwrap_or("")]))
    }

    pub fn derive_group_key(&self, group: &GroupName) -> GroupKey {
        GroupKey(self.digest(&[group.as_str()]))
    }

    fn digest(&self, parts: &[&str]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.site_key.as_bytes());
        for part in parts {
            hasher.update(part.as_bytes());
        }
        hex::encode(hasher.finalize())
    }
}
