// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Session configuration

use serde::{Deserialize, Serialize};

use crate::cache::CacheBackendSpec;
use crate::error::QueryError;
use crate::executor::DEFAULT_EXPIRE_SECS;
use crate::keys::{CacheKeyDeriver, DEFAULT_SITE_KEY};

pub const ENV_SITE_KEY: &str = "QUERYCACHE_SITE_KEY";
pub const ENV_DEFAULT_EXPIRE: &str = "QUERYCACHE_DEFAULT_EXPIRE";
pub const ENV_CACHE_BACKEND: &str = "QUERYCACHE_CACHE";

/// Settings threaded into a session at construction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Secret prefixed to every derived cache key
    pub site_key: String,

    /// Expiry for cached results when the caller gives none (seconds)
    pub default_expire_secs: i64,

    /// Backend selector, `type:host:port:compress`
    pub cache_backend: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            site_key: DEFAULT_SITE_KEY.to_string(),
            default_expire_secs: DEFAULT_EXPIRE_SECS,
            cache_backend: "disk".to_string(),
        }
    }
}

impl SessionConfig {
    /// Defaults overridden by any `QUERYCACHE_*` environment variables
    pub fn from_env() -> Result<Self, QueryError> {
        let mut config = Self::default();
        if let Ok(site_key) = std::env::var(ENV_SITE_KEY) {
            config.site_key = site_key;
        }
        if let Ok(expire) = std::env::var(ENV_DEFAULT_EXPIRE) {
            config.default_expire_secs = expire.trim().parse().map_err(|_| {
                QueryError::Config(format!("{} is not a number: '{}'", ENV_DEFAULT_EXPIRE, expire))
            })?;
        }
        if let Ok(backend) = std::env::var(ENV_CACHE_BACKEND) {
            config.cache_backend = backend;
        }
        config.validate().map_err(QueryError::Config)?;
        Ok(config)
    }

    pub fn from_json_str(json: &str) -> Result<Self, QueryError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate().map_err(QueryError::Config)?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.site_key.is_empty() {
            return Err("site_key must not be empty".to_string());
        }
        if self.default_expire_secs <= 0 {
            return Err(format!(
                "default_expire_secs must be positive, got {}",
                self.default_expire_secs
            ));
        }
        CacheBackendSpec::parse(&self.cache_backend).map_err(|e| e.to_string())?;
        Ok(())
    }

    pub fn backend(&self) -> Result<CacheBackendSpec, QueryError> {
        CacheBackendSpec::parse(&self.cache_backend)
    }

    pub fn key_deriver(&self) -> CacheKeyDeriver {
        CacheKeyDeriver::new(self.site_key.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::BackendKind;
    use serial_test::serial;

    fn clear_env() {
        std::env::remove_var(ENV_SITE_KEY);
        std::env::remove_var(ENV_DEFAULT_EXPIRE);
        std::env::remove_var(ENV_CACHE_BACKEND);
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = SessionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.site_key, DEFAULT_SITE_KEY);
        assert_eq!(config.default_expire_secs, 3600);
        assert_eq!(config.backend().unwrap().kind, BackendKind::Disk);
    }

    #[test]
    fn test_json_with_partial_fields() {
        let config =
            SessionConfig::from_json_str(r#"{"site_key": "shop", "cache_backend": "memory"}"#)
                .unwrap();
        assert_eq!(config.site_key, "shop");
        assert_eq!(config.default_expire_secs, DEFAULT_EXPIRE_SECS);
        assert_eq!(config.backend().unwrap().kind, BackendKind::InProcess);
        assert_eq!(config.key_deriver().site_key(), "shop");
    }

    #[test]
    fn test_json_rejects_invalid_values() {
        assert!(SessionConfig::from_json_str(r#"{"default_expire_secs": 0}"#).is_err());
        assert!(SessionConfig::from_json_str(r#"{"site_key": ""}"#).is_err());
        assert!(SessionConfig::from_json_str("not json").is_err());
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        clear_env();
        std::env::set_var(ENV_SITE_KEY, "env-site");
        std::env::set_var(ENV_DEFAULT_EXPIRE, "120");
        std::env::set_var(ENV_CACHE_BACKEND, "redis:localhost:6379:0");

        let config = SessionConfig::from_env().unwrap();
        assert_eq!(config.site_key, "env-site");
        assert_eq!(config.default_expire_secs, 120);
        assert_eq!(config.backend().unwrap().kind, BackendKind::Redis);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_bad_expire() {
        clear_env();
        std::env::set_var(ENV_DEFAULT_EXPIRE, "soon");
        assert!(matches!(
            SessionConfig::from_env(),
            Err(QueryError::Config(_))
        ));
        clear_env();
    }
}
