// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Error types for query execution, caching and transaction control

use thiserror::Error;

use crate::cache::CacheError;
use crate::db::NativeError;

/// Errors surfaced by the query layer
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    /// Bind parameters mixed positional and kind-tagged forms, or a
    /// trailing discriminator was malformed
    #[error("Invalid parameter list: {0}")]
    InvalidParameterList(String),

    #[error("Associative shape needs at least 2 columns, result has {columns}")]
    TooFewColumns { columns: usize },

    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    #[error("Unable to prepare statement [{sql}]: ({code}) {message}")]
    PrepareFailed {
        sql: String,
        code: i32,
        message: String,
    },

    #[error("Statement failed [{sql}]: ({code}) {message}")]
    ExecuteFailed {
        sql: String,
        code: i32,
        message: String,
    },

    /// Non-fatal: reported through logging and statistics, never returned
    /// in place of a computed result
    #[error("Cache write failed: {0}")]
    CacheWriteFailed(String),

    #[error("No active transaction")]
    NoActiveTransaction,

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl QueryError {
    pub(crate) fn prepare_failed(sql: &str, error: NativeError) -> Self {
        QueryError::PrepareFailed {
            sql: sql.to_string(),
            code: error.code,
            message: error.message,
        }
    }

    pub(crate) fn execute_failed(sql: &str, error: NativeError) -> Self {
        QueryError::ExecuteFailed {
            sql: sql.to_string(),
            code: error.code,
            message: error.message,
        }
    }

    /// True for failures reported by the database collaborator
    pub fn is_statement_failure(&self) -> bool {
        matches!(
            self,
            QueryError::PrepareFailed { .. } | QueryError::ExecuteFailed { .. }
        )
    }
}

impl From<CacheError> for QueryError {
    fn from(error: CacheError) -> Self {
        QueryError::CacheWriteFailed(error.to_string())
    }
}

impl From<bincode::Error> for QueryError {
    fn from(error: bincode::Error) -> Self {
        QueryError::Serialization(error.to_string())
    }
}

impl From<serde_json::Error> for QueryError {
    fn from(error: serde_json::Error) -> Self {
        QueryError::Config(error.to_string())
    }
}
