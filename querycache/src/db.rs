// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Database collaborator contract

use std::fmt;

use crate::params::BindParameter;
use crate::types::RowSet;

/// Error code and message reported by the database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeError {
    pub code: i32,
    pub message: String,
}

impl NativeError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for NativeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}) {}", self.code, self.message)
    }
}

impl std::error::Error for NativeError {}

/// Outcome of a statement
#[derive(Debug, Clone, PartialEq)]
pub enum StatementResult {
    /// A result set with column metadata
    Rows(RowSet),
    /// Rows touched by a data-modifying statement
    Affected(u64),
}

impl StatementResult {
    /// Row set for shaping; statements without a result set shape as empty
    pub fn into_rowset(self) -> RowSet {
        match self {
            StatementResult::Rows(rows) => rows,
            StatementResult::Affected(_) => RowSet::empty(),
        }
    }

    pub fn affected_rows(&self) -> Option<u64> {
        match self {
            StatementResult::Affected(n) => Some(*n),
            StatementResult::Rows(_) => None,
        }
    }
}

/// One logical database session
///
/// Prepared statements use `?` placeholders. Every prepared handle is handed
/// back through `close_statement` once its rows have been read.
pub trait Connection {
    type Statement;

    fn execute(&mut self, sql: &str) -> Result<StatementResult, NativeError>;

    fn prepare(&mut self, sql: &str) -> Result<Self::Statement, NativeError>;

    fn execute_prepared(
        &mut self,
        statement: &mut Self::Statement,
        params: &[BindParameter],
    ) -> Result<StatementResult, NativeError>;

    fn close_statement(&mut self, statement: Self::Statement);
}

/// Number of `?` placeholders in the SQL text
///
/// A plain character count: placeholders inside string literals are counted
/// too.
pub fn count_placeholders(sql: &str) -> usize {
    sql.matches('?').count()
}
