// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Nested transaction coordination
//!
//! The first `begin` opens a real transaction at level 0; every nested
//! `begin` opens a savepoint named after the new level (`level1`,
//! `level2`, ...). Errors are tracked per level. `complete` commits or
//! releases when no errors are outstanding, and otherwise rolls back the
//! innermost level only.
//!
//! Savepoint names come from the level alone, so one coordinator serves one
//! connection.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::QueryError;

/// Statement the coordinator asks the session to issue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnStatement {
    Begin,
    Savepoint(u32),
    ReleaseSavepoint(u32),
    RollbackToSavepoint(u32),
    Commit,
    Rollback,
}

impl TxnStatement {
    pub fn sql(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for TxnStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxnStatement::Begin => write!(f, "BEGIN"),
            TxnStatement::Savepoint(level) => write!(f, "SAVEPOINT level{}", level),
            TxnStatement::ReleaseSavepoint(level) => write!(f, "RELEASE SAVEPOINT level{}", level),
            TxnStatement::RollbackToSavepoint(level) => {
                write!(f, "ROLLBACK TO SAVEPOINT level{}", level)
            }
            TxnStatement::Commit => write!(f, "COMMIT"),
            TxnStatement::Rollback => write!(f, "ROLLBACK"),
        }
    }
}

/// Snapshot of an open transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionState {
    /// Savepoint depth; 0 is the outer transaction
    pub level: u32,
    /// Errors recorded across all open levels
    pub error_count: u32,
}

/// How a level was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Committed,
    Released { level: u32 },
    RolledBack,
    RolledBackToSavepoint { level: u32 },
}

impl Completion {
    pub fn statement(&self) -> TxnStatement {
        match self {
            Completion::Committed => TxnStatement::Commit,
            Completion::Released { level } => TxnStatement::ReleaseSavepoint(*level),
            Completion::RolledBack => TxnStatement::Rollback,
            Completion::RolledBackToSavepoint { level } => {
                TxnStatement::RollbackToSavepoint(*level)
            }
        }
    }

    pub fn succeeded(&self) -> bool {
        matches!(self, Completion::Committed | Completion::Released { .. })
    }
}

/// Transaction/savepoint state machine for one session
#[derive(Debug, Clone, Default)]
pub struct TransactionCoordinator {
    /// Errors recorded at each open level; empty when idle
    levels: Vec<u32>,
}

impl TransactionCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        !self.levels.is_empty()
    }

    pub fn state(&self) -> Option<TransactionState> {
        let (level, _) = self.current_level()?;
        Some(TransactionState {
            level,
            error_count: self.levels.iter().sum(),
        })
    }

    fn current_level(&self) -> Option<(u32, u32)> {
        let errors = *self.levels.last()?;
        Some(((self.levels.len() - 1) as u32, errors))
    }

    /// Open the transaction, or a savepoint when one is already open
    pub fn begin(&mut self) -> TxnStatement {
        self.levels.push(0);
        match self.current_level() {
            Some((0, _)) | None => {
                log::info!("Transaction started");
                TxnStatement::Begin
            }
            Some((level, _)) => {
                log::info!("Transaction level {} started", level);
                TxnStatement::Savepoint(level)
            }
        }
    }

    /// Count a failed statement against the innermost level
    ///
    /// Returns false when no transaction is open.
    pub fn record_error(&mut self) -> bool {
        match self.levels.last_mut() {
            Some(errors) => {
                *errors += 1;
                true
            }
            None => false,
        }
    }

    /// Close the innermost level
    pub fn complete(&mut self) -> Result<Completion, QueryError> {
        let state = self.state().ok_or(QueryError::NoActiveTransaction)?;
        if state.error_count > 0 {
            log::error!(
                "Transaction has {} error(s) at level {}",
                state.error_count,
                state.level
            );
            return Ok(self.rollback_innermost());
        }

        self.levels.pop();
        let completion = if state.level == 0 {
            Completion::Committed
        } else {
            Completion::Released { level: state.level }
        };
        log::info!("Transaction {:?}", completion);
        Ok(completion)
    }

    /// Abort the innermost level now; issues a plain ROLLBACK when idle
    pub fn rollback_now(&mut self) -> Completion {
        if self.is_active() {
            self.rollback_innermost()
        } else {
            log::warn!("ROLLBACK requested without an open transaction");
            Completion::RolledBack
        }
    }

    fn rollback_innermost(&mut self) -> Completion {
        let completion = match self.current_level() {
            Some((level, _)) if level > 0 => Completion::RolledBackToSavepoint { level },
            _ => Completion::RolledBack,
        };
        // Errors recorded inside the discarded level go with it
        self.levels.pop();
        log::info!("Transaction {:?}", completion);
        completion
    }
}
