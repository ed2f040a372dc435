// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Session root tying one connection to its transaction state and cache
//!
//! A session owns exactly one database connection and one transaction
//! coordinator. The cache collaborator is injected and may be shared
//! between sessions. Sessions do no internal locking and are meant to be
//! driven from a single thread.

use std::sync::Arc;

use crate::cache::{Cache, Clock, SystemClock};
use crate::config::SessionConfig;
use crate::db::{Connection, StatementResult};
use crate::error::QueryError;
use crate::executor::{CacheRequest, CacheStats, CachingQueryExecutor, FlushTarget};
use crate::keys::Discriminators;
use crate::params::ParamList;
use crate::shape::{shape, Shape, ShapedResult};
use crate::txn::{TransactionCoordinator, TransactionState};

pub struct Session<C: Connection> {
    connection: C,
    executor: CachingQueryExecutor,
    txn: TransactionCoordinator,
}

impl<C: Connection> Session<C> {
    pub fn new(connection: C, cache: Arc<dyn Cache>, config: &SessionConfig) -> Self {
        Self::with_clock(connection, cache, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        connection: C,
        cache: Arc<dyn Cache>,
        config: &SessionConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let executor = CachingQueryExecutor::new(cache, config.key_deriver(), clock)
            .with_default_expire(config.default_expire_secs);
        Self {
            connection,
            executor,
            txn: TransactionCoordinator::new(),
        }
    }

    pub fn connection(&self) -> &C {
        &self.connection
    }

    pub fn connection_mut(&mut self) -> &mut C {
        &mut self.connection
    }

    pub fn into_connection(self) -> C {
        self.connection
    }

    pub fn executor(&self) -> &CachingQueryExecutor {
        &self.executor
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.executor.stats()
    }

    // ---------------------------------------------------------------------
    // Bare execution
    // ---------------------------------------------------------------------

    /// Execute plain SQL text
    pub fn execute(&mut self, sql: &str) -> Result<StatementResult, QueryError> {
        run_plain(&mut self.connection, &mut self.txn, sql)
    }

    /// Prepare, bind and execute
    pub fn prepared_execute(
        &mut self,
        sql: &str,
        params: &ParamList,
    ) -> Result<StatementResult, QueryError> {
        run_prepared(&mut self.connection, &mut self.txn, sql, params)
    }

    /// Execute plain SQL and shape the rows
    pub fn get(&mut self, result_shape: Shape, sql: &str) -> Result<ShapedResult, QueryError> {
        shape(self.execute(sql)?.into_rowset(), result_shape)
    }

    pub fn get_all(&mut self, sql: &str) -> Result<ShapedResult, QueryError> {
        self.get(Shape::All, sql)
    }

    pub fn get_row(&mut self, sql: &str) -> Result<ShapedResult, QueryError> {
        self.get(Shape::Row, sql)
    }

    pub fn get_col(&mut self, sql: &str) -> Result<ShapedResult, QueryError> {
        self.get(Shape::Col, sql)
    }

    pub fn get_one(&mut self, sql: &str) -> Result<ShapedResult, QueryError> {
        self.get(Shape::One, sql)
    }

    pub fn get_assoc(&mut self, sql: &str) -> Result<ShapedResult, QueryError> {
        self.get(Shape::Assoc, sql)
    }

    /// Execute a prepared statement and shape the rows
    pub fn pget(
        &mut self,
        result_shape: Shape,
        sql: &str,
        params: &ParamList,
    ) -> Result<ShapedResult, QueryError> {
        shape(self.prepared_execute(sql, params)?.into_rowset(), result_shape)
    }

    // ---------------------------------------------------------------------
    // Cached execution
    // ---------------------------------------------------------------------

    /// Cached plain SQL
    pub fn cache_get(
        &mut self,
        result_shape: Shape,
        expire_secs: Option<i64>,
        sql: &str,
        discriminators: &Discriminators,
    ) -> Result<ShapedResult, QueryError> {
        let params = ParamList::empty();
        let request = CacheRequest {
            shape: result_shape,
            expire_secs,
            sql,
            params: &params,
            discriminators,
        };
        let (connection, txn) = (&mut self.connection, &mut self.txn);
        self.executor.execute_cached(&request, || {
            shape(run_plain(connection, txn, sql)?.into_rowset(), result_shape)
        })
    }

    /// Cached prepared statement
    pub fn cache_pget(
        &mut self,
        result_shape: Shape,
        expire_secs: Option<i64>,
        sql: &str,
        params: &ParamList,
        discriminators: &Discriminators,
    ) -> Result<ShapedResult, QueryError> {
        let request = CacheRequest {
            shape: result_shape,
            expire_secs,
            sql,
            params,
            discriminators,
        };
        let (connection, txn) = (&mut self.connection, &mut self.txn);
        self.executor.execute_cached(&request, || {
            shape(
                run_prepared(connection, txn, sql, params)?.into_rowset(),
                result_shape,
            )
        })
    }

    pub fn flush_cache(&mut self, target: &FlushTarget) -> Result<usize, QueryError> {
        self.executor.flush(target)
    }

    // ---------------------------------------------------------------------
    // Transactions
    // ---------------------------------------------------------------------

    pub fn transaction_state(&self) -> Option<TransactionState> {
        self.txn.state()
    }

    /// Start a transaction, or a savepoint inside the open one
    pub fn begin(&mut self) -> Result<(), QueryError> {
        let statement = self.txn.begin();
        self.execute(&statement.sql()).map(|_| ())
    }

    /// Count an application-detected failure against the open transaction
    pub fn record_error(&mut self) -> bool {
        self.txn.record_error()
    }

    /// Close the innermost level
    ///
    /// Returns `Ok(false)` when errors forced a rollback.
    pub fn complete(&mut self) -> Result<bool, QueryError> {
        let completion = self.txn.complete()?;
        self.execute(&completion.statement().sql())?;
        Ok(completion.succeeded())
    }

    /// Roll back the innermost level now
    pub fn rollback(&mut self) -> Result<(), QueryError> {
        let completion = self.txn.rollback_now();
        self.execute(&completion.statement().sql()).map(|_| ())
    }
}

fn run_plain<C: Connection>(
    connection: &mut C,
    txn: &mut TransactionCoordinator,
    sql: &str,
) -> Result<StatementResult, QueryError> {
    log::debug!("Execute sql=[{}]", sql);
    connection
        .execute(sql)
        .map_err(|e| statement_failed(txn, QueryError::execute_failed(sql, e)))
}

fn run_prepared<C: Connection>(
    connection: &mut C,
    txn: &mut TransactionCoordinator,
    sql: &str,
    params: &ParamList,
) -> Result<StatementResult, QueryError> {
    let bindings = params.bind();
    log::debug!(
        "Prepared sql=[{}] types={}",
        sql,
        bindings.iter().map(|b| b.kind.tag()).collect::<String>()
    );

    let mut statement = connection
        .prepare(sql)
        .map_err(|e| statement_failed(txn, QueryError::prepare_failed(sql, e)))?;
    let result = connection.execute_prepared(&mut statement, &bindings);
    // Rows are fully materialised, so the handle can go before shaping
    connection.close_statement(statement);
    result.map_err(|e| statement_failed(txn, QueryError::execute_failed(sql, e)))
}

/// Log a failed statement and charge it to the open transaction
fn statement_failed(txn: &mut TransactionCoordinator, error: QueryError) -> QueryError {
    log::error!("{}", error);
    if txn.record_error() {
        if let Some(state) = txn.state() {
            log::debug!(
                "Transaction level {} now has {} error(s)",
                state.level,
                state.error_count
            );
        }
    }
    error
}
