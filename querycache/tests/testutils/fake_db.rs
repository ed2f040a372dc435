//! Scripted database collaborator
//!
//! Statements resolve against canned results keyed by SQL text. Unscripted
//! statements succeed with zero affected rows, so transaction control
//! statements need no setup.

use querycache::{BindParameter, Connection, NativeError, RowSet, StatementResult, Value};
use std::collections::{HashMap, HashSet};

pub struct FakeStatement {
    pub id: usize,
    pub sql: String,
}

#[derive(Default)]
pub struct FakeConnection {
    results: HashMap<String, StatementResult>,
    execute_failures: HashMap<String, NativeError>,
    prepare_failures: HashMap<String, NativeError>,
    /// Every statement run, plain or prepared, in order
    pub statements: Vec<String>,
    /// Bindings of each prepared execution, in order
    pub bindings: Vec<Vec<BindParameter>>,
    pub open_statements: HashSet<usize>,
    next_statement: usize,
}

impl FakeConnection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `sql` with rows
    pub fn with_rows(mut self, sql: &str, columns: &[&str], rows: Vec<Vec<Value>>) -> Self {
        self.results.insert(
            sql.to_string(),
            StatementResult::Rows(RowSet::new(
                columns.iter().map(|c| c.to_string()).collect(),
                rows,
            )),
        );
        self
    }

    /// Make executing `sql` fail
    pub fn failing(mut self, sql: &str, code: i32, message: &str) -> Self {
        self.execute_failures
            .insert(sql.to_string(), NativeError::new(code, message));
        self
    }

    /// Make preparing `sql` fail
    pub fn failing_prepare(mut self, sql: &str, code: i32, message: &str) -> Self {
        self.prepare_failures
            .insert(sql.to_string(), NativeError::new(code, message));
        self
    }

    /// How many times `sql` reached the database
    pub fn executions_of(&self, sql: &str) -> usize {
        self.statements.iter().filter(|s| s.as_str() == sql).count()
    }

    fn run(&mut self, sql: &str) -> Result<StatementResult, NativeError> {
        self.statements.push(sql.to_string());
        if let Some(error) = self.execute_failures.get(sql) {
            return Err(error.clone());
        }
        Ok(self
            .results
            .get(sql)
            .cloned()
            .unwrap_or(StatementResult::Affected(0)))
    }
}

impl Connection for FakeConnection {
    type Statement = FakeStatement;

    fn execute(&mut self, sql: &str) -> Result<StatementResult, NativeError> {
        self.run(sql)
    }

    fn prepare(&mut self, sql: &str) -> Result<FakeStatement, NativeError> {
        if let Some(error) = self.prepare_failures.get(sql) {
            return Err(error.clone());
        }
        self.next_statement += 1;
        self.open_statements.insert(self.next_statement);
        Ok(FakeStatement {
            id: self.next_statement,
            sql: sql.to_string(),
        })
    }

    fn execute_prepared(
        &mut self,
        statement: &mut FakeStatement,
        params: &[BindParameter],
    ) -> Result<StatementResult, NativeError> {
        self.bindings.push(params.to_vec());
        let sql = statement.sql.clone();
        self.run(&sql)
    }

    fn close_statement(&mut self, statement: FakeStatement) {
        self.open_statements.remove(&statement.id);
    }
}
