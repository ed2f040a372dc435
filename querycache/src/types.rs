// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Values, rows and row sets exchanged with the database collaborator

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single column value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    /// Extract as integer if possible
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Extract as float if possible
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(n) => Some(*n),
            Value::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    /// Extract as string if possible
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Single-letter variant tag (`n`, `i`, `f`, `t`, `b`)
    pub fn type_tag(&self) -> char {
        match self {
            Value::Null => 'n',
            Value::Int(_) => 'i',
            Value::Float(_) => 'f',
            Value::Text(_) => 't',
            Value::Blob(_) => 'b',
        }
    }

    /// Self-delimiting text form: variant tag, byte length, `:`, text
    ///
    /// Two values share this form only when they are the same variant with
    /// the same textual content, so it can key hash maps and be
    /// concatenated into cache discriminators.
    pub fn key_text(&self) -> String {
        let text = self.to_string();
        format!("{}{}:{}", self.type_tag(), text.len(), text)
    }
}

/// Plain textual form; see [`Value::key_text`] for an unambiguous one
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", n),
            Value::Text(s) => write!(f, "{}", s),
            Value::Blob(bytes) => write!(f, "{}", hex::encode(bytes)),
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n as i64)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Value::Blob(bytes)
    }
}

/// One result row: column names paired with values, in column order
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Row {
    pub values: Vec<(String, Value)>,
}

impl Row {
    pub fn new(values: Vec<(String, Value)>) -> Self {
        Self { values }
    }

    /// Look a value up by column name
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Look a value up by ordinal position
    pub fn get_index(&self, index: usize) -> Option<&Value> {
        self.values.get(index).map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(name, _)| name.as_str())
    }
}

/// Rows streamed back by a statement together with their column metadata
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RowSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl RowSet {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Pair row `index` with the column names
    pub fn row(&self, index: usize) -> Option<Row> {
        self.rows.get(index).map(|values| {
            Row::new(
                self.columns
                    .iter()
                    .cloned()
                    .zip(values.iter().cloned())
                    .collect(),
            )
        })
    }

    pub fn into_rows(self) -> Vec<Row> {
        let columns = self.columns;
        self.rows
            .into_iter()
            .map(|values| Row::new(columns.iter().cloned().zip(values).collect()))
            .collect()
    }
}
