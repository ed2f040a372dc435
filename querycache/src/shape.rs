// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Reduction of raw row sets into the five result shapes

use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::QueryError;
use crate::types::{Row, RowSet, Value};

/// Requested result shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Shape {
    All,
    Row,
    Col,
    One,
    Assoc,
}

impl Shape {
    pub const ALL_SHAPES: [Shape; 5] = [
        Shape::All,
        Shape::Row,
        Shape::Col,
        Shape::One,
        Shape::Assoc,
    ];

    /// Lowercase name, also the operation-name suffix
    pub fn name(&self) -> &'static str {
        match self {
            Shape::All => "all",
            Shape::Row => "row",
            Shape::Col => "col",
            Shape::One => "one",
            Shape::Assoc => "assoc",
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Shape {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Shape::ALL_SHAPES
            .iter()
            .copied()
            .find(|shape| shape.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| QueryError::UnknownOperation(format!("unknown result shape '{}'", s)))
    }
}

/// Value of one associative entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AssocValue {
    /// Second column, when the result has exactly two
    Scalar(Value),
    /// Every column after the first
    Row(Row),
}

/// A shaped query result
///
/// Empty input is a normal value: no rows, `None`, or an empty map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ShapedResult {
    All(Vec<Row>),
    Row(Option<Row>),
    Col(Vec<Value>),
    One(Option<Value>),
    /// Entries keep first-insertion order; a repeated key overwrites in place
    Assoc(Vec<(Value, AssocValue)>),
}

impl ShapedResult {
    pub fn shape(&self) -> Shape {
        match self {
            ShapedResult::All(_) => Shape::All,
            ShapedResult::Row(_) => Shape::Row,
            ShapedResult::Col(_) => Shape::Col,
            ShapedResult::One(_) => Shape::One,
            ShapedResult::Assoc(_) => Shape::Assoc,
        }
    }

    /// True when the underlying row set had no rows
    pub fn is_not_found(&self) -> bool {
        match self {
            ShapedResult::All(rows) => rows.is_empty(),
            ShapedResult::Row(row) => row.is_none(),
            ShapedResult::Col(values) => values.is_empty(),
            ShapedResult::One(value) => value.is_none(),
            ShapedResult::Assoc(entries) => entries.is_empty(),
        }
    }

    pub fn as_rows(&self) -> Option<&[Row]> {
        match self {
            ShapedResult::All(rows) => Some(rows),
            _ => None,
        }
    }

    pub fn as_row(&self) -> Option<&Row> {
        match self {
            ShapedResult::Row(row) => row.as_ref(),
            _ => None,
        }
    }

    pub fn as_col(&self) -> Option<&[Value]> {
        match self {
            ShapedResult::Col(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_one(&self) -> Option<&Value> {
        match self {
            ShapedResult::One(value) => value.as_ref(),
            _ => None,
        }
    }

    /// Look an associative entry up by key
    pub fn assoc_get(&self, key: &Value) -> Option<&AssocValue> {
        match self {
            ShapedResult::Assoc(entries) => entries
                .iter()
                .find(|(existing, _)| existing == key)
                .map(|(_, value)| value),
            _ => None,
        }
    }
}

/// Shape a row set
pub fn shape(rows: RowSet, shape: Shape) -> Result<ShapedResult, QueryError> {
    match shape {
        Shape::All => Ok(ShapedResult::All(rows.into_rows())),
        Shape::Row => Ok(ShapedResult::Row(rows.row(0))),
        Shape::Col => Ok(ShapedResult::Col(
            rows.rows
                .into_iter()
                .filter_map(|values| values.into_iter().next())
                .collect(),
        )),
        Shape::One => Ok(ShapedResult::One(
            rows.rows
                .into_iter()
                .next()
                .and_then(|values| values.into_iter().next()),
        )),
        Shape::Assoc => shape_assoc(rows),
    }
}

fn shape_assoc(rows: RowSet) -> Result<ShapedResult, QueryError> {
    let columns = rows.column_count();
    if columns < 2 {
        return Err(QueryError::TooFewColumns { columns });
    }

    let names = rows.columns;
    let mut entries: Vec<(Value, AssocValue)> = Vec::with_capacity(rows.rows.len());
    // Entry position per key, keyed by `Value::key_text` since f64 has no Hash
    let mut positions: HashMap<String, usize> = HashMap::with_capacity(rows.rows.len());
    for values in rows.rows {
        let mut values = values.into_iter();
        let Some(key) = values.next() else {
            continue;
        };
        let value = if columns == 2 {
            AssocValue::Scalar(values.next().unwrap_or(Value::Null))
        } else {
            AssocValue::Row(Row::new(names[1..].iter().cloned().zip(values).collect()))
        };

        match positions.entry(key.key_text()) {
            Entry::Occupied(slot) => entries[*slot.get()].1 = value,
            Entry::Vacant(slot) => {
                slot.insert(entries.len());
                entries.push((key, value));
            }
        }
    }
    Ok(ShapedResult::Assoc(entries))
}
