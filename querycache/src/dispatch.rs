// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Operation-name dispatch
//!
//! Operation names are a prefix (`pget`, `cacheget`, `cachepget`) directly
//! followed by a shape (`all`, `row`, `col`, `one`, `assoc`), e.g.
//! `cachepgetrow`. Names resolve through a fixed table of the fifteen
//! combinations; anything else is an unknown operation.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::db::{count_placeholders, Connection};
use crate::error::QueryError;
use crate::keys::Discriminators;
use crate::params::{Param, ParamList};
use crate::session::Session;
use crate::shape::{Shape, ShapedResult};
use crate::types::Value;

/// Execution path named by an operation prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Prefix {
    /// Prepared statement, shaped, uncached
    PGet,
    /// Plain SQL through the cache
    CacheGet,
    /// Prepared statement through the cache
    CachePGet,
}

impl Prefix {
    pub const ALL_PREFIXES: [Prefix; 3] = [Prefix::PGet, Prefix::CacheGet, Prefix::CachePGet];

    pub fn as_str(&self) -> &'static str {
        match self {
            Prefix::PGet => "pget",
            Prefix::CacheGet => "cacheget",
            Prefix::CachePGet => "cachepget",
        }
    }

    fn handler<C: Connection>(self) -> Handler<C> {
        match self {
            Prefix::PGet => handle_pget::<C>,
            Prefix::CacheGet => handle_cache_get::<C>,
            Prefix::CachePGet => handle_cache_pget::<C>,
        }
    }
}

/// A resolved operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Operation {
    pub prefix: Prefix,
    pub shape: Shape,
}

impl Operation {
    pub fn new(prefix: Prefix, shape: Shape) -> Self {
        Self { prefix, shape }
    }

    pub fn name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.prefix.as_str(), self.shape.name())
    }
}

static OPERATIONS: Lazy<HashMap<String, Operation>> = Lazy::new(|| {
    Prefix::ALL_PREFIXES
        .iter()
        .flat_map(|prefix| {
            Shape::ALL_SHAPES
                .iter()
                .map(move |shape| Operation::new(*prefix, *shape))
        })
        .map(|operation| (operation.name(), operation))
        .collect()
});

impl FromStr for Operation {
    type Err = QueryError;

    /// Case-insensitive exact match against the operation table
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        OPERATIONS
            .get(&name.to_ascii_lowercase())
            .copied()
            .ok_or_else(|| QueryError::UnknownOperation(name.to_string()))
    }
}

/// Arguments of a dispatched call
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Invocation {
    /// Cache lifetime; `None` or non-positive means the session default
    pub expire_secs: Option<i64>,
    pub sql: String,
    pub params: ParamList,
    pub discriminators: Discriminators,
}

impl Invocation {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            ..Self::default()
        }
    }

    pub fn expire(mut self, expire_secs: i64) -> Self {
        self.expire_secs = Some(expire_secs);
        self
    }

    pub fn params(mut self, params: ParamList) -> Self {
        self.params = params;
        self
    }

    pub fn discriminators(mut self, discriminators: Discriminators) -> Self {
        self.discriminators = discriminators;
        self
    }

    /// Build from a flat argument list
    ///
    /// The first arguments fill the `?` placeholders of `sql`; up to two
    /// further text arguments are the cache key and/or `group:` name.
    pub fn from_args(
        expire_secs: Option<i64>,
        sql: impl Into<String>,
        mut args: Vec<Param>,
    ) -> Result<Self, QueryError> {
        let sql = sql.into();
        let placeholders = count_placeholders(&sql);
        let trailing = if args.len() > placeholders {
            args.split_off(placeholders)
        } else {
            Vec::new()
        };

        let trailing = trailing
            .into_iter()
            .map(|param| match param {
                Param::Positional(Value::Text(text)) => Ok(text),
                other => Err(QueryError::InvalidParameterList(format!(
                    "cache key or group must be text, got {:?}",
                    other
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            expire_secs,
            sql,
            params: ParamList::new(args)?,
            discriminators: Discriminators::from_trailing(&trailing)?,
        })
    }
}

type Handler<C> = fn(&mut Session<C>, Shape, &Invocation) -> Result<ShapedResult, QueryError>;

fn handle_pget<C: Connection>(
    session: &mut Session<C>,
    shape: Shape,
    invocation: &Invocation,
) -> Result<ShapedResult, QueryError> {
    if invocation.discriminators != Discriminators::none() {
        return Err(QueryError::InvalidParameterList(
            "uncached prepared queries take no cache key or group".to_string(),
        ));
    }
    session.pget(shape, &invocation.sql, &invocation.params)
}

fn handle_cache_get<C: Connection>(
    session: &mut Session<C>,
    shape: Shape,
    invocation: &Invocation,
) -> Result<ShapedResult, QueryError> {
    if !invocation.params.is_empty() {
        return Err(QueryError::InvalidParameterList(
            "cached plain queries take no bind parameters".to_string(),
        ));
    }
    session.cache_get(
        shape,
        invocation.expire_secs,
        &invocation.sql,
        &invocation.discriminators,
    )
}

fn handle_cache_pget<C: Connection>(
    session: &mut Session<C>,
    shape: Shape,
    invocation: &Invocation,
) -> Result<ShapedResult, QueryError> {
    session.cache_pget(
        shape,
        invocation.expire_secs,
        &invocation.sql,
        &invocation.params,
        &invocation.discriminators,
    )
}

impl<C: Connection> Session<C> {
    /// Resolve an operation name and run it
    pub fn invoke(
        &mut self,
        name: &str,
        invocation: &Invocation,
    ) -> Result<ShapedResult, QueryError> {
        let operation: Operation = name.parse()?;
        self.dispatch(operation, invocation)
    }

    pub fn dispatch(
        &mut self,
        operation: Operation,
        invocation: &Invocation,
    ) -> Result<ShapedResult, QueryError> {
        log::debug!("Dispatch {} sql=[{}]", operation, invocation.sql);
        let handler = operation.prefix.handler::<C>();
        handler(self, operation.shape, invocation)
    }
}
