// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! QueryCache - shaped, cached SQL results and nested transactions
//!
//! QueryCache sits between a relational database client and its callers.
//!
//! # Features
//!
//! - **Result Shapes**: all rows, first row, first column, single value, or
//!   a map keyed by the first column
//! - **Result Caching**: deterministic keys from a site key, SQL text and a
//!   discriminator, stored in any backend implementing [`Cache`]
//! - **Cache Groups**: entries tagged `group:<name>` can be flushed together
//! - **Prepared Statements**: bind kinds inferred from parameter values
//! - **Nested Transactions**: savepoints with per-level error tracking
//! - **Operation Names**: `pget*`, `cacheget*` and `cachepget*` calls
//!   resolved through a fixed dispatch table
//!
//! # Usage
//!
//! ```ignore
//! let cache = Arc::new(MemoryCache::new());
//! let mut session = Session::new(connection, cache, &SessionConfig::default());
//!
//! let users = session.cache_get(Shape::Assoc, Some(600), "SELECT id, name FROM users",
//!     &Discriminators::none().group(GroupName::new("users")))?;
//! session.flush_cache(&FlushTarget::Group(GroupName::new("users")))?;
//! ```
//!
//! The database and the cache are collaborators: implement [`Connection`]
//! for the client library in use and inject a [`Cache`] backend.

pub mod cache;
pub mod config;
pub mod db;
pub mod dispatch;
pub mod error;
pub mod executor;
pub mod keys;
pub mod params;
pub mod session;
pub mod shape;
pub mod txn;
pub mod types;

pub use cache::{
    BackendKind, Cache, CacheBackendSpec, CacheError, Clock, GroupIndex, MemoryCache, SystemClock,
};
pub use config::SessionConfig;
pub use db::{Connection, NativeError, StatementResult};
pub use dispatch::{Invocation, Operation, Prefix};
pub use error::QueryError;
pub use executor::{CacheRequest, CacheStats, CachingQueryExecutor, FlushTarget};
pub use keys::{CacheKey, CacheKeyDeriver, Discriminators, GroupKey, GroupName};
pub use params::{BindParameter, Param, ParamKind, ParamList};
pub use session::Session;
pub use shape::{AssocValue, Shape, ShapedResult};
pub use txn::{Completion, TransactionCoordinator, TransactionState, TxnStatement};
pub use types::{Row, RowSet, Value};

/// QueryCache version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// QueryCache crate name
pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");
