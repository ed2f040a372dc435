//! Test utilities for QueryCache integration tests
//!
//! - FakeConnection: scripted database collaborator that records statements
//! - TestFixture: session over a fake connection, in-process cache and manual clock

#![allow(dead_code)]

pub mod fake_db;
pub mod test_fixture;

/// Route `log` output through env_logger once per test binary
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
