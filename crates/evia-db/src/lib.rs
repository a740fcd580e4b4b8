//! Evia Database Library
//!
//! Postgres repositories for users, sessions, complaints, drugs and one-time
//! codes, each behind a store trait so services can run against in-memory
//! fakes in tests.

pub mod db;
#[cfg(any(test, feature = "test-helpers"))]
pub mod memory;

pub use db::*;
