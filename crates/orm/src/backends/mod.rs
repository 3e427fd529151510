//! Database Backend Abstractions
//!
//! The [`Connection`] contract plus the drivers shipped with the ORM:
//! PostgreSQL over sqlx and, with the `memory` feature, an in-memory store.

pub mod core;
#[cfg(any(test, feature = "memory"))]
pub mod memory;
pub mod postgres;

pub use core::*;
#[cfg(any(test, feature = "memory"))]
pub use memory::{InjectedFailure, LoggedQuery, MemoryConnection, StatementKind};
pub use postgres::PostgresConnection;
