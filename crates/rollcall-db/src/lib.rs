//! Rollcall DB - Database abstractions
//!
//! SQLx-based persistence layer for Rollcall. Core logic depends only on
//! the repository traits in [`repo`]; the `pg` module provides the
//! PostgreSQL implementations.

pub mod error;
pub mod models;
pub mod pg;
pub mod pool;
pub mod repo;

pub use error::{DbError, DbResult};
pub use models::*;
pub use pg::Repositories;
pub use pool::{create_pool, DbPool};
pub use repo::*;
