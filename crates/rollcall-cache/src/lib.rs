//! Rollcall Cache - Ephemeral keyed store
//!
//! A narrow set-and-counter interface used for TTL-bound token usage
//! statistics, with two interchangeable backends:
//! - [`RedisStore`] against a networked Redis
//! - [`MemoryStore`] as an in-process fallback
//!
//! Callers depend only on [`EphemeralStore`]; the backend is selected at
//! construction time and the semantics are identical against either.

pub mod error;
pub mod memory;
pub mod redis_store;
pub mod store;

pub use error::{CacheError, CacheResult};
pub use memory::MemoryStore;
pub use redis_store::RedisStore;
pub use store::EphemeralStore;
