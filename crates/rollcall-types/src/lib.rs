//! Rollcall Types - Shared domain types
//!
//! This crate contains domain types used across Rollcall crates:
//! - Session, phase, and attendance status enums
//! - Id newtypes for sessions, participants, and domains
//! - Scan metadata and verification flags
//! - Real-time event payloads

pub mod attendance;
pub mod events;
pub mod ids;
pub mod session;

pub use attendance::*;
pub use events::*;
pub use ids::*;
pub use session::*;
