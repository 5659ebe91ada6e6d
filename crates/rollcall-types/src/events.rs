//! Real-time event payloads
//!
//! Wire shapes for the per-session channel (topic `session:<id>`).
//! Field names are camelCase to match the client protocol.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::attendance::VerificationFlags;
use crate::ids::{ParticipantId, SessionId};
use crate::session::SessionPhase;

/// Emitted on every token rotation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenEvent {
    /// The freshly minted token string
    pub token: String,
    /// Emission time, epoch milliseconds
    pub timestamp: i64,
}

/// Emitted on every accepted scan
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceEvent {
    pub user_id: ParticipantId,
    pub user_name: String,
    pub marked_at: DateTime<Utc>,
    pub phase: SessionPhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_flags: Option<VerificationFlags>,
}

/// Event delivered to observers of a session channel
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "lowercase")]
pub enum SessionEvent {
    Token(TokenEvent),
    Attendance(AttendanceEvent),
}

/// Channel topic for a session
pub fn session_topic(id: SessionId) -> String {
    format!("session:{id}")
}
