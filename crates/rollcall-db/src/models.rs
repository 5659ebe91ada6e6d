//! Database row models
//!
//! These types map directly to database rows using SQLx's FromRow derive.
//! Status and phase columns are stored as text; typed accessors parse them
//! into the shared enums.

use chrono::{DateTime, Utc};
use rollcall_types::{
    AttendanceStatus, DomainId, InvalidEnumValue, ParticipantId, SessionId, SessionPhase,
    SessionStatus,
};
use sqlx::FromRow;
use uuid::Uuid;

/// Session row from the database
#[derive(Debug, Clone, FromRow)]
pub struct SessionRow {
    pub id: Uuid,
    pub domain_id: Uuid,
    pub title: String,
    pub status: String,
    pub phase: String,
    pub rotation_counter: i64,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl SessionRow {
    /// Convert to domain SessionId
    pub fn session_id(&self) -> SessionId {
        SessionId(self.id)
    }

    /// Convert to domain DomainId
    pub fn domain_id(&self) -> DomainId {
        DomainId(self.domain_id)
    }

    /// Parse the stored status column
    pub fn status(&self) -> Result<SessionStatus, InvalidEnumValue> {
        self.status.parse()
    }

    /// Parse the stored phase column
    pub fn phase(&self) -> Result<SessionPhase, InvalidEnumValue> {
        self.phase.parse()
    }
}

/// Attendance row from the database
///
/// At most one row exists per (session, participant); the table carries a
/// unique constraint on that pair.
#[derive(Debug, Clone, FromRow)]
pub struct AttendanceRow {
    pub id: Uuid,
    pub session_id: Uuid,
    pub participant_id: Uuid,
    pub status: String,
    pub entry_at: Option<DateTime<Utc>>,
    pub exit_at: Option<DateTime<Utc>>,
    pub token_iat: DateTime<Utc>,
    pub token_exp: DateTime<Utc>,
    pub ip: String,
    pub user_agent: Option<String>,
    pub device_fingerprint: Option<String>,
    pub geo: Option<String>,
    pub verification_flags: Option<String>,
    pub marked_at: DateTime<Utc>,
}

impl AttendanceRow {
    /// Convert to domain SessionId
    pub fn session_id(&self) -> SessionId {
        SessionId(self.session_id)
    }

    /// Convert to domain ParticipantId
    pub fn participant_id(&self) -> ParticipantId {
        ParticipantId(self.participant_id)
    }

    /// Parse the stored status column
    pub fn status(&self) -> Result<AttendanceStatus, InvalidEnumValue> {
        self.status.parse()
    }
}

/// Participant row from the identity directory
#[derive(Debug, Clone, FromRow)]
pub struct ParticipantRow {
    pub id: Uuid,
    pub display_name: String,
    pub domain_id: Uuid,
    pub active: bool,
}

impl ParticipantRow {
    /// Convert to domain ParticipantId
    pub fn participant_id(&self) -> ParticipantId {
        ParticipantId(self.id)
    }

    /// Convert to domain DomainId
    pub fn domain_id(&self) -> DomainId {
        DomainId(self.domain_id)
    }
}
