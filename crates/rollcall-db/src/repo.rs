//! Repository traits
//!
//! Define async repository interfaces for database operations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DbResult;
use crate::models::*;

/// Session repository trait
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Find a session by ID
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<SessionRow>>;

    /// Find all active sessions for a domain
    async fn find_active_by_domain(&self, domain_id: Uuid) -> DbResult<Vec<SessionRow>>;

    /// Create a new session in DRAFT
    async fn create(&self, session: CreateSession) -> DbResult<SessionRow>;

    /// Transition to ACTIVE(ENTRY): set started_at, reset rotation counter
    async fn mark_started(&self, id: Uuid) -> DbResult<SessionRow>;

    /// Switch phase to EXIT and reset the rotation counter
    async fn mark_exit_phase(&self, id: Uuid) -> DbResult<SessionRow>;

    /// Transition to COMPLETED and set ended_at
    async fn mark_completed(&self, id: Uuid) -> DbResult<SessionRow>;

    /// Transition to CANCELLED and set ended_at
    async fn mark_cancelled(&self, id: Uuid) -> DbResult<SessionRow>;

    /// Persist the most recently emitted rotation counter
    async fn set_rotation_counter(&self, id: Uuid, counter: i64) -> DbResult<()>;

    /// Delete a session (dependent records cascade)
    async fn delete(&self, id: Uuid) -> DbResult<()>;
}

/// Create session input
#[derive(Debug, Clone)]
pub struct CreateSession {
    pub id: Uuid,
    pub domain_id: Uuid,
    pub title: String,
}

/// Attendance repository trait
#[async_trait]
pub trait AttendanceRepository: Send + Sync {
    /// Find the record for a (session, participant) pair
    async fn find_by_session_and_participant(
        &self,
        session_id: Uuid,
        participant_id: Uuid,
    ) -> DbResult<Option<AttendanceRow>>;

    /// Find all records for a session, most recent first
    async fn find_by_session(&self, session_id: Uuid) -> DbResult<Vec<AttendanceRow>>;

    /// Find all records for a participant, most recent first
    async fn find_by_participant(&self, participant_id: Uuid) -> DbResult<Vec<AttendanceRow>>;

    /// Find flagged records for a session
    async fn find_flagged_by_session(&self, session_id: Uuid) -> DbResult<Vec<AttendanceRow>>;

    /// Create a new record.
    ///
    /// The store enforces uniqueness on (session, participant); a second
    /// concurrent create for the same pair returns
    /// [`DbError::UniqueViolation`](crate::DbError::UniqueViolation).
    async fn create(&self, record: CreateAttendance) -> DbResult<AttendanceRow>;

    /// Set the exit timestamp and flip the record to PRESENT
    async fn mark_exit(&self, id: Uuid, exit_at: DateTime<Utc>) -> DbResult<AttendanceRow>;

    /// Bulk-update every PENDING record of a session to ABSENT, returning
    /// the number of rows affected
    async fn mark_pending_absent(&self, session_id: Uuid) -> DbResult<u64>;
}

/// Create attendance input
#[derive(Debug, Clone)]
pub struct CreateAttendance {
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
}

/// Identity directory trait (external collaborator boundary).
///
/// The credential service owns participants; this narrow lookup is all the
/// attendance core consumes.
#[async_trait]
pub trait ParticipantDirectory: Send + Sync {
    /// Look up a participant by ID
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<ParticipantRow>>;
}
