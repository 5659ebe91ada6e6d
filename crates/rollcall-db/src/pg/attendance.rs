//! PostgreSQL attendance repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::models::AttendanceRow;
use crate::repo::{AttendanceRepository, CreateAttendance};

const ATTENDANCE_COLUMNS: &str = "id, session_id, participant_id, status, entry_at, exit_at, \
                                  token_iat, token_exp, ip, user_agent, device_fingerprint, \
                                  geo, verification_flags, marked_at";

/// PostgreSQL attendance repository.
///
/// The `attendance` table carries a unique constraint on
/// (session_id, participant_id); create surfaces violations as
/// [`DbError::UniqueViolation`].
#[derive(Clone)]
pub struct PgAttendanceRepository {
    pool: PgPool,
}

impl PgAttendanceRepository {
    /// Create a new attendance repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttendanceRepository for PgAttendanceRepository {
    async fn find_by_session_and_participant(
        &self,
        session_id: Uuid,
        participant_id: Uuid,
    ) -> DbResult<Option<AttendanceRow>> {
        let record = sqlx::query_as::<_, AttendanceRow>(&format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance \
             WHERE session_id = $1 AND participant_id = $2"
        ))
        .bind(session_id)
        .bind(participant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn find_by_session(&self, session_id: Uuid) -> DbResult<Vec<AttendanceRow>> {
        let records = sqlx::query_as::<_, AttendanceRow>(&format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance \
             WHERE session_id = $1 \
             ORDER BY marked_at DESC"
        ))
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn find_by_participant(&self, participant_id: Uuid) -> DbResult<Vec<AttendanceRow>> {
        let records = sqlx::query_as::<_, AttendanceRow>(&format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance \
             WHERE participant_id = $1 \
             ORDER BY marked_at DESC"
        ))
        .bind(participant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn find_flagged_by_session(&self, session_id: Uuid) -> DbResult<Vec<AttendanceRow>> {
        let records = sqlx::query_as::<_, AttendanceRow>(&format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance \
             WHERE session_id = $1 AND verification_flags LIKE '%\"flagged\":true%' \
             ORDER BY marked_at DESC"
        ))
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn create(&self, record: CreateAttendance) -> DbResult<AttendanceRow> {
        let row = sqlx::query_as::<_, AttendanceRow>(&format!(
            "INSERT INTO attendance \
             (id, session_id, participant_id, status, entry_at, exit_at, token_iat, token_exp, \
              ip, user_agent, device_fingerprint, geo, verification_flags) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
             RETURNING {ATTENDANCE_COLUMNS}"
        ))
        .bind(record.id)
        .bind(record.session_id)
        .bind(record.participant_id)
        .bind(&record.status)
        .bind(record.entry_at)
        .bind(record.exit_at)
        .bind(record.token_iat)
        .bind(record.token_exp)
        .bind(&record.ip)
        .bind(&record.user_agent)
        .bind(&record.device_fingerprint)
        .bind(&record.geo)
        .bind(&record.verification_flags)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn mark_exit(&self, id: Uuid, exit_at: DateTime<Utc>) -> DbResult<AttendanceRow> {
        let row = sqlx::query_as::<_, AttendanceRow>(&format!(
            "UPDATE attendance \
             SET exit_at = $2, status = 'PRESENT' \
             WHERE id = $1 \
             RETURNING {ATTENDANCE_COLUMNS}"
        ))
        .bind(id)
        .bind(exit_at)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or(DbError::NotFound)
    }

    async fn mark_pending_absent(&self, session_id: Uuid) -> DbResult<u64> {
        let result = sqlx::query(
            "UPDATE attendance SET status = 'ABSENT' \
             WHERE session_id = $1 AND status = 'PENDING'",
        )
        .bind(session_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
