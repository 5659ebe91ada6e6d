//! PostgreSQL session repository implementation

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::models::SessionRow;
use crate::repo::{CreateSession, SessionRepository};

const SESSION_COLUMNS: &str = "id, domain_id, title, status, phase, rotation_counter, \
                               created_at, started_at, ended_at";

/// PostgreSQL session repository
#[derive(Clone)]
pub struct PgSessionRepository {
    pool: PgPool,
}

impl PgSessionRepository {
    /// Create a new session repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionRepository for PgSessionRepository {
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<SessionRow>> {
        let session = sqlx::query_as::<_, SessionRow>(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    async fn find_active_by_domain(&self, domain_id: Uuid) -> DbResult<Vec<SessionRow>> {
        let sessions = sqlx::query_as::<_, SessionRow>(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions \
             WHERE domain_id = $1 AND status = 'ACTIVE' \
             ORDER BY started_at DESC"
        ))
        .bind(domain_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(sessions)
    }

    async fn create(&self, session: CreateSession) -> DbResult<SessionRow> {
        let row = sqlx::query_as::<_, SessionRow>(&format!(
            "INSERT INTO sessions (id, domain_id, title) \
             VALUES ($1, $2, $3) \
             RETURNING {SESSION_COLUMNS}"
        ))
        .bind(session.id)
        .bind(session.domain_id)
        .bind(&session.title)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn mark_started(&self, id: Uuid) -> DbResult<SessionRow> {
        let row = sqlx::query_as::<_, SessionRow>(&format!(
            "UPDATE sessions \
             SET status = 'ACTIVE', phase = 'ENTRY', rotation_counter = 0, started_at = NOW() \
             WHERE id = $1 \
             RETURNING {SESSION_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or(DbError::NotFound)
    }

    async fn mark_exit_phase(&self, id: Uuid) -> DbResult<SessionRow> {
        let row = sqlx::query_as::<_, SessionRow>(&format!(
            "UPDATE sessions \
             SET phase = 'EXIT', rotation_counter = 0 \
             WHERE id = $1 \
             RETURNING {SESSION_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or(DbError::NotFound)
    }

    async fn mark_completed(&self, id: Uuid) -> DbResult<SessionRow> {
        let row = sqlx::query_as::<_, SessionRow>(&format!(
            "UPDATE sessions \
             SET status = 'COMPLETED', ended_at = NOW() \
             WHERE id = $1 \
             RETURNING {SESSION_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or(DbError::NotFound)
    }

    async fn mark_cancelled(&self, id: Uuid) -> DbResult<SessionRow> {
        let row = sqlx::query_as::<_, SessionRow>(&format!(
            "UPDATE sessions \
             SET status = 'CANCELLED', ended_at = NOW() \
             WHERE id = $1 \
             RETURNING {SESSION_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or(DbError::NotFound)
    }

    async fn set_rotation_counter(&self, id: Uuid, counter: i64) -> DbResult<()> {
        sqlx::query("UPDATE sessions SET rotation_counter = $2 WHERE id = $1")
            .bind(id)
            .bind(counter)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete(&self, id: Uuid) -> DbResult<()> {
        sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
