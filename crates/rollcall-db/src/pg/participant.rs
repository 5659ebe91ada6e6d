//! PostgreSQL participant directory implementation

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbResult;
use crate::models::ParticipantRow;
use crate::repo::ParticipantDirectory;

/// PostgreSQL participant directory
#[derive(Clone)]
pub struct PgParticipantDirectory {
    pool: PgPool,
}

impl PgParticipantDirectory {
    /// Create a new participant directory
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ParticipantDirectory for PgParticipantDirectory {
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<ParticipantRow>> {
        let participant = sqlx::query_as::<_, ParticipantRow>(
            "SELECT id, display_name, domain_id, active FROM participants WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(participant)
    }
}
