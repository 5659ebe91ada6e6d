//! In-memory repository mocks for integration tests

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

use rollcall_db::{
    AttendanceRepository, AttendanceRow, CreateAttendance, CreateSession, DbError, DbResult,
    ParticipantDirectory, ParticipantRow, SessionRepository, SessionRow,
};

#[derive(Default)]
pub struct MockSessionRepository {
    sessions: DashMap<Uuid, SessionRow>,
}

impl MockSessionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a row directly, bypassing lifecycle guards
    pub fn insert(&self, row: SessionRow) {
        self.sessions.insert(row.id, row);
    }

    fn update<F>(&self, id: Uuid, apply: F) -> DbResult<SessionRow>
    where
        F: FnOnce(&mut SessionRow),
    {
        let mut row = self.sessions.get_mut(&id).ok_or(DbError::NotFound)?;
        apply(&mut row);
        Ok(row.clone())
    }
}

#[async_trait]
impl SessionRepository for MockSessionRepository {
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<SessionRow>> {
        Ok(self.sessions.get(&id).map(|row| row.clone()))
    }

    async fn find_active_by_domain(&self, domain_id: Uuid) -> DbResult<Vec<SessionRow>> {
        Ok(self
            .sessions
            .iter()
            .filter(|row| row.domain_id == domain_id && row.status == "ACTIVE")
            .map(|row| row.clone())
            .collect())
    }

    async fn create(&self, session: CreateSession) -> DbResult<SessionRow> {
        let row = SessionRow {
            id: session.id,
            domain_id: session.domain_id,
            title: session.title,
            status: "DRAFT".to_string(),
            phase: "ENTRY".to_string(),
            rotation_counter: 0,
            created_at: Utc::now(),
            started_at: None,
            ended_at: None,
        };
        self.sessions.insert(row.id, row.clone());
        Ok(row)
    }

    async fn mark_started(&self, id: Uuid) -> DbResult<SessionRow> {
        self.update(id, |row| {
            row.status = "ACTIVE".to_string();
            row.phase = "ENTRY".to_string();
            row.rotation_counter = 0;
            row.started_at = Some(Utc::now());
        })
    }

    async fn mark_exit_phase(&self, id: Uuid) -> DbResult<SessionRow> {
        self.update(id, |row| {
            row.phase = "EXIT".to_string();
            row.rotation_counter = 0;
        })
    }

    async fn mark_completed(&self, id: Uuid) -> DbResult<SessionRow> {
        self.update(id, |row| {
            row.status = "COMPLETED".to_string();
            row.ended_at = Some(Utc::now());
        })
    }

    async fn mark_cancelled(&self, id: Uuid) -> DbResult<SessionRow> {
        self.update(id, |row| {
            row.status = "CANCELLED".to_string();
            row.ended_at = Some(Utc::now());
        })
    }

    async fn set_rotation_counter(&self, id: Uuid, counter: i64) -> DbResult<()> {
        self.update(id, |row| row.rotation_counter = counter)?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> DbResult<()> {
        self.sessions.remove(&id);
        Ok(())
    }
}

#[derive(Default)]
pub struct MockAttendanceRepository {
    // Keyed by (session, participant) to model the table's unique pair
    records: DashMap<(Uuid, Uuid), AttendanceRow>,
    conflict_next_create: AtomicBool,
}

impl MockAttendanceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next create lose the uniqueness race, as if a concurrent
    /// scan inserted the pair's row between the caller's lookup and its
    /// insert
    pub fn conflict_on_next_create(&self) {
        self.conflict_next_create.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl AttendanceRepository for MockAttendanceRepository {
    async fn find_by_session_and_participant(
        &self,
        session_id: Uuid,
        participant_id: Uuid,
    ) -> DbResult<Option<AttendanceRow>> {
        Ok(self
            .records
            .get(&(session_id, participant_id))
            .map(|row| row.clone()))
    }

    async fn find_by_session(&self, session_id: Uuid) -> DbResult<Vec<AttendanceRow>> {
        let mut rows: Vec<_> = self
            .records
            .iter()
            .filter(|row| row.session_id == session_id)
            .map(|row| row.clone())
            .collect();
        rows.sort_by(|a, b| b.marked_at.cmp(&a.marked_at));
        Ok(rows)
    }

    async fn find_by_participant(&self, participant_id: Uuid) -> DbResult<Vec<AttendanceRow>> {
        let mut rows: Vec<_> = self
            .records
            .iter()
            .filter(|row| row.participant_id == participant_id)
            .map(|row| row.clone())
            .collect();
        rows.sort_by(|a, b| b.marked_at.cmp(&a.marked_at));
        Ok(rows)
    }

    async fn find_flagged_by_session(&self, session_id: Uuid) -> DbResult<Vec<AttendanceRow>> {
        Ok(self
            .records
            .iter()
            .filter(|row| {
                row.session_id == session_id
                    && row
                        .verification_flags
                        .as_deref()
                        .is_some_and(|f| f.contains("\"flagged\":true"))
            })
            .map(|row| row.clone())
            .collect())
    }

    async fn create(&self, record: CreateAttendance) -> DbResult<AttendanceRow> {
        if self.conflict_next_create.swap(false, Ordering::SeqCst) {
            return Err(DbError::UniqueViolation);
        }
        let key = (record.session_id, record.participant_id);
        match self.records.entry(key) {
            Entry::Occupied(_) => Err(DbError::UniqueViolation),
            Entry::Vacant(entry) => {
                let row = AttendanceRow {
                    id: record.id,
                    session_id: record.session_id,
                    participant_id: record.participant_id,
                    status: record.status,
                    entry_at: record.entry_at,
                    exit_at: record.exit_at,
                    token_iat: record.token_iat,
                    token_exp: record.token_exp,
                    ip: record.ip,
                    user_agent: record.user_agent,
                    device_fingerprint: record.device_fingerprint,
                    geo: record.geo,
                    verification_flags: record.verification_flags,
                    marked_at: Utc::now(),
                };
                entry.insert(row.clone());
                Ok(row)
            }
        }
    }

    async fn mark_exit(&self, id: Uuid, exit_at: DateTime<Utc>) -> DbResult<AttendanceRow> {
        for mut row in self.records.iter_mut() {
            if row.id == id {
                row.exit_at = Some(exit_at);
                row.status = "PRESENT".to_string();
                row.marked_at = exit_at;
                return Ok(row.clone());
            }
        }
        Err(DbError::NotFound)
    }

    async fn mark_pending_absent(&self, session_id: Uuid) -> DbResult<u64> {
        let mut settled = 0;
        for mut row in self.records.iter_mut() {
            if row.session_id == session_id && row.status == "PENDING" {
                row.status = "ABSENT".to_string();
                settled += 1;
            }
        }
        Ok(settled)
    }
}

#[derive(Default)]
pub struct MockParticipantDirectory {
    participants: DashMap<Uuid, ParticipantRow>,
}

impl MockParticipantDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, row: ParticipantRow) {
        self.participants.insert(row.id, row);
    }
}

#[async_trait]
impl ParticipantDirectory for MockParticipantDirectory {
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<ParticipantRow>> {
        Ok(self.participants.get(&id).map(|row| row.clone()))
    }
}
