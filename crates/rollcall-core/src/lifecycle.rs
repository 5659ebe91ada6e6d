//! Session lifecycle state machine
//!
//! DRAFT -> ACTIVE(ENTRY) -> ACTIVE(EXIT) -> COMPLETED, with CANCELLED
//! reachable from any non-terminal state. Activation and phase switches
//! drive the rotation scheduler; stopping settles every still-pending
//! participant to ABSENT before the session closes.

use std::sync::Arc;

use uuid::Uuid;

use crate::broadcast::Broadcaster;
use crate::error::LifecycleError;
use crate::rotation::RotationScheduler;
use crate::token::TokenCodec;
use rollcall_db::{
    AttendanceRepository, CreateSession, ParticipantDirectory, SessionRepository, SessionRow,
};
use rollcall_types::{DomainId, ParticipantId, SessionId, SessionPhase, SessionStatus};

/// Administrative operations over sessions
pub struct SessionLifecycle<S, A, P>
where
    S: SessionRepository + 'static,
    A: AttendanceRepository,
    P: ParticipantDirectory,
{
    sessions: Arc<S>,
    attendance: Arc<A>,
    directory: Arc<P>,
    scheduler: Arc<RotationScheduler<S>>,
    broadcaster: Arc<Broadcaster>,
    codec: TokenCodec,
}

impl<S, A, P> SessionLifecycle<S, A, P>
where
    S: SessionRepository + 'static,
    A: AttendanceRepository,
    P: ParticipantDirectory,
{
    pub fn new(
        sessions: Arc<S>,
        attendance: Arc<A>,
        directory: Arc<P>,
        scheduler: Arc<RotationScheduler<S>>,
        broadcaster: Arc<Broadcaster>,
        codec: TokenCodec,
    ) -> Self {
        Self {
            sessions,
            attendance,
            directory,
            scheduler,
            broadcaster,
            codec,
        }
    }

    /// Create a session in DRAFT
    pub async fn create(
        &self,
        domain: DomainId,
        title: impl Into<String>,
    ) -> Result<SessionRow, LifecycleError> {
        let row = self
            .sessions
            .create(CreateSession {
                id: Uuid::new_v4(),
                domain_id: domain.0,
                title: title.into(),
            })
            .await?;
        tracing::info!(session = %row.id, "session created");
        Ok(row)
    }

    /// Activate a DRAFT session and begin entry-phase rotation
    pub async fn start(&self, id: SessionId) -> Result<SessionRow, LifecycleError> {
        let session = self.load(id).await?;
        if self.status_of(&session)? != SessionStatus::Draft {
            return Err(LifecycleError::InvalidPhaseTransition {
                action: "start",
                state: session.status,
            });
        }

        let row = self.sessions.mark_started(id.0).await?;
        self.scheduler
            .start(id, row.domain_id(), SessionPhase::Entry);
        tracing::info!(session = %id, "session started");
        Ok(row)
    }

    /// Switch an ACTIVE(ENTRY) session to the exit phase.
    ///
    /// The rotation counter resets; exit tokens start over from 0.
    pub async fn switch_to_exit(&self, id: SessionId) -> Result<SessionRow, LifecycleError> {
        let session = self.load(id).await?;
        let active = self.status_of(&session)? == SessionStatus::Active;
        if !active || self.phase_of(&session)? != SessionPhase::Entry {
            return Err(LifecycleError::InvalidPhaseTransition {
                action: "switch to exit phase of",
                state: session.status,
            });
        }

        let row = self.sessions.mark_exit_phase(id.0).await?;
        self.scheduler.start(id, row.domain_id(), SessionPhase::Exit);
        tracing::info!(session = %id, "session switched to exit phase");
        Ok(row)
    }

    /// Stop an ACTIVE session.
    ///
    /// Rotation halts, every still-PENDING participant settles to ABSENT,
    /// and the session's event channel closes.
    pub async fn stop(&self, id: SessionId) -> Result<SessionRow, LifecycleError> {
        let session = self.load(id).await?;
        if self.status_of(&session)? != SessionStatus::Active {
            return Err(LifecycleError::InvalidPhaseTransition {
                action: "stop",
                state: session.status,
            });
        }

        self.scheduler.stop(id);
        let settled = self.attendance.mark_pending_absent(id.0).await?;
        let row = self.sessions.mark_completed(id.0).await?;
        self.broadcaster.remove(id);
        tracing::info!(session = %id, settled, "session completed");
        Ok(row)
    }

    /// Cancel a session in any non-terminal state
    pub async fn cancel(&self, id: SessionId) -> Result<SessionRow, LifecycleError> {
        let session = self.load(id).await?;
        if self.status_of(&session)?.is_terminal() {
            return Err(LifecycleError::InvalidPhaseTransition {
                action: "cancel",
                state: session.status,
            });
        }

        self.scheduler.stop(id);
        let row = self.sessions.mark_cancelled(id.0).await?;
        self.broadcaster.remove(id);
        tracing::info!(session = %id, "session cancelled");
        Ok(row)
    }

    /// Delete a session and its attendance records
    pub async fn delete(&self, id: SessionId) -> Result<(), LifecycleError> {
        self.scheduler.stop(id);
        self.broadcaster.remove(id);
        self.sessions.delete(id.0).await?;
        tracing::info!(session = %id, "session deleted");
        Ok(())
    }

    /// The currently valid token for an ACTIVE session.
    ///
    /// Lets a late-joining display catch up without waiting for the next
    /// rotation. Returns `None` when the session is not active.
    pub async fn current_token(&self, id: SessionId) -> Result<Option<String>, LifecycleError> {
        let session = self.load(id).await?;
        if self.status_of(&session)? != SessionStatus::Active {
            return Ok(None);
        }
        let phase = self.phase_of(&session)?;
        Ok(Some(self.codec.mint(
            id,
            session.domain_id(),
            session.rotation_counter,
            phase,
        )))
    }

    /// Active sessions a participant could currently scan into.
    ///
    /// Unknown or deactivated participants see no sessions.
    pub async fn active_sessions_for_participant(
        &self,
        participant: ParticipantId,
    ) -> Result<Vec<SessionRow>, LifecycleError> {
        let Some(participant) = self
            .directory
            .find_by_id(participant.0)
            .await?
            .filter(|p| p.active)
        else {
            return Ok(Vec::new());
        };
        Ok(self
            .sessions
            .find_active_by_domain(participant.domain_id)
            .await?)
    }

    async fn load(&self, id: SessionId) -> Result<SessionRow, LifecycleError> {
        self.sessions
            .find_by_id(id.0)
            .await?
            .ok_or(LifecycleError::SessionNotFound)
    }

    fn status_of(&self, session: &SessionRow) -> Result<SessionStatus, LifecycleError> {
        session
            .status()
            .map_err(|err| LifecycleError::Internal(err.to_string()))
    }

    fn phase_of(&self, session: &SessionRow) -> Result<SessionPhase, LifecycleError> {
        session
            .phase()
            .map_err(|err| LifecycleError::Internal(err.to_string()))
    }
}
