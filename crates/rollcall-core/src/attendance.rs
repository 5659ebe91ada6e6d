//! Per-participant attendance state machine
//!
//! Entry scan creates a PENDING record; a matching exit scan flips it to
//! PRESENT. An exit scan with no prior entry records ABSENT immediately.
//! At most one record exists per (session, participant), enforced by the
//! store, so concurrent duplicate scans collapse to a duplicate error.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::anomaly::{AnomalyDetector, TokenUsage};
use crate::broadcast::Broadcaster;
use crate::error::ScanError;
use crate::verify::TokenVerifier;
use rollcall_cache::EphemeralStore;
use rollcall_db::{
    AttendanceRepository, AttendanceRow, CreateAttendance, DbError, ParticipantDirectory,
    ParticipantRow, SessionRepository,
};
use rollcall_types::{
    AttendanceEvent, AttendanceStatus, ParticipantId, ScanMetadata, SessionPhase, SessionStatus,
    VerificationFlags,
};

/// Result of an accepted scan submission
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    /// Phase the scan was counted under
    pub phase: SessionPhase,
    /// False only for an exit scan with no prior entry, which records
    /// ABSENT instead of rejecting
    pub accepted: bool,
    /// The attendance record after this scan
    pub record: AttendanceRow,
    /// Anomaly annotation, if the token tripped a flag
    pub flags: Option<VerificationFlags>,
}

/// Drives attendance marking for verified scans
pub struct AttendanceService<S, A, P, E>
where
    S: SessionRepository,
    A: AttendanceRepository,
    P: ParticipantDirectory,
    E: EphemeralStore,
{
    sessions: Arc<S>,
    attendance: Arc<A>,
    directory: Arc<P>,
    detector: AnomalyDetector<E>,
    verifier: TokenVerifier,
    broadcaster: Arc<Broadcaster>,
}

impl<S, A, P, E> AttendanceService<S, A, P, E>
where
    S: SessionRepository,
    A: AttendanceRepository,
    P: ParticipantDirectory,
    E: EphemeralStore,
{
    pub fn new(
        sessions: Arc<S>,
        attendance: Arc<A>,
        directory: Arc<P>,
        detector: AnomalyDetector<E>,
        verifier: TokenVerifier,
        broadcaster: Arc<Broadcaster>,
    ) -> Self {
        Self {
            sessions,
            attendance,
            directory,
            detector,
            verifier,
            broadcaster,
        }
    }

    /// Process one scan submission.
    ///
    /// Verification order: token signature and freshness, session existence
    /// and ACTIVE status, rotation counter and phase against the session's
    /// current state, then participant identity. Anomaly tracking runs on
    /// every verified scan but never blocks it; a flag only annotates the
    /// record.
    pub async fn mark_attendance(
        &self,
        participant_id: ParticipantId,
        token: &str,
        meta: &ScanMetadata,
    ) -> Result<ScanOutcome, ScanError> {
        let payload = self.verifier.verify(token)?;

        let session = self
            .sessions
            .find_by_id(payload.sid.0)
            .await?
            .ok_or(ScanError::SessionNotFound)?;

        let status = session
            .status()
            .map_err(|err| ScanError::Internal(err.to_string()))?;
        if status != SessionStatus::Active {
            return Err(ScanError::SessionNotActive);
        }
        let phase = session
            .phase()
            .map_err(|err| ScanError::Internal(err.to_string()))?;

        self.verifier
            .verify_with_session(token, session.rotation_counter, phase)?;

        let participant = self
            .directory
            .find_by_id(participant_id.0)
            .await?
            .filter(|p| p.active && p.domain_id == session.domain_id)
            .ok_or(ScanError::UnknownParticipant)?;

        let flags = self.track_usage(token, meta).await;

        let now = Utc::now();
        let existing = self
            .attendance
            .find_by_session_and_participant(session.id, participant.id)
            .await?;

        match (phase, existing) {
            (SessionPhase::Entry, Some(_)) => Err(ScanError::DuplicateEntry),

            (SessionPhase::Entry, None) => {
                let record = self
                    .create_record(
                        &payload_window(payload.iat, payload.exp)?,
                        session.id,
                        participant.id,
                        AttendanceStatus::Pending,
                        Some(now),
                        None,
                        meta,
                        flags.as_ref(),
                    )
                    .await?;
                self.announce(session.id, &participant, now, phase, flags.clone());
                Ok(ScanOutcome {
                    phase,
                    accepted: true,
                    record,
                    flags,
                })
            }

            (SessionPhase::Exit, Some(record)) => {
                if record.exit_at.is_some() {
                    return Err(ScanError::DuplicateExit);
                }
                let record = self.attendance.mark_exit(record.id, now).await?;
                self.announce(session.id, &participant, now, phase, flags.clone());
                Ok(ScanOutcome {
                    phase,
                    accepted: true,
                    record,
                    flags,
                })
            }

            // Exit with no entry on file: counted as absent, not announced
            (SessionPhase::Exit, None) => {
                let record = self
                    .create_record(
                        &payload_window(payload.iat, payload.exp)?,
                        session.id,
                        participant.id,
                        AttendanceStatus::Absent,
                        None,
                        Some(now),
                        meta,
                        flags.as_ref(),
                    )
                    .await?;
                Ok(ScanOutcome {
                    phase,
                    accepted: false,
                    record,
                    flags,
                })
            }
        }
    }

    /// All records for a session, most recent first
    pub async fn session_records(
        &self,
        session_id: Uuid,
    ) -> Result<Vec<AttendanceRow>, ScanError> {
        Ok(self.attendance.find_by_session(session_id).await?)
    }

    /// All records for a participant, most recent first
    pub async fn participant_records(
        &self,
        participant_id: ParticipantId,
    ) -> Result<Vec<AttendanceRow>, ScanError> {
        Ok(self.attendance.find_by_participant(participant_id.0).await?)
    }

    /// Flagged records for a session
    pub async fn flagged_records(
        &self,
        session_id: Uuid,
    ) -> Result<Vec<AttendanceRow>, ScanError> {
        Ok(self.attendance.find_flagged_by_session(session_id).await?)
    }

    /// Record token usage and return the flag if one raised.
    ///
    /// A stats-store failure degrades to "not flagged" so that attendance
    /// keeps working when the ephemeral store is down.
    async fn track_usage(&self, token: &str, meta: &ScanMetadata) -> Option<VerificationFlags> {
        let usage = TokenUsage {
            ip: meta.ip.clone(),
            device_fingerprint: meta
                .device_fingerprint
                .clone()
                .unwrap_or_else(|| meta.ip.clone()),
            country: meta.country(),
        };
        match self.detector.record(token, &usage).await {
            Ok(true) => Some(VerificationFlags::geo_dispersion()),
            Ok(false) => None,
            Err(err) => {
                tracing::warn!("token usage tracking unavailable: {err}");
                None
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn create_record(
        &self,
        window: &(DateTime<Utc>, DateTime<Utc>),
        session_id: Uuid,
        participant_id: Uuid,
        status: AttendanceStatus,
        entry_at: Option<DateTime<Utc>>,
        exit_at: Option<DateTime<Utc>>,
        meta: &ScanMetadata,
        flags: Option<&VerificationFlags>,
    ) -> Result<AttendanceRow, ScanError> {
        let geo = meta
            .geo
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|err| ScanError::Internal(err.to_string()))?;
        let verification_flags = flags
            .map(serde_json::to_string)
            .transpose()
            .map_err(|err| ScanError::Internal(err.to_string()))?;

        let create = CreateAttendance {
            id: Uuid::new_v4(),
            session_id,
            participant_id,
            status: status.as_str().to_string(),
            entry_at,
            exit_at,
            token_iat: window.0,
            token_exp: window.1,
            ip: meta.ip.clone(),
            user_agent: meta.user_agent.clone(),
            device_fingerprint: meta.device_fingerprint.clone(),
            geo,
            verification_flags,
        };

        self.attendance.create(create).await.map_err(|err| {
            // A concurrent scan for the same pair races our existence check
            if matches!(err, DbError::UniqueViolation) {
                match status {
                    AttendanceStatus::Pending => ScanError::DuplicateEntry,
                    _ => ScanError::DuplicateExit,
                }
            } else {
                err.into()
            }
        })
    }

    fn announce(
        &self,
        session_id: Uuid,
        participant: &ParticipantRow,
        marked_at: DateTime<Utc>,
        phase: SessionPhase,
        verification_flags: Option<VerificationFlags>,
    ) {
        self.broadcaster.publish_attendance(
            rollcall_types::SessionId(session_id),
            AttendanceEvent {
                user_id: participant.participant_id(),
                user_name: participant.display_name.clone(),
                marked_at,
                phase,
                verification_flags,
            },
        );
    }
}

/// Convert the token's epoch-second window to timestamps for the record
fn payload_window(iat: i64, exp: i64) -> Result<(DateTime<Utc>, DateTime<Utc>), ScanError> {
    let iat = DateTime::from_timestamp(iat, 0)
        .ok_or_else(|| ScanError::Internal("token window out of range".to_string()))?;
    let exp = DateTime::from_timestamp(exp, 0)
        .ok_or_else(|| ScanError::Internal("token window out of range".to_string()))?;
    Ok((iat, exp))
}
