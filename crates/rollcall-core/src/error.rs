//! Protocol errors
//!
//! Everything here is an expected, user-facing outcome of a scan or an
//! administrative action, never a crash.

use thiserror::Error;

use crate::verify::VerifyError;
use rollcall_db::DbError;

/// Why a scan submission was rejected
#[derive(Error, Debug)]
pub enum ScanError {
    /// Token failed verification policy
    #[error(transparent)]
    Verification(#[from] VerifyError),

    /// Token references a session that does not exist
    #[error("session not found")]
    SessionNotFound,

    /// Scan attempted outside the ACTIVE state
    #[error("session is not active")]
    SessionNotActive,

    /// Submitting participant is unknown or deactivated
    #[error("participant not found")]
    UnknownParticipant,

    /// Entry already marked for this (session, participant)
    #[error("entry already marked for this session")]
    DuplicateEntry,

    /// Exit already marked for this (session, participant)
    #[error("exit already marked for this session")]
    DuplicateExit,

    /// Persistent store failure
    #[error("database error: {0}")]
    Store(DbError),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl ScanError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Verification(_) | Self::SessionNotActive => 400,
            Self::SessionNotFound | Self::UnknownParticipant => 404,
            Self::DuplicateEntry | Self::DuplicateExit => 409,
            Self::Store(_) | Self::Internal(_) => 500,
        }
    }

    /// Get error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Verification(VerifyError::MalformedToken) => "MALFORMED_TOKEN",
            Self::Verification(VerifyError::InvalidSignature) => "INVALID_SIGNATURE",
            Self::Verification(VerifyError::Expired) => "TOKEN_EXPIRED",
            Self::Verification(VerifyError::IssuedInFuture) => "TOKEN_FROM_FUTURE",
            Self::Verification(VerifyError::RotationMismatch { .. }) => "ROTATION_MISMATCH",
            Self::Verification(VerifyError::PhaseMismatch { .. }) => "PHASE_MISMATCH",
            Self::SessionNotFound => "SESSION_NOT_FOUND",
            Self::SessionNotActive => "SESSION_NOT_ACTIVE",
            Self::UnknownParticipant => "PARTICIPANT_NOT_FOUND",
            Self::DuplicateEntry => "DUPLICATE_ENTRY",
            Self::DuplicateExit => "DUPLICATE_EXIT",
            Self::Store(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<DbError> for ScanError {
    fn from(err: DbError) -> Self {
        tracing::error!("database error: {}", err);
        Self::Store(err)
    }
}

/// Why an administrative session action was rejected
#[derive(Error, Debug)]
pub enum LifecycleError {
    /// Session does not exist
    #[error("session not found")]
    SessionNotFound,

    /// State machine guard violation
    #[error("cannot {action} a session in state {state}")]
    InvalidPhaseTransition {
        action: &'static str,
        state: String,
    },

    /// Persistent store failure
    #[error("database error: {0}")]
    Store(DbError),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl LifecycleError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::SessionNotFound => 404,
            Self::InvalidPhaseTransition { .. } => 400,
            Self::Store(_) | Self::Internal(_) => 500,
        }
    }
}

impl From<DbError> for LifecycleError {
    fn from(err: DbError) -> Self {
        tracing::error!("database error: {}", err);
        Self::Store(err)
    }
}
