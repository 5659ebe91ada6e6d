//! PostgreSQL repository implementations

mod attendance;
mod participant;
mod session;

pub use attendance::PgAttendanceRepository;
pub use participant::PgParticipantDirectory;
pub use session::PgSessionRepository;

use sqlx::PgPool;

/// All repositories bundled for convenient construction
#[derive(Clone)]
pub struct Repositories {
    pub sessions: PgSessionRepository,
    pub attendance: PgAttendanceRepository,
    pub participants: PgParticipantDirectory,
}

impl Repositories {
    /// Create all repositories sharing one pool
    pub fn new(pool: PgPool) -> Self {
        Self {
            sessions: PgSessionRepository::new(pool.clone()),
            attendance: PgAttendanceRepository::new(pool.clone()),
            participants: PgParticipantDirectory::new(pool),
        }
    }
}
